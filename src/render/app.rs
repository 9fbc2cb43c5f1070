use super::context::RenderContext;
use super::error::RenderError;
use anyhow::Context;
use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// One piece of rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Bytes(Vec<u8>),
}

impl Fragment {
    /// UTF-8 bytes of a text fragment, or the binary fragment unchanged.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Fragment::Text(text) => text.into_bytes(),
            Fragment::Bytes(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Fragment::Text(text) => text.len(),
            Fragment::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Fragment::Text(text)
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Fragment {
    fn from(bytes: Vec<u8>) -> Self {
        Fragment::Bytes(bytes)
    }
}

/// Lazy, single-pass fragment sequence produced by an [`App`].
pub type FragmentIter = Box<dyn Iterator<Item = Result<Fragment, RenderError>> + Send>;

/// What the app gets to know about the request being rendered.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub url: Url,
    /// Static router location (the URL path)
    pub path: String,
    pub locale: String,
}

/// An application that can be rendered to a fragment sequence.
///
/// `render` runs synchronously during job setup: head tags it records on the
/// context are in place before the head is emitted. An `Err` from `render`
/// puts the job into its error path; errors yielded by the iterator end the
/// stream early.
pub trait App: Send + Sync {
    fn render(&self, request: &RenderRequest, ctx: &RenderContext) -> Result<FragmentIter, RenderError>;
}

impl<F> App for F
where
    F: Fn(&RenderRequest, &RenderContext) -> Result<FragmentIter, RenderError> + Send + Sync,
{
    fn render(&self, request: &RenderRequest, ctx: &RenderContext) -> Result<FragmentIter, RenderError> {
        self(request, ctx)
    }
}

pub type SharedApp = Arc<dyn App>;

/// Loader used by [`ReloadableApp::reload`].
pub type AppLoader = Arc<dyn Fn() -> anyhow::Result<SharedApp> + Send + Sync>;

/// Where a render job gets its app from.
#[derive(Clone)]
pub enum AppProvider {
    /// Linked once at startup
    Static(SharedApp),
    /// Swapped at runtime by the dev-mode watcher
    Reloadable(ReloadableApp),
}

impl AppProvider {
    pub fn new_static<A: App + 'static>(app: A) -> Self {
        AppProvider::Static(Arc::new(app))
    }

    /// The app to use for one job; a job keeps it even if a reload happens mid-render.
    pub fn current(&self) -> SharedApp {
        match self {
            AppProvider::Static(app) => Arc::clone(app),
            AppProvider::Reloadable(reloadable) => reloadable.current(),
        }
    }
}

/// App slot that can be swapped without blocking in-flight renders.
#[derive(Clone)]
pub struct ReloadableApp {
    slot: Arc<ArcSwap<SharedApp>>,
    loader: AppLoader,
    generation: Arc<AtomicU64>,
}

impl ReloadableApp {
    /// Load the first app with `loader` and keep the loader for later reloads.
    pub fn new(loader: AppLoader) -> anyhow::Result<Self> {
        let initial = loader().context("initial app load failed")?;
        Ok(Self {
            slot: Arc::new(ArcSwap::from_pointee(initial)),
            loader,
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn current(&self) -> SharedApp {
        Arc::clone(&**self.slot.load())
    }

    /// Number of successful reloads so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Run the loader again. On failure the previous app stays active.
    pub fn reload(&self) -> bool {
        match (self.loader)() {
            Ok(app) => {
                self.slot.store(Arc::new(app));
                let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                info!(generation, "App reloaded");
                true
            }
            Err(err) => {
                warn!(error = %err, "App reload failed, keeping previous app");
                false
            }
        }
    }
}

/// Serves pre-rendered markup from a file, split into fixed-size fragments.
///
/// This is the app `ultrarender serve` uses when no application is linked in.
#[derive(Debug, Clone)]
pub struct MarkupApp {
    markup: Arc<str>,
    title: Option<String>,
    fragment_size: usize,
}

impl MarkupApp {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: Arc::from(markup.into()),
            title: None,
            fragment_size: 1024,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let markup = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read markup {}", path.display()))?;
        Ok(Self::new(markup))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_fragment_size(mut self, size: usize) -> Self {
        self.fragment_size = size.max(1);
        self
    }

    /// Loader that re-reads `path` on every call, for [`ReloadableApp`].
    pub fn loader(path: PathBuf) -> AppLoader {
        Arc::new(move || Ok(Arc::new(MarkupApp::from_file(&path)?) as SharedApp))
    }
}

impl App for MarkupApp {
    fn render(&self, request: &RenderRequest, ctx: &RenderContext) -> Result<FragmentIter, RenderError> {
        if let Some(title) = &self.title {
            ctx.set_head_tag("title", format!("<title>{title}</title>"));
        }
        ctx.cache_set("location", serde_json::Value::String(request.path.clone()));
        let markup = Arc::clone(&self.markup);
        let size = self.fragment_size;
        let mut offset = 0;
        Ok(Box::new(std::iter::from_fn(move || {
            if offset >= markup.len() {
                return None;
            }
            let mut end = (offset + size).min(markup.len());
            while !markup.is_char_boundary(end) {
                end += 1;
            }
            let fragment = Fragment::Text(markup[offset..end].to_string());
            offset = end;
            Some(Ok(fragment))
        })))
    }
}
