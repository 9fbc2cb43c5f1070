//! The render entry point.
//!
//! A [`Renderer`] turns a [`RenderJob`] into a [`RenderResponse`]. Each job
//! moves through [`RenderState`]:
//!
//! ```text
//! Rendering -> StreamingBody -> FlushingTail -> Closed
//!     \
//!      -> Errored   (setup failed; the error text becomes the body)
//! ```
//!
//! In [`RenderStrategy::Stream`] two coroutines run per job. The producer pulls
//! the app's fragment iterator and forwards encoded fragments over a channel;
//! the assembler writes the head, pumps fragments through a [`ChunkBuffer`]
//! into the output [`ByteStream`], then writes the tail. If the consumer drops
//! the stream, the assembler's next send fails, it trips the job's
//! [`AbortController`] and the producer stops pulling fragments.
//!
//! [`RenderStrategy::Static`] runs the same phases in the calling coroutine and
//! returns one buffered document.

use super::app::{AppProvider, Fragment, FragmentIter, RenderRequest};
use super::chunk::{pump, ChunkBuffer, PumpEnd};
use super::context::{AbortController, AbortSignal, RenderContext};
use super::document::DocumentShell;
use super::error::RenderError;
use super::stream::{byte_channel, ByteSink, ByteStream};
use crate::config::{ErrorMode, UltraConfig};
use crate::ids::RenderId;
use crate::import_map::ImportMap;
use may::sync::mpsc;
use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    /// Head first, then body chunks as they are produced, then the tail
    Stream,
    /// Wait for the whole body and return one buffered document
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Rendering,
    StreamingBody,
    FlushingTail,
    Closed,
    Errored,
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderState::Rendering => "rendering",
            RenderState::StreamingBody => "streaming_body",
            RenderState::FlushingTail => "flushing_tail",
            RenderState::Closed => "closed",
            RenderState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// One request to render a page.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub id: RenderId,
    pub url: Url,
    /// Public origin of the site
    pub root: Url,
    pub import_map: Arc<ImportMap>,
    /// `lang` attribute; the renderer's default language when `None`
    pub locale: Option<String>,
    /// Overrides the renderer's configured strategy when set
    pub strategy: Option<RenderStrategy>,
}

impl RenderJob {
    pub fn new(url: Url, root: Url, import_map: Arc<ImportMap>) -> Self {
        Self {
            id: RenderId::new(),
            url,
            root,
            import_map,
            locale: None,
            strategy: None,
        }
    }

    pub fn with_id(mut self, id: RenderId) -> Self {
        self.id = id;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_strategy(mut self, strategy: RenderStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Shorthand for [`RenderStrategy::Static`].
    pub fn disable_streaming(self) -> Self {
        self.with_strategy(RenderStrategy::Static)
    }
}

pub enum RenderBody {
    Stream(ByteStream),
    Buffered(Vec<u8>),
}

impl RenderBody {
    pub fn is_stream(&self) -> bool {
        matches!(self, RenderBody::Stream(_))
    }

    /// The complete document; drains the stream if there is one.
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        match self {
            RenderBody::Stream(stream) => stream.collect_bytes(),
            RenderBody::Buffered(bytes) => Ok(bytes),
        }
    }
}

impl fmt::Debug for RenderBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderBody::Stream(_) => f.write_str("RenderBody::Stream(..)"),
            RenderBody::Buffered(bytes) => write!(f, "RenderBody::Buffered({} bytes)", bytes.len()),
        }
    }
}

/// Result of [`Renderer::render`]. Both renderer generations report through
/// this: the error convention is picked by [`ErrorMode`].
#[derive(Debug)]
pub struct RenderResponse {
    pub status: u16,
    pub did_error: bool,
    pub content_type: &'static str,
    pub body: RenderBody,
}

impl RenderResponse {
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        self.body.into_bytes()
    }
}

/// Renders pages for one app with one configuration. Cheap to share across
/// request coroutines; all per-request state lives in the job.
pub struct Renderer {
    app: AppProvider,
    document: Arc<DocumentShell>,
    lang: String,
    chunk_size: usize,
    flush_idle: Duration,
    error_mode: ErrorMode,
    strategy: RenderStrategy,
    stack_size: usize,
}

impl Renderer {
    pub fn new(config: &UltraConfig, app: AppProvider) -> Result<Self, RenderError> {
        Ok(Self {
            app,
            document: Arc::new(DocumentShell::new(config)?),
            lang: config.lang.clone(),
            chunk_size: config.chunk_size,
            flush_idle: config.flush_idle(),
            error_mode: config.error_mode,
            strategy: if config.disable_streaming {
                RenderStrategy::Static
            } else {
                RenderStrategy::Stream
            },
            stack_size: config.stack_size,
        })
    }

    pub fn with_document(mut self, document: DocumentShell) -> Self {
        self.document = Arc::new(document);
        self
    }

    pub fn app(&self) -> &AppProvider {
        &self.app
    }

    pub fn error_mode(&self) -> ErrorMode {
        self.error_mode
    }

    /// Render `job`. Setup failures become an error page; they never surface as `Err`.
    pub fn render(&self, job: RenderJob) -> RenderResponse {
        let strategy = job.strategy.unwrap_or(self.strategy);
        let locale = job.locale.clone().unwrap_or_else(|| self.lang.clone());
        debug!(
            render_id = %job.id,
            path = job.url.path(),
            strategy = ?strategy,
            state = %RenderState::Rendering,
            "Render job started"
        );

        let controller = AbortController::new();
        let ctx = RenderContext::new(controller.signal());
        let request = RenderRequest {
            url: job.url.clone(),
            path: job.url.path().to_string(),
            locale: locale.clone(),
        };
        let app = self.app.current();

        let setup = panic::catch_unwind(AssertUnwindSafe(|| app.render(&request, &ctx)))
            .unwrap_or_else(|payload| Err(RenderError::Setup(panic_message(payload))));
        let (body, setup_failed) = match setup {
            Ok(body) => (body, false),
            Err(err) => {
                error!(
                    render_id = %job.id,
                    path = job.url.path(),
                    error = %err,
                    error_mode = %self.error_mode,
                    state = %RenderState::Errored,
                    "Render setup failed"
                );
                let page: FragmentIter =
                    Box::new(std::iter::once(Ok(Fragment::from(err.to_string()))));
                (page, true)
            }
        };

        let head = match self
            .document
            .head(&locale, &job.root, &job.import_map, &ctx.helmet())
        {
            Ok(head) => head,
            Err(err) => return self.error_response(&job, err),
        };

        let mut response = match strategy {
            RenderStrategy::Static => self.render_static(&job, head, body, &ctx),
            RenderStrategy::Stream => self.render_stream(&job, head, body, ctx, controller),
        };
        if setup_failed && !response.did_error {
            response.status = self.error_mode.status_code();
            response.did_error = true;
        }
        response
    }

    fn render_static(
        &self,
        job: &RenderJob,
        head: String,
        mut body: FragmentIter,
        ctx: &RenderContext,
    ) -> RenderResponse {
        let mut document = head.into_bytes();
        while let Some(fragment) = next_fragment(&mut body) {
            match fragment {
                Ok(fragment) => document.extend(fragment.into_bytes()),
                Err(err) => {
                    // Body is truncated at the failing fragment.
                    error!(render_id = %job.id, error = %err, "Render failed mid-body");
                    return RenderResponse {
                        status: 500,
                        did_error: true,
                        content_type: HTML_CONTENT_TYPE,
                        body: RenderBody::Buffered(document),
                    };
                }
            }
        }
        let tail = match self.document.tail(&ctx.cache()) {
            Ok(tail) => tail,
            Err(err) => return self.error_response(job, err),
        };
        document.extend(tail.into_bytes());
        info!(
            render_id = %job.id,
            path = job.url.path(),
            bytes = document.len(),
            state = %RenderState::Closed,
            "Rendered static document"
        );
        RenderResponse {
            status: 200,
            did_error: false,
            content_type: HTML_CONTENT_TYPE,
            body: RenderBody::Buffered(document),
        }
    }

    fn render_stream(
        &self,
        job: &RenderJob,
        head: String,
        body: FragmentIter,
        ctx: RenderContext,
        controller: AbortController,
    ) -> RenderResponse {
        let (fragment_tx, fragment_rx) = mpsc::channel();
        let (sink, stream) = byte_channel(controller.clone());

        let id = job.id;
        let signal = ctx.signal().clone();
        if let Err(err) = self.spawn_stage("ultra-render", move || {
            produce(id, body, signal, fragment_tx)
        }) {
            return self.error_response(job, RenderError::Spawn(err.to_string()));
        }

        let assembly = Assembly {
            id,
            head,
            fragments: fragment_rx,
            sink,
            ctx,
            controller: controller.clone(),
            document: Arc::clone(&self.document),
            chunk_size: self.chunk_size,
            flush_idle: self.flush_idle,
        };
        if let Err(err) = self.spawn_stage("ultra-assemble", move || assembly.run()) {
            controller.abort();
            return self.error_response(job, RenderError::Spawn(err.to_string()));
        }

        RenderResponse {
            status: 200,
            did_error: false,
            content_type: HTML_CONTENT_TYPE,
            body: RenderBody::Stream(stream),
        }
    }

    fn error_response(&self, job: &RenderJob, err: RenderError) -> RenderResponse {
        let status = match err {
            RenderError::Spawn(_) => 500,
            _ => self.error_mode.status_code(),
        };
        error!(
            render_id = %job.id,
            path = job.url.path(),
            error = %err,
            status,
            error_mode = %self.error_mode,
            state = %RenderState::Errored,
            "Render failed before the body"
        );
        RenderResponse {
            status,
            did_error: true,
            content_type: HTML_CONTENT_TYPE,
            body: RenderBody::Buffered(err.to_string().into_bytes()),
        }
    }

    fn spawn_stage<F>(&self, name: &str, stage: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        // SAFETY: may requires the coroutine not to touch thread-local storage
        // across yields; render stages only use owned data and channels.
        let handle = unsafe {
            may::coroutine::Builder::new()
                .name(name.to_string())
                .stack_size(self.stack_size)
                .spawn(stage)?
        };
        // Detached; the stage ends when its channels close.
        drop(handle);
        Ok(())
    }
}

/// Producer stage: pull fragments until the iterator ends, fails, or the job aborts.
fn produce(
    id: RenderId,
    mut fragments: FragmentIter,
    signal: AbortSignal,
    tx: mpsc::Sender<Result<Vec<u8>, RenderError>>,
) {
    let mut produced = 0usize;
    while !signal.is_aborted() {
        let Some(fragment) = next_fragment(&mut fragments) else {
            return;
        };
        let failed = fragment.is_err();
        if tx.send(fragment.map(Fragment::into_bytes)).is_err() || failed {
            break;
        }
        produced += 1;
    }
    debug!(render_id = %id, fragments = produced, "Render producer stopped early");
}

/// Assembler stage state, moved into its coroutine.
struct Assembly {
    id: RenderId,
    head: String,
    fragments: mpsc::Receiver<Result<Vec<u8>, RenderError>>,
    sink: ByteSink,
    ctx: RenderContext,
    controller: AbortController,
    document: Arc<DocumentShell>,
    chunk_size: usize,
    flush_idle: Duration,
}

impl Assembly {
    fn run(self) {
        let Assembly {
            id,
            head,
            fragments,
            sink,
            ctx,
            controller,
            document,
            chunk_size,
            flush_idle,
        } = self;

        if !sink.send(head.into_bytes()) {
            controller.abort();
            debug!(render_id = %id, "Stream dropped before head was sent");
            return;
        }

        debug!(render_id = %id, state = %RenderState::StreamingBody, "Head sent");
        let mut buffer = ChunkBuffer::new(chunk_size);
        let outcome = pump(&fragments, &mut buffer, flush_idle, |chunk| sink.send(chunk));
        drop(fragments);

        match outcome.end {
            PumpEnd::Finished => {
                debug!(render_id = %id, state = %RenderState::FlushingTail, "Body complete");
                let tail = document.tail(&ctx.cache());
                match tail {
                    Ok(tail) => {
                        if !sink.send(tail.into_bytes()) {
                            controller.abort();
                        }
                    }
                    Err(err) => {
                        error!(render_id = %id, error = %err, "Failed to build document tail");
                        sink.fail(err.into());
                        return;
                    }
                }
                info!(
                    render_id = %id,
                    chunk_count = outcome.chunks,
                    bytes = outcome.bytes,
                    idle_flushes = outcome.idle_flushes,
                    state = %RenderState::Closed,
                    "Render stream closed"
                );
            }
            PumpEnd::SourceFailed(err) => {
                warn!(
                    render_id = %id,
                    error = %err,
                    chunk_count = outcome.chunks,
                    "Render failed mid-stream, terminating body"
                );
                sink.fail(err.into());
            }
            PumpEnd::SinkClosed => {
                controller.abort();
                info!(
                    render_id = %id,
                    chunk_count = outcome.chunks,
                    "Client went away, render aborted"
                );
            }
        }
    }
}

/// Pull the next fragment. A panic inside the app's iterator becomes a
/// fragment error.
fn next_fragment(fragments: &mut FragmentIter) -> Option<Result<Fragment, RenderError>> {
    panic::catch_unwind(AssertUnwindSafe(|| fragments.next()))
        .unwrap_or_else(|payload| Some(Err(RenderError::Fragment(panic_message(payload)))))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "render panicked".to_string()
    }
}
