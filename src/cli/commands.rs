use crate::bundle;
use crate::config::UltraConfig;
use crate::hot_reload::watch_app;
use crate::import_map::{load_import_map, ImportMap, ImportMapResolver};
use crate::otel::{self, LogConfig};
use crate::render::{AppProvider, MarkupApp, ReloadableApp, Renderer};
use crate::server::{HttpServer, ServerHandle, UltraService};
use crate::static_files::StaticFiles;
use crate::url_utils::hash_file;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Command-line interface for ultrarender
#[derive(Parser)]
#[command(name = "ultrarender")]
#[command(about = "Import-map resolution and streaming SSR delivery", long_about = None)]
pub struct Cli {
    /// YAML config file; `ULTRA_*` environment variables override it
    #[arg(short, long, global = true, env = "ULTRA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve vendor files, static files, API routes and rendered pages
    Serve {
        /// Pre-rendered markup used as the application body
        #[arg(long, default_value = "index.html")]
        app: PathBuf,

        /// Import map file (defaults to the config's `import_map`)
        #[arg(long)]
        import_map: Option<PathBuf>,

        /// Address to bind (defaults to 0.0.0.0 on the config's port)
        #[arg(long)]
        addr: Option<String>,

        /// Reload the app when its file changes
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
    /// Copy sources into the build directory and write the derived import maps
    Build {
        /// Project root containing the source directory
        #[arg(long, default_value = ".")]
        project: PathBuf,

        /// Vendor import map (defaults to the config's `import_map`)
        #[arg(long)]
        import_map: Option<PathBuf>,

        /// Print the build plan as JSON
        #[arg(long, default_value_t = false)]
        plan: bool,
    },
    /// Resolve a module specifier against an import map
    Resolve {
        specifier: String,

        /// URL of the referencing module (defaults to the root URL)
        #[arg(long)]
        referrer: Option<String>,

        /// Import map file (defaults to the config's `import_map`)
        #[arg(long)]
        import_map: Option<PathBuf>,
    },
    /// Print the cache-key hash of a module URL
    Hash { url: String },
}

impl Cli {
    /// Config file (if any) with environment overrides applied.
    pub fn load_config(&self) -> anyhow::Result<UltraConfig> {
        let config = match &self.config {
            Some(path) => UltraConfig::load(path)?,
            None => UltraConfig::default(),
        }
        .with_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// Parse arguments and execute the selected command.
///
/// # Errors
///
/// Returns an error if configuration or the import map cannot be loaded,
/// the build pass fails, or the server cannot bind.
pub fn run_cli() -> anyhow::Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;
    match &cli.command {
        Commands::Serve {
            app,
            import_map,
            addr,
            watch,
        } => {
            let log_config = if config.dev {
                LogConfig::dev()
            } else {
                LogConfig::from_env()
            };
            otel::init_logging_with_config(&log_config)?;
            serve(&config, app, import_map.as_deref(), addr.as_deref(), *watch)
        }
        Commands::Build {
            project,
            import_map,
            plan,
        } => {
            otel::init_logging_with_config(&LogConfig::from_env())?;
            let vendor_map = load_map(&config, import_map.as_deref())?;
            let build_plan = bundle::build(&config, project, &vendor_map)?;
            if *plan {
                println!("{}", serde_json::to_string_pretty(&build_plan)?);
            }
            Ok(())
        }
        Commands::Resolve {
            specifier,
            referrer,
            import_map,
        } => {
            let map = load_map(&config, import_map.as_deref())?;
            let resolver = ImportMapResolver::new(map, config.root_url()?);
            let referrer = match referrer {
                Some(r) => Url::parse(r).with_context(|| format!("invalid referrer '{r}'"))?,
                None => resolver.base_url().clone(),
            };
            let resolved = resolver.resolve(specifier, &referrer);
            match resolved.href() {
                Some(href) => println!("{href}"),
                None => anyhow::bail!("cannot resolve '{specifier}' from {referrer}"),
            }
            Ok(())
        }
        Commands::Hash { url } => {
            println!("{}", hash_file(url));
            Ok(())
        }
    }
}

fn load_map(config: &UltraConfig, path: Option<&Path>) -> anyhow::Result<ImportMap> {
    let path = path.map_or_else(|| PathBuf::from(&config.import_map), Path::to_path_buf);
    let map = load_import_map(&path)?;
    info!(path = %path.display(), imports = map.imports.len(), "Loaded import map");
    Ok(map)
}

fn serve(
    config: &UltraConfig,
    app_path: &Path,
    import_map: Option<&Path>,
    addr: Option<&str>,
    watch: bool,
) -> anyhow::Result<()> {
    may::config().set_stack_size(config.stack_size);
    let map = Arc::new(load_map(config, import_map)?);

    let watch = watch || config.dev;
    let mut _watcher = None;
    let provider = if watch {
        let app = ReloadableApp::new(MarkupApp::loader(app_path.to_path_buf()))?;
        _watcher = Some(watch_app([app_path], app.clone(), |generation| {
            info!(generation, "App reloaded");
        })?);
        AppProvider::Reloadable(app)
    } else {
        AppProvider::new_static(MarkupApp::from_file(app_path)?)
    };

    let renderer = Arc::new(Renderer::new(config, provider)?);
    let static_files = StaticFiles::for_project(Path::new("."), config);
    let service = UltraService::new(config, renderer, map)?.with_static_files(static_files);

    let addr = addr.map_or_else(|| format!("0.0.0.0:{}", config.port), str::to_string);
    let handle = HttpServer(service).start(addr.as_str())?;
    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to register signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}
