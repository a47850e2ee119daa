//! `lr watch` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use lr_config::{CliSettings, Config};
use lr_core::{
    BuildHooks, BuildSnapshot, ClassifyError, Decision, LifecycleState, LiveReloadPlugin,
    PortRegistry, StartError,
};
use lr_server::ReloadBinder;
use lr_watch::DirectoryHost;
use tokio::runtime::Handle;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    /// Path to configuration file (default: auto-discover lr.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Build output directory to watch (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Host the reload channel binds to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Reload channel port, 0 picks a free one (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Asset name pattern to ignore; glob or /regex/ (repeatable, replaces config).
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Only reload for assets whose content digest changed.
    #[arg(long)]
    hash: bool,

    /// Only reload for assets whose size changed.
    #[arg(long)]
    size: bool,

    /// Delay in milliseconds between build and reload (overrides config).
    #[arg(long, value_name = "MS")]
    delay: Option<u64>,

    /// Suppress the listening message.
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl WatchArgs {
    /// Execute the watch command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the output directory
    /// cannot be watched.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = self.cli_settings();
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let options = config.plugin_options()?;

        output.info("Starting live reload");
        if let Some(path) = &config.config_path {
            output.field("Config", &path.display().to_string());
        }
        output.field("Output", &config.watch_resolved.output_dir.display().to_string());
        if !config.reload.ignore.is_empty() {
            output.field("Ignore", &config.reload.ignore.join(", "));
        }

        let binder = Arc::new(ReloadBinder::new(config.server.host.clone(), Handle::current()));
        let registry = Arc::new(PortRegistry::new());
        let plugin =
            LiveReloadPlugin::new(options, registry, Arc::<ReloadBinder>::clone(&binder));

        let host = DirectoryHost::new(
            &config.watch_resolved.output_dir,
            config.watch_resolved.debounce,
        )?;
        let mut hooks = ReportingHooks {
            plugin,
            host: config.server.host.clone(),
            output,
            announced: false,
        };

        let result = host.run(&mut hooks, shutdown_signal()).await;
        binder.close_all();
        result?;

        Ok(())
    }

    /// Convert flags into config overrides.
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            host: self.host.clone(),
            port: self.port,
            output_dir: self.output_dir.clone(),
            ignore: (!self.ignore.is_empty()).then(|| self.ignore.clone()),
            quiet: self.quiet.then_some(true),
            delay_ms: self.delay,
            use_source_hash: self.hash.then_some(true),
            use_source_size: self.size.then_some(true),
        }
    }
}

/// Shown after a failed build; the next build still reloads only for changed files.
const BUILD_FAILED_MESSAGE: &str = "Build failed, waiting for the next build";

/// The bind error itself is logged; it need not be a port conflict.
fn disabled_message(port: u16) -> String {
    format!("Live reload disabled on port {port}")
}

/// Forwards build hooks to the plugin and reports outcomes on the terminal.
struct ReportingHooks {
    plugin: LiveReloadPlugin,
    host: String,
    output: Output,
    announced: bool,
}

impl BuildHooks for ReportingHooks {
    async fn on_watch_start(&mut self) -> Result<(), StartError> {
        self.plugin.on_watch_start().await?;

        if !self.announced {
            self.announced = true;
            match self.plugin.state() {
                LifecycleState::Listening => self.output.field(
                    "Reload channel",
                    &format!("ws://{}:{}/livereload", self.host, self.plugin.port()),
                ),
                LifecycleState::Disabled => {
                    self.output.warning(&disabled_message(self.plugin.port()));
                }
                LifecycleState::Idle | LifecycleState::Starting => {}
            }
        }

        Ok(())
    }

    fn on_assets_available(&mut self, snapshot: &BuildSnapshot) -> Result<(), ClassifyError> {
        self.plugin.on_assets_available(snapshot)
    }

    fn on_build_done(&mut self, snapshot: &BuildSnapshot) -> Result<Decision, ClassifyError> {
        let decision = self.plugin.on_build_done(snapshot)?;
        if let Decision::Notified(files) = &decision {
            self.output.reload(files);
        }
        Ok(decision)
    }

    fn on_build_failed(&mut self) {
        self.output.error(BUILD_FAILED_MESSAGE);
        self.plugin.on_build_failed();
    }
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    tracing::info!("Shutdown signal received, stopping watcher...");
}
