//! `lr snippet` command implementation.
//!
//! Prints the client bootstrap script for pages that are not built through a
//! plugin, e.g. to paste into a dev-only template.

use std::path::PathBuf;

use clap::Args;
use console::Term;
use lr_config::{CliSettings, Config};
use lr_core::bootstrap::ClientScript;

use crate::error::CliError;

/// Arguments for the snippet command.
#[derive(Args)]
pub(crate) struct SnippetArgs {
    /// Path to configuration file (default: auto-discover lr.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload channel port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Host the browser connects to (default: the page's host).
    #[arg(long)]
    hostname: Option<String>,

    /// Protocol the browser connects with: http, https, ws or wss.
    #[arg(long)]
    protocol: Option<String>,

    /// Wrap the script in a `<script>` tag.
    #[arg(long)]
    html: bool,
}

impl SnippetArgs {
    /// Execute the snippet command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or stdout is closed.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            port: self.port,
            ..CliSettings::default()
        };
        let mut config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(hostname) = self.hostname {
            config.client.hostname = Some(hostname);
        }
        if let Some(protocol) = self.protocol {
            config.client.protocol = protocol;
        }
        config.validate()?;

        let script = render(&config, &uuid::Uuid::new_v4().simple().to_string(), self.html);
        Term::stdout().write_str(&script)?;

        Ok(())
    }
}

/// Render the script for `config`.
fn render(config: &Config, instance_id: &str, html: bool) -> String {
    let script = ClientScript {
        instance_id,
        hostname: config.client.hostname.as_deref(),
        protocol: &config.client.protocol,
        port: config.server.port,
    }
    .render();

    if html {
        format!("<script>{script}</script>\n")
    } else {
        script
    }
}
