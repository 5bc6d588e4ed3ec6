//! # Wayhost - Wayland Embedding Shell
//!
//! Opens a compositor window, binds an EGL surface to it and runs the
//! preview rendering engine on the timed event loop until the window is
//! closed or the process is interrupted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use wayhost::logging::init_logging;
use wayhost::{ApplicationShell, PreviewEngine, ShellOptions, WayhostConfig};

#[derive(Parser)]
#[command(name = "wayhost")]
#[command(about = "Hosts a task-driven rendering engine in a Wayland window")]
#[command(version)]
struct Cli {
    /// Asset bundle directory
    bundle: PathBuf,

    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/wayhost/wayhost.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Window width, overrides the configuration
    #[arg(long)]
    width: Option<u32>,

    /// Window height, overrides the configuration
    #[arg(long)]
    height: Option<u32>,

    /// Arguments passed through to the engine (after `--`)
    #[arg(last = true)]
    engine_args: Vec<String>,
}

fn apply_overrides(config: &mut WayhostConfig, cli: &Cli) {
    if let Some(width) = cli.width {
        config.window.width = width;
    }
    if let Some(height) = cli.height {
        config.window.height = height;
    }
    if cli.debug {
        config.general.debug = true;
    }
    config.engine.args.extend(cli.engine_args.iter().cloned());
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = WayhostConfig::load(&cli.config);
    let debug = cli.debug || loaded.as_ref().map_or(false, |c| c.general.debug);
    init_logging(debug);

    info!("🚀 Starting Wayhost");
    info!("📄 Version: {}", wayhost::VERSION);
    info!("📝 {}", wayhost::DESCRIPTION);

    // Load configuration
    let mut config = match loaded {
        Ok(config) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            config
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
            WayhostConfig::default()
        }
    };

    apply_overrides(&mut config, &cli);
    config
        .validate()
        .context("Invalid configuration after command-line overrides")?;

    let options = ShellOptions::from_config(&config, cli.bundle.clone());
    let mut shell = ApplicationShell::<PreviewEngine>::new(options)
        .context("Failed to start the embedding shell")?;

    let runner = shell.task_runner();
    ctrlc::set_handler(move || {
        info!("🛑 Interrupt received, stopping");
        runner.stop();
    })
    .context("Failed to install the interrupt handler")?;

    info!("✨ Wayhost is ready");
    shell.run().context("Event loop ended with an error")?;

    info!("👋 Wayhost shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["wayhost", "bundle"]).unwrap();
        assert_eq!(cli.bundle, PathBuf::from("bundle"));
        assert!(!cli.debug);
        assert_eq!(cli.width, None);
        assert!(cli.engine_args.is_empty());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "wayhost",
            "--debug",
            "--width",
            "1280",
            "--height",
            "720",
            "bundle",
            "--",
            "--observatory-port=0",
        ])
        .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.width, Some(1280));
        assert_eq!(cli.height, Some(720));
        assert_eq!(cli.engine_args, vec!["--observatory-port=0"]);
    }

    #[test]
    fn test_bundle_is_required() {
        assert!(Cli::try_parse_from(["wayhost"]).is_err());
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::try_parse_from(["wayhost", "--width", "640", "bundle", "--", "--x"])
            .unwrap();
        let mut config = WayhostConfig::default();
        config.engine.args = vec!["--from-file".into()];

        apply_overrides(&mut config, &cli);

        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.engine.args, vec!["--from-file", "--x"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_override_fails_validation() {
        let cli = Cli::try_parse_from(["wayhost", "--height", "0", "bundle"]).unwrap();
        let mut config = WayhostConfig::default();
        apply_overrides(&mut config, &cli);
        assert!(config.validate().is_err());
    }
}
