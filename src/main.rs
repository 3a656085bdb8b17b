use clap::Parser;
use media_serve::{logger, server, AppState, Config};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "media-serve")]
#[command(about = "Static HTTP media server with directory listings and range streaming")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Write a default configuration file to --config and exit
    #[arg(long)]
    gen_config: bool,

    /// Media directory to serve (overrides the config file)
    #[arg(short, long)]
    directory: Option<String>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind to (overrides the config file)
    #[arg(long)]
    host: Option<String>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(directory) = &self.directory {
            config.media.directory.clone_from(directory);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        Config::write_default(&cli.config)?;
        println!("Default configuration written to {}", cli.config.display());
        return Ok(());
    }

    let config_exists = cli.config.exists();
    let mut cfg = Config::load_from(&cli.config.to_string_lossy())?;
    cli.apply_overrides(&mut cfg);
    cfg.validate()?;

    logger::init(&cfg)?;

    if !config_exists {
        create_default_config(&cli.config);
    }

    // Create the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        info!("Using {workers} worker threads");
    } else {
        info!("Using default worker threads (CPU cores)");
    }
    let runtime = runtime_builder.build()?;

    let state = Arc::new(AppState::new(cfg)?);
    runtime.block_on(server::run(state))
}

/// First start without a config file leaves one behind to edit
fn create_default_config(path: &Path) {
    match Config::write_default(path) {
        Ok(()) => info!("Created default configuration at {}", path.display()),
        Err(error) => warn!(%error, "Could not create default configuration"),
    }
}
