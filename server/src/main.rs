use std::path::PathBuf;

use clap::Parser;
use incident_tracker_lib::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "incident-tracker")]
#[command(about = "Incident tracker REST backend", long_about = None, version)]
struct Cli {
    /// TOML file layered over the built-in defaults
    #[arg(short, long, env = "ITRACK_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long)]
    db: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Replace all incidents with COUNT demo incidents at startup
    #[arg(long, value_name = "COUNT", num_args = 0..=1, default_missing_value = "200")]
    seed: Option<usize>,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(db) = self.db {
            config.database.path = db;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(count) = self.seed {
            config.seed.enabled = true;
            config.seed.count = count;
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    cli.apply(&mut config);

    init_tracing(&config);
    tracing::info!("Starting incident tracker v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(db = %config.database.path.display(), "database");

    incident_tracker_lib::run(config).await?;
    Ok(())
}
