use tracing::{error, info};

use cloudvault::{Config, Services};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = cloudvault::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        cloudvault::logging::init_console_only(&config.logging.level);
    }

    info!("cloudvault - personal cloud storage");

    let services = match Services::open(config).await {
        Ok(services) => services,
        Err(e) => {
            error!("Failed to open storage: {e}");
            std::process::exit(1);
        }
    };

    match cloudvault::UserRepository::new(services.db().pool()).count().await {
        Ok(count) => info!(
            "Storage ready: database {}, data root {} ({} user(s))",
            services.config().database.path,
            services.config().storage.data_root,
            count
        ),
        Err(e) => {
            error!("Database check failed: {e}");
            std::process::exit(1);
        }
    }
}
