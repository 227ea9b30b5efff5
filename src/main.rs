use std::error::Error;
use std::sync::Arc;

use futures::future::FutureExt;
use log::{info, initialize_logger, parse_level, warn};

use voter_registry::config::{self, Config};
use voter_registry::db::SqliteDb;
use voter_registry::environment::Environment;
use voter_registry::routes;
use voter_registry::store::FileStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let mut config = Config::from_env()?;
    config.upload_dir = config::absolute(config.upload_dir)?;

    let logger = initialize_logger(parse_level(&config.log_level));

    info!(logger, "Starting...";
          "main_port" => config.port,
          "admin_port" => config.admin_port,
          "registration_path" => &config.registration_path,
          "upload_dir" => %config.upload_dir.display());
    let logger = Arc::new(logger);

    info!(logger, "Creating database pool...");
    let db = SqliteDb::from_config(&config)?;

    info!(logger, "Applying migrations...");
    db.initialize().await?;

    let store = FileStore::new(config.upload_dir.clone());

    let main_port = config.port;
    let admin_port = config.admin_port;

    let environment = Environment::new(
        logger.clone(),
        Arc::new(db),
        Arc::new(store),
        Arc::new(config),
    );

    let should_terminate = {
        let logger = logger.clone();

        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(logger, "Failed to listen for Ctrl-C"; "error" => %e);
                futures::future::pending::<()>().await;
            }
        }
        .shared()
    };

    let (main_address, main_server) = {
        let should_terminate = should_terminate.clone();

        warp::serve(routes::make_api(environment.clone()))
            .try_bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), should_terminate)?
    };

    let (admin_address, admin_server) = {
        let should_terminate = should_terminate.clone();

        warp::serve(routes::admin::make_healthz_route())
            .try_bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), should_terminate)?
    };

    info!(logger, "Listening..."; "main" => %main_address, "admin" => %admin_address);

    tokio::join!(main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
