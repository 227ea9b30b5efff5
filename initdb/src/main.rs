//! A helper program to create the voters database and apply its
//! migrations without starting the server.

use std::error::Error;

use log::{debug, info, initialize_logger, parse_level};

use voter_registry::config::Config;
use voter_registry::db::SqliteDb;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    let logger = initialize_logger(parse_level(&config.log_level));

    debug!(logger, "Connecting to database..."; "connection_string" => &config.connection_string);
    let db = SqliteDb::from_config(&config)?;

    debug!(logger, "Running migrations...");
    db.initialize().await?;

    info!(logger, "Completed initialization."; "voters" => db.count_all().await?);

    Ok(())
}
