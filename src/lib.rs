// Public modules
pub mod auth;
pub mod config;
pub mod database;
pub mod domains;
pub mod errors;
pub mod registry;
pub mod types;
pub mod validation;

pub use config::CoreConfig;
pub use registry::CoreServices;

use crate::errors::ServiceResult;

/// Install the `env_logger` backend for the `log` facade. `RUST_LOG` overrides `level`.
/// Calling it again is harmless; only the first call installs a logger.
pub fn init_logging(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Entry point for initialization.
/// Opens the pool described by `config`, brings the schema up to date and wires every service.
pub async fn initialize(config: &CoreConfig) -> ServiceResult<CoreServices> {
    init_logging(config.log_level);

    let pool = database::connect(config).await?;
    if config.run_migrations {
        database::migration::run_migrations(&pool).await?;
    } else {
        log::info!("Skipping migrations; {} is off", config::ENV_RUN_MIGRATIONS);
    }

    Ok(CoreServices::new(pool))
}
