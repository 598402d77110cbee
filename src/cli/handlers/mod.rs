//! Command handlers, one per subcommand.
//!
//! Admin handlers write human-readable output to any `io::Write` so they can
//! be exercised against an in-memory store.

pub mod migrate;
pub mod provider;
pub mod serve;
pub mod shortnumber;
pub mod sweep;

pub use migrate::MigrateCommandHandler;
pub use provider::ProviderCommandHandler;
pub use serve::ServeCommandHandler;
pub use shortnumber::ShortNumberCommandHandler;
pub use sweep::SweepCommandHandler;

use crate::config::Settings;
use crate::db::establish_async_connection_pool;
use crate::error::{AppError, AppResult};
use crate::repositories::Repositories;

/// Postgres-backed repositories for one-shot admin commands.
pub(crate) async fn connect_repositories(settings: &Settings) -> AppResult<Repositories> {
    let pool = establish_async_connection_pool(&settings.database).await?;
    Ok(Repositories::postgres(pool))
}

pub(crate) fn output_error(e: std::io::Error) -> AppError {
    AppError::Internal {
        source: anyhow::Error::new(e).context("write command output"),
    }
}
