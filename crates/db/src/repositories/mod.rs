use async_trait::async_trait;
use thiserror::Error;

use carlot_core::domain::filters::FilterMap;
use carlot_core::domain::vehicle::Vehicle;

pub mod vehicle;

pub use vehicle::{NewVehicle, SqlVehicleRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Inventory access as the dialogue side consumes it.
///
/// Filtering contract: string-valued keys match case-insensitive substrings
/// (any-of when the value is a list); the `*_min`/`*_max` keys are inclusive
/// numeric bounds; unrecognized keys are ignored; an empty mapping returns
/// the whole inventory.
#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn search(&self, filters: &FilterMap) -> Result<Vec<Vehicle>, RepositoryError>;
    async fn insert_many(&self, vehicles: &[NewVehicle]) -> Result<u64, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}
