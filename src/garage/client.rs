use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Car, CarStatus};

/// Failure of a single garage call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GarageClientError {
    #[error("Car {car_id} does not exist!")]
    CarNotFound { car_id: String },

    #[error("Error while updating status of car {car_id}!")]
    StatusUpdateFailed { car_id: String },

    #[error("Garage operation {operation} timed out after {timeout_ms} ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl GarageClientError {
    pub fn car_not_found(car_id: impl Into<String>) -> Self {
        Self::CarNotFound {
            car_id: car_id.into(),
        }
    }
}

pub type GarageResult<T> = Result<T, GarageClientError>;

/// Operations the garage service exposes
#[async_trait]
pub trait GarageClient: Send + Sync {
    /// Every car known to the garage
    async fn list_cars(&self) -> GarageResult<Vec<Car>>;

    /// Confirm the car exists
    async fn check(&self, car_id: &str) -> GarageResult<bool>;

    /// Outstanding problems of the car
    async fn get_problems(&self, car_id: &str) -> GarageResult<Vec<String>>;

    /// Record a new problem, returning the updated list
    async fn add_problem(&self, car_id: &str, problem: &str) -> GarageResult<Vec<String>>;

    /// Clear every problem, returning the (empty) list
    async fn fix_problems(&self, car_id: &str) -> GarageResult<Vec<String>>;

    /// Recompute the car status from its problems; may fail transiently
    async fn update_status(&self, car_id: &str) -> GarageResult<CarStatus>;
}
