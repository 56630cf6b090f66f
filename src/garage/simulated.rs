use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::client::{GarageClient, GarageClientError, GarageResult};
use crate::config::GarageSettings;
use crate::models::{Car, CarStatus};

/// Shared vehicle data behind the simulated garage
///
/// Cloning the handle shares the same cars.
#[derive(Debug, Clone, Default)]
pub struct GarageState {
    cars: Arc<RwLock<BTreeMap<String, Car>>>,
}

impl GarageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State holding the given cars, each `ok` with no problems
    pub fn seeded<I, S>(car_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = Self::new();
        for car_id in car_ids {
            state.insert_car(Car::new(car_id));
        }
        state
    }

    pub fn insert_car(&self, car: Car) {
        self.cars.write().insert(car.car_id.clone(), car);
    }

    pub fn car(&self, car_id: &str) -> Option<Car> {
        self.cars.read().get(car_id).cloned()
    }

    pub fn cars(&self) -> Vec<Car> {
        self.cars.read().values().cloned().collect()
    }

    fn with_car<T>(&self, car_id: &str, f: impl FnOnce(&mut Car) -> T) -> GarageResult<T> {
        let mut cars = self.cars.write();
        cars.get_mut(car_id)
            .map(f)
            .ok_or_else(|| GarageClientError::car_not_found(car_id))
    }
}

/// In-process garage with simulated latency and a flaky status update
#[derive(Debug, Clone)]
pub struct SimulatedGarage {
    state: GarageState,
    latency: Duration,
    /// Percent chance (0..=100) that `update_status` succeeds
    update_status_probability: u8,
}

impl SimulatedGarage {
    pub fn new(state: GarageState, latency: Duration, update_status_probability: u8) -> Self {
        Self {
            state,
            latency,
            update_status_probability: update_status_probability.min(100),
        }
    }

    pub fn from_settings(settings: &GarageSettings) -> Self {
        Self::new(
            GarageState::seeded(settings.car_ids.iter().cloned()),
            settings.latency(),
            settings.update_status_probability,
        )
    }

    pub fn state(&self) -> &GarageState {
        &self.state
    }

    async fn simulate_round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn status_update_succeeds(&self) -> bool {
        rand::rng().random_range(0..100u8) < self.update_status_probability
    }
}

#[async_trait]
impl GarageClient for SimulatedGarage {
    async fn list_cars(&self) -> GarageResult<Vec<Car>> {
        self.simulate_round_trip().await;
        Ok(self.state.cars())
    }

    async fn check(&self, car_id: &str) -> GarageResult<bool> {
        self.simulate_round_trip().await;
        self.state.with_car(car_id, |_| true)
    }

    async fn get_problems(&self, car_id: &str) -> GarageResult<Vec<String>> {
        self.simulate_round_trip().await;
        self.state.with_car(car_id, |car| car.problems.clone())
    }

    async fn add_problem(&self, car_id: &str, problem: &str) -> GarageResult<Vec<String>> {
        self.simulate_round_trip().await;
        self.state.with_car(car_id, |car| {
            car.problems.push(problem.to_string());
            car.problems.clone()
        })
    }

    async fn fix_problems(&self, car_id: &str) -> GarageResult<Vec<String>> {
        self.simulate_round_trip().await;
        self.state.with_car(car_id, |car| {
            car.problems.clear();
            car.problems.clone()
        })
    }

    async fn update_status(&self, car_id: &str) -> GarageResult<CarStatus> {
        self.simulate_round_trip().await;
        if !self.status_update_succeeds() {
            warn!(car_id = %car_id, "Simulated status update failure");
            return Err(GarageClientError::StatusUpdateFailed {
                car_id: car_id.to_string(),
            });
        }
        let status = self.state.with_car(car_id, |car| {
            car.status = CarStatus::for_problems(&car.problems);
            car.status
        })?;
        debug!(car_id = %car_id, status = %status, "Car status updated");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn garage(probability: u8) -> SimulatedGarage {
        SimulatedGarage::new(
            GarageState::seeded(["car_1", "car_2"]),
            Duration::ZERO,
            probability,
        )
    }

    #[tokio::test]
    async fn test_unknown_car_is_not_found() {
        let garage = garage(100);
        let err = garage.check("car_9").await.unwrap_err();
        assert_eq!(err, GarageClientError::car_not_found("car_9"));
        assert!(garage.get_problems("car_9").await.is_err());
        assert!(garage.add_problem("car_9", "flat tyre").await.is_err());
        assert!(garage.fix_problems("car_9").await.is_err());
    }

    #[tokio::test]
    async fn test_problem_lifecycle() {
        let garage = garage(100);
        assert!(garage.check("car_1").await.unwrap());
        assert_eq!(
            garage.add_problem("car_1", "brake noise").await.unwrap(),
            vec!["brake noise".to_string()]
        );
        assert_eq!(
            garage.update_status("car_1").await.unwrap(),
            CarStatus::UnderRepair
        );

        assert!(garage.fix_problems("car_1").await.unwrap().is_empty());
        assert_eq!(garage.update_status("car_1").await.unwrap(), CarStatus::Ok);
    }

    #[tokio::test]
    async fn test_zero_probability_always_fails() {
        let garage = garage(0);
        for _ in 0..20 {
            assert!(matches!(
                garage.update_status("car_1").await,
                Err(GarageClientError::StatusUpdateFailed { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_state_handle_is_shared() {
        let state = GarageState::seeded(["car_1"]);
        let garage = SimulatedGarage::new(state.clone(), Duration::ZERO, 100);
        garage.add_problem("car_1", "oil leak").await.unwrap();

        assert_eq!(state.car("car_1").unwrap().problems, vec!["oil leak"]);
        assert_eq!(garage.list_cars().await.unwrap().len(), 1);
    }
}
