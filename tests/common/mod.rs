//! Shared test fixtures: a scripted garage and a service harness.

#![allow(dead_code)]

pub mod strategies;

use async_trait::async_trait;
use garage_tasks::garage::{GarageClient, GarageClientError, GarageResult};
use garage_tasks::models::{Car, CarStatus, TaskWithMessages};
use garage_tasks::orchestration::{GarageTaskService, TokioDispatcher};
use garage_tasks::resilience::RetryPolicy;
use garage_tasks::store::{InMemoryTaskStore, TaskStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CHECK: &str = "check";
pub const GET_PROBLEMS: &str = "get_problems";
pub const ADD_PROBLEM: &str = "add_problem";
pub const FIX_PROBLEMS: &str = "fix_problems";
pub const UPDATE_STATUS: &str = "update_status";

/// Failures left to inject for one operation
#[derive(Debug, Clone, Copy)]
enum Failures {
    Times(u32),
    Always,
}

#[derive(Debug, Default)]
pub struct ScriptedGarageState {
    pub cars: HashMap<String, Car>,
    pub calls: HashMap<&'static str, u32>,
    failures: HashMap<&'static str, Failures>,
}

/// Garage fake that counts calls and fails on demand
#[derive(Debug, Clone, Default)]
pub struct ScriptedGarage {
    state: Arc<Mutex<ScriptedGarageState>>,
}

impl ScriptedGarage {
    pub fn with_cars(car_ids: &[&str]) -> Self {
        let garage = Self::default();
        {
            let mut state = garage.state.lock().unwrap();
            for car_id in car_ids {
                state.cars.insert(car_id.to_string(), Car::new(*car_id));
            }
        }
        garage
    }

    /// Fail the next `times` calls of `operation`
    pub fn failing(self, operation: &'static str, times: u32) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation, Failures::Times(times));
        self
    }

    pub fn always_failing(self, operation: &'static str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation, Failures::Always);
        self
    }

    pub fn calls(&self, operation: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.state.lock().unwrap().calls.values().sum()
    }

    pub fn problems(&self, car_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .cars
            .get(car_id)
            .map(|car| car.problems.clone())
            .unwrap_or_default()
    }

    fn call<T>(
        &self,
        operation: &'static str,
        car_id: &str,
        f: impl FnOnce(&mut Car) -> T,
    ) -> GarageResult<T> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(operation).or_insert(0) += 1;

        let injected = match state.failures.get_mut(operation) {
            Some(Failures::Always) => true,
            Some(Failures::Times(left)) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        };
        if injected {
            return Err(GarageClientError::StatusUpdateFailed {
                car_id: car_id.to_string(),
            });
        }

        state
            .cars
            .get_mut(car_id)
            .map(f)
            .ok_or_else(|| GarageClientError::car_not_found(car_id))
    }
}

#[async_trait]
impl GarageClient for ScriptedGarage {
    async fn list_cars(&self) -> GarageResult<Vec<Car>> {
        Ok(self.state.lock().unwrap().cars.values().cloned().collect())
    }

    async fn check(&self, car_id: &str) -> GarageResult<bool> {
        self.call(CHECK, car_id, |_| true)
    }

    async fn get_problems(&self, car_id: &str) -> GarageResult<Vec<String>> {
        self.call(GET_PROBLEMS, car_id, |car| car.problems.clone())
    }

    async fn add_problem(&self, car_id: &str, problem: &str) -> GarageResult<Vec<String>> {
        self.call(ADD_PROBLEM, car_id, |car| {
            car.problems.push(problem.to_string());
            car.problems.clone()
        })
    }

    async fn fix_problems(&self, car_id: &str) -> GarageResult<Vec<String>> {
        self.call(FIX_PROBLEMS, car_id, |car| {
            car.problems.clear();
            Vec::new()
        })
    }

    async fn update_status(&self, car_id: &str) -> GarageResult<CarStatus> {
        self.call(UPDATE_STATUS, car_id, |car| {
            car.status = CarStatus::for_problems(&car.problems);
            car.status
        })
    }
}

/// Service wired to a scripted garage, an in-memory store and a tokio dispatcher
pub struct Harness {
    pub garage: ScriptedGarage,
    pub store: Arc<InMemoryTaskStore>,
    pub dispatcher: Arc<TokioDispatcher>,
    pub service: GarageTaskService,
}

impl Harness {
    pub fn new(garage: ScriptedGarage) -> Self {
        Self::with_dispatcher(garage, TokioDispatcher::new(None))
    }

    /// Harness whose dispatcher refuses runs once `limit` are in flight
    pub fn rejecting(garage: ScriptedGarage, limit: usize) -> Self {
        Self::with_dispatcher(garage, TokioDispatcher::rejecting(limit))
    }

    fn with_dispatcher(garage: ScriptedGarage, dispatcher: TokioDispatcher) -> Self {
        let store = Arc::new(InMemoryTaskStore::new());
        let dispatcher = Arc::new(dispatcher);
        let service = GarageTaskService::new(
            Arc::new(garage.clone()),
            store.clone(),
            dispatcher.clone(),
            RetryPolicy::new(3),
            Duration::from_secs(5),
        );
        Self {
            garage,
            store,
            dispatcher,
            service,
        }
    }

    /// Wait for every run, then read the task back
    pub async fn finished(&self, task_id: i64) -> TaskWithMessages {
        self.dispatcher.wait_idle().await;
        self.service.task(task_id).await.unwrap()
    }
}

/// Task store handle usable where `Arc<dyn TaskStore>` is expected
pub fn memory_store() -> Arc<dyn TaskStore> {
    Arc::new(InMemoryTaskStore::new())
}
