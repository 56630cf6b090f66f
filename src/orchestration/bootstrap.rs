//! # Bootstrap
//!
//! Wires configuration into a running engine: task store, simulated garage,
//! dispatcher and the service facade on top of them.

use std::sync::Arc;
use tracing::info;

use super::dispatcher::TokioDispatcher;
use super::service::GarageTaskService;
use crate::config::GarageConfig;
use crate::error::Result;
use crate::garage::SimulatedGarage;
use crate::store;

/// Handle on a bootstrapped engine
pub struct GarageSystem {
    config: GarageConfig,
    garage: Arc<SimulatedGarage>,
    dispatcher: Arc<TokioDispatcher>,
    service: GarageTaskService,
}

impl GarageSystem {
    /// Validate `config` and build every component it describes
    pub async fn bootstrap(config: GarageConfig) -> Result<Self> {
        config.validate()?;

        let store = store::connect(&config.database).await?;
        let garage = Arc::new(SimulatedGarage::from_settings(&config.garage));
        let dispatcher = Arc::new(TokioDispatcher::from_config(&config.dispatcher));

        let service = GarageTaskService::new(
            garage.clone(),
            store,
            dispatcher.clone(),
            config.retry.policy(),
            config.garage.call_timeout(),
        );

        info!(
            database = %config.database.url,
            cars = config.garage.car_ids.len(),
            max_attempts = config.retry.max_attempts,
            max_in_flight = ?dispatcher.limit(),
            "🚗 Garage task engine ready"
        );

        Ok(Self {
            config,
            garage,
            dispatcher,
            service,
        })
    }

    pub fn service(&self) -> &GarageTaskService {
        &self.service
    }

    pub fn garage(&self) -> &SimulatedGarage {
        &self.garage
    }

    pub fn dispatcher(&self) -> &TokioDispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &GarageConfig {
        &self.config
    }

    /// Let every scheduled run finish
    pub async fn shutdown(&self) {
        let in_flight = self.dispatcher.active_runs();
        if in_flight > 0 {
            info!(in_flight, "Waiting for pipeline runs to finish");
        }
        self.dispatcher.wait_idle().await;
        info!("🛑 Garage task engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationError;
    use crate::error::GarageError;
    use crate::state_machine::TaskStatus;

    #[tokio::test]
    async fn test_bootstrap_for_testing() {
        let system = GarageSystem::bootstrap(GarageConfig::for_testing())
            .await
            .unwrap();
        let cars = system.service().cars().await.unwrap();
        assert_eq!(cars.len(), system.config().garage.car_ids.len());

        let task = system.service().check_car("car_1").await.unwrap();
        system.shutdown().await;

        let audit = system.service().task(task.task_id).await.unwrap();
        assert!(audit.task.is_finished());
    }

    #[tokio::test]
    async fn test_runs_beyond_the_default_bound_all_finish() {
        let mut config = GarageConfig::for_testing();
        config.garage.latency_ms = 20;
        let limit = config.dispatcher.max_in_flight;
        let system = GarageSystem::bootstrap(config).await.unwrap();

        let mut ids = Vec::new();
        for _ in 0..=limit {
            ids.push(system.service().check_car("car_1").await.unwrap().task_id);
        }
        system.shutdown().await;

        for id in ids {
            let audit = system.service().task(id).await.unwrap();
            assert_eq!(audit.task.status, TaskStatus::Completed);
            assert_eq!(audit.messages.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_invalid_config() {
        let mut config = GarageConfig::for_testing();
        config.retry.max_attempts = 0;
        let err = GarageSystem::bootstrap(config).await.err().unwrap();
        assert!(matches!(
            err,
            GarageError::Configuration(ConfigurationError::InvalidValue { .. })
        ));
    }
}
