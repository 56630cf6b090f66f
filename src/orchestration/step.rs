//! # Pipeline Steps
//!
//! A step is one garage call bound to a car, optionally wrapped in a retry policy.
//! Executing it yields either an outcome carrying the call result and the audit
//! message describing it, or a `StepError` carrying the failure message.
//!
//! Every call is bounded by the configured call timeout; an elapsed timeout is a
//! regular step failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use super::errors::StepError;
use crate::garage::{GarageClient, GarageClientError, GarageResult};
use crate::resilience::RetryPolicy;

/// The garage operation a step performs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GarageAction {
    Check,
    GetProblems,
    AddProblem { problem: String },
    FixProblems,
    UpdateStatus,
}

impl GarageAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::GetProblems => "get_problems",
            Self::AddProblem { .. } => "add_problem",
            Self::FixProblems => "fix_problems",
            Self::UpdateStatus => "update_status",
        }
    }

    /// Status updates fail transiently and run under the retry policy
    pub fn is_retried(&self) -> bool {
        matches!(self, Self::UpdateStatus)
    }

    fn failure_description(&self, car: &str) -> String {
        match self {
            Self::Check => format!("Error while trying to check car {car}!"),
            Self::GetProblems => format!("Error while trying to get problems of car {car}!"),
            Self::AddProblem { problem } => format!(
                "Error while trying to add problem {} to car {car}!",
                quoted(problem)
            ),
            Self::FixProblems => format!("Error while trying to fix problems of car {car}!"),
            Self::UpdateStatus => format!("Error while trying to update status of car {car}!"),
        }
    }
}

/// Successful step result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Call payload keyed by car id
    pub result: Value,
    pub description: String,
}

impl StepOutcome {
    fn new(car_id: &str, value: Value, description: String) -> Self {
        let mut result = Map::new();
        result.insert(car_id.to_string(), value);
        Self {
            result: Value::Object(result),
            description,
        }
    }
}

/// One unit of work in a pipeline
pub struct Step {
    car_id: String,
    action: GarageAction,
    client: Arc<dyn GarageClient>,
    call_timeout: Duration,
    retry: Option<RetryPolicy>,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("car_id", &self.car_id)
            .field("action", &self.action)
            .field("call_timeout", &self.call_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Step {
    pub fn new(
        car_id: impl Into<String>,
        action: GarageAction,
        client: Arc<dyn GarageClient>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            car_id: car_id.into(),
            action,
            client,
            call_timeout,
            retry: None,
        }
    }

    /// Re-run the call under `policy` until it succeeds or attempts run out
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn name(&self) -> &'static str {
        self.action.name()
    }

    pub fn action(&self) -> &GarageAction {
        &self.action
    }

    pub fn car_id(&self) -> &str {
        &self.car_id
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    pub async fn execute(&self) -> Result<StepOutcome, StepError> {
        match &self.retry {
            Some(policy) => policy
                .run(self.name(), || self.call_once())
                .await
                .map_err(|err| StepError::RetryExhausted {
                    description: self.failure_description(),
                    attempts: err.attempts(),
                    source: err.into_last_error(),
                }),
            None => self
                .call_once()
                .await
                .map_err(|source| StepError::Failed {
                    description: self.failure_description(),
                    source,
                }),
        }
    }

    fn failure_description(&self) -> String {
        self.action.failure_description(&quoted(&self.car_id))
    }

    async fn call_once(&self) -> GarageResult<StepOutcome> {
        let car_id = self.car_id.as_str();
        let car = quoted(car_id);
        let client = self.client.as_ref();

        let outcome = match &self.action {
            GarageAction::Check => {
                let exists = self.bounded(client.check(car_id)).await?;
                StepOutcome::new(car_id, Value::Bool(exists), format!("Ping {car}: Ok"))
            }
            GarageAction::GetProblems => {
                let problems = self.bounded(client.get_problems(car_id)).await?;
                let description = format!("Car {car} problems: {}", problem_list(&problems));
                StepOutcome::new(car_id, problems.into(), description)
            }
            GarageAction::AddProblem { problem } => {
                let problems = self.bounded(client.add_problem(car_id, problem)).await?;
                let description = format!(
                    "Car {car} problems after adding: {}",
                    problem_list(&problems)
                );
                StepOutcome::new(car_id, problems.into(), description)
            }
            GarageAction::FixProblems => {
                let problems = self.bounded(client.fix_problems(car_id)).await?;
                let description = format!(
                    "Car {car} problems after fixing: {}",
                    problem_list(&problems)
                );
                StepOutcome::new(car_id, problems.into(), description)
            }
            GarageAction::UpdateStatus => {
                let status = self.bounded(client.update_status(car_id)).await?;
                let description = format!("Car {car} status after update: {status}");
                StepOutcome::new(car_id, Value::String(status.to_string()), description)
            }
        };

        debug!(car_id, step = self.name(), "Garage call succeeded");
        Ok(outcome)
    }

    async fn bounded<T>(&self, call: impl Future<Output = GarageResult<T>>) -> GarageResult<T> {
        timeout(self.call_timeout, call)
            .await
            .map_err(|_| GarageClientError::Timeout {
                operation: self.name().to_string(),
                timeout_ms: u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }
}

/// Builds steps that share one client, timeout and retry policy
#[derive(Clone)]
pub struct StepFactory {
    client: Arc<dyn GarageClient>,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl StepFactory {
    pub fn new(client: Arc<dyn GarageClient>, retry: RetryPolicy, call_timeout: Duration) -> Self {
        Self {
            client,
            retry,
            call_timeout,
        }
    }

    pub fn step(&self, car_id: &str, action: GarageAction) -> Step {
        let retried = action.is_retried();
        let step = Step::new(car_id, action, Arc::clone(&self.client), self.call_timeout);
        if retried {
            step.with_retry(self.retry)
        } else {
            step
        }
    }
}

/// Quoted rendering of a value inside an audit message
///
/// Single quotes unless the value holds a `'` and no `"`. Backslashes, the
/// chosen quote and control characters are escaped.
pub(crate) fn quoted(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                out.push_str(&format!("\\x{:02x}", u32::from(c)));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn problem_list(problems: &[String]) -> String {
    let items: Vec<String> = problems.iter().map(String::as_str).map(quoted).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::garage::{GarageState, SimulatedGarage};
    use crate::models::Car;

    fn garage(probability: u8) -> Arc<dyn GarageClient> {
        let state = GarageState::seeded(["car_1"]);
        Arc::new(SimulatedGarage::new(state, Duration::ZERO, probability))
    }

    fn step(client: Arc<dyn GarageClient>, action: GarageAction) -> Step {
        Step::new("car_1", action, client, Duration::from_secs(1))
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quoted("car_1"), "'car_1'");
        assert_eq!(quoted("it's"), "\"it's\"");
        assert_eq!(quoted("say \"hi\" it's"), "'say \"hi\" it\\'s'");
        assert_eq!(quoted("a\\b'c"), "\"a\\\\b'c\"");
        assert_eq!(quoted("x\ny"), "'x\\ny'");
        assert_eq!(quoted("tab\there\r"), "'tab\\there\\r'");
        assert_eq!(quoted("bell\u{7}"), "'bell\\x07'");
        assert_eq!(problem_list(&[]), "[]");
        assert_eq!(
            problem_list(&["brake noise".to_string(), "flat tire".to_string()]),
            "['brake noise', 'flat tire']"
        );
    }

    #[tokio::test]
    async fn test_check_describes_ping() {
        let outcome = step(garage(100), GarageAction::Check)
            .execute()
            .await
            .unwrap();
        assert_eq!(outcome.description, "Ping 'car_1': Ok");
        assert_eq!(outcome.result, serde_json::json!({"car_1": true}));
    }

    #[tokio::test]
    async fn test_missing_car_fails_with_description() {
        let client = garage(100);
        let err = Step::new("car_9", GarageAction::Check, client, Duration::from_secs(1))
            .execute()
            .await
            .unwrap_err();
        assert_eq!(err.description(), "Error while trying to check car 'car_9'!");
        assert_eq!(err.attempts(), 1);
        assert!(matches!(
            err.garage_error(),
            GarageClientError::CarNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_add_problem_lists_problems() {
        let client = garage(100);
        let outcome = step(
            client,
            GarageAction::AddProblem {
                problem: "brake noise".to_string(),
            },
        )
        .execute()
        .await
        .unwrap();
        assert_eq!(
            outcome.description,
            "Car 'car_1' problems after adding: ['brake noise']"
        );
    }

    #[tokio::test]
    async fn test_update_status_retries_until_exhausted() {
        let err = step(garage(0), GarageAction::UpdateStatus)
            .with_retry(RetryPolicy::new(3))
            .execute()
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), 3);
        assert_eq!(
            err.description(),
            "Error while trying to update status of car 'car_1'!"
        );
    }

    #[tokio::test]
    async fn test_update_status_reports_status() {
        let state = GarageState::new();
        let mut car = Car::new("car_1");
        car.problems.push("oil leak".to_string());
        state.insert_car(car);
        let client: Arc<dyn GarageClient> =
            Arc::new(SimulatedGarage::new(state, Duration::ZERO, 100));

        let outcome = step(client, GarageAction::UpdateStatus)
            .execute()
            .await
            .unwrap();
        assert_eq!(
            outcome.description,
            "Car 'car_1' status after update: under repair"
        );
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let state = GarageState::seeded(["car_1"]);
        let client: Arc<dyn GarageClient> =
            Arc::new(SimulatedGarage::new(state, Duration::from_millis(200), 100));
        let err = Step::new("car_1", GarageAction::Check, client, Duration::from_millis(10))
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(
            err.garage_error(),
            GarageClientError::Timeout { timeout_ms: 10, .. }
        ));
    }

    #[test]
    fn test_factory_only_retries_status_updates() {
        let factory = StepFactory::new(garage(100), RetryPolicy::new(3), Duration::from_secs(1));
        assert!(factory.step("car_1", GarageAction::Check).retry_policy().is_none());
        assert_eq!(
            factory
                .step("car_1", GarageAction::UpdateStatus)
                .retry_policy()
                .map(|p| p.max_attempts()),
            Some(3)
        );
    }
}
