//! Named workflows and the step lists they expand to.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::errors::WorkflowError;
use super::step::{quoted, GarageAction, Step, StepFactory};
use crate::constants::workflow_names::{CHECK, PROBLEM_ARG, SEND_FOR_REPAIR, SEND_TO_PARKING};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "workflow", rename_all = "snake_case")]
pub enum Workflow {
    /// Ping the car
    Check,
    /// Ping, record the problem around two inspections, refresh status
    SendForRepair { problem: String },
    /// Ping, clear problems around two inspections, refresh status
    SendToParking,
}

impl Workflow {
    /// Resolve a workflow by name; `-` and `_` are interchangeable, case is ignored
    pub fn from_request(
        name: &str,
        extra_args: &HashMap<String, String>,
    ) -> Result<Self, WorkflowError> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            CHECK => Ok(Self::Check),
            SEND_TO_PARKING => Ok(Self::SendToParking),
            SEND_FOR_REPAIR => extra_args
                .get(PROBLEM_ARG)
                .map(|problem| Self::SendForRepair {
                    problem: problem.clone(),
                })
                .ok_or(WorkflowError::MissingArgument {
                    workflow: SEND_FOR_REPAIR,
                    argument: PROBLEM_ARG,
                }),
            _ => Err(WorkflowError::UnknownWorkflow {
                name: name.to_string(),
            }),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Check => CHECK,
            Self::SendForRepair { .. } => SEND_FOR_REPAIR,
            Self::SendToParking => SEND_TO_PARKING,
        }
    }

    /// Task name recorded for a run against `car_id`
    pub fn task_name(&self, car_id: &str) -> String {
        let car = quoted(car_id);
        match self {
            Self::Check => format!("check {car}"),
            Self::SendForRepair { problem } => {
                format!("send car {car} for repair with problem {}", quoted(problem))
            }
            Self::SendToParking => format!("send car {car} to parking"),
        }
    }

    pub fn actions(&self) -> Vec<GarageAction> {
        match self {
            Self::Check => vec![GarageAction::Check],
            Self::SendForRepair { problem } => vec![
                GarageAction::Check,
                GarageAction::GetProblems,
                GarageAction::AddProblem {
                    problem: problem.clone(),
                },
                GarageAction::GetProblems,
                GarageAction::UpdateStatus,
            ],
            Self::SendToParking => vec![
                GarageAction::Check,
                GarageAction::GetProblems,
                GarageAction::FixProblems,
                GarageAction::GetProblems,
                GarageAction::UpdateStatus,
            ],
        }
    }

    pub fn steps(&self, car_id: &str, factory: &StepFactory) -> Vec<Step> {
        self.actions()
            .into_iter()
            .map(|action| factory.step(car_id, action))
            .collect()
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolves_names() {
        let none = HashMap::new();
        assert_eq!(Workflow::from_request("check", &none).unwrap(), Workflow::Check);
        assert_eq!(Workflow::from_request("CHECK", &none).unwrap(), Workflow::Check);
        assert_eq!(
            Workflow::from_request("send-to-parking", &none).unwrap(),
            Workflow::SendToParking
        );
        assert_eq!(
            Workflow::from_request("send_for_repair", &args(&[("problem", "brake noise")]))
                .unwrap(),
            Workflow::SendForRepair {
                problem: "brake noise".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_unknown_and_incomplete_requests() {
        let none = HashMap::new();
        assert!(matches!(
            Workflow::from_request("wash", &none),
            Err(WorkflowError::UnknownWorkflow { .. })
        ));
        let err = Workflow::from_request("send_for_repair", &none).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::MissingArgument {
                argument: "problem",
                ..
            }
        ));
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_task_names() {
        assert_eq!(Workflow::Check.task_name("car_1"), "check 'car_1'");
        assert_eq!(
            Workflow::SendForRepair {
                problem: "brake noise".to_string()
            }
            .task_name("car_1"),
            "send car 'car_1' for repair with problem 'brake noise'"
        );
        assert_eq!(
            Workflow::SendToParking.task_name("car_2"),
            "send car 'car_2' to parking"
        );
    }

    #[test]
    fn test_step_lists() {
        assert_eq!(Workflow::Check.actions().len(), 1);
        let names: Vec<_> = Workflow::SendToParking
            .actions()
            .iter()
            .map(GarageAction::name)
            .collect();
        assert_eq!(
            names,
            [
                "check",
                "get_problems",
                "fix_problems",
                "get_problems",
                "update_status"
            ]
        );
        assert_eq!(
            Workflow::SendForRepair {
                problem: "flat tire".to_string()
            }
            .actions()
            .len(),
            5
        );
    }
}
