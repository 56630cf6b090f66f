use serde::{Deserialize, Serialize};
use std::fmt;

/// Service status of a car as reported by the garage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CarStatus {
    #[default]
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "under repair")]
    UnderRepair,
}

impl CarStatus {
    /// Status a car should carry given its outstanding problems
    pub fn for_problems(problems: &[String]) -> Self {
        if problems.is_empty() {
            Self::Ok
        } else {
            Self::UnderRepair
        }
    }
}

impl fmt::Display for CarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::UnderRepair => write!(f, "under repair"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub car_id: String,
    pub status: CarStatus,
    pub problems: Vec<String>,
}

impl Car {
    pub fn new(car_id: impl Into<String>) -> Self {
        Self {
            car_id: car_id.into(),
            status: CarStatus::Ok,
            problems: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_problems() {
        assert_eq!(CarStatus::for_problems(&[]), CarStatus::Ok);
        assert_eq!(
            CarStatus::for_problems(&["brake noise".to_string()]),
            CarStatus::UnderRepair
        );
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&CarStatus::UnderRepair).unwrap(),
            "\"under repair\""
        );
        assert_eq!(CarStatus::UnderRepair.to_string(), "under repair");
    }
}
