//! # Constants
//!
//! Defaults shared by configuration, the simulated garage and the read side.

use std::time::Duration;

/// Attempts made by the status-update retry policy before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Chance, in percent, that a simulated status update succeeds
pub const DEFAULT_UPDATE_STATUS_PROBABILITY: u8 = 70;

/// Simulated round trip of every garage call
pub const DEFAULT_GARAGE_LATENCY: Duration = Duration::from_millis(1000);

/// Upper bound on a single garage call inside a step
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest page the read side will return
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Cars present in a freshly seeded simulated garage
pub const DEFAULT_CAR_IDS: [&str; 4] = ["car_1", "car_2", "car_3", "car_4"];

pub const DEFAULT_DATABASE_URL: &str = "sqlite://garage.db";

/// Database url selecting the in-memory task store
pub const MEMORY_DATABASE_URL: &str = "memory";

pub mod workflow_names {
    pub const CHECK: &str = "check";
    pub const SEND_FOR_REPAIR: &str = "send_for_repair";
    pub const SEND_TO_PARKING: &str = "send_to_parking";

    /// Extra argument carrying the problem text for `send_for_repair`
    pub const PROBLEM_ARG: &str = "problem";
}

pub mod markers {
    pub const START: &str = "Start";
    pub const END: &str = "End";
}
