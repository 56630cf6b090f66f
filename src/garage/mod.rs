//! # Garage Adapter
//!
//! The external garage service as seen by the engine: five vehicle operations plus
//! the car catalogue. Every call either returns a typed payload or fails with a
//! `GarageClientError`; there is no partial outcome.
//!
//! `SimulatedGarage` is the in-process implementation. Its vehicle data lives in
//! an explicit `GarageState` handle owned by whoever builds the client.

pub mod client;
pub mod simulated;

pub use client::{GarageClient, GarageClientError, GarageResult};
pub use simulated::{GarageState, SimulatedGarage};
