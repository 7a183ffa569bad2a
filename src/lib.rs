//! BidSmith control core: vault transition, mission-control telemetry,
//! London intel with simulated fallback, and the bid ratification flow.

pub mod app_state;
pub mod bid;
pub mod config;
pub mod controller;
pub mod detail;
pub mod intel;
pub mod logging;
pub mod market;
pub mod mission_control;
pub mod nodes;
pub mod receipt;
pub mod tasks;
pub mod vault;
