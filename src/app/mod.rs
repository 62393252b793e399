//! Application core: domain logic behind port traits.
//!
//! This module contains the business rules for the cadence gate:
//! FSM orchestration, link supervision, and gate decisions.
//! All interaction with the sensor and the firewall happens through
//! **port traits** defined in [`ports`], keeping this layer fully
//! testable without a radio or a network.

pub mod events;
pub mod ports;
pub mod runner;
pub mod service;
