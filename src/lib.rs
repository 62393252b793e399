//! Cadence gate library.
//!
//! Infers pedaling cadence from CSC measurement notifications and keeps a
//! firewall rule enabled (blocked) unless the rider holds the cadence
//! above a threshold.  Exposes the pure-logic modules for integration
//! testing; the binary wires them to the simulation adapters.

#![deny(unused_must_use)]

// Links the host time driver that `async_io_mini::Timer` sleeps on.
use embassy_time as _;

pub mod adapters;
pub mod app;
pub mod config;
pub mod decision;
pub mod error;
pub mod fsm;
pub mod inbox;
pub mod safety;
pub mod sensors;
