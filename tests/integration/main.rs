//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with a simulated
//! clock; no sensor or firewall controller is required.

mod mock_hw;
mod monitor_flow_tests;
mod startup_tests;
