//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements       | Connects to                     |
//! |--------------|------------------|---------------------------------|
//! | `sim_sensor` | SensorTransport  | Simulated CSC crank sensor      |
//! | `sim_gate`   | GatePort         | In-memory firewall controller   |
//! | `log_sink`   | EventSink        | `log` facade                    |
//! | `json_sink`  | EventSink        | JSON lines on any `io::Write`   |
//! | `time`       | Clock            | `std::time::Instant`            |

pub mod json_sink;
pub mod log_sink;
pub mod sim_gate;
pub mod sim_sensor;
pub mod time;
