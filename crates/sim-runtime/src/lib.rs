#![deny(warnings)]

//! The execution runtime: the host boundary, per-corp-kind `execute()`
//! drivers, the tick orchestrator, and telemetry projection. Everything
//! above this crate (`sim-core`, `sim-econ`, `sim-ai`) is pure planning
//! logic; this crate is where plans get carried out against a host, real
//! or mocked.

pub mod diagnostics;
pub mod entities;
pub mod execute;
pub mod host;
pub mod orchestrator;
pub mod planning;
pub mod telemetry;

pub use host::{Host, MockHost, ReturnCode};
pub use orchestrator::{execute_all, prune_corps, CpuBudget, Orchestrator, PhasePlan, TickReport};
