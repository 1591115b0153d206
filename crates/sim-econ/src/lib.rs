#![deny(warnings)]

//! Economic models: pricing, source analysis, the flow planner, and
//! read-only structural/market metrics.

pub mod constants;
pub mod flow;
pub mod metrics;
pub mod pricing;
pub mod source_analysis;

pub use flow::{plan_flow, FlowSolution, HaulerAssignment, MinerAssignment, SinkAllocation, SinkInput, SinkKind, SourceInput};
pub use metrics::{chain_report, compute_graph_metrics, equilibrium_status, ChainReport, EquilibriumStatus, GraphMetrics};
pub use pricing::{margin, price};
pub use source_analysis::{count_mining_spots, SourceAnalysis, SourceAnalysisCache};
