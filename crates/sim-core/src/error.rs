//! Domain error types (spec.md §7 error taxonomy).

use thiserror::Error;

/// Invariant/precondition violations raised by the data model layer.
///
/// These are "precondition failures" in spec.md §7 terms: the caller is
/// expected to log once and treat the operation as a no-op for the tick,
/// never to unwind the whole orchestrator.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("invalid room name: {0}")]
    InvalidRoomName(String),
    #[error("unknown room: {0}")]
    UnknownRoom(String),
    #[error("edge {0} references unknown endpoint {1}")]
    DanglingEdgeEndpoint(String, String),
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(String),
    #[error("node {0} shares territory with node {1}")]
    OverlappingTerritory(String, String),
    #[error("adjacency asymmetry between {0} and {1}")]
    AsymmetricAdjacency(String, String),
    #[error("colony {0} graph is disconnected")]
    DisconnectedColony(String),
    #[error("node {0} maps to colony {1} but colony does not own it")]
    DanglingNodeToColony(String, String),
    #[error("colonies {0} and {1} share node {2}")]
    OverlappingColonyNodes(String, String, String),
}

/// Market-layer invariant violations (spec.md §3.5, §8.1 item 3).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum MarketError {
    #[error("delivered {delivered} exceeds quantity {quantity} on contract {contract_id}")]
    OverDelivered {
        contract_id: String,
        delivered: i64,
        quantity: i64,
    },
    #[error("paid {paid} exceeds price on contract {contract_id}")]
    OverPaid { contract_id: String, paid: String },
    #[error("assigned creeps {assigned} exceed maxCreeps {max} on contract {contract_id}")]
    TooManyAssigned {
        contract_id: String,
        assigned: u32,
        max: u32,
    },
    #[error("claimed {claimed} != pending {pending} + assigned {assigned} on contract {contract_id}")]
    ClaimedMismatch {
        contract_id: String,
        claimed: u32,
        pending: u32,
        assigned: u32,
    },
}
