#![deny(warnings)]

//! Core domain models and invariants for the colony planning and
//! coordination engine.
//!
//! This crate defines serializable world/colony/corp/market/chain/bank
//! types used across the simulation, plus the validation helpers that
//! guarantee their structural invariants.

pub mod bank;
pub mod chain;
pub mod colony;
pub mod corp;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod market;

pub use bank::{CapitalAllocation, InvestmentContract};
pub use chain::{Chain, ChainSegment};
pub use colony::{Colony, ColonyStatus, Resources, World};
pub use corp::{CorpDetail, CorpKind, CorpState, CreepSpec, ResourceKind};
pub use error::{MarketError, ValidationError};
pub use geometry::{Peak, Position, RoomName};
pub use graph::{PeakCluster, WorldEdge, WorldGraph, WorldNode};
pub use market::{clear_offers, Contract, Offer, OfferSide, Transaction};
