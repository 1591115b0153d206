//! One `execute()` driver per corp kind (spec.md §4.I). Each driver reads
//! and mutates only its own corp's creeps against the [`Host`] boundary,
//! then records the economic consequences onto the corp's [`CorpState`].

pub mod bootstrap;
pub mod building;
pub mod hauling;
pub mod mining;
pub mod scout;
pub mod spawning;
pub mod upgrading;

use sim_core::corp::{CorpDetail, CorpState};

use crate::host::Host;

/// Dispatches to the matching per-kind driver based on `state.detail`.
///
/// `Spawning` and `Scout` are handled separately by the orchestrator: the
/// former needs an externally-collected request queue
/// (`spawning::collect_requests` / `spawning::execute`), the latter needs
/// the shared room-intel map (`scout::execute`'s 4th argument). Both are
/// wired in `Orchestrator::tick` instead of here.
pub fn execute(host: &mut dyn Host, state: &mut CorpState, now: u64) {
    match &state.detail {
        CorpDetail::Mining { .. } => mining::execute(host, state, now),
        CorpDetail::Hauling { .. } => hauling::execute(host, state, now),
        CorpDetail::Upgrading { .. } => upgrading::execute(host, state, now),
        CorpDetail::Building { .. } => building::execute(host, state, now),
        CorpDetail::Bootstrap { .. } => bootstrap::execute(host, state, now),
        CorpDetail::Scout { .. } | CorpDetail::Spawning { .. } => {}
    }
}
