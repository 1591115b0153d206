//! Production chains: ordered segments linking a terminal goal back to its
//! raw-resource roots (spec.md §3.6, §4.G).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::corp::ResourceKind;
use crate::market::Contract;

/// How long a funding contract stays open once issued (spec.md §4.G
/// "funding cadence").
pub const FUNDING_CONTRACT_TICKS: u64 = 1_500;

/// One link in a chain: a corp that consumes `input` and produces `output`
/// (spec.md §3.6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainSegment {
    pub corp_id: String,
    pub input: Option<ResourceKind>,
    pub output: ResourceKind,
    pub rate: f64,
    pub unit_cost: Decimal,
}

/// A terminal-to-root production chain (spec.md §3.6, §4.G). Segments are
/// ordered from the terminal (index 0) back to the raw root (last index),
/// mirroring how the planner constructs them backward from the goal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chain {
    pub id: String,
    pub goal: ResourceKind,
    pub segments: Vec<ChainSegment>,
    pub funded_through: usize,
    pub created_at: u64,
}

impl Chain {
    /// Sum of `unitCost * rate` across every segment (spec.md §4.G
    /// "totalCost"). Rate-weighting matches upstream segments scaling their
    /// throughput to feed more than one downstream consumer.
    pub fn total_cost(&self) -> Decimal {
        self.segments
            .iter()
            .fold(Decimal::ZERO, |acc, seg| acc + seg.unit_cost * Decimal::try_from(seg.rate).unwrap_or(Decimal::ZERO))
    }

    /// A chain is viable when every segment has a positive rate and the
    /// chain bottoms out at a root segment with no `input` (spec.md §4.G
    /// "viability").
    pub fn is_viable(&self) -> bool {
        if self.segments.is_empty() {
            return false;
        }
        let all_positive = self.segments.iter().all(|s| s.rate > 0.0);
        let roots = self.segments.last().map(|s| s.input.is_none()).unwrap_or(false);
        all_positive && roots
    }

    /// True once every segment has funding committed (spec.md §4.G
    /// "fundedThrough").
    pub fn is_fully_funded(&self) -> bool {
        self.funded_through >= self.segments.len()
    }

    /// The next unfunded segment, if any, walking from the terminal end
    /// inward since terminal segments are funded first (spec.md §4.G
    /// "funding order").
    pub fn next_unfunded(&self) -> Option<&ChainSegment> {
        self.segments.get(self.funded_through)
    }

    /// Advance the funding cursor by one segment, constructing the
    /// [`Contract`] that funds it from its upstream supplier (spec.md
    /// §4.G "Funding creates a contract"). The root segment has no
    /// upstream corp, so funding it still advances the cursor but
    /// returns `None`.
    pub fn fund_next(&mut self, now: u64) -> Option<Contract> {
        if self.is_fully_funded() {
            return None;
        }
        let segment = self.segments[self.funded_through].clone();
        let upstream = self.segments.get(self.funded_through + 1).cloned();
        self.funded_through += 1;

        let upstream = upstream?;
        let resource = segment.input.clone().unwrap_or_else(|| segment.output.clone());
        Some(Contract {
            id: format!("fund-{}-{}", self.id, self.funded_through - 1),
            seller_id: upstream.corp_id,
            buyer_id: segment.corp_id,
            resource,
            quantity: segment.rate * FUNDING_CONTRACT_TICKS as f64,
            unit_price: segment.unit_cost,
            duration: FUNDING_CONTRACT_TICKS,
            start_tick: now,
            delivered: 0.0,
            paid: Decimal::ZERO,
            travel_time: 0,
            max_creeps: 0,
            pending_requests: 0,
            claimed: 0,
            assigned_creep_ids: Vec::new(),
            creep_spec: None,
        })
    }

    /// The bottleneck throughput of the whole chain: the minimum segment
    /// rate (spec.md §4.G "effective output").
    pub fn effective_rate(&self) -> f64 {
        self.segments.iter().map(|s| s.rate).fold(f64::INFINITY, f64::min).max(0.0)
    }
}

/// Two chains compete when they share a root resource and the world cannot
/// fund both at full rate (spec.md §4.G "competition").
pub fn chains_compete(a: &Chain, b: &Chain) -> bool {
    match (a.segments.last(), b.segments.last()) {
        (Some(ra), Some(rb)) => ra.output == rb.output,
        _ => false,
    }
}
