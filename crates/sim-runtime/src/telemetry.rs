//! Telemetry projection: the fixed set of 7 JSON segments a tick
//! snapshot is split into, so a dashboard can subscribe to just the
//! segments it renders instead of parsing one monolithic blob (spec.md
//! §6.1 "Raw segments", §6.4).

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::corp::{CorpKind, CorpState};
use sim_econ::{EquilibriumStatus, GraphMetrics};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColonySummarySegment {
    pub colony_id: String,
    pub tick: u64,
    pub corp_count: usize,
    pub total_balance: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorpLedgerSegment {
    pub corps: Vec<CorpLedgerEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorpLedgerEntry {
    pub id: String,
    pub kind: CorpKind,
    pub balance: Decimal,
    pub roi: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketSegment {
    pub open_offer_count: usize,
    pub open_contract_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainSegment {
    pub active_chain_count: usize,
    pub fully_funded_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphSegment {
    pub metrics: Option<GraphMetrics>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EquilibriumSegment {
    pub status: EquilibriumStatus,
    pub supply: f64,
    pub demand: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CpuSegment {
    pub cpu_used: f64,
    pub cpu_bucket: f64,
    pub skipped_chain_planning: bool,
    pub skipped_metrics: bool,
    pub skipped_graph_rebuild: bool,
}

/// The full tick snapshot: exactly the 7 named segments, serialized
/// independently so each can be written to its own telemetry channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub colony_summary: ColonySummarySegment,
    pub corp_ledger: CorpLedgerSegment,
    pub market: MarketSegment,
    pub chains: ChainSegment,
    pub graph: GraphSegment,
    pub equilibrium: EquilibriumSegment,
    pub cpu: CpuSegment,
}

impl TelemetrySnapshot {
    /// One independent JSON document per segment, keyed by segment name,
    /// matching how a dashboard subscribes to segments individually.
    pub fn to_segments(&self) -> Result<BTreeMap<&'static str, String>, serde_json::Error> {
        let mut out = BTreeMap::new();
        out.insert("colony_summary", serde_json::to_string(&self.colony_summary)?);
        out.insert("corp_ledger", serde_json::to_string(&self.corp_ledger)?);
        out.insert("market", serde_json::to_string(&self.market)?);
        out.insert("chains", serde_json::to_string(&self.chains)?);
        out.insert("graph", serde_json::to_string(&self.graph)?);
        out.insert("equilibrium", serde_json::to_string(&self.equilibrium)?);
        out.insert("cpu", serde_json::to_string(&self.cpu)?);
        Ok(out)
    }
}

pub fn corp_ledger(corps: &BTreeMap<String, CorpState>) -> CorpLedgerSegment {
    CorpLedgerSegment {
        corps: corps
            .values()
            .map(|c| CorpLedgerEntry { id: c.id.clone(), kind: c.kind(), balance: c.balance, roi: c.actual_roi() })
            .collect(),
    }
}

pub fn colony_summary(colony_id: impl Into<String>, tick: u64, corps: &BTreeMap<String, CorpState>) -> ColonySummarySegment {
    ColonySummarySegment {
        colony_id: colony_id.into(),
        tick,
        corp_count: corps.len(),
        total_balance: corps.values().map(|c| c.balance).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::corp::CorpDetail;

    #[test]
    fn segments_serialize_independently() {
        let mut corps = BTreeMap::new();
        corps.insert(
            "c1".to_string(),
            CorpState::new("c1", "n1", CorpDetail::Bootstrap { jack_creep_ids: vec![] }, 0),
        );
        let snapshot = TelemetrySnapshot {
            colony_summary: colony_summary("colony-1", 10, &corps),
            corp_ledger: corp_ledger(&corps),
            market: MarketSegment { open_offer_count: 0, open_contract_count: 0 },
            chains: ChainSegment { active_chain_count: 0, fully_funded_count: 0 },
            graph: GraphSegment { metrics: None },
            equilibrium: EquilibriumSegment { status: EquilibriumStatus::Balanced, supply: 0.0, demand: 0.0 },
            cpu: CpuSegment { cpu_used: 1.0, cpu_bucket: 9000.0, skipped_chain_planning: false, skipped_metrics: false, skipped_graph_rebuild: false },
        };
        let segments = snapshot.to_segments().unwrap();
        assert_eq!(segments.len(), 7);
        assert!(segments["colony_summary"].contains("colony-1"));
    }
}
