//! Offers and contracts, including call-option semantics for spawn
//! contracts (spec.md §3.5, §4.F).

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::corp::{CreepSpec, ResourceKind};
use crate::error::MarketError;
use crate::geometry::Position;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferSide {
    Buy,
    Sell,
}

/// An intent to trade a resource, posted by a corp (spec.md §3.5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub corp_id: String,
    pub side: OfferSide,
    pub resource: ResourceKind,
    pub quantity: f64,
    pub unit_price: Decimal,
    pub duration: u64,
    pub location: Position,
    pub creep_spec: Option<CreepSpec>,
}

/// Resources traded per tile of distance between counterparties (spec.md
/// §4.F "effective price"). Tunable, unit-priced in the same currency as
/// `unit_price`.
pub const DISTANCE_COST_PER_TILE: f64 = 0.01;

impl Offer {
    /// `unit ± distance * D_COST`: sells get more expensive with distance
    /// (cost to deliver), buys get cheaper (less willing to pay far away),
    /// so that nearer counterparties always clear first on a price tie
    /// (spec.md §4.F).
    pub fn effective_price(&self, counterparty_location: Position) -> f64 {
        let unit: f64 = self.unit_price.try_into().unwrap_or(0.0);
        let distance = self.location.chebyshev(&counterparty_location) as f64;
        match self.side {
            OfferSide::Sell => unit + distance * DISTANCE_COST_PER_TILE,
            OfferSide::Buy => unit - distance * DISTANCE_COST_PER_TILE,
        }
    }
}

/// An agreement between exactly one seller and one buyer corp (spec.md
/// §3.5). For spawn-capacity resources the contract is a call option: the
/// buyer requests creeps over time rather than receiving them up front
/// (spec.md §4.F "Contract option semantics").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub seller_id: String,
    pub buyer_id: String,
    pub resource: ResourceKind,
    pub quantity: f64,
    pub unit_price: Decimal,
    pub duration: u64,
    pub start_tick: u64,
    pub delivered: f64,
    pub paid: Decimal,
    pub travel_time: u64,
    pub max_creeps: u32,
    pub pending_requests: u32,
    pub claimed: u32,
    pub assigned_creep_ids: Vec<String>,
    pub creep_spec: Option<CreepSpec>,
}

impl Contract {
    pub fn price(&self) -> Decimal {
        self.unit_price * Decimal::try_from(self.quantity).unwrap_or(Decimal::ZERO)
    }

    /// `now < startTick + duration` and not yet fully delivered (spec.md
    /// §4.F "Contract status").
    pub fn is_active(&self, now: u64) -> bool {
        !self.is_complete() && now < self.start_tick + self.duration
    }

    pub fn is_complete(&self) -> bool {
        self.delivered >= self.quantity
    }

    /// Time-out without completion.
    pub fn is_expired(&self, now: u64) -> bool {
        !self.is_complete() && now >= self.start_tick + self.duration
    }

    /// Expired with less than half delivered.
    pub fn is_defaulted(&self, now: u64) -> bool {
        self.is_expired(now) && self.delivered < 0.5 * self.quantity
    }

    /// Remaining requestable option slots before `quantity`/`maxCreeps` is
    /// saturated (spec.md §8.3).
    pub fn available_slots(&self) -> u32 {
        let by_quantity = (self.quantity - self.claimed as f64).max(0.0) as u32;
        let by_max_creeps = self.max_creeps.saturating_sub(self.assigned_creep_ids.len() as u32);
        by_quantity.min(by_max_creeps)
    }

    pub fn can_request_creep(&self) -> bool {
        (self.claimed as f64) < self.quantity && self.assigned_creep_ids.len() < self.max_creeps as usize
    }

    /// Record a creep request: atomically increments `pendingRequests` and
    /// `claimed` (spec.md §4.F).
    pub fn request_creep(&mut self) -> bool {
        if !self.can_request_creep() {
            return false;
        }
        self.pending_requests += 1;
        self.claimed += 1;
        true
    }

    /// Called by the seller (SpawningCorp) once a requested creep has
    /// spawned: moves one pending request to assigned.
    pub fn fulfil_request(&mut self, creep_id: impl Into<String>) -> Result<(), MarketError> {
        if self.pending_requests == 0 {
            return Err(MarketError::ClaimedMismatch {
                contract_id: self.id.clone(),
                claimed: self.claimed,
                pending: self.pending_requests,
                assigned: self.assigned_creep_ids.len() as u32,
            });
        }
        self.pending_requests -= 1;
        self.assigned_creep_ids.push(creep_id.into());
        if self.assigned_creep_ids.len() as u32 > self.max_creeps {
            return Err(MarketError::TooManyAssigned {
                contract_id: self.id.clone(),
                assigned: self.assigned_creep_ids.len() as u32,
                max: self.max_creeps,
            });
        }
        Ok(())
    }

    /// How many replacement requests are needed this tick: one per assigned
    /// creep whose remaining TTL has dropped to `travelTime` or below,
    /// capped by available option slots minus already-pending requests
    /// (spec.md §4.F "replacementsNeeded").
    pub fn replacements_needed(&self, get_ttl: impl Fn(&str) -> u64) -> u32 {
        let dying = self
            .assigned_creep_ids
            .iter()
            .filter(|id| get_ttl(id) <= self.travel_time)
            .count() as u32;
        let available = self.available_slots().saturating_sub(self.pending_requests);
        dying.min(available)
    }

    /// Pay-as-you-go amount owed right now, never negative (spec.md §4.F
    /// "Payment").
    pub fn payment_due(&self) -> Decimal {
        if self.quantity <= 0.0 {
            return Decimal::ZERO;
        }
        let per_unit = self.price() / Decimal::try_from(self.quantity).unwrap_or(Decimal::ONE);
        let earned = per_unit * Decimal::try_from(self.delivered).unwrap_or(Decimal::ZERO);
        (earned - self.paid).max(Decimal::ZERO)
    }

    /// Record a delivery, clamping at the contracted quantity.
    pub fn record_delivery(&mut self, units: f64) {
        self.delivered = (self.delivered + units.max(0.0)).min(self.quantity);
    }

    /// Record a payment, clamping at the contract price.
    pub fn record_payment(&mut self, amount: Decimal) {
        self.paid = (self.paid + amount.max(Decimal::ZERO)).min(self.price());
    }

    pub fn validate(&self) -> Result<(), MarketError> {
        if self.delivered > self.quantity {
            return Err(MarketError::OverDelivered {
                contract_id: self.id.clone(),
                delivered: self.delivered as i64,
                quantity: self.quantity as i64,
            });
        }
        if self.paid > self.price() {
            return Err(MarketError::OverPaid {
                contract_id: self.id.clone(),
                paid: self.paid.to_string(),
            });
        }
        if self.assigned_creep_ids.len() as u32 > self.max_creeps {
            return Err(MarketError::TooManyAssigned {
                contract_id: self.id.clone(),
                assigned: self.assigned_creep_ids.len() as u32,
                max: self.max_creeps,
            });
        }
        let expected_claimed = self.pending_requests + self.assigned_creep_ids.len() as u32;
        if self.max_creeps > 0 && self.claimed != expected_claimed {
            return Err(MarketError::ClaimedMismatch {
                contract_id: self.id.clone(),
                claimed: self.claimed,
                pending: self.pending_requests,
                assigned: self.assigned_creep_ids.len() as u32,
            });
        }
        Ok(())
    }
}

/// A cleared match between a buy and a sell offer (spec.md §4.F step 4).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub seller_corp: String,
    pub buyer_corp: String,
    pub resource: ResourceKind,
    pub quantity: f64,
    pub clearing_price: Decimal,
    pub tick: u64,
}

/// Matches open buy/sell offers per resource and emits one [`Transaction`]
/// plus one spot [`Contract`] per cleared match (spec.md §4.F "Offer
/// clearing"):
/// 1. Group offers by resource.
/// 2. Sort sells ascending by unit price and buys descending, ties broken
///    by id for determinism.
/// 3. Walk both lists with two cursors, matching while the buyer's
///    effective price still covers the seller's.
/// 4. Clear `min(remaining buy qty, remaining sell qty)` at the midpoint
///    of the two effective prices.
/// 5. Advance whichever side is now exhausted; repeat until no match
///    clears.
pub fn clear_offers(offers: &[Offer], now: u64) -> (Vec<Transaction>, Vec<Contract>) {
    let mut by_resource: BTreeMap<ResourceKind, (Vec<&Offer>, Vec<&Offer>)> = BTreeMap::new();
    for offer in offers {
        let entry = by_resource.entry(offer.resource.clone()).or_default();
        match offer.side {
            OfferSide::Sell => entry.0.push(offer),
            OfferSide::Buy => entry.1.push(offer),
        }
    }

    let mut transactions = Vec::new();
    let mut contracts = Vec::new();
    let mut match_seq = 0u64;

    for (_, (mut sells, mut buys)) in by_resource {
        sells.sort_by(|a, b| a.unit_price.cmp(&b.unit_price).then_with(|| a.id.cmp(&b.id)));
        buys.sort_by(|a, b| b.unit_price.cmp(&a.unit_price).then_with(|| a.id.cmp(&b.id)));

        let mut remaining_sell: Vec<f64> = sells.iter().map(|o| o.quantity).collect();
        let mut remaining_buy: Vec<f64> = buys.iter().map(|o| o.quantity).collect();
        let mut si = 0usize;
        let mut bi = 0usize;

        while si < sells.len() && bi < buys.len() {
            if remaining_sell[si] <= 0.0 {
                si += 1;
                continue;
            }
            if remaining_buy[bi] <= 0.0 {
                bi += 1;
                continue;
            }
            let sell = sells[si];
            let buy = buys[bi];
            let sell_price = sell.effective_price(buy.location);
            let buy_price = buy.effective_price(sell.location);
            if buy_price < sell_price {
                break;
            }

            let quantity = remaining_sell[si].min(remaining_buy[bi]);
            remaining_sell[si] -= quantity;
            remaining_buy[bi] -= quantity;
            let clearing_price = Decimal::try_from((sell_price + buy_price) / 2.0).unwrap_or(Decimal::ZERO);

            transactions.push(Transaction {
                seller_corp: sell.corp_id.clone(),
                buyer_corp: buy.corp_id.clone(),
                resource: sell.resource.clone(),
                quantity,
                clearing_price,
                tick: now,
            });

            let creep_spec = sell.creep_spec.clone().or_else(|| buy.creep_spec.clone());
            let max_creeps = if creep_spec.is_some() { 1 } else { 0 };
            contracts.push(Contract {
                id: format!("match-{now}-{match_seq}"),
                seller_id: sell.corp_id.clone(),
                buyer_id: buy.corp_id.clone(),
                resource: sell.resource.clone(),
                quantity,
                unit_price: clearing_price,
                duration: sell.duration.min(buy.duration).max(1),
                start_tick: now,
                delivered: 0.0,
                paid: Decimal::ZERO,
                travel_time: sell.location.chebyshev(&buy.location) as u64,
                max_creeps,
                pending_requests: 0,
                claimed: 0,
                assigned_creep_ids: Vec::new(),
                creep_spec,
            });
            match_seq += 1;
        }
    }

    (transactions, contracts)
}
