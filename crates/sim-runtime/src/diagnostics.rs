//! Dedup-by-key logging: the host CPU/log budget is finite, so a
//! warning that would otherwise repeat every tick (e.g. "corp X has no
//! viable chain") logs once and then stays silent until the condition
//! clears.

use std::collections::BTreeMap;

use tracing::warn;

#[derive(Debug, Default)]
pub struct Diagnostics {
    last_seen: BTreeMap<String, u64>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// Logs `message` under `key` at most once per `cooldown` ticks.
    pub fn warn_once(&mut self, key: &str, now: u64, cooldown: u64, message: &str) {
        let due = match self.last_seen.get(key) {
            Some(last) => now.saturating_sub(*last) >= cooldown,
            None => true,
        };
        if due {
            warn!(key, message);
            self.last_seen.insert(key.to_string(), now);
        }
    }

    /// Clears a key's cooldown, e.g. once the condition it tracked has
    /// resolved, so the next occurrence logs immediately.
    pub fn clear(&mut self, key: &str) {
        self.last_seen.remove(key);
    }
}
