//! Size and online counters carried by contacts and groups.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One of the three counters of a counting node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Counter {
    /// Every descendant regardless of account state.
    Total,
    /// Descendants whose account is connected.
    Current,
    /// Descendants currently online.
    Online,
}

impl Counter {
    pub const ALL: [Counter; 3] = [Counter::Total, Counter::Current, Counter::Online];
}

/// Counters of a contact or group.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counts {
    pub total: u32,
    pub current: u32,
    pub online: u32,
}

impl Counts {
    pub fn get(&self, counter: Counter) -> u32 {
        match counter {
            Counter::Total => self.total,
            Counter::Current => self.current,
            Counter::Online => self.online,
        }
    }

    fn slot(&mut self, counter: Counter) -> &mut u32 {
        match counter {
            Counter::Total => &mut self.total,
            Counter::Current => &mut self.current,
            Counter::Online => &mut self.online,
        }
    }

    /// Apply `delta` to one counter and return `(old, new)`.
    ///
    /// Counters never go negative; an underflow is clamped and logged.
    pub(crate) fn change(&mut self, counter: Counter, delta: i32) -> (u32, u32) {
        let slot = self.slot(counter);
        let old = *slot;
        let new = i64::from(old) + i64::from(delta);
        if new < 0 {
            warn!(?counter, value = old, delta, "Counter underflow clamped to zero");
        }
        *slot = new.clamp(0, i64::from(u32::MAX)) as u32;
        (old, *slot)
    }

    /// What a contact with these counters contributes to its group: its
    /// whole total, and one per non-zero current/online counter.
    pub(crate) fn group_share(&self) -> Counts {
        Counts {
            total: self.total,
            current: u32::from(self.current > 0),
            online: u32::from(self.online > 0),
        }
    }

    pub(crate) fn apply(&mut self, share: Counts, sign: i32) {
        for counter in Counter::ALL {
            let amount = share.get(counter) as i32;
            if amount != 0 {
                self.change(counter, sign * amount);
            }
        }
    }

    /// `online <= current <= total`.
    pub fn is_ordered(&self) -> bool {
        self.online <= self.current && self.current <= self.total
    }
}

/// +1 when a counter moved off zero, -1 when it dropped to zero, else 0.
pub(crate) fn zero_edge(old: u32, new: u32) -> i32 {
    match (old == 0, new == 0) {
        (true, false) => 1,
        (false, true) => -1,
        _ => 0,
    }
}
