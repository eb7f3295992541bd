use std::collections::{BTreeMap, HashMap};

/// Handle for cancelling a scheduled timer. Stays valid across repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

struct Entry<K> {
    token: TimerToken,
    key: K,
    period_ms: Option<u64>,
}

/// Tick-driven timer set. Deadlines are milliseconds on the game loop clock.
///
/// Nothing fires on its own: the owner calls [`Timers::poll`] from its tick and
/// handles each due key in deadline order. Timers sharing a deadline fire in the
/// order they were scheduled. After [`Timers::shutdown`] every poll is a no-op,
/// so a timer that outlives its match can never touch state.
pub struct Timers<K> {
    queue: BTreeMap<(u64, u64), Entry<K>>,
    index: HashMap<TimerToken, (u64, u64)>,
    next_seq: u64,
    next_token: u64,
    live: bool,
}

impl<K: Clone> Timers<K> {
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
            next_token: 1,
            live: true,
        }
    }

    /// Fire once at `deadline_ms`.
    pub fn schedule(&mut self, deadline_ms: u64, key: K) -> TimerToken {
        self.insert(deadline_ms, key, None)
    }

    /// Fire at `first_ms`, then every `period_ms` after the previous deadline.
    pub fn schedule_every(&mut self, first_ms: u64, period_ms: u64, key: K) -> TimerToken {
        self.insert(first_ms, key, Some(period_ms.max(1)))
    }

    fn insert(&mut self, deadline_ms: u64, key: K, period_ms: Option<u64>) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        if !self.live {
            return token;
        }
        let slot = (deadline_ms, self.next_seq);
        self.next_seq += 1;
        self.queue.insert(
            slot,
            Entry {
                token,
                key,
                period_ms,
            },
        );
        self.index.insert(token, slot);
        token
    }

    /// Returns true if the timer was still pending.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        match self.index.remove(&token) {
            Some(slot) => self.queue.remove(&slot).is_some(),
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.index.contains_key(&token)
    }

    /// Pop the earliest timer due at or before `now_ms`, returning its deadline and key.
    /// Repeating timers are re-armed before returning.
    pub fn poll(&mut self, now_ms: u64) -> Option<(u64, K)> {
        if !self.live {
            return None;
        }
        let (&slot, _) = self.queue.iter().next()?;
        if slot.0 > now_ms {
            return None;
        }
        let entry = self.queue.remove(&slot)?;
        self.index.remove(&entry.token);
        let deadline = slot.0;
        if let Some(period) = entry.period_ms {
            let next = (deadline + period, self.next_seq);
            self.next_seq += 1;
            self.index.insert(entry.token, next);
            self.queue.insert(
                next,
                Entry {
                    token: entry.token,
                    key: entry.key.clone(),
                    period_ms: entry.period_ms,
                },
            );
        }
        Some((deadline, entry.key))
    }

    #[cfg(test)]
    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.keys().next().map(|slot| slot.0)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Cancel everything and refuse further work.
    pub fn shutdown(&mut self) {
        self.live = false;
        self.queue.clear();
        self.index.clear();
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

impl<K: Clone> Default for Timers<K> {
    fn default() -> Self {
        Self::new()
    }
}
