//! Single-occupancy timer with generation tokens.
//!
//! Every arm or cancel bumps the generation, so a token handed out before the
//! bump can never claim the slot afterwards. This is what keeps a delay or
//! timeout that was scheduled before a response, break or level end from
//! mutating anything once it fires.

/// Handle for one scheduled deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deadline<K> {
    pub kind: K,
    pub due_ms: f64,
    pub token: TimerToken,
}

#[derive(Debug)]
pub struct TimerSlot<K> {
    generation: u64,
    armed: Option<Deadline<K>>,
}

impl<K: Copy + std::fmt::Debug> TimerSlot<K> {
    pub fn new() -> Self {
        Self {
            generation: 0,
            armed: None,
        }
    }

    /// Arms the slot, invalidating whatever was armed before.
    pub fn arm(&mut self, kind: K, due_ms: f64) -> TimerToken {
        self.generation += 1;
        let token = TimerToken(self.generation);
        if let Some(previous) = self.armed.replace(Deadline { kind, due_ms, token }) {
            tracing::trace!(kind = ?previous.kind, "timer replaced before firing");
        }
        token
    }

    /// Invalidates the armed deadline, if any.
    pub fn cancel(&mut self) -> Option<Deadline<K>> {
        self.generation += 1;
        self.armed.take()
    }

    pub fn armed(&self) -> Option<&Deadline<K>> {
        self.armed.as_ref()
    }

    pub fn is_live(&self, token: TimerToken) -> bool {
        self.armed.is_some_and(|d| d.token == token)
    }

    /// Callback path: takes the deadline only if `token` is still the live one.
    pub fn claim(&mut self, token: TimerToken) -> Option<Deadline<K>> {
        if self.is_live(token) {
            self.armed.take()
        } else {
            tracing::trace!(generation = token.0, "stale timer ignored");
            None
        }
    }

    /// Polling path: takes the deadline if it is due at `now_ms`.
    pub fn take_due(&mut self, now_ms: f64) -> Option<Deadline<K>> {
        match self.armed {
            Some(d) if d.due_ms <= now_ms => self.armed.take(),
            _ => None,
        }
    }
}

impl<K: Copy + std::fmt::Debug> Default for TimerSlot<K> {
    fn default() -> Self {
        Self::new()
    }
}
