/// Free running millisecond counter. Allowed to wrap.
pub trait Clock {
    fn now_ms(&mut self) -> u32;
}

impl<F: FnMut() -> u32> Clock for F {
    fn now_ms(&mut self) -> u32 {
        self()
    }
}

/// Elapsed-time gate for the main loop.
///
/// Fires at most once per `period_ms` and remembers how long the last
/// interval actually was. All arithmetic wraps with the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticker {
    period_ms: u32,
    last_ms: u32,
    delta_ms: u32,
}

impl Ticker {
    pub fn new(period_ms: u32, now_ms: u32) -> Ticker {
        Ticker {
            period_ms,
            last_ms: now_ms,
            delta_ms: 0,
        }
    }

    pub fn init(&mut self, now_ms: u32) {
        self.last_ms = now_ms;
        self.delta_ms = 0;
    }

    pub fn is_due(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_ms) >= self.period_ms
    }

    /// Advance if due, returning the time since the previous tick.
    pub fn update(&mut self, now_ms: u32) -> Option<u32> {
        if !self.is_due(now_ms) {
            return None;
        }
        self.delta_ms = now_ms.wrapping_sub(self.last_ms);
        self.last_ms = now_ms;
        Some(self.delta_ms)
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    pub fn last_ms(&self) -> u32 {
        self.last_ms
    }

    /// Length of the last completed interval
    pub fn delta_ms(&self) -> u32 {
        self.delta_ms
    }
}
