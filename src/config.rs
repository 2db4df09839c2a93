/// Which physical link carries frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommMode {
    /// Nothing attached. Reads stay empty, writes vanish.
    Null,
    #[default]
    Hardware,
    Software,
}

pub const DEFAULT_POLL_INTERVAL_MS: u32 = 10;

/// Link settings decided at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub mode: CommMode,
    /// Minimum time between two receive passes. Zero polls on every call.
    pub poll_interval_ms: u32,
}

impl Config {
    pub const fn new() -> Config {
        Config {
            mode: CommMode::Hardware,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    pub const fn with_mode(mut self, mode: CommMode) -> Config {
        self.mode = mode;
        self
    }

    pub const fn with_poll_interval_ms(mut self, poll_interval_ms: u32) -> Config {
        self.poll_interval_ms = poll_interval_ms;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
