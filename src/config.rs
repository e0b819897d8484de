//! Timing configuration.
//!
//! Every duration is in milliseconds, measured against the monotonic clock the
//! host passes to [`Session::tick`](crate::Session::tick).

/// Timing constants for one session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// How long to stay quiet after boot before starting the handshake.
    pub init_timeout: u32,

    /// Settling pause before handshake steps that need one.
    pub handshake_delay: u32,

    /// Wait between the last handshake response and the first poll.
    pub first_poll_timeout: u32,

    /// How long to wait for the unit to answer the first poll before
    /// treating the handshake as finished anyway.
    pub handshake_end_timeout: u32,

    /// Interval between polls once the session is ready.
    pub poll_interval: u32,

    /// How long to wait for a response before resending a command.
    pub response_timeout: u32,

    /// Deadline, counted from boot, for reaching the ready state.
    pub init_fail_timeout: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            init_timeout: 10_000,
            handshake_delay: 3_000,
            first_poll_timeout: 650,
            handshake_end_timeout: 20_000,
            poll_interval: 30_000,
            response_timeout: 600,
            init_fail_timeout: 60_000,
        }
    }
}

impl Config {
    /// Start from the defaults and override individual timings.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for [`Config`].
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn init_timeout(mut self, ms: u32) -> Self {
        self.config.init_timeout = ms;
        self
    }

    pub fn handshake_delay(mut self, ms: u32) -> Self {
        self.config.handshake_delay = ms;
        self
    }

    pub fn first_poll_timeout(mut self, ms: u32) -> Self {
        self.config.first_poll_timeout = ms;
        self
    }

    pub fn handshake_end_timeout(mut self, ms: u32) -> Self {
        self.config.handshake_end_timeout = ms;
        self
    }

    pub fn poll_interval(mut self, ms: u32) -> Self {
        self.config.poll_interval = ms;
        self
    }

    pub fn response_timeout(mut self, ms: u32) -> Self {
        self.config.response_timeout = ms;
        self
    }

    pub fn init_fail_timeout(mut self, ms: u32) -> Self {
        self.config.init_fail_timeout = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Milliseconds from `since` to `now` on a wrapping `u32` clock.
pub(crate) fn elapsed(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_only_what_it_is_told() {
        let config = Config::builder().poll_interval(5_000).response_timeout(100).build();

        assert_eq!(config.poll_interval, 5_000);
        assert_eq!(config.response_timeout, 100);
        assert_eq!(config.init_timeout, Config::default().init_timeout);
        assert_eq!(config.init_fail_timeout, 60_000);
        assert_eq!(config.handshake_end_timeout, 20_000);

        let config = Config::builder().handshake_end_timeout(5_000).build();
        assert_eq!(config.handshake_end_timeout, 5_000);
    }

    #[test]
    fn elapsed_survives_clock_wrap() {
        assert_eq!(elapsed(5, u32::MAX - 4), 10);
        assert_eq!(elapsed(1_000, 400), 600);
    }
}
