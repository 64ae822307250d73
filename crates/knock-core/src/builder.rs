use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::timer::Timer;
use crate::transport::Transport;
use std::time::Duration;

/// A builder for creating instances of `Coordinator`.
///
/// The transport and timer are the two collaborators every deployment must
/// supply; the clock defaults to [`SystemClock`] and every protocol tunable
/// defaults to the values in [`crate::config::defaults`].
///
/// # Examples
///
/// ```no_run
/// # use knock_core::{Builder, ThreadTimer};
/// # fn build<T: knock_core::Transport>(transport: T) -> anyhow::Result<()> {
/// let (timer, _events) = ThreadTimer::spawn();
/// let _coordinator = Builder::new(transport, timer)
///     .max_active_tests(10)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Builder<T, M, C = SystemClock> {
    transport: T,
    timer: M,
    clock: C,
    config: Config,
}

impl<T: Transport, M: Timer> Builder<T, M> {
    /// Initializes a new `Builder` for the given transport and timer.
    #[must_use]
    pub fn new(transport: T, timer: M) -> Self {
        Self {
            transport,
            timer,
            clock: SystemClock,
            config: Config::default(),
        }
    }
}

impl<T: Transport, M: Timer, C: Clock> Builder<T, M, C> {
    /// Sets the clock deadlines are measured against.
    #[must_use]
    pub fn clock<D: Clock>(self, clock: D) -> Builder<T, M, D> {
        Builder {
            transport: self.transport,
            timer: self.timer,
            clock,
            config: self.config,
        }
    }

    /// Sets the whole configuration at once.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the cap on packets Alice sends per test.
    #[must_use]
    pub fn max_relayed_per_test_alice(mut self, cap: u32) -> Self {
        self.config.max_relayed_per_test_alice = cap;
        self
    }

    /// Sets the cap on packets Bob relays per test.
    #[must_use]
    pub fn max_relayed_per_test_bob(mut self, cap: u32) -> Self {
        self.config.max_relayed_per_test_bob = cap;
        self
    }

    /// Sets the cap on packets Charlie relays per test.
    #[must_use]
    pub fn max_relayed_per_test_charlie(mut self, cap: u32) -> Self {
        self.config.max_relayed_per_test_charlie = cap;
        self
    }

    /// Sets the TTL of a helper record in the active table.
    #[must_use]
    pub fn max_charlie_lifetime(mut self, lifetime: Duration) -> Self {
        self.config.max_charlie_lifetime = lifetime;
        self
    }

    /// Sets the cap on concurrent helper records.
    #[must_use]
    pub fn max_active_tests(mut self, cap: usize) -> Self {
        self.config.max_active_tests = cap;
        self
    }

    /// Sets the throttle threshold per remote IP.
    #[must_use]
    pub fn max_per_ip(mut self, cap: u32) -> Self {
        self.config.max_per_ip = cap;
        self
    }

    /// Sets the throttle window length.
    #[must_use]
    pub fn throttle_clean_time(mut self, window: Duration) -> Self {
        self.config.throttle_clean_time = window;
        self
    }

    /// Sets the base Alice retransmission interval.
    #[must_use]
    pub fn resend_timeout(mut self, timeout: Duration) -> Self {
        self.config.resend_timeout = timeout;
        self
    }

    /// Sets the overall budget for one locally-initiated test.
    #[must_use]
    pub fn max_test_time(mut self, budget: Duration) -> Self {
        self.config.max_test_time = budget;
        self
    }

    /// Sets the window for the already-known-Charlie check.
    #[must_use]
    pub fn charlie_recent_period(mut self, period: Duration) -> Self {
        self.config.charlie_recent_period = period;
        self
    }

    /// Validate the configuration and build the [`Coordinator`].
    pub fn build(self) -> Result<Coordinator<T, M, C>> {
        if self.config.max_active_tests == 0 {
            return Err(Error::BadConfig(String::from(
                "max_active_tests must be non-zero",
            )));
        }
        if self.config.max_per_ip == 0 {
            return Err(Error::BadConfig(String::from("max_per_ip must be non-zero")));
        }
        if self.config.resend_timeout.is_zero() {
            return Err(Error::BadConfig(String::from(
                "resend_timeout must be non-zero",
            )));
        }
        if self.config.max_test_time < self.config.resend_timeout {
            return Err(Error::BadConfig(String::from(
                "max_test_time must not be shorter than resend_timeout",
            )));
        }
        if self.config.max_charlie_lifetime.is_zero() {
            return Err(Error::BadConfig(String::from(
                "max_charlie_lifetime must be non-zero",
            )));
        }
        if self.config.throttle_clean_time.is_zero() {
            return Err(Error::BadConfig(String::from(
                "throttle_clean_time must be non-zero",
            )));
        }
        Ok(Coordinator::new(
            self.config,
            self.transport,
            self.timer,
            self.clock,
        ))
    }
}
