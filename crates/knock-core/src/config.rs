use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default value for `max-relayed-per-test-alice`.
    ///
    /// Caps the packets Alice sends over the lifetime of one test.
    pub const DEFAULT_MAX_RELAYED_PER_TEST_ALICE: u32 = 9;

    /// The default value for `max-relayed-per-test-bob`.
    pub const DEFAULT_MAX_RELAYED_PER_TEST_BOB: u32 = 6;

    /// The default value for `max-relayed-per-test-charlie`.
    pub const DEFAULT_MAX_RELAYED_PER_TEST_CHARLIE: u32 = 6;

    /// The default value for `max-charlie-lifetime`.
    ///
    /// How long a helper (Bob or Charlie) record is kept before the one-shot
    /// removal timer reaps it.
    pub const DEFAULT_MAX_CHARLIE_LIFETIME: Duration = Duration::from_secs(15);

    /// The default value for `max-active-tests`.
    ///
    /// Caps the number of concurrent helper records.
    pub const DEFAULT_MAX_ACTIVE_TESTS: usize = 20;

    /// The default value for `max-per-ip`.
    pub const DEFAULT_MAX_PER_IP: u32 = 12;

    /// The default value for `throttle-clean-time`.
    pub const DEFAULT_THROTTLE_CLEAN_TIME: Duration = Duration::from_secs(600);

    /// The default value for `resend-timeout`.
    ///
    /// The base Alice retransmission interval; each retransmission backs off
    /// by a further second per packet already sent.
    pub const DEFAULT_RESEND_TIMEOUT: Duration = Duration::from_secs(4);

    /// The default value for `max-test-time`.
    ///
    /// The overall budget for one locally-initiated test.
    pub const DEFAULT_MAX_TEST_TIME: Duration = Duration::from_secs(30);

    /// The default value for `charlie-recent-period`.
    ///
    /// If we exchanged traffic with the chosen Charlie within this window our
    /// NAT will have a hole punched for him already and his packets prove
    /// nothing, so the test is abandoned.
    pub const DEFAULT_CHARLIE_RECENT_PERIOD: Duration = Duration::from_secs(600);
}

/// Coordinator configuration.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Config {
    /// Cap on packets Alice sends per test.
    pub max_relayed_per_test_alice: u32,
    /// Cap on packets Bob relays per test.
    pub max_relayed_per_test_bob: u32,
    /// Cap on packets Charlie relays per test.
    pub max_relayed_per_test_charlie: u32,
    /// TTL of a helper record in the active table.
    pub max_charlie_lifetime: Duration,
    /// Cap on concurrent helper records.
    pub max_active_tests: usize,
    /// Throttle threshold per remote IP.
    pub max_per_ip: u32,
    /// Throttle window length.
    pub throttle_clean_time: Duration,
    /// Base Alice retransmission interval.
    pub resend_timeout: Duration,
    /// Overall budget for one locally-initiated test.
    pub max_test_time: Duration,
    /// Window for the already-known-Charlie check.
    pub charlie_recent_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_relayed_per_test_alice: defaults::DEFAULT_MAX_RELAYED_PER_TEST_ALICE,
            max_relayed_per_test_bob: defaults::DEFAULT_MAX_RELAYED_PER_TEST_BOB,
            max_relayed_per_test_charlie: defaults::DEFAULT_MAX_RELAYED_PER_TEST_CHARLIE,
            max_charlie_lifetime: defaults::DEFAULT_MAX_CHARLIE_LIFETIME,
            max_active_tests: defaults::DEFAULT_MAX_ACTIVE_TESTS,
            max_per_ip: defaults::DEFAULT_MAX_PER_IP,
            throttle_clean_time: defaults::DEFAULT_THROTTLE_CLEAN_TIME,
            resend_timeout: defaults::DEFAULT_RESEND_TIMEOUT,
            max_test_time: defaults::DEFAULT_MAX_TEST_TIME,
            charlie_recent_period: defaults::DEFAULT_CHARLIE_RECENT_PERIOD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(9, config.max_relayed_per_test_alice);
        assert_eq!(6, config.max_relayed_per_test_bob);
        assert_eq!(6, config.max_relayed_per_test_charlie);
        assert_eq!(Duration::from_secs(15), config.max_charlie_lifetime);
        assert_eq!(20, config.max_active_tests);
        assert_eq!(12, config.max_per_ip);
        assert_eq!(Duration::from_secs(600), config.throttle_clean_time);
        assert_eq!(Duration::from_secs(4), config.resend_timeout);
        assert_eq!(Duration::from_secs(30), config.max_test_time);
        assert_eq!(Duration::from_secs(600), config.charlie_recent_period);
    }
}
