/// The maximum number of recent locally-initiated test nonces remembered.
///
/// Replies that straggle in after a local test has completed are recognised
/// against this ring rather than being mistaken for new helper duties, and
/// spoofed traffic cannot revive a completed nonce.  Lookup is linear but the
/// ring is small.
pub const MAX_RECENT_TESTS: usize = 40;
