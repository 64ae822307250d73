use thiserror::Error;

/// A coordinator error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A coordinator error.
///
/// Protocol-level failures (malformed payloads, missing peers, capacity
/// exhaustion, throttle hits) are deliberately *not* represented here: they
/// cause the offending packet to be dropped, a counter to be incremented and
/// a log line to be emitted.  This type surfaces only from construction and
/// from the wire codec.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid config: {0}")]
    BadConfig(String),
    #[error("invalid packet: {0}")]
    Packet(#[from] knock_packet::error::Error),
}
