use derive_more::{Add, AddAssign};
use std::fmt::{Debug, Display, Formatter};

/// `Nonce` newtype.
///
/// Identifies a single test series across all three parties.  The full
/// `u32` range is valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Nonce(pub u32);

impl Display for Nonce {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `RelayCount` newtype.
///
/// Counts the packets transmitted on behalf of a single test; monotone
/// non-decreasing and bounded by a role-specific cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Add, AddAssign)]
pub struct RelayCount(pub u32);

/// A long-lived introduction key.
///
/// Peers publish this key so that unacquainted peers can address packets to
/// them without an established session.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IntroKey(pub [u8; 32]);

impl Debug for IntroKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "IntroKey({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// A symmetric session key shared with an already-connected peer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SessionKey(pub [u8; 32]);

impl Debug for SessionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// The cipher and MAC keys of an established session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionKeys {
    pub cipher: SessionKey,
    pub mac: SessionKey,
}

/// The outcome of a reachability test.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ReachabilityStatus {
    /// Unsolicited inbound packets reach us on the address our peers see.
    Ok,
    /// Our peers see a different source port per destination (symmetric NAT).
    Different,
    /// Solicited replies arrive but unsolicited inbound packets do not
    /// (firewall or missing port forward).
    RejectUnsolicited,
    /// The test did not produce enough information to decide.
    Unknown,
}

impl Display for ReachabilityStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Different => write!(f, "different"),
            Self::RejectUnsolicited => write!(f, "reject-unsolicited"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
