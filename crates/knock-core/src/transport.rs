use crate::types::{IntroKey, ReachabilityStatus, SessionKeys};
use crate::wire::Datagram;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

/// An established session with a remote peer.
#[derive(Debug, Clone, Copy)]
pub struct PeerSession {
    /// The current cipher and MAC keys for the session.
    pub keys: SessionKeys,
    /// When we last acknowledged traffic from this peer.
    pub last_ack_time: Option<Instant>,
    /// When we last sent to this peer.
    pub last_send_time: Option<Instant>,
}

/// A peer selected to act as the third party in a reachability test.
#[derive(Debug, Clone, Copy)]
pub struct TestPeer {
    /// The peer's UDP endpoint.
    pub addr: SocketAddr,
    /// The peer's published introduction key, if its address advertises one.
    pub intro_key: Option<IntroKey>,
    /// The current session keys for the peer.
    pub keys: SessionKeys,
}

/// The services the coordinator consumes from the owning UDP transport.
///
/// All calls are expected to be non-blocking: [`Transport::send`] is
/// fire-and-forget, and the lookups answer from in-memory state.
pub trait Transport: Send + Sync {
    /// Queue a datagram for transmission.
    fn send(&self, datagram: Datagram);

    /// Best current estimate of our public IP.
    fn external_ip(&self) -> IpAddr;

    /// Our long-lived introduction key.
    fn intro_key(&self) -> IntroKey;

    /// The established session with `addr`, if any.
    fn peer_session(&self, addr: SocketAddr) -> Option<PeerSession>;

    /// Select a test-capable peer not colocated with `exclude`.
    ///
    /// Returns `None` when no suitable peer (or no usable address for one)
    /// is known.
    fn pick_test_peer(&self, exclude: SocketAddr) -> Option<TestPeer>;

    /// Is `ip` publicly routable (not loopback, unspecified, multicast or
    /// reserved)?
    fn is_valid_ip(&self, ip: IpAddr) -> bool;

    /// Is `ip` on the local blocklist?
    fn is_blocklisted(&self, ip: IpAddr) -> bool;

    /// Deliver the final verdict of a locally-initiated test.
    fn set_reachability_status(&self, status: ReachabilityStatus);
}
