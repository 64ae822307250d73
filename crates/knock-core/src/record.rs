use crate::types::{IntroKey, Nonce, RelayCount, SessionKeys};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

/// Our role in a single test.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Role {
    /// The party whose reachability is under test.
    Alice,
    /// The coordinator Alice picked.
    Bob,
    /// The third party Bob recruited.
    Charlie,
}

/// Per-nonce state for one test, in any role.
///
/// A single record type serves all three roles; which fields are populated
/// depends on the role and on how far the exchange has progressed.  Receive
/// timestamps of `None` mean the corresponding party has never been heard
/// from.
#[derive(Debug)]
pub(crate) struct TestRecord {
    pub(crate) nonce: Nonce,
    pub(crate) role: Role,
    pub(crate) begin_time: Instant,
    pub(crate) last_send_time: Instant,
    pub(crate) receive_alice_time: Option<Instant>,
    pub(crate) receive_bob_time: Option<Instant>,
    pub(crate) receive_charlie_time: Option<Instant>,
    /// Alice's endpoint as seen by Bob (reflected to Alice in Bob's reply).
    pub(crate) alice_ip: Option<IpAddr>,
    pub(crate) alice_port: Option<u16>,
    /// Alice's endpoint as seen by Charlie (reflected in his second packet).
    pub(crate) alice_ip_from_charlie: Option<IpAddr>,
    pub(crate) alice_port_from_charlie: Option<u16>,
    /// Alice's introduction key (helper roles only).
    pub(crate) alice_intro_key: Option<IntroKey>,
    pub(crate) bob_addr: Option<SocketAddr>,
    pub(crate) bob_keys: Option<SessionKeys>,
    pub(crate) charlie_addr: Option<SocketAddr>,
    pub(crate) charlie_intro_key: Option<IntroKey>,
    packets_relayed: RelayCount,
}

impl TestRecord {
    pub(crate) fn new(role: Role, nonce: Nonce, now: Instant) -> Self {
        Self {
            nonce,
            role,
            begin_time: now,
            last_send_time: now,
            receive_alice_time: None,
            receive_bob_time: None,
            receive_charlie_time: None,
            alice_ip: None,
            alice_port: None,
            alice_ip_from_charlie: None,
            alice_port_from_charlie: None,
            alice_intro_key: None,
            bob_addr: None,
            bob_keys: None,
            charlie_addr: None,
            charlie_intro_key: None,
            packets_relayed: RelayCount(0),
        }
    }

    /// Increment and return the relay counter.
    pub(crate) fn increment_packets_relayed(&mut self) -> RelayCount {
        self.packets_relayed += RelayCount(1);
        self.packets_relayed
    }

    #[cfg(test)]
    pub(crate) const fn packets_relayed(&self) -> RelayCount {
        self.packets_relayed
    }

    /// Alice's endpoint as seen by Bob, if both halves are known.
    pub(crate) fn alice_addr(&self) -> Option<SocketAddr> {
        Some(SocketAddr::new(self.alice_ip?, self.alice_port?))
    }

    /// Has this record outlived the overall test budget?
    pub(crate) fn is_expired(&self, now: Instant, budget: Duration) -> bool {
        self.begin_time + budget < now
    }
}
