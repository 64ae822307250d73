use crate::error::Result;
use crate::types::{IntroKey, Nonce, SessionKeys};
use knock_packet::peer_test::PeerTestPacket;
use std::net::{IpAddr, SocketAddr};

/// How the transport should frame an outbound datagram.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Keying {
    /// Frame with the cipher and MAC keys of an established session.
    Session(SessionKeys),
    /// Frame with a peer's published introduction key.
    Intro(IntroKey),
}

/// An outbound peer-test datagram, ready for cryptographic framing and
/// transmission by the transport.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub dest: SocketAddr,
    pub keying: Keying,
    pub payload: Vec<u8>,
}

/// A validated inbound peer-test payload.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TestMessage {
    pub(crate) nonce: Nonce,
    /// The test port; 0 when absent.
    pub(crate) port: u16,
    /// The test IP; `None` when absent.
    pub(crate) ip: Option<IpAddr>,
    pub(crate) intro_key: IntroKey,
}

/// Parse an inbound peer-test payload.
pub(crate) fn parse(payload: &[u8]) -> Result<TestMessage> {
    let packet = PeerTestPacket::new_view(payload)?;
    Ok(TestMessage {
        nonce: Nonce(packet.get_nonce()),
        port: packet.get_port(),
        ip: packet.get_ip(),
        intro_key: IntroKey(packet.get_intro_key()),
    })
}

fn build(
    dest: SocketAddr,
    keying: Keying,
    nonce: Nonce,
    reflected: Option<SocketAddr>,
    intro_key: IntroKey,
) -> Result<Datagram> {
    let ip = reflected.map(|addr| addr.ip());
    let ip_len = match ip {
        None => 0,
        Some(IpAddr::V4(_)) => 4,
        Some(IpAddr::V6(_)) => 16,
    };
    let mut payload = vec![0_u8; PeerTestPacket::packet_size(ip_len)];
    let mut packet = PeerTestPacket::new(&mut payload)?;
    packet.set_nonce(nonce.0);
    packet.set_port(reflected.map_or(0, |addr| addr.port()));
    packet.set_ip(ip);
    packet.set_intro_key(intro_key.0);
    Ok(Datagram {
        dest,
        keying,
        payload,
    })
}

/// Alice's test request, to Bob (session-keyed) or to Charlie (intro-keyed).
///
/// Carries no reflected endpoint, only Alice's introduction key.
pub(crate) fn test_from_alice(
    dest: SocketAddr,
    keying: Keying,
    nonce: Nonce,
    alice_intro_key: IntroKey,
) -> Result<Datagram> {
    build(dest, keying, nonce, None, alice_intro_key)
}

/// Bob's recruitment of Charlie: Alice's observed endpoint and her
/// introduction key, framed with Charlie's session keys.
pub(crate) fn test_to_charlie(
    charlie_addr: SocketAddr,
    charlie_keys: SessionKeys,
    alice_addr: SocketAddr,
    alice_intro_key: IntroKey,
    nonce: Nonce,
) -> Result<Datagram> {
    build(
        charlie_addr,
        Keying::Session(charlie_keys),
        nonce,
        Some(alice_addr),
        alice_intro_key,
    )
}

/// Charlie's acknowledgement of participation back to Bob, framed with Bob's
/// session keys.
pub(crate) fn test_to_bob(
    bob_addr: SocketAddr,
    bob_keys: SessionKeys,
    alice_addr: SocketAddr,
    alice_intro_key: IntroKey,
    nonce: Nonce,
) -> Result<Datagram> {
    build(
        bob_addr,
        Keying::Session(bob_keys),
        nonce,
        Some(alice_addr),
        alice_intro_key,
    )
}

/// A reply to Alice reflecting her observed endpoint and carrying the
/// sender's introduction key, framed with Alice's introduction key.
pub(crate) fn test_to_alice(
    alice_addr: SocketAddr,
    alice_intro_key: IntroKey,
    sender_intro_key: IntroKey,
    nonce: Nonce,
) -> Result<Datagram> {
    build(
        alice_addr,
        Keying::Intro(alice_intro_key),
        nonce,
        Some(alice_addr),
        sender_intro_key,
    )
}
