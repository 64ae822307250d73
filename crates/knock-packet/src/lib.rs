//! Peer-test wire format parsing and building.
//!
//! The peer-test payload is the inner message exchanged by the three parties
//! of a reachability test.  It carries a test nonce, the reflected endpoint
//! of the party under test (which may be absent) and an introduction key:
//!
//! ```text
//! +--------+--------+--------+----------------+------------------+
//! | nonce  |  port  | ip_len |  ip (0/4/16)   | intro_key (32)   |
//! | u32    |  u16   |  u8    |                |                  |
//! +--------+--------+--------+----------------+------------------+
//! ```
//!
//! # Endianness
//!
//! The internal representation is held in network byte order (big-endian) and
//! all accessor methods take and return data in host byte order, converting as
//! necessary for the given architecture.
//!
//! # Example
//!
//! The following example parses a peer-test payload and asserts its fields:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use knock_packet::peer_test::PeerTestPacket;
//!
//! let buf = hex_literal::hex!(
//!     "00 bc 61 4e a0 f2 04 cb 00 71 05
//!      aa aa aa aa aa aa aa aa aa aa aa aa aa aa aa aa
//!      aa aa aa aa aa aa aa aa aa aa aa aa aa aa aa aa"
//! );
//! let packet = PeerTestPacket::new_view(&buf)?;
//! assert_eq!(12_345_678, packet.get_nonce());
//! assert_eq!(41202, packet.get_port());
//! assert_eq!(Some("203.0.113.5".parse()?), packet.get_ip());
//! assert_eq!([0xaa; 32], packet.get_intro_key());
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod buffer;

/// Packet errors.
pub mod error;


/// Format a payload as a hexadecimal string.
#[must_use]
pub fn fmt_payload(bytes: &[u8]) -> String {
    use itertools::Itertools as _;
    format!("{:02x}", bytes.iter().format(" "))
}
