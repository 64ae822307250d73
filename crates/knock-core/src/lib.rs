//! Knock - a peer reachability testing library.
//!
//! This crate provides the collaborative reachability test used by the knock
//! UDP overlay transport.  A local node (role *Alice*) cooperates with two
//! remote nodes (*Bob* and *Charlie*) to discover whether unsolicited inbound
//! UDP reaches it, whether a symmetric NAT rewrites its source port per
//! destination, or whether a firewall eats inbound packets entirely.  The
//! same [`Coordinator`] answers for the Bob and Charlie half-protocols when
//! remote peers ask the local node for help.
//!
//! The coordinator is transport-agnostic: the owning transport supplies
//! packet IO, session and peer lookup, address validation and the verdict
//! sink through the [`Transport`] trait, a [`Timer`] fires the scheduled
//! [`TimerEvent`]s back into [`Coordinator::handle_timer`], and a [`Clock`]
//! provides monotonic time.  All three seams are plain traits so the whole
//! state machine can be driven deterministically in tests.
//!
//! # Example
//!
//! The following example starts a test against a chosen Bob and feeds timer
//! events back into the coordinator:
//!
//! ```no_run
//! # use knock_core::{Builder, SessionKey, SessionKeys, ThreadTimer, Transport};
//! # use std::sync::Arc;
//! # fn run<T: Transport + 'static>(transport: T) -> anyhow::Result<()> {
//! let (timer, events) = ThreadTimer::spawn();
//! let coordinator = Arc::new(Builder::new(transport, timer).build()?);
//!
//! let driver = Arc::clone(&coordinator);
//! std::thread::spawn(move || {
//!     for event in events {
//!         driver.handle_timer(event);
//!     }
//! });
//!
//! let bob_keys = SessionKeys {
//!     cipher: SessionKey([0; 32]),
//!     mac: SessionKey([1; 32]),
//! };
//! coordinator.run_test("203.0.113.5:9000".parse()?, bob_keys);
//! # Ok(())
//! # }
//! ```
//!
//! # See Also
//!
//! - [`Builder`] - Build a [`Coordinator`].
//! - [`Coordinator::run_test`] - Start a test as Alice.
//! - [`Coordinator::receive_test`] - Feed in a received test packet.
//! - [`Coordinator::handle_timer`] - Act on a due deadline.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::use_self,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc
)]
#![deny(unsafe_code)]

mod builder;
mod clock;
mod config;
mod constants;
mod coordinator;
mod error;
mod record;
mod ring;
mod stats;
mod table;
mod throttle;
mod timer;
mod transport;
mod types;
mod wire;

pub use builder::Builder;
pub use clock::{Clock, SystemClock};
pub use config::{defaults, Config};
pub use constants::MAX_RECENT_TESTS;
pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use stats::StatsSnapshot;
pub use timer::{ThreadTimer, Timer, TimerEvent};
pub use transport::{PeerSession, TestPeer, Transport};
pub use types::{
    IntroKey, Nonce, ReachabilityStatus, RelayCount, SessionKey, SessionKeys,
};
pub use wire::{Datagram, Keying};
