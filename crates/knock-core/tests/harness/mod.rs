#![allow(dead_code)]

use knock_core::{
    Builder, Clock, Config, Coordinator, Datagram, IntroKey, Keying, PeerSession,
    ReachabilityStatus, SessionKey, SessionKeys, TestPeer, Timer, TimerEvent, Transport,
};
use knock_packet::peer_test::PeerTestPacket;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

static TRACING: OnceLock<()> = OnceLock::new();

/// Install a subscriber once so `RUST_LOG` filters test output.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// A scripted transport: records everything sent and answers lookups from
/// data the test primed it with.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<TransportInner>,
}

struct TransportInner {
    external_ip: IpAddr,
    intro_key: IntroKey,
    sent: Mutex<Vec<Datagram>>,
    sessions: Mutex<HashMap<SocketAddr, PeerSession>>,
    test_peer: Mutex<Option<TestPeer>>,
    blocklist: Mutex<HashSet<IpAddr>>,
    statuses: Mutex<Vec<ReachabilityStatus>>,
}

impl MockTransport {
    pub fn new(external_ip: IpAddr) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                external_ip,
                intro_key: IntroKey([0xCC; 32]),
                sent: Mutex::new(Vec::new()),
                sessions: Mutex::new(HashMap::new()),
                test_peer: Mutex::new(None),
                blocklist: Mutex::new(HashSet::new()),
                statuses: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn local_intro_key(&self) -> IntroKey {
        self.inner.intro_key
    }

    pub fn sent(&self) -> Vec<Datagram> {
        self.inner.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.inner.sent.lock().len()
    }

    pub fn statuses(&self) -> Vec<ReachabilityStatus> {
        self.inner.statuses.lock().clone()
    }

    pub fn add_session(&self, addr: SocketAddr, session: PeerSession) {
        self.inner.sessions.lock().insert(addr, session);
    }

    pub fn set_test_peer(&self, peer: Option<TestPeer>) {
        *self.inner.test_peer.lock() = peer;
    }

    pub fn block(&self, ip: IpAddr) {
        self.inner.blocklist.lock().insert(ip);
    }
}

impl Transport for MockTransport {
    fn send(&self, datagram: Datagram) {
        self.inner.sent.lock().push(datagram);
    }

    fn external_ip(&self) -> IpAddr {
        self.inner.external_ip
    }

    fn intro_key(&self) -> IntroKey {
        self.inner.intro_key
    }

    fn peer_session(&self, addr: SocketAddr) -> Option<PeerSession> {
        self.inner.sessions.lock().get(&addr).copied()
    }

    fn pick_test_peer(&self, _exclude: SocketAddr) -> Option<TestPeer> {
        *self.inner.test_peer.lock()
    }

    fn is_valid_ip(&self, ip: IpAddr) -> bool {
        !(ip.is_loopback() || ip.is_unspecified() || ip.is_multicast())
    }

    fn is_blocklisted(&self, ip: IpAddr) -> bool {
        self.inner.blocklist.lock().contains(&ip)
    }

    fn set_reachability_status(&self, status: ReachabilityStatus) {
        self.inner.statuses.lock().push(status);
    }
}

/// A clock the test advances by hand.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, delta: Duration) {
        *self.now.lock() += delta;
    }

    pub fn set(&self, to: Instant) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// A timer that records deadlines for the harness to fire by hand.
#[derive(Clone)]
pub struct RecordingTimer {
    clock: ManualClock,
    pending: Arc<Mutex<Vec<(Instant, TimerEvent)>>>,
}

impl RecordingTimer {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.lock().iter().map(|(at, _)| *at).min()
    }

    pub fn pop_due(&self, now: Instant) -> Option<TimerEvent> {
        let mut pending = self.pending.lock();
        let due = pending
            .iter()
            .enumerate()
            .filter(|(_, (at, _))| *at <= now)
            .min_by_key(|(_, (at, _))| *at)
            .map(|(i, _)| i)?;
        Some(pending.remove(due).1)
    }
}

impl Timer for RecordingTimer {
    fn schedule(&self, event: TimerEvent, delay: Duration) {
        let fire_at = self.clock.now() + delay;
        self.pending.lock().push((fire_at, event));
    }
}

/// A coordinator wired to scripted collaborators.
pub struct Harness {
    pub transport: MockTransport,
    pub timer: RecordingTimer,
    pub clock: ManualClock,
    pub coordinator: Coordinator<MockTransport, RecordingTimer, ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        init_tracing();
        let clock = ManualClock::new();
        let timer = RecordingTimer::new(clock.clone());
        let transport = MockTransport::new(ip("203.0.113.1"));
        let coordinator = Builder::new(transport.clone(), timer.clone())
            .clock(clock.clone())
            .config(config)
            .build()
            .unwrap();
        Self {
            transport,
            timer,
            clock,
            coordinator,
        }
    }

    /// Advance the clock through every deadline that falls within `duration`,
    /// firing each event in order.
    pub fn run_for(&self, duration: Duration) {
        let until = self.clock.now() + duration;
        loop {
            let Some(next) = self.timer.next_deadline().filter(|at| *at <= until) else {
                break;
            };
            if next > self.clock.now() {
                self.clock.set(next);
            }
            while let Some(event) = self.timer.pop_due(self.clock.now()) {
                self.coordinator.handle_timer(event);
            }
        }
        self.clock.set(until);
    }

    /// The nonce of the most recently started local test, read back from the
    /// first packet sent to Bob.
    pub fn last_sent_nonce(&self) -> u32 {
        let sent = self.transport.sent();
        decode(sent.last().expect("no packets sent")).nonce
    }
}

/// A decoded outbound datagram.
pub struct SentPacket {
    pub dest: SocketAddr,
    pub session_keyed: bool,
    pub nonce: u32,
    pub port: u16,
    pub ip: Option<IpAddr>,
    pub intro_key: [u8; 32],
}

pub fn decode(datagram: &Datagram) -> SentPacket {
    let packet = PeerTestPacket::new_view(&datagram.payload).unwrap();
    SentPacket {
        dest: datagram.dest,
        session_keyed: matches!(datagram.keying, Keying::Session(_)),
        nonce: packet.get_nonce(),
        port: packet.get_port(),
        ip: packet.get_ip(),
        intro_key: packet.get_intro_key(),
    }
}

/// Build a peer-test payload as a remote party would.
pub fn payload(nonce: u32, reflected: Option<SocketAddr>, intro_key: [u8; 32]) -> Vec<u8> {
    let ip_len = match reflected.map(|addr| addr.ip()) {
        None => 0,
        Some(IpAddr::V4(_)) => 4,
        Some(IpAddr::V6(_)) => 16,
    };
    let mut buf = vec![0_u8; PeerTestPacket::packet_size(ip_len)];
    let mut packet = PeerTestPacket::new(&mut buf).unwrap();
    packet.set_nonce(nonce);
    packet.set_port(reflected.map_or(0, |addr| addr.port()));
    packet.set_ip(reflected.map(|addr| addr.ip()));
    packet.set_intro_key(intro_key);
    buf
}

pub fn ip(s: &str) -> IpAddr {
    IpAddr::from_str(s).unwrap()
}

pub fn addr(s: &str) -> SocketAddr {
    SocketAddr::from_str(s).unwrap()
}

pub fn session_keys(tag: u8) -> SessionKeys {
    SessionKeys {
        cipher: SessionKey([tag; 32]),
        mac: SessionKey([tag.wrapping_add(1); 32]),
    }
}

pub fn session(keys: SessionKeys, last_send_time: Option<Instant>) -> PeerSession {
    PeerSession {
        keys,
        last_ack_time: None,
        last_send_time,
    }
}

pub fn test_peer(addr: SocketAddr, intro_key: Option<[u8; 32]>, keys: SessionKeys) -> TestPeer {
    TestPeer {
        addr,
        intro_key: intro_key.map(IntroKey),
        keys,
    }
}
