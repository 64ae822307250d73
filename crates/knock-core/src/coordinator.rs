use crate::clock::Clock;
use crate::config::Config;
use crate::error::Result;
use crate::record::{Role, TestRecord};
use crate::ring::RecentNonces;
use crate::stats::{Stats, StatsSnapshot};
use crate::table::ActiveTests;
use crate::throttle::IpThrottle;
use crate::timer::{Timer, TimerEvent};
use crate::transport::{PeerSession, Transport};
use crate::types::{Nonce, ReachabilityStatus, RelayCount, SessionKeys};
use crate::wire::{self, Datagram, Keying, TestMessage};
use parking_lot::Mutex;
use rand::Rng;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// The peer reachability test coordinator.
///
/// Entry points are [`Coordinator::run_test`] to start a new test as Alice,
/// [`Coordinator::receive_test`] for all received test packets and
/// [`Coordinator::handle_timer`] for due deadlines.
///
/// A test involves three parties and a sequence of packets all carrying the
/// nonce Alice chose:
///
/// ```text
///     Alice                  Bob                  Charlie
///
///     run_test()
///     test -------------------->
///                            picks a charlie
///                            test --------------------->
///                               <--------------------ack
///        <---------------------ok
///        <-------------------------------------------test
///     test ------------------------------------------->
///        <-------------------------------------------test
/// ```
///
/// From what arrived within the test budget Alice derives one of four
/// [`ReachabilityStatus`] verdicts: both of Charlie's packets with a matching
/// reflected endpoint means unsolicited inbound UDP works; a mismatched
/// endpoint means a symmetric NAT; Bob's reply alone means a firewall is
/// eating unsolicited packets; anything less is inconclusive.
///
/// The same coordinator serves the Bob and Charlie half-protocols when remote
/// peers ask for help, tracking up to [`Config::max_active_tests`] of those at
/// a time.
#[derive(Debug)]
pub struct Coordinator<T, M, C> {
    config: Config,
    transport: T,
    timer: M,
    clock: C,
    alice: Mutex<AliceDriver>,
    active: ActiveTests,
    throttle: IpThrottle,
    stats: Stats,
}

/// State for the one locally-initiated test.
///
/// Everything here is mutated under a single lock: the current record, the
/// once-only completion latch and the ring of recently used nonces.
#[derive(Debug)]
struct AliceDriver {
    current: Option<TestRecord>,
    complete: bool,
    recent: RecentNonces,
}

/// What the retransmission deadline decided to do.
enum Resend {
    Wait,
    TooMany,
    ToBob(RelayCount),
    ToCharlie(RelayCount),
}

impl<T, M, C> Coordinator<T, M, C>
where
    T: Transport,
    M: Timer,
    C: Clock,
{
    pub(crate) fn new(config: Config, transport: T, timer: M, clock: C) -> Self {
        let now = clock.now();
        Self {
            throttle: IpThrottle::new(config.max_per_ip, config.throttle_clean_time, now),
            active: ActiveTests::new(config.max_active_tests),
            alice: Mutex::new(AliceDriver {
                current: None,
                complete: false,
                recent: RecentNonces::new(),
            }),
            stats: Stats::default(),
            config,
            transport,
            timer,
            clock,
        }
    }

    /// The coordinator configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// A snapshot of the event counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The number of tests we are currently helping with as Bob or Charlie.
    pub fn active_test_count(&self) -> usize {
        self.active.len()
    }

    /// Start a new test with `bob_addr` as the coordinator.
    ///
    /// Ignored (with a warning) if a test is already running or if Bob is too
    /// close to our own external address to be a useful observer.  The
    /// verdict is delivered through [`Transport::set_reachability_status`]
    /// within [`Config::max_test_time`] of starting.
    #[instrument(skip_all, level = "trace")]
    pub fn run_test(&self, bob_addr: SocketAddr, bob_keys: SessionKeys) {
        let mut alice = self.alice.lock();
        if let Some(current) = alice.current.as_ref() {
            warn!(
                "we are already running test {}, aborting test with bob {bob_addr}",
                current.nonce
            );
            return;
        }
        if shares_address_prefix(bob_addr.ip(), self.transport.external_ip()) {
            warn!("not running test with bob {bob_addr} too close to us");
            return;
        }
        let now = self.clock.now();
        let nonce = Nonce(rand::thread_rng().gen());
        let mut test = TestRecord::new(Role::Alice, nonce, now);
        test.bob_addr = Some(bob_addr);
        test.bob_keys = Some(bob_keys);
        test.increment_packets_relayed();
        debug!("start new test {nonce} with bob {bob_addr}");
        alice.recent.push(nonce);
        alice.current = Some(test);
        alice.complete = false;
        self.send_test_to_bob(&mut alice);
        self.timer
            .schedule(TimerEvent::ContinueTest(nonce), self.config.resend_timeout);
    }

    /// Act on a due deadline.
    ///
    /// Events resolve against the coordinator state at fire time, so a
    /// deadline for a test that has since completed or been replaced is a
    /// no-op.
    #[instrument(skip(self), level = "trace")]
    pub fn handle_timer(&self, event: TimerEvent) {
        match event {
            TimerEvent::ContinueTest(nonce) => self.continue_test(nonce),
            TimerEvent::RemoveTest(nonce) => {
                self.active.remove(nonce);
            }
        }
    }

    /// Entry point for all incoming test packets.
    ///
    /// Validates the source and any test endpoint carried in the payload,
    /// then dispatches on the nonce: to the local test if it matches, or to
    /// the Bob/Charlie half-protocols otherwise.  We could be Alice, Bob or
    /// Charlie.
    #[instrument(skip(self, payload), level = "trace")]
    pub fn receive_test(&self, from: SocketAddr, payload: &[u8]) {
        self.stats.incr_receive_test();
        let external_ip = self.transport.external_ip();
        if from.port() < 1024
            || !self.transport.is_valid_ip(from.ip())
            || shares_address_prefix(from.ip(), external_ip)
            || self.transport.is_blocklisted(from.ip())
        {
            // spoof check, and don't respond to privileged ports
            warn!("invalid peer test address: {from}");
            self.stats.incr_test_bad_ip();
            return;
        }
        let msg = match wire::parse(payload) {
            Ok(msg) => msg,
            Err(err) => {
                warn!("malformed peer test payload from {from}: {err}");
                self.stats.incr_test_bad_ip();
                return;
            }
        };
        if (msg.port > 0 && msg.port < 1024)
            || msg
                .ip
                .is_some_and(|ip| !self.transport.is_valid_ip(ip) || self.transport.is_blocklisted(ip))
        {
            warn!(
                "invalid address in peer test from {from}: {:?}:{}",
                msg.ip, msg.port
            );
            self.stats.incr_test_bad_ip();
            return;
        }

        // the from and test addresses are now validated, except that the
        // test ip may be absent and the test port may be 0; the handlers
        // check whichever of those they rely on
        {
            let mut alice = self.alice.lock();
            if alice.current.as_ref().is_some_and(|t| t.nonce == msg.nonce) {
                // we are alice, we initiated the test
                self.receive_test_reply(&mut alice, from, &msg);
                return;
            }
        }

        // we are bob or charlie, helping with someone else's test
        let now = self.clock.now();
        if self.throttle.should_throttle(from.ip(), now) {
            warn!("peer test throttle from {from}");
            self.stats.incr_throttled();
            return;
        }
        // the same counter covers the from and the test addresses
        if let Some(ip) = msg.ip {
            if self.throttle.should_throttle(ip, now) {
                warn!("peer test throttle to {ip}:{}", msg.port);
                self.stats.incr_throttled();
                return;
            }
        }

        let state = self.active.get(msg.nonce);

        if let Some(ip) = msg.ip {
            // spoof check, after the alice dispatch where the test address is
            // legitimately our own; also refuse anybody in our /16
            if shares_address_prefix(ip, external_ip) {
                if self.alice.lock().recent.contains(msg.nonce) {
                    info!("got delayed reply on nonce {} from {from}", msg.nonce);
                } else {
                    warn!("nearby address in peer test: {ip}:{} from {from}", msg.port);
                    self.stats.incr_test_bad_ip();
                }
                return;
            }
        }

        match state {
            None => {
                if msg.ip.is_none() || msg.port == 0 {
                    // a fresh nonce with a blank test endpoint only ever
                    // comes from alice herself
                    if self.active.is_full() {
                        warn!("too many active tests, dropping from alice {from}");
                        return;
                    }
                    debug!("test endpoint is blank coming from {from}, assuming we are bob and they are alice");
                    self.receive_from_alice_as_bob(from, &msg, None);
                } else if self.alice.lock().recent.contains(msg.nonce) {
                    // holdover from a recently completed locally-initiated
                    // test, ignore it
                } else {
                    if self.active.is_full() {
                        warn!("too many active tests, dropping from bob {from}");
                        return;
                    }
                    debug!(
                        "we are charlie for nonce {}: the test endpoint is {:?}:{}",
                        msg.nonce, msg.ip, msg.port
                    );
                    self.receive_from_bob_as_charlie(from, &msg, None);
                }
            }
            Some(record) => {
                let (role, alice_addr, charlie_addr) = {
                    let record = record.lock();
                    (record.role, record.alice_addr(), record.charlie_addr)
                };
                match role {
                    Role::Bob => {
                        if alice_addr == Some(from) {
                            self.receive_from_alice_as_bob(from, &msg, Some(&record));
                        } else if charlie_addr == Some(from) {
                            self.receive_from_charlie_as_bob(from, &record);
                        } else {
                            warn!(
                                "received from a fourth party as bob, alice: {alice_addr:?}, charlie: {charlie_addr:?}, dave: {from}"
                            );
                        }
                    }
                    Role::Charlie => {
                        if msg.ip.is_none() || msg.port == 0 {
                            self.receive_from_alice_as_charlie(from, &msg, &record);
                        } else {
                            self.receive_from_bob_as_charlie(from, &msg, Some(&record));
                        }
                    }
                    // the active table only ever holds helper records
                    Role::Alice => {}
                }
            }
        }
    }

    /// Fired every `resend_timeout + packets_relayed` seconds while the local
    /// test runs: retransmit to whichever party is still silent, give up once
    /// the relay cap is hit, or finalise once the budget is spent.
    fn continue_test(&self, nonce: Nonce) {
        let mut alice = self.alice.lock();
        {
            let Some(test) = alice.current.as_ref() else {
                // already completed, possibly on to the next test
                return;
            };
            if test.nonce != nonce {
                return;
            }
        }
        if self.alice_expired(&alice) {
            self.test_complete(&mut alice, true);
            return;
        }
        let now = self.clock.now();
        let action = {
            let Some(test) = alice.current.as_mut() else {
                return;
            };
            if now.saturating_duration_since(test.last_send_time) >= self.config.resend_timeout {
                let sent = test.increment_packets_relayed();
                if sent > RelayCount(self.config.max_relayed_per_test_alice) {
                    Resend::TooMany
                } else if test.receive_bob_time.is_none() {
                    // no reply from bob yet, ask again
                    Resend::ToBob(sent)
                } else if test.receive_charlie_time.is_none() {
                    // bob replied but charlie is silent, ask bob again so he
                    // pokes charlie
                    Resend::ToBob(sent)
                } else {
                    // still waiting on charlie's second packet
                    Resend::ToCharlie(sent)
                }
            } else {
                Resend::Wait
            }
        };
        match action {
            Resend::Wait => {}
            Resend::TooMany => {
                warn!("sent too many packets for test {nonce}");
                self.test_complete(&mut alice, false);
            }
            Resend::ToBob(sent) => {
                self.send_test_to_bob(&mut alice);
                self.reschedule(nonce, sent);
            }
            Resend::ToCharlie(sent) => {
                self.send_test_to_charlie(&mut alice);
                self.reschedule(nonce, sent);
            }
        }
    }

    /// Retransmits land at roughly 4, 10, 17 and 25 seconds elapsed.
    fn reschedule(&self, nonce: Nonce, sent: RelayCount) {
        let delay = self.config.resend_timeout + Duration::from_secs(u64::from(sent.0));
        self.timer.schedule(TimerEvent::ContinueTest(nonce), delay);
    }

    /// A reply carrying the nonce of our current test.  We are Alice; the
    /// source endpoint tells Bob and Charlie apart.
    fn receive_test_reply(&self, alice: &mut AliceDriver, from: SocketAddr, msg: &TestMessage) {
        self.stats.incr_receive_test_reply();
        if self.alice_expired(alice) {
            return;
        }
        if alice.complete {
            return;
        }
        let now = self.clock.now();
        let from_bob = alice
            .current
            .as_ref()
            .is_some_and(|test| test.bob_addr == Some(from));
        if from_bob {
            let finalise = {
                let Some(test) = alice.current.as_mut() else {
                    return;
                };
                let Some(ip) = msg.ip else {
                    // a missing reflected ip would masquerade as a symmetric
                    // NAT once charlie reports, so pretend bob never replied
                    warn!("missing reflected ip in bob's reply from {from}");
                    self.stats.incr_test_bad_ip();
                    return;
                };
                test.alice_ip = Some(ip);
                test.receive_bob_time = Some(now);
                if msg.port == 0 {
                    error!("invalid reflected port in bob's reply from {from}");
                    self.stats.incr_test_bad_ip();
                    return;
                }
                test.alice_port = Some(msg.port);
                debug!("receive test reply from bob: {}", test.nonce);
                test.alice_port_from_charlie.is_some()
            };
            if finalise {
                self.test_complete(alice, false);
            }
        } else {
            // the reply is from charlie
            let session = self.transport.peer_session(from);
            if session
                .as_ref()
                .is_some_and(|session| self.session_is_recent(session, now))
            {
                warn!(
                    "bob chose a charlie we already have a session to, cancelling the test (charlie: {from})"
                );
                // our NAT has a hole punched for this peer already, so his
                // packets prove nothing; clear the test without the normal
                // finaliser
                alice.complete = true;
                self.stats.incr_status_known_charlie();
                self.report_status(ReachabilityStatus::Unknown);
                alice.current = None;
                return;
            }
            let second = alice
                .current
                .as_ref()
                .is_some_and(|test| test.receive_charlie_time.is_some());
            if second {
                let finalise = {
                    let Some(test) = alice.current.as_mut() else {
                        return;
                    };
                    if msg.port == 0 {
                        error!("charlie {from} reflected an invalid port");
                        self.stats.incr_test_bad_ip();
                        return;
                    }
                    test.alice_port_from_charlie = Some(msg.port);
                    let Some(ip) = msg.ip else {
                        error!("charlie {from} said we were an invalid ip address");
                        self.stats.incr_test_bad_ip();
                        return;
                    };
                    test.alice_ip_from_charlie = Some(ip);
                    debug!("receive test reply from charlie: {}", test.nonce);
                    test.receive_bob_time.is_some()
                };
                if finalise {
                    self.test_complete(alice, true);
                }
            } else {
                let too_many = {
                    let Some(test) = alice.current.as_mut() else {
                        return;
                    };
                    test.increment_packets_relayed()
                        > RelayCount(self.config.max_relayed_per_test_alice)
                };
                if too_many {
                    warn!("sent too many packets on the test");
                    self.test_complete(alice, false);
                    return;
                }
                if session.is_some() {
                    info!("bob chose a charlie we have an old session to (charlie: {from})");
                }
                {
                    let Some(test) = alice.current.as_mut() else {
                        return;
                    };
                    test.receive_charlie_time = Some(now);
                    test.charlie_intro_key = Some(msg.intro_key);
                    test.charlie_addr = Some(from);
                    debug!("receive test from charlie: {}", test.nonce);
                }
                self.send_test_to_charlie(alice);
            }
        }
    }

    /// Evaluate the info we have, deliver the verdict and, when `forget`,
    /// clear the test to allow another.  Called on the second Charlie packet
    /// or when the test times out.
    fn test_complete(&self, alice: &mut AliceDriver, forget: bool) {
        alice.complete = true;
        let Some(test) = alice.current.as_ref() else {
            return;
        };
        let status = if let Some(port_from_charlie) = test.alice_port_from_charlie {
            // charlie's second packet arrived: compare what bob and charlie
            // each saw of us
            if test.alice_port == Some(port_from_charlie)
                && test.alice_ip.is_some()
                && test.alice_ip == test.alice_ip_from_charlie
            {
                ReachabilityStatus::Ok
            } else {
                ReachabilityStatus::Different
            }
        } else if test.receive_charlie_time.is_some() {
            // only one message from charlie
            ReachabilityStatus::Unknown
        } else if test.receive_bob_time.is_some() {
            // bob replied but nothing unsolicited got through
            ReachabilityStatus::RejectUnsolicited
        } else {
            // bob is down, ignoring us, or unable to recruit a charlie
            ReachabilityStatus::Unknown
        };
        info!("test {} complete: {status}", test.nonce);
        self.report_status(status);
        if forget {
            alice.current = None;
        }
    }

    fn report_status(&self, status: ReachabilityStatus) {
        info!("test result: status = {status}");
        self.transport.set_reachability_status(status);
    }

    fn send_test_to_bob(&self, alice: &mut AliceDriver) {
        if self.alice_expired(alice) {
            alice.current = None;
            return;
        }
        let Some(test) = alice.current.as_ref() else {
            return;
        };
        let Some((bob_addr, bob_keys)) = test.bob_addr.zip(test.bob_keys) else {
            return;
        };
        debug!("sending test {} to bob {bob_addr}", test.nonce);
        self.send(wire::test_from_alice(
            bob_addr,
            Keying::Session(bob_keys),
            test.nonce,
            self.transport.intro_key(),
        ));
    }

    fn send_test_to_charlie(&self, alice: &mut AliceDriver) {
        if self.alice_expired(alice) {
            alice.current = None;
            return;
        }
        let Some(test) = alice.current.as_ref() else {
            return;
        };
        let Some((charlie_addr, charlie_intro_key)) =
            test.charlie_addr.zip(test.charlie_intro_key)
        else {
            return;
        };
        debug!("sending test {} to charlie {charlie_addr}", test.nonce);
        self.send(wire::test_from_alice(
            charlie_addr,
            Keying::Intro(charlie_intro_key),
            test.nonce,
            self.transport.intro_key(),
        ));
    }

    /// The test endpoint matched the packet source (or was blank), so we are
    /// Bob: recruit a Charlie and forward Alice's info to him.
    fn receive_from_alice_as_bob(
        &self,
        from: SocketAddr,
        msg: &TestMessage,
        state: Option<&Arc<Mutex<TestRecord>>>,
    ) {
        let (charlie_addr, charlie_keys, charlie_intro_key) = match state {
            None => {
                let Some(peer) = self.transport.pick_test_peer(from) else {
                    warn!("unable to pick a charlie for {from}");
                    return;
                };
                let Some(intro_key) = peer.intro_key else {
                    warn!("unable to pick a charlie for {from}");
                    return;
                };
                (peer.addr, peer.keys, intro_key)
            }
            Some(record) => {
                let (addr, intro_key) = {
                    let record = record.lock();
                    (record.charlie_addr, record.charlie_intro_key)
                };
                let (Some(addr), Some(intro_key)) = (addr, intro_key) else {
                    warn!("unable to pick a charlie for {from}");
                    return;
                };
                let Some(session) = self.transport.peer_session(addr) else {
                    warn!("unable to pick a charlie for {from}");
                    return;
                };
                (addr, session.keys, intro_key)
            }
        };
        let now = self.clock.now();
        let is_new = state.is_none();
        let record = match state {
            Some(record) => Arc::clone(record),
            None => Arc::new(Mutex::new(TestRecord::new(Role::Bob, msg.nonce, now))),
        };
        {
            let mut record = record.lock();
            if !is_new && self.too_soon(record.receive_alice_time, now) {
                warn!("too soon, not retransmitting test {}", record.nonce);
                return;
            }
            record.alice_ip = Some(from.ip());
            record.alice_port = Some(from.port());
            record.alice_intro_key = Some(msg.intro_key);
            record.charlie_addr = Some(charlie_addr);
            record.charlie_intro_key = Some(charlie_intro_key);
            record.last_send_time = now;
            record.receive_alice_time = Some(now);
            if record.increment_packets_relayed()
                > RelayCount(self.config.max_relayed_per_test_bob)
            {
                warn!("too many, not retransmitting test {}", record.nonce);
                return;
            }
        }
        if is_new && !self.insert_active(msg.nonce, &record) {
            return;
        }
        debug!("receive from alice as bob: {}", msg.nonce);
        self.send(wire::test_to_charlie(
            charlie_addr,
            charlie_keys,
            from,
            msg.intro_key,
            msg.nonce,
        ));
    }

    /// The packet came from the Charlie recruited for an existing test, so
    /// send Alice the packet confirming his participation.
    fn receive_from_charlie_as_bob(&self, from: SocketAddr, record: &Arc<Mutex<TestRecord>>) {
        let now = self.clock.now();
        let (nonce, alice_addr, alice_intro_key, charlie_intro_key) = {
            let mut record = record.lock();
            if self.too_soon(record.receive_charlie_time, now) {
                warn!("too soon, not retransmitting test {}", record.nonce);
                return;
            }
            if record.increment_packets_relayed()
                > RelayCount(self.config.max_relayed_per_test_bob)
            {
                warn!("too many, not retransmitting test {}", record.nonce);
                return;
            }
            record.receive_charlie_time = Some(now);
            let (Some(alice_addr), Some(alice_intro_key), Some(charlie_intro_key)) = (
                record.alice_addr(),
                record.alice_intro_key,
                record.charlie_intro_key,
            ) else {
                return;
            };
            (record.nonce, alice_addr, alice_intro_key, charlie_intro_key)
        };
        debug!("receive from charlie {from}, sending alice back the ok: {nonce}");
        self.send(wire::test_to_alice(
            alice_addr,
            alice_intro_key,
            charlie_intro_key,
            nonce,
        ));
    }

    /// The test endpoint differs from the packet source, so we are Charlie
    /// receiving Alice's info from Bob: acknowledge to Bob and contact Alice
    /// directly.
    fn receive_from_bob_as_charlie(
        &self,
        from: SocketAddr,
        msg: &TestMessage,
        state: Option<&Arc<Mutex<TestRecord>>>,
    ) {
        let now = self.clock.now();
        let is_new = state.is_none();
        let record = match state {
            Some(record) => Arc::clone(record),
            None => Arc::new(Mutex::new(TestRecord::new(Role::Charlie, msg.nonce, now))),
        };
        let (alice_addr, alice_intro_key, bob_keys) = {
            let mut record = record.lock();
            if !is_new && self.too_soon(record.receive_bob_time, now) {
                warn!("too soon, not retransmitting test {}", record.nonce);
                return;
            }
            let Some(alice_ip) = msg.ip else {
                warn!("unable to read alice's address from {from}");
                self.stats.incr_test_bad_ip();
                return;
            };
            if msg.port == 0 {
                warn!("alice's port is 0 from {from}");
                self.stats.incr_test_bad_ip();
                return;
            }
            let alice_addr = SocketAddr::new(alice_ip, msg.port);
            record.alice_ip = Some(alice_ip);
            record.alice_port = Some(msg.port);
            record.alice_intro_key = Some(msg.intro_key);
            record.bob_addr = Some(from);
            record.last_send_time = now;
            record.receive_bob_time = Some(now);
            let Some(bob) = self.transport.peer_session(from) else {
                warn!(
                    "received from bob {from} without an established session, refusing to help him test {alice_addr}"
                );
                return;
            };
            record.bob_keys = Some(bob.keys);
            // two packets go out below, but count the pair once
            if record.increment_packets_relayed()
                > RelayCount(self.config.max_relayed_per_test_charlie)
            {
                warn!("too many, not retransmitting test {}", record.nonce);
                return;
            }
            (alice_addr, msg.intro_key, bob.keys)
        };
        if is_new && !self.insert_active(msg.nonce, &record) {
            return;
        }
        debug!("receive from bob as charlie: {}", msg.nonce);
        self.send(wire::test_to_bob(
            from,
            bob_keys,
            alice_addr,
            alice_intro_key,
            msg.nonce,
        ));
        self.send(wire::test_to_alice(
            alice_addr,
            alice_intro_key,
            self.transport.intro_key(),
            msg.nonce,
        ));
    }

    /// We are Charlie and Alice has contacted us directly, so send her the
    /// test packet she is waiting on.
    fn receive_from_alice_as_charlie(
        &self,
        from: SocketAddr,
        msg: &TestMessage,
        record: &Arc<Mutex<TestRecord>>,
    ) {
        let now = self.clock.now();
        let nonce = {
            let mut record = record.lock();
            if self.too_soon(record.receive_alice_time, now) {
                warn!("too soon, not retransmitting test {}", record.nonce);
                return;
            }
            if record.increment_packets_relayed()
                > RelayCount(self.config.max_relayed_per_test_charlie)
            {
                warn!("too many, not retransmitting test {}", record.nonce);
                return;
            }
            record.receive_alice_time = Some(now);
            record.nonce
        };
        debug!("receive from alice as charlie: {nonce}");
        self.send(wire::test_to_alice(
            from,
            msg.intro_key,
            self.transport.intro_key(),
            nonce,
        ));
    }

    fn insert_active(&self, nonce: Nonce, record: &Arc<Mutex<TestRecord>>) -> bool {
        if !self.active.insert(nonce, Arc::clone(record)) {
            warn!("too many active tests, dropping test {nonce}");
            return false;
        }
        self.timer
            .schedule(TimerEvent::RemoveTest(nonce), self.config.max_charlie_lifetime);
        true
    }

    fn alice_expired(&self, alice: &AliceDriver) -> bool {
        alice.current.as_ref().map_or(true, |test| {
            test.is_expired(self.clock.now(), self.config.max_test_time)
        })
    }

    /// Duplicate-amplification guard for the helper roles.
    fn too_soon(&self, last: Option<Instant>, now: Instant) -> bool {
        last.is_some_and(|last| now.saturating_duration_since(last) < self.config.resend_timeout / 2)
    }

    fn session_is_recent(&self, session: &PeerSession, now: Instant) -> bool {
        let recent = |at: Option<Instant>| {
            at.is_some_and(|at| {
                now.saturating_duration_since(at) < self.config.charlie_recent_period
            })
        };
        recent(session.last_ack_time) || recent(session.last_send_time)
    }

    fn send(&self, datagram: Result<Datagram>) {
        match datagram {
            Ok(datagram) => self.transport.send(datagram),
            Err(err) => error!("unable to build peer test packet: {err}"),
        }
    }
}

/// Do two addresses share their first two bytes (the same /16 for `IPv4`)?
fn shares_address_prefix(a: IpAddr, b: IpAddr) -> bool {
    match (a, b) {
        (IpAddr::V4(a), IpAddr::V4(b)) => a.octets()[..2] == b.octets()[..2],
        (IpAddr::V6(a), IpAddr::V6(b)) => a.octets()[..2] == b.octets()[..2],
        _ => false,
    }
}
