//! Trace session lifecycle
//!
//! A [`TraceSession`] owns the hop table and runs one generation of probers
//! at a time. The lifecycle is `Idle -> Tracing -> (Stopping ->) Idle`; a
//! new generation can only start from `Idle`, so probers of two generations
//! never write to the table at the same time.

use super::error::TraceError;
use super::hop::MAX_HOPS;
use super::prober::Prober;
use super::table::HopTable;
use crate::config::OptionsProvider;
use crate::dns::{HickoryNameResolver, NameResolver};
use crate::socket::{EchoTransport, RawIcmpFactory, TransportFactory};
use futures::stream::{FuturesUnordered, StreamExt};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[cfg(test)]
pub(crate) mod sim;

/// Lifecycle state of a [`TraceSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No probers are running
    Idle,
    /// Probers are running
    Tracing,
    /// Stop was requested; probers are draining
    Stopping,
}

struct Inner {
    table: Arc<HopTable>,
    options: Arc<dyn OptionsProvider>,
    factory: Arc<dyn TransportFactory>,
    resolver: Option<Arc<dyn NameResolver>>,
    active: Arc<AtomicBool>,
    state: watch::Sender<SessionState>,
}

/// Handle to a trace session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct TraceSession {
    inner: Arc<Inner>,
}

impl TraceSession {
    /// Session probing over raw ICMP sockets and resolving names with the
    /// system resolver.
    pub fn new(options: Arc<dyn OptionsProvider>) -> Self {
        Self::with_parts(
            options,
            Arc::new(RawIcmpFactory::new()),
            Some(Arc::new(HickoryNameResolver::new())),
        )
    }

    /// Session with an explicit transport factory and name resolver.
    ///
    /// Without a resolver, latched hops keep their numeric address as name.
    pub fn with_parts(
        options: Arc<dyn OptionsProvider>,
        factory: Arc<dyn TransportFactory>,
        resolver: Option<Arc<dyn NameResolver>>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            inner: Arc::new(Inner {
                table: Arc::new(HopTable::new()),
                options,
                factory,
                resolver,
                active: Arc::new(AtomicBool::new(false)),
                state,
            }),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Shared hop table; safe to read while a trace runs.
    pub fn table(&self) -> Arc<HopTable> {
        Arc::clone(&self.inner.table)
    }

    /// Start tracing `target` without waiting for the result.
    ///
    /// Must be called from within a Tokio runtime. Fails without touching
    /// the table when a trace is already running or draining, when the
    /// target cannot be probed, or when the transports cannot be created.
    pub fn start(&self, target: IpAddr) -> Result<(), TraceError> {
        if target.is_unspecified() || target.is_multicast() {
            return Err(TraceError::InvalidTarget(target));
        }
        let runtime = Handle::try_current().map_err(|_| TraceError::NoRuntime)?;

        let claimed = self.inner.state.send_if_modified(|state| {
            if *state == SessionState::Idle {
                *state = SessionState::Tracing;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(TraceError::AlreadyTracing);
        }

        let identifier: u16 = rand::random();
        let transports = match self.create_transports(target, identifier) {
            Ok(transports) => transports,
            Err(e) => {
                self.inner.state.send_replace(SessionState::Idle);
                return Err(e);
            }
        };

        let inner = &self.inner;
        let generation = inner.table.begin_generation(Some(target));
        inner.active.store(true, Ordering::Release);
        // A stop that raced with this start must still win
        if *inner.state.borrow() != SessionState::Tracing {
            inner.active.store(false, Ordering::Release);
        }
        info!(%target, generation, identifier, "Trace started");

        let probers: FuturesUnordered<_> = (1..=MAX_HOPS)
            .zip(transports)
            .map(|(hop, transport)| {
                let prober = Prober {
                    hop,
                    target,
                    generation,
                    transport,
                    table: Arc::clone(&inner.table),
                    options: Arc::clone(&inner.options),
                    resolver: inner.resolver.clone(),
                    active: Arc::clone(&inner.active),
                };
                runtime.spawn(prober.run())
            })
            .collect();

        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            let mut probers = probers;
            while let Some(result) = probers.next().await {
                if let Err(e) = result {
                    warn!("Prober task failed: {}", e);
                }
            }
            inner.active.store(false, Ordering::Release);
            info!(generation, "Trace finished");
            inner.state.send_replace(SessionState::Idle);
        });

        Ok(())
    }

    fn create_transports(
        &self,
        target: IpAddr,
        identifier: u16,
    ) -> Result<Vec<Box<dyn EchoTransport>>, TraceError> {
        (1..=MAX_HOPS)
            .map(|_| self.inner.factory.create(target, identifier))
            .collect()
    }

    /// Ask the running probers to finish.
    ///
    /// In-flight echoes and interval sleeps complete before a prober
    /// notices; use [`wait`](Self::wait) to know when all have drained.
    pub fn stop(&self) {
        let stopping = self.inner.state.send_if_modified(|state| {
            if *state == SessionState::Tracing {
                *state = SessionState::Stopping;
                true
            } else {
                false
            }
        });
        self.inner.active.store(false, Ordering::Release);
        if stopping {
            debug!("Stop requested");
        }
    }

    /// Wait until the session is idle.
    pub async fn wait(&self) {
        let mut state = self.inner.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = state.wait_for(|s| *s == SessionState::Idle).await;
    }

    /// Stop and wait for every prober to drain.
    pub async fn stop_and_wait(&self) {
        self.stop();
        self.wait().await;
    }

    /// Trace `target` until [`stop`](Self::stop) is called from elsewhere
    /// and all probers have drained.
    pub async fn trace(&self, target: IpAddr) -> Result<(), TraceError> {
        self.start(target)?;
        self.wait().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::sim::{FailingFactory, SimNetwork, SimResolver};
    use super::*;
    use crate::config::TraceOptions;
    use crate::trace::IcmpStatus;
    use std::time::Duration;

    fn options(use_dns: bool) -> Arc<dyn OptionsProvider> {
        Arc::new(
            TraceOptions::builder()
                .interval(Duration::from_millis(1000))
                .probe_timeout(Duration::from_secs(2))
                .use_dns(use_dns)
                .build()
                .unwrap(),
        )
    }

    fn session(network: &Arc<SimNetwork>, use_dns: bool) -> TraceSession {
        let resolver: Option<Arc<dyn NameResolver>> = if use_dns {
            Some(Arc::new(SimResolver))
        } else {
            None
        };
        TraceSession::with_parts(options(use_dns), network.factory(), resolver)
    }

    fn assert_consistent(table: &HopTable) {
        for hop in 1..=MAX_HOPS {
            let record = table.get(hop);
            assert!(record.received <= record.sent, "hop {hop}: {record:?}");
            if record.received > 0 {
                assert!(record.best_rtt <= record.avg_rtt());
                assert!(record.avg_rtt() <= record.worst_rtt);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_target_at_hop_three() {
        let network = SimNetwork::new(SimNetwork::default_target(), 3);
        let session = session(&network, false);

        session.start(network.target).unwrap();
        assert_eq!(session.state(), SessionState::Tracing);
        tokio::time::sleep(Duration::from_secs(5)).await;
        session.stop_and_wait().await;
        assert_eq!(session.state(), SessionState::Idle);

        let table = session.table();
        assert_eq!(table.path_length(), 3);
        assert!(table.received(3) > 0);
        assert_eq!(table.best(3), Duration::from_millis(10));
        assert_eq!(table.worst(3), Duration::from_millis(10));
        assert_eq!(table.address(3), Some(network.target));
        assert_eq!(table.address(1), Some(network.router(1)));
        assert_eq!(table.name(2), network.router(2).to_string());

        let snapshot = table.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[2].address, Some(network.target));
        assert_consistent(&table);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replies_are_paced_by_interval() {
        let network = SimNetwork::new(SimNetwork::default_target(), 3);
        let session = session(&network, false);

        session.start(network.target).unwrap();
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        // One probe per second, the rtt counts against the interval
        let table = session.table();
        let (router, target) = (table.sent(1), table.sent(3));
        session.stop_and_wait().await;

        assert!((10..=11).contains(&router), "hop 1 sent {router}");
        assert!((10..=11).contains(&target), "hop 3 sent {target}");
        assert_eq!(table.received(3), table.sent(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_are_not_followed_by_interval_sleep() {
        let network = SimNetwork::new(SimNetwork::default_target(), 5).with_silent_hop(2);
        let session = session(&network, false);

        session.start(network.target).unwrap();
        tokio::time::sleep(Duration::from_secs(9)).await;

        // 2 s timeout, no pause in between: timeouts at 2, 4, 6 and 8 s
        let table = session.table();
        assert_eq!(table.sent(2), 4);
        assert_eq!(table.received(2), 0);
        session.stop_and_wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hops_beyond_target_stop_probing() {
        let network = SimNetwork::new(SimNetwork::default_target(), 3);
        let session = session(&network, false);

        session.start(network.target).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        session.stop_and_wait().await;

        let table = session.table();
        // Hops past the target answered once, then saw the shorter path
        for hop in 4..=MAX_HOPS {
            assert!(table.sent(hop) <= 1, "hop {hop} kept probing");
        }
        assert!(table.sent(3) >= 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_immediately_drains_all_probers() {
        let network = SimNetwork::new(SimNetwork::default_target(), 3);
        let session = session(&network, false);

        session.start(network.target).unwrap();
        session.stop();
        assert_eq!(session.state(), SessionState::Stopping);
        session.wait().await;

        assert_eq!(session.state(), SessionState::Idle);
        assert_consistent(&session.table());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_probing_drains() {
        let network = SimNetwork::new(SimNetwork::default_target(), 5).with_silent_hop(2);
        let session = session(&network, false);

        session.start(network.target).unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        session.stop_and_wait().await;

        assert_eq!(session.state(), SessionState::Idle);
        let table = session.table();
        assert_consistent(&table);
        assert!(table.sent(2) > 0);
        assert_eq!(table.received(2), 0);
        assert_eq!(table.loss_percent(2), 100);
        assert_eq!(table.address(2), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_names_hop() {
        let network = SimNetwork::new(SimNetwork::default_target(), 4)
            .with_status(2, IcmpStatus::DestHostUnreachable);
        let session = session(&network, false);

        session.start(network.target).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        session.stop_and_wait().await;

        let record = session.table().get(2);
        assert_eq!(record.name, "Destination host unreachable.");
        assert_eq!(record.received, 0);
        assert_eq!(record.address, None);
        assert!(record.sent > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_tracing_is_rejected() {
        let network = SimNetwork::new(SimNetwork::default_target(), 3);
        let session = session(&network, false);

        session.start(network.target).unwrap();
        let generation = session.table().generation();
        assert!(matches!(
            session.start(network.target),
            Err(TraceError::AlreadyTracing)
        ));

        session.stop();
        assert!(matches!(
            session.start(network.target),
            Err(TraceError::AlreadyTracing)
        ));
        session.wait().await;
        assert_eq!(session.table().generation(), generation);

        // Fresh generation after draining
        session.start(network.target).unwrap();
        assert_eq!(session.table().generation(), generation + 1);
        session.stop_and_wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_table() {
        let network = SimNetwork::new(SimNetwork::default_target(), 3);
        let session = session(&network, false);

        session.start(network.target).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        session.stop_and_wait().await;
        assert!(session.table().sent(1) > 0);

        session.start(network.target).unwrap();
        session.stop_and_wait().await;
        assert_eq!(session.table().sent(1), 0);
        assert_eq!(session.table().address(1), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_leaves_no_session() {
        let network = SimNetwork::new(SimNetwork::default_target(), 3);
        let session = session(&network, false);
        session.start(network.target).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        session.stop_and_wait().await;
        let before = session.table().snapshot();

        let failing =
            TraceSession::with_parts(options(false), Arc::new(FailingFactory::after(5)), None);
        let err = failing.start(network.target).unwrap_err();
        assert!(matches!(err, TraceError::TransportInit(_)));
        assert_eq!(failing.state(), SessionState::Idle);
        assert_eq!(failing.table().generation(), 0);

        // An unrelated session is untouched
        assert_eq!(session.table().snapshot(), before);
    }

    #[tokio::test]
    async fn test_invalid_targets_rejected() {
        let network = SimNetwork::new(SimNetwork::default_target(), 3);
        let session = session(&network, false);
        for target in ["0.0.0.0", "::", "224.0.0.1", "ff02::1"] {
            let target: IpAddr = target.parse().unwrap();
            assert!(matches!(
                session.start(target),
                Err(TraceError::InvalidTarget(ip)) if ip == target
            ));
        }
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_start_outside_runtime() {
        let network = SimNetwork::new(SimNetwork::default_target(), 3);
        let session = session(&network, false);
        assert!(matches!(
            session.start(network.target),
            Err(TraceError::NoRuntime)
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latched_hops_are_named() {
        let network = SimNetwork::new(SimNetwork::default_target(), 3);
        let session = session(&network, true);

        session.start(network.target).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        session.stop_and_wait().await;

        let table = session.table();
        assert_eq!(table.name(1), SimResolver::name_of(network.router(1)));
        assert_eq!(table.name(3), SimResolver::name_of(network.target));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ipv6_target() {
        let target: IpAddr = "2001:db8::53".parse().unwrap();
        let network = SimNetwork::new(target, 2);
        let session = session(&network, false);

        session.start(target).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        session.stop_and_wait().await;

        let table = session.table();
        assert_eq!(table.path_length(), 2);
        assert_eq!(table.address(2), Some(target));
    }
}
