//! Orchestration of the single exclusive device link.
//!
//! `SessionManager` is the only component allowed to touch the link or the
//! session record. Every mutating operation (`connect`, `execute`,
//! `disconnect`, forced idle release) runs inside one `tokio::sync::Mutex`
//! critical section, so concurrent callers queue in arrival order and
//! observe a total order of operations. Status queries read a snapshot
//! published after every transition and never wait behind an in-flight
//! device operation.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex as ParkingLotMutex;
use tokio::sync::Mutex as TokioMutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::idle::IdleExpiry;
use super::state::{ConnectionInfo, SessionPhase, SessionState, Snapshot};
use crate::error::{Error, Result};
use crate::link::DeviceLink;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::types::{DeviceIdentity, Operation, Telemetry};

/// Result of one executed operation, with session metadata the API layer
/// reports back to callers.
#[derive(Debug, Clone)]
pub struct ExecuteOutcome {
    pub telemetry: Telemetry,
    /// True when the operation ran over an already-open link.
    pub connection_reused: bool,
    /// Reconnect attempts consumed recovering from a mid-operation drop.
    pub reconnect_attempts: u32,
}

/// Owns the one physical link to one device for the life of the process.
pub struct SessionManager<L: DeviceLink> {
    link: L,
    identity: DeviceIdentity,
    config: SessionConfig,
    retry: RetryPolicy,
    idle: IdleExpiry,
    /// The exclusive critical section. Tokio's mutex queues waiters FIFO,
    /// which is exactly the arrival-order guarantee callers get.
    state: TokioMutex<SessionState<L::Handle>>,
    snapshot: ParkingLotMutex<Snapshot>,
}

impl<L: DeviceLink> SessionManager<L> {
    pub fn new(link: L, identity: DeviceIdentity, config: SessionConfig) -> Self {
        let retry = RetryPolicy::new(config.max_reconnect_attempts);
        let idle = IdleExpiry::new(config.idle_timeout);
        Self {
            link,
            identity,
            config,
            retry,
            idle,
            state: TokioMutex::new(SessionState::new()),
            snapshot: ParkingLotMutex::new(Snapshot::initial()),
        }
    }

    /// Replaces the retry policy. Primarily for tests that need a short
    /// backoff window.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Point-in-time session view. Never blocks on the critical section.
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo::from_snapshot(&self.snapshot.lock())
    }

    /// Establishes the link if it is not already up.
    ///
    /// No-op when connected. A previous `Failed` state is reset to
    /// `Disconnected` before the fresh attempt. Exactly one attempt is
    /// made: an explicit connect reports the precise failure instead of
    /// retrying behind the caller's back.
    pub async fn connect(&self) -> Result<ConnectionInfo> {
        let mut state = self.state.lock().await;
        self.expire_if_idle(&mut state).await;

        if state.phase == SessionPhase::Connected {
            debug!(target = "sesame.session", "connect requested but link already up");
            return Ok(self.connection_info());
        }
        if state.phase == SessionPhase::Failed {
            state.phase = SessionPhase::Disconnected;
        }

        self.open_link(&mut state).await?;
        Ok(self.connection_info())
    }

    /// Runs one operation, connecting first if needed and recovering from
    /// transient link failures within the attempt budget.
    ///
    /// `history_tag` is recorded in the device history for mutating
    /// operations.
    pub async fn execute(&self, operation: Operation, history_tag: &str) -> Result<ExecuteOutcome> {
        // Model check happens before anything else; an unsupported
        // operation must leave the link exactly as it was.
        if !self.identity.model.supports(operation) {
            return Err(Error::UnsupportedOperation {
                operation,
                model: self.identity.model,
            });
        }

        let mut state = self.state.lock().await;
        self.expire_if_idle(&mut state).await;

        let reused = state.phase == SessionPhase::Connected;
        if !reused {
            if state.phase == SessionPhase::Failed {
                state.phase = SessionPhase::Disconnected;
            }
            // Implicit connect: one attempt, and its failure is the
            // caller's failure.
            self.open_link(&mut state).await?;
        }

        match self.perform(&mut state, operation, history_tag).await {
            Ok(telemetry) => Ok(ExecuteOutcome {
                telemetry,
                connection_reused: reused,
                reconnect_attempts: 0,
            }),
            Err(err) if err.is_transient() => {
                self.recover_and_replay(&mut state, operation, history_tag, err)
                    .await
            }
            Err(err) => {
                // Device faults don't invalidate the link; the session
                // stays where it was and the error is surfaced as-is.
                state.last_error = Some(err.to_string());
                self.publish(&state);
                Err(err)
            }
        }
    }

    /// Releases the link and returns to `Disconnected`. Idempotent; a
    /// second call finds no handle and touches nothing.
    pub async fn disconnect(&self) -> ConnectionInfo {
        let mut state = self.state.lock().await;
        if state.handle.is_some() {
            info!(target = "sesame.session", "disconnect requested, releasing link");
        }
        self.release(&mut state).await;
        self.connection_info()
    }

    /// Cheapest non-mutating probe over the link: a status read through
    /// the standard execute path. Counts as activity like any successful
    /// read.
    pub async fn test_connection(&self) -> Result<ExecuteOutcome> {
        self.execute(Operation::Status, "test-connection").await
    }

    /// Spawns the cooperative idle sweeper: a task that periodically takes
    /// the same critical section as request processing and releases links
    /// whose idle budget ran out. The task exits when the manager is
    /// dropped or when expiry is disabled.
    pub fn spawn_idle_sweeper(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let enabled = !self.idle.budget().is_zero();
        let interval = self.idle.sweep_interval();
        // Hold only a weak reference so the sweeper never keeps the
        // manager alive on its own.
        let weak = Arc::downgrade(&self);
        drop(self);
        tokio::spawn(async move {
            if !enabled {
                return;
            }
            loop {
                tokio::time::sleep(interval).await;
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                let mut state = manager.state.lock().await;
                manager.expire_if_idle(&mut state).await;
            }
        })
    }

    fn publish(&self, state: &SessionState<L::Handle>) {
        *self.snapshot.lock() = Snapshot::of(state);
    }

    /// Forced idle release, evaluated only between operations.
    async fn expire_if_idle(&self, state: &mut SessionState<L::Handle>) {
        if state.phase == SessionPhase::Connected && self.idle.expired(state.last_activity_at) {
            info!(
                target = "sesame.session",
                idle_budget_secs = self.idle.budget().as_secs(),
                "idle budget exhausted, releasing link"
            );
            self.release(state).await;
        }
    }

    /// Closes the handle (if any) and transitions to `Disconnected`.
    async fn release(&self, state: &mut SessionState<L::Handle>) {
        if let Some(handle) = state.handle.take() {
            self.link.close(handle).await;
        }
        state.phase = SessionPhase::Disconnected;
        state.established_at = None;
        state.last_activity_at = None;
        self.publish(state);
    }

    /// One full connect attempt; on failure the session lands in `Failed`.
    async fn open_link(&self, state: &mut SessionState<L::Handle>) -> Result<()> {
        match self.try_open(state).await {
            Ok(()) => Ok(()),
            Err(err) => {
                state.phase = SessionPhase::Failed;
                self.publish(state);
                warn!(target = "sesame.session", error = %err, "connect failed");
                Err(err)
            }
        }
    }

    /// One discovery + open + login attempt, without deciding what a
    /// failure means for the session phase.
    async fn try_open(&self, state: &mut SessionState<L::Handle>) -> Result<()> {
        state.phase = SessionPhase::Connecting;
        self.publish(state);
        debug!(
            target = "sesame.session",
            address = %self.identity.address,
            "discovering device"
        );

        let opened = match timeout(
            self.config.connect_timeout,
            self.link.discover_and_open(&self.identity, self.config.connect_timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::DeviceUnreachable(format!(
                "scan timed out after {}s",
                self.config.connect_timeout.as_secs()
            ))),
        };

        match opened {
            Ok(handle) => {
                let now = Instant::now();
                state.handle = Some(handle);
                state.phase = SessionPhase::Connected;
                state.established_at = Some(now);
                state.last_activity_at = Some(now);
                state.reconnect_attempts = 0;
                state.last_error = None;
                self.publish(state);
                info!(
                    target = "sesame.session",
                    address = %self.identity.address,
                    "link established"
                );
                Ok(())
            }
            Err(err) => {
                state.last_error = Some(err.to_string());
                self.publish(state);
                Err(err)
            }
        }
    }

    /// Runs one operation over the open link with the per-operation
    /// timeout; a timeout counts as a transport failure.
    async fn perform(
        &self,
        state: &mut SessionState<L::Handle>,
        operation: Operation,
        history_tag: &str,
    ) -> Result<Telemetry> {
        let Some(handle) = state.handle.as_mut() else {
            return Err(Error::Transport(
                "link handle missing while connected".into(),
            ));
        };

        let result = match timeout(
            self.config.operation_timeout,
            self.link.perform(handle, operation, history_tag),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Transport(format!(
                "operation '{operation}' timed out after {}ms",
                self.config.operation_timeout.as_millis()
            ))),
        };

        match result {
            Ok(telemetry) => {
                state.last_activity_at = Some(Instant::now());
                state.last_error = None;
                self.publish(state);
                Ok(telemetry)
            }
            Err(err) => Err(err),
        }
    }

    /// Recovery episode after a transient mid-operation failure: re-open
    /// the link within the attempt budget, then replay the original
    /// operation exactly once so a transient drop is invisible on success.
    async fn recover_and_replay(
        &self,
        state: &mut SessionState<L::Handle>,
        operation: Operation,
        history_tag: &str,
        first_failure: Error,
    ) -> Result<ExecuteOutcome> {
        warn!(
            target = "sesame.session",
            operation = %operation,
            error = %first_failure,
            "link failed mid-operation, starting recovery"
        );

        // The failed handle is dead weight; release it before rediscovery.
        if let Some(handle) = state.handle.take() {
            self.link.close(handle).await;
        }
        state.established_at = None;

        let mut last_failure = first_failure;
        loop {
            match self.retry.decide(state.reconnect_attempts, &last_failure) {
                RetryDecision::GiveUp => {
                    state.phase = SessionPhase::Failed;
                    state.last_error = Some(last_failure.to_string());
                    self.publish(state);
                    warn!(
                        target = "sesame.session",
                        attempts = state.reconnect_attempts,
                        error = %last_failure,
                        "recovery exhausted, session failed"
                    );
                    return Err(last_failure);
                }
                RetryDecision::Retry { delay } => {
                    state.phase = SessionPhase::Reconnecting;
                    self.publish(state);
                    state.reconnect_attempts += 1;
                    debug!(
                        target = "sesame.session",
                        attempt = state.reconnect_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "reconnect attempt"
                    );
                    tokio::time::sleep(delay).await;
                }
            }

            // Entering `Connected` resets the attempt counter, so take the
            // consumed count first for the outcome metadata.
            let consumed = state.reconnect_attempts;
            match self.try_open(state).await {
                Ok(()) => {
                    return match self.perform(state, operation, history_tag).await {
                        Ok(telemetry) => {
                            info!(
                                target = "sesame.session",
                                attempts = consumed,
                                operation = %operation,
                                "recovered and replayed operation"
                            );
                            Ok(ExecuteOutcome {
                                telemetry,
                                connection_reused: false,
                                reconnect_attempts: consumed,
                            })
                        }
                        Err(err) if err.is_transient() => {
                            // Two drops in a row. The replay happens once;
                            // release the link and hand the caller the error.
                            self.release(state).await;
                            state.last_error = Some(err.to_string());
                            self.publish(state);
                            Err(err)
                        }
                        Err(err) => {
                            state.last_error = Some(err.to_string());
                            self.publish(state);
                            Err(err)
                        }
                    };
                }
                Err(err) if err.is_transient() => {
                    last_failure = err;
                }
                Err(err) => {
                    // Credential rejection mid-recovery cannot be retried
                    // away.
                    state.phase = SessionPhase::Failed;
                    state.last_error = Some(err.to_string());
                    self.publish(state);
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::types::{DeviceStatus, ProductModel};

    #[derive(Default)]
    struct FakeInner {
        /// Scripted connect results, oldest first. Empty queue means
        /// success.
        connects: StdMutex<VecDeque<Result<()>>>,
        /// Scripted perform results, oldest first. Empty queue means a
        /// default successful telemetry read.
        performs: StdMutex<VecDeque<Result<Telemetry>>>,
        perform_delay: StdMutex<Option<Duration>>,
        connect_calls: AtomicU32,
        perform_calls: AtomicU32,
        close_calls: AtomicU32,
    }

    #[derive(Clone, Default)]
    struct FakeLink {
        inner: Arc<FakeInner>,
    }

    impl FakeLink {
        fn fail_connect(&self, err: Error) {
            self.inner.connects.lock().unwrap().push_back(Err(err));
        }

        fn fail_perform(&self, err: Error) {
            self.inner.performs.lock().unwrap().push_back(Err(err));
        }

        fn set_perform_delay(&self, delay: Duration) {
            *self.inner.perform_delay.lock().unwrap() = Some(delay);
        }

        fn connect_calls(&self) -> u32 {
            self.inner.connect_calls.load(Ordering::SeqCst)
        }

        fn perform_calls(&self) -> u32 {
            self.inner.perform_calls.load(Ordering::SeqCst)
        }

        fn close_calls(&self) -> u32 {
            self.inner.close_calls.load(Ordering::SeqCst)
        }
    }

    fn locked_telemetry() -> Telemetry {
        Telemetry {
            status: DeviceStatus::Locked,
            battery_percentage: 88,
            battery_voltage: 5.9,
            is_in_lock_range: true,
            is_in_unlock_range: false,
            position: Some(20),
        }
    }

    #[async_trait]
    impl DeviceLink for FakeLink {
        type Handle = u32;

        async fn discover_and_open(
            &self,
            _identity: &DeviceIdentity,
            _timeout: Duration,
        ) -> Result<u32> {
            let n = self.inner.connect_calls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.inner.connects.lock().unwrap().pop_front() {
                Some(Err(err)) => Err(err),
                Some(Ok(())) | None => Ok(n),
            }
        }

        async fn perform(
            &self,
            _handle: &mut u32,
            _operation: Operation,
            _history_tag: &str,
        ) -> Result<Telemetry> {
            self.inner.perform_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.inner.perform_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let scripted = self.inner.performs.lock().unwrap().pop_front();
            match scripted {
                Some(result) => result,
                None => Ok(locked_telemetry()),
            }
        }

        async fn close(&self, _handle: u32) {
            self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn identity(model: ProductModel) -> DeviceIdentity {
        DeviceIdentity {
            address: "aa:bb:cc:dd:ee:ff".into(),
            secret_key: "00".repeat(16),
            public_key: "11".repeat(32),
            model,
        }
    }

    fn fast_config() -> SessionConfig {
        SessionConfig {
            connect_timeout: Duration::from_millis(200),
            operation_timeout: Duration::from_millis(200),
            idle_timeout: Duration::ZERO,
            max_reconnect_attempts: 5,
        }
    }

    fn manager_with(
        link: &FakeLink,
        model: ProductModel,
        config: SessionConfig,
    ) -> Arc<SessionManager<FakeLink>> {
        let attempts = config.max_reconnect_attempts;
        Arc::new(
            SessionManager::new(link.clone(), identity(model), config).with_retry_policy(
                RetryPolicy::new(attempts)
                    .with_delays(Duration::from_millis(1), Duration::from_millis(2)),
            ),
        )
    }

    fn manager(link: &FakeLink) -> Arc<SessionManager<FakeLink>> {
        manager_with(link, ProductModel::Sesame2, fast_config())
    }

    #[tokio::test]
    async fn cold_execute_connects_then_reuses() {
        let link = FakeLink::default();
        let manager = manager(&link);

        let first = manager.execute(Operation::Lock, "test").await.unwrap();
        assert!(!first.connection_reused);
        assert_eq!(first.reconnect_attempts, 0);
        assert_eq!(first.telemetry.status, DeviceStatus::Locked);

        let second = manager.execute(Operation::Lock, "test").await.unwrap();
        assert!(second.connection_reused);

        // One discovery for both operations.
        assert_eq!(link.connect_calls(), 1);
        assert_eq!(link.perform_calls(), 2);
        assert_eq!(manager.connection_info().phase, SessionPhase::Connected);
    }

    #[tokio::test]
    async fn unsupported_operation_never_touches_link() {
        let link = FakeLink::default();
        let manager = manager(&link);

        let err = manager.execute(Operation::Click, "test").await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
        assert_eq!(link.connect_calls(), 0);
        assert_eq!(link.perform_calls(), 0);
        assert_eq!(manager.connection_info().phase, SessionPhase::Disconnected);
    }

    #[tokio::test]
    async fn click_is_valid_for_bot_devices() {
        let link = FakeLink::default();
        let manager = manager_with(&link, ProductModel::SesameBot, fast_config());

        let outcome = manager.execute(Operation::Click, "test").await.unwrap();
        assert!(!outcome.connection_reused);
        assert_eq!(link.perform_calls(), 1);

        let err = manager.execute(Operation::Lock, "test").await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    #[tokio::test]
    async fn transient_drop_is_invisible_after_replay() {
        let link = FakeLink::default();
        let manager = manager(&link);

        manager.execute(Operation::Status, "test").await.unwrap();
        link.fail_perform(Error::Transport("link dropped".into()));

        let outcome = manager.execute(Operation::Toggle, "test").await.unwrap();
        assert!(!outcome.connection_reused);
        assert_eq!(outcome.reconnect_attempts, 1);

        // Old handle closed, one rediscovery, replay succeeded.
        assert_eq!(link.close_calls(), 1);
        assert_eq!(link.connect_calls(), 2);
        let info = manager.connection_info();
        assert_eq!(info.phase, SessionPhase::Connected);
        assert_eq!(info.reconnect_attempts, 0);
        assert!(info.last_error.is_none());
    }

    #[tokio::test]
    async fn exhausted_retries_fail_the_session() {
        let link = FakeLink::default();
        let config = SessionConfig {
            max_reconnect_attempts: 3,
            ..fast_config()
        };
        let manager = manager_with(&link, ProductModel::Sesame2, config);

        manager.execute(Operation::Status, "test").await.unwrap();
        link.fail_perform(Error::Transport("link dropped".into()));
        for _ in 0..3 {
            link.fail_connect(Error::DeviceUnreachable("no advertisement".into()));
        }

        let err = manager.execute(Operation::Lock, "test").await.unwrap_err();
        assert!(matches!(err, Error::DeviceUnreachable(_)));

        let info = manager.connection_info();
        assert_eq!(info.phase, SessionPhase::Failed);
        assert_eq!(info.reconnect_attempts, 3);
        assert!(info.last_error.is_some());
        // Initial connect plus three failed reconnects.
        assert_eq!(link.connect_calls(), 4);

        // A later explicit connect starts fresh and succeeds.
        let info = manager.connect().await.unwrap();
        assert_eq!(info.phase, SessionPhase::Connected);
        assert_eq!(info.reconnect_attempts, 0);
    }

    #[tokio::test]
    async fn auth_rejection_short_circuits_recovery() {
        let link = FakeLink::default();
        let manager = manager(&link);

        manager.execute(Operation::Status, "test").await.unwrap();
        link.fail_perform(Error::Transport("link dropped".into()));
        link.fail_connect(Error::AuthenticationFailed("key rejected".into()));

        let err = manager.execute(Operation::Lock, "test").await.unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailed(_)));

        // Exactly one reconnect attempt; permanent failures get no budget.
        assert_eq!(link.connect_calls(), 2);
        let info = manager.connection_info();
        assert_eq!(info.phase, SessionPhase::Failed);
        assert_eq!(info.reconnect_attempts, 1);
    }

    #[tokio::test]
    async fn device_fault_keeps_link_open() {
        let link = FakeLink::default();
        let manager = manager(&link);

        manager.execute(Operation::Status, "test").await.unwrap();
        link.fail_perform(Error::DeviceFault("motor stall".into()));

        let err = manager.execute(Operation::Lock, "test").await.unwrap_err();
        assert!(matches!(err, Error::DeviceFault(_)));

        // No reconnect, no close; the session stays connected and the
        // fault is retained for status reporting.
        assert_eq!(link.close_calls(), 0);
        let info = manager.connection_info();
        assert_eq!(info.phase, SessionPhase::Connected);
        assert!(info.last_error.as_deref().unwrap().contains("motor stall"));

        let outcome = manager.execute(Operation::Lock, "test").await.unwrap();
        assert!(outcome.connection_reused);
        assert_eq!(link.connect_calls(), 1);
        assert!(manager.connection_info().last_error.is_none());
    }

    #[tokio::test]
    async fn replay_failure_surfaces_and_releases_link() {
        let link = FakeLink::default();
        let manager = manager(&link);

        manager.execute(Operation::Status, "test").await.unwrap();
        link.fail_perform(Error::Transport("first drop".into()));
        link.fail_perform(Error::Transport("second drop".into()));

        let err = manager.execute(Operation::Toggle, "test").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.to_string().contains("second drop"));

        // Both handles were released; the replay runs exactly once.
        assert_eq!(link.close_calls(), 2);
        assert_eq!(manager.connection_info().phase, SessionPhase::Disconnected);
    }

    #[tokio::test]
    async fn implicit_connect_failure_is_the_callers_failure() {
        let link = FakeLink::default();
        let manager = manager(&link);
        link.fail_connect(Error::DeviceUnreachable("not found during scan".into()));

        let err = manager.execute(Operation::Status, "test").await.unwrap_err();
        assert!(matches!(err, Error::DeviceUnreachable(_)));

        // Single attempt, no operation ran, session is failed.
        assert_eq!(link.connect_calls(), 1);
        assert_eq!(link.perform_calls(), 0);
        assert_eq!(manager.connection_info().phase, SessionPhase::Failed);
    }

    #[tokio::test]
    async fn explicit_connect_is_noop_when_connected() {
        let link = FakeLink::default();
        let manager = manager(&link);

        let first = manager.connect().await.unwrap();
        assert_eq!(first.phase, SessionPhase::Connected);
        let second = manager.connect().await.unwrap();
        assert_eq!(second.phase, SessionPhase::Connected);
        assert_eq!(link.connect_calls(), 1);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let link = FakeLink::default();
        let manager = manager(&link);

        manager.connect().await.unwrap();
        let info = manager.disconnect().await;
        assert_eq!(info.phase, SessionPhase::Disconnected);
        let info = manager.disconnect().await;
        assert_eq!(info.phase, SessionPhase::Disconnected);

        // Second disconnect found no handle to close.
        assert_eq!(link.close_calls(), 1);
    }

    #[tokio::test]
    async fn operation_timeout_counts_as_transport_failure() {
        let link = FakeLink::default();
        let config = SessionConfig {
            operation_timeout: Duration::from_millis(20),
            max_reconnect_attempts: 1,
            ..fast_config()
        };
        let manager = manager_with(&link, ProductModel::Sesame2, config);

        manager.execute(Operation::Status, "test").await.unwrap();
        link.set_perform_delay(Duration::from_millis(200));

        let err = manager.execute(Operation::Lock, "test").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.to_string().contains("timed out"));
        // Both the original attempt and the replay timed out; the link was
        // released on the way out.
        assert_eq!(manager.connection_info().phase, SessionPhase::Disconnected);
    }

    #[tokio::test]
    async fn idle_expiry_is_checked_lazily_before_operations() {
        let link = FakeLink::default();
        let config = SessionConfig {
            idle_timeout: Duration::from_millis(30),
            ..fast_config()
        };
        let manager = manager_with(&link, ProductModel::Sesame2, config);

        manager.execute(Operation::Status, "test").await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Expired link is released and transparently re-established.
        let outcome = manager.execute(Operation::Status, "test").await.unwrap();
        assert!(!outcome.connection_reused);
        assert_eq!(link.close_calls(), 1);
        assert_eq!(link.connect_calls(), 2);
    }

    #[tokio::test]
    async fn idle_sweeper_releases_link_between_requests() {
        let link = FakeLink::default();
        let config = SessionConfig {
            idle_timeout: Duration::from_millis(30),
            ..fast_config()
        };
        let manager = manager_with(&link, ProductModel::Sesame2, config);
        let sweeper = Arc::clone(&manager).spawn_idle_sweeper();

        manager.execute(Operation::Status, "test").await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        // No request ran, yet the status read observes the release.
        assert_eq!(manager.connection_info().phase, SessionPhase::Disconnected);
        assert_eq!(link.close_calls(), 1);

        let outcome = manager.execute(Operation::Status, "test").await.unwrap();
        assert!(!outcome.connection_reused);

        sweeper.abort();
    }

    #[tokio::test]
    async fn concurrent_executes_serialize_on_one_link() {
        let link = FakeLink::default();
        let manager = manager(&link);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            tasks.push(tokio::spawn(async move {
                manager.execute(Operation::Toggle, "test").await.unwrap()
            }));
        }

        let mut cold = 0;
        for task in tasks {
            let outcome = task.await.unwrap();
            if !outcome.connection_reused {
                cold += 1;
            }
        }

        // Exactly one caller paid the discovery cost; everyone else reused
        // the link it opened.
        assert_eq!(cold, 1);
        assert_eq!(link.connect_calls(), 1);
        assert_eq!(link.perform_calls(), 8);
    }

    #[tokio::test]
    async fn test_connection_probes_via_status_read() {
        let link = FakeLink::default();
        let manager = manager(&link);

        let outcome = manager.test_connection().await.unwrap();
        assert!(!outcome.connection_reused);
        assert_eq!(outcome.telemetry.status, DeviceStatus::Locked);

        let outcome = manager.test_connection().await.unwrap();
        assert!(outcome.connection_reused);
        assert_eq!(link.connect_calls(), 1);
    }
}
