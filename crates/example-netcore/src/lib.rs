//! example-netcore - Simulated netcore driver
//!
//! A configurable in-process driver implementing the [`Netcore`] capability
//! contract, used by the demo daemon and the integration tests. It simulates
//! a small network of reachable addresses and lets tests inject start
//! failures, start gates, and per-address reachability faults.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hive_core::{Netcore, NetcoreError, NetcoreResult, ResetMode};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Default)]
struct State {
    started: bool,
    devices: HashSet<String>,
    banned: HashSet<String>,
    unreachable: HashSet<String>,
    fail_start: bool,
    start_delay: Option<Duration>,
    /// Every driver call, in order, e.g. `"permitJoin:30"`
    calls: Vec<String>,
}

/// Simulated protocol driver.
pub struct MockNetcore {
    name: String,
    state: Mutex<State>,
    /// When armed, `start` parks here until released
    start_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockNetcore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State::default()),
            start_gate: Mutex::new(None),
        }
    }

    /// Make `addr` part of the simulated network.
    #[must_use]
    pub fn with_device(self, addr: impl Into<String>) -> Self {
        self.state.lock().devices.insert(addr.into());
        self
    }

    /// Make the next `start` fail.
    #[must_use]
    pub fn with_failing_start(self) -> Self {
        self.state.lock().fail_start = true;
        self
    }

    /// Delay `start` completion by `delay`.
    #[must_use]
    pub fn with_start_delay(self, delay: Duration) -> Self {
        self.state.lock().start_delay = Some(delay);
        self
    }

    /// Park `start` until the returned handle is notified.
    pub fn gate_start(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.start_gate.lock() = Some(gate.clone());
        gate
    }

    /// Make pings to `addr` fail even though it is in the network.
    pub fn set_unreachable(&self, addr: impl Into<String>) {
        self.state.lock().unreachable.insert(addr.into());
    }

    pub fn add_device(&self, addr: impl Into<String>) {
        self.state.lock().devices.insert(addr.into());
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    pub fn is_banned(&self, addr: &str) -> bool {
        self.state.lock().banned.contains(addr)
    }

    /// Driver calls seen so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    fn record(&self, call: impl Into<String>) {
        let call = call.into();
        debug!(netcore = %self.name, call = %call, "mock netcore call");
        self.state.lock().calls.push(call);
    }

    fn ensure_started(&self) -> NetcoreResult<()> {
        if self.state.lock().started {
            Ok(())
        } else {
            Err(NetcoreError::Unavailable(format!(
                "netcore '{}' not started",
                self.name
            )))
        }
    }
}

#[async_trait]
impl Netcore for MockNetcore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> NetcoreResult<()> {
        self.record("start");

        let delay = self.state.lock().start_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let gate = self.start_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock();
        if state.fail_start {
            state.fail_start = false;
            return Err(NetcoreError::Unavailable(format!(
                "netcore '{}' failed to start",
                self.name
            )));
        }
        state.started = true;
        Ok(())
    }

    async fn stop(&self) -> NetcoreResult<()> {
        self.record("stop");
        self.state.lock().started = false;
        Ok(())
    }

    async fn reset(&self, mode: ResetMode) -> NetcoreResult<()> {
        self.record(format!("reset:{mode:?}"));
        if mode == ResetMode::Hard {
            self.state.lock().banned.clear();
        }
        Ok(())
    }

    async fn permit_join(&self, duration: u32) -> NetcoreResult<()> {
        self.ensure_started()?;
        self.record(format!("permitJoin:{duration}"));
        Ok(())
    }

    async fn remove(&self, perm_addr: &str) -> NetcoreResult<()> {
        self.ensure_started()?;
        self.record(format!("remove:{perm_addr}"));
        if self.state.lock().devices.remove(perm_addr) {
            Ok(())
        } else {
            Err(NetcoreError::Unreachable(perm_addr.to_string()))
        }
    }

    async fn ban(&self, perm_addr: &str) -> NetcoreResult<()> {
        self.ensure_started()?;
        self.record(format!("ban:{perm_addr}"));
        self.state.lock().banned.insert(perm_addr.to_string());
        Ok(())
    }

    async fn unban(&self, perm_addr: &str) -> NetcoreResult<()> {
        self.ensure_started()?;
        self.record(format!("unban:{perm_addr}"));
        self.state.lock().banned.remove(perm_addr);
        Ok(())
    }

    async fn ping(&self, perm_addr: &str) -> NetcoreResult<()> {
        self.ensure_started()?;
        self.record(format!("ping:{perm_addr}"));
        let state = self.state.lock();
        let reachable = state.devices.contains(perm_addr)
            && !state.banned.contains(perm_addr)
            && !state.unreachable.contains(perm_addr);
        if reachable {
            Ok(())
        } else {
            Err(NetcoreError::Unreachable(perm_addr.to_string()))
        }
    }

    async fn maintain(&self) -> NetcoreResult<()> {
        self.record("maintain");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn lifecycle_and_call_log() {
        let nc = MockNetcore::new("zb0").with_device("00:01");

        nc.start().await.unwrap();
        assert!(nc.is_started());
        nc.permit_join(30).await.unwrap();
        nc.stop().await.unwrap();
        assert!(!nc.is_started());

        assert_eq!(nc.calls(), vec!["start", "permitJoin:30", "stop"]);
    }

    #[tokio::test]
    async fn operations_require_start() {
        let nc = MockNetcore::new("zb0").with_device("00:01");
        let err = nc.ping("00:01").await.unwrap_err();
        assert!(matches!(err, NetcoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn ping_honors_network_and_bans() {
        let nc = MockNetcore::new("zb0").with_device("00:01");
        nc.start().await.unwrap();

        nc.ping("00:01").await.unwrap();
        assert!(matches!(
            nc.ping("00:99").await.unwrap_err(),
            NetcoreError::Unreachable(_)
        ));

        nc.ban("00:01").await.unwrap();
        assert!(nc.ping("00:01").await.is_err());
        nc.unban("00:01").await.unwrap();
        nc.ping("00:01").await.unwrap();
    }

    #[tokio::test]
    async fn injected_start_failure_fires_once() {
        let nc = MockNetcore::new("zb0").with_failing_start();
        assert!(nc.start().await.is_err());
        nc.start().await.unwrap();
        assert!(nc.is_started());
    }

    #[tokio::test]
    async fn gated_start_waits_for_release() {
        let nc = Arc::new(MockNetcore::new("zb0"));
        let gate = nc.gate_start();

        let task = tokio::spawn({
            let nc = nc.clone();
            async move { nc.start().await }
        });

        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        gate.notify_one();
        task.await.unwrap().unwrap();
        assert!(nc.is_started());
    }
}
