//! Circuit breaker protecting the execution backend.
//!
//! Three-state FSM:
//! - CLOSED: pass everything, count consecutive failures
//! - OPEN: reject everything until the timeout elapses
//! - HALF_OPEN: allow trial calls, close after enough consecutive successes
//!
//! The OPEN -> HALF_OPEN transition happens lazily on the next `allow` call,
//! not via a background timer. State and counters mutate as one atomic unit
//! under a single mutex; no caller observes a transitional inconsistency.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::info;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation.
    Closed,
    /// Blocking requests.
    Open,
    /// Testing whether the backend recovered.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,
    /// Cool-down before OPEN transitions to HALF_OPEN.
    pub timeout: Duration,
    /// Consecutive HALF_OPEN successes needed to close.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

/// Stats snapshot for monitoring endpoints.
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub failure_threshold: u32,
}

/// Observer invoked on every state change, for telemetry.
pub type StateChangeHook = Box<dyn Fn(CircuitState, CircuitState) + Send + Sync>;

struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
}

/// Failure-rate based backend protection.
///
/// Callers must report the outcome of every allowed attempt via
/// `record_success`/`record_failure` exactly once. The breaker cycles
/// indefinitely; there is no terminal state.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    on_state_change: Option<StateChangeHook>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure: None,
            }),
            on_state_change: None,
        }
    }

    /// Attach a state-change observer. The hook runs under the breaker lock
    /// to keep transition order total; it must not call back into the
    /// breaker.
    pub fn with_state_change_hook(mut self, hook: StateChangeHook) -> Self {
        self.on_state_change = Some(hook);
        self
    }

    /// Whether a request may proceed. Transitions OPEN -> HALF_OPEN when the
    /// cool-down has elapsed.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&self, now: Instant) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::Open {
            let elapsed = inner
                .last_failure
                .map(|t| now.duration_since(t))
                .unwrap_or(Duration::MAX);
            if elapsed >= self.config.timeout {
                self.transition(&mut inner, CircuitState::HalfOpen);
                inner.failure_count = 0;
            } else {
                return false;
            }
        }
        true
    }

    /// Report a successful guarded call.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    self.transition(&mut inner, CircuitState::Closed);
                    inner.success_count = 0;
                    inner.failure_count = 0;
                    inner.last_failure = None;
                }
            }
            CircuitState::Closed => {
                // A success breaks any failure streak.
                inner.failure_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Report a failed guarded call (including timeouts).
    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now());
    }

    fn record_failure_at(&self, now: Instant) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;
        inner.success_count = 0;
        inner.last_failure = Some(now);

        match inner.state {
            CircuitState::HalfOpen => {
                self.transition(&mut inner, CircuitState::Open);
            }
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Current state without side effects.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Snapshot for monitoring.
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        CircuitBreakerStats {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            failure_threshold: self.config.failure_threshold,
        }
    }

    /// Manual reset to CLOSED, clearing all counters.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed);
        }
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.last_failure = None;
    }

    fn transition(&self, inner: &mut BreakerInner, new_state: CircuitState) {
        let old_state = inner.state;
        inner.state = new_state;
        info!(
            breaker = %self.name,
            from = old_state.as_str(),
            to = new_state.as_str(),
            "Circuit breaker state change"
        );
        if let Some(hook) = &self.on_state_change {
            hook(old_state, new_state);
        }
    }
}
