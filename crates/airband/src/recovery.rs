//! Recovery engine
//!
//! Pure-logic retry state machine for playback failures. One instance owns
//! every retry counter, the pending retry deadline, and the
//! awaiting-network latch; the controller drives it with failure reports,
//! connectivity updates, and `tick`-time deadline queries. No threads, no
//! timers — deadlines are plain `Instant`s checked by the caller's loop, so
//! "cancel a timer" is just dropping the slot.
//!
//! Budgets are per failure episode, not cumulative: any healthy playing
//! transition calls [`RecoveryEngine::cleanup`] and zeroes everything.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::classify::ErrorClass;
use crate::config::network::CONNECTIVITY_POLL_SECS;
use crate::config::retry::{
    GENERAL_BASE_DELAY_MS, GENERAL_MAX_DELAY_MS, HTTP_STATUS_MAX_DELAY_MS, HTTP_STATUS_STEP_MS,
    MAX_GENERAL_RETRIES, MAX_HTTP_STATUS_RETRIES,
};

/// Timing and budget knobs, shrinkable in tests.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    pub max_general_retries: u32,
    pub max_http_status_retries: u32,
    pub general_base_delay: Duration,
    pub general_max_delay: Duration,
    pub http_status_step: Duration,
    pub http_status_max_delay: Duration,
    pub connectivity_poll_interval: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_general_retries: MAX_GENERAL_RETRIES,
            max_http_status_retries: MAX_HTTP_STATUS_RETRIES,
            general_base_delay: Duration::from_millis(GENERAL_BASE_DELAY_MS),
            general_max_delay: Duration::from_millis(GENERAL_MAX_DELAY_MS),
            http_status_step: Duration::from_millis(HTTP_STATUS_STEP_MS),
            http_status_max_delay: Duration::from_millis(HTTP_STATUS_MAX_DELAY_MS),
            connectivity_poll_interval: Duration::from_secs(CONNECTIVITY_POLL_SECS),
        }
    }
}

/// Which scheduled-retry slot a due deadline belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    HttpStatus,
    General,
    /// Live-edge reseek deferred out of a failure handler
    Reseek,
}

/// What the controller should do in response to a failure report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Re-resolve the stream key and restart immediately (live-edge reseek)
    RetryNow,
    /// A retry was scheduled; drive it via [`RecoveryEngine::due_retry`]
    RetryAfter(Duration),
    /// Blocked on connectivity; polls and change events will resume playback
    AwaitingNetwork,
    /// Retry budget exhausted; no further automatic action
    GaveUp,
}

#[derive(Debug, Clone, Copy)]
struct PendingRetry {
    class: RetryClass,
    due: Instant,
}

/// Per-failure-class retry state machine
#[derive(Debug)]
pub struct RecoveryEngine {
    config: RecoveryConfig,
    general_retries: u32,
    http_status_retries: u32,
    pending: Option<PendingRetry>,
    awaiting_network: bool,
    next_poll: Option<Instant>,
}

impl Default for RecoveryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecoveryEngine {
    pub fn new() -> Self {
        Self::with_config(RecoveryConfig::default())
    }

    /// Create an engine with custom timing (for testing)
    pub fn with_config(config: RecoveryConfig) -> Self {
        Self {
            config,
            general_retries: 0,
            http_status_retries: 0,
            pending: None,
            awaiting_network: false,
            next_poll: None,
        }
    }

    /// Report a classified failure and decide the recovery step.
    ///
    /// `network_available` is the controller's current connectivity mirror;
    /// a General failure on a dead network is reclassified into the network
    /// path without consuming a general attempt.
    pub fn on_failure(
        &mut self,
        class: ErrorClass,
        network_available: bool,
        now: Instant,
    ) -> RecoveryDecision {
        match class {
            ErrorClass::BehindLiveWindow => {
                // Fell outside the live segment window. The fix is to reseek
                // to "now", not to wait — no counter, no connectivity check.
                debug!("behind live window, reseeking to live edge");
                RecoveryDecision::RetryNow
            }
            ErrorClass::Network => self.await_network(now),
            ErrorClass::HttpStatus => {
                self.http_status_retries += 1;
                if self.http_status_retries > self.config.max_http_status_retries {
                    self.http_status_retries = 0;
                    self.pending = None;
                    debug!("http-status retry budget exhausted, giving up");
                    RecoveryDecision::GaveUp
                } else {
                    let delay = self.http_status_delay();
                    self.schedule(RetryClass::HttpStatus, now + delay);
                    debug!(
                        attempt = self.http_status_retries,
                        ?delay,
                        "http-status retry scheduled"
                    );
                    RecoveryDecision::RetryAfter(delay)
                }
            }
            ErrorClass::General => {
                if !network_available {
                    return self.await_network(now);
                }
                self.general_retries += 1;
                if self.general_retries > self.config.max_general_retries {
                    self.general_retries = 0;
                    self.pending = None;
                    debug!("general retry budget exhausted, giving up");
                    RecoveryDecision::GaveUp
                } else {
                    let delay = self.general_delay();
                    self.schedule(RetryClass::General, now + delay);
                    debug!(
                        attempt = self.general_retries,
                        ?delay,
                        "general retry scheduled"
                    );
                    RecoveryDecision::RetryAfter(delay)
                }
            }
        }
    }

    /// Scheduled retry that is due at `now`, if any. Taking it clears the
    /// slot — a retry fires at most once.
    pub fn due_retry(&mut self, now: Instant) -> Option<RetryClass> {
        match self.pending {
            Some(p) if now >= p.due => {
                self.pending = None;
                Some(p.class)
            }
            _ => None,
        }
    }

    /// Connectivity poll that is due at `now`. Taking it re-arms the next
    /// poll; false while not awaiting the network.
    pub fn due_connectivity_poll(&mut self, now: Instant) -> bool {
        if !self.awaiting_network {
            return false;
        }
        match self.next_poll {
            Some(due) if now >= due => {
                self.next_poll = Some(now + self.config.connectivity_poll_interval);
                true
            }
            _ => false,
        }
    }

    /// Take the network-recovery latch. Returns true exactly once per
    /// awaiting-network episode; the loser of the poll-vs-notification race
    /// gets false and must do nothing.
    pub fn take_network_recovery(&mut self) -> bool {
        if !self.awaiting_network {
            return false;
        }
        self.awaiting_network = false;
        self.next_poll = None;
        debug!("network recovery latch taken");
        true
    }

    /// Convert a fired general retry into the network path, refunding the
    /// consumed attempt: the network turned out to be down at fire time.
    pub fn reroute_to_network(&mut self, now: Instant) {
        self.general_retries = self.general_retries.saturating_sub(1);
        self.await_network(now);
    }

    /// Queue a live-edge reseek through the pending-retry slot, due
    /// immediately. Used when a reseek cannot run inline because another
    /// reseek is still on the call stack; the caller's deadline loop picks
    /// it up on its next pass.
    pub fn schedule_reseek(&mut self, now: Instant) {
        debug!("reseek deferred to the deadline loop");
        self.schedule(RetryClass::Reseek, now);
    }

    /// Cancel every scheduled deadline without touching the retry counters.
    /// Called on user-initiated pause: nothing may restart playback over
    /// the pause, but a later failure in the same episode keeps its place
    /// in the budget.
    pub fn suspend(&mut self) {
        self.pending = None;
        self.awaiting_network = false;
        self.next_poll = None;
    }

    /// Earliest deadline the caller's loop should wake for
    pub fn next_deadline(&self) -> Option<Instant> {
        let retry = self.pending.map(|p| p.due);
        match (retry, self.next_poll) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn awaiting_network(&self) -> bool {
        self.awaiting_network
    }

    pub fn has_pending_retry(&self) -> bool {
        self.pending.is_some()
    }

    pub fn general_retries(&self) -> u32 {
        self.general_retries
    }

    pub fn http_status_retries(&self) -> u32 {
        self.http_status_retries
    }

    /// Cancel all pending deadlines and zero all counters. Called on every
    /// healthy playing transition and at service teardown.
    pub fn cleanup(&mut self) {
        self.general_retries = 0;
        self.http_status_retries = 0;
        self.pending = None;
        self.awaiting_network = false;
        self.next_poll = None;
    }

    fn await_network(&mut self, now: Instant) -> RecoveryDecision {
        // The network path never uses time-based retries; cancel whatever
        // was scheduled and wait for connectivity instead.
        self.pending = None;
        if !self.awaiting_network {
            self.awaiting_network = true;
            debug!("awaiting network connectivity");
        }
        self.next_poll = Some(now + self.config.connectivity_poll_interval);
        RecoveryDecision::AwaitingNetwork
    }

    /// Cancel-and-replace: only one scheduled retry exists at a time.
    fn schedule(&mut self, class: RetryClass, due: Instant) {
        self.pending = Some(PendingRetry { class, due });
    }

    /// min(base * 2^(n-1), max)
    fn general_delay(&self) -> Duration {
        let exp = self.general_retries.saturating_sub(1).min(10);
        let base = self.config.general_base_delay.as_millis() as u64;
        let max = self.config.general_max_delay.as_millis() as u64;
        Duration::from_millis((base << exp).min(max))
    }

    /// min(step * n, max) — deliberately gentler than general backoff, since
    /// HTTP-status errors from a live-radio CDN are usually edge hiccups.
    fn http_status_delay(&self) -> Duration {
        let step = self.config.http_status_step.as_millis() as u64;
        let max = self.config.http_status_max_delay.as_millis() as u64;
        Duration::from_millis(step.saturating_mul(self.http_status_retries as u64).min(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RecoveryEngine {
        RecoveryEngine::new()
    }

    fn fail(
        engine: &mut RecoveryEngine,
        class: ErrorClass,
        network: bool,
        now: Instant,
    ) -> RecoveryDecision {
        engine.on_failure(class, network, now)
    }

    // --- general backoff schedule ---

    #[test]
    fn general_delays_double_then_cap() {
        let mut e = engine();
        let now = Instant::now();
        assert_eq!(
            fail(&mut e, ErrorClass::General, true, now),
            RecoveryDecision::RetryAfter(Duration::from_millis(1000))
        );
        assert_eq!(
            fail(&mut e, ErrorClass::General, true, now),
            RecoveryDecision::RetryAfter(Duration::from_millis(2000))
        );
        assert_eq!(
            fail(&mut e, ErrorClass::General, true, now),
            RecoveryDecision::RetryAfter(Duration::from_millis(4000))
        );
    }

    #[test]
    fn general_gives_up_after_cap_and_resets() {
        let mut e = engine();
        let now = Instant::now();
        for _ in 0..3 {
            assert!(matches!(
                fail(&mut e, ErrorClass::General, true, now),
                RecoveryDecision::RetryAfter(_)
            ));
        }
        assert_eq!(
            fail(&mut e, ErrorClass::General, true, now),
            RecoveryDecision::GaveUp
        );
        assert_eq!(e.general_retries(), 0);
        assert!(!e.has_pending_retry());
    }

    #[test]
    fn general_delay_caps_at_max() {
        let mut e = RecoveryEngine::with_config(RecoveryConfig {
            max_general_retries: 10,
            ..RecoveryConfig::default()
        });
        let now = Instant::now();
        let mut last = Duration::ZERO;
        for _ in 0..10 {
            if let RecoveryDecision::RetryAfter(d) = fail(&mut e, ErrorClass::General, true, now) {
                last = d;
            }
        }
        assert_eq!(last, Duration::from_millis(30_000));
    }

    // --- general reclassification on dead network ---

    #[test]
    fn general_on_dead_network_awaits_without_burning_attempt() {
        let mut e = engine();
        let now = Instant::now();
        assert_eq!(
            fail(&mut e, ErrorClass::General, false, now),
            RecoveryDecision::AwaitingNetwork
        );
        assert_eq!(e.general_retries(), 0);
        assert!(e.awaiting_network());
        assert!(!e.has_pending_retry());
    }

    #[test]
    fn reroute_refunds_the_consumed_attempt() {
        let mut e = engine();
        let now = Instant::now();
        fail(&mut e, ErrorClass::General, true, now);
        assert_eq!(e.general_retries(), 1);

        // The scheduled retry fired but the probe said Disconnected.
        let due = now + Duration::from_millis(1000);
        assert_eq!(e.due_retry(due), Some(RetryClass::General));
        e.reroute_to_network(due);
        assert_eq!(e.general_retries(), 0);
        assert!(e.awaiting_network());
    }

    // --- http-status schedule ---

    #[test]
    fn http_status_ramp_is_linear_and_capped() {
        let mut e = engine();
        let now = Instant::now();
        let expected = [1000u64, 2000, 3000, 4000, 5000];
        for ms in expected {
            assert_eq!(
                fail(&mut e, ErrorClass::HttpStatus, true, now),
                RecoveryDecision::RetryAfter(Duration::from_millis(ms))
            );
        }
    }

    #[test]
    fn sixth_http_status_failure_gives_up_and_resets() {
        let mut e = engine();
        let now = Instant::now();
        for _ in 0..5 {
            assert!(matches!(
                fail(&mut e, ErrorClass::HttpStatus, true, now),
                RecoveryDecision::RetryAfter(_)
            ));
        }
        assert_eq!(
            fail(&mut e, ErrorClass::HttpStatus, true, now),
            RecoveryDecision::GaveUp
        );
        assert_eq!(e.http_status_retries(), 0);
        assert!(!e.has_pending_retry());
    }

    #[test]
    fn http_status_ignores_network_flag() {
        // HTTP status means the server answered — the network is up by
        // definition, so the dead-network reclassification never applies.
        let mut e = engine();
        let now = Instant::now();
        assert!(matches!(
            fail(&mut e, ErrorClass::HttpStatus, false, now),
            RecoveryDecision::RetryAfter(_)
        ));
    }

    // --- counter independence ---

    #[test]
    fn http_and_general_budgets_are_independent() {
        let mut e = engine();
        let now = Instant::now();
        for _ in 0..5 {
            fail(&mut e, ErrorClass::HttpStatus, true, now);
        }
        assert_eq!(e.http_status_retries(), 5);
        assert_eq!(e.general_retries(), 0);

        // A general failure starts from attempt 1 regardless.
        assert_eq!(
            fail(&mut e, ErrorClass::General, true, now),
            RecoveryDecision::RetryAfter(Duration::from_millis(1000))
        );
        assert_eq!(e.general_retries(), 1);
        assert_eq!(e.http_status_retries(), 5);
    }

    // --- behind live window ---

    #[test]
    fn behind_live_window_retries_now_without_counters() {
        let mut e = engine();
        let now = Instant::now();
        assert_eq!(
            fail(&mut e, ErrorClass::BehindLiveWindow, true, now),
            RecoveryDecision::RetryNow
        );
        assert_eq!(e.general_retries(), 0);
        assert_eq!(e.http_status_retries(), 0);
        assert!(!e.has_pending_retry());
    }

    #[test]
    fn behind_live_window_skips_connectivity_check() {
        // Fast-path reseek: even a dead network mirror doesn't divert it.
        let mut e = engine();
        assert_eq!(
            fail(&mut e, ErrorClass::BehindLiveWindow, false, Instant::now()),
            RecoveryDecision::RetryNow
        );
        assert!(!e.awaiting_network());
    }

    #[test]
    fn scheduled_reseek_is_immediately_due_and_fires_once() {
        let mut e = engine();
        let now = Instant::now();
        e.schedule_reseek(now);
        assert_eq!(e.due_retry(now), Some(RetryClass::Reseek));
        assert_eq!(e.due_retry(now), None);
        assert_eq!(e.general_retries(), 0);
        assert_eq!(e.http_status_retries(), 0);
    }

    // --- suspend ---

    #[test]
    fn suspend_cancels_deadlines_but_keeps_counters() {
        let mut e = engine();
        let now = Instant::now();
        fail(&mut e, ErrorClass::HttpStatus, true, now);
        fail(&mut e, ErrorClass::Network, true, now);

        e.suspend();
        assert!(!e.has_pending_retry());
        assert!(!e.awaiting_network());
        assert_eq!(e.next_deadline(), None);
        // The budget position survives: the next http failure is attempt 2.
        assert_eq!(e.http_status_retries(), 1);
        assert_eq!(
            fail(&mut e, ErrorClass::HttpStatus, true, now),
            RecoveryDecision::RetryAfter(Duration::from_millis(2000))
        );
    }

    // --- network latch ---

    #[test]
    fn network_failure_sets_latch_and_poll() {
        let mut e = engine();
        let now = Instant::now();
        assert_eq!(
            fail(&mut e, ErrorClass::Network, true, now),
            RecoveryDecision::AwaitingNetwork
        );
        assert!(e.awaiting_network());
        assert!(!e.has_pending_retry());
        assert!(!e.due_connectivity_poll(now));
        assert!(e.due_connectivity_poll(now + Duration::from_secs(5)));
    }

    #[test]
    fn latch_is_taken_exactly_once() {
        let mut e = engine();
        fail(&mut e, ErrorClass::Network, true, Instant::now());
        assert!(e.take_network_recovery());
        assert!(!e.take_network_recovery());
        assert!(!e.awaiting_network());
    }

    #[test]
    fn taking_the_latch_disarms_the_poll() {
        let mut e = engine();
        let now = Instant::now();
        fail(&mut e, ErrorClass::Network, true, now);
        assert!(e.take_network_recovery());
        assert!(!e.due_connectivity_poll(now + Duration::from_secs(60)));
    }

    #[test]
    fn poll_rearms_after_firing() {
        let mut e = engine();
        let now = Instant::now();
        fail(&mut e, ErrorClass::Network, true, now);

        let first = now + Duration::from_secs(5);
        assert!(e.due_connectivity_poll(first));
        assert!(!e.due_connectivity_poll(first + Duration::from_secs(1)));
        assert!(e.due_connectivity_poll(first + Duration::from_secs(5)));
    }

    #[test]
    fn network_failure_cancels_scheduled_retry() {
        let mut e = engine();
        let now = Instant::now();
        fail(&mut e, ErrorClass::General, true, now);
        assert!(e.has_pending_retry());

        fail(&mut e, ErrorClass::Network, true, now);
        assert!(!e.has_pending_retry());
        // The orphaned deadline never fires.
        assert_eq!(e.due_retry(now + Duration::from_secs(60)), None);
    }

    // --- due_retry semantics ---

    #[test]
    fn retry_is_not_due_before_its_deadline() {
        let mut e = engine();
        let now = Instant::now();
        fail(&mut e, ErrorClass::General, true, now);
        assert_eq!(e.due_retry(now), None);
        assert_eq!(e.due_retry(now + Duration::from_millis(999)), None);
        assert_eq!(
            e.due_retry(now + Duration::from_millis(1000)),
            Some(RetryClass::General)
        );
    }

    #[test]
    fn taken_retry_does_not_fire_twice() {
        let mut e = engine();
        let now = Instant::now();
        fail(&mut e, ErrorClass::HttpStatus, true, now);
        let due = now + Duration::from_secs(1);
        assert_eq!(e.due_retry(due), Some(RetryClass::HttpStatus));
        assert_eq!(e.due_retry(due), None);
    }

    #[test]
    fn rescheduling_replaces_the_pending_retry() {
        let mut e = engine();
        let now = Instant::now();
        fail(&mut e, ErrorClass::HttpStatus, true, now);
        fail(&mut e, ErrorClass::HttpStatus, true, now);

        // Only the newest deadline exists: 2s, not the original 1s.
        assert_eq!(e.due_retry(now + Duration::from_millis(1500)), None);
        assert_eq!(
            e.due_retry(now + Duration::from_millis(2000)),
            Some(RetryClass::HttpStatus)
        );
    }

    // --- cleanup ---

    #[test]
    fn cleanup_zeroes_everything() {
        let mut e = engine();
        let now = Instant::now();
        fail(&mut e, ErrorClass::HttpStatus, true, now);
        fail(&mut e, ErrorClass::General, true, now);
        fail(&mut e, ErrorClass::Network, true, now);

        e.cleanup();
        assert_eq!(e.general_retries(), 0);
        assert_eq!(e.http_status_retries(), 0);
        assert!(!e.has_pending_retry());
        assert!(!e.awaiting_network());
        assert_eq!(e.next_deadline(), None);
    }

    #[test]
    fn budgets_are_per_episode_not_cumulative() {
        let mut e = engine();
        let now = Instant::now();
        for _ in 0..2 {
            fail(&mut e, ErrorClass::General, true, now);
        }
        e.cleanup(); // playback recovered

        // A fresh episode starts from the base delay again.
        assert_eq!(
            fail(&mut e, ErrorClass::General, true, now),
            RecoveryDecision::RetryAfter(Duration::from_millis(1000))
        );
    }

    // --- next_deadline ---

    #[test]
    fn next_deadline_picks_the_earliest() {
        let mut e = engine();
        let now = Instant::now();
        assert_eq!(e.next_deadline(), None);

        fail(&mut e, ErrorClass::General, true, now);
        assert_eq!(e.next_deadline(), Some(now + Duration::from_millis(1000)));
    }
}
