// ── Power state machine ──
//
// Serializes power-change requests for one TV. A single background worker
// drains a one-slot queue: requests that arrive while an attempt runs (or
// while the post-change cooldown holds) collapse into the slot, the latest
// target wins, and every caller folded into the slot receives the outcome
// of the attempt that finally runs for it.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use samtv_api::KeyAction;

use crate::config::PowerTiming;
use crate::error::CoreError;
use crate::link::TvLink;
use crate::model::{ActiveState, PowerState};

// ── PowerPhase ───────────────────────────────────────────────────

/// What the controller is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PowerPhase {
    /// No change pending.
    Idle,
    /// Target is on and the TV is unreachable: sending wake signals.
    Waking,
    /// Power key sent; polling until the TV reports the target.
    Transitioning,
    /// Target reached; further changes wait out the cooldown.
    Settling,
}

// ── Queue ────────────────────────────────────────────────────────

type Waiter = oneshot::Sender<Result<(), CoreError>>;

/// The next change to run, with every caller waiting on it.
#[derive(Debug)]
struct PendingPowerChange {
    target: PowerState,
    waiters: Vec<Waiter>,
}

#[derive(Debug, Default)]
struct Slot {
    /// A worker task is alive and will look at `next` again.
    running: bool,
    next: Option<PendingPowerChange>,
}

/// Completion handle for one accepted request.
#[derive(Debug)]
pub struct PowerChange {
    target: PowerState,
    done: oneshot::Receiver<Result<(), CoreError>>,
}

impl PowerChange {
    pub fn target(&self) -> PowerState {
        self.target
    }

    /// Wait for the attempt this request was folded into.
    ///
    /// A request superseded by a later one resolves together with the later
    /// one, carrying its outcome.
    pub async fn wait(self) -> Result<(), CoreError> {
        self.done
            .await
            .map_err(|_| CoreError::Internal("power worker stopped".into()))?
    }
}

// ── PowerController ──────────────────────────────────────────────

/// Drives one TV to requested power states.
///
/// Cheaply cloneable via `Arc<PowerInner>`.
pub struct PowerController<L: TvLink> {
    inner: Arc<PowerInner<L>>,
}

impl<L: TvLink> Clone for PowerController<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct PowerInner<L> {
    link: L,
    timing: PowerTiming,
    phase: watch::Sender<PowerPhase>,
    observed: watch::Sender<Option<PowerState>>,
    slot: Mutex<Slot>,
}

impl<L: TvLink> PowerController<L> {
    pub fn new(link: L, timing: PowerTiming) -> Self {
        let (phase, _) = watch::channel(PowerPhase::Idle);
        let (observed, _) = watch::channel(None);
        Self {
            inner: Arc::new(PowerInner {
                link,
                timing,
                phase,
                observed,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Subscribe to phase transitions.
    pub fn phase(&self) -> watch::Receiver<PowerPhase> {
        self.inner.phase.subscribe()
    }

    /// Subscribe to the most recent probe result.
    pub fn observed(&self) -> watch::Receiver<Option<PowerState>> {
        self.inner.observed.subscribe()
    }

    /// Queue a change to `target` and return its completion handle.
    ///
    /// Must be called from within a Tokio runtime: the first request spawns
    /// the worker that drains the queue.
    pub fn request(&self, target: PowerState) -> Result<PowerChange, CoreError> {
        if target == PowerState::Unreachable {
            return Err(CoreError::Unsupported {
                operation: "set power".into(),
                reason: "unreachable is an observation, not a target".into(),
            });
        }

        let (tx, done) = oneshot::channel();
        let spawn_worker = {
            let mut slot = self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.next.as_mut() {
                Some(pending) => {
                    if pending.target != target {
                        debug!(from = %pending.target, to = %target, "superseding queued power change");
                    }
                    pending.target = target;
                    pending.waiters.push(tx);
                }
                None => {
                    slot.next = Some(PendingPowerChange {
                        target,
                        waiters: vec![tx],
                    });
                }
            }
            !std::mem::replace(&mut slot.running, true)
        };

        debug!(%target, "queued power change");
        if spawn_worker {
            tokio::spawn(run_queue(Arc::clone(&self.inner)));
        }
        Ok(PowerChange { target, done })
    }

    /// Drive the TV to `target`, waiting for the outcome.
    pub async fn set_target(&self, target: PowerState) -> Result<(), CoreError> {
        self.request(target)?.wait().await
    }

    /// Probe once and collapse the result to active/inactive. Never fails.
    pub async fn get_active_state(&self) -> ActiveState {
        self.inner.observe().await.into()
    }

    /// Probe once.
    pub async fn current_state(&self) -> PowerState {
        self.inner.observe().await
    }
}

fn duration_ms(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Worker ───────────────────────────────────────────────────────

async fn run_queue<L: TvLink>(inner: Arc<PowerInner<L>>) {
    loop {
        let pending = {
            let mut slot = inner.slot.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(pending) = slot.next.take() {
                pending
            } else {
                slot.running = false;
                break;
            }
        };

        let PendingPowerChange { target, waiters } = pending;
        info!(%target, callers = waiters.len(), "starting power change");
        // A panicking link must fail this change, not strand the queue.
        let attempt = tokio::spawn({
            let inner = Arc::clone(&inner);
            async move { inner.attempt(target).await }
        });
        let result = attempt.await.unwrap_or_else(|e| {
            warn!(%target, error = %e, "power change aborted");
            Err(CoreError::Internal(format!("power change aborted: {e}")))
        });

        let succeeded = result.is_ok();
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }

        if succeeded && !inner.timing.cooldown.is_zero() {
            inner.set_phase(PowerPhase::Settling);
            tokio::time::sleep(inner.timing.cooldown).await;
        }
        inner.set_phase(PowerPhase::Idle);
    }
}

impl<L: TvLink> PowerInner<L> {
    fn set_phase(&self, phase: PowerPhase) {
        self.phase.send_if_modified(|current| {
            if *current == phase {
                return false;
            }
            *current = phase;
            true
        });
    }

    async fn observe(&self) -> PowerState {
        let state = self.link.probe_power().await;
        self.observed.send_replace(Some(state));
        state
    }

    /// One attempt, bounded by the overall deadline.
    async fn attempt(&self, target: PowerState) -> Result<(), CoreError> {
        let started = Instant::now();
        let deadline = self.timing.deadline;

        match tokio::time::timeout(deadline, self.drive_to(target)).await {
            Ok(Ok(())) => {
                info!(%target, elapsed_ms = duration_ms(started.elapsed()), "power change complete");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(%target, error = %e, "power change failed");
                Err(e)
            }
            Err(_) => {
                warn!(%target, deadline_ms = duration_ms(deadline), "timed out waiting for power state");
                Err(CoreError::PowerChangeTimeout {
                    target: target.to_string(),
                    deadline_ms: duration_ms(deadline),
                })
            }
        }
    }

    async fn drive_to(&self, target: PowerState) -> Result<(), CoreError> {
        let mut observed = self.observe().await;
        if observed == target {
            debug!(%target, "TV already in target power state");
            return Ok(());
        }

        if observed == PowerState::Unreachable {
            observed = self.await_reachable(target).await;
            if observed == target {
                return Ok(());
            }
        }

        self.set_phase(PowerPhase::Transitioning);
        // A click can be read as an early release and ignored while on.
        let action = if target == PowerState::Standby {
            KeyAction::Press
        } else {
            KeyAction::Click
        };
        info!(%target, %action, "sending power key");
        self.link.send_power(action).await?;

        loop {
            observed = self.observe().await;
            if observed == target {
                return Ok(());
            }
            debug!(%observed, %target, "waiting for power state");
            tokio::time::sleep(self.timing.poll_interval).await;
        }
    }

    /// Loop until the TV answers probes again. Sends wake signals when the
    /// goal is to turn it on; otherwise just waits.
    async fn await_reachable(&self, target: PowerState) -> PowerState {
        let waking = target == PowerState::On;
        if waking {
            self.set_phase(PowerPhase::Waking);
            info!("TV unreachable, sending wake signals");
        }

        let mut attempt = 0u32;
        loop {
            let interval = if waking {
                attempt += 1;
                if let Err(e) = self.link.wake().await {
                    warn!(attempt, error = %e, "wake signal failed");
                }
                self.timing.wake_interval
            } else {
                self.timing.poll_interval
            };
            tokio::time::sleep(interval).await;

            let observed = self.observe().await;
            if observed != PowerState::Unreachable {
                debug!(%observed, attempt, "TV reachable");
                return observed;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;

    use pretty_assertions::assert_eq;

    use super::*;

    // ── Scripted TV ─────────────────────────────────────────────────

    #[derive(Debug, Default)]
    struct TvScript {
        /// Probe results to return first, in order.
        script: VecDeque<PowerState>,
        /// Reported once the script is exhausted.
        current: Option<PowerState>,
        /// A power key flips on <-> standby.
        follows_key: bool,
        probes: usize,
        wakes: usize,
        /// Each power key with the number of probes made before it.
        keys: Vec<(KeyAction, usize)>,
    }

    #[derive(Clone)]
    struct FakeLink(Arc<Mutex<TvScript>>);

    impl FakeLink {
        fn steady(state: PowerState) -> Self {
            Self::scripted(&[], state, false)
        }

        fn following(state: PowerState) -> Self {
            Self::scripted(&[], state, true)
        }

        fn scripted(script: &[PowerState], then: PowerState, follows_key: bool) -> Self {
            Self(Arc::new(Mutex::new(TvScript {
                script: script.iter().copied().collect(),
                current: Some(then),
                follows_key,
                ..TvScript::default()
            })))
        }

        fn with<T>(&self, f: impl FnOnce(&TvScript) -> T) -> T {
            f(&self.0.lock().unwrap())
        }
    }

    impl TvLink for FakeLink {
        async fn probe_power(&self) -> PowerState {
            let mut tv = self.0.lock().unwrap();
            tv.probes += 1;
            match tv.script.pop_front() {
                Some(state) => state,
                None => tv.current.unwrap_or(PowerState::Unreachable),
            }
        }

        async fn wake(&self) -> Result<(), CoreError> {
            self.0.lock().unwrap().wakes += 1;
            Ok(())
        }

        async fn send_power(&self, action: KeyAction) -> Result<(), CoreError> {
            let mut tv = self.0.lock().unwrap();
            let probes = tv.probes;
            tv.keys.push((action, probes));
            if tv.follows_key {
                tv.current = match tv.current {
                    Some(PowerState::On) => Some(PowerState::Standby),
                    Some(PowerState::Standby) => Some(PowerState::On),
                    other => other,
                };
            }
            Ok(())
        }
    }

    fn controller(link: &FakeLink) -> PowerController<FakeLink> {
        PowerController::new(link.clone(), PowerTiming::default())
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn already_in_target_sends_nothing() {
        let link = FakeLink::steady(PowerState::On);
        let power = controller(&link);

        power.set_target(PowerState::On).await.unwrap();

        link.with(|tv| {
            assert_eq!(tv.probes, 1);
            assert_eq!(tv.wakes, 0);
            assert!(tv.keys.is_empty());
        });
    }

    #[tokio::test(start_paused = true)]
    async fn standby_to_on_clicks_once_then_polls() {
        let link = FakeLink::scripted(
            &[PowerState::Standby, PowerState::Standby, PowerState::On],
            PowerState::On,
            false,
        );
        let power = controller(&link);

        power.set_target(PowerState::On).await.unwrap();

        link.with(|tv| {
            assert_eq!(tv.keys, vec![(KeyAction::Click, 1)]);
            assert_eq!(tv.probes, 3);
            assert_eq!(tv.wakes, 0);
        });
        assert_eq!(power.get_active_state().await, ActiveState::Active);
        assert_eq!(*power.observed().borrow(), Some(PowerState::On));
    }

    #[tokio::test(start_paused = true)]
    async fn on_to_standby_uses_press() {
        let link = FakeLink::following(PowerState::On);
        let power = controller(&link);

        power.set_target(PowerState::Standby).await.unwrap();

        link.with(|tv| assert_eq!(tv.keys, vec![(KeyAction::Press, 1)]));
        assert_eq!(power.get_active_state().await, ActiveState::Inactive);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_tv_times_out_at_deadline() {
        let link = FakeLink::steady(PowerState::Standby);
        let power = controller(&link);
        let timing = PowerTiming::default();

        let started = Instant::now();
        let err = power.set_target(PowerState::On).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, CoreError::PowerChangeTimeout { .. }), "{err:?}");
        assert!(elapsed >= timing.deadline);
        assert!(elapsed < timing.deadline + timing.poll_interval);
        link.with(|tv| assert_eq!(tv.keys.len(), 1));
    }

    #[tokio::test(start_paused = true)]
    async fn wake_loop_is_bounded_by_deadline() {
        let link = FakeLink::steady(PowerState::Unreachable);
        let power = controller(&link);
        let timing = PowerTiming::default();

        let started = Instant::now();
        let err = power.set_target(PowerState::On).await.unwrap_err();

        assert!(matches!(err, CoreError::PowerChangeTimeout { .. }));
        assert!(started.elapsed() < timing.deadline + timing.wake_interval);
        link.with(|tv| {
            // One wake per interval across the deadline.
            assert!((19..=21).contains(&tv.wakes), "wakes = {}", tv.wakes);
            assert!(tv.keys.is_empty());
        });
    }

    #[tokio::test(start_paused = true)]
    async fn wakes_until_reachable_then_clicks() {
        let link = FakeLink::scripted(
            &[PowerState::Unreachable, PowerState::Unreachable],
            PowerState::Standby,
            true,
        );
        let power = controller(&link);
        let mut phase = power.phase();

        power.set_target(PowerState::On).await.unwrap();

        link.with(|tv| {
            assert_eq!(tv.wakes, 2);
            assert_eq!(tv.keys, vec![(KeyAction::Click, 3)]);
        });
        phase.wait_for(|p| *p == PowerPhase::Idle).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn requests_before_start_collapse_to_latest() {
        let link = FakeLink::following(PowerState::On);
        let power = controller(&link);

        let first = power.request(PowerState::On).unwrap();
        let second = power.request(PowerState::Standby).unwrap();

        second.wait().await.unwrap();
        first.wait().await.unwrap();

        // One attempt ran, for the latest target.
        link.with(|tv| assert_eq!(tv.keys, vec![(KeyAction::Press, 1)]));
        assert_eq!(power.current_state().await, PowerState::Standby);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_during_cooldown_run_after_it() {
        let link = FakeLink::following(PowerState::Standby);
        let power = controller(&link);
        let mut phase = power.phase();

        let first = power.request(PowerState::On).unwrap();
        phase
            .wait_for(|p| *p == PowerPhase::Settling)
            .await
            .unwrap();
        let settling_since = Instant::now();

        let superseded = power.request(PowerState::On).unwrap();
        let latest = power.request(PowerState::Standby).unwrap();

        first.wait().await.unwrap();
        latest.wait().await.unwrap();
        superseded.wait().await.unwrap();

        assert!(settling_since.elapsed() >= PowerTiming::default().cooldown);
        link.with(|tv| {
            let actions: Vec<KeyAction> = tv.keys.iter().map(|(a, _)| *a).collect();
            assert_eq!(actions, vec![KeyAction::Click, KeyAction::Press]);
        });
        assert_eq!(power.current_state().await, PowerState::Standby);
    }

    #[tokio::test(start_paused = true)]
    async fn request_during_transition_waits_for_current_attempt() {
        // Keeps reporting standby for two polls after the key.
        let link = FakeLink::scripted(
            &[PowerState::Standby, PowerState::Standby, PowerState::Standby],
            PowerState::Standby,
            true,
        );
        let power = controller(&link);
        let mut phase = power.phase();

        let first = power.request(PowerState::On).unwrap();
        phase
            .wait_for(|p| *p == PowerPhase::Transitioning)
            .await
            .unwrap();
        let second = power.request(PowerState::Standby).unwrap();

        // The running attempt is not retargeted.
        first.wait().await.unwrap();
        let first_done = Instant::now();
        second.wait().await.unwrap();

        assert!(first_done.elapsed() >= PowerTiming::default().cooldown);
        link.with(|tv| {
            assert_eq!(tv.keys, vec![(KeyAction::Click, 1), (KeyAction::Press, 5)]);
        });
        assert_eq!(power.current_state().await, PowerState::Standby);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_link_fails_the_change_and_frees_the_queue() {
        use std::sync::atomic::{AtomicBool, Ordering};

        struct CrashesOnce(AtomicBool);

        impl TvLink for CrashesOnce {
            async fn probe_power(&self) -> PowerState {
                assert!(self.0.swap(true, Ordering::SeqCst), "link crashed");
                PowerState::On
            }
            async fn wake(&self) -> Result<(), CoreError> {
                Ok(())
            }
            async fn send_power(&self, _: KeyAction) -> Result<(), CoreError> {
                Ok(())
            }
        }

        let power = PowerController::new(CrashesOnce(AtomicBool::new(false)), PowerTiming::default());

        let err = power.set_target(PowerState::On).await.unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)), "{err:?}");

        tokio::time::timeout(std::time::Duration::from_secs(1), power.set_target(PowerState::On))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_key_fails_the_request() {
        #[derive(Clone)]
        struct Unauthorized;

        impl TvLink for Unauthorized {
            async fn probe_power(&self) -> PowerState {
                PowerState::Standby
            }
            async fn wake(&self) -> Result<(), CoreError> {
                Ok(())
            }
            async fn send_power(&self, _: KeyAction) -> Result<(), CoreError> {
                Err(CoreError::NotAuthorized)
            }
        }

        let power = PowerController::new(Unauthorized, PowerTiming::default());
        let err = power.set_target(PowerState::On).await.unwrap_err();
        assert_eq!(err, CoreError::NotAuthorized);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_reads_inactive_and_cannot_be_targeted() {
        let link = FakeLink::steady(PowerState::Unreachable);
        let power = controller(&link);

        assert_eq!(power.get_active_state().await, ActiveState::Inactive);
        assert!(matches!(
            power.request(PowerState::Unreachable),
            Err(CoreError::Unsupported { .. })
        ));
    }
}
