//! Playback session controller
//!
//! The façade the UI and the OS remote-control surface call into. Three
//! independent event sources — in-app commands, remote-control events, and
//! connectivity callbacks — serialize through one mailbox, so no two
//! mutations of the playback state ever interleave. The controller owns the
//! media engine, the recovery engine, and the persisted state, and drives
//! all retry deadlines from its own loop.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::config::playback::{QUEUE_STALE_SECS, STATION_NAME};
use crate::connectivity::ConnectivityProbe;
use crate::engine::{EngineError, MediaEngine, Track};
use crate::persist::{PersistedPlaybackState, StateStore};
use crate::recovery::{RecoveryDecision, RecoveryEngine, RetryClass};
use crate::registry::{ChannelId, ChannelRegistry};
use crate::state::{Command, PlaybackState};
use crate::stream_url;

/// How long the mailbox loop sleeps between deadline checks
const TICK_INTERVAL: Duration = Duration::from_millis(250);

pub struct PlaybackController<E, S, P> {
    engine: E,
    registry: ChannelRegistry,
    persisted: PersistedPlaybackState<S>,
    probe: P,
    recovery: RecoveryEngine,
    state: PlaybackState,
    queue_stale_after: Duration,
    /// Monotonic track-id counter; every queue rebuild gets a fresh id
    next_track_id: u64,
    /// A live-edge reseek is on the call stack; further reseeks must go
    /// through the deadline loop instead of re-entering the engine
    reseeking: bool,
}

impl<E, S, P> PlaybackController<E, S, P>
where
    E: MediaEngine,
    S: StateStore,
    P: ConnectivityProbe,
{
    pub fn new(engine: E, registry: ChannelRegistry, store: S, probe: P) -> Self {
        Self::with_recovery(engine, registry, store, probe, RecoveryEngine::new())
    }

    /// Construct with a custom recovery engine (tests shrink its delays)
    pub fn with_recovery(
        engine: E,
        registry: ChannelRegistry,
        store: S,
        probe: P,
        recovery: RecoveryEngine,
    ) -> Self {
        let persisted = PersistedPlaybackState::new(store);
        let stopped_by_user = persisted.stopped_by_user();
        let state = PlaybackState {
            stopped_by_user,
            // Seed the last channel so a remote "play" after a cold restart
            // resumes where the user left off.
            current_channel: if stopped_by_user {
                None
            } else {
                persisted.last_channel()
            },
            ..PlaybackState::default()
        };

        Self {
            engine,
            registry,
            persisted,
            probe,
            recovery,
            state,
            queue_stale_after: Duration::from_secs(QUEUE_STALE_SECS),
            next_track_id: 0,
            reseeking: false,
        }
    }

    /// Override the queue staleness window (for testing)
    pub fn with_queue_stale_after(mut self, window: Duration) -> Self {
        self.queue_stale_after = window;
        self
    }

    /// State snapshot for UI readers
    pub fn snapshot(&self) -> PlaybackState {
        let mut snapshot = self.state.clone();
        snapshot.awaiting_network = self.recovery.awaiting_network();
        snapshot
    }

    /// Start playback of `id`. Returns false — touching nothing — when the
    /// registry has no stream key for it.
    pub fn play_channel(&mut self, id: ChannelId) -> bool {
        let Some(stream_key) = self.registry.lookup_stream_key(id) else {
            debug!(channel = id.0, "no stream key for channel, refusing to play");
            return false;
        };
        self.start_track(id, &stream_key);
        true
    }

    /// Pause, keeping the session resumable from the remote controls.
    /// A pause is not a user "give up" signal, so the retry counters stay —
    /// but no scheduled retry or connectivity recovery may restart playback
    /// over it.
    pub fn pause(&mut self) {
        self.engine.pause();
        self.state.is_streaming_active = false;
        self.state.last_stop = Some(Instant::now());
        self.recovery.suspend();
        self.persist_stopped_flag(false);
    }

    /// Explicit in-app stop. The flag is persisted before the engine is
    /// touched, so a crash mid-stop can never auto-resume on restart.
    pub fn stop(&mut self) {
        self.persist_stopped_flag(true);
        self.engine.stop();
        self.engine.reset();
        self.state.is_streaming_active = false;
        self.state.last_stop = Some(Instant::now());
        self.recovery.cleanup();
        info!("playback stopped by user");
    }

    /// Remote-control "play". A no-op while the explicit-stop latch is set;
    /// otherwise resumes the queue, rebuilding it when stale.
    pub fn handle_remote_play(&mut self) {
        if self.state.stopped_by_user {
            debug!("remote play ignored: user explicitly stopped");
            return;
        }

        let stale = match self.state.last_stop {
            Some(at) => at.elapsed() > self.queue_stale_after,
            None => true,
        };
        if !stale && !self.engine.queue_is_empty() {
            match self.engine.play() {
                Ok(()) => {
                    self.state.is_streaming_active = true;
                    self.recovery.cleanup();
                    debug!("remote play resumed existing queue");
                }
                Err(e) => self.handle_engine_failure(e),
            }
            return;
        }

        if let Some(id) = self.state.current_channel {
            debug!(channel = id.0, "remote play rebuilding stale queue");
            self.play_channel(id);
        }
    }

    /// Remote-control "pause" — always permitted
    pub fn handle_remote_pause(&mut self) {
        self.pause();
    }

    /// Report an asynchronous playback failure from the engine.
    pub fn handle_engine_failure(&mut self, error: EngineError) {
        self.state.is_streaming_active = false;
        let class = classify(&error);
        warn!(?class, "playback failed: {error}");

        let now = Instant::now();
        match self
            .recovery
            .on_failure(class, self.state.network_available, now)
        {
            RecoveryDecision::RetryNow => self.reseek(now),
            RecoveryDecision::RetryAfter(_) | RecoveryDecision::AwaitingNetwork => {}
            RecoveryDecision::GaveUp => {
                // Silent by design: the UI reflects is_streaming_active
                // rather than receiving failure notifications.
            }
        }
    }

    /// Connectivity-change notification from the host — the fast path past
    /// the 5-second poll.
    pub fn on_connectivity_changed(&mut self, connected: bool) {
        self.state.network_available = connected;
        if connected && self.recovery.take_network_recovery() {
            info!("connectivity restored, resuming playback");
            self.reattempt();
        }
    }

    /// Drive due retry deadlines and connectivity polls.
    pub fn tick(&mut self, now: Instant) {
        if let Some(class) = self.recovery.due_retry(now) {
            match class {
                RetryClass::HttpStatus => self.reattempt(),
                RetryClass::Reseek => self.reseek(now),
                RetryClass::General => {
                    // Re-check connectivity at fire time; a dead network
                    // converts this attempt into the network path unburned.
                    if self.probe.check().is_connected() {
                        self.state.network_available = true;
                        self.reattempt();
                    } else {
                        self.state.network_available = false;
                        self.recovery.reroute_to_network(now);
                    }
                }
            }
        }

        if self.recovery.due_connectivity_poll(now) && self.probe.check().is_connected() {
            self.state.network_available = true;
            if self.recovery.take_network_recovery() {
                info!("connectivity poll succeeded, resuming playback");
                self.reattempt();
            }
        }
    }

    /// Cancel all pending recovery work. Call at service teardown.
    pub fn cleanup(&mut self) {
        self.recovery.cleanup();
    }

    /// Run the controller mailbox loop (blocking; call from a dedicated
    /// thread). Exits on `Command::Shutdown` or when all senders are gone.
    pub fn run(&mut self, commands: Receiver<Command>) {
        loop {
            match commands.recv_timeout(TICK_INTERVAL) {
                Ok(cmd) => {
                    if self.handle_command(cmd) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.tick(Instant::now());
        }
        self.cleanup();
    }

    /// Handle a single command. Returns true if the loop should exit.
    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::PlayChannel(id) => {
                self.play_channel(id);
            }
            Command::Pause => self.pause(),
            Command::Stop => self.stop(),
            Command::RemotePlay => self.handle_remote_play(),
            Command::RemotePause => self.handle_remote_pause(),
            Command::ConnectivityChanged(connected) => self.on_connectivity_changed(connected),
            Command::EngineFailed(error) => self.handle_engine_failure(error),
            Command::Shutdown => return true,
        }
        false
    }

    /// Reset-then-build: the queue never holds tracks from two channels.
    fn start_track(&mut self, id: ChannelId, stream_key: &str) {
        self.engine.pause();
        self.engine.reset();

        self.next_track_id += 1;
        let track = Track {
            id: self.next_track_id,
            channel: id,
            title: format!("{STATION_NAME} — Channel {id}"),
            url: stream_url::freshen(stream_key),
            headers: stream_url::request_headers(),
        };
        self.engine.enqueue(track);
        self.state.current_channel = Some(id);

        match self.engine.play() {
            Ok(()) => self.on_playing(id),
            Err(e) => self.handle_engine_failure(e),
        }
    }

    /// Healthy playing transition: recovery budgets reset, state persisted.
    fn on_playing(&mut self, id: ChannelId) {
        info!(channel = id.0, "streaming active");
        self.state.is_streaming_active = true;
        self.recovery.cleanup();
        self.persist_stopped_flag(false);
        if let Err(e) = self.persisted.set_last_channel(id) {
            warn!("failed to persist last channel: {e}");
        }
    }

    /// Re-attempt the last-known channel through the full reset-then-build
    /// path (fresh URL included).
    fn reattempt(&mut self) {
        if let Some(id) = self.state.current_channel {
            self.play_channel(id);
        }
    }

    /// Live-edge reseek. At most one runs inline per failure report: a
    /// reseek whose own `play` fails behind-live again lands back here with
    /// the first reseek still on the stack, and is deferred to the deadline
    /// loop instead of recursing into the engine.
    fn reseek(&mut self, now: Instant) {
        if self.reseeking {
            self.recovery.schedule_reseek(now);
            return;
        }
        self.reseeking = true;
        self.reattempt();
        self.reseeking = false;
    }

    fn persist_stopped_flag(&mut self, stopped: bool) {
        self.state.stopped_by_user = stopped;
        if let Err(e) = self.persisted.set_stopped_by_user(stopped) {
            // Degraded but not fatal: playback continues, resume-after-
            // restart may be wrong.
            warn!("failed to persist stopped flag: {e}");
        }
    }
}
