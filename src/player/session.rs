//! The playback state machine of a guild.
//!
//! A [PlaybackSession] spawns a draining task on creation. The task loops:
//! - wait (at most the idle timeout) for a track, or reuse the current one when looping,
//! - start it on the [AudioOutput] and announce it,
//! - wait for the [PlaybackSignal] of that start,
//! - go back to idle.
//!
//! If nothing is queued in time the task terminates the session.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::instrument;

use super::{
    Announcer, AudioOutput, PlaybackEvent, PlaybackSignal, PlayerSettings, PlayingTrack,
    QueuePage, SongQueue, Track,
};
use crate::error::{GramophoneError, PlaybackError, UserError};
use crate::serenity::{GuildId, UserId};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a track.
    Idle,
    Playing,
    Paused,
    /// Stopped for good, the session must be replaced.
    Terminated,
}

/// Result of a `/skip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    /// The track is being skipped.
    Skipped,
    /// The vote was counted but more are needed.
    Voted { votes: usize, needed: usize },
}

/// Mutable state, always changed under one lock.
struct SessionState {
    phase: Phase,
    current: Option<Track>,
    /// Control over the current track while it is on the output.
    playing: Option<Box<dyn PlayingTrack>>,
    looping: bool,
    volume: f32,
    skip_votes: HashSet<UserId>,
    /// The current track was stopped on purpose and must not be replayed.
    skipping: bool,
    /// Incremented on every playback start.
    generation: u64,
}

impl SessionState {
    /// Whether there is a track on the output that can still be skipped.
    fn is_playing(&self) -> bool {
        matches!(self.phase, Phase::Playing | Phase::Paused) && !self.skipping
    }

    /// Whether a track was picked but the output hasn't started it yet.
    fn is_starting(&self) -> bool {
        self.phase == Phase::Idle && self.current.is_some() && self.playing.is_none()
    }

    /// Stop the current track, the draining task moves on once the output signals.
    fn force_skip(&mut self) -> Result<(), PlaybackError> {
        if let Some(playing) = &self.playing {
            playing.stop()?;
        }
        self.skip_votes.clear();
        self.skipping = true;
        Ok(())
    }
}

/// Everything the draining task shares with the session handle.
struct Shared {
    guild_id: GuildId,
    queue: SongQueue,
    state: Mutex<SessionState>,
    output: Arc<dyn AudioOutput>,
    announcer: Arc<dyn Announcer>,
    settings: PlayerSettings,
}

/// Audio playback of one guild.
///
/// Dropping the session aborts its draining task without disconnecting,
/// use [terminate](PlaybackSession::terminate) to shut it down properly.
pub struct PlaybackSession {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl PlaybackSession {
    /// Create a session and start its draining task.
    pub fn start(
        guild_id: GuildId,
        output: Arc<dyn AudioOutput>,
        announcer: Arc<dyn Announcer>,
        settings: PlayerSettings,
    ) -> Self {
        let state = SessionState {
            phase: Phase::Idle,
            current: None,
            playing: None,
            looping: false,
            volume: settings.default_volume,
            skip_votes: HashSet::new(),
            skipping: false,
            generation: 0,
        };
        let shared = Arc::new(Shared {
            guild_id,
            queue: SongQueue::default(),
            state: Mutex::new(state),
            output,
            announcer,
            settings,
        });

        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(drain(shared.clone(), sender, receiver));
        tracing::debug!("Started playback session for guild {guild_id}.");

        Self { shared, task }
    }

    pub fn guild_id(&self) -> GuildId {
        self.shared.guild_id
    }

    pub async fn phase(&self) -> Phase {
        self.shared.state.lock().await.phase
    }

    pub async fn is_terminated(&self) -> bool {
        self.phase().await == Phase::Terminated
    }

    /// Clone of the track that is playing (or paused).
    pub async fn current(&self) -> Option<Track> {
        self.shared.state.lock().await.current.clone()
    }

    pub async fn volume(&self) -> f32 {
        self.shared.state.lock().await.volume
    }

    pub async fn is_looping(&self) -> bool {
        self.shared.state.lock().await.looping
    }

    /// Number of distinct skip votes for the current track.
    pub async fn skip_votes(&self) -> usize {
        self.shared.state.lock().await.skip_votes.len()
    }

    /// Add a track to the back of the queue, returns its 1-based position.
    /// Fails once the session is terminated, nothing would ever play the track.
    pub async fn enqueue(&self, track: Track) -> Result<usize, UserError> {
        // Held across the push so an idle shutdown sees either the track or the error.
        let state = self.shared.state.lock().await;
        if state.phase == Phase::Terminated {
            return Err(UserError::SessionEnded);
        }
        tracing::info!("Queued '{}' in guild {}.", track.title, self.guild_id());
        Ok(self.shared.queue.enqueue(track).await)
    }

    pub async fn pause(&self) -> Result<(), GramophoneError> {
        let mut state = self.shared.state.lock().await;
        if state.phase != Phase::Playing || state.skipping {
            return Err(UserError::NothingPlaying.into());
        }
        if let Some(playing) = &state.playing {
            playing.pause()?;
        }
        state.phase = Phase::Paused;
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), GramophoneError> {
        let mut state = self.shared.state.lock().await;
        if state.phase != Phase::Paused || state.skipping {
            return Err(UserError::NotPaused.into());
        }
        if let Some(playing) = &state.playing {
            playing.resume()?;
        }
        state.phase = Phase::Playing;
        Ok(())
    }

    /// Clear the queue, turn off looping and stop the current track.
    /// The session stays alive and waits for new tracks.
    #[instrument(skip(self), fields(guild = %self.guild_id()))]
    pub async fn halt(&self) -> Result<(), GramophoneError> {
        self.shared.queue.clear().await;

        let mut state = self.shared.state.lock().await;
        state.looping = false;
        if state.is_playing() {
            state.force_skip()?;
        } else if state.is_starting() {
            // Stopped as soon as the output hands it over.
            state.skipping = true;
        }
        tracing::info!("Halted playback.");
        Ok(())
    }

    /// Vote to skip the current track.
    ///
    /// The requester of the track skips right away. Anyone else adds a vote and
    /// the track is skipped once the votes reach the threshold.
    #[instrument(skip(self), fields(guild = %self.guild_id()))]
    pub async fn skip(&self, voter: UserId) -> Result<SkipOutcome, GramophoneError> {
        let needed = self.shared.settings.skip_threshold;
        let mut state = self.shared.state.lock().await;

        let requester = match &state.current {
            Some(track) if state.is_playing() => track.requester,
            _ => Err(UserError::NothingPlaying)?,
        };

        if voter == requester {
            state.force_skip()?;
            tracing::info!("Requester skipped the track.");
            return Ok(SkipOutcome::Skipped);
        }

        if !state.skip_votes.insert(voter) {
            return Err(UserError::AlreadyVoted.into());
        }

        let votes = state.skip_votes.len();
        if votes >= needed {
            state.force_skip()?;
            tracing::info!("Skipped the track after {votes} votes.");
            Ok(SkipOutcome::Skipped)
        } else {
            tracing::debug!("Skip vote {votes}/{needed}.");
            Ok(SkipOutcome::Voted { votes, needed })
        }
    }

    /// Toggle replaying the current track, returns the new setting.
    pub async fn toggle_loop(&self) -> Result<bool, UserError> {
        let mut state = self.shared.state.lock().await;
        if !state.is_playing() {
            return Err(UserError::NothingPlaying);
        }
        state.looping = !state.looping;
        Ok(state.looping)
    }

    /// Set the volume in percent, 0 to 100.
    pub async fn set_volume(&self, percent: i64) -> Result<(), GramophoneError> {
        if !(0..=100).contains(&percent) {
            return Err(UserError::VolumeOutOfRange { volume: percent }.into());
        }
        let volume = percent as f32 / 100.0;

        let mut state = self.shared.state.lock().await;
        if let Some(playing) = &state.playing {
            playing.set_volume(volume)?;
        }
        state.volume = volume;
        Ok(())
    }

    pub async fn shuffle(&self) -> Result<(), UserError> {
        if self.shared.queue.is_empty().await {
            return Err(UserError::EmptyQueue);
        }
        self.shared.queue.shuffle().await;
        Ok(())
    }

    /// Remove the queued track at the 0-based `index`.
    pub async fn remove_at(&self, index: usize) -> Result<Track, UserError> {
        if self.shared.queue.is_empty().await {
            return Err(UserError::EmptyQueue);
        }
        self.shared.queue.remove_at(index).await
    }

    /// A page of the queue, `page` starts at 1.
    pub async fn queue_page(&self, page: usize) -> Result<QueuePage, UserError> {
        self.shared
            .queue
            .page(page, self.shared.settings.page_size)
            .await
    }

    /// Stop the draining task, clear everything and disconnect.
    /// Safe to call more than once.
    pub async fn terminate(&self) {
        self.task.abort();
        self.shared.shutdown().await;
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Shared {
    /// Move to [Phase::Terminated], then clear the queue and disconnect.
    /// Does nothing if already terminated.
    async fn shutdown(&self) {
        let state = self.state.lock().await;
        self.shutdown_locked(state).await;
    }

    /// [shutdown](Shared::shutdown) unless a track was queued after the idle timeout expired.
    /// Returns `false` if the session should keep going.
    async fn idle_shutdown(&self) -> bool {
        let state = self.state.lock().await;
        if !self.queue.is_empty().await {
            return false;
        }
        self.shutdown_locked(state).await;
        true
    }

    async fn shutdown_locked(&self, mut state: MutexGuard<'_, SessionState>) {
        if state.phase == Phase::Terminated {
            return;
        }
        state.phase = Phase::Terminated;
        state.current = None;
        state.looping = false;
        state.skip_votes.clear();
        let playing = state.playing.take();
        drop(state);

        self.queue.clear().await;
        if let Some(playing) = playing {
            if let Err(e) = playing.stop() {
                tracing::warn!("Failed to stop track on shutdown: {e}");
            }
        }
        self.output.disconnect(self.guild_id).await;
        tracing::info!("Terminated playback session for guild {}.", self.guild_id);
    }

    /// The track to play next without waiting on the queue, if looping.
    async fn replay(&self) -> Option<Track> {
        let state = self.state.lock().await;
        if state.looping {
            state.current.clone()
        } else {
            None
        }
    }

    /// Put `track` on the output.
    /// Returns the generation of the start, `None` if the session was terminated.
    ///
    /// The state isn't locked while the output starts the track, commands
    /// issued meanwhile are applied once it hands over the track.
    async fn start(
        &self,
        track: &Track,
        sender: &UnboundedSender<(u64, PlaybackEvent)>,
    ) -> Result<Option<u64>, PlaybackError> {
        let (generation, volume) = {
            let mut state = self.state.lock().await;
            if state.phase == Phase::Terminated {
                return Ok(None);
            }
            state.generation += 1;
            state.current = Some(track.clone());
            state.skip_votes.clear();
            state.skipping = false;
            (state.generation, state.volume)
        };

        let signal = PlaybackSignal::new(generation, sender.clone());
        let result = self.output.play(self.guild_id, track, volume, signal).await;

        let mut state = self.state.lock().await;
        if state.phase == Phase::Terminated {
            if let Ok(playing) = result {
                if let Err(e) = playing.stop() {
                    tracing::warn!("Failed to stop track of a terminated session: {e}");
                }
            }
            return Ok(None);
        }

        match result {
            Ok(playing) => {
                if state.volume != volume {
                    if let Err(e) = playing.set_volume(state.volume) {
                        tracing::warn!("Failed to apply volume to '{}': {e}", track.title);
                    }
                }
                if state.skipping {
                    tracing::debug!("Stopping '{}' right away.", track.title);
                    if let Err(e) = playing.stop() {
                        tracing::warn!("Failed to stop '{}': {e}", track.title);
                    }
                }
                state.playing = Some(playing);
                state.phase = Phase::Playing;
                Ok(Some(generation))
            }
            Err(e) => {
                state.current = None;
                state.looping = false;
                state.phase = Phase::Idle;
                Err(e)
            }
        }
    }

    /// Back to idle after the output signalled the end of `generation`.
    /// Returns `false` if the session was terminated meanwhile.
    async fn finish(&self, event: &PlaybackEvent) -> bool {
        let mut state = self.state.lock().await;
        if state.phase == Phase::Terminated {
            return false;
        }

        let failed = matches!(event, PlaybackEvent::Failed(_));
        if failed || state.skipping || !state.looping {
            state.current = None;
        }
        if failed {
            state.looping = false;
        }
        state.playing = None;
        state.skip_votes.clear();
        state.skipping = false;
        state.phase = Phase::Idle;
        true
    }
}

/// The draining task of a session.
#[instrument(skip_all, fields(guild = %shared.guild_id))]
async fn drain(
    shared: Arc<Shared>,
    sender: UnboundedSender<(u64, PlaybackEvent)>,
    mut events: UnboundedReceiver<(u64, PlaybackEvent)>,
) {
    loop {
        let track = match shared.replay().await {
            Some(track) => track,
            None => {
                let timeout = shared.settings.idle_timeout;
                match tokio::time::timeout(timeout, shared.queue.dequeue()).await {
                    Ok(track) => track,
                    Err(_) => {
                        // Spawned so a concurrent `terminate` aborting this task
                        // can't cut the disconnect short.
                        let idle = shared.clone();
                        let shutdown = tokio::spawn(async move { idle.idle_shutdown().await });
                        match shutdown.await {
                            Ok(true) => {
                                tracing::info!("Nothing queued for {timeout:?}, left.");
                                return;
                            }
                            Ok(false) => continue,
                            Err(e) => {
                                tracing::error!("Idle shutdown failed: {e}");
                                return;
                            }
                        }
                    }
                }
            }
        };

        let generation = match shared.start(&track, &sender).await {
            Ok(Some(generation)) => generation,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("Failed to start '{}': {e}", track.title);
                shared.announcer.playback_failed(&track, &e).await;
                continue;
            }
        };

        tracing::info!("Playing '{}'.", track.title);
        shared.announcer.now_playing(&track).await;

        let event = loop {
            match events.recv().await {
                Some((received, event)) if received == generation => break event,
                Some((received, _)) => {
                    tracing::trace!("Ignoring signal of old generation {received}.")
                }
                // The task holds a sender, so the channel can't close.
                None => return,
            }
        };

        if !shared.finish(&event).await {
            return;
        }
        match event {
            PlaybackEvent::Finished => tracing::debug!("Finished '{}'.", track.title),
            PlaybackEvent::Failed(reason) => {
                let error = PlaybackError::Output { reason };
                tracing::error!("Playback of '{}' failed: {error}", track.title);
                shared.announcer.playback_failed(&track, &error).await;
            }
        }
    }
}
