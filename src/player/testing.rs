//! Fakes for exercising sessions without a voice connection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Announcer, AudioOutput, Origin, PlaybackSignal, PlayingTrack, Track};
use crate::error::PlaybackError;
use crate::serenity::{ChannelId, GuildId, UserId};

/// Let spawned tasks run until they block.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn origin(requester: u64) -> Origin {
    Origin {
        requester: UserId::new(requester),
        channel: ChannelId::new(100),
    }
}

/// A track titled `title` requested by user `requester`.
pub fn track(title: &str, requester: u64) -> Track {
    Track {
        title: title.to_string(),
        uploader: None,
        uploader_url: None,
        upload_date: None,
        duration: Some(Duration::from_secs(200)),
        thumbnail_url: None,
        description: None,
        tags: Vec::new(),
        views: None,
        likes: None,
        dislikes: None,
        url: format!("https://example.com/{title}"),
        stream_url: format!("https://cdn.example.com/{title}"),
        requester: UserId::new(requester),
        channel: ChannelId::new(100),
    }
}

/// State of the track most recently started on a [FakeOutput].
#[derive(Debug)]
struct FakeTrack {
    signal: PlaybackSignal,
    paused: AtomicBool,
    volume: Mutex<f32>,
}

/// Records what it was asked to play. Stopping a track fires its signal like songbird does.
#[derive(Default)]
pub struct FakeOutput {
    played: Mutex<Vec<String>>,
    current: Mutex<Option<Arc<FakeTrack>>>,
    stops: Arc<AtomicUsize>,
    disconnects: AtomicUsize,
    fail_next: AtomicBool,
    /// Held by `play` while it starts a track.
    gate: tokio::sync::Mutex<()>,
}

impl FakeOutput {
    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Make the next call to `play` fail.
    pub fn fail_next_play(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Keep every call to `play` waiting until the guard is dropped.
    pub async fn hold_play(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    fn current(&self) -> Arc<FakeTrack> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .expect("nothing was played")
    }

    /// Signal of the most recent start.
    pub fn last_signal(&self) -> PlaybackSignal {
        self.current().signal.clone()
    }

    /// Pretend the current track played to the end.
    pub fn finish_current(&self) {
        self.current().signal.finished();
    }

    pub fn is_paused(&self) -> bool {
        self.current().paused.load(Ordering::SeqCst)
    }

    pub fn current_volume(&self) -> Option<f32> {
        let current = self.current.lock().unwrap().clone()?;
        let volume = *current.volume.lock().unwrap();
        Some(volume)
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    async fn play(
        &self,
        _guild_id: GuildId,
        track: &Track,
        volume: f32,
        signal: PlaybackSignal,
    ) -> Result<Box<dyn PlayingTrack>, PlaybackError> {
        let _open = self.gate.lock().await;
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PlaybackError::Output {
                reason: "fake failure".to_string(),
            });
        }

        let fake = Arc::new(FakeTrack {
            signal,
            paused: AtomicBool::new(false),
            volume: Mutex::new(volume),
        });
        self.played.lock().unwrap().push(track.title.clone());
        *self.current.lock().unwrap() = Some(fake.clone());

        Ok(Box::new(FakeHandle {
            track: fake,
            stops: self.stops.clone(),
        }))
    }

    async fn disconnect(&self, _guild_id: GuildId) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeHandle {
    track: Arc<FakeTrack>,
    stops: Arc<AtomicUsize>,
}

impl PlayingTrack for FakeHandle {
    fn pause(&self) -> Result<(), PlaybackError> {
        self.track.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&self) -> Result<(), PlaybackError> {
        self.track.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), PlaybackError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.track.signal.finished();
        Ok(())
    }

    fn set_volume(&self, volume: f32) -> Result<(), PlaybackError> {
        *self.track.volume.lock().unwrap() = volume;
        Ok(())
    }
}

/// Records titles of announced tracks.
#[derive(Default)]
pub struct FakeAnnouncer {
    announced: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl FakeAnnouncer {
    pub fn announced(&self) -> Vec<String> {
        self.announced.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap().clone()
    }
}

#[async_trait]
impl Announcer for FakeAnnouncer {
    async fn now_playing(&self, track: &Track) {
        self.announced.lock().unwrap().push(track.title.clone());
    }

    async fn playback_failed(&self, track: &Track, _error: &PlaybackError) {
        self.failures.lock().unwrap().push(track.title.clone());
    }
}
