use super::metadata::MetadataResolver;
use super::queue::TrackQueue;
use super::sink::AudioSink;
use super::track::{NowPlaying, TrackEntry, TrackMetadata};
use crate::error::SinkError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// `previous()` restarts the current track instead of going back once playback
/// is past this point.
pub const RESTART_THRESHOLD_SECONDS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    /// 0 to 100.
    pub volume: u8,
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        Self {
            state: PlaybackState::Idle,
            position_seconds: 0.0,
            duration_seconds: 0.0,
            volume: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    TrackStarted(NowPlaying),
    TrackPaused,
    TrackResumed,
    TrackStopped,
    TrackFinished { index: usize },
    Seeked(f64),
    VolumeChanged(u8),
    Error(String),
}

/// Fire-and-forget media keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKey {
    PlayPause,
    Previous,
    Next,
}

/// Everything one player instance owns: the queue, the transport status and
/// what is being presented.
#[derive(Debug, Clone, Default)]
pub struct PlayerSession {
    pub queue: TrackQueue,
    pub status: PlaybackStatus,
    pub now_playing: Option<NowPlaying>,
}

/// A track that entered `Loading` and still needs its fresh metadata.
///
/// Run `resolve` wherever awaiting is cheap and hand the result back to
/// [`PlaybackController::finish_load`].
#[derive(Debug, Clone)]
#[must_use = "a pending load stays in Loading until it is resolved and finished"]
pub struct PendingLoad {
    pub id: u64,
    pub index: usize,
    pub path: PathBuf,
    resolver: MetadataResolver,
}

impl PendingLoad {
    pub async fn resolve(self) -> ResolvedLoad {
        let metadata = self.resolver.resolve_fresh(&self.path).await;
        ResolvedLoad {
            id: self.id,
            index: self.index,
            path: self.path,
            metadata,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedLoad {
    pub id: u64,
    pub index: usize,
    pub path: PathBuf,
    /// `None` when the resolve task itself died.
    pub metadata: Option<TrackMetadata>,
}

/// State machine over a single audio sink.
///
/// Idle → Loading on `play_track`; Loading → Playing in `finish_load` when
/// the sink starts, or back to Idle if both the enriched and the direct-path
/// attempts fail. Playing ⇄ Paused via `pause`/`resume`. Track switches and
/// natural ends go back through Loading.
///
/// Transitions that start a track return a [`PendingLoad`]; the controller
/// itself never awaits, so the caller's frame loop keeps running while tags
/// are read.
pub struct PlaybackController<S: AudioSink> {
    session: PlayerSession,
    sink: S,
    resolver: MetadataResolver,
    event_sender: Option<mpsc::UnboundedSender<PlayerEvent>>,
    pending_load: Option<u64>,
    load_counter: u64,
}

impl<S: AudioSink> PlaybackController<S> {
    pub fn new(sink: S, resolver: MetadataResolver) -> Self {
        Self {
            session: PlayerSession::default(),
            sink,
            resolver,
            event_sender: None,
            pending_load: None,
            load_counter: 0,
        }
    }

    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<PlayerEvent>) {
        self.event_sender = Some(sender);
    }

    pub fn session(&self) -> &PlayerSession {
        &self.session
    }

    pub fn status(&self) -> &PlaybackStatus {
        &self.session.status
    }

    pub fn state(&self) -> PlaybackState {
        self.session.status.state
    }

    pub fn queue(&self) -> &TrackQueue {
        &self.session.queue
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.session.now_playing.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Swaps in a freshly listed folder. A loaded track is stopped and the
    /// sink cleared.
    pub fn replace_queue(&mut self, entries: Vec<TrackEntry>) {
        let was_loaded = self.session.queue.rebuild(entries);
        if was_loaded {
            self.sink.stop();
            self.session.now_playing = None;
            self.reset_transport();
            self.emit(PlayerEvent::TrackStopped);
            info!("Folder changed, playback halted");
        }
    }

    /// Selects `index` and enters `Loading`. Out-of-range indices are ignored.
    ///
    /// The listing-time metadata may be stale, so the track only starts once
    /// the returned load has been re-resolved and passed to `finish_load`.
    pub fn play_track(&mut self, index: usize) -> Option<PendingLoad> {
        let Some(path) = self.session.queue.get(index).map(|entry| entry.path.clone()) else {
            debug!("Ignoring play request for index {} ({} queued)", index, self.session.queue.len());
            return None;
        };

        self.session.queue.select(index);
        self.sink.stop();
        self.session.status.state = PlaybackState::Loading;
        self.session.status.position_seconds = 0.0;

        self.load_counter += 1;
        self.pending_load = Some(self.load_counter);
        debug!("Loading {} (load {})", path.display(), self.load_counter);

        Some(PendingLoad {
            id: self.load_counter,
            index,
            path,
            resolver: self.resolver,
        })
    }

    /// Starts the sink for a resolved load. Loads superseded by a later
    /// `play_track`, or cancelled by a queue rebuild, are dropped.
    pub fn finish_load(&mut self, loaded: ResolvedLoad) {
        if self.pending_load != Some(loaded.id) {
            debug!("Dropping stale load {} for {}", loaded.id, loaded.path.display());
            return;
        }
        self.pending_load = None;
        let ResolvedLoad { index, path, metadata, .. } = loaded;

        let enriched = match metadata {
            Some(metadata) => {
                self.session.queue.replace_metadata(index, metadata.clone());
                match self.start_sink(&path) {
                    Ok(length) => Some((NowPlaying::from_metadata(index, &path, &metadata), length)),
                    Err(e) => {
                        warn!("Error playing {}: {}", path.display(), e);
                        None
                    }
                }
            }
            None => None,
        };

        let started = match enriched {
            Some(started) => Ok(started),
            None => self
                .start_sink(&path)
                .map(|length| (NowPlaying::degraded(index, &path), length)),
        };

        match started {
            Ok((now_playing, length)) => {
                self.session.status.duration_seconds = length
                    .map(|d| d.as_secs_f64())
                    .filter(|secs| *secs > 0.0)
                    .unwrap_or(now_playing.duration_seconds);
                self.session.status.state = PlaybackState::Playing;
                info!("Now playing: {} by {}", now_playing.title, now_playing.artist);
                self.session.now_playing = Some(now_playing.clone());
                self.emit(PlayerEvent::TrackStarted(now_playing));
            }
            Err(e) => {
                error!("Error playing {} after fallback: {}", path.display(), e);
                self.sink.stop();
                self.session.now_playing = None;
                self.reset_transport();
                self.emit(PlayerEvent::Error(e.to_string()));
            }
        }
    }

    fn start_sink(&mut self, path: &Path) -> Result<Option<Duration>, SinkError> {
        let length = self.sink.load(path)?;
        self.sink.play()?;
        Ok(length)
    }

    pub fn pause(&mut self) {
        if self.session.status.state != PlaybackState::Playing {
            return;
        }
        self.sink.pause();
        self.session.status.state = PlaybackState::Paused;
        self.emit(PlayerEvent::TrackPaused);
    }

    /// Resumes a paused track. A rejected resume leaves the state `Paused`.
    pub fn resume(&mut self) {
        if self.session.status.state != PlaybackState::Paused {
            return;
        }
        match self.sink.resume() {
            Ok(()) => {
                self.session.status.state = PlaybackState::Playing;
                self.emit(PlayerEvent::TrackResumed);
            }
            Err(e) => warn!("Error resuming playback: {}", e),
        }
    }

    pub fn toggle_play_pause(&mut self) -> Option<PendingLoad> {
        if self.session.queue.is_empty() {
            return None;
        }
        match self.session.status.state {
            PlaybackState::Idle => return self.play_track(0),
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Loading => {}
        }
        None
    }

    /// Past the restart threshold: back to 0:00 on the same track. Otherwise
    /// the previous track, wrapping to the last.
    pub fn previous(&mut self) -> Option<PendingLoad> {
        if self.session.queue.is_empty() {
            return None;
        }
        self.refresh_position();

        if self.session.status.position_seconds > RESTART_THRESHOLD_SECONDS {
            match self.sink.seek(Duration::ZERO) {
                Ok(()) => self.session.status.position_seconds = 0.0,
                Err(e) => warn!("Error restarting track: {}", e),
            }
            return None;
        }

        let index = self.session.queue.previous_index()?;
        self.play_track(index)
    }

    pub fn next(&mut self) -> Option<PendingLoad> {
        let index = self.session.queue.next_index()?;
        self.play_track(index)
    }

    /// Seeks within the loaded track; ignored unless playing or paused.
    pub fn seek(&mut self, target_seconds: f64) {
        if !matches!(self.session.status.state, PlaybackState::Playing | PlaybackState::Paused) {
            return;
        }
        let mut target = target_seconds.max(0.0);
        if self.session.status.duration_seconds > 0.0 {
            target = target.min(self.session.status.duration_seconds);
        }

        match self.sink.seek(Duration::from_secs_f64(target)) {
            Ok(()) => {
                self.session.status.position_seconds = target;
                self.emit(PlayerEvent::Seeked(target));
            }
            Err(e) => warn!("Error seeking to {:.1}s: {}", target, e),
        }
    }

    /// Always legal; never changes the playback state.
    pub fn set_volume(&mut self, volume: u8) {
        let volume = volume.min(100);
        self.sink.set_volume(f32::from(volume) / 100.0);
        self.session.status.volume = volume;
        self.emit(PlayerEvent::VolumeChanged(volume));
    }

    pub fn handle_media_key(&mut self, key: MediaKey) -> Option<PendingLoad> {
        debug!("Media key {:?}", key);
        match key {
            MediaKey::PlayPause => self.toggle_play_pause(),
            MediaKey::Previous => self.previous(),
            MediaKey::Next => self.next(),
        }
    }

    /// Called every frame: refreshes the position and advances when the
    /// current track ran out.
    pub fn poll(&mut self) -> Option<PendingLoad> {
        if self.session.status.state != PlaybackState::Playing {
            return None;
        }
        self.refresh_position();
        if self.sink.is_finished() {
            return self.on_track_finished();
        }
        None
    }

    fn on_track_finished(&mut self) -> Option<PendingLoad> {
        if let Some(index) = self.session.queue.current_index() {
            self.emit(PlayerEvent::TrackFinished { index });
        }

        match self.session.queue.next_index() {
            Some(next) => self.play_track(next),
            None => {
                self.sink.stop();
                self.session.now_playing = None;
                self.reset_transport();
                self.emit(PlayerEvent::TrackStopped);
                None
            }
        }
    }

    fn refresh_position(&mut self) {
        if matches!(self.session.status.state, PlaybackState::Playing | PlaybackState::Paused) {
            self.session.status.position_seconds = self.sink.position().as_secs_f64();
        }
    }

    fn reset_transport(&mut self) {
        self.pending_load = None;
        let status = &mut self.session.status;
        status.state = PlaybackState::Idle;
        status.position_seconds = 0.0;
        status.duration_seconds = 0.0;
    }

    fn emit(&self, event: PlayerEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }
}
