use super::events::{AppEvent, EventHandler, FolderListing};
use super::view::{self, BrowserRow, CanvasScene, ViewModel};
use super::TerminalManager;
use crate::analysis::{Analyser, AnalysisLoop};
use crate::audio::{
    breadcrumb, list_audio_entries, list_subdirectories, Crumb, MetadataResolver, PendingLoad, PlaybackController,
    PlayerEvent, RodioSink,
};
use crate::config::{Config, SettingsStore, Theme};
use crate::lyrics::{HttpLyricsTransport, LyricsResolver, LyricsTracker};
use crate::notify::{DesktopNotifier, NotifierEvent, NowPlayingNotifier, SilentNotifier};
use anyhow::Result;
use ratatui::widgets::ListState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Volume change per key press, in percent.
const VOLUME_STEP: u8 = 5;
/// Relative seek per key press.
const SEEK_STEP_SECONDS: f64 = 5.0;

/// Which folder the browser shows, and whether its listing is still out.
#[derive(Debug, Clone, PartialEq)]
struct FolderCursor {
    folder: PathBuf,
    loading: bool,
}

impl FolderCursor {
    fn new(folder: PathBuf) -> Self {
        Self { folder, loading: false }
    }

    fn open(&mut self, folder: PathBuf) {
        self.folder = folder;
        self.loading = true;
    }

    /// True when a background result for `folder` still applies; accepting
    /// it ends the loading state.
    fn settle(&mut self, folder: &Path) -> bool {
        if folder != self.folder {
            return false;
        }
        self.loading = false;
        true
    }
}

/// Start-up choices from the command line.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Overrides the stored last folder.
    pub folder: Option<PathBuf>,
    /// Session-only theme override.
    pub theme: Option<Theme>,
    pub notifications: bool,
}

pub struct App {
    config: Config,
    settings: SettingsStore,
    terminal: TerminalManager,
    events: EventHandler,

    player: PlaybackController<RodioSink>,
    player_events: mpsc::UnboundedReceiver<PlayerEvent>,
    resolver: MetadataResolver,
    notifier: Box<dyn NowPlayingNotifier>,
    notifier_events: mpsc::UnboundedReceiver<NotifierEvent>,
    lyrics: Arc<LyricsResolver<HttpLyricsTransport>>,
    lyrics_tracker: LyricsTracker,

    analyser: Analyser,
    analysis: AnalysisLoop,
    scene: CanvasScene,

    // Browser state
    folder: FolderCursor,
    crumbs: Vec<Crumb>,
    rows: Vec<BrowserRow>,
    list_state: ListState,

    // View state
    theme: Theme,
    show_lyrics: bool,
    visualizations_hidden: bool,
    status_message: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, settings: SettingsStore, options: AppOptions) -> Result<Self> {
        let sink = RodioSink::new()?;
        let analyser = Analyser::new(sink.capture_buffer());

        let resolver = MetadataResolver::new();
        let (player_tx, player_events) = mpsc::unbounded_channel();
        let mut player = PlaybackController::new(sink, resolver);
        player.set_event_sender(player_tx);
        player.set_volume(settings.settings().volume_state);

        let (notifier_tx, notifier_events) = mpsc::unbounded_channel();
        let notifier: Box<dyn NowPlayingNotifier> = if options.notifications && config.ui.show_notifications {
            Box::new(
                DesktopNotifier::new(Duration::from_millis(config.ui.notification_duration_ms))
                    .with_event_sender(notifier_tx),
            )
        } else {
            Box::new(SilentNotifier)
        };

        let transport = HttpLyricsTransport::new(Duration::from_secs(config.lyrics.timeout_secs))?;
        let lyrics = Arc::new(LyricsResolver::new(transport, config.lyrics.endpoint.clone()));

        let start_folder = options
            .folder
            .or_else(|| settings.settings().last_folder_path.clone())
            .unwrap_or_else(|| config.music_directory.clone());
        let theme = options.theme.unwrap_or_else(|| settings.theme());
        let visualizations_hidden = settings.settings().visualizations_hidden;

        // Terminal last: anything above may still fail and print normally
        let terminal = TerminalManager::new()?;

        Ok(Self {
            config,
            settings,
            terminal,
            events: EventHandler::new(),
            player,
            player_events,
            resolver,
            notifier,
            notifier_events,
            lyrics,
            lyrics_tracker: LyricsTracker::new(),
            analyser,
            analysis: AnalysisLoop::new(),
            scene: CanvasScene::new(),
            folder: FolderCursor::new(start_folder),
            crumbs: Vec::new(),
            rows: Vec::new(),
            list_state: ListState::default(),
            theme,
            show_lyrics: false,
            visualizations_hidden,
            status_message: None,
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let start = self.folder.folder.clone();
        self.open_folder(start);

        let mut frames = tokio::time::interval(self.config.frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.should_quit {
            tokio::select! {
                _ = frames.tick() => self.on_frame()?,
                Some(event) = self.events.next_event() => self.handle_event(event),
                Some(event) = self.player_events.recv() => self.handle_player_event(event),
                Some(event) = self.notifier_events.recv() => self.handle_notifier_event(event),
            }
        }

        info!(
            "Shutting down after {} frames ({} drawn)",
            self.analysis.ticks(),
            self.analysis.frames_drawn()
        );
        Ok(())
    }

    /// One display frame: input, transport bookkeeping, visuals, draw.
    /// Nothing in here awaits; slow work is spawned and reports back.
    fn on_frame(&mut self) -> Result<()> {
        self.events.poll_terminal()?;
        let load = self.player.poll();
        self.start_load(load);
        self.analysis
            .tick(self.player.state(), self.theme, &mut self.analyser, &mut self.scene);
        self.render()
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Quit => {
                self.should_quit = true;
            }
            AppEvent::Render => {}
            AppEvent::TogglePlayPause => {
                let load = self.player.toggle_play_pause();
                self.start_load(load);
            }
            AppEvent::NextTrack => {
                let load = self.player.next();
                self.start_load(load);
            }
            AppEvent::PreviousTrack => {
                let load = self.player.previous();
                self.start_load(load);
            }
            AppEvent::Media(key) => {
                let load = self.player.handle_media_key(key);
                self.start_load(load);
            }
            AppEvent::SeekForward => {
                let target = self.player.status().position_seconds + SEEK_STEP_SECONDS;
                self.player.seek(target);
            }
            AppEvent::SeekBackward => {
                let target = self.player.status().position_seconds - SEEK_STEP_SECONDS;
                self.player.seek(target);
            }
            AppEvent::Up => self.move_selection(-1),
            AppEvent::Down => self.move_selection(1),
            AppEvent::Enter => self.activate_selection(),
            AppEvent::Back => {
                if let Some(parent) = self.folder.folder.parent().map(Path::to_path_buf) {
                    self.open_folder(parent);
                }
            }
            AppEvent::VolumeUp => self.change_volume(VOLUME_STEP as i16),
            AppEvent::VolumeDown => self.change_volume(-(VOLUME_STEP as i16)),
            AppEvent::ToggleTheme => {
                self.theme = self.theme.toggled();
                if let Err(e) = self.settings.set_theme(self.theme) {
                    warn!("Error saving theme preference: {}", e);
                }
            }
            AppEvent::ToggleVisualizations => {
                self.visualizations_hidden = !self.visualizations_hidden;
                if let Err(e) = self.settings.set_visualizations_hidden(self.visualizations_hidden) {
                    warn!("Error saving visualization preference: {}", e);
                }
            }
            AppEvent::ToggleLyrics => {
                self.show_lyrics = !self.show_lyrics;
            }
            AppEvent::FolderListed(listing) => self.apply_listing(listing),
            AppEvent::FolderFailed { folder, message } => {
                if self.folder.settle(&folder) {
                    self.status_message = Some(message);
                } else {
                    debug!("Dropping stale listing error for {}: {}", folder.display(), message);
                }
            }
            AppEvent::TrackResolved(loaded) => self.player.finish_load(loaded),
            AppEvent::LyricsResolved { id, lyrics } => {
                self.lyrics_tracker.complete(id, lyrics);
            }
        }
    }

    fn handle_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::TrackStarted(now_playing) => {
                self.status_message = None;
                self.notifier.announce(&now_playing);
                if let Some(request) = self.lyrics_tracker.track_changed(&now_playing) {
                    let lyrics = Arc::clone(&self.lyrics);
                    let sender = self.events.sender();
                    tokio::spawn(async move {
                        let text = lyrics.resolve(&request.artist, &request.title).await;
                        let _ = sender.send(AppEvent::LyricsResolved {
                            id: request.id,
                            lyrics: text,
                        });
                    });
                }
            }
            PlayerEvent::TrackStopped => {
                self.lyrics_tracker.cleared();
                self.scene.clear();
            }
            PlayerEvent::Error(message) => {
                self.lyrics_tracker.cleared();
                self.scene.clear();
                self.status_message = Some(format!("Playback failed: {}", message));
            }
            PlayerEvent::TrackFinished { index } => debug!("Track {} finished", index),
            other => debug!("Player event: {:?}", other),
        }
    }

    /// Re-reads tags for a track that just entered Loading, off the frame loop.
    fn start_load(&self, load: Option<PendingLoad>) {
        let Some(load) = load else {
            return;
        };
        let sender = self.events.sender();
        tokio::spawn(async move {
            let loaded = load.resolve().await;
            let _ = sender.send(AppEvent::TrackResolved(loaded));
        });
    }

    fn handle_notifier_event(&mut self, event: NotifierEvent) {
        match event {
            // The terminal can't raise itself; the next frame repaints anyway
            NotifierEvent::FocusRequested => debug!("Focus requested from notification"),
        }
    }

    /// Lists `folder` in the background. Results for a folder that is no
    /// longer current are dropped when they arrive.
    fn open_folder(&mut self, folder: PathBuf) {
        info!("Opening folder {}", folder.display());
        self.crumbs = breadcrumb(&folder.to_string_lossy());
        self.folder.open(folder.clone());

        let resolver = self.resolver;
        let sender = self.events.sender();
        tokio::spawn(async move {
            let event = match read_folder(folder.clone(), resolver).await {
                Ok(listing) => AppEvent::FolderListed(listing),
                Err(e) => AppEvent::FolderFailed {
                    folder,
                    message: e.to_string(),
                },
            };
            let _ = sender.send(event);
        });
    }

    fn apply_listing(&mut self, listing: FolderListing) {
        if !self.folder.settle(&listing.folder) {
            debug!("Dropping stale listing for {}", listing.folder.display());
            return;
        }

        self.rows = listing
            .subdirectories
            .into_iter()
            .map(BrowserRow::Folder)
            .chain((0..listing.entries.len()).map(BrowserRow::Track))
            .collect();
        self.player.replace_queue(listing.entries);
        self.list_state.select(if self.rows.is_empty() { None } else { Some(0) });

        if let Err(e) = self.settings.set_last_folder(&self.folder.folder) {
            warn!("Error saving last folder: {}", e);
        }
    }

    fn activate_selection(&mut self) {
        let Some(row) = self.list_state.selected().and_then(|i| self.rows.get(i)).cloned() else {
            return;
        };
        match row {
            BrowserRow::Folder(path) => self.open_folder(path),
            BrowserRow::Track(index) => {
                let load = self.player.play_track(index);
                self.start_load(load);
            }
        }
    }

    fn move_selection(&mut self, delta: i32) {
        if self.rows.is_empty() {
            return;
        }

        let current = self.list_state.selected().unwrap_or(0);
        let new_index = if delta < 0 {
            current.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            (current + delta as usize).min(self.rows.len() - 1)
        };

        self.list_state.select(Some(new_index));
    }

    fn change_volume(&mut self, delta: i16) {
        let volume = (i16::from(self.player.status().volume) + delta).clamp(0, 100) as u8;
        self.player.set_volume(volume);
        if let Err(e) = self.settings.set_volume(volume) {
            warn!("Error saving volume: {}", e);
        }
    }

    fn render(&mut self) -> Result<()> {
        let session = self.player.session();
        let model = ViewModel {
            theme: self.theme,
            crumbs: &self.crumbs,
            rows: &self.rows,
            entries: session.queue.entries(),
            current_index: session.queue.current_index(),
            status: &session.status,
            now_playing: session.now_playing.as_ref(),
            lyrics: self.show_lyrics.then(|| self.lyrics_tracker.pane().text()),
            visualizations_hidden: self.visualizations_hidden,
            status_message: self.status_message.as_deref(),
            loading_folder: self.folder.loading,
        };

        let list_state = &mut self.list_state;
        let scene = &mut self.scene;
        if let Err(e) = self.terminal.draw(|f| view::render(f, &model, list_state, scene)) {
            error!("Error drawing frame: {}", e);
            return Err(e);
        }
        Ok(())
    }
}

async fn read_folder(folder: PathBuf, resolver: MetadataResolver) -> crate::Result<FolderListing> {
    let entries = list_audio_entries(&folder, resolver).await?;
    let dir = folder.clone();
    let subdirectories = tokio::task::spawn_blocking(move || list_subdirectories(&dir))
        .await
        .map_err(|e| crate::Error::Task(e.to_string()))??;

    Ok(FolderListing {
        folder,
        entries,
        subdirectories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_for_the_open_folder_end_loading() {
        let mut cursor = FolderCursor::new(PathBuf::from("/music"));
        cursor.open(PathBuf::from("/music/jazz"));
        assert!(cursor.loading);

        assert!(cursor.settle(Path::new("/music/jazz")));
        assert!(!cursor.loading);
    }

    #[test]
    fn results_for_a_folder_already_left_are_ignored() {
        let mut cursor = FolderCursor::new(PathBuf::from("/music"));
        cursor.open(PathBuf::from("/music/jazz"));
        cursor.open(PathBuf::from("/music/rock"));

        // A failed or late listing of the first folder must not touch the second
        assert!(!cursor.settle(Path::new("/music/jazz")));
        assert!(cursor.loading);
        assert_eq!(cursor.folder, PathBuf::from("/music/rock"));
    }
}
