use crate::audio::{MediaKey, ResolvedLoad, TrackEntry};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MediaKeyCode};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Result of reading one folder in the background.
#[derive(Debug, Clone)]
pub struct FolderListing {
    pub folder: PathBuf,
    pub entries: Vec<TrackEntry>,
    pub subdirectories: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    // UI Events
    Quit,
    Render,

    // Playback Events
    TogglePlayPause,
    NextTrack,
    PreviousTrack,
    Media(MediaKey),
    SeekForward,
    SeekBackward,

    // Navigation Events
    Up,
    Down,
    Enter,
    Back,

    // Volume Events
    VolumeUp,
    VolumeDown,

    // View toggles
    ToggleTheme,
    ToggleVisualizations,
    ToggleLyrics,

    // Background results
    FolderListed(FolderListing),
    FolderFailed { folder: PathBuf, message: String },
    TrackResolved(ResolvedLoad),
    LyricsResolved { id: u64, lyrics: String },
}

pub struct EventHandler {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    event_receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            event_sender,
            event_receiver,
        }
    }

    /// For background tasks reporting back.
    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.event_sender.clone()
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_receiver.recv().await
    }

    /// Drains pending terminal input without blocking. Input is read on the
    /// UI task itself; a second reader would race it for the stream.
    pub fn poll_terminal(&self) -> Result<()> {
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Press {
                        if let Some(app_event) = key_to_app_event(key) {
                            let _ = self.event_sender.send(app_event);
                        }
                    }
                }
                Event::Resize(_, _) => {
                    let _ = self.event_sender.send(AppEvent::Render);
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

pub fn key_to_app_event(key: KeyEvent) -> Option<AppEvent> {
    match (key.code, key.modifiers) {
        // Quit
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppEvent::Quit),
        (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => Some(AppEvent::Quit),

        // Hardware media keys (terminals with keyboard enhancement only)
        (KeyCode::Media(MediaKeyCode::PlayPause | MediaKeyCode::Play | MediaKeyCode::Pause), _) => {
            Some(AppEvent::Media(MediaKey::PlayPause))
        }
        (KeyCode::Media(MediaKeyCode::TrackNext), _) => Some(AppEvent::Media(MediaKey::Next)),
        (KeyCode::Media(MediaKeyCode::TrackPrevious), _) => Some(AppEvent::Media(MediaKey::Previous)),

        // Playback controls
        (KeyCode::Char(' '), _) => Some(AppEvent::TogglePlayPause),
        (KeyCode::Char('n'), _) | (KeyCode::Right, _) => Some(AppEvent::NextTrack),
        (KeyCode::Char('b'), _) | (KeyCode::Left, _) => Some(AppEvent::PreviousTrack),
        (KeyCode::Char('.'), _) => Some(AppEvent::SeekForward),
        (KeyCode::Char(','), _) => Some(AppEvent::SeekBackward),

        // Navigation
        (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(AppEvent::Up),
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(AppEvent::Down),
        (KeyCode::Enter, _) => Some(AppEvent::Enter),
        (KeyCode::Backspace, _) => Some(AppEvent::Back),

        // Volume
        (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => Some(AppEvent::VolumeUp),
        (KeyCode::Char('-'), _) => Some(AppEvent::VolumeDown),

        // Views
        (KeyCode::Char('t'), _) => Some(AppEvent::ToggleTheme),
        (KeyCode::Char('v'), _) => Some(AppEvent::ToggleVisualizations),
        (KeyCode::Char('l'), _) => Some(AppEvent::ToggleLyrics),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Option<AppEvent> {
        key_to_app_event(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn media_keys_map_to_controller_keys() {
        assert!(matches!(
            press(KeyCode::Media(MediaKeyCode::PlayPause)),
            Some(AppEvent::Media(MediaKey::PlayPause))
        ));
        assert!(matches!(
            press(KeyCode::Media(MediaKeyCode::TrackNext)),
            Some(AppEvent::Media(MediaKey::Next))
        ));
        assert!(matches!(
            press(KeyCode::Media(MediaKeyCode::TrackPrevious)),
            Some(AppEvent::Media(MediaKey::Previous))
        ));
        assert!(press(KeyCode::Media(MediaKeyCode::Rewind)).is_none());
    }

    #[test]
    fn control_c_quits_but_plain_c_does_nothing() {
        assert!(matches!(
            key_to_app_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(AppEvent::Quit)
        ));
        assert!(press(KeyCode::Char('c')).is_none());
    }

    #[test]
    fn transport_and_view_keys() {
        assert!(matches!(press(KeyCode::Char(' ')), Some(AppEvent::TogglePlayPause)));
        assert!(matches!(press(KeyCode::Left), Some(AppEvent::PreviousTrack)));
        assert!(matches!(press(KeyCode::Char('.')), Some(AppEvent::SeekForward)));
        assert!(matches!(press(KeyCode::Backspace), Some(AppEvent::Back)));
        assert!(matches!(press(KeyCode::Char('v')), Some(AppEvent::ToggleVisualizations)));
    }
}
