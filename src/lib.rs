// tunedeck Library - Core modules for the folder music player
// Playback, resolvers and visuals are UI-free; the terminal front end sits on top

pub mod analysis; // spectrum/waveform geometry and the sample analyser
pub mod audio;    // queue, metadata, sink, playback controller
pub mod config;   // config.toml and persisted settings
pub mod error;
pub mod lyrics;   // lyrics lookups and pane state
pub mod notify;   // "now playing" notifications
#[cfg(feature = "tui")]
pub mod ui;       // terminal interface

pub use audio::{MetadataResolver, PlaybackController, PlaybackState, PlayerEvent, TrackEntry, TrackMetadata, TrackQueue};
pub use config::Config;
pub use error::{Error, Result, SinkError};
