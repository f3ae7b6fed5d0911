pub mod metadata;
pub mod player;
pub mod queue;
pub mod scanner;
pub mod sink;
pub mod track;

pub use metadata::MetadataResolver;
pub use player::{
    MediaKey, PendingLoad, PlaybackController, PlaybackState, PlaybackStatus, PlayerEvent, PlayerSession, ResolvedLoad,
};
pub use queue::TrackQueue;
pub use scanner::{breadcrumb, list_audio_entries, list_subdirectories, Crumb};
pub use sink::AudioSink;
pub use track::{CoverArt, NowPlaying, TrackEntry, TrackMetadata};

#[cfg(feature = "audio")]
pub use sink::RodioSink;

/// Formats the folder listing accepts; extensions compare case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AudioFormat {
    Mp3,
    Ogg,
    Wav,
    Unknown,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => AudioFormat::Mp3,
            "ogg" => AudioFormat::Ogg,
            "wav" => AudioFormat::Wav,
            _ => AudioFormat::Unknown,
        }
    }

    pub fn from_path(path: &std::path::Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(AudioFormat::from_extension)
            .unwrap_or(AudioFormat::Unknown)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, AudioFormat::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn extension_matching_ignores_case() {
        assert_eq!(AudioFormat::from_extension("MP3"), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_extension("Ogg"), AudioFormat::Ogg);
        assert_eq!(AudioFormat::from_path(Path::new("/music/a.WAV")), AudioFormat::Wav);
        assert!(!AudioFormat::from_path(Path::new("/music/a.flac")).is_supported());
        assert!(!AudioFormat::from_path(Path::new("/music/noext")).is_supported());
    }
}
