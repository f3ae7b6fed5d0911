use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// One playable file from the currently browsed folder.
///
/// Everything except `metadata` is fixed at listing time. `metadata` is
/// replaced wholesale whenever it is resolved again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub path: PathBuf,
    pub display_name: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    pub metadata: Option<TrackMetadata>,
}

/// Normalised tag and stream information. Every field is always populated;
/// only `cover_art` may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub genre: String,
    pub duration_seconds: f64,
    pub bitrate: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub cover_art: Option<CoverArt>,
}

/// First embedded picture, re-encoded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverArt {
    /// MIME type, e.g. `image/jpeg`.
    pub format: String,
    pub base64_data: String,
}

impl TrackEntry {
    pub fn new(path: PathBuf, size_bytes: u64, modified_at: DateTime<Utc>) -> Self {
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path,
            display_name,
            size_bytes,
            modified_at,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: TrackMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Replaces (never merges) the resolved metadata.
    pub fn replace_metadata(&mut self, metadata: TrackMetadata) {
        self.metadata = Some(metadata);
    }

    /// File name without its extension.
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }

    pub fn display_title(&self) -> String {
        match &self.metadata {
            Some(metadata) => metadata.title.clone(),
            None => split_track_name(&self.stem()).1,
        }
    }

    pub fn display_artist(&self) -> String {
        match &self.metadata {
            Some(metadata) => metadata.artist.clone(),
            None => split_track_name(&self.stem()).0,
        }
    }
}

impl TrackMetadata {
    /// The record used whenever a file can't be parsed: title from the file
    /// name, everything else at its default.
    pub fn fallback_for(path: &Path) -> Self {
        Self {
            title: file_stem(path),
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            year: String::new(),
            genre: String::new(),
            duration_seconds: 0.0,
            bitrate: 0,
            sample_rate: 0,
            channels: 0,
            cover_art: None,
        }
    }
}

/// What the player is currently presenting, as emitted with `TrackStarted`.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub index: usize,
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_seconds: f64,
    pub cover_art: Option<CoverArt>,
    /// False when playback started without freshly resolved metadata.
    pub enriched: bool,
}

impl NowPlaying {
    pub fn from_metadata(index: usize, path: &Path, metadata: &TrackMetadata) -> Self {
        Self {
            index,
            path: path.to_path_buf(),
            title: metadata.title.clone(),
            artist: metadata.artist.clone(),
            album: metadata.album.clone(),
            duration_seconds: metadata.duration_seconds,
            cover_art: metadata.cover_art.clone(),
            enriched: true,
        }
    }

    /// Record for a track that started without metadata: only the file name
    /// is available.
    pub fn degraded(index: usize, path: &Path) -> Self {
        let stem = file_stem(path);
        let (artist, title) = if stem.is_empty() {
            (UNKNOWN_ARTIST.to_string(), UNKNOWN_TITLE.to_string())
        } else {
            split_track_name(&stem)
        };

        Self {
            index,
            path: path.to_path_buf(),
            title,
            artist,
            album: UNKNOWN_ALBUM.to_string(),
            duration_seconds: 0.0,
            cover_art: None,
            enriched: false,
        }
    }

    /// Artist/title pair for a lyrics lookup, or `None` when the artist is
    /// unknown and a lookup would be meaningless.
    pub fn lyrics_query(&self) -> Option<(String, String)> {
        if self.artist == UNKNOWN_ARTIST {
            None
        } else {
            Some((self.artist.clone(), self.title.clone()))
        }
    }

    pub fn notification_body(&self) -> String {
        format!("{} by {}", self.title, self.artist)
    }
}

/// Splits `"Artist - Title"` into `(artist, title)`. Anything without the
/// separator is all title, with the unknown-artist sentinel.
pub fn split_track_name(stem: &str) -> (String, String) {
    let parts: Vec<&str> = stem.split(" - ").collect();
    if parts.len() > 1 {
        (parts[0].to_string(), parts[1].to_string())
    } else {
        (UNKNOWN_ARTIST.to_string(), stem.to_string())
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_artist_and_title() {
        let (artist, title) = split_track_name("Artist - Title");
        assert_eq!(artist, "Artist");
        assert_eq!(title, "Title");
    }

    #[test]
    fn solo_name_is_all_title() {
        let (artist, title) = split_track_name("SoloTrack");
        assert_eq!(artist, UNKNOWN_ARTIST);
        assert_eq!(title, "SoloTrack");
    }

    #[test]
    fn only_first_two_parts_are_used() {
        let (artist, title) = split_track_name("A - B - C");
        assert_eq!(artist, "A");
        assert_eq!(title, "B");
    }

    #[test]
    fn degraded_record_parses_file_name() {
        let np = NowPlaying::degraded(2, Path::new("/music/Artist - Title.mp3"));
        assert_eq!(np.artist, "Artist");
        assert_eq!(np.title, "Title");
        assert!(!np.enriched);
        assert_eq!(np.lyrics_query(), Some(("Artist".to_string(), "Title".to_string())));
    }

    #[test]
    fn unknown_artist_skips_lyrics() {
        let np = NowPlaying::degraded(0, Path::new("/music/SoloTrack.mp3"));
        assert_eq!(np.title, "SoloTrack");
        assert_eq!(np.artist, UNKNOWN_ARTIST);
        assert_eq!(np.lyrics_query(), None);
    }

    #[test]
    fn nameless_path_degrades_to_unknown_title() {
        let np = NowPlaying::degraded(0, Path::new("/"));
        assert_eq!(np.title, UNKNOWN_TITLE);
        assert_eq!(np.artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn entry_without_metadata_displays_file_name_parts() {
        let entry = TrackEntry::new(PathBuf::from("/m/Band - Song.ogg"), 10, Utc::now());
        assert_eq!(entry.display_name, "Band - Song.ogg");
        assert_eq!(entry.display_artist(), "Band");
        assert_eq!(entry.display_title(), "Song");
    }

    #[test]
    fn replacing_metadata_discards_the_old_record() {
        let path = PathBuf::from("/m/x.mp3");
        let mut first = TrackMetadata::fallback_for(&path);
        first.genre = "Rock".into();
        let mut entry = TrackEntry::new(path.clone(), 1, Utc::now()).with_metadata(first);

        entry.replace_metadata(TrackMetadata::fallback_for(&path));
        assert_eq!(entry.metadata.as_ref().map(|m| m.genre.as_str()), Some(""));
    }

    #[test]
    fn notification_body_reads_title_by_artist() {
        let meta = TrackMetadata {
            artist: "Band".into(),
            ..TrackMetadata::fallback_for(Path::new("/m/Song.mp3"))
        };
        let np = NowPlaying::from_metadata(0, Path::new("/m/Song.mp3"), &meta);
        assert_eq!(np.notification_body(), "Song by Band");
    }
}
