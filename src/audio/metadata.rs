use super::track::{file_stem, CoverArt, TrackMetadata, UNKNOWN_ALBUM, UNKNOWN_ARTIST};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::Accessor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Turns a file path into a fully populated [`TrackMetadata`].
///
/// Resolution never fails: unreadable files, corrupt containers and
/// unsupported codecs all produce [`TrackMetadata::fallback_for`]. There is no
/// retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataResolver;

/// Tag and stream fields as they come out of the container, before defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
    /// Genre values in tag order; only the first one is kept.
    pub genres: Vec<String>,
    pub duration_seconds: f64,
    /// Bits per second.
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    /// `(mime type, bytes)` of the first embedded picture.
    pub picture: Option<(String, Vec<u8>)>,
}

impl MetadataResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, path: &Path) -> TrackMetadata {
        match self.read_tags(path) {
            Ok(raw) => normalize(raw, path),
            Err(e) => {
                warn!("Error extracting metadata from {}: {}", path.display(), e);
                TrackMetadata::fallback_for(path)
            }
        }
    }

    /// Fresh resolution on the blocking pool. `None` only if the blocking task
    /// itself died; parse failures still come back as the fallback record.
    pub async fn resolve_fresh(&self, path: &Path) -> Option<TrackMetadata> {
        let resolver = *self;
        let owned: PathBuf = path.to_path_buf();
        match tokio::task::spawn_blocking(move || resolver.resolve(&owned)).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("Metadata task for {} failed: {}", path.display(), e);
                None
            }
        }
    }

    fn read_tags(&self, path: &Path) -> Result<RawTags, lofty::error::LoftyError> {
        let tagged_file = Probe::open(path)?.read()?;

        let props = tagged_file.properties();
        let mut raw = RawTags {
            duration_seconds: props.duration().as_secs_f64(),
            bitrate: props.audio_bitrate().map(|kbps| kbps * 1000),
            sample_rate: props.sample_rate(),
            channels: props.channels().map(u16::from),
            ..RawTags::default()
        };

        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
        if let Some(tag) = tag {
            raw.title = tag.title().map(|s| s.into_owned());
            raw.artist = tag.artist().map(|s| s.into_owned());
            raw.album = tag.album().map(|s| s.into_owned());
            raw.year = tag.year();
            raw.genres = tag.genre().map(|s| vec![s.into_owned()]).unwrap_or_default();
            raw.picture = tag.pictures().first().map(|picture| {
                let mime = picture
                    .mime_type()
                    .map(|mime| mime.as_str().to_string())
                    .unwrap_or_else(|| "image/jpeg".to_string());
                (mime, picture.data().to_vec())
            });
        } else {
            debug!("No tag container in {}", path.display());
        }

        Ok(raw)
    }
}

/// Applies the per-field defaults to whatever the container yielded.
pub fn normalize(raw: RawTags, path: &Path) -> TrackMetadata {
    let present = |value: Option<String>| value.filter(|s| !s.trim().is_empty());

    TrackMetadata {
        title: present(raw.title).unwrap_or_else(|| file_stem(path)),
        artist: present(raw.artist).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        album: present(raw.album).unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
        year: raw.year.filter(|y| *y > 0).map(|y| y.to_string()).unwrap_or_default(),
        genre: raw.genres.into_iter().next().unwrap_or_default(),
        duration_seconds: if raw.duration_seconds.is_finite() {
            raw.duration_seconds.max(0.0)
        } else {
            0.0
        },
        bitrate: raw.bitrate.unwrap_or(0),
        sample_rate: raw.sample_rate.unwrap_or(0),
        channels: raw.channels.unwrap_or(0),
        cover_art: raw.picture.map(|(format, data)| CoverArt {
            format,
            base64_data: BASE64.encode(data),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn full_tags_map_field_by_field() {
        let raw = RawTags {
            title: Some("Test Song".into()),
            artist: Some("Test Artist".into()),
            album: Some("Test Album".into()),
            year: Some(2023),
            genres: vec!["Rock".into(), "Pop".into()],
            duration_seconds: 180.5,
            bitrate: Some(320_000),
            sample_rate: Some(44_100),
            channels: Some(2),
            picture: Some(("image/jpeg".into(), b"test-image-data".to_vec())),
        };

        let meta = normalize(raw, Path::new("test/path/song.mp3"));
        assert_eq!(meta.title, "Test Song");
        assert_eq!(meta.artist, "Test Artist");
        assert_eq!(meta.album, "Test Album");
        assert_eq!(meta.year, "2023");
        assert_eq!(meta.genre, "Rock");
        assert_eq!(meta.duration_seconds, 180.5);
        assert_eq!(meta.bitrate, 320_000);
        assert_eq!(meta.sample_rate, 44_100);
        assert_eq!(meta.channels, 2);
        assert_eq!(
            meta.cover_art,
            Some(CoverArt {
                format: "image/jpeg".into(),
                base64_data: "dGVzdC1pbWFnZS1kYXRh".into(),
            })
        );
    }

    #[test]
    fn empty_tags_fall_back_per_field() {
        let meta = normalize(RawTags::default(), Path::new("test/path/song.mp3"));
        assert_eq!(meta, TrackMetadata::fallback_for(Path::new("test/path/song.mp3")));
        assert_eq!(meta.title, "song");
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let raw = RawTags {
            title: Some("   ".into()),
            artist: Some(String::new()),
            ..RawTags::default()
        };
        let meta = normalize(raw, Path::new("/m/Fallback Name.ogg"));
        assert_eq!(meta.title, "Fallback Name");
        assert_eq!(meta.artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn unparseable_file_gets_the_default_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken track.wav");
        fs::write(&path, b"definitely not a riff container").unwrap();

        let meta = MetadataResolver::new().resolve(&path);
        assert_eq!(meta.title, "broken track");
        assert_eq!(meta.artist, "Unknown Artist");
        assert_eq!(meta.album, "Unknown Album");
        assert_eq!(meta.year, "");
        assert_eq!(meta.genre, "");
        assert_eq!(meta.duration_seconds, 0.0);
        assert_eq!(meta.bitrate, 0);
        assert_eq!(meta.sample_rate, 0);
        assert_eq!(meta.channels, 0);
        assert_eq!(meta.cover_art, None);
    }

    #[test]
    fn missing_file_gets_the_default_record() {
        let meta = MetadataResolver::new().resolve(Path::new("/no/such/dir/ghost.wav"));
        assert_eq!(meta, TrackMetadata::fallback_for(Path::new("ghost.wav")));
    }

    #[tokio::test]
    async fn fresh_resolution_runs_off_thread() {
        let meta = MetadataResolver::new()
            .resolve_fresh(Path::new("/no/such/dir/Artist - Song.ogg"))
            .await;
        assert_eq!(meta.map(|m| m.title), Some("Artist - Song".to_string()));
    }
}
