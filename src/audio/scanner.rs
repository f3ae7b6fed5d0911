use super::{metadata::MetadataResolver, track::TrackEntry, AudioFormat};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One clickable segment of the folder breadcrumb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    pub path: PathBuf,
}

pub fn is_supported(path: &Path) -> bool {
    AudioFormat::from_path(path).is_supported()
}

/// Lists the playable files directly inside `folder`.
///
/// Directories and unsupported extensions are skipped. Each surviving file is
/// stat'ed and its metadata resolved concurrently on the blocking pool; the
/// result keeps directory-entry order no matter which file finishes first.
pub async fn list_audio_entries(folder: &Path, resolver: MetadataResolver) -> Result<Vec<TrackEntry>> {
    let folder_owned = folder.to_path_buf();
    let candidates = tokio::task::spawn_blocking(move || audio_candidates(&folder_owned))
        .await
        .map_err(|e| Error::Task(e.to_string()))??;

    debug!("{} candidate audio files in {}", candidates.len(), folder.display());

    let pending = candidates.into_iter().map(|path| {
        tokio::task::spawn_blocking(move || {
            let stat = match fs::metadata(&path) {
                Ok(stat) => stat,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    return None;
                }
            };
            let modified_at = stat
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH);
            let metadata = resolver.resolve(&path);
            Some(TrackEntry::new(path, stat.len(), modified_at).with_metadata(metadata))
        })
    });

    let entries: Vec<TrackEntry> = join_all(pending)
        .await
        .into_iter()
        .filter_map(|joined| match joined {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Listing task failed: {}", e);
                None
            }
        })
        .collect();

    info!("Listed {} audio files in {}", entries.len(), folder.display());
    Ok(entries)
}

fn audio_candidates(folder: &Path) -> Result<Vec<PathBuf>> {
    let read_dir = fs::read_dir(folder).map_err(|source| Error::Listing {
        path: folder.to_path_buf(),
        source,
    })?;

    Ok(read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| !path.is_dir() && is_supported(path))
        .collect())
}

/// Child folders of `folder`, sorted by name, hidden ones left out.
pub fn list_subdirectories(folder: &Path) -> Result<Vec<PathBuf>> {
    let read_dir = fs::read_dir(folder).map_err(|source| Error::Listing {
        path: folder.to_path_buf(),
        source,
    })?;

    let mut dirs: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| {
            !path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with('.'))
        })
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Splits a folder path into breadcrumb segments. Both separators are
/// accepted; an empty leading segment (absolute path) is labelled `Root`.
pub fn breadcrumb(path: &str) -> Vec<Crumb> {
    let parts: Vec<&str> = path.split(['/', '\\']).collect();

    parts
        .iter()
        .enumerate()
        .map(|(index, part)| Crumb {
            label: if part.is_empty() { "Root".to_string() } else { part.to_string() },
            path: PathBuf::from(match parts[..=index].join("/") {
                joined if joined.is_empty() => "/".to_string(),
                joined => joined,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::UNKNOWN_ARTIST;

    #[tokio::test]
    async fn listing_filters_extensions_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["one.mp3", "Two.OGG", "three.wav", "notes.txt", "cover.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.mp3")).unwrap();

        let entries = list_audio_entries(dir.path(), MetadataResolver::new()).await.unwrap();
        let mut names: Vec<&str> = entries.iter().map(|e| e.display_name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Two.OGG", "one.mp3", "three.wav"]);
    }

    #[tokio::test]
    async fn listing_prepopulates_metadata_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Band - Song.mp3"), b"garbage bytes").unwrap();

        let entries = list_audio_entries(dir.path(), MetadataResolver::new()).await.unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.size_bytes, 13);
        let metadata = entry.metadata.as_ref().unwrap();
        assert_eq!(metadata.title, "Band - Song");
        assert_eq!(metadata.artist, UNKNOWN_ARTIST);
    }

    #[tokio::test]
    async fn listing_keeps_directory_order() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..12 {
            fs::write(dir.path().join(format!("track{i:02}.wav")), vec![0u8; i * 100]).unwrap();
        }

        let listed: Vec<PathBuf> = list_audio_entries(dir.path(), MetadataResolver::new())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(listed, audio_candidates(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn missing_folder_is_a_listing_error() {
        let err = list_audio_entries(Path::new("/no/such/folder"), MetadataResolver::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Listing { .. }));
    }

    #[test]
    fn subdirectories_are_sorted_and_visible_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b", "a", ".hidden"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("file.mp3"), b"x").unwrap();

        let dirs = list_subdirectories(dir.path()).unwrap();
        assert_eq!(dirs, vec![dir.path().join("a"), dir.path().join("b")]);
    }

    #[test]
    fn breadcrumb_for_absolute_path() {
        let crumbs = breadcrumb("/home/me/Music");
        let labels: Vec<&str> = crumbs.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Root", "home", "me", "Music"]);
        assert_eq!(crumbs[0].path, PathBuf::from("/"));
        assert_eq!(crumbs[2].path, PathBuf::from("/home/me"));
    }

    #[test]
    fn breadcrumb_accepts_backslashes() {
        let crumbs = breadcrumb("C:\\Music\\Albums");
        let labels: Vec<&str> = crumbs.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["C:", "Music", "Albums"]);
        assert_eq!(crumbs[2].path, PathBuf::from("C:/Music/Albums"));
    }
}
