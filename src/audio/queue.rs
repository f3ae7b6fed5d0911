use super::track::{TrackEntry, TrackMetadata};
use std::path::Path;

/// Playable entries of the browsed folder, in directory-listing order, plus
/// the selected index.
///
/// The only structural mutation is [`TrackQueue::rebuild`]; folder navigation
/// always swaps the whole sequence at once.
#[derive(Debug, Clone, Default)]
pub struct TrackQueue {
    entries: Vec<TrackEntry>,
    current_index: Option<usize>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sequence and clears the selection. Returns `true` when a
    /// track had been loaded, so the caller knows it must stop the sink.
    pub fn rebuild(&mut self, entries: Vec<TrackEntry>) -> bool {
        self.entries = entries;
        self.current_index.take().is_some()
    }

    /// Linear lookup by path.
    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|entry| entry.path == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TrackEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&TrackEntry> {
        self.entries.get(index)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Selects `index` if it is in range. The selection stays a valid index
    /// or `None`.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.entries.len() {
            self.current_index = Some(index);
            true
        } else {
            false
        }
    }

    pub fn replace_metadata(&mut self, index: usize, metadata: TrackMetadata) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.replace_metadata(metadata);
        }
    }

    /// Index after the current one, wrapping to the start. With nothing
    /// selected this is the first track.
    pub fn next_index(&self) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        Some(match self.current_index {
            Some(index) => (index + 1) % self.entries.len(),
            None => 0,
        })
    }

    /// Index before the current one, wrapping to the end. With nothing
    /// selected this is the last track.
    pub fn previous_index(&self) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        Some(match self.current_index {
            Some(0) | None => last,
            Some(index) => index - 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn queue_of(names: &[&str]) -> TrackQueue {
        let mut queue = TrackQueue::new();
        queue.rebuild(
            names
                .iter()
                .map(|name| TrackEntry::new(PathBuf::from(format!("/music/{name}")), 0, Utc::now()))
                .collect(),
        );
        queue
    }

    #[test]
    fn index_of_finds_paths_and_reports_absence() {
        let queue = queue_of(&["a.mp3", "b.ogg", "c.wav"]);
        assert_eq!(queue.index_of(Path::new("/music/b.ogg")), Some(1));
        assert_eq!(queue.index_of(Path::new("/music/zzz.mp3")), None);
    }

    #[test]
    fn next_wraps_to_first() {
        let mut queue = queue_of(&["a.mp3", "b.mp3", "c.mp3"]);
        queue.select(2);
        assert_eq!(queue.next_index(), Some(0));
    }

    #[test]
    fn previous_wraps_to_last() {
        let mut queue = queue_of(&["a.mp3", "b.mp3", "c.mp3"]);
        queue.select(0);
        assert_eq!(queue.previous_index(), Some(2));
    }

    #[test]
    fn navigation_without_selection() {
        let queue = queue_of(&["a.mp3", "b.mp3"]);
        assert_eq!(queue.next_index(), Some(0));
        assert_eq!(queue.previous_index(), Some(1));
        assert_eq!(TrackQueue::new().next_index(), None);
    }

    #[test]
    fn rebuild_clears_selection_and_reports_it() {
        let mut queue = queue_of(&["a.mp3", "b.mp3"]);
        assert!(!queue.rebuild(queue.entries().to_vec()));

        queue.select(1);
        assert!(queue.rebuild(vec![]));
        assert_eq!(queue.current_index(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn out_of_range_selection_is_refused() {
        let mut queue = queue_of(&["a.mp3"]);
        assert!(!queue.select(1));
        assert_eq!(queue.current_index(), None);
    }
}
