//! Completion marker detection
//!
//! A logical unit (a full document or a partial-response envelope) is
//! complete once one of the registered literal markers appears in the
//! buffered text. Detection is a pure substring check; callers decide which
//! part of their buffer to hand in.

use squeeze_core::{Error, Result, DEFAULT_MARKERS};

/// Literal substrings that complete a logical unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerDetector {
    markers: Vec<String>,
    longest: usize,
}

impl Default for MarkerDetector {
    fn default() -> Self {
        Self {
            markers: DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
            longest: DEFAULT_MARKERS.iter().map(|m| m.len()).max().unwrap_or(0),
        }
    }
}

impl MarkerDetector {
    /// Create a detector for `markers`
    ///
    /// An empty set is allowed and never matches; an empty marker is
    /// rejected since it would match everywhere.
    pub fn new<I, S>(markers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set: Vec<String> = Vec::new();
        for marker in markers {
            let marker = marker.into();
            if marker.is_empty() {
                return Err(Error::Config("completion marker cannot be empty".to_string()));
            }
            if !set.contains(&marker) {
                set.push(marker);
            }
        }
        let longest = set.iter().map(String::len).max().unwrap_or(0);
        Ok(Self {
            markers: set,
            longest,
        })
    }

    /// Registered markers
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Returns true if any marker occurs in `text`
    pub fn matches(&self, text: &str) -> bool {
        self.markers.iter().any(|m| text.contains(m.as_str()))
    }

    /// Earliest offset at which a marker completed by text appended after
    /// `old_len` bytes of `text` can start
    ///
    /// Text before that offset holds no complete marker yet (otherwise it
    /// would already have been flushed), so scanning from here is enough.
    pub fn rescan_from(&self, text: &str, old_len: usize) -> usize {
        let mut start = old_len.saturating_sub(self.longest.saturating_sub(1));
        while start > 0 && !text.is_char_boundary(start) {
            start -= 1;
        }
        start
    }
}
