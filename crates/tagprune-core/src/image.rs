//! Image records as listed from a registry repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An image stored in a registry repository.
///
/// Records are fetched fresh on every run and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Content digest (e.g. `sha256:...`). Unique within a repository.
    pub digest: String,

    /// Tags pointing at this image, in registry order. May be empty.
    #[serde(default)]
    pub tags: Vec<String>,

    /// When the image was pushed.
    pub pushed_at: DateTime<Utc>,
}

impl ImageRecord {
    /// Creates a new image record.
    #[must_use]
    pub fn new(digest: impl Into<String>, tags: Vec<String>, pushed_at: DateTime<Utc>) -> Self {
        Self {
            digest: digest.into(),
            tags,
            pushed_at,
        }
    }

    /// Returns the tags joined by a single space.
    ///
    /// This is the string rule patterns are matched against. An untagged
    /// image yields the empty string.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use tagprune_core::ImageRecord;
    ///
    /// let image = ImageRecord::new("sha256:abc", vec!["latest".into(), "v1".into()], Utc::now());
    /// assert_eq!(image.joined_tags(), "latest v1");
    /// ```
    #[must_use]
    pub fn joined_tags(&self) -> String {
        self.tags.join(" ")
    }

    /// Returns true if the image carries no tags.
    #[must_use]
    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }
}
