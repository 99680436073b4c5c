//! Retention classification.
//!
//! [`classify`] walks the images newest first and hands each one to the
//! first rule (by priority) whose pattern matches its joined tags. Each rule
//! keeps images until its budget runs out; every later match is selected
//! for deletion. Images matched by no rule are left alone.

use serde::Serialize;

use crate::image::ImageRecord;
use crate::rule::{RetentionRule, RuleSet};

/// Per-rule outcome of a classification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleStats {
    /// Rule name.
    pub rule: String,

    /// Images kept under this rule's budget.
    pub kept: usize,

    /// Images selected for deletion under this rule.
    pub deleted: usize,
}

/// Result of a classification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Digests selected for deletion, newest first.
    pub to_delete: Vec<String>,

    /// Statistics per rule, in priority order.
    pub rules: Vec<RuleStats>,

    /// Images no rule matched. These are never deleted.
    pub unmatched: usize,

    /// Number of images considered.
    pub total: usize,
}

impl Classification {
    /// Returns true if nothing was selected for deletion.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty()
    }

    /// Number of images that survive the pass (kept or unmatched).
    #[must_use]
    pub fn retained(&self) -> usize {
        self.total - self.to_delete.len()
    }
}

/// Decides which images are eligible for deletion.
///
/// Pure: performs no I/O, does not reorder `images` and does not modify
/// `rules`. Images are visited newest first; equal push times are ordered
/// by digest so the result is deterministic.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use tagprune_core::{classify, ImageRecord, RetentionRule, RuleSet};
///
/// let at = |secs| Utc.timestamp_opt(secs, 0).unwrap();
/// let images = vec![
///     ImageRecord::new("sha256:1", vec!["commit-1".into()], at(1)),
///     ImageRecord::new("sha256:3", vec!["commit-3".into()], at(3)),
///     ImageRecord::new("sha256:2", vec!["commit-2".into()], at(2)),
///     ImageRecord::new("sha256:x", vec!["latest".into()], at(0)),
/// ];
/// let rules = RuleSet::new(vec![RetentionRule::new("commits", "^commit-", 1, 1).unwrap()]);
///
/// let result = classify(&images, &rules);
/// assert_eq!(result.to_delete, vec!["sha256:2", "sha256:1"]);
/// assert_eq!(result.unmatched, 1);
/// ```
#[must_use]
pub fn classify(images: &[ImageRecord], rules: &RuleSet) -> Classification {
    let ordered_rules = rules.by_priority();
    let mut budgets: Vec<u32> = ordered_rules.iter().map(|rule| rule.keep).collect();
    let mut stats: Vec<RuleStats> = ordered_rules
        .iter()
        .map(|rule| RuleStats {
            rule: rule.name.clone(),
            kept: 0,
            deleted: 0,
        })
        .collect();

    let mut to_delete = Vec::new();
    let mut unmatched = 0;

    for image in newest_first(images) {
        let Some(index) = first_match(&ordered_rules, image) else {
            unmatched += 1;
            continue;
        };

        if budgets[index] >= 1 {
            budgets[index] -= 1;
            stats[index].kept += 1;
        } else {
            stats[index].deleted += 1;
            to_delete.push(image.digest.clone());
        }
    }

    tracing::debug!(
        total = images.len(),
        delete = to_delete.len(),
        unmatched,
        "Classified images"
    );

    Classification {
        to_delete,
        rules: stats,
        unmatched,
        total: images.len(),
    }
}

/// Index of the first rule whose pattern matches the image's joined tags.
fn first_match(rules: &[&RetentionRule], image: &ImageRecord) -> Option<usize> {
    let joined = image.joined_tags();
    rules.iter().position(|rule| rule.matches(&joined))
}

fn newest_first(images: &[ImageRecord]) -> Vec<&ImageRecord> {
    let mut ordered: Vec<&ImageRecord> = images.iter().collect();
    ordered.sort_by(|a, b| {
        b.pushed_at
            .cmp(&a.pushed_at)
            .then_with(|| a.digest.cmp(&b.digest))
    });
    ordered
}
