//! # Tagprune Core
//!
//! Core types and the retention classifier for `tagprune`.
//!
//! This crate has no I/O beyond reading rule files. It provides:
//!
//! - [`ImageRecord`] - An image in a registry repository (digest, tags, push time)
//! - [`RetentionRule`] / [`RuleSet`] - Tag-pattern rules with a keep budget and a priority
//! - [`classify`] - Decides which images are eligible for deletion
//! - [`Classification`] - The digests selected for deletion plus per-rule statistics
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use tagprune_core::{classify, ImageRecord, RetentionRule, RuleSet};
//!
//! let images = vec![
//!     ImageRecord::new("sha256:new", vec!["commit-a".into()], Utc.timestamp_opt(200, 0).unwrap()),
//!     ImageRecord::new("sha256:old", vec!["commit-b".into()], Utc.timestamp_opt(100, 0).unwrap()),
//! ];
//! let rules = RuleSet::new(vec![RetentionRule::new("commits", "commit-", 1, 1).unwrap()]);
//!
//! let result = classify(&images, &rules);
//! assert_eq!(result.to_delete, vec!["sha256:old".to_string()]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classify;
pub mod error;
pub mod image;
pub mod rule;


pub use classify::{classify, Classification, RuleStats};
pub use error::{Error, Result};
pub use image::ImageRecord;
pub use rule::{RetentionRule, RuleSet, RuleSpec};
