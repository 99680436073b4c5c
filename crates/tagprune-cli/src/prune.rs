//! The list, classify, delete pipeline.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use tagprune_core::{classify, Classification, RetentionRule, RuleSet, RuleSpec};
use tagprune_registry::{DeletionReport, ImageDeleter, ImageLister, ImageRegistry};

/// Knobs for one pruning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneOptions {
    /// Listing page cap.
    pub max_pages: usize,
    /// Digests per delete request.
    pub max_batch_size: usize,
    /// Accept images without a tag list as untagged.
    pub allow_untagged: bool,
    /// Classify only; never delete.
    pub dry_run: bool,
}

/// What a run decided and did.
#[derive(Debug, Serialize)]
pub struct PruneOutcome {
    /// Repository that was pruned.
    pub repository: String,
    /// Whether deletion was skipped on request.
    pub dry_run: bool,
    /// Rules applied, in priority order.
    pub rules: Vec<RuleSpec>,
    /// Classifier output.
    pub classification: Classification,
    /// Deletion result; `None` when nothing was sent.
    pub report: Option<DeletionReport>,
}

/// Lists `repository`, classifies its images against `rules` and deletes
/// the selected digests.
///
/// # Errors
///
/// Returns an error if listing fails or any digest cannot be deleted.
pub async fn prune<R: ImageRegistry + ?Sized>(
    registry: &R,
    repository: &str,
    rules: &RuleSet,
    options: PruneOptions,
) -> Result<PruneOutcome> {
    let images = ImageLister::new(registry)
        .with_max_pages(options.max_pages)
        .with_allow_untagged(options.allow_untagged)
        .list_images(repository)
        .await
        .with_context(|| format!("Failed to list images in {repository}"))?;

    let classification = classify(&images, rules);
    info!(
        repository,
        total = classification.total,
        to_delete = classification.to_delete.len(),
        unmatched = classification.unmatched,
        "Classified images"
    );

    let report = if options.dry_run || classification.is_empty() {
        None
    } else {
        let report = ImageDeleter::new(registry)
            .with_max_batch_size(options.max_batch_size)
            .delete_images(repository, &classification.to_delete)
            .await
            .with_context(|| format!("Failed to delete images from {repository}"))?;
        Some(report)
    };

    Ok(PruneOutcome {
        repository: repository.to_string(),
        dry_run: options.dry_run,
        rules: rules.by_priority().into_iter().map(RetentionRule::to_spec).collect(),
        classification,
        report,
    })
}
