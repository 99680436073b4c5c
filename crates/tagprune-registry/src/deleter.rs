//! Batch deletion of images by digest.

use serde::Serialize;

use crate::config::DEFAULT_MAX_BATCH_SIZE;
use crate::error::RegistryError;
use crate::registry::ImageRegistry;

/// A digest the registry refused to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    /// Image digest.
    pub digest: String,
    /// Failure code reported by the registry.
    pub code: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Outcome of deleting images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    /// Digests that were deleted.
    pub deleted: Vec<String>,
    /// Digests that were rejected.
    pub failures: Vec<DeletionFailure>,
}

impl DeletionReport {
    /// Returns true if every submitted digest was deleted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Deletes images from a repository in bounded batches.
#[derive(Debug)]
pub struct ImageDeleter<'a, R: ?Sized> {
    registry: &'a R,
    max_batch_size: usize,
}

impl<'a, R: ImageRegistry + ?Sized> ImageDeleter<'a, R> {
    /// Creates a deleter with the default batch size.
    #[must_use]
    pub const fn new(registry: &'a R) -> Self {
        Self {
            registry,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Sets the maximum number of digests per request. Zero is treated as one.
    #[must_use]
    pub const fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Deletes `digests` from `repository`.
    ///
    /// Lists within the batch size go out as a single request. An empty list
    /// returns an empty report without contacting the registry.
    ///
    /// # Errors
    ///
    /// Returns the first request failure unchanged, or `PartialDeletion` as
    /// soon as a batch reports rejected digests. Later batches are not sent.
    pub async fn delete_images(
        &self,
        repository: &str,
        digests: &[String],
    ) -> Result<DeletionReport, RegistryError> {
        let mut report = DeletionReport::default();
        if digests.is_empty() {
            return Ok(report);
        }

        for (batch, chunk) in digests.chunks(self.max_batch_size.max(1)).enumerate() {
            let outcome = self.registry.batch_delete_image(repository, chunk).await?;
            tracing::debug!(
                repository,
                batch,
                submitted = chunk.len(),
                deleted = outcome.deleted.len(),
                "Deleted image batch"
            );

            let complete = outcome.is_complete();
            report.deleted.extend(outcome.deleted);
            if !complete {
                for failure in &outcome.failures {
                    tracing::warn!(
                        repository,
                        digest = %failure.digest,
                        code = %failure.code,
                        reason = %failure.reason,
                        "Image deletion rejected"
                    );
                }
                return Err(RegistryError::PartialDeletion {
                    repository: repository.to_string(),
                    deleted: report.deleted,
                    failures: outcome.failures,
                });
            }
        }

        tracing::info!(repository, deleted = report.deleted.len(), "Deleted images");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ImagePage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every batch and rejects digests listed in `reject`.
    #[derive(Default)]
    struct RecordingRegistry {
        batches: Mutex<Vec<Vec<String>>>,
        reject: Vec<String>,
    }

    #[async_trait]
    impl ImageRegistry for RecordingRegistry {
        async fn describe_images(
            &self,
            _repository: &str,
            _next_token: Option<&str>,
        ) -> Result<ImagePage, RegistryError> {
            unreachable!("deleter never lists")
        }

        async fn batch_delete_image(
            &self,
            _repository: &str,
            digests: &[String],
        ) -> Result<DeletionReport, RegistryError> {
            self.batches.lock().unwrap().push(digests.to_vec());
            let (failed, deleted): (Vec<String>, Vec<String>) = digests
                .iter()
                .cloned()
                .partition(|d| self.reject.contains(d));
            Ok(DeletionReport {
                deleted,
                failures: failed
                    .into_iter()
                    .map(|digest| DeletionFailure {
                        digest,
                        code: "ImageNotFound".to_string(),
                        reason: "Requested image not found".to_string(),
                    })
                    .collect(),
            })
        }
    }

    fn digests(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("sha256:{i:04}")).collect()
    }

    #[tokio::test]
    async fn test_empty_list_makes_no_request() {
        let registry = RecordingRegistry::default();
        let report = ImageDeleter::new(&registry)
            .delete_images("app", &[])
            .await
            .unwrap();

        assert!(report.deleted.is_empty());
        assert!(report.is_complete());
        assert!(registry.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_batch_within_limit() {
        let registry = RecordingRegistry::default();
        let all = digests(100);
        let report = ImageDeleter::new(&registry)
            .delete_images("app", &all)
            .await
            .unwrap();

        assert_eq!(report.deleted, all);
        assert_eq!(registry.batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_splits_into_batches() {
        let registry = RecordingRegistry::default();
        let all = digests(7);
        let report = ImageDeleter::new(&registry)
            .with_max_batch_size(3)
            .delete_images("app", &all)
            .await
            .unwrap();

        assert_eq!(report.deleted, all);
        let sizes: Vec<usize> = registry.batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn test_rejection_stops_remaining_batches() {
        let registry = RecordingRegistry {
            reject: vec!["sha256:0004".to_string()],
            ..RecordingRegistry::default()
        };
        let result = ImageDeleter::new(&registry)
            .with_max_batch_size(3)
            .delete_images("app", &digests(9))
            .await;

        match result {
            Err(RegistryError::PartialDeletion {
                repository,
                deleted,
                failures,
            }) => {
                assert_eq!(repository, "app");
                assert_eq!(deleted.len(), 5);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].digest, "sha256:0004");
            }
            other => panic!("Expected PartialDeletion, got {other:?}"),
        }
        assert_eq!(registry.batches.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_batch_size_treated_as_one() {
        let registry = RecordingRegistry::default();
        ImageDeleter::new(&registry)
            .with_max_batch_size(0)
            .delete_images("app", &digests(2))
            .await
            .unwrap();

        assert_eq!(registry.batches.lock().unwrap().len(), 2);
    }
}
