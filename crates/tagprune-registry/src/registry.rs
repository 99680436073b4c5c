//! The registry operations tagprune depends on.

use async_trait::async_trait;

use crate::deleter::DeletionReport;
use crate::ecr::ImageDetail;
use crate::error::RegistryError;

/// One page of a repository listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagePage {
    /// Images on this page.
    pub images: Vec<ImageDetail>,

    /// Token for the next page; `None` on the last page.
    pub next_token: Option<String>,
}

/// Backend that can list and delete images in a repository.
///
/// [`EcrClient`](crate::EcrClient) implements this over HTTP; tests use
/// in-memory implementations.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Fetches one page of images, starting after `next_token`.
    async fn describe_images(
        &self,
        repository: &str,
        next_token: Option<&str>,
    ) -> Result<ImagePage, RegistryError>;

    /// Deletes the given digests in a single request.
    async fn batch_delete_image(
        &self,
        repository: &str,
        digests: &[String],
    ) -> Result<DeletionReport, RegistryError>;
}
