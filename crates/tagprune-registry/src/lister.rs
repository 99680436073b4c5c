//! Paginated repository listing.

use tagprune_core::ImageRecord;

use crate::config::DEFAULT_MAX_PAGES;
use crate::error::RegistryError;
use crate::registry::ImageRegistry;

/// Lists every image in a repository by following continuation tokens.
#[derive(Debug)]
pub struct ImageLister<'a, R: ?Sized> {
    registry: &'a R,
    max_pages: usize,
    allow_untagged: bool,
}

impl<'a, R: ImageRegistry + ?Sized> ImageLister<'a, R> {
    /// Creates a lister with the default page cap.
    #[must_use]
    pub const fn new(registry: &'a R) -> Self {
        Self {
            registry,
            max_pages: DEFAULT_MAX_PAGES,
            allow_untagged: false,
        }
    }

    /// Sets the maximum number of pages fetched before giving up.
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Accepts images without an `imageTags` field as untagged instead of
    /// rejecting them as invalid records.
    #[must_use]
    pub const fn with_allow_untagged(mut self, allow_untagged: bool) -> Self {
        self.allow_untagged = allow_untagged;
        self
    }

    /// Lists all images in `repository`.
    ///
    /// Pages are requested until one arrives without a continuation token.
    /// An empty token counts as no token.
    ///
    /// # Errors
    ///
    /// Returns the first page failure unchanged, an `InvalidRecord` error
    /// for an image that cannot be classified (including one with no tag
    /// list, unless untagged images are allowed), or `PaginationLimit` if the
    /// registry still has pages after `max_pages`.
    pub async fn list_images(&self, repository: &str) -> Result<Vec<ImageRecord>, RegistryError> {
        let mut records = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .registry
                .describe_images(repository, token.as_deref())
                .await?;
            pages += 1;

            tracing::debug!(
                repository,
                page = pages,
                count = page.images.len(),
                "Fetched image page"
            );

            for detail in page.images {
                let detail = if self.allow_untagged {
                    detail.untagged_as_empty()
                } else {
                    detail
                };
                let record = detail
                    .into_record()
                    .map_err(|source| RegistryError::InvalidRecord {
                        repository: repository.to_string(),
                        source,
                    })?;
                records.push(record);
            }

            token = page.next_token.filter(|next| !next.is_empty());
            if token.is_none() {
                break;
            }
            if pages >= self.max_pages {
                return Err(RegistryError::PaginationLimit {
                    repository: repository.to_string(),
                    max_pages: self.max_pages,
                });
            }
        }

        tracing::info!(
            repository,
            pages,
            images = records.len(),
            untagged = records.iter().filter(|r| r.is_untagged()).count(),
            "Listed images"
        );
        Ok(records)
    }
}
