//! ECR JSON API wire types.
//!
//! Request and response bodies for the `DescribeImages` and
//! `BatchDeleteImage` operations, as sent over `application/x-amz-json-1.1`.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use tagprune_core::ImageRecord;

/// Content type for ECR JSON requests.
pub const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Service name used in request signing.
pub const SIGNING_SERVICE: &str = "ecr";

/// Prefix of the `X-Amz-Target` header.
pub const TARGET_PREFIX: &str = "AmazonEC2ContainerRegistry_V20150921";

/// ECR operations used by tagprune.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// List images with their details.
    DescribeImages,
    /// Delete a batch of images.
    BatchDeleteImage,
}

impl Operation {
    /// Returns the operation name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DescribeImages => "DescribeImages",
            Self::BatchDeleteImage => "BatchDeleteImage",
        }
    }

    /// Returns the `X-Amz-Target` header value.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagprune_registry::ecr::Operation;
    ///
    /// assert_eq!(
    ///     Operation::DescribeImages.target(),
    ///     "AmazonEC2ContainerRegistry_V20150921.DescribeImages"
    /// );
    /// ```
    #[must_use]
    pub fn target(self) -> String {
        format!("{TARGET_PREFIX}.{}", self.name())
    }

    /// Parses an `X-Amz-Target` header value.
    #[must_use]
    pub fn from_target(target: &str) -> Option<Self> {
        match target.strip_prefix(TARGET_PREFIX)?.strip_prefix('.')? {
            "DescribeImages" => Some(Self::DescribeImages),
            "BatchDeleteImage" => Some(Self::BatchDeleteImage),
            _ => None,
        }
    }
}

/// `DescribeImages` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeImagesRequest {
    /// Repository to list.
    pub repository_name: String,

    /// Registry (account) id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_id: Option<String>,

    /// Continuation token from the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,

    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

/// `DescribeImages` response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeImagesResponse {
    /// Images on this page.
    #[serde(default)]
    pub image_details: Vec<ImageDetail>,

    /// Token for the next page, absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// One image as described by ECR.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetail {
    /// Content digest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_digest: Option<String>,

    /// Tags; ECR omits the field for untagged images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tags: Option<Vec<String>>,

    /// Push time in fractional epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pushed_at: Option<f64>,

    /// Compressed image size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size_in_bytes: Option<u64>,

    /// Repository name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_name: Option<String>,
}

impl ImageDetail {
    /// Treats an absent tag list as an empty one.
    ///
    /// ECR omits `imageTags` for untagged images; callers that want those
    /// images classified (rather than rejected) apply this before
    /// [`into_record`](Self::into_record).
    #[must_use]
    pub fn untagged_as_empty(mut self) -> Self {
        self.image_tags.get_or_insert_with(Vec::new);
        self
    }

    /// Converts the wire record into an [`ImageRecord`].
    ///
    /// An empty tag list yields an image with no tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the digest, tag list or push time is missing, or
    /// the push time is not representable.
    pub fn into_record(self) -> tagprune_core::Result<ImageRecord> {
        let digest = self
            .image_digest
            .filter(|digest| !digest.is_empty())
            .ok_or_else(|| tagprune_core::Error::InvalidRecord {
                reason: "missing imageDigest".to_string(),
            })?;

        let tags = self
            .image_tags
            .ok_or_else(|| tagprune_core::Error::InvalidRecord {
                reason: format!("missing imageTags for {digest}"),
            })?;

        let pushed_at = self
            .image_pushed_at
            .ok_or_else(|| tagprune_core::Error::InvalidRecord {
                reason: format!("missing imagePushedAt for {digest}"),
            })?;

        let pushed_at = epoch_to_datetime(pushed_at).ok_or_else(|| {
            tagprune_core::Error::InvalidRecord {
                reason: format!("imagePushedAt {pushed_at} out of range for {digest}"),
            }
        })?;

        Ok(ImageRecord::new(digest, tags, pushed_at))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn epoch_to_datetime(seconds: f64) -> Option<DateTime<chrono::Utc>> {
    if !seconds.is_finite() || seconds.abs() > 1e15 {
        return None;
    }
    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Identifies an image by digest and/or tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIdentifier {
    /// Content digest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_digest: Option<String>,

    /// Tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
}

impl ImageIdentifier {
    /// Identifies an image by digest.
    #[must_use]
    pub fn digest(digest: impl Into<String>) -> Self {
        Self {
            image_digest: Some(digest.into()),
            image_tag: None,
        }
    }
}

/// `BatchDeleteImage` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteImageRequest {
    /// Repository to delete from.
    pub repository_name: String,

    /// Registry (account) id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_id: Option<String>,

    /// Images to delete.
    pub image_ids: Vec<ImageIdentifier>,
}

/// `BatchDeleteImage` response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteImageResponse {
    /// Images that were deleted. ECR may list a digest once per removed tag.
    #[serde(default)]
    pub image_ids: Vec<ImageIdentifier>,

    /// Images that could not be deleted.
    #[serde(default)]
    pub failures: Vec<ImageFailure>,
}

/// A rejected image in a `BatchDeleteImage` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFailure {
    /// The image that failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<ImageIdentifier>,

    /// Failure code (e.g. `ImageNotFound`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_code: Option<String>,

    /// Human-readable reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error type, optionally prefixed with a namespace and `#`.
    #[serde(rename = "__type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Error message.
    #[serde(alias = "Message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Returns the error code without any namespace prefix.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.kind
            .as_deref()
            .map(|kind| kind.rsplit('#').next().unwrap_or(kind))
    }
}
