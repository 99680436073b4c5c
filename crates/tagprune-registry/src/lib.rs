//! # Tagprune Registry
//!
//! Amazon ECR access for `tagprune`: paginated listing and batch deletion of
//! images in a repository.
//!
//! ## Features
//!
//! - **ECR JSON API**: `DescribeImages` and `BatchDeleteImage` over HTTPS
//! - **Multiple Auth Methods**: AWS Signature Version 4, Basic, Bearer token, or none
//! - **Pagination**: Follows continuation tokens with a page cap
//! - **Batching**: Splits large deletions into requests the service accepts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tagprune_registry::{AwsCredentials, EcrClient, ImageLister, RegistryAuth, RegistryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RegistryConfig::new("us-east-1")
//!         .with_auth(RegistryAuth::aws(AwsCredentials::from_env()?));
//!
//!     let client = EcrClient::new(config)?;
//!     let images = ImageLister::new(&client).list_images("my-app").await?;
//!     println!("{} images", images.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ ImageLister  │   │ ImageDeleter │
//! └──────┬───────┘   └──────┬───────┘
//!        └────────┬─────────┘
//!                 ▼
//!       ┌───────────────────┐
//!       │ dyn ImageRegistry │
//!       └─────────┬─────────┘
//!                 ▼
//!       ┌───────────────────┐
//!       │ EcrClient (HTTP)  │──▶ SigV4Signer
//!       └───────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod client;
mod config;
mod deleter;
pub mod ecr;
mod error;
mod lister;
mod registry;
mod sigv4;

pub use client::EcrClient;
pub use config::{
    AwsCredentials, RegistryAuth, RegistryConfig, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_PAGES,
};
pub use deleter::{DeletionFailure, DeletionReport, ImageDeleter};
pub use error::RegistryError;
pub use lister::ImageLister;
pub use registry::{ImagePage, ImageRegistry};
pub use sigv4::{CanonicalRequest, SigV4Signer, SignedHeaders};
