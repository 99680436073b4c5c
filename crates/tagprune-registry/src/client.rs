//! ECR JSON API client.
//!
//! This module provides [`EcrClient`], the HTTP implementation of
//! [`ImageRegistry`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::{RegistryAuth, RegistryConfig};
use crate::deleter::{DeletionFailure, DeletionReport};
use crate::ecr::{
    self, BatchDeleteImageRequest, BatchDeleteImageResponse, DescribeImagesRequest,
    DescribeImagesResponse, ErrorBody, ImageIdentifier, Operation,
};
use crate::error::RegistryError;
use crate::registry::{ImagePage, ImageRegistry};
use crate::sigv4::{CanonicalRequest, SigV4Signer};

const X_AMZ_TARGET: HeaderName = HeaderName::from_static("x-amz-target");
const X_AMZ_DATE: HeaderName = HeaderName::from_static("x-amz-date");
const X_AMZ_SECURITY_TOKEN: HeaderName = HeaderName::from_static("x-amz-security-token");

/// Client for the ECR JSON API.
#[derive(Debug)]
pub struct EcrClient {
    config: RegistryConfig,
    endpoint: Url,
    http: reqwest::Client,
}

impl EcrClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid absolute URL or the
    /// HTTP client cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tagprune_registry::{EcrClient, RegistryConfig};
    ///
    /// let client = EcrClient::new(RegistryConfig::new("us-east-1"))?;
    /// # Ok::<(), tagprune_registry::RegistryError>(())
    /// ```
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let raw = format!("{}/", config.endpoint());
        let endpoint = Url::parse(&raw)
            .ok()
            .filter(Url::has_host)
            .ok_or(RegistryError::InvalidUrl { url: raw })?;

        let http = Self::build_http_client(&config)?;

        Ok(Self {
            config,
            endpoint,
            http,
        })
    }

    /// Returns the registry configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Returns the resolved endpoint URL.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one JSON API call and decodes the response.
    async fn call<Req, Resp>(&self, operation: Operation, request: &Req) -> Result<Resp, RegistryError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request)?;
        let headers = self.request_headers(operation, &body)?;

        tracing::trace!(operation = operation.name(), bytes = body.len(), "Sending request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::error_from_response(status.as_u16(), &text));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Maps a non-2xx response to an error.
    fn error_from_response(status: u16, text: &str) -> RegistryError {
        let body: Option<ErrorBody> = serde_json::from_str(text).ok();
        let code = body.as_ref().and_then(ErrorBody::code).map(ToString::to_string);
        let message = body
            .as_ref()
            .and_then(|b| b.message.clone())
            .unwrap_or_else(|| text.to_string());

        match (status, code) {
            (401 | 403, _) => RegistryError::AuthenticationFailed { message },
            (_, Some(code)) => RegistryError::ServiceError { code, message },
            (_, None) => RegistryError::HttpError { status, message },
        }
    }

    /// Builds the headers for one request, signing it if configured.
    fn request_headers(&self, operation: Operation, body: &[u8]) -> Result<HeaderMap, RegistryError> {
        let target = operation.target();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ecr::CONTENT_TYPE));
        headers.insert(X_AMZ_TARGET, header_value(&target)?);

        match &self.config.auth {
            RegistryAuth::None => {}
            RegistryAuth::Basic { username, password } => {
                let credentials = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    format!("{username}:{password}"),
                );
                headers.insert(AUTHORIZATION, header_value(&format!("Basic {credentials}"))?);
            }
            RegistryAuth::Bearer { token } => {
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
            }
            RegistryAuth::AwsSigV4 { credentials } => {
                let signer =
                    SigV4Signer::new(credentials, &self.config.region, ecr::SIGNING_SERVICE);
                let request = CanonicalRequest::new("POST", self.endpoint.path(), body)
                    .header("host", self.host())
                    .header("content-type", ecr::CONTENT_TYPE)
                    .header("x-amz-target", target.clone());
                let signed = signer.sign(request, chrono::Utc::now())?;

                headers.insert(X_AMZ_DATE, header_value(&signed.amz_date)?);
                if let Some(ref token) = signed.security_token {
                    headers.insert(X_AMZ_SECURITY_TOKEN, header_value(token)?);
                }
                headers.insert(AUTHORIZATION, header_value(&signed.authorization)?);
            }
        }

        Ok(headers)
    }

    /// Host header value as reqwest will send it.
    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Builds the HTTP client with proper configuration.
    fn build_http_client(config: &RegistryConfig) -> Result<reqwest::Client, RegistryError> {
        reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| RegistryError::ConnectionFailed {
                url: config.endpoint(),
                source: e,
            })
    }
}

#[async_trait]
impl ImageRegistry for EcrClient {
    async fn describe_images(
        &self,
        repository: &str,
        next_token: Option<&str>,
    ) -> Result<ImagePage, RegistryError> {
        let request = DescribeImagesRequest {
            repository_name: repository.to_string(),
            registry_id: self.config.registry_id.clone(),
            next_token: next_token.map(ToString::to_string),
            max_results: self.config.page_size,
        };

        let response: DescribeImagesResponse =
            self.call(Operation::DescribeImages, &request).await?;

        Ok(ImagePage {
            images: response.image_details,
            next_token: response.next_token,
        })
    }

    async fn batch_delete_image(
        &self,
        repository: &str,
        digests: &[String],
    ) -> Result<DeletionReport, RegistryError> {
        let request = BatchDeleteImageRequest {
            repository_name: repository.to_string(),
            registry_id: self.config.registry_id.clone(),
            image_ids: digests.iter().map(ImageIdentifier::digest).collect(),
        };

        let response: BatchDeleteImageResponse =
            self.call(Operation::BatchDeleteImage, &request).await?;

        Ok(report_from_response(response))
    }
}

/// Collapses per-tag entries into one deleted digest each, in response order.
fn report_from_response(response: BatchDeleteImageResponse) -> DeletionReport {
    let mut deleted: Vec<String> = Vec::new();
    for digest in response.image_ids.into_iter().filter_map(|id| id.image_digest) {
        if !deleted.contains(&digest) {
            deleted.push(digest);
        }
    }

    let failures = response
        .failures
        .into_iter()
        .map(|failure| DeletionFailure {
            digest: failure
                .image_id
                .and_then(|id| id.image_digest)
                .unwrap_or_default(),
            code: failure.failure_code.unwrap_or_default(),
            reason: failure.failure_reason.unwrap_or_default(),
        })
        .collect();

    DeletionReport { deleted, failures }
}

fn header_value(value: &str) -> Result<HeaderValue, RegistryError> {
    HeaderValue::from_str(value).map_err(|_| RegistryError::AuthenticationFailed {
        message: "Credentials contain characters not allowed in HTTP headers".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AwsCredentials;
    use crate::ecr::ImageFailure;

    fn client(auth: RegistryAuth) -> EcrClient {
        let config = RegistryConfig::new("us-east-1").with_auth(auth);
        EcrClient::new(config).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = client(RegistryAuth::None);
        assert_eq!(
            client.endpoint().as_str(),
            "https://api.ecr.us-east-1.amazonaws.com/"
        );
        assert_eq!(client.host(), "api.ecr.us-east-1.amazonaws.com");
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = RegistryConfig::new("us-east-1").with_endpoint("not a url");
        assert!(matches!(
            EcrClient::new(config),
            Err(RegistryError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_host_includes_explicit_port() {
        let config = RegistryConfig::new("us-east-1").with_endpoint("http://127.0.0.1:4566");
        let client = EcrClient::new(config).unwrap();
        assert_eq!(client.host(), "127.0.0.1:4566");
    }

    #[test]
    fn test_headers_unsigned() {
        let client = client(RegistryAuth::None);
        let headers = client
            .request_headers(Operation::DescribeImages, b"{}")
            .unwrap();

        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/x-amz-json-1.1");
        assert_eq!(
            headers.get("x-amz-target").unwrap(),
            "AmazonEC2ContainerRegistry_V20150921.DescribeImages"
        );
        assert!(!headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_headers_bearer() {
        let client = client(RegistryAuth::bearer("my-token"));
        let headers = client
            .request_headers(Operation::BatchDeleteImage, b"{}")
            .unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer my-token");
    }

    #[test]
    fn test_headers_basic() {
        let client = client(RegistryAuth::basic("user", "pass"));
        let headers = client
            .request_headers(Operation::DescribeImages, b"{}")
            .unwrap();
        // base64("user:pass")
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_headers_sigv4() {
        let creds = AwsCredentials::new("AKIDEXAMPLE", "secret").with_session_token("tok");
        let client = client(RegistryAuth::aws(creds));
        let headers = client
            .request_headers(Operation::DescribeImages, b"{}")
            .unwrap();

        let auth = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(auth.contains("/us-east-1/ecr/aws4_request"));
        assert!(auth.contains(
            "SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target"
        ));
        assert!(headers.contains_key("x-amz-date"));
        assert_eq!(headers.get("x-amz-security-token").unwrap(), "tok");
    }

    #[test]
    fn test_invalid_token_characters() {
        let client = client(RegistryAuth::bearer("bad\ntoken"));
        assert!(matches!(
            client.request_headers(Operation::DescribeImages, b"{}"),
            Err(RegistryError::AuthenticationFailed { .. })
        ));
    }

    #[test]
    fn test_error_from_response() {
        let err = EcrClient::error_from_response(
            400,
            r#"{"__type":"RepositoryNotFoundException","message":"The repository with name 'app' does not exist"}"#,
        );
        assert!(matches!(
            err,
            RegistryError::ServiceError { ref code, .. } if code == "RepositoryNotFoundException"
        ));

        let err = EcrClient::error_from_response(
            403,
            r#"{"__type":"InvalidSignatureException","message":"Signature expired"}"#,
        );
        assert!(matches!(
            err,
            RegistryError::AuthenticationFailed { ref message } if message == "Signature expired"
        ));

        let err = EcrClient::error_from_response(502, "Bad Gateway");
        assert!(matches!(
            err,
            RegistryError::HttpError { status: 502, ref message } if message == "Bad Gateway"
        ));
    }

    #[test]
    fn test_report_dedupes_digests_and_maps_failures() {
        let response = BatchDeleteImageResponse {
            image_ids: vec![
                ImageIdentifier {
                    image_digest: Some("sha256:a".to_string()),
                    image_tag: Some("one".to_string()),
                },
                ImageIdentifier {
                    image_digest: Some("sha256:a".to_string()),
                    image_tag: Some("two".to_string()),
                },
                ImageIdentifier::digest("sha256:b"),
            ],
            failures: vec![ImageFailure {
                image_id: Some(ImageIdentifier::digest("sha256:c")),
                failure_code: Some("ImageNotFound".to_string()),
                failure_reason: None,
            }],
        };

        let report = report_from_response(response);
        assert_eq!(report.deleted, vec!["sha256:a", "sha256:b"]);
        assert_eq!(
            report.failures,
            vec![DeletionFailure {
                digest: "sha256:c".to_string(),
                code: "ImageNotFound".to_string(),
                reason: String::new(),
            }]
        );
        assert!(!report.is_complete());
    }
}
