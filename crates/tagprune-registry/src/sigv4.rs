//! AWS Signature Version 4 request signing.
//!
//! Only what the ECR JSON API needs: no query strings, headers supplied by
//! the caller, payload hashed in full.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::config::AwsCredentials;
use crate::error::RegistryError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// A request as seen by the signer.
#[derive(Debug, Clone)]
pub struct CanonicalRequest<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// URI path, already normalized (e.g. "/").
    pub path: &'a str,
    /// Headers to sign, keyed by lowercase name.
    pub headers: BTreeMap<String, String>,
    /// Request body.
    pub payload: &'a [u8],
}

impl<'a> CanonicalRequest<'a> {
    /// Creates a request with no headers.
    #[must_use]
    pub const fn new(method: &'a str, path: &'a str, payload: &'a [u8]) -> Self {
        Self {
            method,
            path,
            headers: BTreeMap::new(),
            payload,
        }
    }

    /// Adds a header to be signed.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    fn signed_headers(&self) -> String {
        self.headers.keys().map(String::as_str).collect::<Vec<_>>().join(";")
    }

    fn canonical_string(&self) -> String {
        let headers: String = self
            .headers
            .iter()
            .map(|(name, value)| format!("{name}:{}\n", value.trim()))
            .collect();

        format!(
            "{}\n{}\n\n{headers}\n{}\n{}",
            self.method,
            self.path,
            self.signed_headers(),
            hex::encode(Sha256::digest(self.payload))
        )
    }
}

/// Headers produced by signing, ready to attach to the outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// Value for `x-amz-date`.
    pub amz_date: String,
    /// Value for `x-amz-security-token`, when using temporary credentials.
    pub security_token: Option<String>,
    /// Value for `authorization`.
    pub authorization: String,
}

/// Signs requests for one service in one region.
#[derive(Debug, Clone)]
pub struct SigV4Signer<'a> {
    credentials: &'a AwsCredentials,
    region: &'a str,
    service: &'a str,
}

impl<'a> SigV4Signer<'a> {
    /// Creates a signer.
    #[must_use]
    pub const fn new(credentials: &'a AwsCredentials, region: &'a str, service: &'a str) -> Self {
        Self {
            credentials,
            region,
            service,
        }
    }

    /// Signs `request` at time `now`.
    ///
    /// `x-amz-date` (and `x-amz-security-token` for temporary credentials)
    /// are added to the signed headers; the caller must send them as
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the HMAC cannot be keyed.
    pub fn sign(
        &self,
        request: CanonicalRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<SignedHeaders, RegistryError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let mut request = request.header("x-amz-date", amz_date.clone());
        if let Some(ref token) = self.credentials.session_token {
            request = request.header("x-amz-security-token", token.clone());
        }

        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(request.canonical_string().as_bytes()))
        );

        let key = self.signing_key(&date)?;
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        tracing::trace!(scope = %scope, "Signed request");

        Ok(SignedHeaders {
            amz_date,
            security_token: self.credentials.session_token.clone(),
            authorization: format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
                self.credentials.access_key_id,
                request.signed_headers()
            ),
        })
    }

    fn signing_key(&self, date: &str) -> Result<Vec<u8>, RegistryError> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key);
        let k_date = hmac_sha256(secret.as_bytes(), date.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        hmac_sha256(&k_service, b"aws4_request")
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, RegistryError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| RegistryError::SigningFailed {
        message: e.to_string(),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
