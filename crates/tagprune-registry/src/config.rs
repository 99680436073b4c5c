//! Configuration types for the registry client.

use std::fmt;
use std::time::Duration;

use crate::error::RegistryError;

/// Default cap on listing pages per repository.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// Default (and ECR maximum) number of image ids per delete request.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Configuration for the registry client.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Region hosting the repository (e.g. "us-east-1").
    pub region: String,

    /// Endpoint override; defaults to the regional ECR endpoint.
    pub endpoint: Option<String>,

    /// Registry (account) id; defaults to the caller's account.
    pub registry_id: Option<String>,

    /// Authentication configuration.
    pub auth: RegistryAuth,

    /// Request timeout.
    pub timeout: Duration,

    /// Images requested per listing page (`maxResults`). `None` lets the
    /// registry choose.
    pub page_size: Option<u32>,

    /// Maximum number of listing pages before giving up.
    pub max_pages: usize,

    /// Maximum number of digests per delete request.
    pub max_batch_size: usize,

    /// User agent string.
    pub user_agent: String,
}

impl RegistryConfig {
    /// Creates a new registry configuration for the given region.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagprune_registry::RegistryConfig;
    ///
    /// let config = RegistryConfig::new("eu-west-1");
    /// assert_eq!(config.endpoint(), "https://api.ecr.eu-west-1.amazonaws.com");
    /// ```
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint: None,
            registry_id: None,
            auth: RegistryAuth::None,
            timeout: Duration::from_secs(30),
            page_size: None,
            max_pages: DEFAULT_MAX_PAGES,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            user_agent: format!("tagprune/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Overrides the API endpoint.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagprune_registry::RegistryConfig;
    ///
    /// let config = RegistryConfig::new("us-east-1")
    ///     .with_endpoint("http://localhost:4566/");
    /// assert_eq!(config.endpoint(), "http://localhost:4566");
    /// ```
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the registry (account) id.
    #[must_use]
    pub fn with_registry_id(mut self, registry_id: impl Into<String>) -> Self {
        self.registry_id = Some(registry_id.into());
        self
    }

    /// Sets the authentication method.
    #[must_use]
    pub fn with_auth(mut self, auth: RegistryAuth) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the listing page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sets the listing page cap.
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets the delete batch size.
    #[must_use]
    pub const fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Returns the API endpoint without a trailing slash.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.endpoint.as_ref().map_or_else(
            || format!("https://api.ecr.{}.amazonaws.com", self.region),
            |endpoint| endpoint.trim_end_matches('/').to_string(),
        )
    }
}

/// Authentication methods for registry access.
#[derive(Clone)]
pub enum RegistryAuth {
    /// No authentication (for local emulators).
    None,

    /// Basic authentication (username/password or username/token).
    Basic {
        /// Username.
        username: String,
        /// Password or token.
        password: String,
    },

    /// Bearer token authentication.
    Bearer {
        /// Token value.
        token: String,
    },

    /// AWS Signature Version 4 request signing.
    AwsSigV4 {
        /// Access key credentials.
        credentials: AwsCredentials,
    },
}

impl RegistryAuth {
    /// Creates basic authentication.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Creates `SigV4` authentication from explicit credentials.
    #[must_use]
    pub const fn aws(credentials: AwsCredentials) -> Self {
        Self::AwsSigV4 { credentials }
    }
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
            Self::AwsSigV4 { credentials } => f
                .debug_struct("AwsSigV4")
                .field("credentials", credentials)
                .finish(),
        }
    }
}

/// AWS access key credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    /// Access key id.
    pub access_key_id: String,

    /// Secret access key.
    pub secret_access_key: String,

    /// Session token for temporary credentials.
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Environment variable holding the access key id.
    pub const ACCESS_KEY_ID_VAR: &'static str = "AWS_ACCESS_KEY_ID";

    /// Environment variable holding the secret access key.
    pub const SECRET_ACCESS_KEY_VAR: &'static str = "AWS_SECRET_ACCESS_KEY";

    /// Environment variable holding the session token.
    pub const SESSION_TOKEN_VAR: &'static str = "AWS_SESSION_TOKEN";

    /// Creates long-term credentials.
    #[must_use]
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Attaches a session token.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Reads credentials from the standard AWS environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the access key id or secret is unset or empty.
    pub fn from_env() -> Result<Self, RegistryError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads credentials through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Returns an error if the access key id or secret is missing or empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagprune_registry::AwsCredentials;
    ///
    /// let creds = AwsCredentials::from_lookup(|name| match name {
    ///     "AWS_ACCESS_KEY_ID" => Some("AKID".to_string()),
    ///     "AWS_SECRET_ACCESS_KEY" => Some("secret".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(creds.access_key_id, "AKID");
    /// assert!(creds.session_token.is_none());
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RegistryError> {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| RegistryError::MissingCredentials {
                    variable: name.to_string(),
                })
        };

        Ok(Self {
            access_key_id: required(Self::ACCESS_KEY_ID_VAR)?,
            secret_access_key: required(Self::SECRET_ACCESS_KEY_VAR)?,
            session_token: lookup(Self::SESSION_TOKEN_VAR).filter(|value| !value.is_empty()),
        })
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
