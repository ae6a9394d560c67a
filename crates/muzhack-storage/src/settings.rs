//! Storage settings.
//!
//! Resolved once at startup: from `settings.json` when the file exists,
//! otherwise from environment variables with the same names.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::error::{StorageError, StorageResult};

/// Default settings file, relative to the service's working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

const KEY_ENDPOINT_URL: &str = "STORAGE_ENDPOINT_URL";
const KEY_ACCESS_KEY_ID: &str = "STORAGE_ACCESS_KEY_ID";
const KEY_SECRET_ACCESS_KEY: &str = "STORAGE_SECRET_ACCESS_KEY";
const KEY_BUCKET: &str = "STORAGE_BUCKET";
const KEY_REGION: &str = "STORAGE_REGION";
const KEY_PUBLIC_BASE_URL: &str = "STORAGE_PUBLIC_BASE_URL";
const KEY_PUBLIC_ACL: &str = "STORAGE_PUBLIC_ACL";

/// Keys taken from the settings source; anything else is ignored.
pub const SETTINGS_KEYS: [&str; 7] = [
    KEY_ENDPOINT_URL,
    KEY_ACCESS_KEY_ID,
    KEY_SECRET_ACCESS_KEY,
    KEY_BUCKET,
    KEY_REGION,
    KEY_PUBLIC_BASE_URL,
    KEY_PUBLIC_ACL,
];

/// Credentials and location of the artifact store.
#[derive(Clone)]
pub struct StorageSettings {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket: String,
    /// Region ("auto" for stores without regions)
    pub region: String,
    /// Base of public object URLs; defaults to `{endpoint_url}/{bucket}`
    pub public_base_url: Option<String>,
    /// Whether `make_public` sets a public-read ACL
    pub set_public_acl: bool,
}

impl std::fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSettings")
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("public_base_url", &self.public_base_url)
            .field("set_public_acl", &self.set_public_acl)
            .finish()
    }
}

impl StorageSettings {
    /// Load from `path` if it exists, otherwise from the environment.
    pub fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            info!("Loading storage settings from {}", path.display());
            Self::from_file(path)
        } else {
            info!("Loading storage settings from environment");
            Self::from_env()
        }
    }

    /// Load from a JSON settings file.
    pub fn from_file(path: impl AsRef<Path>) -> StorageResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let json: HashMap<String, Value> = serde_json::from_str(&raw)?;

        let values: HashMap<String, String> = SETTINGS_KEYS
            .iter()
            .filter_map(|key| {
                let value = match json.get(*key)? {
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some((key.to_string(), value))
            })
            .collect();

        Self::from_map(&values)
    }

    /// Load from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let values: HashMap<String, String> = SETTINGS_KEYS
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
            .collect();

        Self::from_map(&values)
    }

    fn from_map(values: &HashMap<String, String>) -> StorageResult<Self> {
        let required = |key: &str| {
            values
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| StorageError::config_error(format!("{} not set", key)))
        };

        Ok(Self {
            endpoint_url: required(KEY_ENDPOINT_URL)?,
            access_key_id: required(KEY_ACCESS_KEY_ID)?,
            secret_access_key: required(KEY_SECRET_ACCESS_KEY)?,
            bucket: required(KEY_BUCKET)?,
            region: values
                .get(KEY_REGION)
                .cloned()
                .unwrap_or_else(|| "auto".to_string()),
            public_base_url: values.get(KEY_PUBLIC_BASE_URL).filter(|v| !v.is_empty()).cloned(),
            set_public_acl: values
                .get(KEY_PUBLIC_ACL)
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        })
    }

    /// Base URL that object keys are appended to.
    pub fn public_base(&self) -> String {
        match &self.public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("{}/{}", self.endpoint_url.trim_end_matches('/'), self.bucket),
        }
    }

    /// Public URL of `key`.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base(), key.trim_start_matches('/'))
    }
}
