// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Loading of the per-user credential file (`~/.seshrc`).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use super::utils::{expand_tilde, home_dir};

const CREDENTIALS_FILE_NAME: &str = ".seshrc";

#[derive(Deserialize, Default)]
struct RawCredentials {
    #[serde(rename = "User", default)]
    user: String,
    #[serde(rename = "Keyfile", default)]
    keyfile: String,
    #[serde(rename = "Password", default)]
    password: String,
}

/// Defaults read from the credential file. Empty fields count as unset.
#[derive(Clone, Default)]
pub struct Credentials {
    pub user: Option<String>,
    pub key_file: Option<PathBuf>,
    pub password: Option<Zeroizing<String>>,
}

impl Credentials {
    /// `~/.seshrc`, when a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(CREDENTIALS_FILE_NAME))
    }

    /// Load credentials from `path`. A missing file yields empty defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);
        if !expanded_path.exists() {
            tracing::debug!(
                "Credential file not found at {:?}, using defaults",
                expanded_path
            );
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(&expanded_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to read credential file at {}",
                    expanded_path.display()
                )
            })?;
        Self::parse(&content).with_context(|| {
            format!(
                "Failed to parse credential file at {}. Expected JSON with User, Keyfile and Password fields.",
                expanded_path.display()
            )
        })
    }

    /// Load from [`Credentials::default_path`], if any.
    pub async fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path).await,
            None => Ok(Self::default()),
        }
    }

    fn parse(content: &str) -> Result<Self> {
        let raw: RawCredentials = serde_json::from_str(content)?;
        let RawCredentials {
            user,
            keyfile,
            password,
        } = raw;
        Ok(Self {
            user: non_empty(user),
            key_file: non_empty(keyfile).map(|k| expand_tilde(Path::new(&k))),
            password: non_empty(password).map(Zeroizing::new),
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("key_file", &self.key_file)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full() {
        let creds = Credentials::parse(
            r#"{"User": "deploy", "Keyfile": "/keys/id_ed25519", "Password": "s3cret"}"#,
        )
        .unwrap();
        assert_eq!(creds.user.as_deref(), Some("deploy"));
        assert_eq!(creds.key_file, Some(PathBuf::from("/keys/id_ed25519")));
        assert_eq!(creds.password.as_deref().map(String::as_str), Some("s3cret"));
    }

    #[test]
    fn test_parse_partial_and_empty_fields() {
        let creds = Credentials::parse(r#"{"User": "ops", "Password": ""}"#).unwrap();
        assert_eq!(creds.user.as_deref(), Some("ops"));
        assert!(creds.key_file.is_none());
        assert!(creds.password.is_none());
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(Credentials::parse("User = deploy").is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_default() {
        let creds = Credentials::load(Path::new("/nonexistent/.seshrc"))
            .await
            .unwrap();
        assert!(creds.user.is_none());
        assert!(creds.password.is_none());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"User": "admin"}}"#).unwrap();

        let creds = Credentials::load(file.path()).await.unwrap();
        assert_eq!(creds.user.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_load_malformed_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Credentials::load(file.path()).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse credential file"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials {
            password: Some(Zeroizing::new("s3cret".to_string())),
            ..Default::default()
        };
        assert!(!format!("{creds:?}").contains("s3cret"));
    }
}
