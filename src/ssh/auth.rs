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

//! Authentication method selection and the russh authentication exchange.

use russh::client::{Handle, Handler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroizing;

use super::error::SshError;
use crate::host::Host;

/// An authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Password(Zeroizing<String>),
    PrivateKeyFile {
        key_file_path: PathBuf,
        key_pass: Option<Zeroizing<String>>,
    },
    #[cfg(not(target_os = "windows"))]
    Agent,
}

impl AuthMethod {
    pub fn with_password(password: &str) -> Self {
        Self::Password(Zeroizing::new(password.to_string()))
    }

    pub fn with_key_file<T: AsRef<Path>>(key_file_path: T, passphrase: Option<&str>) -> Self {
        Self::PrivateKeyFile {
            key_file_path: key_file_path.as_ref().to_path_buf(),
            key_pass: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }
}

/// Authentication methods to try for `host`, in order.
///
/// 1. The configured key file, with the password as its passphrase
/// 2. The password
/// 3. The SSH agent, when `SSH_AUTH_SOCK` is set
/// 4. Default key locations (`~/.ssh/id_ed25519`, `~/.ssh/id_rsa`, ...)
pub fn auth_methods(host: &Host) -> Vec<AuthMethod> {
    let password = host.password.as_ref().map(|p| p.as_str());
    let mut methods = Vec::new();

    if let Some(key_file) = &host.key_file {
        methods.push(AuthMethod::with_key_file(key_file, password));
    }
    if let Some(password) = password {
        methods.push(AuthMethod::with_password(password));
    }

    #[cfg(not(target_os = "windows"))]
    if std::env::var_os("SSH_AUTH_SOCK").is_some() {
        methods.push(AuthMethod::Agent);
    }

    if host.key_file.is_none() {
        if let Some(home) = crate::config::home_dir() {
            let ssh_dir = home.join(".ssh");
            for name in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                let key = ssh_dir.join(name);
                if key.exists() {
                    methods.push(AuthMethod::with_key_file(key, password));
                }
            }
        }
    }

    methods
}

/// Try `methods` in order until one is accepted.
///
/// Returns the error of the last attempt when all of them fail.
pub(super) async fn authenticate_any<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    methods: Vec<AuthMethod>,
) -> Result<(), SshError> {
    let mut last_err = SshError::KeyAuthFailed;
    for method in methods {
        match authenticate(handle, username, method).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::debug!("Authentication attempt for {} failed: {}", username, e);
                last_err = e;
            }
        }
    }
    Err(last_err)
}

/// This takes a handle and performs authentification with the given method.
async fn authenticate<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    auth: AuthMethod,
) -> Result<(), SshError> {
    match auth {
        AuthMethod::Password(password) => {
            let result = handle.authenticate_password(username, &**password).await?;
            if !result.success() {
                return Err(SshError::PasswordWrong);
            }
        }
        AuthMethod::PrivateKeyFile {
            key_file_path,
            key_pass,
        } => {
            let key = russh::keys::load_secret_key(key_file_path, key_pass.as_ref().map(|p| &***p))
                .map_err(SshError::KeyInvalid)?;
            let result = handle
                .authenticate_publickey(
                    username,
                    russh::keys::PrivateKeyWithHashAlg::new(
                        Arc::new(key),
                        handle.best_supported_rsa_hash().await?.flatten(),
                    ),
                )
                .await?;
            if !result.success() {
                return Err(SshError::KeyAuthFailed);
            }
        }
        #[cfg(not(target_os = "windows"))]
        AuthMethod::Agent => {
            let mut agent = russh::keys::agent::client::AgentClient::connect_env()
                .await
                .map_err(|_| SshError::AgentConnectionFailed)?;
            let identities = agent
                .request_identities()
                .await
                .map_err(|_| SshError::AgentConnectionFailed)?;
            if identities.is_empty() {
                return Err(SshError::AgentNoIdentities);
            }

            for identity in identities {
                let result = handle
                    .authenticate_publickey_with(
                        username,
                        identity,
                        handle.best_supported_rsa_hash().await?.flatten(),
                        &mut agent,
                    )
                    .await;
                if matches!(result, Ok(ref r) if r.success()) {
                    return Ok(());
                }
            }
            return Err(SshError::AgentAuthenticationFailed);
        }
    }
    Ok(())
}
