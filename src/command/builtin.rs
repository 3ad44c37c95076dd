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

//! Commands resolved locally before dispatch.

use anyhow::{Context, Result};
use std::path::Path;

/// Command name that installs a public key into `authorized_keys`.
pub const AUTH_CMD: &str = "@auth.cmd";

/// Commands understood by sesh itself rather than the remote shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCommand {
    /// Append a local public key to the remote `~/.ssh/authorized_keys`.
    AuthorizedKey,
}

impl BuiltinCommand {
    /// Recognize a builtin by its command name.
    pub fn parse(cmd: &str) -> Option<Self> {
        match cmd.trim() {
            AUTH_CMD => Some(Self::AuthorizedKey),
            _ => None,
        }
    }

    /// Render the builtin into a remote shell snippet.
    pub async fn render(self, pubkey_file: &Path) -> Result<String> {
        match self {
            Self::AuthorizedKey => {
                let content = tokio::fs::read_to_string(pubkey_file)
                    .await
                    .with_context(|| format!("Failed to read public key {pubkey_file:?}"))?;
                Ok(authorized_key_script(&content))
            }
        }
    }
}

/// Shell snippet that installs `key` unless a key with the same comment is
/// already present.
fn authorized_key_script(key: &str) -> String {
    let key = key.trim();
    // "<type> <base64> <comment>": match on the comment when there is one.
    let name = match key.splitn(3, ' ').collect::<Vec<_>>().as_slice() {
        [_, _, comment] => *comment,
        _ => key,
    };

    format!(
        r#"
[ ! -e ~/.ssh ] && mkdir -p ~/.ssh && chmod 700 ~/.ssh
[ ! -e ~/.ssh/authorized_keys ] && touch ~/.ssh/authorized_keys && chmod 600 ~/.ssh/authorized_keys
grep '{name}' ~/.ssh/authorized_keys >/dev/null || echo '{key}' >> ~/.ssh/authorized_keys
echo 'add public key to ~/.ssh/authorized_keys OK'
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_builtin() {
        assert_eq!(
            BuiltinCommand::parse("@auth.cmd"),
            Some(BuiltinCommand::AuthorizedKey)
        );
        assert_eq!(BuiltinCommand::parse(" @auth.cmd\n"), Some(BuiltinCommand::AuthorizedKey));
        assert_eq!(BuiltinCommand::parse("uptime"), None);
    }

    #[test]
    fn test_script_matches_on_comment() {
        let script = authorized_key_script("ssh-ed25519 AAAAC3Nza alice@laptop\n");
        assert!(script.contains("grep 'alice@laptop' ~/.ssh/authorized_keys"));
        assert!(script.contains("echo 'ssh-ed25519 AAAAC3Nza alice@laptop' >>"));
        assert!(script.contains("chmod 700 ~/.ssh"));
        assert!(script.contains("chmod 600 ~/.ssh/authorized_keys"));
    }

    #[test]
    fn test_script_without_comment_matches_whole_key() {
        let script = authorized_key_script("ssh-rsa AAAAB3Nza");
        assert!(script.contains("grep 'ssh-rsa AAAAB3Nza'"));
    }

    #[tokio::test]
    async fn test_render_reads_key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ssh-ed25519 AAAAC3Nza bob@host").unwrap();

        let script = BuiltinCommand::AuthorizedKey
            .render(file.path())
            .await
            .unwrap();
        assert!(script.contains("bob@host"));
    }

    #[tokio::test]
    async fn test_render_missing_key_file() {
        let result = BuiltinCommand::AuthorizedKey
            .render(Path::new("/nonexistent/id.pub"))
            .await;
        assert!(result.is_err());
    }
}
