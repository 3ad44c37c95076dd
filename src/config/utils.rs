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

//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Expand tilde (~) in path to home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if path_str == "~" || path_str.starts_with("~/") {
            if let Some(home) = home_dir() {
                return PathBuf::from(path_str.replacen('~', &home.to_string_lossy(), 1));
            }
        }
    }
    path.to_path_buf()
}

/// Current user's home directory.
pub(crate) fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()))
}

/// Get current username from environment.
pub fn get_current_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "root".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_expand_tilde() {
        let original = std::env::var_os("HOME");
        std::env::set_var("HOME", "/home/tester");

        assert_eq!(
            expand_tilde(Path::new("~/.ssh/id_ed25519")),
            PathBuf::from("/home/tester/.ssh/id_ed25519")
        );
        assert_eq!(expand_tilde(Path::new("~")), PathBuf::from("/home/tester"));
        assert_eq!(
            expand_tilde(Path::new("/etc/hosts")),
            PathBuf::from("/etc/hosts")
        );
        assert_eq!(
            expand_tilde(Path::new("~other/file")),
            PathBuf::from("~other/file")
        );

        match original {
            Some(home) => std::env::set_var("HOME", home),
            None => std::env::remove_var("HOME"),
        }
    }

    #[test]
    #[serial]
    fn test_current_username_from_env() {
        let original = std::env::var_os("USER");
        std::env::set_var("USER", "alice");
        assert_eq!(get_current_username(), "alice");
        match original {
            Some(user) => std::env::set_var("USER", user),
            None => std::env::remove_var("USER"),
        }
    }
}
