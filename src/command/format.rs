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

use chrono::Utc;

/// Placeholder in the argument string that receives the uploaded script path.
const SCRIPT_PLACEHOLDER: &str = "{}";

/// Remote directory the uploaded script is written to.
const REMOTE_SCRIPT_PREFIX: &str = "/tmp/sesh-";

/// Per-invocation names used when a script has to be wrapped.
///
/// The heredoc delimiter must not occur inside the script body, so it is
/// derived from the current time rather than being a fixed marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStamp {
    pub delimiter: String,
    pub temp_path: String,
}

impl ScriptStamp {
    /// Stamp derived from the current wall clock.
    pub fn now() -> Self {
        let now = Utc::now();
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| i64::from(now.timestamp_subsec_nanos()));
        Self {
            delimiter: format!("E{}OF", now.timestamp_millis()),
            temp_path: format!("{REMOTE_SCRIPT_PREFIX}{nanos}"),
        }
    }
}

/// Format `cmd` for remote execution, optionally running it as a script.
///
/// - With empty `args`, a `#!` script is piped through a heredoc into its
///   interpreter; anything else is returned unchanged.
/// - With non-empty `args`, `cmd` is uploaded to a temporary file, made
///   executable, and `args` is run with the first `{}` replaced by that path
///   (or with the path prepended when there is no `{}`). The file is removed
///   whatever the exit status.
pub fn format_command(cmd: &str, args: &str) -> String {
    format_command_with(cmd, args, &ScriptStamp::now())
}

/// Same as [`format_command`] with explicit delimiter and temp path.
pub fn format_command_with(cmd: &str, args: &str, stamp: &ScriptStamp) -> String {
    let ScriptStamp {
        delimiter,
        temp_path,
    } = stamp;

    if !args.is_empty() {
        // Only the first placeholder is substituted.
        let args = if args.contains(SCRIPT_PLACEHOLDER) {
            args.replacen(SCRIPT_PLACEHOLDER, temp_path, 1)
        } else {
            format!("{temp_path} {args}")
        };
        return format!(
            "(cat > {temp_path}  <<\\{delimiter}\n{cmd}\n{delimiter}\n) && chmod +x {temp_path} && ({args}) ; rm -f {temp_path}"
        );
    }

    match shebang_interpreter(cmd) {
        Some(interpreter) => {
            format!("(cat <<\\{delimiter}\n{cmd}\n{delimiter}\n) |{interpreter}")
        }
        None => cmd.to_string(),
    }
}

/// Interpreter named on the first line of a `#!` script.
fn shebang_interpreter(cmd: &str) -> Option<&str> {
    let rest = cmd.strip_prefix("#!")?;
    let line = rest.split('\n').next().unwrap_or_default();
    Some(line.trim_end_matches('\r'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp() -> ScriptStamp {
        ScriptStamp {
            delimiter: "E1700000000000OF".to_string(),
            temp_path: "/tmp/sesh-42".to_string(),
        }
    }

    #[test]
    fn test_plain_command_unchanged() {
        assert_eq!(format_command("uptime", ""), "uptime");
        assert_eq!(format_command("ls -la | wc -l", ""), "ls -la | wc -l");
    }

    #[test]
    fn test_empty_command_is_noop() {
        assert_eq!(format_command("", ""), "");
    }

    #[test]
    fn test_shebang_script_piped_to_interpreter() {
        let script = "#!/usr/bin/env python3\nprint('hi')";
        let formatted = format_command_with(script, "", &stamp());
        assert_eq!(
            formatted,
            "(cat <<\\E1700000000000OF\n#!/usr/bin/env python3\nprint('hi')\nE1700000000000OF\n) |/usr/bin/env python3"
        );
    }

    #[test]
    fn test_shebang_only_line() {
        let formatted = format_command_with("#!/bin/sh", "", &stamp());
        assert!(formatted.ends_with(") |/bin/sh"));
    }

    #[test]
    fn test_args_placeholder_substituted() {
        let formatted = format_command_with("echo hello", "bash {} foo", &stamp());
        assert_eq!(
            formatted,
            "(cat > /tmp/sesh-42  <<\\E1700000000000OF\necho hello\nE1700000000000OF\n) && chmod +x /tmp/sesh-42 && (bash /tmp/sesh-42 foo) ; rm -f /tmp/sesh-42"
        );
        assert!(!formatted.contains("{}"));
    }

    #[test]
    fn test_args_without_placeholder_prepend_path() {
        let formatted = format_command_with("echo hello", "arg1 arg2", &stamp());
        assert!(formatted.contains("&& (/tmp/sesh-42 arg1 arg2) ;"));
    }

    #[test]
    fn test_only_first_placeholder_substituted() {
        let formatted = format_command_with("echo hi", "bash {} {}", &stamp());
        assert!(formatted.contains("(bash /tmp/sesh-42 {})"));
        assert_eq!(formatted.matches("{}").count(), 1);
    }

    #[test]
    fn test_generated_stamp_shapes() {
        let stamp = ScriptStamp::now();
        assert!(stamp.delimiter.starts_with('E'));
        assert!(stamp.delimiter.ends_with("OF"));
        assert!(stamp.temp_path.starts_with(REMOTE_SCRIPT_PREFIX));

        let formatted = format_command("echo hi", "bash {} foo");
        let rm = format!("rm -f {}", extract_temp_path(&formatted));
        assert!(formatted.ends_with(&rm));
    }

    fn extract_temp_path(formatted: &str) -> &str {
        let start = formatted.find(REMOTE_SCRIPT_PREFIX).unwrap();
        let end = formatted[start..].find(' ').unwrap() + start;
        &formatted[start..end]
    }
}
