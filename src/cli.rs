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

use clap::Parser;
use std::path::PathBuf;

use crate::ssh::StrictHostKeyChecking;

#[derive(Parser, Debug)]
#[command(
    name = "sesh",
    version,
    about = "Dispatch one shell command or script to many hosts over SSH",
    long_about = "sesh runs the same command or script on a list of hosts over SSH.\nHosts run one after another by default, streaming their output with a banner per host.\nWith --parallel all hosts run at once and their output is merged in host-list order.\nWith a single host and no command, sesh opens an interactive login shell.",
    after_help = "EXAMPLES:\n  Run on two hosts:            sesh -H \"web1,root@db1:2222\" uptime\n  Run in parallel from a file:  sesh -P -f hosts.txt \"df -h\"\n  Run a local script:           sesh -H web1 -s deploy.sh -a \"bash {} --quick\"\n  Install your public key:      sesh -H web1 @auth.cmd\n  Log in interactively:         sesh -H web1"
)]
pub struct Cli {
    #[arg(
        short = 'H',
        long,
        value_delimiter = ',',
        help = "Comma-separated list of hosts in [user@]hostname[:port] format"
    )]
    pub hosts: Vec<String>,

    #[arg(
        short = 'f',
        long = "hostfile",
        help = "File with one host per line; '#' starts a comment"
    )]
    pub host_file: Option<PathBuf>,

    #[arg(short = 'u', long, help = "Default username for SSH connections")]
    pub user: Option<String>,

    #[arg(
        short = 'i',
        long,
        help = "SSH private key file path\nFalls back to the credential file, the SSH agent and ~/.ssh/id_* keys"
    )]
    pub identity: Option<PathBuf>,

    #[arg(
        long,
        help = "Prompt for the password (also used as key passphrase)"
    )]
    pub password: bool,

    #[arg(
        short = 'a',
        long,
        default_value = "",
        help = "Run the command as a script with these arguments; '{}' is replaced by the script path"
    )]
    pub args: String,

    #[arg(short = 's', long, help = "Read the script body from this file")]
    pub script: Option<PathBuf>,

    #[arg(short = 'P', long, help = "Run all hosts at once")]
    pub parallel: bool,

    #[arg(short = 'o', long, help = "Write host output to this file instead of stdout")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Parent directory for parallel scratch files [default: system temp]")]
    pub tmp_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SECS",
        help = "Serial mode: skip a host that has not connected within this many seconds"
    )]
    pub ready_timeout: Option<u64>,

    #[arg(
        long,
        value_name = "SECS",
        help = "Abandon a host whose session runs longer than this many seconds"
    )]
    pub host_timeout: Option<u64>,

    #[arg(
        long,
        default_value = "accept-new",
        help = "Host key checking mode (yes/no/accept-new)\n  yes        - Strict checking against known_hosts\n  no         - Accept all host keys (insecure, testing only)\n  accept-new - Accept new hosts, reject changed keys"
    )]
    pub strict_host_key_checking: StrictHostKeyChecking,

    #[arg(
        long,
        default_value = "~/.ssh/id_rsa.pub",
        help = "Public key installed by @auth.cmd"
    )]
    pub pubkey: PathBuf,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    #[arg(trailing_var_arg = true, help = "Command to execute on remote hosts")]
    pub command: Vec<String>,
}

impl Cli {
    /// The command line joined back into one shell command.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}
