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

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use zeroize::Zeroizing;

use sesh::{
    cli::Cli,
    command::BuiltinCommand,
    commands::{
        exec::execute_command,
        interactive::{interact, wants_login},
    },
    config::{expand_tilde, Credentials, RunConfig},
    executor::{OutputSink, RunError},
    host::read_host_file,
    ssh::SshSessionFactory,
    utils::init_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut specs = cli.hosts.clone();
    if let Some(ref host_file) = cli.host_file {
        specs.extend(read_host_file(&expand_tilde(host_file)).await?);
    }
    if specs.is_empty() {
        anyhow::bail!("No hosts given; use -H or -f");
    }

    let cmd = match cli.script {
        Some(ref script) => {
            let path = expand_tilde(script);
            tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read script {path:?}"))?
        }
        None => cli.command_line(),
    };
    let cmd = match BuiltinCommand::parse(&cmd) {
        Some(builtin) => builtin.render(&expand_tilde(&cli.pubkey)).await?,
        None => cmd,
    };

    let password = if cli.password {
        let password = rpassword::prompt_password("Password: ")
            .context("Failed to read password")?;
        Some(Zeroizing::new(password))
    } else {
        None
    };

    let output = match cli.output {
        Some(ref path) => {
            let path = expand_tilde(path);
            OutputSink::create_file(&path)
                .await
                .with_context(|| format!("Failed to create output file {path:?}"))?
        }
        None => OutputSink::stdout(),
    };

    let mut config = RunConfig::new(cmd)
        .with_args(cli.args.clone())
        .with_user(cli.user.clone())
        .with_key_file(cli.identity.as_deref().map(expand_tilde))
        .with_password(password)
        .with_output(output)
        .with_timeouts(
            cli.ready_timeout.map(Duration::from_secs),
            cli.host_timeout.map(Duration::from_secs),
        )
        .with_strict_mode(cli.strict_host_key_checking);
    if let Some(ref tmp_dir) = cli.tmp_dir {
        config = config.with_tmp_root(expand_tilde(tmp_dir));
    }
    config.merge_credentials(&Credentials::load_default().await?);
    tracing::debug!("Run configuration: {:?}", config);

    let hosts = config.resolve_hosts(&specs)?;

    if wants_login(&config, hosts.len()) {
        return interact(&config, &hosts[0]).await;
    }

    let factory = SshSessionFactory::new(config.strict_mode);
    match execute_command(&config, hosts, cli.parallel, &factory).await {
        Ok(summary) => {
            summary.log();
            config.output.flush().await.context("Failed to flush output")?;
            Ok(())
        }
        Err(RunError::Interrupted) => {
            eprintln!("sesh: interrupted");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
