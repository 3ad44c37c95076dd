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

mod common;

use common::*;
use sesh::executor::{ParallelExecutor, RunError};
use sesh::manager::HostOutcome;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

#[tokio::test]
async fn test_output_merged_in_host_order() {
    let out_dir = tempfile::tempdir().unwrap();
    let tmp_root = tempfile::tempdir().unwrap();
    let (sink, path) = file_output(out_dir.path()).await;
    // Completion order is the reverse of host order.
    let factory = ScriptedFactory::new([
        ("alpha", run_after(200, "alpha line\n")),
        ("beta", run_after(100, "beta line\n")),
        ("gamma", run("gamma line\n")),
    ]);

    let summary = ParallelExecutor::new(
        hosts(&["alpha", "beta", "gamma"]),
        "uptime",
        sink.clone(),
        tmp_root.path(),
    )
    .run(&factory, CancellationToken::new())
    .await
    .unwrap();

    let timeline = &factory.timeline;
    assert!(timeline.position("gamma:end") < timeline.position("alpha:end"));
    assert_eq!(summary.success_count(), 3);

    let output = read_output(&sink, &path).await;
    assert_eq!(
        output,
        format!(
            "{}alpha line\n{}beta line\n{}gamma line\n",
            banner("alpha"),
            banner("beta"),
            banner("gamma")
        )
    );
}

#[tokio::test]
async fn test_scratch_directory_removed_after_run() {
    let out_dir = tempfile::tempdir().unwrap();
    let tmp_root = tempfile::tempdir().unwrap();
    let (sink, _path) = file_output(out_dir.path()).await;
    let factory = ScriptedFactory::new([("web1", run("a\n")), ("web2", run("b\n"))]);

    ParallelExecutor::new(hosts(&["web1", "web2"]), "true", sink, tmp_root.path())
        .run(&factory, CancellationToken::new())
        .await
        .unwrap();

    assert!(is_empty_dir(tmp_root.path()));
}

#[tokio::test]
async fn test_interrupt_discards_output_and_scratch() {
    let out_dir = tempfile::tempdir().unwrap();
    let tmp_root = tempfile::tempdir().unwrap();
    let (sink, path) = file_output(out_dir.path()).await;
    let factory = ScriptedFactory::new([("web1", run("done\n")), ("stuck", Script::Hang)]);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = ParallelExecutor::new(hosts(&["web1", "stuck"]), "true", sink.clone(), tmp_root.path())
        .run(&factory, cancel)
        .await;

    assert!(matches!(result, Err(RunError::Interrupted)));
    assert!(is_empty_dir(tmp_root.path()));
    assert_eq!(read_output(&sink, &path).await, "");
}

#[tokio::test]
async fn test_host_without_end_blocks_the_run() {
    let out_dir = tempfile::tempdir().unwrap();
    let tmp_root = tempfile::tempdir().unwrap();
    let (sink, _path) = file_output(out_dir.path()).await;
    let factory = ScriptedFactory::new([("web1", run("done\n")), ("stuck", Script::Hang)]);

    let executor =
        ParallelExecutor::new(hosts(&["web1", "stuck"]), "true", sink, tmp_root.path());
    let waited = tokio::time::timeout(
        Duration::from_millis(300),
        executor.run(&factory, CancellationToken::new()),
    )
    .await;

    assert!(waited.is_err(), "run returned although a host never ended");
    // Dropping the run still cleans up its scratch directory.
    assert!(is_empty_dir(tmp_root.path()));
}

#[tokio::test]
async fn test_host_timeout_unblocks_the_run() {
    let out_dir = tempfile::tempdir().unwrap();
    let tmp_root = tempfile::tempdir().unwrap();
    let (sink, path) = file_output(out_dir.path()).await;
    let factory = ScriptedFactory::new([("stuck", Script::Hang), ("web1", run("done\n"))]);

    let summary = ParallelExecutor::new(
        hosts(&["stuck", "web1"]),
        "true",
        sink.clone(),
        tmp_root.path(),
    )
    .with_host_timeout(Some(Duration::from_millis(150)))
    .run(&factory, CancellationToken::new())
    .await
    .unwrap();

    assert!(matches!(
        summary.outcome("stuck"),
        Some(HostOutcome::Failed { reason }) if reason.contains("timed out")
    ));
    assert!(summary.outcome("web1").unwrap().is_success());

    let output = read_output(&sink, &path).await;
    assert!(output.starts_with(&banner("stuck")));
    assert!(output.contains("stuck timed out"));
    assert!(output.ends_with(&format!("{}done\n", banner("web1"))));
    assert!(is_empty_dir(tmp_root.path()));
}

#[tokio::test]
async fn test_missing_end_is_synthesized() {
    let out_dir = tempfile::tempdir().unwrap();
    let tmp_root = tempfile::tempdir().unwrap();
    let (sink, _path) = file_output(out_dir.path()).await;
    let factory = ScriptedFactory::new([("flaky", Script::ForgetEnd), ("web1", run("ok\n"))]);

    let summary = ParallelExecutor::new(hosts(&["flaky", "web1"]), "true", sink, tmp_root.path())
        .run(&factory, CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(
        summary.outcome("flaky"),
        Some(HostOutcome::Failed { .. })
    ));
    assert_eq!(summary.success_count(), 1);
}

#[tokio::test]
async fn test_duplicate_hosts_rejected_before_setup() {
    let out_dir = tempfile::tempdir().unwrap();
    let tmp_root = tempfile::tempdir().unwrap();
    let (sink, _path) = file_output(out_dir.path()).await;
    let factory = ScriptedFactory::new([("web1", run("x\n"))]);

    let result = ParallelExecutor::new(hosts(&["web1", "web1"]), "true", sink, tmp_root.path())
        .run(&factory, CancellationToken::new())
        .await;

    assert!(matches!(result, Err(RunError::DuplicateHost(..))));
    assert!(is_empty_dir(tmp_root.path()));
}

#[tokio::test]
async fn test_missing_tmp_root_is_a_setup_error() {
    let out_dir = tempfile::tempdir().unwrap();
    let (sink, _path) = file_output(out_dir.path()).await;
    let factory = ScriptedFactory::new([("web1", run("x\n"))]);

    let result = ParallelExecutor::new(
        hosts(&["web1"]),
        "true",
        sink,
        out_dir.path().join("does-not-exist"),
    )
    .run(&factory, CancellationToken::new())
    .await;

    assert!(matches!(result, Err(RunError::Scratch { .. })));
}
