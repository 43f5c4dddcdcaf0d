// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Subprocess launcher backing [`ProcessLauncher`] (spec §4.8 steps 4-6),
//! built on `tokio::process` the way the bootstrap crate's
//! `ShutdownCoordinator` expects callers to structure cancellable work:
//! the child is wrapped in a guard that force-kills it on drop, so
//! racing `launch()` against a cancellation token (via `tokio::select!`)
//! is enough to enforce the two-phase interrupt policy from spec §5
//! scenario 6 without the launcher needing to know about signals itself.

use async_trait::async_trait;
use std::fs::File;
use std::process::Stdio;
use subforge_domain::services::process_launcher::{LaunchOutcome, LaunchSpec, ProcessLauncher};
use subforge_domain::OrchestratorError;
use tokio::process::Child;

/// Kills the wrapped child if it is still running when dropped. This is
/// the "soft-terminate on cancellation" half of spec §5 scenario 6: a
/// `tokio::select!` that races `launch()` against a cancellation token
/// drops this guard, which immediately reaps the subprocess rather than
/// leaving it orphaned.
struct ChildGuard(Option<Child>);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.0.take() {
            if child.try_wait().ok().flatten().is_none() {
                let _ = child.start_kill();
            }
        }
    }
}

pub struct SubprocessLauncher;

impl SubprocessLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Sends a graceful termination request; on Unix this is `SIGTERM`,
    /// on other platforms it falls back to the hard kill (no
    /// soft-terminate signal is portable there).
    #[cfg(unix)]
    fn terminate(pid: u32) {
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }

    #[cfg(not(unix))]
    fn terminate(_pid: u32) {}
}

impl Default for SubprocessLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessLauncher for SubprocessLauncher {
    async fn launch(&self, spec: LaunchSpec) -> Result<LaunchOutcome, OrchestratorError> {
        if let Some(parent) = spec.log_path_parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| OrchestratorError::Io(format!("creating log directory: {e}")))?;
        }

        let log_file = File::create(&spec.log_path())
            .map_err(|e| OrchestratorError::Io(format!("creating stage log file: {e}")))?;
        let log_file_err = log_file
            .try_clone()
            .map_err(|e| OrchestratorError::Io(format!("duplicating log file handle: {e}")))?;

        let mut command = tokio::process::Command::new(&spec.executable);
        command
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(log_file_err));

        let child = command
            .spawn()
            .map_err(|e| OrchestratorError::Io(format!("spawning stage subprocess: {e}")))?;
        let pid = child.id();
        let mut guard = ChildGuard(Some(child));

        let wait_result = tokio::time::timeout(spec.timeout, async {
            guard.0.as_mut().expect("guard holds the child until reaped").wait().await
        })
        .await;

        match wait_result {
            Ok(Ok(status)) => {
                guard.0 = None;
                Ok(LaunchOutcome {
                    exit_code: status.code(),
                    timed_out: false,
                    log_path: spec.log_path(),
                })
            }
            Ok(Err(e)) => Err(OrchestratorError::Io(format!("waiting on stage subprocess: {e}"))),
            Err(_elapsed) => {
                if let Some(pid) = pid {
                    Self::terminate(pid);
                }
                // grace period before the guard's Drop forces a hard kill
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                Ok(LaunchOutcome {
                    exit_code: None,
                    timed_out: true,
                    log_path: spec.log_path(),
                })
            }
        }
    }
}

/// Extension used only by this launcher to keep [`LaunchSpec`] itself
/// free of infrastructure-specific path conventions. Per the trait's
/// contract the log lives under `spec.working_dir` itself (the stage's
/// own directory), not alongside it.
trait LaunchSpecExt {
    fn log_path(&self) -> std::path::PathBuf;
    fn log_path_parent(&self) -> Option<std::path::PathBuf>;
}

impl LaunchSpecExt for LaunchSpec {
    fn log_path(&self) -> std::path::PathBuf {
        self.working_dir.join("stage.log")
    }

    fn log_path_parent(&self) -> Option<std::path::PathBuf> {
        Some(self.working_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_a_trivial_command_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let spec = LaunchSpec {
            executable: "/bin/true".into(),
            args: vec![],
            working_dir: dir.path().join("04_asr"),
            env: BTreeMap::new(),
            timeout: Duration::from_secs(5),
        };
        std::fs::create_dir_all(&spec.working_dir).unwrap();

        let launcher = SubprocessLauncher::new();
        let outcome = launcher.launch(spec).await.unwrap();
        assert_eq!(outcome.exit_code, Some(0));
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn reports_timeout_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let spec = LaunchSpec {
            executable: "/bin/sleep".into(),
            args: vec!["30".to_string()],
            working_dir: dir.path().join("04_asr"),
            env: BTreeMap::new(),
            timeout: Duration::from_millis(50),
        };
        std::fs::create_dir_all(&spec.working_dir).unwrap();

        let launcher = SubprocessLauncher::new();
        let outcome = launcher.launch(spec).await.unwrap();
        assert!(outcome.timed_out);
    }
}
