//! Post-install smoke test.
//!
//! The installed binary is run as `<binary> version`. Only the exit status
//! matters; output is logged at debug level and otherwise ignored.

use log::{debug, warn};
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Argument passed to the installed binary
pub const SMOKE_TEST_ARG: &str = "version";

/// Default bound on the smoke test invocation
pub const DEFAULT_SMOKE_TEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmokeTestResult {
    /// `None` when the process could not be started, was killed by a
    /// signal, or timed out
    pub exit_code: Option<i32>,
    pub passed: bool,
    pub timed_out: bool,
}

impl SmokeTestResult {
    fn exited(exit_code: Option<i32>) -> Self {
        Self {
            exit_code,
            passed: exit_code == Some(0),
            timed_out: false,
        }
    }

    fn timed_out() -> Self {
        Self {
            exit_code: None,
            passed: false,
            timed_out: true,
        }
    }

    /// Short description for error messages, e.g. "exited with status 1"
    pub fn describe(&self) -> String {
        match (self.timed_out, self.exit_code) {
            (true, _) => "timed out".to_string(),
            (false, Some(code)) => format!("exited with status {}", code),
            (false, None) => "did not run to completion".to_string(),
        }
    }
}

/// Run `binary version` with no stdin, bounded by `timeout`.
#[tracing::instrument]
pub async fn smoke_test(binary: &Path, timeout: Duration) -> SmokeTestResult {
    let child = Command::new(binary)
        .arg(SMOKE_TEST_ARG)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to start {:?}: {}", binary, e);
            return SmokeTestResult::exited(None);
        }
    };

    // Dropping the wait future on timeout kills the child
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            debug!(
                "{:?} {} stdout: {}",
                binary,
                SMOKE_TEST_ARG,
                String::from_utf8_lossy(&output.stdout).trim()
            );
            if !output.stderr.is_empty() {
                debug!(
                    "{:?} {} stderr: {}",
                    binary,
                    SMOKE_TEST_ARG,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            SmokeTestResult::exited(output.status.code())
        }
        Ok(Err(e)) => {
            warn!("Failed to wait for {:?}: {}", binary, e);
            SmokeTestResult::exited(None)
        }
        Err(_) => {
            warn!("{:?} {} did not finish within {:?}", binary, SMOKE_TEST_ARG, timeout);
            SmokeTestResult::timed_out()
        }
    }
}
