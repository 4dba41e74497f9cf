use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{InstalledArtifact, install};
use crate::archive::ArchiveExtractor;
use crate::checksum;
use crate::cleanup::{CleanupGuard, SharedCleanupContext, new_shared};
use crate::config::InstallerConfig;
use crate::download::{ArtifactSource, fetch};
use crate::error::InstallError;
use crate::release::ReleaseTarget;
use crate::runtime::Runtime;
use crate::smoke::{SmokeTestResult, smoke_test};

/// Progress of one run. Failures jump straight to [`RunOutcome::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Start,
    Resolved,
    Fetched,
    Verified,
    Installed,
    Tested,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Start => "start",
            RunState::Resolved => "resolved",
            RunState::Fetched => "fetched",
            RunState::Verified => "verified",
            RunState::Installed => "installed",
            RunState::Tested => "tested",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub target: ReleaseTarget,
    pub artifact: InstalledArtifact,
    /// `None` when the smoke test was skipped
    pub smoke_test: Option<SmokeTestResult>,
}

#[derive(Debug)]
pub enum RunOutcome {
    Success(InstallReport),
    Failed {
        /// Last state reached before the failing step
        state: RunState,
        error: InstallError,
    },
}

impl RunOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Success(_) => 0,
            RunOutcome::Failed { error, .. } => error.exit_code(),
        }
    }

    pub fn into_result(self) -> Result<InstallReport, InstallError> {
        match self {
            RunOutcome::Success(report) => Ok(report),
            RunOutcome::Failed { error, .. } => Err(error),
        }
    }
}

/// Runs `resolve -> fetch -> verify -> install -> smoke test` in order.
pub struct Installer<R: Runtime, S: ArtifactSource, E: ArchiveExtractor> {
    pub runtime: R,
    pub source: S,
    pub extractor: E,
    cleanup_ctx: SharedCleanupContext,
    work_dir: PathBuf,
}

static RUN_COUNTER: AtomicUsize = AtomicUsize::new(0);

impl<R: Runtime + 'static, S: ArtifactSource, E: ArchiveExtractor> Installer<R, S, E> {
    #[tracing::instrument(skip(runtime, source, extractor))]
    pub fn new(runtime: R, source: S, extractor: E) -> Self {
        let work_dir = runtime.temp_dir().join(format!(
            "scorex-installer-{}-{}",
            std::process::id(),
            RUN_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        Self {
            runtime,
            source,
            extractor,
            cleanup_ctx: new_shared(),
            work_dir,
        }
    }

    /// Paths to remove if the run is interrupted
    pub fn cleanup_context(&self) -> SharedCleanupContext {
        Arc::clone(&self.cleanup_ctx)
    }

    #[tracing::instrument(
        skip(self, config),
        fields(platform = %config.platform, version = %config.version)
    )]
    pub async fn run(&self, config: &InstallerConfig) -> RunOutcome {
        let mut state = RunState::Start;
        match self.run_steps(config, &mut state).await {
            Ok(report) => RunOutcome::Success(report),
            Err(error) => {
                debug!("Run failed after state {}: {}", state, error);
                RunOutcome::Failed { state, error }
            }
        }
    }

    async fn run_steps(
        &self,
        config: &InstallerConfig,
        state: &mut RunState,
    ) -> Result<InstallReport, InstallError> {
        println!("   resolving scorex {} for {}", config.version, config.platform);
        let target = config.resolve_target()?;
        *state = RunState::Resolved;
        info!("Resolved {}", target.url);

        // Refuse placeholder digests before downloading anything
        let expected = checksum::normalize_digest(&target.expected_checksum)?;

        let work_dir = self.work_dir.clone();
        let work_guard = CleanupGuard::new(self.cleanup_context(), work_dir.clone());
        let result = self
            .fetch_verify_install(config, &target, &expected, &work_dir, state)
            .await;

        if self.runtime.exists(&work_dir)
            && let Err(e) = self.runtime.remove_dir_all(&work_dir)
        {
            warn!("Failed to remove {:?}: {}", work_dir, e);
        }
        work_guard.success();

        let artifact = result?;
        println!("   installed {}", artifact.dest_path.display());

        let Some(timeout) = config.smoke_test_timeout else {
            info!("Smoke test skipped");
            return Ok(InstallReport {
                target,
                artifact,
                smoke_test: None,
            });
        };

        println!("   testing {} version", artifact.dest_path.display());
        let result = smoke_test(&artifact.dest_path, timeout).await;
        *state = RunState::Tested;

        // A failed smoke test leaves the binary installed
        if !result.passed {
            return Err(InstallError::SmokeTestFailure {
                binary: artifact.dest_path.clone(),
                outcome: result.describe(),
            });
        }

        Ok(InstallReport {
            target,
            artifact,
            smoke_test: Some(result),
        })
    }

    async fn fetch_verify_install(
        &self,
        config: &InstallerConfig,
        target: &ReleaseTarget,
        expected: &str,
        work_dir: &Path,
        state: &mut RunState,
    ) -> Result<InstalledArtifact, InstallError> {
        println!("   downloading {}", target.asset_name);
        let archive = fetch(
            &self.runtime,
            &self.source,
            target,
            work_dir,
            config.download_timeout,
        )
        .await?;
        *state = RunState::Fetched;

        checksum::verify(&self.runtime, &archive, expected)?;
        *state = RunState::Verified;

        let artifact = install(
            &self.runtime,
            &self.extractor,
            &archive,
            &target.archive_entry,
            &config.dest_path(),
            self.cleanup_context(),
        )?;
        *state = RunState::Installed;
        Ok(artifact)
    }

    /// Scratch directory for the downloaded archive, removed after each run
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}
