// src/restore.rs

//! Package restore
//!
//! Restore reconciles the reference manifest against the local repository:
//! every declared reference whose exact version is not installed gets
//! installed from source, without dependency walking (the manifest already
//! lists the full closure) and with prerelease versions allowed (a declared
//! reference is explicit intent).
//!
//! Per-reference failures are collected, never aborting the sweep, and the
//! missing check always re-runs after a restore attempt, success or
//! failure. `spawn_restore` runs the sweep on a worker thread and delivers
//! the manager plus the summary back over a channel to whichever context
//! issued the request.

use crate::manager::PackageManager;
use crate::repository::PackageReference;
use std::sync::mpsc;
use std::thread;
use tracing::{info, warn};

/// Outcome of one restore sweep
#[derive(Debug, Default)]
pub struct RestoreSummary {
    /// References that were missing when the sweep started
    pub attempted: usize,
    /// References installed by this sweep
    pub installed: Vec<PackageReference>,
    /// References that failed to install, with the failure rendered
    pub failed: Vec<(PackageReference, String)>,
    /// References still missing after the sweep (the re-run check)
    pub missing_after: Vec<PackageReference>,
    /// Failures of the missing check itself
    pub errors: Vec<String>,
}

impl RestoreSummary {
    /// True when everything declared is now installed
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.missing_after.is_empty() && self.errors.is_empty()
    }
}

/// References declared in the local manifest but not installed
///
/// A local repository without reference tracking has nothing to restore.
pub fn missing_references(
    manager: &mut PackageManager,
) -> crate::error::Result<Vec<PackageReference>> {
    let local = manager.local_repository_mut();
    let Some(tracking) = local.reference_tracking() else {
        return Ok(Vec::new());
    };
    let references = tracking.references()?;

    let mut missing = Vec::new();
    for reference in references {
        if !local.exists(&reference.id, Some(&reference.version))? {
            missing.push(reference);
        }
    }
    Ok(missing)
}

/// Install every missing reference, collecting failures
pub fn restore_missing(manager: &mut PackageManager) -> RestoreSummary {
    let mut summary = RestoreSummary::default();

    match missing_references(manager) {
        Ok(missing) => {
            summary.attempted = missing.len();
            for reference in missing {
                // Exact version, no dependency walk, prerelease allowed:
                // the manifest is the authority on what to put back
                match manager.install_package(&reference.id, Some(&reference.version), true, true)
                {
                    Ok(()) => summary.installed.push(reference),
                    Err(e) => {
                        warn!("failed to restore {} {}: {}", reference.id, reference.version, e);
                        summary.failed.push((reference, e.to_string()));
                    }
                }
            }
        }
        Err(e) => {
            warn!("could not determine missing packages: {}", e);
            summary.errors.push(e.to_string());
        }
    }

    // The missing check re-runs regardless of how the sweep went
    match missing_references(manager) {
        Ok(missing) => summary.missing_after = missing,
        Err(e) => {
            warn!("missing-package re-check failed: {}", e);
            summary.errors.push(e.to_string());
        }
    }

    info!(
        "restore finished: {} attempted, {} installed, {} failed, {} still missing",
        summary.attempted,
        summary.installed.len(),
        summary.failed.len(),
        summary.missing_after.len()
    );
    summary
}

/// Handle to a restore running on a worker thread
pub struct BackgroundRestore {
    receiver: mpsc::Receiver<(PackageManager, RestoreSummary)>,
    handle: thread::JoinHandle<()>,
}

impl BackgroundRestore {
    /// Block until the worker finishes, returning the manager and summary
    pub fn wait(self) -> crate::error::Result<(PackageManager, RestoreSummary)> {
        let result = self.receiver.recv().map_err(|_| {
            crate::error::Error::FileSystem(std::io::Error::other(
                "restore worker terminated before reporting",
            ))
        })?;
        let _ = self.handle.join();
        Ok(result)
    }

    /// Non-blocking poll; `None` while the worker is still running
    pub fn try_wait(&self) -> Option<(PackageManager, RestoreSummary)> {
        self.receiver.try_recv().ok()
    }
}

/// Run a restore sweep on a background worker
///
/// The manager moves into the worker for the duration of the sweep and is
/// handed back through the completion channel, so no lock is needed: the
/// worker is the only writer while the restore runs.
pub fn spawn_restore(mut manager: PackageManager) -> BackgroundRestore {
    let (sender, receiver) = mpsc::channel();
    let handle = thread::spawn(move || {
        let summary = restore_missing(&mut manager);
        // A dropped receiver means the caller abandoned the restore; the
        // work itself is already done
        let _ = sender.send((manager, summary));
    });
    BackgroundRestore { receiver, handle }
}
