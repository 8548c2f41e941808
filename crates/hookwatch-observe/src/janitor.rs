//! Retention and compression of aged log artifacts
//!
//! Runs apart from the event flow, typically from the `hookwatch-janitor`
//! binary. Both passes can be re-run at any time: a half-finished run leaves
//! either the original file or its complete `.gz` sibling, never a truncated
//! archive. Archives are encoded under a `.gz.tmp` name and renamed into
//! place once synced.

use crate::capture::{CONTEXT_DIR, CONTEXT_FILE_PREFIX};
use crate::error::{ObserveError, ObserveResult};
use flate2::write::GzEncoder;
use flate2::Compression;
use hookwatch_config::ObserveConfig;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const SECS_PER_DAY: u64 = 86_400;

/// Outcome of [`compress_rotated`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressionReport {
    /// Rotated logs compressed and removed in this run
    pub compressed: Vec<PathBuf>,
    /// Originals deleted because their `.gz` already existed
    pub strays_removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Outcome of [`prune_expired_contexts`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub deleted: Vec<PathBuf>,
    pub retained: usize,
    pub failed: Vec<PathBuf>,
}

/// Both maintenance passes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub compression: CompressionReport,
    pub prune: PruneReport,
}

fn rotated_log_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^.+\.(log|jsonl)\.\d+$").expect("rotated log pattern is valid")
    })
}

/// Whether `file_name` is a numerically suffixed rotated log, e.g. `hook-errors.log.3`
pub fn is_rotated_log(file_name: &str) -> bool {
    rotated_log_pattern().is_match(file_name)
}

fn gz_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

fn gz_partial(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".gz.tmp");
    PathBuf::from(name)
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

async fn list_dir(dir: &Path) -> ObserveResult<Option<Vec<PathBuf>>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ObserveError::read(dir, e)),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ObserveError::read(dir, e))?
    {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(Some(paths))
}

fn file_name_of(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Gzip every rotated log in `log_dir` into a `.gz` sibling.
///
/// The original is deleted only after the archive is complete and renamed
/// into place. A failed compression removes its partial archive and leaves
/// the original, as does the next run for a partial left by a killed one. An
/// original whose archive already exists is treated as a leftover and
/// deleted.
pub async fn compress_rotated(log_dir: &Path) -> ObserveResult<CompressionReport> {
    let mut report = CompressionReport::default();
    let Some(paths) = list_dir(log_dir).await? else {
        return Ok(report);
    };

    for path in paths.into_iter().filter(|p| is_rotated_log(file_name_of(p))) {
        let archive = gz_sibling(&path);
        let partial = gz_partial(&path);

        if let Err(e) = remove_if_present(&partial).await {
            warn!(path = %partial.display(), error = %e, "Failed to remove stale partial archive");
            report.failed.push(path);
            continue;
        }

        if tokio::fs::try_exists(&archive).await.unwrap_or(false) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => report.strays_removed.push(path),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove already-compressed log");
                    report.failed.push(path);
                }
            }
            continue;
        }

        if let Err(e) = compress_file(&path, &partial, &archive).await {
            warn!(error = %e, "Log compression failed");
            if let Err(cleanup) = remove_if_present(&partial).await {
                warn!(path = %partial.display(), error = %cleanup, "Failed to remove partial archive");
            }
            report.failed.push(path);
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Compressed rotated log");
                report.compressed.push(path);
            }
            Err(e) => {
                // The archive is complete; the next run removes the original
                warn!(path = %path.display(), error = %e, "Failed to remove compressed log");
                report.failed.push(path);
            }
        }
    }

    Ok(report)
}

/// Encode `source` into `partial`, then rename it to `archive`
async fn compress_file(source: &Path, partial: &Path, archive: &Path) -> ObserveResult<()> {
    let src = source.to_path_buf();
    let tmp = partial.to_path_buf();

    let result = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut input = std::fs::File::open(&src)?;
        let output = std::fs::File::create(&tmp)?;
        let mut encoder = GzEncoder::new(output, Compression::default());
        std::io::copy(&mut input, &mut encoder)?;
        encoder.finish()?.sync_all()
    })
    .await;

    match result {
        Ok(Ok(())) => tokio::fs::rename(partial, archive)
            .await
            .map_err(|e| ObserveError::Compression {
                path: source.to_path_buf(),
                message: format!("failed to move archive into place: {e}"),
            }),
        Ok(Err(e)) => Err(ObserveError::Compression {
            path: source.to_path_buf(),
            message: e.to_string(),
        }),
        Err(join) => Err(ObserveError::Compression {
            path: source.to_path_buf(),
            message: format!("compression task failed: {join}"),
        }),
    }
}

/// Delete context records last modified more than `max_age_days` ago
pub async fn prune_expired_contexts(log_dir: &Path, max_age_days: u64) -> ObserveResult<PruneReport> {
    prune_expired_contexts_at(log_dir, max_age_days, SystemTime::now()).await
}

/// [`prune_expired_contexts`] against an explicit clock.
///
/// Records exactly `max_age_days` old are kept. Per-file failures are
/// logged and counted; they do not stop the scan.
pub async fn prune_expired_contexts_at(
    log_dir: &Path,
    max_age_days: u64,
    now: SystemTime,
) -> ObserveResult<PruneReport> {
    let mut report = PruneReport::default();
    let context_dir = log_dir.join(CONTEXT_DIR);
    let Some(paths) = list_dir(&context_dir).await? else {
        return Ok(report);
    };

    let max_age = Duration::from_secs(max_age_days.saturating_mul(SECS_PER_DAY));

    for path in paths {
        let name = file_name_of(&path);
        if !(name.starts_with(CONTEXT_FILE_PREFIX) && name.ends_with(".jsonl")) {
            continue;
        }

        let modified = match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read context record age");
                report.failed.push(path);
                continue;
            }
        };

        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= max_age {
            report.retained += 1;
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), age_secs = age.as_secs(), "Pruned context record");
                report.deleted.push(path);
            }
            Err(source) => {
                let err = ObserveError::Prune {
                    path: path.clone(),
                    source,
                };
                warn!(error = %err, "Context record prune failed");
                report.failed.push(path);
            }
        }
    }

    Ok(report)
}

/// Compress rotated logs, then prune expired context records.
///
/// Both passes always run. A pass that cannot list its directory is logged
/// and reports that directory as failed.
pub async fn run_maintenance(config: &ObserveConfig) -> MaintenanceReport {
    let compression = compress_rotated(&config.log_dir)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Log compression pass failed");
            CompressionReport {
                failed: vec![config.log_dir.clone()],
                ..Default::default()
            }
        });
    let prune = prune_expired_contexts(&config.log_dir, config.context_retention_days)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Context prune pass failed");
            PruneReport {
                failed: vec![config.context_dir()],
                ..Default::default()
            }
        });

    info!(
        compressed = compression.compressed.len(),
        strays_removed = compression.strays_removed.len(),
        compression_failed = compression.failed.len(),
        pruned = prune.deleted.len(),
        retained = prune.retained,
        prune_failed = prune.failed.len(),
        "Log maintenance finished"
    );

    MaintenanceReport { compression, prune }
}
