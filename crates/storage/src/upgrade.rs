// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hot-upgrade pipeline (spec.md §4.3 "Upgrade protocol"): download a
//! successor binary, validate it in a side process before trusting it, then
//! exec it in place. Each step is a separate function so the daemon (which
//! owns the `UpgradeStatus` the user polls) can update that status between
//! steps rather than this crate reaching into HTTP.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_stream::StreamExt;

const MIN_BINARY_BYTES: u64 = 1024;
const MAX_BINARY_BYTES: u64 = 500 * 1024 * 1024;
const HEALTH_CHECK_DEADLINE: Duration = Duration::from_secs(30);
const HEALTH_CHECK_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),
    #[error("downloaded file is {0} bytes, outside the allowed 1KiB-500MiB range")]
    BadSize(u64),
    #[error("downloaded file is not a recognized executable (bad magic bytes)")]
    BadMagic,
    #[error("validator never became healthy within {0:?}")]
    ValidatorUnhealthy(Duration),
    #[error("validator reports {actual_total} processes ({actual_running} running), expected {expected_total} ({expected_running} running)")]
    ProcessCountMismatch {
        expected_total: usize,
        expected_running: usize,
        actual_total: usize,
        actual_running: usize,
    },
    #[error("failed to spawn validator: {0}")]
    ValidatorSpawnFailed(String),
}

/// spec.md §4.3 step 1: dev builds never self-replace. `exe_path` is the
/// currently-running binary's path; `dev_mode_env` is the value (if any) of
/// the daemon's dev-mode marker variable.
pub fn is_dev_mode(exe_path: &Path, dev_mode_env: Option<&str>) -> bool {
    dev_mode_env.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        || exe_path.to_string_lossy().contains("/tmp/")
}

/// spec.md §4.3 step 2: download to `dest`, rejecting the result outside
/// the size bounds or without ELF/Mach-O magic bytes. `dest`'s parent must
/// already exist.
pub async fn download(url: &str, dest: &Path) -> Result<u64, UpgradeError> {
    let response = reqwest::get(url).await?.error_for_status()?;
    let mut stream = response.bytes_stream();

    let mut file = tokio::fs::File::create(dest).await?;
    let mut total: u64 = 0;
    let mut header = Vec::with_capacity(4);

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if header.len() < 4 {
            header.extend(chunk.iter().take(4 - header.len()));
        }
        file.write_all(&chunk).await?;
        total += chunk.len() as u64;
    }
    file.sync_all().await?;
    drop(file);

    if !(MIN_BINARY_BYTES..=MAX_BINARY_BYTES).contains(&total) {
        let _ = tokio::fs::remove_file(dest).await;
        return Err(UpgradeError::BadSize(total));
    }
    if !is_executable_magic(&header) {
        let _ = tokio::fs::remove_file(dest).await;
        return Err(UpgradeError::BadMagic);
    }

    Ok(total)
}

/// ELF (`\x7fELF`) or Mach-O (32/64-bit, either endianness, plus the fat
/// binary magic) leading four bytes.
fn is_executable_magic(header: &[u8]) -> bool {
    const MAGICS: &[[u8; 4]] = &[
        [0x7f, b'E', b'L', b'F'],
        [0xfe, 0xed, 0xfa, 0xce],
        [0xce, 0xfa, 0xed, 0xfe],
        [0xfe, 0xed, 0xfa, 0xcf],
        [0xcf, 0xfa, 0xed, 0xfe],
        [0xca, 0xfe, 0xba, 0xbe],
    ];
    header.len() >= 4 && MAGICS.iter().any(|m| &header[..4] == m)
}

/// spec.md §4.3 step 3: fork/exec `binary_path` on `validation_port`, poll
/// its `/health` until 200 OK or the deadline, then cross-check its
/// `/process` list against what the current process expects to hand off.
/// The validator is always killed before returning, win or lose.
pub async fn validate(
    binary_path: &Path,
    validation_port: u16,
    state_file: &Path,
    expected_total: usize,
    expected_running: usize,
) -> Result<(), UpgradeError> {
    let mut child = tokio::process::Command::new(binary_path)
        .env("SANDBOX_BIND_ADDR", format!("127.0.0.1:{validation_port}"))
        .env("SANDBOX_STATE_FILE", state_file)
        .env("SANDBOX_VALIDATION_MODE", "1")
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| UpgradeError::ValidatorSpawnFailed(e.to_string()))?;

    let result = run_validation_checks(validation_port, expected_total, expected_running).await;

    let _ = child.start_kill();
    let _ = child.wait().await;

    result
}

async fn run_validation_checks(
    validation_port: u16,
    expected_total: usize,
    expected_running: usize,
) -> Result<(), UpgradeError> {
    let base = format!("http://127.0.0.1:{validation_port}");
    let client = reqwest::Client::new();

    let deadline = tokio::time::Instant::now() + HEALTH_CHECK_DEADLINE;
    loop {
        if tokio::time::Instant::now() >= deadline {
            return Err(UpgradeError::ValidatorUnhealthy(HEALTH_CHECK_DEADLINE));
        }
        match client.get(format!("{base}/health")).send().await {
            Ok(resp) if resp.status().is_success() => break,
            _ => tokio::time::sleep(HEALTH_CHECK_POLL_INTERVAL).await,
        }
    }

    #[derive(serde::Deserialize)]
    struct ProcessSummary {
        status: String,
    }

    let processes: Vec<ProcessSummary> = client
        .get(format!("{base}/process"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let actual_total = processes.len();
    let actual_running = processes.iter().filter(|p| p.status == "running").count();

    if actual_total != expected_total || actual_running != expected_running {
        return Err(UpgradeError::ProcessCountMismatch {
            expected_total,
            expected_running,
            actual_total,
            actual_running,
        });
    }
    Ok(())
}

/// spec.md §4.3 step 4: move `binary_path` to `target_path` (rename, or
/// copy+unlink across devices), mark it executable, then `exec` it with
/// `argv` and `SANDBOX_UPGRADE_COUNT` bumped. On success this never
/// returns — the calling process's image is replaced in place.
#[cfg(unix)]
pub fn replace(
    binary_path: &Path,
    target_path: &Path,
    argv: &[String],
    upgrade_count: u32,
) -> Result<std::convert::Infallible, UpgradeError> {
    use std::os::unix::fs::PermissionsExt;
    use std::os::unix::process::CommandExt;

    if std::fs::rename(binary_path, target_path).is_err() {
        std::fs::copy(binary_path, target_path)?;
        std::fs::remove_file(binary_path)?;
    }
    let mut perms = std::fs::metadata(target_path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(target_path, perms)?;

    let err = std::process::Command::new(target_path)
        .args(argv.iter().skip(1))
        .env("SANDBOX_UPGRADE_COUNT", upgrade_count.to_string())
        .exec();
    Err(UpgradeError::Io(err))
}

#[cfg(not(unix))]
pub fn replace(
    _binary_path: &Path,
    _target_path: &Path,
    _argv: &[String],
    _upgrade_count: u32,
) -> Result<std::convert::Infallible, UpgradeError> {
    Err(UpgradeError::Io(std::io::Error::other(
        "binary replacement is only supported on unix",
    )))
}

/// Where a downloaded successor binary is staged before validation.
pub fn staging_path(base_dir: &Path, version: &str) -> PathBuf {
    base_dir.join(format!(".sandbox-upgrade-{version}.tmp"))
}

#[cfg(test)]
#[path = "upgrade_tests.rs"]
mod tests;
