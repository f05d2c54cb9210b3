//! Shared test harness for the root-level behavioral specifications
//! (spec.md §8). Each test spawns a real `sandboxd` binary bound to an
//! ephemeral port, drives it over HTTP with `reqwest`, and kills it on
//! drop — the same black-box style as the teacher's own `oj-specs` suite.

#![allow(dead_code)]

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::time::Duration;

pub const POLL_INTERVAL_MS: u64 = 20;
pub const HEALTH_WAIT_MAX_MS: u64 = 5_000;

/// Locates a workspace binary, trying the coverage target dir before the
/// standard one and finally resolving relative to the test binary itself
/// (this test binary and `sandboxd`/`sandboxctl` always land in the same
/// `target/<profile>` directory, regardless of which crate's manifest dir
/// `CARGO_MANIFEST_DIR` points at).
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn sandboxd_path() -> PathBuf {
    binary_path("sandboxd")
}

pub fn sandboxctl_path() -> PathBuf {
    binary_path("sandboxctl")
}

/// Binds an ephemeral TCP port and immediately releases it. There is an
/// inherent TOCTOU window here; acceptable for test fixtures, not for the
/// validator health-check logic this crate's production code implements.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .expect("local_addr")
        .port()
}

/// A running `sandboxd` instance plus the knobs a test needs to talk to it.
/// Killed on drop so a panicking test never leaks a listening daemon.
pub struct TestDaemon {
    child: Child,
    pub base_url: String,
    pub state_file: PathBuf,
    pub fs_root: PathBuf,
    _tmp: tempfile::TempDir,
}

pub struct DaemonOpts {
    pub dev_mode: bool,
    pub extra_env: Vec<(String, String)>,
}

impl Default for DaemonOpts {
    fn default() -> Self {
        Self {
            dev_mode: true,
            extra_env: Vec::new(),
        }
    }
}

impl TestDaemon {
    /// Spawns `sandboxd` with a fresh temp dir for its state file and
    /// filesystem root. `dev_mode` defaults to `true` so stray `/upgrade`
    /// calls in unrelated tests can never try to exec-replace the test
    /// binary (spec.md §4.3 step 1).
    pub async fn spawn(opts: DaemonOpts) -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state_file = tmp.path().join("state.json");
        let fs_root = tmp.path().join("fsroot");
        std::fs::create_dir_all(&fs_root).expect("create fs root");

        let port = free_port();
        let base_url = format!("http://127.0.0.1:{port}");

        let mut cmd = std::process::Command::new(sandboxd_path());
        cmd.env("SANDBOX_BIND_ADDR", format!("127.0.0.1:{port}"))
            .env("SANDBOX_STATE_FILE", &state_file)
            .env("SANDBOX_FS_ROOT", &fs_root)
            .env("SANDBOX_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if opts.dev_mode {
            cmd.env("SANDBOX_DEV_MODE", "1");
        }
        for (k, v) in &opts.extra_env {
            cmd.env(k, v);
        }

        let child = cmd.spawn().expect("spawn sandboxd");

        let daemon = Self {
            child,
            base_url,
            state_file,
            fs_root,
            _tmp: tmp,
        };
        daemon.wait_healthy().await;
        daemon
    }

    async fn wait_healthy(&self) {
        let client = reqwest::Client::new();
        let deadline = tokio::time::Instant::now() + Duration::from_millis(HEALTH_WAIT_MAX_MS);
        loop {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status().is_success() {
                    return;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("sandboxd never became healthy at {}", self.base_url);
            }
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Polls `f` until it returns `Some`, or panics after `max_ms`.
pub async fn wait_for<T, F: Fn() -> Option<T>>(max_ms: u64, f: F) -> T {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(max_ms);
    loop {
        if let Some(v) = f() {
            return v;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("condition never became true within {max_ms}ms");
        }
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}

/// Async variant of [`wait_for`] for futures that need to be re-awaited
/// (e.g. an HTTP GET) each poll.
pub async fn wait_for_async<T, Fut, F>(max_ms: u64, mut f: F) -> T
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(max_ms);
    loop {
        if let Some(v) = f().await {
            return v;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("condition never became true within {max_ms}ms");
        }
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}
