//! Source-control capability backed by the `git` executable.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::{HealthError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

static SCM_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://(?P<host>[^/]+)/(?P<repository>[^/]+/[^/]+?)(?:\.git)?(?:/tree/(?P<branch>[^/]+)(?:/(?P<folder>.+?))?)?/?$",
    )
    .expect("valid regex literal")
});

/// A repository URL split into its parts.
///
/// Mono-repo plugins point at `https://host/org/repo/tree/<branch>/<folder>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScmLink {
    /// Hosting server, e.g. `github.com`.
    pub host: String,
    /// `org/name` of the repository.
    pub repository: String,
    /// Branch named in the URL.
    pub branch: Option<String>,
    /// Folder holding the plugin inside the repository.
    pub sub_folder: Option<PathBuf>,
}

impl ScmLink {
    /// Parse a repository URL; `None` when it does not look like a hosted repository.
    pub fn parse(url: &str) -> Option<Self> {
        let captures = SCM_URL.captures(url.trim())?;
        Some(Self {
            host: captures.name("host")?.as_str().to_string(),
            repository: captures.name("repository")?.as_str().to_string(),
            branch: captures.name("branch").map(|m| m.as_str().to_string()),
            sub_folder: captures.name("folder").map(|m| PathBuf::from(m.as_str())),
        })
    }

    /// URL suitable for `git clone`.
    pub fn clone_url(&self) -> String {
        format!("https://{}/{}.git", self.host, self.repository)
    }
}

/// Local operations on plugin source repositories.
pub trait SourceControl: Send + Sync {
    /// Clone `url` into `destination`, which must not exist yet.
    fn clone_repository(&self, url: &str, destination: &Path) -> Result<()>;
    /// Commit date of the most recent commit touching `path_filter` (or any path).
    ///
    /// `Ok(None)` means the repository has no matching commit.
    fn last_commit(
        &self,
        repository: &Path,
        path_filter: Option<&Path>,
    ) -> Result<Option<DateTime<Utc>>>;
}

/// [`SourceControl`] that shells out to `git`, killing commands that exceed a timeout.
#[derive(Debug, Clone)]
pub struct GitCommandClient {
    timeout: Duration,
}

impl GitCommandClient {
    /// Create a client whose commands are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl SourceControl for GitCommandClient {
    fn clone_repository(&self, url: &str, destination: &Path) -> Result<()> {
        let mut command = Command::new("git");
        command.args(["clone", "--quiet", url]).arg(destination);
        run_command(command, "git clone", self.timeout)?;
        Ok(())
    }

    fn last_commit(
        &self,
        repository: &Path,
        path_filter: Option<&Path>,
    ) -> Result<Option<DateTime<Utc>>> {
        let mut command = Command::new("git");
        command
            .args(["log", "--max-count=1", "--format=%ct"])
            .current_dir(repository);
        if let Some(filter) = path_filter {
            command.arg("--").arg(filter);
        }
        let stdout = run_command(command, "git log", self.timeout)?;
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let seconds: i64 = trimmed
            .parse()
            .map_err(|_| HealthError::Git(format!("unexpected git log output: {trimmed}")))?;
        DateTime::from_timestamp(seconds, 0)
            .map(Some)
            .ok_or_else(|| HealthError::Git(format!("commit timestamp out of range: {seconds}")))
    }
}

/// Run a command to completion within `timeout`, returning its stdout.
///
/// Both pipes are drained on reader threads while the deadline is polled, so
/// a chatty command never stalls on a full pipe.
pub(crate) fn run_command(mut command: Command, what: &str, timeout: Duration) -> Result<String> {
    command
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command
        .spawn()
        .map_err(|err| HealthError::Git(format!("{what} failed to start: {err}")))?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(HealthError::Timeout(format!(
                "{what} timed out after {}ms",
                timeout.as_millis()
            )));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = String::from_utf8_lossy(&stdout.join().unwrap_or_default()).to_string();
    if !status.success() {
        let stderr = stderr.join().unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(HealthError::Git(format!("{what} failed: {detail}")));
    }
    Ok(stdout)
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    })
}
