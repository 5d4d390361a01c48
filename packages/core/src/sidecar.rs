//! Bundled ffmpeg/ffprobe discovery and bounded execution
//!
//! Binaries are resolved through ffmpeg-sidecar first and the system PATH
//! second. Every invocation is bounded by a timeout; a child that runs past
//! it is killed.

use crate::media::VideoAsset;
use crate::{DeckError, DeckResult};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Ensure ffmpeg is available, download if needed
pub fn ensure_ffmpeg() -> DeckResult<()> {
    use ffmpeg_sidecar::download::auto_download;

    if ffmpeg_sidecar::command::ffmpeg_is_installed() {
        tracing::debug!("FFmpeg is already installed");
        return Ok(());
    }

    tracing::info!("FFmpeg not found, downloading...");
    auto_download()
        .map_err(|e| DeckError::MediaTool(format!("Failed to download FFmpeg: {}", e)))?;

    tracing::info!("FFmpeg downloaded successfully");
    Ok(())
}

/// Locate a working ffmpeg binary
pub fn find_ffmpeg() -> Option<PathBuf> {
    find_tool(ffmpeg_sidecar::paths::ffmpeg_path(), "ffmpeg")
}

/// Locate a working ffprobe binary
pub fn find_ffprobe() -> Option<PathBuf> {
    find_tool(ffmpeg_sidecar::ffprobe::ffprobe_path(), "ffprobe")
}

fn find_tool(sidecar_path: PathBuf, name: &str) -> Option<PathBuf> {
    if binary_works(&sidecar_path) {
        tracing::debug!(tool = name, path = %sidecar_path.display(), "Using sidecar binary");
        return Some(sidecar_path);
    }

    let binary_name = if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    };

    if let Some(path) = find_in_system_path(&binary_name) {
        if binary_works(&path) {
            tracing::debug!(tool = name, path = %path.display(), "Using system PATH binary");
            return Some(path);
        }
    }

    tracing::warn!(tool = name, "No working binary found");
    None
}

fn binary_works(path: &Path) -> bool {
    Command::new(path)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn find_in_system_path(name: &str) -> Option<PathBuf> {
    let cmd = if cfg!(windows) { "where" } else { "which" };

    Command::new(cmd)
        .arg(name)
        .output()
        .ok()
        .and_then(|output| {
            if !output.status.success() {
                return None;
            }
            let stdout = String::from_utf8_lossy(&output.stdout);
            let first_line = stdout.lines().next()?.trim();
            (!first_line.is_empty()).then(|| PathBuf::from(first_line))
        })
}

/// Run a prepared command, killing it once `timeout` elapses.
///
/// Stdout and stderr are discarded; tools write their results to files in the
/// staging directory so a full pipe can never stall the child.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> DeckResult<ExitStatus> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| DeckError::MediaTool(format!("Failed to start process: {}", e)))?;

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DeckError::Timeout(timeout));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Temporary directory holding one video for external tools
pub struct StagedVideo {
    dir: TempDir,
    input: PathBuf,
}

impl StagedVideo {
    /// Write the asset to `input.<ext>` in a fresh temporary directory
    pub fn write(video: &VideoAsset) -> DeckResult<Self> {
        let dir = tempfile::Builder::new().prefix("deckcast-").tempdir()?;
        let input = dir.path().join(format!("input.{}", video.extension()));
        std::fs::write(&input, video.data())?;
        Ok(Self { dir, input })
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Path for a tool output file inside the staging directory
    pub fn output(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(file_name)
    }
}
