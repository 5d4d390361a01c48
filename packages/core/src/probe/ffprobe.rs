//! Dimension probing through the bundled ffprobe binary

use super::DimensionProber;
use crate::media::{IntrinsicSize, VideoAsset};
use crate::sidecar::{self, StagedVideo};
use crate::DeckResult;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Parse `ffprobe -of json` output for the first video stream
fn parse_dimensions(json: &str) -> Option<IntrinsicSize> {
    let output: ProbeOutput = serde_json::from_str(json).ok()?;
    let stream = output.streams.first()?;
    IntrinsicSize::new(stream.width?, stream.height?)
}

/// Runs ffprobe against a staged copy of the video
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn run(&self, video: &VideoAsset) -> DeckResult<Option<IntrinsicSize>> {
        let Some(ffprobe) = sidecar::find_ffprobe() else {
            return Ok(None);
        };

        let staged = StagedVideo::write(video)?;
        let report = staged.output("probe.json");

        let mut cmd = std::process::Command::new(&ffprobe);
        cmd.args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height"])
            .args(["-of", "json", "-o"])
            .arg(&report)
            .arg(staged.input());

        let status = sidecar::run_with_timeout(&mut cmd, self.timeout)?;
        if !status.success() {
            tracing::debug!(%status, "ffprobe rejected input");
            return Ok(None);
        }

        let json = std::fs::read_to_string(&report)?;
        Ok(parse_dimensions(&json))
    }
}

impl DimensionProber for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn probe(&self, video: &VideoAsset) -> Option<IntrinsicSize> {
        match self.run(video) {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!(error = %e, "ffprobe failed");
                None
            }
        }
    }
}
