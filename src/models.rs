use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, time::Duration};

/// Average throughput in bytes per second, measured once per session.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Bandwidth(pub f64);

impl Bandwidth {
    pub fn from_sample(bytes: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            Self(bytes as f64 / secs)
        } else if bytes > 0 {
            Self(f64::INFINITY)
        } else {
            Self(0.0)
        }
    }

    pub fn bytes_per_sec(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0} B/s", self.0)
    }
}

/// How long to wait before playback can start without stalling.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferPlan {
    pub total_size: u64,
    pub duration: Duration,
    pub bandwidth: Bandwidth,
    pub estimated_download_secs: f64,
    /// Negative when the video runs longer than the download.
    pub buffer_secs: f64,
}

impl BufferPlan {
    /// `Some` only for a strictly positive, finite buffer time.
    pub fn wait(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.buffer_secs)
            .ok()
            .filter(|wait| !wait.is_zero())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Created,
    Sampling,
    Planning,
    Streaming,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReport {
    pub url: String,
    pub output: PathBuf,
    pub total_bytes: u64,
    pub sampled_bytes: u64,
    pub bandwidth_bps: f64,
    pub buffer_secs: f64,
    pub elapsed_secs: f64,
}
