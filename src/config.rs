use std::{path::PathBuf, time::Duration};

/// Bytes pulled through the duplicating reader to measure throughput.
pub const DEFAULT_SAMPLE_SIZE: u64 = 10_000_000;

pub const DEFAULT_OUTPUT: &str = "out.mkv";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Returns `None` for an empty username; the password may be empty.
    pub fn from_parts(username: String, password: String) -> Option<Self> {
        if username.is_empty() {
            None
        } else {
            Some(Self { username, password })
        }
    }
}

#[derive(Clone, Debug)]
pub struct StreamConfig {
    pub url: String,
    pub duration: Duration,
    pub output: PathBuf,
    pub credentials: Option<Credentials>,
    pub sample_size: u64,
    pub show_progress: bool,
}

impl StreamConfig {
    pub fn new(url: impl Into<String>, duration: Duration) -> Self {
        Self {
            url: url.into(),
            duration,
            output: PathBuf::from(DEFAULT_OUTPUT),
            credentials: None,
            sample_size: DEFAULT_SAMPLE_SIZE,
            show_progress: true,
        }
    }
}
