use crate::config::{Credentials, StreamConfig, DEFAULT_OUTPUT, DEFAULT_SAMPLE_SIZE};
use clap::Parser;
use std::{path::PathBuf, time::Duration};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Stream a remote video to disk and tell when it can be played without stalling"
)]
pub struct Cli {
    /// HTTP url of the video to stream
    #[arg(long)]
    pub url: String,

    /// Duration of the video, e.g. 90s, 1h2m3s or 1.5m
    #[arg(long, value_parser = parse_duration)]
    pub duration: Duration,

    /// Filepath to stream output
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    pub out: PathBuf,

    /// Username to use for HTTP basic auth
    #[arg(long, default_value = "")]
    pub username: String,

    /// Password to use for HTTP basic auth
    #[arg(long, default_value = "")]
    pub password: String,

    /// Bytes to download before estimating bandwidth
    #[arg(
        long,
        default_value_t = DEFAULT_SAMPLE_SIZE,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sample_size: u64,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Print a JSON transfer report when done
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn into_config(self) -> StreamConfig {
        StreamConfig {
            url: self.url,
            duration: self.duration,
            output: self.out,
            credentials: Credentials::from_parts(self.username, self.password),
            sample_size: self.sample_size,
            show_progress: !self.no_progress,
        }
    }
}

/// Parses `1h2m3s`-style durations. A bare number is read as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(secs) = input.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).map_err(|err| format!("{input:?}: {err}"));
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut total = 0.0;
    let mut rest = input;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !is_number(c))
            .ok_or_else(|| format!("missing unit in {input:?}"))?;
        if number_end == 0 {
            return Err(format!("expected a number in {input:?}"));
        }
        let value: f64 = rest[..number_end]
            .parse()
            .map_err(|_| format!("invalid number in {input:?}"))?;
        rest = &rest[number_end..];

        let unit_end = rest.find(is_number).unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3_600.0,
            unit => return Err(format!("unknown unit {unit:?} in {input:?}")),
        };
        total += value * scale;
        rest = &rest[unit_end..];
    }

    Duration::try_from_secs_f64(total).map_err(|err| format!("{input:?}: {err}"))
}
