use crate::{
    config::StreamConfig,
    error::Result,
    models::{Bandwidth, BufferPlan, PlaybackState, TransferReport},
    notify::{Notifier, PlaybackEvent},
    progress::ProgressObserver,
    session::{RemoteSource, TransferSession},
};
use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::io::AsyncWrite;

/// Over-estimates download time to absorb bandwidth variance.
pub const FUDGE_FACTOR: f64 = 1.2;

/// Buffer time needed so the download outpaces playback.
pub fn plan(total_size: u64, duration: Duration, bandwidth: Bandwidth) -> BufferPlan {
    let bytes_per_sec = bandwidth.bytes_per_sec();
    let estimated_download_secs = if total_size == 0 {
        0.0
    } else if bytes_per_sec > 0.0 {
        (total_size as f64 / bytes_per_sec) * FUDGE_FACTOR
    } else {
        f64::INFINITY
    };

    BufferPlan {
        total_size,
        duration,
        bandwidth,
        estimated_download_secs,
        buffer_secs: estimated_download_secs - duration.as_secs_f64(),
    }
}

pub struct PlaybackScheduler {
    notifier: Arc<dyn Notifier>,
    sample_size: u64,
    show_progress: bool,
    state: PlaybackState,
}

impl PlaybackScheduler {
    pub fn new(config: &StreamConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            sample_size: config.sample_size,
            show_progress: config.show_progress,
            state: PlaybackState::Created,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Samples, plans and streams one session to completion.
    pub async fn run<R, W>(&mut self, session: &mut TransferSession<R, W>) -> Result<TransferReport>
    where
        R: RemoteSource,
        W: AsyncWrite + Unpin + Send,
    {
        let outcome = self.drive(session).await;
        match &outcome {
            Ok(_) => self.transition(PlaybackState::Done),
            Err(err) => {
                tracing::warn!(url = session.url(), error = %err, "streaming failed");
                self.transition(PlaybackState::Failed);
            }
        }
        outcome
    }

    async fn drive<R, W>(&mut self, session: &mut TransferSession<R, W>) -> Result<TransferReport>
    where
        R: RemoteSource,
        W: AsyncWrite + Unpin + Send,
    {
        let started = Instant::now();

        self.transition(PlaybackState::Sampling);
        self.notifier.notify(PlaybackEvent::Sampling);
        let (sampled, bandwidth) = session.sample_bandwidth(self.sample_size).await?;
        self.notifier
            .notify(PlaybackEvent::BandwidthMeasured { bandwidth });

        self.transition(PlaybackState::Planning);
        let plan = plan(session.total_size(), session.duration(), bandwidth);
        if plan.estimated_download_secs.is_infinite() {
            tracing::warn!(sampled, "no throughput measured, cannot estimate a buffer time");
        }
        tracing::info!(
            estimated_download_secs = plan.estimated_download_secs,
            buffer_secs = plan.buffer_secs,
            "buffer plan ready"
        );

        self.transition(PlaybackState::Streaming);
        self.stream(session, &plan, sampled).await?;

        Ok(TransferReport {
            url: session.url().to_string(),
            output: session.output().to_path_buf(),
            total_bytes: session.total_size(),
            sampled_bytes: sampled,
            bandwidth_bps: bandwidth.bytes_per_sec(),
            buffer_secs: plan.buffer_secs,
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }

    /// Streams the remainder while a detached timer announces readiness.
    /// The timer is neither joined nor cancelled.
    pub async fn stream<R, W>(
        &self,
        session: &mut TransferSession<R, W>,
        plan: &BufferPlan,
        already_consumed: u64,
    ) -> Result<u64>
    where
        R: RemoteSource,
        W: AsyncWrite + Unpin + Send,
    {
        if plan.estimated_download_secs.is_infinite() {
            self.notifier.notify(PlaybackEvent::CannotEstimate);
        } else {
            let wait = plan.wait();
            if let Some(wait) = wait {
                self.notifier.notify(PlaybackEvent::MustWait { wait });
            }
            self.spawn_readiness(wait.unwrap_or_default(), session.output().to_path_buf());
        }

        let remaining = session.total_size().saturating_sub(already_consumed);
        let observer =
            (remaining > 0).then(|| ProgressObserver::new(remaining, self.show_progress));

        let result = session
            .stream_remainder(already_consumed, observer.as_ref())
            .await;
        if let Some(observer) = &observer {
            match &result {
                Ok(_) => observer.finish(),
                Err(_) => observer.abandon(),
            }
        }

        Ok(result?)
    }

    fn spawn_readiness(&self, wait: Duration, output: PathBuf) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            notifier.notify(PlaybackEvent::Ready { output });
        });
    }

    fn transition(&mut self, next: PlaybackState) {
        tracing::debug!(from = ?self.state, to = ?next, "playback state");
        self.state = next;
    }
}
