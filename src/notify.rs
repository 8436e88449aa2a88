//! Operator-facing notices emitted while a video is buffered.

use crate::models::Bandwidth;
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Sampling,
    BandwidthMeasured { bandwidth: Bandwidth },
    MustWait { wait: Duration },
    /// No throughput was measured, so no readiness time can be given.
    CannotEstimate,
    Ready { output: PathBuf },
}

pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, event: PlaybackEvent);
}

/// Prints notices to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Sampling => println!("Sampling bandwidth, please wait..."),
            PlaybackEvent::BandwidthMeasured { bandwidth } => {
                println!("Average bandwidth: {bandwidth}")
            }
            PlaybackEvent::MustWait { wait } => {
                println!("{wait:.1?} until you can safely watch this video.");
                println!("Buffering...");
            }
            PlaybackEvent::CannotEstimate => {
                println!("Bandwidth could not be measured; wait for the download to finish.")
            }
            PlaybackEvent::Ready { output } => {
                println!("{} is now ready to play.", output.display())
            }
        }
    }
}
