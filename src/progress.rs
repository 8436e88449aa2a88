use indicatif::{ProgressBar, ProgressBarIter, ProgressDrawTarget, ProgressStyle};
use tokio::io::AsyncRead;

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] \
                        {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Counts bytes flowing through a reader against a known upper bound.
#[derive(Clone)]
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub fn new(total: u64, visible: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let bar = ProgressBar::with_draw_target(Some(total), target).with_style(style);
        Self { bar }
    }

    pub fn observe<R: AsyncRead + Unpin>(&self, reader: R) -> ProgressBarIter<R> {
        self.bar.wrap_async_read(reader)
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    #[cfg(test)]
    fn length(&self) -> Option<u64> {
        self.bar.length()
    }

    pub fn finish(&self) {
        self.bar.finish();
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
