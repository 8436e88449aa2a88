mod tee;

pub use tee::TeeReader;

use crate::{
    config::StreamConfig,
    error::{Result, StreamError, TransferError},
    models::Bandwidth,
    network::{HttpBody, HttpClient},
    progress::ProgressObserver,
};
use std::{
    io::{self, Cursor},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
};

const SAMPLE_BUF_SIZE: usize = 64 * 1024;

/// A remote byte stream owned by a session.
pub trait RemoteSource: AsyncRead + Unpin + Send {
    /// Releases the underlying connection.
    fn release(self) -> io::Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

impl RemoteSource for HttpBody {}

impl<T: AsRef<[u8]> + Unpin + Send> RemoteSource for Cursor<T> {}

/// Owns the remote source and the local sink for one download.
pub struct TransferSession<R, W> {
    url: String,
    size: u64,
    duration: Duration,
    output: PathBuf,
    source: R,
    sink: W,
}

impl TransferSession<HttpBody, File> {
    pub async fn open(config: StreamConfig) -> Result<Self> {
        let remote = HttpClient::new()
            .fetch(&config.url, config.credentials.as_ref())
            .await?;

        let file = File::create(&config.output)
            .await
            .map_err(|source| StreamError::LocalIo {
                path: config.output.clone(),
                source,
            })?;

        tracing::info!(
            url = %config.url,
            output = %config.output.display(),
            size = remote.content_length,
            "opened video stream"
        );

        Ok(Self::from_parts(
            config.url,
            remote.content_length,
            config.duration,
            config.output,
            remote.body,
            file,
        ))
    }
}

impl<R, W> TransferSession<R, W>
where
    R: RemoteSource,
    W: AsyncWrite + Unpin + Send,
{
    pub fn from_parts(
        url: impl Into<String>,
        size: u64,
        duration: Duration,
        output: impl Into<PathBuf>,
        source: R,
        sink: W,
    ) -> Self {
        Self {
            url: url.into(),
            size,
            duration,
            output: output.into(),
            source,
            sink,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn total_size(&self) -> u64 {
        self.size
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// Duplicating read path over the remote source.
    pub fn tee(&mut self) -> TeeReader<&mut R, &mut W> {
        TeeReader::new(&mut self.source, &mut self.sink)
    }

    /// Pulls up to `sample_size` bytes through the tee and times it. The
    /// sampled bytes are the first slice of the real transfer.
    pub async fn sample_bandwidth(
        &mut self,
        sample_size: u64,
    ) -> Result<(u64, Bandwidth), TransferError> {
        let started = Instant::now();
        let mut tee = self.tee();
        let mut buf = vec![0u8; SAMPLE_BUF_SIZE];
        let mut sampled = 0u64;
        while sampled < sample_size {
            let want = (sample_size - sampled).min(buf.len() as u64) as usize;
            match tee.read(&mut buf[..want]).await {
                Ok(0) => break,
                Ok(n) => sampled += n as u64,
                // A body cut short ends the sample; the remainder copy reports it.
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                    tracing::debug!(sampled, error = %err, "stream ended during sampling");
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }
        let elapsed = started.elapsed();
        drop(tee);

        self.sink.flush().await?;

        let bandwidth = Bandwidth::from_sample(sampled, elapsed);
        tracing::debug!(sampled, ?elapsed, %bandwidth, "bandwidth sampled");
        Ok((sampled, bandwidth))
    }

    /// Copies whatever follows the sampled prefix straight from the source
    /// into the sink. Returns the number of bytes copied.
    pub async fn stream_remainder(
        &mut self,
        already_consumed: u64,
        progress: Option<&ProgressObserver>,
    ) -> Result<u64, TransferError> {
        let remaining = self.size.saturating_sub(already_consumed);
        if remaining == 0 {
            tracing::debug!(already_consumed, "sample covered the whole stream");
            return Ok(0);
        }

        let copied = match progress {
            Some(observer) => {
                tokio::io::copy(&mut observer.observe(&mut self.source), &mut self.sink).await?
            }
            None => tokio::io::copy(&mut self.source, &mut self.sink).await?,
        };
        self.sink.flush().await?;

        let received = already_consumed + copied;
        if received < self.size {
            return Err(TransferError::Truncated {
                received,
                expected: self.size,
            });
        }

        tracing::debug!(copied, received, "remainder streamed");
        Ok(copied)
    }

    /// Releases the sink and the source. Both are attempted; failures are
    /// reported together.
    pub async fn close(self) -> Result<()> {
        let Self {
            mut sink, source, ..
        } = self;

        let mut errors = Vec::new();
        if let Err(err) = sink.shutdown().await {
            errors.push(err);
        }
        if let Err(err) = source.release() {
            errors.push(err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(StreamError::Close(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};
    use std::{
        pin::Pin,
        task::{Context, Poll},
    };
    use tokio::io::ReadBuf;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 253) as u8).collect()
    }

    fn session(data: Vec<u8>, declared: u64) -> TransferSession<Cursor<Vec<u8>>, Vec<u8>> {
        TransferSession::from_parts(
            "http://localhost/video.mkv",
            declared,
            Duration::from_secs(10),
            "video.mkv",
            Cursor::new(data),
            Vec::new(),
        )
    }

    struct StuckSource;

    impl AsyncRead for StuckSource {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl RemoteSource for StuckSource {
        fn release(self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "body already gone"))
        }
    }

    /// Yields its bytes, then fails as a body cut short would.
    struct CutShortSource(Cursor<Vec<u8>>);

    impl AsyncRead for CutShortSource {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let before = buf.filled().len();
            match Pin::new(&mut self.0).poll_read(cx, buf) {
                Poll::Ready(Ok(())) if buf.filled().len() == before => Poll::Ready(Err(
                    io::Error::new(io::ErrorKind::UnexpectedEof, "incomplete body"),
                )),
                other => other,
            }
        }
    }

    impl RemoteSource for CutShortSource {}

    struct BrokenSink;

    impl AsyncWrite for BrokenSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk full")))
        }
    }

    #[tokio::test]
    async fn sample_then_remainder_writes_everything_once() {
        let data = payload(50_000);
        let mut session = session(data.clone(), 50_000);

        let (sampled, bandwidth) = session.sample_bandwidth(20_000).await.expect("sample");
        assert_eq!(sampled, 20_000);
        assert!(bandwidth.bytes_per_sec() > 0.0);
        assert_eq!(session.sink().len(), 20_000);

        let copied = session.stream_remainder(sampled, None).await.expect("stream");
        assert_eq!(copied, 30_000);
        assert_eq!(session.sink(), &data);
        session.close().await.expect("close");
    }

    #[tokio::test]
    async fn remainder_is_observed_by_progress() {
        let data = payload(8_000);
        let mut session = session(data.clone(), 8_000);
        let (sampled, _) = session.sample_bandwidth(3_000).await.expect("sample");

        let observer = ProgressObserver::new(5_000, false);
        session.stream_remainder(sampled, Some(&observer)).await.expect("stream");

        assert_eq!(observer.position(), 5_000);
        assert_eq!(session.sink(), &data);
    }

    #[tokio::test]
    async fn sample_larger_than_stream_consumes_everything() {
        let data = payload(1_000);
        let mut session = session(data.clone(), 1_000);

        let (sampled, _) = session.sample_bandwidth(10_000_000).await.expect("sample");
        assert_eq!(sampled, 1_000);

        let copied = session.stream_remainder(sampled, None).await.expect("stream");
        assert_eq!(copied, 0);
        assert_eq!(session.sink(), &data);
    }

    #[tokio::test]
    async fn short_stream_is_a_truncation_error() {
        let mut session = session(payload(5_000), 8_000);
        let (sampled, _) = session.sample_bandwidth(2_000).await.expect("sample");

        let err = session.stream_remainder(sampled, None).await.expect_err("short");
        assert!(matches!(
            err,
            TransferError::Truncated {
                received: 5_000,
                expected: 8_000
            }
        ));
    }

    #[tokio::test]
    async fn stream_ending_during_sample_is_not_a_sampling_error() {
        let mut session = session(payload(500), 8_000);
        let (sampled, _) = session.sample_bandwidth(2_000).await.expect("sample");
        assert_eq!(sampled, 500);

        let err = session.stream_remainder(sampled, None).await.expect_err("short");
        assert!(matches!(err, TransferError::Truncated { received: 500, .. }));
    }

    #[tokio::test]
    async fn body_cut_short_ends_the_sample() {
        let data = payload(700);
        let mut session = TransferSession::from_parts(
            "http://localhost/video.mkv",
            8_000,
            Duration::from_secs(10),
            "video.mkv",
            CutShortSource(Cursor::new(data.clone())),
            Vec::new(),
        );

        let (sampled, _) = session.sample_bandwidth(2_000).await.expect("sample");
        assert_eq!(sampled, 700);
        assert_eq!(session.sink(), &data);
    }

    #[tokio::test]
    async fn sampled_prefix_is_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("video.mkv");
        let data = payload(40_000);

        let file = File::create(&path).await.expect("create");
        let mut session = TransferSession::from_parts(
            "http://localhost/video.mkv",
            40_000,
            Duration::from_secs(10),
            &path,
            Cursor::new(data.clone()),
            file,
        );
        let (sampled, _) = session.sample_bandwidth(16_384).await.expect("sample");

        let on_disk = tokio::fs::read(&path).await.expect("read");
        assert_eq!(on_disk.len() as u64, sampled);
        assert_eq!(Sha256::digest(&on_disk), Sha256::digest(&data[..16_384]));
        session.close().await.expect("close");
    }

    #[tokio::test]
    async fn close_reports_both_failures() {
        let session = TransferSession::from_parts(
            "http://localhost/video.mkv",
            0,
            Duration::from_secs(1),
            "video.mkv",
            StuckSource,
            BrokenSink,
        );

        match session.close().await {
            Err(StreamError::Close(errors)) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].to_string(), "disk full");
                assert_eq!(errors[1].kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("unexpected close result: {other:?}"),
        }
    }
}
