//! Duplicating read path: every byte pulled from the inner reader is written
//! to a side sink before it is handed to the caller.

use std::{
    io,
    pin::Pin,
    task::{ready, Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

const CHUNK_SIZE: usize = 64 * 1024;

pub struct TeeReader<R, W> {
    reader: R,
    writer: W,
    chunk: Vec<u8>,
    written: usize,
    delivered: usize,
}

impl<R, W> TeeReader<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            chunk: Vec::new(),
            written: 0,
            delivered: 0,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R, W> AsyncRead for TeeReader<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.delivered == this.chunk.len() {
            this.chunk.clear();
            this.written = 0;
            this.delivered = 0;

            let want = buf.remaining().min(CHUNK_SIZE);
            if want == 0 {
                return Poll::Ready(Ok(()));
            }

            this.chunk.resize(want, 0);
            let mut inner = ReadBuf::new(&mut this.chunk);
            let filled = match Pin::new(&mut this.reader).poll_read(cx, &mut inner) {
                Poll::Ready(Ok(())) => inner.filled().len(),
                Poll::Ready(Err(err)) => {
                    this.chunk.clear();
                    return Poll::Ready(Err(err));
                }
                Poll::Pending => {
                    this.chunk.clear();
                    return Poll::Pending;
                }
            };
            this.chunk.truncate(filled);

            if this.chunk.is_empty() {
                return Poll::Ready(Ok(()));
            }
        }

        // The slice must reach the sink before the caller sees it.
        while this.written < this.chunk.len() {
            let n = ready!(Pin::new(&mut this.writer).poll_write(cx, &this.chunk[this.written..]))?;
            if n == 0 {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "side sink accepted no bytes",
                )));
            }
            this.written += n;
        }

        let n = buf.remaining().min(this.chunk.len() - this.delivered);
        buf.put_slice(&this.chunk[this.delivered..this.delivered + n]);
        this.delivered += n;
        Poll::Ready(Ok(()))
    }
}
