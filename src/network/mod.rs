use crate::{
    config::Credentials,
    error::{Result, StreamError},
};
use bytes::Bytes;
use futures::{stream::BoxStream, StreamExt, TryStreamExt};
use std::{
    error::Error,
    io,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::io::StreamReader;

/// Response body of a single GET, read as a byte stream.
pub struct HttpBody {
    inner: StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>,
}

impl AsyncRead for HttpBody {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

pub struct RemoteBody {
    pub content_length: u64,
    pub body: HttpBody,
}

#[derive(Clone, Default)]
pub struct HttpClient {
    pub client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Issues the GET and insists on a declared content length.
    pub async fn fetch(&self, url: &str, credentials: Option<&Credentials>) -> Result<RemoteBody> {
        let mut request = self.client.get(url);
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let connection_error = |source| StreamError::Connection {
            url: url.to_string(),
            source,
        };
        let resp = request
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(connection_error)?;

        let content_length = resp
            .content_length()
            .ok_or_else(|| StreamError::UnknownLength {
                url: url.to_string(),
            })?;
        tracing::debug!(url, content_length, status = %resp.status(), "remote responded");

        let stream = resp
            .bytes_stream()
            .map_err(body_error)
            .boxed();

        Ok(RemoteBody {
            content_length,
            body: HttpBody {
                inner: StreamReader::new(stream),
            },
        })
    }
}

/// Keeps a premature end of body distinguishable from other transport errors.
fn body_error(err: reqwest::Error) -> io::Error {
    let ended_early = std::iter::successors(err.source(), |cause: &&(dyn std::error::Error + 'static)| (*cause).source()).any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::UnexpectedEof)
    });
    let kind = if ended_early {
        io::ErrorKind::UnexpectedEof
    } else {
        io::ErrorKind::Other
    };
    io::Error::new(kind, err)
}
