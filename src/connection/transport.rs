//! The byte-stream contract a transport must satisfy: plain TCP only,
//! no TLS/SOCKS5 branches (see `DESIGN.md`). This crate ships a minimal
//! concrete TCP implementation so it is runnable end-to-end.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("invalid host-port string: {0}")]
    InvalidHostPort(String),

    #[error("connecting to broker timed out")]
    ConnectTimeout,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any byte stream satisfying `AsyncRead + AsyncWrite + Unpin + Send` can
/// back a [`crate::connection::Messenger`] -- the concrete [`Transport`]
/// below is the TCP case this crate ships; embedders with their own TLS
/// setup can implement the same bound directly instead.
#[derive(Debug)]
pub struct Transport {
    inner: TcpStream,
}

impl AsyncRead for Transport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl Transport {
    pub async fn connect(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let inner = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, TcpStream::connect(endpoint))
                .await
                .map_err(|_| Error::ConnectTimeout)??,
            None => TcpStream::connect(endpoint).await?,
        };
        inner.set_nodelay(true).ok();
        Ok(Self { inner })
    }
}
