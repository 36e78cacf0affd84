use std::{
    future, io,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
};

use interop_proto::proto::{Frame, StreamDecoder, StreamEncoder, error::DecoderError};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt as _, ReadBuf},
    net::TcpStream,
};

/// Above this many buffered bytes new frames should wait for a write
const WRITE_SOFT_LIMIT: usize = 64 * 1024;
const READ_CHUNK: usize = 8 * 1024;

/// A bidirectional frame stream over any byte stream
#[derive(Debug)]
pub struct StreamingConnection<S> {
    socket: S,
    encoder: StreamEncoder,
    decoder: StreamDecoder,
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionReadError {
    #[error("decoder")]
    Decoder(#[source] DecoderError),
    #[error("io")]
    Io(#[source] io::Error),
    #[error("unexpected EOF")]
    UnexpectedEof,
}

impl<S> StreamingConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    #[must_use]
    pub fn new(socket: S) -> Self {
        Self {
            socket,
            encoder: StreamEncoder::new(),
            decoder: StreamDecoder::new(),
        }
    }

    /// Read the next [`Frame`] sent by the remote peer
    ///
    /// # Errors
    ///
    /// It returns an error if reading from the socket fails, the remote
    /// closed the stream or sent something which doesn't decode.
    pub fn poll_read_next(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Frame, ConnectionReadError>> {
        loop {
            match self.decoder.decode() {
                Ok(Some(frame)) => return Poll::Ready(Ok(frame)),
                Ok(None) => {}
                Err(err) => return Poll::Ready(Err(ConnectionReadError::Decoder(err))),
            }

            let mut chunk = [0; READ_CHUNK];
            let mut read_buf = ReadBuf::new(&mut chunk);
            match Pin::new(&mut self.socket).poll_read(cx, &mut read_buf) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(())) if read_buf.filled().is_empty() => {
                    return Poll::Ready(Err(ConnectionReadError::UnexpectedEof));
                }
                Poll::Ready(Ok(())) => {
                    self.decoder.read_buf().extend_from_slice(read_buf.filled());
                }
                Poll::Ready(Err(err)) => return Poll::Ready(Err(ConnectionReadError::Io(err))),
            }
        }
    }

    /// # Errors
    ///
    /// It returns an error if reading fails.
    pub async fn read_next(&mut self) -> Result<Frame, ConnectionReadError> {
        future::poll_fn(|cx| self.poll_read_next(cx)).await
    }

    #[must_use]
    pub fn may_write(&self) -> bool {
        self.encoder.has_remaining()
    }

    #[must_use]
    pub fn may_enqueue_more_ops(&self) -> bool {
        self.encoder.remaining() < WRITE_SOFT_LIMIT
    }

    pub fn enqueue_write_op(&mut self, item: &Frame) {
        self.encoder.enqueue_write_op(item);
    }

    /// Write part of the buffered frames to the socket
    ///
    /// # Errors
    ///
    /// It returns an error if writing to the socket fails.
    pub fn poll_write_next(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<usize>> {
        if !self.encoder.has_remaining() {
            return Poll::Ready(Ok(0));
        }

        let n = match Pin::new(&mut self.socket).poll_write(cx, self.encoder.chunk()) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(0)) => return Poll::Ready(Err(io::ErrorKind::WriteZero.into())),
            Poll::Ready(Ok(n)) => n,
            Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
        };
        self.encoder.advance(n);
        Poll::Ready(Ok(n))
    }

    /// # Errors
    ///
    /// It returns an error if flushing the socket fails.
    pub fn poll_flush(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.socket).poll_flush(cx)
    }

    /// Write every buffered frame and flush the socket
    ///
    /// # Errors
    ///
    /// It returns an error if writing to the socket fails.
    pub async fn flush(&mut self) -> io::Result<()> {
        while self.may_write() {
            future::poll_fn(|cx| self.poll_write_next(cx)).await?;
        }
        future::poll_fn(|cx| self.poll_flush(cx)).await
    }

    /// # Errors
    ///
    /// It returns an error if the shutdown fails.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.socket.shutdown().await
    }
}

/// Open a TCP connection to `addr`
///
/// # Errors
///
/// It returns an error if the connection can't be established.
pub async fn connect_tcp(addr: SocketAddr, nodelay: bool) -> io::Result<TcpStream> {
    let socket = TcpStream::connect(addr).await?;
    socket.set_nodelay(nodelay)?;
    Ok(socket)
}
