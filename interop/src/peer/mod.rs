use std::{io, sync::Arc, time::Duration};

use interop_net::{StreamingConnection, error::AddressError};
use interop_proto::{Call, ObjectRef, Reply};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{
        mpsc::{self, error::TrySendError},
        oneshot,
    },
    task::JoinHandle,
};
use tracing::{debug, warn};

pub use self::acceptor::Acceptor;
pub use self::builder::PeerBuilder;
use self::handler::{Handler, HandlerCommand, HandlerOutput};
use self::keepalive::KeepAlive;
use crate::{BoxFuture, InvokeError, ObjectAdapter, Transport};

mod acceptor;
mod builder;
mod handler;
mod keepalive;

#[cfg(feature = "from-env")]
mod from_env;

const COMMAND_CHANNEL_SIZE: usize = 512;

/// One end of a bidirectional connection
///
/// Calls on objects hosted by the other end travel over the connection,
/// while the other end may call the objects of our [`ObjectAdapter`]
/// over the same connection.
///
/// `Peer` is a `Clone`able handle. Dropping every handle immediately
/// kills the connection, [`Peer::close`] shuts it down gracefully.
#[derive(Debug, Clone)]
pub struct Peer {
    inner: Arc<PeerInner>,
}

#[derive(Debug)]
struct PeerInner {
    link: Link,
    handler: JoinHandle<()>,
    shutdown_sender: mpsc::Sender<()>,
}

/// The [`Transport`] handed to servants serving calls of a connection
#[derive(Debug, Clone)]
pub(crate) struct Link {
    sender: mpsc::Sender<HandlerCommand>,
    adapter: Arc<ObjectAdapter>,
}

/// An error encountered while establishing a connection
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConnectError {
    #[error("io error")]
    Io(#[source] io::Error),
    #[error("timed out while attempting to connect")]
    TimedOut,
    #[error("invalid server address")]
    Address(#[source] AddressError),
}

impl Peer {
    #[must_use]
    pub fn builder() -> PeerBuilder {
        PeerBuilder::new()
    }

    /// Run the connection over an already established `stream`
    pub fn from_stream<S>(stream: S, adapter: Arc<ObjectAdapter>, keepalive_interval: Duration) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (shutdown_sender, shutdown_receiver) = mpsc::channel(1);

        let link = Link {
            sender,
            adapter,
        };
        let mut handle = Handler::new(
            StreamingConnection::new(stream),
            link.clone(),
            KeepAlive::new(keepalive_interval),
            receiver,
            shutdown_receiver,
        );

        let handler = tokio::spawn(async move {
            match (&mut handle).await {
                HandlerOutput::Disconnected => warn!("connection lost"),
                HandlerOutput::Closed => debug!("connection closed"),
            }
            handle.shutdown().await;
        });

        Self {
            inner: Arc::new(PeerInner {
                link,
                handler,
                shutdown_sender,
            }),
        }
    }

    #[must_use]
    pub fn adapter(&self) -> &Arc<ObjectAdapter> {
        &self.inner.link.adapter
    }

    /// Wait for the connection to go away
    pub async fn closed(&self) {
        self.inner.link.sender.closed().await;
    }

    /// Close the connection, after writing whatever is already buffered
    ///
    /// Calls made after this returns fail with [`InvokeError::ConnectionUnavailable`].
    pub async fn close(&self) {
        // If this fails to send, either another shutdown is already in flight or the peer
        // has already been shutdown.
        let _ = self.inner.shutdown_sender.try_send(());

        self.inner.shutdown_sender.closed().await;
    }
}

impl Transport for Peer {
    fn invoke(&self, target: ObjectRef, call: Call) -> BoxFuture<'_, Result<Reply, InvokeError>> {
        self.inner.link.invoke(target, call)
    }

    fn send_oneway(&self, target: ObjectRef, call: Call) -> Result<(), InvokeError> {
        self.inner.link.send_oneway(target, call)
    }
}

impl Drop for PeerInner {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

impl Transport for Link {
    fn invoke(&self, target: ObjectRef, call: Call) -> BoxFuture<'_, Result<Reply, InvokeError>> {
        Box::pin(async move {
            if self.adapter.is_local(target) {
                return self.adapter.invoke_local(target, call, self).await;
            }

            let (reply, receiver) = oneshot::channel();
            self.sender
                .send(HandlerCommand::Request {
                    target,
                    call,
                    reply,
                })
                .await
                .map_err(|_| InvokeError::ConnectionUnavailable)?;
            receiver
                .await
                .map_err(|_| InvokeError::ConnectionUnavailable)?
        })
    }

    fn send_oneway(&self, target: ObjectRef, call: Call) -> Result<(), InvokeError> {
        if self.adapter.is_local(target) {
            return self.adapter.spawn_oneway(target, call, self.clone());
        }

        match self.sender.try_send(HandlerCommand::Oneway {
            target,
            call,
        }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(%target, "command buffer full, dropping one-way call");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(InvokeError::ConnectionUnavailable),
        }
    }
}
