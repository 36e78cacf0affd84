use std::{io, net::SocketAddr, sync::Arc};

use interop_net::{ServerAddress, error::AddressError};
use interop_proto::ObjectRef;
use tokio::{net::TcpListener, task::JoinSet};
use tracing::{debug, info};

use super::{Peer, PeerBuilder};
use crate::ObjectAdapter;

/// Accepts connections, serving the objects of an [`ObjectAdapter`] on each of them
///
/// Obtained from [`PeerBuilder::bind`].
#[derive(Debug)]
pub struct Acceptor {
    listener: TcpListener,
    adapter: Arc<ObjectAdapter>,
    builder: PeerBuilder,
}

impl Acceptor {
    pub(super) fn new(listener: TcpListener, adapter: Arc<ObjectAdapter>, builder: PeerBuilder) -> Self {
        Self {
            listener,
            adapter,
            builder,
        }
    }

    /// # Errors
    ///
    /// It returns an error if the listener's address can't be obtained.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The address through which clients can reach `object`
    ///
    /// # Errors
    ///
    /// It returns an error if the listener's address can't be obtained.
    pub fn address_of(&self, object: ObjectRef) -> io::Result<ServerAddress> {
        self.local_addr()
            .map(|addr| ServerAddress::from_socket_addr(addr, object))
    }

    /// Write the address of `object` to the configured address file
    ///
    /// # Errors
    ///
    /// It returns an error if the file can't be written.
    pub async fn publish(&self, object: ObjectRef) -> Result<ServerAddress, AddressError> {
        let address = self.address_of(object).map_err(AddressError::Io)?;
        address.write_to(&self.builder.address_file).await?;
        info!(%address, file = %self.builder.address_file.display(), "published server address");
        Ok(address)
    }

    /// Accept the next connection
    ///
    /// # Errors
    ///
    /// It returns an error if accepting fails.
    pub async fn accept(&self) -> io::Result<Peer> {
        let (socket, addr) = self.listener.accept().await?;
        socket.set_nodelay(self.builder.tcp_nodelay)?;
        debug!(%addr, "accepted connection");
        Ok(Peer::from_stream(
            socket,
            Arc::clone(&self.adapter),
            self.builder.keepalive_interval,
        ))
    }

    /// Serve connections until accepting fails
    ///
    /// # Errors
    ///
    /// It returns an error if accepting fails.
    pub async fn run(self) -> io::Result<()> {
        let mut peers = JoinSet::new();
        loop {
            let peer = self.accept().await?;
            peers.spawn(async move {
                peer.closed().await;
            });

            while peers.try_join_next().is_some() {}
        }
    }
}
