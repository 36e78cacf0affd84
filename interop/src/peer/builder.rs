use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use interop_net::{ServerAddress, connect_tcp};
use interop_proto::ObjectRef;
use tokio::{
    net::{TcpListener, ToSocketAddrs},
    time::timeout,
};
use tracing::debug;

#[cfg(feature = "from-env")]
use super::from_env::FromEnv;
use super::{Acceptor, ConnectError, Peer};
use crate::ObjectAdapter;

/// A builder for [`Peer`] and [`Acceptor`]
///
/// Obtained from [`Peer::builder`].
#[derive(Debug, Clone)]
pub struct PeerBuilder {
    pub(crate) tcp_nodelay: bool,
    pub(crate) connect_timeout: Duration,
    pub(crate) keepalive_interval: Duration,
    pub(crate) address_file: PathBuf,
}

impl PeerBuilder {
    pub(super) fn new() -> Self {
        Self {
            tcp_nodelay: true,
            connect_timeout: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(10),
            address_file: PathBuf::from("IOR.txt"),
        }
    }

    /// Construct [`PeerBuilder`] from environment variables
    ///
    /// Reads the following environment variables into [`PeerBuilder`],
    /// falling back to the defaults for missing ones:
    ///
    /// * `INTEROP_ADDRESS_FILE`: see [`PeerBuilder::address_file`]
    /// * `INTEROP_CONNECT_TIMEOUT_MS`: see [`PeerBuilder::connect_timeout`]
    /// * `INTEROP_TCP_NODELAY`: see [`PeerBuilder::tcp_nodelay`]
    ///
    /// # Panics
    ///
    /// It panics if it is not possible to get the environment variables
    /// or one of them has an invalid value.
    #[cfg(feature = "from-env")]
    #[must_use]
    pub fn from_env() -> Self {
        let env = envy::prefixed("INTEROP_")
            .from_env::<FromEnv>()
            .expect("FromEnv deserialization error");

        Self::new().apply_env(env)
    }

    #[cfg(feature = "from-env")]
    pub(super) fn apply_env(mut self, env: FromEnv) -> Self {
        if let Some(address_file) = env.address_file {
            self = self.address_file(address_file);
        }
        if let Some(connect_timeout_ms) = env.connect_timeout_ms {
            self = self.connect_timeout(Duration::from_millis(connect_timeout_ms));
        }
        if let Some(tcp_nodelay) = env.tcp_nodelay {
            self = self.tcp_nodelay(tcp_nodelay);
        }

        self
    }

    /// Controls the Nagle algorithm for kernel-level bandwidth vs latency optimization
    ///
    /// Setting this to `true` disables Nagle's algorithm. Calls of this
    /// harness are small and sequential, so latency matters most.
    ///
    /// Default: true
    #[must_use]
    pub fn tcp_nodelay(mut self, tcp_nodelay: bool) -> Self {
        self.tcp_nodelay = tcp_nodelay;
        self
    }

    /// Define the timeout for TCP connect
    ///
    /// Default: 30 seconds
    #[must_use]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Define how long a connection may stay silent before it is pinged
    ///
    /// The connection is considered dead after two unanswered pings.
    ///
    /// Default: 10 seconds
    #[must_use]
    pub fn keepalive_interval(mut self, keepalive_interval: Duration) -> Self {
        self.keepalive_interval = keepalive_interval;
        self
    }

    /// Define the file the server publishes its address to and the client reads it from
    ///
    /// Default: `IOR.txt`
    #[must_use]
    pub fn address_file(mut self, address_file: impl Into<PathBuf>) -> Self {
        self.address_file = address_file.into();
        self
    }

    #[must_use]
    pub fn get_address_file(&self) -> &Path {
        &self.address_file
    }

    /// Connect to the server at `address`
    ///
    /// # Errors
    ///
    /// It returns an error if the connection fails or times out.
    pub async fn connect(
        &self,
        address: &ServerAddress,
        adapter: Arc<ObjectAdapter>,
    ) -> Result<Peer, ConnectError> {
        let socket = timeout(self.connect_timeout, async {
            let mut last_err = None;
            for addr in address.lookup().await? {
                match connect_tcp(addr, self.tcp_nodelay).await {
                    Ok(socket) => return Ok(socket),
                    Err(err) => {
                        debug!(%addr, %err, "connect attempt failed");
                        last_err = Some(err);
                    }
                }
            }
            Err(last_err.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "no address to connect to")
            }))
        })
        .await
        .map_err(|_elapsed| ConnectError::TimedOut)?
        .map_err(ConnectError::Io)?;

        Ok(Peer::from_stream(socket, adapter, self.keepalive_interval))
    }

    /// Read the address file, then connect to the server it names
    ///
    /// Returns the connection along with the server's root object.
    ///
    /// # Errors
    ///
    /// It returns an error if the file doesn't contain an address or the connection fails.
    pub async fn connect_from_file(
        &self,
        adapter: Arc<ObjectAdapter>,
    ) -> Result<(Peer, ObjectRef), ConnectError> {
        let address = ServerAddress::read_from(&self.address_file)
            .await
            .map_err(ConnectError::Address)?;
        debug!(%address, "read server address");
        let peer = self.connect(&address, adapter).await?;
        Ok((peer, address.object()))
    }

    /// Listen for connections on `addr`
    ///
    /// # Errors
    ///
    /// It returns an error if binding fails.
    pub async fn bind(
        self,
        addr: impl ToSocketAddrs,
        adapter: Arc<ObjectAdapter>,
    ) -> io::Result<Acceptor> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Acceptor::new(listener, adapter, self))
    }
}

impl Default for PeerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
