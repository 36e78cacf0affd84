use std::{
    fmt::{self, Display},
    io,
    net::{IpAddr, SocketAddr},
    path::Path,
    str::FromStr,
};

use interop_proto::{HostId, ObjectId, ObjectRef};
use url::{Host, Url};

const SCHEME: &str = "interop";

/// Locates the root object of a server
///
/// Its textual form is `interop://{host}:{port}/{host-id}/{object-id}`.
/// The server writes it to the address file at startup, the client
/// reads it back before its first call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    host: String,
    port: u16,
    object: ObjectRef,
}

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("io error")]
    Io(#[source] io::Error),
    #[error("invalid url")]
    Url(#[source] url::ParseError),
    #[error("unsupported scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("missing host")]
    MissingHost,
    #[error("missing port")]
    MissingPort,
    #[error("invalid object path")]
    InvalidObject,
}

impl ServerAddress {
    #[must_use]
    pub fn new(host: String, port: u16, object: ObjectRef) -> Self {
        Self { host, port, object }
    }

    #[must_use]
    pub fn from_socket_addr(addr: SocketAddr, object: ObjectRef) -> Self {
        Self::new(addr.ip().to_string(), addr.port(), object)
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn object(&self) -> ObjectRef {
        self.object
    }

    /// Resolve the host part into socket addresses
    ///
    /// # Errors
    ///
    /// It returns an error if the DNS lookup fails.
    pub async fn lookup(&self) -> io::Result<Vec<SocketAddr>> {
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, self.port)]);
        }

        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map(Iterator::collect)
    }

    /// Write the address to `path`, replacing its content
    ///
    /// # Errors
    ///
    /// It returns an error if the file can't be written.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<(), AddressError> {
        tokio::fs::write(path, format!("{self}\n"))
            .await
            .map_err(AddressError::Io)
    }

    /// Read back an address written by [`ServerAddress::write_to`]
    ///
    /// # Errors
    ///
    /// It returns an error if the file can't be read or doesn't contain an address.
    pub async fn read_from(path: impl AsRef<Path>) -> Result<Self, AddressError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(AddressError::Io)?;
        contents.trim().parse()
    }
}

impl FromStr for ServerAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s).map_err(AddressError::Url)?;
        if url.scheme() != SCHEME {
            return Err(AddressError::UnsupportedScheme(url.scheme().to_owned()));
        }

        let host = match url.host().ok_or(AddressError::MissingHost)? {
            Host::Domain(domain) => domain.to_owned(),
            Host::Ipv4(ip) => ip.to_string(),
            Host::Ipv6(ip) => ip.to_string(),
        };
        let port = url.port().ok_or(AddressError::MissingPort)?;

        let mut segments = url.path_segments().ok_or(AddressError::InvalidObject)?;
        let (Some(host_id), Some(object_id), None) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(AddressError::InvalidObject);
        };
        let host_id = host_id
            .parse::<HostId>()
            .map_err(|_| AddressError::InvalidObject)?;
        let object_id = object_id
            .parse::<ObjectId>()
            .map_err(|_| AddressError::InvalidObject)?;

        Ok(Self::new(host, port, ObjectRef::new(host_id, object_id)))
    }
}

impl Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { host, port, object } = self;
        if host.contains(':') {
            write!(f, "{SCHEME}://[{host}]:{port}/{object}")
        } else {
            write!(f, "{SCHEME}://{host}:{port}/{object}")
        }
    }
}
