#![forbid(unsafe_code)]

pub use self::address::ServerAddress;
pub use self::connection::{StreamingConnection, connect_tcp};

mod address;
mod connection;

pub mod error {
    pub use super::address::AddressError;
    pub use super::connection::ConnectionReadError;
}
