//! A bidirectional RPC conformance harness
//!
//! An [`EchoServer`] records a description of every call it receives.
//! A [`ConformanceClient`] sends it the whole operation catalog, has it
//! call back an echo server of its own, and checks every recorded
//! description against the expected rendering.
//!
//! Calls travel through a [`Transport`]: [`Loopback`] keeps them in
//! process, [`Peer`] carries them over a TCP connection usable in both
//! directions.

#![forbid(unsafe_code)]

pub use self::adapter::ObjectAdapter;
pub use self::conformance::{ConformanceClient, Report, RunState, Step, Verified};
pub use self::error::{HarnessError, InvokeError};
pub use self::future::BoxFuture;
pub use self::loopback::Loopback;
pub use self::peer::{Acceptor, ConnectError, Peer, PeerBuilder};
pub use self::servant::{Fault, Servant};
pub use self::server::{EchoServer, Probe, ServerState};
pub use self::stub::{EchoStub, ProbeStub};
pub use self::transport::Transport;

pub use interop_net as net;
pub use interop_proto as proto;

mod adapter;
mod conformance;
pub mod dispatcher;
mod error;
mod future;
mod loopback;
mod peer;
mod servant;
mod server;
mod stub;
mod transport;
