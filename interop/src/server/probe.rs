use std::sync::Arc;

use interop_proto::{Call, Reply};
use tracing::debug;

use super::ServerState;
use crate::{BoxFuture, Fault, Servant, Transport};

/// The small object passed around by the object reference operations
///
/// Its only method stores the received message as the description of
/// the state it shares with an [`EchoServer`].
///
/// [`EchoServer`]: crate::EchoServer
#[derive(Debug)]
pub struct Probe {
    state: Arc<ServerState>,
}

impl Probe {
    #[must_use]
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }
}

impl Servant for Probe {
    fn dispatch<'a>(
        &'a self,
        call: Call,
        _transport: &'a dyn Transport,
    ) -> BoxFuture<'a, Result<Reply, Fault>> {
        Box::pin(async move {
            match call {
                Call::Probe { message } => {
                    debug!(description = %message, "probe called");
                    self.state.record(message);
                    Ok(Reply::Unit)
                }
                call => Err(Fault::UnsupportedCall(call.name())),
            }
        })
    }
}
