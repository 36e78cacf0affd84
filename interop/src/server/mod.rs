use std::sync::{Arc, Mutex, PoisonError};

use interop_proto::{
    Call, FigureModel, ObjectRef, ONEWAY_SENTINEL, OperationKind, Payload, PayloadKindMismatch,
    REFLECT_SENTINEL, Reply, render, render_composite,
};
use tracing::debug;

pub use self::probe::Probe;
pub use self::state::ServerState;
use crate::{BoxFuture, Fault, Servant, Transport, dispatcher};

mod probe;
mod state;

/// Records a description of every call it receives
///
/// The last description can be read back with [`EchoServer::peek`],
/// locally or through [`Call::Peek`].
#[derive(Debug)]
pub struct EchoServer {
    state: Arc<ServerState>,
    stored_object: Mutex<Option<ObjectRef>>,
}

impl EchoServer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(Arc::new(ServerState::new()))
    }

    /// Create a server recording into `state`, which may be shared with a [`Probe`]
    #[must_use]
    pub fn with_state(state: Arc<ServerState>) -> Self {
        Self {
            state,
            stored_object: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Store the reference returned by [`EchoServer::get_object`]
    pub fn store_object(&self, object: Option<ObjectRef>) {
        *self
            .stored_object
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = object;
    }

    /// Record the description of `operation` carrying `payload`
    ///
    /// # Errors
    ///
    /// It returns an error if `payload` isn't of the variant declared by
    /// `operation`. The recorded description is left untouched.
    pub fn invoke(
        &self,
        operation: OperationKind,
        payload: &Payload,
    ) -> Result<(), PayloadKindMismatch> {
        let description = render(operation, payload)?;
        debug!(%operation, description, "invoked");
        self.state.record(description);
        Ok(())
    }

    #[must_use]
    pub fn peek(&self) -> String {
        self.state.peek()
    }

    pub fn oneway_method(&self) {
        debug!("onewayMethod");
        self.state.record(ONEWAY_SENTINEL.to_owned());
    }

    pub fn set_composite_value(&self, model: Option<&FigureModel>) {
        let description = render_composite(model);
        debug!(description, "composite value set");
        self.state.record(description);
    }

    #[must_use]
    pub fn get_object(&self) -> Option<ObjectRef> {
        *self
            .stored_object
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the reflection sentinel and give `object` back
    pub fn reflect_object(&self, object: Option<ObjectRef>) -> Option<ObjectRef> {
        debug!(?object, "reflectObject");
        self.state.record(REFLECT_SENTINEL.to_owned());
        object
    }
}

impl Default for EchoServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Servant for EchoServer {
    fn dispatch<'a>(
        &'a self,
        call: Call,
        transport: &'a dyn Transport,
    ) -> BoxFuture<'a, Result<Reply, Fault>> {
        Box::pin(async move {
            match call {
                Call::Peek => Ok(Reply::Description(self.peek())),
                Call::Invoke { operation, payload } => {
                    self.invoke(operation, &payload)?;
                    if let Payload::Object(Some(object), message) = payload {
                        transport
                            .invoke(object, Call::Probe { message })
                            .await
                            .map_err(Fault::Forward)?;
                    }
                    Ok(Reply::Unit)
                }
                Call::OnewayMethod => {
                    self.oneway_method();
                    Ok(Reply::Unit)
                }
                Call::Callback { callback, kind } => {
                    dispatcher::dispatch(kind, callback, transport)
                        .await
                        .map_err(Fault::Forward)?;
                    Ok(Reply::Unit)
                }
                Call::GetObject => Ok(Reply::Object(self.get_object())),
                Call::ReflectObject { object } => Ok(Reply::Object(self.reflect_object(object))),
                Call::Probe { .. } => Err(Fault::UnsupportedCall("probe")),
            }
        })
    }
}
