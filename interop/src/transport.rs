use std::fmt::Debug;

use interop_proto::{Call, ObjectRef, Reply};

use crate::{BoxFuture, InvokeError};

/// Delivers calls to objects, wherever they are hosted
///
/// Implementations decide whether `target` is served in-process or
/// has to travel over a connection.
pub trait Transport: Send + Sync + Debug {
    /// Invoke `call` on `target` and wait for its reply
    fn invoke(&self, target: ObjectRef, call: Call) -> BoxFuture<'_, Result<Reply, InvokeError>>;

    /// Deliver `call` to `target` without waiting for it to complete
    ///
    /// Delivery is at-most-once and unordered with respect to other
    /// one-way calls. An error only reports a call which couldn't even
    /// be handed over.
    ///
    /// # Errors
    ///
    /// It returns an error if the call can't be handed over.
    fn send_oneway(&self, target: ObjectRef, call: Call) -> Result<(), InvokeError>;
}
