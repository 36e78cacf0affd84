use std::fmt::Debug;

use interop_proto::{Call, PayloadKindMismatch, Reply};

use crate::{BoxFuture, InvokeError, Transport};

/// The implementation of an object hosted by an [`ObjectAdapter`]
///
/// `transport` is the one the call arrived through, to be used for
/// any call the servant makes on other objects.
///
/// [`ObjectAdapter`]: crate::ObjectAdapter
pub trait Servant: Send + Sync + Debug {
    fn dispatch<'a>(
        &'a self,
        call: Call,
        transport: &'a dyn Transport,
    ) -> BoxFuture<'a, Result<Reply, Fault>>;
}

/// A failure reported by a [`Servant`] back to the caller
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Fault {
    #[error(transparent)]
    PayloadKindMismatch(#[from] PayloadKindMismatch),
    #[error("`{0}` is not supported by this object")]
    UnsupportedCall(&'static str),
    #[error("forwarded call failed: {0}")]
    Forward(#[source] InvokeError),
}
