//! Pushes canonical payloads into callback objects

use interop_proto::{ObjectRef, OperationKind, canonical_payload};
use tracing::{debug, warn};

use crate::{EchoStub, InvokeError, Transport};

/// Invoke the operation identified by `kind` on `callback`, carrying its canonical payload
///
/// Kinds which aren't known, or which can't be forwarded, are logged
/// and otherwise ignored.
///
/// # Errors
///
/// It returns an error if the call to `callback` fails, including the
/// callback itself faulting.
pub async fn dispatch(
    kind: u32,
    callback: ObjectRef,
    transport: &dyn Transport,
) -> Result<(), InvokeError> {
    let Some(operation) = OperationKind::from_code(kind).filter(|&operation| forwards(operation))
    else {
        warn!(kind, %callback, "not implemented");
        return Ok(());
    };

    debug!(%operation, %callback, "calling back");
    EchoStub::new(transport, callback)
        .invoke(operation, canonical_payload(operation))
        .await
}

/// Whether [`dispatch`] forwards `operation` to the callback
///
/// Object references aren't forwarded: the canonical payload doesn't
/// carry an object the callback could call.
#[must_use]
pub fn forwards(operation: OperationKind) -> bool {
    !matches!(operation, OperationKind::ObjectReference)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use claims::{assert_matches, assert_ok, assert_ok_eq};
    use interop_proto::{
        BLANK, Call, HostId, ObjectId, ObjectRef, OperationKind, Reply, canonical_payload,
        list_operations, render,
    };

    use super::{dispatch, forwards};
    use crate::{BoxFuture, EchoServer, Fault, InvokeError, Loopback, ObjectAdapter, Servant, Transport};

    #[tokio::test]
    async fn pushes_canonical_payloads() {
        let adapter = Arc::new(ObjectAdapter::new());
        let callback = Arc::new(EchoServer::new());
        let object = adapter.activate(Arc::clone(&callback) as _);
        let transport = Loopback::new(adapter);

        for operation in list_operations().filter(|&operation| forwards(operation)) {
            assert_ok!(dispatch(operation.code(), object, &transport).await);
            assert_ok_eq!(
                render(operation, &canonical_payload(operation)),
                callback.peek()
            );
        }
    }

    #[tokio::test]
    async fn unknown_kinds_are_ignored() {
        let adapter = Arc::new(ObjectAdapter::new());
        let callback = Arc::new(EchoServer::new());
        let object = adapter.activate(Arc::clone(&callback) as _);
        let transport = Loopback::new(adapter);

        assert_ok!(dispatch(u32::MAX, object, &transport).await);
        assert_ok!(dispatch(OperationKind::ObjectReference.code(), object, &transport).await);
        assert_eq!(callback.peek(), BLANK);

        // Nothing is sent, so even a dangling callback is fine
        let dangling = ObjectRef::new(HostId::from_raw(1), ObjectId::from_raw(1));
        assert_ok!(dispatch(u32::MAX, dangling, &transport).await);
    }

    #[derive(Debug)]
    struct Failing;

    impl Servant for Failing {
        fn dispatch<'a>(
            &'a self,
            call: Call,
            _transport: &'a dyn Transport,
        ) -> BoxFuture<'a, Result<Reply, Fault>> {
            Box::pin(async move { Err(Fault::UnsupportedCall(call.name())) })
        }
    }

    #[tokio::test]
    async fn callback_faults_propagate() {
        let adapter = Arc::new(ObjectAdapter::new());
        let object = adapter.activate(Arc::new(Failing));
        let transport = Loopback::new(adapter);

        assert_matches!(
            dispatch(OperationKind::Bool.code(), object, &transport).await,
            Err(InvokeError::RemoteFault(message)) if message == "`sendBool` is not supported by this object"
        );
    }
}
