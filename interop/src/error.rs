use interop_proto::{ObjectRef, PayloadKindMismatch};

use crate::conformance::Step;

/// An error encountered while invoking a remote object
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InvokeError {
    /// The connection is closed or was never established
    #[error("connection unavailable")]
    ConnectionUnavailable,
    /// No servant is registered for the object
    #[error("object {0} does not exist")]
    ObjectNotExist(ObjectRef),
    /// The call was never sent, its payload doesn't match the operation
    #[error("payload kind mismatch")]
    PayloadKindMismatch(#[from] PayloadKindMismatch),
    /// The servant failed while handling the call
    #[error("remote fault: {0}")]
    RemoteFault(String),
    /// The servant replied with something the caller doesn't expect
    #[error("unexpected reply to `{call}`")]
    UnexpectedReply { call: &'static str },
}

/// The error kinds a conformance run can end with
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HarnessError {
    /// The endpoint can't be reached, fatal to the run
    #[error("connection unavailable")]
    ConnectionUnavailable,
    /// An operation was given a payload of another variant
    #[error("payload kind mismatch")]
    PayloadKindMismatch(#[from] PayloadKindMismatch),
    /// What was observed differs from what was sent
    #[error("verification of {operation} failed: expected `{expected}`, observed `{observed}`")]
    VerificationMismatch {
        operation: Step,
        expected: String,
        observed: String,
    },
    /// A remote object, or a callback invoked on our behalf, failed
    #[error("remote fault: {0}")]
    RemoteFault(String),
}

impl From<InvokeError> for HarnessError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::ConnectionUnavailable => Self::ConnectionUnavailable,
            InvokeError::RemoteFault(message) => Self::RemoteFault(message),
            InvokeError::PayloadKindMismatch(mismatch) => Self::PayloadKindMismatch(mismatch),
            err @ (InvokeError::ObjectNotExist(_) | InvokeError::UnexpectedReply { .. }) => {
                Self::RemoteFault(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use claims::assert_matches;
    use interop_proto::{HostId, ObjectId, ObjectRef, OperationKind, PayloadKindMismatch};

    use super::{HarnessError, InvokeError};

    #[test]
    fn invoke_errors_map_to_harness_errors() {
        assert_matches!(
            HarnessError::from(InvokeError::ConnectionUnavailable),
            HarnessError::ConnectionUnavailable
        );
        assert_matches!(
            HarnessError::from(InvokeError::RemoteFault("boom".to_owned())),
            HarnessError::RemoteFault(message) if message == "boom"
        );

        let object = ObjectRef::new(HostId::from_raw(1), ObjectId::from_raw(2));
        assert_matches!(
            HarnessError::from(InvokeError::ObjectNotExist(object)),
            HarnessError::RemoteFault(message) if message == "object 0000000000000001/2 does not exist"
        );

        let mismatch = PayloadKindMismatch {
            operation: OperationKind::Bool,
            payload: "long",
        };
        assert_matches!(
            HarnessError::from(InvokeError::from(mismatch.clone())),
            HarnessError::PayloadKindMismatch(got) if got == mismatch
        );
    }
}
