use core::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::{ObjectRef, OperationKind, Payload};

/// Correlates a [`Reply`] with the request which produced it
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RequestId> for u64 {
    fn from(value: RequestId) -> Self {
        value.0
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A method invoked on a remote object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Call {
    /// Read the last recorded description
    Peek,
    /// Send a payload through one of the catalog operations
    Invoke {
        operation: OperationKind,
        payload: Payload,
    },
    /// Fire-and-forget call with no reply
    OnewayMethod,
    /// Ask the receiver to push the canonical payload of `kind` into `callback`
    #[serde(rename = "call")]
    Callback { callback: ObjectRef, kind: u32 },
    GetObject,
    ReflectObject { object: Option<ObjectRef> },
    /// The single method of the small probe object
    Probe { message: String },
}

impl Call {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Peek => "peek",
            Self::Invoke { operation, .. } => operation.method(),
            Self::OnewayMethod => "onewayMethod",
            Self::Callback { .. } => "call",
            Self::GetObject => "getObject",
            Self::ReflectObject { .. } => "reflectObject",
            Self::Probe { .. } => "probe",
        }
    }
}

/// The successful result of a [`Call`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Reply {
    Unit,
    Description(String),
    Object(Option<ObjectRef>),
}

#[cfg(test)]
mod tests {
    use claims::assert_ok_eq;

    use super::{Call, Reply};
    use crate::{HostId, ObjectId, ObjectRef, OperationKind, canonical_payload};

    #[test]
    fn call_json() {
        let callback = ObjectRef::new(HostId::from_raw(0xab), ObjectId::from_raw(3));
        let tests = [
            (Call::Peek, r#"{"method":"peek"}"#),
            (Call::OnewayMethod, r#"{"method":"onewayMethod"}"#),
            (Call::GetObject, r#"{"method":"getObject"}"#),
            (
                Call::Callback { callback, kind: 4 },
                r#"{"method":"call","callback":{"host":171,"id":3},"kind":4}"#,
            ),
            (
                Call::ReflectObject { object: None },
                r#"{"method":"reflectObject","object":null}"#,
            ),
            (
                Call::Invoke {
                    operation: OperationKind::Bool,
                    payload: canonical_payload(OperationKind::Bool),
                },
                r#"{"method":"invoke","operation":"bool","payload":{"type":"bool","args":[false,true]}}"#,
            ),
        ];

        for (call, expected) in tests {
            assert_ok_eq!(serde_json::to_string(&call), expected.to_owned());
            assert_ok_eq!(serde_json::from_str::<Call>(expected), call);
        }
    }

    #[test]
    fn reply_json() {
        assert_ok_eq!(serde_json::to_string(&Reply::Unit), r#"{"kind":"unit"}"#.to_owned());
        assert_ok_eq!(
            serde_json::to_string(&Reply::Description("sendBool(false,true)".to_owned())),
            r#"{"kind":"description","value":"sendBool(false,true)"}"#.to_owned()
        );
        assert_ok_eq!(
            serde_json::from_str::<Reply>(r#"{"kind":"object","value":null}"#),
            Reply::Object(None)
        );
    }

    #[test]
    fn names() {
        assert_eq!(Call::Peek.name(), "peek");
        assert_eq!(
            Call::Invoke {
                operation: OperationKind::SubclassedValue,
                payload: canonical_payload(OperationKind::SubclassedValue),
            }
            .name(),
            "sendValuePoint"
        );
    }
}
