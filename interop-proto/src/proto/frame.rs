use crate::{Call, ObjectRef, Reply, RequestId};

/// A single unit exchanged between two peers
///
/// Both ends of a connection may send every kind of frame, since
/// callbacks travel over the same connection as the requests causing them.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Request {
        id: RequestId,
        target: ObjectRef,
        call: Call,
    },
    Oneway {
        target: ObjectRef,
        call: Call,
    },
    Reply {
        id: RequestId,
        reply: Reply,
    },
    Fault {
        id: RequestId,
        message: String,
    },
    Ping,
    Pong,
}
