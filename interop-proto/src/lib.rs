#![forbid(unsafe_code)]

pub use self::call::{Call, Reply, RequestId};
pub use self::catalog::{OperationKind, canonical_payload, list_operations};
pub use self::object::{HostId, ObjectId, ObjectRef, ParseIdError};
pub use self::payload::{Payload, PayloadKindMismatch, PointPair};
pub use self::render::{
    BLANK, ONEWAY_SENTINEL, REFLECT_SENTINEL, SAME_OBJECT_MARKER, render, render_composite,
    render_figure_model,
};
pub use self::value::{FigureModel, Origin, Point, Rectangle, Size};

mod call;
mod catalog;
mod object;
mod payload;
pub mod proto;
mod render;
mod util;
mod value;
