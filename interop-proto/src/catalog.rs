use core::fmt::{self, Display};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{FigureModel, Payload, PayloadKindMismatch, Point, PointPair, Rectangle, Size};

/// The kinds of operation exercised by the harness
///
/// The declaration order is the catalog order and also defines the numeric
/// code used when a kind travels as an argument (see [`OperationKind::code`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Bool,
    Char,
    Octet,
    Short,
    UShort,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    String,
    Sequence,
    Value,
    SubclassedValue,
    ValueWithNull,
    ValuePair,
    ObjectReference,
}

impl OperationKind {
    pub const ALL: [Self; 18] = [
        Self::Bool,
        Self::Char,
        Self::Octet,
        Self::Short,
        Self::UShort,
        Self::Long,
        Self::ULong,
        Self::LongLong,
        Self::ULongLong,
        Self::Float,
        Self::Double,
        Self::String,
        Self::Sequence,
        Self::Value,
        Self::SubclassedValue,
        Self::ValueWithNull,
        Self::ValuePair,
        Self::ObjectReference,
    ];

    /// Human readable name of the kind
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool-pair",
            Self::Char => "char-pair",
            Self::Octet => "octet-pair",
            Self::Short => "short-pair",
            Self::UShort => "ushort-pair",
            Self::Long => "long-pair",
            Self::ULong => "ulong-pair",
            Self::LongLong => "long-long-pair",
            Self::ULongLong => "ulong-long-pair",
            Self::Float => "float-pair",
            Self::Double => "double-pair",
            Self::String => "string-pair",
            Self::Sequence => "sequence-pair",
            Self::Value => "value-object",
            Self::SubclassedValue => "value-object-subclassed",
            Self::ValueWithNull => "value-object-with-null-field",
            Self::ValuePair => "value-object-pair",
            Self::ObjectReference => "object-reference",
        }
    }

    /// Name of the remote method carrying this kind
    #[must_use]
    pub fn method(self) -> &'static str {
        match self {
            Self::Bool => "sendBool",
            Self::Char => "sendChar",
            Self::Octet => "sendOctet",
            Self::Short => "sendShort",
            Self::UShort => "sendUShort",
            Self::Long => "sendLong",
            Self::ULong => "sendULong",
            Self::LongLong => "sendLongLong",
            Self::ULongLong => "sendULongLong",
            Self::Float => "sendFloat",
            Self::Double => "sendDouble",
            Self::String => "sendString",
            Self::Sequence => "sendSequence",
            Self::Value | Self::SubclassedValue => "sendValuePoint",
            Self::ValueWithNull => "setFigureModel",
            Self::ValuePair => "sendValuePoints",
            Self::ObjectReference => "sendObject",
        }
    }

    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index))
            .copied()
    }

    /// Whether `payload` has the variant this kind is declared with
    #[must_use]
    pub fn accepts(self, payload: &Payload) -> bool {
        matches!(
            (self, payload),
            (Self::Bool, Payload::Bool(..))
                | (Self::Char, Payload::Char(..))
                | (Self::Octet, Payload::Octet(..))
                | (Self::Short, Payload::Short(..))
                | (Self::UShort, Payload::UShort(..))
                | (Self::Long, Payload::Long(..))
                | (Self::ULong, Payload::ULong(..))
                | (Self::LongLong, Payload::LongLong(..))
                | (Self::ULongLong, Payload::ULongLong(..))
                | (Self::Float, Payload::Float(..))
                | (Self::Double, Payload::Double(..))
                | (Self::String, Payload::String(..))
                | (Self::Sequence, Payload::Sequence(..))
                | (Self::Value | Self::SubclassedValue, Payload::Value(_))
                | (Self::ValueWithNull, Payload::Figure(_))
                | (Self::ValuePair, Payload::Values(_))
                | (Self::ObjectReference, Payload::Object(..))
        )
    }

    /// Like [`OperationKind::accepts`], describing the mismatch
    ///
    /// # Errors
    ///
    /// It returns an error if `payload` isn't of the variant this kind is declared with.
    pub fn check(self, payload: &Payload) -> Result<(), PayloadKindMismatch> {
        if self.accepts(payload) {
            Ok(())
        } else {
            Err(PayloadKindMismatch {
                operation: self,
                payload: payload.shape(),
            })
        }
    }
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The catalog of operations, in the order they are exercised
pub fn list_operations() -> impl Iterator<Item = OperationKind> + Clone {
    OperationKind::ALL.into_iter()
}

/// The boundary-value payload used to exercise `operation`
#[must_use]
pub fn canonical_payload(operation: OperationKind) -> Payload {
    match operation {
        OperationKind::Bool => Payload::Bool(false, true),
        OperationKind::Char => Payload::Char(0, u8::MAX),
        OperationKind::Octet => Payload::Octet(0, u8::MAX),
        OperationKind::Short => Payload::Short(i16::MIN, i16::MAX),
        OperationKind::UShort => Payload::UShort(0, u16::MAX),
        OperationKind::Long => Payload::Long(i32::MIN, i32::MAX),
        OperationKind::ULong => Payload::ULong(0, u32::MAX),
        OperationKind::LongLong => Payload::LongLong(i64::MIN, i64::MAX),
        OperationKind::ULongLong => Payload::ULongLong(0, u64::MAX),
        OperationKind::Float => Payload::Float(1.175_49e-38, 3.402_82e38),
        OperationKind::Double => Payload::Double(4.940_66e-324, 1.797_69e308),
        OperationKind::String => Payload::String("hello".to_owned(), "you".to_owned()),
        OperationKind::Sequence => Payload::Sequence(
            vec!["hello".to_owned(), "you".to_owned()],
            vec![1138, 1984, 2001],
        ),
        OperationKind::Value => Payload::Value(Arc::new(Point::new(20, 30))),
        OperationKind::SubclassedValue => Payload::Value(Arc::new(Point::named(40, 50, "foo"))),
        OperationKind::ValueWithNull => Payload::Figure(Some(FigureModel {
            data: vec![Some(Rectangle {
                id: 10,
                origin: None,
                size: Some(Size {
                    width: 30,
                    height: 40,
                }),
            })],
        })),
        OperationKind::ValuePair => Payload::Values(PointPair::shared(Point::new(1, 1))),
        OperationKind::ObjectReference => Payload::Object(None, "hello".to_owned()),
    }
}
