use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{FigureModel, ObjectRef, OperationKind, Point};

/// The arguments of a single operation
///
/// Exactly one variant is populated per operation. Which variants an
/// operation accepts is decided by [`OperationKind::accepts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum Payload {
    Bool(bool, bool),
    Char(u8, u8),
    Octet(u8, u8),
    Short(i16, i16),
    UShort(u16, u16),
    Long(i32, i32),
    ULong(u32, u32),
    LongLong(i64, i64),
    ULongLong(u64, u64),
    Float(f32, f32),
    Double(f64, f64),
    String(String, String),
    Sequence(Vec<String>, Vec<i32>),
    Value(Arc<Point>),
    Values(PointPair),
    Figure(Option<FigureModel>),
    Object(Option<ObjectRef>, String),
}

/// Two points which may be the very same shared value
///
/// On the wire the second point is sent as an indirection to the first
/// one when both are the same value, so the receiver rebuilds a single
/// shared [`Point`] instead of two equal copies.
#[derive(Debug, Clone, PartialEq)]
pub struct PointPair {
    pub first: Arc<Point>,
    pub second: Arc<Point>,
}

/// An operation was invoked with a payload it cannot carry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("operation {operation} cannot carry a `{payload}` payload")]
pub struct PayloadKindMismatch {
    pub operation: OperationKind,
    pub payload: &'static str,
}

impl Payload {
    /// The name of the populated variant
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Bool(..) => "bool",
            Self::Char(..) => "char",
            Self::Octet(..) => "octet",
            Self::Short(..) => "short",
            Self::UShort(..) => "ushort",
            Self::Long(..) => "long",
            Self::ULong(..) => "ulong",
            Self::LongLong(..) => "long_long",
            Self::ULongLong(..) => "ulong_long",
            Self::Float(..) => "float",
            Self::Double(..) => "double",
            Self::String(..) => "string",
            Self::Sequence(..) => "sequence",
            Self::Value(_) => "value",
            Self::Values(_) => "values",
            Self::Figure(_) => "figure",
            Self::Object(..) => "object",
        }
    }
}

impl PointPair {
    #[must_use]
    pub fn new(first: Arc<Point>, second: Arc<Point>) -> Self {
        Self { first, second }
    }

    /// Build a pair whose two members are the same value
    #[must_use]
    pub fn shared(point: Point) -> Self {
        let point = Arc::new(point);
        Self {
            first: Arc::clone(&point),
            second: point,
        }
    }

    #[must_use]
    pub fn is_same_object(&self) -> bool {
        Arc::ptr_eq(&self.first, &self.second)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum SlotRef<'a> {
    Value(&'a Point),
    Indirect(u32),
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum Slot {
    Value(Point),
    Indirect(u32),
}

impl Serialize for PointPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let second = if self.is_same_object() {
            SlotRef::Indirect(0)
        } else {
            SlotRef::Value(&self.second)
        };
        (SlotRef::Value(&self.first), second).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PointPair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (first, second) = <(Slot, Slot)>::deserialize(deserializer)?;
        let Slot::Value(first) = first else {
            return Err(de::Error::custom("the first value cannot be an indirection"));
        };

        let first = Arc::new(first);
        let second = match second {
            Slot::Value(second) => Arc::new(second),
            Slot::Indirect(0) => Arc::clone(&first),
            Slot::Indirect(index) => {
                return Err(de::Error::custom(format_args!(
                    "indirection to unknown value {index}"
                )));
            }
        };
        Ok(Self { first, second })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use claims::{assert_err, assert_matches};

    use super::{Payload, PointPair};
    use crate::Point;

    #[test]
    fn shared_pair_survives_serialization() {
        let pair = PointPair::shared(Point::new(1, 1));
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, r#"[{"value":{"x":1,"y":1}},{"indirect":0}]"#);

        let decoded = serde_json::from_str::<PointPair>(&json).unwrap();
        assert!(decoded.is_same_object());
        assert_eq!(decoded, pair);
    }

    #[test]
    fn distinct_equal_pair_stays_distinct() {
        let pair = PointPair::new(Arc::new(Point::new(1, 1)), Arc::new(Point::new(1, 1)));
        assert!(!pair.is_same_object());

        let json = serde_json::to_string(&pair).unwrap();
        let decoded = serde_json::from_str::<PointPair>(&json).unwrap();
        assert!(!decoded.is_same_object());
        assert_eq!(decoded.first, decoded.second);
    }

    #[test]
    fn reject_bad_indirections() {
        assert_err!(serde_json::from_str::<PointPair>(
            r#"[{"indirect":0},{"indirect":0}]"#
        ));
        assert_err!(serde_json::from_str::<PointPair>(
            r#"[{"value":{"x":1,"y":1}},{"indirect":1}]"#
        ));
    }

    #[test]
    fn boundary_values_survive_serialization() {
        let payloads = [
            Payload::LongLong(i64::MIN, i64::MAX),
            Payload::ULongLong(0, u64::MAX),
            Payload::Float(1.175_49e-38, 3.402_82e38),
            Payload::Double(4.940_66e-324, 1.797_69e308),
        ];
        for payload in payloads {
            let json = serde_json::to_vec(&payload).unwrap();
            assert_eq!(serde_json::from_slice::<Payload>(&json).unwrap(), payload);
        }
    }

    #[test]
    fn named_point_keeps_its_name() {
        let payload = Payload::Value(Arc::new(Point::named(40, 50, "foo")));
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            json,
            r#"{"type":"value","args":{"x":40,"y":50,"name":"foo"}}"#
        );
        assert_matches!(
            serde_json::from_str::<Payload>(&json).unwrap(),
            Payload::Value(point) if point.is_named()
        );
    }
}
