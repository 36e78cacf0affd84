//! The textual templates used to compare what was sent with what was received

use core::fmt::{self, Display, Write as _};

use crate::{FigureModel, OperationKind, Payload, PayloadKindMismatch};

/// The description held by a server which hasn't received anything yet
pub const BLANK: &str = "THIS PAGE INTENTIONALLY LEFT BLANK";
/// The description recorded by a one-way call
pub const ONEWAY_SENTINEL: &str = "onewayMethod";
/// The description recorded by an object reflection
pub const REFLECT_SENTINEL: &str = "reflectObject(...)";
/// Appended to a point pair rendering when both points are one shared value
pub const SAME_OBJECT_MARKER: &str = " // same object";

/// Render the description of `operation` invoked with `payload`
///
/// # Errors
///
/// It returns an error if `payload` isn't of the variant declared by `operation`.
pub fn render(operation: OperationKind, payload: &Payload) -> Result<String, PayloadKindMismatch> {
    operation.check(payload)?;
    Ok(Rendered { operation, payload }.to_string())
}

/// Render the value part of a composite, `null` when absent
#[must_use]
pub fn render_figure_model(model: Option<&FigureModel>) -> String {
    OptionalModel(model).to_string()
}

/// Render the full description of setting a composite value
#[must_use]
pub fn render_composite(model: Option<&FigureModel>) -> String {
    format!(
        "{}({})",
        OperationKind::ValueWithNull.method(),
        OptionalModel(model)
    )
}

struct Rendered<'a> {
    operation: OperationKind,
    payload: &'a Payload,
}

impl Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = self.operation.method();
        match self.payload {
            Payload::Bool(v0, v1) => write!(f, "{method}({v0},{v1})"),
            Payload::Char(v0, v1) | Payload::Octet(v0, v1) => write!(f, "{method}({v0},{v1})"),
            Payload::Short(v0, v1) => write!(f, "{method}({v0},{v1})"),
            Payload::UShort(v0, v1) => write!(f, "{method}({v0},{v1})"),
            Payload::Long(v0, v1) => write!(f, "{method}({v0},{v1})"),
            Payload::ULong(v0, v1) => write!(f, "{method}({v0},{v1})"),
            Payload::LongLong(v0, v1) => write!(f, "{method}({v0},{v1})"),
            Payload::ULongLong(v0, v1) => write!(f, "{method}({v0},{v1})"),
            Payload::Float(v0, v1) => write!(
                f,
                "{method}({},{})",
                General(f64::from(*v0)),
                General(f64::from(*v1))
            ),
            Payload::Double(v0, v1) => write!(f, "{method}({},{})", General(*v0), General(*v1)),
            Payload::String(v0, v1) => write!(f, "{method}({v0},{v1})"),
            Payload::Sequence(strings, longs) => {
                write!(f, "{method}([")?;
                for s in strings {
                    write!(f, "{s},")?;
                }
                f.write_str("],[")?;
                for l in longs {
                    write!(f, "{l},")?;
                }
                f.write_str("])")
            }
            Payload::Value(point) => write!(f, "{method}({point})"),
            Payload::Values(pair) => {
                write!(
                    f,
                    "{method}(Point({},{}),Point({},{}))",
                    pair.first.x, pair.first.y, pair.second.x, pair.second.y
                )?;
                if pair.is_same_object() {
                    f.write_str(SAME_OBJECT_MARKER)?;
                }
                Ok(())
            }
            Payload::Figure(model) => write!(f, "{method}({})", OptionalModel(model.as_ref())),
            Payload::Object(_object, message) => write!(f, "{method}(..., \"{message}\")"),
        }
    }
}

struct OptionalModel<'a>(Option<&'a FigureModel>);

impl Display for OptionalModel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(model) => Display::fmt(model, f),
            None => f.write_str("null"),
        }
    }
}

/// `printf("%g")` style formatting with six significant digits
struct General(f64);

impl General {
    const PRECISION: i32 = 6;
    const MANTISSA_DECIMALS: usize = 5;
}

impl Display for General {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        if value.is_nan() {
            return f.write_str("nan");
        }
        if value.is_infinite() {
            return f.write_str(if value < 0.0 { "-inf" } else { "inf" });
        }
        if value == 0.0 {
            return f.write_str(if value.is_sign_negative() { "-0" } else { "0" });
        }

        // The exponent has to be taken after rounding to the target precision
        let mut scientific = String::new();
        write!(scientific, "{:.*e}", Self::MANTISSA_DECIMALS, value)?;
        let Some((mantissa, exponent)) = scientific.split_once('e') else {
            return f.write_str(&scientific);
        };
        let Ok(exponent) = exponent.parse::<i32>() else {
            return f.write_str(&scientific);
        };

        if exponent < -4 || exponent >= Self::PRECISION {
            let sign = if exponent < 0 { '-' } else { '+' };
            write!(
                f,
                "{}e{sign}{:02}",
                trim_fraction(mantissa),
                exponent.unsigned_abs()
            )
        } else {
            let decimals = usize::try_from(Self::PRECISION - 1 - exponent).unwrap_or(0);
            let fixed = format!("{value:.decimals$}");
            f.write_str(trim_fraction(&fixed))
        }
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use claims::{assert_err_eq, assert_ok_eq};

    use super::{General, render, render_composite, render_figure_model};
    use crate::{
        FigureModel, OperationKind, Payload, PayloadKindMismatch, Point, PointPair,
        canonical_payload, list_operations,
    };

    #[test]
    fn canonical_renderings() {
        let expected = [
            "sendBool(false,true)",
            "sendChar(0,255)",
            "sendOctet(0,255)",
            "sendShort(-32768,32767)",
            "sendUShort(0,65535)",
            "sendLong(-2147483648,2147483647)",
            "sendULong(0,4294967295)",
            "sendLongLong(-9223372036854775808,9223372036854775807)",
            "sendULongLong(0,18446744073709551615)",
            "sendFloat(1.17549e-38,3.40282e+38)",
            "sendDouble(4.94066e-324,1.79769e+308)",
            "sendString(hello,you)",
            "sendSequence([hello,you,],[1138,1984,2001,])",
            "sendValuePoint(Point(20,30))",
            "sendValuePoint(NamedPoint(40,50,\"foo\"))",
            "setFigureModel({data:[Rectangle({origin:null,{width:30,height:40},}),]})",
            "sendValuePoints(Point(1,1),Point(1,1)) // same object",
            "sendObject(..., \"hello\")",
        ];
        assert_eq!(expected.len(), OperationKind::ALL.len());

        for (operation, expected) in list_operations().zip(expected) {
            assert_ok_eq!(
                render(operation, &canonical_payload(operation)),
                expected.to_owned()
            );
        }
    }

    #[test]
    fn same_object_marker_needs_identity() {
        let distinct = Payload::Values(PointPair::new(
            Arc::new(Point::new(1, 1)),
            Arc::new(Point::new(1, 1)),
        ));
        assert_ok_eq!(
            render(OperationKind::ValuePair, &distinct),
            "sendValuePoints(Point(1,1),Point(1,1))".to_owned()
        );

        let named = Payload::Values(PointPair::shared(Point::named(2, 3, "n")));
        assert_ok_eq!(
            render(OperationKind::ValuePair, &named),
            "sendValuePoints(Point(2,3),Point(2,3)) // same object".to_owned()
        );
    }

    #[test]
    fn absent_composite() {
        assert_eq!(render_figure_model(None), "null");
        assert_eq!(render_composite(None), "setFigureModel(null)");
        assert_ok_eq!(
            render(OperationKind::ValueWithNull, &Payload::Figure(None)),
            "setFigureModel(null)".to_owned()
        );
        assert_eq!(
            render_composite(Some(&FigureModel { data: vec![None] })),
            "setFigureModel({data:[null,]})"
        );
    }

    #[test]
    fn empty_sequences() {
        assert_ok_eq!(
            render(
                OperationKind::Sequence,
                &Payload::Sequence(Vec::new(), Vec::new())
            ),
            "sendSequence([],[])".to_owned()
        );
    }

    #[test]
    fn mismatched_payload() {
        assert_err_eq!(
            render(OperationKind::Bool, &Payload::Long(1, 2)),
            PayloadKindMismatch {
                operation: OperationKind::Bool,
                payload: "long",
            }
        );
        assert_err_eq!(
            render(OperationKind::ValueWithNull, &Payload::Object(None, String::new())),
            PayloadKindMismatch {
                operation: OperationKind::ValueWithNull,
                payload: "object",
            }
        );
    }

    #[test]
    fn general_float_format() {
        let tests: &[(f64, &str)] = &[
            (0.0, "0"),
            (-0.0, "-0"),
            (1.0, "1"),
            (1.5, "1.5"),
            (-2.25, "-2.25"),
            (3.141_592_653_5, "3.14159"),
            (100_000.0, "100000"),
            (999_999.0, "999999"),
            (999_999.7, "1e+06"),
            (1_000_000.0, "1e+06"),
            (0.000_1, "0.0001"),
            (0.000_012_345, "1.2345e-05"),
            (1.797_69e308, "1.79769e+308"),
            (4.940_66e-324, "4.94066e-324"),
            (f64::NAN, "nan"),
            (f64::NEG_INFINITY, "-inf"),
        ];

        for &(value, expected) in tests {
            assert_eq!(General(value).to_string(), expected, "value {value:e}");
        }
    }
}
