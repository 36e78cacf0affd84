use core::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A point valuetype
///
/// A point carrying a `name` is the subclassed `NamedPoint` flavour of the
/// value: it travels through the same operations as a plain point but
/// renders with its extra field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The origin of a [`Rectangle`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub x: i32,
    pub y: i32,
}

/// The size of a [`Rectangle`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// A figure whose nested values may each be absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    pub id: i32,
    pub origin: Option<Origin>,
    pub size: Option<Size>,
}

/// A composite value holding a sequence of optional figures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureModel {
    pub data: Vec<Option<Rectangle>>,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y, name: None }
    }

    #[must_use]
    pub fn named(x: i32, y: i32, name: impl Into<String>) -> Self {
        Self {
            x,
            y,
            name: Some(name.into()),
        }
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            None => write!(f, "Point({},{})", self.x, self.y),
            Some(name) => write!(f, "NamedPoint({},{},\"{name}\")", self.x, self.y),
        }
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{x:{},y:{}}}", self.x, self.y)
    }
}

impl Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{width:{},height:{}}}", self.width, self.height)
    }
}

impl Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Rectangle({origin:")?;
        write_optional(f, self.origin.as_ref())?;
        write_optional(f, self.size.as_ref())?;
        f.write_str("})")
    }
}

impl Display for FigureModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{data:[")?;
        for figure in &self.data {
            write_optional(f, figure.as_ref())?;
        }
        f.write_str("]}")
    }
}

/// Each element is followed by a `,`, absent ones render as `null`
fn write_optional<T: Display>(f: &mut fmt::Formatter<'_>, value: Option<&T>) -> fmt::Result {
    match value {
        Some(value) => write!(f, "{value},"),
        None => f.write_str("null,"),
    }
}
