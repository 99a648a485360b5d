//! Named side-channel properties attached to pipeline nodes.
//!
//! Properties carry metadata such as resolution hints that travel through
//! the graph independently of pixel data. A node with no opinion on a key
//! reports exactly what its primary source reports.

use crate::core::geometry::Rect;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Property key holding the horizontal and vertical resolution, in pixels
/// per inch.
pub const RESOLUTION: &str = "resolution";

/// Property key holding a human-readable label for the node.
pub const LABEL: &str = "label";

/// Property key holding the rectangle of the root image the node was
/// derived from.
pub const SOURCE_BOUNDS: &str = "source_bounds";

/// Opaque property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PropertyValue {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Boolean value
    Boolean(bool),
    /// 2D vector (x, y)
    Vector2(f64, f64),
    /// Integer rectangle
    Rect(Rect),
}

impl PropertyValue {
    /// Try to get this value as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        if let PropertyValue::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Try to get this value as a float.
    /// Integers are automatically converted to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_string(&self) -> Option<&str> {
        if let PropertyValue::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        if let PropertyValue::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Try to get this value as a 2D vector.
    pub fn as_vector2(&self) -> Option<(f64, f64)> {
        if let PropertyValue::Vector2(x, y) = self {
            Some((*x, *y))
        } else {
            None
        }
    }

    /// Try to get this value as a rectangle.
    pub fn as_rect(&self) -> Option<Rect> {
        if let PropertyValue::Rect(r) = self {
            Some(*r)
        } else {
            None
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Integer(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Boolean(v)
    }
}

impl From<Rect> for PropertyValue {
    fn from(v: Rect) -> Self {
        PropertyValue::Rect(v)
    }
}

/// Insertion-ordered property table.
pub type PropertyMap = IndexMap<String, PropertyValue>;
