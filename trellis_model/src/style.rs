// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Styles: ordered key/value maps with a `key=value;` string form.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

/// Well-known style keys and values.
///
/// The set is open: any key can be stored in a [`Style`]; these constants
/// cover the keys the model and view interpret themselves.
pub mod keys {
    /// Edge routing function name. See `trellis_view`'s edge-style registry.
    pub const EDGE: &str = "edgeStyle";
    /// Routing function for self-loops.
    pub const LOOP: &str = "loop";
    /// Disables edge-style routing when set.
    pub const NO_EDGE_STYLE: &str = "noEdgeStyle";
    /// Orthogonal perimeter projection for floating ends.
    pub const ORTHOGONAL: &str = "orthogonal";
    /// Routes self-loops orthogonally even with waypoints.
    pub const ORTHOGONAL_LOOP: &str = "orthogonalLoop";
    /// Perimeter function name of a vertex.
    pub const PERIMETER: &str = "perimeter";
    /// Rotation of a vertex in degrees.
    pub const ROTATION: &str = "rotation";
    /// Direction for loops and the triangle perimeter.
    pub const DIRECTION: &str = "direction";
    /// Stub segment length for entity-relation and loop routing.
    pub const SEGMENT: &str = "segment";
    /// Elbow orientation (`vertical` or `horizontal`).
    pub const ELBOW: &str = "elbow";
    /// Horizontal routing-center offset as a fraction of the width.
    pub const ROUTING_CENTER_X: &str = "routingCenterX";
    /// Vertical routing-center offset as a fraction of the height.
    pub const ROUTING_CENTER_Y: &str = "routingCenterY";
    /// Distance between a shape and its perimeter.
    pub const PERIMETER_SPACING: &str = "perimeterSpacing";
    /// Extra perimeter spacing at the source end of an edge.
    pub const SOURCE_PERIMETER_SPACING: &str = "sourcePerimeterSpacing";
    /// Extra perimeter spacing at the target end of an edge.
    pub const TARGET_PERIMETER_SPACING: &str = "targetPerimeterSpacing";
    /// Horizontal label placement (`left`, `center`, `right`).
    pub const LABEL_POSITION: &str = "labelPosition";
    /// Vertical label placement (`top`, `middle`, `bottom`).
    pub const VERTICAL_LABEL_POSITION: &str = "verticalLabelPosition";
    /// Horizontal text alignment inside the label bounds.
    pub const ALIGN: &str = "align";
    /// Fixed label width in unscaled units.
    pub const LABEL_WIDTH: &str = "labelWidth";
    /// Horizontal mirror of a vertex.
    pub const FLIP_H: &str = "flipH";
    /// Vertical mirror of a vertex.
    pub const FLIP_V: &str = "flipV";
    /// Fixed source connection point, x fraction of the terminal bounds.
    pub const EXIT_X: &str = "exitX";
    /// Fixed source connection point, y fraction of the terminal bounds.
    pub const EXIT_Y: &str = "exitY";
    /// Absolute x offset added to the source connection point.
    pub const EXIT_DX: &str = "exitDx";
    /// Absolute y offset added to the source connection point.
    pub const EXIT_DY: &str = "exitDy";
    /// Fixed target connection point, x fraction of the terminal bounds.
    pub const ENTRY_X: &str = "entryX";
    /// Fixed target connection point, y fraction of the terminal bounds.
    pub const ENTRY_Y: &str = "entryY";
    /// Absolute x offset added to the target connection point.
    pub const ENTRY_DX: &str = "entryDx";
    /// Absolute y offset added to the target connection point.
    pub const ENTRY_DY: &str = "entryDy";
    /// Projects the fixed source connection point onto the perimeter.
    pub const EXIT_PERIMETER: &str = "exitPerimeter";
    /// Projects the fixed target connection point onto the perimeter.
    pub const ENTRY_PERIMETER: &str = "entryPerimeter";
    /// Id of a child cell used as the source routing terminal.
    pub const SOURCE_PORT: &str = "sourcePort";
    /// Id of a child cell used as the target routing terminal.
    pub const TARGET_PORT: &str = "targetPort";

    /// `direction`/alignment value.
    pub const NORTH: &str = "north";
    /// `direction` value.
    pub const SOUTH: &str = "south";
    /// `direction` value.
    pub const EAST: &str = "east";
    /// `direction` value.
    pub const WEST: &str = "west";
    /// Alignment value.
    pub const LEFT: &str = "left";
    /// Alignment value.
    pub const CENTER: &str = "center";
    /// Alignment value.
    pub const RIGHT: &str = "right";
    /// Vertical alignment value.
    pub const TOP: &str = "top";
    /// Vertical alignment value.
    pub const MIDDLE: &str = "middle";
    /// Vertical alignment value.
    pub const BOTTOM: &str = "bottom";
    /// `elbow` value.
    pub const VERTICAL: &str = "vertical";
}

/// An ordered key→value style map.
///
/// The string form is `key=value;key=value;`, the order of first insertion is
/// preserved, and keys without `=` are kept with an empty value. Parsing never
/// fails; malformed fragments are simply dropped.
///
/// # Example
///
/// ```
/// use trellis_model::Style;
///
/// let style: Style = "edgeStyle=elbowEdgeStyle;rotation=45".parse().unwrap();
/// assert_eq!(style.get("edgeStyle"), Some("elbowEdgeStyle"));
/// assert_eq!(style.get_f64("rotation"), Some(45.0));
/// assert_eq!(style.to_string(), "edgeStyle=elbowEdgeStyle;rotation=45");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Style {
    entries: Vec<(String, String)>,
}

impl Style {
    /// Creates an empty style.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the style has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value for `key` parsed as `f64`.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.parse().ok()
    }

    /// Returns the value for `key` parsed as `f64`, or `default`.
    #[must_use]
    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.get_f64(key).unwrap_or(default)
    }

    /// Returns the value for `key` interpreted as a boolean (`"1"` is true),
    /// or `default` if absent.
    #[must_use]
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => v == "1",
            None => default,
        }
    }

    /// Returns the value for `key`, or `default` if absent.
    #[must_use]
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Sets `key` to `value`, replacing an existing entry in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
        self
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromStr for Style {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut style = Self::new();
        for part in s.split(';') {
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((k, v)) => style.set(k, v),
                None => style.set(part, ""),
            };
        }
        Ok(style)
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.iter() {
            if !first {
                f.write_str(";")?;
            }
            first = false;
            if v.is_empty() {
                write!(f, "{k}")?;
            } else {
                write!(f, "{k}={v}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let style: Style = "perimeter=ellipsePerimeter;rotation=30;flipH=1"
            .parse()
            .unwrap();
        assert_eq!(style.len(), 3);
        assert_eq!(style.get(keys::PERIMETER), Some("ellipsePerimeter"));
        assert_eq!(style.get_f64(keys::ROTATION), Some(30.0));
        assert!(style.bool_or(keys::FLIP_H, false));
        assert_eq!(
            style.to_string(),
            "perimeter=ellipsePerimeter;rotation=30;flipH=1"
        );
    }

    #[test]
    fn bare_keys_and_empty_fragments() {
        let style: Style = ";rounded;;align=left;".parse().unwrap();
        assert_eq!(style.get("rounded"), Some(""));
        assert_eq!(style.get(keys::ALIGN), Some("left"));
        assert_eq!(style.to_string(), "rounded;align=left");
    }

    #[test]
    fn set_replaces_in_place() {
        let mut style: Style = "a=1;b=2".parse().unwrap();
        style.set("a", "3");
        assert_eq!(style.to_string(), "a=3;b=2");
    }

    #[test]
    fn equality_is_entry_order_sensitive() {
        let a: Style = "x=1;y=2".parse().unwrap();
        let b: Style = "y=2;x=1".parse().unwrap();
        assert_ne!(a, b);
        assert_eq!(a, "x=1;y=2".parse().unwrap());
    }
}
