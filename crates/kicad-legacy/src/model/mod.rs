//! In-memory document model populated by the loaders and read by the writers

mod schematic;
mod symbol;

pub use schematic::*;
pub use symbol::*;

use serde::Serialize;

/// A position in mils
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A width/height pair in mils
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum HJustify {
    Left,
    #[default]
    Center,
    Right,
}

impl HJustify {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'L' => Some(Self::Left),
            'C' => Some(Self::Center),
            'R' => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Left => 'L',
            Self::Center => 'C',
            Self::Right => 'R',
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum VJustify {
    Top,
    #[default]
    Center,
    Bottom,
}

impl VJustify {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'T' => Some(Self::Top),
            'C' => Some(Self::Center),
            'B' => Some(Self::Bottom),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Top => 'T',
            Self::Center => 'C',
            Self::Bottom => 'B',
        }
    }
}

/// A named text attribute of a placed component or a library part.
///
/// Slots 0..4 are the fixed Reference, Value, Footprint and Datasheet fields;
/// later slots are user defined and always named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub text: String,
    pub pos: Point,
    /// Text size in mils
    pub size: i32,
    pub vertical: bool,
    pub visible: bool,
    pub h_justify: HJustify,
    pub v_justify: VJustify,
    pub italic: bool,
    pub bold: bool,
}

pub const REFERENCE: usize = 0;
pub const VALUE: usize = 1;
pub const FOOTPRINT: usize = 2;
pub const DATASHEET: usize = 3;
pub const MANDATORY_FIELDS: usize = 4;

impl Field {
    pub const DEFAULT_SIZE: i32 = 50;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
            pos: Point::default(),
            size: Self::DEFAULT_SIZE,
            vertical: false,
            visible: true,
            h_justify: HJustify::Center,
            v_justify: VJustify::Center,
            italic: false,
            bold: false,
        }
    }

    /// Name of a fixed slot, or the legacy placeholder for a user slot.
    pub fn default_name(index: usize) -> String {
        match index {
            REFERENCE => "Reference".to_string(),
            VALUE => "Value".to_string(),
            FOOTPRINT => "Footprint".to_string(),
            DATASHEET => "Datasheet".to_string(),
            n => format!("Field{n}"),
        }
    }

    /// The four fixed fields, empty.
    pub fn mandatory() -> Vec<Field> {
        (0..MANDATORY_FIELDS)
            .map(|i| Field::new(Field::default_name(i)))
            .collect()
    }

    /// The `CNN` style token: vertical justification, italic, bold.
    pub(crate) fn style_token(&self) -> String {
        format!(
            "{}{}{}",
            self.v_justify.as_char(),
            if self.italic { 'I' } else { 'N' },
            if self.bold { 'B' } else { 'N' }
        )
    }

    /// Apply a `CNN` style token. Unknown characters leave the default.
    pub(crate) fn apply_style_token(&mut self, token: &str) {
        let mut chars = token.chars();
        if let Some(v) = chars.next().and_then(VJustify::from_char) {
            self.v_justify = v;
        }
        self.italic = chars.next() == Some('I');
        self.bold = chars.next() == Some('B');
    }
}

/// An RGBA color, alpha 255 meaning opaque
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_token_round_trip() {
        let mut field = Field::new("Value");
        field.apply_style_token("BIB");
        assert_eq!(field.v_justify, VJustify::Bottom);
        assert!(field.italic && field.bold);
        assert_eq!(field.style_token(), "BIB");
    }

    #[test]
    fn test_default_names() {
        assert_eq!(Field::default_name(DATASHEET), "Datasheet");
        assert_eq!(Field::default_name(6), "Field6");
        assert_eq!(Field::mandatory().len(), MANDATORY_FIELDS);
    }
}
