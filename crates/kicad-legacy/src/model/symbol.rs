//! Library parts and their graphic primitives

use serde::Serialize;

use super::{Field, HJustify, Point, VJustify, VALUE};

/// One name under which a part can be placed, with its documentation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibAlias {
    pub name: String,
    pub description: String,
    pub keywords: String,
    pub doc_file: String,
}

impl LibAlias {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn has_doc(&self) -> bool {
        !self.description.is_empty() || !self.keywords.is_empty() || !self.doc_file.is_empty()
    }
}

/// A reusable part definition.
///
/// `aliases[0]` is the root alias and always carries the part's own name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibPart {
    pub name: String,
    pub prefix: String,
    pub pin_name_offset: i32,
    pub show_pin_numbers: bool,
    pub show_pin_names: bool,
    pub unit_count: i32,
    pub units_locked: bool,
    pub power: bool,
    pub fields: Vec<Field>,
    pub draw: Vec<DrawItem>,
    pub aliases: Vec<LibAlias>,
    pub footprint_filters: Vec<String>,
}

impl LibPart {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut fields = Field::mandatory();
        fields[VALUE].text = name.clone();
        Self {
            aliases: vec![LibAlias::new(name.clone())],
            name,
            prefix: "U".to_string(),
            pin_name_offset: 40,
            show_pin_numbers: true,
            show_pin_names: true,
            unit_count: 1,
            units_locked: false,
            power: false,
            fields,
            draw: Vec::new(),
            footprint_filters: Vec::new(),
        }
    }

    pub fn alias(&self, name: &str) -> Option<&LibAlias> {
        self.aliases.iter().find(|a| a.name == name)
    }

    pub fn alias_mut(&mut self, name: &str) -> Option<&mut LibAlias> {
        self.aliases.iter_mut().find(|a| a.name == name)
    }

    /// Rename the part along with its root alias and value field.
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if let Some(root) = self.aliases.first_mut() {
            root.name = name.clone();
        }
        self.fields[VALUE].text = name.clone();
        self.name = name;
    }

    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.draw.iter().filter_map(|item| match item {
            DrawItem::Pin(pin) => Some(pin),
            _ => None,
        })
    }

    /// Sort draw items into the order they are written in.
    pub fn sort_draw_items(&mut self) {
        self.draw.sort_by_key(DrawItem::sort_key);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum FillMode {
    #[default]
    NoFill,
    /// Filled with the outline color
    Filled,
    /// Filled with the background color
    Background,
}

impl FillMode {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'N' => Some(Self::NoFill),
            'F' => Some(Self::Filled),
            'f' => Some(Self::Background),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::NoFill => 'N',
            Self::Filled => 'F',
            Self::Background => 'f',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawItem {
    Arc(Arc),
    Circle(Circle),
    Text(LibText),
    Rectangle(Rectangle),
    Pin(Pin),
    Polyline(Polyline),
    Bezier(Bezier),
}

impl DrawItem {
    pub fn unit(&self) -> i32 {
        match self {
            DrawItem::Arc(a) => a.unit,
            DrawItem::Circle(c) => c.unit,
            DrawItem::Text(t) => t.unit,
            DrawItem::Rectangle(r) => r.unit,
            DrawItem::Pin(p) => p.unit,
            DrawItem::Polyline(p) => p.unit,
            DrawItem::Bezier(b) => b.unit,
        }
    }

    pub fn convert(&self) -> i32 {
        match self {
            DrawItem::Arc(a) => a.convert,
            DrawItem::Circle(c) => c.convert,
            DrawItem::Text(t) => t.convert,
            DrawItem::Rectangle(r) => r.convert,
            DrawItem::Pin(p) => p.convert,
            DrawItem::Polyline(p) => p.convert,
            DrawItem::Bezier(b) => b.convert,
        }
    }

    /// Canonical write order: by kind, then unit, then body style.
    pub(crate) fn sort_key(&self) -> (u8, i32, i32) {
        let kind = match self {
            DrawItem::Arc(_) => 0,
            DrawItem::Circle(_) => 1,
            DrawItem::Text(_) => 2,
            DrawItem::Rectangle(_) => 3,
            DrawItem::Polyline(_) => 4,
            DrawItem::Bezier(_) => 5,
            DrawItem::Pin(_) => 6,
        };
        (kind, self.unit(), self.convert())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arc {
    /// Center point
    pub center: Point,
    /// Radius
    pub radius: i32,
    /// Start angle in tenths of a degree
    pub start_angle: i32,
    /// End angle in tenths of a degree
    pub end_angle: i32,
    /// First endpoint
    pub start: Point,
    /// Second endpoint
    pub end: Point,
    /// Unit the item belongs to, 0 for all units
    pub unit: i32,
    /// Body style the item belongs to, 0 for all styles
    pub convert: i32,
    /// Line width, 0 for the default
    pub width: i32,
    /// Interior fill
    pub fill: FillMode,
}

impl Arc {
    /// Point on the arc at `angle` tenths of a degree.
    pub fn point_at(center: Point, radius: i32, angle: i32) -> Point {
        let rad = (angle as f64 / 10.0).to_radians();
        Point::new(
            center.x + (radius as f64 * rad.cos()).round() as i32,
            center.y + (radius as f64 * rad.sin()).round() as i32,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Circle {
    /// Center point
    pub center: Point,
    /// Radius
    pub radius: i32,
    /// Unit the item belongs to, 0 for all units
    pub unit: i32,
    /// Body style the item belongs to, 0 for all styles
    pub convert: i32,
    /// Line width, 0 for the default
    pub width: i32,
    /// Interior fill
    pub fill: FillMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rectangle {
    /// One corner
    pub start: Point,
    /// The opposite corner
    pub end: Point,
    /// Unit the item belongs to, 0 for all units
    pub unit: i32,
    /// Body style the item belongs to, 0 for all styles
    pub convert: i32,
    /// Line width, 0 for the default
    pub width: i32,
    /// Interior fill
    pub fill: FillMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Polyline {
    /// Vertices in drawing order
    pub points: Vec<Point>,
    /// Unit the item belongs to, 0 for all units
    pub unit: i32,
    /// Body style the item belongs to, 0 for all styles
    pub convert: i32,
    /// Line width, 0 for the default
    pub width: i32,
    /// Interior fill
    pub fill: FillMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bezier {
    /// Start, two control points and end of each segment
    pub points: Vec<Point>,
    /// Unit the item belongs to, 0 for all units
    pub unit: i32,
    /// Body style the item belongs to, 0 for all styles
    pub convert: i32,
    /// Line width, 0 for the default
    pub width: i32,
    /// Interior fill
    pub fill: FillMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibText {
    /// Tenths of a degree
    pub angle: f64,
    /// Anchor point
    pub pos: Point,
    /// Text height
    pub size: i32,
    /// Hidden text is kept but not drawn
    pub visible: bool,
    /// Unit the item belongs to, 0 for all units
    pub unit: i32,
    /// Body style the item belongs to, 0 for all styles
    pub convert: i32,
    /// Displayed text
    pub text: String,
    pub italic: bool,
    pub bold: bool,
    pub h_justify: HJustify,
    pub v_justify: VJustify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PinOrientation {
    Right,
    Left,
    Up,
    Down,
}

impl PinOrientation {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'R' => Some(Self::Right),
            'L' => Some(Self::Left),
            'U' => Some(Self::Up),
            'D' => Some(Self::Down),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Right => 'R',
            Self::Left => 'L',
            Self::Up => 'U',
            Self::Down => 'D',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElectricalType {
    Input,
    Output,
    Bidirectional,
    TriState,
    Passive,
    Unspecified,
    PowerIn,
    PowerOut,
    OpenCollector,
    OpenEmitter,
    NoConnect,
}

impl ElectricalType {
    const ALL: [Self; 11] = [
        Self::Input,
        Self::Output,
        Self::Bidirectional,
        Self::TriState,
        Self::Passive,
        Self::Unspecified,
        Self::PowerIn,
        Self::PowerOut,
        Self::OpenCollector,
        Self::OpenEmitter,
        Self::NoConnect,
    ];

    pub fn as_char(self) -> char {
        match self {
            Self::Input => 'I',
            Self::Output => 'O',
            Self::Bidirectional => 'B',
            Self::TriState => 'T',
            Self::Passive => 'P',
            Self::Unspecified => 'U',
            Self::PowerIn => 'W',
            Self::PowerOut => 'w',
            Self::OpenCollector => 'C',
            Self::OpenEmitter => 'E',
            Self::NoConnect => 'N',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_char() == c)
    }
}

/// How a pin is drawn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PinShape {
    #[default]
    Line,
    Inverted,
    Clock,
    InvertedClock,
    InputLow,
    ClockLow,
    OutputLow,
    FallingEdgeClock,
    NonLogic,
}

impl PinShape {
    /// Flag letters written after the electrical type, `""` for a plain line
    pub fn flags(self) -> &'static str {
        match self {
            Self::Line => "",
            Self::Inverted => "I",
            Self::Clock => "C",
            Self::InvertedClock => "IC",
            Self::InputLow => "L",
            Self::ClockLow => "CL",
            Self::OutputLow => "V",
            Self::FallingEdgeClock => "F",
            Self::NonLogic => "X",
        }
    }

    /// Combine decoded flag letters into a shape. Combinations that do not
    /// name a shape yield `None`.
    pub fn from_flags(
        inverted: bool,
        clock: bool,
        low_in: bool,
        low_out: bool,
        falling: bool,
        non_logic: bool,
    ) -> Option<Self> {
        match (inverted, clock, low_in, low_out, falling, non_logic) {
            (false, false, false, false, false, false) => Some(Self::Line),
            (true, false, false, false, false, false) => Some(Self::Inverted),
            (false, true, false, false, false, false) => Some(Self::Clock),
            (true, true, false, false, false, false) => Some(Self::InvertedClock),
            (false, false, true, false, false, false) => Some(Self::InputLow),
            (false, true, true, false, false, false) => Some(Self::ClockLow),
            (false, false, false, true, false, false) => Some(Self::OutputLow),
            (false, false, false, false, true, false) => Some(Self::FallingEdgeClock),
            (false, false, false, false, false, true) => Some(Self::NonLogic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pin {
    /// Pin name, empty when unnamed
    pub name: String,
    /// Pin number, not necessarily numeric
    pub number: String,
    /// Connection point
    pub pos: Point,
    /// Length from the connection point to the body
    pub length: i32,
    /// Direction the pin points from its connection point
    pub orientation: PinOrientation,
    /// Text height of the number
    pub number_size: i32,
    /// Text height of the name
    pub name_size: i32,
    /// Unit the item belongs to, 0 for all units
    pub unit: i32,
    /// Body style the item belongs to, 0 for all styles
    pub convert: i32,
    /// Electrical type used by the rules checker
    pub electrical: ElectricalType,
    /// Graphic style of the pin end
    pub shape: PinShape,
    /// Cleared for hidden pins such as power inputs
    pub visible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_name_updates_root_and_value() {
        let mut part = LibPart::new("R");
        part.set_name("R_1");
        assert_eq!(part.aliases[0].name, "R_1");
        assert_eq!(part.fields[VALUE].text, "R_1");
    }

    #[test]
    fn test_pin_shape_flags() {
        assert_eq!(
            PinShape::from_flags(true, true, false, false, false, false),
            Some(PinShape::InvertedClock)
        );
        assert_eq!(PinShape::from_flags(true, false, true, false, false, false), None);
        assert_eq!(PinShape::ClockLow.flags(), "CL");
    }

    #[test]
    fn test_electrical_type_chars_are_distinct() {
        for t in ElectricalType::ALL {
            assert_eq!(ElectricalType::from_char(t.as_char()), Some(t));
        }
    }

    #[test]
    fn test_arc_point_at() {
        let p = Arc::point_at(Point::new(0, 0), 100, 900);
        assert_eq!(p, Point::new(0, 100));
    }
}
