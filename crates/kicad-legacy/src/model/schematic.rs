//! Schematic screens and their items

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use serde::Serialize;

use super::{Color, Field, Point, Size};

/// A screen shared between every sheet that references its file
pub type ScreenRef = Rc<RefCell<Screen>>;

/// Paper sizes known to the legacy format, in mils (landscape)
pub const PAGE_SIZES: &[(&str, i32, i32)] = &[
    ("A4", 11693, 8268),
    ("A3", 16535, 11693),
    ("A2", 23386, 16535),
    ("A1", 33110, 23386),
    ("A0", 46811, 33110),
    ("A", 11000, 8500),
    ("B", 17000, 11000),
    ("C", 22000, 17000),
    ("D", 34000, 22000),
    ("E", 44000, 34000),
    ("GERBER", 32000, 32000),
    ("USLetter", 11000, 8500),
    ("USLegal", 14000, 8500),
    ("USLedger", 17000, 11000),
    (PageInfo::CUSTOM, 17000, 11000),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page_type: String,
    pub width: i32,
    pub height: i32,
    pub portrait: bool,
}

impl PageInfo {
    /// Page type whose dimensions come from the file
    pub const CUSTOM: &'static str = "User";

    /// A standard page, or `None` for an unknown page type.
    pub fn standard(page_type: &str, portrait: bool) -> Option<Self> {
        let &(name, w, h) = PAGE_SIZES.iter().find(|(name, _, _)| *name == page_type)?;
        let (width, height) = if portrait { (h, w) } else { (w, h) };
        Some(Self {
            page_type: name.to_string(),
            width,
            height,
            portrait,
        })
    }

    pub fn is_custom(&self) -> bool {
        self.page_type == Self::CUSTOM
    }
}

impl Default for PageInfo {
    fn default() -> Self {
        Self {
            page_type: "A4".to_string(),
            width: 11693,
            height: 8268,
            portrait: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TitleBlock {
    pub title: String,
    pub date: String,
    pub revision: String,
    pub company: String,
    pub comments: [String; 4],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusAlias {
    pub name: String,
    pub members: Vec<String>,
}

/// Contents of one schematic file
#[derive(Debug, Clone, Serialize)]
pub struct Screen {
    pub file_name: PathBuf,
    /// Format version from the file header
    pub version: i32,
    pub page: PageInfo,
    pub title_block: TitleBlock,
    pub sheet_number: i32,
    pub sheet_count: i32,
    pub bus_aliases: Vec<BusAlias>,
    /// Items in file order
    pub items: Vec<SchItem>,
    /// Set when loading had to repair the file
    #[serde(skip)]
    pub modified: bool,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            file_name: PathBuf::new(),
            version: crate::SCHEMATIC_VERSION,
            page: PageInfo::default(),
            title_block: TitleBlock::default(),
            sheet_number: 1,
            sheet_count: 1,
            bus_aliases: Vec::new(),
            items: Vec::new(),
            modified: false,
        }
    }
}

// Equality is over document content only; where it came from and whether it
// was repaired do not matter.
impl PartialEq for Screen {
    fn eq(&self, other: &Self) -> bool {
        self.page == other.page
            && self.title_block == other.title_block
            && self.sheet_number == other.sheet_number
            && self.sheet_count == other.sheet_count
            && self.bus_aliases == other.bus_aliases
            && self.items == other.items
    }
}

impl Screen {
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    pub fn into_ref(self) -> ScreenRef {
        Rc::new(RefCell::new(self))
    }

    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.items.iter().filter_map(|item| match item {
            SchItem::Sheet(sheet) => Some(sheet),
            _ => None,
        })
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.items.iter().filter_map(|item| match item {
            SchItem::Component(c) => Some(c),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SchItem {
    Component(Component),
    Sheet(Sheet),
    Bitmap(Bitmap),
    Junction(Junction),
    NoConnect(NoConnect),
    Line(Line),
    BusEntry(BusEntry),
    Text(Text),
}

/// Library identifier of a placed symbol
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibId {
    pub nickname: String,
    pub name: String,
}

impl LibId {
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((nickname, name)) => Self {
                nickname: nickname.to_string(),
                name: name.to_string(),
            },
            None => Self {
                nickname: String::new(),
                name: s.to_string(),
            },
        }
    }
}

impl fmt::Display for LibId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nickname.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.nickname, self.name)
        }
    }
}

/// Placement matrix with entries in {-1, 0, 1}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transform {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Transform {
    /// Legacy files store the y axis flipped, so "no rotation" is `1 0 0 -1`.
    pub const IDENTITY: Self = Self {
        x1: 1,
        y1: 0,
        x2: 0,
        y2: -1,
    };
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Reference and unit of a component inside one sheet path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentInstance {
    /// Sheet path of timestamps, e.g. `/5C3A0000/5C3A1B2F`
    pub path: String,
    /// Reference designator used on that path
    pub reference: String,
    /// Selected unit on that path
    pub unit: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    /// Library part this component places
    pub lib_id: LibId,
    /// Reference designator without its number, e.g. `R` for `R12`
    pub prefix: String,
    /// Selected unit, starting at 1
    pub unit: i32,
    /// Selected body style, starting at 1
    pub convert: i32,
    /// Anchor position
    pub pos: Point,
    /// Rotation and mirroring
    pub transform: Transform,
    /// Unique id derived from the creation time
    pub timestamp: u32,
    /// Per sheet path annotations of a shared sheet
    pub instances: Vec<ComponentInstance>,
    /// Reference, Value, Footprint, Datasheet, then user fields
    pub fields: Vec<Field>,
}

impl Default for Component {
    fn default() -> Self {
        Self {
            lib_id: LibId::default(),
            prefix: String::new(),
            unit: 1,
            convert: 1,
            pos: Point::default(),
            transform: Transform::IDENTITY,
            timestamp: 0,
            instances: Vec::new(),
            fields: Field::mandatory(),
        }
    }
}

impl Component {
    pub fn reference(&self) -> &str {
        &self.fields[super::REFERENCE].text
    }

    pub fn value(&self) -> &str {
        &self.fields[super::VALUE].text
    }
}

/// Strip the trailing number (and `?`) off a reference designator.
pub fn reference_prefix(reference: &str) -> &str {
    reference.trim_end_matches(|c: char| c.is_ascii_digit() || c == '?')
}

/// Electrical shape of sheet pins and hierarchical/global labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PinSheetShape {
    Input,
    Output,
    Bidirectional,
    TriState,
    #[default]
    Unspecified,
}

impl PinSheetShape {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(Self::Input),
            'O' => Some(Self::Output),
            'B' => Some(Self::Bidirectional),
            'T' => Some(Self::TriState),
            'U' => Some(Self::Unspecified),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Input => 'I',
            Self::Output => 'O',
            Self::Bidirectional => 'B',
            Self::TriState => 'T',
            Self::Unspecified => 'U',
        }
    }

    /// Keyword used on `Text GLabel`/`Text HLabel` lines
    pub fn label_keyword(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Output => "Output",
            Self::Bidirectional => "BiDi",
            Self::TriState => "3State",
            Self::Unspecified => "UnSpc",
        }
    }

    pub fn from_label_keyword(s: &str) -> Option<Self> {
        [
            Self::Input,
            Self::Output,
            Self::Bidirectional,
            Self::TriState,
            Self::Unspecified,
        ]
        .into_iter()
        .find(|shape| shape.label_keyword() == s)
    }
}

/// Edge of the sheet a pin sits on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SheetSide {
    #[default]
    Left,
    Right,
    Top,
    Bottom,
}

impl SheetSide {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'L' => Some(Self::Left),
            'R' => Some(Self::Right),
            'T' => Some(Self::Top),
            'B' => Some(Self::Bottom),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Left => 'L',
            Self::Right => 'R',
            Self::Top => 'T',
            Self::Bottom => 'B',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetPin {
    /// Field number on the `F<n>` line, starting at 2
    pub number: i32,
    pub text: String,
    pub shape: PinSheetShape,
    pub side: SheetSide,
    pub pos: Point,
    pub size: i32,
}

/// Runtime links of a sheet: the screen it shows and the screen containing it.
///
/// Links are not document content, so they never take part in equality.
#[derive(Clone, Default)]
pub struct ScreenLink {
    pub screen: Option<ScreenRef>,
    pub parent: Option<Weak<RefCell<Screen>>>,
}

impl PartialEq for ScreenLink {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl fmt::Debug for ScreenLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self
            .screen
            .as_ref()
            .map(|s| s.borrow().file_name.display().to_string());
        f.debug_struct("ScreenLink").field("screen", &file).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub pos: Point,
    pub size: Size,
    pub timestamp: u32,
    pub name: String,
    pub name_size: i32,
    /// File name as written, possibly relative to the containing sheet
    pub file_name: String,
    pub file_name_size: i32,
    pub pins: Vec<SheetPin>,
    #[serde(skip)]
    pub link: ScreenLink,
}

impl Default for Sheet {
    fn default() -> Self {
        Self {
            pos: Point::default(),
            size: Size::default(),
            timestamp: 0,
            name: String::new(),
            name_size: Field::DEFAULT_SIZE,
            file_name: String::new(),
            file_name_size: Field::DEFAULT_SIZE,
            pins: Vec::new(),
            link: ScreenLink::default(),
        }
    }
}

impl Sheet {
    pub fn screen(&self) -> Option<&ScreenRef> {
        self.link.screen.as_ref()
    }
}

/// Embedded PNG image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bitmap {
    pub pos: Point,
    pub scale: f64,
    pub png: Vec<u8>,
}

impl Bitmap {
    /// Decode the stored PNG.
    pub fn decode(&self) -> image::ImageResult<image::DynamicImage> {
        image::load_from_memory_with_format(&self.png, image::ImageFormat::Png)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Junction {
    pub pos: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoConnect {
    pub pos: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineLayer {
    Wire,
    Bus,
    Notes,
}

impl LineLayer {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Wire => "Wire",
            Self::Bus => "Bus",
            Self::Notes => "Notes",
        }
    }

    /// Width in mils a line on this layer has unless told otherwise
    pub fn default_width(self) -> i32 {
        match self {
            Self::Wire | Self::Notes => 6,
            Self::Bus => 12,
        }
    }

    pub fn default_style(self) -> LineStyle {
        match self {
            Self::Wire | Self::Bus => LineStyle::Solid,
            Self::Notes => LineStyle::Dashed,
        }
    }

    /// Lines only carry a color when one was set explicitly.
    pub fn default_color(self) -> Option<Color> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

impl LineStyle {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
            Self::DashDot => "dash_dot",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        [Self::Solid, Self::Dashed, Self::Dotted, Self::DashDot]
            .into_iter()
            .find(|style| style.keyword() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Line {
    /// Wire, bus or graphic line
    pub layer: LineLayer,
    /// First endpoint
    pub start: Point,
    /// Second endpoint
    pub end: Point,
    /// Line width, 0 for the default
    pub width: i32,
    /// Dash pattern
    pub style: LineStyle,
    /// `None` draws with the layer color
    pub color: Option<Color>,
}

impl Line {
    pub fn new(layer: LineLayer, start: Point, end: Point) -> Self {
        Self {
            layer,
            start,
            end,
            width: layer.default_width(),
            style: layer.default_style(),
            color: layer.default_color(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BusEntryKind {
    /// `Entry Wire Line`
    WireToBus,
    /// `Entry Bus Bus`
    BusToBus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusEntry {
    pub kind: BusEntryKind,
    pub pos: Point,
    /// Offset of the far end from `pos`
    pub size: Size,
}

impl BusEntry {
    pub fn end(&self) -> Point {
        Point::new(self.pos.x + self.size.width, self.pos.y + self.size.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextKind {
    Notes,
    Label,
    GlobalLabel,
    HierLabel,
}

impl TextKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Notes => "Notes",
            Self::Label => "Label",
            Self::GlobalLabel => "GLabel",
            Self::HierLabel => "HLabel",
        }
    }

    pub fn has_shape(self) -> bool {
        matches!(self, Self::GlobalLabel | Self::HierLabel)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Text {
    pub kind: TextKind,
    pub pos: Point,
    /// Orientation code 0..=3
    pub spin: i32,
    pub size: i32,
    /// Only meaningful for global and hierarchical labels
    pub shape: PinSheetShape,
    pub italic: bool,
    pub thickness: i32,
    pub text: String,
}
