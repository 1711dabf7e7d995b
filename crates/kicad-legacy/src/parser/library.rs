//! Loader for `.lib` symbol libraries

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Location, Result};
use crate::model::{
    Arc, Bezier, Circle, DrawItem, ElectricalType, Field, FillMode, HJustify, LibAlias, LibPart,
    LibText, Pin, PinOrientation, PinShape, Point, Polyline, Rectangle, VJustify,
    MANDATORY_FIELDS, VALUE,
};
use crate::reader::{BufLineReader, LineReader};
use crate::token::Scanner;

/// Magic at the start of every library file
pub const LIBRARY_HEADER: &str = "EESchema-LIBRARY Version";

/// `<major>.<minor>` library format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LibVersion {
    pub major: i32,
    pub minor: i32,
}

impl LibVersion {
    /// Version written by this crate
    pub const CURRENT: Self = Self { major: 2, minor: 4 };

    pub const fn new(major: i32, minor: i32) -> Self {
        Self { major, minor }
    }

    /// Documentation lives in a `.dcm` file beside the library.
    pub fn has_doc_sidecar(self) -> bool {
        self.major < 3
    }

    fn parse(s: &str) -> Option<Self> {
        let (major, minor) = s.split_once('.')?;
        let major = major.parse().ok()?;
        let minor = minor.parse().ok().filter(|m| (0..=99).contains(m))?;
        Some(Self { major, minor })
    }
}

impl fmt::Display for LibVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Parts of one library file in file order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryFile {
    pub version: LibVersion,
    /// Set for single symbol export files
    pub symbol_only: bool,
    pub parts: Vec<LibPart>,
}

pub fn parse_library(text: &str, source: &str) -> Result<LibraryFile> {
    let mut reader = BufLineReader::from_text(text, source);
    LibraryLoader::new(&mut reader).load()
}

pub fn load_library_file(path: &Path) -> Result<LibraryFile> {
    let mut reader = BufLineReader::open(path)?;
    LibraryLoader::new(&mut reader).load()
}

pub struct LibraryLoader<'r> {
    reader: &'r mut dyn LineReader,
    version: LibVersion,
}

impl<'r> LibraryLoader<'r> {
    pub fn new(reader: &'r mut dyn LineReader) -> Self {
        Self {
            reader,
            version: LibVersion::CURRENT,
        }
    }

    pub fn load(mut self) -> Result<LibraryFile> {
        log::debug!("loading library {}", self.reader.source());
        let symbol_only = self.load_header()?;
        let mut parts = Vec::new();

        while self.reader.advance()? {
            let line = self.reader.line();
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            if self.reader.scanner().peek() == "DEF" {
                parts.push(self.load_part()?);
            } else {
                log::debug!("{}: skipping `{line}`", self.reader.location());
            }
        }

        Ok(LibraryFile {
            version: self.version,
            symbol_only,
            parts,
        })
    }

    fn next_line(&mut self, sentinel: &'static str) -> Result<()> {
        if self.reader.advance()? {
            Ok(())
        } else {
            Err(self.reader.missing(sentinel))
        }
    }

    fn load_header(&mut self) -> Result<bool> {
        self.next_line(LIBRARY_HEADER)?;
        let mut s = self.reader.scanner();
        let invalid = |s: &Scanner| Error::InvalidHeader {
            expected: LIBRARY_HEADER,
            at: s.location(),
        };
        if !s.keyword(LIBRARY_HEADER) {
            return Err(invalid(&s));
        }
        let at = s.location();
        self.version = LibVersion::parse(s.unquoted()?).ok_or(Error::InvalidHeader {
            expected: "<major>.<minor> version",
            at,
        })?;
        Ok(s.keyword("SYMBOL"))
    }

    fn load_part(&mut self) -> Result<LibPart> {
        let mut part = {
            let mut s = self.reader.scanner();
            s.expect("DEF")?;
            let mut name = s.unquoted()?;
            let mut value_visible = true;
            if let Some(stripped) = name.strip_prefix('~') {
                name = stripped;
                value_visible = false;
            }

            let mut part = LibPart::new(name);
            part.fields[VALUE].visible = value_visible;
            let prefix = s.unquoted()?;
            part.prefix = if prefix == "~" {
                String::new()
            } else {
                prefix.to_string()
            };
            // Unused text offset slot
            s.int()?;
            part.pin_name_offset = s.int()?;
            part.show_pin_numbers = yes_no(&mut s)?;
            part.show_pin_names = yes_no(&mut s)?;
            part.unit_count = s.int()?.max(1);

            let locked = s.char()?;
            // Old files wrote a meaningless flag here.
            part.units_locked = self.version <= LibVersion::new(2, 2) || locked == 'L';
            if !s.is_empty() {
                part.power = s.char()? == 'P';
            }
            part
        };

        loop {
            self.next_line("ENDDEF")?;
            let mut s = self.reader.scanner();

            if s.keyword("ENDDEF") {
                return Ok(part);
            } else if s.keyword("DRAW") {
                self.load_draw(&mut part)?;
            } else if s.keyword("$FPLIST") {
                self.load_footprint_filters(&mut part)?;
            } else if s.keyword("ALIAS") {
                while !s.is_empty() {
                    part.aliases.push(LibAlias::new(s.unquoted()?));
                }
            } else if is_field_tag(s.peek()) {
                load_part_field(&mut s, &mut part)?;
            } else if !s.keyword("Ti") && !s.is_empty() {
                log::debug!("{}: skipping `{}`", s.location(), s.rest());
            }
        }
    }

    fn load_footprint_filters(&mut self, part: &mut LibPart) -> Result<()> {
        loop {
            self.next_line("$ENDFPLIST")?;
            let mut s = self.reader.scanner();
            if s.keyword("$ENDFPLIST") {
                return Ok(());
            }
            if !s.is_empty() {
                part.footprint_filters.push(s.rest().trim_end().to_string());
            }
        }
    }

    fn load_draw(&mut self, part: &mut LibPart) -> Result<()> {
        loop {
            self.next_line("ENDDRAW")?;
            let mut s = self.reader.scanner();
            if s.keyword("ENDDRAW") {
                return Ok(());
            }

            let item = match s.peek() {
                "" => continue,
                "A" => load_arc(&mut s)?,
                "C" => load_circle(&mut s)?,
                "T" => load_text(&mut s)?,
                "S" => load_rectangle(&mut s)?,
                "P" => DrawItem::Polyline(load_poly(&mut s, |points, unit, convert, width, fill| {
                    Polyline {
                        points,
                        unit,
                        convert,
                        width,
                        fill,
                    }
                })?),
                "B" => DrawItem::Bezier(load_poly(&mut s, |points, unit, convert, width, fill| {
                    Bezier {
                        points,
                        unit,
                        convert,
                        width,
                        fill,
                    }
                })?),
                "X" => load_pin(&mut s)?,
                _ => return Err(s.unrecognized()),
            };
            part.draw.push(item);
        }
    }
}

/// `F0`, `F1`, ...
fn is_field_tag(token: &str) -> bool {
    token
        .strip_prefix('F')
        .is_some_and(|n| n.starts_with(|c: char| c.is_ascii_digit()))
}

fn yes_no(s: &mut Scanner) -> Result<bool> {
    let at = s.location();
    match s.char()? {
        'Y' => Ok(true),
        'N' => Ok(false),
        c => Err(unrecognized_char(c, at)),
    }
}

fn unrecognized_char(c: char, at: Location) -> Error {
    Error::UnrecognizedToken {
        token: c.to_string(),
        at,
    }
}

/// Read a single character token and map it through `f`.
fn char_token<T>(s: &mut Scanner, f: impl FnOnce(char) -> Option<T>) -> Result<T> {
    let at = s.location();
    let c = s.char()?;
    f(c).ok_or_else(|| unrecognized_char(c, at))
}

fn fill_mode(s: &mut Scanner) -> Result<FillMode> {
    char_token(s, FillMode::from_char)
}

/// `F<n> "text" x y size H|V V|I hjust style ["name"]`
fn load_part_field(s: &mut Scanner, part: &mut LibPart) -> Result<()> {
    let at = s.location();
    let tag = s.unquoted()?;
    let index: usize = tag[1..].parse().map_err(|_| Error::UnrecognizedToken {
        token: tag.to_string(),
        at,
    })?;

    let mut field = Field::new(Field::default_name(index));
    field.text = s.quoted()?;
    field.pos = Point::new(s.int()?, s.int()?);
    field.size = s.int()?;
    field.vertical = char_token(s, |c| match c {
        'H' => Some(false),
        'V' => Some(true),
        _ => None,
    })?;
    field.visible = char_token(s, |c| match c {
        'V' => Some(true),
        'I' => Some(false),
        _ => None,
    })?;
    if !s.is_empty() {
        field.h_justify = char_token(s, HJustify::from_char)?;
    }
    if !s.is_empty() && !s.rest().starts_with('"') {
        field.apply_style_token(s.unquoted()?);
    }

    if index < MANDATORY_FIELDS {
        // The value field always mirrors the part name.
        if index == VALUE {
            field.text = part.name.clone();
        }
        part.fields[index] = field;
    } else {
        if !s.is_empty() {
            field.name = s.quoted()?;
        }
        part.fields.push(field);
    }
    Ok(())
}

/// `A cx cy r t1 t2 unit convert width fill [sx sy ex ey]`
fn load_arc(s: &mut Scanner) -> Result<DrawItem> {
    s.expect("A")?;
    let center = Point::new(s.int()?, s.int()?);
    let radius = s.int()?;
    let start_angle = s.int()?;
    let end_angle = s.int()?;
    let unit = s.int()?;
    let convert = s.int()?;
    let width = s.int()?;
    let fill = fill_mode(s)?;

    let (start, end) = if s.is_empty() {
        (
            Arc::point_at(center, radius, start_angle),
            Arc::point_at(center, radius, end_angle),
        )
    } else {
        (
            Point::new(s.int()?, s.int()?),
            Point::new(s.int()?, s.int()?),
        )
    };

    Ok(DrawItem::Arc(Arc {
        center,
        radius,
        start_angle,
        end_angle,
        start,
        end,
        unit,
        convert,
        width,
        fill,
    }))
}

/// `C x y r unit convert width fill`
fn load_circle(s: &mut Scanner) -> Result<DrawItem> {
    s.expect("C")?;
    Ok(DrawItem::Circle(Circle {
        center: Point::new(s.int()?, s.int()?),
        radius: s.int()?,
        unit: s.int()?,
        convert: s.int()?,
        width: s.int()?,
        fill: fill_mode(s)?,
    }))
}

/// `S sx sy ex ey unit convert width fill`
fn load_rectangle(s: &mut Scanner) -> Result<DrawItem> {
    s.expect("S")?;
    Ok(DrawItem::Rectangle(Rectangle {
        start: Point::new(s.int()?, s.int()?),
        end: Point::new(s.int()?, s.int()?),
        unit: s.int()?,
        convert: s.int()?,
        width: s.int()?,
        fill: fill_mode(s)?,
    }))
}

/// `P|B count unit convert width x0 y0 ... [fill]`
fn load_poly<T>(
    s: &mut Scanner,
    build: impl FnOnce(Vec<Point>, i32, i32, i32, FillMode) -> T,
) -> Result<T> {
    s.unquoted()?;
    let at = s.location();
    let count = s.int()?;
    let count = usize::try_from(count).map_err(|_| Error::InvalidValue {
        message: format!("invalid point count {count}"),
        at,
    })?;
    let unit = s.int()?;
    let convert = s.int()?;
    let width = s.int()?;
    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        points.push(Point::new(s.int()?, s.int()?));
    }
    let fill = if s.is_empty() {
        FillMode::NoFill
    } else {
        fill_mode(s)?
    };
    Ok(build(points, unit, convert, width, fill))
}

/// `T angle x y size hidden unit convert text [Italic|Normal bold hjust vjust]`
fn load_text(s: &mut Scanner) -> Result<DrawItem> {
    s.expect("T")?;
    let angle = s.double()?;
    let pos = Point::new(s.int()?, s.int()?);
    let size = s.int()?;
    let hidden = s.int()?;
    let unit = s.int()?;
    let convert = s.int()?;

    let text = if s.rest().starts_with('"') {
        s.quoted()?.replace("''", "\"")
    } else {
        s.unquoted()?.replace('~', " ")
    };

    let mut item = LibText {
        angle,
        pos,
        size,
        visible: hidden == 0,
        unit,
        convert,
        text,
        italic: false,
        bold: false,
        h_justify: HJustify::Center,
        v_justify: VJustify::Center,
    };

    if !s.is_empty() {
        item.italic = s.unquoted()?.eq_ignore_ascii_case("italic");
        item.bold = s.int()? > 0;
        item.h_justify = char_token(s, HJustify::from_char)?;
        item.v_justify = char_token(s, VJustify::from_char)?;
    }
    Ok(DrawItem::Text(item))
}

/// `X name number x y length orient num_size name_size unit convert etype [flags]`
fn load_pin(s: &mut Scanner) -> Result<DrawItem> {
    s.expect("X")?;
    let tilde_empty = |t: &str| if t == "~" { String::new() } else { t.to_string() };
    let name = tilde_empty(s.unquoted()?);
    let number = tilde_empty(s.unquoted()?);
    let pos = Point::new(s.int()?, s.int()?);
    let length = s.int()?;
    let orientation = char_token(s, PinOrientation::from_char)?;
    let number_size = s.int()?;
    let name_size = s.int()?;
    let unit = s.int()?;
    let convert = s.int()?;
    let electrical = char_token(s, ElectricalType::from_char)?;

    let mut visible = true;
    let mut shape = PinShape::Line;
    if !s.is_empty() {
        let at = s.location();
        let flags = s.unquoted()?;
        let (mut inverted, mut clock, mut low_in, mut low_out, mut falling, mut non_logic) =
            (false, false, false, false, false, false);
        for c in flags.chars() {
            match c {
                'N' => visible = false,
                'I' => inverted = true,
                'C' => clock = true,
                'L' => low_in = true,
                'V' => low_out = true,
                'F' => falling = true,
                'X' => non_logic = true,
                c => return Err(unrecognized_char(c, at)),
            }
        }
        shape = PinShape::from_flags(inverted, clock, low_in, low_out, falling, non_logic)
            .ok_or_else(|| Error::InvalidValue {
                message: format!("invalid pin shape `{flags}`"),
                at,
            })?;
    }

    Ok(DrawItem::Pin(Pin {
        name,
        number,
        pos,
        length,
        orientation,
        number_size,
        name_size,
        unit,
        convert,
        electrical,
        shape,
        visible,
    }))
}
