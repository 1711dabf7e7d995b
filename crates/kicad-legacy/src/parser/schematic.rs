//! Loader for `.sch` schematic files

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::model::{
    reference_prefix, Bitmap, BusAlias, BusEntry, BusEntryKind, Color, Component,
    ComponentInstance, Field, HJustify, Junction, LibId, Line, LineLayer, LineStyle, NoConnect,
    PageInfo, PinSheetShape, Point, SchItem, Screen, Sheet, SheetPin, SheetSide, Size, Text,
    TextKind, Transform, MANDATORY_FIELDS, REFERENCE,
};
use crate::reader::{BufLineReader, LineReader};
use crate::token::Scanner;

/// Magic at the start of every schematic file
pub const SCHEMATIC_HEADER: &str = "EESchema Schematic File Version";

/// Written in place of an empty reference designator
pub(crate) const NO_NAME_REFERENCE: &str = "_NONAME_";

/// `rgb(r, g, b)` or `rgba(r, g, b, a)` with comma or space separators
static COLOR_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rgba?\(\s*([0-9.]+)[\s,]+([0-9.]+)[\s,]+([0-9.]+)(?:[\s,]+([0-9.]+))?\s*\)")
        .unwrap()
});

/// Parse a schematic held in memory.
pub fn parse_schematic(text: &str, source: &str) -> Result<Screen> {
    let mut reader = BufLineReader::from_text(text, source);
    let mut screen = Screen::new(source);
    SchematicLoader::new(&mut reader).load(&mut screen)?;
    Ok(screen)
}

/// Load one schematic file, without following its sheets.
pub fn load_schematic_file(path: &Path) -> Result<Screen> {
    let mut reader = BufLineReader::open(path)?;
    let mut screen = Screen::new(path);
    SchematicLoader::new(&mut reader).load(&mut screen)?;
    Ok(screen)
}

#[derive(Debug, Clone, Copy)]
enum Record {
    Descr,
    Comp,
    Sheet,
    Bitmap,
    Connection,
    NoConn,
    Wire,
    Entry,
    Text,
    BusAlias,
    End,
    Blank,
}

/// Recursive descent loader over a schematic's record stream.
pub struct SchematicLoader<'r> {
    reader: &'r mut dyn LineReader,
    version: i32,
}

impl<'r> SchematicLoader<'r> {
    pub fn new(reader: &'r mut dyn LineReader) -> Self {
        Self { reader, version: 0 }
    }

    /// Populate `screen` from the reader. Any error aborts the whole load.
    pub fn load(mut self, screen: &mut Screen) -> Result<()> {
        log::debug!("loading schematic {}", self.reader.source());
        self.load_header(screen)?;

        while self.reader.advance()? {
            let record = {
                let s = self.reader.scanner();
                match s.peek() {
                    "" => Record::Blank,
                    "$Descr" => Record::Descr,
                    "$Comp" => Record::Comp,
                    "$Sheet" => Record::Sheet,
                    "$Bitmap" => Record::Bitmap,
                    "Connection" => Record::Connection,
                    "NoConn" => Record::NoConn,
                    "Wire" => Record::Wire,
                    "Entry" => Record::Entry,
                    "Text" => Record::Text,
                    "BusAlias" => Record::BusAlias,
                    "$EndSCHEMATC" => Record::End,
                    _ => return Err(s.unrecognized()),
                }
            };

            match record {
                Record::Blank => {}
                Record::Descr => self.load_page_settings(screen)?,
                Record::Comp => {
                    let comp = self.load_component(screen)?;
                    screen.items.push(SchItem::Component(comp));
                }
                Record::Sheet => {
                    let sheet = self.load_sheet()?;
                    screen.items.push(SchItem::Sheet(sheet));
                }
                Record::Bitmap => {
                    let bitmap = self.load_bitmap()?;
                    screen.items.push(SchItem::Bitmap(bitmap));
                }
                Record::Connection => {
                    let pos = self.load_marker("Connection")?;
                    screen.items.push(SchItem::Junction(Junction { pos }));
                }
                Record::NoConn => {
                    let pos = self.load_marker("NoConn")?;
                    screen.items.push(SchItem::NoConnect(NoConnect { pos }));
                }
                Record::Wire => {
                    let line = self.load_wire()?;
                    screen.items.push(SchItem::Line(line));
                }
                Record::Entry => {
                    let entry = self.load_bus_entry()?;
                    screen.items.push(SchItem::BusEntry(entry));
                }
                Record::Text => {
                    let text = self.load_text()?;
                    screen.items.push(SchItem::Text(text));
                }
                Record::BusAlias => {
                    let alias = self.load_bus_alias()?;
                    screen.bus_aliases.push(alias);
                }
                Record::End => break,
            }
        }

        Ok(())
    }

    fn next_line(&mut self, sentinel: &'static str) -> Result<()> {
        if self.reader.advance()? {
            Ok(())
        } else {
            Err(self.reader.missing(sentinel))
        }
    }

    fn load_header(&mut self, screen: &mut Screen) -> Result<()> {
        self.next_line(SCHEMATIC_HEADER)?;
        let mut s = self.reader.scanner();
        if !s.keyword(SCHEMATIC_HEADER) {
            return Err(Error::InvalidHeader {
                expected: SCHEMATIC_HEADER,
                at: s.location(),
            });
        }
        self.version = s.int()?;
        screen.version = self.version;

        // Library list comments until the layer sentinel.
        loop {
            self.next_line("EELAYER END")?;
            let mut s = self.reader.scanner();
            if s.keyword("EELAYER") && s.keyword("END") {
                return Ok(());
            }
        }
    }

    fn load_page_settings(&mut self, screen: &mut Screen) -> Result<()> {
        {
            let mut s = self.reader.scanner();
            s.expect("$Descr")?;
            let page_type = s.unquoted()?;
            let width = s.int()?;
            let height = s.int()?;
            screen.page = if page_type == PageInfo::CUSTOM {
                PageInfo {
                    page_type: page_type.to_string(),
                    width,
                    height,
                    portrait: false,
                }
            } else {
                let portrait = s.unquoted_opt()? == "portrait";
                PageInfo::standard(page_type, portrait)
                    .ok_or_else(|| s.invalid(format!("invalid page size `{page_type}`")))?
            };
        }

        loop {
            self.next_line("$EndDescr")?;
            let mut s = self.reader.scanner();
            let block = &mut screen.title_block;
            if s.keyword("$EndDescr") {
                return Ok(());
            } else if s.keyword("Sheet") {
                screen.sheet_number = s.int()?;
                screen.sheet_count = s.int()?;
            } else if s.keyword("Title") {
                block.title = s.quoted()?;
            } else if s.keyword("Date") {
                block.date = s.quoted()?;
            } else if s.keyword("Rev") {
                block.revision = s.quoted()?;
            } else if s.keyword("Comp") {
                block.company = s.quoted()?;
            } else if s.keyword("Comment1") {
                block.comments[0] = s.quoted()?;
            } else if s.keyword("Comment2") {
                block.comments[1] = s.quoted()?;
            } else if s.keyword("Comment3") {
                block.comments[2] = s.quoted()?;
            } else if s.keyword("Comment4") {
                block.comments[3] = s.quoted()?;
            } else if !s.keyword("encoding") && !s.is_empty() {
                return Err(s.unrecognized());
            }
        }
    }

    fn load_component(&mut self, screen: &mut Screen) -> Result<Component> {
        let mut comp = Component::default();

        loop {
            self.next_line("$EndComp")?;
            let mut s = self.reader.scanner();

            if s.keyword("$EndComp") {
                return Ok(comp);
            } else if s.keyword("L") {
                let lib = match s.unquoted()? {
                    NO_NAME_REFERENCE => String::new(),
                    lib => lib.replace('~', " "),
                };
                comp.lib_id = LibId::parse(&lib);
                let mut reference = s.unquoted()?;
                if reference == NO_NAME_REFERENCE {
                    reference = "";
                }
                comp.prefix = reference_prefix(reference).to_string();
                comp.fields[REFERENCE].text = reference.to_string();
            } else if s.keyword("U") {
                comp.unit = s.int()?;
                comp.convert = s.int()?;
                comp.timestamp = s.hex()?;
                // Old versions could write 0 for either, which breaks unit selection.
                if comp.unit == 0 {
                    log::warn!("{}: component unit 0 changed to 1", s.location());
                    comp.unit = 1;
                    screen.modified = true;
                }
                if comp.convert == 0 {
                    log::warn!("{}: component body style 0 changed to 1", s.location());
                    comp.convert = 1;
                    screen.modified = true;
                }
            } else if s.keyword("P") {
                comp.pos = Point::new(s.int()?, s.int()?);
            } else if s.keyword("AR") {
                s.expect("Path=")?;
                let path = s.quoted()?;
                s.expect("Ref=")?;
                let reference = s.quoted()?;
                s.expect("Part=")?;
                let at = s.location();
                let unit = s.quoted()?;
                let unit = unit.parse::<i32>().map_err(|_| Error::InvalidValue {
                    message: format!("invalid unit `{unit}`"),
                    at,
                })?;
                comp.instances.push(ComponentInstance {
                    path,
                    reference,
                    unit,
                });
            } else if s.keyword("F") {
                load_component_field(&mut s, &mut comp)?;
            } else {
                // Redundant "unit x y" line followed by the orientation matrix.
                s.int()?;
                s.int()?;
                s.int()?;
                self.next_line("$EndComp")?;
                let mut s = self.reader.scanner();
                comp.transform = Transform {
                    x1: transform_entry(&mut s)?,
                    y1: transform_entry(&mut s)?,
                    x2: transform_entry(&mut s)?,
                    y2: transform_entry(&mut s)?,
                };
            }
        }
    }

    fn load_sheet(&mut self) -> Result<Sheet> {
        let mut sheet = Sheet::default();

        loop {
            self.next_line("$EndSheet")?;
            let mut s = self.reader.scanner();

            if s.keyword("$EndSheet") {
                return Ok(sheet);
            } else if s.keyword("S") {
                sheet.pos = Point::new(s.int()?, s.int()?);
                sheet.size = Size {
                    width: s.int()?,
                    height: s.int()?,
                };
            } else if s.keyword("U") {
                sheet.timestamp = s.hex()?;
            } else if let Some(number) = s.peek().strip_prefix('F') {
                let at = s.location();
                let number = number.parse::<i32>().map_err(|_| Error::UnrecognizedToken {
                    token: s.peek().to_string(),
                    at,
                })?;
                s.unquoted()?;
                match number {
                    0 => {
                        sheet.name = s.quoted()?;
                        sheet.name_size = s.int()?;
                    }
                    1 => {
                        sheet.file_name = s.quoted()?;
                        sheet.file_name_size = s.int()?;
                    }
                    _ => sheet.pins.push(load_sheet_pin(&mut s, number)?),
                }
            } else if !s.is_empty() {
                return Err(s.unrecognized());
            }
        }
    }

    fn load_bitmap(&mut self) -> Result<Bitmap> {
        let mut bitmap = Bitmap {
            pos: Point::default(),
            scale: 1.0,
            png: Vec::new(),
        };

        loop {
            self.next_line("$EndBitmap")?;
            let mut s = self.reader.scanner();

            if s.keyword("$EndBitmap") {
                return Ok(bitmap);
            } else if s.keyword("Pos") {
                bitmap.pos = Point::new(s.int()?, s.int()?);
            } else if s.keyword("Scale") {
                let scale = match s.double() {
                    Ok(scale) => scale,
                    Err(Error::NumericRange { .. }) => f64::INFINITY,
                    Err(err) => return Err(err),
                };
                bitmap.scale = if scale.is_normal() {
                    scale
                } else {
                    log::warn!("{}: bitmap scale {scale} replaced by 1.0", s.location());
                    1.0
                };
            } else if s.keyword("Data") {
                self.load_bitmap_data(&mut bitmap.png)?;
            } else if !s.is_empty() {
                return Err(s.unrecognized());
            }
        }
    }

    /// Hex byte pairs, each followed by one separator.
    fn load_bitmap_data(&mut self, png: &mut Vec<u8>) -> Result<()> {
        loop {
            self.next_line("EndData")?;
            let mut s = self.reader.scanner();
            if s.keyword("EndData") {
                return Ok(());
            }

            let line = self.reader.line();
            let mut i = 0;
            while i < line.len() {
                let pair = line.get(i..(i + 2).min(line.len())).map(str::trim);
                match pair {
                    Some("") => {}
                    Some(pair) if pair.len() == 2 => {
                        let byte = u8::from_str_radix(pair, 16)
                            .map_err(|_| bitmap_error(&s, i))?;
                        png.push(byte);
                    }
                    _ => return Err(bitmap_error(&s, i)),
                }
                i += 3;
            }
        }
    }

    fn load_marker(&mut self, keyword: &str) -> Result<Point> {
        let mut s = self.reader.scanner();
        s.expect(keyword)?;
        s.unquoted()?;
        Ok(Point::new(s.int()?, s.int()?))
    }

    fn load_wire(&mut self) -> Result<Line> {
        let (layer, width, style, color) = {
            let mut s = self.reader.scanner();
            s.expect("Wire")?;
            let layer = match s.peek() {
                "Wire" => LineLayer::Wire,
                "Bus" => LineLayer::Bus,
                "Notes" => LineLayer::Notes,
                _ => return Err(s.unrecognized()),
            };
            s.unquoted()?;
            s.expect("Line")?;

            let mut width = layer.default_width();
            let mut style = layer.default_style();
            let mut color = layer.default_color();
            while !s.is_empty() {
                if s.keyword("width") {
                    width = s.int()?;
                } else if s.keyword("style") {
                    let name = s.unquoted()?;
                    style = LineStyle::from_keyword(name)
                        .ok_or_else(|| s.invalid(format!("unknown line style `{name}`")))?;
                } else if s.rest().starts_with("rgb") {
                    let (parsed, len) = parse_color(&s)?;
                    color = Some(parsed);
                    s.skip(len);
                } else {
                    return Err(s.unrecognized());
                }
            }
            (layer, width, style, color)
        };

        self.next_line("line end points")?;
        let mut s = self.reader.scanner();
        let start = Point::new(s.int()?, s.int()?);
        let end = Point::new(s.int()?, s.int()?);
        Ok(Line {
            layer,
            start,
            end,
            width,
            style,
            color,
        })
    }

    fn load_bus_entry(&mut self) -> Result<BusEntry> {
        let kind = {
            let mut s = self.reader.scanner();
            s.expect("Entry")?;
            if s.keyword("Wire") {
                s.expect("Line")?;
                BusEntryKind::WireToBus
            } else if s.keyword("Bus") {
                s.expect("Bus")?;
                BusEntryKind::BusToBus
            } else {
                return Err(s.unrecognized());
            }
        };

        self.next_line("bus entry end points")?;
        let mut s = self.reader.scanner();
        let pos = Point::new(s.int()?, s.int()?);
        let end = Point::new(s.int()?, s.int()?);
        Ok(BusEntry {
            kind,
            pos,
            size: Size {
                width: end.x - pos.x,
                height: end.y - pos.y,
            },
        })
    }

    fn load_text(&mut self) -> Result<Text> {
        let mut text = {
            let mut s = self.reader.scanner();
            s.expect("Text")?;
            let kind = match s.peek() {
                "Notes" => TextKind::Notes,
                "Label" => TextKind::Label,
                "HLabel" => TextKind::HierLabel,
                // Version 1 files predate global labels.
                "GLabel" if self.version == 1 => TextKind::HierLabel,
                "GLabel" => TextKind::GlobalLabel,
                _ => return Err(s.unrecognized()),
            };
            s.unquoted()?;

            let mut text = Text {
                kind,
                pos: Point::new(s.int()?, s.int()?),
                spin: s.int()?,
                size: s.int()?,
                shape: PinSheetShape::default(),
                italic: false,
                thickness: 0,
                text: String::new(),
            };

            if kind.has_shape() {
                let keyword = s.unquoted()?;
                text.shape = PinSheetShape::from_label_keyword(keyword)
                    .ok_or_else(|| s.invalid(format!("unknown label shape `{keyword}`")))?;
            }

            // Neither token exists in version 1 and both are optional in version 2.
            if self.version > 1 {
                if self.version > 2 || !s.is_empty() {
                    if s.keyword("Italic") {
                        text.italic = true;
                    } else if !s.keyword("~") {
                        return Err(s.invalid("expected `Italic` or `~`"));
                    }
                }
                if self.version > 2 || !s.is_empty() {
                    text.thickness = s.int()?;
                }
            }
            text
        };

        self.next_line("text payload")?;
        text.text = self.reader.line().replace("\\n", "\n");
        Ok(text)
    }

    fn load_bus_alias(&mut self) -> Result<BusAlias> {
        let mut s = self.reader.scanner();
        s.expect("BusAlias")?;
        let name = s.unquoted()?.to_string();
        let mut members = Vec::new();
        while !s.is_empty() {
            members.push(s.unquoted()?.to_string());
        }
        Ok(BusAlias { name, members })
    }
}

/// `F <n> "text" H x y size flags hjust style ["name"]`
fn load_component_field(s: &mut Scanner, comp: &mut Component) -> Result<()> {
    let at = s.location();
    let index = s.int()?;
    let index = usize::try_from(index).map_err(|_| Error::InvalidValue {
        message: format!("invalid field index {index}"),
        at,
    })?;

    let mut field = Field::new(Field::default_name(index));
    field.text = s.quoted()?;
    field.vertical = match s.char()? {
        'H' => false,
        'V' => true,
        c => return Err(s.invalid(format!("invalid field orientation `{c}`"))),
    };
    field.pos = Point::new(s.int()?, s.int()?);
    field.size = s.int()?;
    field.visible = (s.hex()? & 0x0001) == 0;

    if !s.is_empty() {
        let c = s.char()?;
        field.h_justify =
            HJustify::from_char(c).ok_or_else(|| s.invalid(format!("invalid justification `{c}`")))?;
    }
    if !s.is_empty() && !s.rest().starts_with('"') {
        field.apply_style_token(s.unquoted()?);
    }

    if index < MANDATORY_FIELDS {
        comp.fields[index] = field;
    } else {
        if !s.is_empty() {
            field.name = s.quoted()?;
        }
        if field.text.is_empty() {
            log::debug!("dropping empty user field `{}`", field.name);
        } else {
            comp.fields.push(field);
        }
    }
    Ok(())
}

fn load_sheet_pin(s: &mut Scanner, number: i32) -> Result<SheetPin> {
    let text = s.quoted()?;
    let c = s.char()?;
    let shape = PinSheetShape::from_char(c)
        .ok_or_else(|| s.invalid(format!("invalid sheet pin type `{c}`")))?;
    let c = s.char()?;
    let side =
        SheetSide::from_char(c).ok_or_else(|| s.invalid(format!("invalid sheet pin side `{c}`")))?;
    Ok(SheetPin {
        number,
        text,
        shape,
        side,
        pos: Point::new(s.int()?, s.int()?),
        size: s.int()?,
    })
}

fn transform_entry(s: &mut Scanner) -> Result<i32> {
    let at = s.location();
    let value = s.int()?;
    if (-1..=1).contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidTransform { value, at })
    }
}

/// Parse a color literal at the cursor. Returns the color and its length.
fn parse_color(s: &Scanner) -> Result<(Color, usize)> {
    let caps = COLOR_LITERAL
        .captures(s.rest())
        .ok_or_else(|| s.invalid("malformed color"))?;

    let channel = |i: usize| -> Result<u8> {
        let text = caps.get(i).map(|m| m.as_str()).unwrap_or("0");
        let value: f64 = text
            .parse()
            .map_err(|_| s.invalid(format!("malformed color channel `{text}`")))?;
        Ok(value.round().clamp(0.0, 255.0) as u8)
    };

    let a = match caps.get(4).map(|m| m.as_str()) {
        None => 255,
        // CSS style fractional alpha
        Some(text) if text.contains('.') => {
            let value: f64 = text
                .parse()
                .map_err(|_| s.invalid(format!("malformed color channel `{text}`")))?;
            (value.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        Some(_) => channel(4)?,
    };

    let len = caps.get(0).map_or(0, |m| m.end());
    Ok((
        Color {
            r: channel(1)?,
            g: channel(2)?,
            b: channel(3)?,
            a,
        },
        len,
    ))
}

fn bitmap_error(s: &Scanner, offset: usize) -> Error {
    let mut at = s.location();
    at.offset = offset;
    Error::MalformedToken {
        expected: "hex byte",
        at,
    }
}
