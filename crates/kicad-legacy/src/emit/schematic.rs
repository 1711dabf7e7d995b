//! Writer for `.sch` schematic files

use std::fmt::{self, Write};
use std::path::Path;

use super::{format_double, to_string, write_file, Quoted};
use crate::error::Result;
use crate::model::{
    Bitmap, BusAlias, BusEntry, BusEntryKind, Component, Field, Line, SchItem, Screen, Sheet,
    Text, MANDATORY_FIELDS,
};
use crate::parser::{NO_NAME_REFERENCE, SCHEMATIC_HEADER};

/// Bytes of bitmap data per line
const BITMAP_BYTES_PER_LINE: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct SchematicWriterOptions {
    /// Written as `LIBS:<name>` comment lines after the header
    pub libraries: Vec<String>,
}

pub fn format_schematic(screen: &Screen, options: &SchematicWriterOptions) -> String {
    to_string(|out| write_schematic(out, screen, options))
}

/// Write `screen` to `path`. A symlink at `path` is written through.
pub fn save_schematic(
    screen: &Screen,
    path: &Path,
    options: &SchematicWriterOptions,
) -> Result<()> {
    write_file(path, &format_schematic(screen, options))
}

pub fn write_schematic<W: Write>(
    out: &mut W,
    screen: &Screen,
    options: &SchematicWriterOptions,
) -> fmt::Result {
    writeln!(out, "{SCHEMATIC_HEADER} {}", crate::SCHEMATIC_VERSION)?;
    for library in &options.libraries {
        writeln!(out, "LIBS:{library}")?;
    }
    writeln!(out, "EELAYER 30 0")?;
    writeln!(out, "EELAYER END")?;

    write_page_settings(out, screen)?;
    for alias in &screen.bus_aliases {
        write_bus_alias(out, alias)?;
    }

    for item in &screen.items {
        match item {
            SchItem::Component(comp) => write_component(out, comp)?,
            SchItem::Sheet(sheet) => write_sheet(out, sheet)?,
            SchItem::Bitmap(bitmap) => write_bitmap(out, bitmap)?,
            SchItem::Junction(j) => writeln!(out, "Connection ~ {} {}", j.pos.x, j.pos.y)?,
            SchItem::NoConnect(nc) => writeln!(out, "NoConn ~ {} {}", nc.pos.x, nc.pos.y)?,
            SchItem::Line(line) => write_line(out, line)?,
            SchItem::BusEntry(entry) => write_bus_entry(out, entry)?,
            SchItem::Text(text) => write_text(out, text)?,
        }
    }

    writeln!(out, "$EndSCHEMATC")
}

fn write_page_settings<W: Write>(out: &mut W, screen: &Screen) -> fmt::Result {
    let page = &screen.page;
    write!(out, "$Descr {} {} {}", page.page_type, page.width, page.height)?;
    if !page.is_custom() && page.portrait {
        write!(out, " portrait")?;
    }
    writeln!(out)?;
    writeln!(out, "encoding utf-8")?;
    writeln!(out, "Sheet {} {}", screen.sheet_number, screen.sheet_count)?;

    let block = &screen.title_block;
    writeln!(out, "Title {}", Quoted(&block.title))?;
    writeln!(out, "Date {}", Quoted(&block.date))?;
    writeln!(out, "Rev {}", Quoted(&block.revision))?;
    writeln!(out, "Comp {}", Quoted(&block.company))?;
    for (i, comment) in block.comments.iter().enumerate() {
        writeln!(out, "Comment{} {}", i + 1, Quoted(comment))?;
    }
    writeln!(out, "$EndDescr")
}

fn write_bus_alias<W: Write>(out: &mut W, alias: &BusAlias) -> fmt::Result {
    write!(out, "BusAlias {}", alias.name)?;
    for member in &alias.members {
        write!(out, " {member}")?;
    }
    writeln!(out)
}

fn write_component<W: Write>(out: &mut W, comp: &Component) -> fmt::Result {
    let lib_id = match comp.lib_id.to_string() {
        id if id.is_empty() => NO_NAME_REFERENCE.to_string(),
        id => id.replace(' ', "~"),
    };
    let reference = match comp.reference() {
        "" => NO_NAME_REFERENCE,
        r => r,
    };
    writeln!(out, "$Comp")?;
    writeln!(out, "L {lib_id} {reference}")?;
    writeln!(out, "U {} {} {:08X}", comp.unit, comp.convert, comp.timestamp)?;
    writeln!(out, "P {} {}", comp.pos.x, comp.pos.y)?;

    for instance in &comp.instances {
        writeln!(
            out,
            "AR Path={} Ref={}  Part=\"{}\" ",
            Quoted(&instance.path),
            Quoted(&instance.reference),
            instance.unit
        )?;
    }

    // User fields without text carry nothing worth keeping.
    let fields = comp
        .fields
        .iter()
        .enumerate()
        .filter(|(i, field)| *i < MANDATORY_FIELDS || !field.text.is_empty());
    for (i, (_, field)) in fields.enumerate() {
        write_component_field(out, i, field)?;
    }

    writeln!(out, "\t{:<4} {:<4} {:<4}", comp.unit, comp.pos.x, comp.pos.y)?;
    let t = &comp.transform;
    writeln!(out, "\t{:<4} {:<4} {:<4} {:<4}", t.x1, t.y1, t.x2, t.y2)?;
    writeln!(out, "$EndComp")
}

fn write_component_field<W: Write>(out: &mut W, index: usize, field: &Field) -> fmt::Result {
    write!(
        out,
        "F {} {} {} {:<3} {:<3} {:<3} {:04X} {} {}",
        index,
        Quoted(&field.text),
        if field.vertical { 'V' } else { 'H' },
        field.pos.x,
        field.pos.y,
        field.size,
        u32::from(!field.visible),
        field.h_justify.as_char(),
        field.style_token(),
    )?;
    if index >= MANDATORY_FIELDS {
        write!(out, " {}", Quoted(&field.name))?;
    }
    writeln!(out)
}

fn write_sheet<W: Write>(out: &mut W, sheet: &Sheet) -> fmt::Result {
    writeln!(out, "$Sheet")?;
    writeln!(
        out,
        "S {:<4} {:<4} {:<4} {:<4}",
        sheet.pos.x, sheet.pos.y, sheet.size.width, sheet.size.height
    )?;
    writeln!(out, "U {:08X}", sheet.timestamp)?;
    writeln!(out, "F0 {} {}", Quoted(&sheet.name), sheet.name_size)?;
    writeln!(out, "F1 {} {}", Quoted(&sheet.file_name), sheet.file_name_size)?;
    for pin in &sheet.pins {
        writeln!(
            out,
            "F{} {} {} {} {:<3} {:<3} {:<3}",
            pin.number,
            Quoted(&pin.text),
            pin.shape.as_char(),
            pin.side.as_char(),
            pin.pos.x,
            pin.pos.y,
            pin.size
        )?;
    }
    writeln!(out, "$EndSheet")
}

fn write_bitmap<W: Write>(out: &mut W, bitmap: &Bitmap) -> fmt::Result {
    writeln!(out, "$Bitmap")?;
    writeln!(out, "Pos {:<4} {:<4}", bitmap.pos.x, bitmap.pos.y)?;
    writeln!(out, "Scale {}", format_double(bitmap.scale))?;
    writeln!(out, "Data")?;
    for chunk in bitmap.png.chunks(BITMAP_BYTES_PER_LINE) {
        for byte in chunk {
            write!(out, "{byte:02X} ")?;
        }
        writeln!(out)?;
    }
    writeln!(out, "EndData")?;
    writeln!(out, "$EndBitmap")
}

fn write_line<W: Write>(out: &mut W, line: &Line) -> fmt::Result {
    write!(out, "Wire {} Line", line.layer.keyword())?;
    if line.width != line.layer.default_width() {
        write!(out, " width {}", line.width)?;
    }
    if line.style != line.layer.default_style() {
        write!(out, " style {}", line.style.keyword())?;
    }
    if line.color != line.layer.default_color() {
        if let Some(c) = line.color {
            if c.a == 255 {
                write!(out, " rgb({}, {}, {})", c.r, c.g, c.b)?;
            } else {
                let alpha = f64::from(c.a) / 255.0;
                write!(out, " rgba({}, {}, {}, {alpha:.3})", c.r, c.g, c.b)?;
            }
        }
    }
    writeln!(out)?;
    writeln!(
        out,
        "\t{:<4} {:<4} {:<4} {:<4}",
        line.start.x, line.start.y, line.end.x, line.end.y
    )
}

fn write_bus_entry<W: Write>(out: &mut W, entry: &BusEntry) -> fmt::Result {
    match entry.kind {
        BusEntryKind::WireToBus => writeln!(out, "Entry Wire Line")?,
        BusEntryKind::BusToBus => writeln!(out, "Entry Bus Bus")?,
    }
    let end = entry.end();
    writeln!(
        out,
        "\t{:<4} {:<4} {:<4} {:<4}",
        entry.pos.x, entry.pos.y, end.x, end.y
    )
}

fn write_text<W: Write>(out: &mut W, text: &Text) -> fmt::Result {
    write!(
        out,
        "Text {} {:<4} {:<4} {:<4} {:<4}",
        text.kind.keyword(),
        text.pos.x,
        text.pos.y,
        text.spin,
        text.size
    )?;
    if text.kind.has_shape() {
        write!(out, " {}", text.shape.label_keyword())?;
    }
    writeln!(
        out,
        " {} {}",
        if text.italic { "Italic" } else { "~" },
        text.thickness
    )?;
    writeln!(out, "{}", text.text.replace('\n', "\\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Color, ComponentInstance, Junction, LineLayer, LineStyle, PageInfo, Point,
    };
    use crate::parser::parse_schematic;

    fn body(screen: &Screen) -> String {
        let text = format_schematic(screen, &SchematicWriterOptions::default());
        let start = text.find("$EndDescr\n").unwrap() + "$EndDescr\n".len();
        let end = text.find("$EndSCHEMATC").unwrap();
        text[start..end].to_string()
    }

    #[test]
    fn test_junction_text() {
        let mut screen = Screen::default();
        screen.items.push(SchItem::Junction(Junction {
            pos: Point::new(100, 200),
        }));
        assert_eq!(body(&screen), "Connection ~ 100 200\n");
    }

    #[test]
    fn test_header_lists_libraries() {
        let options = SchematicWriterOptions {
            libraries: vec!["power".to_string(), "device".to_string()],
        };
        let text = format_schematic(&Screen::default(), &options);
        assert!(text.starts_with(
            "EESchema Schematic File Version 4\nLIBS:power\nLIBS:device\nEELAYER 30 0\nEELAYER END\n$Descr A4 11693 8268\n"
        ));
        assert!(text.ends_with("$EndDescr\n$EndSCHEMATC\n"));
    }

    #[test]
    fn test_custom_page_never_portrait() {
        let mut screen = Screen::default();
        screen.page = PageInfo {
            page_type: PageInfo::CUSTOM.to_string(),
            width: 5000,
            height: 4000,
            portrait: true,
        };
        let text = format_schematic(&screen, &SchematicWriterOptions::default());
        assert!(text.contains("$Descr User 5000 4000\n"));
    }

    #[test]
    fn test_default_line_attributes_are_omitted() {
        let mut screen = Screen::default();
        let plain = Line::new(LineLayer::Bus, Point::new(0, 0), Point::new(100, 0));
        let mut styled = Line::new(LineLayer::Notes, Point::new(0, 0), Point::new(0, 100));
        styled.style = LineStyle::Solid;
        styled.color = Some(Color::rgb(1, 2, 3));
        screen.items.push(SchItem::Line(plain));
        screen.items.push(SchItem::Line(styled));
        assert_eq!(
            body(&screen),
            "Wire Bus Line\n\t0    0    100  0   \nWire Notes Line style solid rgb(1, 2, 3)\n\t0    0    0    100 \n"
        );
    }

    #[test]
    fn test_instance_path_is_escaped() {
        let mut comp = Component::default();
        comp.instances.push(ComponentInstance {
            path: "/5C3A\\".to_string(),
            reference: "R\"1".to_string(),
            unit: 2,
        });
        let mut screen = Screen::default();
        screen.items.push(SchItem::Component(comp));

        let text = format_schematic(&screen, &SchematicWriterOptions::default());
        assert!(text.contains("AR Path=\"/5C3A\\\\\" Ref=\"R\\\"1\"  Part=\"2\" \n"));
        assert_eq!(parse_schematic(&text, "t.sch").unwrap(), screen);
    }

    #[test]
    fn test_translucent_color_alpha_is_fractional() {
        let mut screen = Screen::default();
        let mut line = Line::new(LineLayer::Wire, Point::new(0, 0), Point::new(10, 0));
        line.color = Some(Color { r: 255, g: 0, b: 0, a: 128 });
        screen.items.push(SchItem::Line(line));

        let text = body(&screen);
        assert!(text.starts_with("Wire Wire Line rgba(255, 0, 0, 0.502)\n"));

        let full = format_schematic(&screen, &SchematicWriterOptions::default());
        assert_eq!(parse_schematic(&full, "t.sch").unwrap(), screen);
    }

    #[test]
    fn test_empty_names_written_as_noname() {
        let mut screen = Screen::default();
        screen.items.push(SchItem::Component(Component::default()));
        let text = format_schematic(&screen, &SchematicWriterOptions::default());
        assert!(text.contains("L _NONAME_ _NONAME_\n"));
        assert!(text.contains("F 0 \"\" H 0   0   50  0000 C CNN\n"));
        assert_eq!(parse_schematic(&text, "t.sch").unwrap(), screen);
    }

    #[test]
    fn test_empty_user_fields_are_skipped() {
        let mut comp = Component::default();
        for (name, text) in [("Note", ""), ("Vendor", "ACME")] {
            let mut field = Field::new(name);
            field.text = text.to_string();
            comp.fields.push(field);
        }
        let mut screen = Screen::default();
        screen.items.push(SchItem::Component(comp));

        let text = body(&screen);
        assert!(!text.contains("\"Note\""));
        assert!(text.contains("F 4 \"ACME\""));
    }
}
