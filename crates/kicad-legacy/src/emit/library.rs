//! Writer for `.lib` symbol libraries

use std::fmt::{self, Write};
use std::path::Path;

use super::{to_string, write_file, Quoted};
use crate::error::Result;
use crate::model::{DrawItem, Field, LibPart, LibText, Pin, Point, MANDATORY_FIELDS, VALUE};
use crate::parser::{LibVersion, LIBRARY_HEADER};

pub fn format_library<'a>(parts: impl IntoIterator<Item = &'a LibPart>) -> String {
    to_string(|out| write_library(out, parts))
}

pub fn save_library_file<'a>(
    path: &Path,
    parts: impl IntoIterator<Item = &'a LibPart>,
) -> Result<()> {
    write_file(path, &format_library(parts))
}

pub fn write_library<'a, W: Write>(
    out: &mut W,
    parts: impl IntoIterator<Item = &'a LibPart>,
) -> fmt::Result {
    writeln!(out, "{LIBRARY_HEADER} {}", LibVersion::CURRENT)?;
    writeln!(out, "#encoding utf-8")?;
    for part in parts {
        write_part(out, part)?;
    }
    writeln!(out, "#")?;
    writeln!(out, "#End Library")
}

/// One `DEF` ... `ENDDEF` record, draw items in canonical order.
pub fn write_part<W: Write>(out: &mut W, part: &LibPart) -> fmt::Result {
    writeln!(out, "#")?;
    writeln!(out, "# {}", part.name)?;
    writeln!(out, "#")?;

    let hidden_value = !part.fields[VALUE].visible;
    writeln!(
        out,
        "DEF {}{} {} 0 {} {} {} {} {} {}",
        if hidden_value { "~" } else { "" },
        part.name,
        if part.prefix.is_empty() { "~" } else { part.prefix.as_str() },
        part.pin_name_offset,
        yes_no(part.show_pin_numbers),
        yes_no(part.show_pin_names),
        part.unit_count,
        if part.units_locked { 'L' } else { 'F' },
        if part.power { 'P' } else { 'N' },
    )?;

    for (i, field) in part.fields.iter().enumerate() {
        write_field(out, i, field)?;
    }

    if part.aliases.len() > 1 {
        write!(out, "ALIAS")?;
        for alias in &part.aliases[1..] {
            write!(out, " {}", alias.name)?;
        }
        writeln!(out)?;
    }

    if !part.footprint_filters.is_empty() {
        writeln!(out, "$FPLIST")?;
        for filter in &part.footprint_filters {
            writeln!(out, " {filter}")?;
        }
        writeln!(out, "$ENDFPLIST")?;
    }

    if !part.draw.is_empty() {
        let mut items: Vec<&DrawItem> = part.draw.iter().collect();
        items.sort_by_key(|item| item.sort_key());
        writeln!(out, "DRAW")?;
        for item in items {
            write_draw_item(out, item)?;
        }
        writeln!(out, "ENDDRAW")?;
    }

    writeln!(out, "ENDDEF")
}

fn yes_no(value: bool) -> char {
    if value {
        'Y'
    } else {
        'N'
    }
}

fn write_field<W: Write>(out: &mut W, index: usize, field: &Field) -> fmt::Result {
    write!(
        out,
        "F{} {} {} {} {} {} {} {} {}",
        index,
        Quoted(&field.text),
        field.pos.x,
        field.pos.y,
        field.size,
        if field.vertical { 'V' } else { 'H' },
        if field.visible { 'V' } else { 'I' },
        field.h_justify.as_char(),
        field.style_token(),
    )?;
    if index >= MANDATORY_FIELDS {
        write!(out, " {}", Quoted(&field.name))?;
    }
    writeln!(out)
}

fn write_points<W: Write>(out: &mut W, points: &[Point]) -> fmt::Result {
    for p in points {
        write!(out, " {} {}", p.x, p.y)?;
    }
    Ok(())
}

fn write_draw_item<W: Write>(out: &mut W, item: &DrawItem) -> fmt::Result {
    match item {
        DrawItem::Arc(a) => writeln!(
            out,
            "A {} {} {} {} {} {} {} {} {} {} {} {} {}",
            a.center.x,
            a.center.y,
            a.radius,
            a.start_angle,
            a.end_angle,
            a.unit,
            a.convert,
            a.width,
            a.fill.as_char(),
            a.start.x,
            a.start.y,
            a.end.x,
            a.end.y
        ),
        DrawItem::Circle(c) => writeln!(
            out,
            "C {} {} {} {} {} {} {}",
            c.center.x,
            c.center.y,
            c.radius,
            c.unit,
            c.convert,
            c.width,
            c.fill.as_char()
        ),
        DrawItem::Text(t) => write_text(out, t),
        DrawItem::Rectangle(r) => writeln!(
            out,
            "S {} {} {} {} {} {} {} {}",
            r.start.x,
            r.start.y,
            r.end.x,
            r.end.y,
            r.unit,
            r.convert,
            r.width,
            r.fill.as_char()
        ),
        DrawItem::Polyline(p) => {
            write!(out, "P {} {} {} {}", p.points.len(), p.unit, p.convert, p.width)?;
            write_points(out, &p.points)?;
            writeln!(out, " {}", p.fill.as_char())
        }
        DrawItem::Bezier(b) => {
            write!(out, "B {} {} {} {}", b.points.len(), b.unit, b.convert, b.width)?;
            write_points(out, &b.points)?;
            writeln!(out, " {}", b.fill.as_char())
        }
        DrawItem::Pin(pin) => write_pin(out, pin),
    }
}

/// Text containing whitespace, `~`, `"` or `\\` is quoted, with `"` doubled up as
/// `''` and backslashes escaped.
fn write_text<W: Write>(out: &mut W, t: &LibText) -> fmt::Result {
    write!(
        out,
        "T {} {} {} {} {} {} {} ",
        t.angle,
        t.pos.x,
        t.pos.y,
        t.size,
        u8::from(!t.visible),
        t.unit,
        t.convert
    )?;
    let needs_quotes = t.text.is_empty()
        || t.text.contains(|c: char| c.is_whitespace() || matches!(c, '~' | '"' | '\\'));
    if needs_quotes {
        let escaped = t.text.replace('\\', "\\\\").replace('"', "''");
        write!(out, "\"{escaped}\"")?;
    } else {
        write!(out, "{}", t.text)?;
    }
    writeln!(
        out,
        " {} {} {} {}",
        if t.italic { "Italic" } else { "Normal" },
        u8::from(t.bold),
        t.h_justify.as_char(),
        t.v_justify.as_char()
    )
}

fn write_pin<W: Write>(out: &mut W, pin: &Pin) -> fmt::Result {
    let or_tilde = |s: &str| if s.is_empty() { "~".to_string() } else { s.to_string() };
    write!(
        out,
        "X {} {} {} {} {} {} {} {} {} {} {}",
        or_tilde(&pin.name),
        or_tilde(&pin.number),
        pin.pos.x,
        pin.pos.y,
        pin.length,
        pin.orientation.as_char(),
        pin.number_size,
        pin.name_size,
        pin.unit,
        pin.convert,
        pin.electrical.as_char()
    )?;
    let hidden = if pin.visible { "" } else { "N" };
    let flags = pin.shape.flags();
    if !hidden.is_empty() || !flags.is_empty() {
        write!(out, " {hidden}{flags}")?;
    }
    writeln!(out)
}
