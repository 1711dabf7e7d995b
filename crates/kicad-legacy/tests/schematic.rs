use kicad_legacy::model::{
    HJustify, LineStyle, PinSheetShape, SchItem, TextKind, Transform, FOOTPRINT,
};
use kicad_legacy::{format_schematic, parse_schematic, Error, SchematicWriterOptions};

const DEMO: &str = include_str!("fixtures/demo.sch");

fn wrap(version: i32, body: &str) -> String {
    format!(
        "EESchema Schematic File Version {version}\nEELAYER 30 0\nEELAYER END\n{body}$EndSCHEMATC\n"
    )
}

#[test]
fn test_demo_contents() {
    let screen = parse_schematic(DEMO, "demo.sch").unwrap();
    assert_eq!(screen.version, 4);
    assert_eq!(screen.page.page_type, "A3");
    assert_eq!((screen.sheet_number, screen.sheet_count), (1, 3));
    assert_eq!(screen.title_block.title, "Power \"board\"");
    assert_eq!(screen.title_block.comments[3], r"C:\work\power");
    assert_eq!(screen.bus_aliases[0].members.len(), 4);
    assert_eq!(screen.items.len(), 15);
    assert!(!screen.modified);

    let comps: Vec<_> = screen.components().collect();
    assert_eq!(comps.len(), 2);
    assert_eq!(comps[0].reference(), "R12");
    assert_eq!(
        comps[0].fields[FOOTPRINT].text,
        "Resistor_SMD:R_0603_1608Metric"
    );
    assert_eq!(comps[0].fields[4].name, "Manufacturer");
    assert_eq!(comps[0].fields[4].h_justify, HJustify::Center);
    assert_eq!(comps[1].prefix, "#PWR");
    assert_eq!(
        comps[1].transform,
        Transform {
            x1: 0,
            y1: 1,
            x2: 1,
            y2: 0
        }
    );

    let sheet = screen.sheets().next().unwrap();
    assert_eq!(sheet.file_name, "regulator.sch");
    assert_eq!(sheet.pins[0].shape, PinSheetShape::Input);

    let notes = screen
        .items
        .iter()
        .find_map(|item| match item {
            SchItem::Line(line) if line.style == LineStyle::Dotted => Some(line),
            _ => None,
        })
        .unwrap();
    assert_eq!(notes.width, 10);
    assert_eq!(notes.color.unwrap().a, 128);

    let labels: Vec<_> = screen
        .items
        .iter()
        .filter_map(|item| match item {
            SchItem::Text(text) => Some((text.kind, text.text.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(
        labels,
        [
            (TextKind::Notes, "Power input\nstage"),
            (TextKind::Label, "VIN"),
            (TextKind::GlobalLabel, "SDA"),
            (TextKind::HierLabel, "VOUT"),
        ]
    );
}

#[test]
fn test_bitmap_decodes() {
    let screen = parse_schematic(DEMO, "demo.sch").unwrap();
    let bitmap = screen
        .items
        .iter()
        .find_map(|item| match item {
            SchItem::Bitmap(bitmap) => Some(bitmap),
            _ => None,
        })
        .unwrap();
    assert_eq!(bitmap.scale, 1.5);
    let image = bitmap.decode().unwrap();
    assert_eq!((image.width(), image.height()), (2, 2));
}

#[test]
fn test_round_trip_is_lossless() {
    let first = parse_schematic(DEMO, "demo.sch").unwrap();
    let options = SchematicWriterOptions {
        libraries: vec!["power".to_string(), "device".to_string()],
    };
    let written = format_schematic(&first, &options);
    let second = parse_schematic(&written, "demo.sch").unwrap();
    assert_eq!(first, second);

    // A second cycle is byte stable.
    assert_eq!(format_schematic(&second, &options), written);
}

#[test]
fn test_junction_line_round_trips_exactly() {
    let screen = parse_schematic(&wrap(4, "Connection ~ 100 200\n"), "j.sch").unwrap();
    let written = format_schematic(&screen, &SchematicWriterOptions::default());
    assert!(written.contains("$EndDescr\nConnection ~ 100 200\n$EndSCHEMATC\n"));
}

#[test]
fn test_version_1_glabel_is_hierarchical() {
    let glabel = parse_schematic(&wrap(1, "Text GLabel 100 100 0 50 Output\nX\n"), "a.sch").unwrap();
    let hlabel = parse_schematic(&wrap(1, "Text HLabel 100 100 0 50 Output\nX\n"), "b.sch").unwrap();
    assert_eq!(glabel.items, hlabel.items);

    let v3 = parse_schematic(&wrap(3, "Text GLabel 100 100 0 50 Output ~ 0\nX\n"), "c.sch").unwrap();
    let SchItem::Text(text) = &v3.items[0] else {
        panic!("expected text");
    };
    assert_eq!(text.kind, TextKind::GlobalLabel);
}

#[test]
fn test_version_3_requires_italic_token() {
    let err = parse_schematic(&wrap(3, "Text Notes 100 100 0 50\nX\n"), "c.sch").unwrap_err();
    assert!(matches!(err, Error::MalformedToken { .. } | Error::InvalidValue { .. }));

    // Version 2 treats both tokens as optional.
    assert!(parse_schematic(&wrap(2, "Text Notes 100 100 0 50\nX\n"), "c.sch").is_ok());
}

#[test]
fn test_zero_unit_and_convert_are_repaired() {
    let body = DEMO.replace("U 1 1 5C3A1B2F", "U 0 0 5C3A1B2F");
    let screen = parse_schematic(&body, "demo.sch").unwrap();
    let comp = screen.components().next().unwrap();
    assert_eq!((comp.unit, comp.convert), (1, 1));
    assert!(screen.modified);
}

#[test]
fn test_transform_entries_must_be_unit() {
    let body = DEMO.replace("\t1    0    0    -1  ", "\t1    0    0    -2  ");
    match parse_schematic(&body, "demo.sch").unwrap_err() {
        Error::InvalidTransform { value, at } => {
            assert_eq!(value, -2);
            assert_eq!(at.source, "demo.sch");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_errors_carry_location() {
    let body = DEMO.replace("P 5000 3000", "P 5000 x3000");
    let err = parse_schematic(&body, "demo.sch").unwrap_err();
    let at = err.location().unwrap();
    assert_eq!(at.line, "P 5000 x3000");
    assert_eq!(at.offset, 7);
    assert!(err.to_string().contains("demo.sch"));
}

#[test]
fn test_missing_end_sheet_is_fatal() {
    let err = parse_schematic(
        &wrap(4, "$Sheet\nS 0 0 10 10\nF0 \"A\" 50\n"),
        "s.sch",
    )
    .unwrap_err();
    // The trailing $EndSCHEMATC is not a sheet record.
    assert!(matches!(err, Error::UnrecognizedToken { .. }));

    let err = parse_schematic(
        "EESchema Schematic File Version 4\nEELAYER END\n$Sheet\nS 0 0 10 10\n",
        "s.sch",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::MissingSentinel {
            sentinel: "$EndSheet",
            ..
        }
    ));
}
