use std::fs;
use std::path::Path;
use std::rc::Rc;

use kicad_legacy::model::{Junction, Point, SchItem};
use kicad_legacy::{LoadWarning, Schematic};

const DEMO: &str = include_str!("fixtures/demo.sch");
const REGULATOR: &str = include_str!("fixtures/regulator.sch");

fn sheet(name: &str, file: &str) -> String {
    format!("$Sheet\nS 0 0 100 100\nU 5C000001\nF0 \"{name}\" 50\nF1 \"{file}\" 50\n$EndSheet\n")
}

fn with_sheets(sheets: &[(&str, &str)]) -> String {
    let body: String = sheets.iter().map(|(name, file)| sheet(name, file)).collect();
    format!("EESchema Schematic File Version 4\nEELAYER 30 0\nEELAYER END\n{body}$EndSCHEMATC\n")
}

fn sheet_screen_counts(sch: &Schematic, path: &Path) -> Vec<usize> {
    let screen = sch.screen(path).unwrap().borrow();
    let counts = screen
        .sheets()
        .map(|s| s.screen().map_or(usize::MAX, |child| child.borrow().items.len()))
        .collect();
    counts
}

#[test]
fn test_demo_hierarchy() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("demo.sch"), DEMO).unwrap();
    fs::write(dir.path().join("regulator.sch"), REGULATOR).unwrap();

    let sch = Schematic::load(&dir.path().join("demo.sch")).unwrap();
    assert!(sch.warnings().is_empty());
    assert_eq!(sch.screens().count(), 2);
    assert_eq!(sheet_screen_counts(&sch, &dir.path().join("demo.sch")), [2]);
}

#[test]
fn test_shared_sheet_file_is_loaded_once() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("root.sch"),
        with_sheets(&[("Left", "regulator.sch"), ("Right", "regulator.sch")]),
    )
    .unwrap();
    fs::write(dir.path().join("regulator.sch"), REGULATOR).unwrap();

    let sch = Schematic::load(&dir.path().join("root.sch")).unwrap();
    assert_eq!(sch.screens().count(), 2);

    let root = sch.root().borrow();
    let sheets: Vec<_> = root.sheets().collect();
    let left = sheets[0].screen().unwrap();
    let right = sheets[1].screen().unwrap();
    assert!(Rc::ptr_eq(left, right));

    left.borrow_mut().items.push(SchItem::Junction(Junction {
        pos: Point::new(50, 50),
    }));
    assert_eq!(right.borrow().items.len(), 3);
}

#[test]
fn test_broken_sheet_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("root.sch"),
        with_sheets(&[("Bad", "bad.sch"), ("Good", "regulator.sch"), ("Gone", "gone.sch")]),
    )
    .unwrap();
    fs::write(dir.path().join("bad.sch"), REGULATOR.replace("Wire Wire", "Wyre Wire")).unwrap();
    fs::write(dir.path().join("regulator.sch"), REGULATOR).unwrap();

    let sch = Schematic::load(&dir.path().join("root.sch")).unwrap();
    assert_eq!(sch.warnings().len(), 2);
    assert!(matches!(&sch.warnings()[0], LoadWarning::SubSheet { path, .. } if path.ends_with("bad.sch")));
    assert!(sch.warning_text().contains("Wyre"));
    assert!(sch.warning_text().contains("gone.sch"));

    // Failed sheets keep an empty screen; the sibling loads normally.
    assert_eq!(sheet_screen_counts(&sch, &dir.path().join("root.sch")), [0, 2, 0]);
}
