/// Fragment map file reading, writing and round-trip behavior.
use chromstitch::error::Error;
use chromstitch::map::FragmentMap;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const MAP: &str = "\
fragment3\t150\t0\t150\t-\tchr1\t0\t150\n\
GAP\t10\t0\t10\t+\tchr1\t150\t160\n\
fragment1\t180\t0\t180\t+\tchr1\t160\t340\n\
fragment2\t200\t0\t200\t+\tchr2\t0\t200\n";

#[test]
fn test_round_trip_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("map.txt");
    fs::write(&path, MAP).unwrap();

    let map = FragmentMap::from_path(&path).unwrap();
    assert_eq!(map.len(), 4);

    let out = temp.path().join("out.txt");
    map.write(&out).unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), MAP);
}

#[test]
fn test_records_parsed_and_ordered() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("map.txt");
    // chr1 records out of reference order on purpose
    fs::write(
        &path,
        "fragment1\t180\t0\t180\t+\tchr1\t160\t340\nfragment3\t150\t0\t150\t-\tchr1\t0\t150\n",
    )
    .unwrap();

    let map = FragmentMap::from_path(&path).unwrap();
    let chromosomes: Vec<&str> = map.chromosomes().collect();
    assert_eq!(chromosomes, vec!["chr1"]);

    let records = map.fragments("chr1").unwrap();
    assert_eq!(records[0].fr_name, "fragment3");
    assert_eq!(records[0].fr_strand, '-');
    assert_eq!(records[1].fr_name, "fragment1");
    assert_eq!(records[1].ref_start, 160);
    assert_eq!(records[1].ref_end, 340);
}

#[test]
fn test_short_row_reports_line_number() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("map.txt");
    fs::write(
        &path,
        "fragment1\t180\t0\t180\t+\tchr1\t160\t340\nfragment2\t200\t0\n",
    )
    .unwrap();

    match FragmentMap::from_path(&path).unwrap_err() {
        Error::Format { line, .. } => assert_eq!(line, 2),
        other => panic!("expected a format error, got {other}"),
    }
}

#[test]
fn test_bad_numeric_reports_line_number() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("map.txt");
    fs::write(&path, "fragment1\tlong\t0\t180\t+\tchr1\t160\t340\n").unwrap();

    match FragmentMap::from_path(&path).unwrap_err() {
        Error::Format { line, msg } => {
            assert_eq!(line, 1);
            assert!(msg.contains("long"));
        }
        other => panic!("expected a format error, got {other}"),
    }
}

#[test]
fn test_missing_chromosome_query() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("map.txt");
    fs::write(&path, MAP).unwrap();

    let map = FragmentMap::from_path(&path).unwrap();
    assert!(matches!(
        map.fragments("chrN").unwrap_err(),
        Error::MissingChromosome(name) if name == "chrN"
    ));
}
