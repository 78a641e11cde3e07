use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tabular_crunch::conversion::csv::CsvTabularizer;
use tabular_crunch::conversion::json::JsonTabularizer;
use tabular_crunch::conversion::{
    EntryProcessor, ExportOptions, SchemaCollector, Tabularizer, convert_to_writer,
};
use tabular_crunch::narrowing::{ColumnStore, MemoryStore};
use tabular_crunch::types::{FlattenedRecord, PropertyValue};
use tabular_crunch::ConvertResult;

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("tabular-crunch-{name}-{nanos}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn no_comment() -> ExportOptions {
    ExportOptions {
        comment_line: None,
        ..Default::default()
    }
}

/// Runs both passes over an in-memory document and returns the CSV text.
fn export_str(input: &str, locator: &str, options: &ExportOptions) -> String {
    let dir = tmp_dir("export");
    let path = dir.join("input.json");
    std::fs::write(&path, input).unwrap();

    let mut out = Vec::new();
    convert_to_writer(&JsonTabularizer::new(), &path, locator, &mut out, options).unwrap();

    std::fs::remove_dir_all(&dir).unwrap();
    String::from_utf8(out).unwrap()
}

#[derive(Default)]
struct Recorder(Vec<FlattenedRecord>);

impl EntryProcessor for Recorder {
    fn process_entry(&mut self, entry: &FlattenedRecord) -> ConvertResult<()> {
        self.0.push(entry.clone());
        Ok(())
    }
}

#[test]
fn header_follows_first_seen_order() {
    let csv = export_str(r#"[{"id":1,"name":"a"},{"id":2,"surname":"b"}]"#, "/", &no_comment());
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("id,name,surname"));
    assert_eq!(lines.next(), Some(r#"1,"a","#));
    assert_eq!(lines.next(), Some(r#"2,,"b""#));
    assert_eq!(lines.next(), None);
}

#[test]
fn absent_fields_are_left_blank() {
    let csv = export_str(r#"[{"id":"1","name":"Ada"},{"id":"2"}]"#, "/", &no_comment());
    assert_eq!(csv, "id,name\n\"1\",\"Ada\"\n\"2\",\n");
}

#[test]
fn scalars_use_type_specific_forms() {
    let csv = export_str(
        r#"[{"s":"say \"hi\"","n":8001,"f":-0.5,"b":true,"z":null,"a":[1,2]}]"#,
        "/",
        &no_comment(),
    );
    let row = csv.lines().nth(1).unwrap();
    assert_eq!(row, r#""say \"hi\"",8001,-0.5,true,NULL,[...]"#);
}

#[test]
fn comment_line_and_separator_are_configurable() {
    let options = ExportOptions {
        separator: b';',
        comment_line: Some("# exported".to_string()),
    };
    let csv = export_str(r#"[{"a;b":1,"c":2}]"#, "/", &options);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines, vec!["# exported", r#""a;b";c"#, "1;2"]);
}

#[test]
fn default_comment_line_names_the_crate() {
    let csv = export_str(r#"[{"a":1}]"#, "/", &ExportOptions::default());
    assert!(csv.starts_with("# Converted by tabular-crunch "));
}

#[test]
fn exported_csv_reads_back_to_the_same_scalars() {
    let input = r#"[
        {"id": "1", "name": "Ada, Countess", "quote": "she said \"go\"", "score": 98.5, "active": true},
        {"id": "2", "score": 87.25, "nick": null, "note": "two\nlines"}
    ]"#;
    let dir = tmp_dir("roundtrip");
    let json_path = dir.join("people.json");
    std::fs::write(&json_path, input).unwrap();

    let csv_path = JsonTabularizer::new()
        .convert(&json_path, "/", &ExportOptions::default())
        .unwrap();
    assert_eq!(csv_path, dir.join("people.json.csv"));

    let mut original = Recorder::default();
    JsonTabularizer::new()
        .visit_entries(&json_path, "/", &mut original)
        .unwrap();
    let mut reread = Recorder::default();
    CsvTabularizer::default()
        .visit_entries(&csv_path, "", &mut reread)
        .unwrap();

    assert_eq!(original.0.len(), reread.0.len());
    for (before, after) in original.0.iter().zip(&reread.0) {
        for property in &before.properties {
            let expected = match &property.value {
                PropertyValue::String(s) => PropertyValue::String(s.clone()),
                PropertyValue::Number(n) => PropertyValue::String(n.to_string()),
                PropertyValue::Boolean(b) => PropertyValue::String(b.to_string()),
                PropertyValue::Null => PropertyValue::Null,
                other => panic!("unexpected value in fixture: {other:?}"),
            };
            assert_eq!(
                after.get(&property.name).map(|p| &p.value),
                Some(&expected),
                "column {}",
                property.name
            );
        }
    }

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn backslashes_survive_the_round_trip() {
    let csv = export_str(
        r#"[{"path":"C:\\dir\\","n":1},{"path":"a\\\"b","n":2},{"path":"x","n":3}]"#,
        "/",
        &no_comment(),
    );
    assert_eq!(
        csv,
        "path,n\n\"C:\\\\dir\\\\\",1\n\"a\\\\\\\"b\",2\n\"x\",3\n"
    );

    let mut reread = Recorder::default();
    CsvTabularizer::default()
        .visit_entries_from_reader(csv.as_bytes(), &mut reread)
        .unwrap();
    let paths: Vec<_> = reread
        .0
        .iter()
        .map(|r| r.get("path").unwrap().value.clone())
        .collect();
    assert_eq!(
        paths,
        vec![
            PropertyValue::String(r"C:\dir\".to_string()),
            PropertyValue::String(r#"a\"b"#.to_string()),
            PropertyValue::String("x".to_string()),
        ]
    );

    let mut store = MemoryStore::new();
    store
        .load_csv_from_reader("paths", csv.as_bytes(), b',')
        .unwrap();
    assert_eq!(store.row_count("paths").unwrap(), 3);
    assert_eq!(
        store.column_values("paths", "n").unwrap(),
        vec![Some("1".to_string()), Some("2".to_string()), Some("3".to_string())]
    );
}

#[test]
fn literal_null_text_reads_back_as_null() {
    // The dialect has no way to tell a quoted "NULL" string from the null marker.
    let csv = export_str(r#"[{"s":"NULL"},{"s":null}]"#, "/", &no_comment());
    assert_eq!(csv, "s\n\"NULL\"\nNULL\n");

    let mut reread = Recorder::default();
    CsvTabularizer::default()
        .visit_entries_from_reader(csv.as_bytes(), &mut reread)
        .unwrap();
    assert!(
        reread
            .0
            .iter()
            .all(|r| r.get("s").map(|p| &p.value) == Some(&PropertyValue::Null))
    );
}

#[test]
fn csv_sources_flow_through_the_same_pipeline() {
    let dir = tmp_dir("csv-source");
    let path = dir.join("plain.csv");
    std::fs::write(&path, "id,name\n1,Ada\n2,\n").unwrap();

    let mut collector = SchemaCollector::new();
    CsvTabularizer::default()
        .visit_entries(&path, "", &mut collector)
        .unwrap();
    assert_eq!(collector.record_count(), 2);
    assert_eq!(collector.get("name").unwrap().types.string, 1);

    let err = CsvTabularizer::default()
        .visit_entries(&path, "/data", &mut collector)
        .unwrap_err();
    assert!(err.to_string().contains("/data"));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_source_is_reported_before_writing() {
    let mut out = Vec::new();
    let err = convert_to_writer(
        &JsonTabularizer::new(),
        Path::new("tests/fixtures/does_not_exist.json"),
        "/",
        &mut out,
        &ExportOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, tabular_crunch::ConvertError::Io(_)));
    assert!(out.is_empty());
}
