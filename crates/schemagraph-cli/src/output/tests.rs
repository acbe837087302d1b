// Tests for report formatting and the output writer

use super::*;
use schemagraph::StringLoader;
use std::cell::RefCell;
use std::rc::Rc;

/// Writer whose contents stay readable after it is boxed
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn sample_report() -> ValidationReport {
    let schema = r#"{"type": "object", "properties": {"age": {"type": "integer"}}, "required": ["name"]}"#;
    let invalid = schemagraph::validate(&StringLoader::new(schema), &StringLoader::new(r#"{"age": "x"}"#)).unwrap();
    let valid = schemagraph::validate(&StringLoader::new(schema), &StringLoader::new(r#"{"name": "a"}"#)).unwrap();

    let mut report = ValidationReport::new("person.json");
    report.push(InstanceReport::from_result("alice.json", valid));
    report.push(InstanceReport::from_result("bob.json", invalid));
    report.push(InstanceReport::unreadable("carol.json", "Failed to load instance"));
    report
}

fn writer(format: OutputFormat, quiet: bool) -> (OutputWriter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let writer = OutputWriter::with_writer(format, false, quiet, Box::new(buffer.clone()));
    (writer, buffer)
}

#[test]
fn test_report_counts() {
    let report = sample_report();
    assert!(!report.valid);
    assert_eq!(report.invalid_count(), 1);
    assert_eq!(report.unreadable_count(), 1);
}

#[test]
fn test_validation_report_human() {
    let formatted = OutputFormat::Human
        .format_validation_report(&sample_report(), false)
        .unwrap();

    let expected = "\
✓ alice.json: valid
✗ bob.json: 2 error(s)
  - (root): name is required [required]
  - age: Invalid type. Expected: integer, given: string [invalid_type]
! carol.json: could not be loaded
  Failed to load instance

1/3 instance(s) valid against person.json";
    assert_eq!(formatted, expected);
}

#[test]
fn test_validation_report_json() {
    let formatted = OutputFormat::Json
        .format_validation_report(&sample_report(), false)
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&formatted).unwrap();

    assert_eq!(value["schema"], "person.json");
    assert_eq!(value["valid"], false);
    assert_eq!(value["instances"][0]["valid"], true);
    assert!(value["instances"][0].get("errors").is_none());
    assert_eq!(value["instances"][1]["errors"][0]["type"], "required");
    assert_eq!(value["instances"][1]["errors"][1]["field"], "age");
    assert_eq!(value["instances"][2]["load_error"], "Failed to load instance");
}

#[test]
fn test_validation_report_yaml() {
    let formatted = OutputFormat::Yaml
        .format_validation_report(&sample_report(), false)
        .unwrap();
    let value: serde_json::Value = serde_yaml::from_str(&formatted).unwrap();
    assert_eq!(value["instances"][1]["errors"][1]["type"], "invalid_type");
}

#[test]
fn test_check_report() {
    let report = CheckReport {
        schema: "person.json".to_string(),
        valid: true,
        nodes: 4,
    };
    assert_eq!(
        OutputFormat::Human.format_check_report(&report, false).unwrap(),
        "✓ person.json compiles (4 nodes)"
    );
    assert_eq!(
        OutputFormat::Json.format_check_report(&report, false).unwrap(),
        r#"{"schema":"person.json","valid":true,"nodes":4}"#
    );
}

#[test]
fn test_writer_quiet_lists_failures_only() {
    let (mut output, buffer) = writer(OutputFormat::Human, true);
    output.info("Compiling").unwrap();
    output.validation_report(&sample_report()).unwrap();

    let written = buffer.contents();
    assert!(!written.contains("INFO"));
    assert!(!written.contains("alice.json"));
    assert!(written.contains("bob.json"));
    assert!(written.contains("carol.json"));
}

#[test]
fn test_writer_machine_formats_skip_messages() {
    let (mut output, buffer) = writer(OutputFormat::Json, false);
    output.info("Compiling").unwrap();
    output.validation_report(&sample_report()).unwrap();

    let written = buffer.contents();
    let value: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
    assert_eq!(value["instances"].as_array().unwrap().len(), 3);
}

#[test]
fn test_writer_human_info() {
    let (mut output, buffer) = writer(OutputFormat::Human, false);
    output.info("Compiling person.json").unwrap();
    assert_eq!(buffer.contents(), "INFO: Compiling person.json\n");
}
