use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tabular_crunch::conversion::{
    ConversionContext, ConversionObserver, ConversionSeverity, ConversionStats, ConvertOptions,
    SourceFormat, TracingObserver, convert_from_path,
};
use tabular_crunch::ConvertError;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<ConversionStats>>,
    failures: Mutex<Vec<ConversionSeverity>>,
    alerts: Mutex<Vec<ConversionSeverity>>,
}

impl ConversionObserver for RecordingObserver {
    fn on_success(&self, _ctx: &ConversionContext, stats: ConversionStats) {
        self.successes.lock().unwrap().push(stats);
    }

    fn on_failure(&self, _ctx: &ConversionContext, severity: ConversionSeverity, _error: &ConvertError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &ConversionContext, severity: ConversionSeverity, _error: &ConvertError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn tmp_file(ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tabular-crunch-observed-{nanos}.{ext}"))
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = ConvertOptions {
        format: Some(SourceFormat::Json),
        observer: Some(obs.clone()),
        alert_at_or_above: ConversionSeverity::Critical,
        ..Default::default()
    };

    let _ = convert_from_path("tests/fixtures/does_not_exist/people.json", &opts).unwrap_err();

    assert_eq!(*obs.failures.lock().unwrap(), vec![ConversionSeverity::Critical]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![ConversionSeverity::Critical]);
}

#[test]
fn observer_receives_failure_without_alert_for_structural_error() {
    let input = tmp_file("json");
    std::fs::copy("tests/fixtures/people.json", &input).unwrap();

    let obs = Arc::new(RecordingObserver::default());
    let opts = ConvertOptions {
        locator: "/nonexistent".to_string(),
        observer: Some(obs.clone()),
        ..Default::default()
    };

    let err = convert_from_path(&input, &opts).unwrap_err();
    assert!(matches!(err, ConvertError::ItemsArraySproutNotFound { .. }));
    assert_eq!(*obs.failures.lock().unwrap(), vec![ConversionSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());

    std::fs::remove_file(&input).unwrap();
}

#[test]
fn lower_threshold_alerts_on_errors() {
    let input = tmp_file("json");
    std::fs::write(&input, "[{\"id\": 1},").unwrap();

    let obs = Arc::new(RecordingObserver::default());
    let opts = ConvertOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: ConversionSeverity::Error,
        ..Default::default()
    };

    let err = convert_from_path(&input, &opts).unwrap_err();
    assert!(matches!(err, ConvertError::Json(_)));
    assert_eq!(*obs.alerts.lock().unwrap(), vec![ConversionSeverity::Error]);

    std::fs::remove_file(&input).unwrap();
}

#[test]
fn observer_receives_success_stats() {
    let input = tmp_file("json");
    std::fs::copy("tests/fixtures/people.json", &input).unwrap();

    let obs = Arc::new(RecordingObserver::default());
    let opts = ConvertOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };

    let out = convert_from_path(&input, &opts).unwrap();
    assert_eq!(
        *obs.successes.lock().unwrap(),
        vec![ConversionStats {
            records: 2,
            columns: 6
        }]
    );
    assert!(obs.failures.lock().unwrap().is_empty());

    std::fs::remove_file(&out.path).unwrap();
    std::fs::remove_file(&input).unwrap();
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` under a plain-text subscriber and returns the conversion lines it logged.
fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);

    let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    let lines = text
        .lines()
        .filter(|l| l.contains("conversion"))
        .map(str::to_string)
        .collect();
    (out, lines)
}

fn tracing_options(alert_at_or_above: ConversionSeverity) -> ConvertOptions {
    ConvertOptions {
        format: Some(SourceFormat::Json),
        observer: Some(Arc::new(TracingObserver)),
        alert_at_or_above,
        ..Default::default()
    }
}

#[test]
fn tracing_observer_logs_success_with_counts() {
    let input = tmp_file("json");
    std::fs::copy("tests/fixtures/people.json", &input).unwrap();

    let (out, lines) = with_captured_logs(|| {
        convert_from_path(&input, &tracing_options(ConversionSeverity::Critical)).unwrap()
    });

    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains("INFO"));
    assert!(lines[0].contains("conversion finished"));
    assert!(lines[0].contains("records=2"));
    assert!(lines[0].contains("columns=6"));

    std::fs::remove_file(&out.path).unwrap();
    std::fs::remove_file(&input).unwrap();
}

#[test]
fn tracing_observer_warns_when_nothing_was_found() {
    let input = tmp_file("json");
    std::fs::write(&input, "[]").unwrap();

    let (out, lines) = with_captured_logs(|| {
        convert_from_path(&input, &tracing_options(ConversionSeverity::Critical)).unwrap()
    });

    assert_eq!(out.records, 0);
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains("WARN"));
    assert!(lines[0].contains("conversion found no records"));

    std::fs::remove_file(&out.path).unwrap();
    std::fs::remove_file(&input).unwrap();
}

#[test]
fn tracing_observer_warns_on_input_errors_without_alerting() {
    let input = tmp_file("json");
    std::fs::copy("tests/fixtures/people.json", &input).unwrap();
    let opts = ConvertOptions {
        locator: "/nonexistent".to_string(),
        ..tracing_options(ConversionSeverity::Critical)
    };

    let (result, lines) = with_captured_logs(|| convert_from_path(&input, &opts));

    assert!(matches!(result, Err(ConvertError::ItemsArraySproutNotFound { .. })));
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains("WARN"));
    assert!(lines[0].contains("conversion failed"));
    assert!(lines[0].contains("severity=Error"));
    assert!(lines[0].contains("locator=/nonexistent"));

    std::fs::remove_file(&input).unwrap();
}

#[test]
fn tracing_observer_raises_alerts_on_io_failures() {
    let (result, lines) = with_captured_logs(|| {
        convert_from_path(
            "tests/fixtures/does_not_exist/a.json",
            &tracing_options(ConversionSeverity::Critical),
        )
    });

    assert!(matches!(result, Err(ConvertError::Io(_))));
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(lines[0].contains("ERROR"));
    assert!(lines[0].contains("conversion failed"));
    assert!(lines[0].contains("severity=Critical"));
    assert!(lines[1].contains("ERROR"));
    assert!(lines[1].contains("conversion alert"));
    assert!(lines[1].contains("alert=true"));
}
