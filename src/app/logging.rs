use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{Local, Utc};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::app::config::LoggingSettings;
use crate::app::error::AppError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SINK_CAPACITY: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: Level,
    pub message: String,
}

impl LogRecord {
    pub fn line(&self) -> String {
        format_line(&self.timestamp, &self.level, &self.message)
    }
}

fn format_line(timestamp: &str, level: &Level, message: &str) -> String {
    format!("[{timestamp}] [{level}] {message}")
}

/// In-memory mirror of recent log records for the panel's log view.
#[derive(Clone)]
pub struct LogSink {
    records: Arc<Mutex<VecDeque<LogRecord>>>,
    capacity: usize,
}

impl Default for LogSink {
    fn default() -> Self {
        Self::with_capacity(SINK_CAPACITY)
    }
}

impl LogSink {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, record: LogRecord) {
        let Ok(mut records) = self.records.lock() else {
            return;
        };
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.records().iter().map(LogRecord::line).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl MessageVisitor {
    fn into_text(self) -> String {
        format!("{}{}", self.message, self.fields)
    }
}

/// Forwards every event into a [`LogSink`].
pub struct LogSinkLayer {
    sink: LogSink,
}

impl LogSinkLayer {
    pub fn new(sink: LogSink) -> Self {
        Self { sink }
    }
}

impl<S: Subscriber> Layer<S> for LogSinkLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.sink.push(LogRecord {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            level: *event.metadata().level(),
            message: visitor.into_text(),
        });
    }
}

/// `[YYYY-MM-DD HH:MM:SS] [LEVEL] message` lines for console and file output.
pub struct PanelFormat;

impl<S, N> FormatEvent<S, N> for PanelFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "[{}] [{}] ",
            Local::now().format(TIMESTAMP_FORMAT),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Keeps the file writer alive and knows where today's log lives.
pub struct LoggingHandle {
    sink: LogSink,
    log_dir: PathBuf,
    file_prefix: String,
    _guard: WorkerGuard,
}

impl LoggingHandle {
    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn active_log_path(&self) -> PathBuf {
        active_log_path(&self.log_dir, &self.file_prefix)
    }
}

/// Daily-rotated files are named `<prefix>.<UTC date>.log`.
pub fn active_log_path(log_dir: &Path, file_prefix: &str) -> PathBuf {
    log_dir.join(format!("{file_prefix}.{}.log", Utc::now().format("%Y-%m-%d")))
}

pub fn clear_log_file(path: &Path) -> Result<(), AppError> {
    if !path.exists() {
        return Ok(());
    }
    OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map(|_| ())
        .map_err(|err| AppError::system(format!("Failed to clear log file: {err}"), ""))
}

/// Console (INFO), rotating file (configured level) and the in-memory sink (INFO).
pub fn init_logging(settings: &LoggingSettings) -> Result<LoggingHandle, AppError> {
    let log_dir = PathBuf::from(&settings.log_dir);
    fs::create_dir_all(&log_dir)
        .map_err(|err| AppError::system(format!("Failed to create log directory: {err}"), ""))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(settings.max_log_files)
        .filename_prefix(&settings.file_prefix)
        .filename_suffix("log")
        .build(&log_dir)
        .map_err(|err| AppError::system(format!("Failed to initialize file appender: {err}"), ""))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let sink = LogSink::default();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(PanelFormat)
                .with_writer(std::io::stderr)
                .with_filter(LevelFilter::INFO),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(PanelFormat)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .with(LogSinkLayer::new(sink.clone()).with_filter(LevelFilter::INFO))
        .try_init()
        .map_err(|err| AppError::system(format!("Failed to set global subscriber: {err}"), ""))?;

    Ok(LoggingHandle {
        sink,
        log_dir,
        file_prefix: settings.file_prefix.clone(),
        _guard: guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing::{debug, info, warn};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().expect("lock").clone()).expect("utf8")
        }
    }

    fn is_timestamp(value: &str) -> bool {
        chrono::NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).is_ok()
    }

    #[test]
    fn sink_layer_mirrors_events() {
        let sink = LogSink::default();
        let subscriber = tracing_subscriber::registry().with(LogSinkLayer::new(sink.clone()));
        tracing::subscriber::with_default(subscriber, || {
            info!("Connecting to device at IP: 10.0.0.5");
            warn!(code = "ERR_TIMEOUT", "adb timed out");
        });

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level, Level::INFO);
        assert_eq!(records[0].message, "Connecting to device at IP: 10.0.0.5");
        assert_eq!(records[1].message, "adb timed out code=ERR_TIMEOUT");

        let line = records[1].line();
        assert!(line.ends_with("] [WARN] adb timed out code=ERR_TIMEOUT"));
        assert!(is_timestamp(&line[1..20]));
    }

    #[test]
    fn sink_drops_oldest_when_full_and_clears() {
        let sink = LogSink::with_capacity(2);
        for message in ["one", "two", "three"] {
            sink.push(LogRecord {
                timestamp: "2024-01-01 00:00:00".to_string(),
                level: Level::INFO,
                message: message.to_string(),
            });
        }
        assert_eq!(
            sink.lines(),
            vec![
                "[2024-01-01 00:00:00] [INFO] two".to_string(),
                "[2024-01-01 00:00:00] [INFO] three".to_string(),
            ]
        );
        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn panel_format_writes_bracketed_lines() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(PanelFormat)
                .with_ansi(false)
                .with_writer(captured.clone()),
        );
        tracing::subscriber::with_default(subscriber, || {
            debug!("Appium request");
        });

        let text = captured.text();
        let line = text.lines().next().expect("line");
        assert!(line.starts_with('['));
        assert!(is_timestamp(&line[1..20]));
        assert!(line.ends_with("] [DEBUG] Appium request"));
    }

    #[test]
    fn clear_truncates_existing_file_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = active_log_path(dir.path(), "android_manager");
        assert!(path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("android_manager.") && name.ends_with(".log")));

        clear_log_file(&path).expect("missing file is fine");
        assert!(!path.exists());

        fs::write(&path, "[2024-01-01 00:00:00] [INFO] old\n").expect("write");
        clear_log_file(&path).expect("clear");
        assert_eq!(fs::read_to_string(&path).expect("read"), "");
    }
}
