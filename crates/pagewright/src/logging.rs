//! Structured logging for UI actions.
//!
//! Every element and navigation action emits one `tracing` event. Installing
//! a sink is optional: [`init_logging`] writes those events to
//! `<folder>/<file_name>.log`, as JSON lines or plain text.

use crate::result::{UiError, UiResult};
use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Replacement logged instead of a sensitive value
pub const MASK: &str = "*******";

/// Description keyword that marks a field as sensitive
const SENSITIVE_KEYWORD: &str = "password";

/// Where and how action logs are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Destination folder, created if missing
    pub folder: PathBuf,
    /// File name without the `.log` extension
    pub file_name: String,
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Write JSON lines instead of plain text
    pub json: bool,
    /// Append a `-YYYYmmdd-HHMMSS` stamp to the file name
    pub timestamped: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("test-results/log"),
            file_name: "test".to_string(),
            level: "info".to_string(),
            json: true,
            timestamped: false,
        }
    }
}

impl LogConfig {
    /// Log to `<folder>/<file_name>.log`
    #[must_use]
    pub fn new(folder: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    /// Set the default level directive
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Choose JSON or plain text output
    #[must_use]
    pub const fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Stamp the file name with the current local time
    #[must_use]
    pub const fn with_timestamp(mut self, timestamped: bool) -> Self {
        self.timestamped = timestamped;
        self
    }

    /// Full path of the log file
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        let name = if self.timestamped {
            format!(
                "{}-{}.log",
                self.file_name,
                chrono::Local::now().format("%Y%m%d-%H%M%S")
            )
        } else {
            format!("{}.log", self.file_name)
        };
        self.folder.join(name)
    }
}

/// Create the folder and open the log file for appending
fn open_log_file(path: &Path) -> UiResult<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Install the global subscriber writing to the configured file.
///
/// Returns the path written to. Fails with [`UiError::Config`] if a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> UiResult<PathBuf> {
    let path = config.log_path();
    let file = open_log_file(&path)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_writer(Mutex::new(file)).with_ansi(false))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
            .try_init()
    };
    installed.map_err(|e| UiError::config(format!("logging already initialised: {e}")))?;
    tracing::info!(path = %path.display(), "logging started");
    Ok(path)
}

/// Whether values typed into an element with this description must be hidden
#[must_use]
pub fn is_sensitive(description: &str) -> bool {
    description.to_lowercase().contains(SENSITIVE_KEYWORD)
}

/// The value as it may appear in logs
#[must_use]
pub fn mask_value<'a>(description: &str, value: &'a str) -> Cow<'a, str> {
    if is_sensitive(description) {
        Cow::Borrowed(MASK)
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
pub(crate) mod capture {
    //! Captures formatted `tracing` output for assertions.

    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Debug, Clone, Default)]
    pub struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Subscriber writing plain text into the returned buffer
    pub fn subscriber() -> (impl tracing::Subscriber + Send + Sync, Captured) {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        (subscriber, captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod mask_tests {
        use super::*;

        #[test]
        fn test_password_description_masks() {
            assert_eq!(mask_value("Login PASSWORD field", "hunter2"), MASK);
            assert_eq!(mask_value("Password", "hunter2"), MASK);
        }

        #[test]
        fn test_other_description_passes_through() {
            assert_eq!(mask_value("Search Box", "Playwright doc"), "Playwright doc");
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_log_path() {
            let config = LogConfig::new("out/log", "scenario");
            assert_eq!(config.log_path(), PathBuf::from("out/log/scenario.log"));
        }

        #[test]
        fn test_timestamped_path() {
            let config = LogConfig::new("out", "run").with_timestamp(true);
            let name = config.log_path().file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("run-"));
            assert!(name.ends_with(".log"));
            assert_eq!(name.len(), "run-20260101-000000.log".len());
        }

        #[test]
        fn test_open_creates_folder() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested/log/test.log");
            open_log_file(&path).unwrap();
            assert!(path.exists());
        }
    }

    mod capture_tests {
        use super::*;

        #[test]
        fn test_capture_records_events() {
            let (subscriber, captured) = capture::subscriber();
            tracing::subscriber::with_default(subscriber, || {
                tracing::info!(value = %mask_value("user password", "s3cret"), "set value");
            });
            let out = captured.contents();
            assert!(out.contains(MASK));
            assert!(!out.contains("s3cret"));
        }
    }
}
