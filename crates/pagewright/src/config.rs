//! Session configuration: which browser to launch and how long to wait.
//!
//! Configuration can be built in code, read from YAML, and overridden from
//! the environment (`PAGEWRIGHT_BROWSER`, `PAGEWRIGHT_HEADLESS`,
//! `CHROMIUM_PATH`).

use crate::result::{UiError, UiResult};
use crate::wait::{LoadState, StabilityOptions, DEFAULT_WAIT_TIMEOUT_MS, POPUP_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable selecting the browser kind
pub const ENV_BROWSER: &str = "PAGEWRIGHT_BROWSER";
/// Environment variable toggling headless mode
pub const ENV_HEADLESS: &str = "PAGEWRIGHT_HEADLESS";
/// Environment variable pointing at the Chromium executable
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";

/// Browser requested by a test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    /// Chromium (default)
    #[default]
    Chromium,
    /// Google Chrome
    Chrome,
    /// Microsoft Edge
    Msedge,
    /// Firefox (launched as Chromium)
    Firefox,
    /// WebKit (launched as Chromium)
    Webkit,
}

impl BrowserKind {
    /// Parse a browser name; unknown names fall back to Chromium
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "chrome" => Self::Chrome,
            "msedge" | "edge" => Self::Msedge,
            "firefox" => Self::Firefox,
            "webkit" => Self::Webkit,
            _ => Self::Chromium,
        }
    }

    /// Whether this kind runs on the Chromium engine
    #[must_use]
    pub const fn is_chromium_family(self) -> bool {
        matches!(self, Self::Chromium | Self::Chrome | Self::Msedge)
    }
}

impl std::fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Chromium => "chromium",
            Self::Chrome => "chrome",
            Self::Msedge => "msedge",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
        };
        write!(f, "{name}")
    }
}

/// Readiness waits applied before every element resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// DOM-stability poll bounds
    pub stability: StabilityOptions,
    /// Also wait for `networkidle` before resolving
    pub network_idle: bool,
    /// Load-state wait timeout in milliseconds
    pub load_timeout_ms: u64,
    /// Popup discovery window in milliseconds
    pub popup_timeout_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            stability: StabilityOptions::default(),
            network_idle: false,
            load_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            popup_timeout_ms: POPUP_TIMEOUT_MS,
        }
    }
}

impl WaitConfig {
    /// Load-state timeout as Duration
    #[must_use]
    pub const fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Popup window as Duration
    #[must_use]
    pub const fn popup_timeout(&self) -> Duration {
        Duration::from_millis(self.popup_timeout_ms)
    }

    /// Load states awaited before each resolution
    #[must_use]
    pub fn load_states(&self) -> Vec<LoadState> {
        let mut states = vec![LoadState::Load, LoadState::DomContentLoaded];
        if self.network_idle {
            states.push(LoadState::NetworkIdle);
        }
        states
    }
}

/// Session launch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Browser to launch
    pub browser: BrowserKind,
    /// Run without a visible window
    pub headless: bool,
    /// Browser executable (None = auto-detect)
    pub executable_path: Option<PathBuf>,
    /// Default timeout for navigation in milliseconds
    pub default_timeout_ms: u64,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Disable the sandbox (containers/CI)
    pub no_sandbox: bool,
    /// Readiness waits
    pub wait: WaitConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            headless: true,
            executable_path: None,
            default_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            viewport_width: 1280,
            viewport_height: 720,
            no_sandbox: false,
            wait: WaitConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the browser kind
    #[must_use]
    pub const fn with_browser(mut self, browser: BrowserKind) -> Self {
        self.browser = browser;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the browser executable
    #[must_use]
    pub fn with_executable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Set the default timeout in milliseconds
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Disable the sandbox
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.no_sandbox = true;
        self
    }

    /// Replace the readiness waits
    #[must_use]
    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Default timeout as Duration
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Parse a config from YAML; missing keys take defaults
    pub fn from_yaml_str(yaml: &str) -> UiResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML config file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> UiResult<Self> {
        let yaml = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&yaml)
    }

    /// Defaults overridden from the process environment
    pub fn from_env() -> UiResult<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> UiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(browser) = lookup(ENV_BROWSER) {
            self.browser = BrowserKind::parse(&browser);
        }
        if let Some(headless) = lookup(ENV_HEADLESS) {
            self.headless = parse_bool(&headless).ok_or_else(|| {
                UiError::config(format!("{ENV_HEADLESS} must be true or false, got {headless:?}"))
            })?;
        }
        if let Some(path) = lookup(ENV_CHROMIUM_PATH) {
            if !path.trim().is_empty() {
                self.executable_path = Some(PathBuf::from(path));
            }
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> UiResult<()> {
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(UiError::config("viewport dimensions must be non-zero"));
        }
        if self.wait.stability.poll_ms == 0 {
            return Err(UiError::config("wait.stability.poll_ms must be non-zero"));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    mod browser_kind_tests {
        use super::*;

        #[test]
        fn test_parse_known_and_unknown() {
            assert_eq!(BrowserKind::parse("Chrome"), BrowserKind::Chrome);
            assert_eq!(BrowserKind::parse("edge"), BrowserKind::Msedge);
            assert_eq!(BrowserKind::parse("opera"), BrowserKind::Chromium);
        }

        #[test]
        fn test_chromium_family() {
            assert!(BrowserKind::Msedge.is_chromium_family());
            assert!(!BrowserKind::Firefox.is_chromium_family());
        }
    }

    mod session_config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = SessionConfig::default();
            assert!(config.headless);
            assert_eq!(config.browser, BrowserKind::Chromium);
            assert_eq!(config.default_timeout(), Duration::from_secs(30));
            assert_eq!(config.wait.popup_timeout(), Duration::from_secs(1));
            assert_eq!(config.wait.load_states().len(), 2);
        }

        #[test]
        fn test_builder() {
            let config = SessionConfig::new()
                .with_browser(BrowserKind::Chrome)
                .with_headless(false)
                .with_viewport(800, 600)
                .with_executable_path("/usr/bin/chromium")
                .with_no_sandbox();
            assert!(!config.headless);
            assert_eq!(config.viewport_width, 800);
            assert!(config.no_sandbox);
            assert_eq!(config.executable_path, Some(PathBuf::from("/usr/bin/chromium")));
        }

        #[test]
        fn test_yaml_partial() {
            let yaml = "browser: msedge\nheadless: false\nwait:\n  network_idle: true\n  stability:\n    max_wait_ms: 5000\n";
            let config = SessionConfig::from_yaml_str(yaml).unwrap();
            assert_eq!(config.browser, BrowserKind::Msedge);
            assert!(!config.headless);
            assert!(config.wait.network_idle);
            assert_eq!(config.wait.stability.max_wait_ms, 5000);
            assert_eq!(config.wait.stability.stable_ms, 500);
            assert_eq!(config.wait.load_states().last(), Some(&LoadState::NetworkIdle));
        }

        #[test]
        fn test_yaml_rejects_zero_viewport() {
            let err = SessionConfig::from_yaml_str("viewport_width: 0").unwrap_err();
            assert!(matches!(err, UiError::Config { .. }));
        }

        #[test]
        fn test_yaml_syntax_error() {
            let err = SessionConfig::from_yaml_str("browser: [unclosed").unwrap_err();
            assert!(matches!(err, UiError::Yaml(_)));
        }

        #[test]
        fn test_yaml_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("session.yaml");
            std::fs::write(&path, "headless: false\nviewport_width: 1024\n").unwrap();
            let config = SessionConfig::from_yaml_file(&path).unwrap();
            assert_eq!(config.viewport_width, 1024);
            assert!(matches!(
                SessionConfig::from_yaml_file(dir.path().join("missing.yaml")),
                Err(UiError::Io(_))
            ));
        }
    }

    mod env_override_tests {
        use super::*;

        fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
            let map: HashMap<String, String> = vars
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();
            move |key| map.get(key).cloned()
        }

        #[test]
        fn test_overrides_applied() {
            let config = SessionConfig::default()
                .with_env_overrides(lookup(&[
                    (ENV_BROWSER, "chrome"),
                    (ENV_HEADLESS, "0"),
                    (ENV_CHROMIUM_PATH, "/opt/chromium"),
                ]))
                .unwrap();
            assert_eq!(config.browser, BrowserKind::Chrome);
            assert!(!config.headless);
            assert_eq!(config.executable_path, Some(PathBuf::from("/opt/chromium")));
        }

        #[test]
        fn test_bad_headless_value() {
            let err = SessionConfig::default()
                .with_env_overrides(lookup(&[(ENV_HEADLESS, "maybe")]))
                .unwrap_err();
            assert!(err.to_string().contains(ENV_HEADLESS));
        }

        #[test]
        fn test_no_overrides_keeps_defaults() {
            let config = SessionConfig::default().with_env_overrides(lookup(&[])).unwrap();
            assert_eq!(config, SessionConfig::default());
        }
    }
}
