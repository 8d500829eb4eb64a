//! Wait mechanisms: load states, selector states, URL patterns and the
//! bounded DOM-stability poll.
//!
//! Every wait here is bounded. Exceeding the bound yields
//! [`UiError::Timeout`], or [`UiError::DomNotStable`] for the markup poll.

use crate::driver::{BrowserDriver, PageId};
use crate::locator::{ElementState, Locator};
use crate::result::{UiError, UiResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval for selector and URL waits (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// DOM-stability poll interval (10ms)
pub const DOM_POLL_INTERVAL_MS: u64 = 10;

/// Markup must stay unchanged this long to count as stable (500ms)
pub const DOM_STABLE_WINDOW_MS: u64 = 500;

/// Timeout for table row and loader waits (60 seconds)
pub const TABLE_WAIT_TIMEOUT_MS: u64 = 60_000;

/// Popup discovery window (1 second)
pub const POPUP_TIMEOUT_MS: u64 = 1_000;

// =============================================================================
// LOAD STATE
// =============================================================================

/// Page load states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// The `load` event fired
    Load,
    /// The `DOMContentLoaded` event fired
    DomContentLoaded,
    /// No network requests for 500ms
    NetworkIdle,
}

impl LoadState {
    /// Get the event name for this load state
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::NetworkIdle => "networkidle",
        }
    }
}

impl Default for LoadState {
    fn default() -> Self {
        Self::Load
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

// =============================================================================
// SELECTOR STATE
// =============================================================================

/// States a selector can be waited for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorState {
    /// At least one match is in the DOM
    Attached,
    /// No match is in the DOM
    Detached,
    /// The first match is visible
    Visible,
    /// No match, or the first match is not visible
    Hidden,
}

impl std::fmt::Display for SelectorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// URL PATTERN
// =============================================================================

/// URL matcher for navigation and response waits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Contains substring
    Contains(String),
    /// Glob pattern (e.g., "**/orders/*")
    Glob(String),
}

impl UrlPattern {
    /// Glob when the text has a `*`, exact otherwise
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        if pattern.contains('*') {
            Self::Glob(pattern.to_string())
        } else {
            Self::Exact(pattern.to_string())
        }
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Glob(pattern) => glob_matches(pattern, url),
        }
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(p) | Self::Glob(p) => write!(f, "{p}"),
            Self::Contains(p) => write!(f, "*{p}*"),
        }
    }
}

/// Glob matching where `*` runs match any text.
///
/// The text before the first `*` anchors at the start of the URL and the
/// text after the last `*` anchors at its end; pieces in between match
/// leftmost.
fn glob_matches(pattern: &str, url: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let Some((first, rest)) = parts.split_first() else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return url == *first;
    };
    if !url.starts_with(first) {
        return false;
    }
    let mut pos = first.len();
    for part in middle.iter().filter(|p| !p.is_empty()) {
        match url[pos..].find(part) {
            Some(found) => pos += found + part.len(),
            None => return false,
        }
    }
    url[pos..].ends_with(last)
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for polling waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Bounds of the DOM-stability poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityOptions {
    /// Interval between markup samples in milliseconds
    pub poll_ms: u64,
    /// Markup must stay unchanged this long, in milliseconds
    pub stable_ms: u64,
    /// Give up after this long, in milliseconds
    pub max_wait_ms: u64,
}

impl Default for StabilityOptions {
    fn default() -> Self {
        Self {
            poll_ms: DOM_POLL_INTERVAL_MS,
            stable_ms: DOM_STABLE_WINDOW_MS,
            max_wait_ms: DEFAULT_WAIT_TIMEOUT_MS,
        }
    }
}

impl StabilityOptions {
    /// Set the stable window in milliseconds
    #[must_use]
    pub const fn with_stable_window(mut self, stable_ms: u64) -> Self {
        self.stable_ms = stable_ms;
        self
    }

    /// Set the maximum wait in milliseconds
    #[must_use]
    pub const fn with_max_wait(mut self, max_wait_ms: u64) -> Self {
        self.max_wait_ms = max_wait_ms;
        self
    }

    /// Set the poll interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_ms: u64) -> Self {
        self.poll_ms = poll_ms;
        self
    }
}

// =============================================================================
// WAITS
// =============================================================================

/// Poll `check` until it yields `true` or `options.timeout_ms` elapses
pub async fn poll_until<F, Fut>(options: WaitOptions, waited_for: &str, mut check: F) -> UiResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = UiResult<bool>>,
{
    let start = Instant::now();
    loop {
        if check().await? {
            return Ok(());
        }
        if start.elapsed() >= options.timeout() {
            return Err(UiError::timeout(options.timeout_ms, waited_for));
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

/// Poll `document.body.innerHTML` until it stops changing.
///
/// Stable means identical samples for at least `stable_ms`. A page that keeps
/// changing past `max_wait_ms` yields [`UiError::DomNotStable`].
pub async fn wait_for_dom_stable(
    driver: &dyn BrowserDriver,
    page: PageId,
    options: &StabilityOptions,
) -> UiResult<()> {
    let start = Instant::now();
    let max_wait = Duration::from_millis(options.max_wait_ms);
    let window = Duration::from_millis(options.stable_ms);
    let poll = Duration::from_millis(options.poll_ms);

    let mut previous = driver.body_markup(page).await?;
    let mut unchanged_since = Instant::now();
    loop {
        if unchanged_since.elapsed() >= window {
            return Ok(());
        }
        if start.elapsed() >= max_wait {
            tracing::warn!(page = %page, max_wait_ms = options.max_wait_ms, "DOM kept changing");
            return Err(UiError::DomNotStable {
                ms: options.max_wait_ms,
            });
        }
        tokio::time::sleep(poll).await;
        let current = driver.body_markup(page).await?;
        if current != previous {
            previous = current;
            unchanged_since = Instant::now();
        }
    }
}

/// Wait until `locator` reaches `state`
pub async fn wait_for_selector(
    driver: &dyn BrowserDriver,
    page: PageId,
    locator: &Locator,
    state: SelectorState,
    options: WaitOptions,
) -> UiResult<()> {
    let waited_for = format!("{locator} to be {state}");
    poll_until(options, &waited_for, || async move {
        let count = driver.count(page, locator).await?;
        Ok(match state {
            SelectorState::Attached => count > 0,
            SelectorState::Detached => count == 0,
            SelectorState::Visible => {
                count > 0
                    && driver
                        .element_state(page, &locator.first(), ElementState::Visible)
                        .await?
            }
            SelectorState::Hidden => {
                count == 0
                    || !driver
                        .element_state(page, &locator.first(), ElementState::Visible)
                        .await?
            }
        })
    })
    .await
}

/// Wait until the URL of `page` matches `pattern`
pub async fn wait_for_url(
    driver: &dyn BrowserDriver,
    page: PageId,
    pattern: &UrlPattern,
    options: WaitOptions,
) -> UiResult<()> {
    let waited_for = format!("url {pattern}");
    poll_until(options, &waited_for, || async move {
        Ok(pattern.matches(&driver.url(page).await?))
    })
    .await
}

// =============================================================================
// TESTS
// =============================================================================
