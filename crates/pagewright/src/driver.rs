//! BrowserDriver - the browser primitives the binding layer consumes.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  UiElement / UiTable / navigation                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  BrowserDriver (async trait)                                 │
//! │                                                              │
//! │  ┌──────────────────────────┐  ┌──────────────────────────┐  │
//! │  │  ChromiumDriver          │  │  MockDriver              │  │
//! │  │  (`browser` feature)     │  │  (in-memory DOM)         │  │
//! │  │  CDP via chromiumoxide   │  │  used by the test suite  │  │
//! │  └──────────────────────────┘  └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Element primitives take a [`Locator`] and act on its FIRST match; callers
//! narrow the locator (`nth`, `last`, ...) before handing it over. Element
//! primitives fail with [`UiError::ElementNotFound`](crate::UiError) when the
//! locator matches nothing; set queries (`count`, `inner_texts`,
//! `element_paths`) return empty results instead.

use crate::locator::{ElementAction, ElementPath, ElementState, KeyboardAction, Locator};
use crate::result::UiResult;
use crate::wait::LoadState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifier of one page (tab or popup) owned by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// A network response observed by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInfo {
    /// Response URL
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response body, when the driver could retrieve it
    pub body: Option<String>,
}

impl ResponseInfo {
    /// Create a response record
    #[must_use]
    pub fn new(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            body: None,
        }
    }

    /// Attach a body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether the status is 2xx
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Browser automation primitives.
///
/// Implementations own the browser process (or its stand-in) and every page
/// it opened. Pages are listed in opening order; index 0 is the first tab.
#[async_trait]
pub trait BrowserDriver: Send + Sync + fmt::Debug {
    /// Pages currently open, in opening order
    async fn pages(&self) -> UiResult<Vec<PageId>>;

    /// Open a new blank page
    async fn new_page(&self) -> UiResult<PageId>;

    /// Wait for a popup opened by `opener` that is not in `known` and
    /// return it.
    ///
    /// Callers snapshot [`pages`](Self::pages) before the triggering action
    /// so tabs left over from earlier actions are skipped. The future may
    /// stay pending forever; callers bound it with a timeout.
    async fn next_popup(&self, opener: PageId, known: &[PageId]) -> UiResult<PageId>;

    /// Navigate `page` to `url`, returning once `wait_until` is reached
    async fn goto(
        &self,
        page: PageId,
        url: &str,
        wait_until: LoadState,
        timeout: Duration,
    ) -> UiResult<()>;

    /// Reload `page`
    async fn reload(&self, page: PageId) -> UiResult<()>;

    /// Current URL of `page`
    async fn url(&self, page: PageId) -> UiResult<String>;

    /// Document title of `page`
    async fn title(&self, page: PageId) -> UiResult<String>;

    /// Wait until `page` reached `state`
    async fn wait_for_load_state(
        &self,
        page: PageId,
        state: LoadState,
        timeout: Duration,
    ) -> UiResult<()>;

    /// Serialized `document.body.innerHTML`
    async fn body_markup(&self, page: PageId) -> UiResult<String>;

    /// Abort every request whose URL matches one of the glob `patterns`
    async fn block_requests(&self, page: PageId, patterns: &[String]) -> UiResult<()>;

    /// Wait for a response whose URL contains `url_fragment`
    async fn wait_for_response(
        &self,
        page: PageId,
        url_fragment: &str,
        timeout: Duration,
    ) -> UiResult<ResponseInfo>;

    /// Number of nodes matched by `locator`
    async fn count(&self, page: PageId, locator: &Locator) -> UiResult<usize>;

    /// Absolute paths of every node matched by `locator`
    async fn element_paths(&self, page: PageId, locator: &Locator) -> UiResult<Vec<ElementPath>>;

    /// Inner text of every node matched by `locator`
    async fn inner_texts(&self, page: PageId, locator: &Locator) -> UiResult<Vec<String>>;

    /// Attribute of the first match, `None` when absent
    async fn attribute(
        &self,
        page: PageId,
        locator: &Locator,
        name: &str,
    ) -> UiResult<Option<String>>;

    /// Current value of the first match (input, textarea, select)
    async fn input_value(&self, page: PageId, locator: &Locator) -> UiResult<String>;

    /// Computed style property of the first match, `None` when empty
    async fn computed_style(
        &self,
        page: PageId,
        locator: &Locator,
        property: &str,
    ) -> UiResult<Option<String>>;

    /// Query a state of the first match
    async fn element_state(
        &self,
        page: PageId,
        locator: &Locator,
        state: ElementState,
    ) -> UiResult<bool>;

    /// Perform `action` on the first match
    async fn perform(&self, page: PageId, locator: &Locator, action: &ElementAction)
        -> UiResult<()>;

    /// Page-level keyboard input
    async fn keyboard(&self, page: PageId, action: &KeyboardAction) -> UiResult<()>;

    /// Mouse wheel scroll by (`delta_x`, `delta_y`) pixels
    async fn mouse_wheel(&self, page: PageId, delta_x: f64, delta_y: f64) -> UiResult<()>;

    /// `document.body.scrollHeight`
    async fn scroll_height(&self, page: PageId) -> UiResult<f64>;

    /// Close one page
    async fn close_page(&self, page: PageId) -> UiResult<()>;

    /// Close the browser and every remaining page
    async fn close(&self) -> UiResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_display() {
        assert_eq!(PageId(3).to_string(), "page#3");
    }

    #[test]
    fn test_response_ok_range() {
        assert!(ResponseInfo::new("https://x/api", 204).ok());
        assert!(!ResponseInfo::new("https://x/api", 302).ok());
        assert!(!ResponseInfo::new("https://x/api", 500).ok());
    }

    #[test]
    fn test_response_body() {
        let resp = ResponseInfo::new("https://x/api/users", 200).with_body("[]");
        assert_eq!(resp.body.as_deref(), Some("[]"));
    }
}
