//! Session-level helpers: launch, navigation, page waits, keyboard input
//! and teardown.
//!
//! These act on pages rather than bound elements. The main page is the one a
//! [`Session`] was started on; popup variants go through the adopted popup.

use crate::config::SessionConfig;
use crate::driver::{PageId, ResponseInfo};
use crate::locator::{KeyboardAction, Locator};
use crate::result::{UiError, UiResult};
use crate::session::{PageScope, Session};
use crate::wait::{
    wait_for_selector, LoadState, SelectorState, UrlPattern, WaitOptions, DEFAULT_WAIT_TIMEOUT_MS,
};
use std::sync::Arc;
use std::time::Duration;

/// URL waits give the page two minutes
pub const URL_WAIT_TIMEOUT_MS: u64 = 120_000;

/// Spinner waits give up after a minute
pub const SPINNER_WAIT_TIMEOUT_MS: u64 = 60_000;

/// Loading indicator awaited by [`wait_for_spinner_hidden`]
pub const SPINNER_SELECTOR: &str = ".spinner";

/// Request patterns aborted when images are blocked
pub const IMAGE_PATTERNS: [&str; 3] = ["*.png", "*.jpg", "*.jpeg"];

/// Launch a browser for `config` and start a session on a fresh page.
///
/// Only Chromium-family browsers are driven; other kinds launch Chromium
/// and log a warning.
#[cfg(feature = "browser")]
pub async fn launch_session(config: SessionConfig) -> UiResult<Arc<Session>> {
    if !config.browser.is_chromium_family() {
        tracing::warn!(browser = %config.browser, "only Chromium is supported, launching Chromium");
    }
    tracing::info!(browser = %config.browser, headless = config.headless, "launching browser");
    let driver = crate::cdp::ChromiumDriver::launch(&config).await?;
    Session::start(Arc::new(driver), config).await
}

/// Launch a browser for `config` (requires the `browser` feature)
#[cfg(not(feature = "browser"))]
#[allow(clippy::unused_async)]
pub async fn launch_session(config: SessionConfig) -> UiResult<Arc<Session>> {
    Err(UiError::BrowserLaunch {
        message: format!(
            "cannot launch {}: built without the `browser` feature",
            config.browser
        ),
    })
}

/// Options for [`goto_url`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GotoOptions {
    /// Abort png/jpg/jpeg requests
    pub block_images: bool,
    /// Load state that completes navigation
    pub wait_until: LoadState,
    /// Navigation timeout in milliseconds (None = session default)
    pub timeout_ms: Option<u64>,
}

impl Default for GotoOptions {
    fn default() -> Self {
        Self {
            block_images: true,
            wait_until: LoadState::DomContentLoaded,
            timeout_ms: None,
        }
    }
}

impl GotoOptions {
    /// Default options: block images, wait for `DOMContentLoaded`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep image requests
    #[must_use]
    pub const fn with_images(mut self) -> Self {
        self.block_images = false;
        self
    }

    /// Complete navigation on `state`
    #[must_use]
    pub const fn wait_until(mut self, state: LoadState) -> Self {
        self.wait_until = state;
        self
    }

    /// Set the navigation timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Navigate the main page to `url`
pub async fn goto_url(session: &Session, url: &str, options: GotoOptions) -> UiResult<()> {
    let driver = session.driver();
    let page = session.main_page();
    if options.block_images {
        let patterns: Vec<String> = IMAGE_PATTERNS.iter().map(|p| (*p).to_string()).collect();
        driver.block_requests(page, &patterns).await?;
    }
    let timeout = Duration::from_millis(options.timeout_ms.unwrap_or(session.config().default_timeout_ms));
    driver
        .goto(page, url, options.wait_until, timeout)
        .await
        .map_err(|e| match e {
            UiError::Navigation { .. } => e,
            other => UiError::Navigation {
                url: url.to_string(),
                message: other.to_string(),
            },
        })?;
    tracing::info!(session = %session.id(), "Launching URL : {url}");
    Ok(())
}

/// Wait up to two minutes for the main page URL to match `pattern`.
///
/// Patterns containing `*` are globs; anything else must match exactly.
pub async fn wait_for_url(session: &Session, pattern: &str) -> UiResult<()> {
    tracing::info!(" Waiting for the URL : {pattern}");
    let page = session.main_page();
    let options = WaitOptions::new().with_timeout(URL_WAIT_TIMEOUT_MS);
    crate::wait::wait_for_url(session.driver(), page, &UrlPattern::parse(pattern), options).await?;
    session
        .driver()
        .wait_for_load_state(page, LoadState::DomContentLoaded, options.timeout())
        .await
}

async fn wait_for_load(session: &Session, page: PageId) -> UiResult<()> {
    let timeout = Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS);
    for state in [LoadState::DomContentLoaded, LoadState::Load] {
        session.driver().wait_for_load_state(page, state, timeout).await?;
    }
    Ok(())
}

/// Wait for `DOMContentLoaded` then `load` on the main page
pub async fn wait_for_page_load(session: &Session) -> UiResult<()> {
    wait_for_load(session, session.main_page()).await
}

/// Wait for `DOMContentLoaded` then `load` on the popup, adopting it if needed
pub async fn wait_for_popup_load(session: &Session) -> UiResult<()> {
    let popup = session.adopt_popup().await?;
    wait_for_load(session, popup).await
}

/// Wait up to a minute for the first `.spinner` on the main page to be hidden
pub async fn wait_for_spinner_hidden(session: &Session) -> UiResult<()> {
    let spinner = Locator::new(SPINNER_SELECTOR).first();
    let options = WaitOptions::new().with_timeout(SPINNER_WAIT_TIMEOUT_MS);
    wait_for_selector(
        session.driver(),
        session.main_page(),
        &spinner,
        SelectorState::Hidden,
        options,
    )
    .await
}

/// Sleep for `ms`.
///
/// On the page, the spinner is awaited first unless `wait_for_spinner` is
/// false; with `on_page` false the popup must already be adopted.
pub async fn static_wait(session: &Session, ms: u64, on_page: bool, wait_for_spinner: bool) -> UiResult<()> {
    if on_page {
        tracing::info!("Waiting for the page : {ms} milliseconds");
        if wait_for_spinner {
            wait_for_spinner_hidden(session).await?;
        }
    } else {
        tracing::info!("Waiting for the popup : {ms} milliseconds");
        session.popup().await.ok_or(UiError::NoActivePage)?;
    }
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(())
}

/// Sleep for `ms` on the popup if one is adopted, else on the page
pub async fn explicit_wait(session: &Session, ms: u64) {
    match session.popup().await {
        Some(popup) => tracing::info!(page = %popup, "Waiting for the popup : {ms} milliseconds"),
        None => tracing::info!("Waiting for the page : {ms} milliseconds"),
    }
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Page receiving [`keyboard`] input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyboardTarget {
    /// Page at this index
    Page(usize),
    /// The main page
    #[default]
    Main,
    /// The popup, adopted if needed
    Popup,
}

/// Page-level keyboard input.
///
/// `method` is one of `type`, `up`, `down`, `press` or `inserttext`,
/// compared trimmed and ignoring case. Key names follow the browser's
/// (`Enter`, `ArrowDown`, `KeyA`, `F5`).
pub async fn keyboard(session: &Session, method: &str, key: &str, target: KeyboardTarget) -> UiResult<()> {
    let action = KeyboardAction::from_method(method, key)
        .ok_or_else(|| UiError::invalid_argument(format!("unknown keyboard method `{method}`")))?;
    let page = match target {
        KeyboardTarget::Page(index) => session.page_at(index).await?,
        KeyboardTarget::Main => session.main_page(),
        KeyboardTarget::Popup => session.adopt_popup().await?,
    };
    tracing::info!("Keyboard method : {method} - {key}");
    session.driver().keyboard(page, &action).await
}

/// Reload the page in `scope`
pub async fn refresh_page(session: &Session, scope: PageScope) -> UiResult<()> {
    let page = session.resolve(scope).await?;
    tracing::info!(page = %page, "refreshing {scope}");
    session.driver().reload(page).await
}

/// URL of the page at `page_index`, after the main page finished loading
pub async fn get_url(session: &Session, page_index: usize) -> UiResult<String> {
    let page = session.page_at(page_index).await?;
    wait_for_page_load(session).await?;
    session.driver().url(page).await
}

/// Next response on the main page whose URL contains `url_fragment`
pub async fn get_api_response(session: &Session, url_fragment: &str) -> UiResult<ResponseInfo> {
    let timeout = Duration::from_millis(session.config().default_timeout_ms);
    let response = session
        .driver()
        .wait_for_response(session.main_page(), url_fragment, timeout)
        .await?;
    tracing::info!(url = %response.url, status = response.status, "api response");
    Ok(response)
}

/// Close the popup, the main page, then the browser.
///
/// Pages that are already gone are skipped. Every step runs even when an
/// earlier one fails; the first failure is returned.
pub async fn close_session(session: &Session) -> UiResult<()> {
    let driver = session.driver();
    let open = driver.pages().await.unwrap_or_default();
    let mut pages = Vec::with_capacity(2);
    if let Some(popup) = session.take_popup().await {
        pages.push(popup);
    }
    pages.push(session.main_page());

    let mut first_error = None;
    for page in pages.into_iter().filter(|p| open.contains(p)) {
        if let Err(e) = driver.close_page(page).await {
            tracing::error!(page = %page, error = %e, "failed to close page");
            first_error.get_or_insert(e);
        }
    }
    if let Err(e) = driver.close().await {
        tracing::error!(error = %e, "failed to close browser");
        first_error.get_or_insert(e);
    }
    match first_error {
        Some(e) => Err(e),
        None => {
            tracing::info!(session = %session.id(), "session closed");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::BrowserDriver;
    use crate::mock::{MockNode, MockPage};
    use crate::session::fixtures::session_with;

    fn blank() -> MockNode {
        MockNode::new("body")
    }

    mod launch_tests {
        use super::*;

        #[cfg(not(feature = "browser"))]
        #[tokio::test]
        async fn test_launch_without_browser_feature() {
            let err = launch_session(SessionConfig::default()).await.unwrap_err();
            assert!(matches!(err, UiError::BrowserLaunch { .. }));
        }
    }

    mod goto_tests {
        use super::*;

        #[tokio::test]
        async fn test_goto_blocks_images_and_waits_for_dom() {
            let (driver, session, page) = session_with(blank());
            driver.route("https://docs.test/", MockPage::new(blank()).title("Docs"));

            goto_url(&session, "https://docs.test/", GotoOptions::new()).await.unwrap();

            assert_eq!(driver.title(page).await.unwrap(), "Docs");
            assert_eq!(driver.blocked_patterns(page), vec!["*.png", "*.jpg", "*.jpeg"]);
            assert!(driver.was_called("goto:https://docs.test/:DOMContentLoaded"));
        }

        #[tokio::test]
        async fn test_goto_with_images() {
            let (driver, session, page) = session_with(blank());
            let options = GotoOptions::new().with_images().wait_until(LoadState::Load);
            goto_url(&session, "https://docs.test/", options).await.unwrap();
            assert!(driver.blocked_patterns(page).is_empty());
            assert!(driver.was_called("goto:https://docs.test/:load"));
        }

        #[tokio::test]
        async fn test_wait_for_url_and_get_url() {
            let (driver, session, _page) = session_with(blank());
            goto_url(&session, "https://docs.test/guide/intro", GotoOptions::new())
                .await
                .unwrap();
            wait_for_url(&session, "**/guide/*").await.unwrap();
            assert_eq!(get_url(&session, 0).await.unwrap(), "https://docs.test/guide/intro");
            assert!(matches!(get_url(&session, 3).await, Err(UiError::PageNotFound { index: 3 })));
            assert!(driver.was_called("load_state"));
        }
    }

    mod wait_tests {
        use super::*;

        #[tokio::test]
        async fn test_spinner_hidden_when_absent_or_hidden() {
            let (_d, session, _p) = session_with(blank());
            wait_for_spinner_hidden(&session).await.unwrap();

            let hidden = MockNode::new("body").child(MockNode::new("div").class("spinner").hidden());
            let (_d, session, _p) = session_with(hidden);
            wait_for_spinner_hidden(&session).await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_static_wait_on_page() {
            let (_d, session, _p) = session_with(blank());
            let before = tokio::time::Instant::now();
            static_wait(&session, 250, true, true).await.unwrap();
            assert!(before.elapsed() >= Duration::from_millis(250));
        }

        #[tokio::test]
        async fn test_static_wait_on_popup_needs_popup() {
            let (_d, session, _p) = session_with(blank());
            let err = static_wait(&session, 1, false, false).await.unwrap_err();
            assert!(matches!(err, UiError::NoActivePage));
        }

        #[tokio::test(start_paused = true)]
        async fn test_explicit_wait_sleeps() {
            let (_d, session, _p) = session_with(blank());
            let before = tokio::time::Instant::now();
            explicit_wait(&session, 40).await;
            assert!(before.elapsed() >= Duration::from_millis(40));
        }

        #[tokio::test]
        async fn test_popup_load_adopts_popup() {
            let (driver, session, page) = session_with(blank());
            let popup = driver.queue_popup(page, "https://a.test/p", MockPage::default());
            wait_for_popup_load(&session).await.unwrap();
            assert_eq!(session.popup().await, Some(popup));
            assert!(driver.was_called(&format!("load_state:{popup}:load")));
        }
    }

    mod keyboard_tests {
        use super::*;

        #[tokio::test]
        async fn test_keyboard_methods() {
            let (driver, session, _p) = session_with(blank());
            keyboard(&session, " Press ", "Enter", KeyboardTarget::Main).await.unwrap();
            keyboard(&session, "down", "End", KeyboardTarget::Page(0)).await.unwrap();
            assert!(driver.was_called("keyboard:press:Enter"));
            assert!(driver.was_called("keyboard:down:End"));
        }

        #[tokio::test]
        async fn test_unknown_method_is_invalid() {
            let (_d, session, _p) = session_with(blank());
            let err = keyboard(&session, "hold", "A", KeyboardTarget::Main).await.unwrap_err();
            assert!(matches!(err, UiError::InvalidArgument { .. }));
        }

        #[tokio::test]
        async fn test_keyboard_on_popup() {
            let (driver, session, page) = session_with(blank());
            let popup = driver.queue_popup(page, "https://a.test/p", MockPage::default());
            keyboard(&session, "press", "Escape", KeyboardTarget::Popup).await.unwrap();
            assert_eq!(session.popup().await, Some(popup));
            assert!(driver.was_called("keyboard:press:Escape"));
        }
    }

    mod misc_tests {
        use super::*;

        #[tokio::test]
        async fn test_refresh_and_api_response() {
            let (driver, session, page) = session_with(blank());
            refresh_page(&session, PageScope::default()).await.unwrap();
            assert!(driver.was_called(&format!("reload:{page}")));

            driver.push_response(ResponseInfo::new("https://api.test/v1/orders?page=1", 200));
            let response = get_api_response(&session, "/v1/orders").await.unwrap();
            assert!(response.ok());
        }
    }

    mod teardown_tests {
        use super::*;

        #[tokio::test]
        async fn test_close_order_popup_page_browser() {
            let (driver, session, page) = session_with(blank());
            let popup = driver.queue_popup(page, "https://a.test/p", MockPage::default());
            session.set_popup(popup).await;

            close_session(&session).await.unwrap();

            let history = driver.history();
            let closes: Vec<&String> = history.iter().filter(|c| c.starts_with("close")).collect();
            assert_eq!(
                closes,
                vec![&format!("close_page:{popup}"), &format!("close_page:{page}"), &"close".to_string()]
            );
            assert!(driver.is_closed());
            assert!(session.popup().await.is_none());
        }

        #[tokio::test]
        async fn test_close_continues_after_failed_page() {
            let (driver, session, page) = session_with(blank());
            let popup = driver.queue_popup(page, "https://a.test/p", MockPage::default());
            session.set_popup(popup).await;
            driver.fail_close(popup);

            let err = close_session(&session).await.unwrap_err();
            assert!(matches!(err, UiError::Driver { .. }));
            assert!(driver.was_called(&format!("close_page_failed:{popup}")));
            assert!(driver.was_called(&format!("close_page:{page}")));
            assert!(driver.is_closed());
        }

        #[tokio::test]
        async fn test_close_tolerates_missing_pages() {
            let (driver, session, page) = session_with(blank());
            driver.close_page(page).await.unwrap();
            close_session(&session).await.unwrap();
            assert!(driver.is_closed());
        }
    }
}
