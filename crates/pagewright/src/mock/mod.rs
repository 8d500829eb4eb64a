//! Mock browser driver backed by an in-memory DOM.
//!
//! [`MockDriver`] implements [`BrowserDriver`] without a browser so the whole
//! binding layer can be exercised in unit and integration tests. Pages are
//! built from [`MockNode`] trees; URLs can be routed to [`MockPage`]s so that
//! `goto`, link clicks and popups load predictable content.
//!
//! ## Example
//!
//! ```
//! use pagewright::mock::{MockDriver, MockNode, MockPage};
//!
//! let driver = MockDriver::new();
//! driver.route(
//!     "https://docs.test/",
//!     MockPage::new(MockNode::new("body").child(MockNode::new("input").attr("name", "q")))
//!         .title("Docs"),
//! );
//! assert!(driver.history().is_empty());
//! ```

mod dom;

pub use dom::{MockNode, MockPage};

use crate::driver::{BrowserDriver, PageId, ResponseInfo};
use crate::locator::{ElementAction, ElementPath, ElementState, KeyboardAction, Locator};
use crate::result::{UiError, UiResult};
use crate::wait::LoadState;
use async_trait::async_trait;
use dom::Document;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Interval at which pending popups and responses are re-checked
const MOCK_POLL_MS: u64 = 5;

/// Nominal document height reported by `scroll_height`
const MOCK_SCROLL_HEIGHT: f64 = 2000.0;

#[derive(Debug)]
struct PageState {
    url: String,
    title: String,
    doc: Document,
    focused: Option<usize>,
    markup_churn: bool,
    churn_counter: u64,
    blocked: Vec<String>,
}

impl PageState {
    fn from_mock(url: &str, page: &MockPage) -> Self {
        Self {
            url: url.to_string(),
            title: page.title.clone(),
            doc: Document::build(&page.body),
            focused: None,
            markup_churn: false,
            churn_counter: 0,
            blocked: Vec::new(),
        }
    }

    fn load(&mut self, url: &str, page: &MockPage) {
        let blocked = std::mem::take(&mut self.blocked);
        *self = Self::from_mock(url, page);
        self.blocked = blocked;
    }
}

#[derive(Debug, Default)]
struct MockState {
    next_page: u64,
    pages: Vec<(PageId, PageState)>,
    popups: VecDeque<(PageId, PageId)>,
    routes: HashMap<String, MockPage>,
    responses: Vec<ResponseInfo>,
    call_history: Vec<String>,
    failing_closes: Vec<PageId>,
    closed: bool,
}

impl MockState {
    fn page(&self, id: PageId) -> UiResult<&PageState> {
        self.pages
            .iter()
            .find(|(p, _)| *p == id)
            .map(|(_, s)| s)
            .ok_or_else(|| UiError::driver(format!("{id} is not open")))
    }

    fn page_mut(&mut self, id: PageId) -> UiResult<&mut PageState> {
        self.pages
            .iter_mut()
            .find(|(p, _)| *p == id)
            .map(|(_, s)| s)
            .ok_or_else(|| UiError::driver(format!("{id} is not open")))
    }

    fn routed(&self, url: &str) -> MockPage {
        self.routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| MockPage::new(MockNode::new("body")))
    }

    fn open(&mut self, url: &str, page: &MockPage) -> PageId {
        let id = PageId(self.next_page);
        self.next_page += 1;
        self.pages.push((id, PageState::from_mock(url, page)));
        id
    }

    fn record(&mut self, call: String) {
        self.call_history.push(call);
    }
}

/// Mock driver for unit and integration testing
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create a mock driver with no pages
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve `page` whenever `url` is loaded
    pub fn route(&self, url: &str, page: MockPage) {
        self.lock().routes.insert(url.to_string(), page);
    }

    /// Open a page showing `body` at `about:blank`
    pub fn open_page(&self, body: MockNode) -> PageId {
        self.lock().open("about:blank", &MockPage::new(body))
    }

    /// Open a popup from `opener` showing `page` at `url`
    pub fn queue_popup(&self, opener: PageId, url: &str, page: MockPage) -> PageId {
        let mut state = self.lock();
        let popup = state.open(url, &page);
        state.popups.push_back((opener, popup));
        state.record(format!("popup:{opener}:{popup}"));
        popup
    }

    /// Make `close_page(page)` fail with a driver error
    pub fn fail_close(&self, page: PageId) {
        self.lock().failing_closes.push(page);
    }

    /// Make `document.body.innerHTML` differ on every read
    pub fn set_markup_churn(&self, page: PageId, churn: bool) {
        if let Ok(state) = self.lock().page_mut(page) {
            state.markup_churn = churn;
        }
    }

    /// Record a network response the page will observe
    pub fn push_response(&self, response: ResponseInfo) {
        self.lock().responses.push(response);
    }

    /// Current value of the first match
    pub fn value_of(&self, page: PageId, locator: &Locator) -> Option<String> {
        let state = self.lock();
        let page = state.page(page).ok()?;
        let id = *page.doc.resolve(locator).ok()?.first()?;
        Some(page.doc.nodes[id].value.clone())
    }

    /// Whether the first match is checked
    pub fn is_checked(&self, page: PageId, locator: &Locator) -> bool {
        let state = self.lock();
        state
            .page(page)
            .ok()
            .and_then(|p| {
                let id = *p.doc.resolve(locator).ok()?.first()?;
                Some(p.doc.nodes[id].checked)
            })
            .unwrap_or(false)
    }

    /// URL patterns blocked on `page`
    pub fn blocked_patterns(&self, page: PageId) -> Vec<String> {
        self.lock()
            .page(page)
            .map(|p| p.blocked.clone())
            .unwrap_or_default()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().call_history.clone()
    }

    /// Check if a call starting with `method` was recorded
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock()
            .call_history
            .iter()
            .any(|c| c.starts_with(method))
    }

    /// Whether `close` was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn first_match(&self, page: PageId, locator: &Locator) -> UiResult<(usize, MutexGuard<'_, MockState>)> {
        let state = self.lock();
        let found = state.page(page)?.doc.resolve(locator)?;
        match found.first() {
            Some(&id) => Ok((id, state)),
            None => Err(UiError::element_not_found(locator.to_string())),
        }
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn pages(&self) -> UiResult<Vec<PageId>> {
        Ok(self.lock().pages.iter().map(|(id, _)| *id).collect())
    }

    async fn new_page(&self) -> UiResult<PageId> {
        let mut state = self.lock();
        if state.closed {
            return Err(UiError::driver("browser is closed"));
        }
        let page = state.routed("about:blank");
        let id = state.open("about:blank", &page);
        state.record(format!("new_page:{id}"));
        Ok(id)
    }

    async fn next_popup(&self, opener: PageId, known: &[PageId]) -> UiResult<PageId> {
        loop {
            {
                let mut state = self.lock();
                state
                    .popups
                    .retain(|(o, p)| *o != opener || !known.contains(p));
                if let Some(pos) = state.popups.iter().position(|(o, _)| *o == opener) {
                    if let Some((_, popup)) = state.popups.remove(pos) {
                        return Ok(popup);
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(MOCK_POLL_MS)).await;
        }
    }

    async fn goto(
        &self,
        page: PageId,
        url: &str,
        wait_until: LoadState,
        _timeout: Duration,
    ) -> UiResult<()> {
        let mut state = self.lock();
        let content = state.routed(url);
        state.page_mut(page)?.load(url, &content);
        state.record(format!("goto:{url}:{wait_until}"));
        Ok(())
    }

    async fn reload(&self, page: PageId) -> UiResult<()> {
        let mut state = self.lock();
        let url = state.page(page)?.url.clone();
        let content = state.routed(&url);
        state.page_mut(page)?.load(&url, &content);
        state.record(format!("reload:{page}"));
        Ok(())
    }

    async fn url(&self, page: PageId) -> UiResult<String> {
        Ok(self.lock().page(page)?.url.clone())
    }

    async fn title(&self, page: PageId) -> UiResult<String> {
        Ok(self.lock().page(page)?.title.clone())
    }

    async fn wait_for_load_state(
        &self,
        page: PageId,
        state: LoadState,
        _timeout: Duration,
    ) -> UiResult<()> {
        let mut guard = self.lock();
        guard.page(page)?;
        guard.record(format!("load_state:{page}:{state}"));
        Ok(())
    }

    async fn body_markup(&self, page: PageId) -> UiResult<String> {
        let mut state = self.lock();
        let page = state.page_mut(page)?;
        let mut markup = page.doc.body().map(|b| page.doc.markup(b)).unwrap_or_default();
        if page.markup_churn {
            page.churn_counter += 1;
            markup.push_str(&format!("<!--{}-->", page.churn_counter));
        }
        Ok(markup)
    }

    async fn block_requests(&self, page: PageId, patterns: &[String]) -> UiResult<()> {
        let mut state = self.lock();
        state.page_mut(page)?.blocked.extend(patterns.iter().cloned());
        state.record(format!("block_requests:{}", patterns.join(",")));
        Ok(())
    }

    async fn wait_for_response(
        &self,
        page: PageId,
        url_fragment: &str,
        timeout: Duration,
    ) -> UiResult<ResponseInfo> {
        let start = Instant::now();
        loop {
            {
                let state = self.lock();
                state.page(page)?;
                if let Some(found) = state.responses.iter().find(|r| r.url.contains(url_fragment)) {
                    return Ok(found.clone());
                }
            }
            if start.elapsed() >= timeout {
                return Err(UiError::timeout(
                    timeout.as_millis() as u64,
                    format!("response matching {url_fragment}"),
                ));
            }
            tokio::time::sleep(Duration::from_millis(MOCK_POLL_MS)).await;
        }
    }

    async fn count(&self, page: PageId, locator: &Locator) -> UiResult<usize> {
        Ok(self.lock().page(page)?.doc.resolve(locator)?.len())
    }

    async fn element_paths(&self, page: PageId, locator: &Locator) -> UiResult<Vec<ElementPath>> {
        let state = self.lock();
        let doc = &state.page(page)?.doc;
        Ok(doc
            .resolve(locator)?
            .into_iter()
            .map(|id| doc.element_path(id))
            .collect())
    }

    async fn inner_texts(&self, page: PageId, locator: &Locator) -> UiResult<Vec<String>> {
        let state = self.lock();
        let doc = &state.page(page)?.doc;
        Ok(doc
            .resolve(locator)?
            .into_iter()
            .map(|id| doc.inner_text(id))
            .collect())
    }

    async fn attribute(
        &self,
        page: PageId,
        locator: &Locator,
        name: &str,
    ) -> UiResult<Option<String>> {
        let (id, state) = self.first_match(page, locator)?;
        Ok(state.page(page)?.doc.nodes[id].attr(name).map(str::to_string))
    }

    async fn input_value(&self, page: PageId, locator: &Locator) -> UiResult<String> {
        let (id, state) = self.first_match(page, locator)?;
        Ok(state.page(page)?.doc.nodes[id].value.clone())
    }

    async fn computed_style(
        &self,
        page: PageId,
        locator: &Locator,
        property: &str,
    ) -> UiResult<Option<String>> {
        let (id, state) = self.first_match(page, locator)?;
        let doc = &state.page(page)?.doc;
        let node = &doc.nodes[id];
        if let Some((_, value)) = node.style.iter().find(|(p, _)| p == property) {
            return Ok(Some(value.clone()));
        }
        Ok(match property {
            "display" => Some(if doc.is_visible(id) { "block" } else { "none" }.to_string()),
            _ => None,
        })
    }

    async fn element_state(
        &self,
        page: PageId,
        locator: &Locator,
        query: ElementState,
    ) -> UiResult<bool> {
        let (id, state) = self.first_match(page, locator)?;
        let doc = &state.page(page)?.doc;
        Ok(match query {
            ElementState::Visible => doc.is_visible(id),
            ElementState::Enabled => doc.nodes[id].attr("disabled").is_none(),
            ElementState::Checked => doc.nodes[id].checked,
        })
    }

    async fn perform(
        &self,
        page: PageId,
        locator: &Locator,
        action: &ElementAction,
    ) -> UiResult<()> {
        let (id, mut state) = self.first_match(page, locator)?;
        let path = state.page(page)?.doc.element_path(id).css;
        state.record(format!("{}:{path}", action.name()));

        let node = state.page(page)?.doc.nodes[id].clone();
        let disabled = node.attr("disabled").is_some();
        match action {
            ElementAction::Click { force, .. } => {
                if disabled && !force {
                    return Err(UiError::driver(format!("{path} is disabled")));
                }
                let target = node.attr("target").map(str::to_string);
                let href = node.attr("href").map(str::to_string);
                let input_type = node.attr("type").unwrap_or_default().to_string();
                let current = state.page_mut(page)?;
                if node.tag == "input" {
                    let element = &mut current.doc.nodes[id];
                    match input_type.as_str() {
                        "checkbox" => element.checked = !element.checked,
                        "radio" => element.checked = true,
                        _ => {}
                    }
                }
                current.focused = Some(id);
                if let Some(href) = href {
                    let content = state.routed(&href);
                    if target.as_deref() == Some("_blank") {
                        let popup = state.open(&href, &content);
                        state.popups.push_back((page, popup));
                    } else {
                        state.page_mut(page)?.load(&href, &content);
                    }
                }
            }
            ElementAction::Fill(value) => {
                if disabled {
                    return Err(UiError::driver(format!("{path} is disabled")));
                }
                let current = state.page_mut(page)?;
                current.doc.nodes[id].value.clone_from(value);
                current.focused = Some(id);
            }
            ElementAction::Clear => state.page_mut(page)?.doc.nodes[id].value.clear(),
            ElementAction::Type { text, .. } => {
                let current = state.page_mut(page)?;
                current.doc.nodes[id].value.push_str(text);
                current.focused = Some(id);
            }
            ElementAction::Press(key) => state.record(format!("key:{key}")),
            ElementAction::Check => state.page_mut(page)?.doc.nodes[id].checked = true,
            ElementAction::Uncheck => state.page_mut(page)?.doc.nodes[id].checked = false,
            ElementAction::SelectByText(wanted) => {
                let doc = &mut state.page_mut(page)?.doc;
                let option = doc.nodes[id]
                    .children
                    .iter()
                    .copied()
                    .find(|&o| {
                        doc.nodes[o].text.trim() == wanted.as_str()
                            || doc.nodes[o].attr("value") == Some(wanted.as_str())
                    })
                    .ok_or_else(|| UiError::driver(format!("no option {wanted:?} in {path}")))?;
                let value = option_value(doc, option);
                doc.nodes[id].value = value;
            }
            ElementAction::SelectByIndex(index) => {
                let doc = &mut state.page_mut(page)?.doc;
                let option = doc.nodes[id]
                    .children
                    .iter()
                    .copied()
                    .filter(|&o| doc.nodes[o].tag == "option")
                    .nth(*index)
                    .ok_or_else(|| UiError::driver(format!("no option #{index} in {path}")))?;
                let value = option_value(doc, option);
                doc.nodes[id].value = value;
            }
            ElementAction::SetInputFiles(files) => {
                let element = &mut state.page_mut(page)?.doc.nodes[id];
                element.files = files.iter().map(|f| f.display().to_string()).collect();
                element.value = element.files.first().cloned().unwrap_or_default();
            }
            ElementAction::Focus => state.page_mut(page)?.focused = Some(id),
            ElementAction::ScrollIntoView => {}
        }
        Ok(())
    }

    async fn keyboard(&self, page: PageId, action: &KeyboardAction) -> UiResult<()> {
        let mut state = self.lock();
        let current = state.page_mut(page)?;
        let (name, key) = match action {
            KeyboardAction::Type(text) | KeyboardAction::InsertText(text) => {
                if let Some(focused) = current.focused {
                    current.doc.nodes[focused].value.push_str(text);
                }
                let name = if matches!(action, KeyboardAction::Type(_)) {
                    "type"
                } else {
                    "inserttext"
                };
                (name, text)
            }
            KeyboardAction::Up(key) => ("up", key),
            KeyboardAction::Down(key) => ("down", key),
            KeyboardAction::Press(key) => ("press", key),
        };
        let call = format!("keyboard:{name}:{key}");
        state.record(call);
        Ok(())
    }

    async fn mouse_wheel(&self, page: PageId, delta_x: f64, delta_y: f64) -> UiResult<()> {
        let mut state = self.lock();
        state.page(page)?;
        state.record(format!("wheel:{delta_x}:{delta_y}"));
        Ok(())
    }

    async fn scroll_height(&self, page: PageId) -> UiResult<f64> {
        self.lock().page(page)?;
        Ok(MOCK_SCROLL_HEIGHT)
    }

    async fn close_page(&self, page: PageId) -> UiResult<()> {
        let mut state = self.lock();
        state.page(page)?;
        if state.failing_closes.contains(&page) {
            state.record(format!("close_page_failed:{page}"));
            return Err(UiError::driver(format!("{page} refused to close")));
        }
        state.pages.retain(|(id, _)| *id != page);
        state.record(format!("close_page:{page}"));
        Ok(())
    }

    async fn close(&self) -> UiResult<()> {
        let mut state = self.lock();
        state.pages.clear();
        state.closed = true;
        state.record("close".to_string());
        Ok(())
    }
}

fn option_value(doc: &Document, option: usize) -> String {
    doc.nodes[option]
        .attr("value")
        .map_or_else(|| doc.nodes[option].text.trim().to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> MockNode {
        MockNode::new("body").child(
            MockNode::new("form").children([
                MockNode::new("input").attr("name", "q"),
                MockNode::new("input").attr("type", "checkbox").id("agree"),
                MockNode::new("input").attr("type", "checkbox").id("locked").disabled(),
                MockNode::new("select").id("size").children([
                    MockNode::new("option").attr("value", "s").text("Small"),
                    MockNode::new("option").attr("value", "l").text("Large"),
                ]),
                MockNode::new("a").attr("href", "https://docs.test/help").attr("target", "_blank").text("Help"),
            ]),
        )
    }

    #[tokio::test]
    async fn test_fill_type_and_clear() {
        let driver = MockDriver::new();
        let page = driver.open_page(form());
        let q = Locator::new("[name=\"q\"]");
        driver.perform(page, &q, &ElementAction::Fill("rust".into())).await.unwrap();
        driver
            .perform(page, &q, &ElementAction::Type { text: " docs".into(), delay_ms: 0 })
            .await
            .unwrap();
        assert_eq!(driver.input_value(page, &q).await.unwrap(), "rust docs");
        driver.perform(page, &q, &ElementAction::Clear).await.unwrap();
        assert_eq!(driver.value_of(page, &q).as_deref(), Some(""));
        assert!(driver.was_called("fill:html > body > form:nth-child(1) > input:nth-child(1)"));
    }

    #[tokio::test]
    async fn test_click_toggles_checkbox_and_rejects_disabled() {
        let driver = MockDriver::new();
        let page = driver.open_page(form());
        let agree = Locator::new("#agree");
        driver.perform(page, &agree, &ElementAction::click(false)).await.unwrap();
        assert!(driver.is_checked(page, &agree));

        let locked = Locator::new("#locked");
        assert!(driver.perform(page, &locked, &ElementAction::click(false)).await.is_err());
        driver.perform(page, &locked, &ElementAction::click(true)).await.unwrap();
    }

    #[tokio::test]
    async fn test_select_by_text_and_index() {
        let driver = MockDriver::new();
        let page = driver.open_page(form());
        let size = Locator::new("#size");
        driver.perform(page, &size, &ElementAction::SelectByText("Large".into())).await.unwrap();
        assert_eq!(driver.input_value(page, &size).await.unwrap(), "l");
        driver.perform(page, &size, &ElementAction::SelectByIndex(0)).await.unwrap();
        assert_eq!(driver.input_value(page, &size).await.unwrap(), "s");
        assert!(driver.perform(page, &size, &ElementAction::SelectByIndex(5)).await.is_err());
    }

    #[tokio::test]
    async fn test_blank_target_link_opens_popup() {
        let driver = MockDriver::new();
        driver.route(
            "https://docs.test/help",
            MockPage::new(MockNode::new("body").child(MockNode::new("h1").text("Help"))).title("Help"),
        );
        let page = driver.open_page(form());
        driver.perform(page, &Locator::new("a"), &ElementAction::click(false)).await.unwrap();
        let popup = tokio::time::timeout(Duration::from_millis(200), driver.next_popup(page, &[page]))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(popup, page);
        assert_eq!(driver.title(popup).await.unwrap(), "Help");
        assert_eq!(driver.pages().await.unwrap(), vec![page, popup]);
    }

    #[tokio::test]
    async fn test_next_popup_pends_without_popup() {
        let driver = MockDriver::new();
        let page = driver.open_page(form());
        let waited = tokio::time::timeout(Duration::from_millis(30), driver.next_popup(page, &[page])).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_next_popup_skips_known_tabs() {
        let driver = MockDriver::new();
        let page = driver.open_page(form());
        let stale = driver.queue_popup(page, "https://a.test/old", MockPage::default());
        let known = driver.pages().await.unwrap();
        let fresh = driver.queue_popup(page, "https://a.test/new", MockPage::default());

        let popup = tokio::time::timeout(Duration::from_millis(200), driver.next_popup(page, &known))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popup, fresh);
        assert_ne!(popup, stale);

        // The stale tab stays open but is no longer offered as a popup
        assert!(driver.pages().await.unwrap().contains(&stale));
        let waited = tokio::time::timeout(Duration::from_millis(30), driver.next_popup(page, &known)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_missing_element_is_not_found() {
        let driver = MockDriver::new();
        let page = driver.open_page(form());
        let err = driver.input_value(page, &Locator::new("#nope")).await.unwrap_err();
        assert!(matches!(err, UiError::ElementNotFound { .. }));
        assert_eq!(driver.count(page, &Locator::new("#nope")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_goto_loads_route_and_keeps_blocking() {
        let driver = MockDriver::new();
        driver.route("https://a.test/", MockPage::new(MockNode::new("body")).title("A"));
        let page = driver.open_page(MockNode::new("body"));
        driver.block_requests(page, &["*.png".to_string()]).await.unwrap();
        driver
            .goto(page, "https://a.test/", LoadState::DomContentLoaded, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(driver.title(page).await.unwrap(), "A");
        assert_eq!(driver.blocked_patterns(page), vec!["*.png".to_string()]);
    }

    #[tokio::test]
    async fn test_close_records_and_clears() {
        let driver = MockDriver::new();
        let page = driver.open_page(form());
        driver.close_page(page).await.unwrap();
        assert!(driver.close_page(page).await.is_err());
        driver.close().await.unwrap();
        assert!(driver.is_closed());
        assert!(driver.new_page().await.is_err());
    }
}
