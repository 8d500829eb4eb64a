//! Real browser control over the Chrome `DevTools` Protocol.
//!
//! [`ChromiumDriver`] implements [`BrowserDriver`] with chromiumoxide. Locator
//! chains are serialized to JSON and walked by a page-side resolver script,
//! so CSS and XPath roots, text filters and positional steps behave the same
//! here as in [`MockDriver`](crate::mock::MockDriver).

#![allow(
    clippy::significant_drop_tightening,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc
)]

use crate::config::SessionConfig;
use crate::driver::{BrowserDriver, PageId, ResponseInfo};
use crate::locator::{ElementAction, ElementPath, ElementState, KeyboardAction, Locator};
use crate::result::{UiError, UiResult};
use crate::wait::{LoadState, DOM_STABLE_WINDOW_MS};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventResponseReceived, SetBlockedUrLsParams,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Interval for popup discovery and load-state polls
const CDP_POLL_MS: u64 = 50;

/// Attribute used to hand one resolved node to a DOM-domain command
const TARGET_MARKER: &str = "data-pagewright-target";

/// Page-side locator resolver; `__pwResolve(chain)` returns matched elements
/// in document order.
const RESOLVER_JS: &str = r"
const __pwResolve = (chain) => {
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const matches = (text, wanted, exact) => exact
    ? (text || '').trim() === wanted.trim()
    : norm(text).toLowerCase().includes(norm(wanted).toLowerCase());
  const query = (sel, scope) => {
    if (sel.kind === 'css') {
      return Array.from((scope || document).querySelectorAll(sel.value));
    }
    let expr = sel.value;
    if (scope && expr.startsWith('/')) { expr = '.' + expr; }
    const snap = document.evaluate(expr, scope || document, null,
      XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    const out = [];
    for (let i = 0; i < snap.snapshotLength; i++) {
      const node = snap.snapshotItem(i);
      if (node.nodeType === 1) { out.push(node); }
    }
    return out;
  };
  const ownText = (el) => Array.from(el.childNodes)
    .filter((n) => n.nodeType === 3).map((n) => n.textContent).join('');
  const inOrder = (els) => Array.from(new Set(els)).sort((a, b) =>
    a === b ? 0 : (a.compareDocumentPosition(b) & Node.DOCUMENT_POSITION_FOLLOWING ? -1 : 1));
  const descendants = (el) => Array.from(el.querySelectorAll('*'));
  let current = query(chain.root, null);
  for (const step of chain.steps) {
    switch (step.op) {
      case 'locate': current = current.flatMap((el) => query(step.selector, el)); break;
      case 'filter_text': current = current.filter((el) => matches(el.innerText, step.text, step.exact)); break;
      case 'filter_has': current = current.filter((el) => query(step.selector, el).length > 0); break;
      case 'filter_has_text': current = current.filter((el) =>
        descendants(el).some((d) => matches(ownText(d), step.text, step.exact))); break;
      case 'get_by_text': current = current.flatMap((el) =>
        descendants(el).filter((d) => matches(ownText(d), step.text, step.exact))); break;
      case 'nth': current = current.length > step.index ? [current[step.index]] : []; break;
      case 'last': current = current.length ? [current[current.length - 1]] : []; break;
      case 'parent': current = current.map((el) => el.parentElement)
        .filter((p) => p && p !== document.documentElement); break;
      case 'next_sibling': current = current.map((el) => el.nextElementSibling)
        .filter((s) => s && (step.tag === '*' || s.tagName.toLowerCase() === step.tag.toLowerCase())); break;
    }
    current = inOrder(current);
  }
  return current;
};
const __pwPath = (el) => {
  const css = [];
  const xpath = [];
  for (let node = el; node && node.nodeType === 1; node = node.parentElement) {
    const tag = node.tagName.toLowerCase();
    if (tag === 'html' || tag === 'body' || !node.parentElement) {
      css.push(tag);
      xpath.push(tag);
      continue;
    }
    const siblings = Array.from(node.parentElement.children);
    const nthChild = siblings.indexOf(node) + 1;
    const nthOfType = siblings.filter((s) => s.tagName === node.tagName).indexOf(node) + 1;
    css.push(`${tag}:nth-child(${nthChild})`);
    xpath.push(`${tag}[${nthOfType}]`);
  }
  return { css: css.reverse().join(' > '), xpath: '/' + xpath.reverse().join('/') };
};
";

/// Result of a script acting on the first match
#[derive(Debug, Deserialize)]
struct Probe<T> {
    found: bool,
    value: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ClickPoint {
    x: f64,
    y: f64,
    disabled: bool,
}

fn cdp_error(error: impl std::fmt::Display) -> UiError {
    UiError::driver(error.to_string())
}

/// Expression evaluating `body` with `els` bound to the matches of `locator`
fn with_matches(locator: &Locator, body: &str) -> UiResult<String> {
    let chain = serde_json::to_string(locator)?;
    Ok(format!(
        "(() => {{ {RESOLVER_JS}\nconst els = __pwResolve({chain});\n{body}\n}})()"
    ))
}

/// Expression evaluating `body` with `el` bound to the first match
fn with_first(locator: &Locator, body: &str) -> UiResult<String> {
    with_matches(
        locator,
        &format!("const el = els[0]; if (!el) {{ return {{ found: false }}; }}\nreturn {{ found: true, value: (() => {{ {body} }})() }};"),
    )
}

fn key_event(kind: DispatchKeyEventType, key: &str, text: Option<&str>) -> UiResult<DispatchKeyEventParams> {
    let mut builder = DispatchKeyEventParams::builder().r#type(kind).key(key.to_string());
    if let Some(text) = text {
        builder = builder.text(text.to_string());
    }
    builder.build().map_err(cdp_error)
}

/// Text a key produces when pressed, for keys that produce any
fn key_text(key: &str) -> Option<&str> {
    match key {
        "Enter" => Some("\r"),
        "Tab" => Some("\t"),
        "Space" => Some(" "),
        k if k.chars().count() == 1 => Some(k),
        _ => None,
    }
}

/// Drop closed tabs from `registry` and append newly opened ones in the
/// order `open` lists them.
fn reconcile<T>(
    registry: &mut Vec<(PageId, T)>,
    open: Vec<T>,
    same: impl Fn(&T, &T) -> bool,
    mut next_id: impl FnMut() -> PageId,
) {
    registry.retain(|(_, page)| open.iter().any(|p| same(p, page)));
    for page in open {
        if !registry.iter().any(|(_, p)| same(p, &page)) {
            let id = next_id();
            tracing::debug!(page = %id, "tab discovered");
            registry.push((id, page));
        }
    }
}

/// First open tab that is neither the opener, in the pre-action snapshot,
/// nor already handed out
fn fresh_popup(open: &[PageId], opener: PageId, known: &[PageId], claimed: &[PageId]) -> Option<PageId> {
    open.iter()
        .copied()
        .find(|id| *id != opener && !known.contains(id) && !claimed.contains(id))
}

/// Browser driven over CDP
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Mutex<CdpBrowser>,
    pages: Mutex<Vec<(PageId, CdpPage)>>,
    claimed: Mutex<Vec<PageId>>,
    next_page: AtomicU64,
    handle: tokio::task::JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch Chromium for `config`
    pub async fn launch(config: &SessionConfig) -> UiResult<Self> {
        let mut builder = CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.executable_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(|e| UiError::BrowserLaunch { message: e })?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(|e| UiError::BrowserLaunch {
                message: e.to_string(),
            })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            pages: Mutex::new(Vec::new()),
            claimed: Mutex::new(Vec::new()),
            next_page: AtomicU64::new(0),
            handle,
        })
    }

    async fn register(&self, page: CdpPage) -> PageId {
        let mut registry = self.pages.lock().await;
        if let Some((id, _)) = registry.iter().find(|(_, p)| p.target_id() == page.target_id()) {
            return *id;
        }
        let id = PageId(self.next_page.fetch_add(1, Ordering::SeqCst));
        registry.push((id, page));
        id
    }

    /// Bring the registry in line with the browser's open tabs.
    ///
    /// Tabs the page opened itself (`target=_blank`, `window.open`) are
    /// registered in the order the browser lists them; closed tabs drop out.
    async fn sync_pages(&self) -> UiResult<Vec<PageId>> {
        let open = self.browser.lock().await.pages().await.map_err(cdp_error)?;
        let mut registry = self.pages.lock().await;
        reconcile(
            &mut registry,
            open,
            |a, b| a.target_id() == b.target_id(),
            || PageId(self.next_page.fetch_add(1, Ordering::SeqCst)),
        );
        Ok(registry.iter().map(|(id, _)| *id).collect())
    }

    async fn page(&self, id: PageId) -> UiResult<CdpPage> {
        self.pages
            .lock()
            .await
            .iter()
            .find(|(pid, _)| *pid == id)
            .map(|(_, page)| page.clone())
            .ok_or_else(|| UiError::driver(format!("{id} is closed")))
    }

    async fn eval<T: DeserializeOwned>(&self, id: PageId, script: String) -> UiResult<T> {
        let page = self.page(id).await?;
        page.evaluate(script)
            .await
            .map_err(cdp_error)?
            .into_value()
            .map_err(cdp_error)
    }

    /// Evaluate `body` against the first match of `locator`
    async fn on_first<T: DeserializeOwned>(&self, id: PageId, locator: &Locator, body: &str) -> UiResult<T> {
        let probe: Probe<T> = self.eval(id, with_first(locator, body)?).await?;
        match probe {
            Probe {
                found: true,
                value: Some(value),
            } => Ok(value),
            _ => Err(UiError::element_not_found(locator.to_string())),
        }
    }

    async fn key(&self, page: &CdpPage, kind: DispatchKeyEventType, key: &str, text: Option<&str>) -> UiResult<()> {
        page.execute(key_event(kind, key, text)?)
            .await
            .map_err(cdp_error)?;
        Ok(())
    }

    async fn press(&self, page: &CdpPage, key: &str) -> UiResult<()> {
        self.key(page, DispatchKeyEventType::KeyDown, key, key_text(key)).await?;
        self.key(page, DispatchKeyEventType::KeyUp, key, None).await
    }

    async fn type_chars(&self, page: &CdpPage, text: &str, delay_ms: u64) -> UiResult<()> {
        for ch in text.chars() {
            let s = ch.to_string();
            self.key(page, DispatchKeyEventType::Char, &s, Some(&s)).await?;
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
        Ok(())
    }

    async fn click_at(&self, page: &CdpPage, point: &ClickPoint, click_count: u32) -> UiResult<()> {
        for kind in [DispatchMouseEventType::MousePressed, DispatchMouseEventType::MouseReleased] {
            let params = DispatchMouseEventParams::builder()
                .r#type(kind)
                .x(point.x)
                .y(point.y)
                .button(MouseButton::Left)
                .click_count(i64::from(click_count))
                .build()
                .map_err(cdp_error)?;
            page.execute(params).await.map_err(cdp_error)?;
        }
        Ok(())
    }

    async fn ready_state_reached(&self, id: PageId, state: LoadState) -> UiResult<bool> {
        let script = match state {
            LoadState::DomContentLoaded => "document.readyState !== 'loading'",
            LoadState::Load | LoadState::NetworkIdle => "document.readyState === 'complete'",
        };
        self.eval(id, script.to_string()).await
    }

    async fn resource_count(&self, id: PageId) -> UiResult<u64> {
        self.eval(id, "performance.getEntriesByType('resource').length".to_string())
            .await
    }

    async fn set_input_files(&self, id: PageId, locator: &Locator, files: &[std::path::PathBuf]) -> UiResult<()> {
        let marker = format!("el.setAttribute('{TARGET_MARKER}', ''); return true;");
        let _: bool = self.on_first(id, locator, &marker).await?;
        let page = self.page(id).await?;
        let element = page
            .find_element(format!("[{TARGET_MARKER}]"))
            .await
            .map_err(cdp_error)?;
        let params = SetFileInputFilesParams::builder()
            .files(files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>())
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(cdp_error)?;
        page.execute(params).await.map_err(cdp_error)?;
        let unmark = format!("el.removeAttribute('{TARGET_MARKER}'); return true;");
        let _: bool = self.on_first(id, locator, &unmark).await?;
        Ok(())
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn pages(&self) -> UiResult<Vec<PageId>> {
        self.sync_pages().await
    }

    async fn new_page(&self) -> UiResult<PageId> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(cdp_error)?;
        let id = self.register(page).await;
        self.claimed.lock().await.push(id);
        Ok(id)
    }

    async fn next_popup(&self, opener: PageId, known: &[PageId]) -> UiResult<PageId> {
        loop {
            let open = self.sync_pages().await?;
            let mut claimed = self.claimed.lock().await;
            if let Some(id) = fresh_popup(&open, opener, known, &claimed) {
                claimed.push(id);
                tracing::debug!(opener = %opener, popup = %id, "popup discovered");
                return Ok(id);
            }
            drop(claimed);
            tokio::time::sleep(Duration::from_millis(CDP_POLL_MS)).await;
        }
    }

    async fn goto(&self, id: PageId, url: &str, wait_until: LoadState, timeout: Duration) -> UiResult<()> {
        let page = self.page(id).await?;
        tokio::time::timeout(timeout, page.goto(url))
            .await
            .map_err(|_| UiError::timeout(timeout.as_millis() as u64, format!("navigation to {url}")))?
            .map_err(|e| UiError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        self.wait_for_load_state(id, wait_until, timeout).await
    }

    async fn reload(&self, id: PageId) -> UiResult<()> {
        self.page(id).await?.reload().await.map_err(cdp_error)?;
        Ok(())
    }

    async fn url(&self, id: PageId) -> UiResult<String> {
        Ok(self
            .page(id)
            .await?
            .url()
            .await
            .map_err(cdp_error)?
            .unwrap_or_default())
    }

    async fn title(&self, id: PageId) -> UiResult<String> {
        Ok(self
            .page(id)
            .await?
            .get_title()
            .await
            .map_err(cdp_error)?
            .unwrap_or_default())
    }

    async fn wait_for_load_state(&self, id: PageId, state: LoadState, timeout: Duration) -> UiResult<()> {
        let start = Instant::now();
        let poll = Duration::from_millis(CDP_POLL_MS);
        while !self.ready_state_reached(id, state).await? {
            if start.elapsed() >= timeout {
                return Err(UiError::timeout(timeout.as_millis() as u64, format!("load state {state}")));
            }
            tokio::time::sleep(poll).await;
        }
        if state != LoadState::NetworkIdle {
            return Ok(());
        }
        let idle = Duration::from_millis(DOM_STABLE_WINDOW_MS);
        let mut seen = self.resource_count(id).await?;
        let mut quiet_since = Instant::now();
        while quiet_since.elapsed() < idle {
            if start.elapsed() >= timeout {
                return Err(UiError::timeout(timeout.as_millis() as u64, "network idle"));
            }
            tokio::time::sleep(poll).await;
            let now = self.resource_count(id).await?;
            if now != seen {
                seen = now;
                quiet_since = Instant::now();
            }
        }
        Ok(())
    }

    async fn body_markup(&self, id: PageId) -> UiResult<String> {
        self.eval(id, "document.body ? document.body.innerHTML : ''".to_string())
            .await
    }

    async fn block_requests(&self, id: PageId, patterns: &[String]) -> UiResult<()> {
        let page = self.page(id).await?;
        page.execute(NetworkEnableParams::default())
            .await
            .map_err(cdp_error)?;
        page.execute(SetBlockedUrLsParams::new(patterns.to_vec()))
            .await
            .map_err(cdp_error)?;
        Ok(())
    }

    async fn wait_for_response(&self, id: PageId, url_fragment: &str, timeout: Duration) -> UiResult<ResponseInfo> {
        let page = self.page(id).await?;
        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(cdp_error)?;
        let found = tokio::time::timeout(timeout, async {
            while let Some(event) = events.next().await {
                if event.response.url.contains(url_fragment) {
                    return Some(ResponseInfo::new(event.response.url.clone(), event.response.status as u16));
                }
            }
            None
        })
        .await
        .map_err(|_| UiError::timeout(timeout.as_millis() as u64, format!("response matching {url_fragment}")))?;
        found.ok_or_else(|| UiError::driver("response stream closed"))
    }

    async fn count(&self, id: PageId, locator: &Locator) -> UiResult<usize> {
        self.eval(id, with_matches(locator, "return els.length;")?).await
    }

    async fn element_paths(&self, id: PageId, locator: &Locator) -> UiResult<Vec<ElementPath>> {
        self.eval(id, with_matches(locator, "return els.map(__pwPath);")?)
            .await
    }

    async fn inner_texts(&self, id: PageId, locator: &Locator) -> UiResult<Vec<String>> {
        self.eval(id, with_matches(locator, "return els.map((el) => el.innerText || '');")?)
            .await
    }

    async fn attribute(&self, id: PageId, locator: &Locator, name: &str) -> UiResult<Option<String>> {
        let name = serde_json::to_string(name)?;
        let body = format!("return el.hasAttribute({name}) ? [el.getAttribute({name})] : [];");
        let value: Vec<String> = self.on_first(id, locator, &body).await?;
        Ok(value.into_iter().next())
    }

    async fn input_value(&self, id: PageId, locator: &Locator) -> UiResult<String> {
        self.on_first(id, locator, "return el.value == null ? '' : String(el.value);")
            .await
    }

    async fn computed_style(&self, id: PageId, locator: &Locator, property: &str) -> UiResult<Option<String>> {
        let property = serde_json::to_string(property)?;
        let body = format!("return getComputedStyle(el).getPropertyValue({property});");
        let value: String = self.on_first(id, locator, &body).await?;
        Ok(Some(value).filter(|v| !v.is_empty()))
    }

    async fn element_state(&self, id: PageId, locator: &Locator, state: ElementState) -> UiResult<bool> {
        let body = match state {
            ElementState::Visible => {
                "const s = getComputedStyle(el); return el.getClientRects().length > 0 && s.visibility !== 'hidden';"
            }
            ElementState::Enabled => "return !el.disabled && !el.hasAttribute('disabled');",
            ElementState::Checked => "return !!el.checked;",
        };
        self.on_first(id, locator, body).await
    }

    async fn perform(&self, id: PageId, locator: &Locator, action: &ElementAction) -> UiResult<()> {
        let page = self.page(id).await?;
        match action {
            ElementAction::Click { force, click_count } => {
                let point: ClickPoint = self
                    .on_first(
                        id,
                        locator,
                        "el.scrollIntoView({ block: 'center' }); const r = el.getBoundingClientRect(); \
                         return { x: r.x + r.width / 2, y: r.y + r.height / 2, disabled: !!el.disabled || el.hasAttribute('disabled') };",
                    )
                    .await?;
                if point.disabled && !force {
                    return Err(UiError::driver(format!("{locator} is disabled")));
                }
                self.click_at(&page, &point, *click_count).await
            }
            ElementAction::Fill(value) => {
                let value = serde_json::to_string(value)?;
                let body = format!(
                    "if (el.disabled) {{ return false; }} el.focus(); el.value = {value}; \
                     el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                     el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true;"
                );
                let filled: bool = self.on_first(id, locator, &body).await?;
                if filled {
                    Ok(())
                } else {
                    Err(UiError::driver(format!("{locator} is disabled")))
                }
            }
            ElementAction::Clear => {
                let _: bool = self
                    .on_first(
                        id,
                        locator,
                        "el.value = ''; el.dispatchEvent(new Event('input', { bubbles: true })); return true;",
                    )
                    .await?;
                Ok(())
            }
            ElementAction::Type { text, delay_ms } => {
                let _: bool = self.on_first(id, locator, "el.focus(); return true;").await?;
                self.type_chars(&page, text, *delay_ms).await
            }
            ElementAction::Press(key) => {
                let _: bool = self.on_first(id, locator, "el.focus(); return true;").await?;
                self.press(&page, key).await
            }
            ElementAction::Check | ElementAction::Uncheck => {
                let wanted = matches!(action, ElementAction::Check);
                let checked = self.element_state(id, locator, ElementState::Checked).await?;
                if checked == wanted {
                    return Ok(());
                }
                self.perform(id, locator, &ElementAction::click(false)).await
            }
            ElementAction::SelectByText(wanted) => {
                let wanted = serde_json::to_string(wanted)?;
                let body = format!(
                    "const o = Array.from(el.options || []).find((o) => o.text.trim() === {wanted} || o.value === {wanted}); \
                     if (!o) {{ return false; }} el.value = o.value; \
                     el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true;"
                );
                let selected: bool = self.on_first(id, locator, &body).await?;
                if selected {
                    Ok(())
                } else {
                    Err(UiError::element_not_found(format!("{locator} >> option={wanted}")))
                }
            }
            ElementAction::SelectByIndex(index) => {
                let body = format!(
                    "const o = (el.options || [])[{index}]; if (!o) {{ return false; }} el.value = o.value; \
                     el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true;"
                );
                let selected: bool = self.on_first(id, locator, &body).await?;
                if selected {
                    Ok(())
                } else {
                    Err(UiError::element_not_found(format!("{locator} >> option[{index}]")))
                }
            }
            ElementAction::SetInputFiles(files) => self.set_input_files(id, locator, files).await,
            ElementAction::Focus => {
                let _: bool = self.on_first(id, locator, "el.focus(); return true;").await?;
                Ok(())
            }
            ElementAction::ScrollIntoView => {
                let _: bool = self
                    .on_first(id, locator, "el.scrollIntoView({ block: 'center' }); return true;")
                    .await?;
                Ok(())
            }
        }
    }

    async fn keyboard(&self, id: PageId, action: &KeyboardAction) -> UiResult<()> {
        let page = self.page(id).await?;
        match action {
            KeyboardAction::Type(text) => self.type_chars(&page, text, 0).await,
            KeyboardAction::InsertText(text) => {
                page.execute(InsertTextParams::new(text.clone()))
                    .await
                    .map_err(cdp_error)?;
                Ok(())
            }
            KeyboardAction::Down(key) => self.key(&page, DispatchKeyEventType::KeyDown, key, key_text(key)).await,
            KeyboardAction::Up(key) => self.key(&page, DispatchKeyEventType::KeyUp, key, None).await,
            KeyboardAction::Press(key) => self.press(&page, key).await,
        }
    }

    async fn mouse_wheel(&self, id: PageId, delta_x: f64, delta_y: f64) -> UiResult<()> {
        let page = self.page(id).await?;
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseWheel)
            .x(0.0)
            .y(0.0)
            .delta_x(delta_x)
            .delta_y(delta_y)
            .build()
            .map_err(cdp_error)?;
        page.execute(params).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn scroll_height(&self, id: PageId) -> UiResult<f64> {
        self.eval(id, "document.body ? document.body.scrollHeight : 0".to_string())
            .await
    }

    async fn close_page(&self, id: PageId) -> UiResult<()> {
        let page = self.page(id).await?;
        self.pages.lock().await.retain(|(pid, _)| *pid != id);
        page.close().await.map_err(cdp_error)
    }

    async fn close(&self) -> UiResult<()> {
        self.pages.lock().await.clear();
        self.claimed.lock().await.clear();
        self.browser
            .lock()
            .await
            .close()
            .await
            .map_err(|e| UiError::BrowserLaunch {
                message: e.to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod page_registry_tests {
        use super::*;

        fn counter(start: u64) -> impl FnMut() -> PageId {
            let mut next = start;
            move || {
                let id = PageId(next);
                next += 1;
                id
            }
        }

        #[test]
        fn test_reconcile_registers_tabs_opened_by_page() {
            let mut registry = vec![(PageId(0), "main")];
            reconcile(&mut registry, vec!["main", "blank", "window"], |a, b| a == b, counter(1));
            assert_eq!(
                registry,
                vec![(PageId(0), "main"), (PageId(1), "blank"), (PageId(2), "window")]
            );

            // Closed tabs drop out; known ones keep their ids
            reconcile(&mut registry, vec!["main", "window"], |a, b| a == b, counter(3));
            assert_eq!(registry, vec![(PageId(0), "main"), (PageId(2), "window")]);
        }

        #[test]
        fn test_fresh_popup_skips_snapshot_and_claimed() {
            let open = [PageId(0), PageId(1), PageId(2), PageId(3)];
            let known = [PageId(0), PageId(1)];
            assert_eq!(fresh_popup(&open, PageId(0), &known, &[]), Some(PageId(2)));
            assert_eq!(fresh_popup(&open, PageId(0), &known, &[PageId(2)]), Some(PageId(3)));
            assert_eq!(fresh_popup(&open[..2], PageId(0), &known, &[]), None);
            assert_eq!(fresh_popup(&open, PageId(0), &[], &[PageId(1)]), Some(PageId(2)));
        }
    }

    mod script_tests {
        use super::*;

        #[test]
        fn test_chain_is_embedded_as_json() {
            let locator = Locator::new("table#orders").locate("tr").nth(2);
            let script = with_matches(&locator, "return els.length;").unwrap();
            assert!(script.contains(r#""kind":"css","value":"table#orders""#));
            assert!(script.contains(r#"{"op":"nth","index":2}"#));
            assert!(script.ends_with("})()"));
        }

        #[test]
        fn test_first_match_probe_shape() {
            let script = with_first(&Locator::new("input"), "return el.value;").unwrap();
            assert!(script.contains("return { found: false };"));
            let probe: Probe<String> = serde_json::from_str(r#"{"found":false}"#).unwrap();
            assert!(!probe.found);
            assert!(probe.value.is_none());
        }

        #[test]
        fn test_key_text() {
            assert_eq!(key_text("Enter"), Some("\r"));
            assert_eq!(key_text("a"), Some("a"));
            assert_eq!(key_text("End"), None);
        }
    }
}
