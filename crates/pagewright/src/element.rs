//! Element binding: refinements and terminal actions on page elements.
//!
//! ## Example
//!
//! ```no_run
//! use pagewright::prelude::*;
//!
//! # async fn run(session: std::sync::Arc<Session>) -> UiResult<()> {
//! let search = UiElement::new(session, "[name=\"q\"]", BindOptions::new().with_description("Search Box"));
//! search.set_value("rust locators", Some("Enter")).await?;
//! let first_hit = search.reset().find("xpath=//h3", FindOptions::new()).await?;
//! let _title = first_hit.get_text(None).await?;
//! # Ok(())
//! # }
//! ```

use crate::binding::{BindOptions, Binding};
use crate::driver::{BrowserDriver, PageId};
use crate::locator::{ElementAction, ElementState, KeyboardAction, Locator};
use crate::logging::mask_value;
use crate::result::{UiError, UiResult};
use crate::session::{PageScope, Session};
use crate::wait::{wait_for_selector, SelectorState, WaitOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Selector for anything a user would call a link
pub(crate) const LINK_SELECTOR: &str = "a, [role=\"link\"]";

/// Key pressed by `scroll_into_view` when none is given
pub const DEFAULT_SCROLL_KEY: &str = "End";

/// Wheel scrolls performed by `scroll_to_bottom_of_page` when none is given
pub const DEFAULT_SCROLL_COUNT: usize = 4;

/// Pause after each wheel scroll
const SCROLL_PAUSE_MS: u64 = 1000;

/// Pause after a text-filtered click
const CONTAINS_CLICK_PAUSE_MS: u64 = 100;

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for [`UiElement::find`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Which descendant match to bind (default first)
    pub index: Option<usize>,
    /// Keep only descendants containing this text
    pub has_text: Option<String>,
    /// Narrow the result once more to this match
    pub nth_obj: Option<usize>,
}

impl FindOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the match at `index`
    #[must_use]
    pub const fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Filter by contained text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }

    /// Narrow the result again
    #[must_use]
    pub const fn with_nth_obj(mut self, nth: usize) -> Self {
        self.nth_obj = Some(nth);
        self
    }
}

/// Options for [`UiElement::contains`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainsOptions {
    /// Which match to bind (default first)
    pub index: Option<usize>,
    /// Filter these descendants instead of the target itself
    pub locator: Option<String>,
}

impl ContainsOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the match at `index`
    #[must_use]
    pub const fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Filter descendants matching `selector`
    #[must_use]
    pub fn within(mut self, selector: impl Into<String>) -> Self {
        self.locator = Some(selector.into());
        self
    }
}

/// Options for clicks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOptions {
    /// Which match to click (default first)
    pub index: Option<usize>,
    /// Skip actionability checks
    pub force: bool,
}

impl ClickOptions {
    /// Default options
    #[must_use]
    pub const fn new() -> Self {
        Self {
            index: None,
            force: false,
        }
    }

    /// Click the match at `index`
    #[must_use]
    pub const fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Force the click
    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Options for key-by-key typing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeOptions {
    /// Delay between keys in milliseconds
    pub delay_ms: u64,
    /// Key pressed after typing, e.g. "Enter"
    pub key_press: Option<String>,
    /// Clear the field first
    pub clear_first: bool,
}

impl TypeOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key delay
    #[must_use]
    pub const fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Press `key` after typing
    #[must_use]
    pub fn then_press(mut self, key: impl Into<String>) -> Self {
        self.key_press = Some(key.into());
        self
    }

    /// Clear the field before typing
    #[must_use]
    pub const fn clearing(mut self) -> Self {
        self.clear_first = true;
        self
    }
}

// =============================================================================
// UI ELEMENT
// =============================================================================

/// A page element bound to a session
#[derive(Debug, Clone)]
pub struct UiElement {
    binding: Binding,
}

impl UiElement {
    /// Bind `selector` (CSS, or XPath with an `xpath=` prefix)
    #[must_use]
    pub fn new(session: Arc<Session>, selector: &str, options: BindOptions) -> Self {
        Self {
            binding: Binding::new(session, selector, options),
        }
    }

    pub(crate) const fn from_binding(binding: Binding) -> Self {
        Self { binding }
    }

    /// The underlying binding
    #[must_use]
    pub const fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Description used in log lines
    #[must_use]
    pub fn description(&self) -> &str {
        self.binding.description()
    }

    /// Locator actions resolve against
    #[must_use]
    pub const fn target(&self) -> &Locator {
        self.binding.target()
    }

    /// Current target as a selector string
    #[must_use]
    pub fn full_css(&self) -> String {
        self.binding.full_css()
    }

    /// Absolute XPath of the node a refinement resolved to
    #[must_use]
    pub fn full_xpath(&self) -> Option<&str> {
        self.binding.full_xpath()
    }

    /// Wait for the page to load and settle; returns the page acted on
    pub async fn wait_till_element_to_be_ready(&self) -> UiResult<PageId> {
        self.binding.ready().await
    }

    fn driver(&self) -> &dyn BrowserDriver {
        self.binding.session().driver()
    }

    fn session(&self) -> &Session {
        self.binding.session()
    }

    async fn refined(&self, chain: Locator) -> UiResult<Self> {
        Ok(Self::from_binding(self.binding.refine(chain).await?))
    }

    // =========================================================================
    // REFINEMENTS
    // =========================================================================

    /// Descendant `selector` of the current target
    pub async fn find(&self, selector: &str, options: FindOptions) -> UiResult<Self> {
        let mut chain = self.target().locate(selector);
        if let Some(text) = options.has_text {
            chain = chain.filter_text(text);
        }
        let found = self.refined(chain.pick(options.index)).await?;
        match options.nth_obj {
            Some(nth) => found.get_nth(nth).await,
            None => Ok(found),
        }
    }

    /// Current target (or its `locator` descendants) containing `text`
    pub async fn contains(&self, text: &str, options: ContainsOptions) -> UiResult<Self> {
        let scope = match options.locator.as_deref() {
            Some(selector) => self.target().locate(selector),
            None => self.target().clone(),
        };
        self.refined(scope.filter_text(text).pick(options.index)).await
    }

    /// Descendant whose own text equals (`exact`) or contains `text`
    pub async fn has_text(&self, text: &str, exact: bool, index: Option<usize>) -> UiResult<Self> {
        self.refined(self.target().get_by_text(text, exact).pick(index))
            .await
    }

    /// The i-th match of the current target
    pub async fn get_nth(&self, index: usize) -> UiResult<Self> {
        self.refined(self.target().nth(index)).await
    }

    /// Parent of the current target
    pub async fn get_parent(&self) -> UiResult<Self> {
        self.refined(self.target().first().parent()).await
    }

    /// The n-th match of `selector` under the parent of the current target
    pub async fn get_sibling(&self, selector: &str, nth: usize) -> UiResult<Self> {
        self.refined(self.target().first().parent().locate(selector).nth(nth))
            .await
    }

    /// Adjacent following sibling with `tag`
    pub async fn get_next_sibling(&self, tag: &str) -> UiResult<Self> {
        self.get_next_nth_sibling(tag, 0).await
    }

    /// Follow the adjacent `tag` sibling `next + 1` times
    pub async fn get_next_nth_sibling(&self, tag: &str, next: usize) -> UiResult<Self> {
        let mut current = self.refined(self.target().first()).await?;
        for _ in 0..=next {
            current = current.refined(current.target().next_sibling(tag)).await?;
        }
        Ok(current)
    }

    /// First match having a descendant with `text`
    pub async fn child_has_text(&self, text: &str, exact: bool) -> UiResult<Self> {
        self.refined(self.target().has_child_text(text, exact).first())
            .await
    }

    /// Focus the i-th match and bind to it
    pub async fn get_object(&self, index: usize) -> UiResult<Self> {
        let page = self.binding.ready().await?;
        let chain = self.target().nth(index);
        self.driver().perform(page, &chain, &ElementAction::Focus).await?;
        self.refined(chain).await
    }

    /// Value addressing the base locator again
    #[must_use]
    pub fn reset(&self) -> Self {
        Self::from_binding(self.binding.reset())
    }

    /// Same target on the page at `index`
    #[must_use]
    pub fn switch_page(&self, index: usize) -> Self {
        Self::from_binding(self.binding.with_scope(PageScope::Page(index)))
    }

    /// Same target on the popup
    #[must_use]
    pub fn on_popup(&self) -> Self {
        Self::from_binding(self.binding.with_scope(PageScope::Popup))
    }

    /// Same target under another description
    #[must_use]
    pub fn set_description(&self, description: impl Into<String>) -> Self {
        Self::from_binding(self.binding.with_description(description))
    }

    /// Rebind to a new base selector
    #[must_use]
    pub fn set_locator(&self, selector: &str, description: Option<String>) -> Self {
        Self::from_binding(self.binding.with_locator(selector, description))
    }

    // =========================================================================
    // CLICKS
    // =========================================================================

    async fn click_with(&self, chain: Locator, action: ElementAction) -> UiResult<PageId> {
        let page = self.binding.ready().await?;
        self.driver().perform(page, &chain, &action).await?;
        Ok(page)
    }

    /// Click the selected match
    pub async fn click(&self, options: ClickOptions) -> UiResult<()> {
        let index = options.index.unwrap_or(0);
        self.click_with(self.target().nth(index), ElementAction::click(options.force))
            .await?;
        tracing::info!(session = %self.session().id(), "clicked on the {} of [{index}]", self.description());
        Ok(())
    }

    /// Double-click the selected match
    pub async fn dbl_click(&self, options: ClickOptions) -> UiResult<()> {
        let index = options.index.unwrap_or(0);
        self.click_with(self.target().nth(index), ElementAction::dbl_click(options.force))
            .await?;
        tracing::info!(session = %self.session().id(), "dbl clicked on the {} of [{index}]", self.description());
        Ok(())
    }

    /// Click the first match
    pub async fn click_first_link(&self, force: bool) -> UiResult<()> {
        self.click_with(self.target().first(), ElementAction::click(force))
            .await?;
        tracing::info!("clicked the first link of {}", self.description());
        Ok(())
    }

    /// Click the last match
    pub async fn click_last_link(&self, force: bool) -> UiResult<()> {
        self.click_with(self.target().last(), ElementAction::click(force))
            .await?;
        tracing::info!("clicked the last link of {}", self.description());
        Ok(())
    }

    /// Click the page link named `name`.
    ///
    /// `exact` compares the trimmed link text case-sensitively; otherwise the
    /// text only has to contain `name`, ignoring case.
    pub async fn click_link(&self, name: &str, exact: bool, force: bool) -> UiResult<()> {
        let page = self.binding.ready().await?;
        let links = Locator::new(LINK_SELECTOR);
        let link = if exact {
            links.filter_text_exact(name)
        } else {
            links.filter_text(name)
        }
        .first();
        let options = WaitOptions::new().with_timeout(self.session().config().default_timeout_ms);
        wait_for_selector(self.driver(), page, &link, SelectorState::Visible, options).await?;
        self.driver()
            .perform(page, &link, &ElementAction::click(force))
            .await?;
        tracing::info!("clicked on the link [{name}]");
        Ok(())
    }

    /// Click the selected match containing `text`
    pub async fn contains_click(&self, text: &str, options: ClickOptions) -> UiResult<()> {
        let chain = self.target().filter_text(text).pick(options.index);
        self.click_with(chain, ElementAction::click(options.force))
            .await?;
        tokio::time::sleep(Duration::from_millis(CONTAINS_CLICK_PAUSE_MS)).await;
        tracing::info!("clicked on the {} contains the text : [{text}]", self.description());
        Ok(())
    }

    /// Click the first match and adopt the popup it opens.
    ///
    /// Only a tab that appears after the click counts; tabs already open
    /// are ignored. Fails with [`UiError::PopupNotOpened`] when no popup
    /// appears within the configured window.
    pub async fn click_to_open_popup(&self, force: bool) -> UiResult<PageId> {
        let page = self.binding.ready().await?;
        let session = self.session();
        let known = self.driver().pages().await?;
        let first = self.target().first();
        let click = ElementAction::click(force);
        let (clicked, opened) = tokio::join!(
            self.driver().perform(page, &first, &click),
            tokio::time::timeout(
                session.config().wait.popup_timeout(),
                self.driver().next_popup(page, &known),
            ),
        );
        clicked?;
        let popup = opened.map_err(|_| UiError::PopupNotOpened {
            ms: session.config().wait.popup_timeout_ms,
        })??;
        session.set_popup(popup).await;
        tracing::info!("{} - opened popup {popup}", self.description());
        Ok(popup)
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Clear the field, fill `value`, then press `key_press` if given
    pub async fn set_value(&self, value: &str, key_press: Option<&str>) -> UiResult<()> {
        let page = self.binding.ready().await?;
        let field = self.target().first();
        self.driver().perform(page, &field, &ElementAction::Clear).await?;
        self.driver()
            .perform(page, &field, &ElementAction::Fill(value.to_string()))
            .await?;
        if let Some(key) = key_press {
            self.driver()
                .perform(page, &field, &ElementAction::Press(key.to_string()))
                .await?;
        }
        let desc = self.description();
        tracing::info!(session = %self.session().id(), "{desc} - Set the value -  {}", mask_value(desc, value));
        Ok(())
    }

    async fn send_keys(&self, text: &str, options: &TypeOptions, verb: &str) -> UiResult<()> {
        let page = self.binding.ready().await?;
        let field = self.target().first();
        if options.clear_first {
            self.driver().perform(page, &field, &ElementAction::Clear).await?;
        }
        let typed = ElementAction::Type {
            text: text.to_string(),
            delay_ms: options.delay_ms,
        };
        self.driver().perform(page, &field, &typed).await?;
        if let Some(key) = &options.key_press {
            self.driver()
                .perform(page, &field, &ElementAction::Press(key.clone()))
                .await?;
        }
        let desc = self.description();
        tracing::info!("{desc} - {verb} the value -  {}", mask_value(desc, text));
        Ok(())
    }

    /// Type `text` key by key
    pub async fn type_text(&self, text: &str, options: TypeOptions) -> UiResult<()> {
        self.send_keys(text, &options, "Type").await
    }

    /// Press the keys of `text` one after another
    pub async fn press_sequentially(&self, text: &str, options: TypeOptions) -> UiResult<()> {
        let options = TypeOptions {
            clear_first: false,
            ..options
        };
        self.send_keys(text, &options, "pressSequentially").await
    }

    /// Empty the field
    pub async fn clear(&self) -> UiResult<()> {
        let page = self.binding.ready().await?;
        self.driver()
            .perform(page, &self.target().first(), &ElementAction::Clear)
            .await?;
        tracing::info!("{} - cleared", self.description());
        Ok(())
    }

    /// Set the files of a file input
    pub async fn choose_files(&self, files: &[PathBuf]) -> UiResult<()> {
        let page = self.binding.ready().await?;
        self.driver()
            .perform(page, &self.target().first(), &ElementAction::SetInputFiles(files.to_vec()))
            .await?;
        self.binding.ready().await?;
        tracing::info!("{} - chose {} file(s)", self.description(), files.len());
        Ok(())
    }

    /// Select the `<select>` option whose text or value is `option`
    pub async fn select_list_option_by_text(&self, option: &str) -> UiResult<()> {
        let page = self.binding.ready().await?;
        self.driver()
            .perform(page, &self.target().first(), &ElementAction::SelectByText(option.to_string()))
            .await?;
        tracing::info!("{} - Selecting the option : {option}", self.description());
        Ok(())
    }

    /// Select the `<select>` option at `index`
    pub async fn select_list_option_by_index(&self, index: usize) -> UiResult<()> {
        let page = self.binding.ready().await?;
        self.driver()
            .perform(page, &self.target().first(), &ElementAction::SelectByIndex(index))
            .await?;
        tracing::info!("{} - Selecting the option index : {index}", self.description());
        Ok(())
    }

    /// Text of every `<option>` under the target
    pub async fn get_list_options(&self) -> UiResult<Vec<String>> {
        let page = self.binding.ready().await?;
        self.driver()
            .inner_texts(page, &self.target().locate("option"))
            .await
    }

    /// Text of the `aria-selected` option, else the control's value
    pub async fn get_selected_list_value(&self) -> UiResult<String> {
        let page = self.binding.ready().await?;
        let selected = self.target().locate("[aria-selected=\"true\"]");
        if let Some(text) = self.driver().inner_texts(page, &selected).await?.into_iter().next() {
            return Ok(text);
        }
        let value = self
            .driver()
            .input_value(page, &self.target().first())
            .await;
        self.binding.or_missing(value)
    }

    async fn toggle(&self, index: Option<usize>, action: ElementAction, verb: &str) -> UiResult<()> {
        let page = self.binding.ready().await?;
        let target = self.target().pick(index);
        let desc = self.description();
        if self.driver().attribute(page, &target, "disabled").await?.is_some() {
            tracing::warn!("{desc} - unable to {verb} the checkbox, its disabled");
            return Ok(());
        }
        self.driver().perform(page, &target, &action).await?;
        tracing::info!("{desc} - {verb}ed the checkbox");
        Ok(())
    }

    /// Check the selected match unless it is disabled
    pub async fn check(&self, index: Option<usize>) -> UiResult<()> {
        self.toggle(index, ElementAction::Check, "check").await
    }

    /// Uncheck the selected match unless it is disabled
    pub async fn uncheck(&self, index: Option<usize>) -> UiResult<()> {
        self.toggle(index, ElementAction::Uncheck, "uncheck").await
    }

    /// Move focus to the selected match
    pub async fn focus(&self, index: Option<usize>) -> UiResult<()> {
        let page = self.binding.ready().await?;
        self.driver()
            .perform(page, &self.target().pick(index), &ElementAction::Focus)
            .await
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Inner text of the selected match; empty when missing
    pub async fn get_text(&self, index: Option<usize>) -> UiResult<String> {
        let page = self.binding.ready().await?;
        let texts = self
            .driver()
            .inner_texts(page, &self.target().pick(index))
            .await?;
        tracing::info!("getting text from the locator : \"{}\"", self.description());
        let missing = Err(UiError::element_not_found(self.target().to_string()));
        self.binding
            .or_missing(texts.into_iter().next().map_or(missing, Ok))
    }

    /// Input value of the selected match; empty when missing
    pub async fn get_value(&self, index: Option<usize>) -> UiResult<String> {
        let page = self.binding.ready().await?;
        let value = self
            .driver()
            .input_value(page, &self.target().pick(index))
            .await;
        self.binding.or_missing(value)
    }

    /// Attribute `name` of the selected match; empty when absent
    pub async fn get_property_value(&self, name: &str, index: Option<usize>) -> UiResult<String> {
        let page = self.binding.ready().await?;
        let value = self
            .driver()
            .attribute(page, &self.target().pick(index), name)
            .await;
        Ok(self.binding.or_missing(value)?.unwrap_or_default())
    }

    /// Computed style `property` of the first match; `None` when unset
    pub async fn get_css(&self, property: &str) -> UiResult<Option<String>> {
        let page = self.binding.page().await?;
        let value = self
            .driver()
            .computed_style(page, &self.target().first(), property)
            .await;
        Ok(self
            .binding
            .or_missing(value)?
            .filter(|v| !v.is_empty()))
    }

    /// Number of matches
    pub async fn get_count(&self) -> UiResult<usize> {
        let page = self.binding.ready().await?;
        self.driver().count(page, self.target()).await
    }

    /// Whether anything matches
    pub async fn is_exist(&self) -> UiResult<bool> {
        Ok(self.get_count().await? > 0)
    }

    async fn state(&self, state: ElementState) -> UiResult<bool> {
        let page = self.binding.ready().await?;
        let value = self
            .driver()
            .element_state(page, &self.target().first(), state)
            .await;
        self.binding.or_missing(value)
    }

    /// Whether the first match is visible
    pub async fn is_visible(&self) -> UiResult<bool> {
        self.state(ElementState::Visible).await
    }

    /// Whether the first match is enabled
    pub async fn is_enabled(&self) -> UiResult<bool> {
        self.state(ElementState::Enabled).await
    }

    /// Whether the first match exists and is disabled
    pub async fn is_disabled(&self) -> UiResult<bool> {
        if !self.is_exist().await? {
            return Ok(false);
        }
        Ok(!self.state(ElementState::Enabled).await?)
    }

    /// Whether the first match is checked
    pub async fn is_checked(&self) -> UiResult<bool> {
        self.state(ElementState::Checked).await
    }

    /// Trimmed inner text of every match
    pub async fn get_text_all_matching_objects(&self) -> UiResult<Vec<String>> {
        let page = self.binding.ready().await?;
        let texts = self.driver().inner_texts(page, self.target()).await?;
        Ok(texts.into_iter().map(|t| t.trim().to_string()).collect())
    }

    /// One element per match, each bound to its absolute path
    pub async fn get_all_objects(&self, has_text: Option<&str>) -> UiResult<Vec<Self>> {
        let page = self.binding.ready().await?;
        let chain = match has_text {
            Some(text) => self.target().filter_text(text),
            None => self.target().clone(),
        };
        let paths = self.driver().element_paths(page, &chain).await?;
        Ok(paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| {
                let description = format!("{} [{i}]", self.description());
                Self::from_binding(self.binding.with_locator(&path.css, Some(description)))
            })
            .collect())
    }

    /// Title of the page the element lives on
    pub async fn get_page_title(&self) -> UiResult<String> {
        let page = self.binding.ready().await?;
        self.driver().title(page).await
    }

    // =========================================================================
    // SCROLLING
    // =========================================================================

    /// Press `key` (default "End") and bring the first match into view
    pub async fn scroll_into_view(&self, key: Option<&str>) -> UiResult<()> {
        let page = self.binding.ready().await?;
        let key = key.unwrap_or(DEFAULT_SCROLL_KEY).to_string();
        self.driver()
            .keyboard(page, &KeyboardAction::Down(key))
            .await?;
        if self.driver().count(page, self.target()).await? > 0 {
            self.driver()
                .perform(page, &self.target().first(), &ElementAction::ScrollIntoView)
                .await?;
        }
        self.binding.ready().await?;
        Ok(())
    }

    /// Wheel-scroll one page height `count` times (default 4), pausing 1s each
    pub async fn scroll_to_bottom_of_page(&self, count: Option<usize>) -> UiResult<()> {
        let page = self.binding.page().await?;
        let height = self.driver().scroll_height(page).await?;
        for _ in 0..count.unwrap_or(DEFAULT_SCROLL_COUNT) {
            self.driver().mouse_wheel(page, 0.0, height).await?;
            tokio::time::sleep(Duration::from_millis(SCROLL_PAUSE_MS)).await;
        }
        Ok(())
    }
}
