//! Table binding: row and column addressing, extraction and row search.
//!
//! Rows are located with `tr` unless [`TableOptions::rows`] says otherwise.
//! All row and column indices are 0-based and count every located row,
//! header rows included.

pub mod matching;

use crate::binding::{BindOptions, Binding};
use crate::driver::{BrowserDriver, PageId};
use crate::element::{UiElement, LINK_SELECTOR};
use crate::locator::{ElementAction, ElementState, Locator};
use crate::result::UiResult;
use crate::session::{PageScope, Session};
use crate::wait::{wait_for_selector, SelectorState, WaitOptions, TABLE_WAIT_TIMEOUT_MS};
use matching::{DEFAULT_MIN_COLUMN_SIZE, MIN_TEXT_TOKENS};
use std::sync::Arc;

/// Default row selector
pub const DEFAULT_ROW_SELECTOR: &str = "tr";

/// Per-call table options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    /// Selector locating rows inside the table
    pub rows: String,
    /// Meta-table rows need more than this many cells to be searched
    pub min_column_size: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROW_SELECTOR.to_string(),
            min_column_size: DEFAULT_MIN_COLUMN_SIZE,
        }
    }
}

impl TableOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate rows with `selector`
    #[must_use]
    pub fn with_rows(mut self, selector: impl Into<String>) -> Self {
        self.rows = selector.into();
        self
    }

    /// Set the meta-table cell threshold
    #[must_use]
    pub const fn with_min_column_size(mut self, size: usize) -> Self {
        self.min_column_size = size;
        self
    }
}

/// Which link of a row to click
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RowLink {
    /// The first link
    #[default]
    First,
    /// The link at this 0-based position
    Nth(usize),
    /// The first link whose text contains this name
    Named(String),
}

impl RowLink {
    fn within(&self, row: &Locator) -> Locator {
        match self {
            Self::First => row.locate(LINK_SELECTOR).first(),
            Self::Nth(index) => row.locate(LINK_SELECTOR).nth(*index),
            Self::Named(name) => row.locate(LINK_SELECTOR).filter_text(name.clone()).first(),
        }
    }
}

/// A table bound to a session
#[derive(Debug, Clone)]
pub struct UiTable {
    binding: Binding,
}

impl UiTable {
    /// Bind `selector` (CSS, or XPath with an `xpath=` prefix)
    #[must_use]
    pub fn new(session: Arc<Session>, selector: &str, options: BindOptions) -> Self {
        Self {
            binding: Binding::new(session, selector, options),
        }
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

    /// Value addressing the base locator again
    #[must_use]
    pub fn reset(&self) -> Self {
        Self {
            binding: self.binding.reset(),
        }
    }

    /// Same table on the page at `index`
    #[must_use]
    pub fn switch_page(&self, index: usize) -> Self {
        Self {
            binding: self.binding.with_scope(PageScope::Page(index)),
        }
    }

    /// Same table on the popup
    #[must_use]
    pub fn on_popup(&self) -> Self {
        Self {
            binding: self.binding.with_scope(PageScope::Popup),
        }
    }

    /// Same table under another description
    #[must_use]
    pub fn set_description(&self, description: impl Into<String>) -> Self {
        Self {
            binding: self.binding.with_description(description),
        }
    }

    /// Rebind to another table selector
    #[must_use]
    pub fn set_locator(&self, selector: &str, description: Option<String>) -> Self {
        Self {
            binding: self.binding.with_locator(selector, description),
        }
    }

    /// The current target as an element
    #[must_use]
    pub fn as_element(&self) -> UiElement {
        UiElement::from_binding(self.binding.clone())
    }

    /// Wait for the page to load and settle; returns the page acted on
    pub async fn wait_till_element_to_be_ready(&self) -> UiResult<PageId> {
        self.binding.ready().await
    }

    fn target(&self) -> &Locator {
        self.binding.target()
    }

    fn driver(&self) -> &dyn BrowserDriver {
        self.binding.session().driver()
    }

    fn rows(&self, options: &TableOptions) -> Locator {
        self.target().locate(&options.rows)
    }

    async fn refined(&self, chain: Locator) -> UiResult<Self> {
        Ok(Self {
            binding: self.binding.refine(chain).await?,
        })
    }

    // =========================================================================
    // ADDRESSING
    // =========================================================================

    /// The row at `index`
    pub async fn get_row(&self, index: usize, options: &TableOptions) -> UiResult<Self> {
        self.refined(self.rows(options).nth(index)).await
    }

    /// The table at `index` among the matches
    pub async fn get_table(&self, index: usize) -> UiResult<Self> {
        self.refined(self.target().nth(index)).await
    }

    /// The `<tbody>`
    pub async fn tbody(&self) -> UiResult<Self> {
        self.refined(self.target().locate("tbody").first()).await
    }

    /// The `<thead>`
    pub async fn thead(&self) -> UiResult<Self> {
        self.refined(self.target().locate("thead").first()).await
    }

    /// The cell at `row`, `column`
    pub async fn get_row_column(&self, row: usize, column: usize, options: &TableOptions) -> UiResult<Self> {
        self.refined(self.rows(options).nth(row).locate("td").nth(column))
            .await
    }

    /// The first cell containing `text`
    pub async fn get_column_has_text(&self, text: &str) -> UiResult<Self> {
        self.refined(self.target().locate("td").filter_text(text).first())
            .await
    }

    // =========================================================================
    // EXTRACTION
    // =========================================================================

    async fn first_text(&self, page: PageId, chain: &Locator) -> UiResult<String> {
        Ok(self
            .driver()
            .inner_texts(page, chain)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    /// Text of the cell at `row`, `column`; empty when missing
    pub async fn get_cell_data(&self, row: usize, column: usize, options: &TableOptions) -> UiResult<String> {
        let page = self.binding.ready().await?;
        tracing::info!("getting cell data from {} - Row,Column [{row},{column}]", self.description());
        let cell = self.rows(options).nth(row).locate("td").nth(column);
        let value = self.first_text(page, &cell).await?;
        tracing::info!("Row,Column [{row},{column}] = {value}");
        Ok(value)
    }

    /// Texts of the cells (`td` and `th`) of the row at `row`
    pub async fn get_row_data(&self, row: usize, options: &TableOptions) -> UiResult<Vec<String>> {
        let page = self.binding.ready().await?;
        self.driver()
            .inner_texts(page, &self.rows(options).nth(row).locate("td, th"))
            .await
    }

    /// Text of `column` in every row; rows without that cell give ""
    pub async fn get_all_rows_column_data(&self, column: usize, options: &TableOptions) -> UiResult<Vec<String>> {
        let page = self.binding.ready().await?;
        let rows = self.rows(options);
        let count = self.driver().count(page, &rows).await?;
        let mut values = Vec::with_capacity(count);
        for index in 0..count {
            let cell = rows.nth(index).locate("td").nth(column);
            values.push(self.first_text(page, &cell).await?);
        }
        Ok(values)
    }

    /// Text of every `<th>`
    pub async fn get_header_names(&self) -> UiResult<Vec<String>> {
        let page = self.binding.ready().await?;
        self.driver()
            .inner_texts(page, &self.target().locate("th"))
            .await
    }

    /// Text of the `<th>` at `index`; empty when missing
    pub async fn get_header_name(&self, index: usize) -> UiResult<String> {
        let page = self.binding.ready().await?;
        self.first_text(page, &self.target().locate("th").nth(index))
            .await
    }

    /// Number of `<th>` cells
    pub async fn get_header_column_length(&self) -> UiResult<usize> {
        let page = self.binding.ready().await?;
        self.driver()
            .count(page, &self.target().locate("th"))
            .await
    }

    /// Position of the header named `name`.
    ///
    /// `exact` compares trimmed text case-sensitively, otherwise ignoring case.
    pub async fn get_header_column_number(&self, name: &str, exact: bool) -> UiResult<Option<usize>> {
        let headers = self.get_header_names().await?;
        Ok(matching::header_index(&headers, name, exact))
    }

    /// Number of rows
    pub async fn get_rows_length(&self, options: &TableOptions) -> UiResult<usize> {
        let page = self.binding.ready().await?;
        let count = self.driver().count(page, &self.rows(options)).await?;
        tracing::info!("Number of rows in the table = {count}");
        Ok(count)
    }

    /// Number of rows nested inside the table's rows
    pub async fn get_meta_table_rows_length(&self, options: &TableOptions) -> UiResult<usize> {
        let page = self.binding.ready().await?;
        let nested = self.target().locate(DEFAULT_ROW_SELECTOR).locate(&options.rows);
        self.driver().count(page, &nested).await
    }

    /// Number of `<td>` cells in `row` (default the first)
    pub async fn get_column_length(&self, row: Option<usize>, options: &TableOptions) -> UiResult<usize> {
        let page = self.binding.ready().await?;
        let cells = self.rows(options).pick(row).locate("td");
        self.driver().count(page, &cells).await
    }

    /// Whether some cell contains `value`
    pub async fn is_column_value_exist(&self, value: &str) -> UiResult<bool> {
        let page = self.binding.ready().await?;
        let cells = self.target().locate("td").filter_text(value);
        Ok(self.driver().count(page, &cells).await? > 0)
    }

    // =========================================================================
    // WAITS
    // =========================================================================

    /// Wait up to 60s for the first row to be attached
    pub async fn wait_for_rows_to_load(&self, options: &TableOptions) -> UiResult<()> {
        let page = self.binding.ready().await?;
        let first = self.rows(options).first();
        let wait = WaitOptions::new().with_timeout(TABLE_WAIT_TIMEOUT_MS);
        wait_for_selector(self.driver(), page, &first, SelectorState::Attached, wait).await
    }

    /// Wait up to 60s for the first `loader` inside the table to be hidden
    pub async fn wait_for_hidden(&self, loader: &str) -> UiResult<()> {
        let page = self.binding.ready().await?;
        let first = self.target().locate(loader).first();
        let wait = WaitOptions::new().with_timeout(TABLE_WAIT_TIMEOUT_MS);
        wait_for_selector(self.driver(), page, &first, SelectorState::Hidden, wait).await
    }

    // =========================================================================
    // SEARCH
    // =========================================================================

    async fn text_rows(&self, options: &TableOptions) -> UiResult<Vec<Vec<String>>> {
        let page = self.binding.ready().await?;
        let rows = self.rows(options);
        let wait = WaitOptions::new().with_timeout(self.binding.session().config().default_timeout_ms);
        wait_for_selector(self.driver(), page, &rows.first(), SelectorState::Attached, wait).await?;
        let texts = self.driver().inner_texts(page, &rows).await?;
        Ok(texts.iter().map(|t| matching::row_tokens(t)).collect())
    }

    async fn cell_rows(&self, options: &TableOptions) -> UiResult<Vec<Vec<String>>> {
        let page = self.binding.ready().await?;
        let rows = self.rows(options);
        let count = self.driver().count(page, &rows).await?;
        let mut cells = Vec::with_capacity(count);
        for index in 0..count {
            let texts = self
                .driver()
                .inner_texts(page, &rows.nth(index).locate("td"))
                .await?;
            cells.push(texts.into_iter().map(|t| t.trim().to_string()).collect());
        }
        Ok(cells)
    }

    /// First row whose cells match every value.
    ///
    /// By default a cell matches when it contains the value, ignoring case;
    /// `exact` requires case-insensitive equality.
    pub async fn get_matched_row_index<S: AsRef<str>>(
        &self,
        values: &[S],
        exact: bool,
        options: &TableOptions,
    ) -> UiResult<Option<usize>> {
        let candidates = matching::normalize_candidates(values);
        let rows = self.text_rows(options).await?;
        let found = matching::first_matching_row(&rows, &candidates, exact, MIN_TEXT_TOKENS);
        tracing::info!("{} - matched row index for {candidates:?} = {found:?}", self.description());
        Ok(found)
    }

    /// Every row whose cells match every value
    pub async fn get_matched_row_indices<S: AsRef<str>>(
        &self,
        values: &[S],
        exact: bool,
        options: &TableOptions,
    ) -> UiResult<Vec<usize>> {
        let candidates = matching::normalize_candidates(values);
        let rows = self.text_rows(options).await?;
        Ok(matching::matching_rows(&rows, &candidates, exact, MIN_TEXT_TOKENS))
    }

    /// Meta-table search over `td` cells; first matching row
    pub async fn get_meta_table_matched_row_index<S: AsRef<str>>(
        &self,
        values: &[S],
        exact: bool,
        options: &TableOptions,
    ) -> UiResult<Option<usize>> {
        Ok(self
            .get_meta_table_matched_row_indices(values, exact, options)
            .await?
            .first()
            .copied())
    }

    /// Meta-table search over `td` cells.
    ///
    /// Rows with `min_column_size` cells or fewer are skipped.
    pub async fn get_meta_table_matched_row_indices<S: AsRef<str>>(
        &self,
        values: &[S],
        exact: bool,
        options: &TableOptions,
    ) -> UiResult<Vec<usize>> {
        let candidates = matching::normalize_candidates(values);
        let rows = self.cell_rows(options).await?;
        Ok(matching::matching_rows(
            &rows,
            &candidates,
            exact,
            options.min_column_size + 1,
        ))
    }

    // =========================================================================
    // ROW CLICKS
    // =========================================================================

    async fn click(&self, page: PageId, link: &Locator, force: bool) -> UiResult<()> {
        self.driver()
            .perform(page, link, &ElementAction::click(force))
            .await
    }

    /// Click link `link_index` (default the first) in `row`
    pub async fn click_row_link(
        &self,
        row: usize,
        link_index: Option<usize>,
        force: bool,
        options: &TableOptions,
    ) -> UiResult<()> {
        let page = self.binding.ready().await?;
        let link = self.rows(options).nth(row).locate("a").pick(link_index);
        self.click(page, &link, force).await?;
        tracing::info!("{} - clicked link of row {row}", self.description());
        Ok(())
    }

    /// Click a link in `row` chosen by name or position
    pub async fn click_row_by_link_name(&self, row: usize, link: &RowLink, options: &TableOptions) -> UiResult<()> {
        let page = self.binding.ready().await?;
        let target = link.within(&self.rows(options).nth(row));
        self.click(page, &target, false).await?;
        tracing::info!("{} - clicked {link:?} of row {row}", self.description());
        Ok(())
    }

    /// Click a link in the first row of the meta table at `table`
    pub async fn click_meta_table_row_link(&self, table: usize, link: &RowLink, options: &TableOptions) -> UiResult<()> {
        let page = self.binding.ready().await?;
        let row = self.target().nth(table).locate(&options.rows).first();
        self.click(page, &link.within(&row), false).await?;
        tracing::info!("{} - clicked {link:?} of meta table {table}", self.description());
        Ok(())
    }

    /// Click link `link_index` of the first row of meta table `table`,
    /// skipping it with an error log when the link is disabled
    pub async fn meta_table_click_row_link(
        &self,
        table: usize,
        link_index: Option<usize>,
        options: &TableOptions,
    ) -> UiResult<()> {
        let page = self.binding.ready().await?;
        let row = self.target().nth(table).locate(&options.rows).first();
        let link = row.locate(LINK_SELECTOR).pick(link_index);
        let enabled = self
            .driver()
            .element_state(page, &link, ElementState::Enabled)
            .await;
        if !self.binding.or_missing(enabled)? {
            tracing::error!("{} text row is not enabled", options.rows);
            return Ok(());
        }
        self.click(page, &link, false).await
    }
}
