//! Browser session shared by every bound element.
//!
//! A [`Session`] owns the driver, remembers the main page it was started on
//! and holds the adopted popup, if any. It is passed explicitly as
//! `Arc<Session>`; nothing in the crate keeps a global.

use crate::config::SessionConfig;
use crate::driver::{BrowserDriver, PageId};
use crate::result::{UiError, UiResult};
use crate::wait::wait_for_dom_stable;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Which page a bound object acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageScope {
    /// The page at this index, in opening order
    Page(usize),
    /// The popup opened from the main page
    Popup,
}

impl Default for PageScope {
    fn default() -> Self {
        Self::Page(0)
    }
}

impl std::fmt::Display for PageScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page(i) => write!(f, "page[{i}]"),
            Self::Popup => write!(f, "popup"),
        }
    }
}

/// One browser run: driver, main page and adopted popup
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    driver: Arc<dyn BrowserDriver>,
    config: SessionConfig,
    main_page: PageId,
    popup: Mutex<Option<PageId>>,
}

impl Session {
    /// Open a new page on `driver` and start a session on it
    pub async fn start(driver: Arc<dyn BrowserDriver>, config: SessionConfig) -> UiResult<Arc<Self>> {
        let page = driver.new_page().await?;
        Ok(Self::attach(driver, page, config))
    }

    /// Start a session on a page the driver already has open
    #[must_use]
    pub fn attach(driver: Arc<dyn BrowserDriver>, page: PageId, config: SessionConfig) -> Arc<Self> {
        let session = Self {
            id: Uuid::new_v4(),
            driver,
            config,
            main_page: page,
            popup: Mutex::new(None),
        };
        tracing::debug!(session = %session.id, page = %page, "session started");
        Arc::new(session)
    }

    /// Session id stamped on log lines
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The driver
    #[must_use]
    pub fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    /// Launch configuration
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Page the session was started on
    #[must_use]
    pub const fn main_page(&self) -> PageId {
        self.main_page
    }

    /// The page at `index` in opening order
    pub async fn page_at(&self, index: usize) -> UiResult<PageId> {
        self.driver
            .pages()
            .await?
            .get(index)
            .copied()
            .ok_or(UiError::PageNotFound { index })
    }

    /// The adopted popup, if any
    pub async fn popup(&self) -> Option<PageId> {
        *self.popup.lock().await
    }

    /// Adopt `page` as the popup
    pub async fn set_popup(&self, page: PageId) {
        *self.popup.lock().await = Some(page);
        tracing::info!(session = %self.id, page = %page, "popup adopted");
    }

    /// Forget the popup and return it
    pub async fn take_popup(&self) -> Option<PageId> {
        self.popup.lock().await.take()
    }

    /// The adopted popup, or the next popup opened from the main page.
    ///
    /// The slot stays locked while waiting so concurrent callers adopt the
    /// same page. No popup within the configured window yields
    /// [`UiError::PopupNotOpened`].
    pub async fn adopt_popup(&self) -> UiResult<PageId> {
        let mut slot = self.popup.lock().await;
        if let Some(page) = *slot {
            return Ok(page);
        }
        let window = self.config.wait.popup_timeout();
        let known = [self.main_page];
        match tokio::time::timeout(window, self.driver.next_popup(self.main_page, &known)).await {
            Ok(found) => {
                let page = found?;
                *slot = Some(page);
                tracing::info!(session = %self.id, page = %page, "popup adopted");
                Ok(page)
            }
            Err(_) => Err(UiError::PopupNotOpened {
                ms: self.config.wait.popup_timeout_ms,
            }),
        }
    }

    /// Resolve a scope to a live page
    pub async fn resolve(&self, scope: PageScope) -> UiResult<PageId> {
        match scope {
            PageScope::Page(index) => self.page_at(index).await,
            PageScope::Popup => self.adopt_popup().await,
        }
    }

    /// Wait for the configured load states, then for the markup to settle
    pub async fn settle(&self, page: PageId) -> UiResult<()> {
        let waits = &self.config.wait;
        for state in waits.load_states() {
            self.driver
                .wait_for_load_state(page, state, waits.load_timeout())
                .await?;
        }
        wait_for_dom_stable(self.driver(), page, &waits.stability).await
    }
}
