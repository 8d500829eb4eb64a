//! Locator binding shared by [`UiElement`](crate::element::UiElement) and
//! [`UiTable`](crate::table::UiTable).
//!
//! A [`Binding`] ties a base locator to a session, a page scope and a human
//! description. Refining it resolves the refined chain against the live page
//! and returns a new binding addressing the absolute path of the first match;
//! the binding that was refined is left untouched.

use crate::driver::PageId;
use crate::locator::Locator;
use crate::result::{UiError, UiResult};
use crate::session::{PageScope, Session};
use std::sync::Arc;

/// Construction options for bound objects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindOptions {
    /// Human description used in log lines (defaults to the selector)
    pub description: Option<String>,
    /// Act on the popup opened from the main page
    pub popup: bool,
    /// Page index when not popup-scoped
    pub page_index: usize,
}

impl BindOptions {
    /// Default options: first page, selector as description
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Scope to the popup
    #[must_use]
    pub const fn popup(mut self) -> Self {
        self.popup = true;
        self
    }

    /// Scope to the page at `index`
    #[must_use]
    pub const fn on_page(mut self, index: usize) -> Self {
        self.page_index = index;
        self.popup = false;
        self
    }

    const fn scope(&self) -> PageScope {
        if self.popup {
            PageScope::Popup
        } else {
            PageScope::Page(self.page_index)
        }
    }
}

/// Base locator plus the current, possibly derived, target
#[derive(Debug, Clone)]
pub struct Binding {
    session: Arc<Session>,
    base: Locator,
    target: Locator,
    xpath: Option<String>,
    description: String,
    scope: PageScope,
}

impl Binding {
    /// Bind `selector` (CSS, or XPath with an `xpath=` prefix) to a session
    #[must_use]
    pub fn new(session: Arc<Session>, selector: &str, options: BindOptions) -> Self {
        let base = Locator::new(selector);
        let scope = options.scope();
        Self {
            session,
            target: base.clone(),
            description: options.description.unwrap_or_else(|| selector.to_string()),
            base,
            xpath: None,
            scope,
        }
    }

    /// The session this binding acts in
    #[must_use]
    pub const fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Locator given at construction
    #[must_use]
    pub const fn base(&self) -> &Locator {
        &self.base
    }

    /// Locator actions resolve against
    #[must_use]
    pub const fn target(&self) -> &Locator {
        &self.target
    }

    /// Description used in log lines
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Page scope
    #[must_use]
    pub const fn scope(&self) -> PageScope {
        self.scope
    }

    /// Whether the target is still the base locator
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.target == self.base
    }

    /// Current target as a selector string
    #[must_use]
    pub fn full_css(&self) -> String {
        self.target.to_string()
    }

    /// Absolute XPath of the node a refinement resolved to
    #[must_use]
    pub fn full_xpath(&self) -> Option<&str> {
        self.xpath.as_deref()
    }

    /// Binding addressing the base locator again
    #[must_use]
    pub fn reset(&self) -> Self {
        Self {
            target: self.base.clone(),
            xpath: None,
            ..self.clone()
        }
    }

    /// Same target on another page
    #[must_use]
    pub fn with_scope(&self, scope: PageScope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    /// Same target under another description
    #[must_use]
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self.clone()
        }
    }

    /// Rebind to a new base selector; the description follows unless given
    #[must_use]
    pub fn with_locator(&self, selector: &str, description: Option<String>) -> Self {
        let base = Locator::new(selector);
        Self {
            target: base.clone(),
            base,
            xpath: None,
            description: description.unwrap_or_else(|| selector.to_string()),
            ..self.clone()
        }
    }

    /// Resolve the page scope to a live page
    pub async fn page(&self) -> UiResult<PageId> {
        self.session.resolve(self.scope).await
    }

    /// Resolve the page and wait until it is ready for the target.
    ///
    /// A target missing from the DOM is logged, not reported: the action
    /// that follows decides whether absence is an error.
    pub async fn ready(&self) -> UiResult<PageId> {
        let page = self.page().await?;
        self.session.settle(page).await?;
        if self.session.driver().count(page, &self.target).await? == 0 {
            tracing::error!(
                session = %self.session.id(),
                locator = %self.target,
                "{} - is not exist in the DOM",
                self.description
            );
        }
        Ok(page)
    }

    /// Resolve `chain` and bind to the absolute path of its first match
    pub async fn refine(&self, chain: Locator) -> UiResult<Self> {
        let page = self.ready().await?;
        let paths = self.session.driver().element_paths(page, &chain).await?;
        let Some(path) = paths.into_iter().next() else {
            tracing::error!(
                session = %self.session.id(),
                locator = %chain,
                "{} - no element matched the refinement",
                self.description
            );
            return Err(UiError::element_not_found(chain.to_string()));
        };
        tracing::debug!(description = %self.description, css = %path.css, "refined");
        Ok(Self {
            target: path.to_locator(),
            xpath: Some(path.xpath),
            ..self.clone()
        })
    }

    /// Turn a missing element into the query's empty answer
    pub(crate) fn or_missing<T: Default>(&self, result: UiResult<T>) -> UiResult<T> {
        match result {
            Err(UiError::ElementNotFound { selector }) => {
                tracing::error!(
                    session = %self.session.id(),
                    locator = %selector,
                    "{} - element not found",
                    self.description
                );
                Ok(T::default())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNode;
    use crate::session::fixtures::session_with;

    fn list() -> MockNode {
        MockNode::new("body").child(MockNode::new("ul").id("items").children([
            MockNode::new("li").text("alpha"),
            MockNode::new("li").text("beta"),
        ]))
    }

    mod options_tests {
        use super::*;

        #[test]
        fn test_scope_from_options() {
            assert_eq!(BindOptions::new().scope(), PageScope::Page(0));
            assert_eq!(BindOptions::new().popup().scope(), PageScope::Popup);
            assert_eq!(BindOptions::new().popup().on_page(2).scope(), PageScope::Page(2));
        }

        #[test]
        fn test_description_defaults_to_selector() {
            let (_d, session, _p) = session_with(list());
            let bound = Binding::new(session.clone(), "#items li", BindOptions::new());
            assert_eq!(bound.description(), "#items li");
            let named = Binding::new(session, "#items", BindOptions::new().with_description("Items"));
            assert_eq!(named.description(), "Items");
        }
    }

    mod refine_tests {
        use super::*;

        #[tokio::test]
        async fn test_refine_binds_absolute_path() {
            let (_d, session, _p) = session_with(list());
            let bound = Binding::new(session, "#items", BindOptions::new());
            let second = bound.refine(bound.target().locate("li").nth(1)).await.unwrap();

            assert_eq!(
                second.full_css(),
                "html > body > ul:nth-child(1) > li:nth-child(2)"
            );
            assert_eq!(second.full_xpath(), Some("/html/body/ul[1]/li[2]"));
            assert!(!second.is_base());
            assert!(bound.is_base());
            assert!(second.reset().is_base());
            assert_eq!(second.reset().full_xpath(), None);
        }

        #[tokio::test]
        async fn test_refine_without_match_is_not_found() {
            let (_d, session, _p) = session_with(list());
            let bound = Binding::new(session, "#items", BindOptions::new());
            let err = bound.refine(bound.target().locate("li").nth(7)).await.unwrap_err();
            assert!(matches!(err, UiError::ElementNotFound { .. }));
        }

        #[tokio::test]
        async fn test_ready_tolerates_missing_target() {
            let (driver, session, page) = session_with(list());
            let bound = Binding::new(session, "#missing", BindOptions::new());
            assert_eq!(bound.ready().await.unwrap(), page);
            assert!(driver.was_called("load_state"));
        }

        #[tokio::test]
        async fn test_or_missing_maps_only_not_found() {
            let (_d, session, _p) = session_with(list());
            let bound = Binding::new(session, "#items", BindOptions::new());
            let missing: UiResult<Vec<String>> = Err(UiError::element_not_found("#x"));
            assert_eq!(bound.or_missing(missing).unwrap(), Vec::<String>::new());
            let failed: UiResult<bool> = Err(UiError::driver("boom"));
            assert!(bound.or_missing(failed).is_err());
        }
    }

    mod rebind_tests {
        use super::*;

        #[test]
        fn test_with_locator_and_scope() {
            let (_d, session, _p) = session_with(list());
            let bound = Binding::new(session, "#items", BindOptions::new().with_description("Items"));
            let moved = bound.with_locator("xpath=//li", None).with_scope(PageScope::Popup);
            assert_eq!(moved.description(), "xpath=//li");
            assert_eq!(moved.scope(), PageScope::Popup);
            assert_eq!(bound.description(), "Items");
            assert_eq!(bound.scope(), PageScope::Page(0));
        }
    }
}
