//! Locator values: which nodes an element binding addresses.
//!
//! A [`Locator`] is a base [`Selector`] followed by an ordered list of
//! refinement [`Step`]s. It is an immutable value; every builder method
//! returns a new locator, so refining never changes the locator it started
//! from. Locators are resolved by a [`BrowserDriver`](crate::driver::BrowserDriver)
//! against the live page, and serialize to JSON so the page-side resolver can
//! walk the same chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Prefix that marks a raw selector string as XPath
pub const XPATH_PREFIX: &str = "xpath=";

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath expression
    XPath(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Parse a raw selector string.
    ///
    /// `xpath=...`, `//...` and `(//...)` are XPath, anything else is CSS.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(expr) = trimmed.strip_prefix(XPATH_PREFIX) {
            Self::XPath(expr.to_string())
        } else if trimmed.starts_with("//") || trimmed.starts_with("(//") {
            Self::XPath(trimmed.to_string())
        } else {
            Self::Css(trimmed.to_string())
        }
    }

    /// The selector text without its kind
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) => s,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "{s}"),
            Self::XPath(s) => write!(f, "{XPATH_PREFIX}{s}"),
        }
    }
}

/// One refinement applied to the current set of matched nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Replace each match with its descendants matching `selector`
    Locate {
        /// Descendant selector
        selector: Selector,
    },
    /// Keep matches whose inner text contains (case-insensitive) or equals `text`
    FilterText {
        /// Text to look for
        text: String,
        /// Require whole-text equality instead of containment
        exact: bool,
    },
    /// Keep matches having a descendant matching `selector`
    FilterHas {
        /// Descendant selector
        selector: Selector,
    },
    /// Keep matches having a descendant whose own text matches `text`
    FilterHasText {
        /// Text to look for
        text: String,
        /// Require whole-text equality instead of containment
        exact: bool,
    },
    /// Replace matches with the innermost descendants whose text matches `text`
    GetByText {
        /// Text to look for
        text: String,
        /// Require whole-text equality instead of containment
        exact: bool,
    },
    /// Keep only the match at `index`
    Nth {
        /// Zero-based index
        index: usize,
    },
    /// Keep only the last match
    Last,
    /// Replace each match with its parent element
    Parent,
    /// Replace each match with its immediately following sibling, if it has `tag`
    NextSibling {
        /// Tag name of the sibling
        tag: String,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locate { selector } => write!(f, "{selector}"),
            Self::FilterText { text, exact } => {
                write!(f, "has-text={text:?}{}", if *exact { "s" } else { "i" })
            }
            Self::FilterHas { selector } => write!(f, "has={selector}"),
            Self::FilterHasText { text, exact } => {
                write!(f, "has-child-text={text:?}{}", if *exact { "s" } else { "i" })
            }
            Self::GetByText { text, exact } => {
                write!(f, "text={text:?}{}", if *exact { "s" } else { "i" })
            }
            Self::Nth { index } => write!(f, "nth={index}"),
            Self::Last => write!(f, "nth=-1"),
            Self::Parent => write!(f, ".."),
            Self::NextSibling { tag } => write!(f, "+{tag}"),
        }
    }
}

/// An immutable chain of selector steps.
///
/// ```
/// use pagewright::locator::Locator;
///
/// let base = Locator::new("table#orders");
/// let cell = base.locate("tr").nth(2).locate("td").first();
/// assert_eq!(base.to_string(), "table#orders");
/// assert_eq!(cell.to_string(), "table#orders >> tr >> nth=2 >> td >> nth=0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    root: Selector,
    steps: Vec<Step>,
}

impl Locator {
    /// Create a locator from a raw selector string
    #[must_use]
    pub fn new(selector: &str) -> Self {
        Self::from_selector(Selector::parse(selector))
    }

    /// Create a locator rooted at `selector`
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self {
            root: selector,
            steps: Vec::new(),
        }
    }

    /// Base selector
    #[must_use]
    pub const fn root(&self) -> &Selector {
        &self.root
    }

    /// Refinement steps in order
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Whether the locator has no refinements
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.steps.is_empty()
    }

    /// Return a new locator with `step` appended
    #[must_use]
    pub fn then(&self, step: Step) -> Self {
        let mut next = self.clone();
        next.steps.push(step);
        next
    }

    /// Descendants matching a raw selector
    #[must_use]
    pub fn locate(&self, selector: &str) -> Self {
        self.then(Step::Locate {
            selector: Selector::parse(selector),
        })
    }

    /// Matches whose inner text contains `text` (case-insensitive)
    #[must_use]
    pub fn filter_text(&self, text: impl Into<String>) -> Self {
        self.then(Step::FilterText {
            text: text.into(),
            exact: false,
        })
    }

    /// Matches whose trimmed inner text equals `text`
    #[must_use]
    pub fn filter_text_exact(&self, text: impl Into<String>) -> Self {
        self.then(Step::FilterText {
            text: text.into(),
            exact: true,
        })
    }

    /// Matches having a descendant matching a raw selector
    #[must_use]
    pub fn has(&self, selector: &str) -> Self {
        self.then(Step::FilterHas {
            selector: Selector::parse(selector),
        })
    }

    /// Matches having a descendant whose text matches
    #[must_use]
    pub fn has_child_text(&self, text: impl Into<String>, exact: bool) -> Self {
        self.then(Step::FilterHasText {
            text: text.into(),
            exact,
        })
    }

    /// Innermost descendants whose text matches
    #[must_use]
    pub fn get_by_text(&self, text: impl Into<String>, exact: bool) -> Self {
        self.then(Step::GetByText {
            text: text.into(),
            exact,
        })
    }

    /// The match at `index`
    #[must_use]
    pub fn nth(&self, index: usize) -> Self {
        self.then(Step::Nth { index })
    }

    /// The first match
    #[must_use]
    pub fn first(&self) -> Self {
        self.nth(0)
    }

    /// The last match
    #[must_use]
    pub fn last(&self) -> Self {
        self.then(Step::Last)
    }

    /// Parent of each match
    #[must_use]
    pub fn parent(&self) -> Self {
        self.then(Step::Parent)
    }

    /// Adjacent following sibling with `tag`
    #[must_use]
    pub fn next_sibling(&self, tag: impl Into<String>) -> Self {
        self.then(Step::NextSibling { tag: tag.into() })
    }

    /// Pick a match: `Some(i)` narrows to the i-th, `None` to the first
    #[must_use]
    pub fn pick(&self, index: Option<usize>) -> Self {
        self.nth(index.unwrap_or(0))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for step in &self.steps {
            write!(f, " >> {step}")?;
        }
        Ok(())
    }
}

/// Absolute address of one resolved node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementPath {
    /// Absolute CSS path from the document root
    pub css: String,
    /// Absolute XPath from the document root
    pub xpath: String,
}

impl ElementPath {
    /// Locator addressing exactly this node by its CSS path
    #[must_use]
    pub fn to_locator(&self) -> Locator {
        Locator::from_selector(Selector::css(self.css.clone()))
    }
}

/// State an element can be queried for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    /// Rendered with a non-empty box and not hidden
    Visible,
    /// Not disabled
    Enabled,
    /// Checked checkbox or radio
    Checked,
}

/// A single element interaction performed by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementAction {
    /// Mouse click
    Click {
        /// Skip actionability checks
        force: bool,
        /// 1 for click, 2 for double click
        click_count: u32,
    },
    /// Replace the value of an input
    Fill(String),
    /// Empty an input
    Clear,
    /// Type text key by key
    Type {
        /// Text to type
        text: String,
        /// Delay between keys in milliseconds
        delay_ms: u64,
    },
    /// Press a single key (e.g. "Enter") on the element
    Press(String),
    /// Check a checkbox or radio
    Check,
    /// Uncheck a checkbox
    Uncheck,
    /// Select a `<select>` option by its text or value
    SelectByText(String),
    /// Select a `<select>` option by position
    SelectByIndex(usize),
    /// Set the files of a file input
    SetInputFiles(Vec<PathBuf>),
    /// Move focus to the element
    Focus,
    /// Scroll the element into view
    ScrollIntoView,
}

impl ElementAction {
    /// Create a click action
    #[must_use]
    pub const fn click(force: bool) -> Self {
        Self::Click {
            force,
            click_count: 1,
        }
    }

    /// Create a double-click action
    #[must_use]
    pub const fn dbl_click(force: bool) -> Self {
        Self::Click {
            force,
            click_count: 2,
        }
    }

    /// Short action name used in logs and call history
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click { click_count, .. } if *click_count > 1 => "dblclick",
            Self::Click { .. } => "click",
            Self::Fill(_) => "fill",
            Self::Clear => "clear",
            Self::Type { .. } => "type",
            Self::Press(_) => "press",
            Self::Check => "check",
            Self::Uncheck => "uncheck",
            Self::SelectByText(_) | Self::SelectByIndex(_) => "select_option",
            Self::SetInputFiles(_) => "set_input_files",
            Self::Focus => "focus",
            Self::ScrollIntoView => "scroll_into_view",
        }
    }
}

/// Page-level keyboard input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardAction {
    /// Type a string key by key
    Type(String),
    /// Release a key
    Up(String),
    /// Hold a key down
    Down(String),
    /// Press and release a key
    Press(String),
    /// Insert text without key events
    InsertText(String),
}

impl KeyboardAction {
    /// Parse a method name (`type`, `up`, `down`, `press`, `inserttext`)
    #[must_use]
    pub fn from_method(method: &str, key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        match method.trim().to_lowercase().as_str() {
            "type" => Some(Self::Type(key)),
            "up" => Some(Self::Up(key)),
            "down" => Some(Self::Down(key)),
            "press" => Some(Self::Press(key)),
            "inserttext" => Some(Self::InsertText(key)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_parse_css() {
            assert_eq!(Selector::parse("  [name=\"q\"] "), Selector::css("[name=\"q\"]"));
        }

        #[test]
        fn test_parse_xpath_prefix() {
            assert_eq!(
                Selector::parse("xpath=//div[@id='a']"),
                Selector::xpath("//div[@id='a']")
            );
        }

        #[test]
        fn test_parse_bare_xpath() {
            assert_eq!(Selector::parse("//table"), Selector::xpath("//table"));
            assert_eq!(Selector::parse("(//tr)[2]"), Selector::xpath("(//tr)[2]"));
        }

        #[test]
        fn test_display_keeps_kind() {
            assert_eq!(Selector::xpath("//a").to_string(), "xpath=//a");
            assert_eq!(Selector::css("a").to_string(), "a");
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_refinement_leaves_original_untouched() {
            let base = Locator::new("#results");
            let refined = base.locate("a").filter_text("Docs").nth(1);
            assert!(base.is_plain());
            assert_eq!(refined.steps().len(), 3);
            assert_eq!(refined.root(), base.root());
        }

        #[test]
        fn test_pick_defaults_to_first() {
            let base = Locator::new("li");
            assert_eq!(base.pick(None).steps(), &[Step::Nth { index: 0 }]);
            assert_eq!(base.pick(Some(3)).steps(), &[Step::Nth { index: 3 }]);
        }

        #[test]
        fn test_display_chain() {
            let loc = Locator::new("ul").locate("li").last().parent();
            assert_eq!(loc.to_string(), "ul >> li >> nth=-1 >> ..");
        }

        #[test]
        fn test_serializes_for_resolver() {
            let loc = Locator::new("tr").filter_text_exact("Open");
            let json = serde_json::to_value(&loc).unwrap();
            assert_eq!(json["root"]["kind"], "css");
            assert_eq!(json["steps"][0]["op"], "filter_text");
            assert_eq!(json["steps"][0]["exact"], true);
        }

        #[test]
        fn test_element_path_to_locator() {
            let path = ElementPath {
                css: "html > body > div:nth-child(2)".into(),
                xpath: "/html/body/div[2]".into(),
            };
            let loc = path.to_locator();
            assert!(loc.is_plain());
            assert_eq!(loc.root(), &Selector::css("html > body > div:nth-child(2)"));
        }
    }

    mod action_tests {
        use super::*;

        #[test]
        fn test_click_names() {
            assert_eq!(ElementAction::click(false).name(), "click");
            assert_eq!(ElementAction::dbl_click(true).name(), "dblclick");
        }

        #[test]
        fn test_keyboard_methods() {
            assert_eq!(
                KeyboardAction::from_method(" Press ", "Enter"),
                Some(KeyboardAction::Press("Enter".into()))
            );
            assert_eq!(
                KeyboardAction::from_method("insertText", "abc"),
                Some(KeyboardAction::InsertText("abc".into()))
            );
            assert!(KeyboardAction::from_method("hold", "Shift").is_none());
        }
    }
}
