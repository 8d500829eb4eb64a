//! Pagewright: page objects and element wrappers over a browser driver
//!
//! Test scripts bind selectors to a [`Session`] and act through the bound
//! values. Every action waits for the page to load and its markup to settle,
//! logs what it did, and treats a missing element as an empty answer rather
//! than a crash. Refinements (`find`, `get_nth`, `get_row`, ...) resolve to
//! the absolute path of the node they matched and return a new value; the
//! value they started from keeps addressing its base selector.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   PAGEWRIGHT Architecture                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────────────┐    │
//! │   │ UiElement  │    │  Binding   │    │ BrowserDriver      │    │
//! │   │ UiTable    │───►│  Session   │───►│ ChromiumDriver /   │    │
//! │   │ navigation │    │  waits     │    │ MockDriver         │    │
//! │   └────────────┘    └────────────┘    └────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use pagewright::prelude::*;
//! use pagewright::mock::{MockDriver, MockNode};
//! use std::sync::Arc;
//!
//! # tokio_test_block(async {
//! let driver = Arc::new(MockDriver::new());
//! let page = driver.open_page(MockNode::new("body").child(
//!     MockNode::new("table").id("orders").children([
//!         MockNode::header_row(&["ID", "Name"]),
//!         MockNode::row(&["1", "Alice"]),
//!     ]),
//! ));
//! let session = Session::attach(driver, page, SessionConfig::default());
//! let orders = UiTable::new(session, "#orders", BindOptions::new());
//! assert_eq!(orders.get_header_column_number("name", false).await?, Some(1));
//! # Ok::<(), UiError>(())
//! # }).unwrap();
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]

pub mod binding;
#[cfg(feature = "browser")]
pub mod cdp;
pub mod config;
pub mod context;
pub mod driver;
pub mod element;
pub mod locator;
pub mod logging;
pub mod mock;
pub mod navigation;
mod result;
pub mod session;
pub mod table;
pub mod wait;

pub use binding::{BindOptions, Binding};
#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;
pub use config::{BrowserKind, SessionConfig, WaitConfig};
pub use context::{SoftAssertion, SoftAssertionError, TestContext};
pub use driver::{BrowserDriver, PageId, ResponseInfo};
pub use element::{ClickOptions, ContainsOptions, FindOptions, TypeOptions, UiElement};
pub use locator::{ElementAction, ElementPath, ElementState, KeyboardAction, Locator, Selector, Step};
pub use logging::{init_logging, LogConfig};
pub use result::{UiError, UiResult};
pub use session::{PageScope, Session};
pub use table::{RowLink, TableOptions, UiTable};
pub use wait::{LoadState, SelectorState, UrlPattern, WaitOptions};

/// Everything a test script needs
pub mod prelude {
    pub use super::binding::BindOptions;
    pub use super::config::{BrowserKind, SessionConfig, WaitConfig};
    pub use super::context::TestContext;
    pub use super::driver::{BrowserDriver, PageId};
    pub use super::element::{ClickOptions, ContainsOptions, FindOptions, TypeOptions, UiElement};
    pub use super::locator::Locator;
    pub use super::logging::{init_logging, LogConfig};
    pub use super::navigation::{
        close_session, explicit_wait, get_api_response, get_url, goto_url, keyboard,
        launch_session, refresh_page, static_wait, wait_for_page_load, wait_for_popup_load,
        wait_for_spinner_hidden, wait_for_url, GotoOptions, KeyboardTarget,
    };
    pub use super::result::{UiError, UiResult};
    pub use super::session::{PageScope, Session};
    pub use super::table::{RowLink, TableOptions, UiTable};
    pub use super::wait::LoadState;
}
