//! End-to-end search scenario against the mock driver.

#![allow(clippy::unwrap_used)]

use pagewright::mock::{MockDriver, MockNode, MockPage};
use pagewright::prelude::*;
use pagewright::wait::StabilityOptions;
use std::sync::Arc;

const SEARCH_URL: &str = "https://search.test/?hl=en";

fn config() -> SessionConfig {
    SessionConfig::default().with_default_timeout(200).with_wait(WaitConfig {
        stability: StabilityOptions::default()
            .with_poll_interval(1)
            .with_stable_window(5)
            .with_max_wait(500),
        popup_timeout_ms: 100,
        ..WaitConfig::default()
    })
}

fn search_page() -> MockPage {
    MockPage::new(
        MockNode::new("body").children([
            MockNode::new("form").child(MockNode::new("input").attr("name", "q")),
            MockNode::new("table").id("results").children([
                MockNode::header_row(&["Rank", "Title", "Link"]),
                MockNode::row(&["1", "Rust book", "-"]),
                MockNode::new("tr").children([
                    MockNode::new("td").text("2"),
                    MockNode::new("td").text("Playwright docs"),
                    MockNode::new("td").child(
                        MockNode::new("a")
                            .attr("href", "https://docs.test/intro")
                            .text("Open"),
                    ),
                ]),
            ]),
            MockNode::new("a")
                .id("help")
                .attr("href", "https://help.test/")
                .attr("target", "_blank")
                .text("Help"),
        ]),
    )
    .title("Search")
}

fn driver() -> Arc<MockDriver> {
    let driver = Arc::new(MockDriver::new());
    driver.route(SEARCH_URL, search_page());
    driver.route(
        "https://docs.test/intro",
        MockPage::new(MockNode::new("body").child(MockNode::new("h1").text("Getting started")))
            .title("Intro"),
    );
    driver.route(
        "https://help.test/",
        MockPage::new(MockNode::new("body").child(MockNode::new("h1").id("topic").text("Help center"))),
    );
    driver
}

#[tokio::test]
async fn search_then_open_result_row() {
    let driver = driver();
    let session = Session::start(driver.clone(), config()).await.unwrap();
    let mut ctx = TestContext::new("search documentation");

    goto_url(&session, SEARCH_URL, GotoOptions::new()).await.unwrap();

    let search_box = UiElement::new(
        session.clone(),
        "[name=\"q\"]",
        BindOptions::new().with_description("Search Box"),
    );
    search_box.set_value("Playwright doc", Some("Enter")).await.unwrap();
    ctx.soft_assert(
        search_box.get_value(None).await.unwrap().as_str(),
        "Playwright doc",
        "search box keeps the query",
    );

    let results = UiTable::new(
        session.clone(),
        "#results",
        BindOptions::new().with_description("Results"),
    );
    let opts = TableOptions::new();
    assert_eq!(results.get_header_column_number("title", false).await.unwrap(), Some(1));
    let row = results
        .get_matched_row_index(&["playwright", "'2'"], false, &opts)
        .await
        .unwrap();
    assert_eq!(row, Some(2));

    results.click_row_link(2, None, false, &opts).await.unwrap();
    let heading = UiElement::new(session.clone(), "h1", BindOptions::new());
    assert_eq!(heading.get_page_title().await.unwrap(), "Intro");
    assert_eq!(heading.get_text(None).await.unwrap(), "Getting started");

    assert!(ctx.verify().is_ok());
    close_session(&session).await.unwrap();
    assert!(driver.is_closed());
}

#[tokio::test]
async fn popup_link_is_adopted_and_reused() {
    let driver = driver();
    let session = Session::start(driver.clone(), config()).await.unwrap();
    goto_url(&session, SEARCH_URL, GotoOptions::new()).await.unwrap();

    let help = UiElement::new(session.clone(), "#help", BindOptions::new().with_description("Help link"));
    let popup = help.click_to_open_popup(false).await.unwrap();
    assert_eq!(session.popup().await, Some(popup));

    let topic = UiElement::new(session.clone(), "#topic", BindOptions::new().popup());
    assert_eq!(topic.get_text(None).await.unwrap(), "Help center");
    assert_eq!(get_url(&session, 1).await.unwrap(), "https://help.test/");

    close_session(&session).await.unwrap();
    let closes: Vec<String> = driver
        .history()
        .into_iter()
        .filter(|c| c.starts_with("close"))
        .collect();
    assert_eq!(closes.len(), 3);
    assert!(closes[0].ends_with(&popup.to_string()));
    assert_eq!(closes[2], "close");
}

#[tokio::test]
async fn popup_scoped_element_bound_before_plain_click() {
    let driver = driver();
    let session = Session::start(driver.clone(), config()).await.unwrap();
    goto_url(&session, SEARCH_URL, GotoOptions::new()).await.unwrap();

    let topic = UiElement::new(session.clone(), "#topic", BindOptions::new().popup());
    assert!(session.popup().await.is_none());

    let help = UiElement::new(session.clone(), "#help", BindOptions::new());
    help.click(ClickOptions::new()).await.unwrap();

    assert_eq!(topic.get_text(None).await.unwrap(), "Help center");
    let popup = session.popup().await.unwrap();
    assert_ne!(popup, session.main_page());
    assert_eq!(session.popup().await, Some(popup));

    let same_tab = UiElement::new(session.clone(), "#topic", BindOptions::new()).switch_page(1);
    assert_eq!(same_tab.get_text(None).await.unwrap(), "Help center");
}

#[tokio::test]
async fn missing_elements_answer_empty() {
    let driver = driver();
    let session = Session::start(driver, config()).await.unwrap();
    goto_url(&session, SEARCH_URL, GotoOptions::new()).await.unwrap();

    let ghost = UiElement::new(session.clone(), "#ghost", BindOptions::new());
    assert_eq!(ghost.get_text(None).await.unwrap(), "");
    assert!(!ghost.is_exist().await.unwrap());
    assert!(matches!(
        ghost.get_nth(0).await,
        Err(UiError::ElementNotFound { .. })
    ));

    let results = UiTable::new(session, "#results", BindOptions::new());
    assert_eq!(
        results
            .get_matched_row_index(&["nothing like this"], false, &TableOptions::new())
            .await
            .unwrap(),
        None
    );
}
