//! Search a documentation site in a real Chromium and read the first hits.
//!
//! Run with: `cargo run --example search_docs --features browser`
//!
//! Set `CHROMIUM_PATH` when Chromium is not on the default path and
//! `PAGEWRIGHT_HEADLESS=false` to watch the run.

use pagewright::prelude::*;

#[tokio::main]
async fn main() -> UiResult<()> {
    let log = init_logging(&LogConfig::new("test-results/log", "search_docs").with_json(false))?;
    let config = SessionConfig::from_env()?;
    let session = launch_session(config).await?;
    let mut ctx = TestContext::new("Search Playwright documentation");

    goto_url(&session, "https://duckduckgo.com/?kl=us-en", GotoOptions::new()).await?;

    let search_box = UiElement::new(
        session.clone(),
        "[name=\"q\"]",
        BindOptions::new().with_description("Search Box"),
    );
    search_box.set_value("Playwright doc", Some("Enter")).await?;
    wait_for_page_load(&session).await?;

    let results = UiElement::new(
        session.clone(),
        "[data-testid=\"result-title-a\"]",
        BindOptions::new().with_description("Result titles"),
    );
    let titles = results.get_text_all_matching_objects().await?;
    ctx.soft_assert_true(!titles.is_empty(), "search returned results");
    for title in titles.iter().take(5) {
        println!("{title}");
    }

    ctx.write_json("test-results/asserts.json")?;
    close_session(&session).await?;
    println!("log written to {}", log.display());
    Ok(())
}
