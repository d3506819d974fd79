//! Fill a local stand-in for one form chapter through a real Chrome, using the
//! same field table format and fill engine as the portal run.

use std::path::Path;
use std::sync::Arc;

use ifa_robot::config::Timeouts;
use ifa_robot::fill::fill_fields;
use ifa_robot::{ChapterSet, ConsoleOperator, PageContext, PortalBrowser, Session, WaitPolicy};

const PAGE: &str = "data:text/html;charset=utf-8,\
<html><body>\
<input id='taxid'>\
<input id='county' data-mask='999'>\
<select id='kind'><option value=''>-</option><option value='IFA'>Idegenforgalmi adó</option></select>\
</body></html>";

const FIELDS: &str = r##"
[[chapter]]
name = "Adózó"
fields = [
    { selector = "#taxid", value = "1234567890" },
    { selector = "#county", value = "042" },
    { selector = "#kind", value = "IFA" },
]
"##;

#[tokio::main]
async fn main() -> ifa_robot::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let chapters = ChapterSet::from_toml_str(FIELDS)?;
    let browser = PortalBrowser::builder().headless(true).build().await?;
    let session = Arc::new(browser.open_session().await?);
    session.goto(PAGE).await?;

    let waits = WaitPolicy::new(Arc::new(ConsoleOperator::new()));
    let ctx = PageContext::new(session.clone(), waits, Timeouts::default());
    for chapter in chapters.chapters() {
        fill_fields(&ctx, chapter).await?;
    }

    let values = session
        .evaluate("JSON.stringify(['taxid', 'county', 'kind'].map(id => document.getElementById(id).value))")
        .await?;
    println!("Field values after filling: {values}");

    session.screenshot_to_file(Path::new("form_filled.png")).await?;
    println!("Filled form saved to form_filled.png");

    drop(ctx);
    browser.close().await
}
