use anyhow::{Context, Result};
use serde_json::json;

use crate::prettify::table_rows;

// encode the template HTML file at compile time as a string literal
const TEMPLATE_HTML: &str = include_str!("report_template.html");

/// Renders admix output as a standalone HTML page, one table row per output line.
///
/// # Arguments
///
/// * `title` - Page heading, typically the job name.
/// * `output` - The text admix wrote to its output file.
///
/// # Returns
///
/// * `Result<String>` - The rendered page, or an error if the template fails to render.
pub fn render_page(title: &str, output: &str) -> Result<String> {
    let data = json!({
        "title": title,
        "version": crate::cli::VERSION,
        "generated": chrono::offset::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        "rows": table_rows(output),
    });

    let reg = handlebars::Handlebars::new();
    reg.render_template(TEMPLATE_HTML, &data)
        .context("Could not render the report template")
}
