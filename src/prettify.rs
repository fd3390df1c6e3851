use std::sync::LazyLock;

use handlebars::html_escape;
use itertools::Itertools;
use regex::Regex;

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("valid regex"));

/// Splits on `\n`, ignoring any trailing empty lines.
fn lines(text: &str) -> impl Iterator<Item = &str> {
    let text = text.trim_end_matches('\n');
    (!text.is_empty())
        .then(|| text.split('\n'))
        .into_iter()
        .flatten()
}

/// Splits admix output into rows of cells. Every run of spaces separates two cells, so
/// a line with leading spaces starts with an empty cell.
pub fn table_rows(text: &str) -> Vec<Vec<String>> {
    lines(text)
        .map(|line| SPACES.split(line).map(String::from).collect())
        .collect()
}

/// Turns admix output into the rows of an HTML table: each line becomes `<tr><td>`
/// followed by its fields separated by `<td>`.
pub fn prettify(text: &str) -> String {
    lines(text)
        .map(|line| {
            let cells = SPACES.split(line).map(html_escape).join("<td>");
            format!("<tr><td>{cells}")
        })
        .join("\n")
}
