//! Paragraph → HTML rendering for the intermediate PDF strategy.

use crate::progress::ProgressReporter;
use quick_xml::escape::escape;

const HTML_HEAD: &str = "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n";

/// Render paragraphs as a standalone HTML document, one `<p>` per paragraph.
///
/// After each paragraph a progress event is sent with the rounded share of
/// paragraphs rendered so far, so the last one is always 100. An empty
/// document sends nothing and renders an empty body.
pub fn render_document(title: &str, paragraphs: &[String], progress: &ProgressReporter) -> String {
    let total = paragraphs.len();
    let body_len: usize = paragraphs.iter().map(|p| p.len() + 8).sum();
    let mut html = String::with_capacity(HTML_HEAD.len() + title.len() + body_len + 64);

    html.push_str(HTML_HEAD);
    html.push_str("<title>");
    html.push_str(&escape(title));
    html.push_str("</title>\n</head>\n<body>\n");

    for (i, para) in paragraphs.iter().enumerate() {
        html.push_str("<p>");
        html.push_str(&escape(para.as_str()));
        html.push_str("</p>\n");
        progress.report_paragraphs(i + 1, total);
    }

    html.push_str("</body>\n</html>\n");
    html
}
