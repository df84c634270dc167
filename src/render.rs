//! Text to HTML conversion for blog bodies and comments.

use pulldown_cmark::{html, Options, Parser};

/// Renders a markdown blog body and strips anything unsafe from the result.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);

    let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut rendered, Parser::new_ext(markdown, options));
    ammonia::clean(&rendered)
}

/// One `<p>` per non-blank line, with `&`, `<` and `>` escaped.
pub fn text_to_html(text: &str) -> String {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            format!(
                "<p>{}</p>",
                line.replace('&', "&amp;")
                    .replace('<', "&lt;")
                    .replace('>', "&gt;")
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_to_html_escapes_and_skips_blank_lines() {
        assert_eq!(
            text_to_html("a < b\n\n  \nTom & Jerry"),
            "<p>a &lt; b</p><p>Tom &amp; Jerry</p>"
        );
    }

    #[test]
    fn test_markdown_renders_emphasis() {
        let html = markdown_to_html("# Title\n\nsome *text*");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn test_markdown_drops_script_tags() {
        let html = markdown_to_html("hello <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("hello"));
    }
}
