use ammonia::Builder;
use comrak::{markdown_to_html, Options};
use std::collections::HashSet;

/// Render question or comment text (Markdown) into sanitized HTML.
pub fn render_markdown(raw: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.render.unsafe_ = true; // ammonia strips whatever is unsafe

    sanitize(&markdown_to_html(raw, &options))
}

fn sanitize(html: &str) -> String {
    let tags: HashSet<&str> = [
        "h1", "h2", "h3", "h4", "pre", "code", "blockquote", "hr", "table", "thead", "tbody",
        "tr", "th", "td", "del",
    ]
    .into_iter()
    .collect();

    let cleaned = Builder::default()
        .add_tags(&tags)
        .add_tag_attributes("a", &["href", "title"])
        .add_tag_attributes("code", &["class"])
        .url_schemes(["http", "https", "mailto"].into_iter().collect())
        .link_rel(Some("noopener noreferrer nofollow"))
        .clean(html)
        .to_string();
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_code_and_emphasis() {
        let html = render_markdown("Why does `Vec::push` **panic**?");
        assert!(html.contains("<code>Vec::push</code>"));
        assert!(html.contains("<strong>panic</strong>"));
    }

    #[test]
    fn strips_scripts_and_handlers() {
        let html = render_markdown("<script>alert(1)</script><img src=x onerror=alert(1)>");
        assert!(!html.contains("<script"));
        assert!(!html.contains("onerror"));
    }

    #[test]
    fn drops_javascript_links() {
        let html = render_markdown("[x](javascript:alert(1))");
        assert!(!html.contains("javascript:"));
    }
}
