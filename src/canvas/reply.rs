use pulldown_cmark::{Options, Parser, html};

/// Render a Markdown reply to the HTML Canvas stores for discussion entries
pub fn render_reply_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown.trim(), options);
    let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut rendered, parser);
    rendered.trim_end().to_string()
}
