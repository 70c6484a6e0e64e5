//! Server-rendered page shells. Each page is a static HTML document that
//! names a client bundle and embeds its initial state as JSON.

use axum::response::Html;
use serde_json::Value;

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// JSON that cannot close the surrounding `<script>` element.
fn script_json(context: &Value) -> String {
    context
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

/// Renders the shell for the client bundle `page` with `context` as its initial state.
pub fn render_page(site_title: &str, page: &str, context: &Value) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body data-page="{page}">
<div id="app"></div>
<script id="page-context" type="application/json">{context}</script>
<script src="/static/{page}.js"></script>
</body>
</html>
"#,
        title = escape_html(site_title),
        page = escape_html(page),
        context = script_json(context),
    ))
}

/// A plain page with a heading and one paragraph.
pub fn render_message(site_title: &str, heading: &str, message: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
<h1>{heading}</h1>
<p>{message}</p>
</body>
</html>
"#,
        title = escape_html(site_title),
        heading = escape_html(heading),
        message = escape_html(message),
    ))
}
