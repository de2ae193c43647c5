//! Page rendering. Pages are assembled from small HTML fragments so the report page can be
//! streamed as it is produced.

pub mod login;
pub mod report;

pub use login::render_login;
pub use report::ReportRenderer;

/// An error notice shown above a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
}

impl Message {
    pub fn danger(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn head(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body>\n",
        escape(title)
    )
}

fn messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            format!(
                "<div class=\"alert alert-danger\" role=\"alert\">{}</div>\n",
                escape(&m.text)
            )
        })
        .collect()
}

fn footer(logo: &str, year: i32) -> String {
    format!(
        "<footer>&copy; {year} {}</footer>\n</body>\n</html>\n",
        escape(logo)
    )
}
