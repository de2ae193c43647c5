use std::sync::Arc;

use axum::body::Bytes;
use chrono::{Datelike, Utc};
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use tracing::error;

use super::{escape, footer, head};
use crate::db::{Report, RequestScope};
use crate::error::AppError;
use crate::types::ReportDate;

/// Upper bound on fragments buffered into one emitted chunk.
pub const CHUNK_FRAGMENTS: usize = 5;

#[derive(Clone)]
pub struct ReportRenderer {
    logo: Arc<str>,
}

impl ReportRenderer {
    pub fn new(logo: &str) -> Self {
        Self {
            logo: Arc::from(logo),
        }
    }

    /// Stream the report page for `date`.
    ///
    /// Fragments are grouped up to five per chunk, but a chunk is emitted as soon as the next
    /// fragment is not ready yet, so the page head goes out while the lookup is still pending.
    /// The stream is single use.
    pub fn render(
        &self,
        date: ReportDate,
        scope: RequestScope,
    ) -> impl Stream<Item = Result<Bytes, AppError>> + Send + use<> {
        let logo = self.logo.clone();
        let opening = vec![
            head(&logo),
            format!(
                "<nav><span class=\"brand\">{}</span> <a href=\"/logout\">Log out</a></nav>\n",
                escape(&logo)
            ),
            date_picker(&date),
            format!("<main data-date=\"{date}\">\n<h1>Report for {date}</h1>\n"),
        ];

        let lookup = stream::once(async move { scope.find_report(&date).await }).flat_map(
            |found| {
                let items: Vec<Result<String, AppError>> = match found {
                    Ok(report) => report_fragments(report.as_ref())
                        .into_iter()
                        .map(Ok)
                        .collect(),
                    Err(e) => {
                        error!(error = %e, "report lookup failed mid-stream");
                        vec![Err(e)]
                    }
                };
                stream::iter(items)
            },
        );

        let closing = stream::once(async move {
            Ok::<_, AppError>(format!("</main>\n{}", footer(&logo, Utc::now().year())))
        });

        stream::iter(opening.into_iter().map(Ok))
            .chain(lookup)
            .chain(closing)
            .ready_chunks(CHUNK_FRAGMENTS)
            .map(|group| {
                group
                    .into_iter()
                    .collect::<Result<String, AppError>>()
                    .map(Bytes::from)
            })
    }
}

fn date_picker(date: &ReportDate) -> String {
    format!(
        "<form method=\"get\" action=\"/\" class=\"date-picker\">\n\
         <input type=\"text\" name=\"date\" value=\"{date}\" pattern=\"[0-9]{{8}}\" placeholder=\"YYYYMMDD\">\n\
         <button type=\"submit\">Show</button>\n</form>\n"
    )
}

fn report_fragments(report: Option<&Report>) -> Vec<String> {
    let Some(report) = report else {
        return vec!["<p class=\"no-report\">No report available for this date.</p>\n".to_string()];
    };

    match &report.document {
        Value::Object(fields) => {
            let mut out = Vec::with_capacity(fields.len() + 2);
            out.push("<dl class=\"report\">\n".to_string());
            out.extend(fields.iter().map(|(key, value)| {
                format!(
                    "<dt>{}</dt><dd>{}</dd>\n",
                    escape(key),
                    escape(&display_value(value))
                )
            }));
            out.push("</dl>\n".to_string());
            out
        }
        other => vec![format!(
            "<pre class=\"report\">{}</pre>\n",
            escape(&serde_json::to_string_pretty(other).unwrap_or_default())
        )],
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
