use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ReportDate;

/// A stored daily report. The document body is opaque to this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub date: String,
    pub document: Value,
}

impl Report {
    pub fn new(date: &ReportDate, document: Value) -> Self {
        Self {
            date: date.key(),
            document,
        }
    }
}
