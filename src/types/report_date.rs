use std::fmt;

use chrono::{NaiveDate, Utc};
use tracing::debug;

const DATE_FORMAT: &str = "%Y%m%d";

/// Calendar date a report is keyed by, always rendered as `YYYYMMDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportDate(NaiveDate);

impl ReportDate {
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    /// Strict `YYYYMMDD` parse: eight ASCII digits forming a real calendar date.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(raw, DATE_FORMAT).ok().map(Self)
    }

    /// Malformed or missing input silently becomes today's UTC date.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw {
            Some(raw) => Self::parse(raw).unwrap_or_else(|| {
                debug!(date = raw, "unparsable date parameter; using today");
                Self::today()
            }),
            None => Self::today(),
        }
    }

    /// Pull `date` out of a raw query string.
    pub fn from_query(query: Option<&str>) -> Self {
        let param = query.and_then(|qs| {
            url::form_urlencoded::parse(qs.as_bytes())
                .find(|(k, _)| k == "date")
                .map(|(_, v)| v.into_owned())
        });
        Self::from_param(param.as_deref())
    }

    pub fn key(&self) -> String {
        self.0.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for ReportDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_dates_round_trip_unchanged() {
        for raw in ["20180316", "20000229", "19991231", "20240101"] {
            assert_eq!(ReportDate::parse(raw).map(|d| d.key()), Some(raw.to_string()));
        }
    }

    #[test]
    fn rejects_malformed_input() {
        for raw in [
            "", "notadate", "2018-03-16", "2018316", "201803160", "20180230", "20181301",
            "+2018031", " 0180316",
        ] {
            assert_eq!(ReportDate::parse(raw), None, "{raw:?} should be rejected");
        }
    }

    #[test]
    fn falls_back_to_today() {
        let today = ReportDate::today();
        assert_eq!(ReportDate::from_param(None), today);
        assert_eq!(ReportDate::from_param(Some("garbage")), today);
        assert_eq!(ReportDate::from_query(Some("foo=bar")), today);
        assert_eq!(ReportDate::from_query(None), today);
    }

    #[test]
    fn reads_date_from_query_string() {
        let date = ReportDate::from_query(Some("x=1&date=20180316"));
        assert_eq!(date.to_string(), "20180316");
    }
}
