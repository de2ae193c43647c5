pub mod report_date;

pub use report_date::ReportDate;
