//! Output module for presenting scrape results
//!
//! This module handles:
//! - Rendering records as tab-separated rows
//! - Printing failed URLs
//! - Summarizing batch statistics

pub mod stats;

pub use stats::{print_statistics, BatchStatistics};

use crate::extract::Row;
use crate::storage::Source;

/// Renders records as tab-separated lines under a header of field names
///
/// The first column is the record source. Tabs and line breaks inside
/// values are replaced with spaces so every record stays on one line.
pub fn render_rows(field_names: &[&str], rows: &[(Row, Source)]) -> String {
    let mut out = String::new();

    out.push_str("source");
    for name in field_names {
        out.push('\t');
        out.push_str(name);
    }
    out.push('\n');

    for (row, source) in rows {
        out.push_str(&flatten(&source.to_string()));
        for name in field_names {
            out.push('\t');
            if let Some(value) = row.get(name) {
                out.push_str(&flatten(&value.to_string()));
            }
        }
        out.push('\n');
    }

    out
}

/// Prints records to stdout as tab-separated rows
pub fn print_rows(field_names: &[&str], rows: &[(Row, Source)]) {
    print!("{}", render_rows(field_names, rows));
}

/// Prints the failed-URL queue, if any
pub fn print_failures(failed_urls: &[String]) {
    if failed_urls.is_empty() {
        return;
    }

    println!("\nFailed URLs ({}):", failed_urls.len());
    for url in failed_urls {
        println!("  - {}", url);
    }
}

fn flatten(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}
