use std::io::BufRead;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to read batch input: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected 3 columns, found {found}")]
    Columns { line: usize, found: usize },
    #[error("line {line}: column {column} is not a number: {value:?}")]
    Number {
        line: usize,
        column: &'static str,
        value: String,
    },
}

/// One `label,daily_spam_count,deleted_gigabytes` input row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRow {
    pub line: usize,
    pub label: String,
    pub daily_spam_count: f64,
    pub deleted_gigabytes: f64,
}

fn parse_number(line: usize, column: &'static str, raw: &str) -> Result<f64, BatchError> {
    raw.parse().map_err(|_| BatchError::Number {
        line,
        column,
        value: raw.to_string(),
    })
}

// Simple CSV, no quoting or embedded commas.
pub fn parse_batch_row(line_no: usize, line: &str) -> Result<BatchRow, BatchError> {
    let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
    if parts.len() != 3 {
        return Err(BatchError::Columns {
            line: line_no,
            found: parts.len(),
        });
    }
    Ok(BatchRow {
        line: line_no,
        label: parts[0].to_string(),
        daily_spam_count: parse_number(line_no, "daily_spam_count", parts[1])?,
        deleted_gigabytes: parse_number(line_no, "deleted_gigabytes", parts[2])?,
    })
}

const HEADER: [&str; 3] = ["label", "daily_spam_count", "deleted_gigabytes"];

// A header either names the columns or has no numeric value at all.
fn is_header(line: &str) -> bool {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return false;
    }
    let named = parts
        .iter()
        .zip(HEADER)
        .all(|(p, h)| p.eq_ignore_ascii_case(h));
    named || parts[1..].iter().all(|p| p.parse::<f64>().is_err())
}

/// Reads all rows, skipping blanks, `#` comments and a leading header line.
pub fn read_batch<R: BufRead>(reader: R) -> Result<Vec<BatchRow>, BatchError> {
    let mut rows = Vec::new();
    let mut seen_data = false;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !seen_data {
            seen_data = true;
            if is_header(trimmed) {
                continue;
            }
        }
        rows.push(parse_batch_row(idx + 1, trimmed)?);
    }
    Ok(rows)
}
