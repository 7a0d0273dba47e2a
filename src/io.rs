//! Two-column text output
//!
//! Rows are written as `<time> <phi>` under a fixed comment header, each
//! value printed with 15 significant digits in `%g` style (fixed notation
//! for moderate exponents, scientific otherwise, trailing zeros trimmed).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::error;
use thiserror::Error;

/// Header line written before the data rows
pub const HEADER: &str = "#time [s]        phi";

/// Significant digits used for every value
pub const PRECISION: usize = 15;

/// Errors from writing a table
#[derive(Debug, Error)]
pub enum OutputError {
    /// Columns do not have the same number of rows
    #[error("column lengths differ: {left} vs {right}")]
    LengthMismatch {
        /// Rows in the first column
        left: usize,
        /// Rows in the second column
        right: usize,
    },
    /// Underlying writer failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Format `value` like C's `%.{digits}g`
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    if !value.is_finite() {
        return if value.is_nan() {
            "nan".to_string()
        } else if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }

    let digits = digits.max(1);
    // Exponent after rounding to `digits` significant figures
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= digits as i32 {
        let mantissa = trim_fraction(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        let decimals = (digits as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Write two equal-length columns as a table
pub fn write_table<W: Write>(writer: &mut W, col1: &[f64], col2: &[f64]) -> Result<(), OutputError> {
    if col1.len() != col2.len() {
        return Err(OutputError::LengthMismatch {
            left: col1.len(),
            right: col2.len(),
        });
    }

    writeln!(writer, "{}", HEADER)?;
    for (a, b) in col1.iter().zip(col2) {
        writeln!(
            writer,
            "{} {}",
            format_significant(*a, PRECISION),
            format_significant(*b, PRECISION)
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write two columns to `path`, logging instead of failing.
///
/// Returns whether the table was written. Mismatched columns are rejected
/// before the file is created.
pub fn savetxt<P: AsRef<Path>>(path: P, col1: &[f64], col2: &[f64]) -> bool {
    let path = path.as_ref();
    match try_savetxt(path, col1, col2) {
        Ok(()) => true,
        Err(e) => {
            error!("Unable to write out to {}: {}", path.display(), e);
            false
        }
    }
}

fn try_savetxt(path: &Path, col1: &[f64], col2: &[f64]) -> Result<(), OutputError> {
    if col1.len() != col2.len() {
        return Err(OutputError::LengthMismatch {
            left: col1.len(),
            right: col2.len(),
        });
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write_table(&mut writer, col1, col2)
}
