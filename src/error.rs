// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use thiserror::Error;

/// How many row errors an [`ImportFailure`] spells out before summarising.
pub const MAX_ERROR_SAMPLES: usize = 5;

/// A single row or field that could not be parsed. Line numbers count the
/// header as line 1, with blank and `#` lines left out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("line {line}: invalid date '{raw}', expected DD/MM/YYYY or YYYY-MM-DD")]
    InvalidDate { line: usize, raw: String },

    #[error("line {line}: invalid amount '{raw}'")]
    InvalidAmount { line: usize, raw: String },

    #[error("line {line}: planned amount '{raw}' must be positive")]
    NonPositiveAmount { line: usize, raw: String },

    #[error("line {line}: expected at least {expected} columns, found {found}")]
    TooFewColumns {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: unknown category '{name}'")]
    UnknownCategory { line: usize, name: String },

    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
}

impl FormatError {
    pub fn line(&self) -> usize {
        match self {
            FormatError::InvalidDate { line, .. }
            | FormatError::InvalidAmount { line, .. }
            | FormatError::NonPositiveAmount { line, .. }
            | FormatError::TooFewColumns { line, .. }
            | FormatError::UnknownCategory { line, .. }
            | FormatError::Malformed { line, .. } => *line,
        }
    }
}

/// Nothing usable came out of a file that had at least one bad row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub errors: Vec<FormatError>,
}

impl ImportFailure {
    pub fn samples(&self) -> &[FormatError] {
        &self.errors[..self.errors.len().min(MAX_ERROR_SAMPLES)]
    }

    pub fn remaining(&self) -> usize {
        self.errors.len().saturating_sub(MAX_ERROR_SAMPLES)
    }
}

impl fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No valid rows found")?;
        for e in self.samples() {
            write!(f, "\n  - {}", e)?;
        }
        if self.remaining() > 0 {
            write!(f, "\n  ... and {} more error(s)", self.remaining())?;
        }
        Ok(())
    }
}

impl std::error::Error for ImportFailure {}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Category '{0}' not found")]
    CategoryNotFound(String),

    #[error("Transaction {0} not found")]
    TransactionNotFound(i64),

    #[error("Invalid stored value '{value}' in {column}")]
    Corrupt { column: &'static str, value: String },

    #[error("Negative amount {0} cannot be stored, use the transaction type for the sign")]
    NegativeAmount(rust_decimal::Decimal),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Failure(#[from] ImportFailure),

    #[error(transparent)]
    Store(#[from] StoreError),
}
