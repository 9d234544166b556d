// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Statement and budget CSV parsing.
//!
//! Files come from many banks and spreadsheet exports, so the parser detects
//! `,` vs `;` from the header, skips blank and `#` lines, and keeps going past
//! bad rows. A file only fails outright when no row at all could be read.

use crate::error::{FormatError, ImportFailure};
use crate::models::TransactionType;
use crate::utils::{month_start, parse_statement_amount, parse_statement_date};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

pub const TRANSACTION_MIN_COLUMNS: usize = 3;
pub const BUDGET_MIN_COLUMNS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionType,
    pub category: Option<String>,
    pub subcategory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedBudget {
    pub line: usize,
    pub month: NaiveDate,
    pub category: String,
    pub subcategory: Option<String>,
    pub planned_amount: Decimal,
}

/// Rows that parsed plus the rows that did not.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome<T> {
    pub rows: Vec<T>,
    pub errors: Vec<FormatError>,
}

impl<T> ParseOutcome<T> {
    fn empty() -> Self {
        ParseOutcome {
            rows: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn skipped(&self) -> usize {
        self.errors.len()
    }
}

pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// `;` wins only when the header has strictly more of them than commas.
pub fn detect_delimiter(header: &str) -> u8 {
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas { b';' } else { b',' }
}

/// Splits one line on `delimiter`. Every `"` toggles quoting and is dropped,
/// so a quoted field may contain the delimiter and may follow leading
/// whitespace (`a, "b, c", d`). Fields are trimmed.
pub fn split_row(line: &str, delimiter: u8) -> Vec<String> {
    let delimiter = delimiter as char;
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn is_content(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && !t.starts_with('#')
}

/// Drives `convert` over every data row. The header is line 1 and is dropped.
/// Data rows are numbered by their position in the file relative to the
/// header, so skipped blank and `#` lines still count.
pub fn parse_rows<T, F>(
    text: &str,
    min_columns: usize,
    mut convert: F,
) -> Result<ParseOutcome<T>, ImportFailure>
where
    F: FnMut(usize, &[String]) -> Result<T, FormatError>,
{
    let mut lines = strip_bom(text).lines().enumerate().filter(|(_, l)| is_content(l));
    let Some((header_idx, header)) = lines.next() else {
        return Ok(ParseOutcome::empty());
    };
    let delimiter = detect_delimiter(header);
    debug!(delimiter = %(delimiter as char), "detected delimiter");

    let mut outcome = ParseOutcome::empty();
    for (idx, raw) in lines {
        let line = idx - header_idx + 1;
        let fields = split_row(raw, delimiter);
        let parsed = if fields.len() < min_columns {
            Err(FormatError::TooFewColumns {
                line,
                expected: min_columns,
                found: fields.len(),
            })
        } else {
            convert(line, &fields)
        };
        match parsed {
            Ok(row) => outcome.rows.push(row),
            Err(e) => {
                warn!(error = %e, "skipping row");
                outcome.errors.push(e);
            }
        }
    }

    if outcome.rows.is_empty() && !outcome.errors.is_empty() {
        return Err(ImportFailure {
            errors: outcome.errors,
        });
    }
    Ok(outcome)
}

fn optional(field: Option<&String>) -> Option<String> {
    field
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn date_field(line: usize, raw: &str) -> Result<NaiveDate, FormatError> {
    parse_statement_date(raw).ok_or_else(|| FormatError::InvalidDate {
        line,
        raw: raw.to_string(),
    })
}

fn amount_field(line: usize, raw: &str) -> Result<Decimal, FormatError> {
    parse_statement_amount(raw).ok_or_else(|| FormatError::InvalidAmount {
        line,
        raw: raw.to_string(),
    })
}

fn transaction_row(line: usize, fields: &[String]) -> Result<ParsedTransaction, FormatError> {
    let date = date_field(line, &fields[0])?;
    let signed = amount_field(line, &fields[2])?;
    Ok(ParsedTransaction {
        date,
        description: fields[1].clone(),
        amount: signed.abs(),
        kind: TransactionType::from_signed(signed),
        category: optional(fields.get(3)),
        subcategory: optional(fields.get(4)),
    })
}

fn budget_row(line: usize, fields: &[String]) -> Result<ParsedBudget, FormatError> {
    let month = month_start(date_field(line, &fields[0])?);
    let category = optional(fields.get(1)).ok_or_else(|| FormatError::Malformed {
        line,
        message: "missing parent category".into(),
    })?;
    let planned_amount = amount_field(line, &fields[3])?;
    if planned_amount <= Decimal::ZERO {
        return Err(FormatError::NonPositiveAmount {
            line,
            raw: fields[3].clone(),
        });
    }
    Ok(ParsedBudget {
        line,
        month,
        category,
        subcategory: optional(fields.get(2)),
        planned_amount,
    })
}

/// `[date, description, amount, category?, subcategory?]`
pub fn parse_transactions(text: &str) -> Result<ParseOutcome<ParsedTransaction>, ImportFailure> {
    parse_rows(text, TRANSACTION_MIN_COLUMNS, transaction_row)
}

/// `[month, parent category, subcategory, planned amount]`
pub fn parse_budgets(text: &str) -> Result<ParseOutcome<ParsedBudget>, ImportFailure> {
    parse_rows(text, BUDGET_MIN_COLUMNS, budget_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn delimiter_follows_the_header() {
        assert_eq!(detect_delimiter("date,description,amount,category"), b',');
        assert_eq!(detect_delimiter("month;parent;child;planned;note"), b';');
        assert_eq!(detect_delimiter("a;b,c"), b',');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn quoted_field_keeps_embedded_delimiter() {
        let fields = split_row(r#"2025-01-03,"Restaurant, Downtown",-42.10"#, b',');
        assert_eq!(fields, vec!["2025-01-03", "Restaurant, Downtown", "-42.10"]);
    }

    #[test]
    fn quoted_field_after_a_space_stays_whole() {
        let fields = split_row(r#"2025-01-03, "Restaurant, Downtown", -42.10"#, b',');
        assert_eq!(fields, vec!["2025-01-03", "Restaurant, Downtown", "-42.10"]);

        let text = "date, description, amount\n2025-01-03, \"Restaurant, Downtown\", -42.10\n";
        let out = parse_transactions(text).unwrap();
        assert!(out.errors.is_empty());
        assert_eq!(out.rows[0].description, "Restaurant, Downtown");
        assert_eq!(out.rows[0].amount, dec("42.10"));
    }

    #[test]
    fn semicolon_split_ignores_commas_and_quoted_semicolons() {
        let fields = split_row(r#"15/01/2025;"Loja; Centro";-1.250,00"#, b';');
        assert_eq!(fields, vec!["15/01/2025", "Loja; Centro", "-1.250,00"]);
    }

    #[test]
    fn line_numbers_count_skipped_lines_after_the_header() {
        let text = "# note\nheader,b,c\n\n2025-01-01,ok,1\n# aside\nbad,b,2\n";
        let out = parse_transactions(text).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(
            out.errors,
            vec![FormatError::InvalidDate {
                line: 5,
                raw: "bad".into()
            }]
        );
    }

    #[test]
    fn semicolon_rows_allow_comma_decimals() {
        let text = "data;descricao;valor\n15/01/2025;Mercado;-250,00\n20/01/2025;Salario;3.500,00\n";
        let out = parse_transactions(text).unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].date, ymd(2025, 1, 15));
        assert_eq!(out.rows[0].amount, dec("250"));
        assert_eq!(out.rows[0].kind, TransactionType::Expense);
        assert_eq!(out.rows[1].amount, dec("3500"));
        assert_eq!(out.rows[1].kind, TransactionType::Income);
    }

    #[test]
    fn bom_comment_and_blank_lines_are_skipped() {
        let text = "\u{feff}# use negative values for expenses\ndate,description,amount,category,subcategory\n\n2025-01-15,Shop,-10.00,Food,Groceries\n   \n2025-01-16,Pay,100,,\n";
        let out = parse_transactions(text).unwrap();
        assert_eq!(out.skipped(), 0);
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].category.as_deref(), Some("Food"));
        assert_eq!(out.rows[0].subcategory.as_deref(), Some("Groceries"));
        assert_eq!(out.rows[1].category, None);
        assert_eq!(out.rows[1].subcategory, None);
    }

    #[test]
    fn bad_rows_are_collected_not_fatal() {
        let mut text = String::from("date,description,amount\n");
        for i in 1..=10 {
            let row = match i {
                3 => "2025-02-30,Bad date,-1.00".to_string(),
                7 => "2025-01-07,Bad amount,twelve".to_string(),
                _ => format!("2025-01-{:02},Row {},-{}.00", i, i, i),
            };
            text.push_str(&row);
            text.push('\n');
        }
        let out = parse_transactions(&text).unwrap();
        assert_eq!(out.rows.len(), 8);
        assert_eq!(out.skipped(), 2);
        assert_eq!(
            out.errors[0],
            FormatError::InvalidDate {
                line: 4,
                raw: "2025-02-30".into()
            }
        );
        assert_eq!(
            out.errors[1],
            FormatError::InvalidAmount {
                line: 8,
                raw: "twelve".into()
            }
        );
        assert_eq!(out.rows[2].description, "Row 4");
    }

    #[test]
    fn all_rows_bad_is_an_import_failure() {
        let mut text = String::from("date,description,amount\n");
        for i in 0..7 {
            text.push_str(&format!("not-a-date,Row {},1.00\n", i));
        }
        let failure = parse_transactions(&text).unwrap_err();
        assert_eq!(failure.errors.len(), 7);
        assert_eq!(failure.samples().len(), 5);
        assert_eq!(failure.remaining(), 2);
    }

    #[test]
    fn short_rows_report_their_line() {
        let text = "date,description,amount\n2025-01-01,Only two\n2025-01-02,Fine,5\n";
        let out = parse_transactions(text).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(
            out.errors,
            vec![FormatError::TooFewColumns {
                line: 2,
                expected: 3,
                found: 2
            }]
        );
    }

    #[test]
    fn header_only_or_empty_input_yields_nothing() {
        assert!(parse_transactions("").unwrap().rows.is_empty());
        let out = parse_transactions("date,description,amount\n").unwrap();
        assert!(out.rows.is_empty());
        assert!(out.errors.is_empty());
    }

    #[test]
    fn budget_rows_snap_to_month_start_and_need_positive_amounts() {
        let text = "# dates DD/MM/YYYY\nmes;pai;filho;valor\n15/01/2025;Housing;Rent;1.500,00\n01/02/2025;Food;;800,00\n01/03/2025;Food;Market;0\n";
        let out = parse_budgets(text).unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].month, ymd(2025, 1, 1));
        assert_eq!(out.rows[0].planned_amount, dec("1500"));
        assert_eq!(out.rows[1].subcategory, None);
        assert_eq!(
            out.errors,
            vec![FormatError::NonPositiveAmount {
                line: 4,
                raw: "0".into()
            }]
        );
    }
}
