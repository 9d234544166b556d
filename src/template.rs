// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Example upload files users can fill in.

pub const BOM: char = '\u{feff}';

pub const TRANSACTION_HEADERS: [&str; 5] =
    ["date", "description", "amount", "category", "subcategory"];
pub const BUDGET_HEADERS: [&str; 4] = ["month", "parent category", "subcategory", "planned amount"];

pub fn transaction_template() -> String {
    [
        "# IMPORTANT: use NEGATIVE amounts for expenses (e.g. -250.00) and POSITIVE amounts for income (e.g. 3500.00)".to_string(),
        TRANSACTION_HEADERS.join(","),
        "2025-01-15,Supermarket XYZ,-250.00,Food,Groceries".to_string(),
        "2025-01-20,Monthly salary,3500.00,Income,".to_string(),
    ]
    .join("\n")
}

pub fn budget_template() -> String {
    let rows = [
        ["01/01/2025", "Housing", "Rent", "1500,00"],
        ["01/01/2025", "Housing", "Electricity", "150,00"],
        ["01/01/2025", "Food", "Groceries", "800,00"],
        ["01/01/2025", "Transport", "Fuel", "300,00"],
    ];
    let mut lines = vec![
        "# IMPORTANT: dates as DD/MM/YYYY, positive amounts, comma as decimal separator, UTF-8".to_string(),
        BUDGET_HEADERS.join(";"),
    ];
    lines.extend(rows.iter().map(|r| r.join(";")));
    lines.join("\n")
}

/// Spreadsheet apps need the BOM to open the file as UTF-8.
pub fn with_bom(content: &str) -> String {
    let mut s = String::with_capacity(content.len() + BOM.len_utf8());
    s.push(BOM);
    s.push_str(content);
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use crate::parser::{parse_budgets, parse_transactions};

    #[test]
    fn transaction_template_parses_cleanly() {
        let out = parse_transactions(&with_bom(&transaction_template())).unwrap();
        assert!(out.errors.is_empty());
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].kind, TransactionType::Expense);
        assert_eq!(out.rows[1].kind, TransactionType::Income);
        assert_eq!(out.rows[1].subcategory, None);
    }

    #[test]
    fn budget_template_parses_cleanly() {
        let out = parse_budgets(&with_bom(&budget_template())).unwrap();
        assert!(out.errors.is_empty());
        assert_eq!(out.rows.len(), 4);
        assert_eq!(out.rows[0].month.to_string(), "2025-01-01");
        assert_eq!(out.rows[0].planned_amount.to_string(), "1500.00");
    }
}
