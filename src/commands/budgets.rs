// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::aggregate::{
    load_year, month_status, AnnualReport, BudgetMonthPolicy, Cell, MonthKey, StatusSummary,
};
use crate::config::Session;
use crate::import::CategoryIndex;
use crate::models::NewBudget;
use crate::store::{DataStore, SqliteStore};
use crate::utils::{fmt_money, maybe_print_json, month_end, parse_decimal, parse_month, pretty_table};
use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn handle(store: &SqliteStore, session: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(store, session, sub)?,
        Some(("list", sub)) => list(store, session, sub)?,
        Some(("annual", sub)) => annual(store, session, sub)?,
        Some(("status", sub)) => status(store, session, sub)?,
        _ => {}
    }
    Ok(())
}

fn set(store: &SqliteStore, session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let month = parse_month(sub.get_one::<String>("month").unwrap())?;
    let cat = sub.get_one::<String>("category").unwrap();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    if amount <= Decimal::ZERO {
        bail!("Planned amount must be positive, got {}", amount);
    }

    let index = CategoryIndex::new(&store.fetch_categories(session)?);
    let parent = index
        .parent(cat)
        .ok_or_else(|| anyhow!("Category '{}' not found", cat.trim()))?;
    let child = match sub.get_one::<String>("subcategory") {
        Some(s) => Some(
            index
                .child(parent.id, s)
                .ok_or_else(|| anyhow!("'{}' is not a subcategory of '{}'", s.trim(), parent.name))?,
        ),
        None => None,
    };
    store.upsert_budgets(
        session,
        &[NewBudget {
            month,
            category_id: parent.id,
            subcategory_id: child.map(|c| c.id),
            planned_amount: amount,
        }],
    )?;
    let target = match child {
        Some(c) => format!("{} / {}", parent.name, c.name),
        None => parent.name.clone(),
    };
    println!(
        "Budget set for {} / {} = {}",
        MonthKey::of(month),
        target,
        fmt_money(&amount)
    );
    Ok(())
}

fn list(store: &SqliteStore, session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let (from, to) = match sub.get_one::<String>("month") {
        Some(m) => {
            let start = parse_month(m)?;
            (start, month_end(start))
        }
        None => (
            NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN),
            NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX),
        ),
    };
    let budgets = store.fetch_budgets(session, from, to)?;
    let data = budgets
        .iter()
        .map(|b| {
            vec![
                MonthKey::of(b.month).to_string(),
                b.category.name.clone(),
                b.subcategory.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
                fmt_money(&b.planned_amount),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Month", "Category", "Subcategory", "Planned"], data)
    );
    Ok(())
}

fn cell_text(cell: Cell) -> String {
    match cell {
        Cell::NoData => "-".to_string(),
        Cell::Figures(f) => format!(
            "{} / {} ({})",
            fmt_money(&f.actual),
            fmt_money(&f.planned),
            fmt_money(&f.variance)
        ),
    }
}

/// One table row per category, plus one per subcategory with `expand`.
pub fn annual_table_rows(report: &AnnualReport, expand: bool) -> Vec<Vec<String>> {
    let months = report.months();
    let mut rows = Vec::new();
    for cat in &report.rows {
        let mut row = vec![cat.name.clone()];
        row.extend(months.iter().map(|m| cell_text(cat.cell(*m))));
        rows.push(row);
        if expand {
            for s in cat.subcategories.iter().filter(|s| s.subcategory_id.is_some()) {
                let mut row = vec![format!("  {}", s.name)];
                row.extend(months.iter().map(|m| cell_text(s.cell(*m))));
                rows.push(row);
            }
        }
    }
    rows
}

/// JSON shape of one row: every month of the year is present and months
/// without data are `null`.
#[derive(Serialize)]
pub struct AnnualRowJson {
    pub category_id: i64,
    pub subcategory_id: Option<i64>,
    pub name: String,
    pub color: String,
    pub months: BTreeMap<MonthKey, Cell>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<AnnualRowJson>,
}

#[derive(Serialize)]
pub struct AnnualJson {
    pub year: i32,
    pub rows: Vec<AnnualRowJson>,
}

pub fn annual_json(report: &AnnualReport) -> AnnualJson {
    let months = report.months();
    let rows = report
        .rows
        .iter()
        .map(|cat| AnnualRowJson {
            category_id: cat.category_id,
            subcategory_id: None,
            name: cat.name.clone(),
            color: cat.color.clone(),
            months: months.iter().map(|m| (*m, cat.cell(*m))).collect(),
            subcategories: cat
                .subcategories
                .iter()
                .map(|s| AnnualRowJson {
                    category_id: s.category_id,
                    subcategory_id: s.subcategory_id,
                    name: s.name.clone(),
                    color: s.category_color.clone(),
                    months: months.iter().map(|m| (*m, s.cell(*m))).collect(),
                    subcategories: Vec::new(),
                })
                .collect(),
        })
        .collect();
    AnnualJson {
        year: report.year,
        rows,
    }
}

fn annual(store: &SqliteStore, session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let year = *sub.get_one::<i32>("year").unwrap();
    let policy = if sub.get_flag("rollover") {
        BudgetMonthPolicy::EndOfMonthRollover
    } else {
        BudgetMonthPolicy::Calendar
    };
    let report = load_year(store, session, year, policy)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &annual_json(&report))? {
        return Ok(());
    }
    if report.rows.is_empty() {
        println!("No budgets or categorized transactions in {}", year);
        return Ok(());
    }
    let labels: Vec<String> = report.months().iter().map(|m| m.to_string()).collect();
    let mut headers: Vec<&str> = vec!["Category"];
    headers.extend(labels.iter().map(String::as_str));
    println!(
        "{}",
        pretty_table(&headers, annual_table_rows(&report, sub.get_flag("expand")))
    );
    println!("Cells show actual / planned (variance); '-' means no data.");
    Ok(())
}

#[derive(Serialize)]
struct StatusReport {
    month: MonthKey,
    lines: Vec<crate::aggregate::StatusLine>,
    summary: StatusSummary,
}

fn status(store: &SqliteStore, session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let raw = sub.get_one::<String>("month").unwrap();
    let month: MonthKey = raw.parse().map_err(|e| anyhow!("{}", e))?;
    let report = load_year(store, session, month.year(), BudgetMonthPolicy::Calendar)?;
    let lines = month_status(&report, month);
    let summary = StatusSummary::from_lines(&lines);
    let out = StatusReport {
        month,
        lines,
        summary,
    };
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &out)? {
        return Ok(());
    }
    let rows = out
        .lines
        .iter()
        .map(|l| {
            vec![
                l.name.clone(),
                fmt_money(&l.planned),
                fmt_money(&l.actual),
                fmt_money(&l.variance),
                l.status.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Category", "Planned", "Actual", "Variance", "Status"], rows)
    );
    let s = out.summary;
    println!(
        "{}: {} over budget, {} near limit, {} under budget, {} on target, {} unbudgeted",
        out.month, s.over_budget, s.near_limit, s.under_budget, s.on_target, s.unbudgeted
    );
    Ok(())
}
