// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::categories::default_color;
use crate::config::Session;
use crate::error::{FormatError, ImportFailure, MAX_ERROR_SAMPLES};
use crate::import::{import_budgets, import_transactions, BudgetImportSummary, ImportSummary};
use crate::store::SqliteStore;
use anyhow::{Context, Result};
use std::fs;

pub fn handle(store: &SqliteStore, session: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => {
            let summary = transactions_from_path(store, session, path_arg(sub))?;
            print_transactions_summary(&summary);
        }
        Some(("budgets", sub)) => {
            let summary = budgets_from_path(store, session, path_arg(sub))?;
            print_budgets_summary(&summary);
        }
        _ => {}
    }
    Ok(())
}

fn path_arg(sub: &clap::ArgMatches) -> &str {
    sub.get_one::<String>("path").unwrap().trim()
}

fn read_upload(path: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Open CSV {}", path))
}

pub fn transactions_from_path(
    store: &SqliteStore,
    session: &Session,
    path: &str,
) -> Result<ImportSummary> {
    let text = read_upload(path)?;
    let color = default_color(store, session)?;
    let summary = import_transactions(store, session, &text, &color)
        .with_context(|| format!("Import transactions from {}", path))?;
    Ok(summary)
}

pub fn budgets_from_path(
    store: &SqliteStore,
    session: &Session,
    path: &str,
) -> Result<BudgetImportSummary> {
    let text = read_upload(path)?;
    let summary = import_budgets(store, session, &text)
        .with_context(|| format!("Import budgets from {}", path))?;
    Ok(summary)
}

fn print_skipped(skipped: &[FormatError]) {
    if skipped.is_empty() {
        return;
    }
    // Same sampling as a failed import
    let report = ImportFailure {
        errors: skipped.to_vec(),
    };
    println!("Skipped {} row(s):", skipped.len());
    for e in report.samples() {
        println!("  - {}", e);
    }
    if skipped.len() > MAX_ERROR_SAMPLES {
        println!("  ... and {} more error(s)", report.remaining());
    }
}

fn print_transactions_summary(s: &ImportSummary) {
    println!("Imported {} transaction(s)", s.imported);
    if s.categories_created > 0 {
        println!("Created {} new categories", s.categories_created);
    }
    if s.uncategorized > 0 {
        println!("{} transaction(s) have no category", s.uncategorized);
    }
    print_skipped(&s.skipped);
}

fn print_budgets_summary(s: &BudgetImportSummary) {
    println!("Imported {} budget(s)", s.imported);
    print_skipped(&s.skipped);
}
