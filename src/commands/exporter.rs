// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::transactions::{filter_from_args, TransactionRow};
use crate::config::Session;
use crate::models::TransactionFilter;
use crate::store::{DataStore, SqliteStore};
use crate::template::TRANSACTION_HEADERS;
use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv { delimiter: u8 },
    Json,
}

impl ExportFormat {
    pub fn parse(format: &str, delimiter: &str) -> Result<Self> {
        match format.trim().to_lowercase().as_str() {
            "csv" => {
                let delimiter = match delimiter {
                    "," => b',',
                    ";" => b';',
                    other => bail!("Unsupported delimiter '{}' (use , or ;)", other),
                };
                Ok(ExportFormat::Csv { delimiter })
            }
            "json" => Ok(ExportFormat::Json),
            other => bail!("Unknown format: {} (use csv|json)", other),
        }
    }
}

pub fn handle(store: &SqliteStore, session: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => {
            let format = ExportFormat::parse(
                sub.get_one::<String>("format").unwrap(),
                sub.get_one::<String>("delimiter").unwrap(),
            )?;
            let out = sub.get_one::<String>("out").unwrap();
            let filter = filter_from_args(store, session, sub)?;
            let n = export_transactions(store, session, &filter, format, Path::new(out))?;
            println!("Exported {} transaction(s) to {}", n, out);
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Writes the filtered transactions oldest first. CSV output has the import
/// columns with signed amounts, so it can be imported again.
pub fn export_transactions(
    store: &SqliteStore,
    session: &Session,
    filter: &TransactionFilter,
    format: ExportFormat,
    out: &Path,
) -> Result<usize> {
    let mut rows: Vec<TransactionRow> = store
        .fetch_transactions(session, filter)?
        .iter()
        .map(TransactionRow::from)
        .collect();
    rows.reverse();

    match format {
        ExportFormat::Csv { delimiter } => {
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_path(out)
                .with_context(|| format!("Create {}", out.display()))?;
            wtr.write_record(TRANSACTION_HEADERS)?;
            for r in &rows {
                let amount = r.amount.to_string();
                wtr.write_record([
                    r.date.as_str(),
                    r.description.as_str(),
                    amount.as_str(),
                    r.category.as_str(),
                    r.subcategory.as_str(),
                ])?;
            }
            wtr.flush()?;
        }
        ExportFormat::Json => {
            std::fs::write(out, serde_json::to_string_pretty(&rows)?)
                .with_context(|| format!("Write {}", out.display()))?;
        }
    }
    info!(count = rows.len(), path = %out.display(), "exported transactions");
    Ok(rows.len())
}
