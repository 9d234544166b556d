// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::Session;
use crate::import::CategoryIndex;
use crate::models::{NewTransaction, Transaction, TransactionFilter, TransactionType};
use crate::store::{DataStore, SqliteStore};
use crate::utils::{fmt_money, maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{anyhow, bail, Result};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(store: &SqliteStore, session: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(store, session, sub)?,
        Some(("edit", sub)) => edit(store, session, sub)?,
        Some(("rm", sub)) => {
            let ids: Vec<i64> = sub.get_many::<i64>("ids").unwrap().copied().collect();
            let n = store.delete_transactions(session, &ids)?;
            if n == 0 {
                bail!("No transaction matched the given ids");
            }
            println!("Deleted {} transaction(s)", n);
        }
        Some(("recategorize", sub)) => {
            recategorize(store, session, sub)?;
        }
        Some(("list", sub)) => list(store, session, sub)?,
        _ => {}
    }
    Ok(())
}

/// Resolves `--category`/`--subcategory` names to ids. A subcategory given
/// alone is looked up among all subcategories.
fn resolve_names(
    index: &CategoryIndex,
    store: &SqliteStore,
    session: &Session,
    category: Option<&String>,
    subcategory: Option<&String>,
) -> Result<(Option<i64>, Option<i64>)> {
    let parent = category
        .map(|c| {
            index
                .parent(c)
                .ok_or_else(|| anyhow!("Category '{}' not found", c.trim()))
        })
        .transpose()?;
    let child = match (subcategory, parent) {
        (Some(s), Some(p)) => Some(
            index
                .child(p.id, s)
                .ok_or_else(|| anyhow!("'{}' is not a subcategory of '{}'", s.trim(), p.name))?
                .id,
        ),
        (Some(s), None) => {
            let found = store.find_category(session, s)?;
            if found.is_top_level() {
                bail!("'{}' is a top-level category, use --category", found.name);
            }
            Some(found.id)
        }
        (None, _) => None,
    };
    Ok((parent.map(|p| p.id), child))
}

fn add(store: &SqliteStore, session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let description = sub.get_one::<String>("description").unwrap().trim().to_string();
    let signed = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let category = sub.get_one::<String>("category");
    let subcategory = sub.get_one::<String>("subcategory");
    if subcategory.is_some() && category.is_none() {
        bail!("--subcategory needs --category");
    }

    let index = CategoryIndex::new(&store.fetch_categories(session)?);
    let (category_id, subcategory_id) =
        resolve_names(&index, store, session, category, subcategory)?;
    let row = NewTransaction {
        date,
        description: description.clone(),
        amount: signed.abs(),
        kind: TransactionType::from_signed(signed),
        category_id,
        subcategory_id,
        ai_confidence: None,
        is_recurring: sub.get_flag("recurring"),
    };
    store.insert_transactions(session, &[row])?;
    println!("Recorded {} on {} '{}'", fmt_money(&signed), date, description);
    Ok(())
}

fn edit(store: &SqliteStore, session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let current = store.fetch_transaction(session, id)?;
    let mut row = NewTransaction {
        date: current.date,
        description: current.description.clone(),
        amount: current.amount,
        kind: current.kind,
        category_id: current.category_id,
        subcategory_id: current.subcategory_id,
        ai_confidence: current.ai_confidence,
        is_recurring: current.is_recurring,
    };

    if let Some(d) = sub.get_one::<String>("date") {
        row.date = parse_date(d)?;
    }
    if let Some(text) = sub.get_one::<String>("description") {
        if text.trim().is_empty() {
            bail!("Description cannot be empty");
        }
        row.description = text.trim().to_string();
    }
    if let Some(raw) = sub.get_one::<String>("amount") {
        let signed = parse_decimal(raw)?;
        row.amount = signed.abs();
        row.kind = TransactionType::from_signed(signed);
    }
    if let Some(flag) = sub.get_one::<bool>("recurring") {
        row.is_recurring = *flag;
    }

    let category = sub.get_one::<String>("category");
    let subcategory = sub.get_one::<String>("subcategory");
    if sub.get_flag("uncategorize") {
        row.category_id = None;
        row.subcategory_id = None;
    } else if category.is_some() || subcategory.is_some() {
        let index = CategoryIndex::new(&store.fetch_categories(session)?);
        let category_id = match category {
            Some(c) => {
                index
                    .parent(c)
                    .ok_or_else(|| anyhow!("Category '{}' not found", c.trim()))?
                    .id
            }
            None => row
                .category_id
                .ok_or_else(|| anyhow!("Transaction {} has no category, pass --category", id))?,
        };
        row.subcategory_id = match subcategory {
            Some(s) => Some(
                index
                    .child(category_id, s)
                    .ok_or_else(|| anyhow!("'{}' is not a subcategory of the chosen category", s.trim()))?
                    .id,
            ),
            // Moving to another category drops the old subcategory
            None if Some(category_id) != row.category_id => None,
            None => row.subcategory_id,
        };
        row.category_id = Some(category_id);
    }

    store.update_transaction(session, id, &row)?;
    println!("Updated transaction {}", id);
    Ok(())
}

/// Applies one category/subcategory pair to the transactions named by
/// `--ids` or, without ids, to everything the filter flags match.
pub fn recategorize(store: &SqliteStore, session: &Session, sub: &clap::ArgMatches) -> Result<usize> {
    let index = CategoryIndex::new(&store.fetch_categories(session)?);
    let (category_id, subcategory_id) = resolve_names(
        &index,
        store,
        session,
        sub.get_one::<String>("set-category"),
        sub.get_one::<String>("set-subcategory"),
    )?;

    let ids: Vec<i64> = match sub.get_many::<i64>("ids") {
        Some(ids) => ids.copied().collect(),
        None => {
            let filter = filter_from_args(store, session, sub)?;
            if filter == TransactionFilter::default() {
                bail!("Give --ids or at least one filter");
            }
            store
                .fetch_transactions(session, &filter)?
                .iter()
                .map(|t| t.id)
                .collect()
        }
    };
    let n = store.recategorize_transactions(session, &ids, category_id, subcategory_id)?;
    println!("Recategorized {} transaction(s)", n);
    Ok(n)
}

/// Builds a [`TransactionFilter`] from the shared filter flags of `tx list`
/// and `export transactions`.
pub fn filter_from_args(
    store: &SqliteStore,
    session: &Session,
    sub: &clap::ArgMatches,
) -> Result<TransactionFilter> {
    let category = sub.get_one::<String>("category");
    let subcategory = sub.get_one::<String>("subcategory");
    let (category_id, subcategory_id) = if category.is_some() || subcategory.is_some() {
        let index = CategoryIndex::new(&store.fetch_categories(session)?);
        resolve_names(&index, store, session, category, subcategory)?
    } else {
        (None, None)
    };
    Ok(TransactionFilter {
        date_from: sub.get_one::<String>("from").map(|s| parse_date(s)).transpose()?,
        date_to: sub.get_one::<String>("to").map(|s| parse_date(s)).transpose()?,
        amount_min: sub.get_one::<String>("min").map(|s| parse_decimal(s)).transpose()?,
        amount_max: sub.get_one::<String>("max").map(|s| parse_decimal(s)).transpose()?,
        category_id,
        subcategory_id,
        description: sub
            .get_one::<String>("search")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        kind: sub
            .get_one::<String>("type")
            .map(|s| s.parse::<TransactionType>().map_err(|e| anyhow!(e)))
            .transpose()?,
        limit: sub.get_one::<usize>("limit").copied(),
    })
}

/// Flat, display-ready view of a stored transaction. `amount` carries the
/// sign again.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub description: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub subcategory: String,
    pub recurring: bool,
}

impl From<&Transaction> for TransactionRow {
    fn from(t: &Transaction) -> Self {
        TransactionRow {
            id: t.id,
            date: t.date.to_string(),
            description: t.description.clone(),
            amount: t.signed_amount(),
            kind: t.kind,
            category: t.category.as_ref().map(|c| c.name.clone()).unwrap_or_default(),
            subcategory: t
                .subcategory
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            recurring: t.is_recurring,
        }
    }
}

pub fn query_rows(
    store: &SqliteStore,
    session: &Session,
    sub: &clap::ArgMatches,
) -> Result<Vec<TransactionRow>> {
    let filter = filter_from_args(store, session, sub)?;
    Ok(store
        .fetch_transactions(session, &filter)?
        .iter()
        .map(TransactionRow::from)
        .collect())
}

fn list(store: &SqliteStore, session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(store, session, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.description.clone(),
                    fmt_money(&r.amount),
                    r.kind.to_string(),
                    r.category.clone(),
                    r.subcategory.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Description", "Amount", "Type", "Category", "Subcategory"],
                rows,
            )
        );
    }
    Ok(())
}
