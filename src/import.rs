// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Turning parsed rows into stored records.
//!
//! Transaction imports create any category or subcategory named in the file
//! that does not exist yet. Budget imports only reference existing ones.

use crate::config::Session;
use crate::error::{FormatError, ImportError, ImportFailure};
use crate::models::{
    Category, NewBudget, NewCategory, NewTransaction, CATEGORY_ICON, SUBCATEGORY_ICON,
};
use crate::parser::{parse_budgets, parse_transactions, ParsedBudget, ParsedTransaction};
use crate::store::DataStore;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

pub const CONFIDENCE_CATEGORIZED: u8 = 100;
pub const CONFIDENCE_UNCATEGORIZED: u8 = 85;

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Case-insensitive lookup over a user's categories.
#[derive(Debug, Default)]
pub struct CategoryIndex {
    parents: HashMap<String, Category>,
    children: HashMap<(i64, String), Category>,
}

impl CategoryIndex {
    pub fn new(categories: &[Category]) -> Self {
        let mut index = CategoryIndex::default();
        for c in categories {
            match c.parent_id {
                None => {
                    index.parents.entry(name_key(&c.name)).or_insert_with(|| c.clone());
                }
                Some(parent) => {
                    index
                        .children
                        .entry((parent, name_key(&c.name)))
                        .or_insert_with(|| c.clone());
                }
            }
        }
        index
    }

    pub fn parent(&self, name: &str) -> Option<&Category> {
        self.parents.get(&name_key(name))
    }

    pub fn child(&self, parent_id: i64, name: &str) -> Option<&Category> {
        self.children.get(&(parent_id, name_key(name)))
    }
}

/// Top-level categories the file names that the index does not know, once
/// each, in first-seen order.
pub fn missing_parents(
    index: &CategoryIndex,
    rows: &[ParsedTransaction],
    color: &str,
) -> Vec<NewCategory> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|r| r.category.as_deref())
        .filter(|name| index.parent(name).is_none())
        .filter(|name| seen.insert(name_key(name)))
        .map(|name| NewCategory {
            name: name.trim().to_string(),
            color: color.to_string(),
            icon: Some(CATEGORY_ICON.to_string()),
            parent_id: None,
        })
        .collect()
}

/// Subcategories missing under an already resolved parent. They take the
/// parent's color.
pub fn missing_children(index: &CategoryIndex, rows: &[ParsedTransaction]) -> Vec<NewCategory> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for r in rows {
        let (Some(cat), Some(sub)) = (r.category.as_deref(), r.subcategory.as_deref()) else {
            continue;
        };
        let Some(parent) = index.parent(cat) else {
            continue;
        };
        if index.child(parent.id, sub).is_some() || !seen.insert((parent.id, name_key(sub))) {
            continue;
        }
        out.push(NewCategory {
            name: sub.trim().to_string(),
            color: parent.color.clone(),
            icon: Some(SUBCATEGORY_ICON.to_string()),
            parent_id: Some(parent.id),
        });
    }
    out
}

/// Maps parsed rows onto category ids. Rows whose category text does not
/// resolve are kept uncategorized.
pub fn build_transactions(index: &CategoryIndex, rows: &[ParsedTransaction]) -> Vec<NewTransaction> {
    rows.iter()
        .map(|r| {
            let parent = r.category.as_deref().and_then(|c| index.parent(c));
            let child = match (parent, r.subcategory.as_deref()) {
                (Some(p), Some(sub)) => index.child(p.id, sub),
                _ => None,
            };
            NewTransaction {
                date: r.date,
                description: r.description.clone(),
                amount: r.amount,
                kind: r.kind,
                category_id: parent.map(|p| p.id),
                subcategory_id: child.map(|c| c.id),
                ai_confidence: Some(if parent.is_some() {
                    CONFIDENCE_CATEGORIZED
                } else {
                    CONFIDENCE_UNCATEGORIZED
                }),
                is_recurring: false,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub categories_created: usize,
    pub uncategorized: usize,
    #[serde(skip)]
    pub skipped: Vec<FormatError>,
}

/// Parse, resolve or create categories, then store the transactions.
///
/// Categories created before a failing insert stay in place.
pub fn import_transactions<S: DataStore + ?Sized>(
    store: &S,
    session: &Session,
    text: &str,
    default_color: &str,
) -> Result<ImportSummary, ImportError> {
    let outcome = parse_transactions(text)?;
    if outcome.rows.is_empty() {
        return Ok(ImportSummary::default());
    }

    let index = CategoryIndex::new(&store.fetch_categories(session)?);
    let parents = missing_parents(&index, &outcome.rows, default_color);
    let mut categories_created = store.upsert_categories(session, &parents)?.len();

    // Parents that lost an insert race still need their ids
    let index = CategoryIndex::new(&store.fetch_categories(session)?);
    let children = missing_children(&index, &outcome.rows);
    categories_created += store.upsert_categories(session, &children)?.len();

    let index = CategoryIndex::new(&store.fetch_categories(session)?);
    let records = build_transactions(&index, &outcome.rows);
    let uncategorized = records.iter().filter(|r| r.category_id.is_none()).count();
    let imported = store.insert_transactions(session, &records)?;

    info!(
        imported,
        categories_created,
        skipped = outcome.errors.len(),
        "imported transactions"
    );
    Ok(ImportSummary {
        imported,
        categories_created,
        uncategorized,
        skipped: outcome.errors,
    })
}

/// Resolves budget rows against existing categories. A row whose parent is
/// unknown becomes an error; an unknown subcategory falls back to the parent.
pub fn resolve_budgets(
    index: &CategoryIndex,
    rows: &[ParsedBudget],
) -> (Vec<NewBudget>, Vec<FormatError>) {
    let mut budgets = Vec::new();
    let mut errors = Vec::new();
    for r in rows {
        let Some(parent) = index.parent(&r.category) else {
            errors.push(FormatError::UnknownCategory {
                line: r.line,
                name: r.category.clone(),
            });
            continue;
        };
        let child = r.subcategory.as_deref().and_then(|s| {
            let found = index.child(parent.id, s);
            if found.is_none() {
                warn!(line = r.line, subcategory = s, "unknown subcategory, budgeting the parent");
            }
            found
        });
        budgets.push(NewBudget {
            month: r.month,
            category_id: parent.id,
            subcategory_id: child.map(|c| c.id),
            planned_amount: r.planned_amount,
        });
    }
    (budgets, errors)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BudgetImportSummary {
    pub imported: usize,
    #[serde(skip)]
    pub skipped: Vec<FormatError>,
}

pub fn import_budgets<S: DataStore + ?Sized>(
    store: &S,
    session: &Session,
    text: &str,
) -> Result<BudgetImportSummary, ImportError> {
    let outcome = parse_budgets(text)?;
    let index = CategoryIndex::new(&store.fetch_categories(session)?);
    let (budgets, unresolved) = resolve_budgets(&index, &outcome.rows);

    let mut skipped = outcome.errors;
    skipped.extend(unresolved);
    skipped.sort_by_key(FormatError::line);

    if budgets.is_empty() {
        if skipped.is_empty() {
            return Ok(BudgetImportSummary::default());
        }
        return Err(ImportFailure { errors: skipped }.into());
    }
    let imported = store.upsert_budgets(session, &budgets)?;
    info!(imported, skipped = skipped.len(), "imported budgets");
    Ok(BudgetImportSummary { imported, skipped })
}
