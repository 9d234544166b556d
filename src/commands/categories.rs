// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::{Session, CATEGORY_COLOR_KEY};
use crate::models::{Category, NewCategory, DEFAULT_CATEGORY_COLOR};
use crate::store::{DataStore, SqliteStore};
use crate::utils::{compare_names, maybe_print_json, pretty_table};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;

pub fn handle(store: &SqliteStore, session: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(store, session, sub)?,
        Some(("edit", sub)) => edit(store, session, sub)?,
        Some(("list", sub)) => list(store, session, sub)?,
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            if store.delete_category(session, name)? == 0 {
                bail!("Category '{}' not found", name.trim());
            }
            println!("Removed category '{}'", name.trim());
        }
        _ => {}
    }
    Ok(())
}

/// Color for categories created without an explicit one.
pub fn default_color(store: &SqliteStore, session: &Session) -> Result<String> {
    Ok(store
        .setting(session, CATEGORY_COLOR_KEY)?
        .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()))
}

fn add(store: &SqliteStore, session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim();
    if name.is_empty() {
        bail!("Category name cannot be empty");
    }
    let parent = match sub.get_one::<String>("parent") {
        Some(p) => {
            let parent = store.find_category(session, p)?;
            if !parent.is_top_level() {
                bail!("'{}' is a subcategory and cannot have children", parent.name);
            }
            Some(parent)
        }
        None => None,
    };
    let color = match (sub.get_one::<String>("color"), &parent) {
        (Some(c), _) => c.trim().to_string(),
        (None, Some(p)) => p.color.clone(),
        (None, None) => default_color(store, session)?,
    };
    let row = NewCategory {
        name: name.to_string(),
        color,
        icon: sub.get_one::<String>("icon").cloned(),
        parent_id: parent.as_ref().map(|p| p.id),
    };
    store
        .create_category(session, &row)
        .with_context(|| format!("Add category '{}'", name))?;
    match parent {
        Some(p) => println!("Added subcategory '{}' under '{}'", name, p.name),
        None => println!("Added category '{}'", name),
    }
    Ok(())
}

fn edit(store: &SqliteStore, session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let current = store.find_category(session, sub.get_one::<String>("name").unwrap())?;
    let name = match sub.get_one::<String>("rename") {
        Some(n) if n.trim().is_empty() => bail!("Category name cannot be empty"),
        Some(n) => n.trim().to_string(),
        None => current.name.clone(),
    };
    let row = NewCategory {
        name,
        color: sub
            .get_one::<String>("color")
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| current.color.clone()),
        icon: sub.get_one::<String>("icon").cloned().or_else(|| current.icon.clone()),
        parent_id: current.parent_id,
    };
    let updated = store
        .update_category(session, current.id, &row)
        .with_context(|| format!("Edit category '{}'", current.name))?;
    println!("Updated category '{}'", updated.name);
    Ok(())
}

/// Parents first, each followed by its children, names in display order.
pub fn tree_order(categories: &[Category]) -> Vec<(&Category, Option<&Category>)> {
    let mut children: HashMap<i64, Vec<&Category>> = HashMap::new();
    let mut parents: Vec<&Category> = Vec::new();
    for c in categories {
        match c.parent_id {
            Some(pid) => children.entry(pid).or_default().push(c),
            None => parents.push(c),
        }
    }
    parents.sort_by(|a, b| compare_names(&a.name, &b.name));

    let mut out = Vec::with_capacity(categories.len());
    for p in parents {
        out.push((p, None));
        if let Some(kids) = children.get_mut(&p.id) {
            kids.sort_by(|a, b| compare_names(&a.name, &b.name));
            out.extend(kids.iter().map(|k| (*k, Some(p))));
        }
    }
    out
}

fn list(store: &SqliteStore, session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let categories = store.fetch_categories(session)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &categories)? {
        return Ok(());
    }
    let rows = tree_order(&categories)
        .into_iter()
        .map(|(c, parent)| {
            vec![
                c.icon.clone().unwrap_or_default(),
                c.name.clone(),
                parent.map(|p| p.name.clone()).unwrap_or_default(),
                c.color.clone(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["", "Category", "Parent", "Color"], rows)
    );
    Ok(())
}
