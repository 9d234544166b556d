// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use finflow::config::{Session, CATEGORY_COLOR_KEY};
use finflow::error::FormatError;
use finflow::models::TransactionFilter;
use finflow::store::{DataStore, SqliteStore};
use finflow::{cli, commands::importer};
use std::io::Write;
use tempfile::NamedTempFile;

const STATEMENT: &str = "\u{feff}# negative amounts are expenses
date,description,amount,category,subcategory
2025-01-15,Supermarket,-250.00,Food,Groceries
2025-01-20,Salary,3500.00,Income,
2025-01-22,Bakery,-12.50,food,Bakery
2025-01-23,Unknown shop,-5.00,,
";

fn csv_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file.flush().unwrap();
    file
}

fn count(store: &SqliteStore, table: &str) -> i64 {
    store
        .conn()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

#[test]
fn importer_trims_cli_path_argument() {
    let store = SqliteStore::open_in_memory().unwrap();
    let session = Session::new("local");
    let file = csv_file(STATEMENT);

    let padded = format!("  {}  ", file.path().to_str().unwrap());
    let matches =
        cli::build_cli().get_matches_from(["finflow", "import", "transactions", "--path", &padded]);
    if let Some(("import", import_m)) = matches.subcommand() {
        importer::handle(&store, &session, import_m).unwrap();
    } else {
        panic!("no import subcommand");
    }

    assert_eq!(count(&store, "transactions"), 4);
}

#[test]
fn import_creates_parents_then_children() {
    let store = SqliteStore::open_in_memory().unwrap();
    let session = Session::new("local");
    let file = csv_file(STATEMENT);

    let summary =
        importer::transactions_from_path(&store, &session, file.path().to_str().unwrap()).unwrap();
    assert_eq!(summary.imported, 4);
    assert_eq!(summary.categories_created, 4);
    assert_eq!(summary.uncategorized, 1);
    assert!(summary.skipped.is_empty());

    let cats = store.fetch_categories(&session).unwrap();
    let food = cats.iter().find(|c| c.name == "Food").unwrap();
    let groceries = cats.iter().find(|c| c.name == "Groceries").unwrap();
    let bakery = cats.iter().find(|c| c.name == "Bakery").unwrap();
    assert!(food.is_top_level());
    assert_eq!(groceries.parent_id, Some(food.id));
    assert_eq!(bakery.parent_id, Some(food.id));
    assert_eq!(groceries.color, food.color);

    let txs = store
        .fetch_transactions(&session, &TransactionFilter::default())
        .unwrap();
    let bakery_tx = txs.iter().find(|t| t.description == "Bakery").unwrap();
    assert_eq!(bakery_tx.category_id, Some(food.id));
    assert_eq!(bakery_tx.subcategory_id, Some(bakery.id));
    assert_eq!(bakery_tx.ai_confidence, Some(100));
    let unknown = txs.iter().find(|t| t.description == "Unknown shop").unwrap();
    assert_eq!(unknown.category_id, None);
    assert_eq!(unknown.ai_confidence, Some(85));
}

#[test]
fn reimport_does_not_duplicate_categories() {
    let store = SqliteStore::open_in_memory().unwrap();
    let session = Session::new("local");
    let file = csv_file(STATEMENT);
    let path = file.path().to_str().unwrap();

    importer::transactions_from_path(&store, &session, path).unwrap();
    let again = importer::transactions_from_path(&store, &session, path).unwrap();

    assert_eq!(again.categories_created, 0);
    assert_eq!(count(&store, "categories"), 4);
    // Transactions have no natural key, so they do repeat
    assert_eq!(count(&store, "transactions"), 8);
}

#[test]
fn new_categories_use_the_configured_color() {
    let store = SqliteStore::open_in_memory().unwrap();
    let session = Session::new("local");
    store
        .set_setting(&session, CATEGORY_COLOR_KEY, "#22c55e")
        .unwrap();
    let file = csv_file("date,description,amount,category\n2025-03-01,Bus,-2.80,Transport\n");

    importer::transactions_from_path(&store, &session, file.path().to_str().unwrap()).unwrap();
    let cats = store.fetch_categories(&session).unwrap();
    assert_eq!(cats.len(), 1);
    assert_eq!(cats[0].color, "#22c55e");
}

#[test]
fn partial_failure_keeps_the_good_rows() {
    let store = SqliteStore::open_in_memory().unwrap();
    let session = Session::new("local");
    let file = csv_file(
        "data;descricao;valor\n15/01/2025;Mercado;-250,00\n31/02/2025;Bad;-1,00\n20/01/2025;Salario;2.555,18\n",
    );

    let summary =
        importer::transactions_from_path(&store, &session, file.path().to_str().unwrap()).unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(
        summary.skipped,
        vec![FormatError::InvalidDate {
            line: 3,
            raw: "31/02/2025".into()
        }]
    );

    let txs = store
        .fetch_transactions(&session, &TransactionFilter::default())
        .unwrap();
    let salary = txs.iter().find(|t| t.description == "Salario").unwrap();
    assert_eq!(salary.amount.to_string(), "2555.18");
}

#[test]
fn file_without_a_single_valid_row_fails() {
    let store = SqliteStore::open_in_memory().unwrap();
    let session = Session::new("local");
    let file = csv_file("date,description,amount\nnope,A,1\nnope,B,2\n");

    let err = importer::transactions_from_path(&store, &session, file.path().to_str().unwrap())
        .unwrap_err();
    let chain = format!("{:#}", err);
    assert!(chain.contains("No valid rows found"), "{}", chain);
    assert!(chain.contains("line 2: invalid date 'nope'"), "{}", chain);
    assert_eq!(count(&store, "transactions"), 0);
    assert_eq!(count(&store, "categories"), 0);
}

#[test]
fn imports_are_scoped_to_the_session_user() {
    let store = SqliteStore::open_in_memory().unwrap();
    let alice = Session::new("alice");
    let bob = Session::new("bob");
    let file = csv_file(STATEMENT);

    importer::transactions_from_path(&store, &alice, file.path().to_str().unwrap()).unwrap();
    assert!(store.fetch_categories(&bob).unwrap().is_empty());
    assert!(store
        .fetch_transactions(&bob, &TransactionFilter::default())
        .unwrap()
        .is_empty());

    // Bob gets his own copy of the same names
    let summary =
        importer::transactions_from_path(&store, &bob, file.path().to_str().unwrap()).unwrap();
    assert_eq!(summary.categories_created, 4);
}

#[test]
fn budget_import_resolves_existing_categories_only() {
    let store = SqliteStore::open_in_memory().unwrap();
    let session = Session::new("local");
    let statement = csv_file(STATEMENT);
    importer::transactions_from_path(&store, &session, statement.path().to_str().unwrap()).unwrap();

    let budgets = csv_file(
        "# DD/MM/YYYY\nmonth;parent;sub;planned\n01/01/2025;FOOD;groceries;800,00\n15/01/2025;Food;Snacks;100,00\n01/01/2025;Travel;Flights;500,00\n",
    );
    let summary =
        importer::budgets_from_path(&store, &session, budgets.path().to_str().unwrap()).unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(
        summary.skipped,
        vec![FormatError::UnknownCategory {
            line: 4,
            name: "Travel".into()
        }]
    );
    // No category is created by a budget import
    assert_eq!(count(&store, "categories"), 4);

    let jan = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let jan_end = chrono::NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let stored = store.fetch_budgets(&session, jan, jan_end).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|b| b.month == jan && b.category.name == "Food"));
    let groceries = stored.iter().find(|b| b.subcategory.is_some()).unwrap();
    assert_eq!(groceries.subcategory.as_ref().unwrap().name, "Groceries");
    assert_eq!(groceries.planned_amount.to_string(), "800.00");
    // Unknown subcategory fell back to the parent
    let parent_level = stored.iter().find(|b| b.subcategory.is_none()).unwrap();
    assert_eq!(parent_level.planned_amount.to_string(), "100.00");
}

#[test]
fn budget_reimport_replaces_planned_amounts() {
    let store = SqliteStore::open_in_memory().unwrap();
    let session = Session::new("local");
    let statement = csv_file(STATEMENT);
    importer::transactions_from_path(&store, &session, statement.path().to_str().unwrap()).unwrap();

    let first = csv_file("m;p;s;v\n01/01/2025;Food;;300,00\n");
    let second = csv_file("m;p;s;v\n01/01/2025;Food;;350,00\n");
    importer::budgets_from_path(&store, &session, first.path().to_str().unwrap()).unwrap();
    importer::budgets_from_path(&store, &session, second.path().to_str().unwrap()).unwrap();

    assert_eq!(count(&store, "budgets"), 1);
    let planned: String = store
        .conn()
        .query_row("SELECT planned_amount FROM budgets", [], |r| r.get(0))
        .unwrap();
    assert_eq!(planned, "350.00");
}

#[test]
fn budget_file_with_only_unknown_parents_fails() {
    let store = SqliteStore::open_in_memory().unwrap();
    let session = Session::new("local");
    let file = csv_file("m;p;s;v\n01/01/2025;Nowhere;;10,00\n");

    let err = importer::budgets_from_path(&store, &session, file.path().to_str().unwrap())
        .unwrap_err();
    assert!(format!("{:#}", err).contains("unknown category 'Nowhere'"));
    assert_eq!(count(&store, "budgets"), 0);
}
