// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use finflow::aggregate::{
    load_year, month_status, BudgetMonthPolicy, BudgetStatus, Cell, MonthKey, StatusSummary,
};
use finflow::commands::budgets;
use finflow::config::Session;
use finflow::import::{import_budgets, import_transactions};
use finflow::models::NewBudget;
use finflow::store::{DataStore, SqliteStore};
use finflow::cli;
use rust_decimal::Decimal;
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn setup() -> (SqliteStore, Session) {
    let store = SqliteStore::open_in_memory().unwrap();
    let session = Session::new("local");
    import_transactions(
        &store,
        &session,
        "date,description,amount,category,subcategory
2025-01-05,Market,-80.00,Food,Groceries
2025-01-09,Pizza,-70.00,Food,Dining
2025-01-20,Salary,3500.00,Income,
2025-02-03,Market,-950.00,Food,Groceries
2024-12-30,Old market,-40.00,Food,Groceries
",
        "#94a3b8",
    )
    .unwrap();
    import_budgets(
        &store,
        &session,
        "m;p;s;v
01/01/2025;Food;Groceries;100,00
01/01/2025;Food;Dining;50,00
01/02/2025;Food;Groceries;800,00
",
    )
    .unwrap();
    (store, session)
}

fn month(s: &str) -> MonthKey {
    s.parse().unwrap()
}

fn run(store: &SqliteStore, session: &Session, args: &[&str]) {
    let mut argv = vec!["finflow", "budget"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    if let Some(("budget", m)) = matches.subcommand() {
        budgets::handle(store, session, m).unwrap();
    } else {
        panic!("no budget subcommand");
    }
}

#[test]
fn subcategories_roll_up_into_the_category_row() {
    let (store, session) = setup();
    let report = load_year(&store, &session, 2025, BudgetMonthPolicy::Calendar).unwrap();

    let food = report.rows.iter().find(|r| r.name == "Food").unwrap();
    match food.cell(month("2025-01")) {
        Cell::Figures(f) => {
            assert_eq!(f.planned, dec("150"));
            assert_eq!(f.actual, dec("150"));
            assert_eq!(f.variance, Decimal::ZERO);
            assert_eq!(f.status(), BudgetStatus::OnTarget);
        }
        Cell::NoData => panic!("January should have data"),
    }
    match food.cell(month("2025-02")) {
        Cell::Figures(f) => {
            assert_eq!(f.variance, dec("150"));
            assert_eq!(f.status(), BudgetStatus::OverBudget);
        }
        Cell::NoData => panic!("February should have data"),
    }
    assert_eq!(food.cell(month("2025-03")), Cell::NoData);

    let names: Vec<&str> = food.subcategories.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Dining", "Groceries"]);
}

#[test]
fn previous_year_is_not_counted() {
    let (store, session) = setup();
    let report = load_year(&store, &session, 2025, BudgetMonthPolicy::Calendar).unwrap();
    let food = report.rows.iter().find(|r| r.name == "Food").unwrap();
    let groceries = food
        .subcategories
        .iter()
        .find(|s| s.name == "Groceries")
        .unwrap();
    match groceries.cell(month("2025-01")) {
        Cell::Figures(f) => assert_eq!(f.actual, dec("80")),
        Cell::NoData => panic!("expected data"),
    }
}

#[test]
fn month_status_flags_unbudgeted_income() {
    let (store, session) = setup();
    let report = load_year(&store, &session, 2025, BudgetMonthPolicy::Calendar).unwrap();
    let lines = month_status(&report, month("2025-01"));

    let names: Vec<&str> = lines.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Food", "Income"]);
    let income = &lines[1];
    assert_eq!(income.planned, Decimal::ZERO);
    assert_eq!(income.actual, dec("3500"));
    assert_eq!(income.status, BudgetStatus::Unbudgeted);

    let summary = StatusSummary::from_lines(&lines);
    assert_eq!(summary.on_target, 1);
    assert_eq!(summary.unbudgeted, 1);
    assert_eq!(summary.over_budget, 0);
}

#[test]
fn rollover_moves_last_day_budgets_forward() {
    let store = SqliteStore::open_in_memory().unwrap();
    let session = Session::new("local");
    let cat = store
        .create_category(
            &session,
            &finflow::models::NewCategory {
                name: "Rent".into(),
                color: "#94a3b8".into(),
                icon: None,
                parent_id: None,
            },
        )
        .unwrap();
    store
        .upsert_budgets(
            &session,
            &[NewBudget {
                month: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
                category_id: cat.id,
                subcategory_id: None,
                planned_amount: dec("1200"),
            }],
        )
        .unwrap();

    let calendar = load_year(&store, &session, 2025, BudgetMonthPolicy::Calendar).unwrap();
    assert!(calendar.rows.is_empty());

    let rolled = load_year(&store, &session, 2025, BudgetMonthPolicy::EndOfMonthRollover).unwrap();
    assert_eq!(rolled.rows.len(), 1);
    match rolled.rows[0].cell(month("2025-01")) {
        Cell::Figures(f) => assert_eq!(f.planned, dec("1200")),
        Cell::NoData => panic!("rolled budget missing"),
    }
}

#[test]
fn budget_set_replaces_and_targets_subcategories() {
    let (store, session) = setup();
    run(
        &store,
        &session,
        &["set", "--month", "2025-03", "--category", "food", "--subcategory", "dining", "--amount", "60"],
    );
    run(
        &store,
        &session,
        &["set", "--month", "2025-03", "--category", "Food", "--subcategory", "Dining", "--amount", "75.50"],
    );

    let mar = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let stored = store
        .fetch_budgets(&session, mar, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap())
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].month, mar);
    assert_eq!(stored[0].subcategory.as_ref().unwrap().name, "Dining");
    assert_eq!(stored[0].planned_amount, dec("75.50"));
}

#[test]
fn annual_json_marks_missing_months_as_null() {
    let (store, session) = setup();
    let report = load_year(&store, &session, 2025, BudgetMonthPolicy::Calendar).unwrap();
    let json = serde_json::to_value(budgets::annual_json(&report)).unwrap();

    let food = &json["rows"][0];
    assert_eq!(food["name"], "Food");
    assert_eq!(food["months"].as_object().unwrap().len(), 12);
    assert!(food["months"]["2025-03"].is_null());
    assert_eq!(food["months"]["2025-01"]["planned"], "150.00");
}

#[test]
fn annual_and_status_commands_run() {
    let (store, session) = setup();
    run(&store, &session, &["annual", "--year", "2025", "--expand"]);
    run(&store, &session, &["status", "--month", "2025-01", "--json"]);
    run(&store, &session, &["list", "--month", "2025-01"]);

    let rows = budgets::annual_table_rows(
        &load_year(&store, &session, 2025, BudgetMonthPolicy::Calendar).unwrap(),
        true,
    );
    // Food, its two subcategories, Income
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1][0], "  Dining");
    assert_eq!(rows[0][3], "-");
    assert_eq!(rows[0].len(), 13);
}

#[test]
fn rollover_help_says_which_budgets_it_affects() {
    let cli = cli::build_cli();
    let annual = cli
        .find_subcommand("budget")
        .and_then(|b| b.find_subcommand("annual"))
        .unwrap();
    let help = annual
        .get_arguments()
        .find(|a| a.get_id() == "rollover")
        .and_then(|a| a.get_help())
        .unwrap()
        .to_string();
    assert!(help.contains("budget set"));
    assert!(help.contains("last day"));
}
