// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Budget vs. actual, bucketed by month.
//!
//! Rows are keyed by `(category, subcategory)`. Transactions without a budget
//! still get a row as long as some label for their category is known.
//! Category rows are the sum of their subcategory rows.

use crate::config::Session;
use crate::error::StoreError;
use crate::models::{Budget, CategoryLabel, Transaction, TransactionFilter};
use crate::store::DataStore;
use crate::utils::{compare_names, month_end};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// `actual / planned` below this is comfortably under budget.
pub const NEAR_LIMIT_RATIO: Decimal = Decimal::from_parts(8, 0, 0, false, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(MonthKey { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        month_end(self.first_day())
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            MonthKey {
                year: self.year + 1,
                month: 1,
            }
        } else {
            MonthKey {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn months_of(year: i32) -> Vec<MonthKey> {
        (1..=12).map(|month| MonthKey { year, month }).collect()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("Invalid month '{}', expected YYYY-MM", s);
        let (y, m) = s.trim().split_once('-').ok_or_else(bad)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(bad());
        }
        let year = y.parse().map_err(|_| bad())?;
        let month = m.parse().map_err(|_| bad())?;
        MonthKey::new(year, month).ok_or_else(bad)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which month a budget dated `d` counts toward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BudgetMonthPolicy {
    /// The calendar month of the date.
    #[default]
    Calendar,
    /// Like `Calendar`, except a budget dated on the last day of a month
    /// counts toward the following month.
    EndOfMonthRollover,
}

impl BudgetMonthPolicy {
    pub fn month_of(&self, date: NaiveDate) -> MonthKey {
        let key = MonthKey::of(date);
        match self {
            BudgetMonthPolicy::EndOfMonthRollover if date == key.last_day() => key.next(),
            _ => key,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetStatus {
    Unbudgeted,
    OnTarget,
    UnderBudget,
    NearLimit,
    OverBudget,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Unbudgeted => "unbudgeted",
            BudgetStatus::OnTarget => "on-target",
            BudgetStatus::UnderBudget => "under-budget",
            BudgetStatus::NearLimit => "near-limit",
            BudgetStatus::OverBudget => "over-budget",
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(actual: Decimal, planned: Decimal) -> BudgetStatus {
    if planned.is_zero() {
        return BudgetStatus::Unbudgeted;
    }
    if actual.round_dp(2) == planned.round_dp(2) {
        return BudgetStatus::OnTarget;
    }
    let ratio = actual / planned;
    if ratio < NEAR_LIMIT_RATIO {
        BudgetStatus::UnderBudget
    } else if ratio < Decimal::ONE {
        BudgetStatus::NearLimit
    } else {
        BudgetStatus::OverBudget
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Figures {
    pub planned: Decimal,
    pub actual: Decimal,
    pub variance: Decimal,
}

impl Figures {
    pub fn new(planned: Decimal, actual: Decimal) -> Self {
        Figures {
            planned,
            actual,
            variance: actual - planned,
        }
    }

    pub fn status(&self) -> BudgetStatus {
        classify(self.actual, self.planned)
    }

    fn absorb(&mut self, other: &Figures) {
        self.planned += other.planned;
        self.actual += other.actual;
        self.variance += other.variance;
    }
}

/// One month of one row. `NoData` is not the same thing as zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    NoData,
    Figures(Figures),
}

fn cell_in(months: &BTreeMap<MonthKey, Figures>, month: MonthKey) -> Cell {
    months.get(&month).map_or(Cell::NoData, |f| Cell::Figures(*f))
}

#[derive(Debug, Clone, Serialize)]
pub struct SubcategoryRow {
    pub category_id: i64,
    pub subcategory_id: Option<i64>,
    /// Subcategory name, or the category name for the category's own row.
    pub name: String,
    pub category_name: String,
    pub category_color: String,
    pub months: BTreeMap<MonthKey, Figures>,
}

impl SubcategoryRow {
    pub fn cell(&self, month: MonthKey) -> Cell {
        cell_in(&self.months, month)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRow {
    pub category_id: i64,
    pub name: String,
    pub color: String,
    pub months: BTreeMap<MonthKey, Figures>,
    pub subcategories: Vec<SubcategoryRow>,
}

impl CategoryRow {
    pub fn cell(&self, month: MonthKey) -> Cell {
        cell_in(&self.months, month)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnualReport {
    pub year: i32,
    pub rows: Vec<CategoryRow>,
}

impl AnnualReport {
    pub fn months(&self) -> Vec<MonthKey> {
        MonthKey::months_of(self.year)
    }
}

type RowKey = (i64, Option<i64>);

/// Budget and transaction collections must already be scoped to one user.
pub fn aggregate_year(
    budgets: &[Budget],
    transactions: &[Transaction],
    year: i32,
    policy: BudgetMonthPolicy,
) -> AnnualReport {
    let mut rows: HashMap<RowKey, SubcategoryRow> = HashMap::new();

    for b in budgets {
        let month = policy.month_of(b.month);
        if month.year() != year {
            continue;
        }
        let key = (b.category.id, b.subcategory.as_ref().map(|s| s.id));
        let row = rows.entry(key).or_insert_with(|| SubcategoryRow {
            category_id: b.category.id,
            subcategory_id: key.1,
            name: b
                .subcategory
                .as_ref()
                .map_or_else(|| b.category.name.clone(), |s| s.name.clone()),
            category_name: b.category.name.clone(),
            category_color: b.category.color.clone(),
            months: BTreeMap::new(),
        });
        row.months.entry(month).or_default().planned += b.planned_amount;
    }

    // Labels budgets can lend to transactions that lack joined category data
    let mut known: HashMap<i64, &CategoryLabel> = HashMap::new();
    for b in budgets {
        known.entry(b.category.id).or_insert(&b.category);
        if let Some(s) = &b.subcategory {
            known.entry(s.id).or_insert(s);
        }
    }

    for t in transactions {
        let month = MonthKey::of(t.date);
        if month.year() != year {
            continue;
        }
        let Some(category_id) = t.category_id else {
            continue;
        };
        let key = (category_id, t.subcategory_id);
        if !rows.contains_key(&key) {
            let Some(row) = row_for_transaction(t, category_id, &known) else {
                continue;
            };
            rows.insert(key, row);
        }
        if let Some(row) = rows.get_mut(&key) {
            row.months.entry(month).or_default().actual += t.amount.abs();
        }
    }

    let mut sub_rows: Vec<SubcategoryRow> = rows.into_values().collect();
    for row in &mut sub_rows {
        for f in row.months.values_mut() {
            f.variance = f.actual - f.planned;
        }
    }
    sub_rows.sort_by(|a, b| {
        compare_names(&a.category_name, &b.category_name)
            .then_with(|| a.category_id.cmp(&b.category_id))
            .then_with(|| compare_names(&a.name, &b.name))
    });

    let mut categories: Vec<CategoryRow> = Vec::new();
    for sub in sub_rows {
        if categories.last().is_none_or(|c| c.category_id != sub.category_id) {
            categories.push(CategoryRow {
                category_id: sub.category_id,
                name: sub.category_name.clone(),
                color: sub.category_color.clone(),
                months: BTreeMap::new(),
                subcategories: Vec::new(),
            });
        }
        if let Some(cat) = categories.last_mut() {
            for (month, f) in &sub.months {
                cat.months.entry(*month).or_default().absorb(f);
            }
            cat.subcategories.push(sub);
        }
    }

    AnnualReport {
        year,
        rows: categories,
    }
}

fn row_for_transaction(
    t: &Transaction,
    category_id: i64,
    known: &HashMap<i64, &CategoryLabel>,
) -> Option<SubcategoryRow> {
    let category = t
        .category
        .as_ref()
        .or_else(|| known.get(&category_id).copied())
        .filter(|c| !c.name.trim().is_empty())?;
    let sub_name = t
        .subcategory
        .as_ref()
        .map(|s| s.name.clone())
        .or_else(|| {
            t.subcategory_id
                .and_then(|id| known.get(&id))
                .map(|s| s.name.clone())
        })
        .filter(|n| !n.trim().is_empty());
    Some(SubcategoryRow {
        category_id,
        subcategory_id: t.subcategory_id,
        name: sub_name.unwrap_or_else(|| category.name.clone()),
        category_name: category.name.clone(),
        category_color: category.color.clone(),
        months: BTreeMap::new(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusLine {
    pub category_id: i64,
    pub name: String,
    pub planned: Decimal,
    pub actual: Decimal,
    pub variance: Decimal,
    pub status: BudgetStatus,
}

/// Single-month view: one line per category with any data in `month`.
pub fn month_status(report: &AnnualReport, month: MonthKey) -> Vec<StatusLine> {
    report
        .rows
        .iter()
        .filter_map(|row| match row.cell(month) {
            Cell::NoData => None,
            Cell::Figures(f) => Some(StatusLine {
                category_id: row.category_id,
                name: row.name.clone(),
                planned: f.planned,
                actual: f.actual,
                variance: f.variance,
                status: f.status(),
            }),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub over_budget: usize,
    pub near_limit: usize,
    pub under_budget: usize,
    pub on_target: usize,
    pub unbudgeted: usize,
}

impl StatusSummary {
    pub fn from_lines(lines: &[StatusLine]) -> Self {
        let mut s = StatusSummary::default();
        for line in lines {
            match line.status {
                BudgetStatus::OverBudget => s.over_budget += 1,
                BudgetStatus::NearLimit => s.near_limit += 1,
                BudgetStatus::UnderBudget => s.under_budget += 1,
                BudgetStatus::OnTarget => s.on_target += 1,
                BudgetStatus::Unbudgeted => s.unbudgeted += 1,
            }
        }
        s
    }
}

/// Fetches one user's budgets and transactions for `year` and aggregates them.
/// Under the rollover policy the previous Dec 31 is fetched too, since a
/// budget dated Dec 31 lands in January.
pub fn load_year<S: DataStore + ?Sized>(
    store: &S,
    session: &Session,
    year: i32,
    policy: BudgetMonthPolicy,
) -> Result<AnnualReport, StoreError> {
    let (Some(jan1), Some(dec31)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return Ok(AnnualReport {
            year,
            rows: Vec::new(),
        });
    };
    let budgets_from = match policy {
        BudgetMonthPolicy::Calendar => jan1,
        BudgetMonthPolicy::EndOfMonthRollover => jan1.pred_opt().unwrap_or(jan1),
    };
    let budgets = store.fetch_budgets(session, budgets_from, dec31)?;
    let transactions = store.fetch_transactions(session, &TransactionFilter::between(jan1, dec31))?;
    debug!(
        year,
        budgets = budgets.len(),
        transactions = transactions.len(),
        "aggregating year"
    );
    Ok(aggregate_year(&budgets, &transactions, year, policy))
}
