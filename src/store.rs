// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Persistence boundary. The pipelines only talk to [`DataStore`];
//! [`SqliteStore`] is the implementation the CLI uses.

use crate::config::Session;
use crate::db;
use crate::error::StoreError;
use crate::models::{
    Budget, Category, CategoryLabel, NewBudget, NewCategory, NewTransaction, Transaction,
    TransactionFilter, TransactionType,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::debug;

pub trait DataStore {
    fn fetch_categories(&self, session: &Session) -> Result<Vec<Category>, StoreError>;

    /// Insert-or-ignore on `(user, name)`. Returns only the rows it created.
    fn upsert_categories(
        &self,
        session: &Session,
        rows: &[NewCategory],
    ) -> Result<Vec<Category>, StoreError>;

    fn insert_transactions(
        &self,
        session: &Session,
        rows: &[NewTransaction],
    ) -> Result<usize, StoreError>;

    /// Budgets whose month falls in `from..=to`.
    fn fetch_budgets(
        &self,
        session: &Session,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Budget>, StoreError>;

    fn fetch_transactions(
        &self,
        session: &Session,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Replaces the planned amount on `(user, month, category, subcategory)`.
    fn upsert_budgets(&self, session: &Session, rows: &[NewBudget]) -> Result<usize, StoreError>;

    fn fetch_transaction(&self, session: &Session, id: i64) -> Result<Transaction, StoreError>;

    /// Overwrites every editable field of one transaction.
    fn update_transaction(
        &self,
        session: &Session,
        id: i64,
        row: &NewTransaction,
    ) -> Result<(), StoreError>;

    /// Moves the given transactions to one category/subcategory pair.
    /// Ids the user does not own are ignored. Returns the rows changed.
    fn recategorize_transactions(
        &self,
        session: &Session,
        ids: &[i64],
        category_id: Option<i64>,
        subcategory_id: Option<i64>,
    ) -> Result<usize, StoreError>;

    fn delete_transactions(&self, session: &Session, ids: &[i64]) -> Result<usize, StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

fn date_col(column: &'static str, s: String) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| StoreError::Corrupt { column, value: s })
}

fn decimal_col(column: &'static str, s: String) -> Result<Decimal, StoreError> {
    s.parse::<Decimal>()
        .map_err(|_| StoreError::Corrupt { column, value: s })
}

fn label(id: Option<i64>, name: Option<String>, color: Option<String>) -> Option<CategoryLabel> {
    match (id, name) {
        (Some(id), Some(name)) => Some(CategoryLabel {
            id,
            name,
            color: color.unwrap_or_default(),
        }),
        _ => None,
    }
}

fn category_from_row(r: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: r.get(0)?,
        name: r.get(1)?,
        color: r.get(2)?,
        icon: r.get(3)?,
        parent_id: r.get(4)?,
    })
}

const TRANSACTION_SELECT: &str =
    "SELECT t.id, t.date, t.description, t.amount, t.type, t.category_id, c.name, c.color,
            t.subcategory_id, s.name, s.color, t.ai_confidence, t.is_recurring
     FROM transactions t
     LEFT JOIN categories c ON t.category_id=c.id
     LEFT JOIN categories s ON t.subcategory_id=s.id";

fn transaction_from_row(r: &Row<'_>) -> Result<Transaction, StoreError> {
    let date: String = r.get(1)?;
    let amount: String = r.get(3)?;
    let kind: String = r.get(4)?;
    let confidence: Option<i64> = r.get(11)?;
    Ok(Transaction {
        id: r.get(0)?,
        date: date_col("transactions.date", date)?,
        description: r.get(2)?,
        amount: decimal_col("transactions.amount", amount)?,
        kind: kind.parse::<TransactionType>().map_err(|_| StoreError::Corrupt {
            column: "transactions.type",
            value: kind,
        })?,
        category_id: r.get(5)?,
        category: label(r.get(5)?, r.get(6)?, r.get(7)?),
        subcategory_id: r.get(8)?,
        subcategory: label(r.get(8)?, r.get(9)?, r.get(10)?),
        ai_confidence: confidence.and_then(|c| u8::try_from(c).ok()),
        is_recurring: r.get(12)?,
    })
}

fn reject_negative(amount: Decimal) -> Result<(), StoreError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(StoreError::NegativeAmount(amount));
    }
    Ok(())
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        SqliteStore { conn }
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        db::init_schema(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn setting(&self, session: &Session, key: &str) -> Result<Option<String>, StoreError> {
        let v = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE user_id=?1 AND key=?2",
                params![session.user_id(), key],
                |r| r.get(0),
            )
            .optional()?;
        Ok(v)
    }

    pub fn set_setting(&self, session: &Session, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO settings(user_id, key, value) VALUES(?1, ?2, ?3)
             ON CONFLICT(user_id, key) DO UPDATE SET value=excluded.value",
            params![session.user_id(), key, value],
        )?;
        Ok(())
    }

    /// Plain insert; a duplicate name is an error here, unlike imports.
    pub fn create_category(
        &self,
        session: &Session,
        row: &NewCategory,
    ) -> Result<Category, StoreError> {
        self.conn.execute(
            "INSERT INTO categories(user_id, name, color, icon, parent_id) VALUES (?1,?2,?3,?4,?5)",
            params![session.user_id(), row.name, row.color, row.icon, row.parent_id],
        )?;
        Ok(Category {
            id: self.conn.last_insert_rowid(),
            name: row.name.clone(),
            color: row.color.clone(),
            icon: row.icon.clone(),
            parent_id: row.parent_id,
        })
    }

    pub fn find_category(&self, session: &Session, name: &str) -> Result<Category, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name, color, icon, parent_id FROM categories WHERE user_id=?1 AND name=?2",
                params![session.user_id(), name.trim()],
                category_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::CategoryNotFound(name.trim().to_string()))
    }

    /// Rewrites name, color and icon of an existing category.
    pub fn update_category(
        &self,
        session: &Session,
        id: i64,
        row: &NewCategory,
    ) -> Result<Category, StoreError> {
        let n = self.conn.execute(
            "UPDATE categories SET name=?3, color=?4, icon=?5 WHERE user_id=?1 AND id=?2",
            params![session.user_id(), id, row.name, row.color, row.icon],
        )?;
        if n == 0 {
            return Err(StoreError::CategoryNotFound(row.name.clone()));
        }
        Ok(Category {
            id,
            name: row.name.clone(),
            color: row.color.clone(),
            icon: row.icon.clone(),
            parent_id: row.parent_id,
        })
    }

    pub fn delete_category(&self, session: &Session, name: &str) -> Result<usize, StoreError> {
        let n = self.conn.execute(
            "DELETE FROM categories WHERE user_id=?1 AND name=?2",
            params![session.user_id(), name.trim()],
        )?;
        Ok(n)
    }
}

impl DataStore for SqliteStore {
    fn fetch_categories(&self, session: &Session) -> Result<Vec<Category>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, color, icon, parent_id FROM categories WHERE user_id=?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![session.user_id()], category_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn upsert_categories(
        &self,
        session: &Session,
        rows: &[NewCategory],
    ) -> Result<Vec<Category>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let tx = self.conn.unchecked_transaction()?;
        let mut created = Vec::new();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO categories(user_id, name, color, icon, parent_id) VALUES (?1,?2,?3,?4,?5)
                 ON CONFLICT(user_id, name) DO NOTHING",
            )?;
            for row in rows {
                let n = stmt.execute(params![
                    session.user_id(),
                    row.name,
                    row.color,
                    row.icon,
                    row.parent_id
                ])?;
                if n == 1 {
                    created.push(Category {
                        id: tx.last_insert_rowid(),
                        name: row.name.clone(),
                        color: row.color.clone(),
                        icon: row.icon.clone(),
                        parent_id: row.parent_id,
                    });
                } else {
                    debug!(name = %row.name, "category already exists");
                }
            }
        }
        tx.commit()?;
        Ok(created)
    }

    fn insert_transactions(
        &self,
        session: &Session,
        rows: &[NewTransaction],
    ) -> Result<usize, StoreError> {
        for r in rows {
            reject_negative(r.amount)?;
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO transactions(user_id, date, description, amount, type, category_id, subcategory_id, ai_confidence, is_recurring)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            )?;
            for row in rows {
                stmt.execute(params![
                    session.user_id(),
                    row.date.to_string(),
                    row.description,
                    row.amount.abs().to_string(),
                    row.kind.as_str(),
                    row.category_id,
                    row.subcategory_id,
                    row.ai_confidence,
                    row.is_recurring
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn fetch_budgets(
        &self,
        session: &Session,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Budget>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.month, c.id, c.name, c.color, s.id, s.name, s.color, b.planned_amount
             FROM budgets b
             JOIN categories c ON b.category_id=c.id
             LEFT JOIN categories s ON b.subcategory_id=s.id
             WHERE b.user_id=?1 AND b.month>=?2 AND b.month<=?3
             ORDER BY b.month, c.name, s.name",
        )?;
        let mut rows = stmt.query(params![
            session.user_id(),
            from.to_string(),
            to.to_string()
        ])?;
        let mut out = Vec::new();
        while let Some(r) = rows.next()? {
            let month: String = r.get(1)?;
            let planned: String = r.get(8)?;
            out.push(Budget {
                id: r.get(0)?,
                month: date_col("budgets.month", month)?,
                category: CategoryLabel {
                    id: r.get(2)?,
                    name: r.get(3)?,
                    color: r.get(4)?,
                },
                subcategory: label(r.get(5)?, r.get(6)?, r.get(7)?),
                planned_amount: decimal_col("budgets.planned_amount", planned)?,
            });
        }
        Ok(out)
    }

    fn fetch_transactions(
        &self,
        session: &Session,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut sql = format!("{} WHERE t.user_id=?", TRANSACTION_SELECT);
        let mut params_vec: Vec<String> = vec![session.user_id().to_string()];

        if let Some(from) = filter.date_from {
            sql.push_str(" AND t.date>=?");
            params_vec.push(from.to_string());
        }
        if let Some(to) = filter.date_to {
            sql.push_str(" AND t.date<=?");
            params_vec.push(to.to_string());
        }
        if let Some(cat) = filter.category_id {
            sql.push_str(" AND t.category_id=?");
            params_vec.push(cat.to_string());
        }
        if let Some(sub) = filter.subcategory_id {
            sql.push_str(" AND t.subcategory_id=?");
            params_vec.push(sub.to_string());
        }
        if let Some(kind) = filter.kind {
            sql.push_str(" AND t.type=?");
            params_vec.push(kind.as_str().to_string());
        }
        sql.push_str(" ORDER BY t.date DESC, t.id DESC");

        // SQLite LIKE only folds ASCII and treats % and _ as wildcards
        let needle = filter
            .description
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(params_vec.iter()))?;

        let mut data = Vec::new();
        while let Some(r) = rows.next()? {
            let tx = transaction_from_row(r)?;
            // Amounts are TEXT, so compare them here rather than in SQL
            if filter.amount_min.is_some_and(|min| tx.amount < min)
                || filter.amount_max.is_some_and(|max| tx.amount > max)
                || needle
                    .as_deref()
                    .is_some_and(|n| !tx.description.to_lowercase().contains(n))
            {
                continue;
            }
            data.push(tx);
            if filter.limit.is_some_and(|limit| data.len() >= limit) {
                break;
            }
        }
        Ok(data)
    }

    fn upsert_budgets(&self, session: &Session, rows: &[NewBudget]) -> Result<usize, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut update = tx.prepare(
                "UPDATE budgets SET planned_amount=?5
                 WHERE user_id=?1 AND month=?2 AND category_id=?3 AND subcategory_id IS ?4",
            )?;
            let mut insert = tx.prepare(
                "INSERT INTO budgets(user_id, month, category_id, subcategory_id, planned_amount)
                 VALUES (?1,?2,?3,?4,?5)",
            )?;
            for row in rows {
                let month = row.month.to_string();
                let planned = row.planned_amount.to_string();
                let updated = update.execute(params![
                    session.user_id(),
                    month,
                    row.category_id,
                    row.subcategory_id,
                    planned
                ])?;
                if updated == 0 {
                    insert.execute(params![
                        session.user_id(),
                        month,
                        row.category_id,
                        row.subcategory_id,
                        planned
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn fetch_transaction(&self, session: &Session, id: i64) -> Result<Transaction, StoreError> {
        let sql = format!("{} WHERE t.user_id=?1 AND t.id=?2", TRANSACTION_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![session.user_id(), id])?;
        match rows.next()? {
            Some(r) => transaction_from_row(r),
            None => Err(StoreError::TransactionNotFound(id)),
        }
    }

    fn update_transaction(
        &self,
        session: &Session,
        id: i64,
        row: &NewTransaction,
    ) -> Result<(), StoreError> {
        reject_negative(row.amount)?;
        let n = self.conn.execute(
            "UPDATE transactions SET date=?3, description=?4, amount=?5, type=?6, category_id=?7,
                    subcategory_id=?8, ai_confidence=?9, is_recurring=?10
             WHERE user_id=?1 AND id=?2",
            params![
                session.user_id(),
                id,
                row.date.to_string(),
                row.description,
                row.amount.to_string(),
                row.kind.as_str(),
                row.category_id,
                row.subcategory_id,
                row.ai_confidence,
                row.is_recurring
            ],
        )?;
        if n == 0 {
            return Err(StoreError::TransactionNotFound(id));
        }
        Ok(())
    }

    fn recategorize_transactions(
        &self,
        session: &Session,
        ids: &[i64],
        category_id: Option<i64>,
        subcategory_id: Option<i64>,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut changed = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE transactions SET category_id=?3, subcategory_id=?4 WHERE user_id=?1 AND id=?2",
            )?;
            for id in ids {
                changed += stmt.execute(params![
                    session.user_id(),
                    id,
                    category_id,
                    subcategory_id
                ])?;
            }
        }
        tx.commit()?;
        debug!(requested = ids.len(), changed, "recategorized transactions");
        Ok(changed)
    }

    fn delete_transactions(&self, session: &Session, ids: &[i64]) -> Result<usize, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM transactions WHERE user_id=?1 AND id=?2")?;
            for id in ids {
                deleted += stmt.execute(params![session.user_id(), id])?;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }
}
