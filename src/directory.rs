// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::models::{Account, Category, Subcategory, TransactionType};

fn account_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, String, String)> {
    Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
}

/// Directory of accounts. The import engine reads and creates through this;
/// it never deletes.
pub struct AccountDirectory<'a> {
    conn: &'a Connection,
}

impl<'a> AccountDirectory<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn list(&self) -> Result<Vec<Account>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, currency, balance, balance_mode FROM accounts ORDER BY name")?;
        let rows = stmt.query_map([], account_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(to_account(row?)?);
        }
        Ok(out)
    }

    pub fn get(&self, id: i64) -> Result<Option<Account>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, currency, balance, balance_mode FROM accounts WHERE id=?1",
                params![id],
                account_from_row,
            )
            .optional()?;
        row.map(to_account).transpose()
    }

    /// Case-insensitive lookup by name.
    pub fn find_by_name(&self, name: &str) -> Result<Option<Account>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, currency, balance, balance_mode FROM accounts \
                 WHERE LOWER(name)=LOWER(?1)",
                params![name.trim()],
                account_from_row,
            )
            .optional()?;
        row.map(to_account).transpose()
    }

    /// Creates an account with zero opening balance and no icon.
    pub fn create(&self, name: &str, currency: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO accounts(name, currency) VALUES (?1, ?2)",
            params![name.trim(), currency.to_uppercase()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

fn to_account((id, name, currency, balance, balance_mode): (i64, String, String, String, String)) -> Result<Account> {
    Ok(Account {
        id,
        name,
        currency,
        balance: balance
            .parse::<Decimal>()
            .with_context(|| format!("Invalid balance '{}' for account {}", balance, id))?,
        balance_mode,
    })
}

/// Directory of categories and subcategories, including the two link
/// relations (subcategory<->category and subcategory<->transaction).
pub struct CategoryDirectory<'a> {
    conn: &'a Connection,
}

impl<'a> CategoryDirectory<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn list(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, type, icon, color FROM categories ORDER BY name")?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, name, typ, icon, color) = row?;
            let r#type = TransactionType::parse(&typ)
                .ok_or_else(|| anyhow!("Unknown transaction type '{}' for category {}", typ, id))?;
            out.push(Category {
                id,
                name,
                r#type,
                icon,
                color,
            });
        }
        Ok(out)
    }

    /// Exact name+type match.
    pub fn find(&self, name: &str, r#type: TransactionType) -> Result<Option<i64>> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM categories WHERE name=?1 AND type=?2",
                params![name, r#type.as_str()],
                |r| r.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn create(
        &self,
        name: &str,
        r#type: TransactionType,
        icon: &str,
        color: &str,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO categories(name, type, icon, color) VALUES (?1, ?2, ?3, ?4)",
            params![name, r#type.as_str(), icon, color],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_subcategories(&self) -> Result<Vec<Subcategory>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM subcategories ORDER BY name")?;
        let rows = stmt.query_map([], |r| {
            Ok(Subcategory {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Case-insensitive lookup by name.
    pub fn find_subcategory(&self, name: &str) -> Result<Option<i64>> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM subcategories WHERE LOWER(name)=LOWER(?1)",
                params![name.trim()],
                |r| r.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn create_subcategory(&self, name: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO subcategories(name) VALUES (?1)",
            params![name.trim()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Batch-persist deferred subcategory->category links.
    pub fn link_subcategories_to_categories(&self, links: &[(i64, i64)]) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO subcategory_categories(subcategory_id, category_id) \
             VALUES (?1, ?2)",
        )?;
        for (sub_id, cat_id) in links {
            stmt.execute(params![sub_id, cat_id])?;
        }
        Ok(())
    }

    /// Batch-persist deferred transaction->subcategory links.
    pub fn link_subcategories_to_transactions(&self, links: &[(String, i64)]) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO transaction_subcategories(transaction_id, subcategory_id) \
             VALUES (?1, ?2)",
        )?;
        for (tx_id, sub_id) in links {
            stmt.execute(params![tx_id, sub_id])?;
        }
        Ok(())
    }
}
