// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::utils::{pretty_table, set_base_currency};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set-base", sub)) => {
            let ccy = sub.get_one::<String>("currency").unwrap().to_uppercase();
            set_base_currency(conn, &ccy)?;
            println!("Base currency set to {}", ccy);
        }
        Some(("list", _)) => {
            let mut stmt = conn
                .prepare("SELECT date, base, quote, rate FROM fx_rates ORDER BY date DESC, base, quote")?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (d, b, q, rt) = row?;
                data.push(vec![d, b, q, rt]);
            }
            println!("{}", pretty_table(&["Date", "Base", "Quote", "Rate"], data));
        }
        _ => {}
    }
    Ok(())
}
