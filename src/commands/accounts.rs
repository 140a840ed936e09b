// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::directory::AccountDirectory;
use crate::utils::{fmt_money, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let directory = AccountDirectory::new(conn);
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let ccy = sub.get_one::<String>("currency").unwrap().to_uppercase();
            directory.create(name, &ccy)?;
            println!("Added account '{}' ({})", name, ccy);
        }
        Some(("list", _)) => {
            let mut data = Vec::new();
            for a in directory.list()? {
                data.push(vec![
                    a.name,
                    a.currency.clone(),
                    fmt_money(&a.balance, &a.currency),
                    a.balance_mode,
                ]);
            }
            println!(
                "{}",
                pretty_table(&["Name", "Currency", "Balance", "Mode"], data)
            );
        }
        _ => {}
    }
    Ok(())
}
