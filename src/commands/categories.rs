// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::directory::CategoryDirectory;
use crate::utils::pretty_table;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let directory = CategoryDirectory::new(conn);
    match m.subcommand() {
        Some(("list", _)) => {
            let mut data = Vec::new();
            for c in directory.list()? {
                data.push(vec![c.name, c.r#type.as_str().to_string(), c.icon, c.color]);
            }
            println!("{}", pretty_table(&["Name", "Type", "Icon", "Color"], data));
        }
        Some(("subcategories", _)) => {
            let mut data = Vec::new();
            for s in directory.list_subcategories()? {
                data.push(vec![s.name]);
            }
            println!("{}", pretty_table(&["Subcategory"], data));
        }
        _ => {}
    }
    Ok(())
}
