// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version};

pub fn build_cli() -> Command {
    Command::new("kopilka")
        .version(crate_version!())
        .about("Multi-currency personal finance tracker with CSV import")
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand(
                    Command::new("add")
                        .about("Add an account")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("currency").long("currency").required(true)),
                )
                .subcommand(Command::new("list").about("List accounts with balances")),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(Command::new("list").about("List categories"))
                .subcommand(Command::new("subcategories").about("List subcategories")),
        )
        .subcommand(
            Command::new("tx").about("Browse transactions").subcommand(
                Command::new("list")
                    .about("List transactions, newest first")
                    .arg(Arg::new("limit").long("limit").value_parser(clap::value_parser!(usize)))
                    .arg(
                        Arg::new("json")
                            .long("json")
                            .action(ArgAction::SetTrue)
                            .help("Print as JSON"),
                    ),
            ),
        )
        .subcommand(
            Command::new("fx")
                .about("Currency settings and rates")
                .subcommand(
                    Command::new("set-base")
                        .about("Set the base currency")
                        .arg(Arg::new("currency").required(true)),
                )
                .subcommand(Command::new("list").about("List stored rates")),
        )
        .subcommand(
            Command::new("import").about("Import external data").subcommand(
                Command::new("transactions")
                    .about("Import transactions from a CSV file")
                    .arg(Arg::new("path").long("path").required(true))
                    .arg(
                        Arg::new("mapping")
                            .long("mapping")
                            .help("Column mapping JSON file; defaults to the standard header names"),
                    )
                    .arg(
                        Arg::new("entities")
                            .long("entities")
                            .help("Entity mapping JSON file (raw value -> existing account/category)"),
                    )
                    .arg(
                        Arg::new("json")
                            .long("json")
                            .action(ArgAction::SetTrue)
                            .help("Print the import result as JSON"),
                    ),
            ),
        )
}
