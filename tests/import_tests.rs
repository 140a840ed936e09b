// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use kopilka::db;
use kopilka::directory::{AccountDirectory, CategoryDirectory};
use kopilka::import;
use kopilka::ledger::TransactionLedger;
use kopilka::models::{ColumnMapping, EntityMapping, ImportResult, ParsedFile};
use rusqlite::Connection;

fn base_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn parsed_file(headers: &[&str], rows: &[&[&str]]) -> ParsedFile {
    ParsedFile {
        headers: headers.iter().map(|s| s.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
    }
}

fn run_import(conn: &Connection, file: &ParsedFile) -> ImportResult {
    run_import_with(conn, file, &ColumnMapping::standard(), &EntityMapping::default())
}

fn run_import_with(
    conn: &Connection,
    file: &ParsedFile,
    columns: &ColumnMapping,
    entities: &EntityMapping,
) -> ImportResult {
    let accounts = AccountDirectory::new(conn);
    let categories = CategoryDirectory::new(conn);
    let mut ledger = TransactionLedger::new(conn);
    import::import_transactions(file, columns, entities, &mut ledger, &accounts, &categories, None)
        .unwrap()
}

fn tx_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap()
}

#[test]
fn single_expense_row_creates_account_and_category() {
    let conn = base_conn();
    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category"],
        &[&["2024-03-01", "expense", "1500", "KZT", "Kaspi Gold", "Food"]],
    );

    let result = run_import(&conn, &file);
    assert_eq!(result.imported, 1);
    assert_eq!(result.skipped, 0);
    assert_eq!(result.created_accounts, 1);
    assert_eq!(result.created_categories, 1);
    assert!(result.errors.is_empty());

    let (date, amount, typ, category, account_name): (String, String, String, String, String) =
        conn.query_row(
            "SELECT date, amount, type, category, account_name FROM transactions",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )
        .unwrap();
    assert_eq!(date, "2024-03-01");
    assert_eq!(amount, "1500");
    assert_eq!(typ, "expense");
    assert_eq!(category, "Food");
    assert_eq!(account_name, "Kaspi Gold");

    let acct: String = conn
        .query_row("SELECT currency FROM accounts WHERE name='Kaspi Gold'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(acct, "KZT");
}

#[test]
fn reimporting_the_same_file_is_a_no_op() {
    let conn = base_conn();
    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category"],
        &[
            &["2024-03-01", "expense", "1500", "KZT", "Kaspi Gold", "Food"],
            &["2024-03-02", "income", "200000", "KZT", "Salary", "Kaspi Gold"],
        ],
    );

    let first = run_import(&conn, &file);
    assert_eq!(first.imported, 2);

    let second = run_import(&conn, &file);
    assert_eq!(second.imported, 0);
    assert_eq!(second.duplicates_skipped, 2);
    assert_eq!(second.skipped, 2);
    assert_eq!(tx_count(&conn), 2);
}

#[test]
fn ids_are_deterministic_across_fresh_ledgers() {
    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category", "note"],
        &[&["2024-03-01", "expense", "1500", "KZT", "Kaspi Gold", "Food", "lunch"]],
    );

    let conn_a = base_conn();
    run_import(&conn_a, &file);
    let conn_b = base_conn();
    run_import(&conn_b, &file);

    let id_a: String = conn_a
        .query_row("SELECT id FROM transactions", [], |r| r.get(0))
        .unwrap();
    let id_b: String = conn_b
        .query_row("SELECT id FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(id_a, id_b);
}

#[test]
fn one_bad_row_never_aborts_the_import() {
    let conn = base_conn();
    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category"],
        &[
            &["2024-03-01", "expense", "100", "KZT", "A", "Food"],
            &["2024-03-02", "expense", "100", "KZT", "A", "Food"],
            &["2024-03-03", "expense", "100", "KZT", "A", "Food"],
            &["2024-03-04", "expense", "100", "KZT", "A", "Food"],
            &["not-a-date", "expense", "100", "KZT", "A", "Food"],
            &["2024-03-06", "expense", "100", "KZT", "A", "Food"],
        ],
    );

    let result = run_import(&conn, &file);
    assert_eq!(result.imported, 5);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.errors.len(), 1);
    // 1-based data row 5, plus one for the header line.
    assert!(result.errors[0].contains("Row 6"), "got: {}", result.errors[0]);
    assert_eq!(tx_count(&conn), 5);
}

#[test]
fn income_swaps_account_and_category_columns() {
    let conn = base_conn();
    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category", "targetAccount"],
        &[&["2024-03-05", "income", "200000", "KZT", "Salary", "", "Kaspi Gold"]],
    );

    let result = run_import(&conn, &file);
    assert_eq!(result.imported, 1);

    let (account_name, category): (String, String) = conn
        .query_row("SELECT account_name, category FROM transactions", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(account_name, "Kaspi Gold");
    assert_eq!(category, "Salary");
}

#[test]
fn legacy_income_without_target_account_column() {
    let conn = base_conn();
    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category"],
        &[&["2024-03-05", "income", "200000", "KZT", "Salary", "Kaspi Gold"]],
    );

    run_import(&conn, &file);
    let (account_name, category): (String, String) = conn
        .query_row("SELECT account_name, category FROM transactions", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(account_name, "Kaspi Gold");
    assert_eq!(category, "Salary");
}

#[test]
fn reserved_placeholder_is_never_created_as_an_account() {
    let conn = base_conn();
    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category"],
        &[&["2024-03-01", "expense", "900", "KZT", "Другое", "Misc"]],
    );

    let result = run_import(&conn, &file);
    assert_eq!(result.imported, 1);
    assert_eq!(result.created_accounts, 0);

    let accounts: i64 = conn
        .query_row("SELECT COUNT(*) FROM accounts", [], |r| r.get(0))
        .unwrap();
    assert_eq!(accounts, 0);
    let account_id: Option<i64> = conn
        .query_row("SELECT account_id FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(account_id, None);
}

#[test]
fn unresolved_required_columns_fail_fast() {
    let conn = base_conn();
    let file = parsed_file(
        &["date", "amount", "account"],
        &[
            &["2024-03-01", "1500", "Kaspi Gold"],
            &["2024-03-02", "1600", "Kaspi Gold"],
        ],
    );

    let result = run_import(&conn, &file);
    assert_eq!(result.imported, 0);
    assert_eq!(result.skipped, 2);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("type"));
    assert_eq!(tx_count(&conn), 0);
    // No partial work: nothing was created either.
    let accounts: i64 = conn
        .query_row("SELECT COUNT(*) FROM accounts", [], |r| r.get(0))
        .unwrap();
    assert_eq!(accounts, 0);
}

#[test]
fn transfers_default_to_the_transfer_category_and_move_money() {
    let conn = base_conn();
    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category", "targetAccount"],
        &[&["2024-03-10", "transfer", "5000", "KZT", "Kaspi Gold", "ShouldBeIgnored", "Halyk"]],
    );

    let result = run_import(&conn, &file);
    assert_eq!(result.imported, 1);
    assert_eq!(result.created_accounts, 2);

    let (category, target_name): (String, String) = conn
        .query_row(
            "SELECT category, target_account_name FROM transactions",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(category, "Transfer");
    assert_eq!(target_name, "Halyk");

    let source: String = conn
        .query_row("SELECT balance FROM accounts WHERE name='Kaspi Gold'", [], |r| r.get(0))
        .unwrap();
    let target: String = conn
        .query_row("SELECT balance FROM accounts WHERE name='Halyk'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(source, "-5000");
    assert_eq!(target, "5000");
}

#[test]
fn settlement_rebuilds_caches_and_notifies() {
    let conn = base_conn();
    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category"],
        &[
            &["2024-03-01", "expense", "1500", "KZT", "Kaspi Gold", "Food"],
            &["2024-03-02", "expense", "500", "KZT", "Kaspi Gold", "Food"],
            &["2024-03-03", "income", "200000", "KZT", "Salary", "Kaspi Gold"],
        ],
    );

    let result = run_import(&conn, &file);
    assert_eq!(result.imported, 3);

    // The aggregate cache reflects the full committed set once the call
    // returns, never a prefix of it.
    let cached_rows: i64 = conn
        .query_row("SELECT SUM(tx_count) FROM category_totals", [], |r| r.get(0))
        .unwrap();
    assert_eq!(cached_rows, 3);
    let food_total: String = conn
        .query_row(
            "SELECT total FROM category_totals WHERE category='Food' AND type='expense'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(food_total, "2000");

    let balance: String = conn
        .query_row("SELECT balance FROM accounts WHERE name='Kaspi Gold'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(balance, "198000");
    let mode: String = conn
        .query_row("SELECT balance_mode FROM accounts WHERE name='Kaspi Gold'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(mode, "recompute");

    let ledger = TransactionLedger::new(&conn);
    assert_eq!(ledger.data_version().unwrap(), 1);
    run_import(&conn, &file);
    assert_eq!(ledger.data_version().unwrap(), 2);
}

#[test]
fn subcategories_are_split_resolved_and_linked() {
    let conn = base_conn();
    let mut columns = ColumnMapping::standard();
    columns.subcategory_separator = ";".to_string();
    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category", "subcategories"],
        &[&["2024-03-01", "expense", "1200", "KZT", "Kaspi Gold", "Food", "coffee; snacks"]],
    );

    let result = run_import_with(&conn, &file, &columns, &EntityMapping::default());
    assert_eq!(result.imported, 1);
    assert_eq!(result.created_subcategories, 2);

    let first: Option<String> = conn
        .query_row("SELECT subcategory FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(first.as_deref(), Some("coffee"));

    let category_links: i64 = conn
        .query_row("SELECT COUNT(*) FROM subcategory_categories", [], |r| r.get(0))
        .unwrap();
    assert_eq!(category_links, 2);
    let tx_links: i64 = conn
        .query_row("SELECT COUNT(*) FROM transaction_subcategories", [], |r| r.get(0))
        .unwrap();
    assert_eq!(tx_links, 2);
}

#[test]
fn entity_mapping_overrides_automatic_resolution() {
    let conn = base_conn();
    let directory = AccountDirectory::new(&conn);
    let existing = directory.create("Kaspi Gold", "KZT").unwrap();

    let mut entities = EntityMapping::default();
    entities.accounts.insert("KG".to_string(), existing);
    entities
        .categories
        .insert("Еда".to_string(), "Food".to_string());

    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category"],
        &[&["2024-03-01", "expense", "1500", "KZT", "KG", "Еда"]],
    );
    let result = run_import_with(&conn, &file, &ColumnMapping::standard(), &entities);

    assert_eq!(result.imported, 1);
    assert_eq!(result.created_accounts, 0);
    assert_eq!(result.created_categories, 1);
    let (account_id, category): (i64, String) = conn
        .query_row("SELECT account_id, category FROM transactions", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(account_id, existing);
    assert_eq!(category, "Food");
}

#[test]
fn within_file_duplicates_all_import() {
    let conn = base_conn();
    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category"],
        &[
            &["2024-03-01", "expense", "1500", "KZT", "Kaspi Gold", "Food"],
            &["2024-03-01", "expense", "1500", "KZT", "Kaspi Gold", "Food"],
        ],
    );

    // Dedup only guards against pre-existing ledger data.
    let result = run_import(&conn, &file);
    assert_eq!(result.imported, 2);
    assert_eq!(result.duplicates_skipped, 0);
    assert_eq!(tx_count(&conn), 2);
}

#[test]
fn batching_is_transparent_to_results() {
    let conn = base_conn();
    // 1,200 rows crosses the 500-row flush boundary twice.
    let owned: Vec<Vec<String>> = (0..1200)
        .map(|i| {
            vec![
                format!("2024-03-{:02}", (i % 28) + 1),
                "expense".to_string(),
                "10".to_string(),
                "KZT".to_string(),
                "Kaspi Gold".to_string(),
                "Food".to_string(),
            ]
        })
        .collect();
    let file = ParsedFile {
        headers: ["date", "type", "amount", "currency", "account", "category"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows: owned,
    };

    let result = run_import(&conn, &file);
    assert_eq!(result.imported, 1200);
    assert_eq!(tx_count(&conn), 1200);

    let balance: String = conn
        .query_row("SELECT balance FROM accounts WHERE name='Kaspi Gold'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(balance, "-12000");
    let cached: i64 = conn
        .query_row("SELECT SUM(tx_count) FROM category_totals", [], |r| r.get(0))
        .unwrap();
    assert_eq!(cached, 1200);
}

#[test]
fn progress_reaches_one() {
    let conn = base_conn();
    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category"],
        &[
            &["2024-03-01", "expense", "100", "KZT", "A", "Food"],
            &["bad", "expense", "100", "KZT", "A", "Food"],
            &["2024-03-03", "expense", "100", "KZT", "A", "Food"],
        ],
    );

    let accounts = AccountDirectory::new(&conn);
    let categories = CategoryDirectory::new(&conn);
    let mut ledger = TransactionLedger::new(&conn);
    let mut seen = Vec::new();
    let mut progress = |f: f64| seen.push(f);
    import::import_transactions(
        &file,
        &ColumnMapping::standard(),
        &EntityMapping::default(),
        &mut ledger,
        &accounts,
        &categories,
        Some(&mut progress),
    )
    .unwrap();

    // Skipped rows still advance progress.
    assert_eq!(seen.len(), 3);
    assert!((seen[2] - 1.0).abs() < f64::EPSILON);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn failed_import_rolls_back_and_leaves_the_connection_reusable() {
    let conn = base_conn();
    // Sabotage storage so the first row fails mid-resolution.
    conn.execute_batch("DROP TABLE subcategories").unwrap();

    let file = parsed_file(
        &["date", "type", "amount", "currency", "account", "category", "subcategories"],
        &[&["2024-03-01", "expense", "1500", "KZT", "Kaspi Gold", "Food", "coffee"]],
    );

    let accounts = AccountDirectory::new(&conn);
    let categories = CategoryDirectory::new(&conn);
    let mut ledger = TransactionLedger::new(&conn);
    let err = import::import_transactions(
        &file,
        &ColumnMapping::standard(),
        &EntityMapping::default(),
        &mut ledger,
        &accounts,
        &categories,
        None,
    )
    .unwrap_err();
    assert!(err.to_string().contains("no such table"), "unexpected error: {err}");

    // The account created before the failure must not survive it.
    let accounts_left: i64 =
        conn.query_row("SELECT COUNT(*) FROM accounts", [], |r| r.get(0)).unwrap();
    assert_eq!(accounts_left, 0);

    // Once the cause is repaired, re-invoking on the same connection works.
    conn.execute_batch(
        "CREATE TABLE subcategories(id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE)",
    )
    .unwrap();
    let result = run_import(&conn, &file);
    assert_eq!(result.imported, 1);
    assert!(result.errors.is_empty());
    assert_eq!(tx_count(&conn), 1);
}
