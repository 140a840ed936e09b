// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Look-up-or-create resolution of accounts, categories, and subcategories.
//! Resolution order per occurrence: explicit entity mapping, then the
//! per-import cache, then the live directory, then auto-creation with a
//! re-check immediately before the create call.

use anyhow::Result;
use std::collections::{HashMap, HashSet};

use crate::directory::{AccountDirectory, CategoryDirectory};
use crate::import::roles::is_reserved_account_name;
use crate::models::{EntityMapping, TransactionType};

pub const DEFAULT_TRANSFER_CATEGORY: &str = "Transfer";
pub const DEFAULT_OTHER_CATEGORY: &str = "Other";

/// Mutable resolution state scoped to exactly one import call. Never
/// shared across imports: the caches may refer to entities the current
/// batch has created but not yet committed.
#[derive(Default)]
pub struct ResolutionContext {
    accounts: HashMap<String, (i64, String)>,
    categories: HashMap<(String, TransactionType), i64>,
    subcategories: HashMap<String, i64>,
    /// Deferred subcategory->category links, persisted at settlement.
    pub pending_category_links: HashSet<(i64, i64)>,
    pub created_accounts: usize,
    pub created_categories: usize,
    pub created_subcategories: usize,
}

impl ResolutionContext {
    /// Resolves an effective account value to (id, canonical name).
    /// Empty and reserved placeholder values resolve to no account.
    /// Auto-created accounts take the row's currency and a zero balance.
    pub fn resolve_account(
        &mut self,
        directory: &AccountDirectory,
        mapping: &EntityMapping,
        raw: &str,
        currency: &str,
    ) -> Result<Option<(i64, String)>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        if let Some(id) = mapping.accounts.get(raw) {
            if let Some(acct) = directory.get(*id)? {
                self.accounts
                    .insert(raw.to_lowercase(), (acct.id, acct.name.clone()));
                return Ok(Some((acct.id, acct.name)));
            }
        }
        let key = raw.to_lowercase();
        if let Some((id, name)) = self.accounts.get(&key) {
            return Ok(Some((*id, name.clone())));
        }
        if let Some(acct) = directory.find_by_name(raw)? {
            self.accounts.insert(key, (acct.id, acct.name.clone()));
            return Ok(Some((acct.id, acct.name)));
        }
        // Placeholder values are category markers, never auto-created as
        // accounts.
        if is_reserved_account_name(raw) {
            return Ok(None);
        }
        // Re-check before creating: the directory may have gained this
        // account since the scan above.
        let (id, name) = match directory.find_by_name(raw)? {
            Some(acct) => (acct.id, acct.name),
            None => {
                let id = directory.create(raw, currency)?;
                self.created_accounts += 1;
                (id, raw.to_string())
            }
        };
        self.accounts.insert(key, (id, name.clone()));
        Ok(Some((id, name)))
    }

    /// Resolves an effective category value to (id, name). An empty value
    /// falls back to the type-dependent default name, which is itself
    /// looked-up-or-created.
    pub fn resolve_category(
        &mut self,
        directory: &CategoryDirectory,
        mapping: &EntityMapping,
        raw: &str,
        r#type: TransactionType,
    ) -> Result<(i64, String)> {
        let raw = raw.trim();
        let name = match mapping.categories.get(raw) {
            Some(mapped) => mapped.clone(),
            None => raw.to_string(),
        };
        let name = if name.is_empty() {
            default_category_name(r#type).to_string()
        } else {
            name
        };

        let key = (name.clone(), r#type);
        if let Some(id) = self.categories.get(&key) {
            return Ok((*id, name));
        }
        if let Some(id) = directory.find(&name, r#type)? {
            self.categories.insert(key, id);
            return Ok((id, name));
        }
        let (icon, color) = derive_icon_color(&name, r#type, directory)?;
        // Re-check before creating, same race guard as accounts.
        let id = match directory.find(&name, r#type)? {
            Some(id) => id,
            None => {
                let id = directory.create(&name, r#type, &icon, &color)?;
                self.created_categories += 1;
                id
            }
        };
        self.categories.insert(key, id);
        Ok((id, name))
    }

    /// Splits the subcategory cell on the configured separator and
    /// resolves each token. Category links are deferred into
    /// `pending_category_links`; transaction links are the caller's to
    /// accumulate once the transaction id is known.
    pub fn resolve_subcategories(
        &mut self,
        directory: &CategoryDirectory,
        raw: &str,
        separator: &str,
        category_id: i64,
    ) -> Result<Vec<(i64, String)>> {
        let mut out = Vec::new();
        for token in raw.split(separator) {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let key = token.to_lowercase();
            let id = match self.subcategories.get(&key) {
                Some(id) => *id,
                None => {
                    let id = match directory.find_subcategory(token)? {
                        Some(id) => id,
                        None => {
                            let id = directory.create_subcategory(token)?;
                            self.created_subcategories += 1;
                            id
                        }
                    };
                    self.subcategories.insert(key, id);
                    id
                }
            };
            self.pending_category_links.insert((id, category_id));
            out.push((id, token.to_string()));
        }
        Ok(out)
    }
}

pub fn default_category_name(r#type: TransactionType) -> &'static str {
    match r#type {
        TransactionType::InternalTransfer => DEFAULT_TRANSFER_CATEGORY,
        _ => DEFAULT_OTHER_CATEGORY,
    }
}

const CATEGORY_COLORS: &[&str] = &[
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#008080", "#9a6324", "#800000",
];

const EXPENSE_ICONS: &[&str] = &[
    "cart", "fork.knife", "car", "house", "cross.case", "tshirt", "gamecontroller", "gift",
];
const INCOME_ICONS: &[&str] = &["dollarsign.circle", "briefcase", "chart.line.uptrend", "gift"];
const TRANSFER_ICONS: &[&str] = &["arrow.left.arrow.right"];
const DEPOSIT_ICONS: &[&str] = &["banknote", "percent", "lock"];

fn stable_hash(name: &str, r#type: TransactionType) -> usize {
    // FNV-1a over the lowercased name plus the type tag; must stay stable
    // across runs, so no std RandomState here.
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in name.to_lowercase().bytes().chain(r#type.as_str().bytes()) {
        h ^= b as u64;
        h = h.wrapping_mul(0x1000_0000_01b3);
    }
    h as usize
}

/// Deterministic icon/color for an auto-created category: a stable hash
/// picks the starting slot, then the color probes forward past colors
/// already used by same-type categories until the palette is exhausted.
pub fn derive_icon_color(
    name: &str,
    r#type: TransactionType,
    directory: &CategoryDirectory,
) -> Result<(String, String)> {
    let icons = match r#type {
        TransactionType::Expense => EXPENSE_ICONS,
        TransactionType::Income => INCOME_ICONS,
        TransactionType::InternalTransfer => TRANSFER_ICONS,
        _ => DEPOSIT_ICONS,
    };
    let seed = stable_hash(name, r#type);
    let icon = icons[seed % icons.len()].to_string();

    let used: HashSet<String> = directory
        .list()?
        .into_iter()
        .filter(|c| c.r#type == r#type)
        .map(|c| c.color)
        .collect();
    let start = seed % CATEGORY_COLORS.len();
    let mut color = CATEGORY_COLORS[start];
    for offset in 0..CATEGORY_COLORS.len() {
        let candidate = CATEGORY_COLORS[(start + offset) % CATEGORY_COLORS.len()];
        if !used.contains(candidate) {
            color = candidate;
            break;
        }
    }
    Ok((icon, color.to_string()))
}
