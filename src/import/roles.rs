// Copyright (c) 2025 Kopilka Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Type-dependent column semantics. Income rows store source and
//! destination in reversed logical slots relative to expense rows, so the
//! raw account/category/target-account cells must be re-assigned to their
//! effective roles before entity resolution.

use crate::models::TransactionType;

/// Role-resolved values used for lookup/creation.
#[derive(Debug, PartialEq, Eq)]
pub struct EffectiveRoles {
    pub account: String,
    pub category: String,
}

pub fn resolve_roles(
    r#type: TransactionType,
    account_raw: &str,
    category_raw: &str,
    target_account_raw: &str,
) -> EffectiveRoles {
    match r#type {
        TransactionType::Income => {
            if !target_account_raw.is_empty() {
                // The target-account cell names the account being credited;
                // the account cell names the income source, which reads as
                // the category.
                EffectiveRoles {
                    account: target_account_raw.to_string(),
                    category: account_raw.to_string(),
                }
            } else {
                // Legacy exports without a target-account column put the
                // credited account in the category cell.
                EffectiveRoles {
                    account: category_raw.to_string(),
                    category: account_raw.to_string(),
                }
            }
        }
        TransactionType::InternalTransfer => EffectiveRoles {
            account: account_raw.to_string(),
            // Transfers are never user-categorized; the resolver substitutes
            // the default transfer category.
            category: String::new(),
        },
        _ => EffectiveRoles {
            account: account_raw.to_string(),
            category: category_raw.to_string(),
        },
    }
}

/// Placeholder values that look like accounts in some exports but are
/// category placeholders; they must never be auto-created as accounts.
pub fn is_reserved_account_name(name: &str) -> bool {
    let n = name.trim().to_lowercase();
    n == "other" || n == "другое"
}
