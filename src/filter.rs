//! Subscriber content filters.
//!
//! RSS and Twitter subscribers carry independent allow and deny word lists.
//! Almanax subscribers carry either an allow-list or a deny-list of bonus
//! type ids, never both.

use std::collections::BTreeSet;

use crate::{HookError, Result};

/// Decide whether `text` passes a subscriber's word lists.
///
/// Matching is case-insensitive substring matching. An allow match
/// overrides a deny match; with only an allow-list present at least one
/// term must match.
pub fn keep(allow: &[String], deny: &[String], text: &str) -> bool {
    let lower = text.to_lowercase();
    let matches = |terms: &[String]| terms.iter().any(|t| lower.contains(&t.to_lowercase()));

    match (allow.is_empty(), deny.is_empty()) {
        (true, true) => true,
        (true, false) => !matches(deny),
        (false, true) => matches(allow),
        (false, false) => !matches(deny) || matches(allow),
    }
}

/// Subscriber filter on Almanax bonus type ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BonusFilter {
    /// Every bonus passes.
    #[default]
    Any,
    /// Only the listed bonus ids pass.
    Allow(BTreeSet<String>),
    /// Every bonus except the listed ids passes.
    Deny(BTreeSet<String>),
}

impl BonusFilter {
    /// Build a filter from optional stored lists.
    ///
    /// Empty lists count as absent. Both lists non-empty is rejected.
    pub fn from_lists(allow: Option<Vec<String>>, deny: Option<Vec<String>>) -> Result<Self> {
        let allow = allow.filter(|l| !l.is_empty());
        let deny = deny.filter(|l| !l.is_empty());

        match (allow, deny) {
            (Some(_), Some(_)) => Err(HookError::Validation(
                "bonus whitelist and blacklist are mutually exclusive".to_string(),
            )),
            (Some(allow), None) => Ok(Self::Allow(allow.into_iter().collect())),
            (None, Some(deny)) => Ok(Self::Deny(deny.into_iter().collect())),
            (None, None) => Ok(Self::Any),
        }
    }

    /// Whether a bonus with this type id passes the filter.
    pub fn keeps(&self, bonus_id: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Allow(ids) => ids.contains(bonus_id),
            Self::Deny(ids) => !ids.contains(bonus_id),
        }
    }

    /// Allow-list for persistence, if any.
    pub fn allow_list(&self) -> Option<Vec<String>> {
        match self {
            Self::Allow(ids) => Some(ids.iter().cloned().collect()),
            _ => None,
        }
    }

    /// Deny-list for persistence, if any.
    pub fn deny_list(&self) -> Option<Vec<String>> {
        match self {
            Self::Deny(ids) => Some(ids.iter().cloned().collect()),
            _ => None,
        }
    }

    /// All bonus ids referenced by the filter.
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        let set = match self {
            Self::Any => None,
            Self::Allow(ids) | Self::Deny(ids) => Some(ids),
        };
        set.into_iter().flatten()
    }
}
