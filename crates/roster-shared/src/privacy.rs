//! Per-account privacy settings persisted alongside the buddy list.

use serde::{Deserialize, Serialize};

use crate::error::RosterError;

/// Who may contact the account holder.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PrivacyMode {
    #[default]
    AllowAll,
    DenyAll,
    AllowUsers,
    DenyUsers,
    AllowBuddyList,
}

impl PrivacyMode {
    /// Numeric code used in the persisted form.
    pub fn code(self) -> i64 {
        match self {
            PrivacyMode::AllowAll => 1,
            PrivacyMode::DenyAll => 2,
            PrivacyMode::AllowUsers => 3,
            PrivacyMode::DenyUsers => 4,
            PrivacyMode::AllowBuddyList => 5,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, RosterError> {
        match code {
            1 => Ok(PrivacyMode::AllowAll),
            2 => Ok(PrivacyMode::DenyAll),
            3 => Ok(PrivacyMode::AllowUsers),
            4 => Ok(PrivacyMode::DenyUsers),
            5 => Ok(PrivacyMode::AllowBuddyList),
            other => Err(RosterError::UnknownPrivacyMode(other)),
        }
    }
}

/// Privacy mode plus the explicit permit and deny lists of one account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Privacy {
    pub mode: PrivacyMode,
    pub permit: Vec<String>,
    pub deny: Vec<String>,
}

impl Privacy {
    /// Add a name to the permit list. Returns false if it was already there.
    pub fn permit_add(&mut self, name: impl Into<String>) -> bool {
        push_unique(&mut self.permit, name.into())
    }

    /// Add a name to the deny list. Returns false if it was already there.
    pub fn deny_add(&mut self, name: impl Into<String>) -> bool {
        push_unique(&mut self.deny, name.into())
    }

    pub fn permit_remove(&mut self, name: &str) -> bool {
        remove_value(&mut self.permit, name)
    }

    pub fn deny_remove(&mut self, name: &str) -> bool {
        remove_value(&mut self.deny, name)
    }

    pub fn is_default(&self) -> bool {
        *self == Privacy::default()
    }
}

fn push_unique(list: &mut Vec<String>, name: String) -> bool {
    if list.contains(&name) {
        return false;
    }
    list.push(name);
    true
}

fn remove_value(list: &mut Vec<String>, name: &str) -> bool {
    let before = list.len();
    list.retain(|n| n != name);
    list.len() != before
}
