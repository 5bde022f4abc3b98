//! Lookup indices derived from the tree.
//!
//! Buddies are keyed by `(normalized name, account, group)`. Names are
//! normalized once by the account when a key is built; keys themselves hash
//! and compare as plain values.

use std::collections::HashMap;

use roster_shared::AccountId;

use crate::arena::NodeId;

/// Index key of a buddy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuddyKey {
    pub name: String,
    pub account: AccountId,
    pub group: NodeId,
}

/// Global and per-account buddy indices.
#[derive(Debug, Default)]
pub(crate) struct BuddyIndex {
    global: HashMap<BuddyKey, NodeId>,
    by_account: HashMap<AccountId, HashMap<BuddyKey, NodeId>>,
}

impl BuddyIndex {
    pub fn register_account(&mut self, account: AccountId) {
        self.by_account.entry(account).or_default();
    }

    /// Drop the per-account table. Returns how many entries it held.
    pub fn unregister_account(&mut self, account: AccountId) -> usize {
        self.by_account.remove(&account).map_or(0, |m| m.len())
    }

    pub fn insert(&mut self, key: BuddyKey, buddy: NodeId) {
        self.by_account
            .entry(key.account)
            .or_default()
            .insert(key.clone(), buddy);
        self.global.insert(key, buddy);
    }

    /// Remove `key` if it currently points at `buddy`.
    pub fn remove(&mut self, key: &BuddyKey, buddy: NodeId) -> bool {
        if self.global.get(key) != Some(&buddy) {
            return false;
        }
        self.global.remove(key);
        if let Some(table) = self.by_account.get_mut(&key.account) {
            table.remove(key);
        }
        true
    }

    pub fn get(&self, key: &BuddyKey) -> Option<NodeId> {
        self.global.get(key).copied()
    }

    pub fn for_account(&self, account: AccountId) -> impl Iterator<Item = NodeId> + '_ {
        self.by_account
            .get(&account)
            .into_iter()
            .flat_map(|table| table.values().copied())
    }

    pub fn account_table(&self, account: AccountId) -> Option<&HashMap<BuddyKey, NodeId>> {
        self.by_account.get(&account)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&BuddyKey, NodeId)> {
        self.global.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.global.len()
    }
}

/// Key under which a group name is unique.
pub fn collation_key(name: &str) -> String {
    name.to_lowercase()
}

/// Groups by collation key.
#[derive(Debug, Default)]
pub(crate) struct GroupIndex {
    groups: HashMap<String, NodeId>,
}

impl GroupIndex {
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.groups.get(&collation_key(name)).copied()
    }

    pub fn insert(&mut self, name: &str, group: NodeId) -> Option<NodeId> {
        self.groups.insert(collation_key(name), group)
    }

    pub fn remove(&mut self, name: &str, group: NodeId) -> bool {
        let key = collation_key(name);
        if self.groups.get(&key) != Some(&group) {
            return false;
        }
        self.groups.remove(&key);
        true
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}
