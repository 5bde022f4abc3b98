//! Accounts as seen by the buddy list.
//!
//! The buddy list only reads account state: whether an account is connected,
//! how it canonicalizes buddy names and what presence it reports for a buddy.
//! [`Accounts`] is that contract; [`AccountRegistry`] is an in-memory
//! implementation used by the command line tool and by tests.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::constants::DEFAULT_CHAT_IDENTIFIER;
use crate::privacy::Privacy;
use crate::types::{AccountId, Presence};

/// Account and presence state consumed by the buddy list store.
pub trait Accounts {
    /// Whether the account currently has a live connection.
    fn is_connected(&self, account: AccountId) -> bool;

    /// Canonical form of a buddy name for this account.
    fn normalize(&self, account: AccountId, name: &str) -> String;

    /// Presence the account reports for one of its buddies.
    fn buddy_presence(&self, account: AccountId, name: &str) -> Presence;

    fn username(&self, account: AccountId) -> Option<&str>;

    fn protocol_id(&self, account: AccountId) -> Option<&str>;

    /// Every known account, in a stable order.
    fn account_ids(&self) -> Vec<AccountId>;

    /// Find the account a persisted record refers to.
    ///
    /// Implementations may register accounts they have not seen before.
    fn resolve(&mut self, username: &str, protocol_id: &str) -> Option<AccountId>;

    fn privacy(&self, account: AccountId) -> Option<&Privacy>;

    fn privacy_mut(&mut self, account: AccountId) -> Option<&mut Privacy>;

    /// Mark every buddy of the account offline.
    fn reset_presences(&mut self, _account: AccountId) {}

    /// Chat component naming the room for chats on this account.
    fn chat_identifier(&self, _account: AccountId) -> &str {
        DEFAULT_CHAT_IDENTIFIER
    }
}

/// How an account canonicalizes buddy names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameNormalization {
    /// Trim surrounding whitespace and lowercase.
    #[default]
    CaseInsensitive,
    /// Names are compared byte for byte.
    Exact,
}

impl NameNormalization {
    pub fn apply(self, name: &str) -> String {
        match self {
            NameNormalization::CaseInsensitive => name.trim().to_lowercase(),
            NameNormalization::Exact => name.to_string(),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub protocol_id: String,
    pub connected: bool,
    pub normalization: NameNormalization,
    pub privacy: Privacy,
    /// Chat component that names a room.
    pub chat_identifier: String,
    /// Presence per normalized buddy name. Absent means offline.
    presences: HashMap<String, Presence>,
}

impl Account {
    fn new(id: AccountId, username: &str, protocol_id: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            protocol_id: protocol_id.to_string(),
            connected: false,
            normalization: NameNormalization::default(),
            privacy: Privacy::default(),
            chat_identifier: DEFAULT_CHAT_IDENTIFIER.to_string(),
            presences: HashMap::new(),
        }
    }

    pub fn online_buddies(&self) -> usize {
        self.presences.len()
    }
}

/// In-memory account registry.
#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    accounts: BTreeMap<AccountId, Account>,
    next_id: u32,
    adopt_unknown: bool,
}

impl AccountRegistry {
    /// Create an empty registry that ignores unknown accounts in [`Accounts::resolve`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`Accounts::resolve`] registers accounts it does not know yet.
    pub fn with_adoption(mut self, adopt_unknown: bool) -> Self {
        self.adopt_unknown = adopt_unknown;
        self
    }

    /// Register an account, or return the existing one with the same identity.
    pub fn add(&mut self, username: &str, protocol_id: &str) -> AccountId {
        if let Some(id) = self.find(username, protocol_id) {
            return id;
        }
        let id = AccountId(self.next_id);
        self.next_id += 1;
        debug!(account = %id, username, protocol_id, "Registering account");
        self.accounts.insert(id, Account::new(id, username, protocol_id));
        id
    }

    pub fn remove(&mut self, account: AccountId) -> Option<Account> {
        let removed = self.accounts.remove(&account);
        if removed.is_some() {
            debug!(account = %account, "Removed account from registry");
        }
        removed
    }

    /// Look an account up by username and protocol. Usernames compare case-insensitively.
    pub fn find(&self, username: &str, protocol_id: &str) -> Option<AccountId> {
        let wanted = NameNormalization::CaseInsensitive.apply(username);
        self.accounts
            .values()
            .find(|a| {
                a.protocol_id == protocol_id
                    && NameNormalization::CaseInsensitive.apply(&a.username) == wanted
            })
            .map(|a| a.id)
    }

    pub fn get(&self, account: AccountId) -> Option<&Account> {
        self.accounts.get(&account)
    }

    pub fn get_mut(&mut self, account: AccountId) -> Option<&mut Account> {
        self.accounts.get_mut(&account)
    }

    /// Flip the connection flag. Presences are left untouched.
    pub fn set_connected(&mut self, account: AccountId, connected: bool) {
        if let Some(acct) = self.accounts.get_mut(&account) {
            acct.connected = connected;
            debug!(account = %account, connected, "Account connection state changed");
        }
    }

    /// Record the presence of a buddy. Returns the previous presence.
    pub fn set_presence(&mut self, account: AccountId, name: &str, presence: Presence) -> Presence {
        let Some(acct) = self.accounts.get_mut(&account) else {
            return Presence::Offline;
        };
        let key = acct.normalization.apply(name);
        let old = if presence.is_online() {
            acct.presences.insert(key, presence)
        } else {
            acct.presences.remove(&key)
        };
        old.unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }
}

impl Accounts for AccountRegistry {
    fn is_connected(&self, account: AccountId) -> bool {
        self.accounts.get(&account).is_some_and(|a| a.connected)
    }

    fn normalize(&self, account: AccountId, name: &str) -> String {
        match self.accounts.get(&account) {
            Some(acct) => acct.normalization.apply(name),
            None => NameNormalization::default().apply(name),
        }
    }

    fn buddy_presence(&self, account: AccountId, name: &str) -> Presence {
        self.accounts
            .get(&account)
            .and_then(|a| a.presences.get(&a.normalization.apply(name)).copied())
            .unwrap_or_default()
    }

    fn username(&self, account: AccountId) -> Option<&str> {
        self.accounts.get(&account).map(|a| a.username.as_str())
    }

    fn protocol_id(&self, account: AccountId) -> Option<&str> {
        self.accounts.get(&account).map(|a| a.protocol_id.as_str())
    }

    fn account_ids(&self) -> Vec<AccountId> {
        self.accounts.keys().copied().collect()
    }

    fn resolve(&mut self, username: &str, protocol_id: &str) -> Option<AccountId> {
        match self.find(username, protocol_id) {
            Some(id) => Some(id),
            None if self.adopt_unknown => Some(self.add(username, protocol_id)),
            None => None,
        }
    }

    fn privacy(&self, account: AccountId) -> Option<&Privacy> {
        self.accounts.get(&account).map(|a| &a.privacy)
    }

    fn privacy_mut(&mut self, account: AccountId) -> Option<&mut Privacy> {
        self.accounts.get_mut(&account).map(|a| &mut a.privacy)
    }

    fn reset_presences(&mut self, account: AccountId) {
        if let Some(acct) = self.accounts.get_mut(&account) {
            acct.presences.clear();
        }
    }

    fn chat_identifier(&self, account: AccountId) -> &str {
        self.accounts
            .get(&account)
            .map(|a| a.chat_identifier.as_str())
            .unwrap_or(DEFAULT_CHAT_IDENTIFIER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut reg = AccountRegistry::new();
        let a = reg.add("alice@example.com", "prpl-jabber");
        let b = reg.add("Alice@Example.com", "prpl-jabber");
        let c = reg.add("alice@example.com", "prpl-irc");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_presence_is_normalized() {
        let mut reg = AccountRegistry::new();
        let a = reg.add("alice", "prpl-jabber");
        reg.set_presence(a, " Bob ", Presence::Away);
        assert_eq!(reg.buddy_presence(a, "bob"), Presence::Away);

        let old = reg.set_presence(a, "BOB", Presence::Offline);
        assert_eq!(old, Presence::Away);
        assert_eq!(reg.buddy_presence(a, "bob"), Presence::Offline);
    }

    #[test]
    fn test_exact_normalization() {
        let mut reg = AccountRegistry::new();
        let a = reg.add("alice", "prpl-irc");
        reg.get_mut(a).unwrap().normalization = NameNormalization::Exact;
        assert_eq!(reg.normalize(a, "Bob"), "Bob");
    }

    #[test]
    fn test_resolve_adoption() {
        let mut strict = AccountRegistry::new();
        assert_eq!(strict.resolve("ghost", "prpl-x"), None);

        let mut adopting = AccountRegistry::new().with_adoption(true);
        let id = adopting.resolve("ghost", "prpl-x").unwrap();
        assert_eq!(adopting.username(id), Some("ghost"));
        assert_eq!(adopting.resolve("ghost", "prpl-x"), Some(id));
    }

    #[test]
    fn test_reset_presences() {
        let mut reg = AccountRegistry::new();
        let a = reg.add("alice", "prpl-jabber");
        reg.set_connected(a, true);
        reg.set_presence(a, "bob", Presence::Available);
        reg.set_presence(a, "carol", Presence::Away);
        assert_eq!(reg.get(a).unwrap().online_buddies(), 2);

        reg.reset_presences(a);
        assert_eq!(reg.get(a).unwrap().online_buddies(), 0);
        assert!(reg.is_connected(a));
    }
}
