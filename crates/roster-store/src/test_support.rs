//! Fixtures shared by the unit tests.

use roster_shared::{AccountId, AccountRegistry};

use crate::arena::NodeId;
use crate::config::StoreConfig;
use crate::events::{BlistEvent, Changes};
use crate::list::BuddyList;

pub type TestList = BuddyList<AccountRegistry>;

/// An empty list with one connected jabber account, "me".
pub fn connected_list() -> (TestList, AccountId) {
    let mut accounts = AccountRegistry::new();
    let acct = accounts.add("me", "prpl-jabber");
    accounts.set_connected(acct, true);
    (BuddyList::new(accounts, StoreConfig::default()), acct)
}

/// Add a new buddy in a new contact at the end of `group` ("Buddies" when
/// `None`).
pub fn add(list: &mut TestList, acct: AccountId, name: &str, group: Option<&str>) -> NodeId {
    let buddy = list.create_buddy(acct, name, None);
    let group = group.map(|g| list.ensure_group(g));
    list.add_buddy(buddy, None, group, None);
    buddy
}

/// Add a new buddy right after `existing`, in its contact.
pub fn add_to_contact(list: &mut TestList, acct: AccountId, name: &str, existing: NodeId) -> NodeId {
    let buddy = list.create_buddy(acct, name, None);
    let contact = list.contact_of(existing);
    list.add_buddy(buddy, contact, None, Some(existing));
    buddy
}

pub fn assert_consistent(list: &TestList) {
    let problems = list.check_consistency();
    assert!(problems.is_empty(), "inconsistent list: {problems:?}");
}

pub fn group_names(list: &TestList) -> Vec<String> {
    list.groups()
        .filter_map(|g| list.group(g).map(|g| g.name().to_string()))
        .collect()
}

pub fn event_kinds(changes: &Changes) -> Vec<&'static str> {
    changes
        .events()
        .iter()
        .map(|event| match event {
            BlistEvent::NodeAdded { .. } => "NodeAdded",
            BlistEvent::NodeRemoved { .. } => "NodeRemoved",
            BlistEvent::BuddyAdded { .. } => "BuddyAdded",
            BlistEvent::BuddyRemoved { .. } => "BuddyRemoved",
            BlistEvent::NodeUpdated { .. } => "NodeUpdated",
            BlistEvent::NodeAliased { .. } => "NodeAliased",
            BlistEvent::BuddyIconChanged { .. } => "BuddyIconChanged",
            BlistEvent::BuddySignedOn { .. } => "BuddySignedOn",
            BlistEvent::BuddySignedOff { .. } => "BuddySignedOff",
            BlistEvent::BuddyStatusChanged { .. } => "BuddyStatusChanged",
            BlistEvent::ServerMoveBuddy { .. } => "ServerMoveBuddy",
            BlistEvent::ServerRemoveBuddy { .. } => "ServerRemoveBuddy",
            BlistEvent::ServerRemoveGroup { .. } => "ServerRemoveGroup",
            BlistEvent::ServerRenameGroup { .. } => "ServerRenameGroup",
        })
        .collect()
}
