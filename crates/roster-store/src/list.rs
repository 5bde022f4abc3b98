//! The buddy list: arena, indices and the primitives every operation uses.
//!
//! Operations are grouped by node kind in sibling modules (`buddies`,
//! `contacts`, `groups`, `chats`), each adding an `impl BuddyList` block.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, warn};

use roster_shared::constants::DEFAULT_BUDDY_GROUP;
use roster_shared::{AccountId, Accounts, SettingValue};

use crate::arena::{Arena, NodeId};
use crate::config::StoreConfig;
use crate::counts::{zero_edge, Counter, Counts};
use crate::events::{BlistEvent, Changes, ListObserver};
use crate::index::{BuddyIndex, BuddyKey, GroupIndex};
use crate::node::{Buddy, Chat, Contact, Contribution, Group, Node, NodeKind};
use crate::persist::schedule::SaveSchedule;

/// An in-memory buddy list bound to an account provider.
pub struct BuddyList<A> {
    pub(crate) accounts: A,
    pub(crate) config: StoreConfig,
    pub(crate) nodes: Arena<Node>,
    /// First group of the root sibling chain.
    pub(crate) root: Option<NodeId>,
    pub(crate) buddy_index: BuddyIndex,
    pub(crate) group_index: GroupIndex,
    pub(crate) save: SaveSchedule,
    pub(crate) loaded: bool,
    observers: Vec<Box<dyn ListObserver>>,
}

impl<A: std::fmt::Debug> std::fmt::Debug for BuddyList<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuddyList")
            .field("accounts", &self.accounts)
            .field("nodes", &self.nodes.len())
            .field("groups", &self.group_index.len())
            .field("buddies", &self.buddy_index.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Iterator over a sibling chain.
pub struct Siblings<'a> {
    nodes: &'a Arena<Node>,
    next: Option<NodeId>,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.nodes.get(current).and_then(|n| n.links.next);
        Some(current)
    }
}

impl<A: Accounts> BuddyList<A> {
    /// Create an empty list. Every account already known to `accounts` gets a
    /// per-account index table.
    pub fn new(accounts: A, config: StoreConfig) -> Self {
        let mut buddy_index = BuddyIndex::default();
        for account in accounts.account_ids() {
            buddy_index.register_account(account);
        }
        let save = SaveSchedule::new(config.save_delay);
        Self {
            accounts,
            config,
            nodes: Arena::default(),
            root: None,
            buddy_index,
            group_index: GroupIndex::default(),
            save,
            loaded: false,
            observers: Vec::new(),
        }
    }

    pub fn accounts(&self) -> &A {
        &self.accounts
    }

    /// Mutable access to the account provider.
    ///
    /// Changing connection or presence state here does not touch the
    /// counters; follow up with [`BuddyList::account_connected`],
    /// [`BuddyList::account_disconnected`] or
    /// [`BuddyList::update_buddy_status`].
    pub fn accounts_mut(&mut self) -> &mut A {
        &mut self.accounts
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn add_observer(&mut self, observer: impl ListObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Start keeping a per-account buddy table for `account`.
    pub fn register_account(&mut self, account: AccountId) {
        self.buddy_index.register_account(account);
    }

    /// Forget an account that is going away: its buddies and chats are
    /// removed from the list, then its per-account table is dropped.
    pub fn unregister_account(&mut self, account: AccountId) -> Changes {
        let mut changes = Changes::new();
        let buddies: Vec<NodeId> = self.buddy_index.for_account(account).collect();
        let chats = self.chats_of(account);
        debug!(
            account = %account,
            buddies = buddies.len(),
            chats = chats.len(),
            "Removing account from buddy list"
        );
        for buddy in buddies {
            self.remove_buddy_into(buddy, &mut changes);
        }
        for chat in chats {
            self.remove_chat_into(chat, &mut changes);
        }
        self.buddy_index.unregister_account(account);
        self.commit(changes)
    }

    // -----------------------------------------------------------------------
    // Node access
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// Number of live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn groups(&self) -> Siblings<'_> {
        Siblings {
            nodes: &self.nodes,
            next: self.root,
        }
    }

    pub fn children(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            nodes: &self.nodes,
            next: self.nodes.get(id).and_then(|n| n.links.first_child),
        }
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last()
    }

    pub fn last_group(&self) -> Option<NodeId> {
        self.groups().last()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.links.parent)
    }

    /// Whether the node is part of the tree rather than merely allocated.
    pub fn is_attached(&self, id: NodeId) -> bool {
        match self.nodes.get(id) {
            Some(node) => match &node.kind {
                NodeKind::Group(g) => self.group_index.get(&g.name) == Some(id),
                _ => node.links.parent.is_some(),
            },
            None => false,
        }
    }

    pub fn group(&self, id: NodeId) -> Option<&Group> {
        self.nodes.get(id).and_then(Node::as_group)
    }

    pub fn contact(&self, id: NodeId) -> Option<&Contact> {
        self.nodes.get(id).and_then(Node::as_contact)
    }

    pub fn buddy(&self, id: NodeId) -> Option<&Buddy> {
        self.nodes.get(id).and_then(Node::as_buddy)
    }

    pub fn chat(&self, id: NodeId) -> Option<&Chat> {
        self.nodes.get(id).and_then(Node::as_chat)
    }

    pub fn counts(&self, id: NodeId) -> Option<Counts> {
        self.nodes.get(id).and_then(Node::counts).copied()
    }

    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Allocate a detached group. Attach it with [`BuddyList::add_group`].
    ///
    /// A name that is empty once control characters are stripped becomes
    /// "Buddies".
    pub fn create_group(&mut self, name: &str) -> NodeId {
        let mut name = strip_unprintable(name);
        if name.is_empty() {
            warn!("Empty group name, using the default group");
            name = DEFAULT_BUDDY_GROUP.to_string();
        }
        self.nodes.insert(Node::new(NodeKind::Group(Group {
            name,
            counts: Counts::default(),
        })))
    }

    /// Allocate a detached, empty contact.
    pub fn create_contact(&mut self) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Contact(Contact::default())))
    }

    /// Allocate a detached buddy. Attach it with [`BuddyList::add_buddy`].
    pub fn create_buddy(&mut self, account: AccountId, name: &str, alias: Option<&str>) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Buddy(Buddy {
            account,
            name: name.to_string(),
            alias: clean_alias(alias),
            server_alias: None,
            icon: None,
            contribution: Contribution::default(),
        })))
    }

    /// Allocate a detached chat with its join components.
    pub fn create_chat(
        &mut self,
        account: AccountId,
        alias: Option<&str>,
        components: BTreeMap<String, String>,
    ) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Chat(Chat {
            account,
            alias: clean_alias(alias),
            components,
            counted: false,
        })))
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Store a typed setting on a node. Returns false for unknown nodes.
    pub fn set_setting(&mut self, id: NodeId, key: &str, value: SettingValue) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            warn!(node = %id, key, "Setting on unknown node ignored");
            return false;
        };
        if node.settings.get(key) == Some(&value) {
            return true;
        }
        node.settings.set(key, value);
        self.save.schedule(Instant::now());
        true
    }

    pub fn remove_setting(&mut self, id: NodeId, key: &str) -> Option<SettingValue> {
        let removed = self.nodes.get_mut(id)?.settings.remove(key);
        if removed.is_some() {
            self.save.schedule(Instant::now());
        }
        removed
    }

    /// Exclude a node (and so its subtree) from the saved document.
    pub fn set_dont_save(&mut self, id: NodeId, dont_save: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.dont_save = dont_save;
        }
    }

    // -----------------------------------------------------------------------
    // Tree primitives
    // -----------------------------------------------------------------------

    /// Splice a detached node under `parent` (the root chain when `None`),
    /// after `after` or as the first child.
    pub(crate) fn link(&mut self, id: NodeId, parent: Option<NodeId>, after: Option<NodeId>) {
        let next = match after {
            Some(prev) => self.nodes.get(prev).and_then(|n| n.links.next),
            None => match parent {
                Some(p) => self.nodes.get(p).and_then(|n| n.links.first_child),
                None => self.root,
            },
        };

        if let Some(node) = self.nodes.get_mut(id) {
            node.links.parent = parent;
            node.links.prev = after;
            node.links.next = next;
        }

        match after {
            Some(prev) => {
                if let Some(node) = self.nodes.get_mut(prev) {
                    node.links.next = Some(id);
                }
            }
            None => match parent {
                Some(p) => {
                    if let Some(node) = self.nodes.get_mut(p) {
                        node.links.first_child = Some(id);
                    }
                }
                None => self.root = Some(id),
            },
        }

        if let Some(n) = next.and_then(|n| self.nodes.get_mut(n)) {
            n.links.prev = Some(id);
        }
    }

    /// Take a node out of its sibling chain. Children stay attached to it.
    pub(crate) fn unlink(&mut self, id: NodeId) {
        let Some(links) = self.nodes.get(id).map(|n| n.links) else {
            return;
        };

        match links.prev {
            Some(prev) => {
                if let Some(node) = self.nodes.get_mut(prev) {
                    node.links.next = links.next;
                }
            }
            None => match links.parent {
                Some(parent) => {
                    if let Some(node) = self.nodes.get_mut(parent) {
                        if node.links.first_child == Some(id) {
                            node.links.first_child = links.next;
                        }
                    }
                }
                None => {
                    if self.root == Some(id) {
                        self.root = links.next;
                    }
                }
            },
        }

        if let Some(node) = links.next.and_then(|n| self.nodes.get_mut(n)) {
            node.links.prev = links.prev;
        }

        if let Some(node) = self.nodes.get_mut(id) {
            node.links.parent = None;
            node.links.prev = None;
            node.links.next = None;
        }
    }

    /// Free a node's slot. The node must already be unlinked and childless.
    pub(crate) fn release(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.remove(id)
    }

    // -----------------------------------------------------------------------
    // Counters
    // -----------------------------------------------------------------------

    /// Change a contact counter and carry the change to its group.
    ///
    /// Totals are passed through as is; current and online only move the
    /// group when the contact counter crosses zero.
    pub(crate) fn change_contact_count(&mut self, contact: NodeId, counter: Counter, delta: i32) {
        let Some(node) = self.nodes.get_mut(contact) else {
            return;
        };
        let group = node.links.parent;
        let Some(contact_node) = node.as_contact_mut() else {
            return;
        };
        let (old, new) = contact_node.counts.change(counter, delta);

        let group_delta = match counter {
            Counter::Total => new as i32 - old as i32,
            Counter::Current | Counter::Online => zero_edge(old, new),
        };
        if group_delta == 0 {
            return;
        }
        if let Some(counts) = group
            .and_then(|g| self.nodes.get_mut(g))
            .and_then(Node::counts_mut)
        {
            counts.change(counter, group_delta);
        }
    }

    pub(crate) fn add_contribution(&mut self, contact: NodeId, contribution: Contribution) {
        self.change_contact_count(contact, Counter::Total, 1);
        if contribution.current {
            self.change_contact_count(contact, Counter::Current, 1);
        }
        if contribution.online {
            self.change_contact_count(contact, Counter::Online, 1);
        }
    }

    pub(crate) fn remove_contribution(&mut self, contact: NodeId, contribution: Contribution) {
        if contribution.online {
            self.change_contact_count(contact, Counter::Online, -1);
        }
        if contribution.current {
            self.change_contact_count(contact, Counter::Current, -1);
        }
        self.change_contact_count(contact, Counter::Total, -1);
    }

    /// Add (`sign = 1`) or remove (`sign = -1`) a contact's share of its group.
    pub(crate) fn apply_contact_share(&mut self, group: NodeId, contact: NodeId, sign: i32) {
        let Some(share) = self.counts(contact).map(|c| c.group_share()) else {
            return;
        };
        if let Some(counts) = self.nodes.get_mut(group).and_then(Node::counts_mut) {
            counts.apply(share, sign);
        }
    }

    /// Add or remove a chat's share of its group.
    pub(crate) fn apply_chat_share(&mut self, group: NodeId, chat: NodeId, sign: i32) {
        let Some(counted) = self.chat(chat).map(|c| c.counted) else {
            return;
        };
        let share = Counts {
            total: 1,
            current: u32::from(counted),
            online: u32::from(counted),
        };
        if let Some(counts) = self.nodes.get_mut(group).and_then(Node::counts_mut) {
            counts.apply(share, sign);
        }
    }

    /// What a buddy on `account` named `name` should count for right now.
    pub(crate) fn live_contribution(&self, account: AccountId, name: &str) -> Contribution {
        let current = self.accounts.is_connected(account);
        Contribution {
            current,
            online: current && self.accounts.buddy_presence(account, name).is_online(),
        }
    }

    // -----------------------------------------------------------------------
    // Keys and events
    // -----------------------------------------------------------------------

    pub(crate) fn buddy_key(&self, account: AccountId, name: &str, group: NodeId) -> BuddyKey {
        BuddyKey {
            name: self.accounts.normalize(account, name),
            account,
            group,
        }
    }

    /// Deliver a finished mutation's events to observers and arm the save.
    pub(crate) fn commit(&mut self, changes: Changes) -> Changes {
        if changes.is_empty() {
            return changes;
        }
        for event in changes.events() {
            for observer in &mut self.observers {
                observer.on_event(event);
            }
        }
        if self.save.schedule(Instant::now()) {
            debug!(events = changes.len(), "Scheduled buddy list save");
        }
        changes
    }

    pub(crate) fn updated(&self, changes: &mut Changes, id: NodeId) {
        changes.push(BlistEvent::NodeUpdated { node: id });
    }
}

/// Drop control characters, which some servers send in names and aliases.
pub(crate) fn strip_unprintable(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// Normalize an alias argument: stripped, and empty means unset.
pub(crate) fn clean_alias(alias: Option<&str>) -> Option<String> {
    alias
        .map(strip_unprintable)
        .filter(|a| !a.is_empty())
}
