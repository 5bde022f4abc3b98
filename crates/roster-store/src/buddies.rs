use tracing::{debug, warn};

use roster_shared::constants::{DEFAULT_BUDDY_GROUP, LAST_SEEN_SETTING};
use roster_shared::{Accounts, Presence};

use crate::arena::NodeId;
use crate::counts::Counter;
use crate::events::{BlistEvent, Changes};
use crate::list::{clean_alias, BuddyList};
use crate::node::{Contribution, NodeType};

/// Where an added buddy's contact comes from.
enum ContactTarget {
    /// An attached contact.
    Existing(NodeId),
    /// A detached contact to append to the group, or a new one.
    Append(Option<NodeId>),
}

impl<A: Accounts> BuddyList<A> {
    // -----------------------------------------------------------------------
    // Add / Move
    // -----------------------------------------------------------------------

    /// Add a buddy to the list, or move it if it is already in it.
    ///
    /// The destination is resolved in this order:
    /// - `after`, an attached buddy: right after it, in its contact;
    /// - `contact`: first in that contact. A detached contact is first
    ///   appended to `group`;
    /// - otherwise a new contact appended to `group`.
    ///
    /// A missing `group` means "Buddies", created on demand. A buddy whose
    /// normalized name is already taken on the same account in the
    /// destination group is not placed. Re-adding a buddy at its current
    /// position changes nothing and emits nothing.
    pub fn add_buddy(
        &mut self,
        buddy: NodeId,
        contact: Option<NodeId>,
        group: Option<NodeId>,
        after: Option<NodeId>,
    ) -> Changes {
        let mut changes = Changes::new();
        self.add_buddy_into(buddy, contact, group, after, &mut changes);
        self.commit(changes)
    }

    /// Returns whether the buddy ended up placed.
    pub(crate) fn add_buddy_into(
        &mut self,
        buddy: NodeId,
        contact: Option<NodeId>,
        group: Option<NodeId>,
        after: Option<NodeId>,
        changes: &mut Changes,
    ) -> bool {
        let Some((account, name, contribution)) = self
            .buddy(buddy)
            .map(|b| (b.account, b.name.clone(), b.contribution))
        else {
            warn!(node = %buddy, "add_buddy called on a non-buddy node");
            return false;
        };
        if after == Some(buddy) {
            return false;
        }
        let after = after.filter(|a| self.buddy(*a).is_some() && self.is_attached(*a));
        let contact = contact.filter(|c| self.contact(*c).is_some());

        let Some(links) = self.node(buddy).map(|n| n.links) else {
            return false;
        };
        if let Some(current) = links.parent {
            let in_place = match after {
                Some(a) => links.prev == Some(a),
                None => contact == Some(current) && links.prev.is_none(),
            };
            if in_place {
                return false;
            }
        }

        // destination group and contact
        let (target_group, target) = if let Some(a) = after {
            let Some(c) = self.parent(a) else {
                return false;
            };
            let Some(g) = self.parent(c) else {
                return false;
            };
            (g, ContactTarget::Existing(c))
        } else {
            match contact {
                Some(c) if self.is_attached(c) => {
                    let Some(g) = self.parent(c) else {
                        return false;
                    };
                    (g, ContactTarget::Existing(c))
                }
                staged => {
                    let Some(g) = self.target_group(group, DEFAULT_BUDDY_GROUP, changes) else {
                        return false;
                    };
                    (g, ContactTarget::Append(staged))
                }
            }
        };

        let new_key = self.buddy_key(account, &name, target_group);
        if self.buddy_index.get(&new_key).is_some_and(|b| b != buddy) {
            warn!(buddy = %name, account = %account, "Buddy already exists in destination group");
            return false;
        }

        // take it out of its old position
        if let Some(old_contact) = links.parent {
            self.remove_contribution(old_contact, contribution);
            if let Some(old_group) = self.parent(old_contact) {
                if old_group != target_group && self.accounts.is_connected(account) {
                    changes.push(BlistEvent::ServerMoveBuddy {
                        account,
                        name: name.clone(),
                        from_group: self.group_name(old_group),
                        to_group: self.group_name(target_group),
                    });
                }
                let old_key = self.buddy_key(account, &name, old_group);
                self.buddy_index.remove(&old_key, buddy);
            }
            self.unlink(buddy);
            if self.children(old_contact).next().is_none() {
                self.remove_contact_into(old_contact, changes);
            } else {
                self.invalidate_priority(old_contact);
            }
        }

        let target_contact = match target {
            ContactTarget::Existing(c) => c,
            ContactTarget::Append(staged) => {
                let c = staged.unwrap_or_else(|| self.create_contact());
                let last = self.last_child(target_group);
                self.link(c, Some(target_group), last);
                changes.push(BlistEvent::NodeAdded {
                    node: c,
                    kind: NodeType::Contact,
                });
                c
            }
        };

        self.link(buddy, Some(target_contact), after);
        let contribution = self.live_contribution(account, &name);
        if let Some(b) = self.nodes.get_mut(buddy).and_then(|n| n.as_buddy_mut()) {
            b.contribution = contribution;
        }
        self.add_contribution(target_contact, contribution);
        self.buddy_index.insert(new_key, buddy);
        self.invalidate_priority(target_contact);

        debug!(buddy = %name, account = %account, "Buddy placed");
        changes.push(BlistEvent::BuddyAdded { buddy });
        changes.push(BlistEvent::NodeAdded {
            node: buddy,
            kind: NodeType::Buddy,
        });
        true
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Remove a buddy. A contact left without buddies is removed right after.
    pub fn remove_buddy(&mut self, buddy: NodeId) -> Changes {
        let mut changes = Changes::new();
        self.remove_buddy_into(buddy, &mut changes);
        self.commit(changes)
    }

    pub(crate) fn remove_buddy_into(&mut self, buddy: NodeId, changes: &mut Changes) {
        let Some((account, name, contribution)) = self
            .buddy(buddy)
            .map(|b| (b.account, b.name.clone(), b.contribution))
        else {
            warn!(node = %buddy, "remove_buddy called on a non-buddy node");
            return;
        };

        let contact = self.parent(buddy);
        if let Some(c) = contact {
            if let Some(group) = self.parent(c) {
                let key = self.buddy_key(account, &name, group);
                self.buddy_index.remove(&key, buddy);
            }
            self.unlink(buddy);
            self.remove_contribution(c, contribution);
            self.invalidate_priority(c);
            changes.push(BlistEvent::BuddyRemoved {
                buddy,
                account,
                name,
            });
            changes.push(BlistEvent::NodeRemoved {
                node: buddy,
                kind: NodeType::Buddy,
            });
        }
        self.release(buddy);

        if let Some(c) = contact {
            if self.children(c).next().is_none() {
                self.remove_contact_into(c, changes);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Rename / Alias / Icon
    // -----------------------------------------------------------------------

    /// Change the protocol name of a buddy, re-keying it in the indices.
    pub fn rename_buddy(&mut self, buddy: NodeId, name: &str) -> Changes {
        let mut changes = Changes::new();
        let Some((account, old_name)) = self.buddy(buddy).map(|b| (b.account, b.name.clone()))
        else {
            warn!(node = %buddy, "rename_buddy called on a non-buddy node");
            return changes;
        };
        if old_name == name {
            return changes;
        }

        if let Some(group) = self.group_of(buddy) {
            let new_key = self.buddy_key(account, name, group);
            if self.buddy_index.get(&new_key).is_some_and(|b| b != buddy) {
                warn!(buddy = %name, "Rename target already exists in group");
                return changes;
            }
            let old_key = self.buddy_key(account, &old_name, group);
            self.buddy_index.remove(&old_key, buddy);
            self.buddy_index.insert(new_key, buddy);
        }
        if let Some(b) = self.nodes.get_mut(buddy).and_then(|n| n.as_buddy_mut()) {
            b.name = name.to_string();
        }
        self.updated(&mut changes, buddy);
        self.commit(changes)
    }

    /// Set or clear the local alias of a buddy.
    pub fn alias_buddy(&mut self, buddy: NodeId, alias: Option<&str>) -> Changes {
        self.set_buddy_alias(buddy, alias, false)
    }

    /// Set or clear the alias the server reports for a buddy.
    pub fn server_alias_buddy(&mut self, buddy: NodeId, alias: Option<&str>) -> Changes {
        self.set_buddy_alias(buddy, alias, true)
    }

    fn set_buddy_alias(&mut self, buddy: NodeId, alias: Option<&str>, server: bool) -> Changes {
        let mut changes = Changes::new();
        let alias = clean_alias(alias);
        let Some(b) = self.nodes.get_mut(buddy).and_then(|n| n.as_buddy_mut()) else {
            warn!(node = %buddy, "Alias on a non-buddy node ignored");
            return changes;
        };
        let slot = if server { &mut b.server_alias } else { &mut b.alias };
        if *slot == alias {
            return changes;
        }
        let old_alias = std::mem::replace(slot, alias);
        changes.push(BlistEvent::NodeAliased {
            node: buddy,
            old_alias,
        });
        self.commit(changes)
    }

    /// Set or clear the icon reference of a buddy.
    pub fn set_buddy_icon(&mut self, buddy: NodeId, icon: Option<&str>) -> Changes {
        let mut changes = Changes::new();
        let Some(b) = self.nodes.get_mut(buddy).and_then(|n| n.as_buddy_mut()) else {
            return changes;
        };
        if b.icon.as_deref() == icon {
            return changes;
        }
        b.icon = icon.map(str::to_string);
        changes.push(BlistEvent::BuddyIconChanged { buddy });
        self.updated(&mut changes, buddy);
        self.commit(changes)
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Bring a buddy's counters in line with the presence its account now
    /// reports. `old` is the presence before the change.
    ///
    /// Nothing is emitted when neither the presence nor the counters moved.
    pub fn update_buddy_status(&mut self, buddy: NodeId, old: Presence) -> Changes {
        let mut changes = Changes::new();
        let Some((account, name, counted)) = self
            .buddy(buddy)
            .map(|b| (b.account, b.name.clone(), b.contribution))
        else {
            warn!(node = %buddy, "update_buddy_status called on a non-buddy node");
            return changes;
        };
        let new = self.accounts.buddy_presence(account, &name);
        let contact = self.parent(buddy);
        let live = match contact {
            Some(_) => self.live_contribution(account, &name),
            None => counted,
        };
        if old == new && live == counted {
            return changes;
        }

        if let Some(c) = contact {
            self.reconcile(c, counted, live);
            if let Some(b) = self.nodes.get_mut(buddy).and_then(|n| n.as_buddy_mut()) {
                b.contribution = live;
            }
            self.invalidate_priority(c);
        }

        if !old.is_online() && new.is_online() {
            changes.push(BlistEvent::BuddySignedOn { buddy });
        } else if old.is_online() && !new.is_online() {
            self.stamp_last_seen(buddy);
            changes.push(BlistEvent::BuddySignedOff { buddy });
        } else if old != new {
            changes.push(BlistEvent::BuddyStatusChanged { buddy, old, new });
        }
        self.updated(&mut changes, buddy);
        self.commit(changes)
    }

    /// Move a contact's counters from what a buddy counted for to `live`.
    pub(crate) fn reconcile(&mut self, contact: NodeId, counted: Contribution, live: Contribution) {
        if live.current && !counted.current {
            self.change_contact_count(contact, Counter::Current, 1);
        }
        if live.online != counted.online {
            self.change_contact_count(contact, Counter::Online, if live.online { 1 } else { -1 });
        }
        if !live.current && counted.current {
            self.change_contact_count(contact, Counter::Current, -1);
        }
    }

    pub(crate) fn stamp_last_seen(&mut self, buddy: NodeId) {
        if let Some(node) = self.nodes.get_mut(buddy) {
            node.settings
                .set_int(LAST_SEEN_SETTING, chrono::Utc::now().timestamp());
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Display name of a buddy: local alias, server alias, then name.
    pub fn buddy_display_alias(&self, buddy: NodeId) -> Option<String> {
        let b = self.buddy(buddy)?;
        Some(
            b.alias
                .as_ref()
                .or(b.server_alias.as_ref())
                .unwrap_or(&b.name)
                .clone(),
        )
    }

    /// Like [`BuddyList::buddy_display_alias`] but a contact alias beats the
    /// server alias.
    pub fn buddy_contact_alias(&self, buddy: NodeId) -> Option<String> {
        let b = self.buddy(buddy)?;
        if let Some(alias) = &b.alias {
            return Some(alias.clone());
        }
        let contact_alias = self
            .contact_of(buddy)
            .and_then(|c| self.contact(c))
            .and_then(|c| c.alias.clone());
        contact_alias.or_else(|| self.buddy_display_alias(buddy))
    }
}

#[cfg(test)]
mod tests {
    use roster_shared::{AccountRegistry, Presence};

    use super::*;
    use crate::config::StoreConfig;
    use crate::counts::Counts;
    use crate::test_support::{
        add, add_to_contact, assert_consistent, connected_list, event_kinds, TestList,
    };

    fn counts(total: u32, current: u32, online: u32) -> Counts {
        Counts {
            total,
            current,
            online,
        }
    }

    #[test]
    fn test_first_buddy_creates_group_and_contact() {
        let (mut list, acct) = connected_list();
        list.accounts_mut()
            .set_presence(acct, "bob", Presence::Available);
        let bob = list.create_buddy(acct, "bob", None);

        let changes = list.add_buddy(bob, None, None, None);

        let group = list.find_group("Buddies").unwrap();
        let contact = list.contact_of(bob).unwrap();
        assert_eq!(list.parent(contact), Some(group));
        assert_eq!(list.counts(group).unwrap(), counts(1, 1, 1));
        assert_eq!(list.counts(contact).unwrap(), counts(1, 1, 1));
        assert_eq!(
            event_kinds(&changes),
            vec!["NodeAdded", "NodeAdded", "BuddyAdded", "NodeAdded"]
        );
        assert_consistent(&list);
    }

    #[test]
    fn test_offline_buddy_counts_current_only() {
        let (mut list, acct) = connected_list();
        let bob = add(&mut list, acct, "bob", None);
        let group = list.group_of(bob).unwrap();
        assert_eq!(list.counts(group).unwrap(), counts(1, 1, 0));
    }

    #[test]
    fn test_second_buddy_in_contact_does_not_double_count() {
        let (mut list, acct) = connected_list();
        let b1 = add(&mut list, acct, "bob", None);
        let group = list.group_of(b1).unwrap();
        let contact = list.contact_of(b1).unwrap();

        add_to_contact(&mut list, acct, "bob2", b1);

        assert_eq!(list.counts(contact).unwrap(), counts(2, 2, 0));
        assert_eq!(list.counts(group).unwrap(), counts(2, 1, 0));
        assert_consistent(&list);
    }

    #[test]
    fn test_remove_last_buddy_cascades_in_order() {
        let (mut list, acct) = connected_list();
        let bob = add(&mut list, acct, "bob", None);
        let group = list.group_of(bob).unwrap();
        let contact = list.contact_of(bob).unwrap();
        let before = list.counts(group).unwrap().total;

        let changes = list.remove_buddy(bob);

        assert!(!list.contains(bob));
        assert!(!list.contains(contact));
        assert_eq!(list.counts(group).unwrap().total, before - 1);
        let buddy_removed = changes
            .position(|e| matches!(e, BlistEvent::BuddyRemoved { .. }))
            .unwrap();
        let contact_removed = changes
            .position(|e| {
                *e == BlistEvent::NodeRemoved {
                    node: contact,
                    kind: NodeType::Contact,
                }
            })
            .unwrap();
        assert!(buddy_removed < contact_removed);
        assert_eq!(list.find_buddy(acct, "bob"), None);
        assert_consistent(&list);
    }

    #[test]
    fn test_move_buddy_between_groups() {
        let (mut list, acct) = connected_list();
        list.accounts_mut()
            .set_presence(acct, "bob", Presence::Available);
        let bob = add(&mut list, acct, "bob", None);
        let buddies = list.group_of(bob).unwrap();
        let work = list.ensure_group("Work");

        let changes = list.add_buddy(bob, None, Some(work), None);

        assert_eq!(list.group_of(bob), Some(work));
        assert_eq!(list.counts(buddies).unwrap(), counts(0, 0, 0));
        assert_eq!(list.counts(work).unwrap(), counts(1, 1, 1));
        assert_eq!(list.find_buddy_in_group(acct, "bob", work), Some(bob));
        assert_eq!(list.find_buddy_in_group(acct, "bob", buddies), None);
        assert_eq!(list.find_buddy(acct, "BOB"), Some(bob));
        assert_eq!(list.find_buddies(acct, None), vec![bob]);
        assert!(changes.contains(&BlistEvent::ServerMoveBuddy {
            account: acct,
            name: "bob".into(),
            from_group: "Buddies".into(),
            to_group: "Work".into(),
        }));
        assert_consistent(&list);
    }

    #[test]
    fn test_add_in_place_is_noop() {
        let (mut list, acct) = connected_list();
        let b1 = add(&mut list, acct, "bob", None);
        let b2 = add_to_contact(&mut list, acct, "bob2", b1);
        let contact = list.contact_of(b1).unwrap();
        let group = list.group_of(b1).unwrap();
        let before = (list.counts(contact), list.counts(group));
        list.save.clear();

        assert!(list.add_buddy(b1, Some(contact), None, None).is_empty());
        assert!(list.add_buddy(b2, None, None, Some(b1)).is_empty());
        assert!(list.add_buddy(b1, None, None, Some(b1)).is_empty());

        assert_eq!((list.counts(contact), list.counts(group)), before);
        assert!(!list.save.is_pending());
    }

    #[test]
    fn test_reorder_inside_contact() {
        let (mut list, acct) = connected_list();
        let b1 = add(&mut list, acct, "a", None);
        let b2 = add_to_contact(&mut list, acct, "b", b1);
        let contact = list.contact_of(b1).unwrap();

        list.add_buddy(b1, None, None, Some(b2));
        assert_eq!(list.children(contact).collect::<Vec<_>>(), vec![b2, b1]);
        assert_eq!(list.counts(contact).unwrap().total, 2);
        assert_consistent(&list);
    }

    #[test]
    fn test_duplicate_in_destination_is_rejected() {
        let (mut list, acct) = connected_list();
        let first = add(&mut list, acct, "bob", None);
        let group = list.group_of(first).unwrap();
        let second = list.create_buddy(acct, "Bob", None);

        assert!(list.add_buddy(second, None, Some(group), None).is_empty());
        assert!(!list.is_attached(second));
        assert_eq!(list.counts(group).unwrap().total, 1);
        list.remove_buddy(second);
        assert!(!list.contains(second));
        assert_consistent(&list);
    }

    #[test]
    fn test_detached_contact_is_placed_with_buddy() {
        let (mut list, acct) = connected_list();
        let group = list.ensure_group("Friends");
        let contact = list.create_contact();
        list.alias_contact(contact, Some("Bobby"));
        let bob = list.create_buddy(acct, "bob", None);

        list.add_buddy(bob, Some(contact), Some(group), None);

        assert_eq!(list.parent(contact), Some(group));
        assert_eq!(list.contact_of(bob), Some(contact));
        assert_eq!(list.buddy_contact_alias(bob).as_deref(), Some("Bobby"));
        assert_consistent(&list);
    }

    #[test]
    fn test_rename_buddy_rekeys() {
        let (mut list, acct) = connected_list();
        let bob = add(&mut list, acct, "bob", None);
        list.rename_buddy(bob, "robert");
        assert_eq!(list.find_buddy(acct, "bob"), None);
        assert_eq!(list.find_buddy(acct, "Robert"), Some(bob));
        assert_consistent(&list);

        let carol = add(&mut list, acct, "carol", None);
        assert!(list.rename_buddy(carol, "ROBERT").is_empty());
        assert_eq!(list.buddy(carol).unwrap().name(), "carol");
    }

    #[test]
    fn test_aliases() {
        let (mut list, acct) = connected_list();
        let bob = add(&mut list, acct, "bob", None);

        list.server_alias_buddy(bob, Some("Bob Server"));
        assert_eq!(list.buddy_display_alias(bob).as_deref(), Some("Bob Server"));

        let changes = list.alias_buddy(bob, Some("Bobby\n"));
        assert_eq!(
            changes.events(),
            &[BlistEvent::NodeAliased {
                node: bob,
                old_alias: None
            }]
        );
        assert_eq!(list.buddy_display_alias(bob).as_deref(), Some("Bobby"));
        assert!(list.alias_buddy(bob, Some("Bobby")).is_empty());

        list.alias_buddy(bob, None);
        let contact = list.contact_of(bob).unwrap();
        list.alias_contact(contact, Some("Robert"));
        assert_eq!(list.buddy_contact_alias(bob).as_deref(), Some("Robert"));
        assert_eq!(list.buddy_display_alias(bob).as_deref(), Some("Bob Server"));
    }

    #[test]
    fn test_icon_change() {
        let (mut list, acct) = connected_list();
        let bob = add(&mut list, acct, "bob", None);
        let changes = list.set_buddy_icon(bob, Some("abc123.png"));
        assert!(changes.contains(&BlistEvent::BuddyIconChanged { buddy: bob }));
        assert_eq!(list.buddy(bob).unwrap().icon(), Some("abc123.png"));
        assert!(list.set_buddy_icon(bob, Some("abc123.png")).is_empty());
    }

    #[test]
    fn test_status_transitions() {
        let (mut list, acct) = connected_list();
        let bob = add(&mut list, acct, "bob", None);
        let bob2 = add_to_contact(&mut list, acct, "bob2", bob);
        let group = list.group_of(bob).unwrap();
        let contact = list.contact_of(bob).unwrap();

        list.accounts_mut().set_presence(acct, "bob", Presence::Available);
        let changes = list.update_buddy_status(bob, Presence::Offline);
        assert!(changes.contains(&BlistEvent::BuddySignedOn { buddy: bob }));
        assert_eq!(list.counts(contact).unwrap().online, 1);
        assert_eq!(list.counts(group).unwrap().online, 1);

        list.accounts_mut().set_presence(acct, "bob2", Presence::Away);
        list.update_buddy_status(bob2, Presence::Offline);
        assert_eq!(list.counts(contact).unwrap().online, 2);
        assert_eq!(list.counts(group).unwrap().online, 1);

        list.accounts_mut().set_presence(acct, "bob", Presence::Away);
        let changes = list.update_buddy_status(bob, Presence::Available);
        assert!(changes.contains(&BlistEvent::BuddyStatusChanged {
            buddy: bob,
            old: Presence::Available,
            new: Presence::Away
        }));

        list.accounts_mut().set_presence(acct, "bob", Presence::Offline);
        list.accounts_mut().set_presence(acct, "bob2", Presence::Offline);
        let changes = list.update_buddy_status(bob, Presence::Away);
        assert!(changes.contains(&BlistEvent::BuddySignedOff { buddy: bob }));
        assert!(list
            .node(bob)
            .unwrap()
            .settings()
            .get_int(LAST_SEEN_SETTING)
            .is_some());
        assert_eq!(list.counts(group).unwrap().online, 1);
        list.update_buddy_status(bob2, Presence::Away);
        assert_eq!(list.counts(group).unwrap().online, 0);
        assert_consistent(&list);
    }

    #[test]
    fn test_unchanged_status_is_silent() {
        let (mut list, acct) = connected_list();
        let bob = add(&mut list, acct, "bob", None);
        list.save.clear();

        assert!(list.update_buddy_status(bob, Presence::Offline).is_empty());
        assert!(!list.save.is_pending());

        // presence unchanged but the counters were stale
        list.accounts_mut().set_presence(acct, "bob", Presence::Available);
        let changes = list.update_buddy_status(bob, Presence::Available);
        assert_eq!(event_kinds(&changes), vec!["NodeUpdated"]);
        assert!(list.buddy(bob).unwrap().contribution().online);
        assert!(list.save.is_pending());
        assert!(list.update_buddy_status(bob, Presence::Available).is_empty());
        assert_consistent(&list);
    }

    #[test]
    fn test_buddy_on_disconnected_account() {
        let mut accounts = AccountRegistry::new();
        let acct = accounts.add("me", "prpl-jabber");
        // reported online, but the account has no connection
        accounts.set_presence(acct, "bob", Presence::Available);
        let mut list: TestList = BuddyList::new(accounts, StoreConfig::default());

        let bob = add(&mut list, acct, "bob", None);
        let group = list.group_of(bob).unwrap();
        assert_eq!(list.counts(group).unwrap(), counts(1, 0, 0));
        assert_consistent(&list);
    }
}
