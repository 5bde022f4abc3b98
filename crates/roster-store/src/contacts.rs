use std::cmp::Ordering;

use tracing::{debug, warn};

use roster_shared::constants::DEFAULT_BUDDY_GROUP;
use roster_shared::{AccountId, Accounts, Presence};

use crate::arena::NodeId;
use crate::events::{BlistEvent, Changes};
use crate::list::{clean_alias, BuddyList};
use crate::node::NodeType;

impl<A: Accounts> BuddyList<A> {
    // -----------------------------------------------------------------------
    // Move
    // -----------------------------------------------------------------------

    /// Move a contact into `group` (default "Buddies"), after `after` or first.
    ///
    /// When `after` is an attached contact or chat its group wins. Moving
    /// to another group re-keys every buddy; a buddy whose name is already
    /// taken in the destination group is removed instead, which can take the
    /// whole contact with it. Contacts come into existence through
    /// [`BuddyList::add_buddy`]; an empty contact cannot be attached.
    pub fn add_contact(
        &mut self,
        contact: NodeId,
        group: Option<NodeId>,
        after: Option<NodeId>,
    ) -> Changes {
        let mut changes = Changes::new();
        self.add_contact_into(contact, group, after, &mut changes);
        self.commit(changes)
    }

    pub(crate) fn add_contact_into(
        &mut self,
        contact: NodeId,
        group: Option<NodeId>,
        after: Option<NodeId>,
        changes: &mut Changes,
    ) {
        if self.contact(contact).is_none() {
            warn!(node = %contact, "add_contact called on a non-contact node");
            return;
        }
        if after == Some(contact) {
            return;
        }
        if !self.is_attached(contact) {
            warn!(node = %contact, "Refusing to attach an empty contact");
            return;
        }

        let after = after.filter(|a| {
            self.is_attached(*a)
                && matches!(
                    self.node(*a).map(|n| n.node_type()),
                    Some(NodeType::Contact | NodeType::Chat)
                )
        });
        let target = match after {
            Some(a) => self.parent(a),
            None => self.target_group(group, DEFAULT_BUDDY_GROUP, changes),
        };
        let Some(target) = target else {
            return;
        };
        let Some(old_group) = self.parent(contact) else {
            return;
        };
        if old_group == target && self.node(contact).map(|n| n.prev_sibling()) == Some(after) {
            return;
        }

        if old_group != target {
            let from = self.group_name(old_group);
            let to = self.group_name(target);
            let buddies: Vec<NodeId> = self.children(contact).collect();
            for buddy in buddies {
                let Some((account, name)) =
                    self.buddy(buddy).map(|b| (b.account, b.name.clone()))
                else {
                    continue;
                };
                let connected = self.accounts.is_connected(account);
                let old_key = self.buddy_key(account, &name, old_group);
                let new_key = self.buddy_key(account, &name, target);

                if self.buddy_index.get(&new_key).is_some_and(|b| b != buddy) {
                    debug!(buddy = %name, group = %to, "Buddy already in destination, dropping duplicate");
                    if connected {
                        changes.push(BlistEvent::ServerRemoveBuddy {
                            account,
                            name: name.clone(),
                            group: from.clone(),
                        });
                    }
                    self.remove_buddy_into(buddy, changes);
                    continue;
                }

                self.buddy_index.remove(&old_key, buddy);
                self.buddy_index.insert(new_key, buddy);
                if connected {
                    changes.push(BlistEvent::ServerMoveBuddy {
                        account,
                        name,
                        from_group: from.clone(),
                        to_group: to.clone(),
                    });
                }
            }
            if !self.contains(contact) {
                return;
            }
        }

        self.unlink(contact);
        self.apply_contact_share(old_group, contact, -1);
        self.link(contact, Some(target), after);
        self.apply_contact_share(target, contact, 1);
        changes.push(BlistEvent::NodeAdded {
            node: contact,
            kind: NodeType::Contact,
        });
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Remove a contact. Buddies are removed one at a time, so each produces
    /// its own removal events before the contact's.
    pub fn remove_contact(&mut self, contact: NodeId) -> Changes {
        let mut changes = Changes::new();
        self.remove_contact_into(contact, &mut changes);
        self.commit(changes)
    }

    pub(crate) fn remove_contact_into(&mut self, contact: NodeId, changes: &mut Changes) {
        if self.contact(contact).is_none() {
            warn!(node = %contact, "remove_contact called on a non-contact node");
            return;
        }

        let buddies: Vec<NodeId> = self.children(contact).collect();
        if !buddies.is_empty() {
            // the last removal takes the contact with it
            for buddy in buddies {
                self.remove_buddy_into(buddy, changes);
            }
            return;
        }

        if let Some(group) = self.parent(contact) {
            self.unlink(contact);
            self.apply_contact_share(group, contact, -1);
            changes.push(BlistEvent::NodeRemoved {
                node: contact,
                kind: NodeType::Contact,
            });
        }
        self.release(contact);
    }

    // -----------------------------------------------------------------------
    // Merge / Alias
    // -----------------------------------------------------------------------

    /// Move every buddy of `source` into the contact `node`, or right after
    /// the buddy `node`. The emptied source contact disappears.
    pub fn merge_contact(&mut self, source: NodeId, node: NodeId) -> Changes {
        let mut changes = Changes::new();
        if self.contact(source).is_none() || source == node {
            warn!(node = %source, "merge_contact needs a distinct source contact");
            return changes;
        }
        let (target, mut prev) = match self.node(node).map(|n| n.node_type()) {
            Some(NodeType::Contact) => (node, self.last_child(node)),
            Some(NodeType::Buddy) => match self.parent(node) {
                Some(contact) => (contact, Some(node)),
                None => return changes,
            },
            _ => {
                warn!(node = %node, "merge_contact target must be a contact or buddy");
                return changes;
            }
        };
        if target == source {
            return changes;
        }

        let buddies: Vec<NodeId> = self.children(source).collect();
        for buddy in buddies {
            if self.add_buddy_into(buddy, Some(target), None, prev, &mut changes) {
                prev = Some(buddy);
            }
        }
        self.commit(changes)
    }

    /// Set or clear the user alias of a contact.
    pub fn alias_contact(&mut self, contact: NodeId, alias: Option<&str>) -> Changes {
        let mut changes = Changes::new();
        let alias = clean_alias(alias);
        let Some(node) = self.nodes.get_mut(contact).and_then(|n| n.as_contact_mut()) else {
            warn!(node = %contact, "alias_contact called on a non-contact node");
            return changes;
        };
        if node.alias == alias {
            return changes;
        }
        let old_alias = std::mem::replace(&mut node.alias, alias);
        changes.push(BlistEvent::NodeAliased {
            node: contact,
            old_alias,
        });
        self.commit(changes)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The buddy that represents the contact: the first buddy, unless a
    /// later buddy on a connected account is more available.
    ///
    /// Cached until the contact's membership or a member's status changes.
    pub fn priority_buddy(&self, contact: NodeId) -> Option<NodeId> {
        let c = self.contact(contact)?;
        if c.priority_valid.get() {
            if let Some(p) = c.priority.get().filter(|p| self.parent(*p) == Some(contact)) {
                return Some(p);
            }
        }
        let priority = self.compute_priority(contact);
        c.priority.set(priority);
        c.priority_valid.set(true);
        priority
    }

    fn compute_priority(&self, contact: NodeId) -> Option<NodeId> {
        let last_match = self.config.contact_last_match;
        let mut best: Option<(NodeId, bool, Presence)> = None;

        for id in self.children(contact) {
            let Some(buddy) = self.buddy(id) else {
                continue;
            };
            let connected = self.accounts.is_connected(buddy.account);
            let presence = if connected {
                self.accounts.buddy_presence(buddy.account, &buddy.name)
            } else {
                Presence::Offline
            };

            let Some((_, best_connected, best_presence)) = best else {
                best = Some((id, connected, presence));
                continue;
            };
            if !connected {
                continue;
            }
            let cmp = if best_connected {
                presence.cmp(&best_presence)
            } else {
                Ordering::Greater
            };
            if cmp == Ordering::Greater || (cmp == Ordering::Equal && last_match) {
                best = Some((id, connected, presence));
            }
        }
        best.map(|(id, _, _)| id)
    }

    pub(crate) fn invalidate_priority(&self, contact: NodeId) {
        if let Some(c) = self.contact(contact) {
            c.invalidate_priority();
        }
    }

    /// The contact alias, or the display name of its priority buddy.
    pub fn contact_display_alias(&self, contact: NodeId) -> Option<String> {
        let c = self.contact(contact)?;
        if let Some(alias) = &c.alias {
            return Some(alias.clone());
        }
        self.priority_buddy(contact)
            .and_then(|b| self.buddy_display_alias(b))
    }

    /// Whether any buddy of the contact belongs to `account`.
    pub fn contact_on_account(&self, contact: NodeId, account: AccountId) -> bool {
        self.children(contact)
            .any(|b| self.buddy(b).is_some_and(|b| b.account == account))
    }

    /// Buddies of the contact: all with `offline`, else only connected ones.
    pub fn contact_size(&self, contact: NodeId, offline: bool) -> u32 {
        self.contact(contact)
            .map(|c| if offline { c.counts.total } else { c.counts.current })
            .unwrap_or(0)
    }

    pub(crate) fn group_name(&self, group: NodeId) -> String {
        self.group(group)
            .map(|g| g.name.clone())
            .unwrap_or_default()
    }
}
