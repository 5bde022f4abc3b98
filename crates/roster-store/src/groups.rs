use tracing::{debug, warn};

use roster_shared::constants::DEFAULT_BUDDY_GROUP;
use roster_shared::{AccountId, Accounts};

use crate::arena::NodeId;
use crate::events::{BlistEvent, Changes};
use crate::list::{strip_unprintable, BuddyList};
use crate::node::NodeType;

impl<A: Accounts> BuddyList<A> {
    // -----------------------------------------------------------------------
    // Create / Move
    // -----------------------------------------------------------------------

    /// Attach a group to the root chain after `after`, or first.
    ///
    /// Names are unique: if another group already carries this name, that
    /// group is moved instead and the passed node is discarded. Calling this
    /// on an attached group moves it.
    pub fn add_group(&mut self, group: NodeId, after: Option<NodeId>) -> Changes {
        let mut changes = Changes::new();
        self.add_group_into(group, after, &mut changes);
        self.commit(changes)
    }

    /// Find the group called `name`, appending a new one if there is none.
    pub fn ensure_group(&mut self, name: &str) -> NodeId {
        let mut changes = Changes::new();
        let group = self.ensure_group_into(name, &mut changes);
        self.commit(changes);
        group
    }

    pub(crate) fn add_group_into(
        &mut self,
        group: NodeId,
        after: Option<NodeId>,
        changes: &mut Changes,
    ) -> Option<NodeId> {
        let Some(name) = self.group(group).map(|g| g.name.clone()) else {
            warn!(node = %group, "add_group called on a non-group node");
            return None;
        };
        let after = after.filter(|a| self.group(*a).is_some() && self.is_attached(*a));
        if after == Some(group) {
            return Some(group);
        }

        let target = match self.group_index.get(&name) {
            Some(existing) if existing == group => existing,
            Some(existing) => {
                if self.node(group).and_then(|n| n.first_child()).is_some() {
                    warn!(group = %name, "Duplicate group node still has children, ignoring");
                    return None;
                }
                debug!(group = %name, "Group exists, moving the existing node");
                self.release(group);
                if after == Some(existing) {
                    return Some(existing);
                }
                existing
            }
            None => {
                self.group_index.insert(&name, group);
                debug!(group = %name, "Adding group");
                self.link(group, None, after);
                changes.push(BlistEvent::NodeAdded {
                    node: group,
                    kind: NodeType::Group,
                });
                return Some(group);
            }
        };

        if self.node(target).map(|n| n.prev_sibling()) == Some(after) {
            return Some(target);
        }
        self.unlink(target);
        self.link(target, None, after);
        changes.push(BlistEvent::NodeAdded {
            node: target,
            kind: NodeType::Group,
        });
        Some(target)
    }

    pub(crate) fn ensure_group_into(&mut self, name: &str, changes: &mut Changes) -> NodeId {
        if let Some(group) = self.find_group(name) {
            return group;
        }
        let group = self.create_group(name);
        let last = self.last_group();
        self.add_group_into(group, last, changes).unwrap_or(group)
    }

    /// Resolve an explicit group argument, appending it if it is detached.
    pub(crate) fn place_group(&mut self, group: NodeId, changes: &mut Changes) -> Option<NodeId> {
        if self.group(group).is_none() {
            warn!(node = %group, "Expected a group node");
            return None;
        }
        if self.is_attached(group) {
            return Some(group);
        }
        let last = self.last_group();
        self.add_group_into(group, last, changes)
    }

    /// Resolve an optional group argument, defaulting to `default_name`.
    pub(crate) fn target_group(
        &mut self,
        group: Option<NodeId>,
        default_name: &str,
        changes: &mut Changes,
    ) -> Option<NodeId> {
        match group {
            Some(g) => self.place_group(g, changes),
            None => Some(self.ensure_group_into(default_name, changes)),
        }
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Remove an empty group. Groups that still hold contacts or chats are
    /// left alone; empty them first.
    pub fn remove_group(&mut self, group: NodeId) -> Changes {
        let mut changes = Changes::new();
        self.remove_group_into(group, &mut changes);
        self.commit(changes)
    }

    pub(crate) fn remove_group_into(&mut self, group: NodeId, changes: &mut Changes) {
        let Some(name) = self.group(group).map(|g| g.name.clone()) else {
            warn!(node = %group, "remove_group called on a non-group node");
            return;
        };
        if self.children(group).next().is_some() {
            warn!(group = %name, "Refusing to remove non-empty group");
            return;
        }
        if !self.is_attached(group) {
            self.release(group);
            return;
        }

        self.unlink(group);
        self.group_index.remove(&name, group);
        debug!(group = %name, "Removed group");
        changes.push(BlistEvent::NodeRemoved {
            node: group,
            kind: NodeType::Group,
        });
        for account in self.accounts.account_ids() {
            if self.accounts.is_connected(account) {
                changes.push(BlistEvent::ServerRemoveGroup {
                    account,
                    group: name.clone(),
                });
            }
        }
        self.release(group);
    }

    // -----------------------------------------------------------------------
    // Rename
    // -----------------------------------------------------------------------

    /// Rename a group. Renaming onto the name of another group merges this
    /// group's contacts and chats into it and removes this group.
    pub fn rename_group(&mut self, group: NodeId, name: &str) -> Changes {
        let mut changes = Changes::new();
        self.rename_group_into(group, name, &mut changes);
        self.commit(changes)
    }

    fn rename_group_into(&mut self, group: NodeId, name: &str, changes: &mut Changes) {
        let Some(old_name) = self.group(group).map(|g| g.name.clone()) else {
            warn!(node = %group, "rename_group called on a non-group node");
            return;
        };
        let new_name = strip_unprintable(name);
        if new_name.is_empty() || new_name == old_name {
            return;
        }

        // buddies under the group before anything moves
        let buddies: Vec<NodeId> = self
            .children(group)
            .flat_map(|child| self.children(child).collect::<Vec<_>>())
            .filter(|id| self.buddy(*id).is_some())
            .collect();

        let target = match self.find_group(&new_name).filter(|d| *d != group) {
            Some(dest) => {
                debug!(from = %old_name, into = %new_name, "Merging groups");
                let mut prev = self.last_child(dest);
                let children: Vec<NodeId> = self.children(group).collect();
                for child in children {
                    match self.node(child).map(|n| n.node_type()) {
                        Some(NodeType::Contact) => {
                            self.add_contact_into(child, Some(dest), prev, changes);
                        }
                        Some(NodeType::Chat) => {
                            self.add_chat_into(child, Some(dest), prev, changes);
                        }
                        _ => continue,
                    }
                    if self.parent(child) == Some(dest) {
                        prev = Some(child);
                    }
                }
                self.remove_group_into(group, changes);
                dest
            }
            None => {
                if self.is_attached(group) {
                    self.group_index.remove(&old_name, group);
                    self.group_index.insert(&new_name, group);
                }
                if let Some(g) = self.nodes.get_mut(group).and_then(|n| n.as_group_mut()) {
                    g.name = new_name.clone();
                }
                self.updated(changes, group);
                group
            }
        };

        for account in self.group_accounts(target) {
            let moved: Vec<NodeId> = buddies
                .iter()
                .copied()
                .filter(|b| self.buddy(*b).is_some_and(|b| b.account == account))
                .collect();
            if moved.is_empty() {
                continue;
            }
            changes.push(BlistEvent::ServerRenameGroup {
                account,
                old_name: old_name.clone(),
                new_name: new_name.clone(),
                buddies: moved,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn find_group(&self, name: &str) -> Option<NodeId> {
        if name.is_empty() {
            return None;
        }
        self.group_index.get(name)
    }

    /// Connected accounts with at least one buddy in the group.
    pub fn group_accounts(&self, group: NodeId) -> Vec<AccountId> {
        let mut accounts = Vec::new();
        for child in self.children(group) {
            for buddy in self.children(child) {
                let Some(account) = self.buddy(buddy).map(|b| b.account) else {
                    continue;
                };
                if self.accounts.is_connected(account) && !accounts.contains(&account) {
                    accounts.push(account);
                }
            }
        }
        accounts
    }

    /// Members of the group: all of them with `offline`, else only those on
    /// connected accounts.
    pub fn group_size(&self, group: NodeId, offline: bool) -> u32 {
        self.group(group)
            .map(|g| if offline { g.counts.total } else { g.counts.current })
            .unwrap_or(0)
    }

    pub fn group_online_count(&self, group: NodeId) -> u32 {
        self.group(group).map(|g| g.counts.online).unwrap_or(0)
    }

    /// The group buddies land in by default.
    pub fn default_group(&self) -> Option<NodeId> {
        self.find_group(DEFAULT_BUDDY_GROUP)
    }
}
