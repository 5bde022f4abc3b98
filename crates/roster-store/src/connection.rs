//! Bulk counter updates when an account connects or disconnects.

use tracing::debug;

use roster_shared::{AccountId, Accounts};

use crate::arena::NodeId;
use crate::events::{BlistEvent, Changes};
use crate::list::BuddyList;
use crate::node::Contribution;

impl<A: Accounts> BuddyList<A> {
    /// Count the account's buddies and chats as connected.
    ///
    /// Call after the account reports itself connected. Buddies the account
    /// already reports online are counted online too.
    pub fn account_connected(&mut self, account: AccountId) -> Changes {
        let mut changes = Changes::new();
        if !self.accounts.is_connected(account) {
            debug!(account = %account, "Account not connected, nothing to count");
            return changes;
        }

        let buddies: Vec<NodeId> = self.buddy_index.for_account(account).collect();
        let mut touched = Vec::new();
        for buddy in buddies {
            let Some((name, counted)) = self.buddy(buddy).map(|b| (b.name.clone(), b.contribution))
            else {
                continue;
            };
            let Some(contact) = self.parent(buddy) else {
                continue;
            };
            let live = self.live_contribution(account, &name);
            let raised = Contribution {
                current: counted.current || live.current,
                online: counted.online || live.online,
            };
            if raised == counted {
                continue;
            }
            self.reconcile(contact, counted, raised);
            if let Some(b) = self.nodes.get_mut(buddy).and_then(|n| n.as_buddy_mut()) {
                b.contribution = raised;
            }
            self.invalidate_priority(contact);
            if !touched.contains(&contact) {
                touched.push(contact);
            }
        }

        for chat in self.chats_of(account) {
            if self.chat(chat).is_some_and(|c| c.counted) {
                continue;
            }
            let Some(group) = self.parent(chat) else {
                continue;
            };
            self.apply_chat_share(group, chat, -1);
            if let Some(c) = self.nodes.get_mut(chat).and_then(|n| n.as_chat_mut()) {
                c.counted = true;
            }
            self.apply_chat_share(group, chat, 1);
            touched.push(chat);
        }

        debug!(account = %account, updated = touched.len(), "Account connected");
        for node in touched {
            changes.push(BlistEvent::NodeUpdated { node });
        }
        self.commit(changes)
    }

    /// Stop counting the account's buddies and chats, then reset their presence.
    ///
    /// Buddies that were counted online get their `last_seen` setting stamped.
    pub fn account_disconnected(&mut self, account: AccountId) -> Changes {
        let mut changes = Changes::new();
        let buddies: Vec<NodeId> = self.buddy_index.for_account(account).collect();
        let mut touched = Vec::new();

        for buddy in buddies {
            let Some(counted) = self.buddy(buddy).map(|b| b.contribution) else {
                continue;
            };
            let Some(contact) = self.parent(buddy) else {
                continue;
            };
            if counted.online {
                self.stamp_last_seen(buddy);
            }
            if counted == Contribution::default() {
                continue;
            }
            self.reconcile(contact, counted, Contribution::default());
            if let Some(b) = self.nodes.get_mut(buddy).and_then(|n| n.as_buddy_mut()) {
                b.contribution = Contribution::default();
            }
            self.invalidate_priority(contact);
            if !touched.contains(&contact) {
                touched.push(contact);
            }
        }

        for chat in self.chats_of(account) {
            if !self.chat(chat).is_some_and(|c| c.counted) {
                continue;
            }
            let Some(group) = self.parent(chat) else {
                continue;
            };
            self.apply_chat_share(group, chat, -1);
            if let Some(c) = self.nodes.get_mut(chat).and_then(|n| n.as_chat_mut()) {
                c.counted = false;
            }
            self.apply_chat_share(group, chat, 1);
            touched.push(chat);
        }

        self.accounts.reset_presences(account);
        debug!(account = %account, updated = touched.len(), "Account disconnected");
        for node in touched {
            changes.push(BlistEvent::NodeUpdated { node });
        }
        self.commit(changes)
    }

    pub(crate) fn chats_of(&self, account: AccountId) -> Vec<NodeId> {
        self.groups()
            .flat_map(|g| self.children(g))
            .filter(|id| self.chat(*id).is_some_and(|c| c.account == account))
            .collect()
    }
}
