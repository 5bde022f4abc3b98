use tracing::warn;

use roster_shared::constants::DEFAULT_CHAT_GROUP;
use roster_shared::{AccountId, Accounts};

use crate::arena::NodeId;
use crate::events::{BlistEvent, Changes};
use crate::list::{clean_alias, BuddyList};
use crate::node::NodeType;

impl<A: Accounts> BuddyList<A> {
    /// Add a chat to `group` (default "Chats"), after `after` or first.
    /// Chats already in the list are moved.
    pub fn add_chat(&mut self, chat: NodeId, group: Option<NodeId>, after: Option<NodeId>) -> Changes {
        let mut changes = Changes::new();
        self.add_chat_into(chat, group, after, &mut changes);
        self.commit(changes)
    }

    pub(crate) fn add_chat_into(
        &mut self,
        chat: NodeId,
        group: Option<NodeId>,
        after: Option<NodeId>,
        changes: &mut Changes,
    ) {
        let Some(account) = self.chat(chat).map(|c| c.account) else {
            warn!(node = %chat, "add_chat called on a non-chat node");
            return;
        };
        if after == Some(chat) {
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
            None => self.target_group(group, DEFAULT_CHAT_GROUP, changes),
        };
        let Some(target) = target else {
            return;
        };

        let old_group = self.parent(chat);
        if old_group == Some(target) && self.node(chat).map(|n| n.prev_sibling()) == Some(after) {
            return;
        }
        if let Some(old) = old_group {
            self.unlink(chat);
            self.apply_chat_share(old, chat, -1);
        }

        let counted = self.accounts.is_connected(account);
        if let Some(c) = self.nodes.get_mut(chat).and_then(|n| n.as_chat_mut()) {
            c.counted = counted;
        }
        self.link(chat, Some(target), after);
        self.apply_chat_share(target, chat, 1);
        changes.push(BlistEvent::NodeAdded {
            node: chat,
            kind: NodeType::Chat,
        });
    }

    pub fn remove_chat(&mut self, chat: NodeId) -> Changes {
        let mut changes = Changes::new();
        self.remove_chat_into(chat, &mut changes);
        self.commit(changes)
    }

    pub(crate) fn remove_chat_into(&mut self, chat: NodeId, changes: &mut Changes) {
        if self.chat(chat).is_none() {
            warn!(node = %chat, "remove_chat called on a non-chat node");
            return;
        }
        if let Some(group) = self.parent(chat) {
            self.apply_chat_share(group, chat, -1);
            self.unlink(chat);
            changes.push(BlistEvent::NodeRemoved {
                node: chat,
                kind: NodeType::Chat,
            });
        }
        self.release(chat);
    }

    pub fn alias_chat(&mut self, chat: NodeId, alias: Option<&str>) -> Changes {
        let mut changes = Changes::new();
        let alias = clean_alias(alias);
        let Some(c) = self.nodes.get_mut(chat).and_then(|n| n.as_chat_mut()) else {
            warn!(node = %chat, "alias_chat called on a non-chat node");
            return changes;
        };
        if c.alias == alias {
            return changes;
        }
        let old_alias = std::mem::replace(&mut c.alias, alias);
        changes.push(BlistEvent::NodeAliased {
            node: chat,
            old_alias,
        });
        self.commit(changes)
    }

    /// Find a saved chat by room name on a connected account.
    ///
    /// The room name is the account's identifying chat component; chats
    /// without that component match on their alias instead.
    pub fn find_chat(&self, account: AccountId, name: &str) -> Option<NodeId> {
        if !self.accounts.is_connected(account) {
            return None;
        }
        let wanted = self.accounts.normalize(account, name);
        let identifier = self.accounts.chat_identifier(account);

        self.groups()
            .flat_map(|g| self.children(g))
            .find(|id| {
                let Some(chat) = self.chat(*id).filter(|c| c.account == account) else {
                    return false;
                };
                let room = chat
                    .components
                    .get(identifier)
                    .or(chat.alias.as_ref());
                room.is_some_and(|room| self.accounts.normalize(account, room) == wanted)
            })
    }

    /// Display name of a chat: alias, else its identifying component.
    pub fn chat_display_name(&self, chat: NodeId) -> Option<String> {
        let c = self.chat(chat)?;
        c.alias
            .clone()
            .or_else(|| c.components.get(self.accounts.chat_identifier(c.account)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use roster_shared::AccountRegistry;

    use super::*;
    use crate::config::StoreConfig;
    use crate::counts::Counts;
    use crate::test_support::{assert_consistent, connected_list, TestList};

    fn room(name: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("channel".to_string(), name.to_string())])
    }

    #[test]
    fn test_chat_defaults_to_chats_group() {
        let (mut list, acct) = connected_list();
        let chat = list.create_chat(acct, None, room("#rust"));
        list.add_chat(chat, None, None);

        let group = list.find_group("Chats").unwrap();
        assert_eq!(list.parent(chat), Some(group));
        assert_eq!(
            list.counts(group).unwrap(),
            Counts {
                total: 1,
                current: 1,
                online: 1
            }
        );
        assert_eq!(list.chat_display_name(chat).as_deref(), Some("#rust"));
        assert_consistent(&list);
    }

    #[test]
    fn test_chat_on_disconnected_account_counts_total_only() {
        let mut accounts = AccountRegistry::new();
        let acct = accounts.add("me", "prpl-irc");
        let mut list: TestList = BuddyList::new(accounts, StoreConfig::default());
        let chat = list.create_chat(acct, Some("Rustaceans"), room("#rust"));
        list.add_chat(chat, None, None);

        let group = list.find_group("Chats").unwrap();
        assert_eq!(list.counts(group).unwrap().total, 1);
        assert_eq!(list.counts(group).unwrap().current, 0);
        assert_eq!(list.find_chat(acct, "#rust"), None);
    }

    #[test]
    fn test_move_and_remove_chat() {
        let (mut list, acct) = connected_list();
        let chat = list.create_chat(acct, None, room("#rust"));
        list.add_chat(chat, None, None);
        let chats = list.find_group("Chats").unwrap();
        let work = list.ensure_group("Work");

        list.add_chat(chat, Some(work), None);
        assert_eq!(list.parent(chat), Some(work));
        assert_eq!(list.counts(chats).unwrap(), Counts::default());
        assert_eq!(list.counts(work).unwrap().online, 1);
        assert!(list.add_chat(chat, Some(work), None).is_empty());

        let changes = list.remove_chat(chat);
        assert!(changes.contains(&BlistEvent::NodeRemoved {
            node: chat,
            kind: NodeType::Chat
        }));
        assert_eq!(list.counts(work).unwrap(), Counts::default());
        assert!(!list.contains(chat));
        assert_consistent(&list);
    }

    #[test]
    fn test_find_chat() {
        let (mut list, acct) = connected_list();
        let rust = list.create_chat(acct, None, room("#Rust"));
        let lounge = list.create_chat(acct, Some("Lounge"), BTreeMap::new());
        list.add_chat(rust, None, None);
        list.add_chat(lounge, None, None);

        assert_eq!(list.find_chat(acct, "#rust"), Some(rust));
        assert_eq!(list.find_chat(acct, "lounge"), Some(lounge));
        assert_eq!(list.find_chat(acct, "#go"), None);
    }

    #[test]
    fn test_alias_chat() {
        let (mut list, acct) = connected_list();
        let chat = list.create_chat(acct, None, room("#rust"));
        list.add_chat(chat, None, None);
        let changes = list.alias_chat(chat, Some("Rust"));
        assert_eq!(changes.len(), 1);
        assert_eq!(list.chat(chat).unwrap().alias(), Some("Rust"));
        assert!(list.alias_chat(chat, Some("Rust")).is_empty());
    }
}
