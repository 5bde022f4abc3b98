use roster_shared::{AccountId, Accounts};

use crate::arena::NodeId;
use crate::index::BuddyKey;
use crate::list::BuddyList;
use crate::node::NodeType;

impl<A: Accounts> BuddyList<A> {
    /// First buddy called `name` on `account`, scanning groups in list order.
    ///
    /// The same buddy may sit in several groups; the earliest group wins.
    pub fn find_buddy(&self, account: AccountId, name: &str) -> Option<NodeId> {
        let normalized = self.accounts.normalize(account, name);
        self.groups()
            .filter(|g| self.children(*g).next().is_some())
            .find_map(|group| {
                self.buddy_index.get(&BuddyKey {
                    name: normalized.clone(),
                    account,
                    group,
                })
            })
    }

    pub fn find_buddy_in_group(
        &self,
        account: AccountId,
        name: &str,
        group: NodeId,
    ) -> Option<NodeId> {
        self.buddy_index.get(&self.buddy_key(account, name, group))
    }

    /// Every buddy called `name` on `account`, in group order. Without a name,
    /// every buddy of the account.
    pub fn find_buddies(&self, account: AccountId, name: Option<&str>) -> Vec<NodeId> {
        match name.filter(|n| !n.is_empty()) {
            Some(name) => {
                let normalized = self.accounts.normalize(account, name);
                self.groups()
                    .filter_map(|group| {
                        self.buddy_index.get(&BuddyKey {
                            name: normalized.clone(),
                            account,
                            group,
                        })
                    })
                    .collect()
            }
            None => self.buddy_index.for_account(account).collect(),
        }
    }

    /// Every buddy in the list, in no particular order.
    pub fn buddies(&self) -> Vec<NodeId> {
        self.buddy_index.entries().map(|(_, id)| id).collect()
    }

    /// Contact of a buddy.
    pub fn contact_of(&self, buddy: NodeId) -> Option<NodeId> {
        self.buddy(buddy)?;
        self.parent(buddy)
    }

    /// Group a node lives in. A group is its own group.
    pub fn group_of(&self, id: NodeId) -> Option<NodeId> {
        match self.node(id)?.node_type() {
            NodeType::Group => Some(id),
            NodeType::Contact | NodeType::Chat => self.parent(id),
            NodeType::Buddy => self.parent(id).and_then(|c| self.parent(c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{add, add_to_contact, connected_list};

    #[test]
    fn test_find_buddy_prefers_earlier_group() {
        let (mut list, acct) = connected_list();
        let in_work = add(&mut list, acct, "bob", Some("Work"));
        let in_home = add(&mut list, acct, "bob", Some("Home"));

        assert_eq!(list.find_buddy(acct, "Bob"), Some(in_work));
        assert_eq!(list.find_buddies(acct, Some("bob")), vec![in_work, in_home]);

        // moving Home in front changes which one is found first
        let home = list.find_group("Home").unwrap();
        list.add_group(home, None);
        assert_eq!(list.find_buddy(acct, "bob"), Some(in_home));
    }

    #[test]
    fn test_find_buddies_by_account() {
        let (mut list, acct) = connected_list();
        let other = list.accounts_mut().add("me", "prpl-irc");
        let a = add(&mut list, acct, "a", None);
        let b = add_to_contact(&mut list, acct, "b", a);
        add(&mut list, other, "c", None);

        let mut mine = list.find_buddies(acct, None);
        mine.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(mine, expected);
        assert_eq!(list.find_buddies(other, Some("")).len(), 1);
        assert_eq!(list.buddies().len(), 3);
    }

    #[test]
    fn test_group_of() {
        let (mut list, acct) = connected_list();
        let bob = add(&mut list, acct, "bob", Some("Work"));
        let work = list.find_group("Work").unwrap();
        let contact = list.contact_of(bob).unwrap();
        assert_eq!(list.group_of(bob), Some(work));
        assert_eq!(list.group_of(contact), Some(work));
        assert_eq!(list.group_of(work), Some(work));
        assert_eq!(list.contact_of(contact), None);
    }
}
