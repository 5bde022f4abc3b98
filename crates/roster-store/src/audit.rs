//! Consistency audit.
//!
//! Recomputes every counter and index entry from the tree and reports each
//! place where the stored value disagrees.

use std::collections::HashMap;

use serde::Serialize;

use roster_shared::Accounts;

use crate::arena::NodeId;
use crate::counts::{Counter, Counts};
use crate::index::collation_key;
use crate::list::BuddyList;
use crate::node::NodeType;

/// One broken invariant.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum Inconsistency {
    CounterMismatch {
        node: NodeId,
        counter: Counter,
        expected: u32,
        actual: u32,
    },
    /// `online <= current <= total` does not hold.
    CounterOrder { node: NodeId },
    EmptyContact { node: NodeId },
    /// A node sits under a parent of the wrong kind, or its links disagree.
    BadLink { node: NodeId },
    DuplicateGroupName { name: String },
    GroupNotIndexed { node: NodeId },
    StaleGroupEntry { key: String },
    BuddyNotIndexed { node: NodeId },
    StaleBuddyEntry { node: NodeId },
}

impl<A: Accounts> BuddyList<A> {
    /// Check every structural, counter and index invariant.
    pub fn check_consistency(&self) -> Vec<Inconsistency> {
        let mut problems = Vec::new();
        let mut seen_keys: HashMap<String, NodeId> = HashMap::new();

        let mut prev = None;
        for group in self.groups() {
            let Some(g) = self.group(group) else {
                problems.push(Inconsistency::BadLink { node: group });
                continue;
            };
            self.check_links(group, None, prev, &mut problems);
            prev = Some(group);

            if seen_keys.insert(collation_key(&g.name), group).is_some() {
                problems.push(Inconsistency::DuplicateGroupName {
                    name: g.name.clone(),
                });
            }
            if self.group_index.get(&g.name) != Some(group) {
                problems.push(Inconsistency::GroupNotIndexed { node: group });
            }

            let mut expected = Counts::default();
            let mut prev_child = None;
            for child in self.children(group) {
                self.check_links(child, Some(group), prev_child, &mut problems);
                prev_child = Some(child);
                match self.node(child).map(|n| n.node_type()) {
                    Some(NodeType::Contact) => {
                        let contact = self.check_contact(group, child, &mut problems);
                        let share = contact.group_share();
                        expected.total += share.total;
                        expected.current += share.current;
                        expected.online += share.online;
                    }
                    Some(NodeType::Chat) => {
                        let counted = self.chat(child).is_some_and(|c| c.counted);
                        expected.total += 1;
                        expected.current += u32::from(counted);
                        expected.online += u32::from(counted);
                    }
                    _ => problems.push(Inconsistency::BadLink { node: child }),
                }
            }
            compare(group, expected, g.counts, &mut problems);
        }

        for (key, group) in self.group_index.entries() {
            if seen_keys.get(key) != Some(&group) {
                problems.push(Inconsistency::StaleGroupEntry {
                    key: key.to_string(),
                });
            }
        }

        for (key, buddy) in self.buddy_index.entries() {
            let matches = self.buddy(buddy).is_some_and(|b| {
                self.group_of(buddy) == Some(key.group)
                    && self.buddy_key(b.account, &b.name, key.group) == *key
            });
            if !matches {
                problems.push(Inconsistency::StaleBuddyEntry { node: buddy });
            }
        }

        problems
    }

    /// Returns the counters the contact should have.
    fn check_contact(
        &self,
        group: NodeId,
        contact: NodeId,
        problems: &mut Vec<Inconsistency>,
    ) -> Counts {
        let mut expected = Counts::default();
        let mut prev = None;
        for buddy in self.children(contact) {
            self.check_links(buddy, Some(contact), prev, problems);
            prev = Some(buddy);
            let Some(b) = self.buddy(buddy) else {
                problems.push(Inconsistency::BadLink { node: buddy });
                continue;
            };
            expected.total += 1;
            expected.current += u32::from(b.contribution.current);
            expected.online += u32::from(b.contribution.online);

            let key = self.buddy_key(b.account, &b.name, group);
            let in_global = self.buddy_index.get(&key) == Some(buddy);
            let in_account = self
                .buddy_index
                .account_table(b.account)
                .and_then(|t| t.get(&key))
                == Some(&buddy);
            if !in_global || !in_account {
                problems.push(Inconsistency::BuddyNotIndexed { node: buddy });
            }
        }
        if expected.total == 0 {
            problems.push(Inconsistency::EmptyContact { node: contact });
        }
        if let Some(actual) = self.counts(contact) {
            compare(contact, expected, actual, problems);
        }
        expected
    }

    fn check_links(
        &self,
        node: NodeId,
        parent: Option<NodeId>,
        prev: Option<NodeId>,
        problems: &mut Vec<Inconsistency>,
    ) {
        let ok = self
            .node(node)
            .is_some_and(|n| n.parent() == parent && n.prev_sibling() == prev);
        if !ok {
            problems.push(Inconsistency::BadLink { node });
        }
    }
}

fn compare(node: NodeId, expected: Counts, actual: Counts, problems: &mut Vec<Inconsistency>) {
    for counter in Counter::ALL {
        if expected.get(counter) != actual.get(counter) {
            problems.push(Inconsistency::CounterMismatch {
                node,
                counter,
                expected: expected.get(counter),
                actual: actual.get(counter),
            });
        }
    }
    if !actual.is_ordered() {
        problems.push(Inconsistency::CounterOrder { node });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add, connected_list};

    #[test]
    fn test_clean_list_has_no_problems() {
        let (mut list, acct) = connected_list();
        add(&mut list, acct, "bob", Some("Work"));
        assert!(list.check_consistency().is_empty());
    }

    #[test]
    fn test_detects_counter_drift() {
        let (mut list, acct) = connected_list();
        let bob = add(&mut list, acct, "bob", None);
        let group = list.group_of(bob).unwrap();
        if let Some(counts) = list.nodes.get_mut(group).and_then(|n| n.counts_mut()) {
            counts.total += 1;
        }
        let problems = list.check_consistency();
        assert!(problems.contains(&Inconsistency::CounterMismatch {
            node: group,
            counter: Counter::Total,
            expected: 1,
            actual: 2
        }));
        assert!(!problems.contains(&Inconsistency::CounterOrder { node: group }));
    }

    #[test]
    fn test_detects_missing_index_entry() {
        let (mut list, acct) = connected_list();
        let bob = add(&mut list, acct, "bob", None);
        let group = list.group_of(bob).unwrap();
        let key = list.buddy_key(acct, "bob", group);
        list.buddy_index.remove(&key, bob);
        assert_eq!(
            list.check_consistency(),
            vec![Inconsistency::BuddyNotIndexed { node: bob }]
        );
    }

    #[test]
    fn test_detects_empty_contact() {
        let (mut list, _) = connected_list();
        let group = list.ensure_group("Work");
        let contact = list.create_contact();
        list.link(contact, Some(group), None);
        assert_eq!(
            list.check_consistency(),
            vec![Inconsistency::EmptyContact { node: contact }]
        );
    }
}
