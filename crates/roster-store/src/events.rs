//! Change records returned by every mutation, and the observer hook.

use serde::Serialize;

use roster_shared::{AccountId, Presence};

use crate::arena::NodeId;
use crate::node::NodeType;

/// Something that happened to the list.
///
/// Events naming a removed node carry a copy of the data needed to act on
/// them, since the id no longer resolves once the event is delivered.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum BlistEvent {
    NodeAdded {
        node: NodeId,
        kind: NodeType,
    },
    NodeRemoved {
        node: NodeId,
        kind: NodeType,
    },
    BuddyAdded {
        buddy: NodeId,
    },
    BuddyRemoved {
        buddy: NodeId,
        account: AccountId,
        name: String,
    },
    /// Display data or counters of a node changed.
    NodeUpdated {
        node: NodeId,
    },
    NodeAliased {
        node: NodeId,
        old_alias: Option<String>,
    },
    BuddyIconChanged {
        buddy: NodeId,
    },
    BuddySignedOn {
        buddy: NodeId,
    },
    BuddySignedOff {
        buddy: NodeId,
    },
    BuddyStatusChanged {
        buddy: NodeId,
        old: Presence,
        new: Presence,
    },
    /// The account's server copy of the list should move a buddy between groups.
    ServerMoveBuddy {
        account: AccountId,
        name: String,
        from_group: String,
        to_group: String,
    },
    /// The account's server copy of the list should drop a buddy.
    ServerRemoveBuddy {
        account: AccountId,
        name: String,
        group: String,
    },
    /// The account's server copy of the list should drop a group.
    ServerRemoveGroup {
        account: AccountId,
        group: String,
    },
    /// The account's server copy of the list should rename a group.
    ServerRenameGroup {
        account: AccountId,
        old_name: String,
        new_name: String,
        buddies: Vec<NodeId>,
    },
}

/// Ordered events produced by one mutation.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Changes {
    events: Vec<BlistEvent>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: BlistEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> &[BlistEvent] {
        &self.events
    }

    pub fn contains(&self, event: &BlistEvent) -> bool {
        self.events.contains(event)
    }

    /// Position of the first event matching `pred`.
    pub fn position(&self, pred: impl Fn(&BlistEvent) -> bool) -> Option<usize> {
        self.events.iter().position(pred)
    }

    pub fn into_events(self) -> Vec<BlistEvent> {
        self.events
    }
}

impl IntoIterator for Changes {
    type Item = BlistEvent;
    type IntoIter = std::vec::IntoIter<BlistEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

/// Receives every event after the mutation that produced it has completed.
///
/// Observers get no access to the list, so they cannot re-enter it while it
/// is being mutated.
pub trait ListObserver: Send {
    fn on_event(&mut self, event: &BlistEvent);
}

impl<F> ListObserver for F
where
    F: FnMut(&BlistEvent) + Send,
{
    fn on_event(&mut self, event: &BlistEvent) {
        self(event)
    }
}
