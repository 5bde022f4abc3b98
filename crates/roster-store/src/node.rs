//! Node variants of the buddy list tree.
//!
//! Groups sit at the root and hold contacts and chats; contacts hold buddies.
//! Links between nodes are [`NodeId`]s into the owning list's arena.

use std::cell::Cell;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use roster_shared::{AccountId, Settings};

use crate::arena::NodeId;
use crate::counts::Counts;

// ---------------------------------------------------------------------------
// Tags and links
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NodeType {
    Group,
    Contact,
    Buddy,
    Chat,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeType::Group => "group",
            NodeType::Contact => "contact",
            NodeType::Buddy => "buddy",
            NodeType::Chat => "chat",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Links {
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub next: Option<NodeId>,
    pub prev: Option<NodeId>,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A node of the tree: shared links and settings plus the variant payload.
#[derive(Debug)]
pub struct Node {
    pub(crate) links: Links,
    pub(crate) settings: Settings,
    pub(crate) dont_save: bool,
    pub(crate) kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
    Group(Group),
    Contact(Contact),
    Buddy(Buddy),
    Chat(Chat),
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            links: Links::default(),
            settings: Settings::new(),
            dont_save: false,
            kind,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Group(_) => NodeType::Group,
            NodeKind::Contact(_) => NodeType::Contact,
            NodeKind::Buddy(_) => NodeType::Buddy,
            NodeKind::Chat(_) => NodeType::Chat,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.links.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.links.first_child
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.links.next
    }

    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.links.prev
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Nodes flagged this way are left out of the saved document.
    pub fn dont_save(&self) -> bool {
        self.dont_save
    }

    pub fn as_group(&self) -> Option<&Group> {
        match &self.kind {
            NodeKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_contact(&self) -> Option<&Contact> {
        match &self.kind {
            NodeKind::Contact(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_buddy(&self) -> Option<&Buddy> {
        match &self.kind {
            NodeKind::Buddy(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_chat(&self) -> Option<&Chat> {
        match &self.kind {
            NodeKind::Chat(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn as_group_mut(&mut self) -> Option<&mut Group> {
        match &mut self.kind {
            NodeKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub(crate) fn as_contact_mut(&mut self) -> Option<&mut Contact> {
        match &mut self.kind {
            NodeKind::Contact(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn as_buddy_mut(&mut self) -> Option<&mut Buddy> {
        match &mut self.kind {
            NodeKind::Buddy(b) => Some(b),
            _ => None,
        }
    }

    pub(crate) fn as_chat_mut(&mut self) -> Option<&mut Chat> {
        match &mut self.kind {
            NodeKind::Chat(c) => Some(c),
            _ => None,
        }
    }

    /// Counters of a counting node (group or contact).
    pub fn counts(&self) -> Option<&Counts> {
        match &self.kind {
            NodeKind::Group(g) => Some(&g.counts),
            NodeKind::Contact(c) => Some(&c.counts),
            _ => None,
        }
    }

    pub(crate) fn counts_mut(&mut self) -> Option<&mut Counts> {
        match &mut self.kind {
            NodeKind::Group(g) => Some(&mut g.counts),
            NodeKind::Contact(c) => Some(&mut c.counts),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// A named folder of contacts and chats. Names are unique per list.
#[derive(Debug)]
pub struct Group {
    pub(crate) name: String,
    pub(crate) counts: Counts,
}

impl Group {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }
}

/// One person, represented by one or more buddies.
#[derive(Debug, Default)]
pub struct Contact {
    pub(crate) alias: Option<String>,
    pub(crate) counts: Counts,
    /// Cached priority buddy, valid while `priority_valid` is set.
    pub(crate) priority: Cell<Option<NodeId>>,
    pub(crate) priority_valid: Cell<bool>,
}

impl Contact {
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }

    pub(crate) fn invalidate_priority(&self) {
        self.priority_valid.set(false);
    }
}

/// Which contact counters a buddy is currently counted in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contribution {
    pub current: bool,
    pub online: bool,
}

/// A single protocol identity on one account.
#[derive(Debug)]
pub struct Buddy {
    pub(crate) account: AccountId,
    pub(crate) name: String,
    pub(crate) alias: Option<String>,
    pub(crate) server_alias: Option<String>,
    pub(crate) icon: Option<String>,
    pub(crate) contribution: Contribution,
}

impl Buddy {
    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alias set locally by the user.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Alias the buddy chose for themselves, as reported by the server.
    pub fn server_alias(&self) -> Option<&str> {
        self.server_alias.as_deref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn contribution(&self) -> Contribution {
        self.contribution
    }
}

/// A saved multi-user chat room.
#[derive(Debug)]
pub struct Chat {
    pub(crate) account: AccountId,
    pub(crate) alias: Option<String>,
    pub(crate) components: BTreeMap<String, String>,
    /// Whether the chat is counted in its group's current/online counters.
    pub(crate) counted: bool,
}

impl Chat {
    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Protocol specific join parameters.
    pub fn components(&self) -> &BTreeMap<String, String> {
        &self.components
    }

    pub fn is_counted(&self) -> bool {
        self.counted
    }
}
