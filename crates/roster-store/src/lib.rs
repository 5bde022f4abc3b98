//! # roster-store
//!
//! In-memory buddy list for a multi-account messaging client.
//!
//! The list is a forest of groups holding contacts and chats, where each
//! contact bundles one or more buddies. Every buddy is indexed globally and
//! per account by `(normalized name, account, group)`, groups by collated
//! name. Each group and contact keeps total, current and online counters that
//! mutations update incrementally.
//!
//! Every mutation returns a [`Changes`] record and marks the list dirty; the
//! `persist` module writes it to `blist.xml` after a short debounce.

pub mod arena;
pub mod audit;
pub mod config;
pub mod counts;
pub mod events;
pub mod list;
pub mod node;

mod buddies;
mod chats;
mod connection;
mod contacts;
mod error;
mod groups;
mod index;
mod lookup;
mod persist;

#[cfg(test)]
mod test_support;

pub use arena::NodeId;
pub use audit::Inconsistency;
pub use config::StoreConfig;
pub use counts::{Counter, Counts};
pub use error::{Result, StoreError};
pub use events::{BlistEvent, Changes, ListObserver};
pub use list::{BuddyList, Siblings};
pub use node::{Buddy, Chat, Contact, Contribution, Group, Node, NodeKind, NodeType};
pub use persist::spawn_autosave;
