//! Text and JSON views of a loaded list.

use std::fmt::Write as _;

use serde::Serialize;

use roster_shared::{AccountRegistry, Accounts};
use roster_store::{BuddyList, Counts, NodeId, NodeKind};

type List = BuddyList<AccountRegistry>;

/// Indented tree: groups, then contacts and chats, then buddies, each with
/// its counters where it has them.
pub fn render_tree(list: &List) -> String {
    let mut out = String::new();
    for group in list.groups() {
        let Some(g) = list.group(group) else {
            continue;
        };
        let _ = writeln!(out, "{} {}", g.name(), counters(g.counts()));
        for child in list.children(group) {
            render_child(list, child, &mut out);
        }
    }
    out
}

fn render_child(list: &List, node: NodeId, out: &mut String) {
    match list.node(node).map(|n| n.kind()) {
        Some(NodeKind::Contact(c)) => {
            let name = list.contact_display_alias(node).unwrap_or_default();
            let _ = writeln!(out, "  {} {}", name, counters(c.counts()));
            for buddy in list.children(node) {
                render_buddy(list, buddy, out);
            }
        }
        Some(NodeKind::Chat(chat)) => {
            let name = list.chat_display_name(node).unwrap_or_default();
            let state = if chat.is_counted() { "joined" } else { "offline" };
            let _ = writeln!(out, "  #{name} ({state})");
        }
        _ => {}
    }
}

fn render_buddy(list: &List, buddy: NodeId, out: &mut String) {
    let Some(b) = list.buddy(buddy) else {
        return;
    };
    let account = list.accounts().username(b.account()).unwrap_or("?");
    let mut line = format!("    {} <{}>", b.name(), account);
    if let Some(alias) = b.alias() {
        let _ = write!(line, " \"{alias}\"");
    }
    if b.contribution().online {
        line.push_str(" *");
    }
    out.push_str(&line);
    out.push('\n');
}

fn counters(counts: Counts) -> String {
    format!("[{}/{}/{}]", counts.online, counts.current, counts.total)
}

/// Summary printed by the `stats` command.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Stats {
    pub groups: usize,
    pub contacts: usize,
    pub buddies: usize,
    pub chats: usize,
    pub online_contacts: usize,
    pub accounts: Vec<AccountStats>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AccountStats {
    pub username: String,
    pub protocol: String,
    pub connected: bool,
    pub buddies: usize,
}

pub fn collect_stats(list: &List) -> Stats {
    let mut stats = Stats {
        groups: 0,
        contacts: 0,
        buddies: 0,
        chats: 0,
        online_contacts: 0,
        accounts: Vec::new(),
    };

    for group in list.groups() {
        stats.groups += 1;
        for child in list.children(group) {
            match list.node(child).map(|n| n.kind()) {
                Some(NodeKind::Contact(c)) => {
                    stats.contacts += 1;
                    stats.buddies += c.counts().total as usize;
                    if c.counts().online > 0 {
                        stats.online_contacts += 1;
                    }
                }
                Some(NodeKind::Chat(_)) => stats.chats += 1,
                _ => {}
            }
        }
    }

    stats.accounts = list
        .accounts()
        .iter()
        .map(|account| AccountStats {
            username: account.username.clone(),
            protocol: account.protocol_id.clone(),
            connected: account.connected,
            buddies: list.find_buddies(account.id, None).len(),
        })
        .collect();

    stats
}
