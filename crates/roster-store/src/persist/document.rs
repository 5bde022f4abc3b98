//! Conversion between the tree and the `<purple>` document.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use roster_shared::constants::{BLIST_DOCUMENT_VERSION, BUDDY_ICON_SETTING, DEFAULT_BUDDY_GROUP};
use roster_shared::{AccountId, Accounts, PrivacyMode, SettingValue, Settings};

use crate::arena::NodeId;
use crate::error::{Result, StoreError};
use crate::events::Changes;
use crate::list::BuddyList;
use crate::node::NodeKind;
use crate::persist::xmlnode::XmlNode;

impl<A: Accounts> BuddyList<A> {
    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    /// Render the whole list, privacy included, as a document string.
    pub fn to_xml(&self) -> Result<String> {
        let mut root = XmlNode::new("purple").with_attr("version", BLIST_DOCUMENT_VERSION);

        let mut blist = XmlNode::new("blist");
        for group in self.groups() {
            if let Some(node) = self.group_to_xml(group) {
                blist.push(node);
            }
        }
        root.push(blist);
        root.push(self.privacy_to_xml());

        root.to_document()
    }

    fn group_to_xml(&self, group: NodeId) -> Option<XmlNode> {
        let node = self.node(group).filter(|n| !n.dont_save)?;
        let g = node.as_group()?;

        let mut out = XmlNode::new("group").with_attr("name", g.name.as_str());
        push_settings(&mut out, &node.settings);
        for child in self.children(group) {
            let rendered = match self.node(child).map(|n| &n.kind) {
                Some(NodeKind::Contact(_)) => self.contact_to_xml(child),
                Some(NodeKind::Chat(_)) => self.chat_to_xml(child),
                _ => None,
            };
            if let Some(rendered) = rendered {
                out.push(rendered);
            }
        }
        Some(out)
    }

    fn contact_to_xml(&self, contact: NodeId) -> Option<XmlNode> {
        let node = self.node(contact).filter(|n| !n.dont_save)?;
        let c = node.as_contact()?;

        let mut out = XmlNode::new("contact");
        if let Some(alias) = &c.alias {
            out = out.with_attr("alias", alias.as_str());
        }
        for buddy in self.children(contact) {
            if let Some(rendered) = self.buddy_to_xml(buddy) {
                out.push(rendered);
            }
        }
        // a contact whose buddies were all skipped would load as nothing
        if out.children.is_empty() {
            return None;
        }
        push_settings(&mut out, &node.settings);
        Some(out)
    }

    fn buddy_to_xml(&self, buddy: NodeId) -> Option<XmlNode> {
        let node = self.node(buddy).filter(|n| !n.dont_save)?;
        let b = node.as_buddy()?;
        let (username, protocol) = self.account_attrs(b.account)?;

        let mut out = XmlNode::new("buddy")
            .with_attr("account", username)
            .with_attr("proto", protocol);
        out.push(XmlNode::new("name").with_text(b.name.as_str()));
        if let Some(alias) = &b.alias {
            out.push(XmlNode::new("alias").with_text(alias.as_str()));
        }
        push_settings(&mut out, &node.settings);
        if let Some(icon) = &b.icon {
            out.push(setting_node(
                BUDDY_ICON_SETTING,
                &SettingValue::String(icon.clone()),
            ));
        }
        Some(out)
    }

    fn chat_to_xml(&self, chat: NodeId) -> Option<XmlNode> {
        let node = self.node(chat).filter(|n| !n.dont_save)?;
        let c = node.as_chat()?;
        let (username, protocol) = self.account_attrs(c.account)?;

        let mut out = XmlNode::new("chat")
            .with_attr("proto", protocol)
            .with_attr("account", username);
        if let Some(alias) = &c.alias {
            out.push(XmlNode::new("alias").with_text(alias.as_str()));
        }
        for (name, value) in &c.components {
            out.push(
                XmlNode::new("component")
                    .with_attr("name", name.as_str())
                    .with_text(value.as_str()),
            );
        }
        push_settings(&mut out, &node.settings);
        Some(out)
    }

    fn privacy_to_xml(&self) -> XmlNode {
        let mut out = XmlNode::new("privacy");
        for account in self.accounts.account_ids() {
            let (Some((username, protocol)), Some(privacy)) =
                (self.account_attrs(account), self.accounts.privacy(account))
            else {
                continue;
            };
            let mut node = XmlNode::new("account")
                .with_attr("proto", protocol)
                .with_attr("name", username)
                .with_attr("mode", privacy.mode.code().to_string());
            for name in &privacy.permit {
                node.push(XmlNode::new("permit").with_text(name.as_str()));
            }
            for name in &privacy.deny {
                node.push(XmlNode::new("block").with_text(name.as_str()));
            }
            out.push(node);
        }
        out
    }

    fn account_attrs(&self, account: AccountId) -> Option<(&str, &str)> {
        let attrs = self
            .accounts
            .username(account)
            .zip(self.accounts.protocol_id(account));
        if attrs.is_none() {
            warn!(account = %account, "Skipping node of an unknown account");
        }
        attrs
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Rebuild the list from a document string.
    ///
    /// Nodes are added to whatever the list already holds. Entries that
    /// refer to unknown accounts are skipped. Observers are not notified
    /// and the save schedule is left cleared.
    pub fn load_xml(&mut self, text: &str) -> Result<()> {
        let root = XmlNode::parse(text)?;
        if root.name != "purple" {
            return Err(StoreError::Malformed(format!(
                "root element is <{}>, expected <purple>",
                root.name
            )));
        }

        let mut changes = Changes::new();
        if let Some(blist) = root.child("blist") {
            for group in blist.children_named("group") {
                self.load_group(group, &mut changes);
            }
        }
        if let Some(privacy) = root.child("privacy") {
            for account in privacy.children_named("account") {
                self.load_privacy(account);
            }
        }
        debug!(
            nodes = self.node_count(),
            events = changes.len(),
            "Loaded buddy list document"
        );

        self.save.clear();
        self.loaded = true;
        Ok(())
    }

    fn load_group(&mut self, element: &XmlNode, changes: &mut Changes) {
        let name = element
            .attr("name")
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_BUDDY_GROUP);
        // duplicate <group> elements land in the same group
        let group = self.ensure_group_into(name, changes);
        self.load_settings(group, element);

        for child in &element.children {
            match child.name.as_str() {
                "contact" | "person" => self.load_contact(group, child, changes),
                "chat" => self.load_chat(group, child, changes),
                "setting" => {}
                other => debug!(element = other, "Ignoring unknown group child"),
            }
        }
    }

    fn load_contact(&mut self, group: NodeId, element: &XmlNode, changes: &mut Changes) {
        let contact = self.create_contact();
        if let Some(alias) = element.attr("alias").filter(|a| !a.is_empty()) {
            if let Some(c) = self.nodes.get_mut(contact).and_then(|n| n.as_contact_mut()) {
                c.alias = Some(alias.to_string());
            }
        }
        self.load_settings(contact, element);

        for buddy in element.children_named("buddy") {
            self.load_buddy(group, contact, buddy, changes);
        }

        if self.parent(contact).is_none() {
            debug!("Discarding contact without loadable buddies");
            self.release(contact);
        }
    }

    fn load_buddy(
        &mut self,
        group: NodeId,
        contact: NodeId,
        element: &XmlNode,
        changes: &mut Changes,
    ) {
        let Some(account) = self.resolve_account(element.attr("account"), element.attr("proto"))
        else {
            return;
        };
        let Some(name) = element.child_text("name").filter(|n| !n.is_empty()) else {
            warn!("Skipping buddy without a name");
            return;
        };

        let buddy = self.create_buddy(account, name, element.child_text("alias"));
        self.load_settings(buddy, element);
        let icon = self
            .nodes
            .get_mut(buddy)
            .and_then(|n| n.settings.remove(BUDDY_ICON_SETTING));
        if let Some(SettingValue::String(icon)) = icon {
            if let Some(b) = self.nodes.get_mut(buddy).and_then(|n| n.as_buddy_mut()) {
                b.icon = Some(icon);
            }
        }

        let after = self.last_child(contact);
        if !self.add_buddy_into(buddy, Some(contact), Some(group), after, changes) {
            warn!(buddy = %name, account = %account, "Dropping duplicate buddy from document");
            self.release(buddy);
        }
    }

    fn load_chat(&mut self, group: NodeId, element: &XmlNode, changes: &mut Changes) {
        let Some(account) = self.resolve_account(element.attr("account"), element.attr("proto"))
        else {
            return;
        };
        let components: BTreeMap<String, String> = element
            .children_named("component")
            .filter_map(|c| Some((c.attr("name")?.to_string(), c.text.clone())))
            .collect();

        let chat = self.create_chat(account, element.child_text("alias"), components);
        self.load_settings(chat, element);
        let after = self.last_child(group);
        self.add_chat_into(chat, Some(group), after, changes);
    }

    fn load_privacy(&mut self, element: &XmlNode) {
        let Some(account) = self.resolve_account(element.attr("name"), element.attr("proto")) else {
            return;
        };

        let mode = match element.attr("mode").map(|m| m.trim().parse::<i64>()) {
            None | Some(Ok(0)) => PrivacyMode::AllowAll,
            Some(Ok(code)) => PrivacyMode::from_code(code).unwrap_or_else(|e| {
                warn!(account = %account, error = %e, "Using allow-all privacy");
                PrivacyMode::AllowAll
            }),
            Some(Err(_)) => {
                warn!(account = %account, "Unreadable privacy mode, using allow-all");
                PrivacyMode::AllowAll
            }
        };

        let Some(privacy) = self.accounts.privacy_mut(account) else {
            return;
        };
        privacy.mode = mode;
        for permit in element.children_named("permit") {
            privacy.permit_add(permit.text.as_str());
        }
        for block in element.children_named("block") {
            privacy.deny_add(block.text.as_str());
        }
    }

    fn resolve_account(&mut self, username: Option<&str>, protocol: Option<&str>) -> Option<AccountId> {
        let (Some(username), Some(protocol)) = (username, protocol) else {
            warn!("Skipping entry without account attributes");
            return None;
        };
        let account = self.accounts.resolve(username, protocol);
        match account {
            Some(id) => self.buddy_index.register_account(id),
            None => warn!(account = username, protocol, "Skipping entry of unknown account"),
        }
        account
    }

    fn load_settings(&mut self, id: NodeId, element: &XmlNode) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        for setting in element.children_named("setting") {
            let Some(key) = setting.attr("name") else {
                warn!("Skipping setting without a name");
                continue;
            };
            match SettingValue::parse(setting.attr("type"), &setting.text) {
                Ok(value) => {
                    node.settings.set(key, value);
                }
                Err(e) => warn!(setting = key, error = %e, "Skipping unreadable setting"),
            }
        }
    }
}

fn setting_node(key: &str, value: &SettingValue) -> XmlNode {
    XmlNode::new("setting")
        .with_attr("name", key)
        .with_attr("type", value.type_name())
        .with_text(value.to_text())
}

fn push_settings(out: &mut XmlNode, settings: &Settings) {
    for (key, value) in settings.iter() {
        out.push(setting_node(key, value));
    }
}
