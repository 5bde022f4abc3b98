use serde::{Deserialize, Serialize};

/// Handle of an account known to an [`crate::Accounts`] implementation.
///
/// Buddies and chats refer to their account through this handle; the buddy
/// list never owns the account itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub u32);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

/// Presence of a single buddy as reported by its account.
///
/// Ordered from least to most available, so `Available > Away > Offline`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Presence {
    #[default]
    Offline,
    Away,
    Available,
}

impl Presence {
    pub fn is_online(self) -> bool {
        self != Presence::Offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_order() {
        assert!(Presence::Available > Presence::Away);
        assert!(Presence::Away > Presence::Offline);
        assert!(!Presence::default().is_online());
        assert!(Presence::Away.is_online());
    }

    #[test]
    fn test_account_id_display() {
        assert_eq!(AccountId(7).to_string(), "account#7");
    }
}
