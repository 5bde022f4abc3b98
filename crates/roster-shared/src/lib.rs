//! # roster-shared
//!
//! Types shared between the buddy list store and its front ends: account
//! handles and the account/presence contract the store consumes, privacy
//! settings, typed node settings and well-known constants.

pub mod account;
pub mod constants;
pub mod error;
pub mod privacy;
pub mod settings;
pub mod types;

pub use account::{Account, AccountRegistry, Accounts, NameNormalization};
pub use error::RosterError;
pub use privacy::{Privacy, PrivacyMode};
pub use settings::{SettingValue, Settings};
pub use types::{AccountId, Presence};
