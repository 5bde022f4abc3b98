use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RosterError {
    #[error("Unknown setting type: {0}")]
    UnknownSettingType(String),

    #[error("Invalid {kind} setting value: {value:?}")]
    InvalidSettingValue { kind: &'static str, value: String },

    #[error("Unknown privacy mode: {0}")]
    UnknownPrivacyMode(i64),
}
