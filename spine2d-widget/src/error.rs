use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "a polygon must have at least 3 vertices (6 numbers in the array), got {len} numbers"
    )]
    InvalidHull { len: usize },

    #[error("unknown bone: {name}")]
    UnknownBone { name: String },

    #[error("unknown slot: {name}")]
    UnknownSlot { name: String },

    #[error("unknown animation: {name}")]
    UnknownAnimation { name: String },

    #[error("unknown skin: {name}")]
    UnknownSkin { name: String },

    #[error("identifier '{identifier}' is already registered")]
    DuplicateIdentifier { identifier: String },

    #[error("widget '{identifier}' has been disposed")]
    Disposed { identifier: String },

    #[error("widget '{identifier}' is not ready")]
    NotReady { identifier: String },

    #[error("missing required attribute: {name}")]
    MissingAttribute { name: String },

    #[error("invalid value '{value}' for attribute '{name}': {message}")]
    InvalidAttribute {
        name: String,
        value: String,
        message: String,
    },

    #[error("invalid animation sequence {group} in '{value}': {message}")]
    InvalidAnimationSequence {
        group: String,
        value: String,
        message: String,
    },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },
}

impl Error {
    pub(crate) fn invalid_attribute(
        name: &str,
        value: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            name: name.to_string(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}
