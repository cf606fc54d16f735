use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContactError {
    #[error("character '{character}' has no link '{link}'")]
    UnresolvedLink { character: String, link: String },

    #[error("invalid contact parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, ContactError>;
