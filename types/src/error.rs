use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("verification link is empty")]
    EmptyLink,

    #[error("verification link is longer than {max} characters")]
    LinkTooLong { max: usize },

    #[error("verification link contains invalid character {0:?}")]
    InvalidLinkChar(char),
}
