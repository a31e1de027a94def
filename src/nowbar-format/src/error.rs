use thiserror::Error;

/// Template and directive errors. These describe a broken format
/// configuration and are meant to reach the operator unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("single '{0}' encountered in format string")]
    UnmatchedBrace(char),
    #[error("expected '}}' before end of string")]
    UnclosedField,
    #[error("unexpected '{{' in field name")]
    BraceInFieldName,
    #[error("empty field name (positional fields are not supported)")]
    EmptyFieldName,
    #[error("conversion '!{0}' is not supported")]
    Conversion(String),
    #[error("max string recursion exceeded")]
    NestingTooDeep,
    #[error("no value for field '{0}'")]
    MissingField(String),
    #[error("invalid format specifier '{0}'")]
    InvalidSpec(String),
    #[error("unknown format code '{code}' for {kind} value")]
    UnknownCode { code: char, kind: &'static str },
    #[error("{0}")]
    NotAllowed(&'static str),
    #[error("filter '{filter}' requires a text value, got {kind}")]
    FilterType {
        filter: &'static str,
        kind: &'static str,
    },
}

pub type FormatResult<T> = Result<T, FormatError>;
