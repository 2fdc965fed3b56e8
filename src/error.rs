use thiserror::Error;

/// Errors raised while decoding a test report.
///
/// Unknown attributes and elements are never an error; they are skipped.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MalformedReportError {
    /// The document is not well-formed XML.
    #[error("malformed test report: {0}")]
    Xml(String),

    /// The root element is neither `testsuites` nor `testsuite`.
    #[error("unexpected root element <{0}>, expected <testsuites> or <testsuite>")]
    UnexpectedRoot(String),

    /// A numeric attribute could not be parsed.
    #[error("invalid value {value:?} for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },
}

/// Error raised while writing a report back to XML.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("failed to write test report: {0}")]
pub struct WriteError(pub String);
