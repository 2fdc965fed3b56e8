/// A `<testsuite>` (or `<testdecorator>`) node.
///
/// Counters are reported by the test runner and are never recomputed from the
/// test cases below them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Suite {
    pub name: Option<String>,
    pub classname: Option<String>,
    pub tests: u32,
    pub failures: u32,
    pub errors: u32,
    pub skipped: u32,
    pub disabled: u32,
    /// Seconds.
    pub time: f64,
    pub system_out: Option<String>,
    pub system_err: Option<String>,
    pub error: Option<ErrorInfo>,
    pub failure: Option<ErrorInfo>,
    pub suites: Vec<Suite>,
    pub decorators: Vec<Suite>,
    pub test_cases: Vec<TestCase>,
}

impl Suite {
    /// Creates an empty suite with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Suite {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// A single `<testcase>` result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TestCase {
    pub name: Option<String>,
    pub classname: Option<String>,
    pub status: Option<String>,
    pub result: Option<String>,
    /// Kept as written by the runner.
    pub time: Option<String>,
    pub system_out: Option<String>,
    pub system_err: Option<String>,
    pub errors: Vec<ErrorInfo>,
    pub failures: Vec<ErrorInfo>,
    pub skipped: Option<ErrorInfo>,
}

/// Detail of an `<error>`, `<failure>` or `<skipped>` element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorInfo {
    pub message: Option<String>,
    /// The `type` attribute.
    pub kind: Option<String>,
    /// Mixed body content in document order.
    pub content: Vec<Content>,
    pub expected: Option<Values>,
    pub actual: Option<Values>,
}

impl ErrorInfo {
    /**
    Text to show for this error.

    Falls back to the `message` attribute when the element had no body. A body made only
    of whitespace counts as no body, so `<error message="m">\n</error>` yields `"m"`.
    Otherwise every body fragment is trimmed, empty fragments are dropped and the rest are
    joined with newlines.
    */
    pub fn error_content(&self) -> Option<String> {
        if self.content.is_empty() {
            return self.message.clone();
        }
        let lines: Vec<&str> = self
            .content
            .iter()
            .map(|fragment| fragment.text().trim())
            .filter(|line| !line.is_empty())
            .collect();
        Some(lines.join("\n"))
    }
}

/// One fragment of mixed content.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    /// A text or CDATA run.
    Text(String),
    /// An element the report dialect does not define.
    Element(OpaqueElement),
}

impl Content {
    pub fn text(&self) -> &str {
        match self {
            Content::Text(text) => text,
            Content::Element(element) => &element.text,
        }
    }
}

/// Stand-in for an unrecognized element found inside error content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OpaqueElement {
    pub name: String,
    /// All text found below the element, concatenated.
    pub text: String,
}

/// The `<value>` list of an `<expected>` or `<actual>` block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Values {
    pub values: Vec<String>,
}
