//! Parser and merger for JUnit-style `test.xml` reports.
//!
//! [`parse`] reads one report into a [`Suite`] tree, accepting both the `<testsuites>`
//! wrapper and a bare `<testsuite>` root. When a test target ran in several shards,
//! [`merge_suites`] combines the per-shard trees into one, matching suites by name.
//!
//! ```
//! let a = testxml::parse_str(r#"<testsuite name="t" tests="1"><testcase name="a"/></testsuite>"#)?;
//! let b = testxml::parse_str(r#"<testsuite name="t" tests="1"><testcase name="b"/></testsuite>"#)?;
//! let merged = testxml::merge_suites(vec![a, b]);
//! assert_eq!(merged.suites[0].tests, 2);
//! # Ok::<(), testxml::MalformedReportError>(())
//! ```

pub mod de;
pub mod error;
pub mod merge;
pub mod model;
pub mod ser;

pub use de::{parse, parse_str};
pub use error::{MalformedReportError, WriteError};
pub use merge::merge_suites;
pub use model::{Content, ErrorInfo, OpaqueElement, Suite, TestCase, Values};
