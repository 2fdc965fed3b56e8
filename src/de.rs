//! Decoding of `test.xml` documents.
//!
//! Every element type has its own decode step. Attributes and child elements the
//! report dialect does not define are skipped, so output from any JUnit-like runner
//! can be read.

use crate::error::MalformedReportError;
use crate::model::{Content, ErrorInfo, OpaqueElement, Suite, TestCase, Values};
use log::trace;
use std::io::Read;
use std::str::FromStr;
use xml::attribute::OwnedAttribute;
use xml::reader::{EventReader, ParserConfig, XmlEvent};
use yaserde::de::Deserializer;
use yaserde::YaDeserialize;

pub(crate) const TESTSUITES: &str = "testsuites";
pub(crate) const TESTSUITE: &str = "testsuite";
pub(crate) const TESTDECORATOR: &str = "testdecorator";
pub(crate) const TESTCASE: &str = "testcase";
pub(crate) const ERROR: &str = "error";
pub(crate) const FAILURE: &str = "failure";
pub(crate) const SKIPPED: &str = "skipped";
pub(crate) const EXPECTED: &str = "expected";
pub(crate) const ACTUAL: &str = "actual";
pub(crate) const VALUE: &str = "value";

type Result<T> = std::result::Result<T, MalformedReportError>;

/**
Parse a test report.

Accepts both a `<testsuites>` wrapper and a bare `<testsuite>` root. A wrapper becomes a
synthetic suite without a name or counters of its own whose children are the wrapped suites.
*/
pub fn parse<R: Read>(reader: R) -> Result<Suite> {
    let mut reader = Deserializer::new(EventReader::new_with_config(reader, parser_config()));
    decode_document(&mut reader)
}

/// Like yaserde's reader setup, but text is kept untrimmed so `<value>` bodies survive
/// exactly as written.
fn parser_config() -> ParserConfig {
    ParserConfig::new()
        .trim_whitespace(false)
        .whitespace_to_characters(true)
        .cdata_to_characters(true)
        .ignore_comments(true)
        .coalesce_characters(true)
}

/// Parse a test report held in memory.
pub fn parse_str(report: &str) -> Result<Suite> {
    parse(report.as_bytes())
}

fn decode_document<R: Read>(reader: &mut Deserializer<R>) -> Result<Suite> {
    let root = loop {
        match reader.peek().map_err(MalformedReportError::Xml)? {
            XmlEvent::StartElement { name, .. } => break name.local_name.clone(),
            XmlEvent::Characters(text) if text.trim().is_empty() => {}
            other => {
                return Err(MalformedReportError::Xml(format!(
                    "expected a root element, found {other:?}"
                )))
            }
        }
        reader.next_event().map_err(MalformedReportError::Xml)?;
    };
    match root.as_str() {
        TESTSUITES => decode_test_suites(reader),
        TESTSUITE => decode_suite(reader),
        _ => Err(MalformedReportError::UnexpectedRoot(root)),
    }
}

fn decode_test_suites<R: Read>(reader: &mut Deserializer<R>) -> Result<Suite> {
    start_element(reader)?;
    let mut outer = Suite::default();
    while let Some(child) = next_child(reader)? {
        match child {
            Child::Element(tag) if tag == TESTSUITE => outer.suites.push(decode_suite(reader)?),
            Child::Element(tag) => skip_element(reader, &tag)?,
            Child::Text(_) => {}
        }
    }
    Ok(outer)
}

pub(crate) fn decode_suite<R: Read>(reader: &mut Deserializer<R>) -> Result<Suite> {
    let attributes = start_element(reader)?;
    let mut suite = Suite {
        name: attributes.string("name"),
        classname: attributes.string("classname"),
        tests: attributes.number("tests")?,
        failures: attributes.number("failures")?,
        errors: attributes.number("errors")?,
        skipped: attributes.number("skipped")?,
        disabled: attributes.number("disabled")?,
        time: attributes.number("time")?,
        system_out: attributes.string("system-out"),
        system_err: attributes.string("system-err"),
        ..Default::default()
    };

    while let Some(child) = next_child(reader)? {
        let tag = match child {
            Child::Element(tag) => tag,
            Child::Text(_) => continue,
        };
        match tag.as_str() {
            TESTSUITE => suite.suites.push(decode_suite(reader)?),
            TESTDECORATOR => suite.decorators.push(decode_suite(reader)?),
            TESTCASE => suite.test_cases.push(decode_test_case(reader)?),
            ERROR => suite.error = Some(decode_error_info(reader)?),
            FAILURE => suite.failure = Some(decode_error_info(reader)?),
            _ => skip_element(reader, &tag)?,
        }
    }
    Ok(suite)
}

pub(crate) fn decode_test_case<R: Read>(reader: &mut Deserializer<R>) -> Result<TestCase> {
    let attributes = start_element(reader)?;
    let mut test_case = TestCase {
        name: attributes.string("name"),
        classname: attributes.string("classname"),
        status: attributes.string("status"),
        result: attributes.string("result"),
        time: attributes.string("time"),
        system_out: attributes.string("system-out"),
        system_err: attributes.string("system-err"),
        ..Default::default()
    };

    while let Some(child) = next_child(reader)? {
        let tag = match child {
            Child::Element(tag) => tag,
            Child::Text(_) => continue,
        };
        match tag.as_str() {
            ERROR => test_case.errors.push(decode_error_info(reader)?),
            FAILURE => test_case.failures.push(decode_error_info(reader)?),
            SKIPPED => test_case.skipped = Some(decode_error_info(reader)?),
            _ => skip_element(reader, &tag)?,
        }
    }
    Ok(test_case)
}

pub(crate) fn decode_error_info<R: Read>(reader: &mut Deserializer<R>) -> Result<ErrorInfo> {
    let attributes = start_element(reader)?;
    let mut info = ErrorInfo {
        message: attributes.string("message"),
        kind: attributes.string("type"),
        ..Default::default()
    };

    while let Some(child) = next_child(reader)? {
        match child {
            // Whitespace between elements is layout, not content.
            Child::Text(text) if text.trim().is_empty() => {}
            Child::Text(text) => info.content.push(Content::Text(text)),
            Child::Element(tag) => match tag.as_str() {
                EXPECTED => info.expected = Some(decode_values(reader)?),
                ACTUAL => info.actual = Some(decode_values(reader)?),
                _ => {
                    let text = read_text(reader)?;
                    info.content
                        .push(Content::Element(OpaqueElement { name: tag, text }));
                }
            },
        }
    }
    Ok(info)
}

pub(crate) fn decode_values<R: Read>(reader: &mut Deserializer<R>) -> Result<Values> {
    start_element(reader)?;
    let mut values = Values::default();
    while let Some(child) = next_child(reader)? {
        match child {
            Child::Element(tag) if tag == VALUE => values.values.push(read_text(reader)?),
            Child::Element(tag) => skip_element(reader, &tag)?,
            Child::Text(_) => {}
        }
    }
    Ok(values)
}

/// Attributes of the element being decoded.
struct Attributes {
    element: String,
    attributes: Vec<OwnedAttribute>,
}

impl Attributes {
    fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name.local_name == name)
            .map(|attribute| attribute.value.as_str())
    }

    fn string(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    /// Missing or blank values fall back to the type's default.
    fn number<T: FromStr + Default>(&self, name: &str) -> Result<T> {
        match self.get(name).map(str::trim) {
            None | Some("") => Ok(T::default()),
            Some(value) => value
                .parse()
                .map_err(|_| MalformedReportError::InvalidAttribute {
                    element: self.element.clone(),
                    attribute: name.to_string(),
                    value: value.to_string(),
                }),
        }
    }
}

enum Child {
    /// A child element that has been peeked but not consumed.
    Element(String),
    Text(String),
}

enum Peeked {
    Start(String),
    End,
    EndOfDocument,
    Other,
}

fn start_element<R: Read>(reader: &mut Deserializer<R>) -> Result<Attributes> {
    match reader.next_event().map_err(MalformedReportError::Xml)? {
        XmlEvent::StartElement {
            name, attributes, ..
        } => Ok(Attributes {
            element: name.local_name,
            attributes,
        }),
        other => Err(MalformedReportError::Xml(format!(
            "expected a start element, found {other:?}"
        ))),
    }
}

/// Advance to the next child of the current element.
///
/// Returns `None` once the closing tag of the current element was consumed.
fn next_child<R: Read>(reader: &mut Deserializer<R>) -> Result<Option<Child>> {
    loop {
        let peeked = match reader.peek().map_err(MalformedReportError::Xml)? {
            XmlEvent::StartElement { name, .. } => Peeked::Start(name.local_name.clone()),
            XmlEvent::EndElement { .. } => Peeked::End,
            XmlEvent::EndDocument => Peeked::EndOfDocument,
            _ => Peeked::Other,
        };
        match peeked {
            Peeked::Start(tag) => return Ok(Some(Child::Element(tag))),
            Peeked::EndOfDocument => {
                return Err(MalformedReportError::Xml(
                    "unexpected end of document".to_string(),
                ))
            }
            Peeked::End => {
                reader.next_event().map_err(MalformedReportError::Xml)?;
                return Ok(None);
            }
            Peeked::Other => match reader.next_event().map_err(MalformedReportError::Xml)? {
                XmlEvent::Characters(text) | XmlEvent::CData(text) | XmlEvent::Whitespace(text) => {
                    return Ok(Some(Child::Text(text)))
                }
                _ => {}
            },
        }
    }
}

/// Consume an element and return all text below it.
fn read_text<R: Read>(reader: &mut Deserializer<R>) -> Result<String> {
    start_element(reader)?;
    let mut text = String::new();
    while let Some(child) = next_child(reader)? {
        match child {
            Child::Text(run) => text.push_str(&run),
            Child::Element(_) => text.push_str(&read_text(reader)?),
        }
    }
    Ok(text)
}

fn skip_element<R: Read>(reader: &mut Deserializer<R>, tag: &str) -> Result<()> {
    trace!("Skipping unrecognized element <{}>", tag);
    read_text(reader).map(drop)
}

impl YaDeserialize for Suite {
    fn deserialize<R: Read>(reader: &mut Deserializer<R>) -> std::result::Result<Self, String> {
        decode_suite(reader).map_err(|err| err.to_string())
    }
}

impl YaDeserialize for TestCase {
    fn deserialize<R: Read>(reader: &mut Deserializer<R>) -> std::result::Result<Self, String> {
        decode_test_case(reader).map_err(|err| err.to_string())
    }
}

impl YaDeserialize for ErrorInfo {
    fn deserialize<R: Read>(reader: &mut Deserializer<R>) -> std::result::Result<Self, String> {
        decode_error_info(reader).map_err(|err| err.to_string())
    }
}

impl YaDeserialize for Values {
    fn deserialize<R: Read>(reader: &mut Deserializer<R>) -> std::result::Result<Self, String> {
        decode_values(reader).map_err(|err| err.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::setup;

    #[test]
    fn parses_bare_testsuite_attributes() {
        setup();
        let suite = parse_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <testsuite name="pkg.Target" classname="pkg" tests="4" failures="1" errors="2"
                       skipped="1" disabled="3" time="1.25" system-out="out" system-err="err">
              <testcase name="a" classname="pkg.A" status="run" result="completed" time="0.100"/>
            </testsuite>"#,
        )
        .unwrap();

        assert_eq!(suite.name.as_deref(), Some("pkg.Target"));
        assert_eq!(suite.classname.as_deref(), Some("pkg"));
        assert_eq!(
            (suite.tests, suite.failures, suite.errors, suite.skipped, suite.disabled),
            (4, 1, 2, 1, 3)
        );
        assert_eq!(suite.time, 1.25);
        assert_eq!(suite.system_out.as_deref(), Some("out"));
        assert_eq!(suite.system_err.as_deref(), Some("err"));
        assert!(suite.suites.is_empty());

        let case = &suite.test_cases[0];
        assert_eq!(case.name.as_deref(), Some("a"));
        assert_eq!(case.classname.as_deref(), Some("pkg.A"));
        assert_eq!(case.status.as_deref(), Some("run"));
        assert_eq!(case.result.as_deref(), Some("completed"));
        assert_eq!(case.time.as_deref(), Some("0.100"));
    }

    #[test]
    fn whitespace_before_root_is_ignored() {
        let suite = parse_str("<?xml version=\"1.0\"?>\n\n  <testsuite name=\"s\"/>\n").unwrap();
        assert_eq!(suite.name.as_deref(), Some("s"));
    }

    #[test]
    fn missing_attributes_take_defaults() {
        let suite = parse_str("<testsuite/>").unwrap();
        assert_eq!(suite, Suite::default());
    }

    #[test]
    fn wrapper_becomes_synthetic_root() {
        let wrapped = parse_str(r#"<testsuites><testsuite name="A" tests="1"/></testsuites>"#)
            .unwrap();
        let bare = parse_str(r#"<testsuite name="A" tests="1"/>"#).unwrap();

        assert_eq!(wrapped.name, None);
        assert_eq!(wrapped.tests, 0);
        assert_eq!(wrapped.suites, vec![bare]);
    }

    #[test]
    fn wrapper_keeps_suite_order() {
        let root = parse_str(
            r#"<testsuites name="ignored" tests="9">
                 <testsuite name="B"/>
                 <testsuite name="A"/>
               </testsuites>"#,
        )
        .unwrap();
        let names: Vec<_> = root.suites.iter().map(|s| s.name.as_deref()).collect();
        assert_eq!(names, vec![Some("B"), Some("A")]);
        assert_eq!(root.tests, 0);
    }

    #[test]
    fn nested_suites_and_decorators_are_kept_apart() {
        let suite = parse_str(
            r#"<testsuite name="outer">
                 <testsuite name="inner" tests="2">
                   <testsuite name="leaf" tests="1"><testcase name="t"/></testsuite>
                 </testsuite>
                 <testdecorator name="setup" tests="1"><testcase name="d"/></testdecorator>
                 <testcase name="direct"/>
               </testsuite>"#,
        )
        .unwrap();

        assert_eq!(suite.suites.len(), 1);
        assert_eq!(suite.decorators.len(), 1);
        assert_eq!(suite.test_cases.len(), 1);
        let inner = &suite.suites[0];
        assert_eq!(inner.tests, 2);
        assert_eq!(inner.suites[0].name.as_deref(), Some("leaf"));
        assert_eq!(inner.suites[0].test_cases[0].name.as_deref(), Some("t"));
        assert_eq!(suite.decorators[0].name.as_deref(), Some("setup"));
        assert_eq!(suite.decorators[0].test_cases[0].name.as_deref(), Some("d"));
    }

    #[test]
    fn unknown_attributes_and_elements_are_ignored() {
        let suite = parse_str(
            r#"<testsuite name="s" hostname="box" timestamp="now" tests="1">
                 <properties><property name="k" value="v"/></properties>
                 <testcase name="t" file="a.rs" line="3">
                   <system-out>noise</system-out>
                   <failure message="boom"/>
                 </testcase>
                 <system-out>more noise</system-out>
               </testsuite>"#,
        )
        .unwrap();

        assert_eq!(suite.tests, 1);
        assert_eq!(suite.system_out, None);
        assert_eq!(suite.test_cases.len(), 1);
        let case = &suite.test_cases[0];
        assert_eq!(case.system_out, None);
        assert_eq!(case.failures.len(), 1);
        assert_eq!(case.failures[0].error_content().as_deref(), Some("boom"));
    }

    #[test]
    fn test_case_collects_multiple_errors_and_failures() {
        let suite = parse_str(
            r#"<testsuite>
                 <testcase name="t">
                   <error message="e1" type="Crash"/>
                   <failure message="f1"/>
                   <error message="e2"/>
                   <failure message="f2"/>
                   <skipped message="flaky"/>
                 </testcase>
               </testsuite>"#,
        )
        .unwrap();

        let case = &suite.test_cases[0];
        let errors: Vec<_> = case.errors.iter().map(|e| e.message.as_deref()).collect();
        let failures: Vec<_> = case.failures.iter().map(|e| e.message.as_deref()).collect();
        assert_eq!(errors, vec![Some("e1"), Some("e2")]);
        assert_eq!(failures, vec![Some("f1"), Some("f2")]);
        assert_eq!(case.errors[0].kind.as_deref(), Some("Crash"));
        assert_eq!(
            case.skipped.as_ref().and_then(|s| s.message.as_deref()),
            Some("flaky")
        );
    }

    #[test]
    fn suite_level_error_and_failure() {
        let suite = parse_str(
            r#"<testsuite name="s">
                 <error message="setup crashed"/>
                 <failure message="first"/>
                 <failure message="second"/>
               </testsuite>"#,
        )
        .unwrap();

        assert_eq!(
            suite.error.and_then(|e| e.error_content()).as_deref(),
            Some("setup crashed")
        );
        assert_eq!(
            suite.failure.and_then(|e| e.message).as_deref(),
            Some("second")
        );
    }

    #[test]
    fn error_with_message_only() {
        let suite = parse_str(r#"<testsuite><testcase><error message="m"/></testcase></testsuite>"#)
            .unwrap();
        let error = &suite.test_cases[0].errors[0];
        assert!(error.content.is_empty());
        assert_eq!(error.error_content().as_deref(), Some("m"));
    }

    #[test]
    fn error_cdata_fragments_are_joined() {
        let suite = parse_str(
            "<testsuite><testcase><error><![CDATA[line1]]>\n<![CDATA[line2]]></error></testcase></testsuite>",
        )
        .unwrap();
        let error = &suite.test_cases[0].errors[0];
        assert_eq!(error.error_content().as_deref(), Some("line1\nline2"));
    }

    #[test]
    fn error_body_wins_over_message() {
        let suite = parse_str(
            r#"<testsuite><testcase>
                 <failure message="expected 1" type="AssertionError">
                   at Foo.bar(Foo.java:12)
                 </failure>
               </testcase></testsuite>"#,
        )
        .unwrap();
        let failure = &suite.test_cases[0].failures[0];
        assert_eq!(
            failure.error_content().as_deref(),
            Some("at Foo.bar(Foo.java:12)")
        );
    }

    #[test]
    fn error_keeps_unknown_elements_as_opaque_content() {
        let suite = parse_str(
            r#"<testsuite><testcase>
                 <failure>head<trace><frame>f1</frame> <frame>f2</frame></trace>tail</failure>
               </testcase></testsuite>"#,
        )
        .unwrap();
        let failure = &suite.test_cases[0].failures[0];
        assert_eq!(failure.content.len(), 3);
        match &failure.content[1] {
            Content::Element(element) => assert_eq!(element.name, "trace"),
            other => panic!("expected an opaque element, got {other:?}"),
        }
        assert_eq!(failure.content[1].text(), "f1 f2");
        assert_eq!(failure.error_content().as_deref(), Some("head\nf1 f2\ntail"));
    }

    #[test]
    fn expected_and_actual_values() {
        let suite = parse_str(
            r#"<testsuite><testcase>
                 <failure><expected><value>1</value></expected><actual><value>2</value></actual></failure>
               </testcase></testsuite>"#,
        )
        .unwrap();
        let failure = &suite.test_cases[0].failures[0];
        assert_eq!(failure.expected.as_ref().unwrap().values, vec!["1"]);
        assert_eq!(failure.actual.as_ref().unwrap().values, vec!["2"]);
        assert!(failure.content.is_empty());
        assert_eq!(failure.error_content(), None);
    }

    #[test]
    fn expected_values_keep_order() {
        let suite = parse_str(
            r#"<testsuite><testcase><failure message="diff">
                 <expected><value>a</value><value>b</value><value></value></expected>
               </failure></testcase></testsuite>"#,
        )
        .unwrap();
        let failure = &suite.test_cases[0].failures[0];
        assert_eq!(failure.expected.as_ref().unwrap().values, vec!["a", "b", ""]);
        assert_eq!(failure.actual, None);
        assert_eq!(failure.error_content().as_deref(), Some("diff"));
    }

    #[test]
    fn values_keep_surrounding_whitespace() {
        let suite = parse_str(
            "<testsuite><testcase><failure>\
               <expected><value>a </value><value> </value></expected>\
               <actual><value>  a</value></actual>\
             </failure></testcase></testsuite>",
        )
        .unwrap();
        let failure = &suite.test_cases[0].failures[0];
        assert_eq!(failure.expected.as_ref().unwrap().values, vec!["a ", " "]);
        assert_eq!(failure.actual.as_ref().unwrap().values, vec!["  a"]);
    }

    #[test]
    fn whitespace_only_error_body_falls_back_to_message() {
        let suite = parse_str(
            "<testsuite><testcase><error message=\"m\">\n  </error></testcase></testsuite>",
        )
        .unwrap();
        let error = &suite.test_cases[0].errors[0];
        assert!(error.content.is_empty());
        assert_eq!(error.error_content().as_deref(), Some("m"));
    }

    #[test]
    fn invalid_counter_is_rejected() {
        let err = parse_str(r#"<testsuite tests="x"/>"#).unwrap_err();
        assert_eq!(
            err,
            MalformedReportError::InvalidAttribute {
                element: "testsuite".to_string(),
                attribute: "tests".to_string(),
                value: "x".to_string(),
            }
        );
    }

    #[test]
    fn negative_counter_is_rejected() {
        let err = parse_str(r#"<testsuite><testsuite failures="-1"/></testsuite>"#).unwrap_err();
        assert!(matches!(err, MalformedReportError::InvalidAttribute { .. }));
    }

    #[test]
    fn unexpected_root_is_rejected() {
        let err = parse_str("<html><body/></html>").unwrap_err();
        assert_eq!(err, MalformedReportError::UnexpectedRoot("html".to_string()));
    }

    #[test]
    fn malformed_xml_is_rejected() {
        assert!(matches!(
            parse_str("<testsuite><testcase></testsuite>"),
            Err(MalformedReportError::Xml(_))
        ));
        assert!(matches!(parse_str(""), Err(MalformedReportError::Xml(_))));
        assert!(matches!(
            parse_str("<testsuite name=\"truncated\">"),
            Err(MalformedReportError::Xml(_))
        ));
    }

    #[test]
    fn yaserde_entry_point_decodes_elements() {
        let case: TestCase =
            yaserde::de::from_str(r#"<testcase name="t"><skipped message="later"/></testcase>"#)
                .unwrap();
        assert_eq!(case.name.as_deref(), Some("t"));
        assert_eq!(
            case.skipped.and_then(|s| s.error_content()).as_deref(),
            Some("later")
        );
    }
}
