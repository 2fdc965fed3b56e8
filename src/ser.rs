//! Writing suites back to `test.xml`.
//!
//! Error bodies are written as their flattened [`ErrorInfo::error_content`] text, so
//! unrecognized elements inside them are not reproduced.

use crate::de::{
    ACTUAL, ERROR, EXPECTED, FAILURE, SKIPPED, TESTCASE, TESTDECORATOR, TESTSUITE, TESTSUITES,
    VALUE,
};
use crate::error::WriteError;
use crate::model::{ErrorInfo, Suite, TestCase, Values};
use std::io::Write;
use xml::attribute::OwnedAttribute;
use xml::namespace::Namespace;
use xml::writer::{Result as EmitResult, XmlEvent};
use yaserde::ser::{Config, Serializer};
use yaserde::YaSerialize;

/// Writes the children of a suite under a `<testsuites>` root.
///
/// Used for synthetic roots such as the result of [`crate::merge_suites`], which have no
/// identity of their own.
#[derive(Clone, Copy, Debug)]
pub struct TestSuites<'a>(pub &'a Suite);

pub fn to_string<T: YaSerialize>(report: &T) -> Result<String, WriteError> {
    yaserde::ser::to_string(report).map_err(WriteError)
}

pub fn to_string_with_config<T: YaSerialize>(
    report: &T,
    config: &Config,
) -> Result<String, WriteError> {
    yaserde::ser::to_string_with_config(report, config).map_err(WriteError)
}

fn write_suite<W: Write>(
    writer: &mut Serializer<W>,
    element: &str,
    suite: &Suite,
) -> EmitResult<()> {
    let tests = suite.tests.to_string();
    let failures = suite.failures.to_string();
    let errors = suite.errors.to_string();
    let skipped = suite.skipped.to_string();
    let disabled = suite.disabled.to_string();
    let time = suite.time.to_string();

    let mut start = XmlEvent::start_element(element);
    if let Some(name) = &suite.name {
        start = start.attr("name", name);
    }
    if let Some(classname) = &suite.classname {
        start = start.attr("classname", classname);
    }
    start = start
        .attr("tests", &tests)
        .attr("failures", &failures)
        .attr("errors", &errors)
        .attr("skipped", &skipped)
        .attr("disabled", &disabled)
        .attr("time", &time);
    if let Some(system_out) = &suite.system_out {
        start = start.attr("system-out", system_out);
    }
    if let Some(system_err) = &suite.system_err {
        start = start.attr("system-err", system_err);
    }
    writer.write(start)?;

    if let Some(error) = &suite.error {
        write_error_info(writer, ERROR, error)?;
    }
    if let Some(failure) = &suite.failure {
        write_error_info(writer, FAILURE, failure)?;
    }
    for child in &suite.suites {
        write_suite(writer, TESTSUITE, child)?;
    }
    for decorator in &suite.decorators {
        write_suite(writer, TESTDECORATOR, decorator)?;
    }
    for test_case in &suite.test_cases {
        write_test_case(writer, test_case)?;
    }
    writer.write(XmlEvent::end_element())
}

fn write_test_case<W: Write>(writer: &mut Serializer<W>, test_case: &TestCase) -> EmitResult<()> {
    let attributes = [
        ("name", &test_case.name),
        ("classname", &test_case.classname),
        ("status", &test_case.status),
        ("result", &test_case.result),
        ("time", &test_case.time),
        ("system-out", &test_case.system_out),
        ("system-err", &test_case.system_err),
    ];
    let mut start = XmlEvent::start_element(TESTCASE);
    for (name, value) in &attributes {
        if let Some(value) = value {
            start = start.attr(*name, value);
        }
    }
    writer.write(start)?;

    for error in &test_case.errors {
        write_error_info(writer, ERROR, error)?;
    }
    for failure in &test_case.failures {
        write_error_info(writer, FAILURE, failure)?;
    }
    if let Some(skipped) = &test_case.skipped {
        write_error_info(writer, SKIPPED, skipped)?;
    }
    writer.write(XmlEvent::end_element())
}

fn write_error_info<W: Write>(
    writer: &mut Serializer<W>,
    element: &str,
    info: &ErrorInfo,
) -> EmitResult<()> {
    let mut start = XmlEvent::start_element(element);
    if let Some(message) = &info.message {
        start = start.attr("message", message);
    }
    if let Some(kind) = &info.kind {
        start = start.attr("type", kind);
    }
    writer.write(start)?;

    if !info.content.is_empty() {
        if let Some(body) = info.error_content().filter(|body| !body.is_empty()) {
            writer.write(XmlEvent::characters(&body))?;
        }
    }
    if let Some(expected) = &info.expected {
        write_values(writer, EXPECTED, expected)?;
    }
    if let Some(actual) = &info.actual {
        write_values(writer, ACTUAL, actual)?;
    }
    writer.write(XmlEvent::end_element())
}

fn write_values<W: Write>(
    writer: &mut Serializer<W>,
    element: &str,
    values: &Values,
) -> EmitResult<()> {
    writer.write(XmlEvent::start_element(element))?;
    for value in &values.values {
        writer.write(XmlEvent::start_element(VALUE))?;
        writer.write(XmlEvent::characters(value))?;
        writer.write(XmlEvent::end_element())?;
    }
    writer.write(XmlEvent::end_element())
}

impl YaSerialize for Suite {
    fn serialize<W: Write>(&self, writer: &mut Serializer<W>) -> Result<(), String> {
        write_suite(writer, TESTSUITE, self).map_err(|err| err.to_string())
    }

    fn serialize_attributes(
        &self,
        attributes: Vec<OwnedAttribute>,
        namespace: Namespace,
    ) -> Result<(Vec<OwnedAttribute>, Namespace), String> {
        Ok((attributes, namespace))
    }
}

impl YaSerialize for TestSuites<'_> {
    fn serialize<W: Write>(&self, writer: &mut Serializer<W>) -> Result<(), String> {
        let mut write = || -> EmitResult<()> {
            writer.write(XmlEvent::start_element(TESTSUITES))?;
            for suite in &self.0.suites {
                write_suite(writer, TESTSUITE, suite)?;
            }
            writer.write(XmlEvent::end_element())
        };
        write().map_err(|err| err.to_string())
    }

    fn serialize_attributes(
        &self,
        attributes: Vec<OwnedAttribute>,
        namespace: Namespace,
    ) -> Result<(Vec<OwnedAttribute>, Namespace), String> {
        Ok((attributes, namespace))
    }
}
