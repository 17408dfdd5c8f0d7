//! JUnit-style XML results (`XMLPlugin.producingJUnitFormat`).

use serde::Serialize;

use crate::infra::xml::{Document, Element};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JUnitSummary {
    pub suites: usize,
    pub tests: usize,
    pub failures: usize,
    pub errors: usize,
    pub skipped: usize,
    /// `Class/test` for every test case, in file order.
    pub test_names: Vec<String>,
    pub failed_tests: Vec<String>,
}

impl JUnitSummary {
    pub fn passed(&self) -> usize {
        self.tests
            .saturating_sub(self.failures + self.errors + self.skipped)
    }
}

pub fn summarize(doc: &Document) -> Result<JUnitSummary, String> {
    let root = &doc.root;
    let mut summary = JUnitSummary::default();
    match root.name.as_str() {
        "testsuites" => summary.suites = root.descendants_named("testsuite").len(),
        "testsuite" => summary.suites = 1 + root.descendants_named("testsuite").len(),
        other => return Err(format!("unexpected root element <{}>", other)),
    }

    for case in root.descendants_named("testcase") {
        let name = case_name(case);
        summary.tests += 1;
        if case.child("failure").is_some() {
            summary.failures += 1;
            summary.failed_tests.push(name.clone());
        } else if case.child("error").is_some() {
            summary.errors += 1;
            summary.failed_tests.push(name.clone());
        } else if case.child("skipped").is_some() {
            summary.skipped += 1;
        }
        summary.test_names.push(name);
    }
    Ok(summary)
}

fn case_name(case: &Element) -> String {
    let name = case.attr("name").unwrap_or("<unnamed>");
    match case.attr("classname").filter(|c| !c.is_empty()) {
        Some(class) => format!("{}/{}", class, name),
        None => name.to_string(),
    }
}
