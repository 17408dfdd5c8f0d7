//! # Cobertura Coverage Module / Cobertura 覆盖率模块
//!
//! Coverage reports list every file MATLAB saw executing, and that includes
//! the generated driver. Sanitizing drops the `<source>`, `<package>` and
//! `<class>` entries that belong to it and recomputes the line totals the
//! removal invalidated. [`find_leak`] then checks that no marker survived
//! anywhere in the document.
//!
//! 覆盖率报告会包含生成的驱动脚本。清理会删除属于驱动脚本的条目并重新计算行统计。

use serde::Serialize;

use crate::infra::xml::{Document, Element, Node};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub line_rate: f64,
    /// As reported by MATLAB; not recomputed.
    pub branch_rate: Option<f64>,
    pub lines_valid: u64,
    pub lines_covered: u64,
    pub packages: usize,
    pub classes: Vec<String>,
    /// Driver entries removed during sanitization.
    pub removed_entries: usize,
}

fn has_marker(value: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|m| !m.is_empty() && value.contains(m.as_str()))
}

fn is_driver_class(class: &Element, markers: &[String]) -> bool {
    class.name == "class"
        && (class.attr("name").is_some_and(|n| has_marker(n, markers))
            || class.attr("filename").is_some_and(|f| has_marker(f, markers)))
}

/// Removes children matching `drop`, returning how many went away.
fn remove_elements(parent: &mut Element, mut drop: impl FnMut(&Element) -> bool) -> usize {
    let before = parent.children.len();
    parent.children.retain(|node| match node {
        Node::Element(e) => !drop(e),
        _ => true,
    });
    before - parent.children.len()
}

fn classes_of(package: &Element) -> impl Iterator<Item = &Element> {
    package
        .children_named("classes")
        .flat_map(|c| c.children_named("class"))
}

/// `(valid, covered)` line counts of a class, ignoring method-level repeats.
fn line_counts(class: &Element) -> (u64, u64) {
    class
        .children_named("lines")
        .flat_map(|l| l.children_named("line"))
        .fold((0, 0), |(valid, covered), line| {
            let hits = line
                .attr("hits")
                .and_then(|h| h.trim().parse::<u64>().ok())
                .unwrap_or(0);
            (valid + 1, covered + u64::from(hits > 0))
        })
}

fn format_rate(covered: u64, valid: u64) -> String {
    if valid == 0 {
        return "0".to_string();
    }
    let rate = covered as f64 / valid as f64;
    let text = format!("{:.4}", rate);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn package_totals(package: &Element) -> (u64, u64) {
    classes_of(package).map(line_counts).fold((0, 0), |(v, c), (lv, lc)| (v + lv, c + lc))
}

/// Strips driver entries in place and returns how many were removed.
/// Line totals are only rewritten when something was removed, so a clean
/// report is emitted exactly as MATLAB wrote it.
pub fn sanitize(doc: &mut Document, markers: &[String]) -> usize {
    let mut removed = 0;

    for section in doc.root.elements_mut() {
        match section.name.as_str() {
            "sources" => {
                removed += remove_elements(section, |s| {
                    s.name == "source" && has_marker(&s.text(), markers)
                });
            }
            "packages" => {
                removed += remove_elements(section, |p| {
                    p.name == "package" && p.attr("name").is_some_and(|n| has_marker(n, markers))
                });
                let mut emptied = false;
                for package in section.elements_mut().filter(|e| e.name == "package") {
                    let mut dropped = 0;
                    for classes in package.elements_mut().filter(|e| e.name == "classes") {
                        dropped += remove_elements(classes, |c| is_driver_class(c, markers));
                    }
                    if dropped == 0 {
                        continue;
                    }
                    removed += dropped;
                    if classes_of(package).next().is_none() {
                        emptied = true;
                        package.name.clear();
                    } else {
                        let (valid, covered) = package_totals(package);
                        package.set_attr("line-rate", format_rate(covered, valid));
                    }
                }
                if emptied {
                    remove_elements(section, |p| p.name.is_empty());
                }
            }
            _ => {}
        }
    }

    if removed > 0 {
        let (valid, covered) = root_totals(&doc.root);
        doc.root.set_attr("lines-valid", valid.to_string());
        doc.root.set_attr("lines-covered", covered.to_string());
        doc.root.set_attr("line-rate", format_rate(covered, valid));
    }
    removed
}

fn root_totals(root: &Element) -> (u64, u64) {
    root.children_named("packages")
        .flat_map(|p| p.children_named("package"))
        .map(package_totals)
        .fold((0, 0), |(v, c), (pv, pc)| (v + pv, c + pc))
}

/// The first marker still present anywhere in the document.
pub fn find_leak(doc: &Document, markers: &[String]) -> Option<String> {
    let mut found = None;
    doc.root.any_string(&mut |value| {
        found = markers
            .iter()
            .find(|m| !m.is_empty() && value.contains(m.as_str()))
            .cloned();
        found.is_some()
    });
    found
}

pub fn summarize(doc: &Document, removed_entries: usize) -> Result<CoverageSummary, String> {
    let root = &doc.root;
    if root.name != "coverage" {
        return Err(format!("unexpected root element <{}>", root.name));
    }
    let packages: Vec<&Element> = root
        .children_named("packages")
        .flat_map(|p| p.children_named("package"))
        .collect();
    let classes = packages
        .iter()
        .flat_map(|p| classes_of(*p))
        .map(|c| c.attr("name").unwrap_or_default().to_string())
        .collect();
    let (lines_valid, lines_covered) = root_totals(root);
    let line_rate = match root.attr("line-rate") {
        Some(rate) => rate
            .trim()
            .parse()
            .map_err(|_| format!("line-rate '{}' is not a number", rate))?,
        None if lines_valid == 0 => 0.0,
        None => lines_covered as f64 / lines_valid as f64,
    };
    Ok(CoverageSummary {
        line_rate,
        branch_rate: root.attr("branch-rate").and_then(|r| r.trim().parse().ok()),
        lines_valid,
        lines_covered,
        packages: packages.len(),
        classes,
        removed_entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        ["+scriptgen", "genscript", "runner_"]
            .iter()
            .map(|m| m.to_string())
            .collect()
    }

    const REPORT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<coverage branch-rate="NaN" line-rate="0.5" lines-covered="3" lines-valid="6" timestamp="1" version="1.0">
  <sources>
    <source>/ws/src</source>
    <source>/tmp/genscript_ab12</source>
  </sources>
  <packages>
    <package name="src" line-rate="1">
      <classes>
        <class name="sum" filename="sum.m" line-rate="1">
          <lines><line number="2" hits="1"/><line number="3" hits="4"/></lines>
        </class>
      </classes>
    </package>
    <package name="tmp.genscript_ab12" line-rate="0.25">
      <classes>
        <class name="runner_ab12" filename="runner_ab12.m">
          <lines><line number="1" hits="1"/><line number="2" hits="0"/></lines>
        </class>
      </classes>
    </package>
    <package name="mixed" line-rate="0">
      <classes>
        <class name="helper" filename="+scriptgen/selectTests.m">
          <lines><line number="1" hits="0"/></lines>
        </class>
        <class name="square" filename="square.m">
          <lines><line number="1" hits="0"/></lines>
        </class>
      </classes>
    </package>
  </packages>
</coverage>"#;

    #[test]
    fn driver_entries_are_removed_and_totals_recomputed() {
        let mut doc = Document::parse(REPORT).unwrap();
        let removed = sanitize(&mut doc, &markers());
        assert_eq!(removed, 3);
        assert_eq!(find_leak(&doc, &markers()), None);

        assert_eq!(doc.root.attr("lines-valid"), Some("3"));
        assert_eq!(doc.root.attr("lines-covered"), Some("2"));
        assert_eq!(doc.root.attr("line-rate"), Some("0.6667"));

        let summary = summarize(&doc, removed).unwrap();
        assert_eq!(summary.classes, vec!["sum", "square"]);
        assert_eq!(summary.packages, 2);
        assert_eq!(summary.branch_rate.map(f64::is_nan), Some(true));
    }

    #[test]
    fn clean_reports_are_left_alone() {
        let clean = r#"<coverage line-rate="0.5" lines-valid="9"><packages/></coverage>"#;
        let mut doc = Document::parse(clean).unwrap();
        assert_eq!(sanitize(&mut doc, &markers()), 0);
        assert_eq!(doc.root.attr("lines-valid"), Some("9"));
    }

    #[test]
    fn leaks_outside_known_entries_are_found() {
        let doc = Document::parse(
            r#"<coverage><packages><package name="p"><methods runner_x="1"/></package></packages></coverage>"#,
        )
        .unwrap();
        assert_eq!(find_leak(&doc, &markers()), Some("runner_".to_string()));
    }

    #[test]
    fn rates_are_trimmed() {
        assert_eq!(format_rate(1, 1), "1");
        assert_eq!(format_rate(1, 2), "0.5");
        assert_eq!(format_rate(0, 0), "0");
    }
}
