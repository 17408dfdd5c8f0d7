//! TAP (Test Anything Protocol) result files, as written by MATLAB's
//! `TAPPlugin` in either the original format or version 13.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TapSummary {
    /// `None` for the original (unversioned) format.
    pub version: Option<u32>,
    pub planned: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// `not ok` lines carrying a TODO directive; these do not count as failures.
    pub todo: usize,
    pub failed_tests: Vec<String>,
}

impl TapSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.todo
    }
}

pub fn parse(text: &str) -> Result<TapSummary, String> {
    let mut summary = TapSummary::default();
    let mut plan: Option<usize> = None;
    let mut in_yaml = false;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end();
        if in_yaml {
            if line.trim() == "..." {
                in_yaml = false;
            }
            continue;
        }
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if line.trim() == "---" {
                in_yaml = true;
            }
            continue;
        }
        if let Some(version) = line.strip_prefix("TAP version ") {
            if index != 0 {
                return Err("'TAP version' must be the first line".to_string());
            }
            summary.version = Some(
                version
                    .trim()
                    .parse()
                    .map_err(|_| format!("bad TAP version '{}'", version.trim()))?,
            );
            continue;
        }
        if let Some(reason) = line.strip_prefix("Bail out!") {
            return Err(format!("test run bailed out:{}", reason));
        }
        if let Some(count) = parse_plan(line) {
            if plan.is_some() {
                return Err("more than one plan line".to_string());
            }
            plan = Some(count?);
            continue;
        }

        let Some((ok, rest)) = result_line(line) else {
            // Anything else is diagnostic noise per the protocol.
            continue;
        };
        let (description, directive) = match rest.split_once('#') {
            Some((d, dir)) => (d, dir.trim().to_ascii_uppercase()),
            None => (rest, String::new()),
        };
        let description = description
            .trim()
            .trim_start_matches(|c: char| c.is_ascii_digit())
            .trim_start_matches([' ', '-'])
            .trim()
            .to_string();

        if directive.starts_with("SKIP") {
            summary.skipped += 1;
        } else if !ok && directive.starts_with("TODO") {
            summary.todo += 1;
        } else if ok {
            summary.passed += 1;
        } else {
            summary.failed += 1;
            summary.failed_tests.push(description);
        }
    }

    let planned = plan.ok_or_else(|| "no plan line ('1..N') found".to_string())?;
    if planned != summary.total() {
        return Err(format!(
            "plan announced {} tests but {} were reported",
            planned,
            summary.total()
        ));
    }
    summary.planned = planned;
    Ok(summary)
}

/// Splits `ok ...` / `not ok ...` into the result and the rest of the line.
/// The keyword must stand alone, so `okay` is not a result.
fn result_line(line: &str) -> Option<(bool, &str)> {
    let (ok, rest) = match line.strip_prefix("not ok") {
        Some(rest) => (false, rest),
        None => (true, line.strip_prefix("ok")?),
    };
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some((ok, rest))
}

/// `1..N`, optionally followed by a `# skip` comment.
fn parse_plan(line: &str) -> Option<Result<usize, String>> {
    let rest = line.strip_prefix("1..")?;
    let count = rest.split('#').next().unwrap_or_default().trim();
    Some(
        count
            .parse()
            .map_err(|_| format!("bad plan line '{}'", line)),
    )
}
