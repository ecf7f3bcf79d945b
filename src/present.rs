//! Markdown rendering of an [`AnalysisResult`].
//!
//! Four sections, in display order: strengths and weaknesses, fact check,
//! speech script, tricky questions. Rendering never fails. An absent field
//! or an empty list shows its placeholder, a malformed field shows its raw
//! value.

use crate::analysis::{AnalysisResult, FactCheckItem, Field, Script};
use crate::config::Tone;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

pub const NO_STRENGTHS: &str = "No strengths were identified.";
pub const NO_WEAKNESSES: &str = "No weaknesses were identified.";
pub const NO_FACT_CHECK: &str = "No claims could be extracted for fact-checking.";
pub const NO_SCRIPT: &str = "The speech script could not be generated.";
pub const NO_SCRIPT_PART: &str = "This part of the script is missing.";
pub const NO_QUESTIONS: &str = "No tricky questions could be generated.";

/// One displayed section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    /// Markdown body, without the title heading.
    pub body: String,
}

/// The four rendered sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub sections: Vec<Section>,
}

impl Report {
    /// Concatenate the sections as `## Title` blocks.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "## {}\n", section.title);
            out.push_str(section.body.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Render `analysis`; `tone` only appears in the script heading.
pub fn render(analysis: &AnalysisResult, tone: Tone) -> Report {
    Report {
        sections: vec![
            Section {
                title: "Strengths and weaknesses".to_string(),
                body: strengths_and_weaknesses(analysis),
            },
            Section {
                title: "Fact check".to_string(),
                body: fact_check(&analysis.fact_check),
            },
            Section {
                title: format!("Speech script ({})", tone.label()),
                body: script(&analysis.storytelling_script),
            },
            Section {
                title: "Tricky questions".to_string(),
                body: questions(&analysis.tricky_questions),
            },
        ],
    }
}

fn strengths_and_weaknesses(analysis: &AnalysisResult) -> String {
    let mut out = String::from("### Strengths\n\n");
    out.push_str(&bullets(&analysis.strengths, "✅", NO_STRENGTHS));
    out.push_str("\n### Weaknesses\n\n");
    out.push_str(&bullets(&analysis.weaknesses, "⚠️", NO_WEAKNESSES));
    out
}

fn bullets(field: &Field<Vec<String>>, mark: &str, placeholder: &str) -> String {
    match field {
        Field::Present(items) if !items.is_empty() => items
            .iter()
            .map(|item| format!("- {mark} {}\n", one_line(item)))
            .collect(),
        Field::Malformed(raw) => raw_block(raw),
        _ => format!("{placeholder}\n"),
    }
}

fn fact_check(field: &Field<Vec<FactCheckItem>>) -> String {
    let items = match field {
        Field::Present(items) if !items.is_empty() => items,
        Field::Malformed(raw) => return raw_block(raw),
        _ => return format!("{NO_FACT_CHECK}\n"),
    };

    let mut out = String::new();
    let records: Vec<_> = items
        .iter()
        .filter_map(|i| match i {
            FactCheckItem::Record(r) => Some(r),
            FactCheckItem::Loose(_) => None,
        })
        .collect();

    if !records.is_empty() {
        out.push_str("| Claim | Verdict | Explanation |\n");
        out.push_str("|---|---|---|\n");
        for r in &records {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                table_cell(&r.claim),
                table_cell(&r.verdict.label()),
                table_cell(&r.explanation)
            );
        }
    }

    let loose: Vec<&str> = items
        .iter()
        .filter_map(|i| match i {
            FactCheckItem::Loose(s) => Some(s.as_str()),
            FactCheckItem::Record(_) => None,
        })
        .collect();
    if !loose.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        for item in loose {
            let _ = writeln!(out, "- {}", one_line(item));
        }
    }
    out
}

fn script(field: &Field<Script>) -> String {
    let script = match field {
        Field::Present(s) => s,
        Field::Malformed(raw) => return raw_block(raw),
        Field::Absent => return format!("{NO_SCRIPT}\n"),
    };

    let parts = [
        ("Introduction", &script.introduction),
        ("Main part", &script.main_part),
        ("Conclusion", &script.conclusion),
    ];
    let mut out = String::new();
    for (i, (heading, text)) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "### {heading}\n");
        let _ = writeln!(out, "{}", text.as_deref().unwrap_or(NO_SCRIPT_PART).trim());
    }
    out
}

fn questions(field: &Field<Vec<String>>) -> String {
    match field {
        Field::Present(items) if !items.is_empty() => items
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}\n", i + 1, one_line(q)))
            .collect(),
        Field::Malformed(raw) => raw_block(raw),
        _ => format!("{NO_QUESTIONS}\n"),
    }
}

/// A malformed value: strings verbatim, anything else as pretty JSON.
fn raw_block(raw: &Value) -> String {
    match raw {
        Value::String(s) => format!("{}\n", s.trim()),
        other => {
            let pretty = serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string());
            format!("```json\n{pretty}\n```\n")
        }
    }
}

/// Keep a list item on one line.
fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape a value for a GFM table cell.
fn table_cell(s: &str) -> String {
    s.trim()
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}
