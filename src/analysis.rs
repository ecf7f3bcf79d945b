//! Typed view of the model's five-key JSON reply.
//!
//! Nothing in the reply is guaranteed: any key may be missing, `null`, of
//! the wrong type, or a string that itself holds JSON. Every field is
//! therefore a [`Field`], which keeps "missing" and "wrong shape" apart so
//! the presenter can show a placeholder for the first and the raw value for
//! the second.

use serde_json::{Map, Value};

/// One field of the reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// Key missing or `null`.
    Absent,
    /// Key present with an unexpected shape; carries the raw value.
    Malformed(Value),
    /// Key present and well-typed.
    Present(T),
}

impl<T> Field<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Field::Present(_))
    }

    pub fn present(&self) -> Option<&T> {
        match self {
            Field::Present(v) => Some(v),
            _ => None,
        }
    }
}

/// Verdict of one fact-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Truth,
    False,
    Unverifiable,
    /// Anything else the model wrote, kept verbatim.
    Other(String),
}

impl Verdict {
    /// Lenient parse: case-insensitive, accepts `true` for truth and the
    /// Russian verdict labels.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "truth" | "true" | "правда" | "истина" => Verdict::Truth,
            "false" | "ложь" => Verdict::False,
            "unverifiable" | "cannot be verified" | "невозможно проверить" | "непроверяемо" => {
                Verdict::Unverifiable
            }
            _ => Verdict::Other(raw.trim().to_string()),
        }
    }

    /// Display label with a status mark.
    pub fn label(&self) -> String {
        match self {
            Verdict::Truth => "✅ Truth".to_string(),
            Verdict::False => "❌ False".to_string(),
            Verdict::Unverifiable => "❓ Unverifiable".to_string(),
            Verdict::Other(s) => s.clone(),
        }
    }
}

/// A fact-check record with the three expected fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactCheckEntry {
    pub claim: String,
    pub verdict: Verdict,
    pub explanation: String,
}

/// One item of the `fact_check` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactCheckItem {
    Record(FactCheckEntry),
    /// A bare string (or scalar) where a record was expected.
    Loose(String),
}

/// The three-part speech script. A part is `None` when missing or blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub introduction: Option<String>,
    pub main_part: Option<String>,
    pub conclusion: Option<String>,
}

/// The parsed analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub strengths: Field<Vec<String>>,
    pub weaknesses: Field<Vec<String>>,
    pub fact_check: Field<Vec<FactCheckItem>>,
    pub storytelling_script: Field<Script>,
    pub tricky_questions: Field<Vec<String>>,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            strengths: Field::Absent,
            weaknesses: Field::Absent,
            fact_check: Field::Absent,
            storytelling_script: Field::Absent,
            tricky_questions: Field::Absent,
        }
    }
}

impl AnalysisResult {
    /// Read the five keys out of `value`. Never fails; a non-object reply
    /// leaves every field [`Field::Absent`].
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            strengths: field(obj, "strengths", string_list),
            weaknesses: field(obj, "weaknesses", string_list),
            fact_check: field(obj, "fact_check", fact_check_list),
            storytelling_script: field(obj, "storytelling_script", script),
            tricky_questions: field(obj, "tricky_questions", string_list),
        }
    }

    /// `true` when every field is present.
    pub fn is_complete(&self) -> bool {
        self.strengths.is_present()
            && self.weaknesses.is_present()
            && self.fact_check.is_present()
            && self.storytelling_script.is_present()
            && self.tricky_questions.is_present()
    }
}

fn field<T>(obj: &Map<String, Value>, key: &str, shape: fn(&Value) -> Option<T>) -> Field<T> {
    let value = match obj.get(key) {
        None | Some(Value::Null) => return Field::Absent,
        Some(v) => reparse_embedded_json(v),
    };
    if value.is_null() {
        return Field::Absent;
    }
    match shape(&value) {
        Some(v) => Field::Present(v),
        None => Field::Malformed(value),
    }
}

/// A string holding a JSON array or object is replaced by the parsed value.
fn reparse_embedded_json(value: &Value) -> Value {
    if let Value::String(s) = value {
        let t = s.trim();
        if (t.starts_with('[') && t.ends_with(']')) || (t.starts_with('{') && t.ends_with('}')) {
            if let Ok(parsed) = serde_json::from_str::<Value>(t) {
                return parsed;
            }
        }
    }
    value.clone()
}

/// Strings pass through; numbers and booleans are shown as written.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .filter(|v| !v.is_null())
        .map(scalar_text)
        .collect::<Option<Vec<_>>>()
        .map(|items| items.into_iter().filter(|s| !s.is_empty()).collect())
}

fn fact_check_list(value: &Value) -> Option<Vec<FactCheckItem>> {
    value
        .as_array()?
        .iter()
        .filter(|v| !v.is_null())
        .map(|item| match item {
            Value::Object(record) => {
                let text = |k: &str| record.get(k).and_then(scalar_text).unwrap_or_default();
                Some(FactCheckItem::Record(FactCheckEntry {
                    claim: text("claim"),
                    verdict: Verdict::parse(&text("verdict")),
                    explanation: text("explanation"),
                }))
            }
            other => scalar_text(other).map(FactCheckItem::Loose),
        })
        .collect()
}

fn script(value: &Value) -> Option<Script> {
    let obj = value.as_object()?;
    let part = |k: &str| {
        obj.get(k)
            .and_then(scalar_text)
            .filter(|s| !s.is_empty())
    };
    Some(Script {
        introduction: part("introduction"),
        main_part: part("main_part"),
        conclusion: part("conclusion"),
    })
}
