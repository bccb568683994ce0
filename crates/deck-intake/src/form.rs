//! Form answers: column values to template labels

use crate::event::Event;
use deck_assemble::LabelMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a label's value is read out of one column's JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extractor {
    /// `value` (short text, numbers)
    Value,
    /// `text` (long text)
    Text,
    /// Every `chosenValues[].name`, joined by ", "
    ChosenNames,
    /// The first `chosenValues[].name`
    FirstChosen,
    /// `label.text` (status and single-select columns)
    StatusLabel,
    /// `countryName`
    CountryName,
    /// `email`, else `text`
    Email,
}

impl Extractor {
    pub fn extract(self, column: &Value) -> Option<String> {
        let value = match self {
            Extractor::Value => scalar(column.get("value")?),
            Extractor::Text => scalar(column.get("text")?),
            Extractor::ChosenNames => {
                let names = chosen_names(column);
                (!names.is_empty()).then(|| names.join(", "))
            }
            Extractor::FirstChosen => chosen_names(column).into_iter().next(),
            Extractor::StatusLabel => scalar(column.get("label")?.get("text")?),
            Extractor::CountryName => scalar(column.get("countryName")?),
            Extractor::Email => column
                .get("email")
                .and_then(scalar)
                .or_else(|| column.get("text").and_then(scalar)),
        }?;
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn chosen_names(column: &Value) -> Vec<String> {
    column
        .get("chosenValues")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.get("name").and_then(Value::as_str))
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `label <- column` read with `extractor`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub label: String,
    pub column: String,
    pub extractor: Extractor,
}

impl FieldRule {
    pub fn new(label: &str, column: &str, extractor: Extractor) -> Self {
        Self {
            label: label.to_string(),
            column: column.to_string(),
            extractor,
        }
    }
}

/// The client form as the board lays it out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormMapping {
    pub rules: Vec<FieldRule>,
    /// Dropdown columns that may hold the style selection, checked in order
    pub style_columns: Vec<String>,
    /// Label that receives the joined style selection
    pub style_label: Option<String>,
    /// Column holding the client's address
    pub email_column: String,
}

impl Default for FormMapping {
    fn default() -> Self {
        use Extractor as E;
        Self {
            rules: vec![
                FieldRule::new("9. What is the property type", "dropdown76", E::FirstChosen),
                FieldRule::new("City", "text8", E::Value),
                FieldRule::new("Country", "country6", E::CountryName),
                FieldRule::new("11. Space to be designed", "dropdown0", E::ChosenNames),
                FieldRule::new("What is the area size?", "short_text8fr4spel", E::Value),
                FieldRule::new("5. How old are you", "status", E::StatusLabel),
                FieldRule::new("12. How many people will leave in the space", "text1", E::Value),
                FieldRule::new(
                    "10. What best describes your situation",
                    "single_selecti4d0sw1",
                    E::StatusLabel,
                ),
                FieldRule::new("13. Do you have any pets", "text_1", E::Value),
                FieldRule::new("16. Please describe the scope of work", "text37", E::Value),
                FieldRule::new("22. Is there any other information…", "long_text3", E::Text),
                FieldRule::new(
                    "15. What words describe best the mood and feel",
                    "short_text5fonuzuu",
                    E::Value,
                ),
            ],
            style_columns: ["dropdown", "dropdown0", "dropdown1", "dropdown2", "style_dropdown"]
                .into_iter()
                .map(String::from)
                .collect(),
            style_label: Some("Which style(s) do you like?".to_string()),
            email_column: "email".to_string(),
        }
    }
}

/// Everything the form contributes to one deck
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormAnswers {
    pub labels: LabelMap,
    /// Selected style names in the client's order
    pub styles: Vec<String>,
    pub recipient: Option<String>,
}

impl FormMapping {
    /// Read every rule. Labels without an answer are kept with `None`.
    pub fn read(&self, event: &Event) -> FormAnswers {
        let mut labels = LabelMap::new();
        for rule in &self.rules {
            let value = event
                .column(&rule.column)
                .and_then(|column| rule.extractor.extract(column));
            labels.insert(rule.label.clone(), value);
        }

        let styles = self.selected_styles(event);
        if let Some(label) = &self.style_label {
            let joined = (!styles.is_empty()).then(|| styles.join(", "));
            labels.insert(label.clone(), joined);
        }

        FormAnswers {
            labels,
            styles,
            recipient: self.recipient(event),
        }
    }

    /// The first style column that has any chosen value
    pub fn selected_styles(&self, event: &Event) -> Vec<String> {
        self.style_columns
            .iter()
            .filter_map(|id| event.column(id))
            .map(chosen_names)
            .find(|names| !names.is_empty())
            .unwrap_or_default()
    }

    pub fn recipient(&self, event: &Event) -> Option<String> {
        event
            .column(&self.email_column)
            .and_then(|column| Extractor::Email.extract(column))
    }
}
