//! Placeholder values for one generation request.

use crate::error::{Result, StampError};
use crate::registry::canonical_name;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Pre-formatted display strings keyed by placeholder name. Keys may be
/// written with or without surrounding brackets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValueMap {
    values: BTreeMap<String, String>,
}

impl FieldValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with one more entry; the map itself is never mutated
    /// after it is handed to the renderer.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Looks `name` up as written, then bare, then bracketed, and returns the
    /// first entry that exists, blank or not.
    pub fn get(&self, name: &str) -> Option<&str> {
        key_forms(name)
            .iter()
            .find_map(|key| self.values.get(key.as_str()))
            .map(String::as_str)
    }

    /// Like [`FieldValueMap::get`], but skips entries that are empty after
    /// trimming, so `{"[EMAIL]": "", "EMAIL": "a@b.co"}` yields `a@b.co`.
    pub fn get_filled(&self, name: &str) -> Option<&str> {
        key_forms(name)
            .iter()
            .filter_map(|key| self.values.get(key.as_str()))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Builds a map from a JSON object of strings. `null` entries are treated
    /// as absent; any other non-string value is rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(object) = value else {
            return Err(StampError::FieldValue {
                key: "<root>".to_string(),
                found: json_kind(value),
            });
        };
        let mut values = BTreeMap::new();
        for (key, value) in object {
            match value {
                Value::String(text) => {
                    values.insert(key.clone(), text.clone());
                }
                Value::Null => {}
                other => {
                    return Err(StampError::FieldValue {
                        key: key.clone(),
                        found: json_kind(other),
                    });
                }
            }
        }
        Ok(Self { values })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn key_forms(name: &str) -> [String; 3] {
    let bare = canonical_name(name);
    [name.to_string(), bare.to_string(), format!("[{bare}]")]
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coverage amounts arrive either as a number or as free text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CoverageAmount {
    Amount(f64),
    Text(String),
}

/// Raw agreement form data, keyed by the application's field identifiers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AgreementForm {
    pub licensee_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub aircraft_registration: Option<String>,
    pub aircraft_make_model: Option<String>,
    pub insurance_company: Option<String>,
    pub insurance_address: Option<String>,
    pub insurance_city: Option<String>,
    pub insurance_state: Option<String>,
    pub insurance_zip: Option<String>,
    pub insurance_phone: Option<String>,
    pub policy_number: Option<String>,
    pub policy_expiry: Option<String>,
    pub coverage_amount: Option<CoverageAmount>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl AgreementForm {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Maps form data onto canonical placeholder names with display formatting
/// already applied.
pub fn resolve_field_values(form: &AgreementForm) -> FieldValueMap {
    let text = |value: &Option<String>| value.as_deref().unwrap_or("").trim().to_string();

    let licensee = text(&form.licensee_name);
    let registration = text(&form.aircraft_registration);
    let make_model = text(&form.aircraft_make_model);
    let aircraft = match (registration.is_empty(), make_model.is_empty()) {
        (false, false) => format!("{registration} - {make_model}"),
        (false, true) => registration.clone(),
        _ => make_model.clone(),
    };
    let coverage = match &form.coverage_amount {
        Some(CoverageAmount::Amount(amount)) => format_usd_whole(*amount),
        Some(CoverageAmount::Text(raw)) => raw.trim().to_string(),
        None => String::new(),
    };

    FieldValueMap::from_iter([
        ("LICENSEE", licensee.clone()),
        ("LICENSEE-NAME", licensee),
        ("PHONE", text(&form.phone)),
        ("EMAIL", text(&form.email)),
        ("AIRCRAFT", aircraft),
        ("AIRCRAFT-REGISTRATION", registration),
        ("AIRCRAFT-MAKE-MODEL", make_model),
        ("INSURANCE-COMPANY", text(&form.insurance_company)),
        ("INSURANCE-ADDRESS", text(&form.insurance_address)),
        ("INSURANCE-CITY", text(&form.insurance_city)),
        ("INSURANCE-STATE", text(&form.insurance_state)),
        ("INSURANCE-ZIP", text(&form.insurance_zip)),
        ("INSURANCE-PHONE", text(&form.insurance_phone)),
        ("POLICY-NUMBER", text(&form.policy_number)),
        ("COVERAGE-AMOUNT", coverage),
        ("POLICY-EXPIRY", format_display_date(form.policy_expiry.as_deref())),
        ("START-DATE", format_display_date(form.start_date.as_deref())),
        ("END-DATE", format_display_date(form.end_date.as_deref())),
    ])
}

/// `YYYY-MM-DD` (optionally followed by a time part) to `DD/MM/YYYY`.
/// Anything unparseable becomes an empty string.
pub fn format_display_date(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };
    let date_part = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => date.format("%d/%m/%Y").to_string(),
        Err(err) => {
            log::debug!("unparseable date {raw:?}: {err}");
            String::new()
        }
    }
}

/// Whole US dollars with thousands separators. Zero and non-finite amounts
/// render as empty.
pub fn format_usd_whole(amount: f64) -> String {
    if !amount.is_finite() || amount == 0.0 {
        return String::new();
    }
    let rounded = amount.abs().round() as u64;
    let digits = rounded.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
