use crate::form::FormFieldKind;
use crate::types::{Pt, Rect};
use serde::Serialize;
use std::collections::BTreeMap;

/// One value painted onto the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawRecord {
    pub page: u32,
    pub derived_name: String,
    pub placeholder: String,
    pub value: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    #[serde(serialize_with = "serialize_rect")]
    pub cover: Rect,
    #[serde(serialize_with = "serialize_pt")]
    pub width: Pt,
    pub fits: bool,
}

/// One interactive form field given a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilledField {
    pub name: String,
    pub value: String,
    pub kind: FormFieldKind,
}

/// Non-fatal conditions observed while overlaying.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayDiagnostic {
    /// No usable value was supplied; the position was skipped.
    MissingValue {
        page: u32,
        derived_name: String,
        description: String,
    },
    /// The value was drawn in full but is wider than its box.
    FitWarning {
        page: u32,
        derived_name: String,
        value: String,
        #[serde(serialize_with = "serialize_pt")]
        width: Pt,
        #[serde(serialize_with = "serialize_pt")]
        max_width: Pt,
    },
    /// Characters outside WinAnsi were written as `?`.
    LossyEncoding {
        page: u32,
        derived_name: String,
        replaced: usize,
    },
    /// A position refers to a page the document does not have.
    PageOutOfRange { page: u32, document_pages: usize },
    /// A fillable form field had no usable value and was left empty.
    MissingFieldValue { field: String },
}

impl OverlayDiagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            OverlayDiagnostic::MissingValue { .. } => "missing_value",
            OverlayDiagnostic::FitWarning { .. } => "fit_warning",
            OverlayDiagnostic::LossyEncoding { .. } => "lossy_encoding",
            OverlayDiagnostic::PageOutOfRange { .. } => "page_out_of_range",
            OverlayDiagnostic::MissingFieldValue { .. } => "missing_field_value",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlayReport {
    pub draws: Vec<DrawRecord>,
    /// Set instead of `draws` when the template was filled through its form.
    pub filled_fields: Vec<FilledField>,
    pub diagnostics: Vec<OverlayDiagnostic>,
    pub pages_processed: usize,
    pub pages_modified: usize,
}

impl OverlayReport {
    pub fn draws_on_page(&self, page: u32) -> impl Iterator<Item = &DrawRecord> {
        self.draws.iter().filter(move |draw| draw.page == page)
    }

    pub fn draws_for(&self, placeholder: &str) -> impl Iterator<Item = &DrawRecord> {
        let placeholder = crate::registry::canonical_name(placeholder).to_string();
        self.draws
            .iter()
            .filter(move |draw| crate::registry::canonical_name(&draw.placeholder) == placeholder)
    }

    /// Positions and form fields skipped for lack of a value.
    pub fn missing_values(&self) -> impl Iterator<Item = &str> {
        self.diagnostics.iter().filter_map(|diag| match diag {
            OverlayDiagnostic::MissingValue { derived_name, .. } => Some(derived_name.as_str()),
            OverlayDiagnostic::MissingFieldValue { field } => Some(field.as_str()),
            _ => None,
        })
    }

    pub fn fit_warnings(&self) -> impl Iterator<Item = &OverlayDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|diag| matches!(diag, OverlayDiagnostic::FitWarning { .. }))
    }

    /// Diagnostic counts keyed by kind.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut out = BTreeMap::new();
        for diag in &self.diagnostics {
            *out.entry(diag.kind()).or_insert(0) += 1;
        }
        out
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

fn serialize_pt<S: serde::Serializer>(value: &Pt, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f32(value.to_f32())
}

fn serialize_rect<S: serde::Serializer>(value: &Rect, serializer: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;
    let mut seq = serializer.serialize_seq(Some(4))?;
    for component in [value.x, value.y, value.width, value.height] {
        seq.serialize_element(&component.to_f32())?;
    }
    seq.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(page: u32, placeholder: &str) -> DrawRecord {
        DrawRecord {
            page,
            derived_name: placeholder.to_string(),
            placeholder: placeholder.to_string(),
            value: "x".to_string(),
            x: 10.0,
            y: 20.0,
            font_size: 10.0,
            cover: Rect {
                x: Pt::from_f32(8.0),
                y: Pt::from_f32(18.0),
                width: Pt::from_f32(10.0),
                height: Pt::from_f32(14.0),
            },
            width: Pt::from_f32(6.0),
            fits: true,
        }
    }

    #[test]
    fn filters_and_counts() {
        let report = OverlayReport {
            draws: vec![draw(1, "[START-DATE]"), draw(3, "[LICENSEE]"), draw(4, "[LICENSEE]")],
            diagnostics: vec![
                OverlayDiagnostic::MissingValue {
                    page: 4,
                    derived_name: "[EMAIL]".to_string(),
                    description: String::new(),
                },
                OverlayDiagnostic::MissingValue {
                    page: 4,
                    derived_name: "[PHONE]".to_string(),
                    description: String::new(),
                },
            ],
            pages_processed: 5,
            pages_modified: 3,
            ..OverlayReport::default()
        };
        assert_eq!(report.draws_on_page(4).count(), 1);
        assert_eq!(report.draws_for("LICENSEE").count(), 2);
        assert_eq!(
            report.missing_values().collect::<Vec<_>>(),
            vec!["[EMAIL]", "[PHONE]"]
        );
        assert_eq!(report.counts().get("missing_value"), Some(&2));
        assert!(!report.is_clean());
    }

    #[test]
    fn serializes_with_kind_tags() {
        let diag = OverlayDiagnostic::PageOutOfRange {
            page: 6,
            document_pages: 5,
        };
        let json = serde_json::to_value(&diag).expect("json");
        assert_eq!(json["kind"], "page_out_of_range");
        assert_eq!(json["document_pages"], 5);

        let json = serde_json::to_value(draw(1, "[END-DATE]")).expect("json");
        assert_eq!(json["cover"].as_array().map(|a| a.len()), Some(4));
    }
}
