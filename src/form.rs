//! Templates with interactive (AcroForm) fields.
//!
//! A template that carries fillable fields is filled through those fields
//! instead of being overlaid. Text and choice fields whose names resolve to a
//! value get `/V` set and are marked read-only, their stale appearance streams
//! are dropped, and the form asks viewers to regenerate appearances.

use crate::debug::DebugLogger;
use crate::error::{Result, StampError};
use crate::fields::FieldValueMap;
use crate::overlay::lookup_value;
use crate::registry::PositionRegistry;
use crate::report::{FilledField, OverlayDiagnostic, OverlayReport};
use lopdf::{Document as LoDocument, Object as LoObject, ObjectId as LoObjectId};
use serde::Serialize;
use serde_json::json;

const MAX_FIELD_DEPTH: usize = 32;
const FLAG_READ_ONLY: i64 = 1;
const FLAG_REQUIRED: i64 = 1 << 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFieldKind {
    Text,
    Button,
    Choice,
    Signature,
    Other,
}

impl FormFieldKind {
    fn from_field_type(field_type: Option<&[u8]>) -> Self {
        match field_type {
            Some(b"Tx") => FormFieldKind::Text,
            Some(b"Btn") => FormFieldKind::Button,
            Some(b"Ch") => FormFieldKind::Choice,
            Some(b"Sig") => FormFieldKind::Signature,
            _ => FormFieldKind::Other,
        }
    }

    pub fn is_fillable(&self) -> bool {
        matches!(self, FormFieldKind::Text | FormFieldKind::Choice)
    }
}

/// A terminal field of the document's form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub id: LoObjectId,
    /// Fully qualified name, parent names joined with `.`.
    pub name: String,
    /// The field's own `/T`.
    pub partial_name: String,
    pub kind: FormFieldKind,
    /// Effective `/Ff` flags, inherited from ancestors when absent.
    pub flags: i64,
}

impl FormField {
    pub fn is_read_only(&self) -> bool {
        self.flags & FLAG_READ_ONLY != 0
    }

    pub fn is_required(&self) -> bool {
        self.flags & FLAG_REQUIRED != 0
    }
}

/// What [`crate::Stamper`] does with a template that has form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormFieldPolicy {
    /// Fill matching fields and skip the coordinate overlay.
    #[default]
    Fill,
    /// Ignore the fields and overlay as for a flat template.
    Overlay,
    /// Fail with a render error.
    Reject,
}

#[derive(Debug, Clone, Default)]
struct Inherited {
    name: String,
    field_type: Option<Vec<u8>>,
    flags: i64,
}

/// Terminal fields reachable from `/Root /AcroForm /Fields`, in document
/// order. A document without a form yields an empty list.
pub fn form_fields(doc: &LoDocument) -> Result<Vec<FormField>> {
    let catalog = doc.catalog()?;
    let Ok(acro_form) = catalog.get(b"AcroForm") else {
        return Ok(Vec::new());
    };
    let acro_form = doc.dereference(acro_form)?.1.as_dict()?;
    let Ok(fields) = acro_form.get(b"Fields") else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for field in doc.dereference(fields)?.1.as_array()? {
        collect_field(doc, field, &Inherited::default(), 0, &mut out)?;
    }
    Ok(out)
}

fn collect_field(
    doc: &LoDocument,
    node: &LoObject,
    parent: &Inherited,
    depth: usize,
    out: &mut Vec<FormField>,
) -> Result<()> {
    if depth > MAX_FIELD_DEPTH {
        return Err(StampError::Render("form field tree is nested too deeply".to_string()));
    }
    let Ok(id) = node.as_reference() else {
        log::warn!("skipping form field stored inline instead of by reference");
        return Ok(());
    };
    let dict = doc.get_dictionary(id)?;
    let partial = dict
        .get(b"T")
        .ok()
        .and_then(|title| lopdf::decode_text_string(title).ok());
    let name = match &partial {
        Some(partial) if parent.name.is_empty() => partial.clone(),
        Some(partial) => format!("{}.{partial}", parent.name),
        None => parent.name.clone(),
    };
    let here = Inherited {
        name,
        field_type: dict
            .get(b"FT")
            .and_then(LoObject::as_name)
            .ok()
            .map(<[u8]>::to_vec)
            .or_else(|| parent.field_type.clone()),
        flags: dict
            .get(b"Ff")
            .and_then(LoObject::as_i64)
            .unwrap_or(parent.flags),
    };

    // Kids without `/T` are widget annotations of this field, not fields.
    let mut named_kids = Vec::new();
    if let Ok(kids) = dict.get(b"Kids") {
        for kid in doc.dereference(kids)?.1.as_array()? {
            let has_title = doc
                .dereference(kid)
                .ok()
                .and_then(|(_, kid)| kid.as_dict().ok())
                .is_some_and(|kid| kid.has(b"T"));
            if has_title {
                named_kids.push(kid);
            }
        }
    }

    if named_kids.is_empty() {
        if !here.name.is_empty() {
            out.push(FormField {
                id,
                name: here.name,
                partial_name: partial.unwrap_or_default(),
                kind: FormFieldKind::from_field_type(here.field_type.as_deref()),
                flags: here.flags,
            });
        }
        return Ok(());
    }
    for kid in named_kids {
        collect_field(doc, kid, &here, depth + 1, out)?;
    }
    Ok(())
}

pub struct FormFiller<'a> {
    registry: &'a PositionRegistry,
    debug: Option<DebugLogger>,
}

impl<'a> FormFiller<'a> {
    pub fn new(registry: &'a PositionRegistry) -> Self {
        Self {
            registry,
            debug: None,
        }
    }

    pub fn with_debug(mut self, debug: Option<DebugLogger>) -> Self {
        self.debug = debug;
        self
    }

    /// Fills every text and choice field of `doc` that has a value.
    ///
    /// Field names go through the same lookup as placeholders: as written,
    /// bare, bracketed, then aliases. A qualified name that finds nothing is
    /// retried with the field's own partial name.
    pub fn fill(&self, doc: &mut LoDocument, values: &FieldValueMap) -> Result<OverlayReport> {
        if doc.is_encrypted() {
            return Err(StampError::Render("document is encrypted".to_string()));
        }
        let fields = form_fields(doc)?;
        self.fill_fields(doc, &fields, values)
    }

    pub(crate) fn fill_fields(
        &self,
        doc: &mut LoDocument,
        fields: &[FormField],
        values: &FieldValueMap,
    ) -> Result<OverlayReport> {
        let mut report = OverlayReport {
            pages_processed: doc.get_pages().len(),
            ..OverlayReport::default()
        };
        for field in fields {
            if !field.kind.is_fillable() {
                log::debug!("form field {} ({:?}) is left as is", field.name, field.kind);
                continue;
            }
            let Some(value) = self.lookup(values, field) else {
                log::warn!("no value for form field {}", field.name);
                self.trace("form.missing_value", json!({ "field": field.name }));
                report.diagnostics.push(OverlayDiagnostic::MissingFieldValue {
                    field: field.name.clone(),
                });
                continue;
            };
            set_field_value(doc, field, value)?;
            self.trace("form.fill", json!({ "field": field.name, "value": value }));
            report.filled_fields.push(FilledField {
                name: field.name.clone(),
                value: value.to_string(),
                kind: field.kind,
            });
        }
        if !report.filled_fields.is_empty() {
            request_appearances(doc)?;
        }

        if let Some(debug) = &self.debug {
            debug.emit_summary("form.fill");
            debug.flush();
        }
        log::info!(
            "form fill complete: {} of {} fields filled, {} diagnostics",
            report.filled_fields.len(),
            fields.len(),
            report.diagnostics.len()
        );
        Ok(report)
    }

    fn lookup<'v>(&self, values: &'v FieldValueMap, field: &FormField) -> Option<&'v str> {
        [field.name.as_str(), field.partial_name.as_str()]
            .into_iter()
            .filter(|name| !name.is_empty())
            .find_map(|name| lookup_value(self.registry, values, name))
    }

    fn trace(&self, event: &str, fields: serde_json::Value) {
        if let Some(debug) = &self.debug {
            debug.log_event(event, fields);
            debug.increment(event, 1);
        }
    }
}

fn set_field_value(doc: &mut LoDocument, field: &FormField, value: &str) -> Result<()> {
    let widgets: Vec<LoObjectId> = {
        let dict = doc.get_dictionary(field.id)?;
        match dict.get(b"Kids") {
            Ok(kids) => doc
                .dereference(kids)?
                .1
                .as_array()?
                .iter()
                .filter_map(|kid| kid.as_reference().ok())
                .collect(),
            Err(_) => Vec::new(),
        }
    };

    let dict = doc.get_dictionary_mut(field.id)?;
    dict.set("V", lopdf::text_string(value));
    dict.set("Ff", field.flags | FLAG_READ_ONLY);
    dict.remove(b"AP");
    for widget in widgets {
        if let Ok(widget) = doc.get_dictionary_mut(widget) {
            widget.remove(b"AP");
        }
    }
    Ok(())
}

fn request_appearances(doc: &mut LoDocument) -> Result<()> {
    let acro_form_id = doc
        .catalog()?
        .get(b"AcroForm")
        .and_then(LoObject::as_reference)
        .ok();
    let acro_form = match acro_form_id {
        Some(id) => doc.get_dictionary_mut(id)?,
        None => doc.catalog_mut()?.get_mut(b"AcroForm")?.as_dict_mut()?,
    };
    acro_form.set("NeedAppearances", true);
    Ok(())
}
