//! Cover-and-draw overlay onto an existing PDF.
//!
//! For every configured position whose value is present, a rectangle in the
//! cover color hides the template's placeholder text and the value is drawn on
//! top of it. Pages without any drawn value are left exactly as they were.
//! Existing page content is wrapped in `q`/`Q` so whatever graphics state it
//! leaves behind cannot leak into the overlay.

use crate::debug::DebugLogger;
use crate::encoding::encode_winansi;
use crate::error::{Result, StampError};
use crate::fields::FieldValueMap;
use crate::fit;
use crate::font::{FontRef, FontRegistry};
use crate::registry::{OverlayDefaults, PageEntry, PositionRegistry, cover_rect};
use crate::report::{DrawRecord, OverlayDiagnostic, OverlayReport};
use crate::types::{Color, Pt};
use lopdf::content::{Content, Operation};
use lopdf::{
    Dictionary as LoDictionary, Document as LoDocument, Object as LoObject,
    ObjectId as LoObjectId, Stream as LoStream, dictionary,
};
use serde_json::json;
use std::collections::BTreeSet;

const FONT_RESOURCE_PREFIX: &str = "FS_F";
const MAX_INHERITANCE_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub font_name: String,
    pub text_color: Color,
    pub cover_color: Color,
}

impl OverlayStyle {
    pub fn from_defaults(defaults: &OverlayDefaults) -> Self {
        Self {
            font_name: defaults.font_name.clone(),
            text_color: defaults.color,
            cover_color: Color::WHITE,
        }
    }

    fn validate(&self) -> Result<()> {
        for (what, color) in [("text", self.text_color), ("cover", self.cover_color)] {
            if !color.is_valid() {
                return Err(StampError::Render(format!(
                    "{what} color components must be within 0..=1, got {:?}",
                    color.components()
                )));
            }
        }
        Ok(())
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::from_defaults(&OverlayDefaults::default())
    }
}

struct PlannedDraw {
    record: DrawRecord,
    bytes: Vec<u8>,
}

pub struct OverlayRenderer<'a> {
    registry: &'a PositionRegistry,
    fonts: &'a FontRegistry,
    style: OverlayStyle,
    debug: Option<DebugLogger>,
}

impl<'a> OverlayRenderer<'a> {
    pub fn new(registry: &'a PositionRegistry, fonts: &'a FontRegistry) -> Self {
        Self {
            registry,
            fonts,
            style: OverlayStyle::from_defaults(registry.defaults()),
            debug: None,
        }
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_debug(mut self, debug: Option<DebugLogger>) -> Self {
        self.debug = debug;
        self
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Draws every present value at every configured position of `doc`.
    ///
    /// Missing values and overflowing text are reported, not fatal. Errors
    /// come only from an unusable document or font.
    pub fn render(&self, doc: &mut LoDocument, values: &FieldValueMap) -> Result<OverlayReport> {
        if doc.is_encrypted() {
            return Err(StampError::Render("document is encrypted".to_string()));
        }
        self.style.validate()?;
        let font = self.fonts.require(&self.style.font_name)?;
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(StampError::Render("document has no pages".to_string()));
        }

        let mut report = OverlayReport::default();
        self.report_unreachable_pages(pages.len(), &mut report);

        let mut shared_font: Option<LoObjectId> = None;
        for (&page_number, &page_id) in &pages {
            report.pages_processed += 1;
            let draws = self.plan_page(page_number, values, &font, &mut report);
            if draws.is_empty() {
                continue;
            }
            let font_id = match shared_font {
                Some(id) => id,
                None => {
                    let id = font.add_to_document(doc)?;
                    shared_font = Some(id);
                    id
                }
            };
            let resource_name = attach_font_resource(doc, page_id, font_id)?;
            let content = self.overlay_content(&draws, &resource_name)?;
            wrap_page_contents(doc, page_id, content)?;
            report.pages_modified += 1;
            log::debug!("page {page_number}: drew {} values", draws.len());
            report.draws.extend(draws.into_iter().map(|draw| draw.record));
        }

        if let Some(debug) = &self.debug {
            debug.emit_summary("overlay.render");
            debug.flush();
        }
        log::info!(
            "overlay complete: {} values drawn on {} of {} pages, {} diagnostics",
            report.draws.len(),
            report.pages_modified,
            report.pages_processed,
            report.diagnostics.len()
        );
        Ok(report)
    }

    fn report_unreachable_pages(&self, document_pages: usize, report: &mut OverlayReport) {
        let configured: BTreeSet<u32> = self
            .registry
            .all_positions()
            .map(|(_, position)| position.page)
            .collect();
        for page in configured {
            if page as usize > document_pages {
                log::warn!(
                    "positions configured for page {page} but document has {document_pages} pages"
                );
                report.diagnostics.push(OverlayDiagnostic::PageOutOfRange {
                    page,
                    document_pages,
                });
            }
        }
    }

    fn plan_page(
        &self,
        page: u32,
        values: &FieldValueMap,
        font: &FontRef<'_>,
        report: &mut OverlayReport,
    ) -> Vec<PlannedDraw> {
        let mut out = Vec::new();
        for entry in self.registry.positions_for_page(page) {
            let Some(value) = lookup_value(self.registry, values, entry.placeholder) else {
                log::warn!(
                    "no value for {} on page {page}; leaving placeholder untouched",
                    entry.derived_name
                );
                self.trace("overlay.missing_value", page, &entry, json!({}));
                report.diagnostics.push(OverlayDiagnostic::MissingValue {
                    page,
                    derived_name: entry.derived_name.clone(),
                    description: entry.position.description.clone(),
                });
                continue;
            };

            let encoded = encode_winansi(value);
            if encoded.is_lossy() {
                log::warn!(
                    "{} on page {page}: {} characters have no WinAnsi code and print as '?'",
                    entry.derived_name,
                    encoded.replaced
                );
                self.trace(
                    "overlay.lossy_encoding",
                    page,
                    &entry,
                    json!({ "replaced": encoded.replaced }),
                );
                report.diagnostics.push(OverlayDiagnostic::LossyEncoding {
                    page,
                    derived_name: entry.derived_name.clone(),
                    replaced: encoded.replaced,
                });
            }

            let measured = fit::measure(value, entry.position, font);
            let fits = measured.fits();
            if let (false, Some(max_width)) = (fits, measured.max_width) {
                log::warn!(
                    "{} on page {page}: {:?} is {:.1}pt wide, box allows {:.1}pt",
                    entry.derived_name,
                    value,
                    measured.width.to_f32(),
                    max_width.to_f32()
                );
                self.trace(
                    "overlay.fit_warning",
                    page,
                    &entry,
                    json!({
                        "width": measured.width.to_f32(),
                        "max_width": max_width.to_f32(),
                    }),
                );
                report.diagnostics.push(OverlayDiagnostic::FitWarning {
                    page,
                    derived_name: entry.derived_name.clone(),
                    value: value.to_string(),
                    width: measured.width,
                    max_width,
                });
            }

            let covered_width = match measured.max_width {
                Some(max_width) => measured.width.min(max_width),
                None => measured.width,
            };
            let cover = cover_rect(entry.position, covered_width);
            self.trace(
                "overlay.draw",
                page,
                &entry,
                json!({
                    "value": value,
                    "x": entry.position.x,
                    "y": entry.position.y,
                    "width": measured.width.to_f32(),
                    "fits": fits,
                }),
            );
            out.push(PlannedDraw {
                record: DrawRecord {
                    page,
                    derived_name: entry.derived_name.clone(),
                    placeholder: entry.placeholder.to_string(),
                    value: value.to_string(),
                    x: entry.position.x,
                    y: entry.position.y,
                    font_size: entry.position.size,
                    cover,
                    width: measured.width,
                    fits,
                },
                bytes: encoded.bytes,
            });
        }
        out
    }

    fn trace(&self, event: &str, page: u32, entry: &PageEntry<'_>, extra: serde_json::Value) {
        let Some(debug) = &self.debug else {
            return;
        };
        let mut fields = json!({ "page": page, "name": entry.derived_name });
        if let (Some(out), serde_json::Value::Object(extra)) = (fields.as_object_mut(), extra) {
            out.extend(extra);
        }
        debug.log_event(event, fields);
        debug.increment(event, 1);
    }

    fn overlay_content(&self, draws: &[PlannedDraw], font_resource: &str) -> Result<Vec<u8>> {
        // Closes the `q` inserted in front of the original content.
        let mut operations = vec![Operation::new("Q", vec![])];
        for draw in draws {
            let cover = &draw.record.cover;
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new("rg", color_operands(self.style.cover_color)));
            operations.push(Operation::new(
                "re",
                vec![
                    pt_operand(cover.x),
                    pt_operand(cover.y),
                    pt_operand(cover.width),
                    pt_operand(cover.height),
                ],
            ));
            operations.push(Operation::new("f", vec![]));
            operations.push(Operation::new("Q", vec![]));

            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![
                    LoObject::Name(font_resource.as_bytes().to_vec()),
                    LoObject::Real(draw.record.font_size),
                ],
            ));
            operations.push(Operation::new("rg", color_operands(self.style.text_color)));
            operations.push(Operation::new(
                "Td",
                vec![LoObject::Real(draw.record.x), LoObject::Real(draw.record.y)],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![LoObject::string_literal(draw.bytes.clone())],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        // Leading newline keeps the `Q` separate from the previous stream's
        // last token when readers concatenate page contents.
        let mut bytes = b"\n".to_vec();
        bytes.extend(Content { operations }.encode()?);
        Ok(bytes)
    }
}

/// First non-blank value for `name`, trimmed. Tries the name as written, bare
/// and bracketed, then the same forms of every alias of its placeholder.
pub(crate) fn lookup_value<'v>(
    registry: &PositionRegistry,
    values: &'v FieldValueMap,
    name: &str,
) -> Option<&'v str> {
    if let Some(value) = values.get_filled(name) {
        return Some(value);
    }
    let canonical = registry.resolve(name)?;
    values
        .get_filled(canonical)
        .or_else(|| registry.aliases_of(canonical).find_map(|alias| values.get_filled(alias)))
}

fn pt_operand(value: Pt) -> LoObject {
    LoObject::Real(value.to_f32())
}

fn color_operands(color: Color) -> Vec<LoObject> {
    color
        .components()
        .into_iter()
        .map(LoObject::Real)
        .collect()
}

/// Resources in effect for a page, following `Parent` links for inherited
/// dictionaries.
fn effective_resources(doc: &LoDocument, page_id: LoObjectId) -> Result<LoDictionary> {
    let mut node_id = page_id;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        let node = doc.get_object(node_id).and_then(LoObject::as_dict)?;
        match node.get(b"Resources") {
            Ok(LoObject::Dictionary(dict)) => return Ok(dict.clone()),
            Ok(LoObject::Reference(id)) => {
                let resources = doc.get_object(*id).and_then(LoObject::as_dict).map_err(|err| {
                    StampError::Render(format!(
                        "resources {} {} of page {} {} are unusable: {err}",
                        id.0, id.1, page_id.0, page_id.1
                    ))
                })?;
                return Ok(resources.clone());
            }
            _ => {}
        }
        match node.get(b"Parent").and_then(LoObject::as_reference) {
            Ok(parent) => node_id = parent,
            Err(_) => break,
        }
    }
    Ok(LoDictionary::new())
}

/// Gives the page its own resource dictionary with `font_id` registered under
/// a name not already in use, and returns that name.
fn attach_font_resource(
    doc: &mut LoDocument,
    page_id: LoObjectId,
    font_id: LoObjectId,
) -> Result<String> {
    let mut resources = effective_resources(doc, page_id)?;
    let mut fonts = match resources.get(b"Font") {
        Ok(LoObject::Dictionary(dict)) => dict.clone(),
        Ok(LoObject::Reference(id)) => doc
            .get_object(*id)
            .and_then(LoObject::as_dict)
            .map_err(|err| {
                StampError::Render(format!(
                    "font resources {} {} of page {} {} are unusable: {err}",
                    id.0, id.1, page_id.0, page_id.1
                ))
            })?
            .clone(),
        Ok(other) => {
            return Err(StampError::Render(format!(
                "font resources of page {} {} are a {}, not a dictionary",
                page_id.0,
                page_id.1,
                other.enum_variant()
            )));
        }
        Err(_) => LoDictionary::new(),
    };
    let mut index = 1usize;
    let name = loop {
        let candidate = format!("{FONT_RESOURCE_PREFIX}{index}");
        if !fonts.has(candidate.as_bytes()) {
            break candidate;
        }
        index += 1;
    };
    fonts.set(name.as_bytes().to_vec(), LoObject::Reference(font_id));
    resources.set("Font", LoObject::Dictionary(fonts));

    let page = doc
        .get_object_mut(page_id)
        .and_then(LoObject::as_dict_mut)?;
    page.set("Resources", LoObject::Dictionary(resources));
    Ok(name)
}

/// `[q-stream, original..., overlay]`, so the original content runs in its own
/// saved graphics state.
fn wrap_page_contents(doc: &mut LoDocument, page_id: LoObjectId, overlay: Vec<u8>) -> Result<()> {
    let existing: Vec<LoObject> = {
        let page = doc.get_object(page_id).and_then(LoObject::as_dict)?;
        match page.get(b"Contents") {
            Ok(LoObject::Reference(id)) => match doc.get_object(*id) {
                Ok(LoObject::Array(items)) => items.clone(),
                _ => vec![LoObject::Reference(*id)],
            },
            Ok(LoObject::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    };
    let save_id = doc.add_object(LoStream::new(dictionary! {}, b"q\n".to_vec()));
    let overlay_id = doc.add_object(LoStream::new(dictionary! {}, overlay));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(LoObject::Reference(save_id));
    contents.extend(existing);
    contents.push(LoObject::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(LoObject::as_dict_mut)?;
    page.set("Contents", LoObject::Array(contents));
    Ok(())
}
