mod debug;
mod encoding;
mod error;
mod fields;
mod fit;
mod font;
mod form;
mod overlay;
mod registry;
mod report;
mod template;
#[cfg(test)]
mod test_support;
mod types;

pub use debug::DebugLogger;
pub use encoding::{WinAnsiText, encode_winansi};
pub use error::{Result, StampError};
pub use fields::{
    AgreementForm, CoverageAmount, FieldValueMap, format_display_date, format_usd_whole,
    resolve_field_values,
};
pub use fit::{FitMeasurement, fits, measure};
pub use font::{FontRef, FontRegistry, StandardFont, TextMeasure};
pub use form::{FormField, FormFieldKind, FormFieldPolicy, FormFiller, form_fields};
pub use overlay::{OverlayRenderer, OverlayStyle};
pub use registry::{
    COVER_PADDING, OverlayDefaults, PageEntry, Position, PositionRegistry, RegistryBuilder,
    canonical_name,
};
pub use report::{DrawRecord, FilledField, OverlayDiagnostic, OverlayReport};
pub use template::{
    TemplateAsset, TemplateInspection, TemplateIssue, inspect_template_bytes,
    inspect_template_path, sha256_hex,
};
pub use types::{Color, Pt, Rect, Size};

use lopdf::Document as LoDocument;
use std::path::PathBuf;
use std::sync::Arc;

/// Overlay engine bound to one position table and font set.
///
/// Each call to [`Stamper::generate`] is independent: the template bytes go
/// in, the filled document comes out, and nothing is retained between calls.
#[derive(Clone)]
pub struct Stamper {
    registry: Arc<PositionRegistry>,
    fonts: Arc<FontRegistry>,
    style: OverlayStyle,
    form_policy: FormFieldPolicy,
    compress: bool,
    debug: Option<DebugLogger>,
}

pub struct StamperBuilder {
    registry: Option<PositionRegistry>,
    font_dirs: Vec<PathBuf>,
    font_files: Vec<PathBuf>,
    font_name: Option<String>,
    text_color: Option<Color>,
    cover_color: Option<Color>,
    form_policy: FormFieldPolicy,
    compress: bool,
    debug_path: Option<PathBuf>,
}

impl Default for StamperBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StamperBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            font_dirs: Vec::new(),
            font_files: Vec::new(),
            font_name: None,
            text_color: None,
            cover_color: None,
            form_policy: FormFieldPolicy::default(),
            compress: true,
            debug_path: None,
        }
    }

    /// Position table to draw with. Defaults to the built-in CA-66 table.
    pub fn registry(mut self, registry: PositionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn register_font_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(path.into());
        self
    }

    pub fn register_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_files.push(path.into());
        self
    }

    /// Overrides the table's default font. Standard names (`Helvetica`,
    /// `Helvetica-Bold`, `Courier`) or the family name of a registered font.
    pub fn font(mut self, name: impl Into<String>) -> Self {
        self.font_name = Some(name.into());
        self
    }

    pub fn text_color(mut self, color: Color) -> Self {
        self.text_color = Some(color);
        self
    }

    pub fn cover_color(mut self, color: Color) -> Self {
        self.cover_color = Some(color);
        self
    }

    /// How templates with interactive form fields are handled. Defaults to
    /// filling the fields.
    pub fn form_fields(mut self, policy: FormFieldPolicy) -> Self {
        self.form_policy = policy;
        self
    }

    // Compress content streams on save. Turning this off keeps overlay
    // operators readable when inspecting output by hand.
    pub fn compress(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    // Write a JSONL trace of every draw and skip decision.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Stamper> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => PositionRegistry::ca66()?,
        };
        let mut fonts = FontRegistry::new();
        for dir in &self.font_dirs {
            fonts.register_dir(dir)?;
        }
        for file in &self.font_files {
            fonts.register_file(file)?;
        }

        let mut style = OverlayStyle::from_defaults(registry.defaults());
        if let Some(name) = self.font_name {
            style.font_name = name;
        }
        if let Some(color) = self.text_color {
            style.text_color = color;
        }
        if let Some(color) = self.cover_color {
            style.cover_color = color;
        }

        let debug = match self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        Ok(Stamper {
            registry: Arc::new(registry),
            fonts: Arc::new(fonts),
            style,
            form_policy: self.form_policy,
            compress: self.compress,
            debug,
        })
    }
}

impl Stamper {
    pub fn builder() -> StamperBuilder {
        StamperBuilder::new()
    }

    pub fn registry(&self) -> &PositionRegistry {
        &self.registry
    }

    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    pub fn renderer(&self) -> OverlayRenderer<'_> {
        OverlayRenderer::new(&self.registry, &self.fonts)
            .with_style(self.style.clone())
            .with_debug(self.debug.clone())
    }

    pub fn form_filler(&self) -> FormFiller<'_> {
        FormFiller::new(&self.registry).with_debug(self.debug.clone())
    }

    /// Writes `values` into an already loaded document: through its form
    /// fields when it has any (per the form field policy), otherwise by
    /// overlay.
    pub fn render_document(
        &self,
        doc: &mut LoDocument,
        values: &FieldValueMap,
    ) -> Result<OverlayReport> {
        if self.form_policy != FormFieldPolicy::Overlay && !doc.is_encrypted() {
            let fields = form_fields(doc)?;
            if !fields.is_empty() {
                if self.form_policy == FormFieldPolicy::Reject {
                    return Err(StampError::Render(format!(
                        "template has {} interactive form fields",
                        fields.len()
                    )));
                }
                log::debug!("template has {} form fields; filling them", fields.len());
                return self.form_filler().fill_fields(doc, &fields, values);
            }
        }
        self.renderer().render(doc, values)
    }

    /// Loads `template`, overlays `values` and returns the serialized result.
    pub fn generate(
        &self,
        template: &[u8],
        values: &FieldValueMap,
    ) -> Result<(Vec<u8>, OverlayReport)> {
        let mut doc = LoDocument::load_mem(template)
            .map_err(|err| StampError::Render(format!("unreadable source document: {err}")))?;
        let report = self.render_document(&mut doc, values)?;
        if self.compress {
            doc.compress();
        }
        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        log::debug!("generated {} bytes", out.len());
        Ok((out, report))
    }

    /// Like [`Stamper::generate`], reading and verifying a pinned template
    /// first.
    pub fn generate_from_asset(
        &self,
        asset: &TemplateAsset,
        values: &FieldValueMap,
    ) -> Result<(Vec<u8>, OverlayReport)> {
        let template = asset.load()?;
        self.generate(&template, values)
    }
}
