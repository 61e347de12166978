//! Placeholder position table.
//!
//! A placeholder names one logical document value and owns one or more
//! [`Position`]s. Names are canonicalized by stripping surrounding square
//! brackets, so `[LICENSEE]` and `LICENSEE` address the same entry. Alternative
//! spellings live in a separate alias table and never duplicate position data.

use crate::error::{Result, StampError};
use crate::types::{Color, Pt, Rect, Size};
use serde::Deserialize;
use std::collections::BTreeMap;

const BUILTIN_CA66_JSON: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/config/ca66_positions.json"
));

/// Padding drawn around the text box by the cover rectangle, in points.
pub const COVER_PADDING: f32 = 2.0;

/// One physical anchor for a placeholder value, in PDF points from the page's
/// bottom-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub page: u32,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub max_width: Option<f32>,
    pub description: String,
}

impl Position {
    pub fn new(page: u32, x: f32, y: f32, size: f32) -> Self {
        Self {
            page,
            x,
            y,
            size,
            max_width: None,
            description: String::new(),
        }
    }

    /// Builds a position from a measurement taken in a top-left-origin tool.
    pub fn from_top_left(page: u32, x: f32, y_from_top: f32, page_height: f32, size: f32) -> Self {
        Self::new(page, x, page_height - y_from_top, size)
    }

    pub fn with_max_width(mut self, max_width: f32) -> Self {
        self.max_width = Some(max_width);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Largest area the cover rectangle can take for this position. `None`
    /// when no width constraint is declared.
    pub fn cover_region(&self) -> Option<Rect> {
        let max_width = self.max_width?;
        Some(cover_rect(self, Pt::from_f32(max_width)))
    }
}

/// Cover rectangle for a value of the given drawn width at `position`.
pub(crate) fn cover_rect(position: &Position, text_width: Pt) -> Rect {
    let pad = Pt::from_f32(COVER_PADDING);
    Rect {
        x: Pt::from_f32(position.x) - pad,
        y: Pt::from_f32(position.y) - pad,
        width: text_width + pad * 2,
        height: Pt::from_f32(position.size) + pad * 2,
    }
}

/// A position scheduled for one page, tagged with its per-occurrence name.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry<'a> {
    pub derived_name: String,
    pub placeholder: &'a str,
    pub occurrence: usize,
    pub position: &'a Position,
}

/// Fallback rendering settings declared alongside the table.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayDefaults {
    pub font_name: String,
    pub font_size: f32,
    pub color: Color,
}

impl Default for OverlayDefaults {
    fn default() -> Self {
        Self {
            font_name: "Helvetica".to_string(),
            font_size: 11.0,
            color: Color::BLACK,
        }
    }
}

#[derive(Debug, Clone)]
struct PlaceholderEntry {
    key: String,
    positions: Vec<Position>,
}

#[derive(Debug, Clone)]
pub struct PositionRegistry {
    entries: BTreeMap<String, PlaceholderEntry>,
    aliases: BTreeMap<String, String>,
    defaults: OverlayDefaults,
    page_size: Size,
}

/// Strips whitespace and one pair of surrounding square brackets. A name with
/// an unbalanced bracket is kept as written.
pub fn canonical_name(name: &str) -> &str {
    let name = name.trim();
    name.strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(name)
        .trim()
}

impl PositionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The position table for the CA-66 airport license agreement template.
    pub fn ca66() -> Result<Self> {
        Self::from_json_str(BUILTIN_CA66_JSON)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawTable = serde_json::from_str(json)?;
        raw.into_builder()?.build()
    }

    pub fn from_json_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Canonical placeholder for a name or alias.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let name = canonical_name(name);
        if let Some((canonical, _)) = self.entries.get_key_value(name) {
            return Some(canonical.as_str());
        }
        let target = self.aliases.get(name)?;
        self.entries.get_key_value(target.as_str()).map(|(k, _)| k.as_str())
    }

    /// Positions configured for `name`. Unknown names yield an empty slice.
    pub fn positions(&self, name: &str) -> &[Position] {
        self.resolve(name)
            .and_then(|canonical| self.entries.get(canonical))
            .map(|entry| entry.positions.as_slice())
            .unwrap_or(&[])
    }

    /// Every position whose page is `page`, in placeholder then occurrence
    /// order.
    pub fn positions_for_page(&self, page: u32) -> Vec<PageEntry<'_>> {
        let mut out = Vec::new();
        for entry in self.entries.values() {
            let multi = entry.positions.len() > 1;
            for (idx, position) in entry.positions.iter().enumerate() {
                if position.page != page {
                    continue;
                }
                let derived_name = if multi {
                    format!("{}_{}", entry.key, idx + 1)
                } else {
                    entry.key.clone()
                };
                out.push(PageEntry {
                    derived_name,
                    placeholder: entry.key.as_str(),
                    occurrence: idx,
                    position,
                });
            }
        }
        out
    }

    /// Aliases that route to the canonical form of `placeholder`.
    pub fn aliases_of<'a>(&'a self, placeholder: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let canonical = canonical_name(placeholder);
        self.aliases
            .iter()
            .filter(move |(_, target)| target.as_str() == canonical)
            .map(|(alias, _)| alias.as_str())
    }

    /// Configured keys, as written in the table.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|entry| entry.key.as_str())
    }

    pub fn all_positions(&self) -> impl Iterator<Item = (&str, &Position)> {
        self.entries.values().flat_map(|entry| {
            entry
                .positions
                .iter()
                .map(move |position| (entry.key.as_str(), position))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest page any position refers to.
    pub fn page_count_hint(&self) -> u32 {
        self.all_positions()
            .map(|(_, position)| position.page)
            .max()
            .unwrap_or(0)
    }

    pub fn defaults(&self) -> &OverlayDefaults {
        &self.defaults
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    /// Pairs of derived names whose cover regions intersect on the same page.
    pub fn overlapping_regions(&self) -> Vec<(u32, String, String)> {
        let mut out = Vec::new();
        for page in 1..=self.page_count_hint() {
            let regions: Vec<(String, Rect)> = self
                .positions_for_page(page)
                .into_iter()
                .filter_map(|entry| {
                    entry
                        .position
                        .cover_region()
                        .map(|rect| (entry.derived_name, rect))
                })
                .collect();
            for (i, (a_name, a_rect)) in regions.iter().enumerate() {
                for (b_name, b_rect) in &regions[i + 1..] {
                    if a_rect.intersects(b_rect) {
                        out.push((page, a_name.clone(), b_name.clone()));
                    }
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    placeholders: Vec<(String, Vec<Position>)>,
    aliases: Vec<(String, String)>,
    defaults: OverlayDefaults,
    page_size: Size,
    reject_overlaps: bool,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            placeholders: Vec::new(),
            aliases: Vec::new(),
            defaults: OverlayDefaults::default(),
            page_size: Size::letter(),
            reject_overlaps: false,
        }
    }
}

impl RegistryBuilder {
    pub fn placeholder(mut self, key: impl Into<String>, positions: Vec<Position>) -> Self {
        self.placeholders.push((key.into(), positions));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), target.into()));
        self
    }

    pub fn defaults(mut self, defaults: OverlayDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn page_size(mut self, page_size: Size) -> Self {
        self.page_size = page_size;
        self
    }

    /// Makes intersecting cover regions a load error instead of a warning.
    pub fn reject_overlaps(mut self, reject: bool) -> Self {
        self.reject_overlaps = reject;
        self
    }

    pub fn build(self) -> Result<PositionRegistry> {
        validate_defaults(&self.defaults)?;
        let page_width = self.page_size.width.to_f32();
        let page_height = self.page_size.height.to_f32();
        if !(page_width > 0.0 && page_height > 0.0) {
            return Err(config_err("page size must be positive".to_string()));
        }

        let mut entries: BTreeMap<String, PlaceholderEntry> = BTreeMap::new();
        for (key, positions) in self.placeholders {
            let canonical = canonical_name(&key).to_string();
            if canonical.is_empty() {
                return Err(config_err(format!("placeholder name is empty: {key:?}")));
            }
            if positions.is_empty() {
                return Err(config_err(format!("placeholder {key} has no positions")));
            }
            for (idx, position) in positions.iter().enumerate() {
                validate_position(&key, idx, position, page_width, page_height)?;
            }
            if entries.contains_key(&canonical) {
                return Err(config_err(format!("duplicate placeholder: {key}")));
            }
            entries.insert(canonical, PlaceholderEntry { key, positions });
        }

        let mut aliases = BTreeMap::new();
        for (alias, target) in self.aliases {
            let alias_name = canonical_name(&alias).to_string();
            let target_name = canonical_name(&target).to_string();
            if alias_name.is_empty() {
                return Err(config_err(format!("alias name is empty: {alias:?}")));
            }
            if entries.contains_key(&alias_name) {
                return Err(config_err(format!(
                    "alias {alias} collides with a placeholder of the same name"
                )));
            }
            if !entries.contains_key(&target_name) {
                return Err(config_err(format!(
                    "alias {alias} points at unknown placeholder {target}"
                )));
            }
            if aliases.insert(alias_name, target_name).is_some() {
                return Err(config_err(format!("duplicate alias: {alias}")));
            }
        }

        let registry = PositionRegistry {
            entries,
            aliases,
            defaults: self.defaults,
            page_size: self.page_size,
        };

        let overlaps = registry.overlapping_regions();
        if let Some((page, a, b)) = overlaps.first() {
            if self.reject_overlaps {
                return Err(config_err(format!(
                    "cover regions of {a} and {b} overlap on page {page}"
                )));
            }
            for (page, a, b) in &overlaps {
                log::warn!("cover regions of {a} and {b} overlap on page {page}");
            }
        }

        log::debug!(
            "loaded position registry: {} placeholders, {} aliases, {} pages",
            registry.entries.len(),
            registry.aliases.len(),
            registry.page_count_hint()
        );
        Ok(registry)
    }
}

fn config_err(message: String) -> StampError {
    StampError::Configuration(message)
}

fn validate_defaults(defaults: &OverlayDefaults) -> Result<()> {
    if defaults.font_name.trim().is_empty() {
        return Err(config_err("default font name is empty".to_string()));
    }
    if !(defaults.font_size.is_finite() && defaults.font_size > 0.0) {
        return Err(config_err(format!(
            "default font size must be positive, got {}",
            defaults.font_size
        )));
    }
    if !defaults.color.is_valid() {
        return Err(config_err(format!(
            "default color components must be within 0..=1, got {:?}",
            defaults.color.components()
        )));
    }
    Ok(())
}

fn validate_position(
    key: &str,
    idx: usize,
    position: &Position,
    page_width: f32,
    page_height: f32,
) -> Result<()> {
    let at = format!("{key} position {}", idx + 1);
    if position.page == 0 {
        return Err(config_err(format!("{at}: page numbers start at 1")));
    }
    if !(position.x.is_finite() && position.y.is_finite()) {
        return Err(config_err(format!("{at}: coordinates must be finite")));
    }
    if !(position.size.is_finite() && position.size > 0.0) {
        return Err(config_err(format!(
            "{at}: size must be positive, got {}",
            position.size
        )));
    }
    if let Some(max_width) = position.max_width {
        if !(max_width.is_finite() && max_width > 0.0) {
            return Err(config_err(format!(
                "{at}: max_width must be positive, got {max_width}"
            )));
        }
    }
    if position.x < 0.0 || position.x > page_width || position.y < 0.0 || position.y > page_height
    {
        return Err(config_err(format!(
            "{at}: ({}, {}) lies outside the {page_width}x{page_height} page",
            position.x, position.y
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RawTable {
    #[serde(default = "default_page_width", alias = "pageWidth")]
    page_width: f32,
    #[serde(default = "default_page_height", alias = "pageHeight")]
    page_height: f32,
    #[serde(default, alias = "defaultFont")]
    default_font: Option<String>,
    #[serde(default, alias = "defaultFontSize")]
    default_font_size: Option<f32>,
    #[serde(default, alias = "defaultColor")]
    default_color: Option<[f32; 3]>,
    placeholders: BTreeMap<String, RawPlacement>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPlacement {
    One(RawPosition),
    Many(Vec<RawPosition>),
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    page: Option<u32>,
    x: f32,
    y: f32,
    size: Option<f32>,
    #[serde(default, alias = "maxWidth")]
    max_width: Option<f32>,
    #[serde(default)]
    description: String,
}

fn default_page_width() -> f32 {
    612.0
}

fn default_page_height() -> f32 {
    792.0
}

impl RawTable {
    fn into_builder(self) -> Result<RegistryBuilder> {
        let base = OverlayDefaults::default();
        let defaults = OverlayDefaults {
            font_name: self.default_font.unwrap_or(base.font_name),
            font_size: self.default_font_size.unwrap_or(base.font_size),
            color: self
                .default_color
                .map(|[r, g, b]| Color::rgb(r, g, b))
                .unwrap_or(base.color),
        };
        let mut builder = PositionRegistry::builder()
            .page_size(Size::new(self.page_width, self.page_height))
            .defaults(defaults.clone());
        for (key, placement) in self.placeholders {
            let raw_positions = match placement {
                RawPlacement::One(position) => vec![position],
                RawPlacement::Many(positions) => positions,
            };
            let mut positions = Vec::with_capacity(raw_positions.len());
            for (idx, raw) in raw_positions.into_iter().enumerate() {
                let Some(page) = raw.page else {
                    return Err(config_err(format!(
                        "{key} position {}: missing page",
                        idx + 1
                    )));
                };
                positions.push(Position {
                    page,
                    x: raw.x,
                    y: raw.y,
                    size: raw.size.unwrap_or(defaults.font_size),
                    max_width: raw.max_width,
                    description: raw.description,
                });
            }
            builder = builder.placeholder(key, positions);
        }
        for (alias, target) in self.aliases {
            builder = builder.alias(alias, target);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_date_registry() -> PositionRegistry {
        PositionRegistry::builder()
            .placeholder(
                "[START-DATE]",
                vec![
                    Position::new(1, 345.0, 688.0, 11.0).with_max_width(15.0),
                    Position::new(1, 180.0, 146.0, 11.0).with_max_width(15.0),
                ],
            )
            .placeholder(
                "[EMAIL]",
                vec![Position::new(4, 350.0, 386.0, 11.0).with_max_width(250.0)],
            )
            .alias("Start Date", "START-DATE")
            .build()
            .expect("registry")
    }

    #[test]
    fn lookup_accepts_bracketed_bare_and_alias_names() {
        let registry = start_date_registry();
        assert_eq!(registry.positions("[START-DATE]").len(), 2);
        assert_eq!(registry.positions("START-DATE").len(), 2);
        assert_eq!(registry.positions("Start Date").len(), 2);
        assert_eq!(registry.resolve("[Start Date]"), Some("START-DATE"));
    }

    #[test]
    fn unknown_placeholder_yields_no_positions() {
        let registry = start_date_registry();
        assert!(registry.positions("[NOPE]").is_empty());
        assert_eq!(registry.resolve("NOPE"), None);
    }

    #[test]
    fn multi_position_placeholders_get_occurrence_names() {
        let registry = start_date_registry();
        let page_one = registry.positions_for_page(1);
        let names: Vec<&str> = page_one.iter().map(|e| e.derived_name.as_str()).collect();
        assert_eq!(names, vec!["[START-DATE]_1", "[START-DATE]_2"]);
        assert!(page_one.iter().all(|e| e.placeholder == "[START-DATE]"));

        let page_four = registry.positions_for_page(4);
        assert_eq!(page_four.len(), 1);
        assert_eq!(page_four[0].derived_name, "[EMAIL]");
    }

    #[test]
    fn page_partition_covers_every_position_exactly_once() {
        let registry = PositionRegistry::ca66().expect("ca66");
        let total = registry.all_positions().count();
        let mut seen = 0;
        for page in 1..=registry.page_count_hint() + 1 {
            for entry in registry.positions_for_page(page) {
                assert_eq!(entry.position.page, page);
                seen += 1;
            }
        }
        assert_eq!(seen, total);

        let mut derived: Vec<String> = (1..=registry.page_count_hint())
            .flat_map(|p| registry.positions_for_page(p))
            .map(|e| e.derived_name)
            .collect();
        derived.sort();
        derived.dedup();
        assert_eq!(derived.len(), total);
    }

    #[test]
    fn configured_values_are_returned_unchanged() {
        let json = r#"{
            "placeholders": {
                "[EMAIL]": { "page": 4, "x": 350.5, "y": 386.25, "size": 11, "maxWidth": 250 }
            }
        }"#;
        let registry = PositionRegistry::from_json_str(json).expect("registry");
        let position = &registry.positions("EMAIL")[0];
        assert_eq!(position.page, 4);
        assert_eq!(position.x, 350.5);
        assert_eq!(position.y, 386.25);
        assert_eq!(position.size, 11.0);
        assert_eq!(position.max_width, Some(250.0));
    }

    #[test]
    fn missing_size_takes_table_default() {
        let json = r#"{
            "default_font_size": 9,
            "placeholders": { "PHONE": { "page": 2, "x": 10, "y": 10 } }
        }"#;
        let registry = PositionRegistry::from_json_str(json).expect("registry");
        assert_eq!(registry.positions("PHONE")[0].size, 9.0);
        assert_eq!(registry.positions("PHONE")[0].max_width, None);
    }

    #[test]
    fn malformed_entries_fail_at_load() {
        let missing_page = r#"{ "placeholders": { "A": { "x": 1, "y": 1, "size": 10 } } }"#;
        let err = PositionRegistry::from_json_str(missing_page).expect_err("missing page");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("missing page"));

        let negative = r#"{ "placeholders": { "A": { "page": 1, "x": 1, "y": 1, "size": -3 } } }"#;
        let err = PositionRegistry::from_json_str(negative).expect_err("negative size");
        assert!(err.to_string().contains("size must be positive"));

        let zero_page = r#"{ "placeholders": { "A": { "page": 0, "x": 1, "y": 1, "size": 3 } } }"#;
        let err = PositionRegistry::from_json_str(zero_page).expect_err("page 0");
        assert!(err.to_string().contains("page numbers start at 1"));

        let off_page = r#"{ "placeholders": { "A": { "page": 1, "x": 700, "y": 1, "size": 3 } } }"#;
        let err = PositionRegistry::from_json_str(off_page).expect_err("off page");
        assert!(err.to_string().contains("outside"));
    }

    #[test]
    fn duplicate_canonical_names_are_rejected() {
        let err = PositionRegistry::builder()
            .placeholder("[A]", vec![Position::new(1, 1.0, 1.0, 10.0)])
            .placeholder("A", vec![Position::new(2, 1.0, 1.0, 10.0)])
            .build()
            .expect_err("duplicate");
        assert!(err.to_string().contains("duplicate placeholder"));
    }

    #[test]
    fn alias_rules_are_enforced() {
        let base = || {
            PositionRegistry::builder()
                .placeholder("[A]", vec![Position::new(1, 1.0, 1.0, 10.0)])
                .placeholder("[B]", vec![Position::new(1, 100.0, 100.0, 10.0)])
        };
        let err = base().alias("X", "MISSING").build().expect_err("unknown target");
        assert!(err.to_string().contains("unknown placeholder"));
        let err = base().alias("B", "A").build().expect_err("collision");
        assert!(err.to_string().contains("collides"));
        let registry = base().alias("Alpha", "[A]").build().expect("ok");
        assert_eq!(registry.aliases_of("[A]").collect::<Vec<_>>(), vec!["Alpha"]);
    }

    #[test]
    fn overlapping_regions_warn_by_default_and_fail_when_strict() {
        let positions = || {
            PositionRegistry::builder()
                .placeholder("[A]", vec![Position::new(1, 100.0, 100.0, 10.0).with_max_width(50.0)])
                .placeholder("[B]", vec![Position::new(1, 120.0, 105.0, 10.0).with_max_width(50.0)])
        };
        let registry = positions().build().expect("lenient");
        assert_eq!(
            registry.overlapping_regions(),
            vec![(1, "[A]".to_string(), "[B]".to_string())]
        );
        let err = positions().reject_overlaps(true).build().expect_err("strict");
        assert!(err.to_string().contains("overlap on page 1"));
    }

    #[test]
    fn builtin_table_loads_with_expected_shape() {
        let registry = PositionRegistry::ca66().expect("ca66");
        assert_eq!(registry.positions("LICENSEE").len(), 3);
        assert_eq!(registry.positions("[START-DATE]").len(), 2);
        assert_eq!(registry.page_count_hint(), 5);
        assert_eq!(registry.resolve("Insurer"), Some("INSURANCE-COMPANY"));
        assert_eq!(registry.defaults().font_name, "Helvetica");
        assert_eq!(registry.defaults().color, Color::BLACK);
        let pages: Vec<u32> = registry
            .positions("LICENSEE")
            .iter()
            .map(|p| p.page)
            .collect();
        assert_eq!(pages, vec![3, 4, 5]);
    }

    #[test]
    fn canonical_name_strips_a_single_bracket_pair() {
        assert_eq!(canonical_name(" [LICENSEE] "), "LICENSEE");
        assert_eq!(canonical_name("LICENSEE"), "LICENSEE");
        assert_eq!(canonical_name("[ EMAIL ]"), "EMAIL");
        assert_eq!(canonical_name("[[A]]"), "[A]");
        assert_eq!(canonical_name("[A"), "[A");
        assert_eq!(canonical_name("A]"), "A]");
    }

    #[test]
    fn top_left_measurements_convert_to_pdf_space() {
        let position = Position::from_top_left(1, 72.0, 100.0, 792.0, 10.0);
        assert_eq!(position.y, 692.0);
    }
}
