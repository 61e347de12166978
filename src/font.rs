use crate::encoding::{FIRST_CODE, LAST_CODE, char_for_code, encode_winansi};
use crate::error::{Result, StampError};
use crate::types::Pt;
use lopdf::{Document as LoDocument, Object as LoObject, ObjectId as LoObjectId, Stream as LoStream, dictionary};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

// AFM advance widths for codes 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, //
    278, 278, 584, 584, 584, 556, 1015, //
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, //
    278, 278, 278, 469, 556, 333, //
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, //
    334, 260, 334, 584,
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, //
    333, 333, 584, 584, 584, 611, 975, //
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, //
    333, 278, 333, 584, 556, 333, //
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389,
    556, 333, 611, 556, 778, 556, 556, 500, //
    389, 280, 389, 584,
];

/// Built-in PDF fonts that need no embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    Courier,
}

impl StandardFont {
    pub fn from_name(name: &str) -> Option<Self> {
        match normalize_name(name).as_str() {
            "helvetica" | "arial" => Some(StandardFont::Helvetica),
            "helvetica-bold" | "helveticabold" | "arial-bold" => Some(StandardFont::HelveticaBold),
            "courier" => Some(StandardFont::Courier),
            _ => None,
        }
    }

    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::Courier => "Courier",
        }
    }

    fn default_width(&self) -> u16 {
        match self {
            StandardFont::Courier => 600,
            _ => 556,
        }
    }

    fn advance_for_code(&self, code: u8) -> u16 {
        let table = match self {
            StandardFont::Courier => return 600,
            StandardFont::Helvetica => &HELVETICA_WIDTHS,
            StandardFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        let ascii = match code {
            32..=126 => code,
            _ => match char_for_code(code).and_then(fold_latin1) {
                Some(base) => base as u8,
                None => return self.default_width(),
            },
        };
        table[(ascii - 32) as usize]
    }
}

// Accented Latin-1 letters share the advance of their base letter in the
// standard fonts closely enough for cover sizing.
fn fold_latin1(ch: char) -> Option<char> {
    let base = match ch {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ñ' => 'N',
        'Ò'..='Ö' | 'Ø' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' => 'Y',
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ì'..='ï' => 'i',
        'ñ' => 'n',
        'ò'..='ö' | 'ø' => 'o',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => return None,
    };
    Some(base)
}

/// Width of a string at a point size, as the overlay will paint it.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: Pt) -> Pt;
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct TextWidthKey {
    font: FontSlot,
    size_milli: i64,
    text: String,
}

#[derive(Debug)]
struct TextWidthCache {
    map: HashMap<TextWidthKey, Pt>,
    order: VecDeque<TextWidthKey>,
    max_entries: usize,
}

impl TextWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&self, key: &TextWidthKey) -> Option<Pt> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: TextWidthKey, value: Pt) {
        if self.map.contains_key(&key) {
            return;
        }
        self.map.insert(key.clone(), value);
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            } else {
                break;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum FontSlot {
    Standard(StandardFont),
    Registered(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FontProgramKind {
    TrueType,
    OpenTypeCff,
}

#[derive(Debug)]
pub(crate) struct RegisteredFont {
    pub(crate) name: String,
    pub(crate) data: Vec<u8>,
    pub(crate) metrics: FontMetrics,
    pub(crate) program_kind: FontProgramKind,
}

#[derive(Debug)]
pub(crate) struct FontMetrics {
    pub(crate) widths: Vec<u16>,
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) cap_height: i16,
    pub(crate) italic_angle: i16,
    pub(crate) stem_v: i16,
    pub(crate) bbox: (i16, i16, i16, i16),
    pub(crate) missing_width: u16,
    pub(crate) is_fixed_pitch: bool,
}

/// Fonts available to the overlay: the standard PDF fonts plus any
/// TrueType/OpenType programs registered at startup.
#[derive(Debug)]
pub struct FontRegistry {
    fonts: Vec<RegisteredFont>,
    lookup: HashMap<String, usize>,
    text_width_cache: Mutex<TextWidthCache>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        Self {
            fonts: Vec::new(),
            lookup: HashMap::new(),
            text_width_cache: Mutex::new(TextWidthCache::new(4_096)),
        }
    }

    /// Registers every `.ttf`/`.otf` file in `path`. Unreadable files are
    /// logged and skipped.
    pub fn register_dir(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(path.as_ref())?.flatten() {
            let path = entry.path();
            if !path.is_file() || !has_font_extension(&path) {
                continue;
            }
            match self.register_file(&path) {
                Ok(_) => count += 1,
                Err(err) => log::warn!("skipping font {}: {err}", path.display()),
            }
        }
        Ok(count)
    }

    pub fn register_file(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        if !has_font_extension(path) {
            return Err(StampError::Render(format!(
                "unsupported font file extension: {}",
                path.display()
            )));
        }
        let data = fs::read(path)?;
        let source = path.to_string_lossy().into_owned();
        self.register_bytes(data, Some(&source))
    }

    /// Registers a font program held in memory and returns its primary name.
    pub fn register_bytes(&mut self, data: Vec<u8>, source_name: Option<&str>) -> Result<String> {
        let source = source_name.unwrap_or("EmbeddedFont");
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|err| StampError::Render(format!("invalid font data for {source}: {err}")))?;

        let (name, aliases) = font_names(&face, Path::new(source));
        let (metrics, program_kind) = FontMetrics::from_face(&face);
        drop(face);

        let index = self.fonts.len();
        self.fonts.push(RegisteredFont {
            name: name.clone(),
            data,
            metrics,
            program_kind,
        });

        let mut all_aliases = Vec::new();
        all_aliases.push(name.clone());
        all_aliases.extend(aliases);
        for alias in all_aliases {
            let key = normalize_name(&alias);
            if key.is_empty() || self.lookup.contains_key(&key) {
                continue;
            }
            self.lookup.insert(key, index);
        }
        log::debug!("registered font {name} from {source}");
        Ok(name)
    }

    /// Registered fonts win over standard fonts of the same name.
    pub fn resolve(&self, name: &str) -> Option<FontRef<'_>> {
        let key = normalize_name(name);
        let slot = match self.lookup.get(&key) {
            Some(index) => FontSlot::Registered(*index),
            None => FontSlot::Standard(StandardFont::from_name(name)?),
        };
        Some(FontRef {
            registry: self,
            slot,
        })
    }

    pub fn require(&self, name: &str) -> Result<FontRef<'_>> {
        self.resolve(name).ok_or_else(|| {
            StampError::Render(format!(
                "font {name:?} is neither a standard PDF font nor registered"
            ))
        })
    }

    fn measure(&self, slot: FontSlot, font_size: Pt, text: &str) -> Pt {
        let cache_key = TextWidthKey {
            font: slot,
            size_milli: font_size.to_milli_i64(),
            text: text.to_string(),
        };
        if let Ok(cache) = self.text_width_cache.lock() {
            if let Some(value) = cache.get(&cache_key) {
                return value;
            }
        }
        let encoded = encode_winansi(text);
        let mut total_units: i32 = 0;
        for code in encoded.bytes {
            let adv = match slot {
                FontSlot::Standard(font) => font.advance_for_code(code),
                FontSlot::Registered(index) => self
                    .fonts
                    .get(index)
                    .map(|font| font.metrics.advance_for_code(code))
                    .unwrap_or(0),
            };
            total_units = total_units.saturating_add(adv as i32);
        }
        let value = if total_units <= 0 {
            Pt::ZERO
        } else {
            font_size.mul_ratio(total_units, 1000)
        };
        if let Ok(mut cache) = self.text_width_cache.lock() {
            cache.insert(cache_key, value);
        }
        value
    }
}

/// A resolved font, ready for measurement and embedding.
#[derive(Debug, Clone, Copy)]
pub struct FontRef<'a> {
    registry: &'a FontRegistry,
    slot: FontSlot,
}

impl TextMeasure for FontRef<'_> {
    fn text_width(&self, text: &str, font_size: Pt) -> Pt {
        self.registry.measure(self.slot, font_size, text)
    }
}

impl FontRef<'_> {
    pub fn name(&self) -> &str {
        match self.slot {
            FontSlot::Standard(font) => font.base_font(),
            FontSlot::Registered(index) => self
                .registry
                .fonts
                .get(index)
                .map(|font| font.name.as_str())
                .unwrap_or("EmbeddedFont"),
        }
    }

    /// Adds the font dictionary (and, for registered fonts, its descriptor and
    /// program) to `doc`.
    pub(crate) fn add_to_document(&self, doc: &mut LoDocument) -> Result<LoObjectId> {
        match self.slot {
            FontSlot::Standard(font) => Ok(doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            })),
            FontSlot::Registered(index) => {
                let font = self.registry.fonts.get(index).ok_or_else(|| {
                    StampError::Render(format!("font slot {index} is not registered"))
                })?;
                Ok(embed_registered_font(doc, font))
            }
        }
    }
}

fn embed_registered_font(doc: &mut LoDocument, font: &RegisteredFont) -> LoObjectId {
    let base = sanitize_font_name(&font.name);
    let metrics = &font.metrics;

    let mut file_dict = dictionary! {
        "Length1" => font.data.len() as i64,
    };
    let (file_key, subtype) = match font.program_kind {
        FontProgramKind::TrueType => ("FontFile2", "TrueType"),
        FontProgramKind::OpenTypeCff => {
            file_dict.set("Subtype", "OpenType");
            ("FontFile3", "Type1")
        }
    };
    let file_id = doc.add_object(LoStream::new(file_dict, font.data.clone()));

    let mut flags: i64 = 32;
    if metrics.is_fixed_pitch {
        flags |= 1;
    }
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => LoObject::Name(base.clone().into_bytes()),
        "Flags" => flags,
        "FontBBox" => LoObject::Array(vec![
            LoObject::Integer(metrics.bbox.0 as i64),
            LoObject::Integer(metrics.bbox.1 as i64),
            LoObject::Integer(metrics.bbox.2 as i64),
            LoObject::Integer(metrics.bbox.3 as i64),
        ]),
        "ItalicAngle" => metrics.italic_angle as i64,
        "Ascent" => metrics.ascent as i64,
        "Descent" => metrics.descent as i64,
        "CapHeight" => metrics.cap_height as i64,
        "StemV" => metrics.stem_v as i64,
        "MissingWidth" => metrics.missing_width as i64,
        file_key => file_id,
    });

    let widths: Vec<LoObject> = metrics
        .widths
        .iter()
        .map(|w| LoObject::Integer(*w as i64))
        .collect();
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => subtype,
        "BaseFont" => LoObject::Name(base.into_bytes()),
        "FirstChar" => FIRST_CODE as i64,
        "LastChar" => LAST_CODE as i64,
        "Widths" => widths,
        "FontDescriptor" => descriptor_id,
        "Encoding" => "WinAnsiEncoding",
    })
}

impl FontMetrics {
    fn from_face(face: &ttf_parser::Face<'_>) -> (Self, FontProgramKind) {
        let units_per_em = face.units_per_em().max(1);
        let scale = 1000.0 / units_per_em as f32;
        let widths = build_widths(face, scale);
        let missing_width = widths
            .get((b' ' - FIRST_CODE) as usize)
            .copied()
            .unwrap_or(0);

        let ascent = scale_i16(face.ascender(), scale);
        let descent = scale_i16(face.descender(), scale);
        let cap_height = face
            .capital_height()
            .map(|value| scale_i16(value, scale))
            .unwrap_or(ascent);
        let bbox = face.global_bounding_box();
        let bbox = (
            scale_i16(bbox.x_min, scale),
            scale_i16(bbox.y_min, scale),
            scale_i16(bbox.x_max, scale),
            scale_i16(bbox.y_max, scale),
        );
        let italic_angle = face
            .italic_angle()
            .map(|value| value.round() as i16)
            .unwrap_or(0);
        let program_kind = if face.tables().cff.is_some() {
            FontProgramKind::OpenTypeCff
        } else {
            FontProgramKind::TrueType
        };

        (
            Self {
                widths,
                ascent,
                descent,
                cap_height,
                italic_angle,
                stem_v: 80,
                bbox,
                missing_width,
                is_fixed_pitch: face.is_monospaced(),
            },
            program_kind,
        )
    }

    fn advance_for_code(&self, code: u8) -> u16 {
        if code < FIRST_CODE {
            return self.missing_width;
        }
        self.widths
            .get((code - FIRST_CODE) as usize)
            .copied()
            .unwrap_or(self.missing_width)
    }
}

fn build_widths(face: &ttf_parser::Face<'_>, scale: f32) -> Vec<u16> {
    let mut widths = Vec::with_capacity((LAST_CODE - FIRST_CODE) as usize + 1);
    for code in FIRST_CODE..=LAST_CODE {
        let width = char_for_code(code)
            .and_then(|ch| face.glyph_index(ch))
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(0);
        let scaled = (width as f32 * scale).round() as i32;
        widths.push(scaled.clamp(0, u16::MAX as i32) as u16);
    }
    widths
}

fn scale_i16(value: i16, scale: f32) -> i16 {
    let scaled = (value as f32 * scale).round() as i32;
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn font_names(face: &ttf_parser::Face<'_>, path: &Path) -> (String, Vec<String>) {
    use ttf_parser::name::name_id;

    let mut family = None;
    let mut full = None;
    let mut post = None;

    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        match entry.name_id {
            name_id::TYPOGRAPHIC_FAMILY | name_id::FAMILY => {
                if family.is_none() {
                    family = Some(name);
                }
            }
            name_id::FULL_NAME => {
                if full.is_none() {
                    full = Some(name);
                }
            }
            name_id::POST_SCRIPT_NAME => {
                if post.is_none() {
                    post = Some(name);
                }
            }
            _ => {}
        }
    }

    let stem = path
        .file_stem()
        .and_then(|v| v.to_str())
        .map(|v| v.to_string());
    let primary = post
        .clone()
        .or_else(|| full.clone())
        .or_else(|| family.clone())
        .or_else(|| stem.clone())
        .unwrap_or_else(|| "EmbeddedFont".to_string());

    let mut aliases = Vec::new();
    for candidate in [family, full, post, stem].into_iter().flatten() {
        if candidate != primary {
            aliases.push(candidate);
        }
    }

    (primary, aliases)
}

fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|v| v.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf"))
        .unwrap_or(false)
}

fn sanitize_font_name(name: &str) -> String {
    let out: String = name
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '+'))
        .collect();
    if out.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        out
    }
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_widths_match_afm_values() {
        let fonts = FontRegistry::new();
        let helvetica = fonts.require("Helvetica").expect("helvetica");
        // "Hi": H=722, i=222 at 10pt.
        assert_eq!(
            helvetica.text_width("Hi", Pt::from_i32(10)).to_milli_i64(),
            9440
        );
        let bold = fonts.require("Helvetica-Bold").expect("bold");
        assert_eq!(bold.text_width("Hi", Pt::from_i32(10)).to_milli_i64(), 10000);
    }

    #[test]
    fn courier_is_fixed_pitch() {
        let fonts = FontRegistry::new();
        let courier = fonts.require("courier").expect("courier");
        assert_eq!(
            courier.text_width("N847SA", Pt::from_i32(10)).to_milli_i64(),
            36000
        );
    }

    #[test]
    fn cessna_string_measures_wider_than_one_hundred_points() {
        let fonts = FontRegistry::new();
        let helvetica = fonts.require("Helvetica").expect("helvetica");
        let width = helvetica.text_width("Cessna 172S Skyhawk", Pt::from_i32(11));
        assert!(width.to_f32() > 100.0, "width was {}", width.to_f32());
    }

    #[test]
    fn accented_letters_use_base_letter_advance() {
        let fonts = FontRegistry::new();
        let helvetica = fonts.require("Helvetica").expect("helvetica");
        let size = Pt::from_i32(12);
        assert_eq!(
            helvetica.text_width("Cafe", size),
            helvetica.text_width("Café", size)
        );
    }

    #[test]
    fn repeated_measurements_are_served_from_cache() {
        let fonts = FontRegistry::new();
        let helvetica = fonts.require("Helvetica").expect("helvetica");
        let first = helvetica.text_width("01/15/2025", Pt::from_i32(11));
        let second = helvetica.text_width("01/15/2025", Pt::from_i32(11));
        assert_eq!(first, second);
        let cache = fonts.text_width_cache.lock().expect("cache");
        assert_eq!(cache.map.len(), 1);
    }

    #[test]
    fn unknown_font_names_fail_to_resolve() {
        let fonts = FontRegistry::new();
        assert!(fonts.resolve("Comic Sans").is_none());
        let err = fonts.require("Comic Sans").expect_err("unknown");
        assert!(err.to_string().contains("neither a standard PDF font"));
    }

    #[test]
    fn register_bytes_rejects_non_font_data() {
        let mut fonts = FontRegistry::new();
        let err = fonts
            .register_bytes(b"not a font".to_vec(), Some("broken.ttf"))
            .expect_err("invalid");
        assert!(err.to_string().contains("invalid font data for broken.ttf"));
    }

    fn mono_font_path() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/fonts/DejaVuSansMono.ttf")
    }

    #[test]
    fn truetype_file_registers_under_its_names() {
        let mut fonts = FontRegistry::new();
        let name = fonts.register_file(mono_font_path()).expect("register");
        assert_eq!(name, "DejaVuSansMono");

        let by_family = fonts.require("DejaVu Sans Mono").expect("family name");
        assert_eq!(by_family.name(), "DejaVuSansMono");
        assert!(fonts.resolve("dejavusansmono").is_some());
        // 1233 of 2048 units per em scales to 602 per mille for every glyph.
        assert_eq!(
            by_family.text_width("N847SA", Pt::from_i32(10)).to_milli_i64(),
            36120
        );
    }

    #[test]
    fn font_directory_registration_skips_other_files() {
        let mut fonts = FontRegistry::new();
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/fonts");
        assert_eq!(fonts.register_dir(&dir).expect("register dir"), 1);
        assert!(fonts.resolve("DejaVu Sans Mono").is_some());

        let err = fonts
            .register_file(dir.join("DejaVu-LICENSE.txt"))
            .expect_err("not a font file");
        assert!(err.to_string().contains("unsupported font file extension"));
    }

    #[test]
    fn registered_font_is_embedded_with_winansi_widths() {
        let mut fonts = FontRegistry::new();
        let data = fs::read(mono_font_path()).expect("font bytes");
        let data_len = data.len() as i64;
        fonts
            .register_bytes(data, Some("DejaVuSansMono.ttf"))
            .expect("register");
        let mut doc = LoDocument::with_version("1.5");
        let id = fonts
            .require("DejaVu Sans Mono")
            .expect("font")
            .add_to_document(&mut doc)
            .expect("embed");

        let font = doc.get_dictionary(id).expect("font dict");
        assert_eq!(font.get(b"Subtype").and_then(LoObject::as_name).expect("subtype"), b"TrueType");
        assert_eq!(font.get(b"FirstChar").and_then(LoObject::as_i64).expect("first"), 32);
        assert_eq!(font.get(b"LastChar").and_then(LoObject::as_i64).expect("last"), 255);
        let widths = font.get(b"Widths").and_then(LoObject::as_array).expect("widths");
        assert_eq!(widths.len(), 224);
        assert_eq!(widths[(b'N' - 32) as usize].as_i64().expect("width"), 602);
        assert_eq!(widths[0].as_i64().expect("space"), 602);

        let descriptor_id = font
            .get(b"FontDescriptor")
            .and_then(LoObject::as_reference)
            .expect("descriptor ref");
        let descriptor = doc.get_dictionary(descriptor_id).expect("descriptor");
        assert_eq!(descriptor.get(b"Flags").and_then(LoObject::as_i64).expect("flags"), 33);
        assert_eq!(
            descriptor.get(b"MissingWidth").and_then(LoObject::as_i64).expect("missing"),
            602
        );
        let file_id = descriptor
            .get(b"FontFile2")
            .and_then(LoObject::as_reference)
            .expect("font file");
        let program = doc.get_object(file_id).and_then(LoObject::as_stream).expect("stream");
        assert_eq!(program.dict.get(b"Length1").and_then(LoObject::as_i64).expect("len"), data_len);
        assert_eq!(program.content.len() as i64, data_len);
    }

    #[test]
    fn standard_font_dictionary_uses_winansi() {
        let fonts = FontRegistry::new();
        let mut doc = LoDocument::with_version("1.5");
        let id = fonts
            .require("Helvetica")
            .expect("helvetica")
            .add_to_document(&mut doc)
            .expect("add");
        let dict = doc.get_object(id).and_then(LoObject::as_dict).expect("dict");
        assert_eq!(
            dict.get(b"BaseFont").and_then(LoObject::as_name).expect("base"),
            b"Helvetica"
        );
        assert_eq!(
            dict.get(b"Encoding").and_then(LoObject::as_name).expect("enc"),
            b"WinAnsiEncoding"
        );
    }
}
