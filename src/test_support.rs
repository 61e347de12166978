use lopdf::content::Content;
use lopdf::{Document as LoDocument, Object as LoObject, ObjectId as LoObjectId, Stream as LoStream, dictionary};

/// Letter-size document whose pages inherit their resources from the page
/// tree root, the way most form templates are written.
pub(crate) fn sample_document(page_count: u32) -> LoDocument {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids = Vec::new();
    for page in 1..=page_count {
        let content = format!("BT /F1 12 Tf 72 720 Td (Template page {page}) Tj ET").into_bytes();
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(LoObject::Reference(page_id));
    }
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
        "Resources" => resources_id,
    };
    doc.objects.insert(pages_id, LoObject::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub(crate) fn sample_pdf_bytes(page_count: u32) -> Vec<u8> {
    let mut doc = sample_document(page_count);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save sample pdf");
    out
}

pub(crate) fn page_id(doc: &LoDocument, page: u32) -> LoObjectId {
    *doc.get_pages().get(&page).expect("page exists")
}

/// Operands of every `Tj` on the page, as raw bytes.
pub(crate) fn shown_strings(doc: &LoDocument, page: u32) -> Vec<Vec<u8>> {
    let bytes = doc
        .get_page_content(page_id(doc, page))
        .expect("page content");
    let content = Content::decode(&bytes).expect("decode content");
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| op.operands.first())
        .filter_map(|operand| operand.as_str().ok())
        .map(|bytes| bytes.to_vec())
        .collect()
}

/// Gives `doc` an AcroForm with one text field per name. Each field is its own
/// widget and carries a placeholder appearance stream.
pub(crate) fn add_form_fields(doc: &mut LoDocument, names: &[&str]) {
    let appearance = doc.add_object(LoStream::new(dictionary! {}, b"/Tx BMC EMC".to_vec()));
    let page = page_id(doc, 1);
    let mut fields = Vec::new();
    for (idx, name) in names.iter().enumerate() {
        let y = 700 - 30 * idx as i64;
        let field = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => LoObject::string_literal(*name),
            "P" => page,
            "Rect" => vec![72.into(), y.into(), 300.into(), (y + 20).into()],
            "AP" => dictionary! { "N" => appearance },
        });
        fields.push(LoObject::Reference(field));
    }
    let acro_form = doc.add_object(dictionary! { "Fields" => fields });
    let catalog = doc.catalog_mut().expect("catalog");
    catalog.set("AcroForm", acro_form);
}
