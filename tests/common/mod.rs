use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream, StringFormat};

/// Unprotected PDF whose page N shows "Page N".
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    save(&mut sample_document(pages))
}

/// Same document protected with RC4 128-bit. An empty user password gives
/// a file that only restricts permissions.
#[allow(dead_code)]
pub fn encrypted_pdf(pages: usize, user_password: &str, owner_password: &str) -> Vec<u8> {
    let mut doc = sample_document(pages);
    let state = EncryptionState::try_from(EncryptionVersion::V2 {
        document: &doc,
        owner_password,
        user_password,
        key_length: 128,
        permissions: Permissions::PRINTABLE,
    })
    .expect("valid encryption parameters");
    doc.encrypt(&state).expect("sample document should encrypt");
    save(&mut doc)
}

fn save(doc: &mut Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn sample_document(pages: usize) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids = Vec::with_capacity(pages);
    for n in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {n}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::String(b"billsweep-fixture".to_vec(), StringFormat::Literal),
            Object::String(b"billsweep-fixture".to_vec(), StringFormat::Literal),
        ],
    );
    doc
}

pub fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf)
        .expect("output should be a readable PDF")
        .get_pages()
        .len()
}

#[allow(dead_code)]
pub fn is_encrypted(pdf: &[u8]) -> bool {
    Document::load_mem(pdf)
        .expect("output should be a readable PDF")
        .trailer
        .has(b"Encrypt")
}
