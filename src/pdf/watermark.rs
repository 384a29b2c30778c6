//! Text stamp in the bottom-right corner of the first page.

use anyhow::{Context, Result};
use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

const FONT_SIZE: f32 = 9.0;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.55;
const MARGIN: f32 = 5.0;
const FONT_RESOURCE: &str = "BsWm";
/// US Letter, used when no MediaBox is found up the page tree.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
const MAX_TREE_DEPTH: usize = 32;

/// Stamp `text` on page 1. Other pages are left untouched.
pub fn stamp_first_page(doc: &mut Document, text: &str) -> Result<()> {
    let page_id = *doc
        .get_pages()
        .get(&1)
        .context("Document has no first page")?;

    let [x_min, y_min, x_max, _] = media_box(doc, page_id);
    let mut resources = inherited_dictionary(doc, page_id, b"Resources").unwrap_or_default();
    let mut fonts = match resources.get(b"Font") {
        Ok(obj) => resolve(doc, obj)
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default(),
        Err(_) => Dictionary::new(),
    };
    let contents = existing_contents(doc, page_id)?;

    let font_name = unused_name(&fonts);
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    fonts.set(font_name.clone(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let encoded = latin1(text);
    let text_width = encoded.len() as f32 * FONT_SIZE * GLYPH_WIDTH;
    let x = (x_max - text_width - MARGIN).max(x_min + MARGIN);
    let y = y_min + MARGIN;
    debug!("Stamping {:?} at ({:.1}, {:.1}) on page 1", text, x, y);

    // Existing content runs inside q..Q so its graphics state cannot leak into the stamp
    let save = Content {
        operations: vec![Operation::new("q", vec![])],
    };
    let stamp = Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font_name.into_bytes()), FONT_SIZE.into()]),
            Operation::new("rg", vec![0.into(), 0.into(), 0.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(encoded)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };
    let save_id = doc.add_object(Stream::new(dictionary! {}, save.encode()?));
    let stamp_id = doc.add_object(Stream::new(dictionary! {}, stamp.encode()?));

    let mut new_contents = Vec::with_capacity(contents.len() + 2);
    new_contents.push(Object::Reference(save_id));
    new_contents.extend(contents);
    new_contents.push(Object::Reference(stamp_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .context("First page is not a dictionary")?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(new_contents));

    Ok(())
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Look `key` up on the page, then up the Parent chain as PDF inheritance allows.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current?).ok()?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

fn inherited_dictionary(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Dictionary> {
    inherited(doc, page_id, key)?.as_dict().ok().cloned()
}

/// Normalized `[x_min, y_min, x_max, y_max]` of the page.
fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let values: Option<Vec<f32>> = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .map(|items| items.iter().filter_map(|o| resolve(doc, o).and_then(number)).collect());

    match values.as_deref() {
        Some(&[a, b, c, d]) => [a.min(c), b.min(d), a.max(c), b.max(d)],
        _ => DEFAULT_MEDIA_BOX,
    }
}

/// Content stream references of the page, flattened.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    Ok(contents)
}

fn unused_name(fonts: &Dictionary) -> String {
    let mut name = FONT_RESOURCE.to_string();
    let mut n = 1;
    while fonts.has(name.as_bytes()) {
        name = format!("{}{}", FONT_RESOURCE, n);
        n += 1;
    }
    name
}

/// WinAnsi approximation: characters outside Latin-1 become `?`.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
