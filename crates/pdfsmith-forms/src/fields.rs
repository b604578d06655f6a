//! AcroForm field enumeration and fill-in.

use crate::error::FormError;
use lopdf::{Dictionary, Document, Object};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Interactive form field types, from the /FT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Button,
    Choice,
    Signature,
    Unknown,
}

impl FieldKind {
    fn from_ft(name: &[u8]) -> Self {
        match name {
            b"Tx" => FieldKind::Text,
            b"Btn" => FieldKind::Button,
            b"Ch" => FieldKind::Choice,
            b"Sig" => FieldKind::Signature,
            _ => FieldKind::Unknown,
        }
    }
}

/// One terminal form field with its inherited type and value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    /// Fully qualified name, ancestors joined with dots.
    pub name: String,
    pub kind: FieldKind,
    pub value: Option<String>,
    pub read_only: bool,
}

/// Enumerate every terminal field in the document's AcroForm.
///
/// Non-terminal nodes contribute their partial name and inheritable
/// /FT and /V entries to their children.
pub fn read_fields(pdf: &[u8]) -> Result<Vec<FormField>, FormError> {
    let doc = Document::load_mem(pdf).map_err(|e| FormError::Pdf(e.to_string()))?;

    let mut fields = Vec::new();
    let catalog = doc
        .catalog()
        .map_err(|e| FormError::Pdf(format!("No catalog: {}", e)))?;
    let acroform = match resolve_dict(&doc, catalog.get(b"AcroForm").ok()) {
        Some(dict) => dict,
        None => return Ok(fields),
    };
    let roots = match acroform.get(b"Fields").ok().and_then(|f| f.as_array().ok()) {
        Some(roots) => roots,
        None => return Ok(fields),
    };

    for root in roots {
        collect_fields(&doc, root, "", None, None, &mut fields);
    }
    debug!(count = fields.len(), "enumerated form fields");
    Ok(fields)
}

fn collect_fields(
    doc: &Document,
    node: &Object,
    prefix: &str,
    inherited_ft: Option<FieldKind>,
    inherited_value: Option<String>,
    out: &mut Vec<FormField>,
) {
    let dict = match resolve_dict(doc, Some(node)) {
        Some(d) => d,
        None => return,
    };

    let partial = string_entry(dict, b"T");
    let name = match (&partial, prefix.is_empty()) {
        (Some(t), true) => t.clone(),
        (Some(t), false) => format!("{}.{}", prefix, t),
        (None, _) => prefix.to_string(),
    };

    let kind = dict
        .get(b"FT")
        .ok()
        .and_then(|ft| ft.as_name().ok())
        .map(FieldKind::from_ft)
        .or(inherited_ft);
    let value = value_entry(dict).or(inherited_value);

    let kids = dict.get(b"Kids").ok().and_then(|k| k.as_array().ok());
    match kids {
        // A node with kids that are themselves fields is non-terminal; pure
        // widget kids (no /T) collapse into this field.
        Some(kids) if kids_are_fields(doc, kids) => {
            for kid in kids {
                collect_fields(doc, kid, &name, kind, value.clone(), out);
            }
        }
        _ => {
            out.push(FormField {
                name,
                kind: kind.unwrap_or(FieldKind::Unknown),
                value,
                read_only: read_only_flag(dict),
            });
        }
    }
}

fn kids_are_fields(doc: &Document, kids: &[Object]) -> bool {
    kids.iter().any(|kid| {
        resolve_dict(doc, Some(kid))
            .map(|d| d.get(b"T").is_ok())
            .unwrap_or(false)
    })
}

fn read_only_flag(dict: &Dictionary) -> bool {
    dict.get(b"Ff")
        .ok()
        .and_then(|f| f.as_i64().ok())
        .map(|flags| flags & 1 != 0)
        .unwrap_or(false)
}

/// /V as text: literal strings for text fields, names for buttons.
fn value_entry(dict: &Dictionary) -> Option<String> {
    match dict.get(b"V").ok()? {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Set the value of a text field and return the rewritten document.
///
/// Sets NeedAppearances so viewers regenerate the field's appearance.
pub fn fill_text_field(pdf: &[u8], name: &str, value: &str) -> Result<Vec<u8>, FormError> {
    let mut doc = Document::load_mem(pdf).map_err(|e| FormError::Pdf(e.to_string()))?;

    let (field_id, kind) = find_field_id(&doc, name)?;
    if kind != Some(FieldKind::Text) {
        return Err(FormError::Pdf(format!("Field {} is not a text field", name)));
    }

    {
        let field = doc
            .get_object_mut(field_id)
            .map_err(|e| FormError::Pdf(format!("Failed to get field: {}", e)))?
            .as_dict_mut()
            .map_err(|_| FormError::Pdf("Field is not a dictionary".into()))?;

        field.set(
            "V",
            Object::String(value.as_bytes().to_vec(), lopdf::StringFormat::Literal),
        );
        // Drop a stale appearance; NeedAppearances makes the viewer redraw
        field.remove(b"AP");
    }

    let catalog = doc
        .catalog()
        .map_err(|e| FormError::Pdf(format!("No catalog: {}", e)))?;
    if let Some(acroform_id) = catalog
        .get(b"AcroForm")
        .ok()
        .and_then(|a| a.as_reference().ok())
    {
        if let Ok(acroform) = doc
            .get_object_mut(acroform_id)
            .and_then(|o| o.as_dict_mut())
        {
            acroform.set("NeedAppearances", Object::Boolean(true));
        }
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| FormError::Pdf(format!("Save failed: {}", e)))?;
    Ok(buffer)
}

/// Find a terminal field by fully qualified name, returning its object id
/// and effective (possibly inherited) field type.
fn find_field_id(
    doc: &Document,
    target: &str,
) -> Result<(lopdf::ObjectId, Option<FieldKind>), FormError> {
    let catalog = doc
        .catalog()
        .map_err(|e| FormError::Pdf(format!("No catalog: {}", e)))?;
    let acroform = resolve_dict(doc, catalog.get(b"AcroForm").ok())
        .ok_or_else(|| FormError::FieldNotFound(target.to_string()))?;
    let roots = acroform
        .get(b"Fields")
        .ok()
        .and_then(|f| f.as_array().ok())
        .ok_or_else(|| FormError::FieldNotFound(target.to_string()))?;

    for root in roots {
        if let Some(found) = search_field(doc, root, "", None, target) {
            return Ok(found);
        }
    }
    Err(FormError::FieldNotFound(target.to_string()))
}

fn search_field(
    doc: &Document,
    node: &Object,
    prefix: &str,
    inherited_ft: Option<FieldKind>,
    target: &str,
) -> Option<(lopdf::ObjectId, Option<FieldKind>)> {
    let id = node.as_reference().ok()?;
    let dict = doc.get_object(id).ok()?.as_dict().ok()?;

    let name = match (string_entry(dict, b"T"), prefix.is_empty()) {
        (Some(t), true) => t,
        (Some(t), false) => format!("{}.{}", prefix, t),
        (None, _) => prefix.to_string(),
    };

    let kind = dict
        .get(b"FT")
        .ok()
        .and_then(|ft| ft.as_name().ok())
        .map(FieldKind::from_ft)
        .or(inherited_ft);

    let kids = dict.get(b"Kids").ok().and_then(|k| k.as_array().ok());
    let is_terminal = !kids
        .map(|k| kids_are_fields(doc, k))
        .unwrap_or(false);

    if name == target && is_terminal {
        return Some((id, kind));
    }

    for kid in kids? {
        if let Some(found) = search_field(doc, kid, &name, kind, target) {
            return Some(found);
        }
    }
    None
}

fn resolve_dict<'a>(doc: &'a Document, obj: Option<&'a Object>) -> Option<&'a Dictionary> {
    match obj? {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        _ => None,
    }
}

fn string_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|v| v.as_str().ok())
        .map(|s| String::from_utf8_lossy(s).into_owned())
}
