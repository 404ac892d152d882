// fields.rs — Field declarations and normalization.
//
// Configs may declare fields two ways:
//
//   keyed object:   "fields": { "title": "text", "body": { "type": "markdown" } }
//   ordered list:   "fields": [ { "property": "title", "label": "Title", "type": "text" } ]
//
// The list form carries explicit display order and labels; the keyed form
// relies on object key order. Both normalize to a FieldSet — an ordered
// sequence of named Field definitions — and normalization is idempotent.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// The editor-facing type of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Markdown,
    Email,
    Url,
    Number,
    Date,
    Boolean,
    Image,
    Array,
}

/// Whether a field is surfaced on index cards, and how prominently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowPriority {
    Primary,
    Secondary,
}

/// A single normalized field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Property name in the content data (e.g. "title", "coverImage").
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    /// Explicit display label. When absent, [`Field::label`] derives one
    /// from the property name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// Generated fields are filled in by the engine on create and never
    /// shown as editable inputs.
    #[serde(default, skip_serializing_if = "is_false")]
    pub generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show: Option<ShowPriority>,
    /// Nested definitions for array-of-object fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldSet>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Field {
    /// Display label: the explicit one if present, else the property name
    /// converted from camelCase/snake_case to Title Case.
    pub fn label(&self) -> String {
        match &self.label {
            Some(label) if !label.is_empty() => label.clone(),
            _ => title_case(&self.name),
        }
    }
}

/// Ordered set of normalized fields. Order is display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSet(pub Vec<Field>);

impl FieldSet {
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.0.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Re-export as a keyed declaration. Normalizing the result yields the
    /// same FieldSet back, which is what makes normalization idempotent.
    pub fn to_decl(&self) -> FieldsDecl {
        let mut map = serde_json::Map::new();
        for field in &self.0 {
            // serde_json's preserve_order feature keeps insertion order here.
            let mut value = serde_json::to_value(field).expect("field serializes");
            if let Some(obj) = value.as_object_mut() {
                obj.remove("name");
            }
            map.insert(field.name.clone(), value);
        }
        FieldsDecl::Keyed(map)
    }
}

/// A field declaration as it appears in config JSON, before normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldsDecl {
    /// List form: explicit order, explicit labels.
    Ordered(Vec<OrderedFieldDecl>),
    /// Keyed form: property name → shorthand type or options object.
    Keyed(serde_json::Map<String, serde_json::Value>),
}

/// One entry of the list form.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderedFieldDecl {
    pub property: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub generated: bool,
    #[serde(default)]
    pub show: Option<ShowPriority>,
    #[serde(default)]
    pub fields: Option<Vec<OrderedFieldDecl>>,
}

/// One value of the keyed form: either a bare type string or a full options
/// object (which may itself nest either declaration form).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyedFieldDecl {
    Shorthand(FieldType),
    Options {
        #[serde(rename = "type")]
        ty: FieldType,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        required: bool,
        #[serde(default)]
        generated: bool,
        #[serde(default)]
        show: Option<ShowPriority>,
        #[serde(default)]
        fields: Option<Box<FieldsDecl>>,
    },
}

/// Normalize either declaration form into an ordered [`FieldSet`].
pub fn normalize_fields(decl: &FieldsDecl) -> Result<FieldSet, SchemaError> {
    match decl {
        FieldsDecl::Ordered(items) => {
            let fields = items.iter().map(normalize_ordered).collect::<Result<_, _>>()?;
            Ok(FieldSet(fields))
        }
        FieldsDecl::Keyed(map) => {
            let mut fields = Vec::with_capacity(map.len());
            for (name, raw) in map {
                let parsed: KeyedFieldDecl =
                    serde_json::from_value(raw.clone()).map_err(|e| SchemaError::InvalidField {
                        name: name.clone(),
                        reason: e.to_string(),
                    })?;
                fields.push(match parsed {
                    KeyedFieldDecl::Shorthand(ty) => Field {
                        name: name.clone(),
                        ty,
                        label: None,
                        required: false,
                        generated: false,
                        show: None,
                        fields: None,
                    },
                    KeyedFieldDecl::Options {
                        ty,
                        label,
                        required,
                        generated,
                        show,
                        fields: nested,
                    } => Field {
                        name: name.clone(),
                        ty,
                        label,
                        required,
                        generated,
                        show,
                        fields: nested.map(|d| normalize_fields(&d)).transpose()?,
                    },
                });
            }
            Ok(FieldSet(fields))
        }
    }
}

fn normalize_ordered(item: &OrderedFieldDecl) -> Result<Field, SchemaError> {
    let nested = match &item.fields {
        Some(children) => Some(FieldSet(
            children.iter().map(normalize_ordered).collect::<Result<_, _>>()?,
        )),
        None => None,
    };
    Ok(Field {
        name: item.property.clone(),
        ty: item.ty,
        label: item.label.clone(),
        required: item.required,
        generated: item.generated,
        show: item.show,
        fields: nested,
    })
}

/// camelCase / snake_case → "Title Case".
fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_uppercase() {
            out.push(' ');
            out.push(ch);
        } else if ch == '_' {
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    let trimmed = out.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
