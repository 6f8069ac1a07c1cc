//! Conversion between JSON documents and tantivy documents.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tantivy::schema::Value;
use tantivy::TantivyDocument;

use crate::errors::SearchIndexError;
use crate::tantivy_index::index_config::ResolvedSchema;

/// Flatten a JSON object into `(path, text)` pairs, joining nested keys with `_`.
///
/// Nulls and empty strings produce nothing; arrays contribute one pair per element.
pub(crate) fn flatten(value: &JsonValue) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into("", value, &mut out);
    out
}

fn flatten_into(prefix: &str, value: &JsonValue, out: &mut Vec<(String, String)>) {
    match value {
        JsonValue::Object(map) => {
            for (key, nested) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}_{}", prefix, key)
                };
                flatten_into(&path, nested, out);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                flatten_into(prefix, item, out);
            }
        }
        JsonValue::String(text) if !text.is_empty() => out.push((prefix.to_string(), text.clone())),
        JsonValue::Number(number) => out.push((prefix.to_string(), number.to_string())),
        JsonValue::Bool(flag) => out.push((prefix.to_string(), flag.to_string())),
        JsonValue::String(_) | JsonValue::Null => {}
    }
}

impl ResolvedSchema {
    /// Build the tantivy document for `id`. Fields absent from the mapping are dropped.
    pub(crate) fn to_document(
        &self,
        id: &str,
        body: &JsonValue,
    ) -> Result<TantivyDocument, SearchIndexError> {
        if !body.is_object() {
            return Err(SearchIndexError::serialization(format!(
                "document {} is not a JSON object",
                id
            )));
        }

        let mut document = TantivyDocument::default();
        document.add_text(self.id, id);
        for (path, text) in flatten(body) {
            match self.by_name.get(&path) {
                Some(field) if *field != self.id => document.add_text(*field, text),
                _ => {}
            }
        }
        Ok(document)
    }

    /// The id stored with a document.
    pub(crate) fn document_id(&self, document: &TantivyDocument) -> Option<String> {
        document
            .get_first(self.id)
            .and_then(|value| value.as_str())
            .map(str::to_string)
    }

    /// The stored fields of `document` restricted to `requested`.
    ///
    /// An empty request returns every stored field. Names that are unknown or
    /// not stored are skipped.
    pub(crate) fn project(
        &self,
        document: &TantivyDocument,
        requested: &[String],
    ) -> BTreeMap<String, JsonValue> {
        let mut fields = BTreeMap::new();
        for (name, field) in &self.stored {
            if !requested.is_empty() && !requested.iter().any(|r| r == name) {
                continue;
            }
            if let Some(text) = document.get_first(*field).and_then(|value| value.as_str()) {
                fields.insert(name.clone(), JsonValue::String(text.to_string()));
            }
        }
        fields
    }
}
