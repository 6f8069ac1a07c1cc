//! Index schema and per-field analyzer selection.
//!
//! This module defines the field mappings of the starred repository index.

use std::collections::{HashMap, HashSet};
use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions};

use crate::errors::SearchIndexError;

/// Tokenizer registered by tantivy for stemmed English text.
const ENGLISH_TOKENIZER: &str = "en_stem";

/// Tokenizer registered by tantivy that keeps the whole value as one token.
const KEYWORD_TOKENIZER: &str = "raw";

/// How an indexed field is analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analyzer {
    /// Language-aware tokenization: lowercasing, stop words, stemming.
    English,
    /// Exact match on the whole value.
    Keyword,
}

impl Analyzer {
    fn tokenizer(self) -> &'static str {
        match self {
            Self::English => ENGLISH_TOKENIZER,
            Self::Keyword => KEYWORD_TOKENIZER,
        }
    }

    fn record_option(self) -> IndexRecordOption {
        match self {
            // positions are needed for phrase queries
            Self::English => IndexRecordOption::WithFreqsAndPositions,
            Self::Keyword => IndexRecordOption::Basic,
        }
    }
}

/// Mapping of one document field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub name: String,
    /// `None` keeps the field out of the inverted index.
    pub analyzer: Option<Analyzer>,
    /// Whether the raw value is kept and returned in hits.
    pub stored: bool,
}

impl FieldMapping {
    /// An English text field, stored.
    pub fn english(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            analyzer: Some(Analyzer::English),
            stored: true,
        }
    }

    /// A keyword field, stored.
    pub fn keyword(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            analyzer: Some(Analyzer::Keyword),
            stored: true,
        }
    }

    /// A field that is returned in hits but not searchable.
    pub fn stored_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            analyzer: None,
            stored: true,
        }
    }

    /// Index the field without keeping its value.
    pub fn not_stored(mut self) -> Self {
        self.stored = false;
        self
    }
}

/// Field mappings of an index.
///
/// Nested document objects are flattened with `_` before being matched
/// against field names, so `primary_language.name` maps to the
/// `primary_language_name` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    id_field: String,
    fields: Vec<FieldMapping>,
}

impl IndexSchema {
    /// A schema containing only the keyword id field.
    pub fn new(id_field: impl Into<String>) -> Self {
        let id_field = id_field.into();
        Self {
            fields: vec![FieldMapping::keyword(id_field.clone())],
            id_field,
        }
    }

    /// Add a field mapping.
    pub fn with_field(mut self, mapping: FieldMapping) -> Self {
        self.fields.push(mapping);
        self
    }

    /// The mapping used for starred repositories.
    pub fn repository() -> Self {
        Self::new("id")
            .with_field(FieldMapping::english("name_with_owner"))
            .with_field(FieldMapping::english("description"))
            .with_field(FieldMapping::keyword("url"))
            .with_field(FieldMapping::english("readme").not_stored())
            .with_field(FieldMapping::keyword("primary_language_id"))
            .with_field(FieldMapping::keyword("primary_language_name"))
            .with_field(FieldMapping::keyword("primary_language_color"))
            .with_field(FieldMapping::stored_only("starred_at"))
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    fn validate(&self) -> Result<(), SearchIndexError> {
        let mut seen = HashSet::new();
        for mapping in &self.fields {
            if mapping.name.is_empty() {
                return Err(SearchIndexError::validation("field name must not be empty"));
            }
            if mapping.name.contains('.') {
                return Err(SearchIndexError::validation(format!(
                    "field name {} must not contain '.'",
                    mapping.name
                )));
            }
            if !seen.insert(mapping.name.as_str()) {
                return Err(SearchIndexError::validation(format!(
                    "field {} is mapped twice",
                    mapping.name
                )));
            }
        }

        let id = self
            .fields
            .iter()
            .find(|m| m.name == self.id_field)
            .ok_or_else(|| SearchIndexError::validation("id field is not mapped"))?;
        if id.analyzer != Some(Analyzer::Keyword) || !id.stored {
            return Err(SearchIndexError::validation(
                "id field must be a stored keyword field",
            ));
        }

        Ok(())
    }

    /// Build the tantivy schema and resolve field handles.
    pub(crate) fn build(&self) -> Result<ResolvedSchema, SearchIndexError> {
        self.validate()?;

        let mut builder = Schema::builder();
        let mut handles = Vec::with_capacity(self.fields.len());
        for mapping in &self.fields {
            let mut options = TextOptions::default();
            if let Some(analyzer) = mapping.analyzer {
                options = options.set_indexing_options(
                    TextFieldIndexing::default()
                        .set_tokenizer(analyzer.tokenizer())
                        .set_index_option(analyzer.record_option()),
                );
            }
            if mapping.stored {
                options = options.set_stored();
            }
            handles.push(builder.add_text_field(&mapping.name, options));
        }
        let schema = builder.build();

        let mut by_name = HashMap::with_capacity(self.fields.len());
        let mut stored = Vec::new();
        let mut searchable = Vec::new();
        let mut id = None;
        for (mapping, field) in self.fields.iter().zip(handles) {
            by_name.insert(mapping.name.clone(), field);
            if mapping.name == self.id_field {
                id = Some(field);
            } else if mapping.stored {
                stored.push((mapping.name.clone(), field));
            }
            if mapping.analyzer.is_some() {
                searchable.push(field);
            }
        }
        let id = id.ok_or_else(|| SearchIndexError::validation("id field is not mapped"))?;

        Ok(ResolvedSchema {
            schema,
            id,
            by_name,
            stored,
            searchable,
        })
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::repository()
    }
}

/// A built schema with resolved field handles.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedSchema {
    pub schema: Schema,
    pub id: Field,
    pub by_name: HashMap<String, Field>,
    /// Stored fields other than the id, in mapping order.
    pub stored: Vec<(String, Field)>,
    /// Default fields of the query parser.
    pub searchable: Vec<Field>,
}
