use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Position of a document inside the corpus. Every per-method representation
/// is stored in this order.
pub type DocPos = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Id,
    Question,
    Section,
    Text,
    Course,
}

impl Field {
    pub const ALL: [Field; 5] = [Field::Id, Field::Question, Field::Section, Field::Text, Field::Course];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Question => "question",
            Field::Section => "section",
            Field::Text => "text",
            Field::Course => "course",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| SearchError::InvalidParameter(format!("unknown document field: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub question: String,
    pub section: String,
    pub text: String,
    pub course: String,
}

impl Document {
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Id => &self.id,
            Field::Question => &self.question,
            Field::Section => &self.section,
            Field::Text => &self.text,
            Field::Course => &self.course,
        }
    }
}

/// Immutable, ordered document collection with the retrieval text derived
/// from the configured text fields.
#[derive(Debug)]
pub struct CorpusIndex {
    documents: Vec<Document>,
    retrieval_texts: Vec<String>,
    text_fields: Vec<Field>,
    positions: HashMap<String, DocPos>,
}

impl CorpusIndex {
    pub fn load(documents: Vec<Document>, text_fields: &[Field], max_documents: usize) -> Result<Self> {
        if documents.is_empty() {
            return Err(SearchError::CorpusEmpty);
        }
        if documents.len() > max_documents {
            return Err(SearchError::Initialization(format!(
                "corpus has {} documents, configured limit is {max_documents}",
                documents.len()
            )));
        }
        let mut positions = HashMap::with_capacity(documents.len());
        for (pos, doc) in documents.iter().enumerate() {
            if positions.insert(doc.id.clone(), pos).is_some() {
                return Err(SearchError::Initialization(format!("duplicate document id: {}", doc.id)));
            }
        }
        let retrieval_texts = documents
            .iter()
            .map(|doc| {
                text_fields
                    .iter()
                    .map(|f| doc.field(*f))
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        tracing::debug!(num_docs = documents.len(), "corpus index loaded");
        Ok(Self { documents, retrieval_texts, text_fields: text_fields.to_vec(), positions })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, pos: DocPos) -> Option<&Document> {
        self.documents.get(pos)
    }

    pub fn position_of(&self, id: &str) -> Option<DocPos> {
        self.positions.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.position_of(id).and_then(|pos| self.documents.get(pos))
    }

    /// Concatenation of the configured text fields, in configuration order.
    pub fn retrieval_text(&self, pos: DocPos) -> &str {
        &self.retrieval_texts[pos]
    }

    pub fn retrieval_texts(&self) -> &[String] {
        &self.retrieval_texts
    }

    pub fn text_fields(&self) -> &[Field] {
        &self.text_fields
    }

    /// Raw values of one field, in corpus order.
    pub fn field_values(&self, field: Field) -> Vec<&str> {
        self.documents.iter().map(|d| d.field(field)).collect()
    }

    /// Distinct course names in first-seen order.
    pub fn courses(&self) -> Vec<String> {
        let mut seen = Vec::<String>::new();
        for doc in &self.documents {
            if !seen.iter().any(|c| c == &doc.course) {
                seen.push(doc.course.clone());
            }
        }
        seen
    }
}
