// 📄 Document Entity - a scanned or imported file kept in the cabinet
//
// Documents are usually linked to the transactions they justify
// (an invoice to its payment, a statement to its account).

use crate::accessor::SerializationAccessor;
use crate::attributes::{Attributes, ATTRIBUTE_ELEMENT};
use crate::linkable::{LinkSet, Linkable};
use crate::serializable::Serializable;
use chrono::NaiveDate;

pub const DOCUMENT_TYPE: &str = "document";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    // ========================================================================
    // IDENTITY
    // ========================================================================
    pub id: String,

    // ========================================================================
    // VALUES
    // ========================================================================
    /// e.g. "invoice", "statement", "receipt"
    pub kind: String,

    /// Path relative to the cabinet file
    pub file_name: String,

    pub date: Option<NaiveDate>,

    pub title: String,

    /// Free-form typed data (vendor, total, due date...)
    pub attributes: Attributes,

    // ========================================================================
    // LINKS
    // ========================================================================
    pub links: LinkSet,
}

impl Document {
    pub fn new(kind: impl Into<String>, file_name: impl Into<String>) -> Self {
        Document {
            id: uuid::Uuid::new_v4().to_string(),
            kind: kind.into(),
            file_name: file_name.into(),
            ..Document::default()
        }
    }

    /// The attributes plus the document kind as `__type__`
    pub fn document_attributes(&self) -> Attributes {
        let mut attributes = self.attributes.clone();
        attributes.set("__type__", self.kind.as_str());
        attributes
    }

    /// Display text built from a format such as "%{__type__} %{vendor}"
    pub fn display_name(&self, format: &str) -> String {
        self.document_attributes().format(format)
    }
}

impl Serializable for Document {
    fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
        SerializationAccessor::new()
            .with_scalar("id", &mut self.id)
            .with_scalar("kind", &mut self.kind)
            .with_scalar("file", &mut self.file_name)
            .with_scalar("date", &mut self.date)
            .with_scalar("title", &mut self.title)
            .with_attributes(ATTRIBUTE_ELEMENT, &mut self.attributes)
            .with_links(&mut self.links)
    }

    fn as_linkable(&self) -> Option<&dyn Linkable> {
        Some(self)
    }

    fn as_linkable_mut(&mut self) -> Option<&mut dyn Linkable> {
        Some(self)
    }
}

impl Linkable for Document {
    fn unique_id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &'static str {
        DOCUMENT_TYPE
    }

    fn links(&self) -> &LinkSet {
        &self.links
    }

    fn links_mut(&mut self) -> &mut LinkSet {
        &mut self.links
    }
}
