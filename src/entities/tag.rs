// 🔖 Tag Entity - free-form label applied to transactions by name
//
// Tags live in the wallet keyed by name; transactions refer to them by
// name only.

use crate::accessor::SerializationAccessor;
use crate::serializable::Serializable;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub name: String,
    pub description: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Tag {
            name: name.into(),
            description: String::new(),
        }
    }
}

impl Serializable for Tag {
    fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
        SerializationAccessor::new()
            .with_scalar("name", &mut self.name)
            .with_text("description", &mut self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::DocumentReader;
    use crate::writer::DocumentWriter;

    #[test]
    fn test_description_is_a_text_element() {
        let mut tag = Tag::new("household");
        tag.description = "Shared costs\nsplit 50/50".to_string();

        let xml = DocumentWriter::default().write_to_string(&mut tag, "tag").unwrap();
        assert!(xml.contains("<tag name=\"household\">"));
        assert!(xml.contains("<description>Shared costs\nsplit 50/50</description>"));

        let parsed = DocumentReader::default().read::<Tag>(&xml, "tag").unwrap();
        assert_eq!(parsed.object, tag);
    }

    #[test]
    fn test_bare_tag_is_an_empty_element() {
        let mut tag = Tag::new("misc");
        let xml = DocumentWriter::default().write_to_string(&mut tag, "tag").unwrap();
        assert!(xml.contains("<tag name=\"misc\"/>"));
    }
}
