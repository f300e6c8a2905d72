// 🏷️ Category Entity - a tree of named categories
//
// Each category owns its sub-categories, keyed by name. A full path joins
// names with ':' ("Food:Groceries").

use crate::accessor::SerializationAccessor;
use crate::serializable::Serializable;
use std::collections::BTreeMap;

pub const PATH_SEPARATOR: char = ':';

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Category {
    pub name: String,
    pub sub_categories: BTreeMap<String, Category>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Category {
            name: name.into(),
            sub_categories: BTreeMap::new(),
        }
    }

    /// Get or create a direct sub-category
    pub fn add_sub_category(&mut self, name: &str) -> &mut Category {
        self.sub_categories
            .entry(name.to_string())
            .or_insert_with(|| Category::new(name))
    }

    pub fn sub_category(&self, name: &str) -> Option<&Category> {
        self.sub_categories.get(name)
    }

    /// Follow a relative path such as "Groceries:Organic"
    pub fn find(&self, path: &str) -> Option<&Category> {
        path.split(PATH_SEPARATOR)
            .try_fold(self, |current, name| current.sub_category(name))
    }

    /// This category and all below it
    pub fn count(&self) -> usize {
        1 + self.sub_categories.values().map(Category::count).sum::<usize>()
    }
}

impl Serializable for Category {
    fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
        SerializationAccessor::new()
            .with_scalar("name", &mut self.name)
            .with_child_map("category", &mut self.sub_categories, "name")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::DocumentReader;
    use crate::writer::DocumentWriter;

    fn food() -> Category {
        let mut food = Category::new("Food");
        food.add_sub_category("Groceries").add_sub_category("Organic");
        food.add_sub_category("Cafe");
        food
    }

    #[test]
    fn test_category_tree() {
        let food = food();
        assert_eq!(food.count(), 4);
        assert!(food.find("Groceries:Organic").is_some());
        assert!(food.find("Groceries:Frozen").is_none());
        assert_eq!(food.find("Cafe").unwrap().name, "Cafe");
    }

    #[test]
    fn test_sub_categories_written_in_key_order() {
        let mut food = food();
        let xml = DocumentWriter::default().write_to_string(&mut food, "category").unwrap();

        let cafe = xml.find(r#"name="Cafe""#).unwrap();
        let groceries = xml.find(r#"name="Groceries""#).unwrap();
        assert!(cafe < groceries);

        let parsed = DocumentReader::default().read::<Category>(&xml, "category").unwrap();
        assert_eq!(parsed.object, food);
    }
}
