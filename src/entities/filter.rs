// 🔎 Filter - saved transaction search
//
// `active` and `match_any` default to true. Both are declared with their
// default, so only a `false` is written, and prepare_read puts the defaults
// back before the attributes are applied.

use crate::accessor::SerializationAccessor;
use crate::serializable::Serializable;

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: String,

    /// Category path the filter applies to, empty for all
    pub category: String,

    pub active: bool,

    /// Match any pattern (true) or all of them (false)
    pub match_any: bool,

    /// Substrings looked up in transaction names and memos
    pub patterns: Vec<String>,
}

impl Default for Filter {
    fn default() -> Self {
        Filter {
            name: String::new(),
            category: String::new(),
            active: true,
            match_any: true,
            patterns: Vec::new(),
        }
    }
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Filter {
            name: name.into(),
            ..Filter::default()
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }
}

impl Serializable for Filter {
    fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
        SerializationAccessor::new()
            .with_scalar("name", &mut self.name)
            .with_scalar("category", &mut self.category)
            .with_flag_default("active", &mut self.active, true)
            .with_flag_default("match-any", &mut self.match_any, true)
            .with_list("match", &mut self.patterns)
    }

    fn prepare_read(&mut self) {
        self.active = true;
        self.match_any = true;
        self.patterns.clear();
    }
}
