// 🧾 Transaction Entity - one booking inside an account
//
// Identity is a UUID assigned on creation and persisted, so documents and
// other transactions can link to it across saves.
//
// <transaction id="..." date="2024-01-15" amount="-4599" name="Groceries"
//              category="Food:Groceries" reconciled="true">
//   <memo>weekly shop</memo>
//   <tag>household</tag>
//   <link id="..." type="document"/>
// </transaction>

use crate::accessor::SerializationAccessor;
use crate::linkable::{LinkSet, Linkable};
use crate::serializable::Serializable;
use chrono::NaiveDate;

pub const TRANSACTION_TYPE: &str = "transaction";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    // ========================================================================
    // IDENTITY
    // ========================================================================
    pub id: String,

    // ========================================================================
    // VALUES
    // ========================================================================
    pub date: Option<NaiveDate>,

    /// Amount in cents, negative for debits
    pub amount: i64,

    pub name: String,

    /// Free text, stored as a child element
    pub memo: String,

    /// Category path, e.g. "Food:Groceries"
    pub category: String,

    pub tags: Vec<String>,

    pub reconciled: bool,

    // ========================================================================
    // LINKS
    // ========================================================================
    pub links: LinkSet,
}

impl Transaction {
    pub fn new(date: NaiveDate, amount: i64, name: impl Into<String>) -> Self {
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            date: Some(date),
            amount,
            name: name.into(),
            ..Transaction::default()
        }
    }

    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.has_tag(&tag) {
            self.tags.push(tag);
        }
    }
}

impl Serializable for Transaction {
    fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
        SerializationAccessor::new()
            .with_scalar("id", &mut self.id)
            .with_scalar("date", &mut self.date)
            .with_scalar("amount", &mut self.amount)
            .with_scalar("name", &mut self.name)
            .with_scalar("category", &mut self.category)
            .with_flag("reconciled", &mut self.reconciled)
            .with_text("memo", &mut self.memo)
            .with_list("tag", &mut self.tags)
            .with_links(&mut self.links)
    }

    fn as_linkable(&self) -> Option<&dyn Linkable> {
        Some(self)
    }

    fn as_linkable_mut(&mut self) -> Option<&mut dyn Linkable> {
        Some(self)
    }
}

impl Linkable for Transaction {
    fn unique_id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &'static str {
        TRANSACTION_TYPE
    }

    fn links(&self) -> &LinkSet {
        &self.links
    }

    fn links_mut(&mut self) -> &mut LinkSet {
        &mut self.links
    }
}
