// 💳 Account Entity - owns its transactions
//
// The id is chosen by the user (an account number or a short handle) and
// is what AccountGroups and links refer to.

use super::transaction::Transaction;
use crate::accessor::SerializationAccessor;
use crate::linkable::{LinkSet, Linkable};
use crate::serializable::Serializable;

pub const ACCOUNT_TYPE: &str = "account";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    // ========================================================================
    // IDENTITY
    // ========================================================================
    pub id: String,

    // ========================================================================
    // VALUES
    // ========================================================================
    pub name: String,

    /// Closed accounts are kept for history
    pub closed: bool,

    pub transactions: Vec<Transaction>,

    // ========================================================================
    // LINKS
    // ========================================================================
    pub links: LinkSet,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Account {
            id: id.into(),
            name: name.into(),
            ..Account::default()
        }
    }

    /// Append a transaction, returning it for further edits
    pub fn add_transaction(&mut self, transaction: Transaction) -> &mut Transaction {
        self.transactions.push(transaction);
        let last = self.transactions.len() - 1;
        &mut self.transactions[last]
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn transaction_mut(&mut self, id: &str) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|t| t.id == id)
    }

    /// Detach a transaction. Link cleanup is up to the owning container.
    pub fn take_transaction(&mut self, id: &str) -> Option<Transaction> {
        let index = self.transactions.iter().position(|t| t.id == id)?;
        Some(self.transactions.remove(index))
    }
}

impl Serializable for Account {
    fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
        SerializationAccessor::new()
            .with_scalar("id", &mut self.id)
            .with_scalar("name", &mut self.name)
            .with_flag("closed", &mut self.closed)
            .with_children("transaction", &mut self.transactions)
            .with_links(&mut self.links)
    }

    fn as_linkable(&self) -> Option<&dyn Linkable> {
        Some(self)
    }

    fn as_linkable_mut(&mut self) -> Option<&mut dyn Linkable> {
        Some(self)
    }
}

impl Linkable for Account {
    fn unique_id(&self) -> &str {
        &self.id
    }

    fn type_name(&self) -> &'static str {
        ACCOUNT_TYPE
    }

    fn links(&self) -> &LinkSet {
        &self.links
    }

    fn links_mut(&mut self) -> &mut LinkSet {
        &mut self.links
    }
}
