// 👛 Wallet - owns accounts, groups, filters, categories and tags
//
// The wallet controls destruction of what it owns: removing an account or
// a transaction through the wallet also severs every link pointing at it.

use super::account::Account;
use super::account_group::AccountGroup;
use super::category::{Category, PATH_SEPARATOR};
use super::filter::Filter;
use super::tag::Tag;
use super::transaction::Transaction;
use crate::accessor::SerializationAccessor;
use crate::linkable::{sever_links, Linkable};
use crate::serializable::Serializable;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wallet {
    pub accounts: Vec<Account>,
    pub groups: Vec<AccountGroup>,
    pub filters: Vec<Filter>,
    pub categories: BTreeMap<String, Category>,
    pub tags: BTreeMap<String, Tag>,
}

impl Wallet {
    pub fn new() -> Self {
        Wallet::default()
    }

    // ========================================================================
    // ACCOUNTS & TRANSACTIONS
    // ========================================================================

    pub fn add_account(&mut self, account: Account) -> &mut Account {
        self.accounts.push(account);
        let last = self.accounts.len() - 1;
        &mut self.accounts[last]
    }

    pub fn named_account(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn named_account_mut(&mut self, id: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.id == id)
    }

    /// Search every account for a transaction id
    pub fn named_transaction(&self, id: &str) -> Option<&Transaction> {
        self.accounts.iter().find_map(|a| a.transaction(id))
    }

    pub fn named_transaction_mut(&mut self, id: &str) -> Option<&mut Transaction> {
        self.accounts.iter_mut().find_map(|a| a.transaction_mut(id))
    }

    pub fn transaction_count(&self) -> usize {
        self.accounts.iter().map(|a| a.transactions.len()).sum()
    }

    /// Remove an account with its transactions. Group memberships and links
    /// to any of them are dropped.
    pub fn remove_account(&mut self, id: &str) -> Option<Account> {
        let index = self.accounts.iter().position(|a| a.id == id)?;
        let account = self.accounts.remove(index);

        for group in &mut self.groups {
            group.remove_account(id);
        }
        sever_links(self, &account.entity_ref());
        for transaction in &account.transactions {
            sever_links(self, &transaction.entity_ref());
        }
        Some(account)
    }

    /// Remove a transaction from whichever account holds it, severing its
    /// links inside the wallet.
    pub fn remove_transaction(&mut self, id: &str) -> Option<Transaction> {
        let transaction = self
            .accounts
            .iter_mut()
            .find_map(|a| a.take_transaction(id))?;
        sever_links(self, &transaction.entity_ref());
        Some(transaction)
    }

    // ========================================================================
    // GROUPS & FILTERS
    // ========================================================================

    pub fn add_group(&mut self, group: AccountGroup) -> &mut AccountGroup {
        self.groups.push(group);
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }

    pub fn group(&self, name: &str) -> Option<&AccountGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn add_filter(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn active_filters(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter().filter(|f| f.active)
    }

    // ========================================================================
    // CATEGORIES & TAGS
    // ========================================================================

    /// Get or create a category by full path ("Food:Groceries")
    pub fn add_category(&mut self, path: &str) -> &mut Category {
        let mut names = path.split(PATH_SEPARATOR);
        let top = names.next().unwrap_or_default();
        let mut current = self
            .categories
            .entry(top.to_string())
            .or_insert_with(|| Category::new(top));
        for name in names {
            current = current.add_sub_category(name);
        }
        current
    }

    pub fn category(&self, path: &str) -> Option<&Category> {
        let (top, rest) = match path.split_once(PATH_SEPARATOR) {
            Some((top, rest)) => (top, Some(rest)),
            None => (path, None),
        };
        let top = self.categories.get(top)?;
        match rest {
            Some(rest) => top.find(rest),
            None => Some(top),
        }
    }

    pub fn add_tag(&mut self, tag: Tag) {
        self.tags.insert(tag.name.clone(), tag);
    }

    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }
}

impl Serializable for Wallet {
    fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
        SerializationAccessor::new()
            .with_children("account", &mut self.accounts)
            .with_children("group", &mut self.groups)
            .with_children("filter", &mut self.filters)
            .with_child_map("category", &mut self.categories, "name")
            .with_child_map("tag", &mut self.tags, "name")
    }

    /// The wallet is embedded, so reading goes into an existing instance
    fn prepare_read(&mut self) {
        *self = Wallet::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkable::{link_entities, LinkGraph};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    fn sample() -> (Wallet, String, String) {
        let mut wallet = Wallet::new();
        let account = wallet.add_account(Account::new("A1", "Checking"));
        let rent = account.add_transaction(Transaction::new(date(), -90_000, "Rent")).id.clone();
        let refund = account.add_transaction(Transaction::new(date(), 5_000, "Refund")).id.clone();
        wallet.add_account(Account::new("A2", "Savings"));
        (wallet, rent, refund)
    }

    #[test]
    fn test_lookups() {
        let (wallet, rent, _) = sample();
        assert_eq!(wallet.named_account("A2").unwrap().name, "Savings");
        assert_eq!(wallet.named_transaction(&rent).unwrap().amount, -90_000);
        assert!(wallet.named_transaction("nope").is_none());
        assert_eq!(wallet.transaction_count(), 2);
    }

    #[test]
    fn test_remove_transaction_severs_links() {
        let (mut wallet, rent, refund) = sample();
        let rent_ref = wallet.named_transaction(&rent).unwrap().entity_ref();
        let refund_ref = wallet.named_transaction(&refund).unwrap().entity_ref();
        assert!(link_entities(&mut wallet, &rent_ref, &refund_ref));

        let removed = wallet.remove_transaction(&rent).unwrap();
        assert_eq!(removed.name, "Rent");
        assert!(wallet.named_transaction(&refund).unwrap().links().is_empty());
        assert!(!LinkGraph::collect(&mut wallet).is_referenced(&rent_ref));
    }

    #[test]
    fn test_remove_account_cleans_groups_and_links() {
        let (mut wallet, rent, _) = sample();
        let mut group = AccountGroup::new("All");
        group.add_account(wallet.named_account("A1").unwrap());
        group.add_account(wallet.named_account("A2").unwrap());
        wallet.add_group(group);

        let rent_ref = wallet.named_transaction(&rent).unwrap().entity_ref();
        let savings = wallet.named_account("A2").unwrap().entity_ref();
        link_entities(&mut wallet, &rent_ref, &savings);

        let removed = wallet.remove_account("A1").unwrap();
        assert_eq!(removed.transactions.len(), 2);
        assert!(!wallet.group("All").unwrap().contains("A1"));
        assert!(wallet.named_account("A2").unwrap().links().is_empty());
    }

    #[test]
    fn test_category_paths() {
        let mut wallet = Wallet::new();
        wallet.add_category("Food:Groceries");
        wallet.add_category("Food:Cafe");
        wallet.add_category("Travel");

        assert_eq!(wallet.categories.len(), 2);
        assert_eq!(wallet.category("Food:Cafe").unwrap().name, "Cafe");
        assert!(wallet.category("Food").is_some());
        assert!(wallet.category("Food:Bakery").is_none());
        assert!(wallet.category("Home").is_none());
    }

    #[test]
    fn test_active_filters() {
        let mut wallet = Wallet::new();
        wallet.add_filter(Filter::new("On"));
        let mut off = Filter::new("Off");
        off.active = false;
        wallet.add_filter(off);
        wallet.add_tag(Tag::new("household"));

        let names: Vec<_> = wallet.active_filters().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["On"]);
        assert!(wallet.tag("household").is_some());
    }
}
