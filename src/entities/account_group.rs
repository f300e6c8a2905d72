// 🗂️ Account Group - a named selection of accounts
//
// The group does not own its accounts, the wallet does. On disk members are
// stored by account id; after a load they are resolved to account addresses
// in the resolution pass:
//
// <group name="Everyday">
//   <account id="A1"/>
//   <account id="A2"/>
// </group>

use super::account::{Account, ACCOUNT_TYPE};
use crate::accessor::SerializationAccessor;
use crate::linkable::{EntityRef, Linkable};
use crate::resolve::Resolver;
use crate::serializable::Serializable;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountGroup {
    pub name: String,

    /// Members after resolution, in stored order. `None` marks an id that
    /// matched no account.
    accounts: Vec<Option<EntityRef>>,

    /// Member ids as stored in the document
    account_ids: Vec<String>,

    /// Ids were read but not resolved yet
    unresolved: bool,
}

impl AccountGroup {
    pub fn new(name: impl Into<String>) -> Self {
        AccountGroup {
            name: name.into(),
            ..AccountGroup::default()
        }
    }

    pub fn add_account(&mut self, account: &Account) {
        self.adopt_stored_ids();
        let member = account.entity_ref();
        if !self.contains(&member.id) {
            self.accounts.push(Some(member));
        }
    }

    /// Drop a member. Returns whether it was present.
    pub fn remove_account(&mut self, id: &str) -> bool {
        self.adopt_stored_ids();
        let before = self.accounts.len();
        self.accounts
            .retain(|member| member.as_ref().map_or(true, |m| m.id != id));
        self.accounts.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.accounts.iter().flatten().any(|m| m.id == id)
    }

    pub fn accounts(&self) -> &[Option<EntityRef>] {
        &self.accounts
    }

    pub fn account_ids(&self) -> &[String] {
        &self.account_ids
    }

    /// Members whose id could not be resolved
    pub fn dangling(&self) -> usize {
        self.accounts.iter().filter(|m| m.is_none()).count()
    }

    /// Editing a group that was read but never resolved: take the stored
    /// ids as members, so the edit and the old members are both written.
    fn adopt_stored_ids(&mut self) {
        if !self.unresolved {
            return;
        }
        self.accounts = self
            .account_ids
            .iter()
            .filter(|id| !id.is_empty())
            .map(|id| Some(EntityRef::new(ACCOUNT_TYPE, id.as_str())))
            .collect();
        self.unresolved = false;
    }
}

impl Serializable for AccountGroup {
    fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
        SerializationAccessor::new()
            .with_scalar("name", &mut self.name)
            .with_references(ACCOUNT_TYPE, &mut self.account_ids, "id")
    }

    fn prepare_read(&mut self) {
        self.accounts.clear();
        self.account_ids.clear();
    }

    fn finished_read(&mut self) {
        self.unresolved = !self.account_ids.is_empty();
    }

    /// Dangling members are not written back
    fn prepare_write(&mut self) {
        if self.unresolved {
            return;
        }
        self.account_ids = self
            .accounts
            .iter()
            .flatten()
            .map(|member| member.id.clone())
            .collect();
    }

    fn finalize_pointers(&mut self, resolver: &mut Resolver<'_>) {
        self.accounts = resolver.resolve_all(ACCOUNT_TYPE, &self.account_ids);
        self.unresolved = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::DocumentReader;
    use crate::resolve::IdRegistry;
    use crate::writer::DocumentWriter;

    #[test]
    fn test_membership() {
        let a1 = Account::new("A1", "Checking");
        let a2 = Account::new("A2", "Savings");
        let mut group = AccountGroup::new("Everyday");
        group.add_account(&a1);
        group.add_account(&a2);
        group.add_account(&a1);

        assert_eq!(group.accounts().len(), 2);
        assert!(group.remove_account("A1"));
        assert!(!group.remove_account("A1"));
        assert!(group.contains("A2"));
    }

    #[test]
    fn test_write_uses_ids() {
        let mut group = AccountGroup::new("Everyday");
        group.add_account(&Account::new("A1", "Checking"));

        let xml = DocumentWriter::default().write_to_string(&mut group, "group").unwrap();
        assert!(xml.contains(r#"<account id="A1"/>"#));
        assert_eq!(group.account_ids(), ["A1".to_string()]);
    }

    #[test]
    fn test_missing_member_resolves_to_none() {
        let xml = r#"<group name="G1"><account id="A1"/><account id="A2"/></group>"#;
        let mut parsed = DocumentReader::default().read::<AccountGroup>(xml, "group").unwrap();
        assert_eq!(parsed.object.account_ids(), ["A1".to_string(), "A2".to_string()]);

        let mut registry = IdRegistry::new();
        registry.register(EntityRef::new(ACCOUNT_TYPE, "A1"));
        parsed.resolve_with(&registry);

        let (group, report) = parsed.into_parts();
        assert_eq!(
            group.accounts(),
            [Some(EntityRef::new(ACCOUNT_TYPE, "A1")), None]
        );
        assert_eq!(group.dangling(), 1);
        assert_eq!(report.unresolved_references().len(), 1);
    }

    #[test]
    fn test_unresolved_group_keeps_ids_on_write() {
        let xml = r#"<group name="G1"><account id="A9"/></group>"#;
        let mut parsed = DocumentReader::default().read::<AccountGroup>(xml, "group").unwrap();

        let rewritten = DocumentWriter::default()
            .write_to_string(&mut parsed.object, "group")
            .unwrap();
        assert!(rewritten.contains(r#"<account id="A9"/>"#));
    }

    #[test]
    fn test_edit_before_resolution_keeps_stored_members() {
        let xml = r#"<group name="G1"><account id="A9"/><account id="A8"/></group>"#;
        let mut parsed = DocumentReader::default().read::<AccountGroup>(xml, "group").unwrap();
        let group = &mut parsed.object;
        group.add_account(&Account::new("A1", "Checking"));
        assert!(group.remove_account("A8"));
        assert!(group.contains("A9"));

        let rewritten = DocumentWriter::default().write_to_string(group, "group").unwrap();
        assert!(rewritten.contains(r#"<account id="A9"/>"#));
        assert!(rewritten.contains(r#"<account id="A1"/>"#));
        assert!(!rewritten.contains(r#"<account id="A8"/>"#));
    }
}
