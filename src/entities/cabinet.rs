// 🗄️ Cabinet - the document root
//
// <cabinet>
//   <wallet> accounts, groups, filters, categories, tags </wallet>
//   <document id=".." kind="invoice" file="..."> links </document>
// </cabinet>
//
// Links may cross from documents into the wallet, so link maintenance on
// removal runs over the whole cabinet.

use super::account::Account;
use super::document::Document;
use super::transaction::Transaction;
use super::wallet::Wallet;
use crate::accessor::SerializationAccessor;
use crate::config::{ReaderConfig, WriterConfig};
use crate::error::{LoadReport, ReadError, WriteError};
use crate::linkable::{link_entities, sever_links, unlink_entities, EntityRef, LinkGraph, Linkable};
use crate::persist::{self, Loaded};
use crate::reader::DocumentReader;
use crate::serializable::Serializable;
use std::path::Path;

pub const CABINET_ROOT: &str = "cabinet";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cabinet {
    pub wallet: Wallet,
    pub documents: Vec<Document>,
}

impl Cabinet {
    pub fn new() -> Self {
        Cabinet::default()
    }

    // ========================================================================
    // LOAD / SAVE
    // ========================================================================

    pub fn load_str(input: &str) -> Result<(Cabinet, LoadReport), ReadError> {
        let mut reader = DocumentReader::new(ReaderConfig::default());
        let loaded = Self::load_with(input, &mut reader)?;
        Ok((loaded.object, loaded.report))
    }

    /// Load with a configured reader (progress hook, link repair)
    pub fn load_with(input: &str, reader: &mut DocumentReader<'_>) -> Result<Loaded<Cabinet>, ReadError> {
        persist::load_str(input, CABINET_ROOT, reader)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<(Cabinet, LoadReport), ReadError> {
        let mut reader = DocumentReader::new(ReaderConfig::default());
        let loaded = persist::load_file(path, CABINET_ROOT, &mut reader)?;
        Ok((loaded.object, loaded.report))
    }

    pub fn save_string(&mut self, config: &WriterConfig) -> Result<String, WriteError> {
        persist::save_string(self, CABINET_ROOT, config)
    }

    pub fn save_file(&mut self, path: impl AsRef<Path>, config: &WriterConfig) -> Result<(), WriteError> {
        persist::save_file(path, self, CABINET_ROOT, config)
    }

    // ========================================================================
    // DOCUMENTS
    // ========================================================================

    pub fn add_document(&mut self, document: Document) -> EntityRef {
        let key = document.entity_ref();
        self.documents.push(document);
        key
    }

    pub fn named_document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn remove_document(&mut self, id: &str) -> Option<Document> {
        let index = self.documents.iter().position(|d| d.id == id)?;
        let document = self.documents.remove(index);
        sever_links(self, &document.entity_ref());
        Some(document)
    }

    /// Remove an account with its transactions. Every link to any of them
    /// is severed, documents included.
    pub fn remove_account(&mut self, id: &str) -> Option<Account> {
        let account = self.wallet.remove_account(id)?;
        sever_links(self, &account.entity_ref());
        for transaction in &account.transactions {
            sever_links(self, &transaction.entity_ref());
        }
        Some(account)
    }

    /// Remove a transaction and every link to it, documents included
    pub fn remove_transaction(&mut self, id: &str) -> Option<Transaction> {
        let transaction = self.wallet.remove_transaction(id)?;
        sever_links(self, &transaction.entity_ref());
        Some(transaction)
    }

    // ========================================================================
    // LINKS
    // ========================================================================

    pub fn link(&mut self, a: &EntityRef, b: &EntityRef) -> bool {
        link_entities(self, a, b)
    }

    pub fn unlink(&mut self, a: &EntityRef, b: &EntityRef) -> bool {
        unlink_entities(self, a, b)
    }

    pub fn link_graph(&mut self) -> LinkGraph {
        LinkGraph::collect(self)
    }
}

impl Serializable for Cabinet {
    fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
        SerializationAccessor::new()
            .with_child("wallet", &mut self.wallet)
            .with_children("document", &mut self.documents)
    }

    fn prepare_read(&mut self) {
        self.documents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::account::{Account, ACCOUNT_TYPE};
    use crate::entities::account_group::AccountGroup;
    use crate::entities::category::Category;
    use crate::entities::filter::Filter;
    use crate::entities::tag::Tag;
    use crate::error::LoadIssue;
    use chrono::NaiveDate;
    use std::ops::ControlFlow;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn sample() -> Cabinet {
        let mut cabinet = Cabinet::new();
        let wallet = &mut cabinet.wallet;

        let checking = wallet.add_account(Account::new("A1", "Checking"));
        let mut rent = Transaction::new(date(1), -90_000, "Rent");
        rent.memo = "June\nincludes parking".to_string();
        rent.category = "Home:Rent".to_string();
        rent.add_tag("fixed");
        checking.add_transaction(rent);
        checking.add_transaction(Transaction::new(date(3), -450, "Coffee"));

        let mut savings = Account::new("A2", "Savings");
        savings.closed = true;
        wallet.add_account(savings);

        let mut group = AccountGroup::new("Everyday");
        group.add_account(wallet.named_account("A1").unwrap());
        wallet.add_group(group);

        let mut old = Filter::new("Old coffee").with_pattern("coffee");
        old.active = false;
        wallet.add_filter(old);
        wallet.add_category("Home:Rent");
        wallet.add_tag(Tag::new("fixed"));

        let lease = cabinet.add_document(Document::new("contract", "lease.pdf"));
        let rent_ref = cabinet.wallet.accounts[0].transactions[0].entity_ref();
        assert!(cabinet.link(&lease, &rent_ref));
        cabinet
    }

    #[test]
    fn test_cabinet_round_trip() {
        let mut original = sample();
        let xml = original.save_string(&WriterConfig::default()).unwrap();
        let (loaded, report) = Cabinet::load_str(&xml).unwrap();

        assert!(report.is_clean(), "{}", report.summary());
        assert_eq!(loaded.wallet.accounts, original.wallet.accounts);
        assert_eq!(loaded.wallet.filters, original.wallet.filters);
        assert_eq!(loaded.wallet.categories, original.wallet.categories);
        assert_eq!(loaded.wallet.tags, original.wallet.tags);
        assert_eq!(loaded.documents, original.documents);
        assert_eq!(loaded.wallet.groups[0].accounts(), original.wallet.groups[0].accounts());
    }

    #[test]
    fn test_group_with_missing_account() {
        let xml = r#"<cabinet><wallet>
              <account id="A1" name="Checking"/>
              <group name="G1"><account id="A1"/><account id="A2"/></group>
            </wallet></cabinet>"#;

        let (cabinet, report) = Cabinet::load_str(xml).unwrap();
        let group = cabinet.wallet.group("G1").unwrap();
        assert_eq!(group.accounts(), [Some(EntityRef::new(ACCOUNT_TYPE, "A1")), None]);

        let unresolved = report.unresolved_references();
        assert_eq!(unresolved.len(), 1);
        assert!(matches!(
            unresolved[0],
            LoadIssue::UnresolvedReference { type_name, id, .. } if type_name == "account" && id == "A2"
        ));
    }

    #[test]
    fn test_reference_to_later_entity() {
        // The group comes first, its accounts after it
        let xml = r#"<cabinet><wallet>
              <group name="G1"><account id="A3"/></group>
              <account id="A3" name="Late"/>
            </wallet></cabinet>"#;

        let (cabinet, report) = Cabinet::load_str(xml).unwrap();
        assert!(report.is_clean());
        assert_eq!(
            cabinet.wallet.groups[0].accounts(),
            [Some(EntityRef::new(ACCOUNT_TYPE, "A3"))]
        );
    }

    #[test]
    fn test_links_before_their_targets() {
        let xml = r#"<cabinet>
              <wallet/>
              <document id="d1" kind="invoice"><link id="d2" type="document"/></document>
              <document id="d2" kind="receipt"><link id="d1" type="document"/></document>
            </cabinet>"#;

        let (mut cabinet, report) = Cabinet::load_str(xml).unwrap();
        assert!(report.is_clean());
        let d1 = cabinet.named_document("d1").unwrap().entity_ref();
        let d2 = cabinet.named_document("d2").unwrap().entity_ref();
        let graph = cabinet.link_graph();
        assert!(graph.is_linked(&d1, &d2));
        assert!(graph.is_symmetric());
    }

    #[test]
    fn test_dangling_and_one_sided_links() {
        let xml = r#"<cabinet>
              <wallet><account id="A1"/></wallet>
              <document id="d1">
                <link id="A1" type="account"/>
                <link id="ghost" type="transaction"/>
              </document>
            </cabinet>"#;

        let mut reader = DocumentReader::new(ReaderConfig::default());
        let loaded = Cabinet::load_with(xml, &mut reader).unwrap();
        assert_eq!(loaded.repaired_links, 1);
        assert_eq!(loaded.report.unresolved_references().len(), 1);

        let cabinet = loaded.object;
        let document = cabinet.named_document("d1").unwrap();
        assert_eq!(document.links().dangling(), 1);
        assert_eq!(document.links().targets().count(), 1);
        assert!(cabinet.wallet.named_account("A1").unwrap().is_linked_to(&document.entity_ref()));
    }

    #[test]
    fn test_link_repair_can_be_disabled() {
        let xml = r#"<cabinet><wallet><account id="A1"/></wallet>
              <document id="d1"><link id="A1" type="account"/></document></cabinet>"#;

        let config = ReaderConfig {
            repair_links: false,
            ..ReaderConfig::default()
        };
        let mut reader = DocumentReader::new(config);
        let loaded = Cabinet::load_with(xml, &mut reader).unwrap();
        assert_eq!(loaded.repaired_links, 0);
        assert!(loaded.object.wallet.accounts[0].links().is_empty());
    }

    #[test]
    fn test_partial_corruption() {
        let xml = r#"<cabinet><wallet>
              <account id="A1" name="Checking">
                <transaction id="t1" amount="lots" name="Broken" date="2024-06-01"/>
                <transaction id="t2" amount="125" name="Fine"/>
              </account>
              <newer-feature enabled="yes"/>
            </wallet></cabinet>"#;

        let (cabinet, report) = Cabinet::load_str(xml).unwrap();
        let broken = cabinet.wallet.named_transaction("t1").unwrap();
        assert_eq!(broken.amount, 0);
        assert_eq!(broken.name, "Broken");
        assert_eq!(broken.date, Some(date(1)));
        assert_eq!(cabinet.wallet.named_transaction("t2").unwrap().amount, 125);
        assert_eq!(report.len(), 1);
        assert_eq!(report.conversion_errors(), 1);
    }

    #[test]
    fn test_duplicate_ids_are_reported() {
        let xml = r#"<cabinet><wallet><account id="A1"/><account id="A1"/></wallet></cabinet>"#;
        let (_, report) = Cabinet::load_str(xml).unwrap();
        assert_eq!(
            report.issues,
            vec![LoadIssue::DuplicateId {
                type_name: "account".to_string(),
                id: "A1".to_string(),
            }]
        );
    }

    #[test]
    fn test_structural_error_aborts() {
        let err = Cabinet::load_str("<cabinet><wallet>").unwrap_err();
        assert!(matches!(err, ReadError::Truncated { element } if element == "wallet"));

        let err = Cabinet::load_str("<wallet/>").unwrap_err();
        assert!(matches!(err, ReadError::UnexpectedRoot { .. }));
    }

    #[test]
    fn test_remove_transaction_unlinks_documents() {
        let mut cabinet = sample();
        let rent = cabinet.wallet.accounts[0].transactions[0].id.clone();
        let lease = cabinet.documents[0].entity_ref();

        cabinet.remove_transaction(&rent).unwrap();
        assert!(cabinet.documents[0].links().is_empty());
        assert!(cabinet.link_graph().is_symmetric());
        assert!(cabinet.wallet.named_transaction(&rent).is_none());
        assert!(cabinet.remove_transaction(&rent).is_none());

        let removed = cabinet.remove_document(&lease.id).unwrap();
        assert_eq!(removed.file_name, "lease.pdf");
        assert!(cabinet.named_document(&lease.id).is_none());
    }

    #[test]
    fn test_remove_account_unlinks_documents() {
        let mut cabinet = sample();
        let checking = cabinet.wallet.named_account("A1").unwrap().entity_ref();
        let removed_refs: Vec<EntityRef> = cabinet.wallet.accounts[0]
            .transactions
            .iter()
            .map(|t| t.entity_ref())
            .chain(std::iter::once(checking.clone()))
            .collect();
        let receipt = cabinet.add_document(Document::new("receipt", "coffee.jpg"));
        let coffee = removed_refs[1].clone();
        assert!(cabinet.link(&receipt, &checking));
        assert!(cabinet.link(&receipt, &coffee));

        let removed = cabinet.remove_account("A1").unwrap();
        assert_eq!(removed.transactions.len(), 2);
        assert!(cabinet.remove_account("A1").is_none());

        let graph = cabinet.link_graph();
        for entity in &removed_refs {
            assert!(!graph.is_referenced(entity), "{} still linked", entity);
        }
        assert!(graph.is_symmetric());
        assert!(cabinet.documents.iter().all(|d| d.links().is_empty()));
        assert!(!cabinet.wallet.groups[0].contains("A1"));
    }

    #[test]
    fn test_unknown_content_must_still_nest() {
        let err = Cabinet::load_str("<cabinet><wallet/><future><a></b></future></cabinet>").unwrap_err();
        assert!(matches!(err, ReadError::MismatchedEnd { .. }));
    }

    #[test]
    fn test_repeated_category_is_reported() {
        let xml = r#"<cabinet><wallet>
              <category name="Food"><category name="Cafe"/></category>
              <category name="Food"/>
            </wallet></cabinet>"#;

        let (cabinet, report) = Cabinet::load_str(xml).unwrap();
        assert!(cabinet.wallet.category("Food:Cafe").is_some());
        assert_eq!(
            report.issues,
            vec![LoadIssue::DuplicateKey {
                element: "category".to_string(),
                key: "Food".to_string(),
            }]
        );
    }

    #[test]
    fn test_repeated_document_links_collapse() {
        let xml = r#"<cabinet><wallet><account id="A1"/></wallet>
              <document id="d1"><link id="A1" type="account"/><link id="A1" type="account"/></document>
            </cabinet>"#;

        let (mut cabinet, report) = Cabinet::load_str(xml).unwrap();
        assert!(report.is_clean());
        assert_eq!(cabinet.named_document("d1").unwrap().links().len(), 1);

        let saved = cabinet.save_string(&WriterConfig::default()).unwrap();
        assert_eq!(saved.matches("<link ").count(), 2);
    }

    #[test]
    fn test_unlink() {
        let mut cabinet = sample();
        let rent = cabinet.wallet.accounts[0].transactions[0].entity_ref();
        let lease = cabinet.documents[0].entity_ref();
        assert!(cabinet.unlink(&rent, &lease));
        assert_eq!(cabinet.link_graph().edge_count(), 0);
    }

    #[test]
    fn test_reading_replaces_wallet_contents() {
        let mut cabinet = sample();
        let xml = r#"<cabinet><wallet><account id="Z9"/></wallet></cabinet>"#;
        let mut reader = DocumentReader::new(ReaderConfig::default());
        reader.read_into(xml, CABINET_ROOT, &mut cabinet).unwrap();

        assert_eq!(cabinet.wallet.accounts.len(), 1);
        assert!(cabinet.wallet.groups.is_empty());
        assert!(cabinet.documents.is_empty());
    }

    #[test]
    fn test_file_round_trip_with_progress() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cabinet.xml");
        let mut original = sample();
        for i in 0..50 {
            original.wallet.accounts[1].add_transaction(Transaction::new(date(10), i, format!("Interest {}", i)));
        }
        original.save_file(&path, &WriterConfig::default()).unwrap();

        let input = std::fs::read_to_string(&path).unwrap();
        let mut fractions = Vec::new();
        {
            let mut reader = DocumentReader::new(ReaderConfig::default()).with_progress(|f| {
                fractions.push(f);
                ControlFlow::Continue(())
            });
            let loaded = Cabinet::load_with(&input, &mut reader).unwrap();
            assert_eq!(loaded.object.wallet.transaction_count(), 52);
        }
        assert!(!fractions.is_empty());
        assert!(fractions.len() <= 100);

        let (from_file, report) = Cabinet::load_file(&path).unwrap();
        assert!(report.is_clean());
        assert_eq!(from_file.wallet.accounts, original.wallet.accounts);

        let missing = Cabinet::load_file(dir.path().join("missing.xml"));
        assert!(matches!(missing, Err(ReadError::Io(_))));
    }

    #[test]
    fn test_empty_category_map_survives() {
        let mut cabinet = Cabinet::new();
        cabinet
            .wallet
            .categories
            .insert("Misc".to_string(), Category::new("Misc"));
        let xml = cabinet.save_string(&WriterConfig::default()).unwrap();
        let (loaded, _) = Cabinet::load_str(&xml).unwrap();
        assert!(loaded.wallet.category("Misc").is_some());
    }
}
