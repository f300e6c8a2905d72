// 🧩 Reference Resolution - second pass of a load
//
// During the read, reference attributes only store identifiers and the
// reader notes which objects did so (by path from the root). Once the whole
// document is in memory, every noted object gets exactly one
// finalize_pointers call, in document order, with a Resolver that looks
// identifiers up in a Registry.
//
// A miss is never fatal: the reference stays absent and the miss is
// recorded in the LoadReport.

use crate::error::{LoadIssue, LoadReport};
use crate::linkable::EntityRef;
use crate::serializable::{visit_mut, visit_path, ObjectPath, Serializable};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

// ============================================================================
// REGISTRY
// ============================================================================

/// Maps (type name, identifier) to an entity address.
pub trait Registry {
    fn lookup(&self, type_name: &str, id: &str) -> Option<EntityRef>;
}

/// Closures work as ad-hoc registries.
impl<F> Registry for F
where
    F: Fn(&str, &str) -> Option<EntityRef>,
{
    fn lookup(&self, type_name: &str, id: &str) -> Option<EntityRef> {
        self(type_name, id)
    }
}

/// Registry built from the Linkable entities of a loaded tree.
#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl IdRegistry {
    pub fn new() -> Self {
        IdRegistry::default()
    }

    /// Returns false if the identifier was already taken for this type.
    pub fn register(&mut self, entity: EntityRef) -> bool {
        self.entries
            .entry(entity.type_name)
            .or_default()
            .insert(entity.id)
    }

    /// Register every Linkable under `root`. Entities without an id are
    /// skipped; a repeated id is recorded as a DuplicateId issue and the
    /// first occurrence wins.
    pub fn collect(root: &mut dyn Serializable, report: &mut LoadReport) -> Self {
        let mut registry = IdRegistry::new();
        visit_mut(root, &mut |_, object| {
            let Some(linkable) = object.as_linkable() else {
                return;
            };
            let entity = linkable.entity_ref();
            if entity.id.is_empty() {
                return;
            }
            if !registry.register(entity.clone()) {
                warn!(entity = %entity, "duplicate identifier");
                report.record(LoadIssue::DuplicateId {
                    type_name: entity.type_name,
                    id: entity.id,
                });
            }
        });
        debug!(entities = registry.len(), "registry collected");
        registry
    }

    pub fn contains(&self, type_name: &str, id: &str) -> bool {
        self.entries
            .get(type_name)
            .map_or(false, |ids| ids.contains(id))
    }

    pub fn count_of(&self, type_name: &str) -> usize {
        self.entries.get(type_name).map_or(0, BTreeSet::len)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Registry for IdRegistry {
    fn lookup(&self, type_name: &str, id: &str) -> Option<EntityRef> {
        if self.contains(type_name, id) {
            Some(EntityRef::new(type_name, id))
        } else {
            None
        }
    }
}

// ============================================================================
// PENDING REFERENCES
// ============================================================================

/// Identifiers one object stored for one reference attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReference {
    pub owner: ObjectPath,
    pub attribute: &'static str,
    pub ids: Vec<String>,
}

/// Everything the read pass deferred, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingReferences {
    entries: Vec<PendingReference>,
}

impl PendingReferences {
    pub fn new() -> Self {
        PendingReferences::default()
    }

    pub fn record(&mut self, owner: &ObjectPath, attribute: &'static str, id: &str) {
        if let Some(last) = self.entries.last_mut() {
            if &last.owner == owner && last.attribute == attribute {
                last.ids.push(id.to_string());
                return;
            }
        }
        self.entries.push(PendingReference {
            owner: owner.clone(),
            attribute,
            ids: vec![id.to_string()],
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingReference> {
        self.entries.iter()
    }

    /// Objects to finalize, each once, in the order first seen
    pub fn owners(&self) -> Vec<&ObjectPath> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|entry| &entry.owner)
            .filter(|owner| seen.insert(*owner))
            .collect()
    }

    /// Total number of stored identifiers
    pub fn id_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.ids.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Handed to `finalize_pointers`: looks ids up and records misses.
pub struct Resolver<'r> {
    registry: &'r dyn Registry,
    report: &'r mut LoadReport,
    owner: String,
    resolved: usize,
    unresolved: usize,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r dyn Registry, report: &'r mut LoadReport, owner: impl Into<String>) -> Self {
        Resolver {
            registry,
            report,
            owner: owner.into(),
            resolved: 0,
            unresolved: 0,
        }
    }

    /// An empty id means "no reference" and resolves to `None` silently.
    pub fn resolve(&mut self, type_name: &str, id: &str) -> Option<EntityRef> {
        if id.is_empty() {
            return None;
        }
        match self.registry.lookup(type_name, id) {
            Some(found) => {
                self.resolved += 1;
                Some(found)
            }
            None => {
                warn!(owner = %self.owner, type_name, id, "unresolved reference");
                self.unresolved += 1;
                self.report.record(LoadIssue::UnresolvedReference {
                    owner: self.owner.clone(),
                    type_name: type_name.to_string(),
                    id: id.to_string(),
                });
                None
            }
        }
    }

    /// Resolve a list of ids, keeping positions (misses become `None`)
    pub fn resolve_all(&mut self, type_name: &str, ids: &[String]) -> Vec<Option<EntityRef>> {
        ids.iter().map(|id| self.resolve(type_name, id)).collect()
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

// ============================================================================
// RESOLUTION PASS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionSummary {
    /// Objects that got their finalize_pointers call
    pub finalized: usize,
    pub resolved: usize,
    pub unresolved: usize,
    /// Pending owners whose path no longer exists
    pub lost: usize,
}

/// Call `finalize_pointers` once on every object that stored a reference,
/// in the order the reader met them.
pub fn resolve_references(
    root: &mut dyn Serializable,
    pending: &PendingReferences,
    registry: &dyn Registry,
    report: &mut LoadReport,
) -> ResolutionSummary {
    let mut summary = ResolutionSummary::default();

    for owner in pending.owners() {
        let mut resolver = Resolver::new(registry, &mut *report, owner.to_string());
        let found = visit_path(root, owner.steps(), &mut |object| {
            object.finalize_pointers(&mut resolver);
        });

        if found {
            summary.finalized += 1;
            summary.resolved += resolver.resolved;
            summary.unresolved += resolver.unresolved;
        } else {
            debug!(owner = %owner, "pending owner vanished before resolution");
            summary.lost += 1;
        }
    }

    debug!(
        finalized = summary.finalized,
        resolved = summary.resolved,
        unresolved = summary.unresolved,
        "references resolved"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{ChildKey, SerializationAccessor};

    #[derive(Debug, Default)]
    struct Pointer {
        target_id: String,
        target: Option<EntityRef>,
        finalized: usize,
    }

    impl Serializable for Pointer {
        fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
            SerializationAccessor::new().with_reference("target", &mut self.target_id)
        }

        fn finalize_pointers(&mut self, resolver: &mut Resolver<'_>) {
            self.finalized += 1;
            self.target = resolver.resolve("account", &self.target_id);
        }
    }

    #[derive(Debug, Default)]
    struct Holder {
        pointers: Vec<Pointer>,
    }

    impl Serializable for Holder {
        fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
            SerializationAccessor::new().with_children("pointer", &mut self.pointers)
        }
    }

    fn pointer_path(index: usize) -> ObjectPath {
        let mut path = ObjectPath::root();
        path.push("pointer", ChildKey::Index(index));
        path
    }

    fn accounts(ids: &[&str]) -> IdRegistry {
        let mut registry = IdRegistry::new();
        for id in ids {
            registry.register(EntityRef::new("account", *id));
        }
        registry
    }

    #[test]
    fn test_pending_groups_by_owner() {
        let mut pending = PendingReferences::new();
        pending.record(&pointer_path(0), "target", "A1");
        pending.record(&pointer_path(0), "target", "A2");
        pending.record(&pointer_path(1), "target", "A3");
        pending.record(&pointer_path(0), "other", "A4");

        assert_eq!(pending.len(), 3);
        assert_eq!(pending.id_count(), 4);
        assert_eq!(pending.owners(), vec![&pointer_path(0), &pointer_path(1)]);
    }

    #[test]
    fn test_finalize_once_per_owner() {
        let mut holder = Holder::default();
        holder.pointers.push(Pointer {
            target_id: "A1".to_string(),
            ..Pointer::default()
        });
        holder.pointers.push(Pointer {
            target_id: "A9".to_string(),
            ..Pointer::default()
        });
        holder.pointers.push(Pointer::default());

        let mut pending = PendingReferences::new();
        pending.record(&pointer_path(0), "target", "A1");
        pending.record(&pointer_path(1), "target", "A9");
        pending.record(&pointer_path(0), "other", "A1");

        let mut report = LoadReport::new();
        let summary = resolve_references(&mut holder, &pending, &accounts(&["A1"]), &mut report);

        assert_eq!(summary.finalized, 2);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(holder.pointers[0].finalized, 1);
        assert_eq!(holder.pointers[0].target, Some(EntityRef::new("account", "A1")));
        assert_eq!(holder.pointers[1].target, None);
        // Never stored a reference, never finalized
        assert_eq!(holder.pointers[2].finalized, 0);

        assert_eq!(report.unresolved_references().len(), 1);
        assert!(report.issues.iter().any(|issue| matches!(
            issue,
            LoadIssue::UnresolvedReference { id, owner, .. } if id == "A9" && owner == "/pointer[1]"
        )));
    }

    #[test]
    fn test_lost_owner() {
        let mut holder = Holder::default();
        let mut pending = PendingReferences::new();
        pending.record(&pointer_path(3), "target", "A1");

        let mut report = LoadReport::new();
        let summary = resolve_references(&mut holder, &pending, &accounts(&["A1"]), &mut report);
        assert_eq!(summary.lost, 1);
        assert_eq!(summary.finalized, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn test_empty_id_is_silent() {
        let registry = accounts(&[]);
        let mut report = LoadReport::new();
        let mut resolver = Resolver::new(&registry, &mut report, "/");
        assert_eq!(resolver.resolve("account", ""), None);
        assert_eq!(resolver.owner(), "/");
        assert!(report.is_clean());
    }

    #[test]
    fn test_closure_registry() {
        let registry = |type_name: &str, id: &str| {
            (type_name == "account" && id.starts_with('A')).then(|| EntityRef::new(type_name, id))
        };
        let mut report = LoadReport::new();
        let mut resolver = Resolver::new(&registry, &mut report, "/");
        let ids = vec!["A1".to_string(), "B2".to_string()];
        let found = resolver.resolve_all("account", &ids);
        assert_eq!(found, vec![Some(EntityRef::new("account", "A1")), None]);
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_registry_counts() {
        let mut registry = accounts(&["A1", "A2"]);
        assert!(!registry.register(EntityRef::new("account", "A1")));
        assert!(registry.register(EntityRef::new("document", "A1")));
        assert_eq!(registry.count_of("account"), 2);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("document", "A1"));
        assert!(registry.lookup("transaction", "A1").is_none());
    }
}
