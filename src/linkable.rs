// 🔗 Link Graph - symmetric links between addressable entities
//
// A Linkable entity has a stable address (type name + unique id) and a set
// of links to other addresses. Links are keyed by address, never by memory
// location, so no entity owns another through a link.
//
// Symmetry is structural: the link set cannot be mutated from outside this
// module, and every public operation touches both endpoints.

use crate::accessor::{ChildKey, ChildSlot, SerializationAccessor};
use crate::resolve::Resolver;
use crate::serializable::{visit_mut, Serializable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Element name used for each stored link
pub const LINK_ELEMENT: &str = "link";

// ============================================================================
// ENTITY ADDRESS
// ============================================================================

/// Address of an entity: which registry (type name) and which id in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub type_name: String,
    pub id: String,
}

impl EntityRef {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        EntityRef {
            type_name: type_name.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.id)
    }
}

// ============================================================================
// LINK
// ============================================================================

/// One stored edge end. Links read from a document stay dangling until
/// the resolution pass finds their target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    target: EntityRef,
    dangling: bool,
}

impl Link {
    /// The target, or `None` when it could not be resolved
    pub fn target(&self) -> Option<&EntityRef> {
        if self.dangling {
            None
        } else {
            Some(&self.target)
        }
    }

    /// Address as stored, resolved or not
    pub fn stored_target(&self) -> &EntityRef {
        &self.target
    }

    pub fn is_dangling(&self) -> bool {
        self.dangling
    }
}

impl Serializable for Link {
    fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
        SerializationAccessor::new()
            .with_reference("id", &mut self.target.id)
            .with_scalar("type", &mut self.target.type_name)
    }

    fn prepare_read(&mut self) {
        self.dangling = true;
    }

    fn finalize_pointers(&mut self, resolver: &mut Resolver<'_>) {
        self.dangling = resolver
            .resolve(&self.target.type_name, &self.target.id)
            .is_none();
    }
}

// ============================================================================
// LINK SET
// ============================================================================

/// Links of one entity, without duplicates, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSet {
    links: Vec<Link>,
}

impl LinkSet {
    pub fn new() -> Self {
        LinkSet::default()
    }

    pub fn contains(&self, target: &EntityRef) -> bool {
        self.links.iter().any(|l| &l.target == target)
    }

    /// Resolved targets
    pub fn targets(&self) -> impl Iterator<Item = &EntityRef> {
        self.links.iter().filter_map(Link::target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn dangling(&self) -> usize {
        self.links.iter().filter(|l| l.dangling).count()
    }

    /// Resolved targets of one type
    pub fn of_type<'s>(&'s self, type_name: &'s str) -> impl Iterator<Item = &'s EntityRef> + 's {
        self.targets().filter(move |t| t.type_name == type_name)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn insert(&mut self, target: EntityRef) -> bool {
        if let Some(existing) = self.links.iter_mut().find(|l| l.target == target) {
            existing.dangling = false;
            return false;
        }
        self.links.push(Link {
            target,
            dangling: false,
        });
        true
    }

    fn remove(&mut self, target: &EntityRef) -> bool {
        let before = self.links.len();
        self.links.retain(|l| &l.target != target);
        self.links.len() != before
    }
}

/// Child slot over the links of one set. A link read with a target that is
/// already present is dropped, so repeated `<link>` elements collapse.
struct LinkSlot<'a>(&'a mut Vec<Link>);

impl LinkSlot<'_> {
    fn drop_repeated_last(&mut self) {
        let Some((last, earlier)) = self.0.split_last() else {
            return;
        };
        if earlier.iter().any(|l| l.target == last.target) {
            tracing::debug!(link = %last.target, "dropping repeated link");
            self.0.pop();
        }
    }
}

impl ChildSlot for LinkSlot<'_> {
    fn keys(&self) -> Vec<ChildKey> {
        (0..self.0.len()).map(ChildKey::Index).collect()
    }

    fn child_mut(&mut self, key: &ChildKey) -> Option<&mut dyn Serializable> {
        match key {
            ChildKey::Index(i) => self.0.get_mut(*i).map(|l| l as &mut dyn Serializable),
            ChildKey::Name(_) => None,
        }
    }

    // The previous link is complete by now; a repeat gives its index to the
    // new one.
    fn new_child(&mut self, _key: Option<String>) -> Option<(ChildKey, &mut dyn Serializable)> {
        self.drop_repeated_last();
        self.0.push(Link::default());
        let index = self.0.len() - 1;
        self.0
            .last_mut()
            .map(|l| (ChildKey::Index(index), l as &mut dyn Serializable))
    }

    fn finished_read(&mut self) {
        self.drop_repeated_last();
    }
}

impl<'a> SerializationAccessor<'a> {
    /// Builder: the link set, as a list of `<link id=".." type=".."/>`
    pub fn with_links(self, links: &'a mut LinkSet) -> Self {
        self.with_child_slot(LINK_ELEMENT, Box::new(LinkSlot(&mut links.links)))
    }
}

// ============================================================================
// LINKABLE
// ============================================================================

pub trait Linkable {
    /// Stable, unique within the type
    fn unique_id(&self) -> &str;

    /// Which registry resolves this entity
    fn type_name(&self) -> &'static str;

    fn links(&self) -> &LinkSet;

    fn links_mut(&mut self) -> &mut LinkSet;

    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.type_name(), self.unique_id())
    }

    /// Link both ways. No-op when `target` is `None` or is `self`.
    fn add_link(&mut self, target: Option<&mut dyn Linkable>) {
        let Some(target) = target else {
            return;
        };
        let me = self.entity_ref();
        let other = target.entity_ref();
        if me == other {
            return;
        }
        self.links_mut().insert(other);
        target.links_mut().insert(me);
    }

    /// Unlink both ways. Returns whether an edge existed on either side.
    fn remove_link(&mut self, target: &mut dyn Linkable) -> bool {
        let mine = self.links_mut().remove(&target.entity_ref());
        let theirs = target.links_mut().remove(&self.entity_ref());
        mine || theirs
    }

    fn is_linked_to(&self, target: &EntityRef) -> bool {
        self.links().contains(target)
    }
}

// ============================================================================
// TREE-WIDE OPERATIONS
// ============================================================================

fn addresses(root: &mut dyn Serializable) -> HashSet<EntityRef> {
    let mut found = HashSet::new();
    visit_mut(root, &mut |_, object| {
        if let Some(linkable) = object.as_linkable() {
            found.insert(linkable.entity_ref());
        }
    });
    found
}

/// Link two entities living anywhere under `root`. Returns false when
/// either one is missing or both are the same entity.
pub fn link_entities(root: &mut dyn Serializable, a: &EntityRef, b: &EntityRef) -> bool {
    if a == b {
        return false;
    }
    let known = addresses(root);
    if !known.contains(a) || !known.contains(b) {
        return false;
    }
    visit_mut(root, &mut |_, object| {
        if let Some(linkable) = object.as_linkable_mut() {
            let me = linkable.entity_ref();
            if &me == a {
                linkable.links_mut().insert(b.clone());
            } else if &me == b {
                linkable.links_mut().insert(a.clone());
            }
        }
    });
    true
}

/// Remove the edge between `a` and `b` on both sides.
pub fn unlink_entities(root: &mut dyn Serializable, a: &EntityRef, b: &EntityRef) -> bool {
    let mut removed = false;
    visit_mut(root, &mut |_, object| {
        if let Some(linkable) = object.as_linkable_mut() {
            let me = linkable.entity_ref();
            if &me == a {
                removed |= linkable.links_mut().remove(b);
            } else if &me == b {
                removed |= linkable.links_mut().remove(a);
            }
        }
    });
    removed
}

/// Drop every edge pointing at a destroyed entity. Returns the number of
/// peers that lost a link.
pub fn sever_links(root: &mut dyn Serializable, removed: &EntityRef) -> usize {
    let mut severed = 0;
    visit_mut(root, &mut |_, object| {
        if let Some(linkable) = object.as_linkable_mut() {
            if linkable.links_mut().remove(removed) {
                severed += 1;
            }
        }
    });
    if severed > 0 {
        tracing::debug!(entity = %removed, severed, "severed links");
    }
    severed
}

/// Add the reverse of every one-sided edge whose target exists. Returns
/// the number of edges added.
pub fn ensure_bidirectional_links(root: &mut dyn Serializable) -> usize {
    let graph = LinkGraph::collect(root);
    let mut missing: BTreeMap<EntityRef, Vec<EntityRef>> = BTreeMap::new();
    for (owner, targets) in &graph.adjacency {
        for target in targets {
            let reverse_known = graph
                .adjacency
                .get(target)
                .map_or(false, |back| back.contains(owner));
            if graph.adjacency.contains_key(target) && !reverse_known {
                missing.entry(target.clone()).or_default().push(owner.clone());
            }
        }
    }
    if missing.is_empty() {
        return 0;
    }

    let mut added = 0;
    visit_mut(root, &mut |_, object| {
        if let Some(linkable) = object.as_linkable_mut() {
            if let Some(owners) = missing.get(&linkable.entity_ref()) {
                for owner in owners {
                    if linkable.links_mut().insert(owner.clone()) {
                        added += 1;
                    }
                }
            }
        }
    });
    tracing::info!(added, "repaired one-sided links");
    added
}

// ============================================================================
// LINK GRAPH SNAPSHOT
// ============================================================================

/// Read-only adjacency view of all resolved links under a root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkGraph {
    adjacency: BTreeMap<EntityRef, BTreeSet<EntityRef>>,
}

impl LinkGraph {
    /// Every Linkable under `root` appears as a node, linked or not.
    pub fn collect(root: &mut dyn Serializable) -> Self {
        let mut adjacency = BTreeMap::new();
        visit_mut(root, &mut |_, object| {
            if let Some(linkable) = object.as_linkable() {
                let targets: BTreeSet<EntityRef> = linkable.links().targets().cloned().collect();
                adjacency
                    .entry(linkable.entity_ref())
                    .or_insert_with(BTreeSet::new)
                    .extend(targets);
            }
        });
        LinkGraph { adjacency }
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.adjacency.contains_key(entity)
    }

    pub fn neighbors(&self, entity: &EntityRef) -> impl Iterator<Item = &EntityRef> {
        self.adjacency.get(entity).into_iter().flatten()
    }

    pub fn is_linked(&self, a: &EntityRef, b: &EntityRef) -> bool {
        self.adjacency.get(a).map_or(false, |targets| targets.contains(b))
    }

    /// Whether every edge has its reverse. An edge to an entity that is
    /// not in the tree has none.
    pub fn is_symmetric(&self) -> bool {
        self.adjacency.iter().all(|(owner, targets)| {
            targets.iter().all(|target| {
                self.adjacency
                    .get(target)
                    .map_or(false, |back| back.contains(owner))
            })
        })
    }

    /// Whether any node still links to `entity`
    pub fn is_referenced(&self, entity: &EntityRef) -> bool {
        self.adjacency.values().any(|targets| targets.contains(entity))
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Undirected edges (each symmetric pair counts once)
    pub fn edge_count(&self) -> usize {
        let mut edges = BTreeSet::new();
        for (owner, targets) in &self.adjacency {
            for target in targets {
                let edge = if owner < target {
                    (owner, target)
                } else {
                    (target, owner)
                };
                edges.insert(edge);
            }
        }
        edges.len()
    }
}
