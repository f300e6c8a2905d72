// 📦 Serializable - the contract every persisted entity implements
//
// One required method (serialization_accessor) plus optional lifecycle
// hooks. Objects are walked through their accessors, so the same traversal
// serves the writer, the reader, registry collection and link maintenance.

use crate::accessor::{ChildKey, SerializationAccessor};
use crate::linkable::Linkable;
use crate::resolve::Resolver;
use std::fmt;

pub trait Serializable {
    /// Describe the persisted attributes of this instance.
    fn serialization_accessor(&mut self) -> SerializationAccessor<'_>;

    // ========================================================================
    // LIFECYCLE HOOKS
    // ========================================================================

    /// Called before reading, e.g. to clear lists or restore defaults
    fn prepare_read(&mut self) {}

    /// Called once the element has been fully read
    fn finished_read(&mut self) {}

    /// Called before writing, e.g. to turn live references into ids
    fn prepare_write(&mut self) {}

    fn finished_write(&mut self) {}

    /// Second pass of a load: turn stored ids into references. Only called
    /// on objects that stored at least one reference id during the read.
    fn finalize_pointers(&mut self, _resolver: &mut Resolver<'_>) {}

    // ========================================================================
    // CAPABILITIES
    // ========================================================================

    fn as_linkable(&self) -> Option<&dyn Linkable> {
        None
    }

    fn as_linkable_mut(&mut self) -> Option<&mut dyn Linkable> {
        None
    }
}

// ============================================================================
// OBJECT PATHS
// ============================================================================

/// One step down the tree: which child attribute, which child in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathStep {
    pub attribute: &'static str,
    pub key: ChildKey,
}

/// Location of an object relative to the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    steps: Vec<PathStep>,
}

impl ObjectPath {
    pub fn root() -> Self {
        ObjectPath::default()
    }

    pub fn push(&mut self, attribute: &'static str, key: ChildKey) {
        self.steps.push(PathStep { attribute, key });
    }

    pub fn pop(&mut self) -> Option<PathStep> {
        self.steps.pop()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "/");
        }
        for step in &self.steps {
            write!(f, "/{}[{}]", step.attribute, step.key)?;
        }
        Ok(())
    }
}

// ============================================================================
// TRAVERSAL
// ============================================================================

/// Depth-first, pre-order walk over `root` and every child object.
pub fn visit_mut(
    root: &mut dyn Serializable,
    visitor: &mut dyn FnMut(&ObjectPath, &mut dyn Serializable),
) {
    let mut path = ObjectPath::root();
    visit_inner(root, &mut path, visitor);
}

fn visit_inner(
    object: &mut dyn Serializable,
    path: &mut ObjectPath,
    visitor: &mut dyn FnMut(&ObjectPath, &mut dyn Serializable),
) {
    visitor(path, &mut *object);

    let mut accessor = object.serialization_accessor();
    for descriptor in accessor.descriptors_mut() {
        let attribute = descriptor.name();
        let Some(children) = descriptor.children_mut() else {
            continue;
        };
        for key in children.keys() {
            let step = key.clone();
            if let Some(child) = children.child_mut(&key) {
                path.push(attribute, step);
                visit_inner(child, path, visitor);
                path.pop();
            }
        }
    }
}

/// Run `action` on the object at `path`. Returns false if the path no
/// longer leads anywhere.
pub fn visit_path(
    root: &mut dyn Serializable,
    path: &[PathStep],
    action: &mut dyn FnMut(&mut dyn Serializable),
) -> bool {
    let Some((step, rest)) = path.split_first() else {
        action(root);
        return true;
    };

    let mut accessor = root.serialization_accessor();
    let Some(children) = accessor
        .find_mut(step.attribute)
        .and_then(|descriptor| descriptor.children_mut())
    else {
        return false;
    };
    match children.child_mut(&step.key) {
        Some(child) => visit_path(child, rest, action),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Default)]
    struct Node {
        label: String,
        kids: Vec<Node>,
        named: BTreeMap<String, Node>,
    }

    impl Serializable for Node {
        fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
            SerializationAccessor::new()
                .with_scalar("label", &mut self.label)
                .with_children("kid", &mut self.kids)
                .with_child_map("named", &mut self.named, "label")
        }
    }

    fn node(label: &str) -> Node {
        Node {
            label: label.to_string(),
            ..Node::default()
        }
    }

    fn sample_tree() -> Node {
        let mut root = node("root");
        let mut a = node("a");
        a.kids.push(node("a0"));
        root.kids.push(a);
        root.kids.push(node("b"));
        root.named.insert("z".to_string(), node("z"));
        root
    }

    #[test]
    fn test_visit_is_preorder_with_paths() {
        let mut root = sample_tree();
        let mut seen = Vec::new();
        visit_mut(&mut root, &mut |path, _object| seen.push(path.to_string()));

        assert_eq!(
            seen,
            vec!["/", "/kid[0]", "/kid[0]/kid[0]", "/kid[1]", "/named[\"z\"]"]
        );
    }

    #[test]
    fn test_visit_path_reaches_nested_object() {
        let mut root = sample_tree();
        let mut path = ObjectPath::root();
        path.push("kid", ChildKey::Index(0));
        path.push("kid", ChildKey::Index(0));

        let found = visit_path(&mut root, path.steps(), &mut |object| {
            let mut accessor = object.serialization_accessor();
            accessor
                .find_mut("label")
                .unwrap()
                .set(crate::value::Value::Scalar("renamed".to_string()))
                .unwrap();
        });

        assert!(found);
        assert_eq!(root.kids[0].kids[0].label, "renamed");
    }

    #[test]
    fn test_visit_path_missing_child() {
        let mut root = sample_tree();
        let mut path = ObjectPath::root();
        path.push("kid", ChildKey::Index(7));
        assert!(!visit_path(&mut root, path.steps(), &mut |_| {}));

        let mut path = ObjectPath::root();
        path.push("nope", ChildKey::Index(0));
        assert!(!visit_path(&mut root, path.steps(), &mut |_| {}));
    }
}
