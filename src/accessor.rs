// 🧭 Serialization Accessor - per-instance attribute description
//
// An accessor is a hand-written mapping table, built fresh for one live
// object on every read or write: attribute name → descriptor borrowing the
// field. Reader and writer only ever see accessors, never concrete types.
//
//   Tag           → <tag name="groceries"/>
//   AccountGroup  → <group name="G1"><account id="A1"/>...</group>
//
// Insertion order is write order. Names are unique: adding a name twice
// replaces the first descriptor in place.

use crate::error::ConversionError;
use crate::serializable::Serializable;
use crate::value::{ScalarValue, Value};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// One value
    Scalar,
    /// Repeated sibling elements sharing one tag name
    ScalarList,
    /// Child objects, each described by its own accessor
    ChildList,
}

/// Where a scalar lives inside the owning element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `<owner name="value"/>`
    Attribute,
    /// `<owner><name>value</name></owner>`
    Element,
}

/// Address of one child inside a child attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildKey {
    Index(usize),
    Name(String),
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildKey::Index(i) => write!(f, "{}", i),
            ChildKey::Name(name) => write!(f, "{:?}", name),
        }
    }
}

// ============================================================================
// SLOTS (borrowed field handles)
// ============================================================================

/// Read/write access to one scalar field.
pub trait ScalarSlot {
    fn text(&self) -> Option<String>;
    fn assign(&mut self, text: &str) -> Result<(), ConversionError>;
}

/// Read/append access to a list of scalars.
pub trait ScalarListSlot {
    fn texts(&self) -> Vec<String>;
    fn push_text(&mut self, text: &str) -> Result<(), ConversionError>;
}

/// Access to child objects owned by the described object.
pub trait ChildSlot {
    /// Keys of the current children, in write order
    fn keys(&self) -> Vec<ChildKey>;

    fn child_mut(&mut self, key: &ChildKey) -> Option<&mut dyn Serializable>;

    /// Make room for a child being read. Keyed slots need `key`; the reader
    /// never passes a key that is already present.
    fn new_child(&mut self, key: Option<String>) -> Option<(ChildKey, &mut dyn Serializable)>;

    /// Name of the element attribute holding the key, for keyed slots
    fn key_attribute(&self) -> Option<&'static str> {
        None
    }

    /// Called once the owning element has been read completely
    fn finished_read(&mut self) {}
}

struct Field<'a, T>(&'a mut T);

impl<T: ScalarValue> ScalarSlot for Field<'_, T> {
    fn text(&self) -> Option<String> {
        self.0.to_text()
    }

    fn assign(&mut self, text: &str) -> Result<(), ConversionError> {
        *self.0 = T::from_text(text)?;
        Ok(())
    }
}

/// A flag whose default may be `true`: written whenever it differs from
/// the default, so an explicit `false` survives a round-trip.
struct DefaultedFlag<'a> {
    target: &'a mut bool,
    default: bool,
}

impl ScalarSlot for DefaultedFlag<'_> {
    fn text(&self) -> Option<String> {
        if *self.target == self.default {
            None
        } else {
            Some(self.target.to_string())
        }
    }

    fn assign(&mut self, text: &str) -> Result<(), ConversionError> {
        *self.target = bool::from_text(text)?;
        Ok(())
    }
}

struct ListField<'a, T>(&'a mut Vec<T>);

impl<T: ScalarValue> ScalarListSlot for ListField<'_, T> {
    fn texts(&self) -> Vec<String> {
        self.0.iter().map(ScalarValue::item_text).collect()
    }

    fn push_text(&mut self, text: &str) -> Result<(), ConversionError> {
        self.0.push(T::from_text(text)?);
        Ok(())
    }
}

struct VecChildren<'a, C>(&'a mut Vec<C>);

impl<C: Serializable + Default> ChildSlot for VecChildren<'_, C> {
    fn keys(&self) -> Vec<ChildKey> {
        (0..self.0.len()).map(ChildKey::Index).collect()
    }

    fn child_mut(&mut self, key: &ChildKey) -> Option<&mut dyn Serializable> {
        match key {
            ChildKey::Index(i) => self.0.get_mut(*i).map(|c| c as &mut dyn Serializable),
            ChildKey::Name(_) => None,
        }
    }

    fn new_child(&mut self, _key: Option<String>) -> Option<(ChildKey, &mut dyn Serializable)> {
        self.0.push(C::default());
        let index = self.0.len() - 1;
        self.0
            .last_mut()
            .map(|c| (ChildKey::Index(index), c as &mut dyn Serializable))
    }
}

struct MapChildren<'a, C> {
    map: &'a mut BTreeMap<String, C>,
    key_attribute: &'static str,
}

impl<C: Serializable + Default> ChildSlot for MapChildren<'_, C> {
    fn keys(&self) -> Vec<ChildKey> {
        self.map.keys().cloned().map(ChildKey::Name).collect()
    }

    fn child_mut(&mut self, key: &ChildKey) -> Option<&mut dyn Serializable> {
        match key {
            ChildKey::Name(name) => self.map.get_mut(name).map(|c| c as &mut dyn Serializable),
            ChildKey::Index(_) => None,
        }
    }

    fn new_child(&mut self, key: Option<String>) -> Option<(ChildKey, &mut dyn Serializable)> {
        let key = key?;
        self.map.insert(key.clone(), C::default());
        self.map
            .get_mut(&key)
            .map(|c| (ChildKey::Name(key), c as &mut dyn Serializable))
    }

    fn key_attribute(&self) -> Option<&'static str> {
        Some(self.key_attribute)
    }
}

/// Exactly one embedded child; reading goes into the existing object.
struct OneChild<'a, C>(&'a mut C);

impl<C: Serializable> ChildSlot for OneChild<'_, C> {
    fn keys(&self) -> Vec<ChildKey> {
        vec![ChildKey::Index(0)]
    }

    fn child_mut(&mut self, key: &ChildKey) -> Option<&mut dyn Serializable> {
        match key {
            ChildKey::Index(0) => Some(&mut *self.0 as &mut dyn Serializable),
            _ => None,
        }
    }

    fn new_child(&mut self, _key: Option<String>) -> Option<(ChildKey, &mut dyn Serializable)> {
        Some((ChildKey::Index(0), &mut *self.0 as &mut dyn Serializable))
    }
}

// ============================================================================
// DESCRIPTOR
// ============================================================================

enum Slot<'a> {
    Scalar(Box<dyn ScalarSlot + 'a>),
    ScalarList {
        item_key: Option<&'static str>,
        slot: Box<dyn ScalarListSlot + 'a>,
    },
    Children(Box<dyn ChildSlot + 'a>),
}

/// One named attribute of a live object. Borrows its field, never owns it.
pub struct Descriptor<'a> {
    name: &'static str,
    placement: Placement,
    reference: bool,
    slot: Slot<'a>,
}

impl<'a> Descriptor<'a> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Whether the stored text is an identifier standing for another entity
    pub fn is_reference(&self) -> bool {
        self.reference
    }

    pub fn kind(&self) -> AttributeKind {
        match self.slot {
            Slot::Scalar(_) => AttributeKind::Scalar,
            Slot::ScalarList { .. } => AttributeKind::ScalarList,
            Slot::Children(_) => AttributeKind::ChildList,
        }
    }

    /// For scalar lists: the element attribute carrying each item, if the
    /// item is not stored as element text
    pub fn item_key(&self) -> Option<&'static str> {
        match self.slot {
            Slot::ScalarList { item_key, .. } => item_key,
            _ => None,
        }
    }

    /// Current value. Child lists are walked with `children_mut`, not read
    /// as values, so they always yield `Value::Absent`.
    pub fn get(&self) -> Value {
        match &self.slot {
            Slot::Scalar(slot) => Value::from(slot.text()),
            Slot::ScalarList { slot, .. } => Value::List(slot.texts()),
            Slot::Children(_) => Value::Absent,
        }
    }

    /// Inject a parsed value. A list value appends its items; `Absent`
    /// leaves the field untouched.
    pub fn set(&mut self, value: Value) -> Result<(), ConversionError> {
        match (&mut self.slot, value) {
            (_, Value::Absent) => Ok(()),
            (Slot::Scalar(slot), Value::Scalar(text)) => slot.assign(&text),
            (Slot::ScalarList { slot, .. }, Value::Scalar(text)) => slot.push_text(&text),
            (Slot::ScalarList { slot, .. }, Value::List(items)) => {
                items.iter().try_for_each(|item| slot.push_text(item))
            }
            (Slot::Scalar(_), Value::List(_)) => Err(ConversionError::new("scalar", "list")),
            (Slot::Children(_), _) => Err(ConversionError::new("child objects", "text")),
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut (dyn ChildSlot + 'a)> {
        match &mut self.slot {
            Slot::Children(children) => Some(children.as_mut()),
            _ => None,
        }
    }

    /// Whether writing this attribute produces nested elements
    pub fn has_element_content(&self) -> bool {
        match &self.slot {
            Slot::Scalar(slot) => self.placement == Placement::Element && slot.text().is_some(),
            Slot::ScalarList { slot, .. } => !slot.texts().is_empty(),
            Slot::Children(children) => !children.keys().is_empty(),
        }
    }
}

impl fmt::Debug for Descriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("placement", &self.placement)
            .field("reference", &self.reference)
            .finish()
    }
}

// ============================================================================
// ACCESSOR
// ============================================================================

/// Ordered descriptors bound to one object instance.
#[derive(Debug, Default)]
pub struct SerializationAccessor<'a> {
    descriptors: Vec<Descriptor<'a>>,
}

impl<'a> SerializationAccessor<'a> {
    pub fn new() -> Self {
        SerializationAccessor {
            descriptors: Vec::new(),
        }
    }

    fn push(mut self, descriptor: Descriptor<'a>) -> Self {
        match self.descriptors.iter().position(|d| d.name == descriptor.name) {
            Some(index) => self.descriptors[index] = descriptor,
            None => self.descriptors.push(descriptor),
        }
        self
    }

    fn scalar_descriptor(
        self,
        name: &'static str,
        placement: Placement,
        reference: bool,
        slot: Box<dyn ScalarSlot + 'a>,
    ) -> Self {
        self.push(Descriptor {
            name,
            placement,
            reference,
            slot: Slot::Scalar(slot),
        })
    }

    /// Builder: scalar stored as an attribute of the owning element
    pub fn with_scalar<T: ScalarValue>(self, name: &'static str, target: &'a mut T) -> Self {
        self.scalar_descriptor(name, Placement::Attribute, false, Box::new(Field(target)))
    }

    /// Builder: scalar stored as a text child element (long text)
    pub fn with_text<T: ScalarValue>(self, name: &'static str, target: &'a mut T) -> Self {
        self.scalar_descriptor(name, Placement::Element, false, Box::new(Field(target)))
    }

    /// Builder: boolean flag defaulting to `false`, written only when set
    pub fn with_flag(self, name: &'static str, target: &'a mut bool) -> Self {
        self.with_scalar(name, target)
    }

    /// Builder: boolean flag with an explicit default. The owning type must
    /// restore `default` in its `prepare_read` hook.
    pub fn with_flag_default(self, name: &'static str, target: &'a mut bool, default: bool) -> Self {
        self.scalar_descriptor(
            name,
            Placement::Attribute,
            false,
            Box::new(DefaultedFlag { target, default }),
        )
    }

    /// Builder: hand-written slot for values with custom conversions
    pub fn with_custom(
        self,
        name: &'static str,
        placement: Placement,
        slot: Box<dyn ScalarSlot + 'a>,
    ) -> Self {
        self.scalar_descriptor(name, placement, false, slot)
    }

    /// Builder: list of scalars, one `<name>value</name>` per item
    pub fn with_list<T: ScalarValue>(self, name: &'static str, target: &'a mut Vec<T>) -> Self {
        self.push(Descriptor {
            name,
            placement: Placement::Element,
            reference: false,
            slot: Slot::ScalarList {
                item_key: None,
                slot: Box::new(ListField(target)),
            },
        })
    }

    /// Builder: list of scalars, one `<name item_key="value"/>` per item
    pub fn with_keyed_list<T: ScalarValue>(
        self,
        name: &'static str,
        target: &'a mut Vec<T>,
        item_key: &'static str,
    ) -> Self {
        self.push(Descriptor {
            name,
            placement: Placement::Element,
            reference: false,
            slot: Slot::ScalarList {
                item_key: Some(item_key),
                slot: Box::new(ListField(target)),
            },
        })
    }

    /// Builder: identifier of another entity, resolved after the read
    pub fn with_reference(self, name: &'static str, target: &'a mut String) -> Self {
        self.scalar_descriptor(name, Placement::Attribute, true, Box::new(Field(target)))
    }

    /// Builder: identifiers of other entities, `<name item_key="id"/>` each
    pub fn with_references(
        self,
        name: &'static str,
        target: &'a mut Vec<String>,
        item_key: &'static str,
    ) -> Self {
        self.push(Descriptor {
            name,
            placement: Placement::Element,
            reference: true,
            slot: Slot::ScalarList {
                item_key: Some(item_key),
                slot: Box::new(ListField(target)),
            },
        })
    }

    /// Builder: ordered child objects, one `<name>` element each
    pub fn with_children<C: Serializable + Default>(
        self,
        name: &'static str,
        target: &'a mut Vec<C>,
    ) -> Self {
        self.children_descriptor(name, Box::new(VecChildren(target)))
    }

    /// Builder: child objects keyed by name, written in key order. The key
    /// is read from the `key_attribute` of each element; the child itself
    /// is responsible for writing it.
    pub fn with_child_map<C: Serializable + Default>(
        self,
        name: &'static str,
        target: &'a mut BTreeMap<String, C>,
        key_attribute: &'static str,
    ) -> Self {
        self.children_descriptor(
            name,
            Box::new(MapChildren {
                map: target,
                key_attribute,
            }),
        )
    }

    /// Builder: exactly one embedded child object
    pub fn with_child<C: Serializable>(self, name: &'static str, target: &'a mut C) -> Self {
        self.children_descriptor(name, Box::new(OneChild(target)))
    }

    /// Builder: hand-written child slot
    pub fn with_child_slot(self, name: &'static str, slot: Box<dyn ChildSlot + 'a>) -> Self {
        self.children_descriptor(name, slot)
    }

    fn children_descriptor(self, name: &'static str, slot: Box<dyn ChildSlot + 'a>) -> Self {
        self.push(Descriptor {
            name,
            placement: Placement::Element,
            reference: false,
            slot: Slot::Children(slot),
        })
    }

    pub fn descriptors(&self) -> &[Descriptor<'a>] {
        &self.descriptors
    }

    pub fn descriptors_mut(&mut self) -> &mut [Descriptor<'a>] {
        &mut self.descriptors
    }

    pub fn find(&self, name: &str) -> Option<&Descriptor<'a>> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Descriptor<'a>> {
        self.descriptors.iter_mut().find(|d| d.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
