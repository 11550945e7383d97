use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::types::TypeKey;

/// Kind of a registry item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ItemKind {
    Bundle,
    Module,
    Installer,
    Extension,
}

impl ItemKind {
    /// Bundles and modules are registered as instances, the rest by class
    pub fn is_instance_kind(&self) -> bool {
        matches!(self, ItemKind::Bundle | ItemKind::Module)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Bundle => "bundle",
            ItemKind::Module => "module",
            ItemKind::Installer => "installer",
            ItemKind::Extension => "extension",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of a registry item: a class, or one instance of a class.
///
/// Equality is structural; a class id never equals an instance id. Use
/// [`ItemId::covers`] to ask whether a class id addresses an instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemId {
    ByClass(TypeKey),
    ByInstance(TypeKey, u64),
}

impl ItemId {
    pub fn of<T: ?Sized + 'static>() -> Self {
        ItemId::ByClass(TypeKey::of::<T>())
    }

    pub fn key(&self) -> TypeKey {
        match self {
            ItemId::ByClass(key) | ItemId::ByInstance(key, _) => *key,
        }
    }

    /// Instance sequence number, `None` for class ids
    pub fn identity(&self) -> Option<u64> {
        match self {
            ItemId::ByClass(_) => None,
            ItemId::ByInstance(_, identity) => Some(*identity),
        }
    }

    pub fn is_instance(&self) -> bool {
        matches!(self, ItemId::ByInstance(..))
    }

    /// True when `other` is this id, or an instance of this class id
    pub fn covers(&self, other: &ItemId) -> bool {
        match self {
            ItemId::ByClass(key) => other.key() == *key,
            ItemId::ByInstance(..) => self == other,
        }
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key()
            .cmp(&other.key())
            .then_with(|| self.identity().cmp(&other.identity()))
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::ByClass(key) => write!(f, "{}", key),
            ItemId::ByInstance(key, identity) => write!(f, "{}@{}", key, identity),
        }
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Provenance of a registration or disable action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Direct registration from application code
    Application,
    /// Namespace scanning
    Scan,
    /// External bundle lookup
    Lookup,
    /// Optional extensions disabled for lack of an installer
    OptionalExtension,
    Bundle(ItemId),
    Module(ItemId),
    Hook(ItemId),
}

impl Scope {
    /// Item behind the scope, for bundle, module and hook scopes
    pub fn item(&self) -> Option<ItemId> {
        match self {
            Scope::Bundle(id) | Scope::Module(id) | Scope::Hook(id) => Some(*id),
            _ => None,
        }
    }

    pub fn type_key(&self) -> Option<TypeKey> {
        self.item().map(|id| id.key())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Application => f.write_str("Application"),
            Scope::Scan => f.write_str("Scan"),
            Scope::Lookup => f.write_str("Lookup"),
            Scope::OptionalExtension => f.write_str("OptionalExtension"),
            Scope::Bundle(id) => write!(f, "Bundle({})", id),
            Scope::Module(id) => write!(f, "Module({})", id),
            Scope::Hook(id) => write!(f, "Hook({})", id),
        }
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Audit;

    #[test]
    fn test_structural_equality() {
        let key = TypeKey::of::<Audit>();
        let class = ItemId::ByClass(key);
        let first = ItemId::ByInstance(key, 1);
        let second = ItemId::ByInstance(key, 2);

        assert_ne!(class, first);
        assert_ne!(first, second);
        assert!(class.covers(&first));
        assert!(class.covers(&class));
        assert!(!first.covers(&second));
        assert!(!first.covers(&class));
    }

    #[test]
    fn test_display() {
        let key = TypeKey::of::<Audit>();
        let id = ItemId::ByInstance(key, 3);
        assert!(id.to_string().ends_with("Audit@3"));
        assert!(Scope::Bundle(id).to_string().starts_with("Bundle("));
        assert_eq!(Scope::Bundle(id).type_key(), Some(key));
        assert_eq!(Scope::Application.type_key(), None);
    }
}
