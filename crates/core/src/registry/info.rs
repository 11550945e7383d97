use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::registry::{ItemId, ItemKind, Scope};
use crate::types::TypeKey;

/// Bundle-specific registration data
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BundleDetails {
    /// 1-based position in first-seen order
    pub init_order: Option<usize>,
    pub from_lookup: bool,
    /// Registered by another bundle
    pub transitive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleDetails {
    pub overriding: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstallerDetails {
    pub name: String,
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtensionDetails {
    pub installer: Option<TypeKey>,
    pub lazy: bool,
    /// Recognized from a module binding rather than declared
    pub manual_binding: bool,
    pub optional: bool,
}

/// Kind-specific data of an item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemDetails {
    Bundle(BundleDetails),
    Module(ModuleDetails),
    Installer(InstallerDetails),
    Extension(ExtensionDetails),
}

impl ItemDetails {
    pub fn for_kind(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Bundle => ItemDetails::Bundle(BundleDetails::default()),
            ItemKind::Module => ItemDetails::Module(ModuleDetails::default()),
            ItemKind::Installer => ItemDetails::Installer(InstallerDetails::default()),
            ItemKind::Extension => ItemDetails::Extension(ExtensionDetails::default()),
        }
    }
}

/// Registration record of a single item identity
#[derive(Debug, Clone, Serialize)]
pub struct ItemInfo {
    id: ItemId,
    kind: ItemKind,
    registered_by: IndexSet<Scope>,
    registration_scope: Option<Scope>,
    registration_attempts: usize,
    #[serde(skip)]
    attempts_by_scope: IndexMap<Scope, usize>,
    disabled_by: IndexSet<Scope>,
    duplicates: Vec<ItemId>,
    instance_index: Option<usize>,
    all_data_collected: bool,
    details: ItemDetails,
}

impl ItemInfo {
    pub(crate) fn new(id: ItemId, kind: ItemKind) -> Self {
        Self {
            id,
            kind,
            registered_by: IndexSet::new(),
            registration_scope: None,
            registration_attempts: 0,
            attempts_by_scope: IndexMap::new(),
            disabled_by: IndexSet::new(),
            duplicates: Vec::new(),
            instance_index: None,
            all_data_collected: false,
            details: ItemDetails::for_kind(kind),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn key(&self) -> TypeKey {
        self.id.key()
    }

    /// Scopes that registered the item, in first-registration order
    pub fn registered_by(&self) -> &IndexSet<Scope> {
        &self.registered_by
    }

    /// Scope of the first registration; never changes once set
    pub fn registration_scope(&self) -> Option<Scope> {
        self.registration_scope
    }

    pub fn registration_attempts(&self) -> usize {
        self.registration_attempts
    }

    pub fn disabled_by(&self) -> &IndexSet<Scope> {
        &self.disabled_by
    }

    /// Instance ids collapsed into this record as duplicates
    pub fn duplicates(&self) -> &[ItemId] {
        &self.duplicates
    }

    /// 1-based index among accepted instances of the same class
    pub fn instance_index(&self) -> Option<usize> {
        self.instance_index
    }

    pub fn is_all_data_collected(&self) -> bool {
        self.all_data_collected
    }

    pub fn details(&self) -> &ItemDetails {
        &self.details
    }

    pub fn is_registered(&self) -> bool {
        self.registration_attempts > 0
    }

    pub fn is_registered_directly(&self) -> bool {
        self.registered_by.contains(&Scope::Application)
    }

    pub fn is_enabled(&self) -> bool {
        self.disabled_by.is_empty()
    }

    pub fn is_from_scan(&self) -> bool {
        self.registered_by.contains(&Scope::Scan)
    }

    /// Registrations from `scope` that were ignored because the item was already known
    pub fn ignores_by_scope(&self, scope: &Scope) -> usize {
        let attempts = self.attempts_by_scope.get(scope).copied().unwrap_or(0);
        if self.registration_scope.as_ref() == Some(scope) {
            attempts.saturating_sub(1)
        } else {
            attempts
        }
    }

    /// Ignored registrations summed over every scope item of class `key`
    pub fn ignores_by_scope_type(&self, key: TypeKey) -> usize {
        self.attempts_by_scope
            .keys()
            .filter(|scope| scope.type_key() == Some(key))
            .map(|scope| self.ignores_by_scope(scope))
            .sum()
    }

    pub fn bundle(&self) -> Option<&BundleDetails> {
        match &self.details {
            ItemDetails::Bundle(details) => Some(details),
            _ => None,
        }
    }

    pub fn module(&self) -> Option<&ModuleDetails> {
        match &self.details {
            ItemDetails::Module(details) => Some(details),
            _ => None,
        }
    }

    pub fn installer(&self) -> Option<&InstallerDetails> {
        match &self.details {
            ItemDetails::Installer(details) => Some(details),
            _ => None,
        }
    }

    pub fn extension(&self) -> Option<&ExtensionDetails> {
        match &self.details {
            ItemDetails::Extension(details) => Some(details),
            _ => None,
        }
    }

    pub(crate) fn count_attempt(&mut self, scope: Scope) {
        self.registration_attempts += 1;
        *self.attempts_by_scope.entry(scope).or_insert(0) += 1;
        self.registered_by.insert(scope);
        if self.registration_scope.is_none() {
            self.registration_scope = Some(scope);
        }
    }

    pub(crate) fn add_disable(&mut self, scope: Scope) -> bool {
        self.disabled_by.insert(scope)
    }

    pub(crate) fn add_duplicate(&mut self, id: ItemId) {
        self.duplicates.push(id);
    }

    pub(crate) fn set_instance_index(&mut self, index: usize) {
        self.instance_index = Some(index);
    }

    pub(crate) fn set_all_data_collected(&mut self) {
        self.all_data_collected = true;
    }

    pub(crate) fn bundle_mut(&mut self) -> Option<&mut BundleDetails> {
        match &mut self.details {
            ItemDetails::Bundle(details) => Some(details),
            _ => None,
        }
    }

    pub(crate) fn module_mut(&mut self) -> Option<&mut ModuleDetails> {
        match &mut self.details {
            ItemDetails::Module(details) => Some(details),
            _ => None,
        }
    }

    pub(crate) fn installer_mut(&mut self) -> Option<&mut InstallerDetails> {
        match &mut self.details {
            ItemDetails::Installer(details) => Some(details),
            _ => None,
        }
    }

    pub(crate) fn extension_mut(&mut self) -> Option<&mut ExtensionDetails> {
        match &mut self.details {
            ItemDetails::Extension(details) => Some(details),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ext;
    struct ParentBundle;

    #[test]
    fn test_first_write_wins() {
        let mut info = ItemInfo::new(ItemId::of::<Ext>(), ItemKind::Extension);
        info.count_attempt(Scope::Application);
        info.count_attempt(Scope::Scan);
        info.count_attempt(Scope::Application);

        assert_eq!(info.registration_scope(), Some(Scope::Application));
        assert_eq!(
            info.registered_by().iter().copied().collect::<Vec<_>>(),
            vec![Scope::Application, Scope::Scan]
        );
        assert_eq!(info.registration_attempts(), 3);
        assert_eq!(info.ignores_by_scope(&Scope::Application), 1);
        assert_eq!(info.ignores_by_scope(&Scope::Scan), 1);
        assert_eq!(info.ignores_by_scope(&Scope::Lookup), 0);
    }

    #[test]
    fn test_ignores_aggregate_by_scope_class() {
        let parent = TypeKey::of::<ParentBundle>();
        let first = Scope::Bundle(ItemId::ByInstance(parent, 1));
        let second = Scope::Bundle(ItemId::ByInstance(parent, 2));

        let mut info = ItemInfo::new(ItemId::of::<Ext>(), ItemKind::Extension);
        info.count_attempt(Scope::Application);
        info.count_attempt(first);
        info.count_attempt(second);
        info.count_attempt(second);

        assert_eq!(info.ignores_by_scope(&second), 2);
        assert_eq!(info.ignores_by_scope_type(parent), 3);
    }

    #[test]
    fn test_disable_set_is_ordered_and_unique() {
        let mut info = ItemInfo::new(ItemId::of::<Ext>(), ItemKind::Extension);
        assert!(info.is_enabled());
        assert!(info.add_disable(Scope::Application));
        assert!(!info.add_disable(Scope::Application));
        assert!(info.add_disable(Scope::Lookup));
        assert!(!info.is_enabled());
        assert!(!info.is_registered());
        assert_eq!(info.disabled_by().len(), 2);
    }
}
