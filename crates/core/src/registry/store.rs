use indexmap::IndexMap;
use std::collections::HashMap;

use crate::registry::{ItemFilter, ItemId, ItemInfo, ItemKind, Scope};
use crate::types::TypeKey;

/// Outcome of an instance registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceRegistration {
    /// Record the registration was counted on
    pub id: ItemId,
    /// Identity of the rejected instance when it duplicated `id`
    pub duplicate: Option<ItemId>,
}

impl InstanceRegistration {
    pub fn is_duplicate(&self) -> bool {
        self.duplicate.is_some()
    }
}

struct DisableHandler {
    filter: ItemFilter,
    scope: Scope,
}

/// Registry of every registration and disable attempt, keyed by [`ItemId`]
pub struct ItemRegistry {
    infos: IndexMap<ItemId, ItemInfo>,
    instances: HashMap<TypeKey, Vec<ItemId>>,
    sequence: u64,
    disable_handlers: Vec<DisableHandler>,
}

impl ItemRegistry {
    /// Create a new item registry
    pub fn new() -> Self {
        Self {
            infos: IndexMap::new(),
            instances: HashMap::new(),
            sequence: 0,
            disable_handlers: Vec::new(),
        }
    }

    /// Count a registration attempt of `id` from `scope`
    pub fn register(&mut self, id: ItemId, kind: ItemKind, scope: Scope) -> &mut ItemInfo {
        let info = self
            .infos
            .entry(id)
            .or_insert_with(|| ItemInfo::new(id, kind));
        info.count_attempt(scope);
        tracing::debug!(target: "weave::registry", "{} {} registered by {}", kind, id, scope);
        info
    }

    /// Register an instance item, collapsing it into an equal, already accepted instance.
    ///
    /// `is_duplicate` is asked about each accepted instance of the same class, in
    /// registration order; the first positive answer wins.
    pub fn register_instance<F>(
        &mut self,
        kind: ItemKind,
        key: TypeKey,
        scope: Scope,
        mut is_duplicate: F,
    ) -> InstanceRegistration
    where
        F: FnMut(ItemId) -> bool,
    {
        self.sequence += 1;
        let candidate = ItemId::ByInstance(key, self.sequence);

        let original = self
            .instances
            .get(&key)
            .and_then(|accepted| accepted.iter().copied().find(|id| is_duplicate(*id)));

        if let Some(original) = original {
            if let Some(info) = self.infos.get_mut(&original) {
                info.count_attempt(scope);
                info.add_duplicate(candidate);
            }
            tracing::info!(
                target: "weave::registry",
                "IGNORE {} {}/{} as duplicate for {}",
                kind,
                scope,
                candidate,
                original
            );
            return InstanceRegistration {
                id: original,
                duplicate: Some(candidate),
            };
        }

        let accepted = self.instances.entry(key).or_default();
        accepted.push(candidate);
        let index = accepted.len();

        let class_disables: Vec<Scope> = self
            .infos
            .get(&ItemId::ByClass(key))
            .map(|info| info.disabled_by().iter().copied().collect())
            .unwrap_or_default();

        let info = self.register(candidate, kind, scope);
        info.set_instance_index(index);
        for disabled_by in class_disables {
            info.add_disable(disabled_by);
        }

        InstanceRegistration {
            id: candidate,
            duplicate: None,
        }
    }

    /// Record a disable of `id` from `scope`; the item need not be registered.
    ///
    /// Disabling a class also disables every instance of that class.
    pub fn disable(&mut self, id: ItemId, kind: ItemKind, scope: Scope) {
        let info = self
            .infos
            .entry(id)
            .or_insert_with(|| ItemInfo::new(id, kind));
        if info.add_disable(scope) {
            tracing::info!(target: "weave::registry", "{} {} disabled by {}", kind, id, scope);
        }

        if let ItemId::ByClass(key) = id {
            if let Some(accepted) = self.instances.get(&key) {
                for instance in accepted {
                    if let Some(info) = self.infos.get_mut(instance) {
                        info.add_disable(scope);
                    }
                }
            }
        }
    }

    /// Disable every complete item matching `filter`, now and when items complete later
    pub fn disable_matching(&mut self, filter: ItemFilter, scope: Scope) {
        let matched: Vec<(ItemId, ItemKind)> = self
            .infos
            .values()
            .filter(|info| info.is_all_data_collected() && filter.matches(info))
            .map(|info| (info.id(), info.kind()))
            .collect();
        for (id, kind) in matched {
            self.disable(id, kind, scope);
        }
        self.disable_handlers.push(DisableHandler { filter, scope });
    }

    /// Mark a record complete and apply registered disable predicates to it
    pub fn mark_collected(&mut self, id: ItemId) {
        let Some(info) = self.infos.get_mut(&id) else {
            return;
        };
        info.set_all_data_collected();

        let kind = info.kind();
        let scopes: Vec<Scope> = self
            .disable_handlers
            .iter()
            .filter(|handler| handler.filter.matches(info))
            .map(|handler| handler.scope)
            .collect();
        for scope in scopes {
            self.disable(id, kind, scope);
        }
    }

    /// True unless the item, or its class for instances, was disabled
    pub fn is_enabled(&self, id: ItemId) -> bool {
        let own = self.infos.get(&id).map(ItemInfo::is_enabled).unwrap_or(true);
        match id {
            ItemId::ByClass(_) => own,
            ItemId::ByInstance(key, _) => {
                own && self
                    .infos
                    .get(&ItemId::ByClass(key))
                    .map(ItemInfo::is_enabled)
                    .unwrap_or(true)
            }
        }
    }

    pub fn info(&self, id: ItemId) -> Option<&ItemInfo> {
        self.infos.get(&id)
    }

    pub(crate) fn info_mut(&mut self, id: ItemId) -> Option<&mut ItemInfo> {
        self.infos.get_mut(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.infos.contains_key(&id)
    }

    /// Registered items of a kind, in registration order (disable-only records excluded)
    pub fn items(&self, kind: ItemKind) -> Vec<ItemId> {
        self.infos
            .values()
            .filter(|info| info.kind() == kind && info.is_registered())
            .map(ItemInfo::id)
            .collect()
    }

    pub fn enabled_items(&self, kind: ItemKind) -> Vec<ItemId> {
        self.items(kind)
            .into_iter()
            .filter(|id| self.is_enabled(*id))
            .collect()
    }

    /// Disabled items of a kind, including disable-only records
    pub fn disabled_items(&self, kind: ItemKind) -> Vec<ItemId> {
        self.infos
            .values()
            .filter(|info| info.kind() == kind && !info.is_enabled())
            .map(ItemInfo::id)
            .collect()
    }

    /// Records matching a filter, in registration order
    pub fn find(&self, filter: &ItemFilter) -> Vec<&ItemInfo> {
        self.infos.values().filter(|info| filter.matches(info)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemInfo> {
        self.infos.values()
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Ignored registrations of `id` from `scope`
    pub fn ignores_by_scope(&self, id: ItemId, scope: &Scope) -> usize {
        self.infos
            .get(&id)
            .map(|info| info.ignores_by_scope(scope))
            .unwrap_or(0)
    }

    /// Ignored registrations of `id` from any scope whose item has class `scope_type`
    pub fn ignores_by_scope_type(&self, id: ItemId, scope_type: TypeKey) -> usize {
        self.infos
            .get(&id)
            .map(|info| info.ignores_by_scope_type(scope_type))
            .unwrap_or(0)
    }
}

impl Default for ItemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ItemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemRegistry")
            .field("items", &self.infos.len())
            .field("disable_predicates", &self.disable_handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeKey;

    struct Ext;
    struct AuditBundle;
    struct ParentBundle;

    #[test]
    fn test_register_twice_keeps_first_scope() {
        let mut registry = ItemRegistry::new();
        let id = ItemId::of::<Ext>();
        let parent = Scope::Bundle(ItemId::ByInstance(TypeKey::of::<ParentBundle>(), 9));

        registry.register(id, ItemKind::Extension, Scope::Application);
        registry.register(id, ItemKind::Extension, parent);

        let info = registry.info(id).unwrap();
        assert_eq!(info.registration_scope(), Some(Scope::Application));
        assert_eq!(
            info.registered_by().iter().copied().collect::<Vec<_>>(),
            vec![Scope::Application, parent]
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.ignores_by_scope(id, &parent), 1);
        assert_eq!(registry.ignores_by_scope_type(id, TypeKey::of::<ParentBundle>()), 1);
    }

    #[test]
    fn test_disable_before_or_after_register() {
        let mut before = ItemRegistry::new();
        let id = ItemId::of::<Ext>();
        before.disable(id, ItemKind::Extension, Scope::Lookup);
        assert!(!before.info(id).unwrap().is_registered());
        before.register(id, ItemKind::Extension, Scope::Application);
        assert!(!before.is_enabled(id));

        let mut after = ItemRegistry::new();
        after.register(id, ItemKind::Extension, Scope::Application);
        after.disable(id, ItemKind::Extension, Scope::Lookup);
        assert!(!after.is_enabled(id));
    }

    #[test]
    fn test_instance_duplicates_merge() {
        let mut registry = ItemRegistry::new();
        let key = TypeKey::of::<AuditBundle>();

        let first = registry.register_instance(ItemKind::Bundle, key, Scope::Application, |_| true);
        assert!(!first.is_duplicate());

        let second = registry.register_instance(ItemKind::Bundle, key, Scope::Lookup, |_| true);
        assert!(second.is_duplicate());
        assert_eq!(second.id, first.id);

        let info = registry.info(first.id).unwrap();
        assert_eq!(info.registration_attempts(), 2);
        assert_eq!(info.duplicates(), &[second.duplicate.unwrap()]);
        assert_eq!(info.instance_index(), Some(1));
        assert_eq!(registry.items(ItemKind::Bundle), vec![first.id]);
    }

    #[test]
    fn test_distinct_instances_get_own_records() {
        let mut registry = ItemRegistry::new();
        let key = TypeKey::of::<AuditBundle>();

        let first = registry.register_instance(ItemKind::Bundle, key, Scope::Application, |_| false);
        let second = registry.register_instance(ItemKind::Bundle, key, Scope::Application, |_| false);

        assert_ne!(first.id, second.id);
        assert_eq!(registry.info(second.id).unwrap().instance_index(), Some(2));
    }

    #[test]
    fn test_class_disable_covers_instances() {
        let mut registry = ItemRegistry::new();
        let key = TypeKey::of::<AuditBundle>();
        let existing = registry.register_instance(ItemKind::Bundle, key, Scope::Application, |_| false);

        registry.disable(ItemId::ByClass(key), ItemKind::Bundle, Scope::Application);
        let later = registry.register_instance(ItemKind::Bundle, key, Scope::Lookup, |_| false);

        assert!(!registry.is_enabled(existing.id));
        assert!(!registry.is_enabled(later.id));
        assert!(registry.enabled_items(ItemKind::Bundle).is_empty());
        assert!(!registry.info(ItemId::ByClass(key)).unwrap().is_all_data_collected());
    }

    #[test]
    fn test_disable_predicate_applies_to_past_and_future_items() {
        let mut registry = ItemRegistry::new();
        let id = ItemId::of::<Ext>();
        registry.register(id, ItemKind::Extension, Scope::Scan);
        registry.mark_collected(id);

        registry.disable_matching(ItemFilter::from_scan(), Scope::Application);
        assert!(!registry.is_enabled(id));

        let late = ItemId::of::<AuditBundle>();
        registry.register(late, ItemKind::Extension, Scope::Scan);
        assert!(registry.is_enabled(late));
        registry.mark_collected(late);
        assert!(!registry.is_enabled(late));
        assert_eq!(
            registry.info(late).unwrap().disabled_by().iter().copied().collect::<Vec<_>>(),
            vec![Scope::Application]
        );
    }
}
