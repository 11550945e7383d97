use std::fmt;
use std::sync::Arc;

use crate::registry::{ItemInfo, ItemKind, Scope};
use crate::types::{Namespace, TypeKey};

/// Composable predicate over item records.
///
/// Used both for diagnostic queries and for predicate-based disabling.
#[derive(Clone)]
pub struct ItemFilter {
    predicate: Arc<dyn Fn(&ItemInfo) -> bool + Send + Sync>,
}

impl ItemFilter {
    /// Wrap an arbitrary predicate
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&ItemInfo) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    pub fn matches(&self, info: &ItemInfo) -> bool {
        (self.predicate)(info)
    }

    pub fn and(self, other: ItemFilter) -> Self {
        Self::new(move |info| self.matches(info) && other.matches(info))
    }

    pub fn or(self, other: ItemFilter) -> Self {
        Self::new(move |info| self.matches(info) || other.matches(info))
    }

    pub fn any() -> Self {
        Self::new(|_| true)
    }

    pub fn enabled() -> Self {
        Self::new(ItemInfo::is_enabled)
    }

    pub fn disabled() -> Self {
        !Self::enabled()
    }

    pub fn kind(kind: ItemKind) -> Self {
        Self::new(move |info| info.kind() == kind)
    }

    pub fn type_is(key: TypeKey) -> Self {
        Self::new(move |info| info.key() == key)
    }

    pub fn registered_by(scope: Scope) -> Self {
        Self::new(move |info| info.registered_by().contains(&scope))
    }

    pub fn registration_scope(scope: Scope) -> Self {
        Self::new(move |info| info.registration_scope() == Some(scope))
    }

    pub fn registered_directly() -> Self {
        Self::new(ItemInfo::is_registered_directly)
    }

    pub fn from_scan() -> Self {
        Self::new(ItemInfo::is_from_scan)
    }

    /// Bundles resolved through the external lookup
    pub fn lookup_bundles() -> Self {
        Self::new(|info| info.bundle().map(|b| b.from_lookup).unwrap_or(false))
    }

    /// Bundles registered by other bundles
    pub fn transitive_bundles() -> Self {
        Self::new(|info| info.bundle().map(|b| b.transitive).unwrap_or(false))
    }

    /// Extensions handled by the given installer
    pub fn installed_by(installer: TypeKey) -> Self {
        Self::new(move |info| {
            info.extension()
                .and_then(|e| e.installer)
                .map(|key| key == installer)
                .unwrap_or(false)
        })
    }

    pub fn in_namespace(namespace: Namespace) -> Self {
        Self::new(move |info| namespace.contains_path(info.key().module_path()))
    }
}

impl std::ops::Not for ItemFilter {
    type Output = ItemFilter;

    fn not(self) -> Self::Output {
        ItemFilter::new(move |info| !self.matches(info))
    }
}

impl fmt::Debug for ItemFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ItemFilter(<predicate>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ItemId;

    struct Resource;
    struct Task;

    fn extension<T: 'static>(scope: Scope) -> ItemInfo {
        let mut info = ItemInfo::new(ItemId::of::<T>(), ItemKind::Extension);
        info.count_attempt(scope);
        info
    }

    #[test]
    fn test_combinators() {
        let scanned = extension::<Resource>(Scope::Scan);
        let mut direct = extension::<Task>(Scope::Application);
        direct.add_disable(Scope::Application);

        let filter = ItemFilter::kind(ItemKind::Extension).and(ItemFilter::enabled());
        assert!(filter.matches(&scanned));
        assert!(!filter.matches(&direct));

        let either = ItemFilter::from_scan().or(ItemFilter::registered_directly());
        assert!(either.matches(&scanned));
        assert!(either.matches(&direct));

        let not_scanned = !ItemFilter::from_scan();
        assert!(!not_scanned.matches(&scanned));
        assert!(not_scanned.matches(&direct));
        assert!(ItemFilter::disabled().matches(&direct));
    }

    #[test]
    fn test_type_and_namespace_filters() {
        let info = extension::<Resource>(Scope::Scan);
        assert!(ItemFilter::type_is(TypeKey::of::<Resource>()).matches(&info));
        assert!(!ItemFilter::type_is(TypeKey::of::<Task>()).matches(&info));

        let namespace = Namespace::parse(TypeKey::of::<Resource>().module_path()).unwrap();
        assert!(ItemFilter::in_namespace(namespace).matches(&info));
        let other = Namespace::parse("somewhere::else").unwrap();
        assert!(!ItemFilter::in_namespace(other).matches(&info));
    }
}
