use serde::{Serialize, Serializer};
use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Runtime identity of a Rust type, comparable and hashable by `TypeId`
#[derive(Clone, Copy)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    /// Create a key for a type
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.type_name
    }

    /// Type name without its module path (generic arguments kept)
    pub fn simple_name(&self) -> &'static str {
        let base = self.base_name();
        match base.rfind("::") {
            Some(pos) => &self.type_name[pos + 2..],
            None => self.type_name,
        }
    }

    /// Module path the type is declared in, empty for root-level types
    pub fn module_path(&self) -> &'static str {
        let base = self.base_name();
        match base.rfind("::") {
            Some(pos) => &self.type_name[..pos],
            None => "",
        }
    }

    // Name up to the first generic argument list
    fn base_name(&self) -> &'static str {
        match self.type_name.find('<') {
            Some(pos) => &self.type_name[..pos],
            None => self.type_name,
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl PartialOrd for TypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_name
            .cmp(other.type_name)
            .then_with(|| self.type_id.cmp(&other.type_id))
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.type_name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

impl Serialize for TypeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod inner {
        pub struct Widget;
        pub struct Wrapper<T>(pub T);
    }

    #[test]
    fn test_key_equality_follows_type_id() {
        assert_eq!(TypeKey::of::<inner::Widget>(), TypeKey::of::<inner::Widget>());
        assert_ne!(TypeKey::of::<inner::Widget>(), TypeKey::of::<String>());
    }

    #[test]
    fn test_names() {
        let key = TypeKey::of::<inner::Widget>();
        assert_eq!(key.simple_name(), "Widget");
        assert!(key.module_path().ends_with("types::key::tests::inner"));

        let generic = TypeKey::of::<inner::Wrapper<std::string::String>>();
        assert!(generic.simple_name().starts_with("Wrapper<"));
        assert!(generic.module_path().ends_with("tests::inner"));

        assert_eq!(TypeKey::of::<u32>().module_path(), "");
        assert_eq!(TypeKey::of::<u32>().simple_name(), "u32");
    }
}
