use std::{
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use crate::{errors::ModuleError, types::TypeInfo};

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(0);

/// Key a module is registered and required under
///
/// The three variants never compare equal to each other, so the name `"x"`,
/// a symbol described as `"x"` and a type called `x` are three different modules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleId {
    /// A plain string name
    Name(Arc<str>),
    /// A unique token
    Symbol(Symbol),
    /// The identifier implied by a Rust type
    Type(TypeInfo),
}

impl ModuleId {
    pub fn name(name: impl Into<Arc<str>>) -> Self {
        ModuleId::Name(name.into())
    }

    pub fn of<T: 'static + ?Sized>() -> Self {
        ModuleId::Type(TypeInfo::of::<T>())
    }

    /// The empty name is the only identifier which can not be registered or required
    pub fn validate(&self) -> Result<(), ModuleError> {
        match self {
            ModuleId::Name(name) if name.is_empty() => Err(ModuleError::NullIdentifier),
            _ => Ok(()),
        }
    }
}

impl Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleId::Name(name) => f.write_str(name),
            ModuleId::Symbol(symbol) => Display::fmt(symbol, f),
            ModuleId::Type(info) => Display::fmt(info, f),
        }
    }
}

impl From<&str> for ModuleId {
    fn from(name: &str) -> Self {
        ModuleId::Name(name.into())
    }
}
impl From<String> for ModuleId {
    fn from(name: String) -> Self {
        ModuleId::Name(name.into())
    }
}
impl From<Arc<str>> for ModuleId {
    fn from(name: Arc<str>) -> Self {
        ModuleId::Name(name)
    }
}
impl From<Symbol> for ModuleId {
    fn from(symbol: Symbol) -> Self {
        ModuleId::Symbol(symbol)
    }
}
impl From<&Symbol> for ModuleId {
    fn from(symbol: &Symbol) -> Self {
        ModuleId::Symbol(symbol.clone())
    }
}
impl From<TypeInfo> for ModuleId {
    fn from(info: TypeInfo) -> Self {
        ModuleId::Type(info)
    }
}
impl From<&ModuleId> for ModuleId {
    fn from(id: &ModuleId) -> Self {
        id.clone()
    }
}

/// Unique token usable as a [ModuleId]
///
/// Two symbols are only equal if one is a clone of the other,
/// the description is for display only.
#[derive(Clone)]
pub struct Symbol {
    token: u64,
    description: Arc<str>,
}

impl Symbol {
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Symbol {
            token: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}
impl Eq for Symbol {}
impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}
impl Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Symbol")
            .field(&self.token)
            .field(&self.description)
            .finish()
    }
}
impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn names_compare_by_value() {
        assert_eq!(ModuleId::from("db"), ModuleId::name(String::from("db")));
        assert_ne!(ModuleId::from("db"), ModuleId::from("cache"));
    }

    #[test]
    fn symbols_with_same_description_are_distinct() {
        let a = Symbol::new("x");
        let b = Symbol::new("x");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.description(), "x");
        assert_eq!(a.to_string(), "Symbol(x)");
    }

    #[test]
    fn variants_never_collide() {
        struct X;
        let ids: HashSet<ModuleId> = [
            ModuleId::from("x"),
            ModuleId::from(Symbol::new("x")),
            ModuleId::of::<X>(),
        ]
        .into_iter()
        .collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn empty_name_is_null() {
        assert!(matches!(
            ModuleId::from("").validate(),
            Err(ModuleError::NullIdentifier)
        ));
        assert!(ModuleId::from("a").validate().is_ok());
        assert!(ModuleId::from(Symbol::new("")).validate().is_ok());
    }

    #[test]
    fn type_ids_display_the_type_name() {
        assert_eq!(ModuleId::of::<u8>().to_string(), "u8");
    }
}
