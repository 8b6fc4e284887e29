use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{require, CacheError};

/// The version used by keys which don't specify one explicitly.
pub const LATEST_VERSION: &str = "LATEST";

/// Identifies the kind of model a [`CacheKey`] refers to.
///
/// A model type is either derived from a Rust type (compared by its [`TypeId`]) or given
/// by an explicit name (compared by that name). The two flavours never compare equal, even
/// if the explicit name matches the name of a Rust type.
#[derive(Clone, Debug)]
pub enum ModelType {
    Type { id: TypeId, name: &'static str },
    Named(Arc<str>),
}

impl ModelType {
    /// Returns the model type of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        ModelType::Type {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Returns a model type identified by `name`.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        ModelType::Named(name.into())
    }

    /// Returns a human readable name, used for display purposes only.
    pub fn name(&self) -> &str {
        match self {
            ModelType::Type { name, .. } => short_type_name(name),
            ModelType::Named(name) => name.as_ref(),
        }
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ModelType::Type { id: a, .. }, ModelType::Type { id: b, .. }) => a == b,
            (ModelType::Named(a), ModelType::Named(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ModelType {}

impl Hash for ModelType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ModelType::Type { id, .. } => {
                0u8.hash(state);
                id.hash(state);
            }
            ModelType::Named(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

/// Strips the module path from a type name ("app::model::Order" becomes "Order").
fn short_type_name(name: &str) -> &str {
    let base = name.split('<').next().unwrap_or(name);
    match base.rfind("::") {
        Some(pos) => &name[pos + 2..],
        None => name,
    }
}

/// A single attribute of a [`CacheKey`].
///
/// Attributes are opaque to the cache; they only need structural equality and a stable hash.
/// `Null` stands for an absent value. Floats are stored by their bit pattern so that keys
/// remain `Eq` and `Hash`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyAttribute {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(u64),
    Str(Arc<str>),
    Bytes(Arc<[u8]>),
}

impl fmt::Display for KeyAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAttribute::Null => f.write_str("null"),
            KeyAttribute::Bool(value) => write!(f, "{}", value),
            KeyAttribute::Int(value) => write!(f, "{}", value),
            KeyAttribute::UInt(value) => write!(f, "{}", value),
            KeyAttribute::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            KeyAttribute::Str(value) => f.write_str(value),
            KeyAttribute::Bytes(value) => {
                for byte in value.iter() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

macro_rules! attribute_from {
    ($variant:ident, $target:ty; $($source:ty),*) => {
        $(
            impl From<$source> for KeyAttribute {
                fn from(value: $source) -> Self {
                    KeyAttribute::$variant(value as $target)
                }
            }
        )*
    };
}

attribute_from!(Int, i64; i8, i16, i32, i64, isize);
attribute_from!(UInt, u64; u8, u16, u32, u64, usize);

impl From<bool> for KeyAttribute {
    fn from(value: bool) -> Self {
        KeyAttribute::Bool(value)
    }
}

impl From<f32> for KeyAttribute {
    fn from(value: f32) -> Self {
        KeyAttribute::Float(f64::from(value).to_bits())
    }
}

impl From<f64> for KeyAttribute {
    fn from(value: f64) -> Self {
        KeyAttribute::Float(value.to_bits())
    }
}

impl From<&str> for KeyAttribute {
    fn from(value: &str) -> Self {
        KeyAttribute::Str(Arc::from(value))
    }
}

impl From<String> for KeyAttribute {
    fn from(value: String) -> Self {
        KeyAttribute::Str(Arc::from(value))
    }
}

impl From<&String> for KeyAttribute {
    fn from(value: &String) -> Self {
        KeyAttribute::Str(Arc::from(value.as_str()))
    }
}

impl From<&[u8]> for KeyAttribute {
    fn from(value: &[u8]) -> Self {
        KeyAttribute::Bytes(Arc::from(value))
    }
}

impl From<Vec<u8>> for KeyAttribute {
    fn from(value: Vec<u8>) -> Self {
        KeyAttribute::Bytes(Arc::from(value))
    }
}

impl<T: Into<KeyAttribute>> From<Option<T>> for KeyAttribute {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(KeyAttribute::Null)
    }
}

/// Addresses a value in a cache.
///
/// A key consists of the model type it refers to, a version and an ordered list of
/// attributes. Two keys are equal if all three parts are equal (attributes are compared in
/// order). Keys are immutable and cheap to clone.
///
/// # Examples
///
/// ```
/// use selfload_core::{attrs, CacheKey};
///
/// struct Order;
///
/// let a = CacheKey::of::<Order>(attrs![42, "EUR"]);
/// let b = CacheKey::of::<Order>(attrs![42, "EUR"]);
/// let c = CacheKey::of::<Order>(attrs![43, "EUR"]);
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert_eq!(a.version(), "LATEST");
/// assert_eq!(a.to_string(), "Order@LATEST[42, EUR]");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    model_type: ModelType,
    version: Arc<str>,
    attributes: Arc<[KeyAttribute]>,
}

impl CacheKey {
    /// Creates a key for the model type `T` using the [`LATEST_VERSION`].
    pub fn of<T: ?Sized + 'static>(attributes: Vec<KeyAttribute>) -> Self {
        CacheKey {
            model_type: ModelType::of::<T>(),
            version: Arc::from(LATEST_VERSION),
            attributes: Arc::from(attributes),
        }
    }

    /// Creates a key for the model type `T` and the given version.
    ///
    /// Fails with [`CacheError::Requirement`] if the version is blank.
    pub fn versioned<T: ?Sized + 'static>(
        version: &str,
        attributes: Vec<KeyAttribute>,
    ) -> Result<Self, CacheError> {
        Self::new(ModelType::of::<T>(), version, attributes)
    }

    /// Creates a key for an explicitly named model type.
    ///
    /// Fails with [`CacheError::Requirement`] if the name or the version is blank.
    pub fn named(
        model_type: &str,
        version: &str,
        attributes: Vec<KeyAttribute>,
    ) -> Result<Self, CacheError> {
        require(!model_type.trim().is_empty(), || {
            "a cache key requires a non-blank model type".to_string()
        })?;
        Self::new(ModelType::named(model_type), version, attributes)
    }

    /// Creates a key from its parts.
    pub fn new(
        model_type: ModelType,
        version: &str,
        attributes: Vec<KeyAttribute>,
    ) -> Result<Self, CacheError> {
        require(!version.trim().is_empty(), || {
            format!(
                "a cache key for {} requires a non-blank version",
                model_type.name()
            )
        })?;

        Ok(CacheKey {
            model_type,
            version: Arc::from(version),
            attributes: Arc::from(attributes),
        })
    }

    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn attributes(&self) -> &[KeyAttribute] {
        &self.attributes
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}[", self.model_type.name(), self.version)?;
        for (index, attribute) in self.attributes.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", attribute)?;
        }
        f.write_str("]")
    }
}

/// Stamps out keys sharing the same model type and version.
///
/// A prototype is handy when a component performs many lookups for the same kind of model:
/// the model type and version are validated once and each [`key`](KeyPrototype::key) call only
/// supplies the attributes.
///
/// # Examples
///
/// ```
/// use selfload_core::{attrs, CacheKey, KeyPrototype};
///
/// struct Customer;
///
/// let customers = KeyPrototype::versioned::<Customer>("v2").unwrap();
/// let key = customers.key(attrs!["ACME"]);
///
/// assert_eq!(key, CacheKey::versioned::<Customer>("v2", attrs!["ACME"]).unwrap());
/// ```
#[derive(Clone, Debug)]
pub struct KeyPrototype {
    model_type: ModelType,
    version: Arc<str>,
}

impl KeyPrototype {
    /// Creates a prototype for `T` using the [`LATEST_VERSION`].
    pub fn of<T: ?Sized + 'static>() -> Self {
        KeyPrototype {
            model_type: ModelType::of::<T>(),
            version: Arc::from(LATEST_VERSION),
        }
    }

    /// Creates a prototype for `T` and the given (non-blank) version.
    pub fn versioned<T: ?Sized + 'static>(version: &str) -> Result<Self, CacheError> {
        require(!version.trim().is_empty(), || {
            format!(
                "a key prototype for {} requires a non-blank version",
                type_name::<T>()
            )
        })?;

        Ok(KeyPrototype {
            model_type: ModelType::of::<T>(),
            version: Arc::from(version),
        })
    }

    /// Creates a key with the prototype's model type and version.
    pub fn key(&self, attributes: Vec<KeyAttribute>) -> CacheKey {
        CacheKey {
            model_type: self.model_type.clone(),
            version: self.version.clone(),
            attributes: Arc::from(attributes),
        }
    }

    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Builds a `Vec<KeyAttribute>` from a list of expressions convertible into [`KeyAttribute`].
///
/// ```
/// use selfload_core::{attrs, KeyAttribute};
///
/// let attributes = attrs![1, "two", None::<i32>];
/// assert_eq!(attributes[2], KeyAttribute::Null);
/// ```
#[macro_export]
macro_rules! attrs {
    () => {
        ::std::vec::Vec::<$crate::KeyAttribute>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::KeyAttribute::from($value)),+]
    };
}
