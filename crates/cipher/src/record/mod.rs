//! Record shape declarations and sensitive field selection.
//!
//! A [`Record`] describes its own top-level fields once per type through
//! [`Record::FIELDS`]. Nothing here looks at record instances except the two
//! accessors, and nested records are never descended into.

pub mod selector;

pub use selector::select_encrypted_fields;

/// Declared type of a record field, as far as encryption cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// An owned `String`.
    String,
    /// Anything else; carries the declared type for diagnostics.
    Other(&'static str),
}

/// Static description of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name. Doubles as the correlation reference on the wire.
    pub name: &'static str,
    /// Declared type.
    pub ty: FieldType,
    /// Whether the field is marked sensitive.
    pub sensitive: bool,
}

impl FieldDescriptor {
    /// Describe a field.
    pub const fn new(name: &'static str, ty: FieldType, sensitive: bool) -> Self {
        Self {
            name,
            ty,
            sensitive,
        }
    }

    /// `true` iff the field is a `String` and marked sensitive.
    pub const fn is_eligible(&self) -> bool {
        matches!(self.ty, FieldType::String) && self.sensitive
    }
}

/// A structured value whose sensitive string fields can be encrypted in place.
///
/// Usually implemented with `#[derive(Record)]`. Hand-written impls must list
/// every field in declaration order and expose each `String` field through
/// both accessors under its declared name.
pub trait Record {
    /// Every top-level field, in declaration order.
    const FIELDS: &'static [FieldDescriptor];

    /// Current value of the `String` field called `name`.
    fn string_field(&self, name: &str) -> Option<&str>;

    /// Mutable access to the `String` field called `name`.
    fn string_field_mut(&mut self, name: &str) -> Option<&mut String>;
}
