//! Eligible field selection for a [`Record`] type.

use super::{FieldDescriptor, Record};

/// Return the fields of `R` that must be encrypted, in declaration order.
///
/// A field is included iff it is declared as `String` and marked sensitive.
/// An empty result means encrypt/decrypt calls on `R` are no-ops.
pub fn select_encrypted_fields<R: Record + ?Sized>() -> Vec<&'static FieldDescriptor> {
    R::FIELDS.iter().filter(|f| f.is_eligible()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldType;
    use crate::Record;

    #[derive(Record)]
    #[allow(dead_code)]
    struct Person {
        #[encrypted]
        name: String,
        #[encrypted = true]
        address: String,
        #[encrypted]
        age: u32,
        desc: String,
    }

    #[derive(Record)]
    #[allow(dead_code)]
    struct Plain {
        title: String,
        #[encrypted = false]
        body: String,
    }

    #[derive(Record)]
    #[allow(dead_code)]
    struct Tagged<T> {
        #[encrypted = "true"]
        r#type: std::string::String,
        #[encrypted]
        nested: Option<String>,
        extra: T,
    }

    fn names<R: Record>() -> Vec<&'static str> {
        select_encrypted_fields::<R>().iter().map(|f| f.name).collect()
    }

    #[test]
    fn only_sensitive_strings_in_declaration_order() {
        assert_eq!(names::<Person>(), vec!["name", "address"]);
    }

    #[test]
    fn descriptors_cover_every_field() {
        let all: Vec<_> = Person::FIELDS.iter().map(|f| f.name).collect();
        assert_eq!(all, vec!["name", "address", "age", "desc"]);
        assert_eq!(Person::FIELDS[2].ty, FieldType::Other("u32"));
        assert!(Person::FIELDS[2].sensitive);
        assert!(!Person::FIELDS[2].is_eligible());
    }

    #[test]
    fn no_sensitive_fields_selects_nothing() {
        assert!(select_encrypted_fields::<Plain>().is_empty());
    }

    #[test]
    fn raw_idents_and_wrappers() {
        // `Option<String>` is not a plain string field.
        assert_eq!(names::<Tagged<u8>>(), vec!["type"]);
    }

    #[test]
    fn accessors_expose_string_fields_only() {
        let mut p = Person {
            name: "John Doe".into(),
            address: "123 Main St".into(),
            age: 30,
            desc: "abc".into(),
        };
        assert_eq!(p.string_field("name"), Some("John Doe"));
        assert_eq!(p.string_field("desc"), Some("abc"));
        assert_eq!(p.string_field("age"), None);
        assert_eq!(p.string_field("missing"), None);

        *p.string_field_mut("address").unwrap() = "elsewhere".into();
        assert_eq!(p.address, "elsewhere");
    }

    #[test]
    fn hand_written_impl() {
        struct Manual {
            secret: String,
        }
        impl Record for Manual {
            const FIELDS: &'static [FieldDescriptor] =
                &[FieldDescriptor::new("secret", FieldType::String, true)];
            fn string_field(&self, name: &str) -> Option<&str> {
                (name == "secret").then_some(self.secret.as_str())
            }
            fn string_field_mut(&mut self, name: &str) -> Option<&mut String> {
                (name == "secret").then_some(&mut self.secret)
            }
        }
        let m = Manual { secret: "s".into() };
        assert_eq!(names::<Manual>(), vec!["secret"]);
        assert_eq!(m.string_field("secret"), Some("s"));
    }
}
