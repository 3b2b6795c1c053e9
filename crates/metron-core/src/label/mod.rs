//! Label canonicalization.
//!
//! Raw measurement attributes are free-form: keys may carry punctuation, mixed case or repeat.
//! [`canonicalize`] turns them into a [`CanonicalLabel`], which is what the store aggregates on
//! and what the serializer prints. Two attribute sets that canonicalize equally always land in the same series.
mod canonical;
pub use canonical::CanonicalLabel;

mod name;
pub use name::{is_valid_name, sanitize_name};

use metron_model::Attribute;

/// Canonicalize a raw attribute set.
///
/// - keys are translated with [`sanitize_name`];
/// - values are stringified with their invariant text form;
/// - when two keys translate to the same name, the pair that comes **last** in input order wins;
/// - the result is ordered by name.
///
/// Pure, allocation-only; safe to call from any thread.
///
/// # Examples
/// ```
/// use metron_core::label::canonicalize;
/// use metron_model::Attribute;
///
/// let a = canonicalize(&[Attribute::new("l2", 111), Attribute::new("l1", "value")]);
/// let b = canonicalize(&[Attribute::new("l1", "value"), Attribute::new("l2", 111)]);
/// assert_eq!(a, b);
/// assert_eq!(a.flatten(), r#"l1="value",l2="111""#);
/// ```
pub fn canonicalize<'a, I>(attributes: I) -> CanonicalLabel
where
    I: IntoIterator<Item = &'a Attribute>,
{
    let mut label = CanonicalLabel::new();
    for attr in attributes {
        label.insert(sanitize_name(attr.key()), attr.value().to_string());
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_is_empty_label() {
        let label = canonicalize(&Vec::<Attribute>::new());
        assert!(label.is_empty());
        assert_eq!(label.flatten(), "");
    }

    #[test]
    fn ordering_does_not_matter() {
        let a = canonicalize(&[Attribute::new("l1", "value"), Attribute::new("l2", 111)]);
        let b = canonicalize(&[Attribute::new("l2", 111), Attribute::new("l1", "value")]);
        assert_eq!(a, b);
        assert_eq!(a.flatten(), b.flatten());
    }

    #[test]
    fn names_are_sanitized() {
        let label = canonicalize(&[
            Attribute::new("my-label", 1),
            Attribute::new("Another.Label", 1),
        ]);
        assert_eq!(label.flatten(), r#"another_label="1",my_label="1""#);
    }

    #[test]
    fn punctuation_variants_merge() {
        let a = canonicalize(&[Attribute::new("http.method", "GET")]);
        let b = canonicalize(&[Attribute::new("http-method", "GET")]);
        assert_eq!(a, b);
    }

    #[test]
    fn last_pair_wins_on_collision() {
        let label = canonicalize(&[
            Attribute::new("my-label", "first"),
            Attribute::new("my.label", "second"),
        ]);
        assert_eq!(label.len(), 1);
        assert_eq!(label.get("my_label"), Some("second"));
    }

    #[test]
    fn duplicate_raw_keys_merge() {
        let label = canonicalize(&[Attribute::new("k", 1), Attribute::new("k", 2)]);
        assert_eq!(label.flatten(), r#"k="2""#);
    }

    #[test]
    fn different_values_differ() {
        let a = canonicalize(&[Attribute::new("l2", 111)]);
        let b = canonicalize(&[Attribute::new("l2", 0)]);
        assert_ne!(a, b);
    }

    #[test]
    fn value_types_stringify() {
        let label = canonicalize(&[
            Attribute::new("b", true),
            Attribute::new("f", 0.5),
            Attribute::new("i", -3i64),
            Attribute::new("s", "x"),
        ]);
        assert_eq!(label.flatten(), r#"b="true",f="0.5",i="-3",s="x""#);
    }
}
