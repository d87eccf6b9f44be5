//! Property-based tests for row coercion.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Integer coercion reads exactly the leading signed digits
//! - Text coercion trims and treats blanks as absent
//! - Array groups collapse in column order, dropping blanks
//! - Header lookup ignores case and surrounding whitespace

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use framedex::io::ImportRow;
use framedex::io::validation::{collapse_group, int_or_none, text_or_none};
use framedex::models::RecordKind;
use proptest::prelude::*;

proptest! {
    /// Property: a signed digit run followed by junk parses as the digits.
    #[test]
    fn prop_int_reads_leading_digits(
        sign in prop::sample::select(vec!["", "+", "-"]),
        digits in "[0-9]{1,15}",
        tail in "[a-zA-Z/ ]{0,4}",
    ) {
        let raw = format!("{sign}{digits}{tail}");
        let expected: i64 = format!("{sign}{digits}").parse().unwrap();
        prop_assert_eq!(int_or_none(Some(&raw)), Some(expected));
    }

    /// Property: anything not starting with a digit (after a sign) is absent.
    #[test]
    fn prop_int_rejects_non_numeric_prefix(s in "[a-zA-Z][a-zA-Z0-9]{0,10}") {
        prop_assert_eq!(int_or_none(Some(&s)), None);
        let signed = format!("-{s}");
        prop_assert_eq!(int_or_none(Some(&signed)), None);
    }

    /// Property: surrounding whitespace never changes the parsed value.
    #[test]
    fn prop_int_ignores_padding(n in any::<i32>(), pad in "[ \t]{0,3}") {
        let raw = format!("{pad}{n}{pad}");
        prop_assert_eq!(int_or_none(Some(&raw)), Some(i64::from(n)));
    }

    /// Property: text coercion is trim-then-blank-is-none, and idempotent.
    #[test]
    fn prop_text_trims(s in "[ ]{0,3}[a-zA-Z0-9 ]{0,12}[ ]{0,3}") {
        let once = text_or_none(Some(&s));
        let trimmed = s.trim();
        if trimmed.is_empty() {
            prop_assert_eq!(once, None);
        } else {
            prop_assert_eq!(once.as_deref(), Some(trimmed));
            prop_assert_eq!(text_or_none(once.as_deref()), once.clone());
        }
    }

    /// Property: collapsed effects keep column order and drop blank slots.
    #[test]
    fn prop_collapse_keeps_slot_order(
        slots in prop::collection::vec(prop::option::of("[a-z]{1,6}"), 5),
    ) {
        let group = &RecordKind::Move.descriptor().array_groups[0];
        let mut row = ImportRow::new();
        for (i, slot) in slots.iter().enumerate() {
            row.insert(group.column(i + 1), slot.clone().unwrap_or_default());
        }

        let expected: Vec<String> = slots.iter().flatten().cloned().collect();
        let collapsed = collapse_group(&row, group);
        if expected.is_empty() {
            prop_assert_eq!(collapsed, None);
        } else {
            prop_assert_eq!(collapsed, Some(expected));
        }
    }

    /// Property: canonical header lookup is case- and padding-insensitive.
    #[test]
    fn prop_header_lookup_case_insensitive(
        idx in 0usize..12,
        upper in any::<bool>(),
        pad in "[ ]{0,2}",
    ) {
        let descriptor = RecordKind::Move.descriptor();
        let name = descriptor.fields[idx].name;
        let header = if upper { name.to_uppercase() } else { name.to_string() };
        let padded = format!("{pad}{header}{pad}");
        let column = descriptor.canonical_column(&padded);
        prop_assert_eq!(column.as_deref(), Some(name));
    }
}
