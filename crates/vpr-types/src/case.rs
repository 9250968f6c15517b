//! Naming-convention conversions.
//!
//! Three spellings of the same RM class travel through the codec:
//! - RM type names as written in canonical JSON `_type` fields: `DV_INTERVAL<DV_QUANTITY>`.
//! - Class tags as stored in the flattened document: `DvInterval<DvQuantity>`.
//! - Field names in canonical JSON: `lower_included`.
//!
//! Generic brackets and other punctuation pass through untouched.

/// Convert a camel-case identifier to snake case (`definingCode` -> `defining_code`).
///
/// Input that is already snake case is returned unchanged.
pub fn camel_to_snake(input: &str) -> String {
    split_camel(input, '_').to_lowercase()
}

/// Convert a class tag to an RM type name (`ItemTree` -> `ITEM_TREE`).
pub fn camel_to_upper_snake(input: &str) -> String {
    split_camel(input, '_').to_uppercase()
}

/// Convert an RM type name to a class tag (`POINT_EVENT` -> `PointEvent`).
pub fn upper_snake_to_camel(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut upper_next = true;
    for ch in input.chars() {
        if ch == '_' {
            upper_next = true;
            continue;
        }
        if ch.is_ascii_alphanumeric() {
            if upper_next {
                out.push(ch.to_ascii_uppercase());
            } else {
                out.push(ch.to_ascii_lowercase());
            }
            upper_next = false;
        } else {
            out.push(ch);
            upper_next = true;
        }
    }
    out
}

fn split_camel(input: &str, separator: char) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut prev: Option<char> = None;
    for ch in input.chars() {
        if ch.is_ascii_uppercase() {
            if let Some(p) = prev {
                if p.is_ascii_lowercase() || p.is_ascii_digit() {
                    out.push(separator);
                }
            }
        }
        out.push(ch);
        prev = Some(ch);
    }
    out
}
