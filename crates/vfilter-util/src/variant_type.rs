//! Variant-type classification codes, shared between the parser (which
//! rewrites `%TYPE="snp"` string literals into one of these) and the
//! evaluator (which interprets `Record::variant_type_bits` against them).
//!
//! Mirrors the bitmask convention used by variant-call tooling: a
//! multiallelic site can set more than one bit, so comparisons test with
//! a bitwise AND rather than numeric equality.

pub const REF: i64 = 0;
pub const SNP: i64 = 1;
pub const MNP: i64 = 1 << 1;
pub const INDEL: i64 = 1 << 2;
pub const OTHER: i64 = 1 << 3;

/// Maps the `%TYPE="..."` vocabulary to its bitmask code.
pub fn code_for(name: &str) -> Option<i64> {
    match name.to_ascii_lowercase().as_str() {
        "snp" | "snps" => Some(SNP),
        "indel" | "indels" => Some(INDEL),
        "mnp" | "mnps" => Some(MNP),
        "other" => Some(OTHER),
        "ref" => Some(REF),
        _ => None,
    }
}
