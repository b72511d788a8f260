//! Identifier reconciliation between panel rosters and package scans.
//!
//! Scan stations report only the trailing [`SUFFIX_KEY_LEN`] characters of a
//! panel identifier, because on-floor barcode labels are shorter than the
//! manufacturing-side id. Matching therefore happens on suffix keys, which
//! trades precision for hardware compatibility: two panels on different
//! customers that happen to share a suffix will cross-associate. That risk
//! is accepted here deliberately; do not "fix" it by assuming full-id scans.

use std::collections::{BTreeSet, HashSet};

use packtrack_protocol::{PackStage, Package};

/// Length of the identifier suffix printed on packing-floor labels.
pub const SUFFIX_KEY_LEN: usize = 5;

/// Reconciliation output for one customer.
///
/// `suggested_stage` is exactly that, a suggestion. Only the lifecycle
/// state machine commits stage changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub packed_count: usize,
    pub total_parts: usize,
    pub pack_progress: u8,
    pub suggested_stage: PackStage,
    /// Packages containing at least one id matching this customer's roster.
    pub pack_seqs: BTreeSet<u64>,
}

/// The trailing [`SUFFIX_KEY_LEN`] characters of `id`.
///
/// A no-op for ids that are already suffix-length or shorter (the scanner
/// case). Operates on characters, not bytes, so multibyte ids cannot split
/// a codepoint.
pub fn suffix_key(id: &str) -> &str {
    let char_count = id.chars().count();
    if char_count <= SUFFIX_KEY_LEN {
        return id;
    }
    let skip = char_count - SUFFIX_KEY_LEN;
    match id.char_indices().nth(skip) {
        Some((byte_idx, _)) => &id[byte_idx..],
        None => id,
    }
}

/// Integer progress percentage, rounded half-up. 0 for an empty roster.
pub fn pack_progress(packed_count: usize, total_parts: usize) -> u8 {
    if total_parts == 0 {
        return 0;
    }
    let scaled = (packed_count as f64 / total_parts as f64) * 100.0;
    scaled.round() as u8
}

/// Match a customer's full panel roster against every known package scan.
pub fn reconcile<'a, I>(panel_ids: I, packages: &[Package]) -> ReconcileOutcome
where
    I: IntoIterator<Item = &'a str>,
{
    let panel_suffixes: Vec<&str> = panel_ids.into_iter().map(suffix_key).collect();
    let total_parts = panel_suffixes.len();
    let roster_lookup: HashSet<&str> = panel_suffixes.iter().copied().collect();

    let mut scanned_suffixes: HashSet<&str> = HashSet::new();
    let mut pack_seqs = BTreeSet::new();

    for package in packages {
        let mut associated = false;
        for reported in &package.part_ids {
            let key = suffix_key(reported);
            if let Some(roster_key) = roster_lookup.get(key) {
                associated = true;
                scanned_suffixes.insert(*roster_key);
            }
        }
        if associated {
            pack_seqs.insert(package.pack_seq);
        }
    }

    // A panel counts as packed when its suffix key appears in the union of
    // scanned keys. Two roster panels sharing a suffix both count.
    let packed_count = panel_suffixes
        .iter()
        .filter(|suffix| scanned_suffixes.contains(*suffix))
        .count();
    let progress = pack_progress(packed_count, total_parts);
    let suggested_stage = if total_parts == 0 || packed_count == 0 {
        PackStage::NotPacked
    } else if progress < 100 {
        PackStage::InProgress
    } else {
        PackStage::Packed
    };

    ReconcileOutcome {
        packed_count,
        total_parts,
        pack_progress: progress,
        suggested_stage,
        pack_seqs,
    }
}
