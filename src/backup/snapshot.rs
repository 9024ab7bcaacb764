//! Picks the newest received snapshot of a subvolume.
//!
//! Snapshot names are `<subvolume>.<timestamp>[_N]`, where the timestamp is
//! one of btrbk's fixed-width formats and `N` counts snapshots taken within
//! the same timestamp. Names are ordered by the timestamp text, then by `N`
//! as a number; a name without a counter precedes `_1`. Names whose suffix
//! is not such a timestamp are skipped rather than compared.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::warn;

/// Column of the path in `btrfs subvolume list` output:
/// `ID 257 gen 10 top level 5 path @.20250831T0152`.
pub const NAME_COLUMN: usize = 8;

pub fn select_newest<'a, I>(lines: I, prefix: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut newest: Option<(SnapshotKey<'a>, &'a str)> = None;
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(name) = fields.get(NAME_COLUMN).copied() else {
            continue;
        };
        let Some(suffix) = name.strip_prefix(prefix) else {
            continue;
        };
        let Some(key) = snapshot_key(suffix) else {
            warn!(name, "skipping subvolume without a sortable timestamp suffix");
            continue;
        };
        if newest.as_ref().map_or(true, |(current, _)| key > *current) {
            newest = Some((key, name));
        }
    }
    newest.map(|(_, name)| name.to_string())
}

/// Timestamp text and optional counter of a snapshot suffix.
type SnapshotKey<'a> = (&'a str, Option<u64>);

fn snapshot_key(suffix: &str) -> Option<SnapshotKey<'_>> {
    let (stamp, counter) = match suffix.rsplit_once('_') {
        Some((stamp, n)) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => {
            (stamp, Some(n.parse::<u64>().ok()?))
        }
        _ => (suffix, None),
    };
    is_snapshot_timestamp(stamp).then_some((stamp, counter))
}

fn is_snapshot_timestamp(stamp: &str) -> bool {
    if !stamp.is_ascii() {
        return false;
    }
    match stamp.len() {
        8 => NaiveDate::parse_from_str(stamp, "%Y%m%d").is_ok(),
        13 => NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H%M").is_ok(),
        20 => DateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S%z").is_ok(),
        _ => false,
    }
}
