//! Parser for `parted --machine <device> unit B print` output.
//!
//! ```text
//! BYT;
//! /dev/mmcblk0:10485760B:sd/mmc:512:512:msdos:SD card:;
//! 1:0B:1048576B:1048576B:fat32::lba;
//! 2:1048576B:10485760B:9437184B:btrfs::;
//! ```

use std::collections::HashSet;

use crate::disk::fs_type::FsType;
use crate::disk::{DiskGeometry, PartitionRecord};
use crate::error::{MirrorError, Result};

const MIN_PARTITION_FIELDS: usize = 5;

pub fn parse_listing(output: &str) -> Result<DiskGeometry> {
    let lines: Vec<&str> = output.trim().lines().collect();
    if lines.len() < 3 {
        return Err(MirrorError::format(format!(
            "expected header, disk and partition lines, got {} line(s)",
            lines.len()
        )));
    }

    let disk_fields: Vec<&str> = lines[1].split(':').collect();
    let total_size = match disk_fields.get(1) {
        Some(field) => parse_bytes(field, "disk size")?,
        None => return Err(MirrorError::format(format!("disk line {:?}", lines[1]))),
    };

    let mut partitions = Vec::new();
    let mut seen = HashSet::new();
    for line in &lines[2..] {
        let fields: Vec<&str> = line.trim().trim_end_matches(';').split(':').collect();
        if fields.len() < MIN_PARTITION_FIELDS {
            continue;
        }
        let index = fields[0]
            .trim()
            .parse::<u32>()
            .map_err(|e| MirrorError::format(format!("partition number {:?}: {}", fields[0], e)))?;
        if !seen.insert(index) {
            return Err(MirrorError::format(format!("partition {} listed twice", index)));
        }
        let start = parse_bytes(fields[1], "partition start")?;
        let end = parse_bytes(fields[2], "partition end")?;
        if end < start {
            return Err(MirrorError::format(format!(
                "partition {} ends at {} before its start {}",
                index, end, start
            )));
        }
        let size = end - start;
        if start + size > total_size {
            return Err(MirrorError::format(format!(
                "partition {} extends past the end of the disk ({} > {})",
                index,
                start + size,
                total_size
            )));
        }
        partitions.push(PartitionRecord {
            index,
            start,
            size,
            fs_type: FsType::parse(fields[4]),
        });
    }

    Ok(DiskGeometry {
        total_size,
        partitions,
    })
}

fn parse_bytes(field: &str, what: &str) -> Result<u64> {
    let digits = field.trim().trim_end_matches('B');
    digits
        .parse::<u64>()
        .map_err(|e| MirrorError::format(format!("{} {:?}: {}", what, field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "BYT;\n\
/dev/mmcblk0:10485760B:sd/mmc:512:512:msdos:SD card:;\n\
1:0B:1048576B:1048576B:fat32::lba;\n\
2:1048576B:10485760B:9437184B:btrfs::;\n";

    #[test]
    fn parses_disk_and_partitions() {
        let geometry = parse_listing(LISTING).expect("parse");
        assert_eq!(geometry.total_size, 10485760);
        assert_eq!(geometry.partitions.len(), 2);

        let boot = &geometry.partitions[0];
        assert_eq!(boot.index, 1);
        assert_eq!(boot.start, 0);
        assert_eq!(boot.size, 1048576);
        assert_eq!(boot.fs_type, Some(FsType::Fat32));

        let root = &geometry.partitions[1];
        assert_eq!(root.index, 2);
        assert_eq!(root.start, 1048576);
        assert_eq!(root.size, 10485760 - 1048576);
        assert_eq!(root.fs_type, Some(FsType::Btrfs));
    }

    #[test]
    fn duplicate_partition_number_is_rejected() {
        let listing = "BYT;\n/dev/sda:10485760B:scsi:512:512:msdos:Disk:;\n\
1:0B:1048576B:1048576B:fat32::;\n\
1:1048576B:10485760B:9437184B:btrfs::;\n";
        match parse_listing(listing) {
            Err(MirrorError::Format(msg)) => assert!(msg.contains("partition 1 listed twice")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn size_is_end_minus_start() {
        let listing = "BYT;\n/dev/sda:2000000B:scsi:512:512:gpt:Disk:;\n\
1:1024B:4095B:3072B:ext4::;\n\
2:4096B:1999999B:1995904B:::;\n\
3:7B:8B:1B:btrfs:x:;\n";
        let geometry = parse_listing(listing).expect("parse");
        let expected = [(1024u64, 4095u64), (4096, 1999999), (7, 8)];
        for (part, (start, end)) in geometry.partitions.iter().zip(expected) {
            assert_eq!(part.size, end - start);
        }
        assert_eq!(geometry.partitions[1].fs_type, None);
    }

    #[test]
    fn short_listings_are_format_errors() {
        for text in ["", "BYT;", "BYT;\n/dev/sda:100B:scsi:512:512:gpt:Disk:;"] {
            assert!(matches!(parse_listing(text), Err(MirrorError::Format(_))), "{:?}", text);
        }
    }

    #[test]
    fn short_partition_lines_are_skipped() {
        let listing = "BYT;\n/dev/sda:10000B:scsi:512:512:gpt:Disk:;\n\
1:0B:100B:100B:fat32::;\n\
garbage\n\
2:100B:200B\n\
\n\
3:200B:9000B:8800B:btrfs::;\n";
        let geometry = parse_listing(listing).expect("parse");
        let indices: Vec<u32> = geometry.partitions.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn bad_numbers_and_overruns_are_rejected() {
        let bad_size = "BYT;\n/dev/sda:lotsB:scsi:512:512:gpt:Disk:;\n1:0B:100B:100B:fat32::;\n";
        assert!(matches!(parse_listing(bad_size), Err(MirrorError::Format(_))));

        let overrun = "BYT;\n/dev/sda:1000B:scsi:512:512:gpt:Disk:;\n1:0B:2000B:2000B:fat32::;\n";
        assert!(matches!(parse_listing(overrun), Err(MirrorError::Format(_))));
    }
}
