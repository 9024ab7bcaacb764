/// Device name prefixes whose partitions are named `<disk>p<N>`.
const SEPARATED_PREFIXES: [&str; 5] = ["mmcblk", "nvme", "loop", "nbd", "md"];

/// Path of partition `index` (1-based) of `device`.
pub fn partition_path(device: &str, index: u32) -> String {
    if uses_separator(device) {
        format!("{}p{}", device, index)
    } else {
        format!("{}{}", device, index)
    }
}

fn uses_separator(device: &str) -> bool {
    let name = device.rsplit('/').next().unwrap_or(device);
    if SEPARATED_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
        return true;
    }
    // The kernel inserts `p` whenever the disk name itself ends in a digit.
    name.chars().last().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_partition_paths() {
        assert_eq!(partition_path("/dev/mmcblk0", 2), "/dev/mmcblk0p2");
        assert_eq!(partition_path("/dev/sda", 2), "/dev/sda2");
        assert_eq!(partition_path("/dev/nvme0n1", 1), "/dev/nvme0n1p1");
        assert_eq!(partition_path("/dev/loop0", 2), "/dev/loop0p2");
        assert_eq!(partition_path("/dev/vdb", 1), "/dev/vdb1");
        assert_eq!(partition_path("/dev/disk9", 3), "/dev/disk9p3");
    }
}
