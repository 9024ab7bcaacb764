use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "btrmirror",
    version,
    about = "Mirror a remote disk into a local image and keep its btrfs subvolume in sync"
)]
pub struct Cli {
    /// Hostname or IP address of the remote device
    pub hostname: String,
    /// Block device to back up (e.g. /dev/mmcblk0)
    pub device: String,
    /// Local disk image file
    pub output: PathBuf,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Remote login user
    #[arg(long)]
    pub user: Option<String>,
    /// Subvolume to keep in sync
    #[arg(long)]
    pub subvolume: Option<String>,
    /// Loop device to bind the image to instead of a free one
    #[arg(long)]
    pub loop_device: Option<PathBuf>,
    /// Verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_arguments() {
        let cli = Cli::try_parse_from(["btrmirror", "pi.local", "/dev/mmcblk0", "/srv/pi.img"])
            .expect("parse");
        assert_eq!(cli.hostname, "pi.local");
        assert_eq!(cli.device, "/dev/mmcblk0");
        assert_eq!(cli.output, PathBuf::from("/srv/pi.img"));
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn overrides_and_missing_arguments() {
        let cli = Cli::try_parse_from([
            "btrmirror",
            "--subvolume",
            "@home",
            "--loop-device",
            "/dev/loop3",
            "-v",
            "10.0.0.2",
            "/dev/sda",
            "sda.img",
        ])
        .expect("parse");
        assert_eq!(cli.subvolume.as_deref(), Some("@home"));
        assert_eq!(cli.loop_device, Some(PathBuf::from("/dev/loop3")));
        assert!(cli.verbose);

        assert!(Cli::try_parse_from(["btrmirror", "10.0.0.2", "/dev/sda"]).is_err());
    }
}
