use std::path::Path;

use chrono::Local;
use tracing::info;

use crate::backup::btrbk::Btrbk;
use crate::backup::BackupSession;
use crate::cli::args::Cli;
use crate::config::model::Settings;
use crate::error::{MirrorError, Result};
use crate::image::{prepare_image, Preparation};
use crate::remote::SshSession;
use crate::util::command::SystemRunner;

pub fn run_backup_command(cli: &Cli, settings: &Settings) -> Result<()> {
    if !Path::new(&cli.device).is_absolute() {
        return Err(MirrorError::message(format!(
            "device {} must be an absolute path",
            cli.device
        )));
    }
    println!("{}", Local::now().format("%d-%m-%Y %H:%M"));

    let remote = SshSession::connect(&cli.hostname, settings)?;
    let runner = SystemRunner;

    let preparation = prepare_image(&remote, &runner, settings, &cli.device, &cli.output)?;
    if preparation == Preparation::Initialized {
        info!(image = %cli.output.display(), "initial image created");
    }

    let sync = Btrbk::new(&runner, &settings.sync_config);
    let mut session = BackupSession::new(
        &remote,
        &runner,
        &sync,
        settings,
        &cli.device,
        &cli.output,
    );
    session.run()?;

    println!("{}", Local::now().format("%d-%m-%Y %H:%M"));
    Ok(())
}
