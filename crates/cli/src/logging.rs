use log::LevelFilter;

use crate::error::CliError;

/// Install the process-wide logger. Log lines go to stderr so that command
/// output on stdout stays machine readable.
pub(crate) fn init_logger(level: LevelFilter) -> Result<(), CliError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;

    Ok(())
}
