use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use rowpeek::{AppConfig, Args, ConfigManager, OpenOptions, APP_NAME};
use std::path::Path;

fn init_logging(log: Option<&Path>) -> Result<()> {
    // the terminal belongs to the UI, so logs only go to a file
    let Some(path) = log else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .map_err(|e| eyre!("Could not create log file {}: {}", path.display(), e))?;
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Handle flags that do their work and exit without opening a dataset.
fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        let path = manager.write_default_config(args.force)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(Some(()));
    }
    Ok(None)
}

fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install()?;

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    init_logging(args.log.as_deref())?;

    let config = AppConfig::load(APP_NAME)?;
    let options = OpenOptions::from_args_and_config(&args, &config)?;
    let url = args
        .url
        .clone()
        .ok_or_else(|| eyre!("A dataset URL or path is required"))?;

    if let Some(range) = args.print_range {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        rowpeek::print_range(&url, &options, range, &mut out)?;
        return Ok(());
    }

    log::info!("{} {} starting on {}", APP_NAME, env!("CARGO_PKG_VERSION"), url);
    if let Err(e) = rowpeek::run(url, options, config) {
        eprintln!("Error: {}", rowpeek::error_display::user_message_from_report(&e));
        std::process::exit(1);
    }
    Ok(())
}
