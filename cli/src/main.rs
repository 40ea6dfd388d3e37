use afni::{Runner, SystemRunner};
use argparse::CliOpts;
use mprageise::{Cancel, Request};

mod argparse;

fn main() {
    color_backtrace::install();
    let args = argparse::get_args();
    setup_logger(args.verbose);
    log::trace!("Args: {:?}", args);

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        e.chain()
            .skip(1)
            .for_each(|cause| log::error!("because: {}", cause));
        std::process::exit(exit_code(&e));
    }
}

fn run(args: &CliOpts) -> anyhow::Result<()> {
    let cancel = Cancel::new();
    let handler = cancel.clone();
    ctrlc::set_handler(move || {
        log::warn!("interrupt received, stopping after the current AFNI command");
        handler.cancel();
    })?;

    let runner = match &args.afni_dir {
        Some(dir) => SystemRunner::in_dir(dir),
        None => SystemRunner::new(),
    };
    let request = args.request();
    prepare(&request, &runner)?;

    let outcome = mprageise::clean(&request, &runner, &cancel)?;
    println!("{}", outcome.output.display());
    Ok(())
}

/// Validate the request, then log the run banner. AFNI is only queried for
/// its version once the inputs are known to be usable.
fn prepare(request: &Request, runner: &dyn Runner) -> Result<(), mprageise::Error> {
    mprageise::check(request)?;
    if log::log_enabled!(log::Level::Info) {
        log::info!(
            "mprageise {} with {}",
            clap::crate_version!(),
            afni::version(runner)
        );
    }
    log::info!("INV2: {}", request.inv2.display());
    log::info!("UNI: {}", request.uni.display());
    log::info!("bias field: {}", request.mode);
    Ok(())
}

fn exit_code(e: &anyhow::Error) -> i32 {
    e.downcast_ref::<mprageise::Error>()
        .map(mprageise::Error::exit_code)
        .unwrap_or(1)
}

pub fn setup_logger(level: u8) {
    let mut builder = pretty_env_logger::formatted_timed_builder();

    let log_level = match level {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    builder.filter_level(log_level);
    builder.format_timestamp_millis();
    builder.init();
}
