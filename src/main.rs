use clap::Parser;
use stylematch_candle::core;

fn main() -> anyhow::Result<()> {
    let matcher = core::Matcher::parse();
    let _log_handle = log4rs::init_config(core::build_log_config(&matcher)?)?;

    core::run(&matcher)?;
    Ok(())
}
