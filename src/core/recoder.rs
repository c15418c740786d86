use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

pub fn build_log_config(matcher: &crate::core::parser::Matcher) -> anyhow::Result<log4rs::Config> {
    let level = log::LevelFilter::Info;
    let mut log_path = std::path::PathBuf::from(&matcher.recoder_home).join(&matcher.name);
    if !log_path.exists() {
        std::fs::create_dir_all(&log_path)?;
    }

    log_path.push(chrono::Local::now().format("%Y%m-%d--%H:%M:%S").to_string() + ".log");

    // Build a stderr logger.
    let stderr = ConsoleAppender::builder().target(Target::Stderr).build();

    // Logging to log file.
    let logfile = FileAppender::builder()
        // Pattern: https://docs.rs/log4rs/*/log4rs/encode/pattern/index.html
        .encoder(Box::new(PatternEncoder::new(
            "{d(%+)(utc)} [{f}:{L}] {h({l})} -> {m}{n}",
        )))
        .build(log_path)?;

    // Debug and up goes to the file, the programmatically specified level to
    // stderr.
    let config = Config::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(level)))
                .build("stderr", Box::new(stderr)),
        )
        .build(
            Root::builder()
                .appender("logfile")
                .appender("stderr")
                .build(log::LevelFilter::Trace),
        )?;

    Ok(config)
}
