// ABOUTME: Console logging setup for the CLI
// ABOUTME: env_logger with a compact timestamped format, RUST_LOG wins

use log::LevelFilter;
use std::io::Write;

/// Default level is `warn`, or `info` with `--verbose`. `RUST_LOG`
/// overrides both.
pub fn init_logger(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(default_level)
        .target(env_logger::Target::Stderr);

    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    // Ignore error if logger is already initialized
    builder.try_init().ok();
}
