use std::any::Any;
use std::path::Path;

pub const LOG_FILE_BASENAME: &str = "planner";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;
pub const LOG_ENV: &str = "PLANNER_LOG";

/// Log files live next to settings.json in the data directory.
pub fn log_directory(data_dir: &Path) -> &Path {
    data_dir
}

/// Picks the logger spec: `PLANNER_LOG`, then `RUST_LOG`, then a build-dependent default.
pub fn resolve_log_spec(planner_log: Option<String>, rust_log: Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,planner_core=debug"
    } else {
        "warn,planner_core=info"
    };
    planner_log
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

#[cfg(feature = "runtime")]
pub fn init_logging(data_dir: &Path) -> Result<flexi_logger::LoggerHandle, flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    std::fs::create_dir_all(data_dir)?;

    let spec = resolve_log_spec(std::env::var(LOG_ENV).ok(), std::env::var("RUST_LOG").ok());

    let handle = Logger::try_with_str(spec)?
        .log_to_file(
            FileSpec::default()
                .directory(log_directory(data_dir))
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stdout(if cfg!(debug_assertions) {
            Duplicate::Info
        } else {
            Duplicate::None
        })
        .start()?;

    install_panic_hook(data_dir);

    log::info!(
        "logger initialized dir={} rotate_size_bytes={} keep_files={}",
        log_directory(data_dir).display(),
        LOG_ROTATE_SIZE_BYTES,
        LOG_ROTATE_KEEP_FILES
    );
    Ok(handle)
}

/// Text of a panic payload; panics carry either `&str` or `String`.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        return *text;
    }
    payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .unwrap_or("<non-string panic payload>")
}

#[cfg(feature = "runtime")]
fn install_panic_hook(data_dir: &Path) {
    let data_dir = data_dir.display().to_string();
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let location = info
            .location()
            .map(|loc| loc.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        log::error!(
            "planner: panic message={:?} at={location} data_dir={data_dir}\n{}",
            panic_message(info.payload()),
            std::backtrace::Backtrace::force_capture()
        );
        log::logger().flush();
        default_hook(info);
    }));
}
