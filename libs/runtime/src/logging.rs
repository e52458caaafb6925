//! Tracing setup driven by [`LoggingConfig`].
//!
//! Every named section gets its own console layer and, when `file` is set, a
//! JSON file layer with size-based rotation. The `default` section catches
//! all targets that no named section claims.

use std::{
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use parking_lot::Mutex;
use tracing::{level_filters::LevelFilter, Level, Metadata};
use tracing_subscriber::{
    filter::{FilterFn, Targets},
    fmt,
    prelude::*,
    Layer, Registry,
};

use crate::config::{LoggingConfig, Section};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

const DEFAULT_SECTION: &str = "default";

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// Returns true if target == prefix or target starts with "prefix::"
fn matches_target_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// Shared handle to a rotating log file.
#[derive(Clone)]
struct RotatingFile(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().flush()
    }
}

impl<'a> fmt::MakeWriter<'a> for RotatingFile {
    type Writer = RotatingFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Resolve a log file path against `base_dir` (home_dir).
/// Absolute paths are kept as-is.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Open a rotating writer, creating the parent directory if needed.
fn open_rotating_file(log_path: &Path, section: &Section) -> std::io::Result<RotatingFile> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let max_bytes = section.max_size_mb.unwrap_or(100) * 1024 * 1024;
    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(FileLimit::MaxFiles(section.max_backups.unwrap_or(3))),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotatingFile(Arc::new(Mutex::new(rot))))
}

fn file_writer(name: &str, section: &Section, base_dir: &Path) -> Option<RotatingFile> {
    if section.file.trim().is_empty() {
        return None;
    }
    let log_path = resolve_log_path(&section.file, base_dir);
    match open_rotating_file(&log_path, section) {
        Ok(writer) => Some(writer),
        Err(e) => {
            eprintln!(
                "Failed to init log file for section '{}': {} ({})",
                name,
                log_path.to_string_lossy(),
                e
            );
            None
        }
    }
}

fn console_layer(ansi: bool) -> impl Layer<Registry> + Send + Sync {
    fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
}

fn json_file_layer(writer: RotatingFile) -> impl Layer<Registry> + Send + Sync {
    fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(writer)
}

fn target_filter(target: &str, level: Level) -> Targets {
    Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target(target.to_owned(), LevelFilter::from_level(level))
}

/// Everything not claimed by a named section, up to `max_level`.
fn unclaimed_filter(
    claimed: Arc<Vec<String>>,
    max_level: Level,
) -> FilterFn<impl Fn(&Metadata<'_>) -> bool + Send + Sync + 'static> {
    FilterFn::new(move |meta: &Metadata<'_>| {
        !claimed
            .iter()
            .any(|prefix| matches_target_prefix(meta.target(), prefix))
            && *meta.level() <= max_level
    })
}

fn build_layers(cfg: &LoggingConfig, base_dir: &Path, ansi: bool) -> Vec<BoxedLayer> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let mut named: Vec<(&String, &Section)> = cfg
        .iter()
        .filter(|(name, _)| name.as_str() != DEFAULT_SECTION)
        .collect();
    named.sort_by(|a, b| a.0.cmp(b.0));

    for (target, section) in &named {
        if let Some(level) = parse_tracing_level(&section.console_level) {
            layers.push(
                console_layer(ansi)
                    .with_filter(target_filter(target, level))
                    .boxed(),
            );
        }
        if let (Some(writer), Some(level)) = (
            file_writer(target, section, base_dir),
            parse_tracing_level(&section.file_level),
        ) {
            layers.push(
                json_file_layer(writer)
                    .with_filter(target_filter(target, level))
                    .boxed(),
            );
        }
    }

    if let Some(section) = cfg.get(DEFAULT_SECTION) {
        let claimed = Arc::new(named.iter().map(|(n, _)| (*n).clone()).collect::<Vec<_>>());
        if let Some(level) = parse_tracing_level(&section.console_level) {
            layers.push(
                console_layer(ansi)
                    .with_filter(unclaimed_filter(claimed.clone(), level))
                    .boxed(),
            );
        }
        if let (Some(writer), Some(level)) = (
            file_writer(DEFAULT_SECTION, section, base_dir),
            parse_tracing_level(&section.file_level),
        ) {
            layers.push(
                json_file_layer(writer)
                    .with_filter(unclaimed_filter(claimed, level))
                    .boxed(),
            );
        }
    }

    layers
}

/// Initialize the global subscriber.
/// - `cfg`: logging sections
/// - `base_dir`: base for relative log file paths (usually home_dir)
///
/// Does nothing if a global subscriber is already installed.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    let layers = build_layers(cfg, base_dir, std::io::stdout().is_terminal());
    if layers.is_empty() {
        let _ = fmt()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .try_init();
        return;
    }

    let _ = Registry::default().with(layers).try_init();
}
