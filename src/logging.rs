use anyhow::{Context, anyhow};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging based on output mode and debug flag
///
/// `json` switches the stderr layer to one JSON object per line, matching
/// `--output json`. With a log file, the returned guard must be held until
/// exit so buffered lines get flushed.
pub fn init_logging(
    debug: bool,
    quiet: bool,
    json: bool,
    log_file: Option<PathBuf>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::new(filter_directive(debug, quiet));

    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(debug)
            .with_file(debug)
            .with_writer(std::io::stderr)
    });

    let json_stderr = json.then(|| json_layer(std::io::stderr));

    let (file_layer, guard) = match log_file {
        Some(log_path) => {
            let (dir, filename) = split_log_path(&log_path)?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(&dir, filename);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_target(true)
                .with_line_number(true)
                .with_file(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_stderr)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// One JSON object per event, without span context
fn json_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .with_target(false)
        .with_writer(writer)
}

fn filter_directive(debug: bool, quiet: bool) -> &'static str {
    if debug {
        "cardflow=debug"
    } else if quiet {
        "cardflow=error"
    } else {
        "cardflow=info"
    }
}

fn split_log_path(path: &Path) -> anyhow::Result<(PathBuf, String)> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Log file path has no file name: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, filename))
}

/// Get default log file path for a graph
pub fn default_log_path(graph_name: &str) -> anyhow::Result<PathBuf> {
    let log_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("cardflow")
        .join("logs");

    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let filename = format!("{}-{}.log", graph_name, timestamp);

    Ok(log_dir.join(filename))
}
