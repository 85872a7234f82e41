use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use analytics_runtime::sink::{JsonLinesSink, NodeSink};
use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI log-level name onto a tracing filter directive.
///
/// Unrecognised names are passed through unchanged so that full
/// `EnvFilter` directives (`analytics_source=debug`) also work.
pub fn filter_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr; stdout is reserved for emitted nodes.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(filter_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .init();

    Ok(())
}

// ── Output bootstrap ───────────────────────────────────────────────────────────

/// Where emitted nodes go: stdout, or a file staged next to `--output` and
/// moved into place only once the run succeeds.
pub struct NodeOutput {
    sink: JsonLinesSink<Box<dyn Write>>,
    staged: Option<Staged>,
}

struct Staged {
    tmp: PathBuf,
    target: PathBuf,
}

impl NodeOutput {
    /// Open `output` (parent directories are created), or stdout when absent.
    pub fn open(output: Option<&Path>) -> anyhow::Result<Self> {
        let (writer, staged) = match output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                let tmp = path.with_extension("jsonl.tmp");
                let file = File::create(&tmp)
                    .with_context(|| format!("failed to open {}", tmp.display()))?;
                let staged = Staged {
                    tmp,
                    target: path.to_path_buf(),
                };
                (Box::new(BufWriter::new(file)) as Box<dyn Write>, Some(staged))
            }
            None => (Box::new(BufWriter::new(std::io::stdout())) as Box<dyn Write>, None),
        };
        Ok(Self {
            sink: JsonLinesSink::new(writer),
            staged,
        })
    }

    pub fn sink(&mut self) -> &mut JsonLinesSink<Box<dyn Write>> {
        &mut self.sink
    }

    /// Flush, then replace the target file with the staged one.
    pub fn commit(self) -> anyhow::Result<()> {
        let Self { mut sink, staged } = self;
        sink.finish()?;
        drop(sink);

        if let Some(Staged { tmp, target }) = staged {
            std::fs::rename(&tmp, &target).with_context(|| {
                format!("failed to move {} to {}", tmp.display(), target.display())
            })?;
        }
        Ok(())
    }

    /// Flush what was emitted but leave the target untouched. Returns the
    /// staged file holding the partial output, if any.
    pub fn abandon(self) -> anyhow::Result<Option<PathBuf>> {
        let Self { mut sink, staged } = self;
        sink.finish()?;
        Ok(staged.map(|s| s.tmp))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
