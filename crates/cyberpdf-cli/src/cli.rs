// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments, logging setup and dispatch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use cyberpdf_core::ConfigStore;
use cyberpdf_core::data_dir;
use cyberpdf_core::types::{ConversionMethod, WatermarkPosition};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands;
use crate::ui::Ui;

#[derive(Parser, Debug)]
#[command(name = "cyberpdf", version)]
#[command(about = "Split, merge, encrypt, extract and convert PDF documents")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Preferences file. Defaults to ~/.config/cyberpdf/config.yaml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `cyberpdf_document=trace`. Overrides RUST_LOG.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Only print results and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split a PDF into several files
    Split {
        input: PathBuf,
        /// Split mode. `--pages` alone implies by_pages.
        #[arg(long, value_enum)]
        mode: Option<SplitModeArg>,
        /// Pages at which a new part begins, e.g. "4,9"
        #[arg(long)]
        pages: Option<String>,
        /// Pages per part for by_count
        #[arg(long, default_value_t = 10)]
        count: u32,
        #[arg(short, long, default_value = "./output")]
        output_dir: PathBuf,
    },

    /// Merge several PDFs into one
    Merge {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
        /// Custom page order as file:page pairs, e.g. "1:1,2:1,1:2"
        #[arg(long)]
        order: Option<String>,
    },

    /// Convert between PDF and Word
    Convert {
        input: PathBuf,
        #[arg(long, value_enum)]
        to: TargetFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// PDF to Word method: auto, text or libreoffice
        #[arg(long, default_value = "auto")]
        method: ConversionMethod,
    },

    /// Protect a PDF with a password
    Encrypt {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Ask for a separate owner password
        #[arg(long)]
        owner_password: bool,
        #[arg(long)]
        no_print: bool,
        #[arg(long)]
        no_copy: bool,
        #[arg(long)]
        no_modify: bool,
        #[arg(long)]
        no_annotate: bool,
    },

    /// Remove password protection
    Decrypt {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Stamp a text watermark on every page
    Watermark {
        input: PathBuf,
        #[arg(long)]
        text: String,
        #[arg(long, default_value = "center")]
        position: WatermarkPosition,
        #[arg(long, default_value_t = 0.3)]
        opacity: f32,
        #[arg(long, default_value_t = 48.0)]
        font_size: f32,
        /// Hex colour such as "#808080"
        #[arg(long)]
        color: Option<String>,
        /// 0, 90, 180 or 270
        #[arg(long, default_value_t = 0)]
        rotation: i32,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rotate pages by a multiple of 90 degrees
    Rotate {
        input: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        degrees: i32,
        /// Pages to rotate, e.g. "1-3,5". All pages when omitted.
        #[arg(long)]
        pages: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reorder, drop or duplicate pages
    Arrange {
        input: PathBuf,
        /// New page order, e.g. "3,1,2" or "1-4,4"
        #[arg(long)]
        order: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract the text of a PDF
    ExtractText {
        input: PathBuf,
        /// A single page or range, e.g. "3" or "3-7"
        #[arg(long)]
        pages: Option<String>,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Save the images embedded in a PDF
    ExtractImages {
        input: PathBuf,
        #[arg(short, long, default_value = "./images")]
        output_dir: PathBuf,
    },

    /// Show document information
    Info {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Report encryption, permissions, metadata and JavaScript
    Security {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Write a copy without document metadata
    StripMetadata {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Recognise text in a scanned PDF or image
    Ocr {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Directory holding text-detection.rten and text-recognition.rten
        #[arg(long)]
        models: Option<PathBuf>,
    },

    /// Process every file matching a glob pattern
    Batch {
        #[command(subcommand)]
        action: BatchCommand,
    },

    /// Inspect or empty the cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// Read or change preferences
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum BatchCommand {
    /// Convert many files
    Convert {
        #[arg(default_value = "*.docx")]
        pattern: String,
        #[arg(long, value_enum, default_value = "pdf")]
        to: TargetFormat,
        #[arg(short, long, default_value = "./output")]
        output_dir: PathBuf,
    },
    /// Protect many files with the same password
    Encrypt {
        #[arg(default_value = "*.pdf")]
        pattern: String,
        #[arg(short, long, default_value = "./output")]
        output_dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show entry counts and disk usage
    Stats,
    /// Delete everything in the cache
    Clear,
    /// Delete cached files older than the given age
    Cleanup {
        #[arg(long, default_value_t = 24)]
        max_age_hours: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the value at a dotted key such as general.theme
    Get { key: String },
    /// Set a dotted key; the value is read as YAML (true, 42, light)
    Set { key: String, value: String },
    /// Restore the defaults
    Reset,
    /// Print the location of the preferences file
    Path,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitModeArg {
    #[value(name = "by_pages", alias = "by-pages")]
    ByPages,
    #[value(name = "by_count", alias = "by-count")]
    ByCount,
    #[value(name = "by_bookmarks", alias = "by-bookmarks")]
    ByBookmarks,
    Smart,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetFormat {
    Pdf,
    #[value(alias = "word")]
    Docx,
}

pub async fn dispatch(args: Args) -> Result<()> {
    let _guard = init_logging(&args, &data_dir::config_dir())?;
    let ui = Ui::new(args.quiet);

    let config_path = args.config.clone().unwrap_or_else(data_dir::config_file);
    let mut store = ConfigStore::load(&config_path)
        .with_context(|| format!("load preferences: {}", config_path.display()))?;
    debug!(config = %store.path().display(), "preferences loaded");

    commands::run(&ui, &mut store, args.cmd).await
}

/// Log to stderr and to a daily file in `log_dir`.
///
/// `--log-level` wins over RUST_LOG; without either the level is `info`,
/// or `warn` with `--quiet`.
fn init_logging(args: &Args, log_dir: &Path) -> Result<Option<WorkerGuard>> {
    let fallback = if args.quiet { "warn" } else { "info" };
    let filter = match args.log_level.as_deref() {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| anyhow!("invalid log filter '{level}': {e}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .boxed();

    // A missing or read-only config directory only costs the file log.
    let appender = std::fs::create_dir_all(log_dir).ok().and_then(|()| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("cyberpdf")
            .filename_suffix("log")
            .build(log_dir)
            .ok()
    });
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn split_defaults() {
        let args = parse(&["cyberpdf", "split", "in.pdf"]);
        match args.cmd {
            Command::Split {
                input,
                mode,
                pages,
                count,
                output_dir,
            } => {
                assert_eq!(input, PathBuf::from("in.pdf"));
                assert_eq!(mode, None);
                assert_eq!(pages, None);
                assert_eq!(count, 10);
                assert_eq!(output_dir, PathBuf::from("./output"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn split_mode_names_accept_both_spellings() {
        for name in ["by_bookmarks", "by-bookmarks"] {
            let args = parse(&["cyberpdf", "split", "in.pdf", "--mode", name]);
            assert!(matches!(
                args.cmd,
                Command::Split {
                    mode: Some(SplitModeArg::ByBookmarks),
                    ..
                }
            ));
        }
    }

    #[test]
    fn merge_needs_inputs_and_output() {
        assert!(Args::try_parse_from(["cyberpdf", "merge", "-o", "out.pdf"]).is_err());
        assert!(Args::try_parse_from(["cyberpdf", "merge", "a.pdf", "b.pdf"]).is_err());

        let args = parse(&["cyberpdf", "merge", "a.pdf", "b.pdf", "-o", "out.pdf"]);
        match args.cmd {
            Command::Merge { inputs, output, order } => {
                assert_eq!(inputs.len(), 2);
                assert_eq!(output, PathBuf::from("out.pdf"));
                assert!(order.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn convert_accepts_word_alias_and_method() {
        let args = parse(&[
            "cyberpdf", "convert", "a.pdf", "--to", "word", "--method", "text",
        ]);
        match args.cmd {
            Command::Convert { to, method, .. } => {
                assert_eq!(to, TargetFormat::Docx);
                assert_eq!(method, ConversionMethod::Text);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(
            Args::try_parse_from(["cyberpdf", "convert", "a.pdf", "--to", "odt"]).is_err()
        );
    }

    #[test]
    fn watermark_position_parses() {
        let args = parse(&[
            "cyberpdf", "watermark", "a.pdf", "--text", "DRAFT", "--position", "diagonal",
        ]);
        match args.cmd {
            Command::Watermark {
                position, opacity, ..
            } => {
                assert_eq!(position, WatermarkPosition::Diagonal);
                assert!((opacity - 0.3).abs() < f32::EPSILON);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rotate_accepts_negative_degrees() {
        let args = parse(&["cyberpdf", "rotate", "a.pdf", "--degrees", "-90"]);
        assert!(matches!(args.cmd, Command::Rotate { degrees: -90, .. }));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = parse(&[
            "cyberpdf", "info", "a.pdf", "--quiet", "--log-level", "debug", "--config", "c.yaml",
        ]);
        assert!(args.quiet);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.config, Some(PathBuf::from("c.yaml")));
    }

    #[test]
    fn nested_subcommands() {
        let args = parse(&["cyberpdf", "cache", "cleanup", "--max-age-hours", "2"]);
        assert!(matches!(
            args.cmd,
            Command::Cache {
                action: CacheCommand::Cleanup { max_age_hours: 2 }
            }
        ));

        let args = parse(&["cyberpdf", "batch", "convert"]);
        match args.cmd {
            Command::Batch {
                action: BatchCommand::Convert { pattern, to, .. },
            } => {
                assert_eq!(pattern, "*.docx");
                assert_eq!(to, TargetFormat::Pdf);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let args = parse(&["cyberpdf", "config", "set", "general.theme", "light"]);
        assert!(matches!(
            args.cmd,
            Command::Config {
                action: ConfigCommand::Set { .. }
            }
        ));
    }
}
