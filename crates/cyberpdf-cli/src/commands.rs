// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand handlers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use cyberpdf_cache::CacheManager;
use cyberpdf_core::ConfigStore;
use cyberpdf_core::config::parse_value;
use cyberpdf_core::error::CyberPdfError;
use cyberpdf_core::human_errors::humanize_error;
use cyberpdf_core::output::write_bytes_atomic;
use cyberpdf_core::types::{
    PdfMetadata, Permissions, SecurityReport, SplitMode, WatermarkOptions, parse_page_refs,
    parse_page_selection,
};
use cyberpdf_document::operations;
use cyberpdf_security::{DecryptOutcome, check_security, decrypt_file, encrypt_file, hash_file};
use cyberpdf_security::remove_metadata;
use tracing::{debug, warn};

use crate::cli::{BatchCommand, CacheCommand, Command, ConfigCommand, SplitModeArg, TargetFormat};
use crate::ui::Ui;

/// Fonts listed by `info` before the rest are summarised.
const MAX_LISTED_FONTS: usize = 10;

pub async fn run(ui: &Ui, store: &mut ConfigStore, cmd: Command) -> Result<()> {
    match cmd {
        Command::Split {
            input,
            mode,
            pages,
            count,
            output_dir,
        } => {
            let mode = split_mode(mode, pages.as_deref(), count)?;
            let parts = ui
                .run("split", move |r| {
                    operations::split(&input, &output_dir, &mode, r)
                })
                .await?;
            ui.success(format!("Split into {} files:", parts.len()));
            for part in &parts {
                ui.item(part.display());
            }
        }

        Command::Merge {
            inputs,
            output,
            order,
        } => {
            let order = order.as_deref().map(parse_page_refs).transpose()?;
            let count = inputs.len();
            let path = ui
                .run("merge", move |r| {
                    operations::merge(&inputs, &output, order.as_deref(), r)
                })
                .await?;
            ui.success(format!("Merged {count} files into {}", path.display()));
        }

        Command::Convert {
            input,
            to,
            output,
            method,
        } => {
            let conversion = Conversion::for_input(&input, to)?;
            let output = output.unwrap_or_else(|| input.with_extension(conversion.extension()));
            let path = ui
                .run("convert", move |r| match conversion {
                    Conversion::WordToPdf => operations::word_to_pdf(&input, &output, r),
                    Conversion::PdfToWord => operations::pdf_to_word(&input, &output, method, r),
                })
                .await?;
            ui.success(format!("Converted to {}", path.display()));
        }

        Command::Encrypt {
            input,
            output,
            owner_password,
            no_print,
            no_copy,
            no_modify,
            no_annotate,
        } => {
            let output = output.unwrap_or_else(|| sibling_output(&input, "_encrypted", "pdf"));
            let user = prompt_new_password("Password")?;
            let owner = if owner_password {
                Some(prompt_new_password("Owner password")?)
            } else {
                None
            };
            let permissions = Permissions {
                print: !no_print,
                print_high_quality: !no_print,
                copy: !no_copy,
                modify: !no_modify,
                annotate: !no_annotate,
                ..Permissions::all()
            };
            let path = ui
                .run("encrypt", move |r| {
                    encrypt_file(&input, &output, &user, owner.as_deref(), permissions, r)
                })
                .await?;
            ui.success(format!("Encrypted to {}", path.display()));
        }

        Command::Decrypt { input, output } => {
            let output = output.unwrap_or_else(|| sibling_output(&input, "_decrypted", "pdf"));
            let password = rpassword::prompt_password("Password: ")?;
            let target = output.clone();
            let outcome = ui
                .run("decrypt", move |r| decrypt_file(&input, &output, &password, r))
                .await?;
            match outcome {
                DecryptOutcome::Decrypted { owner: true } => ui.success(format!(
                    "Decrypted with the owner password to {}",
                    target.display()
                )),
                DecryptOutcome::Decrypted { owner: false } => {
                    ui.success(format!("Decrypted to {}", target.display()))
                }
                DecryptOutcome::NotEncrypted => ui.success(format!(
                    "File was not encrypted; copied to {}",
                    target.display()
                )),
            }
        }

        Command::Watermark {
            input,
            text,
            position,
            opacity,
            font_size,
            color,
            rotation,
            output,
        } => {
            let output = output.unwrap_or_else(|| sibling_output(&input, "_watermarked", "pdf"));
            let mut options = WatermarkOptions::new(text);
            options.position = position;
            options.opacity = opacity;
            options.font_size = font_size;
            options.rotation = rotation;
            if let Some(color) = color.as_deref() {
                options.color = parse_color(color)?;
            }
            options.validate()?;
            let path = ui
                .run("watermark", move |r| {
                    operations::watermark(&input, &output, &options, r)
                })
                .await?;
            ui.success(format!("Watermark added: {}", path.display()));
        }

        Command::Rotate {
            input,
            degrees,
            pages,
            output,
        } => {
            let output = output.unwrap_or_else(|| sibling_output(&input, "_rotated", "pdf"));
            let pages = pages.as_deref().map(parse_page_selection).transpose()?;
            let path = ui
                .run("rotate", move |r| {
                    let pages = match pages {
                        Some(pages) => pages,
                        None => (1..=operations::pdf_info(&input)?.page_count).collect(),
                    };
                    let rotations = rotation_map(&pages, degrees);
                    operations::rotate(&input, &output, &rotations, r)
                })
                .await?;
            ui.success(format!("Rotated pages saved to {}", path.display()));
        }

        Command::Arrange {
            input,
            order,
            output,
        } => {
            let output = output.unwrap_or_else(|| sibling_output(&input, "_arranged", "pdf"));
            let order = parse_page_selection(&order)?;
            let path = ui
                .run("arrange", move |r| {
                    operations::arrange(&input, &output, &order, r)
                })
                .await?;
            ui.success(format!("Arranged pages saved to {}", path.display()));
        }

        Command::ExtractText {
            input,
            pages,
            output,
        } => {
            let range = pages.as_deref().map(parse_range).transpose()?;
            let text = ui
                .run("extract-text", move |_| operations::extract_text(&input, range))
                .await?;
            match output {
                Some(output) => {
                    let path = write_bytes_atomic(&output, text.as_bytes())?;
                    ui.success(format!("Text extracted to {}", path.display()));
                }
                None => println!("{text}"),
            }
        }

        Command::ExtractImages { input, output_dir } => {
            let dir = output_dir.clone();
            let images = ui
                .run("extract-images", move |r| {
                    operations::extract_images(&input, &output_dir, r)
                })
                .await?;
            ui.success(format!(
                "Extracted {} images to {}",
                images.len(),
                dir.display()
            ));
        }

        Command::Info { input, json } => info(ui, store, input, json).await?,

        Command::Security { input, json } => {
            let report = ui.run("security", move |_| check_security(&input)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_security(&report);
            }
        }

        Command::StripMetadata { input, output } => {
            let output = output.unwrap_or_else(|| sibling_output(&input, "_clean", "pdf"));
            let path = ui
                .run("strip-metadata", move |r| remove_metadata(&input, &output, r))
                .await?;
            ui.success(format!("Metadata removed: {}", path.display()));
        }

        Command::Ocr {
            input,
            output,
            models,
        } => ocr(ui, input, output, models).await?,

        Command::Batch { action } => batch(ui, action).await?,
        Command::Cache { action } => cache(ui, store, action)?,
        Command::Config { action } => config(store, action)?,
    }
    Ok(())
}

fn hours(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(3600))
}

async fn info(ui: &Ui, store: &ConfigStore, input: PathBuf, json: bool) -> Result<()> {
    // Keyed by content so a changed file is never served stale data.
    let digest = hash_file(&input)?;
    let cache_id = format!("info_{digest}");
    let mut cache = open_cache(store);

    let cached = cache
        .as_mut()
        .and_then(|c| c.get_operation_result::<PdfMetadata>(&cache_id).ok().flatten());
    let metadata = match cached {
        Some(metadata) => {
            debug!("document information served from cache");
            metadata
        }
        None => {
            let path = input.clone();
            match ui.run("info", move |_| operations::pdf_info(&path)).await {
                Ok(metadata) => {
                    if let Some(cache) = cache.as_mut() {
                        if let Err(e) = cache.cache_operation_result(&cache_id, &metadata) {
                            warn!(error = %e, "could not cache document information");
                        }
                    }
                    metadata
                }
                Err(CyberPdfError::Encrypted) => {
                    let report = ui.run("security", move |_| check_security(&input)).await?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        println!("Encrypted: yes");
                        if let Some(encryption) = &report.encryption {
                            println!("Encryption: {encryption}");
                        }
                        println!("Decrypt the file to see its pages and metadata.");
                    }
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    } else {
        print_info(&metadata);
    }
    Ok(())
}

fn print_info(metadata: &PdfMetadata) {
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "N/A".into());

    println!("Pages: {}", metadata.page_count);
    println!(
        "File Size: {:.2} MB",
        metadata.file_size as f64 / (1024.0 * 1024.0)
    );
    println!("PDF Version: {}", metadata.pdf_version);
    println!("Title: {}", text(&metadata.title));
    println!("Author: {}", text(&metadata.author));
    println!("Subject: {}", text(&metadata.subject));
    println!("Keywords: {}", text(&metadata.keywords));
    println!("Creator: {}", text(&metadata.creator));
    println!("Producer: {}", text(&metadata.producer));
    if let Some(created) = metadata.creation_date {
        println!("Created: {}", created.to_rfc3339());
    }
    if let Some(modified) = metadata.modification_date {
        println!("Modified: {}", modified.to_rfc3339());
    }
    println!("Encrypted: {}", yes_no(metadata.encrypted));
    println!("Images: {}", metadata.image_count);

    if !metadata.fonts.is_empty() {
        println!("Fonts:");
        for font in metadata.fonts.iter().take(MAX_LISTED_FONTS) {
            println!("  - {font}");
        }
        if metadata.fonts.len() > MAX_LISTED_FONTS {
            println!("  ... and {} more", metadata.fonts.len() - MAX_LISTED_FONTS);
        }
    }
}

fn print_security(report: &SecurityReport) {
    println!("Encrypted: {}", yes_no(report.is_encrypted));
    if let Some(encryption) = &report.encryption {
        println!("Encryption: {encryption}");
    }
    if let Some(permissions) = &report.permissions {
        println!("Permissions:");
        println!("  Print: {}", yes_no(permissions.print));
        println!("  Modify: {}", yes_no(permissions.modify));
        println!("  Copy: {}", yes_no(permissions.copy));
        println!("  Annotate: {}", yes_no(permissions.annotate));
    }
    if report.has_metadata {
        println!("Metadata: {}", report.metadata_fields.join(", "));
    } else {
        println!("Metadata: none");
    }
    println!("JavaScript: {}", yes_no(report.has_javascript));
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

#[cfg(feature = "ocr")]
async fn ocr(
    ui: &Ui,
    input: PathBuf,
    output: Option<PathBuf>,
    models: Option<PathBuf>,
) -> Result<()> {
    use cyberpdf_document::{OcrEngine, OcrModels};

    let models = models.map(OcrModels::from_dir).unwrap_or_default();
    let text = ui
        .run("ocr", move |r| {
            let engine = OcrEngine::new(&models)?;
            operations::ocr(&input, &engine, r)
        })
        .await?;
    match output {
        Some(output) => {
            let path = write_bytes_atomic(&output, text.as_bytes())?;
            ui.success(format!("Recognised text saved to {}", path.display()));
        }
        None => println!("{text}"),
    }
    Ok(())
}

#[cfg(not(feature = "ocr"))]
async fn ocr(
    _ui: &Ui,
    input: PathBuf,
    _output: Option<PathBuf>,
    _models: Option<PathBuf>,
) -> Result<()> {
    debug!(input = %input.display(), "OCR requested without OCR support");
    bail!("OCR is not available in this build; reinstall with `--features ocr`")
}

async fn batch(ui: &Ui, action: BatchCommand) -> Result<()> {
    match action {
        BatchCommand::Convert {
            pattern,
            to,
            output_dir,
        } => {
            let files = expand_pattern(&pattern)?;
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("create {}", output_dir.display()))?;

            run_batch(ui, "Converted", files, |file| {
                let conversion = Conversion::for_input(&file, to);
                let output = output_dir
                    .join(file_stem(&file))
                    .with_extension(to_extension(to));
                async move {
                    let conversion = conversion?;
                    ui.silent()
                        .run("convert", move |r| match conversion {
                            Conversion::WordToPdf => operations::word_to_pdf(&file, &output, r),
                            Conversion::PdfToWord => operations::pdf_to_word(
                                &file,
                                &output,
                                cyberpdf_core::types::ConversionMethod::Auto,
                                r,
                            ),
                        })
                        .await
                }
            })
            .await
        }
        BatchCommand::Encrypt {
            pattern,
            output_dir,
        } => {
            let files = expand_pattern(&pattern)?;
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("create {}", output_dir.display()))?;
            let password = prompt_new_password("Password")?;

            run_batch(ui, "Encrypted", files, |file| {
                let output = output_dir.join(format!("{}_encrypted.pdf", file_stem(&file)));
                let password = password.clone();
                async move {
                    ui.silent()
                        .run("encrypt", move |r| {
                            encrypt_file(&file, &output, &password, None, Permissions::all(), r)
                        })
                        .await
                }
            })
            .await
        }
    }
}

/// Apply `process` to every file, continuing past failures.
///
/// Cancellation stops the batch. Any failure makes the command fail after
/// the summary is printed.
async fn run_batch<F, Fut>(ui: &Ui, verb: &str, files: Vec<PathBuf>, mut process: F) -> Result<()>
where
    F: FnMut(PathBuf) -> Fut,
    Fut: std::future::Future<Output = cyberpdf_core::Result<PathBuf>>,
{
    let total = files.len();
    let bar = ui.bar(total as u64);
    let mut failed = Vec::new();

    for file in files {
        bar.set_message(file_stem(&file));
        match process(file.clone()).await {
            Ok(path) => debug!(output = %path.display(), "batch item done"),
            Err(CyberPdfError::Cancelled) => {
                bar.abandon();
                return Err(CyberPdfError::Cancelled.into());
            }
            Err(e) => {
                warn!(file = %file.display(), error = %e, "batch item failed");
                failed.push((file, e));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    ui.success(format!("{verb} {} of {total} files", total - failed.len()));
    for (file, e) in &failed {
        eprintln!("  ✗ {}: {}", file.display(), humanize_error(e).message);
    }
    if !failed.is_empty() {
        bail!("{} of {total} files failed", failed.len());
    }
    Ok(())
}

fn cache(ui: &Ui, store: &ConfigStore, action: CacheCommand) -> Result<()> {
    let capacity = store.app_config()?.performance.thumbnail_cache_size;
    let mut cache = CacheManager::open_default(capacity)?;

    match action {
        CacheCommand::Stats => {
            let stats = cache.stats()?;
            println!("Location: {}", cache.dir().display());
            println!("Memory items: {}", stats.memory_items);
            println!("Disk files: {}", stats.disk_files);
            println!("Disk size: {:.2} MB", stats.disk_megabytes());
        }
        CacheCommand::Clear => {
            cache.clear_all()?;
            ui.success("Cache cleared");
        }
        CacheCommand::Cleanup { max_age_hours } => {
            let removed = cache.cleanup_old_cache(hours(max_age_hours))?;
            ui.success(format!("Removed {removed} cached files"));
        }
    }
    Ok(())
}

fn config(store: &mut ConfigStore, action: ConfigCommand) -> Result<()> {
    match action {
        ConfigCommand::Get { key } => {
            let value = store
                .get(&key)
                .ok_or_else(|| anyhow!("no preference named '{key}'"))?;
            print!("{}", serde_yaml::to_string(value)?);
        }
        ConfigCommand::Set { key, value } => {
            store.set(&key, parse_value(&value))?;
            println!("✓ {key} = {value}");
        }
        ConfigCommand::Reset => {
            store.reset()?;
            println!("✓ Preferences reset to defaults");
        }
        ConfigCommand::Path => println!("{}", store.path().display()),
    }
    Ok(())
}

/// Which direction `convert` goes, decided by the input's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    WordToPdf,
    PdfToWord,
}

impl Conversion {
    fn for_input(input: &Path, to: TargetFormat) -> cyberpdf_core::Result<Self> {
        let extension = input
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match (extension.as_str(), to) {
            ("docx", TargetFormat::Pdf) => Ok(Self::WordToPdf),
            ("pdf", TargetFormat::Docx) => Ok(Self::PdfToWord),
            (ext, to) => Err(CyberPdfError::UnsupportedConversion(format!(
                "cannot convert .{ext} to {}",
                to_extension(to)
            ))),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::WordToPdf => "pdf",
            Self::PdfToWord => "docx",
        }
    }
}

fn to_extension(to: TargetFormat) -> &'static str {
    match to {
        TargetFormat::Pdf => "pdf",
        TargetFormat::Docx => "docx",
    }
}

fn split_mode(mode: Option<SplitModeArg>, pages: Option<&str>, count: u32) -> Result<SplitMode> {
    let mode = match (mode, pages) {
        (None | Some(SplitModeArg::ByPages), Some(pages)) => {
            SplitMode::ByPages(parse_page_selection(pages)?)
        }
        (Some(SplitModeArg::ByPages), None) => bail!("--mode by_pages needs --pages"),
        (Some(_), Some(_)) => bail!("--pages only applies to --mode by_pages"),
        (None | Some(SplitModeArg::ByCount), None) => SplitMode::ByCount(count),
        (Some(SplitModeArg::ByBookmarks), None) => SplitMode::ByBookmarks,
        (Some(SplitModeArg::Smart), None) => SplitMode::Smart,
    };
    Ok(mode)
}

/// A single page ("3") or contiguous range ("3-7").
fn parse_range(input: &str) -> cyberpdf_core::Result<(u32, u32)> {
    let pages = parse_page_selection(input)?;
    let contiguous = pages.windows(2).all(|w| w[1] == w[0] + 1);
    match (pages.first(), pages.last()) {
        (Some(&first), Some(&last)) if contiguous => Ok((first, last)),
        _ => Err(CyberPdfError::InvalidPageSelection {
            input: input.to_string(),
            reason: "expected a single page or range such as 3-7".into(),
        }),
    }
}

fn rotation_map(pages: &[u32], degrees: i32) -> BTreeMap<u32, i32> {
    pages.iter().map(|&page| (page, degrees)).collect()
}

/// `#rrggbb` (the `#` is optional) as channels in `0.0..=1.0`.
fn parse_color(input: &str) -> cyberpdf_core::Result<[f32; 3]> {
    let invalid =
        || CyberPdfError::InvalidArgument(format!("'{input}' is not a colour like #808080"));
    let hex = input.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let mut color = [0.0; 3];
    for (i, channel) in color.iter_mut().enumerate() {
        let byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        *channel = f32::from(byte) / 255.0;
    }
    Ok(color)
}

/// `<dir>/<stem><suffix>.<extension>` next to `input`.
fn sibling_output(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    input.with_file_name(format!("{}{suffix}.{extension}", file_stem(input)))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into())
}

/// Regular files matching a glob pattern, sorted.
fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("invalid pattern '{pattern}'"))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "skipping unreadable path");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    if files.is_empty() {
        bail!("no files match '{pattern}'");
    }
    Ok(files)
}

fn prompt_new_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(format!("{label}: "))?;
    let confirm = rpassword::prompt_password(format!("Confirm {}: ", label.to_lowercase()))?;
    Ok(check_new_password(password, &confirm)?)
}

fn check_new_password(password: String, confirm: &str) -> cyberpdf_core::Result<String> {
    if password.is_empty() {
        return Err(CyberPdfError::InvalidArgument("password is empty".into()));
    }
    if password != confirm {
        return Err(CyberPdfError::InvalidArgument("passwords do not match".into()));
    }
    Ok(password)
}

/// The cache is an optimisation; commands keep working without it.
fn open_cache(store: &ConfigStore) -> Option<CacheManager> {
    let capacity = store
        .app_config()
        .map(|c| c.performance.thumbnail_cache_size)
        .unwrap_or(cyberpdf_cache::DEFAULT_THUMBNAIL_CAPACITY);
    CacheManager::open_default(capacity)
        .inspect_err(|e| warn!(error = %e, "cache unavailable"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_names() {
        assert_eq!(
            sibling_output(Path::new("/docs/report.pdf"), "_encrypted", "pdf"),
            PathBuf::from("/docs/report_encrypted.pdf")
        );
        assert_eq!(
            sibling_output(Path::new("scan.PDF"), "_clean", "pdf"),
            PathBuf::from("scan_clean.pdf")
        );
    }

    #[test]
    fn cache_age_saturates() {
        assert_eq!(hours(24), Duration::from_secs(86_400));
        assert_eq!(hours(u64::MAX), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn conversion_follows_extension() {
        assert_eq!(
            Conversion::for_input(Path::new("a.DOCX"), TargetFormat::Pdf).unwrap(),
            Conversion::WordToPdf
        );
        assert_eq!(
            Conversion::for_input(Path::new("a.pdf"), TargetFormat::Docx).unwrap(),
            Conversion::PdfToWord
        );
        assert!(matches!(
            Conversion::for_input(Path::new("a.pdf"), TargetFormat::Pdf),
            Err(CyberPdfError::UnsupportedConversion(_))
        ));
        assert!(Conversion::for_input(Path::new("notes"), TargetFormat::Docx).is_err());
    }

    #[test]
    fn split_mode_from_flags() {
        assert_eq!(split_mode(None, None, 10).unwrap(), SplitMode::ByCount(10));
        assert_eq!(
            split_mode(None, Some("3,5"), 10).unwrap(),
            SplitMode::ByPages(vec![3, 5])
        );
        assert_eq!(
            split_mode(Some(SplitModeArg::Smart), None, 10).unwrap(),
            SplitMode::Smart
        );
        assert!(split_mode(Some(SplitModeArg::ByPages), None, 10).is_err());
        assert!(split_mode(Some(SplitModeArg::ByBookmarks), Some("2"), 10).is_err());
    }

    #[test]
    fn ranges() {
        assert_eq!(parse_range("3").unwrap(), (3, 3));
        assert_eq!(parse_range("3-7").unwrap(), (3, 7));
        assert!(parse_range("1,5").is_err());
        assert!(parse_range("0").is_err());
    }

    #[test]
    fn colours() {
        assert_eq!(parse_color("#ff0000").unwrap(), [1.0, 0.0, 0.0]);
        assert_eq!(parse_color("000000").unwrap(), [0.0, 0.0, 0.0]);
        assert!(parse_color("#fff").is_err());
        assert!(parse_color("#gg0000").is_err());
    }

    #[test]
    fn rotation_applies_to_each_page() {
        let map = rotation_map(&[1, 3], -90);
        assert_eq!(map.len(), 2);
        assert_eq!(map[&3], -90);
    }

    #[test]
    fn new_password_checks() {
        assert_eq!(check_new_password("s3cret".into(), "s3cret").unwrap(), "s3cret");
        assert!(check_new_password(String::new(), "").is_err());
        assert!(check_new_password("a".into(), "b").is_err());
    }

    #[test]
    fn pattern_matches_sorted_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("c.pdf")).unwrap();

        let pattern = format!("{}/*.pdf", dir.path().display());
        let files = expand_pattern(&pattern).unwrap();
        let names: Vec<_> = files.iter().map(|f| file_stem(f)).collect();
        assert_eq!(names, ["a", "b"]);

        let none = format!("{}/*.docx", dir.path().display());
        assert!(expand_pattern(&none).is_err());
    }

    #[test]
    fn config_set_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::load(dir.path().join("config.yaml")).unwrap();
        config(
            &mut store,
            ConfigCommand::Set {
                key: "general.theme".into(),
                value: "light".into(),
            },
        )
        .unwrap();
        assert_eq!(
            store.get("general.theme"),
            Some(&serde_yaml::Value::String("light".into()))
        );
        assert!(config(&mut store, ConfigCommand::Get { key: "no.such".into() }).is_err());
    }

    #[tokio::test]
    async fn batch_continues_past_failures() {
        let ui = Ui::new(true);
        let files = vec![PathBuf::from("good.pdf"), PathBuf::from("bad.pdf")];
        let mut seen = Vec::new();
        let result = run_batch(&ui, "Processed", files, |file| {
            seen.push(file.clone());
            async move {
                if file == Path::new("bad.pdf") {
                    Err(CyberPdfError::Pdf("broken".into()))
                } else {
                    Ok(file)
                }
            }
        })
        .await;
        assert_eq!(seen.len(), 2);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn cancelled_batch_stops() {
        let ui = Ui::new(true);
        let files = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
        let mut calls = 0;
        let result = run_batch(&ui, "Processed", files, |_| {
            calls += 1;
            async { Err(CyberPdfError::Cancelled) }
        })
        .await;
        assert_eq!(calls, 1);
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CyberPdfError>(),
            Some(CyberPdfError::Cancelled)
        ));
    }
}
