//! PDF Signer CLI - place a signature image on a PDF page, or merge PDFs.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_signer_core::{
    AlwaysConfirm, DocumentSession, Key, MergeProgress, NoticeLevel, OperationLog, OverlayKind, PdfSession, Point,
    RecordingSurface, SignerConfig, SigningEditor, Size, Surface, load_overlay_image, merge_files,
};
use std::path::PathBuf;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindOption {
    Uploaded,
    Handwritten,
    Test,
}

impl From<KindOption> for OverlayKind {
    fn from(opt: KindOption) -> Self {
        match opt {
            KindOption::Uploaded => Self::Uploaded,
            KindOption::Handwritten => Self::Handwritten,
            KindOption::Test => Self::Test,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pdf-sign")]
#[command(author, version, about = "Place signatures on PDF documents", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Place an image on a page and save the signed PDF
    Sign {
        /// Input PDF file
        input: PathBuf,

        /// Signature image (PNG, JPEG, ...); not needed for the test pattern
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Kind of overlay
        #[arg(short, long, value_enum, default_value = "uploaded")]
        kind: KindOption,

        /// Page to sign (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Drag the overlay by this display offset, e.g. "30,-10"
        #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
        offset: Option<Point>,

        /// Press the enlarge key this many times
        #[arg(long, default_value_t = 0)]
        zoom_in: u32,

        /// Press the shrink key this many times
        #[arg(long, default_value_t = 0)]
        zoom_out: u32,

        /// Viewport the page is fitted into, e.g. "1200x900"
        #[arg(long, value_parser = parse_viewport, default_value = "1200x900")]
        viewport: Size,

        /// Output PDF file (default: input-signed.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge PDF files in the given order
    Merge {
        /// Input PDF files
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn parse_pair(value: &str, separator: char) -> Result<(f32, f32), String> {
    let (a, b) = value
        .split_once(separator)
        .ok_or_else(|| format!("expected two numbers separated by '{separator}'"))?;
    let parse = |s: &str| s.trim().parse::<f32>().map_err(|e| format!("invalid number '{s}': {e}"));
    Ok((parse(a)?, parse(b)?))
}

fn parse_offset(value: &str) -> Result<Point, String> {
    parse_pair(value, ',').map(|(x, y)| Point::new(x, y))
}

fn parse_viewport(value: &str) -> Result<Size, String> {
    let (width, height) = parse_pair(value, 'x')?;
    if width <= 0.0 || height <= 0.0 {
        return Err("viewport must be positive".to_string());
    }
    Ok(Size::new(width, height))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = if let Some(config_path) = &args.config {
        SignerConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        SignerConfig::load()
    };

    match args.command {
        Command::Sign {
            input,
            image,
            kind,
            page,
            offset,
            zoom_in,
            zoom_out,
            viewport,
            output,
        } => {
            let output = output.unwrap_or_else(|| {
                let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
                input.with_file_name(format!("{stem}-signed.pdf"))
            });
            let request = SignRequest {
                input,
                image,
                kind: kind.into(),
                page,
                offset,
                zoom_in,
                zoom_out,
                viewport,
                output,
            };
            sign(&request, config)
        }
        Command::Merge { inputs, output } => merge(inputs, output).await,
    }
}

struct SignRequest {
    input: PathBuf,
    image: Option<PathBuf>,
    kind: OverlayKind,
    page: usize,
    offset: Option<Point>,
    zoom_in: u32,
    zoom_out: u32,
    viewport: Size,
    output: PathBuf,
}

fn open_log(config: &SignerConfig) -> OperationLog {
    let path = config
        .log
        .path
        .clone()
        .unwrap_or_else(pdf_signer_core::util::operation_log_path);
    OperationLog::with_file(&path).unwrap_or_else(|e| {
        warn!("Operation log {} unavailable: {}", path.display(), e);
        OperationLog::in_memory()
    })
}

fn sign(request: &SignRequest, config: SignerConfig) -> Result<()> {
    info!("Loading PDF: {}", request.input.display());
    let session = PdfSession::open(&request.input)
        .context(format!("Failed to load PDF: {}", request.input.display()))?;

    let total = session.page_count();
    if request.page == 0 || request.page > total {
        bail!("Page {} does not exist (document has {} pages)", request.page, total);
    }

    let overlay_image = match (&request.image, request.kind) {
        (_, OverlayKind::Test) => None,
        (Some(path), _) => Some(load_overlay_image(path).context("Failed to load signature image")?),
        (None, _) => bail!("--image is required for {} overlays", request.kind),
    };

    let log = open_log(&config);
    let mut editor = SigningEditor::open(session, RecordingSurface::new(), request.viewport, config, log)
        .context("Failed to open editor")?;

    while editor.current_page() + 1 < request.page {
        editor.next_page().context("Failed to change page")?;
    }

    let id = match overlay_image {
        Some(image) => editor.add_overlay(image, request.kind),
        None => editor.add_test_overlay(),
    };

    if let Some(offset) = request.offset {
        let element = editor
            .controller()
            .image_element(id)
            .and_then(|element| editor.controller().surface().bounding_box(element))
            .context("Overlay was not drawn")?;
        let start = Point::new(
            (element.min.x + element.max.x) / 2.0,
            (element.min.y + element.max.y) / 2.0,
        );
        editor.pointer_down(start);
        editor.pointer_move(start + offset);
        editor.pointer_up(start + offset);
    }

    for _ in 0..request.zoom_in {
        editor.key_press(Key::ScaleUp, &mut AlwaysConfirm);
    }
    for _ in 0..request.zoom_out {
        editor.key_press(Key::ScaleDown, &mut AlwaysConfirm);
    }

    let status = editor.status_line();
    let report = editor
        .save(&request.output)
        .context(format!("Failed to save: {}", request.output.display()))?;

    let warnings = editor.log().count(NoticeLevel::Warning);
    if warnings > 0 {
        warn!("{} warnings, see the operation log", warnings);
    }

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("{status}");
        println!(
            "Signed PDF saved to: {} ({} overlays written)",
            request.output.display(),
            report.written
        );
    }

    if !report.is_complete() {
        bail!("{} overlays could not be written", report.failures.len());
    }
    Ok(())
}

async fn merge(inputs: Vec<PathBuf>, output: PathBuf) -> Result<()> {
    #[allow(clippy::cast_possible_truncation)]
    let pb = ProgressBar::new(inputs.len() as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(merge_files(inputs, output.clone(), tx));

    while let Some(progress) = rx.recv().await {
        match progress {
            MergeProgress::Loaded { index, total } => {
                pb.set_message(format!("loaded {}/{}", index + 1, total));
                pb.inc(1);
            }
            MergeProgress::Saving => pb.set_message("saving"),
            MergeProgress::Done { pages } => pb.finish_with_message(format!("{pages} pages")),
        }
    }

    let pages = task
        .await
        .context("Merge task panicked")?
        .context("Failed to merge PDFs")?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("Merged PDF ({} pages) saved to: {}", pages, output.display());
    }

    Ok(())
}
