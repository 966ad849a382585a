mod annotate;
mod citation;
mod config;
mod error;
mod fetch;
mod highlight;
mod layout;
mod locate;
mod pdf;
mod pipeline;
mod server;
mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::{Config, EngineArgs, ServeArgs};
use fetch::LocalDir;
use pdf::{LayoutSource, PdfiumLayouts};
use pipeline::Pipeline;
use types::{LineRef, PageLayout};

#[derive(Parser)]
#[command(name = "citemark", about = "Highlight cited lines of PDF documents")]
struct Cli {
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the highlight endpoints over HTTP
    Serve(ServeArgs),

    /// Highlight a citation against a PDF in a local directory
    Annotate {
        /// Chat response containing the citation
        citation: String,

        /// Directory holding the cited documents
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Where to write the highlighted PDF
        #[arg(long, short, default_value = "highlighted_pdf.pdf")]
        output: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print the [page, line] pairs cited in a response as JSON
    Lines {
        text: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Show the numbered text lines of a page (debug)
    Layout {
        /// PDF file to inspect
        file: PathBuf,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Override pdfium library path
        #[arg(long, env = "PDFIUM_LIB_PATH")]
        pdfium_path: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Serve(args) => {
            let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
            runtime.block_on(server::serve(Config::from(args)))
        }
        Command::Annotate { citation, dir, output, engine } => {
            annotate_local(&citation, dir, &output, engine)
        }
        Command::Lines { text, pretty } => print_output(&citation::parse_references(&text), pretty),
        Command::Layout { file, page, pdfium_path } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read PDF: {}", file.display()))?;
            let layout = PdfiumLayouts::new(pdfium_path).page_layout(&bytes, page)?;
            print_debug_layout(&layout);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "citemark=debug,tower_http=debug"
    } else {
        "citemark=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn annotate_local(
    citation: &str,
    dir: PathBuf,
    output: &Path,
    engine: EngineArgs,
) -> Result<()> {
    let pipeline = Pipeline::new(
        Arc::new(LocalDir::new(dir)),
        Arc::new(PdfiumLayouts::new(engine.pdfium_path)),
        engine.color,
    );
    let outcome = pipeline.highlight(citation)?;
    std::fs::write(output, &outcome.pdf)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!(
        "{}: {} highlight(s) written to {}",
        outcome.document_name,
        outcome.highlights,
        output.display()
    );
    Ok(())
}

fn print_output(refs: &[LineRef], pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(refs)?
    } else {
        serde_json::to_string(refs)?
    };
    println!("{json}");
    Ok(())
}

fn print_debug_layout(layout: &PageLayout) {
    let mut index = 0;
    for (container_idx, container) in layout.containers.iter().enumerate() {
        for line in &container.lines {
            index += 1;
            let fits = locate::is_within_bounds(&line.bbox, &container.bbox, locate::DEFAULT_MARGIN);
            let preview: String = line.text.chars().take(70).collect();
            println!(
                "{:>4} c{:<3}{} [{:6.1} {:6.1} {:6.1} {:6.1}] | {}",
                index,
                container_idx,
                if fits { ' ' } else { '!' },
                line.bbox.x0,
                line.bbox.y0,
                line.bbox.x1,
                line.bbox.y1,
                preview
            );
        }
    }
    if locate::line_count(layout) == 0 {
        println!("page {} has no text lines", layout.page_num);
    }
}
