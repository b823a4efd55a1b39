use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use codemark_core::css::{self, DEFAULT_DARK_THEME, DEFAULT_LIGHT_THEME};
use codemark_core::{
    CodeBlockHighlighter, Document, Editor, HighlightConfig, LoadResults, MarkerName,
    SyntectHighlighter,
};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Serialize;

mod config;

#[derive(Parser)]
#[command(version, about = "Codemark - syntax highlighting markers for note code blocks", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a highlighting pass over a JSON document
    Highlight {
        /// Path to the document JSON
        document: PathBuf,

        /// Path to a KDL config file
        #[arg(long, env = "CODEMARK_CONFIG")]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Markers)]
        format: Format,

        /// Highlight even if the document lacks the enabling label
        #[arg(long)]
        force: bool,
    },
    /// Print the stylesheet for the highlight classes
    Css {
        /// Light (or only) theme
        #[arg(long, default_value = DEFAULT_LIGHT_THEME)]
        theme: String,

        /// Dark theme, emitted under prefers-color-scheme
        #[arg(long)]
        dark_theme: Option<String>,

        /// List bundled themes instead
        #[arg(long)]
        list: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One marker per line with the text it covers
    Markers,
    /// Code blocks rendered with their markers
    Html,
    /// Markers as JSON
    Json,
}

fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Highlight {
            document,
            config,
            format,
            force,
        } => {
            let config = match config {
                Some(path) => config::load_config(&path)?,
                None => HighlightConfig::default(),
            };
            highlight(&document, config, format, force)?;
        }
        Commands::Css {
            theme,
            dark_theme,
            list,
        } => {
            if list {
                let mut names: Vec<_> = css::theme_names().collect();
                names.sort_unstable();
                for name in names {
                    println!("{name}");
                }
            } else {
                let stylesheet = match dark_theme {
                    Some(dark) => css::light_dark_stylesheet(&theme, &dark)?,
                    None => css::stylesheet(&theme)?,
                };
                print!("{stylesheet}");
            }
        }
    }

    Ok(())
}

fn load_document(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading document {}", path.display()))?;
    serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("parsing document {}", path.display()))
}

fn highlight(path: &Path, config: HighlightConfig, format: Format, force: bool) -> Result<()> {
    let document = load_document(path)?;
    let highlighter =
        SyntectHighlighter::new().with_fallback_language(config.fallback_language.clone());
    // A single document doubles as the startup document for the debug label.
    let widget = CodeBlockHighlighter::new(highlighter, config, &document);
    let config = widget.config();
    let mut editor = Editor::new(document);

    let report = if force {
        Some(widget.refresh(&mut editor)?)
    } else {
        let reloaded = LoadResults::content_reloaded([editor.model.id.clone()]);
        widget.entities_reloaded(&reloaded, &mut editor)?
    };
    let Some(report) = report else {
        tracing::warn!(
            target: "codemark::cli",
            document = %editor.model.id,
            label = %config.enable_label,
            "highlighting not enabled for document, use --force to run anyway"
        );
        return Ok(());
    };
    tracing::info!(
        target: "codemark::cli",
        code_blocks = report.code_blocks,
        markers = report.markers_added,
        "highlighted"
    );

    match format {
        Format::Markers => {
            for row in marker_rows(&editor, config)? {
                println!(
                    "{}\t{}..{}\t{}\t{:?}",
                    row.block, row.start, row.end, row.name, row.text
                );
            }
        }
        Format::Html => {
            for block in editor.render_code_blocks(config)? {
                println!("{block}");
            }
        }
        Format::Json => {
            let rows = marker_rows(&editor, config)?;
            let json = serde_json::to_string_pretty(&rows).into_diagnostic()?;
            println!("{json}");
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct MarkerRow {
    name: String,
    class: String,
    block: usize,
    start: usize,
    end: usize,
    text: String,
}

/// Highlighting markers in document order.
fn marker_rows(editor: &Editor, config: &HighlightConfig) -> Result<Vec<MarkerRow>> {
    let mut rows = Vec::new();
    for marker in editor.model.markers().group(&config.marker_group) {
        let name: MarkerName = marker.name.parse()?;
        let text = editor
            .model
            .range_text(&marker.range, |n| config.is_line_break(n))
            .ok_or_else(|| miette::miette!("marker {} points outside the document", marker.name))?;
        rows.push(MarkerRow {
            name: marker.name.to_string(),
            class: name.class.to_string(),
            block: marker.range.parent().first().copied().unwrap_or_default(),
            start: marker.range.start.offset,
            end: marker.range.end.offset,
            text,
        });
    }
    rows.sort_by(|a, b| {
        (a.block, a.start, std::cmp::Reverse(a.end)).cmp(&(b.block, b.start, std::cmp::Reverse(b.end)))
    });
    Ok(rows)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(3)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
