//! # Folio CLI
//!
//! Usage:
//!   folio export album.json -o album.pdf
//!   folio export project-123 --store ./projects -o album.pdf
//!   folio thumbnails album.json -d thumbs/
//!   folio new --preset square-20 --pages 10 > album.json
//!   folio layouts

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use folio::layout::catalog::LayoutCatalog;
use folio::model::preset::{find_preset, PRESETS};
use folio::model::ProjectStatus;
use folio::store::{FsProjectStore, ProjectStore};
use folio::{Diagnostics, ExportStrategy, FolioError, Project, RenderConfig, Renderer, Result};

/// folio: render photo-album projects to thumbnails and print-ready PDF
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Render configuration file (JSON)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Extra layout catalog entries (JSON array)
    #[clap(long, global = true)]
    layout_file: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a project to PDF
    Export {
        /// Project JSON file, or a project id when --store is given
        project: String,

        /// Output PDF path
        #[clap(short, long, default_value = "album.pdf")]
        output: PathBuf,

        /// Page content encoding
        #[clap(long, value_enum)]
        strategy: Option<ExportStrategy>,

        /// Do not add bleed around pages
        #[clap(long)]
        no_bleed: bool,

        /// Load the project from this store and mark it exported afterwards
        #[clap(long)]
        store: Option<PathBuf>,
    },
    /// Write one JPEG thumbnail per page, named after the page id
    Thumbnails {
        /// Project JSON file
        project: PathBuf,

        /// Output directory
        #[clap(short = 'd', long, default_value = "thumbnails")]
        out_dir: PathBuf,

        /// Preview scale factor
        #[clap(long)]
        scale: Option<f64>,
    },
    /// Create a new project from a layout preset
    New {
        #[clap(long, default_value = "square-20")]
        preset: String,

        /// Number of content pages
        #[clap(long, default_value_t = 10)]
        pages: usize,

        #[clap(long)]
        owner: Option<String>,

        /// Save into this store instead of printing to stdout
        #[clap(long)]
        store: Option<PathBuf>,
    },
    /// List layouts and presets
    Layouts,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("✗ {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::from_json_file(path)?,
        None => RenderConfig::default(),
    };
    let mut catalog = LayoutCatalog::builtin();
    if let Some(path) = &cli.layout_file {
        catalog.extend_from_json(&std::fs::read_to_string(path)?)?;
    }

    match cli.command {
        Command::Export {
            project,
            output,
            strategy,
            no_bleed,
            store,
        } => {
            if let Some(s) = strategy {
                config.export_strategy = s;
            }
            if no_bleed {
                config.apply_bleed = false;
            }
            let store = store.map(FsProjectStore::new);
            let mut project = match &store {
                Some(store) => store.load(&project)?,
                None => load_project(Path::new(&project))?,
            };
            let renderer = renderer(config, catalog);
            let artifact = renderer.export(&project).await?;
            std::fs::write(&output, &artifact.bytes)?;
            report(&artifact.diagnostics);
            eprintln!(
                "✓ Written {} pages ({} bytes) to {}",
                artifact.page_count,
                artifact.bytes.len(),
                output.display()
            );
            if let Some(store) = &store {
                project.transition(ProjectStatus::Exported)?;
                store.save(&project)?;
            }
        }
        Command::Thumbnails {
            project,
            out_dir,
            scale,
        } => {
            if let Some(s) = scale.filter(|s| *s > 0.0) {
                config.preview_scale = s;
            }
            let project = load_project(&project)?;
            std::fs::create_dir_all(&out_dir)?;
            let renderer = renderer(config, catalog);
            let mut failed = 0;
            for result in renderer.thumbnails(&project).await {
                match result {
                    Ok(thumb) => {
                        let path = out_dir.join(format!("{}.jpg", sanitize(&thumb.page_id)));
                        std::fs::write(&path, &thumb.bytes)?;
                        report(&thumb.diagnostics);
                        eprintln!("✓ {} ({}x{})", path.display(), thumb.width, thumb.height);
                    }
                    Err(e) => {
                        failed += 1;
                        eprintln!("✗ {}", e);
                    }
                }
            }
            if failed > 0 {
                return Err(FolioError::Raster(format!("{} pages failed to render", failed)));
            }
        }
        Command::New {
            preset,
            pages,
            owner,
            store,
        } => {
            let preset = find_preset(&preset).ok_or_else(|| {
                FolioError::Store(format!(
                    "unknown preset '{}' (available: {})",
                    preset,
                    PRESETS.iter().map(|p| p.id).collect::<Vec<_>>().join(", ")
                ))
            })?;
            let project = Project::from_preset(preset, pages, owner, &catalog);
            match store {
                Some(dir) => {
                    FsProjectStore::new(dir).save(&project)?;
                    eprintln!("✓ Created {}", project.id);
                }
                None => println!("{}", project.to_json()?),
            }
        }
        Command::Layouts => {
            println!("Layouts:");
            for layout in catalog.iter() {
                println!(
                    "  {:<14} {}x{}  {} cells  gap {}  padding {}",
                    layout.id,
                    layout.columns,
                    layout.rows,
                    layout.cell_count(),
                    layout.gap,
                    layout.padding
                );
            }
            println!("Presets:");
            for p in PRESETS {
                println!(
                    "  {:<16} {}x{} cm  canvas {}x{}  cover {}, content {}, final {}",
                    p.id,
                    p.width_cm,
                    p.height_cm,
                    p.canvas_width,
                    p.canvas_height,
                    p.cover_layout,
                    p.content_layout,
                    p.final_layout
                );
            }
        }
    }
    Ok(())
}

fn renderer(config: RenderConfig, catalog: LayoutCatalog) -> Renderer {
    Renderer::new(config).with_catalog(catalog)
}

fn load_project(path: &Path) -> Result<Project> {
    let json = std::fs::read_to_string(path)?;
    let (project, diagnostics) = Project::from_json_with_diagnostics(&json)?;
    report(&diagnostics);
    Ok(project)
}

/// Warnings are already logged; this is the human summary.
fn report(diagnostics: &Diagnostics) {
    if !diagnostics.is_empty() {
        eprintln!(
            "  {} warnings ({} images failed, {} layout overflows)",
            diagnostics.len(),
            diagnostics.image_failures(),
            diagnostics.overflows()
        );
    }
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
