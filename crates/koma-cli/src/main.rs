//! `koma-export`: render panels and pages of a Koma document to PNG.
//!
//! ```text
//! koma-export story.json --out renders/ --scale 2 --font "Bangers=fonts/Bangers.ttf"
//! koma-export story.msgpack --panel panel_3 --page page_1
//! ```
//!
//! Image references inside the document resolve as paths relative to
//! `--assets` (default: the snapshot's directory).

mod source;

use clap::Parser;
use koma_core::{ComposerConfig, ConfigError, ObjectId, PageId, PanelId, SceneGraph, SnapshotError};
use koma_render::export::page_panels;
use koma_render::{
    Compositor, ExportError, ExportImage, ExportOptions, FontBook, FontError, ImageCache,
    export_page, export_panel, image_refs,
};
use source::FileSource;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "koma-export")]
#[command(about = "Render panels and pages of a Koma document to PNG")]
struct Args {
    /// Document snapshot (`.json` or `.msgpack`)
    input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Export only this panel (repeatable)
    #[arg(long = "panel")]
    panels: Vec<String>,

    /// Export only this page (repeatable). Without `--panel` or `--page`
    /// every page is exported.
    #[arg(long = "page")]
    pages: Vec<String>,

    /// Output pixels per page pixel
    #[arg(long, default_value_t = 1.0)]
    scale: f32,

    /// Gap between stacked panels in page exports
    #[arg(long)]
    gutter: Option<f32>,

    /// Font file as `FAMILY=PATH`, or `FAMILY:bold=PATH` for the bold face
    #[arg(long = "font")]
    fonts: Vec<String>,

    /// Composer config (JSON). Defaults apply without it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory image references resolve against
    #[arg(long)]
    assets: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("font: {0}")]
    Font(#[from] FontError),

    #[error("bad --font argument {0:?}, expected FAMILY=PATH")]
    FontArg(String),

    #[error("export: {0}")]
    Export(#[from] ExportError),

    #[error("scale must be positive, got {0}")]
    Scale(f32),
}

type Result<T> = std::result::Result<T, CliError>;

/// One file to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Panel(PanelId),
    Page(PageId),
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args).await {
        Ok(written) => {
            log::info!("wrote {written} file(s)");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<usize> {
    if !(args.scale > 0.0 && args.scale.is_finite()) {
        return Err(CliError::Scale(args.scale));
    }

    let mut graph = load_snapshot(&args.input).await?;
    if let Some(path) = &args.config {
        let json = read_to_string(path).await?;
        graph.set_config(ComposerConfig::from_json(&json)?);
    }

    let jobs = plan(&graph, &args.panels, &args.pages);
    if jobs.is_empty() {
        log::warn!("nothing to export");
        return Ok(0);
    }

    let mut fonts = FontBook::new();
    for spec in &args.fonts {
        let (family, bold, path) = parse_font_arg(spec)?;
        let bytes = read(Path::new(path)).await?;
        if bold {
            fonts.register_bold(family, bytes)?;
        } else {
            fonts.register(family, bytes)?;
        }
        log::debug!("registered font {family}{}", if bold { " (bold)" } else { "" });
    }

    let root = args
        .assets
        .clone()
        .or_else(|| args.input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let source = FileSource::new(root);
    let mut images = ImageCache::new();
    let panels = panels_for(&graph, &jobs);
    let failures = images.load_all(&source, &image_refs(&graph, &panels)).await;
    if !failures.is_empty() {
        log::warn!("{} image(s) missing, rendering without them", failures.len());
    }

    let options = export_options(&args, graph.config());

    tokio::fs::create_dir_all(&args.out)
        .await
        .map_err(|source| CliError::Io {
            path: args.out.clone(),
            source,
        })?;

    let compositor = Compositor::new(&images, &fonts, graph.config());
    let mut written = 0;
    for job in jobs {
        let image = render(&compositor, &graph, job, &options)?;
        let path = args.out.join(&image.file_name);
        let png = image.encode_png()?;
        tokio::fs::write(&path, png)
            .await
            .map_err(|source| CliError::Io {
                path: path.clone(),
                source,
            })?;
        log::info!("{} ({}x{})", path.display(), image.width, image.height);
        written += 1;
    }
    Ok(written)
}

/// Config gutter unless `--gutter` overrides it.
fn export_options(args: &Args, config: &ComposerConfig) -> ExportOptions {
    let mut options = ExportOptions {
        scale: args.scale,
        ..ExportOptions::for_config(config)
    };
    if let Some(gutter) = args.gutter {
        options.gutter = gutter.max(0.0);
    }
    options
}

fn render(
    compositor: &Compositor<'_>,
    graph: &SceneGraph,
    job: Job,
    options: &ExportOptions,
) -> Result<ExportImage> {
    let image = match job {
        Job::Panel(panel) => export_panel(compositor, graph, panel, options)?,
        Job::Page(page) => export_page(compositor, graph, page, options)?,
    };
    Ok(image)
}

// ─── Planning ────────────────────────────────────────────────────────────

/// Resolve the requested ids into jobs. Unknown ids are skipped with a
/// warning; no selection means every page in document order.
fn plan(graph: &SceneGraph, panels: &[String], pages: &[String]) -> Vec<Job> {
    if panels.is_empty() && pages.is_empty() {
        return graph
            .episodes()
            .iter()
            .flat_map(|e| graph.pages_of(e.id))
            .map(|p| Job::Page(p.id))
            .collect();
    }

    let mut jobs = Vec::new();
    for name in panels {
        let id = ObjectId::intern(name);
        if graph.panel(id).is_some() {
            jobs.push(Job::Panel(id));
        } else {
            log::warn!("no panel {name}");
        }
    }
    for name in pages {
        let id = ObjectId::intern(name);
        if graph.page(id).is_some() {
            jobs.push(Job::Page(id));
        } else {
            log::warn!("no page {name}");
        }
    }
    jobs.dedup();
    jobs
}

/// Every panel the jobs draw, for image prefetching.
fn panels_for(graph: &SceneGraph, jobs: &[Job]) -> Vec<PanelId> {
    let mut panels = Vec::new();
    for job in jobs {
        match *job {
            Job::Panel(panel) => panels.push(panel),
            Job::Page(page) => panels.extend(page_panels(graph, page)),
        }
    }
    panels
}

/// `FAMILY=PATH` or `FAMILY:bold=PATH`.
fn parse_font_arg(spec: &str) -> Result<(&str, bool, &str)> {
    let (name, path) = spec
        .split_once('=')
        .filter(|(n, p)| !n.is_empty() && !p.is_empty())
        .ok_or_else(|| CliError::FontArg(spec.to_owned()))?;
    match name.strip_suffix(":bold") {
        Some(family) if !family.is_empty() => Ok((family, true, path)),
        Some(_) => Err(CliError::FontArg(spec.to_owned())),
        None => Ok((name, false, path)),
    }
}

// ─── File I/O ────────────────────────────────────────────────────────────

async fn load_snapshot(path: &Path) -> Result<SceneGraph> {
    let is_msgpack = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("msgpack") || e.eq_ignore_ascii_case("mpk"));
    let graph = if is_msgpack {
        SceneGraph::from_msgpack(&read(path).await?)?
    } else {
        SceneGraph::from_json(&read_to_string(path).await?)?
    };
    Ok(graph)
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn read_to_string(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use koma_core::model::SizePreset;
    use pretty_assertions::assert_eq;

    fn two_pages() -> (SceneGraph, PageId, PageId, PanelId) {
        let mut graph = SceneGraph::new();
        let ep = graph.add_episode("Pilot");
        let first = graph.add_page(ep).unwrap();
        let second = graph.add_page(ep).unwrap();
        let panel = graph.add_panel(first, SizePreset::Wide).unwrap();
        graph.add_panel(first, SizePreset::Tall).unwrap();
        graph.add_panel(second, SizePreset::Square).unwrap();
        (graph, first, second, panel)
    }

    #[test]
    fn default_plan_is_every_page() {
        let (graph, first, second, _) = two_pages();
        assert_eq!(plan(&graph, &[], &[]), vec![Job::Page(first), Job::Page(second)]);
    }

    #[test]
    fn plan_skips_unknown_ids() {
        let (graph, first, _, panel) = two_pages();
        let jobs = plan(
            &graph,
            &[panel.as_str().to_owned(), "panel_missing".to_owned()],
            &[first.as_str().to_owned(), "page_missing".to_owned()],
        );
        assert_eq!(jobs, vec![Job::Panel(panel), Job::Page(first)]);
    }

    #[test]
    fn page_jobs_prefetch_all_their_panels() {
        let (graph, first, _, _) = two_pages();
        assert_eq!(panels_for(&graph, &[Job::Page(first)]).len(), 2);
    }

    #[test]
    fn font_args() {
        assert_eq!(parse_font_arg("Bangers=f/b.ttf").unwrap(), ("Bangers", false, "f/b.ttf"));
        assert_eq!(parse_font_arg("Comic:bold=cb.ttf").unwrap(), ("Comic", true, "cb.ttf"));
        assert!(parse_font_arg("Comic").is_err());
        assert!(parse_font_arg(":bold=x.ttf").is_err());
        assert!(parse_font_arg("=x.ttf").is_err());
    }

    #[test]
    fn args_parse() {
        let args = Args::parse_from([
            "koma-export",
            "doc.json",
            "--out",
            "renders",
            "--panel",
            "panel_1",
            "--scale",
            "2",
        ]);
        assert_eq!(args.input, PathBuf::from("doc.json"));
        assert_eq!(args.out, PathBuf::from("renders"));
        assert_eq!(args.panels, vec!["panel_1".to_owned()]);
        assert_eq!(args.scale, 2.0);
        assert!(args.pages.is_empty());
    }

    #[test]
    fn gutter_comes_from_config_unless_overridden() {
        let config = ComposerConfig {
            page_gutter: 12.0,
            ..ComposerConfig::default()
        };
        let args = Args::parse_from(["koma-export", "doc.json"]);
        assert_eq!(export_options(&args, &config).gutter, 12.0);

        let args = Args::parse_from(["koma-export", "doc.json", "--gutter", "4", "--scale", "2"]);
        let options = export_options(&args, &config);
        assert_eq!((options.gutter, options.scale), (4.0, 2.0));
    }

    #[tokio::test]
    async fn exports_a_page_to_disk() {
        let (graph, first, _, _) = two_pages();
        let dir = std::env::temp_dir().join(format!("koma-export-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let input = dir.join("doc.json");
        tokio::fs::write(&input, graph.to_json().unwrap()).await.unwrap();

        let args = Args::parse_from([
            "koma-export",
            input.to_str().unwrap(),
            "--out",
            dir.join("out").to_str().unwrap(),
            "--page",
            first.as_str(),
        ]);
        assert_eq!(run(args).await.unwrap(), 1);

        let png = tokio::fs::read(dir.join("out").join(format!("page-{first}.png")))
            .await
            .unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn zero_scale_is_refused() {
        let args = Args::parse_from(["koma-export", "doc.json", "--scale", "0"]);
        assert!(matches!(run(args).await, Err(CliError::Scale(_))));
    }
}
