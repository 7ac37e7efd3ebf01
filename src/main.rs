use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use tracing::info;

use polytrace::export::{save_primitives_json, save_svg, to_svg_document};
use polytrace::loader::load_target;
use polytrace::{spawn_engine, EngineUpdate, Fill, Settings, ShapeKind};

#[derive(Parser, Debug)]
#[command(name = "polytrace", version, about = "Approximate an image with semi-transparent polygons")]
struct Cli {
    /// Input image (any format the `image` crate decodes).
    input: PathBuf,

    /// Settings JSON; missing fields fall back to defaults.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the effective settings (after overrides) to this path.
    #[arg(long)]
    save_settings: Option<PathBuf>,

    /// Raster reconstruction at display size.
    #[arg(long)]
    out_png: Option<PathBuf>,

    /// Vector reconstruction.
    #[arg(long)]
    out_svg: Option<PathBuf>,

    /// Accepted primitives as JSON.
    #[arg(long)]
    out_json: Option<PathBuf>,

    /// Number of rounds.
    #[arg(long)]
    steps: Option<u64>,

    /// Random candidates per round.
    #[arg(long)]
    shapes: Option<usize>,

    /// Failed mutations before refinement stops.
    #[arg(long)]
    mutations: Option<usize>,

    /// Starting alpha of every candidate (0.1 to 1).
    #[arg(long)]
    alpha: Option<f32>,

    /// Let refinement jitter alpha too.
    #[arg(long)]
    mutate_alpha: bool,

    /// Enabled shape kind; repeat for several (triangle, quad, pentagon, hexagon).
    #[arg(long = "shape")]
    shape_kinds: Vec<ShapeKind>,

    /// Starting canvas color: auto, #rrggbb or rgb(r, g, b).
    #[arg(long)]
    fill: Option<Fill>,

    #[arg(long)]
    seed: Option<u64>,

    /// Longer side of the working image.
    #[arg(long)]
    compute_size: Option<u32>,

    /// Longer side of the output.
    #[arg(long)]
    view_size: Option<u32>,

    #[arg(long)]
    no_antialias: bool,

    /// Log progress every N rounds.
    #[arg(long, default_value_t = 50)]
    progress_every: u64,

    /// More output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(v) = self.steps {
            settings.steps = v;
        }
        if let Some(v) = self.shapes {
            settings.shapes = v;
        }
        if let Some(v) = self.mutations {
            settings.mutations = v;
        }
        if let Some(v) = self.alpha {
            settings.alpha = v;
        }
        if self.mutate_alpha {
            settings.mutate_alpha = true;
        }
        if !self.shape_kinds.is_empty() {
            settings.shape_types = self.shape_kinds.clone();
        }
        if let Some(v) = self.fill {
            settings.fill = v;
        }
        if let Some(v) = self.seed {
            settings.seed = v;
        }
        if let Some(v) = self.compute_size {
            settings.compute_size = v;
        }
        if let Some(v) = self.view_size {
            settings.view_size = v;
        }
        if self.no_antialias {
            settings.antialiasing = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // configure Rayon's global thread pool once at startup so worker threads get nice names like "rayon-0".
    let _ = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("rayon-{i}"))
        .build_global();

    let mut settings = match &cli.settings {
        Some(path) => Settings::load(path),
        None => Settings::default(),
    };
    cli.apply_overrides(&mut settings);
    if let Some(path) = &cli.save_settings {
        settings
            .save(path)
            .with_context(|| format!("write settings '{}'", path.display()))?;
    }

    let cfg = settings.to_search_config()?;
    let (target, scaling) = load_target(&cli.input, settings.compute_size, settings.view_size)
        .with_context(|| format!("load image '{}'", cli.input.display()))?;
    let fill = settings.fill.resolve(&target);
    let (width, height) = target.dimensions();
    info!(
        input = %cli.input.display(),
        width,
        height,
        display_scale = scaling.display_scale,
        fill = ?fill,
        "starting"
    );

    let handle = spawn_engine(target, fill, cfg, settings.renderer())?;
    let mut result = None;
    for update in handle.updates() {
        match update {
            EngineUpdate::Round { round, metrics, shapes, .. } => {
                let done = round + 1;
                if cli.progress_every > 0 && done % cli.progress_every == 0 {
                    info!(
                        round = done,
                        shapes,
                        distance = metrics.distance,
                        psnr = metrics.psnr,
                        improvement = metrics.improvement_percent,
                        "progress"
                    );
                }
            }
            EngineUpdate::Finished { primitives, metrics, rounds_run } => {
                info!(
                    rounds = rounds_run,
                    shapes = primitives.len(),
                    distance = metrics.distance,
                    psnr = metrics.psnr,
                    "done"
                );
                result = Some(primitives);
            }
            EngineUpdate::Failed(msg) => anyhow::bail!("engine failed: {msg}"),
        }
    }
    handle.join()?;
    let primitives = result.context("engine exited without a result")?;

    if let Some(path) = &cli.out_png {
        let preview = settings
            .renderer()
            .render_primitives(&primitives, fill, width, height, scaling.display_scale)?;
        let img = preview.to_image().context("preview buffer has the wrong size")?;
        create_parent(path)?;
        img.save(path)
            .with_context(|| format!("write png '{}'", path.display()))?;
        info!(path = %path.display(), "wrote png");
    }
    if let Some(path) = &cli.out_svg {
        let doc = to_svg_document(&primitives, fill, width, height, scaling.display_scale);
        create_parent(path)?;
        save_svg(path, &doc).with_context(|| format!("write svg '{}'", path.display()))?;
        info!(path = %path.display(), "wrote svg");
    }
    if let Some(path) = &cli.out_json {
        create_parent(path)?;
        save_primitives_json(path, &primitives)
            .with_context(|| format!("write json '{}'", path.display()))?;
        info!(path = %path.display(), "wrote json");
    }

    Ok(())
}

fn create_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}
