use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use placeweave_fractal::{FractalKind, Lichtenberg, RiverDelta};
use placeweave_persist::{ExportFormat, ExportStore};
use placeweave_tools::GraphInspector;
use placeweave_worldgen::{
    CancellationToken, GenerationObserver, Stage, WorldGenerationConfig, WorldGenerationResult,
    WorldShape, generate_batch, generate_with,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "placeweave", about = "Procedural place-graph world generator")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, stages and the default configuration
    Info,
    /// Generate one or more worlds and optionally export them
    Generate(GenerateArgs),
    /// Check store integrity and the invariants of exported worlds
    Validate {
        /// Export store directory
        #[arg(short, long)]
        store: PathBuf,
        /// Only validate this export
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Print statistics about an exported world
    Inspect {
        #[arg(short, long)]
        store: PathBuf,
        /// Export file name; defaults to the most recent export
        #[arg(short, long)]
        file: Option<String>,
        /// Print the exit-count histogram
        #[arg(long)]
        histogram: bool,
        /// Print per-ecosystem totals
        #[arg(long)]
        ecosystems: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GeneratorArg {
    Lichtenberg,
    RiverDelta,
}

#[derive(Args)]
struct GenerateArgs {
    /// YAML or JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u32>,
    /// Number of ecosystem bands (replaces explicit dimensions)
    #[arg(long)]
    bands: Option<usize>,
    /// World width; requires --height
    #[arg(long, requires = "height")]
    width: Option<f64>,
    #[arg(long, requires = "width")]
    height: Option<f64>,
    #[arg(long)]
    min_places: Option<usize>,
    #[arg(long)]
    max_places: Option<usize>,
    #[arg(long)]
    density: Option<f64>,
    #[arg(long)]
    branching: Option<f64>,
    #[arg(long)]
    dithering: Option<f64>,
    #[arg(long, value_enum)]
    generator: Option<GeneratorArg>,
    /// Generate this many worlds with consecutive seeds, in parallel
    #[arg(long, default_value = "1")]
    count: u32,
    /// Export store directory
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Compress exports with zstd
    #[arg(long)]
    compress: bool,
}

impl GenerateArgs {
    fn resolve(&self) -> anyhow::Result<WorldGenerationConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => WorldGenerationConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(count) = self.bands {
            config.shape = WorldShape::Bands { count };
        }
        if let (Some(width), Some(height)) = (self.width, self.height) {
            config.shape = WorldShape::Dimensions { width, height };
        }
        if let Some(n) = self.min_places {
            config.min_places = n;
        }
        if let Some(n) = self.max_places {
            config.max_places = n;
        }
        if let Some(d) = self.density {
            config.place_density = d;
        }
        if let Some(b) = self.branching {
            config.branching_factor = b;
        }
        if let Some(d) = self.dithering {
            config.dithering_strength = d;
        }
        match self.generator {
            Some(GeneratorArg::Lichtenberg) => {
                config.generator = FractalKind::Lichtenberg(Lichtenberg::default());
            }
            Some(GeneratorArg::RiverDelta) => {
                config.generator = FractalKind::RiverDelta(RiverDelta::default());
            }
            None => {}
        }
        config.validate()?;
        Ok(config)
    }
}

fn load_config(path: &Path) -> anyhow::Result<WorldGenerationConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let config = match ext {
        "yaml" | "yml" => serde_yaml::from_str(&text)
            .with_context(|| format!("parsing YAML config {}", path.display()))?,
        "json" => serde_json::from_str(&text)
            .with_context(|| format!("parsing JSON config {}", path.display()))?,
        other => bail!("unsupported config extension {other:?}; use .yaml, .yml or .json"),
    };
    Ok(config)
}

/// Logs each stage as it starts and finishes.
struct LogObserver;

impl GenerationObserver for LogObserver {
    fn stage_started(&mut self, stage: Stage) {
        tracing::debug!(%stage, "stage started");
    }

    fn stage_finished(&mut self, stage: Stage, elapsed: Duration) {
        tracing::info!(%stage, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "stage finished");
    }
}

fn print_result(result: &WorldGenerationResult) {
    let summary = GraphInspector::summary(&result.graph());
    println!(
        "seed={} generator={} status={:?}",
        result.config.seed,
        result.config.generator.name(),
        result.status
    );
    println!("{summary}");
    let d = &result.diagnostics;
    println!(
        "  target={} projections={} merged_edges={} seams={} transitions={}",
        d.target_places, d.projections, d.merge.edges_added, d.seams_stitched, d.ecosystem_transitions
    );
    println!(
        "  exits placed={} repair bridges={} rounds={} enhance added={} layout bands={}",
        d.exits.placed(),
        d.repair.bridges,
        d.repair.rounds,
        d.enhance.exits_added,
        d.layout.len()
    );
    println!("  total time: {:.1}ms", d.total_time().as_secs_f64() * 1000.0);
}

fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    let results = if args.count <= 1 {
        vec![generate_with(&config, &mut LogObserver, &CancellationToken::new())?]
    } else {
        let configs: Vec<_> = (0..args.count)
            .map(|i| WorldGenerationConfig {
                seed: config.seed.wrapping_add(i),
                ..config.clone()
            })
            .collect();
        generate_batch(&configs)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut store = args.out.as_deref().map(ExportStore::open).transpose()?;
    let format = if args.compress {
        ExportFormat::JsonlZstd
    } else {
        ExportFormat::Jsonl
    };
    for result in &results {
        print_result(result);
        if let Some(store) = store.as_mut() {
            let receipt = store.export(result, format)?;
            if receipt.created {
                println!("  exported {} ({} bytes)", receipt.filename, receipt.bytes_written);
            } else {
                println!("  already exported as {}", receipt.filename);
            }
        }
    }
    Ok(())
}

fn run_validate(store: &Path, file: Option<&str>) -> anyhow::Result<()> {
    let store = ExportStore::open(store)?;
    store.verify_integrity().context("store integrity")?;
    println!("integrity: OK ({} exports)", store.entries().len());

    let names: Vec<String> = match file {
        Some(f) => vec![f.to_string()],
        None => store.entries().iter().map(|e| e.filename.clone()).collect(),
    };
    let mut failures = 0;
    for name in &names {
        let world = store.load(name)?.into_result();
        let report = GraphInspector::validate(&world.graph());
        println!("{name}: {report}");
        if !report.is_valid() {
            failures += 1;
        }
    }
    if failures > 0 {
        bail!("{failures} of {} export(s) failed validation", names.len());
    }
    Ok(())
}

fn run_inspect(
    store: &Path,
    file: Option<&str>,
    histogram: bool,
    ecosystems: bool,
) -> anyhow::Result<()> {
    let store = ExportStore::open(store)?;
    let name = match file {
        Some(f) => f.to_string(),
        None => match store.entries().last() {
            Some(entry) => entry.filename.clone(),
            None => bail!("store at {} holds no exports", store.root().display()),
        },
    };
    let world = store.load(&name)?;
    let graph = world.clone().into_result().graph();
    println!("{name}");
    println!("seed={} places={} vertices={}", world.config.seed, world.places.len(), world.vertices.len());
    println!("{}", GraphInspector::summary(&graph));

    if histogram {
        println!("exit histogram:");
        for (degree, count) in GraphInspector::degree_histogram(&graph) {
            println!("  {degree:>2}: {count}");
        }
    }
    if ecosystems {
        println!("ecosystems:");
        for (eco, tally) in GraphInspector::ecosystem_breakdown(&graph) {
            println!(
                "  {eco:<10} places={:<4} exits={:<4} cross={}",
                tally.places, tally.exits, tally.cross_ecosystem_exits
            );
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => {
            println!("placeweave v{}", env!("CARGO_PKG_VERSION"));
            let stages: Vec<&str> = Stage::ORDER.iter().map(|s| s.name()).collect();
            println!("stages: {}", stages.join(" -> "));
            println!("default config:");
            print!("{}", serde_yaml::to_string(&WorldGenerationConfig::default())?);
        }
        Commands::Generate(args) => run_generate(args)?,
        Commands::Validate { store, file } => run_validate(&store, file.as_deref())?,
        Commands::Inspect {
            store,
            file,
            histogram,
            ecosystems,
        } => run_inspect(&store, file.as_deref(), histogram, ecosystems)?,
    }

    Ok(())
}
