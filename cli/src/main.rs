use clap::{Parser, Subcommand};
use regroute_common::db::core::{DesignDB, NetStatus};
use regroute_common::db::parser::segments;
use regroute_common::db::writer::save_routes;
use regroute_common::util::config::Config;
use regroute_common::util::generator::{self, GeneratorParams};
use regroute_common::util::{check, logger, visualization};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Route the configured segment file.
    Route,
    /// Write a random segment file.
    Generate {
        #[arg(long, default_value_t = 500)]
        nets: usize,
        #[arg(long, default_value_t = 3)]
        segments: usize,
        #[arg(long, default_value_t = 1000.0)]
        width: f64,
        #[arg(long, default_value_t = 1000.0)]
        height: f64,
        #[arg(long, default_value_t = 4)]
        layers: u8,
        #[arg(long, default_value_t = 20)]
        blockages: usize,
        #[arg(long, default_value = "inputs/random.seg")]
        output: String,
    },
    /// Print the region layout chosen for the configured design.
    Partition,
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        log::info!("Loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            args.config
        );
        Config::default()
    };

    match args.command.unwrap_or(Commands::Route) {
        Commands::Generate {
            nets,
            segments,
            width,
            height,
            layers,
            blockages,
            output,
        } => {
            prepare_output_dir(&output)?;
            let params = GeneratorParams {
                nets,
                max_segments_per_net: segments,
                die_width: width,
                die_height: height,
                layers,
                blockages,
            };
            generator::generate_random_segments(&output, &params)?;
            log::info!("Generated: {}", output);
        }
        Commands::Partition => {
            let db = load_design(&config)?;
            print_partition(&db, &config);
        }
        Commands::Route => {
            if run_routing(&config).is_err() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn prepare_output_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent() {
        if !parent.exists() && !parent.as_os_str().is_empty() {
            log::info!("Creating output directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn load_design(config: &Config) -> anyhow::Result<DesignDB> {
    let input = &config.input.segments_file;
    if !Path::new(input).exists() {
        return Err(anyhow::anyhow!("Input segment file missing: {}", input));
    }
    let mut db = DesignDB::new();
    log::info!("Parsing segments: {}", input);
    segments::parse(&mut db, input)
        .map_err(|e| anyhow::anyhow!("Invalid segment syntax in '{}': {}", input, e))?;
    if db.layers.is_empty() {
        return Err(anyhow::anyhow!("No layers defined! Cannot route."));
    }
    log::info!(
        "Design: {} nets, {} segments, {} layers, {} blockages",
        db.num_nets(),
        db.num_segments(),
        db.layers.len(),
        db.blockages.len()
    );
    Ok(db)
}

fn print_partition(db: &DesignDB, config: &Config) {
    let (converter, regions) = regroute_router::plan_regions(db, &config.routing);
    println!(
        "grid {}x{}, {} regions",
        converter.width(),
        converter.height(),
        regions.len()
    );
    for r in &regions {
        println!(
            "  {:?} col {} row {}: x {}..={} y {}..={}",
            r.id, r.col, r.row, r.low_x, r.high_x, r.low_y, r.high_y
        );
    }
}

fn run_routing(config: &Config) -> anyhow::Result<()> {
    let mut db = match load_design(config) {
        Ok(db) => db,
        Err(e) => {
            log::error!("{}", e);
            return Err(e);
        }
    };

    log::info!("Starting Routing...");
    let report = regroute_router::route(&mut db, &config.routing).map_err(|e| {
        log::error!("Routing failed: {}", e);
        anyhow::anyhow!(e)
    })?;

    let routed = db
        .nets
        .iter()
        .filter(|n| n.status == NetStatus::Routed)
        .count();
    log::info!(
        "Routed {}/{} nets ({} unroutable, {} not reached)",
        routed,
        db.num_nets(),
        report.unroutable.len() - report.failed_nets(regroute_router::FailureKind::NotReached),
        report.failed_nets(regroute_router::FailureKind::NotReached)
    );

    if let Some(image) = &config.input.image_file {
        prepare_output_dir(image)?;
        log::info!("Generating routed visualization...");
        let regions = regroute_router::region_outlines(&db, &config.routing);
        visualization::draw_routed_design(&db, &regions, image, 2000, 2000);
    }

    if config.input.verify {
        check::run(&db).map_err(|e| {
            log::error!("Verification Failed: {}", e);
            anyhow::anyhow!("Verification Failed: {}", e)
        })?;
    }

    prepare_output_dir(&config.input.output_file)?;
    log::info!("Writing routes to {}", config.input.output_file);
    save_routes(&db, &config.input.output_file)?;

    Ok(())
}
