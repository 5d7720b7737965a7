//! Entry point for gtopo-regrid.
//! Handles CLI parsing, logging setup, configuration loading and runs the pipeline.

use clap::Parser;
use gtopo_regrid::cli::{Args, Backend};
use gtopo_regrid::config::RegridConfig;
use gtopo_regrid::pipeline::RegridPipeline;
use gtopo_regrid::summary::RasterSummary;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG takes precedence over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();
    setup_logging(args.verbose)?;

    println!(
        r#"
------------------------------------------------------------------
                   GTOPO -> model grid regridding
------------------------------------------------------------------
"#
    );

    let config = RegridConfig::from_file(&args.config)?;
    println!("Loaded configuration: {}", args.config.display());

    if args.backend == Backend::Native {
        let parallel = args.parallel_config();
        parallel.setup_global_pool()?;
        println!("Using {} threads", parallel.current_threads());
    }

    let tool = args.tool();
    let pipeline = RegridPipeline::new(&config, &tool, args.pipeline_options());

    if args.dry_run {
        println!("\n Planned steps ({} backend):", tool.name());
        for (i, line) in pipeline.describe().iter().enumerate() {
            println!("   {}. {}", i + 1, line);
        }
        let paths = pipeline.paths();
        if !args.keep_intermediates {
            println!("   then remove:");
            for path in paths.intermediates() {
                println!("      {}", path.display());
            }
        }
        return Ok(());
    }

    let report = pipeline.run()?;

    println!("✅ Saved regridded raster to {}", report.output.display());
    println!(
        "   Started {}, {} steps in {:.2?}",
        report.started.to_rfc3339(),
        report.steps.len(),
        report.total_elapsed()
    );
    for step in &report.steps {
        println!("   • {:<12} {:>10.2?}", step.operator, step.elapsed);
    }
    if !report.removed.is_empty() {
        println!("   Removed {} intermediate files", report.removed.len());
    }

    if args.summary {
        RasterSummary::from_file(&report.output, None)?.print();
    }

    Ok(())
}
