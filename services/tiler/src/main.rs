//! Tile pyramid generator.
//!
//! Reads a GeoTIFF and writes `{output}/{z}/{x}/{y}.{ext}` tiles for a zoom
//! range. Settings not given on the command line fall back to the `TILER_*`
//! environment variables and then to the library defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use raster_tiler::{
    BandCount, GenerationReport, GeoTiffReader, Raster, TilePipeline, TilerConfig,
};
use tile_common::{CoordinateSystem, Interpolation, TileExtension, TileScheme};

#[derive(Parser, Debug)]
#[command(name = "tiler")]
#[command(about = "Cut a georeferenced raster into an XYZ/TMS tile pyramid")]
struct Args {
    /// Source GeoTIFF
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Lowest zoom level
    #[arg(long)]
    min_zoom: Option<u32>,

    /// Highest zoom level (inclusive)
    #[arg(long)]
    max_zoom: Option<u32>,

    /// Coordinate system of the input (read from the GeoTIFF when omitted)
    #[arg(long)]
    crs: Option<String>,

    /// Number rows bottom-up (TMS) instead of top-down (XYZ)
    #[arg(long)]
    tms: bool,

    /// Tile side in pixels
    #[arg(long)]
    tile_size: Option<u32>,

    /// Output format: png, jpg or webp
    #[arg(long)]
    extension: Option<TileExtension>,

    /// Resampling filter: nearest, linear, cubic, gaussian, lanczos3
    #[arg(long)]
    interpolation: Option<Interpolation>,

    /// Bands per tile (0 keeps the source bands)
    #[arg(long)]
    bands: Option<BandCount>,

    /// Source blocks kept in memory
    #[arg(long)]
    cache_tiles: Option<usize>,

    /// Worker threads (0 = one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Log the estimated remaining time
    #[arg(long)]
    eta: bool,

    /// Only print how many tiles would be generated
    #[arg(long)]
    count_only: bool,

    /// Log level
    #[arg(long, default_value = "info", env = "TILER_LOG_LEVEL")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,

    /// Write the generation report to this file as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,
}

impl Args {
    /// Environment configuration with command-line overrides applied.
    fn config(&self) -> Result<TilerConfig> {
        let mut config = TilerConfig::from_env();

        if let Some(zoom) = self.min_zoom {
            config.min_zoom = zoom;
        }
        if let Some(zoom) = self.max_zoom {
            config.max_zoom = zoom;
        }
        if self.tms {
            config.scheme = TileScheme::Tms;
        }
        if let Some(size) = self.tile_size {
            config.tile_size = size;
        }
        if let Some(extension) = self.extension {
            config.extension = extension;
        }
        if let Some(interpolation) = self.interpolation {
            config.interpolation = interpolation;
        }
        if let Some(bands) = self.bands {
            config.band_count = bands;
        }
        if let Some(count) = self.cache_tiles {
            config.cache_tile_count = count;
        }
        if let Some(threads) = self.threads {
            config.worker_count = threads;
        }
        if self.eta {
            config.print_estimated_time = true;
        }

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;
        Ok(config)
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs);

    let config = args.config()?;
    let data = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let system = match &args.crs {
        Some(code) => CoordinateSystem::from_code(code)?,
        None => GeoTiffReader.read_system(&data)?.unwrap_or_else(|| {
            warn!("No supported coordinate system in the GeoTIFF, assuming EPSG:4326");
            CoordinateSystem::Epsg4326
        }),
    };
    let raster = Raster::decode(
        &data,
        system,
        &GeoTiffReader,
        args.input.display().to_string(),
    )?;
    drop(data);

    if args.count_only {
        let count = TilePipeline::new(&raster, config)?.count()?;
        println!("{}", count);
        return Ok(());
    }

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        system = %system,
        "Starting tile generation"
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            on_signal.cancel();
        }
    });

    let output = args.output.clone();
    let outcome = tokio::task::spawn_blocking(move || -> Result<GenerationReport> {
        let pipeline = TilePipeline::new(&raster, config)?.with_cancellation(cancel);
        Ok(pipeline.write_to_directory(&output)?)
    })
    .await
    .context("Tile generation task failed")?;
    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Tile generation failed");
            return Err(e);
        }
    };

    let json = serde_json::to_string_pretty(&report)?;
    match &args.report_json {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote generation report");
        }
        None => println!("{}", json),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["tiler", "--input", "in.tif", "--output", "out"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_overrides() {
        let args = parse(&[
            "--min-zoom",
            "2",
            "--max-zoom",
            "5",
            "--tms",
            "--tile-size",
            "512",
            "--extension",
            "webp",
            "--interpolation",
            "lanczos3",
            "--bands",
            "3",
            "--threads",
            "2",
        ]);
        let config = args.config().unwrap();

        assert_eq!(config.zooms(), 2..=5);
        assert_eq!(config.scheme, TileScheme::Tms);
        assert_eq!(config.tile_size, 512);
        assert_eq!(config.extension, TileExtension::Webp);
        assert_eq!(config.interpolation, Interpolation::Lanczos3);
        assert_eq!(config.band_count.get(), 3);
        assert_eq!(config.worker_count, 2);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let argv = ["tiler", "-i", "a.tif", "-o", "out", "--bands", "9"];
        assert!(Args::try_parse_from(argv).is_err());

        let argv = ["tiler", "-i", "a.tif", "-o", "out", "--extension", "gif"];
        assert!(Args::try_parse_from(argv).is_err());

        let args = parse(&["--min-zoom", "6", "--max-zoom", "1"]);
        assert!(args.config().is_err());
    }

    #[test]
    fn test_generates_from_file() {
        let dir = test_utils::temp_test_dir();
        let input = test_utils::write_test_file(
            &dir,
            "world.tif",
            &test_utils::create_world_geotiff(128, 64, 1),
        );
        let data = std::fs::read(&input).unwrap();
        let system = GeoTiffReader.read_system(&data).unwrap();
        assert_eq!(system, Some(CoordinateSystem::Epsg4326));

        let raster = Raster::open(&input, CoordinateSystem::Epsg4326).unwrap();
        let config = parse(&["--max-zoom", "1", "--tile-size", "64"])
            .config()
            .unwrap();
        let output = dir.path().join("tiles");
        let report = TilePipeline::new(&raster, config)
            .unwrap()
            .write_to_directory(&output)
            .unwrap();

        assert_eq!(report.produced, 10);
        let files = test_utils::list_tile_files(&output);
        assert_eq!(files.len(), 10);
        assert!(files.contains(&"1/3/1.png".to_string()));
    }
}
