//! End-to-end pyramid generation against generated GeoTIFFs.

use std::sync::{Arc, Mutex};

use image::{ColorType, DynamicImage, GenericImageView, Rgba, RgbaImage};
use raster_tiler::{
    decode_tile, BandCount, ProgressReceiver, Raster, TilePipeline, TilerConfig, TilerError,
};
use test_utils::{
    create_geotiff_rgba, create_noise_rgba_pixels, create_world_geotiff, fixtures, list_tile_files,
    Georeference,
};
use tile_common::{
    count_tiles, CoordinateSystem, GeoBounds, Interpolation, TileCoord, TileExtension, TileScheme,
};
use tokio_util::sync::CancellationToken;

fn world_raster(width: u32, height: u32) -> Raster {
    Raster::from_bytes(&create_world_geotiff(width, height, 42), CoordinateSystem::Epsg4326)
        .expect("world raster")
}

fn noise_raster(width: u32, height: u32, bounds: GeoBounds) -> Raster {
    let pixels = create_noise_rgba_pixels(width, height, 3);
    let image = RgbaImage::from_raw(width, height, pixels).expect("pixel buffer");
    Raster::from_image(DynamicImage::ImageRgba8(image), bounds, "noise").expect("raster")
}

/// West half noise, east half a single colour.
fn half_constant_raster() -> Raster {
    let (width, height) = (512, 256);
    let noise = create_noise_rgba_pixels(width, height, 9);
    let image = RgbaImage::from_fn(width, height, |x, y| {
        if x < width / 2 {
            let i = ((y * width + x) * 4) as usize;
            Rgba([noise[i], noise[i + 1], noise[i + 2], 255])
        } else {
            Rgba([10, 20, 30, 255])
        }
    });
    Raster::from_image(
        DynamicImage::ImageRgba8(image),
        CoordinateSystem::Epsg4326.valid_bounds(),
        "half-constant",
    )
    .expect("raster")
}

fn north_east_bounds() -> GeoBounds {
    GeoBounds::from_corners(CoordinateSystem::Epsg4326, 0.0, 0.0, 180.0, 90.0)
}

#[test]
fn test_count_conservation() {
    let spec = fixtures::raster::WORLD_512X256;
    let raster = world_raster(spec.width, spec.height);
    let pipeline = TilePipeline::new(&raster, TilerConfig::for_zooms(0, 1)).unwrap();

    let (tiles, report) = pipeline.collect().unwrap();
    let expected = count_tiles(raster.bounds(), 0..=1, TileScheme::Xyz, 256).unwrap();

    assert_eq!(expected, 10);
    assert_eq!(tiles.len() as u64, expected);
    assert_eq!(report.total, expected);
    assert_eq!(report.produced, expected);
    assert_eq!(report.skipped + report.dropped, 0);
    assert!(tiles.iter().all(|tile| tile.validate(false)));
}

#[test]
fn test_mercator_pyramid() {
    let pixels = create_noise_rgba_pixels(256, 256, 5);
    let geo = Georeference::from_bbox(3857, fixtures::bbox::MERCATOR_WORLD, 256, 256);
    let raster =
        Raster::from_bytes(&create_geotiff_rgba(256, 256, &pixels, geo), CoordinateSystem::Epsg3857)
            .unwrap();

    let config = TilerConfig {
        tile_size: 64,
        ..TilerConfig::for_zooms(0, 1)
    };
    let pipeline = TilePipeline::new(&raster, config).unwrap();
    let (tiles, report) = pipeline.collect().unwrap();

    assert_eq!(report.produced, 5);
    assert_eq!(tiles[0].coord(), TileCoord::xyz(0, 0, 0));
    assert_eq!(tiles[0].system(), CoordinateSystem::Epsg3857);
}

#[test]
fn test_directory_layout_per_scheme() {
    let raster = noise_raster(128, 64, north_east_bounds());

    for (scheme, row) in [(TileScheme::Xyz, 0), (TileScheme::Tms, 1)] {
        let dir = tempfile::tempdir().unwrap();
        let config = TilerConfig {
            tile_size: 64,
            scheme,
            ..TilerConfig::for_zooms(1, 1)
        };
        let pipeline = TilePipeline::new(&raster, config).unwrap();
        let report = pipeline.write_to_directory(dir.path()).unwrap();
        assert_eq!(report.produced, 2);
        assert_eq!(
            list_tile_files(dir.path()),
            vec![format!("1/2/{}.png", row), format!("1/3/{}.png", row)]
        );

        for column in [2, 3] {
            let path = dir
                .path()
                .join("1")
                .join(column.to_string())
                .join(format!("{}.png", row));
            let data = std::fs::read(&path).unwrap_or_else(|_| panic!("missing {:?}", path));
            assert_eq!(decode_tile(&data).unwrap().dimensions(), (64, 64));
        }
    }
}

#[test]
fn test_straddling_tiles_are_all_produced() {
    // Straddles the four z1 tiles around the origin
    let bounds = GeoBounds::from_corners(CoordinateSystem::Epsg4326, -45.0, -45.0, 45.0, 45.0);
    let raster = noise_raster(64, 64, bounds);
    let config = TilerConfig {
        tile_size: 64,
        ..TilerConfig::for_zooms(1, 1)
    };
    let pipeline = TilePipeline::new(&raster, config).unwrap();

    let (tiles, report) = pipeline.collect().unwrap();
    assert_eq!(report.total, 4);
    assert_eq!(report.produced, 4);
    assert_eq!(tiles.len(), 4);
}

#[test]
fn test_queue_drops_small_tiles() {
    let raster = half_constant_raster();
    let config = TilerConfig {
        tile_size: 16,
        interpolation: Interpolation::Nearest,
        ..TilerConfig::for_zooms(0, 0)
    };
    let pipeline = TilePipeline::new(&raster, config).unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let report = pipeline.send_to(tx).unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.produced, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(rx.try_recv().unwrap().coord(), TileCoord::xyz(0, 0, 0));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_directory_rejects_small_tiles() {
    let raster = half_constant_raster();
    let config = TilerConfig {
        tile_size: 16,
        interpolation: Interpolation::Nearest,
        ..TilerConfig::for_zooms(0, 0)
    };
    let pipeline = TilePipeline::new(&raster, config).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let result = pipeline.write_to_directory(dir.path());
    assert!(matches!(result, Err(TilerError::Validation(_))));
}

#[test]
fn test_lazy_tiles_drop_small_tiles() {
    let raster = half_constant_raster();
    let config = TilerConfig {
        tile_size: 16,
        interpolation: Interpolation::Nearest,
        ..TilerConfig::for_zooms(0, 0)
    };
    let pipeline = TilePipeline::new(&raster, config).unwrap();

    let tiles: Vec<_> = pipeline.tiles().map(|t| t.unwrap()).collect();
    assert_eq!(tiles.len(), 1);
    assert_eq!(tiles[0].coord(), TileCoord::xyz(0, 0, 0));
    assert!(tiles.iter().all(|tile| tile.validate(false)));
}

#[test]
fn test_tile_bytes_rejects_small_tile() {
    let raster = half_constant_raster();
    let config = TilerConfig {
        tile_size: 16,
        interpolation: Interpolation::Nearest,
        ..TilerConfig::for_zooms(0, 0)
    };
    let pipeline = TilePipeline::new(&raster, config).unwrap();

    assert!(pipeline.tile_bytes(TileCoord::xyz(0, 0, 0)).unwrap().len() > 355);
    assert!(matches!(
        pipeline.tile_bytes(TileCoord::xyz(0, 1, 0)),
        Err(TilerError::Validation(_))
    ));
}

#[test]
fn test_lazy_tiles_match_collect() {
    let raster = world_raster(128, 64);
    let config = TilerConfig {
        tile_size: 32,
        ..TilerConfig::for_zooms(0, 2)
    };
    let pipeline = TilePipeline::new(&raster, config).unwrap();

    let lazy: Vec<TileCoord> = pipeline.tiles().map(|t| t.unwrap().coord()).collect();
    let (collected, _) = pipeline.collect().unwrap();
    let mut eager: Vec<TileCoord> = collected.iter().map(|t| t.coord()).collect();

    let mut sorted = lazy.clone();
    sorted.sort();
    eager.sort();
    assert_eq!(sorted, eager);
    assert_eq!(lazy.len(), 42);
}

#[test]
fn test_cancelled_run_fails() {
    let raster = world_raster(64, 32);
    let token = CancellationToken::new();
    token.cancel();

    let pipeline = TilePipeline::new(&raster, TilerConfig::for_zooms(0, 2))
        .unwrap()
        .with_cancellation(token);
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        pipeline.write_to_directory(dir.path()),
        Err(TilerError::Cancelled)
    ));
}

#[test]
fn test_tile_bytes_leaves_uncovered_canvas_transparent() {
    let bounds = GeoBounds::from_corners(CoordinateSystem::Epsg4326, 0.0, 0.0, 90.0, 45.0);
    let raster = noise_raster(256, 128, bounds);
    let pipeline = TilePipeline::new(&raster, TilerConfig::for_zooms(0, 0)).unwrap();

    let data = pipeline.tile_bytes(TileCoord::xyz(0, 1, 0)).unwrap();
    let image = decode_tile(&data).unwrap().to_rgba8();

    assert_eq!(image.dimensions(), (256, 256));
    assert_eq!(image.get_pixel(64, 100).0[3], 255);
    assert_eq!(image.get_pixel(200, 20).0[3], 0);
    assert_eq!(image.get_pixel(64, 200).0[3], 0);
}

#[test]
fn test_progress_reaches_complete() {
    let raster = world_raster(128, 64);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let receiver: ProgressReceiver = Arc::new(move |percent| {
        recorder.lock().unwrap().push(percent);
    });

    let config = TilerConfig {
        tile_size: 32,
        print_estimated_time: true,
        ..TilerConfig::for_zooms(0, 1)
    };
    let pipeline = TilePipeline::new(&raster, config)
        .unwrap()
        .with_progress(receiver);
    pipeline.collect().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 10);
    let max = seen.iter().cloned().fold(0.0, f64::max);
    assert!((max - 100.0).abs() < 1e-9);
}

#[test]
fn test_jpeg_and_webp_outputs() {
    let raster = world_raster(128, 64);

    for extension in [TileExtension::Jpg, TileExtension::Webp] {
        let dir = tempfile::tempdir().unwrap();
        let config = TilerConfig {
            tile_size: 64,
            extension,
            ..TilerConfig::for_zooms(0, 0)
        };
        let pipeline = TilePipeline::new(&raster, config).unwrap();
        pipeline.write_to_directory(dir.path()).unwrap();

        let path = dir.path().join("0").join("0").join(format!("0.{}", extension));
        let data = std::fs::read(&path).unwrap();
        match extension {
            TileExtension::Jpg => assert_eq!(&data[..2], &[0xFF, 0xD8]),
            _ => assert_eq!(&data[..4], b"RIFF"),
        }
        assert_eq!(decode_tile(&data).unwrap().dimensions(), (64, 64));
    }
}

#[test]
fn test_gray_band_output() {
    let raster = world_raster(128, 64);
    let config = TilerConfig {
        tile_size: 64,
        band_count: BandCount::new(1).unwrap(),
        ..TilerConfig::for_zooms(0, 0)
    };
    let pipeline = TilePipeline::new(&raster, config).unwrap();
    let data = pipeline.tile_bytes(TileCoord::xyz(0, 0, 0)).unwrap();
    assert_eq!(decode_tile(&data).unwrap().color(), ColorType::L8);
}

#[test]
fn test_cache_is_used_across_tiles() {
    let raster = world_raster(256, 128);
    let config = TilerConfig {
        tile_size: 64,
        ..TilerConfig::for_zooms(0, 2)
    };
    let pipeline = TilePipeline::new(&raster, config).unwrap();
    pipeline.collect().unwrap();

    let stats = pipeline.cache_stats();
    assert!(stats.hits > 0);
    assert!(stats.entries > 0);
}
