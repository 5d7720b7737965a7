//! End-to-end tests of the native backend on small NetCDF fixtures
//!
//! The source fixture mimics a GDAL-converted GTOPO file: a global 10 degree
//! lat/lon grid with a `Band1` variable whose ocean cells hold the `_FillValue`.
//! The domain fixture mimics a RASM land domain file with 2-D `yc`/`xc` centers.

use gtopo_regrid::{
    config::RegridConfig,
    errors::{RegridError, Result},
    native::{GridCoords, NativeTool, Raster},
    pipeline::{PipelineOptions, RegridPipeline},
    region::LonLatBox,
    summary::RasterSummary,
    tool::GeoTool,
};
use ndarray::{Array1, Array2};
use netcdf::create;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const NLAT: usize = 18;
const NLON: usize = 36;
const FILL: f32 = -9999.0;

fn lat_of(i: usize) -> f64 {
    -85.0 + 10.0 * i as f64
}

fn lon_of(j: usize) -> f64 {
    -175.0 + 10.0 * j as f64
}

/// Elevation of an ordinary source cell
fn elevation(i: usize, j: usize) -> f32 {
    (i * 10 + j) as f32
}

// Special cells, as (row, column) of the source grid
const SPIKE: (usize, usize) = (9, 33); // 5N 155E, out of range high
const COAST: (usize, usize) = (6, 30); // 25S 125E, ocean fill value
const OUTSIDE_BOX: (usize, usize) = (0, 0); // 85S 175W, out of range low

fn create_gtopo_fixture(path: &Path) -> Result<()> {
    let mut file = create(path)?;
    file.add_attribute("Conventions", "CF-1.5")?;
    file.add_dimension("lat", NLAT)?;
    file.add_dimension("lon", NLON)?;

    {
        let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        let lat = Array1::from((0..NLAT).map(lat_of).collect::<Vec<_>>());
        lat_var.put(lat.view(), ..)?;
    }
    {
        let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        let lon = Array1::from((0..NLON).map(lon_of).collect::<Vec<_>>());
        lon_var.put(lon.view(), ..)?;
    }
    {
        let mut band = file.add_variable::<f32>("Band1", &["lat", "lon"])?;
        band.put_attribute("_FillValue", FILL)?;
        band.put_attribute("long_name", "GDAL Band Number 1")?;
        band.put_attribute("units", "m")?;

        let mut data = Array2::from_shape_fn((NLAT, NLON), |(i, j)| elevation(i, j));
        data[SPIKE] = 5000.0;
        data[COAST] = FILL;
        data[OUTSIDE_BOX] = -32768.0;
        band.put(data.view(), ..)?;
    }
    Ok(())
}

// Target cell centers, chosen to coincide with source cell centers
const YC: [f64; 3] = [-25.0, 5.0, 35.0];
const XC: [f64; 4] = [125.0, 155.0, 205.0, 255.0];

fn create_domain_fixture(path: &Path) -> Result<()> {
    let mut file = create(path)?;
    file.add_dimension("nj", YC.len())?;
    file.add_dimension("ni", XC.len())?;

    let shape = (YC.len(), XC.len());
    {
        let mut yc = file.add_variable::<f64>("yc", &["nj", "ni"])?;
        yc.put_attribute("units", "degrees_north")?;
        let values = Array2::from_shape_fn(shape, |(r, _)| YC[r]);
        yc.put(values.view(), ..)?;
    }
    {
        let mut xc = file.add_variable::<f64>("xc", &["nj", "ni"])?;
        xc.put_attribute("units", "degrees_east")?;
        let values = Array2::from_shape_fn(shape, |(_, c)| XC[c]);
        xc.put(values.view(), ..)?;
    }
    {
        let mut mask = file.add_variable::<i32>("mask", &["nj", "ni"])?;
        let values = Array2::<i32>::ones(shape);
        mask.put(values.view(), ..)?;
    }
    Ok(())
}

struct Fixture {
    _dir: TempDir,
    config: RegridConfig,
}

fn setup(output: &str) -> Fixture {
    let dir = tempdir().expect("Failed to create temp dir");
    let gtopo_dir = dir.path().join("gtopo");
    let domain_dir = dir.path().join("domains");
    fs::create_dir_all(&gtopo_dir).unwrap();
    fs::create_dir_all(&domain_dir).unwrap();

    create_gtopo_fixture(&gtopo_dir.join("gtopo30.nc")).expect("Failed to create GTOPO fixture");
    create_domain_fixture(&domain_dir.join("domain.lnd.test.nc"))
        .expect("Failed to create domain fixture");

    let cfg_path = dir.path().join("regridding.cfg");
    fs::write(
        &cfg_path,
        format!(
            "[DEFAULT]\nroot = {root}\n\n\
             [Parameter Specs]\n\
             domain_file_dir = %(root)s/domains\n\
             domain_file = domain.lnd.test.nc\n\
             grid = test\n\
             res = 10deg\n\
             output_dir = %(root)s/{output}\n\n\
             [GTOPO]\n\
             dir = %(root)s/gtopo\n\
             filename = gtopo30.nc\n",
            root = dir.path().display(),
            output = output,
        ),
    )
    .unwrap();

    let config = RegridConfig::from_file(&cfg_path).expect("Failed to load configuration");
    Fixture { _dir: dir, config }
}

fn run_native(config: &RegridConfig, options: PipelineOptions) -> Result<PathBuf> {
    let tool = NativeTool::new();
    let pipeline = RegridPipeline::new(config, &tool, options);
    pipeline.run().map(|report| report.output)
}

#[test]
fn test_full_run_writes_output_and_removes_intermediates() -> Result<()> {
    let fixture = setup("out");
    let output = run_native(&fixture.config, PipelineOptions::default())?;

    assert!(output.exists());
    assert_eq!(
        output.file_name().unwrap(),
        "sdat_10003_1_20180525_151136146_test.nc"
    );
    let remaining: Vec<_> = fs::read_dir(&fixture.config.output_dir)?
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(remaining.len(), 1, "unexpected files: {:?}", remaining);

    let raster = Raster::read(&output, Some("Band1"))?;
    assert_eq!(raster.shape(), (YC.len(), XC.len()));
    assert_eq!(raster.grid.y_dim, "nj");
    assert_eq!(raster.grid.x_dim, "ni");
    assert!(matches!(raster.grid.coords, GridCoords::Curvilinear { .. }));
    assert!(raster
        .attributes
        .iter()
        .any(|(name, _)| name == "units"));

    // Every cell is valid and inside the clip range
    assert_eq!(raster.missing_count(), 0);
    assert!(raster.data.iter().all(|&v| (-1000.0..=1000.0).contains(&v)));

    Ok(())
}

#[test]
fn test_out_of_range_cell_is_replaced() -> Result<()> {
    let fixture = setup("out");
    let output = run_native(&fixture.config, PipelineOptions::default())?;
    let raster = Raster::read(&output, None)?;

    // Target (5N, 155E) sits on the spike; its same-row neighbors at 145E and 165E
    // are closest and the tie goes to the western one
    let value = raster.data[[1, 1]];
    assert_ne!(value, 5000.0);
    assert_eq!(value, elevation(SPIKE.0, SPIKE.1 - 1));
    Ok(())
}

#[test]
fn test_coastal_missing_cell_is_filled_from_neighbor() -> Result<()> {
    let fixture = setup("out");
    let output = run_native(&fixture.config, PipelineOptions::default())?;
    let raster = Raster::read(&output, None)?;

    // Target (25S, 125E) sits on the ocean cell
    let value = raster.data[[0, 0]];
    assert!(!value.is_nan());
    assert_ne!(value, FILL);
    assert_eq!(value, elevation(COAST.0, COAST.1 - 1));

    // Untouched cells are copied from the coinciding source cell; 205E is 155W
    assert_eq!(raster.data[[2, 2]], elevation(12, 2));
    assert_eq!(raster.data[[2, 3]], elevation(12, 7));
    Ok(())
}

#[test]
fn test_crop_excludes_cells_outside_box() -> Result<()> {
    let fixture = setup("out");
    fs::create_dir_all(&fixture.config.output_dir)?;
    let cropped_path = fixture.config.output_dir.join("cropped_dem.nc");
    let bbox = LonLatBox::default();

    NativeTool::new().crop(&fixture.config.source_path(), "Band1", &bbox, &cropped_path)?;

    let cropped = Raster::read(&cropped_path, None)?;
    let (lat, lon) = cropped.grid.as_regular()?;
    assert_eq!(lat.len(), 10); // 45S..45N
    assert_eq!(lon.len(), 18); // 105E..275E
    assert!(lat.iter().all(|&phi| (-50.0..=50.0).contains(&phi)));
    assert!(lon.iter().all(|&lambda| (100.0..=280.0).contains(&lambda)));
    assert!(lon.windows(2).all(|w| w[0] < w[1]));

    // The out-of-range cell at 85S 175W is outside the box and must be gone
    assert!(cropped.data.iter().all(|&v| v != -32768.0));
    // The spike is inside and only removed later by the range clip
    assert!(cropped.data.iter().any(|&v| v == 5000.0));
    Ok(())
}

#[test]
fn test_missing_band_fails_without_output() {
    let fixture = setup("out");
    let options = PipelineOptions {
        band: "Band2".to_string(),
        ..Default::default()
    };

    match run_native(&fixture.config, options) {
        Err(RegridError::VariableNotFound { var }) => assert_eq!(var, "Band2"),
        other => panic!("Expected VariableNotFound error, got {:?}", other),
    }
    assert_eq!(fs::read_dir(&fixture.config.output_dir).unwrap().count(), 0);
}

#[test]
fn test_failed_remap_leaves_intermediates_behind() {
    let mut fixture = setup("out");
    fixture.config.domain_file = "does_not_exist.nc".to_string();

    let tool = NativeTool::new();
    let pipeline = RegridPipeline::new(&fixture.config, &tool, PipelineOptions::default());
    assert!(pipeline.run().is_err());

    let paths = pipeline.paths();
    assert!(!paths.regridded.exists());
    for path in paths.intermediates() {
        assert!(path.exists(), "{} should remain", path.display());
    }
}

#[test]
fn test_repeated_runs_are_byte_identical() -> Result<()> {
    let first = setup("run1");
    let second = setup("run2");

    let a = run_native(&first.config, PipelineOptions::default())?;
    let b = run_native(&second.config, PipelineOptions::default())?;

    let bytes_a = fs::read(&a)?;
    let bytes_b = fs::read(&b)?;
    assert_eq!(bytes_a.len(), bytes_b.len());
    assert!(bytes_a == bytes_b, "regridded files differ");
    Ok(())
}

#[test]
fn test_summary_of_regridded_raster() -> Result<()> {
    let fixture = setup("out");
    let output = run_native(&fixture.config, PipelineOptions::default())?;

    let summary = RasterSummary::from_file(&output, None)?;
    assert_eq!(summary.variable, "Band1");
    assert_eq!(summary.dimensions, ("nj".to_string(), "ni".to_string()));
    assert_eq!(summary.valid, YC.len() * XC.len());
    assert_eq!(summary.missing, 0);
    assert!(summary.max.unwrap() <= 1000.0);
    Ok(())
}
