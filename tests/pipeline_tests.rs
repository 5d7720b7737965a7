//! Pipeline sequencing and cleanup tests
//!
//! These use a recording tool that writes placeholder files, so they exercise the
//! step order, file naming and cleanup rules without NetCDF data or CDO.

use gtopo_regrid::{
    cdo::CdoTool,
    config::RegridConfig,
    errors::{RegridError, Result},
    paths::DEFAULT_OUTPUT_STEM,
    pipeline::{PipelineOptions, RegridPipeline},
    region::{LonLatBox, ValueRange},
    tool::{GeoTool, Operation},
};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Writes a marker file for every call and records the calls in order
#[derive(Default)]
struct RecordingTool {
    calls: RefCell<Vec<(String, PathBuf, PathBuf)>>,
    fail_on: Option<&'static str>,
}

impl RecordingTool {
    fn failing_on(operator: &'static str) -> Self {
        Self {
            fail_on: Some(operator),
            ..Default::default()
        }
    }

    fn record(&self, operator: &str, input: &Path, output: &Path) -> Result<()> {
        self.calls
            .borrow_mut()
            .push((operator.to_string(), input.to_path_buf(), output.to_path_buf()));
        if self.fail_on == Some(operator) {
            return Err(RegridError::ToolFailed {
                operator: operator.to_string(),
                status: Some(1),
                stderr: "simulated failure".to_string(),
            });
        }
        fs::write(output, operator)?;
        Ok(())
    }

    fn operators(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.0.clone()).collect()
    }
}

impl GeoTool for RecordingTool {
    fn name(&self) -> &str {
        "recording"
    }

    fn crop(&self, source: &Path, _band: &str, _bbox: &LonLatBox, output: &Path) -> Result<()> {
        self.record("sellonlatbox", source, output)
    }

    fn clip_range(&self, input: &Path, _range: &ValueRange, output: &Path) -> Result<()> {
        self.record("setvrange", input, output)
    }

    fn fill_missing_nearest(&self, input: &Path, output: &Path) -> Result<()> {
        self.record("setmisstonn", input, output)
    }

    fn remap_nearest(&self, input: &Path, _grid: &Path, output: &Path) -> Result<()> {
        self.record("remapnn", input, output)
    }
}

fn test_config(dir: &TempDir) -> RegridConfig {
    RegridConfig {
        domain_file_dir: dir.path().join("domains"),
        domain_file: "domain.lnd.wr50a.nc".to_string(),
        grid: "wr50a".to_string(),
        res: "50km".to_string(),
        output_dir: dir.path().join("out"),
        gtopo_dir: dir.path().join("gtopo"),
        gtopo_filename: "gtopo30.nc".to_string(),
        output_stem: DEFAULT_OUTPUT_STEM.to_string(),
    }
}

#[test]
fn test_steps_run_in_order_and_chain_files() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let tool = RecordingTool::default();
    let pipeline = RegridPipeline::new(&config, &tool, PipelineOptions::default());

    let report = pipeline.run().expect("pipeline should succeed");

    assert_eq!(
        tool.operators(),
        vec!["sellonlatbox", "setvrange", "setmisstonn", "remapnn"]
    );

    // Each step reads what the previous one wrote
    let calls = tool.calls.borrow();
    assert_eq!(calls[0].1, config.source_path());
    for pair in calls.windows(2) {
        assert_eq!(pair[0].2, pair[1].1);
    }
    assert_eq!(calls[3].2, report.output);

    assert_eq!(report.steps.len(), 4);
    assert_eq!(report.steps[3].operator, "remapnn");
}

#[test]
fn test_success_removes_intermediates() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let tool = RecordingTool::default();
    let pipeline = RegridPipeline::new(&config, &tool, PipelineOptions::default());

    let report = pipeline.run().expect("pipeline should succeed");
    let paths = pipeline.paths();

    assert!(report.output.exists());
    assert_eq!(
        report.output,
        config
            .output_dir
            .join("sdat_10003_1_20180525_151136146_wr50a.nc")
    );
    for path in paths.intermediates() {
        assert!(!path.exists(), "{} should be removed", path.display());
    }
    assert_eq!(report.removed.len(), 3);

    // Only the final raster remains in the output directory
    let remaining: Vec<_> = fs::read_dir(&config.output_dir).unwrap().collect();
    assert_eq!(remaining.len(), 1);
}

#[test]
fn test_keep_intermediates_option() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let tool = RecordingTool::default();
    let options = PipelineOptions {
        keep_intermediates: true,
        ..Default::default()
    };
    let pipeline = RegridPipeline::new(&config, &tool, options);

    let report = pipeline.run().expect("pipeline should succeed");
    assert!(report.removed.is_empty());
    for path in pipeline.paths().intermediates() {
        assert!(path.exists());
    }
}

#[test]
fn test_failure_leaves_completed_intermediates() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let tool = RecordingTool::failing_on("setmisstonn");
    let pipeline = RegridPipeline::new(&config, &tool, PipelineOptions::default());

    let result = pipeline.run();
    match result {
        Err(RegridError::ToolFailed { operator, .. }) => assert_eq!(operator, "setmisstonn"),
        other => panic!("Expected ToolFailed error, got {:?}", other),
    }

    let paths = pipeline.paths();
    assert!(paths.crop.exists());
    assert!(paths.clipped.exists());
    assert!(!paths.filled.exists());
    assert!(!paths.regridded.exists());
    // Remap never ran
    assert_eq!(tool.operators().len(), 3);
}

#[test]
fn test_cleanup_on_failure_option() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let tool = RecordingTool::failing_on("remapnn");
    let options = PipelineOptions {
        cleanup_on_failure: true,
        ..Default::default()
    };
    let pipeline = RegridPipeline::new(&config, &tool, options);

    assert!(pipeline.run().is_err());
    let paths = pipeline.paths();
    for path in paths.intermediates() {
        assert!(!path.exists(), "{} should be removed", path.display());
    }
    assert!(!paths.regridded.exists());
}

#[test]
fn test_failure_on_first_step_writes_nothing() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let tool = RecordingTool::failing_on("sellonlatbox");
    let pipeline = RegridPipeline::new(&config, &tool, PipelineOptions::default());

    assert!(pipeline.run().is_err());
    assert_eq!(fs::read_dir(&config.output_dir).unwrap().count(), 0);
}

#[test]
fn test_plan_uses_options() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = test_config(&temp_dir);
    let tool = RecordingTool::default();
    let options = PipelineOptions {
        band: "elev".to_string(),
        bbox: "0,90,-10,10".parse().unwrap(),
        range: "-10,10".parse().unwrap(),
        ..Default::default()
    };
    let pipeline = RegridPipeline::new(&config, &tool, options);

    let plan = pipeline.plan();
    assert_eq!(plan.len(), 4);
    assert_eq!(
        plan[0].operation,
        Operation::Crop {
            band: "elev".to_string(),
            bbox: LonLatBox::new(0.0, 90.0, -10.0, 10.0).unwrap(),
        }
    );
    assert_eq!(
        plan[1].operation,
        Operation::ClipRange(ValueRange::new(-10.0, 10.0).unwrap())
    );
    assert_eq!(
        plan[3].operation,
        Operation::RemapNearest {
            grid: config.domain_path()
        }
    );

    let described = pipeline.describe();
    assert_eq!(described[2], format!(
        "setmisstonn {} -> {}",
        plan[2].input.display(),
        plan[2].output.display()
    ));

    // Planning never touches the filesystem
    assert!(tool.operators().is_empty());
    assert!(!config.output_dir.exists());
}

#[cfg(unix)]
#[test]
fn test_failing_cdo_stops_pipeline_without_output() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = test_config(&temp_dir);

    let script = temp_dir.path().join("cdo");
    fs::write(
        &script,
        "#!/bin/sh\necho 'cdo(1) selname: Variable Band2 not found!' >&2\nexit 1\n",
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let tool = CdoTool::with_program(&script);
    let pipeline = RegridPipeline::new(&config, &tool, PipelineOptions::default());

    match pipeline.run() {
        Err(RegridError::ToolFailed {
            operator,
            status,
            stderr,
        }) => {
            assert_eq!(operator, "sellonlatbox");
            assert_eq!(status, Some(1));
            assert!(stderr.contains("Variable Band2 not found!"));
        }
        other => panic!("Expected ToolFailed error, got {:?}", other),
    }

    assert!(!pipeline.paths().regridded.exists());
    assert_eq!(fs::read_dir(&config.output_dir).unwrap().count(), 0);
}
