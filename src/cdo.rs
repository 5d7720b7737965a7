//! CDO (Climate Data Operators) backend
//!
//! Every operation is one blocking `cdo` invocation. Global options default to
//! `-s -O --no_history`: silent, overwrite existing outputs and leave the `history`
//! attribute alone so identical runs write identical files.

use crate::errors::{Result, RegridError};
use crate::region::{LonLatBox, ValueRange};
use crate::tool::{GeoTool, Operation, Step};
use std::ffi::OsString;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Runs operators through the `cdo` executable
#[derive(Debug, Clone)]
pub struct CdoTool {
    program: PathBuf,
    options: Vec<String>,
}

/// A fully assembled `cdo` command line
#[derive(Debug, Clone, PartialEq)]
pub struct CdoCommand {
    pub program: PathBuf,
    pub operator: &'static str,
    pub args: Vec<OsString>,
}

impl fmt::Display for CdoCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

impl CdoTool {
    pub const DEFAULT_PROGRAM: &'static str = "cdo";

    pub fn new() -> Self {
        Self::with_program(Self::DEFAULT_PROGRAM)
    }

    /// Use a specific executable, e.g. a CDO build outside `PATH`
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            options: vec!["-s".to_string(), "-O".to_string(), "--no_history".to_string()],
        }
    }

    /// Command line for a pipeline step
    pub fn command(&self, step: &Step) -> CdoCommand {
        let mut args: Vec<OsString> = self.options.iter().map(OsString::from).collect();

        match &step.operation {
            Operation::Crop { band, bbox } => {
                args.push(format!("sellonlatbox,{}", bbox).into());
                args.push(format!("-selname,{}", band).into());
            }
            Operation::ClipRange(range) => {
                args.push(format!("setvrange,{}", range).into());
            }
            Operation::FillMissingNearest => {
                args.push("setmisstonn".into());
            }
            Operation::RemapNearest { grid } => {
                let mut operator = OsString::from("remapnn,");
                operator.push(grid.as_os_str());
                args.push(operator);
            }
        }
        args.push(step.input.clone().into_os_string());
        args.push(step.output.clone().into_os_string());

        CdoCommand {
            program: self.program.clone(),
            operator: step.operation.operator(),
            args,
        }
    }

    fn run(&self, step: Step) -> Result<()> {
        let command = self.command(&step);
        debug!(command = %command, "running cdo");

        let output = Command::new(&command.program)
            .args(&command.args)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RegridError::ToolNotFound {
                    program: command.program.display().to_string(),
                },
                _ => RegridError::IoError(e),
            })?;

        if !output.status.success() {
            return Err(RegridError::tool_failed(
                command.operator,
                output.status,
                &output.stderr,
            ));
        }
        Ok(())
    }
}

impl Default for CdoTool {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoTool for CdoTool {
    fn name(&self) -> &str {
        "cdo"
    }

    fn crop(&self, source: &Path, band: &str, bbox: &LonLatBox, output: &Path) -> Result<()> {
        self.run(Step::new(
            Operation::Crop {
                band: band.to_string(),
                bbox: *bbox,
            },
            source,
            output,
        ))
    }

    fn clip_range(&self, input: &Path, range: &ValueRange, output: &Path) -> Result<()> {
        self.run(Step::new(Operation::ClipRange(*range), input, output))
    }

    fn fill_missing_nearest(&self, input: &Path, output: &Path) -> Result<()> {
        self.run(Step::new(Operation::FillMissingNearest, input, output))
    }

    fn remap_nearest(&self, input: &Path, grid: &Path, output: &Path) -> Result<()> {
        self.run(Step::new(
            Operation::RemapNearest {
                grid: grid.to_path_buf(),
            },
            input,
            output,
        ))
    }

    fn describe(&self, step: &Step) -> String {
        self.command(step).to_string()
    }
}
