//! Centralized error handling for gtopo_regrid
//!
//! Every failure in the pipeline (configuration, file access, NetCDF decoding or a
//! failing tool invocation) is reported through [`RegridError`] so callers can
//! propagate it with `?` and `main` can report it once.

use std::fmt;
use std::process::ExitStatus;

/// Main error type for regridding operations
#[derive(Debug)]
pub enum RegridError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Malformed line in the configuration file
    ConfigParse { line: usize, message: String },

    /// Section missing from the configuration file
    MissingSection { section: String },

    /// Key missing from a configuration section
    MissingKey { section: String, key: String },

    /// Invalid longitude/latitude box specification
    InvalidBox { message: String },

    /// Invalid valid-value range specification
    InvalidRange { message: String },

    /// Variable not found in NetCDF file
    VariableNotFound { var: String },

    /// Dimension not found in variable
    DimensionNotFound { var: String, dim: String },

    /// Grid layout the native backend cannot handle
    UnsupportedGrid { message: String },

    /// A selection produced no cells
    EmptySelection { message: String },

    /// The external tool executable could not be started
    ToolNotFound { program: String },

    /// The external tool exited unsuccessfully
    ToolFailed {
        operator: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Generic error
    Generic(String),
}

impl RegridError {
    pub(crate) fn tool_failed(operator: &str, status: ExitStatus, stderr: &[u8]) -> Self {
        RegridError::ToolFailed {
            operator: operator.to_string(),
            status: status.code(),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}

impl fmt::Display for RegridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegridError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            RegridError::IoError(e) => write!(f, "I/O error: {}", e),
            RegridError::ArrayError(e) => write!(f, "Array error: {}", e),
            RegridError::ConfigParse { line, message } => {
                write!(f, "Configuration parse error on line {}: {}", line, message)
            }
            RegridError::MissingSection { section } => {
                write!(f, "Section '[{}]' not found in configuration", section)
            }
            RegridError::MissingKey { section, key } => {
                write!(f, "Key '{}' not found in section '[{}]'", key, section)
            }
            RegridError::InvalidBox { message } => write!(f, "Invalid lon/lat box: {}", message),
            RegridError::InvalidRange { message } => write!(f, "Invalid value range: {}", message),
            RegridError::VariableNotFound { var } => write!(f, "Variable '{}' not found in file", var),
            RegridError::DimensionNotFound { var, dim } => {
                write!(f, "Dimension '{}' not found in variable '{}'", dim, var)
            }
            RegridError::UnsupportedGrid { message } => write!(f, "Unsupported grid: {}", message),
            RegridError::EmptySelection { message } => write!(f, "Empty selection: {}", message),
            RegridError::ToolNotFound { program } => {
                write!(f, "Could not start '{}': executable not found", program)
            }
            RegridError::ToolFailed {
                operator,
                status,
                stderr,
            } => {
                match status {
                    Some(code) => write!(f, "Operator '{}' failed with exit code {}", operator, code)?,
                    None => write!(f, "Operator '{}' was terminated by a signal", operator)?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
            RegridError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            RegridError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RegridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegridError::NetCDFError(e) => Some(e),
            RegridError::IoError(e) => Some(e),
            RegridError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for RegridError {
    fn from(error: netcdf::Error) -> Self {
        RegridError::NetCDFError(error)
    }
}

impl From<std::io::Error> for RegridError {
    fn from(error: std::io::Error) -> Self {
        RegridError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for RegridError {
    fn from(error: ndarray::ShapeError) -> Self {
        RegridError::ArrayError(error)
    }
}

impl From<String> for RegridError {
    fn from(error: String) -> Self {
        RegridError::Generic(error)
    }
}

impl From<&str> for RegridError {
    fn from(error: &str) -> Self {
        RegridError::Generic(error.to_string())
    }
}

/// Result type alias for regridding operations
pub type Result<T> = std::result::Result<T, RegridError>;
