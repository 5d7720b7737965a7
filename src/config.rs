//! Configuration loading
//!
//! The regridding run is driven by an INI style file (the `configparser` dialect):
//!
//! ```ini
//! [Parameter Specs]
//! domain_file_dir = /data/domains
//! domain_file = domain.lnd.wr50a_ar9v4.100920.nc
//! grid = wr50a
//! res = 50km
//! output_dir = /data/out
//!
//! [GTOPO]
//! dir = /data/gtopo
//! filename = sdat_10003_1_20180525_151136146.nc
//! ```
//!
//! Keys are case-insensitive, section names are not. `[DEFAULT]` values are visible
//! from every section and `%(key)s` references are expanded on lookup.

use crate::errors::{Result, RegridError};
use crate::paths::DEFAULT_OUTPUT_STEM;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SECTION: &str = "DEFAULT";
const MAX_INTERPOLATION_DEPTH: usize = 10;

/// Parsed INI document
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    defaults: HashMap<String, String>,
    sections: HashMap<String, HashMap<String, String>>,
}

impl ConfigFile {
    /// Read and parse a configuration file from disk
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse configuration text
    pub fn parse(text: &str) -> Result<Self> {
        let mut config = ConfigFile::default();
        let mut current: Option<String> = None;
        let mut last_key: Option<String> = None;
        // Blank lines seen since the last value line; kept only if the value continues
        let mut pending_blank = 0;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim_end();
            let trimmed = line.trim_start();

            if trimmed.is_empty() {
                if last_key.is_some() {
                    pending_blank += 1;
                }
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            // Indented lines continue the previous value
            if line.len() != trimmed.len() {
                if let (Some(section), Some(key)) = (&current, &last_key) {
                    let value = config
                        .section_mut(section)
                        .get_mut(key)
                        .ok_or_else(|| RegridError::ConfigParse {
                            line: line_no,
                            message: "continuation line without a key".to_string(),
                        })?;
                    for _ in 0..pending_blank {
                        value.push('\n');
                    }
                    value.push('\n');
                    value.push_str(trimmed);
                    pending_blank = 0;
                    continue;
                }
            }
            pending_blank = 0;

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| RegridError::ConfigParse {
                    line: line_no,
                    message: format!("unterminated section header '{}'", trimmed),
                })?;
                if name != DEFAULT_SECTION && config.sections.contains_key(name) {
                    return Err(RegridError::ConfigParse {
                        line: line_no,
                        message: format!("section '{}' already exists", name),
                    });
                }
                if name != DEFAULT_SECTION {
                    config.sections.insert(name.to_string(), HashMap::new());
                }
                current = Some(name.to_string());
                last_key = None;
                continue;
            }

            let section = current.as_ref().ok_or_else(|| RegridError::ConfigParse {
                line: line_no,
                message: "key/value pair before the first section header".to_string(),
            })?;

            let split = trimmed
                .find(|c| c == '=' || c == ':')
                .ok_or_else(|| RegridError::ConfigParse {
                    line: line_no,
                    message: format!("expected 'key = value', found '{}'", trimmed),
                })?;
            let key = trimmed[..split].trim().to_lowercase();
            let value = trimmed[split + 1..].trim().to_string();

            if key.is_empty() {
                return Err(RegridError::ConfigParse {
                    line: line_no,
                    message: "empty key".to_string(),
                });
            }

            let entries = config.section_mut(section);
            if entries.contains_key(&key) {
                return Err(RegridError::ConfigParse {
                    line: line_no,
                    message: format!("option '{}' in section '{}' already exists", key, section),
                });
            }
            entries.insert(key.clone(), value);
            last_key = Some(key);
        }

        Ok(config)
    }

    fn section_mut(&mut self, section: &str) -> &mut HashMap<String, String> {
        if section == DEFAULT_SECTION {
            &mut self.defaults
        } else {
            self.sections.entry(section.to_string()).or_default()
        }
    }

    /// Look up a key, failing when the section or key is absent
    pub fn get(&self, section: &str, key: &str) -> Result<String> {
        self.get_opt(section, key)?.ok_or_else(|| RegridError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    /// Look up a key that may legitimately be absent; the section must still exist
    pub fn get_opt(&self, section: &str, key: &str) -> Result<Option<String>> {
        let entries = self
            .sections
            .get(section)
            .ok_or_else(|| RegridError::MissingSection {
                section: section.to_string(),
            })?;

        match self.raw(entries, &key.to_lowercase()) {
            Some(raw) => self.interpolate(entries, section, raw, 1).map(Some),
            None => Ok(None),
        }
    }

    fn raw<'a>(&'a self, entries: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
        entries
            .get(key)
            .or_else(|| self.defaults.get(key))
            .map(String::as_str)
    }

    fn interpolate(
        &self,
        entries: &HashMap<String, String>,
        section: &str,
        value: &str,
        depth: usize,
    ) -> Result<String> {
        if depth > MAX_INTERPOLATION_DEPTH {
            return Err(RegridError::Generic(format!(
                "interpolation in section '{}' nested too deeply: '{}'",
                section, value
            )));
        }

        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];

            if let Some(after) = rest.strip_prefix('%') {
                out.push('%');
                rest = after;
            } else if let Some(after) = rest.strip_prefix('(') {
                let close = after.find(")s").ok_or_else(|| {
                    RegridError::Generic(format!("bad interpolation syntax in '{}'", value))
                })?;
                let name = after[..close].to_lowercase();
                let referenced = self.raw(entries, &name).ok_or_else(|| RegridError::MissingKey {
                    section: section.to_string(),
                    key: name.clone(),
                })?;
                out.push_str(&self.interpolate(entries, section, referenced, depth + 1)?);
                rest = &after[close + 2..];
            } else {
                return Err(RegridError::Generic(format!(
                    "'%' must be followed by '%' or '(' in '{}'",
                    value
                )));
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Values the regridding pipeline reads from the configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct RegridConfig {
    pub domain_file_dir: PathBuf,
    pub domain_file: String,
    pub grid: String,
    pub res: String,
    pub output_dir: PathBuf,
    pub gtopo_dir: PathBuf,
    pub gtopo_filename: String,
    /// Stem used for the clipped, filled and regridded file names
    pub output_stem: String,
}

impl RegridConfig {
    pub const PARAMETER_SECTION: &'static str = "Parameter Specs";
    pub const GTOPO_SECTION: &'static str = "GTOPO";

    /// Load configuration from a file on disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = ConfigFile::read(path)?;
        Self::from_ini(&file)
    }

    /// Extract the pipeline settings from a parsed document
    pub fn from_ini(file: &ConfigFile) -> Result<Self> {
        let params = Self::PARAMETER_SECTION;
        let gtopo = Self::GTOPO_SECTION;

        Ok(Self {
            domain_file_dir: PathBuf::from(file.get(params, "domain_file_dir")?),
            domain_file: file.get(params, "domain_file")?,
            grid: file.get(params, "grid")?,
            res: file.get(params, "res")?,
            output_dir: PathBuf::from(file.get(params, "output_dir")?),
            gtopo_dir: PathBuf::from(file.get(gtopo, "dir")?),
            gtopo_filename: file.get(gtopo, "filename")?,
            output_stem: file
                .get_opt(gtopo, "output_stem")?
                .unwrap_or_else(|| DEFAULT_OUTPUT_STEM.to_string()),
        })
    }

    /// Full path of the target grid definition
    pub fn domain_path(&self) -> PathBuf {
        self.domain_file_dir.join(&self.domain_file)
    }

    /// Full path of the GTOPO source raster
    pub fn source_path(&self) -> PathBuf {
        self.gtopo_dir.join(&self.gtopo_filename)
    }
}
