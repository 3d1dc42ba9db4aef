use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::Deserialize;

use crate::data::customers::{self, CustomerLoadOptions};
use crate::data::fees::{self, FeeLoadOptions};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "eventit.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CustomerSourceConfig {
    pub path: PathBuf,
    pub header_row: usize,
    pub delimiter: char,
}

impl Default for CustomerSourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("kunder.xlsx"),
            header_row: customers::HEADER_ROW,
            delimiter: ';',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeeSourceConfig {
    pub path: PathBuf,
    pub header_row: usize,
    pub delimiter: char,
    pub top_organizers: usize,
}

impl Default for FeeSourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("gebyr.csv"),
            header_row: fees::HEADER_ROW,
            delimiter: fees::DELIMITER as char,
            top_organizers: fees::TOP_ORGANIZERS,
        }
    }
}

/// Sizes used when building views.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Bars in the top-revenue chart.
    pub top_customers: usize,
    /// Bars in the top invoiced-revenue chart.
    pub top_invoiced: usize,
    /// Organizers preselected in the comparison chart.
    pub default_organizers: usize,
    /// Names shown per distribution slice before `…`.
    pub member_preview: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            top_customers: 25,
            top_invoiced: 10,
            default_organizers: 5,
            member_preview: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub customers: CustomerSourceConfig,
    pub fees: FeeSourceConfig,
    pub view: ViewSettings,
}

impl AppConfig {
    /// Load from `explicit` if given, else from [`DEFAULT_CONFIG_FILE`] when
    /// it exists, else fall back to built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE)),
            None => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let cfg: AppConfig =
            toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn customer_options(&self) -> Result<CustomerLoadOptions> {
        Ok(CustomerLoadOptions {
            header_row: self.customers.header_row,
            delimiter: ascii_delimiter(self.customers.delimiter)?,
        })
    }

    pub fn fee_options(&self) -> Result<FeeLoadOptions> {
        Ok(FeeLoadOptions {
            header_row: self.fees.header_row,
            delimiter: ascii_delimiter(self.fees.delimiter)?,
            top_organizers: self.fees.top_organizers,
        })
    }
}

fn ascii_delimiter(c: char) -> Result<u8> {
    if !c.is_ascii() {
        bail!("delimiter {c:?} is not a single-byte character");
    }
    Ok(c as u8)
}
