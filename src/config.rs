use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::EtlError;

/// Settings for one run of the job, see `config.yaml` at the root of the repo.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub batch_settings: BatchSettings,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiConfig {
    /// For example `https://api.eia.gov/v2/electricity/retail-sales/data/`
    pub base_url: String,
    /// One of `monthly`, `quarterly`, `annual`
    pub frequency: String,
    pub facets: Facets,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Facets {
    /// State ids, e.g. `NY`.  One request is made for each of them.
    pub state: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchSettings {
    /// Max number of rows the API returns in one response
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseConfig {
    pub db_name: String,
    pub table_name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, EtlError> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Location of the DuckDB file, `<data_dir>/<db_name>`.
    pub fn duckdb_path(&self) -> PathBuf {
        Path::new(&self.database.data_dir).join(&self.database.db_name)
    }
}

impl FromStr for Config {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_yaml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    const CONFIG: &str = r#"
api:
  base_url: "https://api.eia.gov/v2/electricity/retail-sales/data/"
  frequency: "monthly"
  facets:
    state: ["NY", "CA"]
batch_settings:
  length: 5000
database:
  db_name: "electricity_data.duckdb"
  table_name: "electricity_prices"
"#;

    #[test]
    fn parse_config() -> Result<(), Box<dyn Error>> {
        let config = CONFIG.parse::<Config>()?;
        assert_eq!(config.api.frequency, "monthly");
        assert_eq!(config.api.facets.state, vec!["NY", "CA"]);
        assert_eq!(config.batch_settings.length, 5000);
        assert_eq!(config.database.table_name, "electricity_prices");
        assert_eq!(
            config.duckdb_path(),
            Path::new("data").join("electricity_data.duckdb")
        );
        Ok(())
    }

    #[test]
    fn missing_field_is_an_error() {
        let res = "api:\n  base_url: x\n".parse::<Config>();
        assert!(matches!(res, Err(EtlError::Yaml(_))));
    }

    #[test]
    fn load_repo_config() -> Result<(), Box<dyn Error>> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.yaml");
        let config = Config::load(&path)?;
        assert!(!config.api.facets.state.is_empty());
        assert!(matches!(
            Config::load(Path::new("does/not/exist.yaml")),
            Err(EtlError::Io(_))
        ));
        Ok(())
    }
}
