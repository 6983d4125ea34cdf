//! Loading quantization specs from YAML

use super::schema::QuantSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parse and validate a spec from YAML text
pub fn parse_config(yaml: &str) -> Result<QuantSpec> {
    let spec: QuantSpec = serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {}", e)))?;

    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {}", e)))?;

    Ok(spec)
}

/// Load a spec from a YAML file
///
/// # Example
///
/// ```no_run
/// use cuantizar::config::load_config;
///
/// let spec = load_config("quant.yaml")?;
/// println!("{}-bit", spec.quantize.bit_length);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<QuantSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    let spec = parse_config(&yaml_content)?;
    debug!(
        path = %config_path.as_ref().display(),
        bit_length = spec.quantize.bit_length,
        quant_axis = spec.quantize.quant_axis,
        "loaded quantization config"
    );
    Ok(spec)
}

/// Serialize a spec to YAML
pub fn to_yaml(spec: &QuantSpec) -> Result<String> {
    serde_yaml::to_string(spec).map_err(|e| Error::Serialization(e.to_string()))
}
