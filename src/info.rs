//! # Dataset Inspection Module
//!
//! Extracts and displays the structure of a NetCDF dataset: dimensions,
//! variables, attributes. Useful for checking what a catalog record
//! actually points at before running a full request.

use crate::storage::{StorageBackend, StorageFactory};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Information about a NetCDF dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

/// Information about a NetCDF variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub dimensions: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub shape: Vec<usize>,
}

/// Structure of a NetCDF dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub path: String,
    pub dimensions: Vec<DimensionInfo>,
    pub variables: Vec<VariableInfo>,
    pub global_attributes: BTreeMap<String, String>,
    pub total_variables: usize,
    pub total_dimensions: usize,
}

/// Reads the structure of a NetCDF dataset, local or remote.
///
/// Remote paths (s3:// or https://) are staged to a temporary file first,
/// since the NetCDF library wants a local file to open. When `variable` is
/// given only that variable is described. Attribute maps are sorted, so
/// JSON output is stable across runs.
pub async fn dataset_info(
    file_path: &str,
    variable: Option<&str>,
    detailed: bool,
) -> Result<DatasetInfo> {
    let (temp_file, local_path) = stage_if_remote(file_path).await?;

    debug!("Opening NetCDF file: {}", local_path);
    let file = netcdf::open(&local_path)
        .with_context(|| format!("Failed to open NetCDF file: {}", file_path))?;

    let dimensions: Vec<DimensionInfo> = file
        .dimensions()
        .map(|dim| DimensionInfo {
            name: dim.name().to_string(),
            length: dim.len(),
            is_unlimited: dim.is_unlimited(),
        })
        .collect();

    let variables: Vec<VariableInfo> = file
        .variables()
        .filter(|var| variable.map_or(true, |name| var.name() == name))
        .map(|var| variable_info(&var))
        .collect();

    let global_attributes = if detailed {
        attribute_map(file.attributes())
    } else {
        BTreeMap::new()
    };

    file.close().context("Failed to close NetCDF file")?;

    // Keep the temp file alive until after the netcdf handle is closed
    drop(temp_file);

    Ok(DatasetInfo {
        path: file_path.to_string(),
        total_dimensions: dimensions.len(),
        total_variables: variables.len(),
        dimensions,
        variables,
        global_attributes,
    })
}

/// Stages a remote dataset into a temporary local file; local paths pass
/// through untouched.
async fn stage_if_remote(
    file_path: &str,
) -> Result<(Option<tempfile::NamedTempFile>, String)> {
    if !StorageFactory::is_remote_path(file_path) {
        return Ok((None, file_path.to_string()));
    }

    let storage = StorageFactory::from_path(file_path).await?;
    let data = storage
        .read(file_path)
        .await
        .context("Failed to fetch remote dataset for inspection")?;

    let temp_file = tempfile::NamedTempFile::new().context("Failed to create temporary file")?;
    let temp_path = temp_file.path().to_path_buf();

    debug!("Staging remote dataset to {:?}", temp_path);
    tokio::fs::write(&temp_path, data)
        .await
        .context("Failed to write temporary file")?;

    Ok((Some(temp_file), temp_path.to_string_lossy().to_string()))
}

fn variable_info(var: &netcdf::Variable) -> VariableInfo {
    VariableInfo {
        name: var.name().to_string(),
        dimensions: var
            .dimensions()
            .iter()
            .map(|d| d.name().to_string())
            .collect(),
        attributes: attribute_map(var.attributes()),
        shape: var.dimensions().iter().map(|d| d.len()).collect(),
    }
}

fn attribute_map<'a>(attrs: impl Iterator<Item = netcdf::Attribute<'a>>) -> BTreeMap<String, String> {
    attrs
        .filter_map(|attr| {
            let value = attr.value().ok()?;
            Some((attr.name().to_string(), render_attribute(&value)))
        })
        .collect()
}

fn render_attribute(value: &netcdf::AttributeValue) -> String {
    match value {
        netcdf::AttributeValue::Str(s) => s.clone(),
        other => format!("{:?}", other),
    }
}

/// Print dataset info in human-readable format
pub fn print_dataset_info_human(info: &DatasetInfo) {
    println!("Dataset: {}", info.path);

    println!("Dimensions ({}):", info.total_dimensions);
    for dim in &info.dimensions {
        let unlimited = if dim.is_unlimited { " [unlimited]" } else { "" };
        println!("  {}: {}{}", dim.name, dim.length, unlimited);
    }

    println!("Variables ({}):", info.total_variables);
    for var in &info.variables {
        println!("  {} ({})", var.name, var.dimensions.join(" x "));
        for (name, value) in &var.attributes {
            println!("    {} = {}", name, value);
        }
    }

    if !info.global_attributes.is_empty() {
        println!("Global attributes:");
        for (name, value) in &info.global_attributes {
            println!("  {} = {}", name, value);
        }
    }
}

/// Print dataset info as pretty JSON
pub fn print_dataset_info_json(info: &DatasetInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}
