//! Environment-driven server settings

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use gauge_units::{UnitsFileFormat, DEFAULT_WIDTH};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory scanned for unit files (`GAUGE_DATA_PATH`)
    pub data_path: PathBuf,
    /// Width used by `output_format` when the caller gives none (`GAUGE_FORMAT_WIDTH`)
    pub format_width: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let data_path = env::var("GAUGE_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/app/gauge"));

        let format_width = match env::var("GAUGE_FORMAT_WIDTH") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "GAUGE_FORMAT_WIDTH is not a number, using {}", DEFAULT_WIDTH);
                DEFAULT_WIDTH
            }),
            Err(_) => DEFAULT_WIDTH,
        };

        Config { data_path, format_width }
    }

    /// Unit files in the data directory, sorted by name
    pub fn unit_files(&self) -> Vec<UnitFileInfo> {
        let mut files = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.data_path) {
            for entry in entries.flatten() {
                let path = entry.path();
                let Some(format) = format_for(&path) else {
                    continue;
                };
                if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                    files.push(UnitFileInfo {
                        name: name.to_string(),
                        size: fs::metadata(&path).ok().map(|m| m.len()),
                        format,
                    });
                }
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        files
    }

    /// Read a unit file by name; names must not leave the data directory
    /// and must carry a unit file extension
    pub fn read_unit_file(&self, name: &str) -> Result<String, String> {
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(format!("Invalid file name '{}'", name));
        }
        if format_for(Path::new(name)).is_none() {
            return Err(format!("Invalid file name '{}': not a unit file", name));
        }
        let path = self.data_path.join(name);
        fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitFileInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Format implied by the extension; `None` means detect from content
    pub format: Option<UnitsFileFormat>,
}

/// `Some(None)` for auto-detected extensions, `None` for files to ignore
fn format_for(path: &Path) -> Option<Option<UnitsFileFormat>> {
    match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
        "nws" => Some(Some(UnitsFileFormat::Nws)),
        "rti" => Some(Some(UnitsFileFormat::Rti)),
        "units" | "dat" => Some(None),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_for() {
        assert_eq!(format_for(Path::new("a/units.nws")), Some(Some(UnitsFileFormat::Nws)));
        assert_eq!(format_for(Path::new("units.RTI")), Some(Some(UnitsFileFormat::Rti)));
        assert_eq!(format_for(Path::new("units.dat")), Some(None));
        assert_eq!(format_for(Path::new("README.md")), None);
        assert_eq!(format_for(Path::new("noext")), None);
    }

    #[test]
    fn test_read_rejects_traversal() {
        let config = Config { data_path: PathBuf::from("/nonexistent"), format_width: 10 };
        assert!(config.read_unit_file("../etc/passwd").unwrap_err().starts_with("Invalid"));
        assert!(config.read_unit_file("units.nws").unwrap_err().starts_with("Failed"));
    }

    #[test]
    fn test_read_rejects_non_unit_files() {
        let dir = std::env::temp_dir().join(format!("gauge-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("secrets.txt"), "token").unwrap();
        fs::write(dir.join("units.rti"), "L|BASE|MM|SI|MILLIMETER|2|1.|0.|\n").unwrap();
        let config = Config { data_path: dir.clone(), format_width: 10 };

        let err = config.read_unit_file("secrets.txt").unwrap_err();
        assert!(err.contains("not a unit file"));
        assert!(config.read_unit_file("units.rti").unwrap().starts_with("L|BASE|MM"));
        let listed: Vec<String> = config.unit_files().into_iter().map(|f| f.name).collect();
        assert_eq!(listed, vec!["units.rti"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unit_files_missing_dir() {
        let config = Config { data_path: PathBuf::from("/nonexistent/gauge"), format_width: 10 };
        assert!(config.unit_files().is_empty());
    }
}
