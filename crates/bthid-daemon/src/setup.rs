//! Config file resolution and layering.
//!
//! The configuration is a base file plus every regular file in its sibling
//! `.d` directory (`/etc/bthid.toml` and `/etc/bthid.d/`), merged table by
//! table in file-name order so that later files override earlier keys.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::DaemonError;

/// Environment variable naming the base config file.
pub const CONFIG_ENV: &str = "BTHID_CONFIG";

/// Base config file used when neither a path nor [`CONFIG_ENV`] is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/bthid.toml";

/// Load configuration from the given path, `$BTHID_CONFIG`, or the default
/// location, in that order of preference.
pub fn load_config(path: Option<&Path>) -> Result<Config, DaemonError> {
    let base = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path(),
    };
    load_layered(&base)
}

/// The base config path when none is given explicitly.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// The files that make up the configuration rooted at `base`, in merge
/// order.
pub fn config_files(base: &Path) -> Result<Vec<PathBuf>, DaemonError> {
    let mut files = Vec::new();
    if base.is_file() {
        files.push(base.to_path_buf());
    }

    let dir = base.with_extension("d");
    if dir.is_dir() {
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            DaemonError::Config(format!("failed to read {}: {e}", dir.display()))
        })?;
        let mut layered = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                DaemonError::Config(format!("failed to read {}: {e}", dir.display()))
            })?;
            let path = entry.path();
            if path.is_file() {
                layered.push(path);
            }
        }
        layered.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        files.extend(layered);
    }

    Ok(files)
}

fn load_layered(base: &Path) -> Result<Config, DaemonError> {
    let files = config_files(base)?;
    if files.is_empty() {
        info!(path = %base.display(), "no config file found, using defaults");
        return Ok(Config::default());
    }

    let mut merged = toml::Table::new();
    for file in &files {
        let content = std::fs::read_to_string(file).map_err(|e| {
            DaemonError::Config(format!("failed to read {}: {e}", file.display()))
        })?;
        let table: toml::Table = content.parse().map_err(|e| {
            DaemonError::Config(format!("failed to parse {}: {e}", file.display()))
        })?;
        debug!(path = %file.display(), "merging config layer");
        merge_tables(&mut merged, table);
    }

    let config: Config = toml::Value::Table(merged)
        .try_into()
        .map_err(|e| DaemonError::Config(format!("invalid config: {e}")))?;
    info!(path = %base.display(), layers = files.len(), "loaded config");
    Ok(config)
}

/// Merge `overlay` into `base`. Nested tables merge recursively; any other
/// value replaces what was there.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                } else {
                    base.insert(key, toml::Value::Table(incoming));
                }
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bthid_types::DeviceClass;
    use uuid::Uuid;

    struct TempConfig {
        root: PathBuf,
    }

    impl TempConfig {
        fn new() -> Self {
            let root = std::env::temp_dir().join(format!("bthid-config-{}", Uuid::new_v4()));
            std::fs::create_dir_all(&root).unwrap();
            Self { root }
        }

        fn base(&self) -> PathBuf {
            self.root.join("bthid.toml")
        }

        fn write(&self, relative: &str, content: &str) {
            let path = self.root.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        }
    }

    impl Drop for TempConfig {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    #[test]
    fn missing_files_give_defaults() {
        let tmp = TempConfig::new();
        let config = load_config(Some(tmp.base().as_path())).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn base_file_only() {
        let tmp = TempConfig::new();
        tmp.write("bthid.toml", "[server]\nport = 7001\n");
        let config = load_config(Some(tmp.base().as_path())).unwrap();
        assert_eq!(config.server.port, 7001);
        assert_eq!(config.server.host, "localhost");
    }

    #[test]
    fn drop_in_files_override_in_name_order() {
        let tmp = TempConfig::new();
        tmp.write(
            "bthid.toml",
            "[server]\nhost = \"0.0.0.0\"\nport = 7001\n\n[bluetooth]\nadapter = \"hci0\"\n",
        );
        tmp.write("bthid.d/20-port.conf", "[server]\nport = 7003\n");
        tmp.write("bthid.d/10-port.conf", "[server]\nport = 7002\n");
        tmp.write("bthid.d/30-hid.conf", "[hid]\ndevices = [\"touch\"]\n");

        let files = config_files(&tmp.base()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["bthid.toml", "10-port.conf", "20-port.conf", "30-hid.conf"]
        );

        let config = load_config(Some(tmp.base().as_path())).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 7003);
        assert_eq!(config.bluetooth.adapter.as_deref(), Some("hci0"));
        assert_eq!(config.hid.devices, vec![DeviceClass::Touch]);
    }

    #[test]
    fn drop_in_directory_without_base_file() {
        let tmp = TempConfig::new();
        tmp.write("bthid.d/only.conf", "[bluetooth]\nprofile = \"/custom\"\n");
        let config = load_config(Some(tmp.base().as_path())).unwrap();
        assert_eq!(config.bluetooth.profile, "/custom");
    }

    #[test]
    fn parse_errors_name_the_file() {
        let tmp = TempConfig::new();
        tmp.write("bthid.toml", "[server\n");
        let err = load_config(Some(tmp.base().as_path())).unwrap_err();
        assert!(err.to_string().contains("bthid.toml"), "{err}");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let tmp = TempConfig::new();
        tmp.write("bthid.toml", "[hid]\ndevices = [\"joystick\"]\n");
        assert!(matches!(
            load_config(Some(tmp.base().as_path())),
            Err(DaemonError::Config(_))
        ));
    }

    #[test]
    fn merge_replaces_non_table_values() {
        let mut base: toml::Table = "a = 1\n[t]\nx = 1\ny = 2\n".parse().unwrap();
        let overlay: toml::Table = "a = [1, 2]\n[t]\ny = 3\n".parse().unwrap();
        merge_tables(&mut base, overlay);
        assert_eq!(
            base["a"],
            toml::Value::Array(vec![toml::Value::Integer(1), toml::Value::Integer(2)])
        );
        assert_eq!(base["t"]["x"].as_integer(), Some(1));
        assert_eq!(base["t"]["y"].as_integer(), Some(3));
    }
}
