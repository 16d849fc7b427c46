//! Documented configuration files
//!
//! Config structs describe their fields once through the `documented_config!`
//! macro. The resulting [`DocumentedConfig`] implementation writes a TOML file
//! where every key carries its description as a trailing comment, so a fresh
//! `config.toml` doubles as reference documentation.
//!
//! ```ignore
//! documented_config!(SplitterConfig {
//!     fields: [
//!         api_base_url, "Base URL of the AudiMeta catalog",
//!         region, "Region passed to catalog searches",
//!     ],
//!     config_path: paths::app_config_dir().map(|dir| dir.join("config.toml")),
//! });
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata about a configuration field
#[derive(Debug, Clone)]
pub struct ConfigFieldMeta {
    pub name: &'static str,
    /// TOML-serialized default value, or None if serialization failed
    pub default_value: Option<String>,
    pub description: &'static str,
}

/// Trait for configs with documented defaults
///
/// Implemented by the `documented_config!` macro.
pub trait DocumentedConfig: Sized + Default + Serialize + DeserializeOwned {
    fn field_metadata() -> Vec<ConfigFieldMeta>;

    /// TOML-serialized value of a field on this instance
    fn get_field_value(&self, field_name: &str) -> String;

    /// Default location of the config file
    fn config_path() -> Result<PathBuf>;

    /// A file without any comment lines was not written by us and has not been
    /// annotated by the user, so it is safe to regenerate with documentation.
    fn is_minimal_config(contents: &str) -> bool {
        !contents.lines().any(|l| l.contains('#'))
    }

    fn render_documented(&self) -> String {
        let mut output = String::new();
        for field in Self::field_metadata() {
            let value = self.get_field_value(field.name);
            output.push_str(&format!("{} = {}  # {}", field.name, value, field.description));
            if let Some(default) = field.default_value.as_deref() {
                if default != value {
                    output.push_str(&format!(" (default: {})", default));
                }
            }
            output.push('\n');
        }
        output
    }

    fn save_with_documentation(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        fs::write(path, self.render_documented())
            .with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    fn load_from_str_documented(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("parsing config")
    }

    /// Load a config file, creating a documented default when it is missing.
    fn load_from_path_documented(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_with_documentation(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config = Self::load_from_str_documented(&contents)
            .with_context(|| format!("in {}", path.display()))?;

        if Self::is_minimal_config(&contents) {
            // Best effort: a read-only config is still usable
            let _ = config.save_with_documentation(path);
        }

        Ok(config)
    }

    fn load() -> Result<Self> {
        Self::load_from_path_documented(&Self::config_path()?)
    }
}

/// Generate the [`DocumentedConfig`] implementation for a config struct.
#[macro_export]
macro_rules! documented_config {
    (
        $config_name:ident {
            fields: [
                $($field:ident, $desc:expr),* $(,)?
            ],
            config_path: $path:expr $(,)?
        }
    ) => {
        impl $crate::common::config::DocumentedConfig for $config_name {
            fn field_metadata() -> Vec<$crate::common::config::ConfigFieldMeta> {
                let default_config = Self::default();
                vec![
                    $(
                        $crate::common::config::ConfigFieldMeta {
                            name: stringify!($field),
                            default_value: toml::Value::try_from(&default_config.$field)
                                .map(|v| v.to_string())
                                .ok(),
                            description: $desc,
                        },
                    )*
                ]
            }

            fn get_field_value(&self, field_name: &str) -> String {
                match field_name {
                    $(
                        stringify!($field) => {
                            toml::Value::try_from(&self.$field)
                                .map(|v| v.to_string())
                                .unwrap_or_else(|_| format!("{:?}", self.$field))
                        }
                    )*
                    _ => String::new(),
                }
            }

            fn config_path() -> anyhow::Result<std::path::PathBuf> {
                $path
            }
        }
    };
}
