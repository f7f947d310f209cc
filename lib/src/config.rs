use std::path::Path;

use crate::error::{Chainable, Result};
use crate::value::{Format, Toml, Value};

pub const CONFIG_FILE: &str = "config.toml";

/// The project's `config.toml`, or nothing if the project has none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    value: Value,
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file");
            return Ok(Config::default());
        }

        let value: Value = Toml::read(&path).chain_with(|| error! {
            "failed to load configuration",
            "path" => path.display(),
        })?;

        Config::from_value(value)
    }

    pub fn parse(toml: &str) -> Result<Self> {
        let value = Toml::from_str(toml).chain(error!("invalid configuration"))?;
        Config::from_value(value)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Dict(_) | Value::Null => Ok(Config { value }),
            other => err! {
                "configuration must be a table",
                "found" => other.kind(),
            },
        }
    }

    /// Looks up a dotted key such as `build.output`. Absent keys are `Null`.
    pub fn get(&self, key: &str) -> Value {
        self.value.lookup(key).cloned().unwrap_or_default()
    }
}

/// Build settings read from the `[build]` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mode: Option<String>,
    pub output: String,
    pub minify: bool,
    pub parallel: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            mode: None,
            output: "_website".into(),
            minify: true,
            parallel: true,
        }
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let defaults = Settings::default();
        let string = |key: &str| -> Result<Option<String>> {
            match config.get(key) {
                Value::Null => Ok(None),
                Value::String(s) => Ok(Some(s.to_string())),
                other => err!("expected a string", "key" => key, "found" => other.kind()),
            }
        };

        let boolean = |key: &str, default: bool| -> Result<bool> {
            match config.get(key) {
                Value::Null => Ok(default),
                Value::Bool(b) => Ok(b),
                other => err!("expected a boolean", "key" => key, "found" => other.kind()),
            }
        };

        let output = string("build.output")?.unwrap_or(defaults.output);
        if output.is_empty() || output.contains(['/', '\\']) || output.starts_with('.') {
            return err! {
                "output must be a plain directory name",
                "key" => "build.output",
                "value" => output,
            };
        }

        Ok(Settings {
            mode: string("build.mode")?,
            output,
            minify: boolean("build.minify", defaults.minify)?,
            parallel: boolean("build.parallel", defaults.parallel)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let config = Config::load(root.path()).unwrap();
        assert_eq!(config.get("site.title"), Value::Null);
        assert_eq!(Settings::from_config(&config).unwrap(), Settings::default());
    }

    #[test]
    fn dotted_lookup() {
        let config = Config::parse("[site]\ntitle = \"Plover\"\n[site.author]\nname = \"A\"\n").unwrap();
        assert_eq!(config.get("site.title"), Value::from("Plover"));
        assert_eq!(config.get("site.author.name"), Value::from("A"));
        assert_eq!(config.get("site.author.email"), Value::Null);
        assert_eq!(config.get("site.title.nope"), Value::Null);
    }

    #[test]
    fn build_settings() {
        let config = Config::parse(r#"
            [build]
            mode = "development"
            output = "public"
            minify = false
        "#).unwrap();

        let settings = Settings::from_config(&config).unwrap();
        assert_eq!(settings, Settings {
            mode: Some("development".into()),
            output: "public".into(),
            minify: false,
            parallel: true,
        });
    }

    #[test]
    fn invalid_settings() {
        let config = Config::parse("[build]\nminify = \"yes\"\n").unwrap();
        assert!(Settings::from_config(&config).is_err());

        let config = Config::parse("[build]\noutput = \"../site\"\n").unwrap();
        assert!(Settings::from_config(&config).is_err());

        assert!(Config::parse("[build\n").is_err());
    }
}
