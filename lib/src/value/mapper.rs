use crate::error::{ErrorDetail, Result};
use crate::value::{Value, Source};

/// Maps a [`Source`] to some output value.
pub trait Mapper {
    type Output: Into<Value> + 'static;

    fn map<I: Source>(&self, input: I) -> Result<Self::Output>;
}

/// A serde data format that documents are deserialized from.
pub trait Format: Sized {
    /// The data format's error type.
    type Error: serde::de::Error + ErrorDetail + 'static;

    /// Parses `string` as the data format `Self` as a `T`. Use [`Format::read`]
    /// to parse from any [`Source`].
    fn from_str<T: serde::de::DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    fn read<I: Source, T: serde::de::DeserializeOwned>(input: I) -> Result<T> {
        let input = input.read()?;
        Ok(Self::from_str(&input)?)
    }
}

impl<F: Format> Mapper for F {
    type Output = Value;

    fn map<I: Source>(&self, input: I) -> Result<Self::Output> {
        Self::read(input)
    }
}

macro_rules! impl_format {
    ($name:ident : $func:expr, $E:ty) => (
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl Format for $name {
            type Error = $E;

            fn from_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }
        }
    );
}

impl_format!(Toml: toml_from_str, toml::de::Error);

/// Parses a TOML document with every datetime replaced by its RFC 3339 string.
fn toml_from_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, toml::de::Error> {
    fn plain(value: toml::Value) -> toml::Value {
        match value {
            toml::Value::Datetime(datetime) => toml::Value::String(datetime.to_string()),
            toml::Value::Array(items) => toml::Value::Array(items.into_iter().map(plain).collect()),
            toml::Value::Table(table) => {
                toml::Value::Table(table.into_iter().map(|(k, v)| (k, plain(v))).collect())
            }
            other => other,
        }
    }

    let table: toml::Table = toml::from_str(s)?;
    toml::Value::try_into(plain(toml::Value::Table(table)))
}
impl_format!(Yaml: serde_yaml::from_str, serde_yaml::Error);

/// Compiles Sass/SCSS into CSS.
#[cfg(feature = "sass")]
#[derive(Debug, Default)]
pub struct Grass {
    options: grass::Options<'static>,
}

#[cfg(feature = "sass")]
impl Mapper for Grass {
    type Output = String;

    fn map<I: Source>(&self, input: I) -> Result<Self::Output> {
        let result = match input.path() {
            Some(path) => grass::from_path(path, &self.options),
            None => {
                let string = input.read()?;
                grass::from_string(string.to_string(), &self.options)
            }
        };

        result.map_err(|e| error!("failed to compile sass to css", e))
    }
}
