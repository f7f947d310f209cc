use std::fs;
use std::path::{Path, PathBuf};
use std::fmt::Debug;

use crate::error::{Result, Chainable};
use crate::value::Value;

/// Something a value can be written to.
pub trait Sink: Debug {
    fn write<V: Into<Value> + 'static>(&self, value: V) -> Result<()> {
        self.write_value(value.into())
    }

    fn write_value(&self, value: Value) -> Result<()>;
}

impl Sink for &Path {
    /// Writes strings verbatim. Parent directories must already exist.
    fn write_value(&self, value: Value) -> Result<()> {
        let Value::String(string) = value else {
            return err! {
                "only strings can be written to files",
                "file path" => self.display(),
                "value type" => value.kind(),
            };
        };

        fs::write(self, string.as_bytes()).chain(error! {
            "failed to open/create file for writing",
            "file path" => self.display()
        })
    }
}

impl Sink for PathBuf {
    fn write_value(&self, value: Value) -> Result<()> {
        self.as_path().write_value(value)
    }
}

impl<T: Sink> Sink for &T {
    fn write_value(&self, value: Value) -> Result<()> {
        <T as Sink>::write_value(self, value)
    }
}
