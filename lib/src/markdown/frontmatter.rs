use std::sync::Arc;

use crate::error::{Chainable, Result};
use crate::value::{Dict, Format, Toml, Value, Yaml};

/// The metadata block at the top of a content file.
///
/// A block is fenced by `---` lines (YAML) or `+++` lines (TOML). The opening
/// fence must be the very first line of the file.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter<'a> {
    pub metadata: Arc<Dict>,
    pub body: &'a str,
}

impl<'a> FrontMatter<'a> {
    /// Splits `input` into metadata and body.
    ///
    /// Returns `Ok(None)` if `input` has no front matter block. A block that is
    /// not valid YAML/TOML, or that isn't a mapping, is an error. An empty
    /// block yields empty metadata.
    pub fn parse(input: &'a str) -> Result<Option<Self>> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let (block, body, format) = match split_fenced(input, "---") {
            Some((block, body)) => (block, body, "YAML"),
            None => match split_fenced(input, "+++") {
                Some((block, body)) => (block, body, "TOML"),
                None => return Ok(None),
            }
        };

        let value: Value = match format {
            _ if block.trim().is_empty() => Value::Null,
            "YAML" => Yaml::from_str(block).chain(error!("invalid YAML front matter"))?,
            _ => Toml::from_str(block).chain(error!("invalid TOML front matter"))?,
        };

        let metadata = match value {
            Value::Null => Arc::new(Dict::new()),
            Value::Dict(dict) => dict,
            other => return err! {
                "front matter must be a mapping",
                "format" => format,
                "found" => other.kind(),
            },
        };

        Ok(Some(FrontMatter { metadata, body }))
    }
}

fn split_fenced<'a>(input: &'a str, fence: &str) -> Option<(&'a str, &'a str)> {
    let rest = input.strip_prefix(fence)?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == fence {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }

        offset += line.len();
    }

    None
}
