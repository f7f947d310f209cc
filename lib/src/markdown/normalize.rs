use crate::error::Result;
use crate::markdown::Plugin;

/// Collapses doubled newlines in rendered HTML and trims trailing whitespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct Normalize;

impl Plugin for Normalize {
    fn postprocess(&self, html: String) -> Result<String> {
        let mut html = html.replace("\n\n", "\n");
        html.truncate(html.trim_end().len());
        Ok(html)
    }
}
