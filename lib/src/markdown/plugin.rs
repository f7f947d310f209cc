use std::borrow::Cow;

use crate::error::Result;

/// A text pass around markdown conversion.
///
/// `preprocess` sees the markdown source before it is parsed; `postprocess`
/// sees the rendered HTML. Both default to the identity.
pub trait Plugin: Send + Sync {
    fn preprocess<'a>(&self, input: &'a str) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(input))
    }

    fn postprocess(&self, html: String) -> Result<String> {
        Ok(html)
    }
}
