use std::borrow::Cow;
use std::fmt;

use pulldown_cmark::{html, Options, Parser};

use crate::markdown::Plugin;
use crate::error::{Chainable, Result};
use crate::value::Source;

/// Markdown to HTML conversion with a chain of text plugins.
///
/// Plugins preprocess the source in insertion order, and postprocess the HTML
/// in the same order.
pub struct Markdown<I> {
    input: I,
    options: Options,
    plugins: Vec<Box<dyn Plugin>>,
}

impl<I: Source> Markdown<I> {
    pub fn from(input: I) -> Self {
        Self {
            input,
            options: Self::default_options(),
            plugins: vec![],
        }
    }

    /// Tables, footnotes, strikethrough, task lists and heading attributes.
    ///
    /// Lists may start directly below a paragraph line without a blank line
    /// in between; CommonMark allows this for bullet lists and for ordered
    /// lists starting at 1.
    pub fn default_options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES
    }

    pub fn plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn run(self) -> Result<String> {
        let source = self.input.read()?;
        let mut input = Cow::Borrowed(&*source);
        for plugin in &self.plugins {
            let processed = match plugin.preprocess(&input).chain(error!("markdown preprocessing failed"))? {
                Cow::Owned(s) => Some(s),
                Cow::Borrowed(s) if s.len() != input.len() => Some(s.to_string()),
                Cow::Borrowed(_) => None,
            };

            if let Some(processed) = processed {
                input = Cow::Owned(processed);
            }
        }

        let mut output = String::with_capacity(input.len() * 3 / 2);
        html::push_html(&mut output, Parser::new_ext(&input, self.options));

        self.plugins.iter().try_fold(output, |html, plugin| {
            plugin.postprocess(html).chain(error!("markdown postprocessing failed"))
        })
    }
}

impl<I: fmt::Debug> fmt::Debug for Markdown<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Markdown")
            .field("input", &self.input)
            .field("options", &self.options)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}
