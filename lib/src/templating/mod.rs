pub mod minijinja;

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::assets::Images;
use crate::error::{Chainable, Result};
use crate::fstree::FsTree;
use crate::pipeline::BuildContext;
use crate::staging::StagingArea;
use crate::value::Dict;

/// Everything a template sees when rendering one page.
#[derive(Debug, Serialize)]
pub struct PageContext<'a> {
    pub content: &'a str,
    pub page: &'a Dict,
    pub images: &'a Images,
}

/// The outcome of rendering by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Ok(String),
    TemplateNotFound(Arc<str>),
}

pub trait EngineInit {
    type Engine: Engine + 'static;

    /// Builds an engine that loads templates from `root`. `None` means there
    /// are no templates at all.
    fn init<G: Serialize>(root: Option<&Path>, globals: G) -> Result<Self::Engine>;
}

pub trait Engine: Send + Sync + Debug {
    /// Renders the template called `name`. A missing template is reported as
    /// [`Rendered::TemplateNotFound`]; only genuine engine failures are `Err`.
    fn render(&self, name: &str, context: &PageContext<'_>) -> Result<Rendered>;
}

/// Templates staged for one build.
#[derive(Debug)]
pub struct TemplateRegistry {
    engine: Box<dyn Engine>,
    count: usize,
}

impl TemplateRegistry {
    /// Copies the project's templates into the staging area and builds an
    /// engine rooted at the staged copy.
    pub fn load<E: EngineInit>(ctx: &BuildContext, staging: &StagingArea) -> Result<Self> {
        let source = ctx.source(ctx.layout.templates);
        let Some(tree) = FsTree::scan(&source)? else {
            tracing::warn!(path = %source.display(), "no templates directory; every page will be skipped");
            let engine = E::init(None, ctx.config.get("site"))?;
            return Ok(TemplateRegistry { engine: Box::new(engine), count: 0 });
        };

        let staged = staging.create_dir_all(ctx.layout.templates)?;
        let count = crate::time!("template staging" => tree.copy_to(&staged))
            .chain(error!("failed to stage templates"))?;

        tracing::info!(count, "loaded templates");
        let engine = E::init(Some(&staged), ctx.config.get("site"))?;
        Ok(TemplateRegistry { engine: Box::new(engine), count })
    }

    pub fn with_engine<E: Engine + 'static>(engine: E) -> Self {
        TemplateRegistry { engine: Box::new(engine), count: 0 }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Renders `template` (the front matter `template` value) for one page.
    /// `.html` is appended to the name unless it is already there.
    pub fn render(
        &self,
        template: &str,
        content: &str,
        page: &Dict,
        images: &Images,
    ) -> Result<Rendered> {
        let name = match template.ends_with(".html") {
            true => template.to_string(),
            false => format!("{template}.html"),
        };

        self.engine.render(&name, &PageContext { content, page, images })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Echo;

    impl Engine for Echo {
        fn render(&self, name: &str, context: &PageContext<'_>) -> Result<Rendered> {
            match name {
                "page.html" => Ok(Rendered::Ok(context.content.to_string())),
                _ => Ok(Rendered::TemplateNotFound(name.into())),
            }
        }
    }

    #[test]
    fn names_gain_an_html_extension() {
        let registry = TemplateRegistry::with_engine(Echo);
        let (page, images) = (Dict::new(), Images::new());

        let rendered = registry.render("page", "<p>x</p>", &page, &images).unwrap();
        assert_eq!(rendered, Rendered::Ok("<p>x</p>".into()));

        let rendered = registry.render("page.html", "<p>x</p>", &page, &images).unwrap();
        assert_eq!(rendered, Rendered::Ok("<p>x</p>".into()));

        let rendered = registry.render("post", "", &page, &images).unwrap();
        assert_eq!(rendered, Rendered::TemplateNotFound("post.html".into()));
    }

    static_assertions::assert_impl_all!(TemplateRegistry: Send, Sync);
}
