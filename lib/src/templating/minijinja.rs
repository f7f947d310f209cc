use std::path::Path;

use minijinja::{context, path_loader, AutoEscape, Environment, ErrorKind};
use minijinja::value::Value;
use serde::Serialize;

use crate::error::{Chainable, Result};
use crate::templating::{Engine, EngineInit, PageContext, Rendered};

/// Jinja-style templates via `minijinja`.
///
/// Output is never auto-escaped: page content arrives as rendered HTML.
#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl EngineInit for MiniJinjaEngine {
    type Engine = Self;

    fn init<G: Serialize>(root: Option<&Path>, globals: G) -> Result<Self::Engine> {
        let mut env = Environment::new();
        if let Some(root) = root {
            env.set_loader(path_loader(root));
        }

        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_global("site", Value::from_serialize(&globals));
        env.add_function("now", ext::now);
        env.add_filter("deslug", ext::deslug);
        env.add_filter("date", ext::date);
        env.add_filter("split", ext::split);
        Ok(MiniJinjaEngine { env })
    }
}

impl MiniJinjaEngine {
    /// An engine over in-memory templates, for embedding and tests.
    pub fn from_templates<'a, I>(templates: I) -> Result<Self>
        where I: IntoIterator<Item = (&'a str, &'a str)>
    {
        let mut engine = Self::init(None, ())?;
        for (name, source) in templates {
            engine.env.add_template_owned(name.to_string(), source.to_string())
                .chain_with(|| error!("invalid template", "template" => name))?;
        }

        Ok(engine)
    }
}

impl Engine for MiniJinjaEngine {
    fn render(&self, name: &str, page: &PageContext<'_>) -> Result<Rendered> {
        let template = match self.env.get_template(name) {
            Ok(template) => template,
            Err(e) if e.kind() == ErrorKind::TemplateNotFound => {
                return Ok(Rendered::TemplateNotFound(name.into()));
            }
            Err(e) => return Err(e).chain(error! {
                "failed to load template",
                "template" => name,
            }),
        };

        let rendered = template
            .render(context! {
                content => page.content,
                page => page.page,
                images => page.images,
            })
            .chain_with(|| error! {
                "template rendering failed",
                "template" => name,
            })?;

        Ok(Rendered::Ok(rendered))
    }
}

mod ext {
    use std::fmt::Write;

    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use minijinja::{value::Value, Error, ErrorKind};

    pub fn deslug(value: &str) -> String {
        value.replace('-', " ")
    }

    /// Formats a unix timestamp or an ISO-8601 date/datetime string.
    pub fn date(value: Value, fmt: &str) -> Result<String, Error> {
        let invalid = |msg: String| Error::new(ErrorKind::InvalidOperation, msg);

        let mut out = String::new();
        let written = if let Ok(ts) = i64::try_from(value.clone()) {
            let datetime = DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| invalid(format!("invalid timestamp {ts} provided to `date`")))?;

            write!(out, "{}", datetime.format(fmt))
        } else {
            let kind = value.kind();
            let string = value.as_str()
                .ok_or_else(|| invalid(format!("`date` must be applied to a string or integer, found {kind}")))?;

            if let Ok(d) = string.parse::<NaiveDate>() {
                write!(out, "{}", d.format(fmt))
            } else if let Ok(dt) = string.parse::<NaiveDateTime>() {
                write!(out, "{}", dt.format(fmt))
            } else if let Ok(dt) = string.parse::<DateTime<Utc>>() {
                write!(out, "{}", dt.format(fmt))
            } else {
                return Err(invalid(format!("failed to parse {string} as a date")));
            }
        };

        written.map_err(|_| invalid(format!("invalid date format string {fmt:?}")))?;
        Ok(out)
    }

    pub fn split(value: &str, pat: &str, n: Option<usize>) -> Value {
        match n {
            Some(n) => value.split(pat).nth(n).map(Value::from).unwrap_or(Value::UNDEFINED),
            None => value.split(pat).map(Value::from).collect(),
        }
    }

    pub fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
