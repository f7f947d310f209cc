use crate::error::Result;

/// Minifies rendered pages.
///
/// Comments are stripped, whitespace between tags collapsed and optional
/// attribute quotes dropped. Closing tags and the `<html>`/`<head>` openers are
/// kept, and so are boolean attributes in their explicit form
/// (`checked="checked"`). Content of `<pre>` and `<textarea>` is left as is.
#[derive(Clone)]
pub struct Minifier {
    cfg: minify_html::Cfg,
}

impl Minifier {
    pub fn new() -> Self {
        let mut cfg = minify_html::Cfg::new();
        cfg.keep_closing_tags = true;
        cfg.keep_html_and_head_opening_tags = true;
        cfg.keep_comments = false;
        cfg.minify_css = true;
        cfg.minify_js = true;
        cfg.remove_bangs = true;
        cfg.remove_processing_instructions = true;
        Minifier { cfg }
    }

    pub fn minify(&self, html: &str) -> Result<String> {
        let bytes = minify_html::minify(html.as_bytes(), &self.cfg);
        let minified = String::from_utf8(bytes).map_err(|e| error!("minified output is not UTF-8", e))?;
        Ok(explicit_boolean_attributes(&minified))
    }
}

const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen", "async", "autofocus", "autoplay", "checked", "controls",
    "default", "defer", "disabled", "formnovalidate", "hidden", "inert", "ismap",
    "itemscope", "loop", "multiple", "muted", "nomodule", "novalidate", "open",
    "playsinline", "readonly", "required", "reversed", "selected",
];

/// Rewrites valueless boolean attributes in start tags as `name="name"`.
/// Text and the bodies of `<script>` and `<style>` are copied unchanged.
fn explicit_boolean_attributes(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        let name_len = rest[1..]
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len() - 1);

        let Some(end) = tag_end(rest).filter(|_| name_len > 0) else {
            out.push('<');
            rest = &rest[1..];
            continue;
        };

        let name = &rest[1..1 + name_len];
        out.push_str(&rest[..1 + name_len]);
        write_attributes(&rest[1 + name_len..end], &mut out);
        out.push('>');
        rest = &rest[end + 1..];

        if name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style") {
            let close = format!("</{}", name.to_ascii_lowercase());
            let body_len = rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len());
            out.push_str(&rest[..body_len]);
            rest = &rest[body_len..];
        }
    }

    out.push_str(rest);
    out
}

/// Index of the `>` closing the tag that starts `tag`, skipping quoted values.
fn tag_end(tag: &str) -> Option<usize> {
    let mut quote = None;
    for (i, b) in tag.bytes().enumerate().skip(1) {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(q), _) if q == b => quote = None,
            (None, b'>') => return Some(i),
            _ => {}
        }
    }

    None
}

fn write_attributes(attrs: &str, out: &mut String) {
    let bytes = attrs.as_bytes();
    let separator = |b: u8| b.is_ascii_whitespace() || b == b'/';
    let mut i = 0;

    while i < bytes.len() {
        if separator(bytes[i]) {
            out.push(bytes[i] as char);
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && !separator(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }

        let name = &attrs[start..i];
        out.push_str(name);

        if i < bytes.len() && bytes[i] == b'=' {
            let value_start = i;
            i += 1;
            match bytes.get(i) {
                Some(&q @ (b'"' | b'\'')) => {
                    i += 1;
                    while i < bytes.len() && bytes[i] != q {
                        i += 1;
                    }

                    i = (i + 1).min(bytes.len());
                }
                _ => while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                },
            }

            out.push_str(&attrs[value_start..i]);
        } else if BOOLEAN_ATTRIBUTES.iter().any(|b| name.eq_ignore_ascii_case(b)) {
            out.push_str("=\"");
            out.push_str(name);
            out.push('"');
        }
    }
}

impl Default for Minifier {
    fn default() -> Self {
        Minifier::new()
    }
}

impl std::fmt::Debug for Minifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Minifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minify(html: &str) -> String {
        Minifier::new().minify(html).unwrap()
    }

    #[test]
    fn strips_comments_and_whitespace() {
        let html = "<html>\n  <head>\n    <title> About </title>\n  </head>\n  <body>\n    <!-- hi -->\n    <p>x</p>\n  </body>\n</html>\n";
        let out = minify(html);
        assert!(!out.contains("<!--"));
        assert!(!out.contains("\n  "));
        assert!(out.starts_with("<html><head>"));
        assert!(out.contains("<p>x</p>"));
        assert!(out.contains("</body>"));
    }

    #[test]
    fn keeps_preformatted_text() {
        let out = minify("<div>\n  <pre>a\n    b</pre>\n</div>");
        assert!(out.contains("<pre>a\n    b</pre>"));
    }

    #[test]
    fn boolean_attributes_stay_explicit() {
        let out = minify("<input type=checkbox checked=\"checked\" disabled=\"\"><option selected=\"selected\">x</option>");
        assert!(out.contains("checked=\"checked\""), "{out}");
        assert!(out.contains("disabled=\"disabled\""), "{out}");
        assert!(out.contains("selected=\"selected\""), "{out}");
        assert!(out.contains("type=checkbox"), "{out}");
    }

    #[test]
    fn only_attribute_names_are_expanded() {
        let html = "<p title=\"checked\">checked <b>hidden</b></p><input value=disabled required>";
        let out = explicit_boolean_attributes(html);
        assert_eq!(out, "<p title=\"checked\">checked <b>hidden</b></p><input value=disabled required=\"required\">");

        let script = "<script defer>if (a < b && c > d) { x = '<input checked>' }</script>";
        assert_eq!(
            explicit_boolean_attributes(script),
            "<script defer=\"defer\">if (a < b && c > d) { x = '<input checked>' }</script>",
        );

        assert_eq!(explicit_boolean_attributes("a < b </p>"), "a < b </p>");
    }

    #[test]
    fn is_idempotent_on_its_output() {
        let once = minify("<ul>\n  <li><a href=\"/about\">About</a></li>\n</ul>");
        assert_eq!(minify(&once), once);
    }
}
