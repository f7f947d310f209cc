use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

use plover::{BuildMode, Failure, Summary};

const PAGE_TEMPLATE: &str = "<!DOCTYPE html>
<html>
  <head>
    <title>{{ page.title }}</title>
  </head>
  <body>
    <!-- content -->
    {{ content }}
    {% if images['logo.png'] %}<img src=\"/{{ images['logo.png'] }}\">{% endif %}
  </body>
</html>
";

struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    fn new() -> Self {
        Project { dir: tempfile::tempdir().unwrap() }
    }

    /// A project with one template, one page, one image and one stylesheet.
    fn site() -> Self {
        Project::new()
            .file("_templates/page.html", PAGE_TEMPLATE)
            .file("_pages/about.md", "---\ntemplate: page\ntitle: About\n---\n# About us\n\nHello.\n")
            .file("_static/images/logo.png", "not really a png")
            .file("_static/styles/site.css", "body { margin: 0 }\n")
    }

    fn file(self, path: &str, contents: &str) -> Self {
        let path = self.root().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        self
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn live(&self) -> PathBuf {
        self.root().join("_website")
    }

    fn build(&self, mode: BuildMode) -> Result<Summary, Failure> {
        plover::build(self.root(), mode)
    }

    /// Names in the project root left behind by staging or dispatch.
    fn transient_dirs(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.root()).unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("_tmp_") || n.ends_with("_new") || n.ends_with("_old"))
            .collect();

        names.sort();
        names
    }
}

/// Relative path to contents for every file below `dir`.
fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, files);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
                files.insert(relative, fs::read(&path).unwrap());
            }
        }
    }

    let mut files = BTreeMap::new();
    walk(dir, dir, &mut files);
    files
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn about_page_end_to_end() {
    let project = Project::site();
    let summary = project.build(BuildMode::Production).unwrap();

    assert_eq!(summary.pages_written, 1);
    assert_eq!(summary.pages_skipped, 0);
    assert_eq!(summary.images, 1);
    assert_eq!(summary.stylesheets, 1);
    assert_eq!(summary.location, project.live().canonicalize().unwrap());

    let html = read(project.live().join("about.html"));
    assert!(html.contains("<title>About</title>"), "{html}");
    assert!(html.contains("<h1>About us</h1>"), "{html}");
    assert!(html.contains("<p>Hello.</p>"), "{html}");
    assert!(html.contains("images/logo.png"), "{html}");
    assert!(!html.contains("<!--"), "{html}");

    let files: Vec<String> = snapshot(&project.live()).into_keys().collect();
    assert_eq!(files, vec!["about.html", "images/logo.png", "styles/site.css"]);
    assert!(project.live().join("posts").is_dir());
    assert_eq!(project.transient_dirs(), Vec::<String>::new());
}

#[test]
fn nested_pages_keep_their_paths() {
    let project = Project::site()
        .file("_pages/blog/2024/first.markdown", "+++\ntemplate = \"page.html\"\ntitle = \"First\"\n+++\nfirst\n");

    project.build(BuildMode::Production).unwrap();
    assert!(read(project.live().join("blog/2024/first.html")).contains("<title>First</title>"));
    assert!(!project.live().join("blog/2024/first.markdown").exists());
}

#[test]
fn pages_under_output_subdirectories_are_published() {
    let project = Project::site()
        .file("_pages/posts/hello.md", "---\ntemplate: page\ntitle: Hello\n---\nhello\n")
        .file("_pages/styles/guide.md", "---\ntemplate: page\ntitle: Guide\n---\nguide\n")
        .file("_pages/images/gallery.md", "---\ntemplate: page\ntitle: Gallery\n---\ngallery\n");

    let summary = project.build(BuildMode::Production).unwrap();
    assert_eq!(summary.pages_written, 4);
    for page in ["posts/hello.html", "styles/guide.html", "images/gallery.html"] {
        assert!(project.live().join(page).is_file(), "{page} missing");
    }

    assert!(project.live().join("styles/site.css").is_file());
    assert!(project.live().join("images/logo.png").is_file());
}

#[test]
fn toml_dates_reach_templates_as_dates() {
    let project = Project::site()
        .file("_templates/dated.html", "<time>{{ page.date }}|{{ page.date | date('%d %B %Y') }}</time>")
        .file("_pages/news.md", "+++\ntemplate = \"dated\"\ndate = 2024-03-05\n+++\nnews\n");

    let summary = project.build(BuildMode::Production).unwrap();
    assert_eq!(summary.pages_written, 2);
    assert_eq!(read(project.live().join("news.html")), "<time>2024-03-05|05 March 2024</time>");
}

#[test]
fn missing_images_directory_is_fine() {
    let project = Project::new()
        .file("_templates/page.html", PAGE_TEMPLATE)
        .file("_pages/index.md", "---\ntemplate: page\ntitle: Home\n---\nhi\n");

    let summary = project.build(BuildMode::Production).unwrap();
    assert_eq!(summary.images, 0);
    assert_eq!(summary.pages_written, 1);
    assert!(!read(project.live().join("index.html")).contains("<img"));
}

#[test]
fn unresolvable_template_skips_only_that_page() {
    let project = Project::site()
        .file("_pages/orphan.md", "---\ntemplate: nowhere\n---\nlost\n")
        .file("_pages/bare.md", "no front matter here\n");

    let summary = project.build(BuildMode::Production).unwrap();
    assert_eq!(summary.pages_written, 1);
    assert_eq!(summary.pages_skipped, 2);
    assert!(project.live().join("about.html").exists());
    assert!(!project.live().join("orphan.html").exists());
    assert!(!project.live().join("bare.html").exists());
}

#[cfg(feature = "sass")]
#[test]
fn plain_css_wins_over_compiled_sass() {
    let project = Project::site()
        .file("_static/styles/theme.scss", "$accent: red;\na { color: $accent; }\n")
        .file("_static/styles/theme.css", "a{color:blue}")
        .file("_static/styles/extra.scss", "p { margin: 0; }\n");

    let summary = project.build(BuildMode::Production).unwrap();
    assert_eq!(summary.stylesheets, 3);
    assert_eq!(read(project.live().join("styles/theme.css")), "a{color:blue}");
    assert!(read(project.live().join("styles/extra.css")).contains("margin: 0"));
}

#[test]
fn rebuilds_are_byte_identical() {
    let project = Project::site();
    project.build(BuildMode::Production).unwrap();
    let first = snapshot(&project.live());

    project.build(BuildMode::Production).unwrap();
    assert_eq!(snapshot(&project.live()), first);
}

#[test]
fn failed_build_leaves_live_output_alone() {
    let project = Project::site();
    project.build(BuildMode::Production).unwrap();
    let before = snapshot(&project.live());

    fs::remove_dir_all(project.root().join("_pages")).unwrap();
    let failure = project.build(BuildMode::Production).unwrap_err();
    assert!(matches!(failure, Failure::Aborted(_)), "{failure}");

    assert_eq!(snapshot(&project.live()), before);
    assert_eq!(project.transient_dirs(), Vec::<String>::new());
}

#[cfg(feature = "sass")]
#[test]
fn broken_stylesheet_aborts_before_dispatch() {
    let project = Project::site();
    project.build(BuildMode::Production).unwrap();
    let before = snapshot(&project.live());

    let project = project
        .file("_pages/new.md", "---\ntemplate: page\n---\nnew\n")
        .file("_static/styles/broken.scss", "a { color: ");

    assert!(!project.build(BuildMode::Production).unwrap_err().is_site_down());
    assert_eq!(snapshot(&project.live()), before);
    assert_eq!(project.transient_dirs(), Vec::<String>::new());
}

#[test]
fn development_build_keeps_staging() {
    let project = Project::site();
    let summary = project.build(BuildMode::Development).unwrap();

    let staging = summary.location.clone();
    let name = staging.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("_tmp_"), "{name}");
    assert!(staging.join("about.html").is_file());
    assert!(staging.join("images/logo.png").is_file());
    assert!(!staging.join("_templates").exists());
    assert!(!staging.join("about.md").exists());
    assert!(!project.live().exists());
    assert!(summary.to_string().contains("staging"));

    fs::remove_dir_all(staging).unwrap();
}

#[test]
fn configuration_is_honored() {
    let project = Project::site()
        .file("config.toml", "[site]\nname = \"Plover\"\n\n[build]\noutput = \"public\"\nminify = false\n")
        .file("_templates/page.html", "<p>{{ site.name }}</p>\n{{ content }}\n");

    let summary = project.build(BuildMode::Production).unwrap();
    assert_eq!(summary.location, project.root().join("public").canonicalize().unwrap());

    let html = read(project.root().join("public/about.html"));
    assert_eq!(html, "<p>Plover</p>\n<h1>About us</h1>\n<p>Hello.</p>");
    assert!(!project.live().exists());
}

#[test]
fn stale_dispatch_leftovers_are_replaced() {
    let project = Project::site()
        .file("_website_new/junk.html", "junk")
        .file("_website_old/older.html", "older");

    project.build(BuildMode::Production).unwrap();
    assert!(!project.live().join("junk.html").exists());
    assert_eq!(project.transient_dirs(), Vec::<String>::new());
}
