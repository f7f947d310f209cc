use std::borrow::Cow;
use std::path::Path;

pub trait PathExt: AsRef<Path> {
    fn without_extension(&self) -> Cow<'_, Path>;

    /// The path as a `/`-separated string, regardless of platform.
    fn to_slash_lossy(&self) -> String;
}

impl PathExt for Path {
    fn without_extension(&self) -> Cow<'_, Path> {
        match self.extension() {
            Some(_) => self.with_extension("").into(),
            None => self.into(),
        }
    }

    fn to_slash_lossy(&self) -> String {
        self.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_handling() {
        assert_eq!(Path::new("blog/about.md").without_extension(), Path::new("blog/about"));
        assert_eq!(Path::new("about").without_extension(), Path::new("about"));
        assert_eq!(Path::new("a/b/c.png").to_slash_lossy(), "a/b/c.png");
    }
}
