mod plugin;
mod markdown;
mod frontmatter;
mod normalize;

pub use plugin::*;
pub use markdown::*;
pub use frontmatter::*;
pub use normalize::*;
