pub mod layout;
pub mod palette;
pub mod tree;

pub use layout::{align_columns, strip_ansi, Layout};
pub use palette::{Colorizer, DefaultGlyphs, Glyphs, Palette};
pub use tree::{prefixes, TreeRenderer, View};

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("write failed at line {line}: {source}")]
    Write {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("flush failed: {0}")]
    Flush(#[source] io::Error),
}
