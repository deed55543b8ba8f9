mod buffering;
mod lines;

pub use buffering::{LineBuffer, DEFAULT_MAX_LINE_LEN};
pub use lines::{lines_from_bytes, LineStream};
