pub mod types;
pub mod error;
pub mod transcript;
pub mod request;
pub mod streaming;
pub mod extract;
pub mod buffer_utils;
pub mod diagnostics;
pub mod traits;
pub mod config;
pub mod anthropic;
pub mod session;

pub use error::{ChatError, Result};
pub use types::{Role, Turn, WireMessage};
pub use transcript::Transcript;
pub use request::{GenerationOptions, GenerationRequest};
pub use streaming::{decode_lines, decode_stream, ContentBlock, BlockKind, FrameDecoder, StreamFrame};
pub use extract::{extract_fragments, fragments_from_lines, Fragment};
pub use buffer_utils::{lines_from_bytes, LineBuffer, LineStream};
pub use diagnostics::{Diagnostics, TracingDiagnostics};
pub use traits::{ChatBackend, FragmentStream};
pub use config::AnthropicConfig;
pub use anthropic::AnthropicClient;
pub use session::{ExchangeState, Session};
