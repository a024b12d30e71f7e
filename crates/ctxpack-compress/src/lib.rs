//! Medium-tier compression: signatures, summaries and stripped content

mod compress;
mod signature;

pub use compress::{strip_comments, summarize_sentences, top_level_lines};
pub use signature::SignatureCompressor;
