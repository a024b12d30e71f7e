//! Token accounting, state paths and session history records

mod io;
mod paths;
mod tokens;
mod types;

pub use io::{append_jsonl, atomic_write, read_json_or_default, read_jsonl};
pub use paths::Paths;
pub use tokens::{estimate_reference_tokens, estimate_tokens};
pub use types::SessionRecord;
