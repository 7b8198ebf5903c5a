//! Pipeline entry points.
//!
//! - `run_extract`: Read one dump into the snapshot store
//! - `CorpusCompiler::run`: Flatten snapshots into a corpus file when its
//!   manifest changed

pub mod compile;
pub mod diff;
pub mod extract;
pub mod resolve;

pub use compile::{CompileOutcome, CorpusCompiler};
pub use diff::{ManifestDiff, changed};
pub use extract::run_extract;
pub use resolve::{Resolution, resolve};
