//! Source instrumentation and static census for JS/TS projects.
//!
//! Two producers share one view of a function's identity: the pass rewrites
//! modules so every callable reports itself at runtime, and the census walks
//! the same tree to record every callable that exists. Both name and locate
//! functions identically, which is what lets the platform join their outputs.

pub mod census;
pub mod contributors;
pub mod errors;
pub mod language;
pub mod naming;
pub mod pass;

pub use census::run_census;
pub use contributors::{ContributorSource, GitBlameSource, NoContributors};
pub use errors::{InstrumentError, Result};
pub use language::SourceLanguage;
pub use naming::NamingContext;
pub use pass::{
    DEFAULT_RUNTIME_MODULE, PassConfig, PassOutcome, TRACK_FN, TreeSummary, instrument_source,
    instrument_tree, is_excluded_path,
};
