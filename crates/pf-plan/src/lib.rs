//! # pf-plan
//!
//! From prompt to ordered file contents.
//!
//! - [`PlanBuilder`] asks the model for a [`FileManifest`]: the files to
//!   write, what each is for, and which files each depends on.
//! - [`resolve`] orders the manifest so every file comes after its
//!   dependencies, rejecting unknown references and cycles.
//! - [`FileGenerator`] writes one file per completion call, showing the model
//!   the full content of that file's already-generated dependencies.
//!
//! Every operation here makes at most one completion request and never
//! retries; see `pf-run` for the retry policy and run state machine.

pub mod builder;
pub mod error;
pub mod generator;
pub mod manifest;
pub mod prompts;
pub mod resolver;
pub mod settings;

pub use builder::{parse_manifest, PlanBuilder};
pub use error::PlanError;
pub use generator::{strip_code_fence, FileGenerator};
pub use manifest::{FileManifest, FileManifestEntry};
pub use resolver::resolve;
pub use settings::PlanSettings;
