//! Generate cross-referenced TypeScript declaration files from API
//! documentation doclet trees.
//!
//! A run reads two doclet dumps: the chart options tree and the namespace
//! tree of classes and functions per source file. The option generator
//! builds the option interfaces inside the root namespace, the namespace
//! generator adds one module per source file plus a globals module, the
//! relocator folds cross-module references back into the main module, and
//! the serializer writes a `.d.ts` and `.src.d.ts` file per module.
//!
//! ```no_run
//! use tsdgen::{pipeline, Config};
//!
//! let config = Config::load_or_default()?;
//! let report = pipeline::run(
//!     &config,
//!     &pipeline::Inputs {
//!         options: "tree.json".into(),
//!         namespace: "tree-namespace.json".into(),
//!         out_dir: "code".into(),
//!     },
//! )?;
//! println!("{} files", report.written.len() * 2);
//! # Ok::<(), tsdgen::GenerateError>(())
//! ```

pub mod config;
pub mod doclet;
pub mod error;
pub mod generator;
pub mod logging;
pub mod pipeline;
pub mod serializer;
pub mod session;
pub mod tsd;

pub use config::{Config, GeneratorConfig, LinkKind, TypeMapper};
pub use error::{GenerateError, Result, StructuralError};
pub use pipeline::{GenerationReport, Inputs};
pub use session::{GenerationSession, Warning, WarningKind};
pub use tsd::{Declaration, DeclarationId, DeclarationKind, Forest, Variant};
