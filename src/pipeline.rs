//! Sequential generation run: parse, generate, relocate, save.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::Config;
use crate::doclet::{self, options::ParseOptions};
use crate::error::Result;
use crate::generator::{self, namespace::generate_namespaces, options::generate_options};
use crate::serializer::{DeclarationWriter, WriteResult};
use crate::session::{GenerationSession, Warning};
use crate::tsd::Forest;

/// Input and output locations of one run.
#[derive(Debug, Clone)]
pub struct Inputs {
    /// Options doclet dump (JSON).
    pub options: PathBuf,
    /// Namespace doclet dump (JSON).
    pub namespace: PathBuf,
    /// Directory receiving the `.d.ts` files.
    pub out_dir: PathBuf,
}

/// Outcome of a successful run.
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub written: Vec<WriteResult>,
    /// Number of declarations moved into the main namespace.
    pub relocated: usize,
    pub warnings: Vec<Warning>,
}

/// Run every stage with a fresh session.
pub fn run(config: &Config, inputs: &Inputs) -> Result<GenerationReport> {
    let settings = &config.generator;
    let forest = Forest::new().with_max_line_length(settings.max_line_length);
    let mut session = GenerationSession::new(forest);

    debug!(path = %inputs.options.display(), "loading options tree");
    let parse_options = ParseOptions {
        product: settings.product.clone(),
        debug_dump: settings.debug_dump.clone(),
    };
    let options = doclet::options::load(&inputs.options, &parse_options)?;

    let main = generator::create_main_module(&mut session, settings)?;
    generate_options(&mut session, config, main, &options)?;

    debug!(path = %inputs.namespace.display(), "loading namespace tree");
    let tree = doclet::namespace::load(&inputs.namespace, &mut session)?;
    let modules = generate_namespaces(&mut session, config, settings, main, &tree)?;

    let relocated = generator::relocate(&mut session, main, &modules)?;

    let writer = DeclarationWriter::new(&inputs.out_dir, settings.copyright.clone());
    let written = writer.write_all(&mut session.forest, &modules)?;
    info!(
        files = written.len(),
        relocated,
        warnings = session.warnings().len(),
        "generation finished"
    );

    Ok(GenerationReport {
        written,
        relocated,
        warnings: session.take_warnings(),
    })
}
