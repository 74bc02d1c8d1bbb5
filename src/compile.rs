//! Compilation driver: source text in, module and diagnostics out.

use crate::ast::Module;
use crate::builder::{BuildOptions, Builder};
use crate::cst;
use crate::diagnostics::Diagnostic;
use crate::error::CompileError;
use std::path::Path;
use tracing::debug;

/// Result of building one schema source: the model and every semantic error
/// found in it. A model with diagnostics may be inspected but must not be
/// handed to a generator; [`Compilation::into_module`] enforces that.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Compilation {
    pub module: Module,
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The module, if no diagnostic was reported.
    pub fn into_module(self) -> Result<Module, CompileError> {
        if self.diagnostics.is_empty() {
            Ok(self.module)
        } else {
            Err(CompileError::Semantic(self.diagnostics))
        }
    }
}

/// Parse and build `source` with default options.
pub fn compile(source: &str) -> Result<Compilation, CompileError> {
    compile_with(source, BuildOptions::default())
}

/// Parse and build `source`. Syntax errors fail the call; semantic errors are
/// collected in the returned [`Compilation`].
pub fn compile_with(source: &str, options: BuildOptions) -> Result<Compilation, CompileError> {
    let tree = cst::parse(source)?;
    let mut diagnostics = Vec::new();
    let module = Builder::new(&mut diagnostics)
        .with_options(options)
        .build(tree);
    Ok(Compilation {
        module,
        diagnostics,
    })
}

/// Read a schema file and compile it.
pub fn compile_file(path: impl AsRef<Path>) -> Result<Compilation, CompileError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "compiling schema file");
    let source = std::fs::read_to_string(path)?;
    compile(&source)
}
