pub mod span;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod visit;
pub mod resolve;
pub mod manifest;
pub mod loader;
pub mod format;
pub mod relocate;

use diagnostics::RelocateError;
use loader::LoadOptions;
use relocate::{Report, RewriteRequest, Sink};

/// Load the project matching `options` and relocate references per `request`
/// (load → resolve → locate → classify → rewrite → reconcile → format → sink).
pub fn run(options: &LoadOptions, request: &RewriteRequest, sink: &mut dyn Sink) -> Result<Report, RelocateError> {
    let mut project = loader::load(options)?;
    relocate::relocate(&mut project, request, sink)
}
