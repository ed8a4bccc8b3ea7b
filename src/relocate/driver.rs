//! The module loop.

use tracing::{debug, info};

use crate::diagnostics::RelocateError;
use crate::format;
use crate::loader::{Module, Project};
use crate::resolve::SymbolTable;

use super::classify::{self, Context, Replacement, Strategy};
use super::imports::ImportTable;
use super::locate::{Target, locate};
use super::reconcile::choose_alias;
use super::rewrite::rewrite;
use super::sink::Sink;
use super::{Edit, PackageNames, Report, RewriteRequest};

/// Relocate every reference to `request.from` in the targeted modules of
/// `project`, module by module in path order. Stops at the first error; the
/// sink is finished only when every module succeeded.
pub fn relocate(
    project: &mut Project,
    request: &RewriteRequest,
    sink: &mut dyn Sink,
) -> Result<Report, RelocateError> {
    let names = PackageNames::of(project);
    let target = Target::resolve(&project.modules, &request.from);

    let Project { root, modules, symbols, .. } = project;
    modules.sort_by(|a, b| a.path.cmp(&b.path));

    let mut report = Report::default();
    for module in modules.iter_mut().filter(|m| m.targeted) {
        let run = ModuleRun { request, target: &target, names: &names, symbols };
        run.process(module, sink, &mut report)?;
    }

    sink.finish().map_err(|e| RelocateError::io(root.as_path(), e))?;
    info!(edits = report.edits.len(), files = report.modified.len(), "relocation finished");
    Ok(report)
}

struct ModuleRun<'a> {
    request: &'a RewriteRequest,
    target: &'a Target,
    names: &'a PackageNames,
    symbols: &'a SymbolTable,
}

impl ModuleRun<'_> {
    fn process(&self, module: &mut Module, sink: &mut dyn Sink, report: &mut Report) -> Result<(), RelocateError> {
        let from = self.request.from.relative_to(&module.path);
        let to = self.request.to.relative_to(&module.path);

        let outcome = locate(module, self.target, &from, self.names)?;
        let Some(strategy) = Strategy::for_outcome(outcome, &from.name) else {
            debug!(module = %module.path, "does not refer to the target");
            return Ok(());
        };
        if matches!(strategy, Strategy::ByName { .. }) {
            debug!(module = %module.path, "target unresolved, matching by name");
        }

        let receivers = classify::receiver_idents(module);
        for unit in &mut module.units {
            let imports = ImportTable::build(&unit.file, self.names);
            let cx = Context {
                strategy: &strategy,
                symbols: self.symbols,
                receivers: &receivers,
                from_path: &self.target.path,
                imports: &imports,
            };
            let refs = classify::classify(unit, &cx);
            if refs.is_empty() {
                continue;
            }

            let (replacement, added) = match to.path() {
                None => (Replacement::Bare { name: to.name.clone() }, None),
                Some(dest) => {
                    let plan = choose_alias(unit, &imports, dest, self.names, self.request.to_alias_override.as_deref())?;
                    (Replacement::Qualified { alias: plan.alias, name: to.name.clone() }, plan.added)
                }
            };

            let spans = rewrite(&mut unit.file, &refs, &replacement);
            for span in spans {
                let pos = unit.lines.position(span.start);
                let edit = Edit {
                    file: unit.path.clone(),
                    line: pos.line,
                    column: pos.column,
                    line_text: unit.lines.line_text(&unit.source, span.start).to_string(),
                };
                info!(file = %edit.file.display(), line = edit.line, column = edit.column, "replaced");
                sink.edit(&edit).map_err(|e| RelocateError::io(&unit.path, e))?;
                report.edits.push(edit);
            }

            let text = format::normalize(unit, self.symbols, added.as_slice(), |path| {
                self.names.get(path).map(str::to_string)
            })?;
            sink.accept(&unit.path, &text).map_err(|e| RelocateError::io(&unit.path, e))?;
            report.modified.push(unit.path.clone());
        }
        Ok(())
    }
}
