//! Jsonnet evaluation with imports served by the dependency tree
//!
//! The evaluator only knows about paths, so every file it sees is named
//! `<escaped location tag>/<file name>`. Popping the file name, as the
//! evaluator does before a nested import, leaves the tag of the importing
//! file.

use std::any::Any;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use anyhow::anyhow;
use custodian_core::location::LOCATION_SEPARATOR;
use custodian_core::Importer;
use jrsonnet_evaluator::error::{Error, LocError, Result};
use jrsonnet_evaluator::{EvaluationState, ImportResolver};
use jrsonnet_interner::IStr;
use tracing::debug;

/// Evaluate `file` from the root module and manifest the result as JSON
pub fn evaluate(importer: Importer, file: &str) -> anyhow::Result<String> {
    let state = EvaluationState::default();
    state.with_stdlib();
    state.set_import_resolver(Box::new(ModuleImportResolver::new(importer)));

    let output = state
        .evaluate_file_raw(Path::new(file))
        .and_then(|value| state.manifest(value))
        .map_err(|err| anyhow!(state.stringify_err(&err)))?;
    Ok(output.to_string())
}

/// [`ImportResolver`] backed by an [`Importer`]
pub struct ModuleImportResolver {
    importer: Importer,
}

impl ModuleImportResolver {
    pub fn new(importer: Importer) -> Self {
        Self { importer }
    }
}

impl ImportResolver for ModuleImportResolver {
    fn resolve_file(&self, from: &Path, path: &Path) -> Result<Rc<Path>> {
        let imported_from = location_tag(from).unwrap_or_default();
        let imported_path = path
            .to_str()
            .ok_or_else(|| runtime_error(format!("import path is not UTF-8: {}", path.display())))?;

        let (_, location) = self
            .importer
            .locate(&imported_from, imported_path)
            .map_err(|e| runtime_error(e.to_string()))?;
        let found_at = location.to_string();
        debug!("Import {:?} from {:?} resolved to {}", imported_path, imported_from, found_at);
        Ok(evaluator_path(&found_at).into())
    }

    fn load_file_contents(&self, resolved: &Path) -> Result<IStr> {
        let found_at = location_tag(resolved)
            .ok_or_else(|| runtime_error(format!("not a module file: {}", resolved.display())))?;
        let contents = self
            .importer
            .load(&found_at)
            .map_err(|e| runtime_error(e.to_string()))?;
        String::from_utf8(contents)
            .map(IStr::from)
            .map_err(|_| runtime_error(format!("{} is not valid UTF-8", found_at)))
    }

    unsafe fn as_any(&self) -> &dyn Any {
        self
    }
}

fn runtime_error(message: String) -> LocError {
    Error::RuntimeError(message.into()).into()
}

fn evaluator_path(found_at: &str) -> PathBuf {
    let file_name = found_at.rsplit('/').next().unwrap_or(found_at);
    PathBuf::from(escape(found_at)).join(file_name)
}

/// Tag carried by the first component that holds one
fn location_tag(path: &Path) -> Option<String> {
    path.components().find_map(|component| match component {
        Component::Normal(name) => name
            .to_str()
            .filter(|name| name.contains(LOCATION_SEPARATOR))
            .map(unescape),
        _ => None,
    })
}

fn escape(tag: &str) -> String {
    tag.replace('%', "%25").replace('/', "%2F")
}

fn unescape(component: &str) -> String {
    component.replace("%2F", "/").replace("%25", "%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popping_the_file_name_leaves_the_tag() {
        for tag in [
            ".:mod-sep:main.jsonnet",
            "./libs/util:mod-sep:lib/util.libsonnet",
            "github.com/org/repo@v1.0.0:mod-sep:a%b/c.jsonnet",
        ] {
            let path = evaluator_path(tag);
            assert_eq!(location_tag(&path).as_deref(), Some(tag));

            let mut dir = path.clone();
            dir.pop();
            assert_eq!(location_tag(&dir).as_deref(), Some(tag));
        }
    }

    #[test]
    fn test_paths_without_a_tag_mean_the_root() {
        assert_eq!(location_tag(Path::new("/home/user/project")), None);
        assert_eq!(location_tag(Path::new(".")), None);
    }
}
