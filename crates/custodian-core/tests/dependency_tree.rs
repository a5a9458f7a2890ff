//! Dependency tree closure and lock snapshots

use std::collections::HashMap;
use std::sync::Mutex;

use custodian_core::error::Result;
use custodian_core::fs::DirTree;
use custodian_core::{CustodianError, DependencyTree, Module, ModuleId};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

const A: &str = "github.com/org/a@v1.0.0";
const B: &str = "github.com/org/b@v2.1.0";
const C: &str = "github.com/org/c@v0.3.0";

fn module(id: &str, deps: &[(&str, &str)]) -> Module {
    let dependencies: IndexMap<String, ModuleId> = deps
        .iter()
        .map(|(alias, id)| (alias.to_string(), ModuleId::new(*id)))
        .collect();
    Module::new(ModuleId::new(id), dependencies, DirTree::new("/nonexistent"))
}

/// Serves modules from a fixed graph and records every resolution
struct GraphResolver {
    graph: HashMap<&'static str, Vec<(&'static str, &'static str)>>,
    calls: Mutex<Vec<String>>,
}

impl GraphResolver {
    fn new(graph: &[(&'static str, Vec<(&'static str, &'static str)>)]) -> Self {
        Self {
            graph: graph.iter().cloned().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl custodian_core::Resolve for GraphResolver {
    fn resolve(&self, id: &ModuleId) -> Result<Module> {
        self.calls.lock().unwrap().push(id.to_string());
        match self.graph.get(id.as_str()) {
            Some(deps) => Ok(module(id.as_str(), deps)),
            None => Err(CustodianError::ModuleNotFound(id.to_string())),
        }
    }
}

#[test]
fn test_closure_with_cycle_resolves_each_module_once() {
    let resolver = GraphResolver::new(&[
        (A, vec![("c", C)]),
        (B, vec![]),
        (C, vec![("a", A)]),
    ]);
    let root = module(".", &[("a", A), ("b", B)]);

    let tree = DependencyTree::build(root, &resolver).unwrap();

    assert_eq!(tree.len(), 4);
    for id in [".", A, B, C] {
        assert!(tree.contains(&ModuleId::new(id)), "missing {}", id);
    }
    let mut calls = resolver.calls();
    calls.sort();
    assert_eq!(calls, vec![A.to_string(), B.to_string(), C.to_string()]);
}

#[test]
fn test_shared_dependency_is_resolved_once() {
    let resolver = GraphResolver::new(&[
        (A, vec![("c", C)]),
        (B, vec![("c", C)]),
        (C, vec![]),
    ]);
    let root = module(".", &[("a", A), ("b", B)]);

    let tree = DependencyTree::build(root, &resolver).unwrap();
    assert_eq!(tree.len(), 4);
    assert_eq!(resolver.calls().iter().filter(|c| c.as_str() == C).count(), 1);
}

#[test]
fn test_lock_snapshot_lists_sorted_remote_modules_only() {
    let resolver = GraphResolver::new(&[
        ("./vendored", vec![("b", B)]),
        (B, vec![]),
        (A, vec![]),
    ]);
    let root = module(".", &[("local", "./vendored"), ("a", A)]);

    let tree = DependencyTree::build(root, &resolver).unwrap();

    assert_eq!(tree.len(), 4);
    assert_eq!(
        tree.lock_snapshot(),
        vec![ModuleId::new(A), ModuleId::new(B)]
    );
    assert_eq!(
        String::from_utf8(tree.lock_file_contents().unwrap()).unwrap(),
        format!("[\n  \"{}\",\n  \"{}\"\n]\n", A, B)
    );
}

#[test]
fn test_one_local_two_remote_modules() {
    let resolver = GraphResolver::new(&[(A, vec![]), (B, vec![])]);
    let root = module(".", &[("a", A), ("b", B)]);

    let tree = DependencyTree::build(root, &resolver).unwrap();
    assert_eq!(tree.lock_snapshot(), vec![ModuleId::new(A), ModuleId::new(B)]);
}

#[test]
fn test_resolution_failure_aborts_construction() {
    let resolver = GraphResolver::new(&[(A, vec![("missing", "github.com/org/gone@v1.0.0")])]);
    let root = module(".", &[("a", A)]);

    let err = DependencyTree::build(root, &resolver).unwrap_err();
    assert!(
        matches!(&err, CustodianError::ModuleNotFound(id) if id == "github.com/org/gone@v1.0.0"),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn test_declared_identifier_maps_to_resolved_module() {
    // Requests without a version come back pinned
    let resolver = |id: &ModuleId| -> Result<Module> {
        Ok(module(&format!("{}@v1.4.2", id), &[]))
    };
    let root = module(".", &[("lib", "github.com/org/lib")]);

    let tree = DependencyTree::build(root, &resolver).unwrap();

    let declared = ModuleId::new("github.com/org/lib");
    let pinned = tree.get(&declared).unwrap();
    assert_eq!(pinned.id().as_str(), "github.com/org/lib@v1.4.2");
    assert_eq!(
        tree.lock_snapshot(),
        vec![ModuleId::new("github.com/org/lib@v1.4.2")]
    );
}

#[test]
fn test_root_without_dependencies() {
    let resolver = GraphResolver::new(&[]);
    let tree = DependencyTree::build(module(".", &[]), &resolver).unwrap();

    assert_eq!(tree.len(), 1);
    assert_eq!(tree.root_id().as_str(), ".");
    assert!(tree.lock_snapshot().is_empty());
    assert!(resolver.calls().is_empty());
}
