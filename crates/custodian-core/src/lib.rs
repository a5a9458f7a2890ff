//! Module resolution and import handling for Jsonnet sources kept in git

pub mod error;
pub mod fs;
pub mod identifier;
pub mod importer;
pub mod location;
pub mod manifest;
pub mod module;
pub mod resolver;
pub mod transform;
pub mod tree;

pub use error::{CustodianError, Result};
pub use identifier::ModuleId;
pub use importer::{ImportCallback, Imported, Importer};
pub use location::Location;
pub use manifest::Manifest;
pub use module::Module;
pub use resolver::{Dispatcher, GitAuth, GitResolver, LocalResolver, ModuleCache, Resolve};
pub use transform::{SopsTransformer, Transformer, TransformerPipeline};
pub use tree::DependencyTree;
