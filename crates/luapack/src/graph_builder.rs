//! Discovers every script reachable through `require`, parses each exactly once, and
//! rewrites the calls into numeric slot lookups.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, trace};
use lua_parser::Transformer;
use lua_parser::ast::{Chunk, Expression, Identifier};
use lua_parser::transformer::walk_expression;
use rustc_hash::FxHashMap;

use crate::ast_builder::{RESERVED_PREFIX, require_call};
use crate::error::{BundleError, BundleResult};
use crate::require_graph::RequireGraph;
use crate::resolver::{ModuleResolver, ScriptLocation};

/// Everything a bundling run discovered.
#[derive(Debug)]
pub struct ModuleGraph {
    pub entry: ScriptLocation,
    /// Canonical script path to module ID, in ID order.
    pub module_table: IndexMap<PathBuf, usize>,
    /// Rewritten tree of every module, keyed by ID.
    pub module_trees: FxHashMap<usize, Chunk>,
    /// Rewritten tree of the entry script.
    pub main_tree: Chunk,
    pub requires: RequireGraph,
    /// Files in the order they were parsed, entry first.
    pub parsed_files: Vec<PathBuf>,
}

impl ModuleGraph {
    pub fn module_count(&self) -> usize {
        self.module_table.len()
    }
}

#[derive(Debug)]
pub struct GraphBuilder {
    resolver: ModuleResolver,
    entry: ScriptLocation,
    module_table: IndexMap<PathBuf, usize>,
    module_trees: FxHashMap<usize, Chunk>,
    requires: RequireGraph,
    parsed_files: Vec<PathBuf>,
}

impl GraphBuilder {
    pub fn new(resolver: ModuleResolver, entry: ScriptLocation) -> Self {
        Self {
            resolver,
            entry,
            module_table: IndexMap::new(),
            module_trees: FxHashMap::default(),
            requires: RequireGraph::new(),
            parsed_files: Vec::new(),
        }
    }

    pub fn build(mut self) -> BundleResult<ModuleGraph> {
        let entry = self.entry.clone();
        self.requires.add_module(&entry.path, None);
        let main_tree = self.process(&entry)?;
        self.requires.log_cycles();
        debug!(
            "Discovered {} scripts through {} require edges ({} packages looked up)",
            self.requires.module_count(),
            self.requires.require_count(),
            self.resolver.cached_packages()
        );
        Ok(ModuleGraph {
            entry,
            module_table: self.module_table,
            module_trees: self.module_trees,
            main_tree,
            requires: self.requires,
            parsed_files: self.parsed_files,
        })
    }

    /// Parses `script` and rewrites its requires, recursing into newly discovered modules.
    fn process(&mut self, script: &ScriptLocation) -> BundleResult<Chunk> {
        let source = fs::read(&script.path).map_err(|source| BundleError::Read {
            path: script.path.clone(),
            source,
        })?;
        let mut chunk = lua_parser::parse_bytes(&source).map_err(|source| BundleError::Parse {
            file: script.path.clone(),
            source,
        })?;
        self.parsed_files.push(script.path.clone());
        debug!("Parsed {:?} ({} statements)", script.path, chunk.body.len());

        RequireRewriter {
            builder: self,
            script,
        }
        .visit_chunk(&mut chunk)?;
        debug!(
            "{:?} requires {:?}",
            script.path,
            self.requires.requires_of(&script.path)
        );

        if log::log_enabled!(log::Level::Trace) {
            match serde_json::to_string(&chunk) {
                Ok(json) => trace!("Rewritten tree of {:?}: {}", script.path, json),
                Err(err) => trace!("Could not serialize tree of {:?}: {}", script.path, err),
            }
        }
        Ok(chunk)
    }

    /// Returns the module ID for `module_name` required from `script` on `line`.
    fn require(
        &mut self,
        script: &ScriptLocation,
        module_name: &str,
        line: usize,
    ) -> BundleResult<usize> {
        let Some(target) = self.resolver.resolve(script, module_name)? else {
            return Err(BundleError::Resolution {
                module: module_name.to_owned(),
                from: script.path.clone(),
            });
        };
        if target == self.entry {
            return Err(BundleError::EntryRequired {
                file: script.path.clone(),
                line,
                module: module_name.to_owned(),
            });
        }

        if let Some(&id) = self.module_table.get(&target.path) {
            self.requires.add_require(&script.path, &target.path, line);
            debug!("Reusing module {} for '{}' in {:?}", id, module_name, script.path);
            return Ok(id);
        }

        // Registered before its body is processed, so a cyclic require sees this ID.
        let id = self.module_table.len() + 1;
        self.module_table.insert(target.path.clone(), id);
        self.requires.add_module(&target.path, Some(id));
        self.requires.add_require(&script.path, &target.path, line);
        debug!("Assigned module {} to '{}' ({:?})", id, module_name, target.path);

        let chunk = self.process(&target)?;
        self.module_trees.insert(id, chunk);
        Ok(id)
    }
}

/// The literal module name of a require call, or `None` if `expression` is not one.
fn require_target(expression: &Expression, file: &Path) -> BundleResult<Option<(String, usize)>> {
    let unsupported = |line| BundleError::UnsupportedRequire {
        file: file.to_path_buf(),
        line,
    };
    match expression {
        Expression::Call(call) if is_require(&call.base) => match call.arguments.as_slice() {
            [Expression::String(literal)] => Ok(Some((literal.value.clone(), call.line))),
            _ => Err(unsupported(call.line)),
        },
        Expression::StringCall(call) if is_require(&call.base) => {
            Ok(Some((call.argument.value.clone(), call.line)))
        }
        Expression::TableCall(call) if is_require(&call.base) => Err(unsupported(call.line)),
        _ => Ok(None),
    }
}

fn is_require(base: &Expression) -> bool {
    matches!(base, Expression::Identifier(identifier) if identifier.name == "require")
}

struct RequireRewriter<'a> {
    builder: &'a mut GraphBuilder,
    script: &'a ScriptLocation,
}

impl Transformer for RequireRewriter<'_> {
    type Error = BundleError;

    fn visit_expression(&mut self, expression: &mut Expression) -> BundleResult<()> {
        let Some((module_name, line)) = require_target(expression, &self.script.path)? else {
            return walk_expression(self, expression);
        };
        let id = self.builder.require(self.script, &module_name, line)?;
        let in_parens = expression.in_parens();
        *expression = require_call(id);
        if in_parens {
            expression.mark_in_parens();
        }
        Ok(())
    }

    fn visit_identifier(&mut self, identifier: &mut Identifier) -> BundleResult<()> {
        if identifier.name.starts_with(RESERVED_PREFIX) {
            return Err(BundleError::ReservedIdentifier {
                file: self.script.path.clone(),
                name: identifier.name.clone(),
            });
        }
        Ok(())
    }
}
