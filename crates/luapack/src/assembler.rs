//! Splices per-module trees into one chunk behind a memoizing loader:
//!
//! ```lua
//! local __luapack_require
//! local __luapack_packages = { [1] = function(...) --[[ module 1 ]] end }
//! local __luapack_cache = {}
//! __luapack_require = function(id)
//!     local cached = __luapack_cache[id]
//!     if cached ~= nil then
//!         return cached
//!     end
//!     local loaded = __luapack_packages[id]()
//!     if loaded == nil then
//!         loaded = true
//!     end
//!     __luapack_cache[id] = loaded
//!     return loaded
//! end
//! -- entry statements
//! ```

use std::path::PathBuf;

use indexmap::IndexMap;
use log::debug;
use lua_parser::ast::{BinaryOperator, Chunk, Expression, Statement, TableField};
use rustc_hash::FxHashMap;

use crate::ast_builder::{
    CACHE_TABLE, PACKAGES_TABLE, REQUIRE_FUNCTION, assign, binary, boolean, call, function,
    if_then, index, integer, local, name, return_values, table,
};

/// Builds the bundle chunk. Modules are emitted in ID order; IDs without a tree are skipped.
pub fn assemble(
    module_table: &IndexMap<PathBuf, usize>,
    mut module_trees: FxHashMap<usize, Chunk>,
    main_tree: Chunk,
) -> Chunk {
    let mut ids: Vec<usize> = module_table.values().copied().collect();
    ids.sort_unstable();

    let mut bundle = Chunk::default();
    let mut factories = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(module) = module_trees.remove(&id) else {
            debug!("Module {} has no tree, skipping its slot", id);
            continue;
        };
        bundle.globals.extend(module.globals);
        bundle.comments.extend(module.comments);
        factories.push(TableField::Key {
            key: integer(id),
            value: function(&[], true, module.body),
        });
    }
    debug!("Assembled {} module factories", factories.len());

    bundle.body.push(local(&[REQUIRE_FUNCTION], Vec::new()));
    bundle.body.push(local(&[PACKAGES_TABLE], vec![table(factories)]));
    bundle.body.push(local(&[CACHE_TABLE], vec![table(Vec::new())]));
    bundle.body.push(assign(name(REQUIRE_FUNCTION), loader()));

    bundle.globals.extend(main_tree.globals);
    bundle.comments.extend(main_tree.comments);
    bundle.body.extend(main_tree.body);
    bundle
}

/// `function(id) ... end`: runs a factory on first use and caches its result.
fn loader() -> Expression {
    let slot = || index(name(CACHE_TABLE), name("id"));
    let body: Vec<Statement> = vec![
        local(&["cached"], vec![slot()]),
        if_then(
            binary(BinaryOperator::Ne, name("cached"), Expression::Nil),
            vec![return_values(vec![name("cached")])],
        ),
        local(
            &["loaded"],
            vec![call(index(name(PACKAGES_TABLE), name("id")), Vec::new())],
        ),
        if_then(
            binary(BinaryOperator::Eq, name("loaded"), Expression::Nil),
            vec![assign(name("loaded"), boolean(true))],
        ),
        assign(slot(), name("loaded")),
        return_values(vec![name("loaded")]),
    ];
    function(&["id"], false, body)
}
