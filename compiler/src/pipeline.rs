// Dependency analysis pipeline.
//
// Glues the stages together: macro pre-processing, parsing, tree building,
// simplification, rule replacement, flattening, and the final filter down
// to the descriptor kinds the external scheduler reacts to.
//
// Preconditions: none.
// Postconditions: `calculate_aux_dependencies` only ever yields
// `all`/`tag`/`bot`/`this`/`tag_value` nodes at the top level.
// Failure modes: `dependency_tree` reports `SyntaxError`;
// `calculate_aux_dependencies` swallows it into an empty list.
// Side effects: none.

use crate::diag::SyntaxError;
use crate::flatten::flatten;
use crate::macros::replace_macros;
use crate::node::{Node, SimpleNode};
use crate::parser::parse;
use crate::replace::replace_aux_dependencies;
use crate::simplify::simplify;
use crate::tree;

/// Parse `code` (after macro substitution) and build its raw dependency
/// tree.
pub fn dependency_tree(code: &str) -> Result<Node, SyntaxError> {
    let code = replace_macros(code);
    let program = parse(&code)?;
    Ok(tree::build(&program))
}

/// The full analysis: raw tree, simplification, built-in accessor
/// replacement, flattening, and the scheduler-facing filter.
///
/// An unparseable formula yields an empty list. The scheduler cannot tell
/// that apart from "no dependencies"; changing that contract would change
/// reactivity for every deployed formula, so it stays.
pub fn calculate_aux_dependencies(code: &str) -> Vec<SimpleNode> {
    let tree = match dependency_tree(code) {
        Ok(tree) => tree,
        Err(_) => return Vec::new(),
    };
    let simplified = simplify(&tree);
    let replaced = replace_aux_dependencies(&simplified);
    flatten(&replaced)
        .into_iter()
        .filter(|node| {
            matches!(
                node,
                SimpleNode::All
                    | SimpleNode::Tag { .. }
                    | SimpleNode::Bot { .. }
                    | SimpleNode::This
                    | SimpleNode::TagValue { .. }
            )
        })
        .collect()
}
