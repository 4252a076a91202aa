// Rule-based dependency replacement.
//
// Rewrites references to the built-in accessor vocabulary (getBot, getTag,
// byTag, …) into concrete bot/tag/wildcard descriptors. A table maps
// qualified names to rules; a rule's output is final and is never fed back
// through the table, while nodes without a rule keep their shape and have
// their children replaced recursively.
//
// Preconditions: input from `simplify`.
// Postconditions: output contains no reference to a tabled accessor name
// except where a rule deliberately produced one.
// Failure modes: none (unresolvable names degrade to `all`).
// Side effects: none; input nodes are never mutated.

use crate::node::{LiteralValue, SimpleNode, SimpleProperty, TagName};
use std::collections::HashMap;
use std::sync::OnceLock;

/// A replacement rule: given the matched node and the active table (for
/// recursive replacement of argument lists), produce the substitute nodes.
pub type ReplacementRule =
    Box<dyn Fn(&SimpleNode, &ReplacementTable) -> Vec<SimpleNode> + Send + Sync>;

/// A table of named replacement rules plus an explicit default slot that
/// fires for any rule-eligible node without a named entry.
#[derive(Default)]
pub struct ReplacementTable {
    rules: HashMap<String, ReplacementRule>,
    default_rule: Option<ReplacementRule>,
}

impl ReplacementTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(
        mut self,
        name: impl Into<String>,
        rule: impl Fn(&SimpleNode, &ReplacementTable) -> Vec<SimpleNode> + Send + Sync + 'static,
    ) -> Self {
        self.rules.insert(name.into(), Box::new(rule));
        self
    }

    pub fn with_default(
        mut self,
        rule: impl Fn(&SimpleNode, &ReplacementTable) -> Vec<SimpleNode> + Send + Sync + 'static,
    ) -> Self {
        self.default_rule = Some(Box::new(rule));
        self
    }

    fn rule_for(&self, key: &str) -> Option<&ReplacementRule> {
        self.rules.get(key).or(self.default_rule.as_ref())
    }
}

/// The name a node is looked up under: full qualified name for functions,
/// root segment for members, the carried name for bot/tag/tag_value.
/// Literals, markers, and object expressions are not rule-eligible.
fn lookup_key(node: &SimpleNode) -> Option<&str> {
    match node {
        SimpleNode::Function { name, .. } => Some(name),
        SimpleNode::Member { name, .. } => name.split('.').next(),
        SimpleNode::Bot { name, .. } | SimpleNode::Tag { name, .. } => Some(name),
        SimpleNode::TagValue {
            name: TagName::Literal(name),
            ..
        } => Some(name),
        _ => None,
    }
}

/// Replace every node in `nodes` according to `table`. Rule output is
/// emitted verbatim; unmatched nodes recurse into their children.
pub fn replace_dependencies(nodes: &[SimpleNode], table: &ReplacementTable) -> Vec<SimpleNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let Some(rule) = lookup_key(node).and_then(|key| table.rule_for(key)) {
            out.extend(rule(node, table));
        } else {
            out.push(descend(node, table));
        }
    }
    out
}

fn descend(node: &SimpleNode, table: &ReplacementTable) -> SimpleNode {
    match node {
        SimpleNode::Function { name, dependencies } => SimpleNode::Function {
            name: name.clone(),
            dependencies: replace_dependencies(dependencies, table),
        },
        SimpleNode::Bot { name, dependencies } => SimpleNode::Bot {
            name: name.clone(),
            dependencies: replace_dependencies(dependencies, table),
        },
        SimpleNode::Tag { name, dependencies } => SimpleNode::Tag {
            name: name.clone(),
            dependencies: replace_dependencies(dependencies, table),
        },
        SimpleNode::ObjectExpression { properties } => SimpleNode::ObjectExpression {
            properties: properties
                .iter()
                .map(|prop| SimpleProperty {
                    name: prop.name.clone(),
                    value: replace_dependencies(std::slice::from_ref(&prop.value), table)
                        .into_iter()
                        .next()
                        .unwrap_or_else(|| prop.value.clone()),
                })
                .collect(),
        },
        other => other.clone(),
    }
}

/// Replace using the fixed built-in accessor table.
pub fn replace_aux_dependencies(nodes: &[SimpleNode]) -> Vec<SimpleNode> {
    replace_dependencies(nodes, aux_table())
}

/// Strip one leading tag/bot marker from a tag name.
pub fn trim_tag(tag: &str) -> &str {
    tag.strip_prefix(['#', '@']).unwrap_or(tag)
}

// ── built-in table ──

/// Filter helpers that may appear as the first argument of a bot query.
const FILTER_HELPERS: &[&str] = &[
    "byTag",
    "inDimension",
    "atPosition",
    "inStack",
    "byCreator",
    "bySpace",
    "byMod",
];

/// The built-in accessor rules shared by every `replace_aux_dependencies`
/// call.
pub fn aux_table() -> &'static ReplacementTable {
    static TABLE: OnceLock<ReplacementTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        ReplacementTable::new()
            .with_rule("getBot", bot_query)
            .with_rule("getBots", bot_query)
            .with_rule("getBotTagValues", tag_values_query)
            .with_rule("byTag", by_tag)
            .with_rule("inDimension", in_dimension)
            .with_rule("atPosition", positional_filter)
            .with_rule("inStack", positional_filter)
            .with_rule("byCreator", by_creator)
            .with_rule("bySpace", by_space)
            .with_rule("byMod", by_mod)
            .with_rule("getTag", get_tag)
            .with_rule("tags", tag_record_access)
            .with_rule("raw", tag_record_access)
            .with_rule("creator", bot_link("creator"))
            .with_rule("config", bot_link("configBot"))
            .with_rule("configTag", dynamic_tag)
            .with_rule("tagName", dynamic_tag)
            .with_rule("player.getCurrentDimension", portal("pagePortal"))
            .with_rule("player.getMenuDimension", portal("menuPortal"))
            .with_rule("player.getInventoryDimension", portal("inventoryPortal"))
            .with_rule("player.getCurrentStory", portal("story"))
            .with_rule("player.hasBotInInventory", |_, _| vec![SimpleNode::All])
    })
}

/// The arguments of a function node, excluding any member chain appended
/// after the `end_function_parameters` marker.
fn call_args(node: &SimpleNode) -> &[SimpleNode] {
    let dependencies = node.dependencies();
    let end = dependencies
        .iter()
        .position(|d| matches!(d, SimpleNode::EndFunctionParameters))
        .unwrap_or(dependencies.len());
    &dependencies[..end]
}

/// A tag name resolves only from a literal string argument.
fn literal_tag_name(node: &SimpleNode) -> Option<String> {
    match node {
        SimpleNode::Literal {
            value: LiteralValue::String(s),
        } => Some(trim_tag(s).to_string()),
        _ => None,
    }
}

/// The first string-literal argument, for helpers whose name argument is
/// not in a fixed position.
fn first_literal_tag_name(args: &[SimpleNode]) -> Option<String> {
    args.iter().find_map(literal_tag_name)
}

fn bot_query(node: &SimpleNode, table: &ReplacementTable) -> Vec<SimpleNode> {
    let args = call_args(node);
    let Some(first) = args.first() else {
        return vec![SimpleNode::bot("id", Vec::new())];
    };
    // A filter-helper first argument means the whole argument list is a
    // filter expression; the helpers name the dependencies themselves.
    if let SimpleNode::Function { name, .. } = first {
        if FILTER_HELPERS.contains(&name.as_str()) {
            return replace_dependencies(args, table);
        }
    }
    match literal_tag_name(first) {
        Some(name) => vec![SimpleNode::bot(
            name,
            replace_dependencies(&args[1..], table),
        )],
        None => vec![SimpleNode::All],
    }
}

fn tag_values_query(node: &SimpleNode, table: &ReplacementTable) -> Vec<SimpleNode> {
    let args = call_args(node);
    let Some(first) = args.first() else {
        return Vec::new();
    };
    match literal_tag_name(first) {
        Some(name) => vec![SimpleNode::tag(
            name,
            replace_dependencies(&args[1..], table),
        )],
        None => vec![SimpleNode::All],
    }
}

fn by_tag(node: &SimpleNode, table: &ReplacementTable) -> Vec<SimpleNode> {
    let args = call_args(node);
    let Some(first) = args.first() else {
        return vec![SimpleNode::bot("id", Vec::new())];
    };
    match literal_tag_name(first) {
        Some(name) => vec![SimpleNode::bot(
            name,
            replace_dependencies(&args[1..], table),
        )],
        None => vec![SimpleNode::All],
    }
}

fn in_dimension(node: &SimpleNode, _table: &ReplacementTable) -> Vec<SimpleNode> {
    match first_literal_tag_name(call_args(node)) {
        Some(name) => vec![SimpleNode::bot(name, Vec::new())],
        None => vec![SimpleNode::All],
    }
}

/// `atPosition` / `inStack` depend on the dimension tag and its X/Y
/// coordinate companions.
fn positional_filter(node: &SimpleNode, _table: &ReplacementTable) -> Vec<SimpleNode> {
    match first_literal_tag_name(call_args(node)) {
        Some(name) => vec![
            SimpleNode::bot(name.clone(), Vec::new()),
            SimpleNode::bot(format!("{name}X"), Vec::new()),
            SimpleNode::bot(format!("{name}Y"), Vec::new()),
        ],
        None => vec![SimpleNode::All],
    }
}

fn by_creator(_node: &SimpleNode, _table: &ReplacementTable) -> Vec<SimpleNode> {
    vec![SimpleNode::bot("creator", Vec::new())]
}

fn by_space(node: &SimpleNode, _table: &ReplacementTable) -> Vec<SimpleNode> {
    vec![SimpleNode::bot("space", call_args(node).to_vec())]
}

fn by_mod(node: &SimpleNode, _table: &ReplacementTable) -> Vec<SimpleNode> {
    let args = call_args(node);
    match args.first() {
        Some(SimpleNode::ObjectExpression { properties }) => properties
            .iter()
            .map(|prop| SimpleNode::bot(trim_tag(&prop.name), Vec::new()))
            .collect(),
        _ => vec![SimpleNode::All],
    }
}

fn get_tag(node: &SimpleNode, table: &ReplacementTable) -> Vec<SimpleNode> {
    let args = call_args(node);
    if args.len() < 2 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for (i, arg) in args[1..].iter().enumerate() {
        match literal_tag_name(arg) {
            Some(name) => {
                // The first named tag carries the target expression's own
                // dependencies.
                let dependencies = if i == 0 {
                    replace_dependencies(&args[..1], table)
                } else {
                    Vec::new()
                };
                out.push(SimpleNode::tag_value(TagName::literal(name), dependencies));
            }
            None => out.push(SimpleNode::All),
        }
    }
    out
}

/// `tags.*` / `raw.*`: each sub-member is a read of that tag's value on
/// the current bot. A bare record access, or a segment with no visible
/// name at all, cannot be narrowed.
fn tag_record_access(node: &SimpleNode, _table: &ReplacementTable) -> Vec<SimpleNode> {
    let segments = node.dependencies();
    if segments.is_empty() {
        return vec![SimpleNode::All];
    }
    segments
        .iter()
        .map(|segment| match segment {
            SimpleNode::Member { name, .. } if !name.is_empty() => {
                SimpleNode::tag_value(TagName::literal(name.clone()), Vec::new())
            }
            SimpleNode::Member {
                reference: Some(_), ..
            } => SimpleNode::tag_value(TagName::Dynamic, Vec::new()),
            _ => SimpleNode::All,
        })
        .collect()
}

/// Bare `creator` / `config` read the bot link stored under a fixed tag.
fn bot_link(
    tag: &'static str,
) -> impl Fn(&SimpleNode, &ReplacementTable) -> Vec<SimpleNode> + Send + Sync {
    move |node, table| {
        vec![SimpleNode::tag_value(
            TagName::literal(tag),
            replace_dependencies(node.dependencies(), table),
        )]
    }
}

/// `configTag` / `tagName` read a tag whose name is only known at runtime.
fn dynamic_tag(_node: &SimpleNode, _table: &ReplacementTable) -> Vec<SimpleNode> {
    vec![SimpleNode::tag_value(TagName::Dynamic, Vec::new())]
}

/// Portal accessors resolve to a fixed player-tag dependency, discarding
/// anything passed in.
fn portal(
    tag: &'static str,
) -> impl Fn(&SimpleNode, &ReplacementTable) -> Vec<SimpleNode> + Send + Sync {
    move |_, _| vec![SimpleNode::tag(tag, Vec::new())]
}

// ── Tests ──
