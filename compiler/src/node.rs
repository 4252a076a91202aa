// Dependency node types.
//
// Two closed sums: the raw `Node` tree produced by the tree builder
// (mirroring program structure) and the `SimpleNode` descriptors produced
// by the simplifier and consumed by the replacer/flattener. Both serialize
// with a `type` tag so the external scheduler can consume them as JSON.
//
// All nodes are immutable values built fresh per analyze call; the replacer
// always yields new nodes rather than editing in place.
//
// Preconditions: none (data-only module).
// Postconditions: none (data-only module).
// Failure modes: none.
// Side effects: none.

use serde::Serialize;

/// A literal value appearing in a formula.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

/// One node of the raw dependency tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Top-level container for a parsed script.
    Expression { dependencies: Vec<Node> },
    /// A property access. `identifier` is the statically known name;
    /// `reference` is the index expression's identifier when the access is
    /// computed through a simple identifier; both `None` means the name
    /// cannot be determined statically.
    Member {
        identifier: Option<String>,
        reference: Option<String>,
        object: Option<Box<Node>>,
    },
    /// A function/method invocation. `identifier` is the callee expressed
    /// as a member/tag/bot chain.
    Call {
        identifier: Box<Node>,
        dependencies: Vec<Node>,
    },
    /// `#name(...)` dialect literal.
    Tag { name: String, dependencies: Vec<Node> },
    /// `@name(...)` dialect literal.
    Bot { name: String, dependencies: Vec<Node> },
    Literal { value: LiteralValue },
    ObjectExpression { properties: Vec<PropertyNode> },
}

/// A key/value entry of an `object_expression`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "property")]
pub struct PropertyNode {
    pub name: String,
    pub value: Node,
}

/// A tag name in a simplified descriptor: statically known, or only
/// determinable at runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagName {
    Literal(String),
    /// The accessing expression names the tag dynamically. Serializes as
    /// `null`.
    Dynamic,
}

impl TagName {
    pub fn literal(name: impl Into<String>) -> Self {
        TagName::Literal(name.into())
    }
}

/// A simplified (canonical) dependency descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimpleNode {
    /// A dependency on a bot query by tag name.
    Bot {
        name: String,
        dependencies: Vec<SimpleNode>,
    },
    /// A dependency on every value of a tag across bots.
    Tag {
        name: String,
        dependencies: Vec<SimpleNode>,
    },
    /// A call by qualified name. Dependencies hold the call's arguments,
    /// then an `end_function_parameters` marker, then any member accesses
    /// chained after the call.
    Function {
        name: String,
        dependencies: Vec<SimpleNode>,
    },
    /// A canonical member access chain. `name` is the outer-to-inner
    /// dot-joined path; `dependencies` hold the segments beyond the root,
    /// innermost first.
    Member {
        name: String,
        reference: Option<String>,
        dependencies: Vec<SimpleNode>,
    },
    Literal { value: LiteralValue },
    /// Wildcard: depends on everything, cannot be narrowed.
    All,
    /// Depends on the implicit receiver.
    This,
    /// A single mutable tag read.
    TagValue {
        name: TagName,
        dependencies: Vec<SimpleNode>,
    },
    ObjectExpression { properties: Vec<SimpleProperty> },
    Property {
        name: String,
        value: Box<SimpleNode>,
    },
    /// Boundary between a function's resolved call arguments and the
    /// member accesses chained after the call.
    EndFunctionParameters,
}

/// A key/value entry of a simplified `object_expression`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "property")]
pub struct SimpleProperty {
    pub name: String,
    pub value: SimpleNode,
}

impl SimpleNode {
    pub fn bot(name: impl Into<String>, dependencies: Vec<SimpleNode>) -> Self {
        SimpleNode::Bot {
            name: name.into(),
            dependencies,
        }
    }

    pub fn tag(name: impl Into<String>, dependencies: Vec<SimpleNode>) -> Self {
        SimpleNode::Tag {
            name: name.into(),
            dependencies,
        }
    }

    pub fn function(name: impl Into<String>, dependencies: Vec<SimpleNode>) -> Self {
        SimpleNode::Function {
            name: name.into(),
            dependencies,
        }
    }

    pub fn member(name: impl Into<String>) -> Self {
        SimpleNode::Member {
            name: name.into(),
            reference: None,
            dependencies: Vec::new(),
        }
    }

    pub fn tag_value(name: TagName, dependencies: Vec<SimpleNode>) -> Self {
        SimpleNode::TagValue { name, dependencies }
    }

    /// The dependency list carried by this node, if it has one.
    pub fn dependencies(&self) -> &[SimpleNode] {
        match self {
            SimpleNode::Bot { dependencies, .. }
            | SimpleNode::Tag { dependencies, .. }
            | SimpleNode::Function { dependencies, .. }
            | SimpleNode::Member { dependencies, .. }
            | SimpleNode::TagValue { dependencies, .. } => dependencies,
            _ => &[],
        }
    }
}
