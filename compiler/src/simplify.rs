// Dependency simplifier.
//
// Collapses raw dependency trees into flat canonical descriptors. Member
// chains are resolved down to their root: a chain rooted at a call becomes
// the call's `function` node with the trailing segments appended after an
// `end_function_parameters` marker; rooted at a tag/bot literal the chain
// is discarded and the literal survives; rooted at `this` the whole chain
// is a bare `this` marker; anything else collapses to one canonical member
// node.
//
// Preconditions: input from `tree::build`.
// Postconditions: output nodes reference no raw `Node` structure.
// Failure modes: none (total).
// Side effects: none.

use crate::node::{LiteralValue, Node, SimpleNode, SimpleProperty};

/// Simplify one raw node into its canonical descriptors.
pub fn simplify(node: &Node) -> Vec<SimpleNode> {
    match node {
        Node::Expression { dependencies } => simplify_all(dependencies),
        Node::Literal { value } => vec![SimpleNode::Literal {
            value: value.clone(),
        }],
        Node::Tag { name, dependencies } => vec![SimpleNode::tag(
            name.clone(),
            simplify_all(dependencies),
        )],
        Node::Bot { name, dependencies } => vec![SimpleNode::bot(
            name.clone(),
            simplify_all(dependencies),
        )],
        Node::Call { .. } => simplify_call(node),
        Node::Member { .. } => simplify_member(node),
        Node::ObjectExpression { properties } => vec![SimpleNode::ObjectExpression {
            properties: properties
                .iter()
                .map(|prop| SimpleProperty {
                    name: prop.name.clone(),
                    value: simplify(&prop.value)
                        .into_iter()
                        .next()
                        .unwrap_or(SimpleNode::Literal {
                            value: LiteralValue::Null,
                        }),
                })
                .collect(),
        }],
    }
}

/// Simplify a list of sibling nodes, concatenating the results in order.
pub fn simplify_all(nodes: &[Node]) -> Vec<SimpleNode> {
    nodes.iter().flat_map(simplify).collect()
}

/// The qualified name of a member/call/tag/bot chain, joined root→outward
/// with `.`. A call link renders as the segment `()`; a segment with no
/// statically known name renders empty.
pub fn member_name(node: &Node) -> String {
    let mut segments = Vec::new();
    push_name_segments(node, &mut segments);
    segments.join(".")
}

fn push_name_segments(node: &Node, out: &mut Vec<String>) {
    match node {
        Node::Member {
            identifier,
            reference,
            object,
        } => {
            if let Some(object) = object {
                push_name_segments(object, out);
            }
            out.push(
                identifier
                    .clone()
                    .or_else(|| reference.clone())
                    .unwrap_or_default(),
            );
        }
        Node::Call { identifier, .. } => {
            push_name_segments(identifier, out);
            out.push("()".to_string());
        }
        Node::Tag { name, .. } | Node::Bot { name, .. } => out.push(name.clone()),
        _ => out.push(String::new()),
    }
}

// ── chain resolution ──

/// One `.segment` of a member chain, root excluded.
struct Segment {
    name: Option<String>,
    reference: Option<String>,
}

impl Segment {
    fn into_node(self) -> SimpleNode {
        SimpleNode::Member {
            name: self.name.unwrap_or_default(),
            reference: self.reference,
            dependencies: Vec::new(),
        }
    }
}

/// What a member chain bottoms out at.
enum ChainRoot<'a> {
    /// A plain identifier (or unresolvable object); the first collected
    /// segment is the root itself.
    Plain,
    Call(&'a Node),
    TagOrBot(&'a Node),
}

/// Walk a member chain down to its root, collecting segments root-first.
fn resolve_chain(node: &Node) -> (ChainRoot<'_>, Vec<Segment>) {
    let mut segments = Vec::new();
    let mut current = node;
    let root = loop {
        match current {
            Node::Member {
                identifier,
                reference,
                object,
            } => {
                segments.push(Segment {
                    name: identifier.clone(),
                    reference: reference.clone(),
                });
                match object {
                    Some(object) => current = object,
                    None => break ChainRoot::Plain,
                }
            }
            Node::Call { .. } => break ChainRoot::Call(current),
            Node::Tag { .. } | Node::Bot { .. } => break ChainRoot::TagOrBot(current),
            _ => break ChainRoot::Plain,
        }
    };
    segments.reverse();
    (root, segments)
}

fn simplify_member(node: &Node) -> Vec<SimpleNode> {
    let (root, mut segments) = resolve_chain(node);
    match root {
        ChainRoot::Plain => {
            if segments.first().and_then(|s| s.name.as_deref()) == Some("this") {
                return vec![SimpleNode::This];
            }
            let name = segments
                .iter()
                .map(|s| s.name.clone().unwrap_or_default())
                .collect::<Vec<_>>()
                .join(".");
            let reference = if segments.len() == 1 {
                segments[0].reference.clone()
            } else {
                None
            };
            let dependencies = segments
                .split_off(1)
                .into_iter()
                .map(Segment::into_node)
                .collect();
            vec![SimpleNode::Member {
                name,
                reference,
                dependencies,
            }]
        }
        // The trailing segments attach to the call's descriptor after a
        // marker separating them from the resolved arguments.
        ChainRoot::Call(call) => {
            let mut nodes = simplify_call(call);
            if let Some(SimpleNode::Function { dependencies, .. }) = nodes.first_mut() {
                dependencies.push(SimpleNode::EndFunctionParameters);
                dependencies.extend(segments.into_iter().map(Segment::into_node));
            }
            nodes
        }
        // Accessing members of a tag/bot literal still depends on exactly
        // that tag/bot.
        ChainRoot::TagOrBot(root) => simplify(root),
    }
}

fn simplify_call(node: &Node) -> Vec<SimpleNode> {
    let Node::Call {
        identifier,
        dependencies,
    } = node
    else {
        return simplify(node);
    };
    let args = simplify_all(dependencies);
    // Calling through a tag/bot literal keeps the literal as the
    // dependency; the call itself adds nothing nameable.
    let (root, _) = resolve_chain(identifier);
    if let ChainRoot::TagOrBot(root) = root {
        let mut nodes = simplify(root);
        nodes.extend(args);
        return nodes;
    }
    vec![SimpleNode::function(member_name(identifier), args)]
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::tree;

    fn simplified(source: &str) -> Vec<SimpleNode> {
        simplify(&tree::build(&parse(source).expect("parse")))
    }

    #[test]
    fn call_arguments_are_simplified_in_order() {
        assert_eq!(
            simplified(r##"getTag(abc, "#def")"##),
            vec![SimpleNode::function(
                "getTag",
                vec![
                    SimpleNode::member("abc"),
                    SimpleNode::Literal {
                        value: LiteralValue::String("#def".to_string())
                    },
                ]
            )]
        );
    }

    #[test]
    fn member_chain_after_call_is_split_off_by_marker() {
        assert_eq!(
            simplified(r##"getBots("#x").first.second"##),
            vec![SimpleNode::function(
                "getBots",
                vec![
                    SimpleNode::Literal {
                        value: LiteralValue::String("#x".to_string())
                    },
                    SimpleNode::EndFunctionParameters,
                    SimpleNode::member("first"),
                    SimpleNode::member("second"),
                ]
            )]
        );
    }

    #[test]
    fn this_chains_collapse_to_a_marker() {
        assert_eq!(simplified("this"), vec![SimpleNode::This]);
        assert_eq!(simplified("this.name.length"), vec![SimpleNode::This]);
    }

    #[test]
    fn member_chain_keeps_sub_segments_as_dependencies() {
        assert_eq!(
            simplified("tags.abc"),
            vec![SimpleNode::Member {
                name: "tags.abc".to_string(),
                reference: None,
                dependencies: vec![SimpleNode::member("abc")],
            }]
        );
    }

    #[test]
    fn computed_segment_carries_its_reference() {
        let nodes = simplified("tags[myVar]");
        let SimpleNode::Member { dependencies, .. } = &nodes[0] else {
            panic!("expected member, got {nodes:?}");
        };
        assert_eq!(
            dependencies,
            &vec![SimpleNode::Member {
                name: String::new(),
                reference: Some("myVar".to_string()),
                dependencies: Vec::new(),
            }]
        );
    }

    #[test]
    fn tag_literal_member_access_keeps_the_literal() {
        assert_eq!(
            simplified(r#"#tag("a").x"#),
            vec![SimpleNode::tag(
                "tag",
                vec![SimpleNode::Literal {
                    value: LiteralValue::String("a".to_string())
                }]
            )]
        );
    }

    #[test]
    fn qualified_function_names_join_with_dots() {
        assert_eq!(
            simplified("player.getCurrentDimension()"),
            vec![SimpleNode::function("player.getCurrentDimension", vec![])]
        );
    }
}
