// Dependency flattening.
//
// Pre-order expansion of replaced descriptors: `bot`, `tag`, `function`,
// and `tag_value` nodes emit themselves followed by their flattened
// dependencies; every other node kind passes through unexpanded. Inputs
// are acyclic by construction, so the walk terminates.

use crate::node::SimpleNode;

/// Flatten `nodes` in pre-order, preserving relative order.
pub fn flatten(nodes: &[SimpleNode]) -> Vec<SimpleNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        out.push(node.clone());
        match node {
            SimpleNode::Bot { dependencies, .. }
            | SimpleNode::Tag { dependencies, .. }
            | SimpleNode::Function { dependencies, .. }
            | SimpleNode::TagValue { dependencies, .. } => {
                out.extend(flatten(dependencies));
            }
            _ => {}
        }
    }
    out
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TagName;

    #[test]
    fn nested_tag_values_surface_exactly_once_in_order() {
        let input = vec![SimpleNode::tag_value(
            TagName::literal("outer"),
            vec![
                SimpleNode::tag_value(
                    TagName::literal("middle"),
                    vec![SimpleNode::tag_value(TagName::literal("inner"), Vec::new())],
                ),
                SimpleNode::tag_value(TagName::literal("sibling"), Vec::new()),
            ],
        )];
        let names: Vec<_> = flatten(&input)
            .into_iter()
            .map(|node| match node {
                SimpleNode::TagValue {
                    name: TagName::Literal(name),
                    ..
                } => name,
                other => panic!("unexpected node {other:?}"),
            })
            .collect();
        assert_eq!(names, ["outer", "middle", "inner", "sibling"]);
    }

    #[test]
    fn non_expandable_nodes_pass_through() {
        let input = vec![
            SimpleNode::This,
            SimpleNode::All,
            SimpleNode::member("abc"),
        ];
        assert_eq!(flatten(&input), input);
    }

    #[test]
    fn bot_dependencies_follow_their_owner() {
        let input = vec![
            SimpleNode::bot("a", vec![SimpleNode::tag("t", Vec::new())]),
            SimpleNode::bot("b", Vec::new()),
        ];
        assert_eq!(
            flatten(&input),
            vec![
                SimpleNode::bot("a", vec![SimpleNode::tag("t", Vec::new())]),
                SimpleNode::tag("t", Vec::new()),
                SimpleNode::bot("b", Vec::new()),
            ]
        );
    }
}
