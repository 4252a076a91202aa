// End-to-end tests for the dependency analysis pipeline.
//
// Feeds formula source through macro substitution, parsing, tree building,
// simplification, accessor replacement, flattening, and the scheduler
// filter, asserting on the final descriptor lists and their JSON wire form.

use fcc::node::{LiteralValue, Node, SimpleNode, TagName};
use fcc::pipeline::{calculate_aux_dependencies, dependency_tree};
use serde_json::json;

fn lit(s: &str) -> SimpleNode {
    SimpleNode::Literal {
        value: LiteralValue::String(s.to_string()),
    }
}

#[test]
fn get_bot_with_literal_tag() {
    assert_eq!(
        calculate_aux_dependencies(r##"getBot("#tag")"##),
        vec![SimpleNode::bot("tag", Vec::new())]
    );
}

#[test]
fn get_tag_resolves_target_and_name() {
    assert_eq!(
        calculate_aux_dependencies(r##"getTag(abc, "#def")"##),
        vec![SimpleNode::tag_value(
            TagName::literal("def"),
            vec![SimpleNode::member("abc")]
        )]
    );
}

#[test]
fn truncated_source_yields_no_dependencies() {
    assert_eq!(calculate_aux_dependencies("getTag(abc"), Vec::new());
}

#[test]
fn unparseable_garbage_yields_no_dependencies() {
    assert_eq!(calculate_aux_dependencies("let = = ;"), Vec::new());
}

#[test]
fn dependency_tree_wraps_tag_literals_in_members() {
    for source in [r##"#tag("a").x + #tag("b").x"##, r#"@tag("a").x + @tag("b").x"#] {
        let tree = dependency_tree(source).unwrap_or_else(|e| panic!("{source:?}: {e}"));
        let Node::Expression { dependencies } = tree else {
            panic!("expected expression root");
        };
        assert_eq!(dependencies.len(), 2);
        for (node, expected) in dependencies.iter().zip(["a", "b"]) {
            let Node::Member {
                object: Some(object),
                ..
            } = node
            else {
                panic!("expected member wrapping a literal, got {node:?}");
            };
            let (name, deps) = match object.as_ref() {
                Node::Tag { name, dependencies } | Node::Bot { name, dependencies } => {
                    (name, dependencies)
                }
                other => panic!("expected tag/bot root, got {other:?}"),
            };
            assert_eq!(name, "tag");
            assert_eq!(
                deps,
                &vec![Node::Literal {
                    value: LiteralValue::String(expected.to_string())
                }]
            );
        }
    }
}

#[test]
fn filter_helpers_inside_bot_queries() {
    assert_eq!(
        calculate_aux_dependencies(r##"getBots("#color", byTag("#height"))"##),
        vec![
            SimpleNode::bot("color", vec![SimpleNode::bot("height", Vec::new())]),
            SimpleNode::bot("height", Vec::new()),
        ]
    );
}

#[test]
fn mod_filters_read_one_tag_per_property() {
    assert_eq!(
        calculate_aux_dependencies(r##"getBots(byMod({ color: "red", "#height": 2 }))"##),
        vec![
            SimpleNode::bot("color", Vec::new()),
            SimpleNode::bot("height", Vec::new()),
        ]
    );
}

#[test]
fn tag_record_access_reads_one_tag() {
    assert_eq!(
        calculate_aux_dependencies("tags.abc"),
        vec![SimpleNode::tag_value(TagName::literal("abc"), Vec::new())]
    );
    assert_eq!(
        calculate_aux_dependencies("raw.abc"),
        vec![SimpleNode::tag_value(TagName::literal("abc"), Vec::new())]
    );
}

#[test]
fn this_reference_survives_the_filter() {
    assert_eq!(
        calculate_aux_dependencies("this.name === 'ball'"),
        vec![SimpleNode::This]
    );
}

#[test]
fn portal_accessor_is_a_fixed_tag() {
    assert_eq!(
        calculate_aux_dependencies("player.getCurrentDimension()"),
        vec![SimpleNode::tag("pagePortal", Vec::new())]
    );
}

#[test]
fn unknown_helpers_expose_their_arguments() {
    // The helper itself is filtered out, but the accessor inside it
    // surfaces through flattening.
    assert_eq!(
        calculate_aux_dependencies(r##"myHelper(getBot("#x"))"##),
        vec![SimpleNode::bot("x", Vec::new())]
    );
}

#[test]
fn non_literal_tag_names_are_wildcards() {
    assert_eq!(
        calculate_aux_dependencies("getBot(someVar)"),
        vec![SimpleNode::All]
    );
}

#[test]
fn macro_marker_and_curly_quotes_are_normalized() {
    assert_eq!(
        calculate_aux_dependencies("🧬getBot(“#tag”)"),
        vec![SimpleNode::bot("tag", Vec::new())]
    );
}

#[test]
fn callback_arguments_contribute_dependencies() {
    // The callback body's member access rides along as a dependency of
    // the bot query.
    assert_eq!(
        calculate_aux_dependencies(r##"getBots("#color", b => b.other)"##),
        vec![SimpleNode::bot(
            "color",
            vec![SimpleNode::Member {
                name: "b.other".to_string(),
                reference: None,
                dependencies: vec![SimpleNode::member("other")],
            }]
        )]
    );
}

#[test]
fn dependencies_serialize_with_wire_tags() {
    let deps = calculate_aux_dependencies(r##"getTag(abc, "#def")"##);
    assert_eq!(
        serde_json::to_value(&deps).unwrap(),
        json!([{
            "type": "tag_value",
            "name": "def",
            "dependencies": [{
                "type": "member",
                "name": "abc",
                "reference": null,
                "dependencies": []
            }]
        }])
    );
}

#[test]
fn literal_only_formulas_have_no_dependencies() {
    assert_eq!(calculate_aux_dependencies("1 + 2 * 3"), Vec::new());
    assert_eq!(calculate_aux_dependencies(r#""hello""#), Vec::new());
}

#[test]
fn simplified_literals_pass_through_replacement() {
    // Literal arguments that never resolve to a tag name are preserved in
    // place for the rules that want them.
    let nodes = vec![SimpleNode::function("getBots", vec![lit("#a"), lit("b")])];
    assert_eq!(
        fcc::replace::replace_aux_dependencies(&nodes),
        vec![SimpleNode::bot("a", vec![lit("b")])]
    );
}
