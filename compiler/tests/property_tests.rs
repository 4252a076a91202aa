// Property-based tests for compiler invariants.
//
// Two categories:
// 1. Location math: index ⇄ (line, column) conversions are mutual inverses
//    for every valid pair.
// 2. Guard injection: generated loop nests receive exactly one guard call
//    per loop node, whatever the body shapes.
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use fcc::text::{index_from_location, location_from_index};
use fcc::transpile::Transpiler;
use proptest::prelude::*;

// ── generators ──────────────────────────────────────────────────────────────

/// A loop nest `depth` levels deep, each level drawing one of the body
/// shapes the rewriter distinguishes.
fn arb_loop_nest() -> impl Strategy<Value = (String, usize)> {
    let depth = 1usize..6;
    let shapes = proptest::collection::vec(0u8..4, 1..6);
    (depth, shapes).prop_map(|(depth, shapes)| {
        let mut source = "x();".to_string();
        for level in 0..depth {
            let shape = shapes[level % shapes.len()];
            source = match shape {
                // block body
                0 => format!("while(a{level}){{ {source} }}"),
                // single-statement body
                1 => format!("while(a{level}) {source}"),
                // classic for with block body
                2 => format!("for(i{level} = 0; i{level} < 2; i{level}++){{ {source} }}"),
                // do-while with block body
                _ => format!("do {{ {source} }} while(a{level});"),
            };
        }
        (source, depth)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn location_and_index_are_mutual_inverses(
        text in "[a-z \\n]{0,60}",
        index in 0usize..64,
    ) {
        let index = index.min(text.len());
        let location = location_from_index(&text, index);
        prop_assert_eq!(index_from_location(&text, location), index);
    }

    #[test]
    fn every_loop_gets_exactly_one_guard((source, depth) in arb_loop_nest()) {
        let transpiler = Transpiler::new();
        let code = transpiler
            .transpile(&source)
            .unwrap_or_else(|e| panic!("generated source failed to parse: {source:?}: {e}"));
        let guards = code.matches("guard()").count();
        prop_assert_eq!(guards, depth, "source: {:?}, rewritten: {:?}", source, code);
    }

    #[test]
    fn rewriting_never_loses_original_text(
        cond in "[a-z]{1,8}",
        body in "[a-z]{1,8}",
    ) {
        // Prefixed so generated names never collide with keywords.
        let source = format!("while(c{cond}) b{body}();");
        let transpiler = Transpiler::new();
        let code = transpiler.transpile(&source).unwrap();
        // Guard injection only adds text.
        let expected_cond = format!("while(c{cond})");
        let expected_body = format!("b{body}();");
        prop_assert!(code.contains(&expected_cond));
        prop_assert!(code.contains(&expected_body));
        prop_assert!(code.len() > source.len());
    }
}
