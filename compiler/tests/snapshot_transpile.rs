// Snapshot tests: lock the rewriter's output to detect unintended changes
// to the guard-insertion policy.
//
// Uses inline snapshots; run `cargo insta review` after intentional output
// changes to update baselines.

use fcc::transpile::Transpiler;
use insta::assert_snapshot;

fn transpiled(source: &str) -> String {
    Transpiler::new()
        .transpile(source)
        .unwrap_or_else(|e| panic!("transpile failed for {source:?}: {e}"))
}

#[test]
fn empty_body_loop() {
    assert_snapshot!(transpiled("while(true);"), @"while(true)guard();");
}

#[test]
fn block_body_loop() {
    assert_snapshot!(
        transpiled("for(let i=0;i<3;i++){go();}"),
        @"for(let i=0;i<3;i++){guard();go();}"
    );
}

#[test]
fn nested_single_statement_loops() {
    assert_snapshot!(
        transpiled("while(a) while(b) x();"),
        @"while(a) {guard();while(b) {guard();x();}}"
    );
}

#[test]
fn loop_in_arrow_function() {
    assert_snapshot!(
        transpiled("let run = () => { while(busy) step(); };"),
        @"let run = () => { while(busy) {guard();step();} };"
    );
}

#[test]
fn multi_line_script() {
    let source = "let total = 0;\nfor(let b of getBots(\"#score\")) {\ntotal += b;\n}\ntotal";
    assert_snapshot!(transpiled(source), @r###"
    let total = 0;
    for(let b of getBots("#score")) {guard();
    total += b;
    }
    total
    "###);
}
