// Dependency tree builder.
//
// Walks a parsed formula top-down and produces one raw dependency node per
// recognized construct. Function and arrow bodies are skipped — their free
// variables are not dependencies of the enclosing expression — except when
// a function literal is passed as a call argument, in which case the body's
// dependencies are collected into the call's dependency list.
//
// Preconditions: input AST from `parser::parse`.
// Postconditions: returns an `expression` node owning all collected deps.
// Failure modes: none (total over the AST).
// Side effects: none.

use crate::ast::*;
use crate::node::{LiteralValue, Node, PropertyNode};

/// Build the raw dependency tree for a parsed program.
pub fn build(program: &Program) -> Node {
    let mut dependencies = Vec::new();
    for stmt in &program.statements {
        collect_stmt(stmt, &mut dependencies);
    }
    Node::Expression { dependencies }
}

fn collect_stmt(stmt: &Stmt, out: &mut Vec<Node>) {
    match &stmt.kind {
        StmtKind::Expr(expr) => collect_expr(expr, out),
        StmtKind::VarDecl { decls, .. } => {
            for decl in decls {
                if let Some(init) = &decl.init {
                    collect_expr(init, out);
                }
            }
        }
        StmtKind::Block(stmts) => {
            for s in stmts {
                collect_stmt(s, out);
            }
        }
        StmtKind::If {
            test,
            consequent,
            alternate,
        } => {
            collect_expr(test, out);
            collect_stmt(consequent, out);
            if let Some(alt) = alternate {
                collect_stmt(alt, out);
            }
        }
        StmtKind::While { test, body } => {
            collect_expr(test, out);
            collect_stmt(body, out);
        }
        StmtKind::DoWhile { body, test } => {
            collect_stmt(body, out);
            collect_expr(test, out);
        }
        StmtKind::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Decl(_, decls)) => {
                    for decl in decls {
                        if let Some(i) = &decl.init {
                            collect_expr(i, out);
                        }
                    }
                }
                Some(ForInit::Expr(e)) => collect_expr(e, out),
                None => {}
            }
            if let Some(test) = test {
                collect_expr(test, out);
            }
            if let Some(update) = update {
                collect_expr(update, out);
            }
            collect_stmt(body, out);
        }
        StmtKind::ForIn { right, body, .. } | StmtKind::ForOf { right, body, .. } => {
            collect_expr(right, out);
            collect_stmt(body, out);
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                collect_expr(value, out);
            }
        }
        StmtKind::Throw(value) => collect_expr(value, out),
        StmtKind::Try {
            block,
            catch,
            finally,
        } => {
            collect_stmt(block, out);
            if let Some(catch) = catch {
                collect_stmt(&catch.body, out);
            }
            if let Some(finally) = finally {
                collect_stmt(finally, out);
            }
        }
        // Function bodies are not dependencies of the enclosing scope.
        StmtKind::FunctionDecl(_) => {}
        StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
    }
}

fn collect_expr(expr: &Expr, out: &mut Vec<Node>) {
    match &expr.kind {
        ExprKind::Number(n) => out.push(Node::Literal {
            value: LiteralValue::Number(*n),
        }),
        ExprKind::Str(s) => out.push(Node::Literal {
            value: LiteralValue::String(s.clone()),
        }),
        ExprKind::Bool(b) => out.push(Node::Literal {
            value: LiteralValue::Bool(*b),
        }),
        ExprKind::Null => out.push(Node::Literal {
            value: LiteralValue::Null,
        }),
        // A bare identifier is a root member with no object.
        ExprKind::Ident(name) => out.push(Node::Member {
            identifier: Some(name.clone()),
            reference: None,
            object: None,
        }),
        ExprKind::This => out.push(Node::Member {
            identifier: Some("this".to_string()),
            reference: None,
            object: None,
        }),
        ExprKind::TagRef { marker, name, args } => {
            let mut dependencies = Vec::new();
            if let Some(args) = args {
                for arg in args {
                    collect_expr(arg, &mut dependencies);
                }
            }
            out.push(match marker {
                Marker::Tag => Node::Tag {
                    name: name.clone(),
                    dependencies,
                },
                Marker::Bot => Node::Bot {
                    name: name.clone(),
                    dependencies,
                },
            });
        }
        ExprKind::Member { object, property } => {
            let (identifier, reference) = member_key(property);
            let object_node = single_node(object);
            // A complex object that did not collapse to one node still
            // contributes its dependencies as siblings.
            if object_node.is_none() {
                collect_expr(object, out);
            }
            out.push(Node::Member {
                identifier,
                reference,
                object: object_node.map(Box::new),
            });
        }
        ExprKind::Call { callee, args } => {
            let identifier = single_node(callee).unwrap_or(Node::Member {
                identifier: None,
                reference: None,
                object: None,
            });
            let mut dependencies = Vec::new();
            for arg in args {
                collect_arg(arg, &mut dependencies);
            }
            out.push(Node::Call {
                identifier: Box::new(identifier),
                dependencies,
            });
        }
        // Dynamic imports carry no dependency semantics of their own.
        ExprKind::ImportCall(args) => {
            for arg in args {
                collect_expr(arg, out);
            }
        }
        ExprKind::Unary { operand, .. } => collect_expr(operand, out),
        ExprKind::Update { operand, .. } => collect_expr(operand, out),
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            collect_expr(left, out);
            collect_expr(right, out);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            collect_expr(test, out);
            collect_expr(consequent, out);
            collect_expr(alternate, out);
        }
        ExprKind::Assign { target, value, .. } => {
            collect_expr(target, out);
            collect_expr(value, out);
        }
        ExprKind::Array(elements) => {
            for element in elements {
                collect_expr(element, out);
            }
        }
        ExprKind::Object(props) => {
            let properties = props
                .iter()
                .map(|prop| PropertyNode {
                    name: prop_key_name(&prop.key),
                    value: single_node(&prop.value).unwrap_or(Node::Literal {
                        value: LiteralValue::Null,
                    }),
                })
                .collect();
            out.push(Node::ObjectExpression { properties });
        }
        // Function literals outside call-argument position contribute
        // nothing to the enclosing scope.
        ExprKind::Function(_) => {}
        ExprKind::Spread(inner) => collect_expr(inner, out),
    }
}

/// Collect a call argument. Callback bodies count as dependencies of the
/// enclosing call.
fn collect_arg(arg: &Expr, out: &mut Vec<Node>) {
    match &arg.kind {
        ExprKind::Function(func) => match &func.body {
            FunctionBody::Block(stmts, _) => {
                for stmt in stmts {
                    collect_stmt(stmt, out);
                }
            }
            FunctionBody::Expr(body) => collect_expr(body, out),
        },
        ExprKind::Spread(inner) => collect_arg(inner, out),
        _ => collect_expr(arg, out),
    }
}

/// Collect an expression expected to produce exactly one node (member
/// chain roots, call callees, property values). Returns `None` when it
/// yields zero or several.
fn single_node(expr: &Expr) -> Option<Node> {
    let mut nodes = Vec::new();
    collect_expr(expr, &mut nodes);
    if nodes.len() == 1 {
        nodes.pop()
    } else {
        None
    }
}

fn member_key(property: &MemberProp) -> (Option<String>, Option<String>) {
    match property {
        MemberProp::Static(name, _) => (Some(name.clone()), None),
        MemberProp::Computed(index) => match &index.kind {
            // `a["b"]` and `a[1]` are statically known.
            ExprKind::Str(s) => (Some(s.clone()), None),
            ExprKind::Number(n) => (Some(number_name(*n)), None),
            // `a[b]` — name unknown but the accessor is visible.
            ExprKind::Ident(name) => (None, Some(name.clone())),
            _ => (None, None),
        },
    }
}

fn prop_key_name(key: &PropKey) -> String {
    match key {
        PropKey::Ident(s) | PropKey::Str(s) => s.clone(),
        PropKey::Num(n) => number_name(*n),
    }
}

fn number_name(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn tree(source: &str) -> Node {
        build(&parse(source).expect("parse"))
    }

    #[test]
    fn tag_members_wrap_tag_dependencies() {
        let Node::Expression { dependencies } = tree(r#"#tag("a").x + #tag("b").x"#) else {
            panic!("expected expression root");
        };
        assert_eq!(dependencies.len(), 2);
        for (node, expected) in dependencies.iter().zip(["a", "b"]) {
            let Node::Member {
                identifier, object, ..
            } = node
            else {
                panic!("expected member, got {node:?}");
            };
            assert_eq!(identifier.as_deref(), Some("x"));
            let Some(object) = object else {
                panic!("member should wrap the tag literal");
            };
            let Node::Tag { name, dependencies } = object.as_ref() else {
                panic!("expected tag root");
            };
            assert_eq!(name, "tag");
            assert_eq!(
                dependencies,
                &vec![Node::Literal {
                    value: LiteralValue::String(expected.to_string())
                }]
            );
        }
    }

    #[test]
    fn function_bodies_are_skipped() {
        let Node::Expression { dependencies } = tree("let f = () => abc; 1") else {
            panic!("expected expression root");
        };
        assert_eq!(
            dependencies,
            vec![Node::Literal {
                value: LiteralValue::Number(1.0)
            }]
        );
    }

    #[test]
    fn callback_bodies_feed_the_enclosing_call() {
        let Node::Expression { dependencies } = tree("getBots(b => other)") else {
            panic!("expected expression root");
        };
        let Node::Call {
            identifier,
            dependencies: args,
        } = &dependencies[0]
        else {
            panic!("expected call");
        };
        assert_eq!(
            identifier.as_ref(),
            &Node::Member {
                identifier: Some("getBots".to_string()),
                reference: None,
                object: None,
            }
        );
        assert_eq!(
            args,
            &vec![Node::Member {
                identifier: Some("other".to_string()),
                reference: None,
                object: None,
            }]
        );
    }

    #[test]
    fn computed_member_with_identifier_index() {
        let Node::Expression { dependencies } = tree("tags[myVar]") else {
            panic!("expected expression root");
        };
        let Node::Member {
            identifier,
            reference,
            object,
        } = &dependencies[0]
        else {
            panic!("expected member");
        };
        assert_eq!(identifier, &None);
        assert_eq!(reference.as_deref(), Some("myVar"));
        assert!(object.is_some());
    }

    #[test]
    fn this_is_a_root_member() {
        let Node::Expression { dependencies } = tree("this.name") else {
            panic!("expected expression root");
        };
        let Node::Member { object, .. } = &dependencies[0] else {
            panic!("expected member");
        };
        assert_eq!(
            object.as_deref(),
            Some(&Node::Member {
                identifier: Some("this".to_string()),
                reference: None,
                object: None,
            })
        );
    }

    #[test]
    fn object_literals_become_object_expressions() {
        let Node::Expression { dependencies } = tree(r#"byMod({ "color": "red", height: 2 })"#)
        else {
            panic!("expected expression root");
        };
        let Node::Call { dependencies: args, .. } = &dependencies[0] else {
            panic!("expected call");
        };
        let Node::ObjectExpression { properties } = &args[0] else {
            panic!("expected object expression");
        };
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[0].name, "color");
        assert_eq!(properties[1].name, "height");
    }
}
