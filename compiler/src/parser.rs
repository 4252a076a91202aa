// Parser for formula scripts.
//
// Parses a token stream (from the lexer) into an AST. The grammar is a
// restricted ECMAScript expression/statement subset plus the `#name` and
// `@name` dependency-literal forms. Uses chumsky combinators.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns an AST covering the whole input, or a syntax error.
// Failure modes: syntax errors produce a `SyntaxError` with the first
// reported diagnostic; later diagnostics are folded into a count.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::recursive::Recursive;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::diag::SyntaxError;
use crate::lexer::Token;

/// Parse a formula source string. Lexes then parses.
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    let lex_result = crate::lexer::lex(source);
    if let Some(first) = lex_result.errors.first() {
        let mut err = SyntaxError::new(
            first.message.clone(),
            Some((first.span.start, first.span.end)),
        );
        err.extra_count = lex_result.errors.len() - 1;
        return Err(err);
    }

    let len = source.len();
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = program_parser(source);
    let (program, errors) = parser.parse(stream).into_output_errors();

    if let Some(first) = errors.first() {
        let span = first.span();
        let mut err = SyntaxError::new(first.to_string(), Some((span.start(), span.end())));
        err.extra_count = errors.len() - 1;
        return Err(err);
    }
    program.ok_or_else(|| SyntaxError::new("parse produced no output", None))
}

// ── Tag node decomposition ──

/// The pieces of a tag/bot literal possibly wrapped in member accesses:
/// the marker, the dotted tag name, the literal's call-style arguments,
/// and any member names chained after the literal (innermost first).
#[derive(Debug, PartialEq)]
pub struct TagNodeValues<'a> {
    pub marker: Marker,
    pub name: &'a str,
    pub args: &'a [Expr],
    pub members: Vec<&'a str>,
}

/// Decompose an expression rooted at a tag/bot literal.
///
/// Walks member accesses down to the literal, separating the literal's own
/// callee/arguments from the member chain prefixed onto it. Returns `None`
/// when the expression does not bottom out at a tag/bot literal or a member
/// link is computed (no static name).
pub fn tag_node_values(expr: &Expr) -> Option<TagNodeValues<'_>> {
    let mut members = Vec::new();
    let mut current = expr;
    loop {
        match &current.kind {
            ExprKind::Member { object, property } => {
                match property {
                    MemberProp::Static(name, _) => members.push(name.as_str()),
                    MemberProp::Computed(_) => return None,
                }
                current = object;
            }
            ExprKind::TagRef { marker, name, args } => {
                members.reverse();
                return Some(TagNodeValues {
                    marker: *marker,
                    name,
                    args: args.as_deref().unwrap_or(&[]),
                    members,
                });
            }
            _ => return None,
        }
    }
}

// ── Main parser builder ──
//
// All grammar rules are built inside `program_parser` so that the `source`
// reference is captured once and shared by all combinators. This avoids
// complex lifetime annotations on per-rule helper functions.

fn program_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, Program, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let mut expr = Recursive::declare();
    let mut stmt = Recursive::declare();

    // ── Identifier ──

    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        Ident {
            name: source[span.start()..span.end()].to_string(),
            span,
        }
    });

    // ── Shared pieces ──

    let spread = just(Token::Ellipsis)
        .ignore_then(expr.clone())
        .map_with(|inner: Expr, e| Expr {
            kind: ExprKind::Spread(Box::new(inner)),
            span: e.span(),
        });

    let args = spread
        .clone()
        .or(expr.clone())
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<Expr>>()
        .delimited_by(just(Token::LParen), just(Token::RParen));

    let paren_expr = expr
        .clone()
        .delimited_by(just(Token::LParen), just(Token::RParen));

    let params = ident
        .clone()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<Ident>>()
        .delimited_by(just(Token::LParen), just(Token::RParen));

    let block_stmts = stmt
        .clone()
        .repeated()
        .collect::<Vec<Stmt>>()
        .delimited_by(just(Token::LBrace), just(Token::RBrace));

    // ── Expression grammar ──

    let literal = select! {
        Token::Number(n) => ExprKind::Number(n),
        Token::StringLit(s) => ExprKind::Str(s),
        Token::SingleStringLit(s) => ExprKind::Str(s),
        Token::True => ExprKind::Bool(true),
        Token::False => ExprKind::Bool(false),
        Token::Null => ExprKind::Null,
    }
    .map_with(|kind, e| Expr {
        kind,
        span: e.span(),
    });

    let this_expr = just(Token::This).map_with(|_, e| Expr {
        kind: ExprKind::This,
        span: e.span(),
    });

    let ident_expr = ident.clone().map(|i| Expr {
        kind: ExprKind::Ident(i.name),
        span: i.span,
    });

    // `#a.b` / `@a.b`, optionally called: the dotted chain before any
    // argument list is the literal's name; members after a call are
    // ordinary member accesses handled by the postfix chain.
    let dotted_name = ident
        .clone()
        .separated_by(just(Token::Dot))
        .at_least(1)
        .collect::<Vec<Ident>>()
        .map(|segments| {
            segments
                .iter()
                .map(|i| i.name.as_str())
                .collect::<Vec<_>>()
                .join(".")
        });

    let tag_ref = just(Token::Hash)
        .to(Marker::Tag)
        .or(just(Token::At).to(Marker::Bot))
        .then(dotted_name)
        .then(args.clone().or_not())
        .map_with(|((marker, name), args), e| Expr {
            kind: ExprKind::TagRef { marker, name, args },
            span: e.span(),
        });

    let import_call = just(Token::Import).ignore_then(args.clone()).map_with(|a, e| Expr {
        kind: ExprKind::ImportCall(a),
        span: e.span(),
    });

    let array = spread
        .clone()
        .or(expr.clone())
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<Expr>>()
        .delimited_by(just(Token::LBracket), just(Token::RBracket))
        .map_with(|elements, e| Expr {
            kind: ExprKind::Array(elements),
            span: e.span(),
        });

    let prop_key = select! {
        Token::StringLit(s) => PropKey::Str(s),
        Token::SingleStringLit(s) => PropKey::Str(s),
        Token::Number(n) => PropKey::Num(n),
    }
    .or(ident.clone().map(|i| PropKey::Ident(i.name)));

    let object_prop = prop_key
        .then_ignore(just(Token::Colon))
        .then(expr.clone())
        .map_with(|(key, value), e| ObjectProp {
            key,
            value,
            span: e.span(),
        });

    // `{ a }` shorthand: key and value share the identifier.
    let shorthand_prop = ident.clone().map_with(|i, e| ObjectProp {
        key: PropKey::Ident(i.name.clone()),
        value: Expr {
            kind: ExprKind::Ident(i.name),
            span: i.span,
        },
        span: e.span(),
    });

    let object = object_prop
        .or(shorthand_prop)
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<ObjectProp>>()
        .delimited_by(just(Token::LBrace), just(Token::RBrace))
        .map_with(|props, e| Expr {
            kind: ExprKind::Object(props),
            span: e.span(),
        });

    let func_expr = just(Token::Function)
        .ignore_then(ident.clone().or_not())
        .then(params.clone())
        .then(
            block_stmts
                .clone()
                .map_with(|stmts, e| FunctionBody::Block(stmts, e.span())),
        )
        .map_with(|((name, params), body), e| Expr {
            kind: ExprKind::Function(Function {
                name,
                params,
                body,
                is_arrow: false,
                span: e.span(),
            }),
            span: e.span(),
        });

    let primary = choice((
        literal,
        this_expr,
        tag_ref,
        import_call,
        func_expr,
        array,
        object,
        paren_expr.clone(),
        ident_expr,
    ));

    // ── Postfix member/call chains ──

    #[derive(Clone)]
    enum Postfix {
        Member(String, SimpleSpan),
        Computed(Expr),
        Call(Vec<Expr>),
    }

    let postfix = choice((
        just(Token::Dot)
            .ignore_then(ident.clone())
            .map(|i| Postfix::Member(i.name, i.span)),
        expr.clone()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(Postfix::Computed),
        args.clone().map(Postfix::Call),
    ));

    let postfix_chain = primary.foldl_with(postfix.repeated(), |object, link, e| {
        let span: SimpleSpan = e.span();
        match link {
            Postfix::Member(name, name_span) => Expr {
                kind: ExprKind::Member {
                    object: Box::new(object),
                    property: MemberProp::Static(name, name_span),
                },
                span,
            },
            Postfix::Computed(index) => Expr {
                kind: ExprKind::Member {
                    object: Box::new(object),
                    property: MemberProp::Computed(Box::new(index)),
                },
                span,
            },
            Postfix::Call(args) => Expr {
                kind: ExprKind::Call {
                    callee: Box::new(object),
                    args,
                },
                span,
            },
        }
    });

    let postfix_update = postfix_chain
        .then(
            just(Token::PlusPlus)
                .to(true)
                .or(just(Token::MinusMinus).to(false))
                .or_not(),
        )
        .map_with(|(operand, update), e| match update {
            Some(inc) => Expr {
                kind: ExprKind::Update {
                    inc,
                    prefix: false,
                    operand: Box::new(operand),
                },
                span: e.span(),
            },
            None => operand,
        });

    // ── Unary / update prefixes ──

    let unary = recursive(|unary| {
        let op_unary = choice((
            just(Token::Not).to(UnaryOp::Not),
            just(Token::Minus).to(UnaryOp::Neg),
            just(Token::Plus).to(UnaryOp::Pos),
            just(Token::TypeOf).to(UnaryOp::TypeOf),
        ))
        .then(unary.clone())
        .map_with(|(op, operand), e| Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span: e.span(),
        });

        let prefix_update = just(Token::PlusPlus)
            .to(true)
            .or(just(Token::MinusMinus).to(false))
            .then(unary)
            .map_with(|(inc, operand), e| Expr {
                kind: ExprKind::Update {
                    inc,
                    prefix: true,
                    operand: Box::new(operand),
                },
                span: e.span(),
            });

        op_unary.or(prefix_update).or(postfix_update)
    });

    // ── Binary operator precedence (left-associative layers) ──

    macro_rules! binary_fold {
        () => {
            |left: Expr, (op, right): (BinaryOp, Expr), e| Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span: e.span(),
            }
        };
    }

    macro_rules! logical_fold {
        () => {
            |left: Expr, (op, right): (LogicalOp, Expr), e| Expr {
                kind: ExprKind::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span: e.span(),
            }
        };
    }

    let product = unary.clone().foldl_with(
        choice((
            just(Token::Star).to(BinaryOp::Mul),
            just(Token::Slash).to(BinaryOp::Div),
            just(Token::Percent).to(BinaryOp::Mod),
        ))
        .then(unary)
        .repeated(),
        binary_fold!(),
    );

    let sum = product.clone().foldl_with(
        choice((
            just(Token::Plus).to(BinaryOp::Add),
            just(Token::Minus).to(BinaryOp::Sub),
        ))
        .then(product)
        .repeated(),
        binary_fold!(),
    );

    let relational = sum.clone().foldl_with(
        choice((
            just(Token::LtEq).to(BinaryOp::LtEq),
            just(Token::Lt).to(BinaryOp::Lt),
            just(Token::GtEq).to(BinaryOp::GtEq),
            just(Token::Gt).to(BinaryOp::Gt),
            just(Token::In).to(BinaryOp::In),
        ))
        .then(sum)
        .repeated(),
        binary_fold!(),
    );

    let equality = relational.clone().foldl_with(
        choice((
            just(Token::EqEqEq).to(BinaryOp::StrictEq),
            just(Token::EqEq).to(BinaryOp::Eq),
            just(Token::NotEqEq).to(BinaryOp::StrictNotEq),
            just(Token::NotEq).to(BinaryOp::NotEq),
        ))
        .then(relational)
        .repeated(),
        binary_fold!(),
    );

    let logic_and = equality.clone().foldl_with(
        just(Token::AndAnd)
            .to(LogicalOp::And)
            .then(equality)
            .repeated(),
        logical_fold!(),
    );

    let logic_or = logic_and.clone().foldl_with(
        just(Token::OrOr)
            .to(LogicalOp::Or)
            .then(logic_and)
            .repeated(),
        logical_fold!(),
    );

    let conditional = logic_or
        .then(
            just(Token::Question)
                .ignore_then(expr.clone())
                .then_ignore(just(Token::Colon))
                .then(expr.clone())
                .or_not(),
        )
        .map_with(|(test, branches), e| match branches {
            Some((consequent, alternate)) => Expr {
                kind: ExprKind::Conditional {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                },
                span: e.span(),
            },
            None => test,
        });

    let assignment = conditional
        .then(
            choice((
                just(Token::Assign).to(AssignOp::Assign),
                just(Token::PlusAssign).to(AssignOp::AddAssign),
                just(Token::MinusAssign).to(AssignOp::SubAssign),
                just(Token::StarAssign).to(AssignOp::MulAssign),
                just(Token::SlashAssign).to(AssignOp::DivAssign),
            ))
            .then(expr.clone())
            .or_not(),
        )
        .map_with(|(target, rest), e| match rest {
            Some((op, value)) => Expr {
                kind: ExprKind::Assign {
                    op,
                    target: Box::new(target),
                    value: Box::new(value),
                },
                span: e.span(),
            },
            None => target,
        });

    // ── Arrow functions ──
    //
    // Tried before the operator chain; backtracks when no `=>` follows.

    let arrow_params = params.clone().or(ident.clone().map(|i| vec![i]));

    let arrow_body = block_stmts
        .clone()
        .map_with(|stmts, e| FunctionBody::Block(stmts, e.span()))
        .or(expr.clone().map(|e| FunctionBody::Expr(Box::new(e))));

    let arrow = arrow_params
        .then_ignore(just(Token::FatArrow))
        .then(arrow_body)
        .map_with(|(params, body), e| Expr {
            kind: ExprKind::Function(Function {
                name: None,
                params,
                body,
                is_arrow: true,
                span: e.span(),
            }),
            span: e.span(),
        });

    expr.define(arrow.or(assignment));

    // ── Statements ──

    let semi = just(Token::Semi);

    let block_stmt = block_stmts.clone().map_with(|stmts, e| Stmt {
        kind: StmtKind::Block(stmts),
        span: e.span(),
    });

    let empty_stmt = semi.clone().map_with(|_, e| Stmt {
        kind: StmtKind::Empty,
        span: e.span(),
    });

    let decl_kind = choice((
        just(Token::Var).to(DeclKind::Var),
        just(Token::Let).to(DeclKind::Let),
        just(Token::Const).to(DeclKind::Const),
    ));

    let declarator = ident
        .clone()
        .then(just(Token::Assign).ignore_then(expr.clone()).or_not())
        .map(|(name, init)| Declarator { name, init });

    let declarator_list = declarator
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<Declarator>>();

    let var_decl = decl_kind
        .clone()
        .then(declarator_list.clone())
        .then_ignore(semi.clone().or_not())
        .map_with(|(kind, decls), e| Stmt {
            kind: StmtKind::VarDecl { kind, decls },
            span: e.span(),
        });

    let if_stmt = just(Token::If)
        .ignore_then(paren_expr.clone())
        .then(stmt.clone())
        .then(just(Token::Else).ignore_then(stmt.clone()).or_not())
        .map_with(|((test, consequent), alternate), e| Stmt {
            kind: StmtKind::If {
                test,
                consequent: Box::new(consequent),
                alternate: alternate.map(Box::new),
            },
            span: e.span(),
        });

    let while_stmt = just(Token::While)
        .ignore_then(paren_expr.clone())
        .then(stmt.clone())
        .map_with(|(test, body), e| Stmt {
            kind: StmtKind::While {
                test,
                body: Box::new(body),
            },
            span: e.span(),
        });

    let do_while_stmt = just(Token::Do)
        .ignore_then(stmt.clone())
        .then_ignore(just(Token::While))
        .then(paren_expr.clone())
        .then_ignore(semi.clone().or_not())
        .map_with(|(body, test), e| Stmt {
            kind: StmtKind::DoWhile {
                body: Box::new(body),
                test,
            },
            span: e.span(),
        });

    let for_target = decl_kind
        .clone()
        .then(ident.clone())
        .map(|(kind, name)| ForTarget::Decl(kind, name))
        .or(ident.clone().map(ForTarget::Ident));

    let for_in_stmt = just(Token::For)
        .ignore_then(
            for_target
                .then(just(Token::In).to(true).or(just(Token::Of).to(false)))
                .then(expr.clone())
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .then(stmt.clone())
        .map_with(|(((left, is_in), right), body), e| {
            let body = Box::new(body);
            let kind = if is_in {
                StmtKind::ForIn { left, right, body }
            } else {
                StmtKind::ForOf { left, right, body }
            };
            Stmt {
                kind,
                span: e.span(),
            }
        });

    let for_init = decl_kind
        .then(declarator_list)
        .map(|(kind, decls)| ForInit::Decl(kind, decls))
        .or(expr.clone().map(ForInit::Expr));

    let for_classic_stmt = just(Token::For)
        .ignore_then(
            for_init
                .or_not()
                .then_ignore(semi.clone())
                .then(expr.clone().or_not())
                .then_ignore(semi.clone())
                .then(expr.clone().or_not())
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .then(stmt.clone())
        .map_with(|(((init, test), update), body), e| Stmt {
            kind: StmtKind::For {
                init,
                test,
                update,
                body: Box::new(body),
            },
            span: e.span(),
        });

    let return_stmt = just(Token::Return)
        .ignore_then(expr.clone().or_not())
        .then_ignore(semi.clone().or_not())
        .map_with(|value, e| Stmt {
            kind: StmtKind::Return(value),
            span: e.span(),
        });

    let throw_stmt = just(Token::Throw)
        .ignore_then(expr.clone())
        .then_ignore(semi.clone().or_not())
        .map_with(|value, e| Stmt {
            kind: StmtKind::Throw(value),
            span: e.span(),
        });

    let break_stmt = just(Token::Break)
        .then_ignore(semi.clone().or_not())
        .map_with(|_, e| Stmt {
            kind: StmtKind::Break,
            span: e.span(),
        });

    let continue_stmt = just(Token::Continue)
        .then_ignore(semi.clone().or_not())
        .map_with(|_, e| Stmt {
            kind: StmtKind::Continue,
            span: e.span(),
        });

    let catch_clause = just(Token::Catch)
        .ignore_then(
            ident
                .clone()
                .delimited_by(just(Token::LParen), just(Token::RParen))
                .or_not(),
        )
        .then(block_stmt.clone())
        .map_with(|(param, body), e| CatchClause {
            param,
            body: Box::new(body),
            span: e.span(),
        });

    let try_stmt = just(Token::Try)
        .ignore_then(block_stmt.clone())
        .then(catch_clause.or_not())
        .then(
            just(Token::Finally)
                .ignore_then(block_stmt.clone())
                .or_not(),
        )
        .map_with(|((block, catch), finally), e| Stmt {
            kind: StmtKind::Try {
                block: Box::new(block),
                catch,
                finally: finally.map(Box::new),
            },
            span: e.span(),
        });

    let function_decl = just(Token::Function)
        .ignore_then(ident.clone())
        .then(params)
        .then(
            block_stmts
                .map_with(|stmts, e| FunctionBody::Block(stmts, e.span())),
        )
        .map_with(|((name, params), body), e| Stmt {
            kind: StmtKind::FunctionDecl(Function {
                name: Some(name),
                params,
                body,
                is_arrow: false,
                span: e.span(),
            }),
            span: e.span(),
        });

    let expr_stmt = expr
        .clone()
        .then_ignore(semi.clone().or_not())
        .map_with(|expression, e| Stmt {
            kind: StmtKind::Expr(expression),
            span: e.span(),
        });

    stmt.define(choice((
        block_stmt,
        empty_stmt,
        var_decl,
        if_stmt,
        while_stmt,
        do_while_stmt,
        for_in_stmt,
        for_classic_stmt,
        return_stmt,
        throw_stmt,
        break_stmt,
        continue_stmt,
        try_stmt,
        function_decl,
        expr_stmt,
    )));

    // ── Program ──

    stmt.repeated()
        .collect::<Vec<Stmt>>()
        .then_ignore(end())
        .map_with(|statements, e| Program {
            statements,
            span: e.span(),
        })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        parse(source).unwrap_or_else(|e| panic!("parse failed for {source:?}: {e}"))
    }

    #[test]
    fn parses_tag_literal_with_args_and_member() {
        let program = parse_ok(r#"#abc("a").x"#);
        assert_eq!(program.statements.len(), 1);
        let StmtKind::Expr(expr) = &program.statements[0].kind else {
            panic!("expected expression statement");
        };
        let values = tag_node_values(expr).expect("tag node");
        assert_eq!(values.marker, Marker::Tag);
        assert_eq!(values.name, "abc");
        assert_eq!(values.args.len(), 1);
        assert_eq!(values.members, vec!["x"]);
    }

    #[test]
    fn dotted_tag_name_without_call() {
        let program = parse_ok("#aux.color");
        let StmtKind::Expr(expr) = &program.statements[0].kind else {
            panic!("expected expression statement");
        };
        let values = tag_node_values(expr).expect("tag node");
        assert_eq!(values.name, "aux.color");
        assert!(values.args.is_empty());
        assert!(values.members.is_empty());
    }

    #[test]
    fn bot_marker() {
        let program = parse_ok(r#"@tag("filter")"#);
        let StmtKind::Expr(expr) = &program.statements[0].kind else {
            panic!("expected expression statement");
        };
        let values = tag_node_values(expr).expect("bot node");
        assert_eq!(values.marker, Marker::Bot);
        assert_eq!(values.name, "tag");
    }

    #[test]
    fn while_with_empty_body() {
        let program = parse_ok("while(true);");
        let StmtKind::While { body, .. } = &program.statements[0].kind else {
            panic!("expected while");
        };
        assert_eq!(body.kind, StmtKind::Empty);
    }

    #[test]
    fn arrow_function_argument() {
        let program = parse_ok("getBots(b => b.tags.abc)");
        let StmtKind::Expr(expr) = &program.statements[0].kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Call { args, .. } = &expr.kind else {
            panic!("expected call");
        };
        assert!(matches!(args[0].kind, ExprKind::Function(_)));
    }

    #[test]
    fn truncated_input_is_syntax_error() {
        assert!(parse("getTag(abc").is_err());
    }

    #[test]
    fn loop_body_spans_cover_braces() {
        let source = "while(true) { console.log(1); }";
        let program = parse_ok(source);
        let StmtKind::While { body, .. } = &program.statements[0].kind else {
            panic!("expected while");
        };
        assert_eq!(&source[body.span.start()..body.span.start() + 1], "{");
        assert_eq!(body.span.end(), source.len());
    }
}
