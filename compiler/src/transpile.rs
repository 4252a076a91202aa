// Source rewriter.
//
// Injects a guard call into every loop body so the execution sandbox can
// bound runaway scripts. Insertions go through the versioned text buffer,
// anchored in original coordinates, so line/column reporting against the
// original source stays exact after rewriting.
//
// Preconditions: none.
// Postconditions: each loop node in the input carries exactly one guard
// call; loop semantics are otherwise unchanged.
// Failure modes: `SyntaxError` for unparseable input; no rewriting happens
// on a failed parse.
// Side effects: results are memoized in a bounded, mutex-guarded LRU cache
// keyed by the exact source text.

use crate::ast::*;
use crate::diag::SyntaxError;
use crate::parser::parse;
use crate::text::{index_from_location, location_from_index, CodeLocation, VersionVector, VersionedText};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Default name of the sandbox guard function.
pub const DEFAULT_GUARD_NAME: &str = "guard";

/// The outcome of one rewrite: the rewritten code, the text that was
/// parsed, and the edit log that produced one from the other.
#[derive(Debug)]
pub struct TranspilerResult {
    pub code: String,
    pub original: String,
    pub position_map: VersionedText,
}

impl TranspilerResult {
    /// Map a location in the rewritten code back to the original source.
    pub fn resolve_original_location(&self, location: CodeLocation) -> CodeLocation {
        let index = index_from_location(&self.code, location);
        let original_index = self.position_map.resolve_to_original(index);
        location_from_index(&self.original, original_index as usize)
    }
}

/// Loop-guard injector with a bounded result cache.
pub struct Transpiler {
    guard_name: String,
    cache: Mutex<LruCache<String, Arc<TranspilerResult>>>,
}

impl Default for Transpiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Transpiler {
    pub fn new() -> Self {
        Self::with_guard_name(DEFAULT_GUARD_NAME)
    }

    pub fn with_guard_name(name: impl Into<String>) -> Self {
        Transpiler {
            guard_name: name.into(),
            cache: Mutex::new(LruCache::new(CACHE_CAPACITY)),
        }
    }

    /// Rewrite `code`, returning just the rewritten text.
    pub fn transpile(&self, code: &str) -> Result<String, SyntaxError> {
        Ok(self.transpile_with_metadata(code)?.code.clone())
    }

    /// Rewrite `code`, returning the full result with the position map.
    /// Identical inputs share one cached result.
    pub fn transpile_with_metadata(
        &self,
        code: &str,
    ) -> Result<Arc<TranspilerResult>, SyntaxError> {
        {
            let mut cache = lock_cache(&self.cache);
            if let Some(hit) = cache.get(code) {
                return Ok(Arc::clone(hit));
            }
        }
        let result = Arc::new(self.rewrite(code)?);
        let mut cache = lock_cache(&self.cache);
        cache.put(code.to_string(), Arc::clone(&result));
        Ok(result)
    }

    fn rewrite(&self, code: &str) -> Result<TranspilerResult, SyntaxError> {
        let program = parse(code)?;
        let mut sites = Vec::new();
        for stmt in &program.statements {
            collect_sites(stmt, &mut sites);
        }

        let mut text = VersionedText::new(code);
        // Anchors resolve against the pristine version, so every insertion
        // position is independent of the insertions made before it.
        let base = text.version().clone();
        let mut author = 1;
        for site in &sites {
            match site.shape {
                BodyShape::Block => {
                    // First statement of the block, right after the brace.
                    let call = format!("{}();", self.guard_name);
                    insert_at(&mut text, &base, &mut author, site.start + 1, &call);
                }
                BodyShape::Empty => {
                    // The guard becomes the loop body: `while(x)guard();`.
                    let call = format!("{}()", self.guard_name);
                    insert_at(&mut text, &base, &mut author, site.start, &call);
                }
                BodyShape::Single => {
                    let open = format!("{{{}();", self.guard_name);
                    insert_at(&mut text, &base, &mut author, site.start, &open);
                    insert_at(&mut text, &base, &mut author, site.end, "}");
                }
            }
        }

        Ok(TranspilerResult {
            code: text.text(),
            original: code.to_string(),
            position_map: text,
        })
    }
}

fn lock_cache<'a>(
    cache: &'a Mutex<LruCache<String, Arc<TranspilerResult>>>,
) -> std::sync::MutexGuard<'a, LruCache<String, Arc<TranspilerResult>>> {
    match cache.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn insert_at(
    text: &mut VersionedText,
    base: &VersionVector,
    author: &mut u32,
    index: usize,
    insertion: &str,
) {
    if let Some(anchor) = text.anchor_at(base, index) {
        let resolved = text.resolve(anchor);
        text.insert(*author, resolved, insertion);
        *author += 1;
    }
}

// ── guard site collection ──

enum BodyShape {
    Block,
    Empty,
    Single,
}

struct GuardSite {
    shape: BodyShape,
    start: usize,
    end: usize,
}

fn site_for(body: &Stmt) -> GuardSite {
    let shape = match &body.kind {
        StmtKind::Block(_) => BodyShape::Block,
        StmtKind::Empty => BodyShape::Empty,
        _ => BodyShape::Single,
    };
    GuardSite {
        shape,
        start: body.span.start,
        end: body.span.end,
    }
}

/// Pre-order walk pushing one site per loop node, outermost first. Loops
/// inside function literals are guarded too.
fn collect_sites(stmt: &Stmt, out: &mut Vec<GuardSite>) {
    match &stmt.kind {
        StmtKind::Expr(expr) => collect_expr_sites(expr, out),
        StmtKind::VarDecl { decls, .. } => {
            for decl in decls {
                if let Some(init) = &decl.init {
                    collect_expr_sites(init, out);
                }
            }
        }
        StmtKind::Block(stmts) => {
            for s in stmts {
                collect_sites(s, out);
            }
        }
        StmtKind::If {
            test,
            consequent,
            alternate,
        } => {
            collect_expr_sites(test, out);
            collect_sites(consequent, out);
            if let Some(alt) = alternate {
                collect_sites(alt, out);
            }
        }
        StmtKind::While { test, body } => {
            out.push(site_for(body));
            collect_expr_sites(test, out);
            collect_sites(body, out);
        }
        StmtKind::DoWhile { body, test } => {
            out.push(site_for(body));
            collect_sites(body, out);
            collect_expr_sites(test, out);
        }
        StmtKind::For {
            init,
            test,
            update,
            body,
        } => {
            out.push(site_for(body));
            match init {
                Some(ForInit::Decl(_, decls)) => {
                    for decl in decls {
                        if let Some(i) = &decl.init {
                            collect_expr_sites(i, out);
                        }
                    }
                }
                Some(ForInit::Expr(e)) => collect_expr_sites(e, out),
                None => {}
            }
            if let Some(test) = test {
                collect_expr_sites(test, out);
            }
            if let Some(update) = update {
                collect_expr_sites(update, out);
            }
            collect_sites(body, out);
        }
        StmtKind::ForIn { right, body, .. } | StmtKind::ForOf { right, body, .. } => {
            out.push(site_for(body));
            collect_expr_sites(right, out);
            collect_sites(body, out);
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                collect_expr_sites(value, out);
            }
        }
        StmtKind::Throw(value) => collect_expr_sites(value, out),
        StmtKind::Try {
            block,
            catch,
            finally,
        } => {
            collect_sites(block, out);
            if let Some(catch) = catch {
                collect_sites(&catch.body, out);
            }
            if let Some(finally) = finally {
                collect_sites(finally, out);
            }
        }
        StmtKind::FunctionDecl(func) => collect_function_sites(func, out),
        StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
    }
}

fn collect_function_sites(func: &Function, out: &mut Vec<GuardSite>) {
    match &func.body {
        FunctionBody::Block(stmts, _) => {
            for stmt in stmts {
                collect_sites(stmt, out);
            }
        }
        FunctionBody::Expr(expr) => collect_expr_sites(expr, out),
    }
}

fn collect_expr_sites(expr: &Expr, out: &mut Vec<GuardSite>) {
    match &expr.kind {
        ExprKind::Function(func) => collect_function_sites(func, out),
        ExprKind::TagRef { args, .. } => {
            if let Some(args) = args {
                for arg in args {
                    collect_expr_sites(arg, out);
                }
            }
        }
        ExprKind::Member { object, property } => {
            collect_expr_sites(object, out);
            if let MemberProp::Computed(index) = property {
                collect_expr_sites(index, out);
            }
        }
        ExprKind::Call { callee, args } => {
            collect_expr_sites(callee, out);
            for arg in args {
                collect_expr_sites(arg, out);
            }
        }
        ExprKind::ImportCall(args) => {
            for arg in args {
                collect_expr_sites(arg, out);
            }
        }
        ExprKind::Unary { operand, .. } | ExprKind::Update { operand, .. } => {
            collect_expr_sites(operand, out)
        }
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            collect_expr_sites(left, out);
            collect_expr_sites(right, out);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            collect_expr_sites(test, out);
            collect_expr_sites(consequent, out);
            collect_expr_sites(alternate, out);
        }
        ExprKind::Assign { target, value, .. } => {
            collect_expr_sites(target, out);
            collect_expr_sites(value, out);
        }
        ExprKind::Array(elements) => {
            for element in elements {
                collect_expr_sites(element, out);
            }
        }
        ExprKind::Object(props) => {
            for prop in props {
                collect_expr_sites(&prop.value, out);
            }
        }
        ExprKind::Spread(inner) => collect_expr_sites(inner, out),
        ExprKind::Number(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::Ident(_)
        | ExprKind::This => {}
    }
}

// ── Tests ──
