//! CPython runtime
//!
//! Source is parsed in-process with RustPython's Python grammar, so no
//! interpreter is ever started for a submission that fails validation. The
//! harness itself runs under a real CPython interpreter.

use std::path::{Path, PathBuf};

use rustpython_parser::{Mode, Parse, Tok, ast, lexer};

use crate::config::Config;
use crate::runtime::{Invocation, ScriptRuntime, SyntaxError, SyntaxNode};

/// Harness program run by the child interpreter
const HARNESS_PROGRAM: &str = include_str!("harness.py");

/// Bracket nesting accepted before parsing, matching CPython's parser limit
const MAX_NESTING: usize = 200;

/// Stack reserved for the parser thread. Expression chains such as
/// `- - - ... x` nest without brackets and are walked recursively.
const PARSE_STACK_SIZE: usize = 256 * 1024 * 1024;

/// CPython interpreter binding
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    interpreter: PathBuf,
    flags: Vec<String>,
}

impl PythonRuntime {
    /// Create a runtime for the given interpreter and flags
    pub fn new(
        interpreter: impl Into<PathBuf>,
        flags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            flags: flags.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a runtime from the interpreter settings in `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.python_path, config.interpreter_flags.iter().cloned())
    }

    /// Get the interpreter path
    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }
}

impl Default for PythonRuntime {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ScriptRuntime for PythonRuntime {
    fn name(&self) -> &str {
        "python"
    }

    fn extension(&self) -> &str {
        "py"
    }

    fn parse(&self, source: &str) -> Result<Vec<SyntaxNode>, SyntaxError> {
        check_nesting(source)?;

        std::thread::scope(|scope| {
            std::thread::Builder::new()
                .name("labrun-parse".to_string())
                .stack_size(PARSE_STACK_SIZE)
                .spawn_scoped(scope, || collect_nodes(source))
                .map_err(|e| SyntaxError::new(format!("parser thread unavailable: {e}")))?
                .join()
                .map_err(|_| SyntaxError::new("parser aborted"))?
        })
    }

    fn harness_program(&self) -> &str {
        HARNESS_PROGRAM
    }

    fn invocation(&self, harness: &Path, submission: &Path, manifest: &Path) -> Invocation {
        let mut args = self.flags.clone();
        args.extend(
            [harness, submission, manifest]
                .iter()
                .map(|path| path.to_string_lossy().into_owned()),
        );

        Invocation {
            program: self.interpreter.clone(),
            args,
        }
    }
}

/// Count bracket tokens only; brackets inside strings and comments never nest
fn check_nesting(source: &str) -> Result<(), SyntaxError> {
    let mut depth = 0usize;
    for token in lexer::lex(source, Mode::Module) {
        // Lexical errors are reported by the parser, with a location
        let Ok((tok, _)) = token else { break };
        match tok {
            Tok::Lpar | Tok::Lsqb | Tok::Lbrace => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(SyntaxError::new("too many nested parentheses"));
                }
            }
            Tok::Rpar | Tok::Rsqb | Tok::Rbrace => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn collect_nodes(source: &str) -> Result<Vec<SyntaxNode>, SyntaxError> {
    let suite = ast::Suite::parse(source, "<submission>")
        .map_err(|e| SyntaxError::new(e.to_string()))?;

    let mut collector = NodeCollector::default();
    collector.body(&suite);
    Ok(collector.nodes)
}

/// Flattens a syntax tree into policy-relevant facts, parents first
///
/// Every expression position is descended into explicitly, including
/// decorators, defaults, annotations, keyword arguments, comprehensions and
/// match patterns.
#[derive(Default)]
struct NodeCollector {
    nodes: Vec<SyntaxNode>,
}

impl NodeCollector {
    fn body(&mut self, stmts: &[ast::Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn exprs(&mut self, exprs: &[ast::Expr]) {
        for expr in exprs {
            self.expr(expr);
        }
    }

    fn opt_expr(&mut self, expr: Option<&ast::Expr>) {
        if let Some(expr) = expr {
            self.expr(expr);
        }
    }

    fn stmt(&mut self, stmt: &ast::Stmt) {
        use ast::Stmt;

        match stmt {
            Stmt::Import(_) | Stmt::ImportFrom(_) => self.nodes.push(SyntaxNode::Import),
            Stmt::FunctionDef(ast::StmtFunctionDef {
                args,
                body,
                decorator_list,
                returns,
                ..
            })
            | Stmt::AsyncFunctionDef(ast::StmtAsyncFunctionDef {
                args,
                body,
                decorator_list,
                returns,
                ..
            }) => {
                self.exprs(decorator_list);
                self.arguments(args);
                self.opt_expr(returns.as_deref());
                self.body(body);
            }
            Stmt::ClassDef(ast::StmtClassDef {
                bases,
                keywords,
                body,
                decorator_list,
                ..
            }) => {
                self.exprs(decorator_list);
                self.exprs(bases);
                self.keywords(keywords);
                self.body(body);
            }
            Stmt::Return(ast::StmtReturn { value, .. }) => self.opt_expr(value.as_deref()),
            Stmt::Delete(ast::StmtDelete { targets, .. }) => self.exprs(targets),
            Stmt::Assign(ast::StmtAssign { targets, value, .. }) => {
                self.exprs(targets);
                self.expr(value);
            }
            Stmt::AugAssign(ast::StmtAugAssign { target, value, .. }) => {
                self.expr(target);
                self.expr(value);
            }
            Stmt::AnnAssign(ast::StmtAnnAssign {
                target,
                annotation,
                value,
                ..
            }) => {
                self.expr(target);
                self.expr(annotation);
                self.opt_expr(value.as_deref());
            }
            Stmt::For(ast::StmtFor {
                target,
                iter,
                body,
                orelse,
                ..
            })
            | Stmt::AsyncFor(ast::StmtAsyncFor {
                target,
                iter,
                body,
                orelse,
                ..
            }) => {
                self.expr(target);
                self.expr(iter);
                self.body(body);
                self.body(orelse);
            }
            Stmt::While(ast::StmtWhile {
                test, body, orelse, ..
            })
            | Stmt::If(ast::StmtIf {
                test, body, orelse, ..
            }) => {
                self.expr(test);
                self.body(body);
                self.body(orelse);
            }
            Stmt::With(ast::StmtWith { items, body, .. })
            | Stmt::AsyncWith(ast::StmtAsyncWith { items, body, .. }) => {
                for item in items {
                    self.expr(&item.context_expr);
                    self.opt_expr(item.optional_vars.as_deref());
                }
                self.body(body);
            }
            Stmt::Match(ast::StmtMatch { subject, cases, .. }) => {
                self.expr(subject);
                for case in cases {
                    self.pattern(&case.pattern);
                    self.opt_expr(case.guard.as_deref());
                    self.body(&case.body);
                }
            }
            Stmt::Raise(ast::StmtRaise { exc, cause, .. }) => {
                self.opt_expr(exc.as_deref());
                self.opt_expr(cause.as_deref());
            }
            Stmt::Try(ast::StmtTry {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            })
            | Stmt::TryStar(ast::StmtTryStar {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            }) => {
                self.body(body);
                for handler in handlers {
                    let ast::ExceptHandler::ExceptHandler(handler) = handler;
                    self.opt_expr(handler.type_.as_deref());
                    self.body(&handler.body);
                }
                self.body(orelse);
                self.body(finalbody);
            }
            Stmt::Assert(ast::StmtAssert { test, msg, .. }) => {
                self.expr(test);
                self.opt_expr(msg.as_deref());
            }
            Stmt::Expr(ast::StmtExpr { value, .. }) => self.expr(value),
            // global, nonlocal, pass, break, continue
            _ => {}
        }
    }

    fn expr(&mut self, expr: &ast::Expr) {
        use ast::Expr;

        match expr {
            Expr::Attribute(ast::ExprAttribute { value, attr, .. }) => {
                self.nodes
                    .push(SyntaxNode::Attribute(attr.as_str().to_owned()));
                self.expr(value);
            }
            Expr::Name(ast::ExprName { id, .. }) => {
                self.nodes.push(SyntaxNode::Name(id.as_str().to_owned()));
            }
            Expr::Call(ast::ExprCall {
                func,
                args,
                keywords,
                ..
            }) => {
                let callee = match func.as_ref() {
                    Expr::Name(name) => Some(name.id.as_str().to_owned()),
                    _ => None,
                };
                self.nodes.push(SyntaxNode::Call { callee });
                self.expr(func);
                self.exprs(args);
                self.keywords(keywords);
            }
            Expr::BoolOp(ast::ExprBoolOp { values, .. }) => self.exprs(values),
            Expr::NamedExpr(ast::ExprNamedExpr { target, value, .. }) => {
                self.expr(target);
                self.expr(value);
            }
            Expr::BinOp(ast::ExprBinOp { left, right, .. }) => {
                self.expr(left);
                self.expr(right);
            }
            Expr::UnaryOp(ast::ExprUnaryOp { operand, .. }) => self.expr(operand),
            Expr::Lambda(ast::ExprLambda { args, body, .. }) => {
                self.arguments(args);
                self.expr(body);
            }
            Expr::IfExp(ast::ExprIfExp {
                test, body, orelse, ..
            }) => {
                self.expr(test);
                self.expr(body);
                self.expr(orelse);
            }
            Expr::Dict(ast::ExprDict { keys, values, .. }) => {
                for key in keys.iter().flatten() {
                    self.expr(key);
                }
                self.exprs(values);
            }
            Expr::Set(ast::ExprSet { elts, .. })
            | Expr::List(ast::ExprList { elts, .. })
            | Expr::Tuple(ast::ExprTuple { elts, .. }) => self.exprs(elts),
            Expr::ListComp(ast::ExprListComp {
                elt, generators, ..
            })
            | Expr::SetComp(ast::ExprSetComp {
                elt, generators, ..
            })
            | Expr::GeneratorExp(ast::ExprGeneratorExp {
                elt, generators, ..
            }) => {
                self.expr(elt);
                self.comprehensions(generators);
            }
            Expr::DictComp(ast::ExprDictComp {
                key,
                value,
                generators,
                ..
            }) => {
                self.expr(key);
                self.expr(value);
                self.comprehensions(generators);
            }
            Expr::Await(ast::ExprAwait { value, .. })
            | Expr::YieldFrom(ast::ExprYieldFrom { value, .. })
            | Expr::Starred(ast::ExprStarred { value, .. }) => self.expr(value),
            Expr::Yield(ast::ExprYield { value, .. }) => self.opt_expr(value.as_deref()),
            Expr::Compare(ast::ExprCompare {
                left, comparators, ..
            }) => {
                self.expr(left);
                self.exprs(comparators);
            }
            Expr::FormattedValue(ast::ExprFormattedValue {
                value, format_spec, ..
            }) => {
                self.expr(value);
                self.opt_expr(format_spec.as_deref());
            }
            Expr::JoinedStr(ast::ExprJoinedStr { values, .. }) => self.exprs(values),
            Expr::Subscript(ast::ExprSubscript { value, slice, .. }) => {
                self.expr(value);
                self.expr(slice);
            }
            Expr::Slice(ast::ExprSlice {
                lower, upper, step, ..
            }) => {
                self.opt_expr(lower.as_deref());
                self.opt_expr(upper.as_deref());
                self.opt_expr(step.as_deref());
            }
            // constants
            _ => {}
        }
    }

    fn arguments(&mut self, arguments: &ast::Arguments) {
        for arg in arguments
            .posonlyargs
            .iter()
            .chain(&arguments.args)
            .chain(&arguments.kwonlyargs)
        {
            self.opt_expr(arg.def.annotation.as_deref());
            self.opt_expr(arg.default.as_deref());
        }
        for arg in arguments.vararg.iter().chain(arguments.kwarg.iter()) {
            self.opt_expr(arg.annotation.as_deref());
        }
    }

    fn keywords(&mut self, keywords: &[ast::Keyword]) {
        for keyword in keywords {
            self.expr(&keyword.value);
        }
    }

    fn comprehensions(&mut self, generators: &[ast::Comprehension]) {
        for generator in generators {
            self.expr(&generator.target);
            self.expr(&generator.iter);
            self.exprs(&generator.ifs);
        }
    }

    fn patterns(&mut self, patterns: &[ast::Pattern]) {
        for pattern in patterns {
            self.pattern(pattern);
        }
    }

    fn pattern(&mut self, pattern: &ast::Pattern) {
        use ast::Pattern;

        match pattern {
            Pattern::MatchValue(ast::PatternMatchValue { value, .. }) => self.expr(value),
            Pattern::MatchSequence(ast::PatternMatchSequence { patterns, .. })
            | Pattern::MatchOr(ast::PatternMatchOr { patterns, .. }) => self.patterns(patterns),
            Pattern::MatchMapping(ast::PatternMatchMapping { keys, patterns, .. }) => {
                self.exprs(keys);
                self.patterns(patterns);
            }
            Pattern::MatchClass(ast::PatternMatchClass {
                cls,
                patterns,
                kwd_attrs,
                kwd_patterns,
                ..
            }) => {
                self.expr(cls);
                // `case C(attr=x)` reads `subject.attr`
                for attr in kwd_attrs {
                    self.nodes
                        .push(SyntaxNode::Attribute(attr.as_str().to_owned()));
                }
                self.patterns(patterns);
                self.patterns(kwd_patterns);
            }
            Pattern::MatchAs(ast::PatternMatchAs { pattern, .. }) => {
                if let Some(pattern) = pattern {
                    self.pattern(pattern);
                }
            }
            // singletons and star captures
            _ => {}
        }
    }
}
