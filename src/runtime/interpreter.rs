use std::rc::Rc;

use crate::error::{Error, Result, RuntimeErrorKind};
use crate::lexer::{Span, TokenKind};
use crate::parser::{BinaryOp, ConversionKind, FunctionDef, Node, UnaryOp};
use crate::runtime::builtins::{self, Console, StdConsole};
use crate::runtime::value::{DeferredBlock, Function, ValueError, ValueKind};
use crate::runtime::{Context, SymbolTable, Value};

/// Interpreter settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Deepest allowed nesting of function, block and script calls
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_call_depth: 200,
        }
    }
}

/// Tree-walking evaluator
///
/// Holds no program state of its own; everything a program defines lives in
/// the contexts and symbol tables passed to [`Interpreter::evaluate`].
pub struct Interpreter {
    config: InterpreterConfig,
    console: Rc<dyn Console>,
}

impl Interpreter {
    /// Creates an interpreter with default settings, talking to stdio
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    /// Creates an interpreter with custom settings, talking to stdio
    pub fn with_config(config: InterpreterConfig) -> Self {
        Interpreter {
            config,
            console: Rc::new(StdConsole),
        }
    }

    /// Replaces the console used by `print`, `input` and `clear`
    pub fn with_console(mut self, console: Rc<dyn Console>) -> Self {
        self.console = console;
        self
    }

    /// Current settings
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Console used by the builtins
    pub fn console(&self) -> &Rc<dyn Console> {
        &self.console
    }

    /// Evaluates `node` inside `context`
    pub fn evaluate(&self, node: &Node, context: &Rc<Context>) -> Result<Value> {
        match node {
            Node::Number(token) => {
                let n = match token.kind {
                    TokenKind::Int(n) => n as f64,
                    TokenKind::Float(n) => n,
                    _ => unreachable!("number node holds a numeric token"),
                };
                Ok(Value::number(n).stamped(token.span(), context))
            }

            Node::String(token) => {
                let s = match &token.kind {
                    TokenKind::Str(s) => s.clone(),
                    _ => unreachable!("string node holds a string token"),
                };
                Ok(Value::string(s).stamped(token.span(), context))
            }

            Node::List(collection) => {
                let items = self.evaluate_all(&collection.elements, context)?;
                Ok(Value::list(items).stamped(collection.span.clone(), context))
            }

            Node::Tuple(collection) => {
                let items = self.evaluate_all(&collection.elements, context)?;
                Ok(Value::tuple(items).stamped(collection.span.clone(), context))
            }

            Node::Block(block) => {
                let value = Value::block(DeferredBlock {
                    nodes: Rc::clone(&block.elements),
                    scope: Rc::clone(context),
                });
                Ok(value.stamped(block.span.clone(), context))
            }

            Node::VarAccess(token) => {
                let name = token.identifier().unwrap_or_default();
                match context.symbols().get(name) {
                    Some(value) => Ok(value.stamped(token.span(), context)),
                    None => Err(Error::runtime(
                        RuntimeErrorKind::Undefined,
                        token.span(),
                        format!("'{}' is not defined", name),
                        context,
                    )),
                }
            }

            Node::VarAssign { name, value, .. } => {
                let value = self.evaluate(value, context)?;
                let name = name.identifier().unwrap_or_default();
                context.symbols().set(name, value.clone());
                Ok(value)
            }

            Node::BinaryOp { left, op, right } => {
                let lhs = self.evaluate(left, context)?;
                let rhs = self.evaluate(right, context)?;
                self.binary_op(&lhs, *op, &rhs)
                    .map_err(|err| err.at(&node.span(), context))
            }

            Node::UnaryOp { op, operand, span } => {
                let value = self.evaluate(operand, context)?;
                let result = match op {
                    UnaryOp::Neg => value.mul(&Value::number(-1.0)),
                    UnaryOp::Plus if matches!(value.kind, ValueKind::Number(_)) => Ok(value),
                    UnaryOp::Plus => Err(ValueError::IllegalOperation),
                    UnaryOp::Not => Ok(value.not()),
                };
                result
                    .map(|v| v.stamped(span.clone(), context))
                    .map_err(|err| err.at(span, context))
            }

            Node::If { cases, span } => {
                for case in cases {
                    if self.evaluate(&case.condition, context)?.is_truthy() {
                        return self.evaluate(&case.body, context);
                    }
                }
                Ok(Value::null().stamped(span.clone(), context))
            }

            Node::While {
                condition,
                body,
                span,
            } => {
                let mut results = Vec::new();
                while self.evaluate(condition, context)?.is_truthy() {
                    results.push(self.evaluate(body, context)?);
                }
                Ok(Value::list(results).stamped(span.clone(), context))
            }

            Node::FuncDef(def) => Ok(self.define_function(def, context)),

            Node::Call { callee, args, span } => {
                let callee = self
                    .evaluate(callee, context)?
                    .stamped(callee.span(), context);
                let args = self.evaluate_all(args, context)?;
                self.call_value(&callee, args, span, context)
            }

            Node::Convert {
                kind,
                target,
                args,
                span,
            } => {
                let target = self
                    .evaluate(target, context)?
                    .stamped(target.span(), context);
                let indices = self.evaluate_all(args, context)?;
                self.convert(&target, *kind, &indices, span, context)
            }
        }
    }

    /// Calls `callee` with already evaluated arguments
    ///
    /// `span` is the call expression; `context` is the caller's context.
    pub fn call_value(
        &self,
        callee: &Value,
        args: Vec<Value>,
        span: &Span,
        context: &Rc<Context>,
    ) -> Result<Value> {
        match &callee.kind {
            ValueKind::Function(function) => self.call_function(function, args, span, context),
            ValueKind::Block(block) => self.call_block(block, args, span, context),
            ValueKind::Builtin(builtin) => {
                let _call = tracing::trace_span!("call", name = builtin.name()).entered();
                self.check_arity(builtin.name(), builtin.params().len(), args.len(), span, context)?;
                builtins::execute(self, *builtin, args, span, context)
            }
            _ => Err(ValueError::IllegalOperation.at(span, context)),
        }
    }

    fn call_function(
        &self,
        function: &Function,
        args: Vec<Value>,
        span: &Span,
        caller: &Rc<Context>,
    ) -> Result<Value> {
        let name = function.name();
        let _call = tracing::trace_span!("call", name).entered();
        let params = function.def.param_names();
        self.check_arity(name, params.len(), args.len(), span, caller)?;

        let call_context = self.enter(name, &function.scope, span, caller)?;
        tracing::debug!(name, args = args.len(), depth = call_context.depth(), "entering function");

        for (param, arg) in params.iter().zip(args) {
            call_context
                .symbols()
                .set(param, arg.with_context(&call_context));
        }

        self.evaluate_body(&function.def.body, &call_context)
    }

    /// Runs a block like a function without parameters
    fn call_block(
        &self,
        block: &DeferredBlock,
        args: Vec<Value>,
        span: &Span,
        caller: &Rc<Context>,
    ) -> Result<Value> {
        let _call = tracing::trace_span!("call", name = "<block>").entered();
        self.check_arity("<block>", 0, args.len(), span, caller)?;

        let call_context = self.enter("<block>", &block.scope, span, caller)?;
        self.evaluate_sequence(&block.nodes, &call_context)
    }

    /// Depth of a call made from `caller`, failing past the configured limit
    pub(crate) fn enter_depth(&self, span: &Span, caller: &Rc<Context>) -> Result<usize> {
        let depth = caller.depth() + 1;
        if depth > self.config.max_call_depth {
            return Err(Error::runtime(
                RuntimeErrorKind::RecursionLimit,
                span.clone(),
                format!(
                    "Maximum call depth of {} exceeded",
                    self.config.max_call_depth
                ),
                caller,
            ));
        }
        Ok(depth)
    }

    /// Context for a call entered at `span`, child of the callee's scope
    fn enter(
        &self,
        name: &str,
        scope: &Rc<Context>,
        span: &Span,
        caller: &Rc<Context>,
    ) -> Result<Rc<Context>> {
        let depth = self.enter_depth(span, caller)?;
        let symbols = Rc::new(SymbolTable::with_parent(Rc::clone(scope.symbols())));
        Ok(Context::child(
            name,
            Rc::clone(scope),
            span.start.clone(),
            symbols,
            depth,
        ))
    }

    fn check_arity(
        &self,
        name: &str,
        expected: usize,
        got: usize,
        span: &Span,
        context: &Rc<Context>,
    ) -> Result<()> {
        let problem = if got < expected {
            "too few"
        } else if got > expected {
            "too many"
        } else {
            return Ok(());
        };

        Err(Error::runtime(
            RuntimeErrorKind::Arity,
            span.clone(),
            format!(
                "{} args passed into '{}' (expected {}, got {})",
                problem, name, expected, got
            ),
            context,
        ))
    }

    fn define_function(&self, def: &Rc<FunctionDef>, context: &Rc<Context>) -> Value {
        let value = Value::function(Function {
            def: Rc::clone(def),
            scope: Rc::clone(context),
        })
        .stamped(def.span.clone(), context);

        if let Some(name) = def.name.as_ref().and_then(|t| t.identifier()) {
            context.symbols().set(name, value.clone());
        }
        value
    }

    /// A block body runs element by element; any other body is one expression
    fn evaluate_body(&self, body: &Node, context: &Rc<Context>) -> Result<Value> {
        match body {
            Node::Block(block) => self.evaluate_sequence(&block.elements, context),
            other => self.evaluate(other, context),
        }
    }

    /// Value of the last node, `null` for an empty sequence
    fn evaluate_sequence(&self, nodes: &[Node], context: &Rc<Context>) -> Result<Value> {
        let mut last = Value::null();
        for node in nodes {
            last = self.evaluate(node, context)?;
        }
        Ok(last)
    }

    fn evaluate_all(&self, nodes: &[Node], context: &Rc<Context>) -> Result<Vec<Value>> {
        nodes
            .iter()
            .map(|node| self.evaluate(node, context))
            .collect()
    }

    fn binary_op(&self, lhs: &Value, op: BinaryOp, rhs: &Value) -> std::result::Result<Value, ValueError> {
        match op {
            BinaryOp::Add => lhs.add(rhs),
            BinaryOp::Sub => lhs.sub(rhs),
            BinaryOp::Mul => lhs.mul(rhs),
            BinaryOp::Div => lhs.div(rhs),
            BinaryOp::Pow => lhs.pow(rhs),
            BinaryOp::Tetration => lhs.tetrate(rhs),
            BinaryOp::Eq => Ok(lhs.eq_value(rhs)),
            BinaryOp::Ne => Ok(lhs.ne_value(rhs)),
            BinaryOp::Lt => lhs.lt(rhs),
            BinaryOp::Gt => lhs.gt(rhs),
            BinaryOp::Lte => lhs.lte(rhs),
            BinaryOp::Gte => lhs.gte(rhs),
            BinaryOp::And => Ok(lhs.and(rhs)),
            BinaryOp::Or => Ok(lhs.or(rhs)),
        }
    }

    fn convert(
        &self,
        target: &Value,
        kind: ConversionKind,
        indices: &[Value],
        span: &Span,
        context: &Rc<Context>,
    ) -> Result<Value> {
        if let ValueKind::Block(block) = &target.kind {
            return self.convert_block(block, kind, indices, span, context);
        }

        target
            .convert(kind, indices)
            .map(|v| v.stamped(span.clone(), context))
            .map_err(|err| err.at(span, context))
    }

    /// Block conversions evaluate the selected nodes in the block's own
    /// scope, except `{..}` which keeps them deferred
    ///
    /// Evaluation counts as one call level. The `<block>` context shares the
    /// scope's table, so assignments land in the captured scope.
    fn convert_block(
        &self,
        block: &DeferredBlock,
        kind: ConversionKind,
        indices: &[Value],
        span: &Span,
        context: &Rc<Context>,
    ) -> Result<Value> {
        let located = |err: ValueError| err.at(span, context);

        let value = match (kind, indices) {
            (ConversionKind::Curl, []) => Value::block(block.clone()),
            (ConversionKind::Curl, [_, _, ..]) => {
                Value::block(block.subset(indices).map_err(located)?)
            }
            (_, [_]) => {
                let positions = block.positions(indices).map_err(located)?;
                let scope = self.enter_block_scope(block, span, context)?;
                return self.evaluate(&block.nodes[positions[0]], &scope);
            }
            (_, []) => {
                let scope = self.enter_block_scope(block, span, context)?;
                let items = self.evaluate_all(&block.nodes, &scope)?;
                wrap(kind, items)
            }
            (_, _) => {
                let positions = block.positions(indices).map_err(located)?;
                let scope = self.enter_block_scope(block, span, context)?;
                let items = positions
                    .into_iter()
                    .map(|i| self.evaluate(&block.nodes[i], &scope))
                    .collect::<Result<Vec<_>>>()?;
                wrap(kind, items)
            }
        };

        Ok(value.stamped(span.clone(), context))
    }

    fn enter_block_scope(
        &self,
        block: &DeferredBlock,
        span: &Span,
        caller: &Rc<Context>,
    ) -> Result<Rc<Context>> {
        let depth = self.enter_depth(span, caller)?;
        Ok(Context::child(
            "<block>",
            Rc::clone(&block.scope),
            span.start.clone(),
            Rc::clone(block.scope.symbols()),
            depth,
        ))
    }
}

fn wrap(kind: ConversionKind, items: Vec<Value>) -> Value {
    match kind {
        ConversionKind::Paren => Value::tuple(items),
        _ => Value::list(items),
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::runtime::{BufferConsole, PROGRAM_CONTEXT};

    fn eval_with(interpreter: &Interpreter, source: &str) -> Result<Value> {
        let node = parse(tokenize("<test>", source)?)?;
        let context = Context::root(PROGRAM_CONTEXT, SymbolTable::global());
        interpreter.evaluate(&node, &context)
    }

    fn eval(source: &str) -> Result<Value> {
        eval_with(&Interpreter::new(), source)
    }

    fn num(n: f64) -> Value {
        Value::number(n)
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("42").unwrap(), num(42.0));
        assert_eq!(eval("2.5").unwrap(), num(2.5));
        assert_eq!(eval("\"hi\"").unwrap(), Value::string("hi"));
        assert_eq!(eval("()").unwrap(), Value::tuple(vec![]));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("2 + 3 * 4").unwrap(), num(14.0));
        assert_eq!(eval("-2 ^ 2").unwrap(), num(-4.0));
        assert_eq!(eval("2 ^^ 3").unwrap(), num(16.0));
        assert_eq!(eval("+5").unwrap(), num(5.0));
    }

    #[test]
    fn test_variables() {
        assert_eq!(eval("{var x : 5; x * 2}[]").unwrap(), Value::list(vec![num(5.0), num(10.0)]));
        assert_eq!(eval("var x : var y : 3").unwrap(), num(3.0));
    }

    #[test]
    fn test_undefined_variable() {
        let err = eval("y").unwrap_err();
        assert_eq!(err.runtime_kind(), Some(RuntimeErrorKind::Undefined));
        assert_eq!(err.detail(), "'y' is not defined");
    }

    #[test]
    fn test_if_and_while() {
        assert_eq!(eval("if 0 : 1 elif 1 : 2 else : 3").unwrap(), num(2.0));
        assert_eq!(eval("if false : 1").unwrap(), Value::null());
        assert_eq!(
            eval("{var i : 0; while i < 3 : var i : i + 1}!").unwrap(),
            Value::list(vec![num(1.0), num(2.0), num(3.0)])
        );
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("(fun add(a, b) : a + b) -> (2, 3)").unwrap(), num(5.0));
        assert_eq!(eval("(fun () {1; 2; 3})!").unwrap(), num(3.0));
        assert_eq!(eval("(fun () {})!").unwrap(), Value::null());
    }

    #[test]
    fn test_closures_see_defining_scope() {
        let source = "{
            fun make(n) : fun (x) : x + n;
            var add2 : make -> (2);
            add2 -> (40)
        }!";
        assert_eq!(eval(source).unwrap(), num(42.0));
    }

    #[test]
    fn test_parameters_do_not_leak() {
        let err = eval("{fun f(a) : a; f -> (1); a}[]").unwrap_err();
        assert_eq!(err.detail(), "'a' is not defined");
    }

    #[test]
    fn test_arity_errors() {
        let err = eval("(fun f(a, b) : a) -> (1)").unwrap_err();
        assert_eq!(
            err.detail(),
            "too few args passed into 'f' (expected 2, got 1)"
        );
        let err = eval("print -> (1, 2)").unwrap_err();
        assert_eq!(
            err.detail(),
            "too many args passed into 'print' (expected 1, got 2)"
        );
    }

    #[test]
    fn test_blocks() {
        assert_eq!(eval("{1 + 1; 3}!").unwrap(), num(3.0));
        assert_eq!(eval("{1 + 1; 3}[]").unwrap(), Value::list(vec![num(2.0), num(3.0)]));
        assert_eq!(eval("{1; 2; 3}(-1)").unwrap(), num(3.0));
        assert_eq!(eval("{1; 2; 3}{0, 2}()").unwrap(), Value::tuple(vec![num(1.0), num(3.0)]));
        assert_eq!(eval("type -> ({1}{})").unwrap(), Value::string("curl"));
    }

    #[test]
    fn test_block_nodes_stay_deferred() {
        let console = Rc::new(BufferConsole::new());
        let interpreter = Interpreter::new().with_console(console.clone());
        let source = "{print -> (1); print -> (2); print -> (3)}{0, 2}";
        eval_with(&interpreter, source).unwrap();
        assert!(console.output().is_empty());

        eval_with(&interpreter, &format!("{source}!")).unwrap();
        assert_eq!(console.output(), vec!["1".to_string(), "3".to_string()]);
    }

    #[test]
    fn test_builtins() {
        let console = Rc::new(BufferConsole::with_input(["typed"]));
        let interpreter = Interpreter::new().with_console(console.clone());

        assert_eq!(eval_with(&interpreter, "print -> (\"hello\")").unwrap(), Value::null());
        assert_eq!(eval_with(&interpreter, "input!").unwrap(), Value::string("typed"));
        assert_eq!(eval_with(&interpreter, "clear!").unwrap(), Value::null());
        assert_eq!(eval_with(&interpreter, "len -> ([1, 2, 3])").unwrap(), num(3.0));
        assert_eq!(eval_with(&interpreter, "type -> (print)").unwrap(), Value::string("builtin-function"));

        assert_eq!(console.output(), vec!["hello".to_string()]);
        assert_eq!(console.clears(), 1);
    }

    #[test]
    fn test_len_of_scalar() {
        let err = eval("len -> (5)").unwrap_err();
        assert_eq!(err.runtime_kind(), Some(RuntimeErrorKind::InvalidArgument));
    }

    #[test]
    fn test_calling_non_callable() {
        let err = eval("5!").unwrap_err();
        assert_eq!(err.runtime_kind(), Some(RuntimeErrorKind::IllegalOperation));
        assert_eq!(err.detail(), "Illegal operation");
    }

    #[test]
    fn test_recursion() {
        let source = "{
            fun fact(n) : if n <= 1 : 1 else : n * (fact -> (n - 1));
            fact -> (10)
        }!";
        assert_eq!(eval(source).unwrap(), num(3628800.0));
    }

    #[test]
    fn test_recursion_limit() {
        let interpreter = Interpreter::with_config(InterpreterConfig { max_call_depth: 10 });
        let err = eval_with(&interpreter, "{fun f() : f!; f!}!").unwrap_err();
        assert_eq!(err.runtime_kind(), Some(RuntimeErrorKind::RecursionLimit));
        assert_eq!(err.detail(), "Maximum call depth of 10 exceeded");
    }

    #[test]
    fn test_self_converting_block_hits_limit() {
        let interpreter = Interpreter::with_config(InterpreterConfig { max_call_depth: 30 });
        let err = eval_with(&interpreter, "{var b : {b[]}; b[]}!").unwrap_err();
        assert_eq!(err.runtime_kind(), Some(RuntimeErrorKind::RecursionLimit));
        assert_eq!(err.detail(), "Maximum call depth of 30 exceeded");
    }

    #[test]
    fn test_block_conversion_depth() {
        // The block call is one level, each conversion another
        let interpreter = Interpreter::with_config(InterpreterConfig { max_call_depth: 3 });
        assert_eq!(eval_with(&interpreter, "{{{1}[0]}[0]}!").unwrap(), num(1.0));
        assert!(eval_with(&interpreter, "{{{{1}[0]}[0]}[0]}!").is_err());
    }

    #[test]
    fn test_traceback_frames() {
        let err = eval("{fun inner() : 1 / 0; inner!}!").unwrap_err();
        match err {
            Error::Runtime { traceback, .. } => {
                let names: Vec<&str> = traceback.iter().map(|f| f.display_name.as_str()).collect();
                assert_eq!(names, vec!["inner", "<block>", "<program>"]);
            }
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_span_covers_operation() {
        let err = eval("1 + \"a\"").unwrap_err();
        assert_eq!(err.span().start.offset, 0);
        assert_eq!(err.span().end.offset, 7);
    }
}
