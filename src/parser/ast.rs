use serde::Serialize;
use std::fmt;
use std::rc::Rc;

use crate::lexer::{Keyword, Span, Token, TokenKind};

/// Expression tree produced by the parser
///
/// A Lexi program is a single expression; statements such as assignments,
/// conditionals and loops are expressions that yield values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    /// Integer or float literal
    Number(Token),
    /// String literal
    String(Token),
    /// `[a, b]`
    List(Collection),
    /// `(a, b)` with anything but exactly one element
    Tuple(Collection),
    /// `{a; b}`, kept unevaluated until converted or called
    Block(Block),
    /// Variable read
    VarAccess(Token),
    /// `var name : value`
    VarAssign {
        /// Variable name token
        name: Token,
        /// Value expression
        value: Box<Node>,
        /// From `var` to the end of the value
        span: Span,
    },
    /// Binary operation
    BinaryOp {
        /// Left operand
        left: Box<Node>,
        /// Operator
        op: BinaryOp,
        /// Right operand
        right: Box<Node>,
    },
    /// Prefix operation
    UnaryOp {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Node>,
        /// From the operator to the end of the operand
        span: Span,
    },
    /// `if c : a elif d : b else : e`
    If {
        /// Cases in source order; an `else` branch is the last case with an
        /// always-true condition
        cases: Vec<IfCase>,
        /// Whole conditional
        span: Span,
    },
    /// `while c : body`
    While {
        /// Loop condition
        condition: Box<Node>,
        /// Body evaluated once per iteration
        body: Box<Node>,
        /// Whole loop
        span: Span,
    },
    /// `fun name(a, b) : body`
    FuncDef(Rc<FunctionDef>),
    /// `callee -> (args)` or `callee!`
    Call {
        /// Expression producing the value to call
        callee: Box<Node>,
        /// Argument expressions
        args: Vec<Node>,
        /// Whole call
        span: Span,
    },
    /// `target[..]`, `target{..}` or `target(..)`
    Convert {
        /// Requested collection kind
        kind: ConversionKind,
        /// Expression being converted or indexed
        target: Box<Node>,
        /// Index expressions, empty for a whole-value conversion
        args: Vec<Node>,
        /// Whole conversion
        span: Span,
    },
}

/// Elements of a list or tuple literal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    /// Element expressions
    pub elements: Vec<Node>,
    /// From the opening to the closing bracket
    pub span: Span,
}

/// Elements of a deferred block literal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    /// Element expressions, shared with block values built from this literal
    pub elements: Rc<[Node]>,
    /// From `{` to `}`
    pub span: Span,
}

/// One branch of a conditional
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfCase {
    /// Branch condition
    pub condition: Node,
    /// Expression evaluated when the condition holds
    pub body: Node,
}

/// Function definition, shared between the tree and the function values
/// created from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDef {
    /// Name for named definitions
    pub name: Option<Token>,
    /// Parameter name tokens
    pub params: Vec<Token>,
    /// Body; a block body is evaluated element by element
    pub body: Node,
    /// From `fun` to the end of the body
    pub span: Span,
}

impl FunctionDef {
    /// Name used in tracebacks and error messages
    pub fn display_name(&self) -> &str {
        self.name
            .as_ref()
            .and_then(Token::identifier)
            .unwrap_or("<anonymous>")
    }

    /// Parameter names in declaration order
    pub fn param_names(&self) -> Vec<String> {
        self.params
            .iter()
            .filter_map(|t| t.identifier().map(str::to_string))
            .collect()
    }
}

/// Which bracket pair requested a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConversionKind {
    /// `[..]`
    List,
    /// `{..}`
    Curl,
    /// `(..)`
    Paren,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    // Arithmetic
    /// Addition operator (+)
    Add,
    /// Subtraction operator (-)
    Sub,
    /// Multiplication operator (*)
    Mul,
    /// Division operator (/)
    Div,
    /// Power operator (^)
    Pow,
    /// Tetration operator (^^)
    Tetration,

    // Comparison
    /// Equality operator (==)
    Eq,
    /// Inequality operator (!=)
    Ne,
    /// Less than operator (<)
    Lt,
    /// Greater than operator (>)
    Gt,
    /// Less than or equal operator (<=)
    Lte,
    /// Greater than or equal operator (>=)
    Gte,

    // Logical
    /// Logical AND operator
    And,
    /// Logical OR operator
    Or,
}

impl BinaryOp {
    /// Operator spelled by `kind`, if any
    pub fn from_token(kind: &TokenKind) -> Option<BinaryOp> {
        Some(match kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Mul => BinaryOp::Mul,
            TokenKind::Div => BinaryOp::Div,
            TokenKind::Pow => BinaryOp::Pow,
            TokenKind::Tetration => BinaryOp::Tetration,
            TokenKind::Ee => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Lte => BinaryOp::Lte,
            TokenKind::Gte => BinaryOp::Gte,
            TokenKind::Keyword(Keyword::And) => BinaryOp::And,
            TokenKind::Keyword(Keyword::Or) => BinaryOp::Or,
            _ => return None,
        })
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    /// Negation operator (-x)
    Neg,
    /// Identity operator (+x)
    Plus,
    /// Logical NOT operator (not x)
    Not,
}

impl Node {
    /// Source span covered by the node
    pub fn span(&self) -> Span {
        match self {
            Node::Number(tok) | Node::String(tok) | Node::VarAccess(tok) => tok.span(),
            Node::List(c) | Node::Tuple(c) => c.span.clone(),
            Node::Block(b) => b.span.clone(),
            Node::BinaryOp { left, right, .. } => left.span().to(&right.span()),
            Node::FuncDef(def) => def.span.clone(),
            Node::VarAssign { span, .. }
            | Node::UnaryOp { span, .. }
            | Node::If { span, .. }
            | Node::While { span, .. }
            | Node::Call { span, .. }
            | Node::Convert { span, .. } => span.clone(),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Tetration => "^^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Lte => "<=",
            BinaryOp::Gte => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Plus => write!(f, "+"),
            UnaryOp::Not => write!(f, "not"),
        }
    }
}

/// Compact s-expression rendering, handy when checking precedence
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn join(f: &mut fmt::Formatter, nodes: &[Node]) -> fmt::Result {
            for (i, node) in nodes.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", node)?;
            }
            Ok(())
        }

        match self {
            Node::Number(tok) => match &tok.kind {
                TokenKind::Int(n) => write!(f, "{}", n),
                TokenKind::Float(n) => write!(f, "{}", n),
                other => write!(f, "{}", other),
            },
            Node::String(tok) => match &tok.kind {
                TokenKind::Str(s) => write!(f, "{:?}", s),
                other => write!(f, "{}", other),
            },
            Node::VarAccess(tok) => write!(f, "{}", tok.identifier().unwrap_or("?")),
            Node::List(c) => {
                write!(f, "[")?;
                join(f, &c.elements)?;
                write!(f, "]")
            }
            Node::Tuple(c) => {
                write!(f, "(tuple")?;
                if !c.elements.is_empty() {
                    write!(f, " ")?;
                }
                join(f, &c.elements)?;
                write!(f, ")")
            }
            Node::Block(b) => {
                write!(f, "{{")?;
                join(f, &b.elements)?;
                write!(f, "}}")
            }
            Node::VarAssign { name, value, .. } => {
                write!(f, "(var {} {})", name.identifier().unwrap_or("?"), value)
            }
            Node::BinaryOp { left, op, right } => write!(f, "({} {} {})", op, left, right),
            Node::UnaryOp { op, operand, .. } => write!(f, "({} {})", op, operand),
            Node::If { cases, .. } => {
                write!(f, "(if")?;
                for case in cases {
                    write!(f, " [{} {}]", case.condition, case.body)?;
                }
                write!(f, ")")
            }
            Node::While {
                condition, body, ..
            } => write!(f, "(while {} {})", condition, body),
            Node::FuncDef(def) => {
                write!(f, "(fun {} (", def.display_name())?;
                write!(f, "{}", def.param_names().join(" "))?;
                write!(f, ") {})", def.body)
            }
            Node::Call { callee, args, .. } => {
                write!(f, "(call {}", callee)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
            Node::Convert {
                kind, target, args, ..
            } => {
                let name = match kind {
                    ConversionKind::List => "list",
                    ConversionKind::Curl => "curl",
                    ConversionKind::Paren => "tuple",
                };
                write!(f, "(as-{} {}", name, target)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_op_from_token() {
        assert_eq!(BinaryOp::from_token(&TokenKind::Tetration), Some(BinaryOp::Tetration));
        assert_eq!(
            BinaryOp::from_token(&TokenKind::Keyword(Keyword::Or)),
            Some(BinaryOp::Or)
        );
        assert_eq!(BinaryOp::from_token(&TokenKind::Comma), None);
    }

    #[test]
    fn test_operator_display() {
        assert_eq!(BinaryOp::Gte.to_string(), ">=");
        assert_eq!(UnaryOp::Not.to_string(), "not");
    }
}
