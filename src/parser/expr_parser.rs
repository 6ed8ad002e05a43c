use std::rc::Rc;

use super::ast::{BinaryOp, Block, Collection, ConversionKind, FunctionDef, IfCase, Node, UnaryOp};
use crate::error::{Error, Result};
use crate::lexer::{Keyword, Position, Source, Token, TokenKind};

const EXPECTED_OPERATOR: &str =
    "Expected '+', '-', '*', '/', '^', '^^', '==', '!=', '<', '>', '<=', '>=', 'and' or 'or'";
const EXPECTED_EXPR: &str = "Expected 'var', 'if', 'while', 'fun', int, float, string, \
                             identifier, '+', '-', '(', '[', '{' or 'not'";
const EXPECTED_COMPARISON: &str = "Expected 'if', 'while', 'fun', int, float, string, \
                                   identifier, '+', '-', '(', '[', '{' or 'not'";
const EXPECTED_ATOM: &str = "Expected int, float, string, identifier, 'if', 'while', 'fun', \
                             '(', '[' or '{'";

type Rule = fn(&mut Parser) -> Result<Node>;

/// Recursive descent parser for Lexi expressions
///
/// Every rule either consumes what it recognised or fails. When a rule fails
/// without consuming anything, the enclosing `expr`/`comp_expr` replaces the
/// error with a summary of what could have started an expression there.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Creates a new parser over a token stream
    ///
    /// The stream is terminated with `Eof` if the caller did not do so.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let end = match tokens.last() {
                Some(last) => last.end.clone(),
                None => Position::start(Source::new("<empty>", "")),
            };
            tokens.push(Token::single(TokenKind::Eof, end));
        }
        Parser { tokens, current: 0 }
    }

    /// Parses the whole token stream into a single expression tree
    pub fn parse(&mut self) -> Result<Node> {
        let node = self.expr()?;

        if !self.is_at_end() {
            return Err(self.syntax_error(EXPECTED_OPERATOR));
        }

        tracing::debug!(tokens = self.tokens.len(), "parsed expression tree");
        Ok(node)
    }

    fn expr(&mut self) -> Result<Node> {
        if self.peek().is_keyword(Keyword::Var) {
            return self.var_assign();
        }

        let start = self.current;
        let result = self.binary_op(Self::comp_expr, &[BinaryOp::And, BinaryOp::Or], Self::comp_expr);
        self.or_expected(start, result, EXPECTED_EXPR)
    }

    fn var_assign(&mut self) -> Result<Node> {
        let var_tok = self.advance();
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Set, "Expected ':'")?;
        let value = self.expr()?;

        let span = var_tok.span().to(&value.span());
        Ok(Node::VarAssign {
            name,
            value: Box::new(value),
            span,
        })
    }

    fn comp_expr(&mut self) -> Result<Node> {
        if self.peek().is_keyword(Keyword::Not) {
            let op_tok = self.advance();
            let operand = self.comp_expr()?;
            return Ok(Self::unary(UnaryOp::Not, &op_tok, operand));
        }

        let start = self.current;
        let result = self.binary_op(
            Self::arith_expr,
            &[
                BinaryOp::Eq,
                BinaryOp::Ne,
                BinaryOp::Lt,
                BinaryOp::Gt,
                BinaryOp::Lte,
                BinaryOp::Gte,
            ],
            Self::arith_expr,
        );
        self.or_expected(start, result, EXPECTED_COMPARISON)
    }

    fn arith_expr(&mut self) -> Result<Node> {
        self.binary_op(Self::term, &[BinaryOp::Add, BinaryOp::Sub], Self::term)
    }

    fn term(&mut self) -> Result<Node> {
        self.binary_op(Self::factor, &[BinaryOp::Mul, BinaryOp::Div], Self::factor)
    }

    fn factor(&mut self) -> Result<Node> {
        self.signed(Self::tetration)
    }

    fn tetration(&mut self) -> Result<Node> {
        self.binary_op(Self::power, &[BinaryOp::Tetration], Self::factor)
    }

    /// `^` is right associative; its right operand never extends into `^^`
    fn power(&mut self) -> Result<Node> {
        self.binary_op(Self::call, &[BinaryOp::Pow], Self::power_operand)
    }

    fn power_operand(&mut self) -> Result<Node> {
        self.signed(Self::power)
    }

    /// Leading `+`/`-` signs, then `rule`
    fn signed(&mut self, rule: Rule) -> Result<Node> {
        let op = match self.peek().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return rule(self),
        };

        let op_tok = self.advance();
        let operand = self.signed(rule)?;
        Ok(Self::unary(op, &op_tok, operand))
    }

    /// `callee -> (args)` and `callee!`, chained left to right
    fn call(&mut self) -> Result<Node> {
        let mut node = self.conversion()?;

        loop {
            let (args, close) = match self.peek().kind {
                TokenKind::Arrow => {
                    self.advance();
                    self.expect(TokenKind::LParen, "Expected '('")?;
                    let args = self.elements(&TokenKind::RParen)?;
                    let close = self.expect(TokenKind::RParen, "Expected ',', ';' or ')'")?;
                    (args, close)
                }
                TokenKind::NSet => (Vec::new(), self.advance()),
                _ => return Ok(node),
            };

            let span = node.span().to(&close.span());
            node = Node::Call {
                callee: Box::new(node),
                args,
                span,
            };
        }
    }

    /// Bracket suffixes directly after an atom
    fn conversion(&mut self) -> Result<Node> {
        let mut node = self.atom()?;

        loop {
            let (kind, close, detail) = match self.peek().kind {
                TokenKind::LSquare => (
                    ConversionKind::List,
                    TokenKind::RSquare,
                    "Expected ',', ';' or ']'",
                ),
                TokenKind::LCurl => (
                    ConversionKind::Curl,
                    TokenKind::RCurl,
                    "Expected ',', ';' or '}'",
                ),
                TokenKind::LParen => (
                    ConversionKind::Paren,
                    TokenKind::RParen,
                    "Expected ',', ';' or ')'",
                ),
                _ => return Ok(node),
            };

            self.advance();
            let args = self.elements(&close)?;
            let close_tok = self.expect(close, detail)?;

            let span = node.span().to(&close_tok.span());
            node = Node::Convert {
                kind,
                target: Box::new(node),
                args,
                span,
            };
        }
    }

    fn atom(&mut self) -> Result<Node> {
        match self.peek().kind {
            TokenKind::Int(_) | TokenKind::Float(_) => Ok(Node::Number(self.advance())),
            TokenKind::Str(_) => Ok(Node::String(self.advance())),
            TokenKind::Identifier(_) => Ok(Node::VarAccess(self.advance())),
            TokenKind::LParen => {
                let mut collection =
                    self.collection(TokenKind::RParen, "Expected ',', ';' or ')'")?;
                if collection.elements.len() == 1 {
                    // Grouping
                    if let Some(inner) = collection.elements.pop() {
                        return Ok(inner);
                    }
                }
                Ok(Node::Tuple(collection))
            }
            TokenKind::LSquare => {
                let collection = self.collection(TokenKind::RSquare, "Expected ',', ';' or ']'")?;
                Ok(Node::List(collection))
            }
            TokenKind::LCurl => self.block(),
            TokenKind::Keyword(Keyword::If) => self.if_expr(),
            TokenKind::Keyword(Keyword::While) => self.while_expr(),
            TokenKind::Keyword(Keyword::Fun) => self.func_def(),
            _ => Err(self.syntax_error(EXPECTED_ATOM)),
        }
    }

    fn block(&mut self) -> Result<Node> {
        let collection = self.collection(TokenKind::RCurl, "Expected ',', ';' or '}'")?;
        Ok(Node::Block(Block {
            elements: Rc::from(collection.elements),
            span: collection.span,
        }))
    }

    /// Opening bracket, elements, closing bracket
    fn collection(&mut self, close: TokenKind, detail: &str) -> Result<Collection> {
        let open = self.advance();
        let elements = self.elements(&close)?;
        let close_tok = self.expect(close, detail)?;

        Ok(Collection {
            elements,
            span: open.span().to(&close_tok.span()),
        })
    }

    /// Separated expressions up to (not including) `close`; empty slots
    /// between separators are skipped
    fn elements(&mut self, close: &TokenKind) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();

        if self.check(close) {
            return Ok(nodes);
        }
        nodes.push(self.expr()?);

        while self.is_separator() {
            self.advance();
            if self.check(close) || self.is_separator() {
                continue;
            }
            nodes.push(self.expr()?);
        }

        Ok(nodes)
    }

    fn if_expr(&mut self) -> Result<Node> {
        let if_tok = self.advance();
        let mut cases = vec![self.if_case()?];

        while self.peek().is_keyword(Keyword::Elif) {
            self.advance();
            cases.push(self.if_case()?);
        }

        if self.peek().is_keyword(Keyword::Else) {
            let else_tok = self.advance();
            self.expect(TokenKind::Set, "Expected ':'")?;
            let body = self.expr()?;
            let condition = Node::VarAccess(Token::new(
                TokenKind::Identifier("true".to_string()),
                else_tok.start,
                else_tok.end,
            ));
            cases.push(IfCase { condition, body });
        }

        let end = match cases.last() {
            Some(case) => case.body.span(),
            None => if_tok.span(),
        };
        Ok(Node::If {
            span: if_tok.span().to(&end),
            cases,
        })
    }

    fn if_case(&mut self) -> Result<IfCase> {
        let condition = self.expr()?;
        self.expect(TokenKind::Set, "Expected ':'")?;
        let body = self.expr()?;
        Ok(IfCase { condition, body })
    }

    fn while_expr(&mut self) -> Result<Node> {
        let while_tok = self.advance();
        let condition = self.expr()?;
        self.expect(TokenKind::Set, "Expected ':'")?;
        let body = self.expr()?;

        let span = while_tok.span().to(&body.span());
        Ok(Node::While {
            condition: Box::new(condition),
            body: Box::new(body),
            span,
        })
    }

    fn func_def(&mut self) -> Result<Node> {
        let fun_tok = self.advance();

        let name = match self.peek().kind {
            TokenKind::Identifier(_) => Some(self.advance()),
            _ => None,
        };
        let open_detail = if name.is_some() {
            "Expected '('"
        } else {
            "Expected identifier or '('"
        };
        self.expect(TokenKind::LParen, open_detail)?;

        let mut params = Vec::new();
        if let TokenKind::Identifier(_) = self.peek().kind {
            params.push(self.advance());
            while self.check(&TokenKind::Comma) {
                self.advance();
                params.push(self.expect_identifier()?);
            }
        }
        let close_detail = if params.is_empty() {
            "Expected identifier or ')'"
        } else {
            "Expected ',' or ')'"
        };
        self.expect(TokenKind::RParen, close_detail)?;

        let body = match self.peek().kind {
            TokenKind::Set => {
                self.advance();
                self.expr()?
            }
            TokenKind::LCurl => self.block()?,
            _ => return Err(self.syntax_error("Expected ':' or '{'")),
        };

        let span = fun_tok.span().to(&body.span());
        Ok(Node::FuncDef(Rc::new(FunctionDef {
            name,
            params,
            body,
            span,
        })))
    }

    /// `operand (op operand)*`, folded to the left
    fn binary_op(&mut self, left_rule: Rule, ops: &[BinaryOp], right_rule: Rule) -> Result<Node> {
        let mut left = left_rule(self)?;

        while let Some(op) = BinaryOp::from_token(&self.peek().kind).filter(|op| ops.contains(op)) {
            self.advance();
            let right = right_rule(self)?;
            left = Node::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn unary(op: UnaryOp, op_tok: &Token, operand: Node) -> Node {
        let span = op_tok.span().to(&operand.span());
        Node::UnaryOp {
            op,
            operand: Box::new(operand),
            span,
        }
    }

    /// Replaces `result`'s error with `detail` when nothing was consumed
    /// since `start`
    fn or_expected(&self, start: usize, result: Result<Node>, detail: &str) -> Result<Node> {
        result.map_err(|err| {
            if self.current == start {
                self.syntax_error(detail)
            } else {
                err
            }
        })
    }

    fn expect_identifier(&mut self) -> Result<Token> {
        match self.peek().kind {
            TokenKind::Identifier(_) => Ok(self.advance()),
            _ => Err(self.syntax_error("Expected identifier")),
        }
    }

    fn expect(&mut self, kind: TokenKind, detail: &str) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.syntax_error(detail))
        }
    }

    fn syntax_error(&self, detail: &str) -> Error {
        Error::invalid_syntax(self.peek().span(), detail)
    }

    fn is_separator(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Comma | TokenKind::Semi)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }
}

/// Parses a token stream produced by [`crate::lexer::tokenize`]
pub fn parse(tokens: Vec<Token>) -> Result<Node> {
    Parser::new(tokens).parse()
}
