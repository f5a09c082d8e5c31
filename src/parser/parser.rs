use crate::analyzer::{Kind, Scopes, SymbolTable};
use crate::error::{ParseError, ParseErrorKind, SymbolError};
use crate::lexer::{Keyword, Lexer, Token, TokenKind, OPERATORS};

use super::{NodeKind, ParseNode};

/// Deepest allowed nesting of statement blocks, expressions and terms.
/// Every parenthesised term costs two levels (term and expression).
pub const MAX_NESTING: usize = 128;

/// What the parser does when a token does not fit the grammar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Stop at the first error.
    #[default]
    Strict,
    /// Record the error, consume the offending token and keep going.
    /// Running out of input and lexical errors still stop the parse.
    Lenient,
}

/// Everything produced by compiling one class.
#[derive(Clone, Debug)]
pub struct CompiledClass {
    pub name: String,
    pub tree: ParseNode,
    pub class_symbols: SymbolTable,
    /// Each subroutine's table as it stood when its body was closed.
    pub subroutine_symbols: Vec<(String, SymbolTable)>,
    /// Errors recorded in [`ErrorMode::Lenient`]; always empty otherwise.
    pub diagnostics: Vec<ParseError>,
}

impl CompiledClass {
    pub fn subroutine(&self, name: &str) -> Option<&SymbolTable> {
        self.subroutine_symbols
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, table)| table)
    }
}

#[derive(Debug)]
pub struct Parser {
    lexer: Lexer,
    current: Option<Token>,
    peeked: Option<Token>,
    mode: ErrorMode,
    class_name: String,
    scopes: Scopes,
    snapshots: Vec<(String, SymbolTable)>,
    diagnostics: Vec<ParseError>,
    depth: usize,
}

fn is_type(t: &Token) -> bool {
    t.is_identifier()
        || t.is_keyword(Keyword::Int)
        || t.is_keyword(Keyword::Char)
        || t.is_keyword(Keyword::Boolean)
}

fn is_keyword_constant(t: &Token) -> bool {
    matches!(
        t.keyword(),
        Some(Keyword::True | Keyword::False | Keyword::Null | Keyword::This)
    )
}

fn is_term_start(t: &Token) -> bool {
    match t.kind {
        TokenKind::IntegerConstant | TokenKind::StringConstant | TokenKind::Identifier => true,
        TokenKind::Keyword => is_keyword_constant(t),
        TokenKind::Symbol => t.is_symbol('(') || t.is_symbol('-') || t.is_symbol('~'),
    }
}

fn is_operator(t: &Token) -> bool {
    t.symbol().is_some_and(|c| OPERATORS.contains(&c))
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        Self::with_mode(source, ErrorMode::Strict)
    }

    pub fn with_mode(source: &str, mode: ErrorMode) -> Result<Self, ParseError> {
        let mut parser = Self {
            lexer: Lexer::new(source)?,
            current: None,
            peeked: None,
            mode,
            class_name: String::new(),
            scopes: Scopes::new(),
            snapshots: vec![],
            diagnostics: vec![],
            depth: 0,
        };
        parser.current = parser.pull()?;
        parser.peeked = parser.pull()?;
        Ok(parser)
    }

    fn pull(&mut self) -> Result<Option<Token>, ParseError> {
        if !self.lexer.has_more_tokens() {
            return Ok(None);
        }
        Ok(Some(self.lexer.advance()?.clone()))
    }

    fn line(&self) -> usize {
        self.current
            .as_ref()
            .map_or_else(|| self.lexer.line(), |t| t.line)
    }

    /// Consumes the current token.
    fn bump(&mut self, expected: &str) -> Result<Token, ParseError> {
        let Some(token) = self.current.take() else {
            return Err(self.eof(expected));
        };
        self.current = self.peeked.take();
        self.peeked = self.pull()?;
        Ok(token)
    }

    fn eof(&self, expected: &str) -> ParseError {
        ParseError::new(
            self.line(),
            ParseErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            },
        )
    }

    fn at(&self, pred: impl Fn(&Token) -> bool) -> bool {
        self.current.as_ref().is_some_and(pred)
    }

    fn at_keyword(&self, keywords: &[Keyword]) -> bool {
        self.at(|t| t.keyword().is_some_and(|k| keywords.contains(&k)))
    }

    fn at_symbol(&self, symbol: char) -> bool {
        self.at(|t| t.is_symbol(symbol))
    }

    /// Fails in strict mode, records the error in lenient mode.
    fn report(&mut self, err: ParseError) -> Result<(), ParseError> {
        match self.mode {
            ErrorMode::Strict => Err(err),
            ErrorMode::Lenient => {
                log::warn!("{}", err);
                self.diagnostics.push(err);
                Ok(())
            }
        }
    }

    fn check_symbol(
        &mut self,
        result: Result<usize, SymbolError>,
        at: &Token,
    ) -> Result<(), ParseError> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => self.report(ParseError::new(at.line, ParseErrorKind::Symbol(e))),
        }
    }

    /// Runs `rule` one nesting level deeper. Exceeding [`MAX_NESTING`] stops
    /// the parse in either error mode.
    fn nested<T>(
        &mut self,
        rule: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                self.line(),
                ParseErrorKind::NestingTooDeep { limit: MAX_NESTING },
            ));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn open(&self, kind: NodeKind) -> ParseNode {
        log::debug!("line {}: {}", self.line(), kind.tag());
        ParseNode::new(kind)
    }

    /// Consumes the current token into `node` if it satisfies `pred`.
    ///
    /// On a mismatch the token is consumed and kept anyway when running
    /// leniently.
    fn expect(
        &mut self,
        node: &mut ParseNode,
        expected: &str,
        pred: impl Fn(&Token) -> bool,
    ) -> Result<Token, ParseError> {
        let Some(found) = self.current.clone() else {
            return Err(self.eof(expected));
        };
        if !pred(&found) {
            self.report(ParseError::new(
                found.line,
                ParseErrorKind::Expected {
                    expected: expected.to_string(),
                    found: found.clone(),
                },
            ))?;
        }
        let token = self.bump(expected)?;
        node.push_token(token.clone());
        Ok(token)
    }

    fn expect_keyword(
        &mut self,
        node: &mut ParseNode,
        keyword: Keyword,
    ) -> Result<Token, ParseError> {
        let expected = format!("keyword '{}'", keyword);
        self.expect(node, &expected, |t| t.is_keyword(keyword))
    }

    fn expect_keywords(
        &mut self,
        node: &mut ParseNode,
        keywords: &[Keyword],
    ) -> Result<Token, ParseError> {
        let expected = keywords
            .iter()
            .map(|k| format!("'{}'", k))
            .collect::<Vec<_>>()
            .join(" or ");
        self.expect(node, &expected, |t| {
            t.keyword().is_some_and(|k| keywords.contains(&k))
        })
    }

    fn expect_symbol(&mut self, node: &mut ParseNode, symbol: char) -> Result<Token, ParseError> {
        let expected = format!("symbol '{}'", symbol);
        self.expect(node, &expected, |t| t.is_symbol(symbol))
    }

    fn expect_identifier(&mut self, node: &mut ParseNode) -> Result<Token, ParseError> {
        self.expect(node, "identifier", |t| t.is_identifier())
    }

    fn expect_type(&mut self, node: &mut ParseNode) -> Result<Token, ParseError> {
        self.expect(node, "type", is_type)
    }

    /// class = "class" className "{" classVarDec* subroutineDec* "}"
    pub fn compile_class(mut self) -> Result<CompiledClass, ParseError> {
        let mut node = self.open(NodeKind::Class);

        self.expect_keyword(&mut node, Keyword::Class)?;
        let name = self.expect_identifier(&mut node)?;
        self.class_name = name.lexeme.clone();
        self.expect_symbol(&mut node, '{')?;

        while self.at_keyword(&[Keyword::Static, Keyword::Field]) {
            let dec = self.compile_class_var_dec()?;
            node.push_node(dec);
        }
        while self.at_keyword(&[Keyword::Constructor, Keyword::Function, Keyword::Method]) {
            let dec = self.compile_subroutine_dec()?;
            node.push_node(dec);
        }

        self.expect_symbol(&mut node, '}')?;

        if let Some(found) = self.current.clone() {
            self.report(ParseError::new(
                found.line,
                ParseErrorKind::Expected {
                    expected: "end of input".to_string(),
                    found,
                },
            ))?;
        }

        Ok(CompiledClass {
            name: self.class_name,
            tree: node,
            class_symbols: self.scopes.class,
            subroutine_symbols: self.snapshots,
            diagnostics: self.diagnostics,
        })
    }

    /// classVarDec = ("static" | "field") type varName ("," varName)* ";"
    fn compile_class_var_dec(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::ClassVarDec);

        let kind = match self
            .expect_keywords(&mut node, &[Keyword::Static, Keyword::Field])?
            .keyword()
        {
            Some(Keyword::Static) => Kind::Static,
            _ => Kind::Field,
        };
        let ty = self.expect_type(&mut node)?.lexeme;

        loop {
            let name = self.expect_identifier(&mut node)?;
            if name.is_identifier() {
                let result = self.scopes.class.define(&name.lexeme, &ty, kind);
                self.check_symbol(result, &name)?;
            }
            if !self.at_symbol(',') {
                break;
            }
            self.expect_symbol(&mut node, ',')?;
        }

        self.expect_symbol(&mut node, ';')?;
        Ok(node)
    }

    /// subroutineDec = ("constructor" | "function" | "method") ("void" | type)
    ///                 subroutineName "(" parameterList ")" subroutineBody
    fn compile_subroutine_dec(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::SubroutineDec);

        let keyword = self.expect_keywords(
            &mut node,
            &[Keyword::Constructor, Keyword::Function, Keyword::Method],
        )?;

        self.scopes.subroutine.reset();
        if keyword.is_keyword(Keyword::Method) {
            let result = self
                .scopes
                .subroutine
                .define("this", &self.class_name, Kind::Argument);
            self.check_symbol(result, &keyword)?;
        }

        self.expect(&mut node, "'void' or type", |t| {
            t.is_keyword(Keyword::Void) || is_type(t)
        })?;
        let name = self.expect_identifier(&mut node)?;

        self.expect_symbol(&mut node, '(')?;
        let params = self.compile_parameter_list()?;
        node.push_node(params);
        self.expect_symbol(&mut node, ')')?;

        let body = self.compile_subroutine_body()?;
        node.push_node(body);

        self.snapshots
            .push((name.lexeme, self.scopes.subroutine.clone()));
        Ok(node)
    }

    /// parameterList = (type varName ("," type varName)*)?
    fn compile_parameter_list(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::ParameterList);

        if !self.at(is_type) {
            return Ok(node);
        }

        loop {
            let ty = self.expect_type(&mut node)?.lexeme;
            let name = self.expect_identifier(&mut node)?;
            if name.is_identifier() {
                let result = self
                    .scopes
                    .subroutine
                    .define(&name.lexeme, &ty, Kind::Argument);
                self.check_symbol(result, &name)?;
            }
            if !self.at_symbol(',') {
                break;
            }
            self.expect_symbol(&mut node, ',')?;
        }

        Ok(node)
    }

    /// subroutineBody = "{" varDec* statements "}"
    fn compile_subroutine_body(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::SubroutineBody);

        self.expect_symbol(&mut node, '{')?;
        while self.at_keyword(&[Keyword::Var]) {
            let dec = self.compile_var_dec()?;
            node.push_node(dec);
        }
        let statements = self.compile_statements()?;
        node.push_node(statements);
        self.expect_symbol(&mut node, '}')?;

        Ok(node)
    }

    /// varDec = "var" type varName ("," varName)* ";"
    fn compile_var_dec(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::VarDec);

        self.expect_keyword(&mut node, Keyword::Var)?;
        let ty = self.expect_type(&mut node)?.lexeme;

        loop {
            let name = self.expect_identifier(&mut node)?;
            if name.is_identifier() {
                let result = self
                    .scopes
                    .subroutine
                    .define(&name.lexeme, &ty, Kind::Local);
                self.check_symbol(result, &name)?;
            }
            if !self.at_symbol(',') {
                break;
            }
            self.expect_symbol(&mut node, ',')?;
        }

        self.expect_symbol(&mut node, ';')?;
        Ok(node)
    }

    /// statements = (letStatement | ifStatement | whileStatement
    ///              | doStatement | returnStatement)*
    fn compile_statements(&mut self) -> Result<ParseNode, ParseError> {
        self.nested(Self::parse_statements)
    }

    fn parse_statements(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::Statements);

        loop {
            let statement = match self.current.as_ref().and_then(Token::keyword) {
                Some(Keyword::Let) => self.compile_let()?,
                Some(Keyword::If) => self.compile_if()?,
                Some(Keyword::While) => self.compile_while()?,
                Some(Keyword::Do) => self.compile_do()?,
                Some(Keyword::Return) => self.compile_return()?,
                _ => break,
            };
            node.push_node(statement);
        }

        Ok(node)
    }

    /// letStatement = "let" varName ("[" expression "]")? "=" expression ";"
    fn compile_let(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::LetStatement);

        self.expect_keyword(&mut node, Keyword::Let)?;
        self.expect_identifier(&mut node)?;
        if self.at_symbol('[') {
            self.expect_symbol(&mut node, '[')?;
            self.compile_required_expression(&mut node)?;
            self.expect_symbol(&mut node, ']')?;
        }
        self.expect_symbol(&mut node, '=')?;
        self.compile_required_expression(&mut node)?;
        self.expect_symbol(&mut node, ';')?;

        Ok(node)
    }

    /// "{" statements "}"
    fn compile_block(&mut self, node: &mut ParseNode) -> Result<(), ParseError> {
        self.expect_symbol(node, '{')?;
        let statements = self.compile_statements()?;
        node.push_node(statements);
        self.expect_symbol(node, '}')?;
        Ok(())
    }

    /// ifStatement = "if" "(" expression ")" "{" statements "}"
    ///               ("else" "{" statements "}")?
    fn compile_if(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::IfStatement);

        self.expect_keyword(&mut node, Keyword::If)?;
        self.expect_symbol(&mut node, '(')?;
        self.compile_required_expression(&mut node)?;
        self.expect_symbol(&mut node, ')')?;
        self.compile_block(&mut node)?;

        if self.at_keyword(&[Keyword::Else]) {
            self.expect_keyword(&mut node, Keyword::Else)?;
            self.compile_block(&mut node)?;
        }

        while self.at_keyword(&[Keyword::Else]) {
            self.report(ParseError::new(self.line(), ParseErrorKind::DuplicateElse))?;
            // parsed for resynchronisation only, never attached to the tree
            let mut extra = ParseNode::new(NodeKind::IfStatement);
            self.expect_keyword(&mut extra, Keyword::Else)?;
            self.compile_block(&mut extra)?;
        }

        Ok(node)
    }

    /// whileStatement = "while" "(" expression ")" "{" statements "}"
    fn compile_while(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::WhileStatement);

        self.expect_keyword(&mut node, Keyword::While)?;
        self.expect_symbol(&mut node, '(')?;
        self.compile_required_expression(&mut node)?;
        self.expect_symbol(&mut node, ')')?;
        self.compile_block(&mut node)?;

        Ok(node)
    }

    /// doStatement = "do" subroutineCall ";"
    fn compile_do(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::DoStatement);

        self.expect_keyword(&mut node, Keyword::Do)?;
        self.compile_subroutine_call(&mut node)?;
        self.expect_symbol(&mut node, ';')?;

        Ok(node)
    }

    /// returnStatement = "return" expression? ";"
    fn compile_return(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::ReturnStatement);

        self.expect_keyword(&mut node, Keyword::Return)?;
        if let Some(expr) = self.compile_expression()? {
            node.push_node(expr);
        }
        self.expect_symbol(&mut node, ';')?;

        Ok(node)
    }

    /// subroutineCall = subroutineName "(" expressionList ")"
    ///                | (className | varName) "." subroutineName "(" expressionList ")"
    ///
    /// The tokens go straight into `node`; there is no element of its own.
    fn compile_subroutine_call(&mut self, node: &mut ParseNode) -> Result<(), ParseError> {
        self.expect_identifier(node)?;
        if self.at_symbol('.') {
            self.expect_symbol(node, '.')?;
            self.expect_identifier(node)?;
        }
        self.expect_symbol(node, '(')?;
        let list = self.compile_expression_list()?;
        node.push_node(list);
        self.expect_symbol(node, ')')?;
        Ok(())
    }

    /// expression = term (op term)*
    ///
    /// Returns `None` without consuming anything when the current token
    /// cannot start a term.
    fn compile_expression(&mut self) -> Result<Option<ParseNode>, ParseError> {
        if !self.at(is_term_start) {
            return Ok(None);
        }
        self.nested(Self::parse_expression).map(Some)
    }

    fn parse_expression(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::Expression);
        let term = self.compile_term()?;
        node.push_node(term);

        while self.at(is_operator) {
            let op = self.bump("operator")?;
            node.push_token(op);
            let term = self.compile_term()?;
            node.push_node(term);
        }

        Ok(node)
    }

    fn compile_required_expression(&mut self, node: &mut ParseNode) -> Result<(), ParseError> {
        if let Some(expr) = self.compile_expression()? {
            node.push_node(expr);
            return Ok(());
        }
        let Some(found) = self.current.clone() else {
            return Err(self.eof("expression"));
        };
        self.report(ParseError::new(
            found.line,
            ParseErrorKind::Expected {
                expected: "expression".to_string(),
                found,
            },
        ))
    }

    /// term = integerConstant | stringConstant | keywordConstant
    ///      | varName | varName "[" expression "]" | subroutineCall
    ///      | "(" expression ")" | unaryOp term
    fn compile_term(&mut self) -> Result<ParseNode, ParseError> {
        self.nested(Self::parse_term)
    }

    fn parse_term(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::Term);

        let Some(token) = self.current.clone() else {
            return Err(self.eof("term"));
        };

        match token.kind {
            TokenKind::IntegerConstant | TokenKind::StringConstant => {
                self.expect(&mut node, "constant", |_| true)?;
            }
            TokenKind::Keyword if is_keyword_constant(&token) => {
                self.expect(&mut node, "keyword constant", is_keyword_constant)?;
            }
            TokenKind::Symbol if token.is_symbol('(') => {
                self.expect_symbol(&mut node, '(')?;
                self.compile_required_expression(&mut node)?;
                self.expect_symbol(&mut node, ')')?;
            }
            TokenKind::Symbol if token.is_symbol('-') || token.is_symbol('~') => {
                self.expect(&mut node, "unary operator", |_| true)?;
                let term = self.compile_term()?;
                node.push_node(term);
            }
            TokenKind::Identifier => {
                let next = self.peeked.as_ref().and_then(Token::symbol);
                match next {
                    Some('[') => {
                        self.expect_identifier(&mut node)?;
                        self.expect_symbol(&mut node, '[')?;
                        self.compile_required_expression(&mut node)?;
                        self.expect_symbol(&mut node, ']')?;
                    }
                    Some('(' | '.') => self.compile_subroutine_call(&mut node)?,
                    _ => {
                        self.expect_identifier(&mut node)?;
                    }
                }
            }
            _ => {
                self.expect(&mut node, "term", |_| false)?;
            }
        }

        Ok(node)
    }

    /// expressionList = (expression ("," expression)*)?
    fn compile_expression_list(&mut self) -> Result<ParseNode, ParseError> {
        let mut node = self.open(NodeKind::ExpressionList);

        let Some(first) = self.compile_expression()? else {
            return Ok(node);
        };
        node.push_node(first);

        while self.at_symbol(',') {
            self.expect_symbol(&mut node, ',')?;
            self.compile_required_expression(&mut node)?;
        }

        Ok(node)
    }
}
