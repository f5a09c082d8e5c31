use crate::error::{LexError, LexErrorKind};

use super::{Token, TokenKind, KEYWORDS, MAX_INT, SYMBOLS};

/// Removes `//` and `/* */` comments from `source`.
///
/// Line breaks inside removed comments are kept so that line numbers of the
/// remaining text are unchanged. Comment markers inside string constants are
/// left alone.
pub fn strip_comments(source: &str) -> Result<String, LexError> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut line = 1;
    let mut index = 0;
    let mut in_string = false;

    while index < chars.len() {
        let c = chars[index];
        let next = chars.get(index + 1).copied();

        if c == '\n' {
            line += 1;
            in_string = false;
            out.push(c);
            index += 1;
        } else if in_string {
            in_string = c != '"';
            out.push(c);
            index += 1;
        } else if c == '"' {
            in_string = true;
            out.push(c);
            index += 1;
        } else if c == '/' && next == Some('/') {
            while index < chars.len() && chars[index] != '\n' {
                index += 1;
            }
        } else if c == '/' && next == Some('*') {
            let start = line;
            index += 2;
            loop {
                match chars.get(index) {
                    None => return Err(LexError::new(start, LexErrorKind::UnterminatedComment)),
                    Some('*') if chars.get(index + 1) == Some(&'/') => {
                        index += 2;
                        break;
                    }
                    Some('\n') => {
                        line += 1;
                        out.push('\n');
                        index += 1;
                    }
                    Some(_) => index += 1,
                }
            }
            // keep `a/**/b` as two words
            out.push(' ');
        } else {
            out.push(c);
            index += 1;
        }
    }

    Ok(out)
}

/// Pull-based tokenizer over one compilation unit.
///
/// The cursor only moves forward; each call to [`Lexer::advance`] classifies
/// exactly one token.
#[derive(Debug)]
pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: usize,
    current: Option<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Result<Self, LexError> {
        let stripped = strip_comments(source)?;
        Ok(Self {
            chars: stripped.chars().collect(),
            index: 0,
            line: 1,
            current: None,
        })
    }

    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        Lexer::new(source)?.collect()
    }

    pub fn has_more_tokens(&self) -> bool {
        self.chars[self.index..].iter().any(|c| !c.is_whitespace())
    }

    pub fn current_token(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Line the cursor is currently on.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn advance(&mut self) -> Result<&Token, LexError> {
        self.skip_whitespace();

        let Some(&c) = self.chars.get(self.index) else {
            log::warn!("line {}: advance called with no tokens left", self.line);
            return Err(self.error(LexErrorKind::Exhausted));
        };

        let token = if c.is_ascii_digit() {
            self.lex_number()?
        } else if SYMBOLS.contains(&c) {
            self.index += 1;
            Token::new(TokenKind::Symbol, c, self.line)
        } else if c == '"' {
            self.lex_string()?
        } else if c.is_ascii_alphabetic() || c == '_' {
            self.lex_word()
        } else {
            self.index += 1;
            return Err(self.error(LexErrorKind::UnexpectedCharacter(c)));
        };

        log::trace!("line {}: {} {:?}", token.line, token.kind.tag(), token.lexeme);
        Ok(&*self.current.insert(token))
    }

    fn error(&self, kind: LexErrorKind) -> LexError {
        LexError::new(self.line, kind)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.get(self.index) {
            if !c.is_whitespace() {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.index += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let s: String = self.chars[self.index..]
            .iter()
            .take_while(|&&c| pred(c))
            .collect();
        self.index += s.chars().count();
        s
    }

    fn lex_number(&mut self) -> Result<Token, LexError> {
        let s = self.take_while(|c| c.is_ascii_digit());
        match s.parse::<u16>() {
            Ok(v) if v <= MAX_INT => Ok(Token::new(TokenKind::IntegerConstant, s, self.line)),
            _ => Err(self.error(LexErrorKind::IntegerOutOfRange(s))),
        }
    }

    fn lex_string(&mut self) -> Result<Token, LexError> {
        // opening quote
        self.index += 1;
        let s = self.take_while(|c| c != '"' && c != '\n');
        match self.chars.get(self.index) {
            Some('"') => {
                self.index += 1;
                Ok(Token::new(TokenKind::StringConstant, s, self.line))
            }
            Some(_) => Err(self.error(LexErrorKind::NewlineInString)),
            None => Err(self.error(LexErrorKind::UnterminatedString)),
        }
    }

    fn lex_word(&mut self) -> Token {
        let s = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let kind = if KEYWORDS.contains_key(s.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        Token::new(kind, s, self.line)
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_more_tokens() {
            return None;
        }
        Some(self.advance().cloned())
    }
}
