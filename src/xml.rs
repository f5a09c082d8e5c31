use std::fmt;

use crate::lexer::Token;
use crate::parser::{Child, ParseNode};

const INDENT: &str = "  ";

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

fn write_leaf(f: &mut fmt::Formatter<'_>, depth: usize, token: &Token) -> fmt::Result {
    let tag = token.kind.tag();
    writeln!(
        f,
        "{}<{}> {} </{}>",
        INDENT.repeat(depth),
        tag,
        escape(&token.lexeme),
        tag
    )
}

fn write_node(f: &mut fmt::Formatter<'_>, depth: usize, node: &ParseNode) -> fmt::Result {
    let pad = INDENT.repeat(depth);
    let tag = node.kind.tag();

    writeln!(f, "{}<{}>", pad, tag)?;
    for child in &node.children {
        match child {
            Child::Token(t) => write_leaf(f, depth + 1, t)?,
            Child::Node(n) => write_node(f, depth + 1, n)?,
        }
    }
    writeln!(f, "{}</{}>", pad, tag)
}

/// Flat token document: `<tokens>` with one leaf per token.
pub struct TokensXml<'a>(pub &'a [Token]);

impl fmt::Display for TokensXml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<tokens>")?;
        for token in self.0 {
            write_leaf(f, 0, token)?;
        }
        writeln!(f, "</tokens>")
    }
}

/// Nested parse-tree document rooted at a node.
pub struct TreeXml<'a>(pub &'a ParseNode);

impl fmt::Display for TreeXml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, 0, self.0)
    }
}

pub fn tokens_to_xml(tokens: &[Token]) -> String {
    TokensXml(tokens).to_string()
}

pub fn tree_to_xml(node: &ParseNode) -> String {
    TreeXml(node).to_string()
}
