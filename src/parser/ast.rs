use crate::lexer::Token;

/// Nonterminals that get their own element in the parse tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Class,
    ClassVarDec,
    SubroutineDec,
    ParameterList,
    SubroutineBody,
    VarDec,
    Statements,
    LetStatement,
    IfStatement,
    WhileStatement,
    DoStatement,
    ReturnStatement,
    Expression,
    Term,
    ExpressionList,
}

impl NodeKind {
    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::Class => "class",
            NodeKind::ClassVarDec => "classVarDec",
            NodeKind::SubroutineDec => "subroutineDec",
            NodeKind::ParameterList => "parameterList",
            NodeKind::SubroutineBody => "subroutineBody",
            NodeKind::VarDec => "varDec",
            NodeKind::Statements => "statements",
            NodeKind::LetStatement => "letStatement",
            NodeKind::IfStatement => "ifStatement",
            NodeKind::WhileStatement => "whileStatement",
            NodeKind::DoStatement => "doStatement",
            NodeKind::ReturnStatement => "returnStatement",
            NodeKind::Expression => "expression",
            NodeKind::Term => "term",
            NodeKind::ExpressionList => "expressionList",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    Node(ParseNode),
    Token(Token),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParseNode {
    pub kind: NodeKind,
    pub children: Vec<Child>,
}

impl ParseNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: vec![],
        }
    }

    pub fn push_token(&mut self, token: Token) {
        self.children.push(Child::Token(token));
    }

    pub fn push_node(&mut self, node: ParseNode) {
        self.children.push(Child::Node(node));
    }

    /// Direct child nodes, skipping leaves.
    pub fn nodes(&self) -> impl Iterator<Item = &ParseNode> {
        self.children.iter().filter_map(|c| match c {
            Child::Node(n) => Some(n),
            Child::Token(_) => None,
        })
    }

    /// Direct leaves, skipping child nodes.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.children.iter().filter_map(|c| match c {
            Child::Token(t) => Some(t),
            Child::Node(_) => None,
        })
    }

    /// Every leaf below this node, in source order.
    pub fn leaves(&self) -> Vec<&Token> {
        let mut out = vec![];
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Token>) {
        for child in &self.children {
            match child {
                Child::Token(t) => out.push(t),
                Child::Node(n) => n.collect_leaves(out),
            }
        }
    }

    /// Preorder search for nodes of `kind`, including `self`.
    pub fn find_all(&self, kind: NodeKind) -> Vec<&ParseNode> {
        let mut out = vec![];
        let mut stack = vec![self];

        while let Some(node) = stack.pop() {
            if node.kind == kind {
                out.push(node);
            }
            // reversed so the leftmost child is visited first
            for child in node.nodes().collect::<Vec<_>>().into_iter().rev() {
                stack.push(child);
            }
        }

        out
    }
}
