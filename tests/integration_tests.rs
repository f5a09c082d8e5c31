use jack_analyzer::analyzer::Kind;
use jack_analyzer::error::{ParseErrorKind, SymbolError};
use jack_analyzer::lexer::{Lexer, Token, TokenKind};
use jack_analyzer::parser::*;
use jack_analyzer::{compile, xml};

fn strict(input: &str) -> CompiledClass {
    let _ = env_logger::builder().is_test(true).try_init();
    compile(input, ErrorMode::Strict).unwrap()
}

fn lenient(input: &str) -> CompiledClass {
    let _ = env_logger::builder().is_test(true).try_init();
    compile(input, ErrorMode::Lenient).unwrap()
}

fn wrap_in_main(body: &str) -> String {
    format!("class Main {{ function void main() {{ {} }} }}", body)
}

fn tags(node: &ParseNode) -> Vec<&'static str> {
    node.nodes().map(|n| n.kind.tag()).collect()
}

fn lexemes(tokens: &[&Token]) -> Vec<String> {
    tokens.iter().map(|t| t.lexeme.clone()).collect()
}

/// Statements node of the first subroutine.
fn statements(class: &CompiledClass) -> &ParseNode {
    class.tree.find_all(NodeKind::Statements)[0]
}

const SQUARE_GAME: &str = r#"
// Implements a simple game.
class SquareGame {
    field Square square; // the square
    field int direction;
    static int instances;

    /** Constructs a new game. */
    constructor SquareGame new() {
        let square = Square.new(0, 0, 30);
        let direction = 0;
        return this;
    }

    method void dispose() {
        do square.dispose();
        do Memory.deAlloc(this);
        return;
    }

    method void moveSquare(int speed, boolean fast) {
        var int i, step;
        var char key;
        if (direction = 1) { do square.moveUp(); }
        if (direction = 2) { do square.moveDown(); } else { do Output.printString("still"); }
        while (~(i > speed)) {
            let step = step + (i * 2);
            let i = i + 1;
        }
        return;
    }

    function int twice(int n) {
        var Array a;
        let a[n - 1] = -n;
        return a[n - 1] * 2;
    }
}
"#;

#[test]
fn example_class() {
    let input = "class Main { field int x; function void main() { var int y; let y = x + 1; return; } }";
    let class = strict(input);

    assert_eq!(class.name, "Main");
    assert_eq!(class.tree.kind, NodeKind::Class);
    assert_eq!(tags(&class.tree), vec!["classVarDec", "subroutineDec"]);

    assert_eq!(class.class_symbols.kind_of("x"), Ok(Kind::Field));
    assert_eq!(class.class_symbols.index_of("x"), Ok(0));

    let main = class.subroutine("main").unwrap();
    assert_eq!(main.kind_of("y"), Ok(Kind::Local));
    assert_eq!(main.index_of("y"), Ok(0));

    let var_decs = class.tree.find_all(NodeKind::VarDec);
    assert_eq!(var_decs.len(), 1);
    assert_eq!(
        tags(statements(&class)),
        vec!["letStatement", "returnStatement"]
    );
}

#[test]
fn leaves_reproduce_token_stream() {
    let class = strict(SQUARE_GAME);
    let tokens = Lexer::tokenize(SQUARE_GAME).unwrap();
    let leaves: Vec<Token> = class.tree.leaves().into_iter().cloned().collect();
    assert_eq!(leaves, tokens);
}

#[test]
fn indices_follow_declaration_order() {
    let class = strict(SQUARE_GAME);

    let fields: Vec<_> = class
        .class_symbols
        .entries()
        .map(|e| (e.name.as_str(), e.kind, e.index))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("square", Kind::Field, 0),
            ("direction", Kind::Field, 1),
            ("instances", Kind::Static, 0),
        ]
    );
    assert_eq!(class.class_symbols.type_of("square"), Ok("Square"));
    assert_eq!(class.class_symbols.var_count(Kind::Field), 2);
    assert_eq!(class.class_symbols.var_count(Kind::Static), 1);

    let mv = class.subroutine("moveSquare").unwrap();
    assert_eq!(mv.index_of("speed"), Ok(1));
    assert_eq!(mv.index_of("fast"), Ok(2));
    assert_eq!(mv.type_of("fast"), Ok("boolean"));
    assert_eq!(mv.index_of("i"), Ok(0));
    assert_eq!(mv.index_of("step"), Ok(1));
    assert_eq!(mv.index_of("key"), Ok(2));
    assert_eq!(mv.var_count(Kind::Argument), 3);
    assert_eq!(mv.var_count(Kind::Local), 3);
}

#[test]
fn subroutine_scope_restarts_per_subroutine() {
    let class = strict(SQUARE_GAME);

    let names: Vec<_> = class
        .subroutine_symbols
        .iter()
        .map(|(n, _)| n.as_str())
        .collect();
    assert_eq!(names, vec!["new", "dispose", "moveSquare", "twice"]);

    let twice = class.subroutine("twice").unwrap();
    assert_eq!(twice.index_of("n"), Ok(0));
    assert_eq!(twice.index_of("a"), Ok(0));
    assert_eq!(twice.len(), 2);
    assert_eq!(
        twice.kind_of("speed"),
        Err(SymbolError::NotFound("speed".to_string()))
    );
}

#[test]
fn methods_get_this_argument() {
    let class = strict(SQUARE_GAME);

    for name in ["dispose", "moveSquare"] {
        let table = class.subroutine(name).unwrap();
        assert_eq!(table.kind_of("this"), Ok(Kind::Argument));
        assert_eq!(table.index_of("this"), Ok(0));
        assert_eq!(table.type_of("this"), Ok("SquareGame"));
    }
    for name in ["new", "twice"] {
        let table = class.subroutine(name).unwrap();
        assert!(table.get("this").is_none());
    }
}

#[test]
fn parenthesized_expression_is_preserved() {
    let grouped = strict(&wrap_in_main("let x = (a + b) * c; return;"));
    let flat = strict(&wrap_in_main("let x = a + b * c; return;"));

    let outer = |class: &CompiledClass| -> ParseNode {
        let let_stmt = class.tree.find_all(NodeKind::LetStatement)[0];
        let_stmt.nodes().next().unwrap().clone()
    };

    let g = outer(&grouped);
    assert_eq!(tags(&g), vec!["term", "term"]);
    let first = g.nodes().next().unwrap();
    assert_eq!(lexemes(&first.tokens().collect::<Vec<_>>()), vec!["(", ")"]);
    let inner = first.nodes().next().unwrap();
    assert_eq!(inner.kind, NodeKind::Expression);
    assert_eq!(tags(inner), vec!["term", "term"]);

    let f = outer(&flat);
    assert_eq!(tags(&f), vec!["term", "term", "term"]);
    let ops: Vec<_> = f.tokens().map(|t| t.lexeme.as_str()).collect();
    assert_eq!(ops, vec!["+", "*"]);
}

#[test]
fn term_disambiguation() {
    let class = strict(&wrap_in_main(
        "let x = a[1] + f(2) + Foo.bar() + b + -c + ~d + true + \"s\"; return;",
    ));
    let let_stmt = class.tree.find_all(NodeKind::LetStatement)[0];
    let expr = let_stmt.nodes().next().unwrap();
    let terms: Vec<_> = expr.nodes().collect();
    assert_eq!(terms.len(), 8);

    let shape = |t: &ParseNode| -> (Vec<String>, Vec<&'static str>) {
        (lexemes(&t.tokens().collect::<Vec<_>>()), tags(t))
    };

    assert_eq!(
        shape(terms[0]),
        (vec!["a".into(), "[".into(), "]".into()], vec!["expression"])
    );
    assert_eq!(
        shape(terms[1]),
        (vec!["f".into(), "(".into(), ")".into()], vec!["expressionList"])
    );
    assert_eq!(
        shape(terms[2]),
        (
            vec!["Foo".into(), ".".into(), "bar".into(), "(".into(), ")".into()],
            vec!["expressionList"]
        )
    );
    assert_eq!(shape(terms[3]), (vec!["b".into()], vec![]));
    assert_eq!(shape(terms[4]), (vec!["-".into()], vec!["term"]));
    assert_eq!(shape(terms[5]), (vec!["~".into()], vec!["term"]));
    assert_eq!(terms[6].tokens().next().unwrap().kind, TokenKind::Keyword);
    assert_eq!(terms[7].tokens().next().unwrap().kind, TokenKind::StringConstant);
}

#[test]
fn expression_list_and_do() {
    let class = strict(&wrap_in_main("do Output.printInt(1, x + 2, g()); return;"));
    let do_stmt = class.tree.find_all(NodeKind::DoStatement)[0];
    let toks: Vec<_> = do_stmt.tokens().map(|t| t.lexeme.as_str()).collect();
    assert_eq!(toks, vec!["do", "Output", ".", "printInt", "(", ")", ";"]);

    let list = do_stmt.nodes().next().unwrap();
    assert_eq!(list.kind, NodeKind::ExpressionList);
    assert_eq!(tags(list), vec!["expression", "expression", "expression"]);
    let commas = list.tokens().filter(|t| t.is_symbol(',')).count();
    assert_eq!(commas, 2);
}

#[test]
fn empty_nodes_are_kept() {
    let class = strict("class A { function void f() { return; } }");
    let params = class.tree.find_all(NodeKind::ParameterList)[0];
    assert!(params.children.is_empty());

    let ret = class.tree.find_all(NodeKind::ReturnStatement)[0];
    assert!(ret.nodes().next().is_none());
    assert!(class.tree.find_all(NodeKind::Expression).is_empty());
}

#[test]
fn if_else_structure() {
    let class = strict(&wrap_in_main(
        "if (x) { let y = 1; } else { let y = 2; let z = 3; } return;",
    ));
    let if_stmt = class.tree.find_all(NodeKind::IfStatement)[0];
    assert_eq!(tags(if_stmt), vec!["expression", "statements", "statements"]);
    let else_block = if_stmt.nodes().nth(2).unwrap();
    assert_eq!(tags(else_block), vec!["letStatement", "letStatement"]);
}

#[test]
fn second_else_is_rejected_in_strict_mode() {
    let input = wrap_in_main("if (x) { let y = 1; } else { let y = 2; } else { let y = 3; } return;");
    let err = compile(&input, ErrorMode::Strict).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::DuplicateElse);
}

#[test]
fn second_else_keeps_if_statement_intact() {
    let input = wrap_in_main("if (x) { let y = 1; } else { let y = 2; } else { let y = 3; } return;");
    let class = lenient(&input);

    assert_eq!(class.diagnostics.len(), 1);
    assert_eq!(class.diagnostics[0].kind, ParseErrorKind::DuplicateElse);

    assert_eq!(tags(statements(&class)), vec!["ifStatement", "returnStatement"]);
    let if_stmt = class.tree.find_all(NodeKind::IfStatement)[0];
    assert_eq!(tags(if_stmt), vec!["expression", "statements", "statements"]);
    let leaves = lexemes(&if_stmt.leaves());
    assert_eq!(leaves.iter().filter(|l| *l == "else").count(), 1);
    assert!(!leaves.contains(&"3".to_string()));
}

#[test]
fn strict_mode_stops_at_first_mismatch() {
    let err = compile(&wrap_in_main("let = 1; return;"), ErrorMode::Strict).unwrap_err();
    let ParseErrorKind::Expected { expected, found } = err.kind else {
        panic!("unexpected error {:?}", err);
    };
    assert_eq!(expected, "identifier");
    assert!(found.is_symbol('='));
}

#[test]
fn lenient_mode_records_and_continues() {
    let input = "class A {\n function void f() {\n let 5 = 1;\n do g();\n return;\n }\n}";
    let class = lenient(input);

    assert_eq!(class.diagnostics.len(), 1);
    assert_eq!(class.diagnostics[0].line, 3);
    let ParseErrorKind::Expected { found, .. } = &class.diagnostics[0].kind else {
        panic!();
    };
    assert_eq!(found.lexeme, "5");

    assert_eq!(
        tags(statements(&class)),
        vec!["letStatement", "doStatement", "returnStatement"]
    );
    // the mismatched token is kept as a leaf
    let tokens = Lexer::tokenize(input).unwrap();
    assert_eq!(class.tree.leaves().len(), tokens.len());
}

#[test]
fn running_out_of_tokens() {
    let err = compile("class A { function void f() { return;", ErrorMode::Lenient).unwrap_err();
    let ParseErrorKind::UnexpectedEof { expected } = err.kind else {
        panic!("unexpected error {:?}", err);
    };
    assert_eq!(expected, "symbol '}'");
}

#[test]
fn trailing_tokens_are_an_error() {
    let err = compile("class A { } class B { }", ErrorMode::Strict).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::Expected { .. }));
}

#[test]
fn missing_expression() {
    let err = compile(&wrap_in_main("let x = ; return;"), ErrorMode::Strict).unwrap_err();
    let ParseErrorKind::Expected { expected, found } = err.kind else {
        panic!();
    };
    assert_eq!(expected, "expression");
    assert!(found.is_symbol(';'));
}

#[test]
fn redeclaration_is_reported() {
    let input = "class A { field int x; static char x; }";
    let err = compile(input, ErrorMode::Strict).unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::Symbol(SymbolError::AlreadyDefined("x".to_string()))
    );

    let class = lenient(input);
    assert_eq!(class.diagnostics.len(), 1);
    assert_eq!(class.class_symbols.kind_of("x"), Ok(Kind::Field));
    assert_eq!(class.class_symbols.var_count(Kind::Static), 0);
}

#[test]
fn local_may_shadow_field() {
    let class = strict("class A { field int x; method void f(int y) { var char x; return; } }");
    let f = class.subroutine("f").unwrap();
    assert_eq!(f.kind_of("x"), Ok(Kind::Local));
    assert_eq!(f.index_of("y"), Ok(1));
    assert_eq!(class.class_symbols.kind_of("x"), Ok(Kind::Field));
}

#[test]
fn lexical_errors_stop_the_parse() {
    let err = compile(&wrap_in_main("let x = 1 $ 2; return;"), ErrorMode::Lenient).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::Lex(_)));
}

#[test]
fn tree_document() {
    let class = strict("class A { static int n; }");
    let expected = "\
<class>
  <keyword> class </keyword>
  <identifier> A </identifier>
  <symbol> { </symbol>
  <classVarDec>
    <keyword> static </keyword>
    <keyword> int </keyword>
    <identifier> n </identifier>
    <symbol> ; </symbol>
  </classVarDec>
  <symbol> } </symbol>
</class>
";
    assert_eq!(xml::tree_to_xml(&class.tree), expected);
}

#[test]
fn string_constant_in_tree() {
    let class = strict(&wrap_in_main("do Output.printString(\"hello world\"); return;"));
    let strings: Vec<_> = class
        .tree
        .leaves()
        .into_iter()
        .filter(|t| t.kind == TokenKind::StringConstant)
        .map(|t| t.lexeme.clone())
        .collect();
    assert_eq!(strings, vec!["hello world"]);
}

fn nested_parens(depth: usize) -> String {
    format!("let x = {}1{}; return;", "(".repeat(depth), ")".repeat(depth))
}

#[test]
fn moderate_nesting_parses() {
    let class = strict(&wrap_in_main(&nested_parens(40)));
    assert_eq!(class.tree.find_all(NodeKind::Expression).len(), 41);
}

#[test]
fn deep_nesting_is_an_error() {
    for mode in [ErrorMode::Strict, ErrorMode::Lenient] {
        let err = compile(&wrap_in_main(&nested_parens(300)), mode).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NestingTooDeep { limit: MAX_NESTING });
    }

    let unary = format!("let x = {}y; return;", "- ".repeat(300));
    let err = compile(&wrap_in_main(&unary), ErrorMode::Strict).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::NestingTooDeep { limit: MAX_NESTING });

    let mut body = String::new();
    for _ in 0..200 {
        body.push_str("while (true) { ");
    }
    body.push_str(&"} ".repeat(200));
    let err = compile(&wrap_in_main(&body), ErrorMode::Strict).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::NestingTooDeep { limit: MAX_NESTING });
}

#[test]
fn mismatch_message_names_token_and_expected_set() {
    let input = "class A {\n function void f() {\n do g() + 1;\n }\n}";
    let err = compile(input, ErrorMode::Strict).unwrap_err();
    assert_eq!(err.to_string(), "line 3: expected symbol ';', found symbol '+'");

    let err = compile("class 7 { }", ErrorMode::Strict).unwrap_err();
    assert_eq!(
        err.to_string(),
        "line 1: expected identifier, found integer constant '7'"
    );
}
