use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser as ClapParser, ValueEnum};
use clap_stdin::FileOrStdin;

use jack_analyzer::lexer::Lexer;
use jack_analyzer::parser::{CompiledClass, ErrorMode};
use jack_analyzer::xml;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Emit {
    /// Flat token document
    Tokens,
    /// Nested parse-tree document
    Tree,
    /// Class and subroutine symbol tables
    Symbols,
}

#[derive(ClapParser, Debug)]
#[command(version, about = "Tokenizes and parses a Jack class", long_about = None)]
struct Args {
    /// Jack source file, or `-` for stdin
    input: FileOrStdin,

    /// Artifact to produce
    #[arg(long, value_enum, default_value_t = Emit::Tree)]
    emit: Emit,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep parsing after syntax errors and report them all at the end
    #[arg(long)]
    lenient: bool,
}

/// Class table followed by each subroutine's table.
struct SymbolDump<'a>(&'a CompiledClass);

impl fmt::Display for SymbolDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = self.0;
        writeln!(f, "class {}", class.name)?;
        write!(f, "{}", class.class_symbols)?;
        for (name, table) in &class.subroutine_symbols {
            writeln!(f, "\n{}.{}", class.name, name)?;
            write!(f, "{}", table)?;
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mode = if args.lenient {
        ErrorMode::Lenient
    } else {
        ErrorMode::Strict
    };
    let source = args.input.contents().context("failed to read input")?;

    let mut diagnostics = vec![];
    let artifact = match args.emit {
        Emit::Tokens => {
            let tokens = Lexer::tokenize(&source).context("failed to tokenize input")?;
            xml::tokens_to_xml(&tokens)
        }
        Emit::Tree | Emit::Symbols => {
            let class =
                jack_analyzer::compile(&source, mode).context("failed to parse input")?;
            let out = match args.emit {
                Emit::Tree => xml::tree_to_xml(&class.tree),
                _ => SymbolDump(&class).to_string(),
            };
            diagnostics = class.diagnostics;
            out
        }
    };

    match &args.output {
        Some(path) => fs::write(path, artifact)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{}", artifact),
    }

    for d in &diagnostics {
        eprintln!("{}", d);
    }
    if !diagnostics.is_empty() {
        bail!("{} syntax errors", diagnostics.len());
    }
    Ok(())
}
