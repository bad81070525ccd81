//! Interactive and file-driven front end for a `BPlusTreeSet<i64>`.

use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use linked_bptree::{BPlusTreeSet, DEFAULT_ORDER, Error};

#[derive(Parser, Debug)]
#[command(about = "An interactive interface for a B+ tree.")]
struct Args {
    /// Order of the B+ tree
    #[arg(short, long, default_value_t = DEFAULT_ORDER)]
    order: usize,

    /// Replay the commands in this file instead of reading stdin
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Initialize the tree using sequential insertion
    #[arg(short, long, num_args = 1.., allow_negative_numbers = true)]
    sequential: Vec<i64>,

    /// Initialize the tree using bulk loading
    #[arg(short, long, num_args = 1.., allow_negative_numbers = true)]
    bulk_load: Vec<i64>,
}

/// One line of the command language.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Command {
    Insert(i64),
    Delete(i64),
    Find(i64),
    Display,
    Quit,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid command format: {0:?}")]
struct ParseCommandError(String);

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseCommandError(line.to_owned());
        let terms: Vec<&str> = line.split_whitespace().collect();
        match terms.as_slice() {
            ["D"] => Ok(Self::Display),
            ["q"] => Ok(Self::Quit),
            [op @ ("i" | "d" | "f"), arg] => {
                let key = arg.parse().map_err(|_| invalid())?;
                Ok(match *op {
                    "i" => Self::Insert(key),
                    "d" => Self::Delete(key),
                    _ => Self::Find(key),
                })
            }
            _ => Err(invalid()),
        }
    }
}

/// Renders a tree in preorder, one node per line, indented by level.
///
/// Internal nodes print as `( 3:__:__:__)`, leaves as `[ 1, 2,__,__]`; empty
/// slots up to the order are shown as `__`.
struct TreeDisplay<'a>(&'a BPlusTreeSet<i64>);

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = self.0.order();
        for node in self.0.traverse() {
            let (open, sep, close) = if node.is_leaf() { ('[', ',', ']') } else { ('(', ':', ')') };
            write!(f, "{:indent$}{open}", "", indent = 4 * node.level())?;
            let padding = order.saturating_sub(node.keys().len());
            let cells = node
                .keys()
                .iter()
                .map(|key| format!("{key:>2}"))
                .chain(std::iter::repeat_n("__".to_owned(), padding));
            for (i, cell) in cells.enumerate() {
                if i > 0 {
                    write!(f, "{sep}")?;
                }
                write!(f, "{cell}")?;
            }
            writeln!(f, "{close}")?;
        }
        Ok(())
    }
}

/// Whether the session should keep reading commands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

/// Applies `command`, writing what the user sees to `out`.
fn run(tree: &mut BPlusTreeSet<i64>, command: Command, out: &mut impl Write) -> io::Result<Flow> {
    match command {
        Command::Insert(key) => {
            if !tree.insert(key) {
                writeln!(out, "Data already exists: {key}")?;
            }
            writeln!(out, "{}", TreeDisplay(tree))?;
        }
        Command::Delete(key) => {
            if let Err(Error::KeyNotFound) = tree.delete(&key) {
                writeln!(out, "Data not found: {key}")?;
            }
            writeln!(out, "{}", TreeDisplay(tree))?;
        }
        Command::Find(key) => {
            if tree.find(&key) {
                writeln!(out, "Key found: {key}")?;
            } else {
                writeln!(out, "Key not found: {key}")?;
            }
        }
        Command::Display => writeln!(out, "{}", TreeDisplay(tree))?,
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn interactive(tree: &mut BPlusTreeSet<i64>) -> anyhow::Result<()> {
    println!("Available commands:");
    println!("Insert:  i <integer>");
    println!("Delete:  d <integer>");
    println!("Find:    f <integer>");
    println!("Display: D");
    println!("Quit:    q");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!(">>> ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        match line.trim().parse() {
            Ok(command) => {
                if run(tree, command, &mut io::stdout().lock())? == Flow::Quit {
                    return Ok(());
                }
            }
            Err(_) => println!("Invalid command format, please try again."),
        }
    }
}

fn replay(tree: &mut BPlusTreeSet<i64>, path: &Path) -> anyhow::Result<()> {
    let script = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    for (number, line) in script.lines().enumerate() {
        let line = line.trim();
        let command: Command = line
            .parse()
            .with_context(|| format!("line {} of {}", number + 1, path.display()))?;
        let mut out = io::stdout().lock();
        writeln!(out, ">>> {line}")?;
        if run(tree, command, &mut out)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with(fmt::layer().with_writer(io::stderr))
            .init();
    }

    let args = Args::parse();
    let mut tree = BPlusTreeSet::with_order(args.order)?;
    if !args.sequential.is_empty() {
        tree.initialize(args.sequential);
    } else if !args.bulk_load.is_empty() {
        tree.bulk_load(args.bulk_load)?;
    }
    if !tree.is_empty() {
        tracing::info!(keys = tree.len(), height = tree.height(), "tree initialized");
    }

    match &args.file {
        Some(path) => replay(&mut tree, path),
        None => interactive(&mut tree),
    }
}
