//! Command parsing for the interactive shell.

use pacmon_core::program::{OPTION_SEPARATOR, SELECT_ALL_MARKER};
use pacmon_core::{DetailLevel, Dimension, Selection};

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// `query [year] [all | code... | option, option] [--detail dim,dim]`
    Query {
        year: Option<i32>,
        selection: Option<Selection>,
        detail: Option<DetailLevel>,
    },
    /// `year <n>` sets the session year
    Year(i32),
    /// `select all | code...` sets the session selection
    Select(Selection),
    Programs,
    Stats,
    /// `invalidate [year]` drops cached slices for one year
    Invalidate(Option<i32>),
    Clear,
    Help,
    Exit,
    Empty,
}

pub const HELP: &str = "\
  query [year] [all | code...] [--detail nature,source,unit]
                        run a query (defaults: session year and selection);
                        separate 'code - description' options with ','
  year <n>              set the session year
  select all | code...  set the session selection
  programs              list registered actions
  stats                 cache statistics
  invalidate [year]     forget cached results for a year
  clear                 empty the cache
  help                  this text
  exit                  leave the shell";

pub fn parse(line: &str) -> Result<ShellCommand, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(ShellCommand::Empty);
    };
    let rest: Vec<&str> = words.collect();

    match head.to_ascii_lowercase().as_str() {
        "query" | "q" => parse_query(&rest),
        "year" => match rest.as_slice() {
            [year] => parse_year(year).map(ShellCommand::Year),
            _ => Err("usage: year <n>".into()),
        },
        "select" => {
            if rest.is_empty() {
                return Err("usage: select all | code...".into());
            }
            Ok(ShellCommand::Select(parse_selection(&rest)))
        }
        "programs" => Ok(ShellCommand::Programs),
        "stats" => Ok(ShellCommand::Stats),
        "invalidate" => match rest.as_slice() {
            [] => Ok(ShellCommand::Invalidate(None)),
            [year] => parse_year(year).map(|y| ShellCommand::Invalidate(Some(y))),
            _ => Err("usage: invalidate [year]".into()),
        },
        "clear" => Ok(ShellCommand::Clear),
        "help" | "?" => Ok(ShellCommand::Help),
        "exit" | "quit" => Ok(ShellCommand::Exit),
        other => Err(format!("unknown command '{other}' (type 'help')")),
    }
}

fn parse_year(raw: &str) -> Result<i32, String> {
    raw.parse().map_err(|_| format!("'{raw}' is not a year"))
}

/// Turn the free-text part of a command into a selection.
///
/// `,` and `;` separate options. An option containing `" - "` is a
/// `"code - description"` string and stays whole; any other option may hold
/// several whitespace-separated codes.
fn parse_selection(words: &[&str]) -> Selection {
    if words.iter().any(|w| w.eq_ignore_ascii_case("all")) {
        return Selection::SelectAll;
    }

    let text = words.join(" ");
    let mut options: Vec<&str> = Vec::new();
    for chunk in text.split([',', ';']).map(str::trim).filter(|c| !c.is_empty()) {
        if chunk.contains(OPTION_SEPARATOR) || chunk == SELECT_ALL_MARKER {
            options.push(chunk);
        } else {
            options.extend(chunk.split_whitespace());
        }
    }
    Selection::from_options(options.as_slice())
}

/// Parse `none` or a comma-separated list of dimensions.
pub fn parse_detail(raw: &str) -> Result<DetailLevel, String> {
    if raw.trim().eq_ignore_ascii_case("none") {
        return Ok(DetailLevel::NONE);
    }
    let dimensions = raw
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse::<Dimension>)
        .collect::<Result<Vec<_>, _>>()?;
    if dimensions.is_empty() {
        return Err(format!(
            "no dimension in '{raw}' (use nature, source, unit, or 'none' for totals only)"
        ));
    }
    Ok(dimensions.into_iter().collect())
}

fn parse_query(args: &[&str]) -> Result<ShellCommand, String> {
    let mut year = None;
    let mut codes = Vec::new();
    let mut detail = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "--detail" {
            let raw = iter.next().ok_or("--detail needs a value")?;
            detail = Some(parse_detail(raw)?);
        } else if year.is_none() && codes.is_empty() && arg.len() == 4 && arg.chars().all(|c| c.is_ascii_digit()) {
            year = Some(parse_year(arg)?);
        } else {
            codes.push(*arg);
        }
    }

    Ok(ShellCommand::Query {
        year,
        selection: (!codes.is_empty()).then(|| parse_selection(&codes)),
        detail,
    })
}
