//! Fatal errors rendered as markdown blocks on stderr.

use std::io::IsTerminal as _;
use std::path::Path;

use crate::error::Error;
use crate::instance::CONFIG_PREFIX;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as markdown and print it to stderr, with bold headings on a terminal.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    let bold = std::io::stderr().is_terminal();
    for line in md.lines() {
        if bold && line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic: what happened, and how
/// to fix it where there is something to do.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigNotFound { path } => render_config_not_found(path),
        Error::ConfigParse { path, reason } => render_config_parse(path, reason),
        Error::InvalidPlan { reason } => render_invalid_plan(reason),
        Error::OutsideWorkspace { path } => render_outside_workspace(path),
        Error::SidebarParse { path, reason } => format!(
            "\
# Error: Invalid Sidebar

Could not parse `{}`: {reason}

## Fix

`sidebars.json` must be a JSON object mapping each sidebar name to an array of nodes.
",
            path.display()
        ),
        Error::UnknownInstance { id } => render_unknown_instance(id),
        Error::HttpClient { .. } | Error::Io(_) | Error::JsonSer(_) | Error::TomlDe(_) => render_generic(e),
    };
}

fn render_config_not_found(path: &Path) -> String {
    return format!(
        "\
# Error: Config Not Found

`{}` does not exist.

## Fix

Run from inside the documentation repository, or point at it:

    mdxref --root path/to/repo check

An explicit config file can be given with `--config path/to/{CONFIG_PREFIX}.zh.json`.
",
        path.display()
    );
}

fn render_config_parse(path: &Path, reason: &str) -> String {
    return format!(
        "\
# Error: Invalid Instance Config

Could not parse `{}`: {reason}

## Fix

Each entry in `instances` needs `id`, `routeBasePath`, and `path`. The locale
comes from a `locale` field or from the file name (`{CONFIG_PREFIX}.en.json`).
",
        path.display()
    );
}

/// Catch-all for errors with nothing to suggest.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::HttpClient { reason } => format!(
            "\
# Error: HTTP Client

{reason}

## Fix

Run without `--external` to skip reachability checks.
"
        ),
        Error::Io(inner) => format!(
            "\
# Error: I/O

{inner}
"
        ),
        Error::TomlDe(inner) => format!(
            "\
# Error: Invalid TOML

{inner}

## Fix

Correct `.mdxref.toml` or remove it to use the defaults.
"
        ),
        _ => format!(
            "\
# Error

{e}
"
        ),
    };
}

fn render_invalid_plan(reason: &str) -> String {
    return format!(
        "\
# Error: Invalid Rename Plan

{reason}

No action was run.

## Fix

A plan looks like this:

    {{
      \"target\": [\"core_products/aiagent/zh\"],
      \"action\": [\"mkdir guides\", \"mv old.mdx guides/new.mdx\", \"mv-dir old-dir new-dir\"]
    }}
"
    );
}

fn render_outside_workspace(path: &Path) -> String {
    return format!(
        "\
# Error: Outside Repository

`{}` is not inside the repository root.

## Fix

Pass `--root` to select the repository that contains both paths.
",
        path.display()
    );
}

fn render_unknown_instance(id: &str) -> String {
    return format!(
        "\
# Error: Unknown Instance

No instance has the id `{id}`.

## Fix

List the configured instances:

    mdxref instances
"
    );
}
