use colored::Colorize;

use super::error::{Error, ErrorKind};

fn get_error_title(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Lexical => "lexical error",
        ErrorKind::Syntax => "syntax error",
        ErrorKind::Type => "type error",
        ErrorKind::Runtime => "runtime error",
    }
}

/// Formats `error` with the offending source line and a caret under its
/// column.
pub fn render(file: &str, error: &Error, source: &str) -> String {
    let mut out = format!("{}: {}\n", "error".red().bold(), error);
    out.push_str(&format!(
        " {} {}:{}:{} ({})\n",
        "-->".bright_blue(),
        file,
        error.line,
        error.column,
        get_error_title(error.kind)
    ));

    let Some(line) = error
        .line
        .checked_sub(1)
        .and_then(|index| source.lines().nth(index))
    else {
        return out;
    };

    let line_num_width = error.line.to_string().len();
    let gutter = " ".repeat(line_num_width);

    out.push_str(&format!("{} {}\n", gutter, "|".bright_blue()));
    out.push_str(&format!(
        "{} {} {}\n",
        error.line.to_string().bright_blue(),
        "|".bright_blue(),
        line
    ));

    // columns count characters; tabs are kept so the caret lines up
    let padding: String = line
        .chars()
        .take(error.column.saturating_sub(1))
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    out.push_str(&format!(
        "{} {} {}{}\n",
        gutter,
        "|".bright_blue(),
        padding,
        "^".red().bold()
    ));

    out
}

pub fn report(file: &str, error: &Error, source: &str) {
    eprint!("{}", render(file, error, source));
}
