use console::style;

/// Print a success message to stderr: "ok: <message>"
pub fn ok(message: &str) {
    eprintln!("{} {}", style("ok:").green().bold(), message);
}

/// Print an error message to stderr: "error: <message>"
pub fn error(message: &str) {
    eprintln!("{} {}", style("error:").red().bold(), message);
}

/// Print a warning message to stderr: "warning: <message>"
pub fn warning(message: &str) {
    eprintln!("{} {}", style("warning:").yellow().bold(), message);
}

/// Print an aligned info line (label value) for send progress. Goes to
/// stderr so stdout stays clean for `keys` output.
pub fn info(label: &str, value: &str) {
    eprintln!("  {:<16}{}", style(label).bold(), value);
}
