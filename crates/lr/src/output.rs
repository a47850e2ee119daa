//! Status lines on stderr.

use console::{Style, Term};

/// Styled status writer for the watch loop.
pub(crate) struct Output {
    term: Term,
    label: Style,
    reload: Style,
    warn: Style,
    fail: Style,
}

impl Output {
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            label: Style::new().cyan().bold(),
            reload: Style::new().green(),
            warn: Style::new().yellow(),
            fail: Style::new().red().bold(),
        }
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(msg);
    }

    /// `  label: value` with the label highlighted.
    pub(crate) fn field(&self, label: &str, value: &str) {
        let label = self.label.apply_to(format!("{label}:"));
        self.line(&format!("  {label} {value}"));
    }

    /// One line per reload; lists the first file and how many others.
    pub(crate) fn reload(&self, files: &[String]) {
        let summary = match files {
            [] => return,
            [file] => file.clone(),
            [first, rest @ ..] => format!("{first} (+{} more)", rest.len()),
        };
        self.styled(&self.reload, &format!("↻ reload {summary}"));
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.styled(&self.warn, msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.styled(&self.fail, msg);
    }

    fn styled(&self, style: &Style, msg: &str) {
        self.line(&style.apply_to(msg).to_string());
    }

    // A closed stderr is not worth failing the command over.
    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }
}
