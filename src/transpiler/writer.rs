//! Indented line writer and TypeScript literal escaping for generated code.

/// Accumulates generated source, one line at a time, with 2-space indentation.
pub(crate) struct CodeWriter {
    output: String,
    level: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        CodeWriter {
            output: String::new(),
            level: 0,
        }
    }

    pub fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.output.push('\n');
            return;
        }
        self.output.push_str(&self.indent(self.level));
        self.output.push_str(text);
        self.output.push('\n');
    }

    pub fn blank(&mut self) {
        if !self.output.is_empty() && !self.output.ends_with("\n\n") {
            self.output.push('\n');
        }
    }

    /// Writes `header` and indents what follows until [`close`](Self::close).
    pub fn open(&mut self, header: &str) {
        self.line(header);
        self.level += 1;
    }

    pub fn close(&mut self, footer: &str) {
        self.level = self.level.saturating_sub(1);
        self.line(footer);
    }

    /// Writes `text` one level out without leaving the block: `} else {`.
    pub fn reopen(&mut self, text: &str) {
        self.level = self.level.saturating_sub(1);
        self.line(text);
        self.level += 1;
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn indent(&self, level: usize) -> String {
        "  ".repeat(level)
    }
}

/// Renders `s` as a single-quoted TypeScript string literal.
pub(crate) fn quote(s: &str) -> String {
    format!("'{}'", escape_string(s))
}

fn escape_string(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '\'' => vec!['\\', '\''],
            '\\' => vec!['\\', '\\'],
            '\n' => vec!['\\', 'n'],
            '\r' => vec!['\\', 'r'],
            '\t' => vec!['\\', 't'],
            c if c.is_control() => format!("\\u{:04x}", c as u32).chars().collect(),
            c => vec![c],
        })
        .collect()
}

/// Escapes regex metacharacters and `/` so `s` can sit inside `/.../`.
pub(crate) fn regex_literal(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len() + 2);
    escaped.push('/');
    for c in s.chars() {
        if matches!(
            c,
            '.' | '*' | '+' | '?' | '^' | '$' | '{' | '}' | '(' | ')' | '|' | '[' | ']' | '\\' | '/'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('/');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_and_escapes() {
        assert_eq!(quote("it's"), "'it\\'s'");
        assert_eq!(quote("a\\b\nc"), "'a\\\\b\\nc'");
        assert_eq!(quote("\u{1}"), "'\\u0001'");
    }

    #[test]
    fn regex_literals_escape_slashes() {
        assert_eq!(regex_literal("/cart?id=1"), "/\\/cart\\?id=1/");
    }

    #[test]
    fn writer_indents_blocks() {
        let mut writer = CodeWriter::new();
        writer.open("if (x) {");
        writer.line("y();");
        writer.reopen("} else {");
        writer.line("z();");
        writer.close("}");
        assert_eq!(writer.finish(), "if (x) {\n  y();\n} else {\n  z();\n}\n");
    }
}
