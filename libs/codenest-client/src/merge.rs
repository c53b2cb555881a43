/// Result Merge Policy - where new artifacts land
///
/// **Rules:**
/// - Generated code goes on top of the buffer, under a provenance comment naming the
///   prompt; existing content is kept below it, never replaced
/// - Generation failures go on top as a commented error line, same placement
/// - Execution output is appended to the transcript, oldest first; only an explicit
///   `clear` empties it

use codenest_common::types::Language;

/// Editor buffer contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    text: String,
}

impl Buffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn replace(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn prepend_generated(&mut self, prompt: &str, code: &str, language: Language) {
        let header = format!("{} Generated for: \"{}\"", language.comment_prefix(), prompt);
        self.prepend(&format!("{}\n{}", header, code));
    }

    pub fn prepend_error(&mut self, message: &str, language: Language) {
        let line = format!("{} Error generating code: {}", language.comment_prefix(), message);
        self.prepend(&line);
    }

    fn prepend(&mut self, block: &str) {
        self.text = format!("{}\n\n{}", block, self.text);
    }
}

/// Append-only run output, oldest chunk first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: impl Into<String>) {
        self.entries.push(chunk.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Chunks joined the way the output pane shows them
    pub fn render(&self) -> String {
        self.entries.join("\n")
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_is_prepended() {
        let mut buffer = Buffer::new("console.log(fibonacci(10));");
        buffer.prepend_generated("reverse a string", "const reverse = s => [...s].reverse().join('');", Language::JavaScript);

        assert_eq!(
            buffer.text(),
            "// Generated for: \"reverse a string\"\n\
             const reverse = s => [...s].reverse().join('');\n\
             \n\
             console.log(fibonacci(10));"
        );
    }

    #[test]
    fn test_python_uses_hash_comments() {
        let mut buffer = Buffer::new("print('old')");
        buffer.prepend_generated("reverse a string", "def reverse(s): return s[::-1]", Language::Python);
        assert!(buffer.text().starts_with("# Generated for: \"reverse a string\"\ndef reverse"));
        assert!(buffer.text().ends_with("\n\nprint('old')"));
    }

    #[test]
    fn test_repeated_generation_stacks_newest_first() {
        let mut buffer = Buffer::new("base");
        buffer.prepend_generated("one", "1", Language::Go);
        buffer.prepend_generated("two", "2", Language::Go);

        let text = buffer.text();
        let two = text.find("\"two\"").unwrap();
        let one = text.find("\"one\"").unwrap();
        assert!(two < one);
        assert!(text.ends_with("base"));
    }

    #[test]
    fn test_error_line_is_prepended() {
        let mut buffer = Buffer::new("fn main() {}");
        buffer.prepend_error("Code generation failed: HTTP 401", Language::Rust);
        assert_eq!(
            buffer.text(),
            "// Error generating code: Code generation failed: HTTP 401\n\nfn main() {}"
        );
    }

    #[test]
    fn test_transcript_appends_and_clears() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());

        transcript.push("55");
        transcript.push("Execution finished with no output.");
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.entries()[0], "55");
        assert_eq!(transcript.last(), Some("Execution finished with no output."));
        assert_eq!(transcript.render(), "55\nExecution finished with no output.");

        transcript.clear();
        assert!(transcript.is_empty());
        assert_eq!(transcript.render(), "");
    }
}
