use regex::{Regex, RegexBuilder};

/// Compiled regular expression together with its source pattern and flags.
#[derive(Debug, Clone)]
pub struct Regexp {
    pattern: String,
    flags: String,
    compiled: Regex,
}

impl Regexp {
    /// Flags: `i` case-insensitive, `m` multi-line, `s` dot matches newline,
    /// `x` ignore whitespace. Other characters are ignored.
    pub fn new(pattern: impl Into<String>, flags: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let flags = flags.into();
        let compiled = RegexBuilder::new(&pattern)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .ignore_whitespace(flags.contains('x'))
            .build()?;
        Ok(Self {
            pattern,
            flags,
            compiled,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.compiled.is_match(haystack)
    }

    pub fn regex(&self) -> &Regex {
        &self.compiled
    }
}
