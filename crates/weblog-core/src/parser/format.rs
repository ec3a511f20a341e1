// Format compiler: Apache LogFormat string -> anchored line pattern

use super::directive::Directive;
use crate::error::CompilationError;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// A log format compiled into one anchored pattern plus the ordered field
/// identifiers its capture groups fill.
///
/// Compile once per format string and share freely: a `CompiledFormat` is
/// immutable, cheap to clone and safe to use from many threads at once.
#[derive(Debug, Clone)]
pub struct CompiledFormat {
    format: String,
    directives: Vec<Directive>,
    regex: Regex,
}

impl CompiledFormat {
    pub fn compile(format: &str) -> Result<Self, CompilationError> {
        let tokens = tokenize(format)?;
        if tokens.is_empty() {
            return Err(CompilationError::Empty);
        }

        let directives: Vec<Directive> = tokens.iter().map(|token| Directive::new(token)).collect();

        let mut seen: HashMap<&str, &str> = HashMap::with_capacity(directives.len());
        for directive in &directives {
            if let Some(first) = seen.insert(directive.identifier(), directive.token()) {
                return Err(CompilationError::DuplicateIdentifier {
                    identifier: directive.identifier().to_string(),
                    first: first.to_string(),
                    second: directive.token().to_string(),
                });
            }
        }

        let body = directives
            .iter()
            .map(|directive| directive.kind().fragment())
            .collect::<Vec<_>>()
            .join(" ");
        let regex = Regex::new(&format!("^{body}$"))
            .map_err(|e| CompilationError::Pattern(e.to_string()))?;

        let format = tokens.join(" ");
        debug!(format = %format, fields = directives.len(), "compiled log format");

        Ok(Self {
            format,
            directives,
            regex,
        })
    }

    /// The format string with whitespace normalised.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Field identifiers in capture order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        self.directives.iter().map(Directive::identifier)
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub(crate) fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl FromStr for CompiledFormat {
    type Err = CompilationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for CompiledFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format)
    }
}

// Split on whitespace, except inside "...", [...] and {...} groups, which stay
// part of the token they open. `\"` (as written inside an Apache config
// directive) reads as a plain quote.
fn tokenize(format: &str) -> Result<Vec<String>, CompilationError> {
    let unescaped = format.replace("\\\"", "\"");
    let mut chars = unescaped.chars().peekable();
    let mut tokens = Vec::new();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut token = String::new();
        let mut closing: Option<char> = None;
        while let Some(&c) = chars.peek() {
            match closing {
                Some(end) => {
                    if c == end {
                        closing = None;
                    }
                }
                None if c.is_whitespace() => break,
                None => {
                    closing = match c {
                        '"' => Some('"'),
                        '[' => Some(']'),
                        '{' => Some('}'),
                        _ => None,
                    };
                }
            }
            token.push(c);
            chars.next();
        }

        if let Some(end) = closing {
            return Err(CompilationError::Unterminated {
                delimiter: end,
                format: format.trim().to_string(),
            });
        }
        tokens.push(token);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMON: &str = r#"%h %l %u %t "%r" %>s %b"#;

    #[test]
    fn test_whitespace_is_normalised() {
        let format = CompiledFormat::compile("  \t %h %l   %u %t \"%r\" %>s %b \n ").unwrap();
        assert_eq!(format.format(), COMMON);
    }

    #[test]
    fn test_pattern_is_anchored() {
        let format = CompiledFormat::compile(COMMON).unwrap();
        assert!(format.pattern().starts_with('^'));
        assert!(format.pattern().ends_with('$'));
        assert_eq!(format.len(), 7);
    }

    #[test]
    fn test_common_identifiers_in_order() {
        let format = CompiledFormat::compile(COMMON).unwrap();
        let identifiers: Vec<&str> = format.identifiers().collect();
        assert_eq!(
            identifiers,
            [
                "remote_host",
                "remote_logname",
                "remote_user",
                "time_received",
                "request",
                "status",
                "response_size"
            ]
        );
    }

    #[test]
    fn test_escaped_quotes_from_apache_config() {
        let format = CompiledFormat::compile(r#"%h %l %u %t \"%r\" %>s %b"#).unwrap();
        assert_eq!(format.format(), COMMON);
        assert_eq!(format.directives()[4].identifier(), "request");
    }

    #[test]
    fn test_groups_keep_embedded_spaces() {
        let tokens = tokenize(r#"%h "%m %U %H" %{%d/%b/%Y %T}t [%{x y}i]"#).unwrap();
        assert_eq!(tokens, ["%h", "\"%m %U %H\"", "%{%d/%b/%Y %T}t", "[%{x y}i]"]);
    }

    #[test]
    fn test_unterminated_group() {
        assert_eq!(
            CompiledFormat::compile(r#"%h "%r %>s"#).unwrap_err(),
            CompilationError::Unterminated {
                delimiter: '"',
                format: r#"%h "%r %>s"#.to_string(),
            }
        );
        assert!(matches!(
            CompiledFormat::compile("%h %{Referer"),
            Err(CompilationError::Unterminated { delimiter: '}', .. })
        ));
    }

    #[test]
    fn test_empty_format() {
        assert_eq!(CompiledFormat::compile(" \t\n").unwrap_err(), CompilationError::Empty);
    }

    #[test]
    fn test_duplicate_identifiers_rejected() {
        assert_eq!(
            CompiledFormat::compile("%h %s %>s").unwrap_err(),
            CompilationError::DuplicateIdentifier {
                identifier: "status".to_string(),
                first: "%s".to_string(),
                second: "%>s".to_string(),
            }
        );
        assert!(CompiledFormat::compile("%b %B").is_err());
        assert!(CompiledFormat::compile(r#""%{Referer}i" "%{referer}i""#).is_err());
        assert!(CompiledFormat::compile("%h - - %t").is_err());
    }

    #[test]
    fn test_compile_is_deterministic() {
        let first = CompiledFormat::compile(COMMON).unwrap();
        let second: CompiledFormat = COMMON.parse().unwrap();
        assert_eq!(first.pattern(), second.pattern());
        assert!(first.identifiers().eq(second.identifiers()));
        assert_eq!(first.to_string(), second.to_string());
    }
}
