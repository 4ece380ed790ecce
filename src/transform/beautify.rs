//! JavaScript pretty-printing
//!
//! A small, deterministic formatter for minified course scripts. It understands
//! just enough of the language to stay out of string, template, comment and
//! regular-expression literals, and otherwise:
//! - breaks lines after `{`, `;` (outside parentheses) and before `}`
//! - indents blocks by four spaces
//! - keeps `} else`, `} catch`, `} finally`, `} while`, `});` and `},` together
//! - keeps line breaks present in the source (scripts may rely on ASI)
//!
//! Unbalanced input is reported as an error so the caller can fall back to the
//! original text.

use crate::transform::TransformError;

const INDENT: &str = "    ";

/// Characters after which a `/` starts a regular expression literal
const REGEX_PRECEDERS: &str = "(,=:[!&|?{};+-*%<>~^";

/// Keywords after which a `/` starts a regular expression literal
const REGEX_KEYWORDS: [&str; 5] = ["return", "typeof", "case", "in", "of"];

/// Keywords that stay on the same line as a preceding `}`
const CONTINUATION_KEYWORDS: [&str; 4] = ["else", "catch", "finally", "while"];

struct Formatter<'a> {
    chars: &'a [char],
    pos: usize,
    out: String,
    line: String,
    indent: usize,
    paren_depth: usize,
    // Paren depth outside each open block
    paren_stack: Vec<usize>,
    pending_space: bool,
    last_significant: Option<char>,
}

impl<'a> Formatter<'a> {
    fn new(chars: &'a [char]) -> Self {
        Self {
            chars,
            pos: 0,
            out: String::with_capacity(chars.len() + chars.len() / 4),
            line: String::new(),
            indent: 0,
            paren_depth: 0,
            paren_stack: Vec::new(),
            pending_space: false,
            last_significant: None,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn next_significant(&self) -> Option<(usize, char)> {
        self.chars[self.pos..]
            .iter()
            .enumerate()
            .find(|(_, c)| !c.is_whitespace())
            .map(|(i, c)| (self.pos + i, *c))
    }

    fn word_at(&self, start: usize) -> String {
        self.chars[start..]
            .iter()
            .take_while(|c| c.is_alphanumeric() || **c == '_' || **c == '$')
            .collect()
    }

    fn flush_line(&mut self) {
        let trimmed = self.line.trim_end();
        if !trimmed.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str(INDENT);
            }
            self.out.push_str(trimmed.trim_start());
            self.out.push('\n');
        }
        self.line.clear();
        self.pending_space = false;
    }

    fn push_token(&mut self, token: &str) {
        if self.pending_space && !self.line.is_empty() {
            self.line.push(' ');
        }
        self.pending_space = false;
        self.line.push_str(token);
        if let Some(c) = token.chars().last() {
            self.last_significant = Some(c);
        }
    }

    fn push_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.push_token(c.encode_utf8(&mut buf));
    }

    /// Reads a quoted literal starting at the current position
    fn read_string(&mut self, quote: char) -> Result<String, TransformError> {
        let start = self.pos;
        self.pos += 1;
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            if c == '\\' {
                self.pos += 1;
            } else if c == quote {
                return Ok(self.chars[start..self.pos].iter().collect());
            } else if c == '\n' && quote != '`' {
                break;
            }
        }
        Err(TransformError::Beautify(format!(
            "unterminated string literal at offset {}",
            start
        )))
    }

    fn read_line_comment(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn read_block_comment(&mut self) -> Result<String, TransformError> {
        let start = self.pos;
        self.pos += 2;
        while self.pos + 1 < self.chars.len() {
            if self.chars[self.pos] == '*' && self.chars[self.pos + 1] == '/' {
                self.pos += 2;
                return Ok(self.chars[start..self.pos].iter().collect());
            }
            self.pos += 1;
        }
        Err(TransformError::Beautify(format!(
            "unterminated block comment at offset {}",
            start
        )))
    }

    fn regex_allowed(&self) -> bool {
        match self.last_significant {
            None => true,
            Some(c) if REGEX_PRECEDERS.contains(c) => true,
            Some(c) if c.is_alphanumeric() => {
                let line = self.line.trim_end();
                REGEX_KEYWORDS.iter().any(|kw| {
                    line.ends_with(kw)
                        && line[..line.len() - kw.len()]
                            .chars()
                            .last()
                            .map_or(true, |p| !(p.is_alphanumeric() || p == '_' || p == '$'))
                })
            }
            _ => false,
        }
    }

    /// Reads a regular expression literal, or returns None if the slash is division
    fn try_read_regex(&mut self) -> Option<String> {
        let start = self.pos;
        let mut i = self.pos + 1;
        let mut in_class = false;

        while let Some(&c) = self.chars.get(i) {
            match c {
                '\n' => return None,
                '\\' => i += 1,
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => {
                    i += 1;
                    while self.chars.get(i).map_or(false, |f| f.is_ascii_alphabetic()) {
                        i += 1;
                    }
                    self.pos = i;
                    return Some(self.chars[start..i].iter().collect());
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    fn close_brace(&mut self) -> Result<(), TransformError> {
        self.flush_line();
        let outer_parens = match self.paren_stack.pop() {
            Some(depth) if self.paren_depth == 0 => depth,
            _ => {
                return Err(TransformError::Beautify(format!(
                    "unbalanced closing brace at offset {}",
                    self.pos
                )))
            }
        };
        self.indent -= 1;
        self.paren_depth = outer_parens;
        self.pos += 1;
        self.push_char('}');

        match self.next_significant() {
            Some((_, ';' | ',' | ')' | ']' | '.')) => {}
            Some((at, c)) if c.is_alphabetic() => {
                let word = self.word_at(at);
                if CONTINUATION_KEYWORDS.contains(&word.as_str()) {
                    self.pending_space = true;
                } else {
                    self.flush_line();
                }
            }
            _ => self.flush_line(),
        }
        Ok(())
    }

    fn run(mut self) -> Result<String, TransformError> {
        while let Some(c) = self.peek(0) {
            match c {
                '\n' => {
                    self.pos += 1;
                    if self.paren_depth == 0 && !self.line.trim().is_empty() {
                        self.flush_line();
                    } else {
                        self.pending_space = true;
                    }
                }
                c if c.is_whitespace() => {
                    self.pos += 1;
                    self.pending_space = true;
                }
                '"' | '\'' | '`' => {
                    let literal = self.read_string(c)?;
                    self.push_token(&literal);
                }
                '/' if self.peek(1) == Some('/') => {
                    let comment = self.read_line_comment();
                    let last = self.last_significant;
                    self.push_token(&comment);
                    self.last_significant = last;
                    self.flush_line();
                }
                '/' if self.peek(1) == Some('*') => {
                    let comment = self.read_block_comment()?;
                    let last = self.last_significant;
                    self.push_token(&comment);
                    self.last_significant = last;
                }
                '/' if self.regex_allowed() => match self.try_read_regex() {
                    Some(literal) => self.push_token(&literal),
                    None => {
                        self.pos += 1;
                        self.push_char('/');
                    }
                },
                '{' => {
                    self.pos += 1;
                    if matches!(self.next_significant(), Some((_, '}'))) {
                        // Empty block stays inline
                        let (close, _) = self.next_significant().unwrap_or((self.pos, '}'));
                        self.pos = close + 1;
                        self.push_token("{}");
                    } else {
                        self.push_char('{');
                        self.flush_line();
                        self.indent += 1;
                        self.paren_stack.push(self.paren_depth);
                        self.paren_depth = 0;
                    }
                }
                '}' => self.close_brace()?,
                ';' => {
                    self.pos += 1;
                    self.push_char(';');
                    if self.paren_depth == 0 {
                        self.flush_line();
                    }
                }
                '(' => {
                    self.pos += 1;
                    self.paren_depth += 1;
                    self.push_char('(');
                }
                ')' => {
                    if self.paren_depth == 0 {
                        return Err(TransformError::Beautify(format!(
                            "unbalanced closing parenthesis at offset {}",
                            self.pos
                        )));
                    }
                    self.pos += 1;
                    self.paren_depth -= 1;
                    self.push_char(')');
                }
                _ => {
                    self.pos += 1;
                    self.push_char(c);
                }
            }
        }

        self.flush_line();

        if self.indent != 0 || self.paren_depth != 0 {
            return Err(TransformError::Beautify(format!(
                "unbalanced input: {} open brace(s), {} open parenthesis(es)",
                self.indent, self.paren_depth
            )));
        }

        Ok(self.out)
    }
}

/// Formats JavaScript source
///
/// # Errors
///
/// Returns `TransformError::Beautify` for unterminated literals or unbalanced
/// braces and parentheses.
///
/// # Examples
///
/// ```
/// use course_harvest::transform::beautify;
///
/// let pretty = beautify("function f(a){if(a){return 1;}else{return 2;}}").unwrap();
/// assert_eq!(
///     pretty,
///     "function f(a){\n    if(a){\n        return 1;\n    } else{\n        return 2;\n    }\n}\n"
/// );
/// ```
pub fn beautify(source: &str) -> Result<String, TransformError> {
    let chars: Vec<char> = source.chars().collect();
    Formatter::new(&chars).run()
}
