//! String-literal lexing for definition files.
//!
//! A token captured by the grammar still carries its quoting. This module
//! strips the quotes and resolves backslash escapes:
//!
//! - `'single quoted'` text only knows the escapes `\\` and `\'` and is never
//!   subject to substitution.
//! - `"double quoted"` and bare text is scanned left to right; every
//!   unescaped match of a [`SubstitutionMatcher`] is replaced by the
//!   matcher's output, and a backslash may only escape a quote or something
//!   a matcher would otherwise have replaced.
//!
//! Errors are reported as clause fragments ("has unbalanced single
//! quotes.") so that callers can prefix the token and its position.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

/// A pattern plus the replacement produced when it matches.
///
/// Patterns are tried at the current scan position only; the first matcher
/// (in caller order) whose pattern matches wins.
#[derive(Clone)]
pub struct SubstitutionMatcher {
    pattern: Regex,
    transform: Arc<dyn Fn(&str) -> String + Send + Sync>,
}

impl SubstitutionMatcher {
    /// Build a matcher from a regular expression and a transform that
    /// receives the matched text.
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error for an invalid pattern.
    pub fn new(
        pattern: &str,
        transform: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&format!(r"\A(?:{pattern})"))?,
            transform: Arc::new(transform),
        })
    }

    /// The package-reference matcher: `@` stands for itself.
    ///
    /// This is what makes `\@` a legal escape when no environment is around
    /// to give `@` a meaning.
    pub fn package_reference() -> Self {
        PACKAGE_REFERENCE.clone()
    }

    /// Try this matcher at the start of `text`, returning the replacement and
    /// the number of bytes consumed. Empty matches never count.
    fn apply(&self, text: &str) -> Option<(String, usize)> {
        let found = self.pattern.find(text)?;
        if found.is_empty() {
            return None;
        }
        Some(((self.transform)(found.as_str()), found.end()))
    }
}

impl fmt::Debug for SubstitutionMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubstitutionMatcher")
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

static PACKAGE_REFERENCE: LazyLock<SubstitutionMatcher> = LazyLock::new(|| {
    SubstitutionMatcher::new("@", str::to_string).expect("literal `@` is a valid pattern")
});

/// The matchers used when nothing more specific is supplied.
pub fn default_matchers() -> Vec<SubstitutionMatcher> {
    vec![SubstitutionMatcher::package_reference()]
}

/// The unescaped value of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    /// Text with quotes removed and escapes resolved.
    pub value: String,
    /// Whether the token was single-quoted; later passes must not apply
    /// substitution to such values.
    pub single_quoted: bool,
}

impl Literal {
    fn unquoted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            single_quoted: false,
        }
    }
}

/// Which kind of quote a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    /// `'`
    Single,
    /// `"`
    Double,
}

impl Quote {
    /// The quote character itself.
    pub fn character(self) -> char {
        match self {
            Self::Single => '\'',
            Self::Double => '"',
        }
    }

    /// `"single"` or `"double"`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
        }
    }
}

/// How quotes failed to balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Imbalance {
    /// An opening quote without a closing one (or a lone quote).
    Unterminated,
    /// The closing double quote is escaped by a backslash.
    EscapedTerminator,
    /// A closing double quote with no opening one.
    NeverOpened,
}

/// Lexical errors. `Display` yields a clause suitable for appending to a
/// description of the offending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// Quotes do not pair up.
    UnbalancedQuotes {
        /// The quote character involved.
        quote: Quote,
        /// How the quotes failed to balance.
        imbalance: Imbalance,
    },
    /// A backslash escapes a character that cannot be escaped here.
    BadEscapeSequence {
        /// The character following the backslash.
        character: char,
        /// Whether the sequence appeared inside single quotes.
        inside_single_quotes: bool,
    },
    /// The token ends with an unpaired backslash.
    IncompleteEscape,
    /// A quote character appears unescaped in the middle of the text.
    UnescapedQuote {
        /// The quote character involved.
        quote: Quote,
    },
}

impl LexError {
    /// Full diagnostic for a token: `«TOKEN»POSITION CLAUSE`.
    ///
    /// ```
    /// use fig_schema::{strip_quotes_and_process_escapes, Position};
    ///
    /// let error = strip_quotes_and_process_escapes("'foo", &[]).unwrap_err();
    /// assert_eq!(
    ///     error.describe("'foo", &Position::new(2, 9, Some("package.fig"))),
    ///     "«'foo» (line 2, column 9, package.fig) has unbalanced single quotes."
    /// );
    /// ```
    pub fn describe(&self, token: &str, position: &crate::Position) -> String {
        format!("«{token}»{position} {self}")
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnbalancedQuotes {
                quote,
                imbalance: Imbalance::Unterminated,
            } => write!(f, "has unbalanced {} quotes.", quote.name()),
            Self::UnbalancedQuotes {
                quote,
                imbalance: Imbalance::EscapedTerminator,
            } => write!(
                f,
                "has unbalanced {0} quotes; the trailing {0} quote is escaped.",
                quote.name()
            ),
            Self::UnbalancedQuotes {
                quote,
                imbalance: Imbalance::NeverOpened,
            } => write!(
                f,
                "has unbalanced {0} quotes; it ends in a {0} quote when it didn't start with one.",
                quote.name()
            ),
            Self::BadEscapeSequence {
                character,
                inside_single_quotes: true,
            } => write!(
                f,
                "contains a bad escape sequence (\\{character}) inside single quotes."
            ),
            Self::BadEscapeSequence { character, .. } => {
                write!(f, "contains a bad escape sequence (\\{character}).")
            }
            Self::IncompleteEscape => f.write_str("ends in an incomplete escape."),
            Self::UnescapedQuote { quote } => {
                write!(f, "contains an unescaped {} quote.", quote.name())
            }
        }
    }
}

impl std::error::Error for LexError {}

/// Strip quoting from `token` and resolve its escapes.
///
/// `matchers` are consulted, in order, on double-quoted and bare text only.
///
/// # Errors
///
/// Returns the first [`LexError`] found; the token is not partially
/// processed.
///
/// ```
/// use fig_schema::literal::{default_matchers, strip_quotes_and_process_escapes};
///
/// let literal = strip_quotes_and_process_escapes(r"\@one\@two", &default_matchers()).unwrap();
/// assert_eq!(literal.value, "@one@two");
/// assert!(!literal.single_quoted);
///
/// let literal = strip_quotes_and_process_escapes(r"'a\\b'", &[]).unwrap();
/// assert_eq!(literal.value, r"a\b");
/// assert!(literal.single_quoted);
/// ```
pub fn strip_quotes_and_process_escapes(
    token: &str,
    matchers: &[SubstitutionMatcher],
) -> Result<Literal, LexError> {
    if token.is_empty() {
        return Ok(Literal::unquoted(""));
    }

    if let Some(value) = strip_single_quotes(token)? {
        return Ok(Literal {
            value,
            single_quoted: true,
        });
    }

    strip_double_quotes(token, matchers).map(Literal::unquoted)
}

/// Number of consecutive backslashes ending just before `end`.
fn backslashes_before(chars: &[char], end: usize) -> usize {
    chars[..end].iter().rev().take_while(|c| **c == '\\').count()
}

/// `Ok(None)` when the token is not single-quoted at all.
fn strip_single_quotes(token: &str) -> Result<Option<String>, LexError> {
    let chars: Vec<char> = token.chars().collect();
    let last = chars.len() - 1;
    let starts = chars[0] == '\'';
    let ends = chars[last] == '\'';

    if !starts && !ends {
        return Ok(None);
    }

    // «\'», «\\\'», ...: an escaped quote on its own is not a quoted string.
    let run = backslashes_before(&chars, last);
    if ends && run == last && run % 2 == 1 {
        return Ok(None);
    }

    // The final quote counts as escaped only when an odd run of backslashes
    // follows some other character.
    let escaped_terminator = ends && run % 2 == 1 && run < last;
    if chars.len() == 1 || !starts || !ends || escaped_terminator {
        return Err(LexError::UnbalancedQuotes {
            quote: Quote::Single,
            imbalance: Imbalance::Unterminated,
        });
    }

    if let Some(character) = bad_single_quote_escape(&chars) {
        return Err(LexError::BadEscapeSequence {
            character,
            inside_single_quotes: true,
        });
    }

    Ok(Some(collapse_escapes(&chars[1..last])))
}

/// The first character escaped by an odd backslash run that is neither a
/// backslash nor a single quote.
fn bad_single_quote_escape(chars: &[char]) -> Option<char> {
    let mut index = 1;
    while index < chars.len() {
        if chars[index] != '\\' {
            index += 1;
            continue;
        }
        let start = index;
        while index < chars.len() && chars[index] == '\\' {
            index += 1;
        }
        let escaped = chars.get(index).copied()?;
        if (index - start) % 2 == 1 && escaped != '\'' {
            return Some(escaped);
        }
    }
    None
}

/// Replace every `\x` pair with `x`, scanning left to right.
fn collapse_escapes(chars: &[char]) -> String {
    let mut value = String::with_capacity(chars.len());
    let mut iter = chars.iter();
    while let Some(&c) = iter.next() {
        if c == '\\' {
            if let Some(&escaped) = iter.next() {
                value.push(escaped);
                continue;
            }
        }
        value.push(c);
    }
    value
}

fn strip_double_quotes(token: &str, matchers: &[SubstitutionMatcher]) -> Result<String, LexError> {
    let body = check_and_strip_double_quotes(token)?;

    if body == r"\'" {
        return Ok("'".to_string());
    }

    tokenize(body, matchers)
}

fn check_and_strip_double_quotes(token: &str) -> Result<&str, LexError> {
    let chars: Vec<char> = token.chars().collect();
    let last = chars.len() - 1;

    // A lone escaped character is left for the tokenizer to judge.
    if chars.len() == 2 && chars[0] == '\\' {
        return Ok(token);
    }

    if chars[0] == '"' {
        if chars.len() == 1 || chars[last] != '"' {
            return Err(LexError::UnbalancedQuotes {
                quote: Quote::Double,
                imbalance: Imbalance::Unterminated,
            });
        }
        let run = backslashes_before(&chars, last);
        if run % 2 == 1 && run < last {
            return Err(LexError::UnbalancedQuotes {
                quote: Quote::Double,
                imbalance: Imbalance::EscapedTerminator,
            });
        }
        return Ok(&token[1..token.len() - 1]);
    }

    if chars[last] == '"' && backslashes_before(&chars, last) % 2 == 0 {
        return Err(LexError::UnbalancedQuotes {
            quote: Quote::Double,
            imbalance: Imbalance::NeverOpened,
        });
    }

    Ok(token)
}

fn substitute(text: &str, matchers: &[SubstitutionMatcher]) -> Option<(String, usize)> {
    matchers.iter().find_map(|matcher| matcher.apply(text))
}

fn push_backslashes(value: &mut String, count: usize) {
    value.extend(std::iter::repeat_n('\\', count));
}

/// Scan unquoted (or double-quote stripped) text. Backslash pairs collapse to
/// one backslash; substitution output is emitted as-is and never rescanned.
fn tokenize(text: &str, matchers: &[SubstitutionMatcher]) -> Result<String, LexError> {
    let mut value = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if c == '\\' {
            let remainder = rest.trim_start_matches('\\');
            let run = rest.len() - remainder.len();

            if run % 2 == 0 {
                push_backslashes(&mut value, run / 2);
                rest = remainder;
                continue;
            }

            let Some(escaped) = remainder.chars().next() else {
                return Err(LexError::IncompleteEscape);
            };
            if escaped != '"' && substitute(remainder, matchers).is_none() {
                return Err(LexError::BadEscapeSequence {
                    character: escaped,
                    inside_single_quotes: false,
                });
            }
            push_backslashes(&mut value, run / 2);
            value.push(escaped);
            rest = &remainder[escaped.len_utf8()..];
        } else if let Some((replacement, consumed)) = substitute(rest, matchers) {
            value.push_str(&replacement);
            rest = &rest[consumed..];
        } else if c == '\'' || c == '"' {
            let quote = if c == '\'' { Quote::Single } else { Quote::Double };
            return Err(LexError::UnescapedQuote { quote });
        } else {
            value.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    Ok(value)
}
