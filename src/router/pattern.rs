//! Path pattern compiler.
//!
//! Turns route paths such as `/users/:id`, `/files/:path*` or
//! `/posts/:id(\\d+){/:slug}?` into anchored regexes, and keeps the parsed
//! tokens around so a pattern can be reversed into a concrete URL.
//!
//! ## Syntax
//!
//! - `:name` named parameter, default pattern `[^/#?]+?`
//! - `:name(re)` named parameter with a custom pattern
//! - `(re)` unnamed capture
//! - `?`, `*`, `+` modifiers after a parameter or group
//! - `{...}` group, e.g. `{/:slug}?`
//! - `\` escapes the next character
//!
//! A preceding `/` or `.` becomes the parameter's prefix, so optional and
//! repeated parameters swallow their separator. Bare `*` wildcards are not
//! supported and fail to compile; use `(.*)` or `:rest*`.

use std::collections::HashMap;

use regex::Regex;

use crate::error::{Result, RouterError};

const DEFAULT_PATTERN: &str = "[^/#?]+?";
const DELIMITERS: [char; 3] = ['/', '#', '?'];
const PREFIX_CHARS: &str = "./";

/// Flags fixed at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternOptions {
    /// Anchor at the end of the path; `false` gives a prefix match on segment boundaries
    pub end: bool,
    /// Trailing delimiter is significant
    pub strict: bool,
    /// Case-sensitive matching
    pub sensitive: bool,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            end: true,
            strict: false,
            sensitive: false,
        }
    }
}

/// A route path as given at registration: pattern text or a pre-built regex.
#[derive(Debug, Clone)]
pub enum PathSpec {
    Path(String),
    Regex(Regex),
}

impl PathSpec {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            PathSpec::Path(p) => p,
            PathSpec::Regex(r) => r.as_str(),
        }
    }
}

impl From<&str> for PathSpec {
    fn from(path: &str) -> Self {
        PathSpec::Path(path.to_string())
    }
}

impl From<String> for PathSpec {
    fn from(path: String) -> Self {
        PathSpec::Path(path)
    }
}

impl From<&String> for PathSpec {
    fn from(path: &String) -> Self {
        PathSpec::Path(path.clone())
    }
}

impl From<Regex> for PathSpec {
    fn from(regex: Regex) -> Self {
        PathSpec::Regex(regex)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    None,
    Optional,
    ZeroOrMore,
    OneOrMore,
}

impl Modifier {
    fn parse(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("?") => Modifier::Optional,
            Some("*") => Modifier::ZeroOrMore,
            Some("+") => Modifier::OneOrMore,
            _ => Modifier::None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Modifier::None => "",
            Modifier::Optional => "?",
            Modifier::ZeroOrMore => "*",
            Modifier::OneOrMore => "+",
        }
    }

    fn is_optional(self) -> bool {
        matches!(self, Modifier::Optional | Modifier::ZeroOrMore)
    }

    fn is_repeat(self) -> bool {
        matches!(self, Modifier::ZeroOrMore | Modifier::OneOrMore)
    }
}

/// A capturing parameter in a parsed pattern
#[derive(Debug, Clone, PartialEq, Eq)]
struct Key {
    name: Option<String>,
    prefix: String,
    suffix: String,
    pattern: String,
    modifier: Modifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Capture(Key),
    /// `{...}` group without a parameter
    Group {
        prefix: String,
        suffix: String,
        modifier: Modifier,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexKind {
    Open,
    Close,
    Pattern,
    Name,
    Char,
    EscapedChar,
    Modifier,
    End,
}

#[derive(Debug)]
struct LexToken {
    kind: LexKind,
    index: usize,
    value: String,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn lex(source: &str) -> std::result::Result<Vec<LexToken>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len() + 1);
    let mut i = 0;

    let mut push = |kind, index, value: String| tokens.push(LexToken { kind, index, value });

    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' | '+' | '?' => {
                push(LexKind::Modifier, i, c.to_string());
                i += 1;
            }
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .ok_or_else(|| format!("dangling escape at {}", i))?;
                push(LexKind::EscapedChar, i, escaped.to_string());
                i += 2;
            }
            '{' => {
                push(LexKind::Open, i, c.to_string());
                i += 1;
            }
            '}' => {
                push(LexKind::Close, i, c.to_string());
                i += 1;
            }
            ':' => {
                let name: String = chars[i + 1..]
                    .iter()
                    .take_while(|c| is_name_char(**c))
                    .collect();
                if name.is_empty() {
                    return Err(format!("missing parameter name at {}", i));
                }
                let len = name.chars().count();
                push(LexKind::Name, i, name);
                i += 1 + len;
            }
            '(' => {
                let mut depth = 1;
                let mut pattern = String::new();
                let mut j = i + 1;

                if chars.get(j) == Some(&'?') {
                    return Err(format!("pattern cannot start with \"?\" at {}", j));
                }

                while j < chars.len() {
                    if chars[j] == '\\' {
                        pattern.push('\\');
                        if let Some(next) = chars.get(j + 1) {
                            pattern.push(*next);
                        }
                        j += 2;
                        continue;
                    }
                    if chars[j] == ')' {
                        depth -= 1;
                        if depth == 0 {
                            j += 1;
                            break;
                        }
                    } else if chars[j] == '(' {
                        depth += 1;
                        if chars.get(j + 1) != Some(&'?') {
                            return Err(format!("capturing groups are not allowed at {}", j));
                        }
                    }
                    pattern.push(chars[j]);
                    j += 1;
                }

                if depth > 0 {
                    return Err(format!("unbalanced pattern at {}", i));
                }
                if pattern.is_empty() {
                    return Err(format!("missing pattern at {}", i));
                }
                push(LexKind::Pattern, i, pattern);
                i = j;
            }
            _ => {
                push(LexKind::Char, i, c.to_string());
                i += 1;
            }
        }
    }

    push(LexKind::End, chars.len(), String::new());
    Ok(tokens)
}

struct Parser {
    tokens: Vec<LexToken>,
    pos: usize,
}

impl Parser {
    fn try_consume(&mut self, kind: LexKind) -> Option<String> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Some(token.value.clone())
            }
            _ => None,
        }
    }

    fn must_consume(&mut self, kind: LexKind) -> std::result::Result<(), String> {
        if self.try_consume(kind).is_some() {
            return Ok(());
        }
        match self.tokens.get(self.pos) {
            Some(token) => Err(format!(
                "unexpected {:?} at {}, expected {:?}",
                token.kind, token.index, kind
            )),
            None => Err(format!("unexpected end of pattern, expected {:?}", kind)),
        }
    }

    fn consume_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(value) = self
            .try_consume(LexKind::Char)
            .or_else(|| self.try_consume(LexKind::EscapedChar))
        {
            text.push_str(&value);
        }
        text
    }
}

fn parse(source: &str) -> std::result::Result<Vec<Token>, String> {
    let mut parser = Parser {
        tokens: lex(source)?,
        pos: 0,
    };
    let mut result = Vec::new();
    let mut path = String::new();

    while parser.pos < parser.tokens.len() {
        let ch = parser.try_consume(LexKind::Char);
        let name = parser.try_consume(LexKind::Name);
        let pattern = parser.try_consume(LexKind::Pattern);

        if name.is_some() || pattern.is_some() {
            let mut prefix = ch.unwrap_or_default();
            if !PREFIX_CHARS.contains(prefix.as_str()) {
                path.push_str(&prefix);
                prefix.clear();
            }
            if !path.is_empty() {
                result.push(Token::Text(std::mem::take(&mut path)));
            }
            result.push(Token::Capture(Key {
                name,
                prefix,
                suffix: String::new(),
                pattern: pattern.unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
                modifier: Modifier::parse(parser.try_consume(LexKind::Modifier)),
            }));
            continue;
        }

        if let Some(value) = ch.or_else(|| parser.try_consume(LexKind::EscapedChar)) {
            path.push_str(&value);
            continue;
        }

        if !path.is_empty() {
            result.push(Token::Text(std::mem::take(&mut path)));
        }

        if parser.try_consume(LexKind::Open).is_some() {
            let prefix = parser.consume_text();
            let name = parser.try_consume(LexKind::Name);
            let pattern = parser.try_consume(LexKind::Pattern);
            let suffix = parser.consume_text();
            parser.must_consume(LexKind::Close)?;
            let modifier = Modifier::parse(parser.try_consume(LexKind::Modifier));

            result.push(match (name, pattern) {
                (None, None) => Token::Group {
                    prefix,
                    suffix,
                    modifier,
                },
                (name, pattern) => Token::Capture(Key {
                    name,
                    prefix,
                    suffix,
                    pattern: pattern.unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
                    modifier,
                }),
            });
            continue;
        }

        parser.must_consume(LexKind::End)?;
    }

    Ok(result)
}

fn regex_source(tokens: &[Token], opts: PatternOptions) -> String {
    let mut route = String::with_capacity(64);
    if !opts.sensitive {
        route.push_str("(?i)");
    }
    route.push('^');

    for token in tokens {
        match token {
            Token::Text(text) => route.push_str(&regex::escape(text)),
            Token::Capture(key) => {
                let prefix = regex::escape(&key.prefix);
                let suffix = regex::escape(&key.suffix);
                let pattern = &key.pattern;
                let modifier = key.modifier.as_str();
                if !prefix.is_empty() || !suffix.is_empty() {
                    if key.modifier.is_repeat() {
                        let optional = if key.modifier == Modifier::ZeroOrMore { "?" } else { "" };
                        route.push_str(&format!(
                            "(?:{prefix}((?:{pattern})(?:{suffix}{prefix}(?:{pattern}))*){suffix}){optional}"
                        ));
                    } else {
                        route.push_str(&format!("(?:{prefix}({pattern}){suffix}){modifier}"));
                    }
                } else if key.modifier.is_repeat() {
                    route.push_str(&format!("((?:{pattern}){modifier})"));
                } else {
                    route.push_str(&format!("({pattern}){modifier}"));
                }
            }
            Token::Group {
                prefix,
                suffix,
                modifier,
            } => {
                route.push_str(&format!(
                    "(?:{}{}){}",
                    regex::escape(prefix),
                    regex::escape(suffix),
                    modifier.as_str()
                ));
            }
        }
    }

    if opts.end {
        if !opts.strict {
            route.push_str("[/#?]?");
        }
        route.push('$');
    } else {
        // Prefix match: the pattern must end on a segment boundary.
        let end_delimited = match tokens.last() {
            None => true,
            Some(Token::Text(text)) => text.ends_with(DELIMITERS),
            Some(_) => false,
        };
        if !end_delimited {
            route.push_str("(?:[/#?]|$)");
        }
    }

    route
}

/// Values for reversing a pattern into a URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UrlParams {
    #[default]
    Empty,
    /// Values bound to captures in pattern order
    Positional(Vec<String>),
    /// Values bound by parameter name
    Named(Vec<(String, String)>),
}

impl UrlParams {
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        UrlParams::Positional(values.into_iter().map(|v| v.to_string()).collect())
    }

    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        UrlParams::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        )
    }

    fn lookup(&self, position: usize, name: Option<&str>) -> Option<&str> {
        match self {
            UrlParams::Empty => None,
            UrlParams::Positional(values) => values.get(position).map(String::as_str),
            UrlParams::Named(pairs) => {
                let position = position.to_string();
                let key = name.unwrap_or(position.as_str());
                pairs
                    .iter()
                    .rfind(|(k, _)| k == key)
                    .map(|(_, v)| v.as_str())
            }
        }
    }
}

impl<K: Into<String>, V: ToString, const N: usize> From<[(K, V); N]> for UrlParams {
    fn from(pairs: [(K, V); N]) -> Self {
        UrlParams::named(pairs)
    }
}

impl From<HashMap<String, String>> for UrlParams {
    fn from(map: HashMap<String, String>) -> Self {
        UrlParams::Named(map.into_iter().collect())
    }
}

impl From<Vec<String>> for UrlParams {
    fn from(values: Vec<String>) -> Self {
        UrlParams::Positional(values)
    }
}

/// A compiled route path
#[derive(Debug, Clone)]
pub struct PathMatcher {
    source: String,
    /// `None` when built from a raw regex
    tokens: Option<Vec<Token>>,
    keys: Vec<Option<String>>,
    /// Anchored per-capture value patterns used by `reverse`, aligned with `keys`
    validators: Vec<Regex>,
    regex: Regex,
}

impl PathMatcher {
    /// Compile a pattern string.
    ///
    /// # Errors
    ///
    /// `PatternCompile` when the syntax is malformed or the resulting regex is rejected.
    pub fn compile(source: &str, opts: PatternOptions) -> Result<Self> {
        let compile_error = |reason: String| RouterError::PatternCompile {
            pattern: source.to_string(),
            reason,
        };

        let tokens = parse(source).map_err(compile_error)?;
        let regex = Regex::new(&regex_source(&tokens, opts))
            .map_err(|e| compile_error(e.to_string()))?;
        let flags = if opts.sensitive { "" } else { "(?i)" };
        let mut keys = Vec::new();
        let mut validators = Vec::new();
        for token in &tokens {
            if let Token::Capture(key) = token {
                keys.push(key.name.clone());
                let validator = Regex::new(&format!("{flags}^(?:{})$", key.pattern))
                    .map_err(|e| compile_error(e.to_string()))?;
                validators.push(validator);
            }
        }

        Ok(Self {
            source: source.to_string(),
            tokens: Some(tokens),
            keys,
            validators,
            regex,
        })
    }

    /// Wrap a pre-built regex, optionally anchored behind a literal prefix.
    ///
    /// Named groups in the regex become parameter names.
    pub fn from_regex(regex: &Regex, prefix: &str) -> Result<Self> {
        let regex = if prefix.is_empty() {
            regex.clone()
        } else {
            let (flags, body) = split_leading_flags(regex.as_str());
            let body = body.strip_prefix('^').unwrap_or(body);
            let source = format!("{}^{}{}", flags, regex::escape(prefix), body);
            Regex::new(&source).map_err(|e| RouterError::PatternCompile {
                pattern: source.clone(),
                reason: e.to_string(),
            })?
        };
        let keys = regex
            .capture_names()
            .skip(1)
            .map(|name| name.map(str::to_string))
            .collect();

        Ok(Self {
            source: regex.as_str().to_string(),
            tokens: None,
            keys,
            validators: Vec::new(),
            regex,
        })
    }

    #[inline]
    #[must_use]
    pub fn test(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Raw capture groups in pattern order; groups that did not participate are empty.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(path)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect(),
        )
    }

    /// Parameter names aligned with [`PathMatcher::captures`]; `None` for unnamed groups.
    #[must_use]
    pub fn keys(&self) -> &[Option<String>] {
        &self.keys
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().filter_map(|k| k.as_deref())
    }

    /// Position of a named parameter among the captures
    #[must_use]
    pub fn key_index(&self, name: &str) -> Option<usize> {
        self.keys.iter().position(|k| k.as_deref() == Some(name))
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn as_regex(&self) -> &Regex {
        &self.regex
    }

    /// Build a concrete path by substituting `params` into the pattern.
    ///
    /// Values are percent-encoded and must satisfy their parameter's pattern.
    pub fn reverse(&self, params: &UrlParams) -> Result<String> {
        let tokens = self.tokens.as_ref().ok_or_else(|| RouterError::NotReversible {
            route: self.source.clone(),
        })?;

        let mut url = String::with_capacity(self.source.len());
        let mut position = 0;

        for token in tokens {
            match token {
                Token::Text(text) => url.push_str(text),
                Token::Group {
                    prefix,
                    suffix,
                    modifier,
                } => {
                    if !modifier.is_optional() {
                        url.push_str(prefix);
                        url.push_str(suffix);
                    }
                }
                Token::Capture(key) => {
                    let value = params.lookup(position, key.name.as_deref());
                    let label = key.name.clone().unwrap_or_else(|| position.to_string());
                    let validator = &self.validators[position];
                    position += 1;

                    let Some(value) = value.filter(|v| !v.is_empty()) else {
                        if key.modifier.is_optional() {
                            continue;
                        }
                        return Err(RouterError::MissingParam {
                            route: self.source.clone(),
                            name: label,
                        });
                    };

                    let encoded = urlencoding::encode(value);
                    if !validator.is_match(&encoded) {
                        return Err(RouterError::InvalidParam {
                            route: self.source.clone(),
                            name: label,
                            value: encoded.into_owned(),
                        });
                    }
                    url.push_str(&key.prefix);
                    url.push_str(&encoded);
                    url.push_str(&key.suffix);
                }
            }
        }

        Ok(url)
    }
}

/// Split leading inline flag groups such as `(?i)` off a regex source.
fn split_leading_flags(source: &str) -> (&str, &str) {
    let mut end = 0;
    while let Some(rest) = source[end..].strip_prefix("(?") {
        let Some(close) = rest.find(')') else { break };
        let flags = &rest[..close];
        if flags.is_empty() || !flags.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
            break;
        }
        end += 2 + close + 1;
    }
    source.split_at(end)
}
