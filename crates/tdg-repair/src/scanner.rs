//! Lexer and container state machine
//!
//! [`lex`] splits text into tokens while tracking nesting depth, string
//! state and backslash escapes. Text outside any container is kept verbatim
//! as [`Token::Text`] so repairs never touch surrounding prose.
//!
//! [`Tracker`] follows the expectations inside each open container
//! (key, colon, value, comma) and is shared by the structural repair steps.

/// Kind of an open container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// `{ ... }`
    Object,
    /// `[ ... ]`
    Array,
}

impl Container {
    /// Opening character
    #[must_use]
    pub fn open_char(self) -> char {
        match self {
            Self::Object => '{',
            Self::Array => '[',
        }
    }

    /// Closing character
    #[must_use]
    pub fn close_char(self) -> char {
        match self {
            Self::Object => '}',
            Self::Array => ']',
        }
    }
}

/// A lexical token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Container opener
    Open(Container),
    /// Container closer
    Close(Container),
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// Quoted string; `body` is the raw text between the quotes
    Str {
        /// Raw body with escapes preserved
        body: String,
        /// Quote character used
        quote: char,
        /// Whether the closing quote was seen
        terminated: bool,
    },
    /// Bare run of characters: numbers, literals, identifiers
    Word(String),
    /// Whitespace inside a container
    Space(String),
    /// Verbatim text outside every container
    Text(String),
}

impl Token {
    /// Whether this token can start a value
    #[inline]
    #[must_use]
    pub fn starts_value(&self) -> bool {
        matches!(self, Self::Open(_) | Self::Str { .. } | Self::Word(_))
    }

    /// Whether this token is insignificant for structure
    #[inline]
    #[must_use]
    pub fn is_space(&self) -> bool {
        matches!(self, Self::Space(_))
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | '[' | ']' | ':' | ',' | '"' | '\'')
}

/// Split `text` into tokens
#[must_use]
pub fn lex(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if depth == 0 {
            let start = i;
            while i < chars.len() && !matches!(chars[i], '{' | '[') {
                i += 1;
            }
            if i > start {
                tokens.push(Token::Text(chars[start..i].iter().collect()));
            }
            if i < chars.len() {
                tokens.push(Token::Open(if chars[i] == '{' {
                    Container::Object
                } else {
                    Container::Array
                }));
                depth = 1;
                i += 1;
            }
            continue;
        }

        match c {
            '{' | '[' => {
                tokens.push(Token::Open(if c == '{' {
                    Container::Object
                } else {
                    Container::Array
                }));
                depth += 1;
                i += 1;
            }
            '}' | ']' => {
                tokens.push(Token::Close(if c == '}' {
                    Container::Object
                } else {
                    Container::Array
                }));
                depth -= 1;
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '"' | '\'' => {
                let quote = c;
                let mut body = String::new();
                let mut escaped = false;
                let mut terminated = false;
                i += 1;
                while i < chars.len() {
                    let ch = chars[i];
                    i += 1;
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == quote {
                        terminated = true;
                        break;
                    }
                    body.push(ch);
                }
                tokens.push(Token::Str {
                    body,
                    quote,
                    terminated,
                });
            }
            c if c.is_whitespace() => {
                let start = i;
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                tokens.push(Token::Space(chars[start..i].iter().collect()));
            }
            _ => {
                let start = i;
                while i < chars.len() && !is_delimiter(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
        }
    }
    tokens
}

/// Join tokens back into text
#[must_use]
pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Open(c) => out.push(c.open_char()),
            Token::Close(c) => out.push(c.close_char()),
            Token::Colon => out.push(':'),
            Token::Comma => out.push(','),
            Token::Str {
                body,
                quote,
                terminated,
            } => {
                out.push(*quote);
                out.push_str(body);
                if *terminated {
                    out.push(*quote);
                }
            }
            Token::Word(s) | Token::Space(s) | Token::Text(s) => out.push_str(s),
        }
    }
    out
}

/// What an open container expects next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Object key (or the closer)
    Key,
    /// `:` after a key
    Colon,
    /// A value (or, in a fresh array, the closer)
    Value,
    /// `,` or the closer
    Next,
}

/// One open container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Container kind
    pub kind: Container,
    /// Current expectation
    pub expect: Expect,
}

/// Follows container expectations over a token stream
#[derive(Debug, Default)]
pub struct Tracker {
    stack: Vec<Frame>,
}

impl Tracker {
    /// Innermost open container
    #[inline]
    #[must_use]
    pub fn top(&self) -> Option<Frame> {
        self.stack.last().copied()
    }

    /// Open containers, outermost first
    #[inline]
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.stack
    }

    /// Whether `kind` is open anywhere on the stack
    #[must_use]
    pub fn is_open(&self, kind: Container) -> bool {
        self.stack.iter().any(|f| f.kind == kind)
    }

    /// Advance the state machine past `token`
    pub fn observe(&mut self, token: &Token) {
        match token {
            Token::Open(kind) => {
                self.value_consumed();
                self.stack.push(Frame {
                    kind: *kind,
                    expect: match kind {
                        Container::Object => Expect::Key,
                        Container::Array => Expect::Value,
                    },
                });
            }
            Token::Close(_) => {
                self.stack.pop();
            }
            Token::Colon => {
                if let Some(frame) = self.stack.last_mut() {
                    if frame.expect == Expect::Colon {
                        frame.expect = Expect::Value;
                    }
                }
            }
            Token::Comma => {
                if let Some(frame) = self.stack.last_mut() {
                    frame.expect = match frame.kind {
                        Container::Object => Expect::Key,
                        Container::Array => Expect::Value,
                    };
                }
            }
            Token::Str { .. } | Token::Word(_) => {
                if let Some(frame) = self.stack.last_mut() {
                    frame.expect = match (frame.kind, frame.expect) {
                        (Container::Object, Expect::Key) => Expect::Colon,
                        _ => Expect::Next,
                    };
                }
            }
            Token::Space(_) | Token::Text(_) => {}
        }
    }

    fn value_consumed(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.expect = Expect::Next;
        }
    }
}

/// Index of the next non-space token at or after `from`
#[must_use]
pub fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !tokens[i].is_space())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lex_render_roundtrip_preserves_text() {
        let inputs = [
            r#"{"a": [1, 2, {"b": "x\"y"}], 'c': True}"#,
            "Sure! Here you go: {\"cases\": []} Thanks",
            "{\"open\": \"unterminated",
            "]] stray closers [",
        ];
        for input in inputs {
            assert_eq!(render(&lex(input)), input);
        }
    }

    #[test]
    fn test_prose_outside_containers_is_text() {
        let tokens = lex("note: {\"a\":1} bye");
        assert_eq!(tokens[0], Token::Text("note: ".into()));
        assert_eq!(tokens.last(), Some(&Token::Text(" bye".into())));
    }

    #[test]
    fn test_escaped_quotes_stay_inside_string() {
        let tokens = lex(r#"["a\"b", 'it\'s']"#);
        assert_eq!(
            tokens[1],
            Token::Str {
                body: r#"a\"b"#.into(),
                quote: '"',
                terminated: true
            }
        );
        assert_eq!(
            tokens[4],
            Token::Str {
                body: r"it\'s".into(),
                quote: '\'',
                terminated: true
            }
        );
    }

    #[test]
    fn test_unterminated_string_flagged() {
        let tokens = lex("[\"abc");
        assert_eq!(
            tokens[1],
            Token::Str {
                body: "abc".into(),
                quote: '"',
                terminated: false
            }
        );
    }

    #[test]
    fn test_tracker_expectations() {
        let mut tracker = Tracker::default();
        let tokens = lex(r#"{"k": [1"#);
        for t in &tokens {
            tracker.observe(t);
        }
        let frames = tracker.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].kind, Container::Object);
        assert_eq!(frames[0].expect, Expect::Next);
        assert_eq!(frames[1].expect, Expect::Next);

        let mut tracker = Tracker::default();
        for t in &lex(r#"{"k""#) {
            tracker.observe(t);
        }
        assert_eq!(tracker.top().map(|f| f.expect), Some(Expect::Colon));
    }
}
