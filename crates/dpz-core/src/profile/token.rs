//! Bracketed `[KEY]:[VALUE]` token grammar used by DEEPSOIL profile text.
//!
//! A block of profile lines is flattened with tabs and line breaks turned
//! into spaces, then the structural brackets are removed so `[THICKNESS]:[5]` reads as
//! `THICKNESS:5`. Whitespace separates tokens; the first `:` separates key
//! from value. Words without a `:` carry no token and are skipped.

const STRUCTURAL_BRACKETS: [char; 2] = ['[', ']'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub key: String,
    pub value: String,
}

impl Token {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Renders back to the bracketed form written into profile files.
    pub fn render(&self) -> String {
        format!("[{}]:[{}]", self.key, self.value)
    }
}

pub fn tokenize<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<Token> {
    let mut flattened = String::new();
    for line in lines {
        flattened.push(' ');
        flattened.push_str(line);
    }

    let stripped: String = flattened
        .chars()
        .map(|character| match character {
            '\t' | '\n' | '\r' => ' ',
            other => other,
        })
        .filter(|character| !STRUCTURAL_BRACKETS.contains(character))
        .collect();

    stripped
        .split_whitespace()
        .filter_map(|word| {
            word.split_once(':')
                .map(|(key, value)| Token::new(key, value))
        })
        .collect()
}

/// First value recorded for `key`; later duplicates are ignored.
pub fn find_value<'a>(tokens: &'a [Token], key: &str) -> Option<&'a str> {
    tokens
        .iter()
        .find(|token| token.key == key)
        .map(|token| token.value.as_str())
}

pub fn render_line<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> String {
    tokens
        .into_iter()
        .map(Token::render)
        .collect::<Vec<_>>()
        .join(" ")
}
