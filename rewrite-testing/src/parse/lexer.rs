//! Tokenizer that keeps every byte: each token owns the whitespace and
//! comments in front of it.

use std::path::Path;

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    IntLiteral,
    LongLiteral,
    FloatLiteral,
    DoubleLiteral,
    CharLiteral,
    StringLiteral,
    Punct,
    Eof,
}

#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub prefix: &'a str,
    /// Byte offset of `text`.
    pub offset: usize,
}

impl<'a> Token<'a> {
    pub fn is(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Punct) && self.text == text
    }
}

const KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long", "native",
    "new", "package", "private", "protected", "public", "return", "short", "static", "strictfp",
    "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try", "void",
    "volatile", "while", "true", "false", "null",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

// `>>` and `>>>` are left to the parser so that nested generics close.
const PUNCTUATION: &[&str] = &[
    "<<=", "...", "->", "::", "++", "--", "&&", "||", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "<<", "(", ")", "{", "}", "[", "]", ";", ",", ".", "@", "=", "<", ">",
    "!", "~", "?", ":", "+", "-", "*", "/", "&", "|", "^", "%",
];

pub fn tokenize<'a>(path: &Path, source: &'a str) -> Result<Vec<Token<'a>>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    loop {
        let trivia_start = pos;
        pos = skip_trivia(path, source, pos)?;
        let prefix = &source[trivia_start..pos];
        if pos >= bytes.len() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: "",
                prefix,
                offset: pos,
            });
            return Ok(tokens);
        }

        let start = pos;
        let c = bytes[pos];
        let kind = if c.is_ascii_alphabetic() || c == b'_' || c == b'$' || c >= 0x80 {
            pos = scan_identifier(source, pos);
            TokenKind::Identifier
        } else if c.is_ascii_digit() || (c == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)) {
            let (end, kind) = scan_number(bytes, pos);
            pos = end;
            kind
        } else if c == b'"' {
            pos = scan_string(path, source, pos)?;
            TokenKind::StringLiteral
        } else if c == b'\'' {
            pos = scan_quoted(path, source, pos, b'\'')?;
            TokenKind::CharLiteral
        } else if let Some(p) = PUNCTUATION.iter().find(|p| source[pos..].starts_with(**p)) {
            pos += p.len();
            TokenKind::Punct
        } else {
            return Err(ParseError::at(
                path,
                source,
                pos,
                format!("unexpected character '{}'", &source[pos..].chars().next().unwrap_or('?')),
            ));
        };

        tokens.push(Token {
            kind,
            text: &source[start..pos],
            prefix,
            offset: start,
        });
    }
}

fn skip_trivia(path: &Path, source: &str, mut pos: usize) -> Result<usize, ParseError> {
    let bytes = source.as_bytes();
    while pos < bytes.len() {
        match bytes[pos] {
            b' ' | b'\t' | b'\n' | b'\r' | 0x0c => pos += 1,
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                pos = source[pos..].find('\n').map_or(bytes.len(), |nl| pos + nl);
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => match source[pos + 2..].find("*/") {
                Some(end) => pos = pos + 2 + end + 2,
                None => return Err(ParseError::at(path, source, pos, "unterminated comment")),
            },
            _ => break,
        }
    }
    Ok(pos)
}

fn scan_identifier(source: &str, start: usize) -> usize {
    source[start..]
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '$'))
        .map_or(source.len(), |(i, _)| start + i)
}

fn scan_number(bytes: &[u8], start: usize) -> (usize, TokenKind) {
    let mut pos = start;
    let mut floating = false;
    if bytes[pos] == b'0' && matches!(bytes.get(pos + 1), Some(b'x' | b'X' | b'b' | b'B')) {
        pos += 2;
        while pos < bytes.len() && (bytes[pos].is_ascii_hexdigit() || bytes[pos] == b'_') {
            pos += 1;
        }
    } else {
        while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'_') {
            pos += 1;
        }
        let fraction_follows = bytes
            .get(pos + 1)
            .map_or(true, |b| !b.is_ascii_alphabetic() || matches!(b, b'e' | b'E' | b'd' | b'D' | b'f' | b'F'));
        if bytes.get(pos) == Some(&b'.') && fraction_follows {
            floating = true;
            pos += 1;
            while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'_') {
                pos += 1;
            }
        }
        if matches!(bytes.get(pos), Some(b'e' | b'E')) {
            floating = true;
            pos += 1;
            if matches!(bytes.get(pos), Some(b'+' | b'-')) {
                pos += 1;
            }
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }
    let kind = match bytes.get(pos) {
        Some(b'l' | b'L') => {
            pos += 1;
            TokenKind::LongLiteral
        }
        Some(b'f' | b'F') => {
            pos += 1;
            TokenKind::FloatLiteral
        }
        Some(b'd' | b'D') => {
            pos += 1;
            TokenKind::DoubleLiteral
        }
        _ if floating => TokenKind::DoubleLiteral,
        _ => TokenKind::IntLiteral,
    };
    (pos, kind)
}

fn scan_string(path: &Path, source: &str, start: usize) -> Result<usize, ParseError> {
    if source[start..].starts_with("\"\"\"") {
        return match source[start + 3..].find("\"\"\"") {
            Some(end) => Ok(start + 3 + end + 3),
            None => Err(ParseError::at(path, source, start, "unterminated text block")),
        };
    }
    scan_quoted(path, source, start, b'"')
}

fn scan_quoted(path: &Path, source: &str, start: usize, quote: u8) -> Result<usize, ParseError> {
    let bytes = source.as_bytes();
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'\n' => break,
            b if b == quote => return Ok(pos + 1),
            _ => pos += 1,
        }
    }
    Err(ParseError::at(path, source, start, "unterminated literal"))
}

/// Decode the escapes of a string or char literal body.
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('s') => out.push(' '),
            Some('0'..='7') => out.push('\0'),
            Some('u') => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                if let Some(decoded) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(decoded);
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, &str)> {
        tokenize(Path::new("T.java"), source)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn tokens_keep_their_leading_trivia() {
        let source = "  // lead\n  int /* x */ a = 1;\n";
        let tokens = tokenize(Path::new("T.java"), source).unwrap();
        assert_eq!(tokens[0].prefix, "  // lead\n  ");
        assert_eq!(tokens[1].prefix, " /* x */ ");
        let rebuilt: String = tokens.iter().map(|t| format!("{}{}", t.prefix, t.text)).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn numbers_get_their_literal_kind() {
        assert_eq!(
            kinds("1 2L 3.0 4f .5 1e3 0x1F"),
            vec![
                (TokenKind::IntLiteral, "1"),
                (TokenKind::LongLiteral, "2L"),
                (TokenKind::DoubleLiteral, "3.0"),
                (TokenKind::FloatLiteral, "4f"),
                (TokenKind::DoubleLiteral, ".5"),
                (TokenKind::DoubleLiteral, "1e3"),
                (TokenKind::IntLiteral, "0x1F"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn closing_generics_stay_split() {
        let tokens = kinds("List<List<String>> x");
        let closers: Vec<_> = tokens.iter().filter(|(_, t)| *t == ">").collect();
        assert_eq!(closers.len(), 2);
    }

    #[test]
    fn strings_and_escapes() {
        let tokens = kinds(r#""a\"b" 'c'"#);
        assert_eq!(tokens[0], (TokenKind::StringLiteral, r#""a\"b""#));
        assert_eq!(tokens[1], (TokenKind::CharLiteral, "'c'"));
        assert_eq!(unescape(r#"a\"b\n"#), "a\"b\n");
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let err = tokenize(Path::new("T.java"), "class A {} /* open").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("unterminated comment"));
    }
}
