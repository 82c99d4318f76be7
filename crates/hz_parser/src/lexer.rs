use thiserror::Error;
use tracing::trace;

use crate::token::{Literal, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("Unexpected character.")]
    UnexpectedCharacter(char),
    #[error("Unterminated string.")]
    UnterminatedString,
    #[error("Unterminated block comment.")]
    UnterminatedBlockComment,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] Error: {kind}")]
pub struct LexError {
    pub line: usize,
    pub kind: LexErrorKind,
}

type LexResult<T> = Result<T, LexError>;

pub struct Lexer<'a> {
    source: &'a str,
    /// Byte offset where the current lexeme starts
    start: usize,
    /// Byte offset of the next unread character
    current: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer {
            source,
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scan the whole source.
    ///
    /// Never fails: errors are collected next to the tokens and scanning resumes after the
    /// offending input. The token list always ends with an `Eof` token.
    pub fn scan_tokens(mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        loop {
            match self.next_token() {
                Ok(token) => {
                    let at_end = token.is(TokenKind::Eof);
                    tokens.push(token);
                    if at_end {
                        break;
                    }
                }
                Err(error) => errors.push(error),
            }
        }

        trace!(tokens = tokens.len(), errors = errors.len(), "scanned source");
        (tokens, errors)
    }

    /// Consume the next character from the source.
    fn read_char(&mut self) -> Option<char> {
        let next = self.peek_char();
        if let Some(c) = next {
            self.current += c.len_utf8();
        }
        next
    }

    /// Get the next character from the source without consuming it.
    fn peek_char(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    /// Get the character after the next one without consuming anything.
    fn peek_next_char(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next()
    }

    /// Consume the next character only if it is the expected one.
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.current += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.current]
    }

    fn error(&self, kind: LexErrorKind) -> LexError {
        LexError {
            line: self.line,
            kind,
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.lexeme(), None, self.line)
    }

    /// Consume whitespace and comments until something meaningful is found.
    fn skip_trivia(&mut self) -> LexResult<()> {
        while let Some(c) = self.peek_char() {
            match c {
                ' ' | '\r' | '\t' => {
                    self.read_char();
                }
                '\n' => {
                    self.line += 1;
                    self.read_char();
                }
                '/' if self.peek_next_char() == Some('/') => {
                    // A line comment goes until the end of the line
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.read_char();
                    }
                }
                '/' if self.peek_next_char() == Some('*') => {
                    self.read_char();
                    self.read_char();
                    self.skip_block_comment()?;
                }
                _ => break,
            }
        }

        Ok(())
    }

    /// Consume a block comment body up to and including the first `*/`.
    fn skip_block_comment(&mut self) -> LexResult<()> {
        loop {
            match self.read_char() {
                Some('*') if self.peek_char() == Some('/') => {
                    self.read_char();
                    return Ok(());
                }
                Some('\n') => self.line += 1,
                Some(_) => {}
                None => return Err(self.error(LexErrorKind::UnterminatedBlockComment)),
            }
        }
    }

    /// Read the characters up to the closing quote as a string token
    fn read_string(&mut self) -> LexResult<Token> {
        loop {
            match self.read_char() {
                Some('"') => break,
                Some('\n') => self.line += 1,
                Some(_) => {}
                None => return Err(self.error(LexErrorKind::UnterminatedString)),
            }
        }

        // Trim the surrounding quotes
        let value = &self.source[self.start + 1..self.current - 1];
        Ok(Token::new(
            TokenKind::String,
            self.lexeme(),
            Some(Literal::String(value.to_owned())),
            self.line,
        ))
    }

    /// Read the current and following characters as a number token.
    fn read_number(&mut self) -> Token {
        while self.peek_char().map_or(false, is_digit) {
            self.read_char();
        }

        // A fractional part needs at least one digit after the dot
        if self.peek_char() == Some('.') && self.peek_next_char().map_or(false, is_digit) {
            self.read_char();
            while self.peek_char().map_or(false, is_digit) {
                self.read_char();
            }
        }

        // ASCII digits with an optional `.digits` fraction always parse as an f64
        let value: f64 = self.lexeme().parse().unwrap_or_default();

        Token::new(
            TokenKind::Number,
            self.lexeme(),
            Some(Literal::Number(value)),
            self.line,
        )
    }

    /// Read the current and following characters as an identifier or a keyword (if it exists).
    fn read_identifier_or_keyword(&mut self) -> Token {
        while self.peek_char().map_or(false, is_identifier_char) {
            self.read_char();
        }

        let kind = TokenKind::lookup_keyword(self.lexeme()).unwrap_or(TokenKind::Identifier);
        self.make_token(kind)
    }

    /// Read a new token from the source.
    pub fn next_token(&mut self) -> LexResult<Token> {
        self.skip_trivia()?;

        self.start = self.current;

        let c = match self.read_char() {
            Some(c) => c,
            None => return Ok(Token::eof(self.line)),
        };

        let kind = match c {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '-' => TokenKind::Minus,
            '+' => TokenKind::Plus,
            ';' => TokenKind::Semicolon,
            '/' => TokenKind::Slash,
            '*' => TokenKind::Star,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,

            '!' if self.match_char('=') => TokenKind::BangEqual,
            '!' => TokenKind::Bang,
            '=' if self.match_char('=') => TokenKind::EqualEqual,
            '=' => TokenKind::Equal,
            '<' if self.match_char('=') => TokenKind::LessEqual,
            '<' => TokenKind::Less,
            '>' if self.match_char('=') => TokenKind::GreaterEqual,
            '>' => TokenKind::Greater,

            '"' => return self.read_string(),
            c if is_digit(c) => return Ok(self.read_number()),
            c if is_identifier_start(c) => return Ok(self.read_identifier_or_keyword()),

            c => return Err(self.error(LexErrorKind::UnexpectedCharacter(c))),
        };

        Ok(self.make_token(kind))
    }
}

/// Whether or not the given character is a digit
fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

/// Whether or not the given character can begin an identifier
fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Whether or not the given character is valid in an identifier
fn is_identifier_char(c: char) -> bool {
    is_identifier_start(c) || is_digit(c)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::lexer::{LexError, LexErrorKind, Lexer};
    use crate::token::{Literal, TokenKind};

    fn kinds(input: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::new(input).scan_tokens();
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_operators() {
        use TokenKind::*;

        assert_eq!(
            kinds("+-*/=! ==!=<><=>= ?:"),
            vec![
                Plus,
                Minus,
                Star,
                Slash,
                Equal,
                Bang,
                EqualEqual,
                BangEqual,
                Less,
                Greater,
                LessEqual,
                GreaterEqual,
                Question,
                Colon,
                Eof
            ]
        );
    }

    #[test]
    fn test_delimiters() {
        use TokenKind::*;

        assert_eq!(
            kinds(",.;(){}"),
            vec![Comma, Dot, Semicolon, LeftParen, RightParen, LeftBrace, RightBrace, Eof]
        );
    }

    #[test]
    fn test_single_lexemes() {
        let cases = vec![
            ("(", TokenKind::LeftParen),
            ("!=", TokenKind::BangEqual),
            (">=", TokenKind::GreaterEqual),
            ("foo", TokenKind::Identifier),
            ("\"foo\"", TokenKind::String),
            ("12.5", TokenKind::Number),
            ("and", TokenKind::And),
            ("class", TokenKind::Class),
            ("this", TokenKind::This),
            ("super", TokenKind::Super),
        ];

        for (input, expected) in cases {
            assert_eq!(kinds(input), vec![expected, TokenKind::Eof], "input: {}", input);
        }
    }

    #[test]
    fn test_identifier() {
        let (tokens, _) = Lexer::new("hello _world hello_world_2").scan_tokens();
        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["hello", "_world", "hello_world_2", ""]);
        assert!(tokens[..3].iter().all(|t| t.is(TokenKind::Identifier)));
    }

    #[test]
    fn test_keywords() {
        use TokenKind::*;

        assert_eq!(
            kinds("and class else false fun for if nil or print return super this true var while"),
            vec![
                And, Class, Else, False, Fun, For, If, Nil, Or, Print, Return, Super, This, True,
                Var, While, Eof
            ]
        );
    }

    #[test]
    fn test_number() {
        let (tokens, _) = Lexer::new("123 45.67").scan_tokens();
        assert_eq!(tokens[0].literal, Some(Literal::Number(123.0)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(45.67)));
    }

    #[test]
    fn test_number_without_fraction_digits() {
        // `1.` is a number followed by a dot, not a number with an empty fraction
        let (tokens, _) = Lexer::new("1.").scan_tokens();
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[0].literal, Some(Literal::Number(1.0)));
        assert_eq!(tokens[1].kind, TokenKind::Dot);
    }

    #[test]
    fn test_string() {
        let (tokens, errors) = Lexer::new("\"foo bar\"").scan_tokens();
        assert!(errors.is_empty());
        assert_eq!(tokens[0].lexeme, "\"foo bar\"");
        assert_eq!(tokens[0].literal, Some(Literal::String("foo bar".to_string())));
    }

    #[test]
    fn test_multiline_string() {
        let (tokens, _) = Lexer::new("\"a\nb\" x").scan_tokens();
        assert_eq!(tokens[0].literal, Some(Literal::String("a\nb".to_string())));
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_unterminated_string() {
        let (tokens, errors) = Lexer::new("1 \"not closed").scan_tokens();
        assert_eq!(
            errors,
            vec![LexError {
                line: 1,
                kind: LexErrorKind::UnterminatedString
            }]
        );
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Number, TokenKind::Eof]);
    }

    #[test]
    fn test_unexpected_character_continues() {
        let (tokens, errors) = Lexer::new("1 @ 2 # 3").scan_tokens();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, LexErrorKind::UnexpectedCharacter('@'));
        assert_eq!(errors[0].to_string(), "[line 1] Error: Unexpected character.");
        let numbers: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(numbers, vec!["1", "2", "3", ""]);
    }

    #[test]
    fn test_line_comment() {
        let (tokens, _) = Lexer::new("// comment\n42").scan_tokens();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].literal, Some(Literal::Number(42.0)));
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_block_comment() {
        let (tokens, errors) = Lexer::new("/* a\nb */ 1").scan_tokens();
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].literal, Some(Literal::Number(1.0)));
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let (tokens, errors) = Lexer::new("1 /* never\nclosed").scan_tokens();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, LexErrorKind::UnterminatedBlockComment);
        assert_eq!(errors[0].line, 2);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn test_slash_is_not_a_comment() {
        use TokenKind::*;
        assert_eq!(kinds("4 / 2"), vec![Number, Slash, Number, Eof]);
    }

    #[test]
    fn test_eof() {
        let (tokens, _) = Lexer::new("").scan_tokens();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert_eq!(tokens[0].lexeme, "");
    }

    #[test]
    fn test_eof_line() {
        let (tokens, _) = Lexer::new("a\n\nb\n").scan_tokens();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 3);
        assert_eq!(tokens[2].line, 4);
    }
}
