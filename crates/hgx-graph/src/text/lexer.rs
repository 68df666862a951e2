use std::ops::Range;

use hgx_core::HgError;
use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")]
pub(crate) enum Token<'src> {
    #[token("<-")]
    Arrow,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("START")]
    Start,

    #[token("FINAL")]
    Final,

    #[regex(r"[0-9]+", |lex| lex.slice())]
    Int(&'src str),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    #[regex(r"'([^'\\]|\\.)*'", |lex| lex.slice())]
    Quoted(&'src str),

    #[regex(r"<[^<>\s]+>", |lex| lex.slice())]
    Special(&'src str),

    #[regex(r"[A-Za-z_][A-Za-z0-9_\-\.]*", |lex| lex.slice())]
    Ident(&'src str),
}

/// Tokenizes the part of a line before its weight.
pub(crate) fn tokenize(input: &str) -> Result<Vec<(Token<'_>, Range<usize>)>, HgError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(HgError::file_format(
                    "unexpected-character",
                    format!("unexpected input {:?}", &input[span.clone()]),
                )
                .with_context("column", span.start + 1));
            }
        }
    }
    Ok(tokens)
}

/// Splits a line at the first `/` outside quotes.
pub(crate) fn split_weight(line: &str) -> (&str, Option<&str>) {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (pos, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (Some(_), '\\') => escaped = true,
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '/') => return (&line[..pos], Some(&line[pos + 1..])),
            (None, _) => {}
        }
    }
    (line, None)
}

/// Strips the quotes of a quoted token and resolves backslash escapes.
pub(crate) fn unquote(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Quotes a terminal so that [`unquote`] gives it back.
pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}
