//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Parse constraint-set source into an AST
pub fn parse(input: &str) -> Result<Document, Vec<crate::ParseError>> {
    let len = input.len();

    // Create a logos lexer and convert to token stream
    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Document, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    // Basic token parsers
    let identifier = select! {
        Token::Ident(s) => Identifier::new(s),
    }
    .map_with(|id, e| Spanned::new(id, span_range(&e.span())));

    let string_literal = select! {
        Token::String(s) => s,
    };

    let number = select! {
        Token::Number(n) => n,
    };

    let signed_number = just(Token::Minus)
        .or_not()
        .then(number.clone())
        .map(|(minus, n)| if minus.is_some() { -n } else { n });

    // `+ 16` or `- 4` after an anchor reference
    let margin = choice((just(Token::Plus).to(1.0), just(Token::Minus).to(-1.0)))
        .then(number)
        .map(|(sign, n)| sign * n);

    let anchor_value = identifier
        .clone()
        .then_ignore(just(Token::Dot))
        .then(identifier.clone())
        .then(margin.or_not())
        .then(just(Token::Gone).ignore_then(signed_number.clone()).or_not())
        .map(|(((target, anchor), margin), gone_margin)| {
            Value::Anchor(AnchorValue {
                target,
                anchor,
                margin: margin.unwrap_or(0.0),
                gone_margin,
            })
        });

    let value = choice((
        anchor_value,
        signed_number.map(Value::Number),
        string_literal.map(Value::String),
        just(Token::True).to(Value::Bool(true)),
        just(Token::False).to(Value::Bool(false)),
        // `gone` doubles as a visibility value
        just(Token::Gone).to(Value::Word("gone".to_string())),
        identifier.clone().map(|id| Value::Word(id.node.0)),
    ))
    .map_with(|value, e| Spanned::new(value, span_range(&e.span())));

    let key = identifier
        .clone()
        .separated_by(just(Token::Dot))
        .at_least(1)
        .collect::<Vec<_>>()
        .map_with(|parts, e| {
            let key = parts
                .iter()
                .map(|p| p.node.as_str())
                .collect::<Vec<_>>()
                .join(".");
            Spanned::new(key, span_range(&e.span()))
        });

    let property = key
        .then_ignore(just(Token::Colon))
        .then(value)
        .map_with(|(key, value), e| Spanned::new(Property { key, value }, span_range(&e.span())))
        .then_ignore(just(Token::Comma).or_not());

    let properties = property
        .repeated()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::BraceOpen), just(Token::BraceClose));

    // `guideline(vertical)`, `barrier(end)`, `group`
    let role = identifier
        .clone()
        .then(
            identifier
                .clone()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
                .or_not(),
        )
        .map_with(|(kind, arg), e| Spanned::new(RoleDecl { kind, arg }, span_range(&e.span())));

    let entry = identifier
        .clone()
        .then(just(Token::Colon).ignore_then(role).or_not())
        .then(properties)
        .map_with(|((id, role), properties), e| {
            Spanned::new(EntryDecl { id, role, properties }, span_range(&e.span()))
        });

    let labels = identifier
        .clone()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose));

    let set_decl = just(Token::Set)
        .ignore_then(identifier)
        .then(labels.or_not())
        .then(
            entry
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::BraceOpen), just(Token::BraceClose)),
        )
        .map_with(|((name, labels), entries), e| {
            Spanned::new(
                SetDecl {
                    name,
                    labels: labels.unwrap_or_default(),
                    entries,
                },
                span_range(&e.span()),
            )
        });

    set_decl
        .repeated()
        .collect::<Vec<_>>()
        .map(|sets| Document { sets })
}
