//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::ParseError;
use crate::fx::ast::*;
use crate::fx::lexer::{lex, Token};

/// Postfix operations folded onto an atom
#[derive(Debug, Clone)]
enum Postfix {
    Member(String, bool),
    Index(Expr),
    Call(Vec<Expr>),
}

/// Parse a single FX expression (the payload between `{{` and `}}`)
pub fn parse(input: &str) -> Result<Expr, Vec<ParseError>> {
    let len = input.len();

    let mut tokens: Vec<(Token, SimpleSpan)> = Vec::new();
    let mut lex_errors = Vec::new();
    for item in lex(input) {
        match item {
            Ok((tok, span)) => tokens.push((tok, span.into())),
            Err(span) => lex_errors.push(ParseError::Syntax {
                message: format!("Unexpected character '{}'", &input[span.clone()]),
                span,
                expected: vec![],
            }),
        }
    }
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }

    let token_stream =
        Stream::from_iter(tokens.into_iter()).map((len..len).into(), |(t, s): (_, _)| (t, s));

    expression_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn expression_parser<'a, I>() -> impl Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let ident = select! {
            Token::Ident(s) => s,
        };

        let literal = select! {
            Token::Number(n) => Literal::Number(n),
            Token::Str(s) => Literal::String(s),
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Null => Literal::Null,
            Token::Undefined => Literal::Null,
        }
        .map(Expr::Literal);

        let items = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>();

        let array = items
            .clone()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(Expr::Array);

        // Object keys may be bare names or quoted strings
        let key = ident.clone().or(select! { Token::Str(s) => s });
        let object = key
            .then_ignore(just(Token::Colon))
            .then(expr.clone())
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .map(Expr::Object);

        let atom = choice((
            literal,
            ident.clone().map(Expr::Ident),
            expr.clone()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
            array,
            object,
        ))
        .boxed();

        let postfix = choice((
            just(Token::Dot)
                .ignore_then(ident.clone())
                .map(|p| Postfix::Member(p, false)),
            just(Token::OptionalDot)
                .ignore_then(ident.clone())
                .map(|p| Postfix::Member(p, true)),
            expr.clone()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                .map(Postfix::Index),
            items
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
                .map(Postfix::Call),
        ));

        let member = atom
            .foldl(postfix.repeated(), |object, op| match op {
                Postfix::Member(property, optional) => Expr::Member {
                    object: Box::new(object),
                    property,
                    optional,
                },
                Postfix::Index(index) => Expr::Index {
                    object: Box::new(object),
                    index: Box::new(index),
                },
                Postfix::Call(args) => Expr::Call {
                    callee: Box::new(object),
                    args,
                },
            })
            .boxed();

        let unary = choice((
            just(Token::Bang).to(UnaryOp::Not),
            just(Token::Minus).to(UnaryOp::Neg),
            just(Token::Plus).to(UnaryOp::Plus),
        ))
        .repeated()
        .foldr(member, |op, expr| Expr::Unary {
            op,
            expr: Box::new(expr),
        })
        .boxed();

        let product = unary
            .clone()
            .foldl(
                choice((
                    just(Token::Star).to(BinaryOp::Mul),
                    just(Token::Slash).to(BinaryOp::Div),
                    just(Token::Percent).to(BinaryOp::Rem),
                ))
                .then(unary)
                .repeated(),
                |left, (op, right)| Expr::binary(op, left, right),
            )
            .boxed();

        let sum = product
            .clone()
            .foldl(
                choice((
                    just(Token::Plus).to(BinaryOp::Add),
                    just(Token::Minus).to(BinaryOp::Sub),
                ))
                .then(product)
                .repeated(),
                |left, (op, right)| Expr::binary(op, left, right),
            )
            .boxed();

        let comparison = sum
            .clone()
            .foldl(
                choice((
                    just(Token::LessOrEqual).to(BinaryOp::LessOrEqual),
                    just(Token::GreaterOrEqual).to(BinaryOp::GreaterOrEqual),
                    just(Token::Less).to(BinaryOp::Less),
                    just(Token::Greater).to(BinaryOp::Greater),
                ))
                .then(sum)
                .repeated(),
                |left, (op, right)| Expr::binary(op, left, right),
            )
            .boxed();

        let equality = comparison
            .clone()
            .foldl(
                choice((
                    just(Token::StrictEq).to(BinaryOp::StrictEq),
                    just(Token::StrictNotEq).to(BinaryOp::StrictNotEq),
                    just(Token::EqEq).to(BinaryOp::Eq),
                    just(Token::NotEq).to(BinaryOp::NotEq),
                ))
                .then(comparison)
                .repeated(),
                |left, (op, right)| Expr::binary(op, left, right),
            )
            .boxed();

        let and = equality
            .clone()
            .foldl(
                just(Token::AndAnd).to(BinaryOp::And).then(equality).repeated(),
                |left, (op, right)| Expr::binary(op, left, right),
            )
            .boxed();

        let or = and
            .clone()
            .foldl(
                choice((
                    just(Token::OrOr).to(BinaryOp::Or),
                    just(Token::Nullish).to(BinaryOp::Nullish),
                ))
                .then(and)
                .repeated(),
                |left, (op, right)| Expr::binary(op, left, right),
            )
            .boxed();

        or.then(
            just(Token::Question)
                .ignore_then(expr.clone())
                .then_ignore(just(Token::Colon))
                .then(expr)
                .or_not(),
        )
        .map(|(cond, branches)| match branches {
            Some((then, otherwise)) => Expr::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            None => cond,
        })
        .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(n: f64) -> Expr {
        Expr::Literal(Literal::Number(n))
    }

    fn ident(s: &str) -> Expr {
        Expr::Ident(s.to_string())
    }

    #[test]
    fn test_parse_addition() {
        let expr = parse("1 + 1").expect("Should parse");
        assert_eq!(expr, Expr::binary(BinaryOp::Add, num(1.0), num(1.0)));
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let expr = parse("1 + 2 * 3").expect("Should parse");
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Add,
                num(1.0),
                Expr::binary(BinaryOp::Mul, num(2.0), num(3.0))
            )
        );
    }

    #[test]
    fn test_left_associative_subtraction() {
        let expr = parse("5 - 2 - 1").expect("Should parse");
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Sub, num(5.0), num(2.0)),
                num(1.0)
            )
        );
    }

    #[test]
    fn test_member_chain() {
        let expr = parse("queries.users.data[0]").expect("Should parse");
        match expr {
            Expr::Index { object, index } => {
                assert_eq!(*index, num(0.0));
                assert_eq!(object.dotted_path().as_deref(), Some("queries.users.data"));
            }
            other => panic!("Expected index, got {:?}", other),
        }
    }

    #[test]
    fn test_call_with_args() {
        let expr = parse("Math.max(1, x, 3,)").expect("Should parse");
        match expr {
            Expr::Call { callee, args } => {
                assert_eq!(callee.dotted_path().as_deref(), Some("Math.max"));
                assert_eq!(args, vec![num(1.0), ident("x"), num(3.0)]);
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_ternary_nests_right() {
        let expr = parse("a ? 1 : b ? 2 : 3").expect("Should parse");
        match expr {
            Expr::Conditional { otherwise, .. } => {
                assert!(matches!(*otherwise, Expr::Conditional { .. }));
            }
            other => panic!("Expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_stack() {
        let expr = parse("!!visible").expect("Should parse");
        assert_eq!(
            expr,
            Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(Expr::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(ident("visible")),
                }),
            }
        );
    }

    #[test]
    fn test_object_and_array_literals() {
        let expr = parse(r#"{ a: [1, 2], "b c": null }"#).expect("Should parse");
        assert_eq!(
            expr,
            Expr::Object(vec![
                ("a".to_string(), Expr::Array(vec![num(1.0), num(2.0)])),
                ("b c".to_string(), Expr::Literal(Literal::Null)),
            ])
        );
    }

    #[test]
    fn test_optional_member() {
        let expr = parse("user?.name").expect("Should parse");
        assert!(matches!(expr, Expr::Member { optional: true, .. }));
    }

    #[test]
    fn test_invalid_syntax_is_error() {
        let errs = parse("invalid syntax ++").unwrap_err();
        assert!(!errs.is_empty());
    }

    #[test]
    fn test_unknown_character_is_error() {
        let errs = parse("1 # 2").unwrap_err();
        assert!(errs[0].to_string().contains("Unexpected character '#'"));
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(parse("").is_err());
    }
}
