//! Error types for FX expression parsing

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::fx::lexer::Token;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("{message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    /// Source span of the error within the expression text
    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };

                let written = Report::build(ReportKind::Error, filename, span.start)
                    .with_message(message)
                    .with_label(
                        Label::new((filename, span.clone()))
                            .with_message(format!("{}{}", message, expected_str))
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((filename, Source::from(source)), &mut buf);
                if written.is_err() {
                    return format!("{}{}", message, expected_str);
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl<'a> From<chumsky::error::Rich<'a, Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of input".to_string(),
                };
                format!("Unexpected {}", found_str)
            }
            RichReason::Custom(msg) => msg.to_string(),
        };

        let mut expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();
        expected.sort();
        expected.dedup();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Str(s) => format!("string \"{}\"", s),
        Token::Number(n) => format!("number {}", n),
        Token::True => "'true'".to_string(),
        Token::False => "'false'".to_string(),
        Token::Null => "'null'".to_string(),
        Token::Undefined => "'undefined'".to_string(),
        Token::StrictEq => "'==='".to_string(),
        Token::StrictNotEq => "'!=='".to_string(),
        Token::EqEq => "'=='".to_string(),
        Token::NotEq => "'!='".to_string(),
        Token::LessOrEqual => "'<='".to_string(),
        Token::GreaterOrEqual => "'>='".to_string(),
        Token::Less => "'<'".to_string(),
        Token::Greater => "'>'".to_string(),
        Token::AndAnd => "'&&'".to_string(),
        Token::OrOr => "'||'".to_string(),
        Token::Nullish => "'??'".to_string(),
        Token::OptionalDot => "'?.'".to_string(),
        Token::Question => "'?'".to_string(),
        Token::Bang => "'!'".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::Percent => "'%'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::BraceOpen => "'{'".to_string(),
        Token::BraceClose => "'}'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Dot => "'.'".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::parse;

    #[test]
    fn test_unexpected_identifier_message() {
        let errs = parse("invalid syntax ++").unwrap_err();
        insta::assert_snapshot!(errs[0].to_string(), @"Unexpected identifier 'syntax'");
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let errs = parse("1 +").unwrap_err();
        assert!(errs[0].to_string().starts_with("Unexpected"));
    }

    #[test]
    fn test_span_points_at_offending_token() {
        let errs = parse("a b").unwrap_err();
        assert_eq!(errs[0].span(), &(2..3));
    }

    #[test]
    fn test_format_includes_source_name() {
        let errs = parse("1 )").unwrap_err();
        let report = errs[0].format("1 )", "visibleWhen");
        assert!(report.contains("visibleWhen"));
        assert!(report.contains("Unexpected"));
    }
}
