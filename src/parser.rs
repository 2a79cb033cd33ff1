//! Expression reader.
//!
//! Reads literals, variables, binary operators with the usual precedence,
//! parenthesised groups and qualified calls (`pkg.sub:name(args)`) into
//! [`Expression`] nodes carrying their source locations.
//!
//! Precedence, loosest first: `||`, `&&`, comparisons, `+ -`, `* / %`.
//! All binary operators are left-associative.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, none_of, one_of},
    combinator::{all_consuming, cut, map, map_res, opt, recognize, value},
    error::{context, ErrorKind, VerboseError, VerboseErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use nom_locate::LocatedSpan;
use thiserror::Error;

use crate::ast::{BinaryOperator, Expression, Literal, SourceLocation};

/// Input span; `extra` is the file name.
pub type Span<'a> = LocatedSpan<&'a str, &'a str>;
pub type ParserResult<'a, T> = IResult<Span<'a>, T, VerboseError<Span<'a>>>;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    fn from_nom(err: nom::Err<VerboseError<Span<'_>>>) -> Self {
        match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                let expected = e.errors.iter().find_map(|(_, kind)| match kind {
                    VerboseErrorKind::Context(label) => Some(*label),
                    _ => None,
                });
                match e.errors.first() {
                    Some((span, kind)) => ParseError {
                        line: span.location_line(),
                        column: span.get_utf8_column(),
                        message: match expected {
                            Some(label) => format!("expected {}", label),
                            None => describe(kind),
                        },
                    },
                    None => ParseError {
                        line: 1,
                        column: 1,
                        message: "invalid expression".to_string(),
                    },
                }
            }
            nom::Err::Incomplete(_) => ParseError {
                line: 1,
                column: 1,
                message: "incomplete input".to_string(),
            },
        }
    }
}

fn describe(kind: &VerboseErrorKind) -> String {
    match kind {
        VerboseErrorKind::Char(c) => format!("expected '{}'", c),
        VerboseErrorKind::Nom(ErrorKind::Eof) => "unexpected trailing input".to_string(),
        VerboseErrorKind::Nom(kind) => format!("unexpected input ({:?})", kind),
        VerboseErrorKind::Context(label) => format!("expected {}", label),
    }
}

/// Parses a complete expression. `file` only labels locations.
pub fn parse_expression(source: &str, file: &str) -> Result<Expression, ParseError> {
    let input = Span::new_extra(source, file);
    all_consuming(expression)(input)
        .map(|(_, expr)| expr)
        .map_err(ParseError::from_nom)
}

fn location(span: &Span) -> SourceLocation {
    SourceLocation::new(
        span.extra,
        span.location_line(),
        span.get_utf8_column() as u32,
    )
}

#[tracing::instrument(level = "debug", skip(input))]
fn expression(input: Span) -> ParserResult<Expression> {
    logical_or(input)
}

fn logical_or(input: Span) -> ParserResult<Expression> {
    binary_level(input, logical_and, &[("||", BinaryOperator::Or)])
}

fn logical_and(input: Span) -> ParserResult<Expression> {
    binary_level(input, comparison, &[("&&", BinaryOperator::And)])
}

fn comparison(input: Span) -> ParserResult<Expression> {
    binary_level(
        input,
        additive,
        &[
            ("==", BinaryOperator::Equal),
            ("!=", BinaryOperator::NotEqual),
            ("<=", BinaryOperator::LessThanEqual),
            (">=", BinaryOperator::GreaterThanEqual),
            ("<", BinaryOperator::LessThan),
            (">", BinaryOperator::GreaterThan),
        ],
    )
}

fn additive(input: Span) -> ParserResult<Expression> {
    binary_level(
        input,
        multiplicative,
        &[("+", BinaryOperator::Add), ("-", BinaryOperator::Subtract)],
    )
}

fn multiplicative(input: Span) -> ParserResult<Expression> {
    binary_level(
        input,
        atom,
        &[
            ("*", BinaryOperator::Multiply),
            ("/", BinaryOperator::Divide),
            ("%", BinaryOperator::Modulo),
        ],
    )
}

fn operator_token<'a>(input: Span<'a>, symbol: &str) -> ParserResult<'a, Span<'a>> {
    tag(symbol)(input)
}

/// `operand (op operand)*`, folded to the left. Longer symbols must come
/// before their prefixes in `operators`.
fn binary_level<'a>(
    input: Span<'a>,
    operand: fn(Span<'a>) -> ParserResult<'a, Expression>,
    operators: &[(&'static str, BinaryOperator)],
) -> ParserResult<'a, Expression> {
    let (mut input, mut left) = operand(input)?;
    loop {
        let Some((symbol, op)) = operators
            .iter()
            .find(|(symbol, _)| input.fragment().starts_with(symbol))
        else {
            return Ok((input, left));
        };
        let (rest, op_span) = operator_token(input, *symbol)?;
        let (rest, right) = cut(operand)(rest)?;
        left = Expression::binary(*op, left, right, location(&op_span));
        input = rest;
    }
}

fn atom(input: Span) -> ParserResult<Expression> {
    delimited(
        multispace0,
        context(
            "expression",
            alt((
                parenthesized,
                float_literal,
                integer_literal,
                string_literal,
                call,
                identifier_expression,
            )),
        ),
        multispace0,
    )(input)
}

fn parenthesized(input: Span) -> ParserResult<Expression> {
    delimited(
        char('('),
        expression,
        context("closing parenthesis", cut(char(')'))),
    )(input)
}

fn float_literal(input: Span) -> ParserResult<Expression> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            char('.'),
            digit1,
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: Span| {
            s.fragment()
                .parse::<f64>()
                .map(|f| Expression::Literal(Literal::Float(f)))
        },
    )(input)
}

fn integer_literal(input: Span) -> ParserResult<Expression> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: Span| {
        s.fragment()
            .parse::<i64>()
            .map(|i| Expression::Literal(Literal::Integer(i)))
    })(input)
}

fn string_literal(input: Span) -> ParserResult<Expression> {
    let escaped = preceded(
        char('\\'),
        alt((
            value('\\', char('\\')),
            value('"', char('"')),
            value('\n', char('n')),
            value('\t', char('t')),
        )),
    );
    map(
        delimited(
            char('"'),
            many0(alt((none_of("\\\""), escaped))),
            context("closing quote", cut(char('"'))),
        ),
        |chars: Vec<char>| Expression::Literal(Literal::String(chars.into_iter().collect())),
    )(input)
}

fn identifier(input: Span) -> ParserResult<Span> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// `pkg.sub:name(arg, ...)`
fn call(input: Span) -> ParserResult<Expression> {
    let start = input;
    let (input, name) = recognize(tuple((
        identifier,
        many0(pair(char('.'), identifier)),
        char(':'),
        identifier,
    )))(input)?;
    let (input, arguments) = preceded(
        multispace0,
        delimited(
            char('('),
            separated_list0(char(','), expression),
            context("closing parenthesis", cut(preceded(multispace0, char(')')))),
        ),
    )(input)?;
    Ok((
        input,
        Expression::Call {
            function: name.fragment().to_string(),
            arguments,
            location: location(&start),
        },
    ))
}

fn identifier_expression(input: Span) -> ParserResult<Expression> {
    map(identifier, |span: Span| match *span.fragment() {
        "true" => Expression::Literal(Literal::Boolean(true)),
        "false" => Expression::Literal(Literal::Boolean(false)),
        name => Expression::Variable {
            name: name.to_string(),
            location: location(&span),
        },
    })(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Prefix rendering, locations omitted.
    fn render(expr: &Expression) -> String {
        match expr {
            Expression::Literal(Literal::Integer(i)) => i.to_string(),
            Expression::Literal(Literal::Float(f)) => format!("{:?}", f),
            Expression::Literal(Literal::String(s)) => format!("{:?}", s),
            Expression::Literal(Literal::Boolean(b)) => b.to_string(),
            Expression::Variable { name, .. } => name.clone(),
            Expression::Binary {
                op, left, right, ..
            } => format!("({} {} {})", op, render(left), render(right)),
            Expression::Call {
                function,
                arguments,
                ..
            } => format!(
                "{}[{}]",
                function,
                arguments.iter().map(render).collect::<Vec<_>>().join(" ")
            ),
        }
    }

    fn parse(source: &str) -> String {
        render(&parse_expression(source, "test").unwrap())
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(parse("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(parse("10 - 4 - 3"), "(- (- 10 4) 3)");
        assert_eq!(parse("(1 + 2) * 3"), "(* (+ 1 2) 3)");
        assert_eq!(parse("a < b && c || d"), "(|| (&& (< a b) c) d)");
        assert_eq!(parse("x <= 2.5"), "(<= x 2.5)");
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("-9223372036854775808"), "-9223372036854775808");
        assert_eq!(parse("3 - -2"), "(- 3 -2)");
        assert_eq!(parse("1.5e3"), "1500.0");
        assert_eq!(parse(r#""a \"q\"""#), r#""a \"q\"""#);
        assert_eq!(parse("true != false"), "(!= true false)");
    }

    #[test]
    fn test_calls() {
        assert_eq!(
            parse(r#"lang.string:length("abc") + 1"#),
            r#"(+ lang.string:length["abc"] 1)"#
        );
        assert_eq!(
            parse("net.jms:send(broker, \"q\", \"TextMessage\", m)"),
            r#"net.jms:send[broker "q" "TextMessage" m]"#
        );
        assert_eq!(parse("lang.math:pow( )"), "lang.math:pow[]");
    }

    #[test]
    fn test_locations() {
        let expr = parse_expression("a -\n  b / c", "main.bal").unwrap();
        match &expr {
            Expression::Binary {
                location, right, ..
            } => {
                assert_eq!(location, &SourceLocation::new("main.bal", 1, 3));
                assert_eq!(
                    right.location(),
                    Some(&SourceLocation::new("main.bal", 2, 5))
                );
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_errors() {
        let err = parse_expression("1 +", "t").unwrap_err();
        assert_eq!((err.line, err.column), (1, 4));
        assert_eq!(err.message, "expected expression");

        let err = parse_expression("1 2", "t").unwrap_err();
        assert_eq!((err.line, err.column), (1, 3));
        assert_eq!(err.message, "unexpected trailing input");

        assert!(parse_expression("(1 + 2", "t").is_err());
        assert!(parse_expression("\"open", "t").is_err());
    }
}
