//! Attribute resolution for similarity invocations.
//!
//! Link rules name the compared attributes as dot-separated paths,
//! e.g. `soundex(x.name, y.surname.label)`. The first segment is the
//! variable bound to the source or target collection; the rest is the
//! attribute label used for lookup in the cache.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::{all_consuming, recognize},
    multi::many0,
    sequence::{delimited, pair, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::error::MapperError;

/// Strip the leading variable from an attribute path.
///
/// `"x.name"` resolves to `"name"`, `"y.surname.label"` to `"surname.label"`,
/// and a path without separator resolves to itself.
pub fn resolve_property_label(path: &str) -> &str {
    match path.split_once('.') {
        Some((_, label)) => label,
        None => path,
    }
}

/// A parsed `function(term1, term2)` similarity invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityInvocation {
    pub function: String,
    pub source_term: String,
    pub target_term: String,
}

impl SimilarityInvocation {
    pub fn parse(expression: &str) -> Result<Self, MapperError> {
        match all_consuming(delimited(multispace0, parse_invocation, multispace0))(expression) {
            Ok((_, invocation)) => Ok(invocation),
            Err(err) => Err(MapperError::InvalidExpression {
                expression: expression.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

/// The pair of attribute labels compared by a mapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributePair {
    pub source: String,
    pub target: String,
}

impl AttributePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Resolve both labels from two attribute paths.
    pub fn from_paths(source_path: &str, target_path: &str) -> Self {
        Self::new(
            resolve_property_label(source_path),
            resolve_property_label(target_path),
        )
    }

    /// Parse `function(source_path, target_path)` and resolve both labels.
    pub fn from_expression(expression: &str) -> Result<(String, Self), MapperError> {
        let invocation = SimilarityInvocation::parse(expression)?;
        let pair = Self::from_paths(&invocation.source_term, &invocation.target_term);
        Ok((invocation.function, pair))
    }
}

fn parse_invocation(input: &str) -> IResult<&str, SimilarityInvocation> {
    let (input, function) = parse_identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char('(')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, source_term) = parse_term(input)?;
    let (input, _) = tuple((multispace0, char(','), multispace0))(input)?;
    let (input, target_term) = parse_term(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char(')')(input)?;

    Ok((
        input,
        SimilarityInvocation {
            function: function.to_string(),
            source_term: source_term.to_string(),
            target_term: target_term.to_string(),
        },
    ))
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// Attribute path: anything up to the next delimiter (prefixed names such as
/// `x.rdfs:label` and `|`-joined temporal pairs are allowed).
fn parse_term(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && c != ',' && c != '(' && c != ')')(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_labels_after_first_separator() {
        assert_eq!(resolve_property_label("x.name"), "name");
        assert_eq!(resolve_property_label("y.surname.label"), "surname.label");
        assert_eq!(resolve_property_label("name"), "name");
    }

    #[test]
    fn parses_invocation_with_whitespace() {
        let inv = SimilarityInvocation::parse("  soundex( x.name ,y.rdfs:label )").unwrap();
        assert_eq!(inv.function, "soundex");
        assert_eq!(inv.source_term, "x.name");
        assert_eq!(inv.target_term, "y.rdfs:label");
    }

    #[test]
    fn expression_resolves_attribute_pair() {
        let (function, pair) =
            AttributePair::from_expression("soundex(x.name, y.surname.label)").unwrap();
        assert_eq!(function, "soundex");
        assert_eq!(pair, AttributePair::new("name", "surname.label"));
    }

    #[test]
    fn rejects_malformed_expressions() {
        for bad in ["soundex(x.name)", "soundex x.name, y.name", "(x.a, y.b)", "f(a, b) extra"] {
            let err = SimilarityInvocation::parse(bad).unwrap_err();
            assert!(matches!(err, MapperError::InvalidExpression { .. }), "{bad}");
        }
    }
}
