//! Minimal CSS selector matching
//!
//! Supports selector lists of compound selectors built from:
//! - type selectors and `*`
//! - `.class` and `#id`
//! - `[attr]` and `[attr=value]`
//! - `:not(<simple selector>)`
//!
//! Combinators are rejected; every query issued by the optimizers targets
//! single elements. Tokenizing is done by `cssparser`.

use super::document::ElementData;
use crate::utils::{DomError, Result};
use cssparser::{BasicParseErrorKind, ParseError, ParseErrorKind, Parser, ParserInput, Token};

type ParseResult<'i, T> = std::result::Result<T, ParseError<'i, String>>;

/// Attribute presence or equality test
#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    value: Option<String>,
}

impl AttrTest {
    fn matches(&self, element: &ElementData) -> bool {
        match (&self.value, element.get_attribute(&self.name)) {
            (None, found) => found.is_some(),
            (Some(expected), Some(actual)) => expected == actual,
            (Some(_), None) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Universal,
    Tag(String),
    Class(String),
    Id(String),
    Attr(AttrTest),
}

impl Simple {
    fn matches(&self, element: &ElementData) -> bool {
        match self {
            Simple::Universal => true,
            Simple::Tag(tag) => element.tag_name.eq_ignore_ascii_case(tag),
            Simple::Class(class) => element.has_class(class),
            Simple::Id(id) => element.id() == Some(id.as_str()),
            Simple::Attr(test) => test.matches(element),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    required: Vec<Simple>,
    negated: Vec<Simple>,
}

impl Compound {
    fn matches(&self, element: &ElementData) -> bool {
        self.required.iter().all(|s| s.matches(element))
            && !self.negated.iter().any(|s| s.matches(element))
    }
}

/// A compiled selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    groups: Vec<Compound>,
}

impl Selector {
    /// Compile a selector list such as `img:not([loading]), iframe:not([loading])`
    pub fn parse(source: &str) -> Result<Self> {
        let mut input = ParserInput::new(source);
        let mut parser = Parser::new(&mut input);
        let groups = parser
            .parse_comma_separated(|p| parse_compound(p))
            .map_err(|e| DomError::selector(source, describe(e)))?;
        Ok(Self {
            source: source.to_string(),
            groups,
        })
    }

    /// Check whether an element matches any selector in the list
    pub fn matches(&self, element: &ElementData) -> bool {
        self.groups.iter().any(|g| g.matches(element))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn describe(error: ParseError<'_, String>) -> String {
    match error.kind {
        ParseErrorKind::Custom(reason) => reason,
        ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => {
            "unexpected end of selector".to_string()
        }
        ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(token)) => {
            format!("unexpected {:?}", token)
        }
        ParseErrorKind::Basic(_) => "invalid selector".to_string(),
    }
}

/// One comma-separated entry of a selector list
fn parse_compound<'i>(input: &mut Parser<'i, '_>) -> ParseResult<'i, Compound> {
    let mut compound = Compound::default();
    input.skip_whitespace();

    loop {
        let token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::WhiteSpace(_) => {
                if input.is_exhausted() {
                    break;
                }
                return Err(input.new_custom_error("combinators are not supported"));
            }
            Token::Colon => compound.negated.push(parse_negation(input)?),
            other => compound.required.push(parse_simple(input, other)?),
        }
    }

    if compound.required.is_empty() && compound.negated.is_empty() {
        return Err(input.new_custom_error("empty selector in list"));
    }
    Ok(compound)
}

/// `:not(<simple>)`, the only pseudo-class understood
fn parse_negation<'i>(input: &mut Parser<'i, '_>) -> ParseResult<'i, Simple> {
    let token = input.next_including_whitespace()?.clone();
    match token {
        Token::Function(name) if name.eq_ignore_ascii_case("not") => {
            input.parse_nested_block(|block| {
                block.skip_whitespace();
                let token = block.next_including_whitespace()?.clone();
                parse_simple(block, token)
            })
        }
        Token::Ident(name) | Token::Function(name) => {
            Err(input.new_custom_error(format!("unsupported pseudo-class `:{}`", name)))
        }
        other => Err(input.new_unexpected_token_error(other)),
    }
}

/// Simple selector starting with `token`
fn parse_simple<'i>(input: &mut Parser<'i, '_>, token: Token<'i>) -> ParseResult<'i, Simple> {
    match token {
        Token::Ident(name) => Ok(Simple::Tag(name.to_ascii_lowercase())),
        Token::Delim('*') => Ok(Simple::Universal),
        Token::Delim('.') => {
            let class = input.next_including_whitespace()?.clone();
            match class {
                Token::Ident(class) => Ok(Simple::Class(class.to_string())),
                other => Err(input.new_unexpected_token_error(other)),
            }
        }
        Token::IDHash(id) => Ok(Simple::Id(id.to_string())),
        Token::SquareBracketBlock => input
            .parse_nested_block(|block| parse_attr(block))
            .map(Simple::Attr),
        Token::Delim('>' | '+' | '~') => {
            Err(input.new_custom_error("combinators are not supported"))
        }
        other => Err(input.new_unexpected_token_error(other)),
    }
}

/// Contents of `[...]`
fn parse_attr<'i>(input: &mut Parser<'i, '_>) -> ParseResult<'i, AttrTest> {
    let name = input.expect_ident()?.to_ascii_lowercase();
    if input.is_exhausted() {
        return Ok(AttrTest { name, value: None });
    }
    let operator = input.next()?.clone();
    match operator {
        Token::Delim('=') => {
            let value = input.expect_ident_or_string()?.to_string();
            Ok(AttrTest {
                name,
                value: Some(value),
            })
        }
        _ => Err(input.new_custom_error("unsupported attribute operator")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(attrs: &[(&str, &str)]) -> ElementData {
        let mut el = ElementData::new("img");
        for (k, v) in attrs {
            el.set_attribute(*k, *v);
        }
        el
    }

    #[test]
    fn test_not_attribute() {
        let sel = Selector::parse("img:not([loading])").unwrap();
        assert!(sel.matches(&img(&[("src", "a.png")])));
        assert!(!sel.matches(&img(&[("loading", "eager")])));
        assert!(!sel.matches(&ElementData::new("iframe")));
    }

    #[test]
    fn test_selector_list() {
        let sel = Selector::parse(".animate, [data-animate], [data-animation]").unwrap();
        let mut div = ElementData::new("div");
        assert!(!sel.matches(&div));
        div.set_attribute("class", "hero animate");
        assert!(sel.matches(&div));

        let span = img(&[("data-animation", "fade")]);
        assert!(sel.matches(&span));
    }

    #[test]
    fn test_attribute_value_and_id() {
        let sel = Selector::parse("img#logo[data-eco-optimized=\"true\"]").unwrap();
        assert!(sel.matches(&img(&[("id", "logo"), ("data-eco-optimized", "true")])));
        assert!(!sel.matches(&img(&[("id", "logo"), ("data-eco-optimized", "false")])));
    }

    #[test]
    fn test_universal() {
        let sel = Selector::parse("*").unwrap();
        assert!(sel.matches(&ElementData::new("section")));
    }

    #[test]
    fn test_rejects_combinators() {
        assert!(Selector::parse("div img").is_err());
        assert!(Selector::parse("div > img").is_err());
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("img,").is_err());
        assert!(Selector::parse("[data-src=]").is_err());
        assert!(Selector::parse("[data-src~=a]").is_err());
        assert!(Selector::parse("img:hover").is_err());
        assert!(Selector::parse("img:not()").is_err());
        assert!(Selector::parse("div>img").is_err());
    }

    #[test]
    fn test_comma_inside_quoted_value() {
        let sel = Selector::parse(r#"img[data-x="a,b"]"#).unwrap();
        assert!(sel.matches(&img(&[("data-x", "a,b")])));
        assert!(!sel.matches(&img(&[("data-x", "a")])));

        let list = Selector::parse(r#"img[data-x="a,b"], iframe"#).unwrap();
        assert!(list.matches(&ElementData::new("iframe")));
    }

    #[test]
    fn test_whitespace_around_list_entries() {
        let sel = Selector::parse("  img:not( [loading] ) ,  iframe  ").unwrap();
        assert!(sel.matches(&img(&[])));
        assert!(sel.matches(&ElementData::new("iframe")));
        assert!(!sel.matches(&img(&[("loading", "lazy")])));
    }

    #[test]
    fn test_error_reason() {
        let err = Selector::parse("div img").unwrap_err();
        assert!(err.to_string().contains("combinators are not supported"), "{err}");
    }
}
