//! CSS selector subset used to locate containers
//!
//! Supported: type and universal selectors, `#id`, `.class`, attribute
//! selectors (`[a]`, `[a=v]`, `[a~=v]`, `[a|=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`),
//! compound selectors, descendant and child combinators, and comma lists.
//! Pseudo-classes and sibling combinators are rejected at parse time.

use crate::core::errors::{ParallelError, Result};
use crate::dom::document::{Document, ElementData, NodeId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeMatcher {
    Equals(String),
    Includes(String),
    DashMatch(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimpleSelector {
    Id(String),
    Class(String),
    Attribute {
        name: String,
        matcher: Option<AttributeMatcher>,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    /// `None` for universal or omitted type selectors
    pub tag: Option<String>,
    pub simple: Vec<SimpleSelector>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// Compound selectors joined by combinators, left to right
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComplexSelector {
    pub parts: Vec<CompoundSelector>,
    /// `combinators[i]` sits between `parts[i]` and `parts[i + 1]`
    pub combinators: Vec<Combinator>,
}

/// Parsed comma-separated selector list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self> {
        let mut selectors = Vec::new();
        for part in split_top_level(input) {
            let part = part.trim();
            if part.is_empty() {
                return Err(ParallelError::selector(input, "empty selector"));
            }
            let complex = Parser::new(part)
                .parse_complex()
                .map_err(|message| ParallelError::selector(input, message))?;
            selectors.push(complex);
        }
        Ok(Self {
            source: input.to_string(),
            selectors,
        })
    }

    /// Join several selectors into one list, like `selectors.join(",")`
    pub fn parse_all<S: AsRef<str>>(inputs: &[S]) -> Result<Self> {
        let joined = inputs
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(",");
        Self::parse(&joined)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn selectors(&self) -> &[ComplexSelector] {
        &self.selectors
    }
}

/// Split on commas that are not inside brackets or quotes
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

type ParseResult<T> = std::result::Result<T, String>;

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_complex(&mut self) -> ParseResult<ComplexSelector> {
        let mut parts = Vec::new();
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let Some(c) = self.peek() else { break };
            if !parts.is_empty() {
                match c {
                    '>' => {
                        self.bump();
                        self.skip_whitespace();
                        combinators.push(Combinator::Child);
                    }
                    '+' | '~' => return Err(format!("combinator `{}` is not supported", c)),
                    _ if had_space => combinators.push(Combinator::Descendant),
                    _ => return Err(format!("unexpected character `{}`", c)),
                }
            }
            parts.push(self.parse_compound()?);
        }
        if parts.is_empty() {
            return Err("empty selector".to_string());
        }
        Ok(ComplexSelector { parts, combinators })
    }

    fn parse_compound(&mut self) -> ParseResult<CompoundSelector> {
        let start = self.pos;
        let mut compound = CompoundSelector::default();
        match self.peek() {
            Some('*') => {
                self.bump();
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.simple.push(SimpleSelector::Id(self.parse_ident()?));
                }
                Some('.') => {
                    self.bump();
                    compound.simple.push(SimpleSelector::Class(self.parse_ident()?));
                }
                Some('[') => {
                    self.bump();
                    compound.simple.push(self.parse_attribute()?);
                }
                Some(':') => return Err("pseudo-classes are not supported".to_string()),
                _ => break,
            }
        }
        if self.pos == start {
            return Err(match self.peek() {
                Some(c) => format!("unexpected character `{}`", c),
                None => "expected a selector".to_string(),
            });
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> ParseResult<String> {
        let start = self.pos;
        while self.peek().map_or(false, is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err("expected an identifier".to_string());
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> ParseResult<SimpleSelector> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op = match self.bump() {
            Some(']') => return Ok(SimpleSelector::Attribute { name, matcher: None }),
            Some('=') => '=',
            Some(c @ ('~' | '|' | '^' | '$' | '*')) if self.peek() == Some('=') => {
                self.bump();
                c
            }
            _ => return Err(format!("malformed attribute selector for `{}`", name)),
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                while self.peek().map_or(false, |c| c != q) {
                    self.pos += 1;
                }
                if self.bump() != Some(q) {
                    return Err("unterminated string".to_string());
                }
                self.chars[start..self.pos - 1].iter().collect()
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        if self.bump() != Some(']') {
            return Err("expected `]`".to_string());
        }
        let matcher = match op {
            '=' => AttributeMatcher::Equals(value),
            '~' => AttributeMatcher::Includes(value),
            '|' => AttributeMatcher::DashMatch(value),
            '^' => AttributeMatcher::Prefix(value),
            '$' => AttributeMatcher::Suffix(value),
            _ => AttributeMatcher::Substring(value),
        };
        Ok(SimpleSelector::Attribute {
            name,
            matcher: Some(matcher),
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// Whether `node` matches any selector in the list
pub fn matches_selector(doc: &Document, node: NodeId, list: &SelectorList) -> bool {
    list.selectors
        .iter()
        .any(|selector| matches_complex(doc, node, selector, selector.parts.len() - 1))
}

fn matches_complex(doc: &Document, node: NodeId, selector: &ComplexSelector, index: usize) -> bool {
    if !matches_compound(doc, node, &selector.parts[index]) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match selector.combinators[index - 1] {
        Combinator::Child => doc
            .parent_element(node)
            .map_or(false, |parent| matches_complex(doc, parent, selector, index - 1)),
        Combinator::Descendant => {
            let mut ancestor = doc.parent_element(node);
            while let Some(candidate) = ancestor {
                if matches_complex(doc, candidate, selector, index - 1) {
                    return true;
                }
                ancestor = doc.parent_element(candidate);
            }
            false
        }
    }
}

pub fn matches_compound(doc: &Document, node: NodeId, compound: &CompoundSelector) -> bool {
    let Ok(element) = doc.element(node) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if element.tag_name != *tag {
            return false;
        }
    }
    compound.simple.iter().all(|simple| matches_simple(element, simple))
}

pub fn matches_simple(element: &ElementData, simple: &SimpleSelector) -> bool {
    match simple {
        SimpleSelector::Id(id) => element.attribute("id") == Some(id.as_str()),
        SimpleSelector::Class(class) => element.has_class(class),
        SimpleSelector::Attribute { name, matcher } => {
            let Some(value) = element.attribute(name) else {
                return false;
            };
            match matcher {
                None => true,
                Some(AttributeMatcher::Equals(v)) => value == v,
                Some(AttributeMatcher::Includes(v)) => value.split_whitespace().any(|t| t == v),
                Some(AttributeMatcher::DashMatch(v)) => {
                    value == v || value.starts_with(&format!("{}-", v))
                }
                Some(AttributeMatcher::Prefix(v)) => !v.is_empty() && value.starts_with(v.as_str()),
                Some(AttributeMatcher::Suffix(v)) => !v.is_empty() && value.ends_with(v.as_str()),
                Some(AttributeMatcher::Substring(v)) => !v.is_empty() && value.contains(v.as_str()),
            }
        }
    }
}
