//! XPath-subset node selection over a `scraper` DOM
//!
//! Supported syntax:
//! - absolute (`/html/body`, `//div`) and relative (`div/p`, `./p`, `.//a`) paths
//! - `.`, `..`, `*` and element names (matched case-insensitively)
//! - unions with `|`
//! - predicates: `[2]`, `[last()]`, `[@id]`, `[@class='x']`, `[@class!='x']`,
//!   `[contains(@class, 'x')]`, `[starts-with(text(), 'x')]`, `[text()='x']`,
//!   `[span]` (has child element), joined with `and`
//!
//! An absolute path evaluated from a node still starts at the document root.
//! Results are deduplicated and returned in document order.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use scraper::{ElementRef, Html};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{0}' at {1}")]
    UnexpectedChar(char, usize),
    #[error("unterminated string literal")]
    UnterminatedLiteral,
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unsupported function '{0}'")]
    UnsupportedFunction(String),
    #[error("position predicates start at 1")]
    ZeroPosition,
}

/// A compiled path expression.
#[derive(Debug, Clone)]
pub struct NodePath {
    source: String,
    paths: Vec<LocationPath>,
}

#[derive(Debug, Clone, PartialEq)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    /// `//name`: any descendant of the context node, excluding itself.
    Descendant,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Any,
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Position(usize),
    Last,
    All(Vec<Condition>),
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    HasAttr(String),
    AttrEq { name: String, value: String, negate: bool },
    TextEq(String),
    Contains(Operand, String),
    StartsWith(Operand, String),
    HasChild(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Attr(String),
    Text,
}

impl NodePath {
    pub fn parse(source: &str) -> Result<Self, PathError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(PathError::Empty);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let mut paths = vec![parser.location_path()?];
        while parser.eat(&Token::Pipe) {
            paths.push(parser.location_path()?);
        }
        if let Some(tok) = parser.peek() {
            return Err(PathError::UnexpectedToken(tok.to_string()));
        }
        Ok(Self {
            source: source.to_string(),
            paths,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Select from the document root.
    pub fn select<'a>(&self, html: &'a Html) -> Vec<ElementRef<'a>> {
        self.evaluate(html, Cursor::Root)
    }

    /// Select relative to `context`.
    pub fn select_from<'a>(&self, html: &'a Html, context: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.evaluate(html, Cursor::Element(context))
    }

    fn evaluate<'a>(&self, html: &'a Html, context: Cursor<'a>) -> Vec<ElementRef<'a>> {
        let mut matched = Vec::new();
        for path in &self.paths {
            let start = if path.absolute { Cursor::Root } else { context };
            let mut current = vec![start];
            for step in &path.steps {
                let mut next = Vec::new();
                for cursor in &current {
                    next.extend(step.apply(html, *cursor));
                }
                current = if current.len() > 1 {
                    in_document_order(next)
                } else {
                    next
                };
            }
            matched.extend(current);
        }
        if self.paths.len() > 1 {
            matched = in_document_order(matched);
        }
        matched
            .into_iter()
            .filter_map(|cursor| match cursor {
                Cursor::Element(el) => Some(el),
                Cursor::Root => None,
            })
            .collect()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, Copy)]
enum Cursor<'a> {
    Root,
    Element(ElementRef<'a>),
}

impl Step {
    fn apply<'a>(&self, html: &'a Html, cursor: Cursor<'a>) -> Vec<Cursor<'a>> {
        let root_element = html.root_element();
        let candidates: Vec<Cursor<'a>> = match (self.axis, cursor) {
            (Axis::SelfNode, c) => vec![c],
            (Axis::Parent, Cursor::Root) => Vec::new(),
            (Axis::Parent, Cursor::Element(el)) => vec![el
                .parent()
                .and_then(ElementRef::wrap)
                .map_or(Cursor::Root, Cursor::Element)],
            (Axis::Child, Cursor::Root) => vec![Cursor::Element(root_element)],
            (Axis::Child, Cursor::Element(el)) => el
                .children()
                .filter_map(ElementRef::wrap)
                .map(Cursor::Element)
                .collect(),
            // `//x[n]` counts positions among siblings, not across the page.
            (Axis::Descendant, Cursor::Root) => {
                let elements = root_element.descendants().filter_map(ElementRef::wrap);
                return self.select_per_parent(elements);
            }
            (Axis::Descendant, Cursor::Element(el)) => {
                let elements = el.descendants().skip(1).filter_map(ElementRef::wrap);
                return self.select_per_parent(elements);
            }
        };

        let selected = candidates
            .into_iter()
            .filter(|c| self.test.matches(*c, self.axis))
            .collect();
        self.apply_predicates(selected)
    }

    /// Evaluate a `//` step as `descendant-or-self::node()/child::x`:
    /// predicates run once per group of matching siblings. `elements` must be
    /// in document order, and so is the result.
    fn select_per_parent<'a>(
        &self,
        elements: impl Iterator<Item = ElementRef<'a>>,
    ) -> Vec<Cursor<'a>> {
        let matching: Vec<ElementRef<'a>> = elements
            .filter(|el| self.test.matches(Cursor::Element(*el), self.axis))
            .collect();
        if self.predicates.is_empty() {
            return matching.into_iter().map(Cursor::Element).collect();
        }

        let mut siblings: HashMap<_, Vec<Cursor<'a>>> = HashMap::new();
        for el in &matching {
            siblings
                .entry(el.parent().map(|p| p.id()))
                .or_default()
                .push(Cursor::Element(*el));
        }
        let kept: HashSet<_> = siblings
            .into_values()
            .flat_map(|group| self.apply_predicates(group))
            .filter_map(|c| match c {
                Cursor::Element(el) => Some(el.id()),
                Cursor::Root => None,
            })
            .collect();

        matching
            .into_iter()
            .filter(|el| kept.contains(&el.id()))
            .map(Cursor::Element)
            .collect()
    }

    fn apply_predicates<'a>(&self, mut selected: Vec<Cursor<'a>>) -> Vec<Cursor<'a>> {
        for predicate in &self.predicates {
            selected = match predicate {
                Predicate::Position(n) => selected.get(n - 1).copied().into_iter().collect(),
                Predicate::Last => selected.last().copied().into_iter().collect(),
                Predicate::All(conditions) => selected
                    .into_iter()
                    .filter(|c| match c {
                        Cursor::Element(el) => conditions.iter().all(|cond| cond.holds(*el)),
                        Cursor::Root => false,
                    })
                    .collect(),
            };
        }
        selected
    }
}

impl NodeTest {
    fn matches(&self, cursor: Cursor<'_>, axis: Axis) -> bool {
        match cursor {
            // `.` and `..` may land on the document node itself.
            Cursor::Root => matches!(axis, Axis::SelfNode | Axis::Parent),
            Cursor::Element(el) => match self {
                NodeTest::Any => true,
                NodeTest::Name(name) => el.value().name().eq_ignore_ascii_case(name),
            },
        }
    }
}

impl Condition {
    fn holds(&self, el: ElementRef<'_>) -> bool {
        match self {
            Condition::HasAttr(name) => el.value().attr(name).is_some(),
            Condition::AttrEq { name, value, negate } => {
                let equal = el.value().attr(name) == Some(value.as_str());
                equal != *negate
            }
            Condition::TextEq(value) => el.text().collect::<String>() == *value,
            Condition::Contains(operand, needle) => operand
                .value(el)
                .is_some_and(|v| v.contains(needle.as_str())),
            Condition::StartsWith(operand, prefix) => operand
                .value(el)
                .is_some_and(|v| v.starts_with(prefix.as_str())),
            Condition::HasChild(name) => el
                .children()
                .filter_map(ElementRef::wrap)
                .any(|child| child.value().name().eq_ignore_ascii_case(name)),
        }
    }
}

impl Operand {
    fn value(&self, el: ElementRef<'_>) -> Option<String> {
        match self {
            Operand::Attr(name) => el.value().attr(name).map(String::from),
            Operand::Text => Some(el.text().collect()),
        }
    }
}

fn in_document_order(cursors: Vec<Cursor<'_>>) -> Vec<Cursor<'_>> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Cursor<'_>> = cursors
        .into_iter()
        .filter(|c| {
            seen.insert(match c {
                Cursor::Root => None,
                Cursor::Element(el) => Some(el.id()),
            })
        })
        .collect();
    unique.sort_by(|a, b| document_cmp(*a, *b));
    unique
}

/// Compare two nodes by position in a preorder walk, using their ancestor
/// chains only.
fn document_cmp(a: Cursor<'_>, b: Cursor<'_>) -> Ordering {
    let (a, b) = match (a, b) {
        (Cursor::Root, Cursor::Root) => return Ordering::Equal,
        (Cursor::Root, _) => return Ordering::Less,
        (_, Cursor::Root) => return Ordering::Greater,
        (Cursor::Element(a), Cursor::Element(b)) => (*a, *b),
    };
    if a.id() == b.id() {
        return Ordering::Equal;
    }

    let mut chain_a: Vec<_> = a.ancestors().collect();
    chain_a.reverse();
    chain_a.push(a);
    let mut chain_b: Vec<_> = b.ancestors().collect();
    chain_b.reverse();
    chain_b.push(b);

    for (x, y) in chain_a.iter().zip(&chain_b) {
        if x.id() != y.id() {
            // First divergence: x and y are siblings.
            return if x.next_siblings().any(|s| s.id() == y.id()) {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
    }
    // One is an ancestor of the other.
    chain_a.len().cmp(&chain_b.len())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    Star,
    At,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Eq,
    NotEq,
    Pipe,
    Name(String),
    Number(usize),
    Literal(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Slash => f.write_str("'/'"),
            Token::DoubleSlash => f.write_str("'//'"),
            Token::Dot => f.write_str("'.'"),
            Token::DotDot => f.write_str("'..'"),
            Token::Star => f.write_str("'*'"),
            Token::At => f.write_str("'@'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::Eq => f.write_str("'='"),
            Token::NotEq => f.write_str("'!='"),
            Token::Pipe => f.write_str("'|'"),
            Token::Name(n) => write!(f, "name '{n}'"),
            Token::Number(n) => write!(f, "number {n}"),
            Token::Literal(s) => write!(f, "literal '{s}'"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, PathError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '/' if next == Some('/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '.' if next == Some('.') => {
                tokens.push(Token::DotDot);
                i += 2;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::NotEq);
                i += 2;
            }
            '*' | '@' | '[' | ']' | '(' | ')' | ',' | '=' | '|' => {
                tokens.push(match c {
                    '*' => Token::Star,
                    '@' => Token::At,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    '=' => Token::Eq,
                    _ => Token::Pipe,
                });
                i += 1;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or(PathError::UnterminatedLiteral)?;
                tokens.push(Token::Literal(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            c if c.is_ascii_digit() => {
                let len = chars[i..].iter().take_while(|ch| ch.is_ascii_digit()).count();
                let digits: String = chars[i..i + len].iter().collect();
                let n = digits
                    .parse()
                    .map_err(|_| PathError::UnexpectedToken(digits.clone()))?;
                tokens.push(Token::Number(n));
                i += len;
            }
            c if c.is_alphabetic() || c == '_' => {
                let len = chars[i..]
                    .iter()
                    .take_while(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | ':'))
                    .count();
                tokens.push(Token::Name(chars[i..i + len].iter().collect()));
                i += len;
            }
            other => return Err(PathError::UnexpectedChar(other, i)),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Result<Token, PathError> {
        let tok = self.tokens.get(self.pos).cloned().ok_or(PathError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(tok)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), PathError> {
        match self.next()? {
            tok if tok == expected => Ok(()),
            tok => Err(PathError::UnexpectedToken(tok.to_string())),
        }
    }

    fn location_path(&mut self) -> Result<LocationPath, PathError> {
        let mut steps = Vec::new();
        let (absolute, mut axis) = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                (true, Axis::Child)
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                (true, Axis::Descendant)
            }
            _ => (false, Axis::Child),
        };

        // A lone "/" selects the document node.
        if absolute && axis == Axis::Child && matches!(self.peek(), None | Some(Token::Pipe)) {
            return Ok(LocationPath { absolute, steps });
        }

        loop {
            steps.push(self.step(axis)?);
            axis = match self.peek() {
                Some(Token::Slash) => Axis::Child,
                Some(Token::DoubleSlash) => Axis::Descendant,
                _ => break,
            };
            self.pos += 1;
        }
        Ok(LocationPath { absolute, steps })
    }

    fn step(&mut self, axis: Axis) -> Result<Step, PathError> {
        let (axis, test) = match self.next()? {
            // `//.` and `//..` are uncommon enough to treat like `/.` and `/..`.
            Token::Dot => (Axis::SelfNode, NodeTest::Any),
            Token::DotDot => (Axis::Parent, NodeTest::Any),
            Token::Star => (axis, NodeTest::Any),
            Token::Name(name) => {
                if self.peek() == Some(&Token::LParen) {
                    return Err(PathError::UnsupportedFunction(name));
                }
                (axis, NodeTest::Name(name))
            }
            tok => return Err(PathError::UnexpectedToken(tok.to_string())),
        };

        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.predicate()?);
            self.expect(Token::RBracket)?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn predicate(&mut self) -> Result<Predicate, PathError> {
        match self.peek() {
            Some(Token::Number(n)) => {
                let n = *n;
                self.pos += 1;
                if n == 0 {
                    return Err(PathError::ZeroPosition);
                }
                return Ok(Predicate::Position(n));
            }
            Some(Token::Name(name))
                if name == "last" && self.peek_at(1) == Some(&Token::LParen) =>
            {
                self.pos += 1;
                self.expect(Token::LParen)?;
                self.expect(Token::RParen)?;
                return Ok(Predicate::Last);
            }
            _ => {}
        }

        let mut conditions = vec![self.condition()?];
        while matches!(self.peek(), Some(Token::Name(n)) if n == "and") {
            self.pos += 1;
            conditions.push(self.condition()?);
        }
        Ok(Predicate::All(conditions))
    }

    fn condition(&mut self) -> Result<Condition, PathError> {
        match self.next()? {
            Token::At => {
                let name = self.name()?;
                match self.peek() {
                    Some(Token::Eq) | Some(Token::NotEq) => {
                        let negate = self.next()? == Token::NotEq;
                        let value = self.literal()?;
                        Ok(Condition::AttrEq { name, value, negate })
                    }
                    _ => Ok(Condition::HasAttr(name)),
                }
            }
            Token::Name(func) if self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                match func.as_str() {
                    "text" => {
                        self.expect(Token::RParen)?;
                        self.expect(Token::Eq)?;
                        Ok(Condition::TextEq(self.literal()?))
                    }
                    "contains" | "starts-with" => {
                        let operand = self.operand()?;
                        self.expect(Token::Comma)?;
                        let value = self.literal()?;
                        self.expect(Token::RParen)?;
                        Ok(if func == "contains" {
                            Condition::Contains(operand, value)
                        } else {
                            Condition::StartsWith(operand, value)
                        })
                    }
                    _ => Err(PathError::UnsupportedFunction(func)),
                }
            }
            Token::Name(child) => Ok(Condition::HasChild(child)),
            Token::Dot => {
                self.expect(Token::Eq)?;
                Ok(Condition::TextEq(self.literal()?))
            }
            tok => Err(PathError::UnexpectedToken(tok.to_string())),
        }
    }

    fn operand(&mut self) -> Result<Operand, PathError> {
        match self.next()? {
            Token::At => Ok(Operand::Attr(self.name()?)),
            Token::Dot => Ok(Operand::Text),
            Token::Name(n) if n == "text" => {
                self.expect(Token::LParen)?;
                self.expect(Token::RParen)?;
                Ok(Operand::Text)
            }
            tok => Err(PathError::UnexpectedToken(tok.to_string())),
        }
    }

    fn name(&mut self) -> Result<String, PathError> {
        match self.next()? {
            Token::Name(n) => Ok(n),
            tok => Err(PathError::UnexpectedToken(tok.to_string())),
        }
    }

    fn literal(&mut self) -> Result<String, PathError> {
        match self.next()? {
            Token::Literal(s) => Ok(s),
            tok => Err(PathError::UnexpectedToken(tok.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html>
    <body>
        <div id="list">
            <div class="row"><a href="/a">A</a><span>1</span></div>
            <div class="row hot"><a href="/b">B</a><span>2</span></div>
            <p>note</p>
        </div>
        <div id="footer"><a href="/c">C</a></div>
    </body>
    </html>
    "#;

    fn texts(els: &[ElementRef<'_>]) -> Vec<String> {
        els.iter().map(|e| e.text().collect::<String>()).collect()
    }

    #[test]
    fn test_descendant_selection() {
        let html = Html::parse_document(PAGE);
        let links = NodePath::parse("//a").unwrap().select(&html);
        assert_eq!(texts(&links), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_absolute_child_steps() {
        let html = Html::parse_document(PAGE);
        let divs = NodePath::parse("/html/body/div").unwrap().select(&html);
        assert_eq!(divs.len(), 2);
        assert_eq!(divs[1].value().attr("id"), Some("footer"));
    }

    #[test]
    fn test_predicates() {
        let html = Html::parse_document(PAGE);

        let rows = NodePath::parse("//div[@id='list']/div").unwrap().select(&html);
        assert_eq!(rows.len(), 2);

        let hot = NodePath::parse("//div[contains(@class, 'hot')]/span").unwrap().select(&html);
        assert_eq!(texts(&hot), vec!["2"]);

        let second = NodePath::parse("//div[@id='list']/div[2]/a").unwrap().select(&html);
        assert_eq!(texts(&second), vec!["B"]);

        let last = NodePath::parse("//div[@class][last()]").unwrap().select(&html);
        assert_eq!(last[0].value().attr("class"), Some("row hot"));

        let with_span = NodePath::parse("//div[span and @class!='row']").unwrap().select(&html);
        assert_eq!(with_span.len(), 1);

        let by_text = NodePath::parse("//a[text()='C']").unwrap().select(&html);
        assert_eq!(by_text[0].value().attr("href"), Some("/c"));
    }

    #[test]
    fn test_relative_to_context() {
        let html = Html::parse_document(PAGE);
        let rows = NodePath::parse("//div[@class]").unwrap().select(&html);

        let span = NodePath::parse("span").unwrap().select_from(&html, rows[1]);
        assert_eq!(texts(&span), vec!["2"]);

        let nested = NodePath::parse(".//a").unwrap().select_from(&html, rows[0]);
        assert_eq!(texts(&nested), vec!["A"]);

        let parent = NodePath::parse("..").unwrap().select_from(&html, rows[0]);
        assert_eq!(parent[0].value().attr("id"), Some("list"));

        // Absolute paths ignore the context node.
        let all = NodePath::parse("//a").unwrap().select_from(&html, rows[0]);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_union_in_document_order() {
        let html = Html::parse_document(PAGE);
        let els = NodePath::parse("//p | //span").unwrap().select(&html);
        assert_eq!(texts(&els), vec!["1", "2", "note"]);
    }

    #[test]
    fn test_descendant_dedupes_nested_contexts() {
        let html = Html::parse_document(PAGE);
        let els = NodePath::parse("//div//a").unwrap().select(&html);
        assert_eq!(texts(&els), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_descendant_positions_count_per_parent() {
        let html = Html::parse_document(
            "<ul><li>a1</li><li>a2</li></ul><ul><li>b1</li><li>b2</li><li>b3</li></ul>",
        );

        let first = NodePath::parse("//li[1]").unwrap().select(&html);
        assert_eq!(texts(&first), vec!["a1", "b1"]);

        let last = NodePath::parse("//li[last()]").unwrap().select(&html);
        assert_eq!(texts(&last), vec!["a2", "b3"]);

        let third = NodePath::parse("//ul//li[3]").unwrap().select(&html);
        assert_eq!(texts(&third), vec!["b3"]);

        let second_list = NodePath::parse("//ul[2]/li").unwrap().select(&html);
        assert_eq!(texts(&second_list), vec!["b1", "b2", "b3"]);

        let lists = NodePath::parse("//ul").unwrap().select(&html);
        let within = NodePath::parse(".//li[2]").unwrap().select_from(&html, lists[1]);
        assert_eq!(texts(&within), vec!["b2"]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(NodePath::parse("").unwrap_err(), PathError::Empty);
        assert_eq!(NodePath::parse("//a[0]").unwrap_err(), PathError::ZeroPosition);
        assert_eq!(
            NodePath::parse("//a[@href='x").unwrap_err(),
            PathError::UnterminatedLiteral
        );
        assert!(matches!(
            NodePath::parse("//a[position()=1]"),
            Err(PathError::UnsupportedFunction(_))
        ));
        assert!(NodePath::parse("//div]").is_err());
    }
}
