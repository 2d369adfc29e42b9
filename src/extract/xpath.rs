//! XPath subset evaluated over the `scraper` document tree
//!
//! Supported syntax:
//! - absolute (`/html/body`), descendant (`//div`) and relative paths
//! - `.`, `..`, `*` and element name steps
//! - unions with `|`
//! - predicates: `[n]`, `[last()]`, `[@a]`, `[@a='v']`, `[@a!='v']`,
//!   `[text()='v']`, `[.='v']`, `[contains(x, 'v')]`, `[starts-with(x, 'v')]`
//!   where `x` is `@a`, `text()` or `.`, combined with `and`
//!
//! Relative paths are evaluated from the document node, so `html/body` and
//! `/html/body` select the same element. Results come back in document
//! order.

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node};
use std::collections::{HashMap, HashSet};

/// A compiled XPath expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    paths: Vec<LocationPath>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LocationPath {
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    /// `//`: children of the context node or any of its descendants
    Descendant,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    /// Any node at all, used by `.` and `..`
    Node,
    /// `*`
    AnyElement,
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Last,
    All(Vec<Condition>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    HasAttribute(String),
    Equals {
        operand: Operand,
        value: String,
        negate: bool,
    },
    Contains {
        operand: Operand,
        value: String,
    },
    StartsWith {
        operand: Operand,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Attribute(String),
    /// `text()`: each direct text child
    Text,
    /// `.`: the string value of the node
    Context,
}

impl XPath {
    /// Compiles an XPath expression
    ///
    /// # Returns
    ///
    /// * `Ok(XPath)` - The expression is within the supported subset
    /// * `Err(String)` - Description of the first problem found
    pub fn parse(source: &str) -> Result<Self, String> {
        let mut cursor = Cursor::new(source);
        let mut paths = Vec::new();

        loop {
            paths.push(parse_path(&mut cursor)?);
            cursor.skip_whitespace();
            if !cursor.eat("|") {
                break;
            }
        }

        cursor.skip_whitespace();
        if !cursor.at_end() {
            return Err(format!("unexpected input at offset {}", cursor.pos));
        }

        Ok(Self { paths })
    }

    /// Selects the matching elements of a document, in document order, without duplicates
    pub fn select<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let root = document.tree.root();
        let mut found = NodeSet::default();

        for path in &self.paths {
            found.extend(path.evaluate(root));
        }

        found
            .into_document_order(root)
            .into_iter()
            .filter_map(ElementRef::wrap)
            .collect()
    }
}

impl LocationPath {
    fn evaluate<'a>(&self, root: NodeRef<'a, Node>) -> Vec<NodeRef<'a, Node>> {
        let mut context = vec![root];

        for step in &self.steps {
            let mut next = NodeSet::default();
            for node in &context {
                next.extend(step.apply(*node));
            }
            context = next.nodes;
        }

        context
    }
}

/// Insertion-ordered node set with constant-time membership
#[derive(Default)]
struct NodeSet<'a> {
    nodes: Vec<NodeRef<'a, Node>>,
    seen: HashSet<NodeId>,
}

impl<'a> NodeSet<'a> {
    fn extend(&mut self, nodes: impl IntoIterator<Item = NodeRef<'a, Node>>) {
        for node in nodes {
            if self.seen.insert(node.id()) {
                self.nodes.push(node);
            }
        }
    }

    /// Sorts the set by pre-order position under `root`
    fn into_document_order(mut self, root: NodeRef<'a, Node>) -> Vec<NodeRef<'a, Node>> {
        let position: HashMap<NodeId, usize> = root
            .descendants()
            .enumerate()
            .map(|(index, node)| (node.id(), index))
            .collect();

        self.nodes
            .sort_by_key(|node| position.get(&node.id()).copied().unwrap_or(usize::MAX));
        self.nodes
    }
}

impl Step {
    fn apply<'a>(&self, node: NodeRef<'a, Node>) -> Vec<NodeRef<'a, Node>> {
        match self.axis {
            Axis::Child => self.filter(node.children()),
            Axis::Descendant => node
                .descendants()
                .flat_map(|scope| self.filter(scope.children()))
                .collect(),
            Axis::SelfNode => self.filter(std::iter::once(node)),
            Axis::Parent => self.filter(node.parent().into_iter()),
        }
    }

    /// Applies the node test, then each predicate in turn, to one candidate group
    fn filter<'a>(
        &self,
        candidates: impl Iterator<Item = NodeRef<'a, Node>>,
    ) -> Vec<NodeRef<'a, Node>> {
        let mut matched: Vec<_> = candidates.filter(|n| self.test.matches(n)).collect();

        for predicate in &self.predicates {
            matched = predicate.filter(matched);
        }

        matched
    }
}

impl NodeTest {
    fn matches(&self, node: &NodeRef<'_, Node>) -> bool {
        match (self, node.value()) {
            (NodeTest::Node, _) => true,
            (NodeTest::AnyElement, Node::Element(_)) => true,
            (NodeTest::Name(name), Node::Element(element)) => {
                element.name().eq_ignore_ascii_case(name)
            }
            _ => false,
        }
    }
}

impl Predicate {
    fn filter<'a>(&self, nodes: Vec<NodeRef<'a, Node>>) -> Vec<NodeRef<'a, Node>> {
        match self {
            Predicate::Position(position) => nodes.get(position - 1).copied().into_iter().collect(),
            Predicate::Last => nodes.last().copied().into_iter().collect(),
            Predicate::All(conditions) => nodes
                .into_iter()
                .filter(|node| conditions.iter().all(|c| c.holds(node)))
                .collect(),
        }
    }
}

impl Condition {
    fn holds(&self, node: &NodeRef<'_, Node>) -> bool {
        match self {
            Condition::HasAttribute(name) => attribute(node, name).is_some(),
            Condition::Equals {
                operand,
                value,
                negate,
            } => operand
                .values(node)
                .iter()
                .any(|candidate| (candidate == value) != *negate),
            Condition::Contains { operand, value } => operand
                .values(node)
                .iter()
                .any(|candidate| candidate.contains(value.as_str())),
            Condition::StartsWith { operand, value } => operand
                .values(node)
                .iter()
                .any(|candidate| candidate.starts_with(value.as_str())),
        }
    }
}

impl Operand {
    fn values(&self, node: &NodeRef<'_, Node>) -> Vec<String> {
        match self {
            Operand::Attribute(name) => attribute(node, name)
                .map(|value| vec![value.to_string()])
                .unwrap_or_default(),
            Operand::Text => node
                .children()
                .filter_map(|child| match child.value() {
                    Node::Text(text) => Some(text.to_string()),
                    _ => None,
                })
                .collect(),
            Operand::Context => ElementRef::wrap(*node)
                .map(|element| vec![element.text().collect::<String>()])
                .unwrap_or_default(),
        }
    }
}

fn attribute<'a>(node: &NodeRef<'a, Node>, name: &str) -> Option<&'a str> {
    match node.value() {
        Node::Element(element) => element.attr(name),
        _ => None,
    }
}

// ===== Parsing =====

fn parse_path(cursor: &mut Cursor<'_>) -> Result<LocationPath, String> {
    cursor.skip_whitespace();

    let mut axis = if cursor.eat("//") {
        Axis::Descendant
    } else {
        cursor.eat("/");
        Axis::Child
    };

    let mut steps = Vec::new();
    loop {
        steps.push(parse_step(cursor, axis)?);
        cursor.skip_whitespace();

        if cursor.eat("//") {
            axis = Axis::Descendant;
        } else if cursor.eat("/") {
            axis = Axis::Child;
        } else {
            break;
        }
    }

    Ok(LocationPath { steps })
}

fn parse_step(cursor: &mut Cursor<'_>, axis: Axis) -> Result<Step, String> {
    cursor.skip_whitespace();

    let abbreviated = if cursor.eat("..") {
        Some(Axis::Parent)
    } else if cursor.eat(".") {
        Some(Axis::SelfNode)
    } else {
        None
    };

    if let Some(abbreviated) = abbreviated {
        if axis == Axis::Descendant {
            return Err(format!(
                "'//' cannot be followed by '.' or '..' (offset {})",
                cursor.pos
            ));
        }
        return Ok(Step {
            axis: abbreviated,
            test: NodeTest::Node,
            predicates: Vec::new(),
        });
    }

    let test = if cursor.eat("*") {
        NodeTest::AnyElement
    } else {
        let name = cursor
            .name()
            .ok_or_else(|| format!("expected an element name at offset {}", cursor.pos))?;
        if cursor.peek() == Some('(') || cursor.peek() == Some(':') {
            return Err(format!("unsupported step '{}' at offset {}", name, cursor.pos));
        }
        NodeTest::Name(name.to_ascii_lowercase())
    };

    let mut predicates = Vec::new();
    loop {
        cursor.skip_whitespace();
        if !cursor.eat("[") {
            break;
        }
        predicates.push(parse_predicate(cursor)?);
        cursor.skip_whitespace();
        cursor.expect("]")?;
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

fn parse_predicate(cursor: &mut Cursor<'_>) -> Result<Predicate, String> {
    cursor.skip_whitespace();

    if let Some(position) = cursor.number() {
        if position == 0 {
            return Err("positions start at 1".to_string());
        }
        return Ok(Predicate::Position(position));
    }

    if cursor.eat("last()") {
        return Ok(Predicate::Last);
    }

    let mut conditions = vec![parse_condition(cursor)?];
    loop {
        cursor.skip_whitespace();
        if !cursor.eat("and") {
            break;
        }
        conditions.push(parse_condition(cursor)?);
    }

    Ok(Predicate::All(conditions))
}

fn parse_condition(cursor: &mut Cursor<'_>) -> Result<Condition, String> {
    cursor.skip_whitespace();

    if cursor.eat("contains(") {
        let (operand, value) = parse_function_arguments(cursor)?;
        return Ok(Condition::Contains { operand, value });
    }

    if cursor.eat("starts-with(") {
        let (operand, value) = parse_function_arguments(cursor)?;
        return Ok(Condition::StartsWith { operand, value });
    }

    let operand = parse_operand(cursor)?;
    cursor.skip_whitespace();

    let negate = if cursor.eat("!=") {
        true
    } else if cursor.eat("=") {
        false
    } else {
        return match operand {
            Operand::Attribute(name) => Ok(Condition::HasAttribute(name)),
            _ => Err(format!("expected '=' or '!=' at offset {}", cursor.pos)),
        };
    };

    cursor.skip_whitespace();
    let value = cursor.literal()?;
    Ok(Condition::Equals {
        operand,
        value,
        negate,
    })
}

fn parse_function_arguments(cursor: &mut Cursor<'_>) -> Result<(Operand, String), String> {
    cursor.skip_whitespace();
    let operand = parse_operand(cursor)?;
    cursor.skip_whitespace();
    cursor.expect(",")?;
    cursor.skip_whitespace();
    let value = cursor.literal()?;
    cursor.skip_whitespace();
    cursor.expect(")")?;
    Ok((operand, value))
}

fn parse_operand(cursor: &mut Cursor<'_>) -> Result<Operand, String> {
    if cursor.eat("@") {
        let name = cursor
            .name()
            .ok_or_else(|| format!("expected an attribute name at offset {}", cursor.pos))?;
        Ok(Operand::Attribute(name.to_ascii_lowercase()))
    } else if cursor.eat("text()") {
        Ok(Operand::Text)
    } else if cursor.peek() == Some('.') && !cursor.rest().starts_with("..") {
        cursor.eat(".");
        Ok(Operand::Context)
    } else {
        Err(format!("expected @name, text() or '.' at offset {}", cursor.pos))
    }
}

struct Cursor<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), String> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(format!("expected '{}' at offset {}", token, self.pos))
        }
    }

    fn name(&mut self) -> Option<String> {
        let rest = self.rest();
        let mut chars = rest.char_indices();

        match chars.next() {
            Some((_, c)) if c.is_alphabetic() || c == '_' => {}
            _ => return None,
        }

        let end = chars
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '-' || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        self.pos += end;
        Some(rest[..end].to_string())
    }

    fn number(&mut self) -> Option<usize> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if end == 0 {
            return None;
        }

        let value = rest[..end].parse().ok()?;
        self.pos += end;
        Some(value)
    }

    fn literal(&mut self) -> Result<String, String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(format!("expected a quoted string at offset {}", self.pos)),
        };

        let body = &self.rest()[1..];
        let end = body
            .find(quote)
            .ok_or_else(|| format!("unterminated string at offset {}", self.pos))?;

        let value = body[..end].to_string();
        self.pos += end + 2;
        Ok(value)
    }
}
