//! Format string compiler.
//!
//! Uses an explicit stack of open frames instead of recursion so that
//! adversarially deep nesting costs heap, not call stack.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

use super::ast::{is_identifier_char, Ast, Group, Node, META_CHARS};

/// What went wrong while compiling a format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatErrorKind {
    /// `[` or `(` never closed.
    UnmatchedOpen(char),
    /// `]` or `)` with no matching opener.
    UnmatchedClose(char),
    /// `](` style part never closed.
    UnclosedStyle,
    /// `${` without a valid name and closing `}`.
    MalformedVariable,
}

impl fmt::Display for FormatErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmatchedOpen(c) => write!(f, "unmatched '{}'", c),
            Self::UnmatchedClose(c) => write!(f, "unexpected '{}'", c),
            Self::UnclosedStyle => write!(f, "unclosed style string"),
            Self::MalformedVariable => write!(f, "malformed variable reference"),
        }
    }
}

/// A template syntax error with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at byte {position}")]
pub struct FormatError {
    pub kind: FormatErrorKind,
    pub position: usize,
}

impl FormatError {
    fn new(kind: FormatErrorKind, position: usize) -> Self {
        Self { kind, position }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Root,
    Bracket,
    Paren,
}

struct Frame {
    delimiter: Delimiter,
    opened_at: usize,
    nodes: Vec<Node>,
    text: String,
}

impl Frame {
    fn new(delimiter: Delimiter, opened_at: usize) -> Self {
        Self {
            delimiter,
            opened_at,
            nodes: Vec::new(),
            text: String::new(),
        }
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.nodes.push(Node::Text(std::mem::take(&mut self.text)));
        }
    }

    fn push(&mut self, node: Node) {
        self.flush_text();
        self.nodes.push(node);
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush_text();
        self.nodes
    }
}

type Chars<'a> = Peekable<CharIndices<'a>>;

/// Compile a format string into an [`Ast`].
///
/// # Errors
///
/// Returns a [`FormatError`] for unbalanced brackets or parentheses, an
/// unterminated style, or a malformed `${...}` reference.
///
/// # Example
///
/// ```rust
/// use sigil::format::{compile, Node};
///
/// let ast = compile("on [$branch](bold purple)").unwrap();
/// assert_eq!(ast.nodes()[0], Node::Text("on ".into()));
/// assert!(ast.variables().contains("branch"));
/// ```
pub fn compile(template: &str) -> Result<Ast, FormatError> {
    let mut stack = vec![Frame::new(Delimiter::Root, 0)];
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '\\' => {
                let frame = current(&mut stack);
                match chars.peek() {
                    Some(&(_, next)) if META_CHARS.contains(&next) => {
                        chars.next();
                        frame.text.push(next);
                    }
                    _ => frame.text.push('\\'),
                }
            }
            '$' => match read_variable(&mut chars, pos)? {
                Some(name) => current(&mut stack).push(Node::Variable(name)),
                None => current(&mut stack).text.push('$'),
            },
            '[' => stack.push(Frame::new(Delimiter::Bracket, pos)),
            '(' => stack.push(Frame::new(Delimiter::Paren, pos)),
            ']' => {
                let children = close(&mut stack, Delimiter::Bracket, ']', pos)?;
                let style = if matches!(chars.peek(), Some(&(_, '('))) {
                    let (open, _) = chars.next().unwrap_or((pos, '('));
                    Some(read_style(&mut chars, open)?)
                } else {
                    None
                };
                current(&mut stack).push(Node::Group(Group::new(children, style)));
            }
            ')' => {
                let children = close(&mut stack, Delimiter::Paren, ')', pos)?;
                current(&mut stack).push(Node::Group(Group::new(children, None)));
            }
            other => current(&mut stack).text.push(other),
        }
    }

    if stack.len() > 1 {
        let innermost = stack.pop().map(|f| (f.delimiter, f.opened_at));
        if let Some((delimiter, opened_at)) = innermost {
            let open = if delimiter == Delimiter::Paren { '(' } else { '[' };
            return Err(FormatError::new(FormatErrorKind::UnmatchedOpen(open), opened_at));
        }
    }

    let root = stack.pop().map(Frame::finish).unwrap_or_default();
    Ok(Ast::from(root))
}

fn current(stack: &mut [Frame]) -> &mut Frame {
    // The root frame is never popped while characters remain.
    let last = stack.len() - 1;
    &mut stack[last]
}

fn close(
    stack: &mut Vec<Frame>,
    expected: Delimiter,
    closer: char,
    pos: usize,
) -> Result<Vec<Node>, FormatError> {
    match stack.last() {
        Some(frame) if frame.delimiter == expected => {}
        _ => {
            return Err(FormatError::new(
                FormatErrorKind::UnmatchedClose(closer),
                pos,
            ))
        }
    }
    Ok(stack.pop().map(Frame::finish).unwrap_or_default())
}

/// Read the name after a `$`. `Ok(None)` means the `$` is literal.
fn read_variable(chars: &mut Chars<'_>, dollar: usize) -> Result<Option<String>, FormatError> {
    match chars.peek() {
        Some(&(_, '{')) => {
            chars.next();
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some((_, '}')) => break,
                    Some((_, c)) if is_identifier_char(c) || c == '.' => name.push(c),
                    _ => {
                        return Err(FormatError::new(
                            FormatErrorKind::MalformedVariable,
                            dollar,
                        ))
                    }
                }
            }
            if name.is_empty() || name.starts_with('.') || name.ends_with('.') {
                return Err(FormatError::new(FormatErrorKind::MalformedVariable, dollar));
            }
            Ok(Some(name))
        }
        Some(&(_, c)) if is_identifier_char(c) => {
            let mut name = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !is_identifier_char(c) {
                    break;
                }
                name.push(c);
                chars.next();
            }
            Ok(Some(name))
        }
        _ => Ok(None),
    }
}

/// Read a style string up to the matching unescaped `)`.
fn read_style(chars: &mut Chars<'_>, open: usize) -> Result<String, FormatError> {
    let mut raw = String::new();
    loop {
        match chars.next() {
            Some((_, ')')) => break,
            Some((_, '\\')) => match chars.peek() {
                Some(&(_, next)) if META_CHARS.contains(&next) => {
                    chars.next();
                    raw.push(next);
                }
                _ => raw.push('\\'),
            },
            Some((_, c)) => raw.push(c),
            None => return Err(FormatError::new(FormatErrorKind::UnclosedStyle, open)),
        }
    }
    Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
}
