//! Abstract syntax tree for compiled format strings.

use std::collections::BTreeSet;

/// A node in a compiled format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text, escapes already resolved.
    Text(String),
    /// `$name` or `${name}`.
    Variable(String),
    /// `[...](style)`, `[...]` or `(...)`. Always conditional.
    Group(Group),
}

/// A bracketed sub-template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub children: Vec<Node>,
    /// Raw style string with whitespace collapsed; may contain `$variables`.
    /// `None` inherits the enclosing style, `Some("")` resets it.
    pub style: Option<String>,
}

impl Group {
    pub fn new(children: Vec<Node>, style: Option<String>) -> Self {
        Self { children, style }
    }
}

// Deeply nested templates would overflow the stack with the derived,
// recursive drop glue; flatten the subtree first.
impl Drop for Group {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let Node::Group(mut group) = node {
                pending.append(&mut group.children);
            }
        }
    }
}

/// A compiled format string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl From<Vec<Node>> for Ast {
    fn from(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }
}

impl Ast {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every variable name referenced anywhere in the tree, including
    /// `$names` used inside group style strings.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        let mut stack: Vec<&Node> = self.nodes.iter().collect();

        while let Some(node) = stack.pop() {
            match node {
                Node::Text(_) => {}
                Node::Variable(name) => {
                    names.insert(name.as_str());
                }
                Node::Group(group) => {
                    if let Some(style) = &group.style {
                        names.extend(style_variables(style));
                    }
                    stack.extend(group.children.iter());
                }
            }
        }

        names
    }

    /// Maximum group nesting depth (0 for a flat template).
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(&Node, usize)> = self.nodes.iter().map(|n| (n, 0)).collect();

        while let Some((node, depth)) = stack.pop() {
            if let Node::Group(group) = node {
                deepest = deepest.max(depth + 1);
                stack.extend(group.children.iter().map(|n| (n, depth + 1)));
            }
        }

        deepest
    }

    /// Serialize back into template syntax.
    ///
    /// Variables are always written in the braced form and metacharacters in
    /// text are escaped, so compiling the result yields an equal tree.
    pub fn to_template(&self) -> String {
        enum Step<'a> {
            Node(&'a Node),
            Close(&'a Group),
        }

        let mut out = String::new();
        let mut stack: Vec<Step<'_>> = self.nodes.iter().rev().map(Step::Node).collect();

        while let Some(step) = stack.pop() {
            match step {
                Step::Node(Node::Text(text)) => escape_into(&mut out, text),
                Step::Node(Node::Variable(name)) => {
                    out.push_str("${");
                    out.push_str(name);
                    out.push('}');
                }
                Step::Node(Node::Group(group)) => {
                    out.push(if group.style.is_some() { '[' } else { '(' });
                    stack.push(Step::Close(group));
                    stack.extend(group.children.iter().rev().map(Step::Node));
                }
                Step::Close(group) => match &group.style {
                    Some(style) => {
                        out.push_str("](");
                        escape_style_into(&mut out, style);
                        out.push(')');
                    }
                    None => out.push(')'),
                },
            }
        }

        out
    }
}

/// Characters that must be escaped to appear literally in a template.
pub(crate) const META_CHARS: [char; 6] = ['$', '\\', '[', ']', '(', ')'];

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        if META_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

// `$` stays live inside styles so `$style` references survive.
fn escape_style_into(out: &mut String, style: &str) {
    for c in style.chars() {
        if c != '$' && META_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Names referenced as `$name` or `${name}` inside a style string.
pub fn style_variables(style: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = style;

    while let Some(pos) = rest.find('$') {
        rest = &rest[pos + 1..];
        if let Some(braced) = rest.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                if end > 0 {
                    names.push(&braced[..end]);
                }
                rest = &braced[end + 1..];
            }
        } else {
            let end = rest
                .find(|c: char| !is_identifier_char(c))
                .unwrap_or(rest.len());
            if end > 0 {
                names.push(&rest[..end]);
            }
            rest = &rest[end..];
        }
    }

    names
}

/// Replace `$name` references in a style string using `lookup`.
///
/// Unresolved references become empty so the remaining tokens still apply.
pub fn interpolate_style<'a, F>(style: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    if !style.contains('$') {
        return style.to_string();
    }

    let mut out = String::with_capacity(style.len());
    let mut rest = style;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];

        let (name, tail) = if let Some(braced) = rest.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], &braced[end + 1..]),
                None => ("", braced),
            }
        } else {
            let end = rest
                .find(|c: char| !is_identifier_char(c))
                .unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        };

        if name.is_empty() {
            out.push('$');
        } else if let Some(value) = lookup(name) {
            out.push_str(value);
        }
        rest = tail;
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    fn var(s: &str) -> Node {
        Node::Variable(s.to_string())
    }

    #[test]
    fn test_variables_walks_groups_and_styles() {
        let ast = Ast::from(vec![
            var("a"),
            Node::Group(Group::new(
                vec![text("x"), Node::Group(Group::new(vec![var("b")], None))],
                Some("$style bold".to_string()),
            )),
        ]);

        let names: Vec<_> = ast.variables().into_iter().collect();
        assert_eq!(names, vec!["a", "b", "style"]);
    }

    #[test]
    fn test_depth() {
        let flat = Ast::from(vec![text("x")]);
        assert_eq!(flat.depth(), 0);

        let nested = Ast::from(vec![Node::Group(Group::new(
            vec![Node::Group(Group::new(vec![var("a")], None))],
            None,
        ))]);
        assert_eq!(nested.depth(), 2);
    }

    #[test]
    fn test_to_template_escapes_text() {
        let ast = Ast::from(vec![text("$[a](b)\\")]);
        assert_eq!(ast.to_template(), "\\$\\[a\\]\\(b\\)\\\\");
    }

    #[test]
    fn test_to_template_groups() {
        let ast = Ast::from(vec![
            Node::Group(Group::new(vec![var("x")], Some("bold $style".to_string()))),
            Node::Group(Group::new(vec![text("y")], None)),
        ]);
        assert_eq!(ast.to_template(), "[${x}](bold $style)(y)");
    }

    #[test]
    fn test_style_variables() {
        assert_eq!(style_variables("bold $style ${other} $"), vec!["style", "other"]);
        assert!(style_variables("bold red").is_empty());
    }

    #[test]
    fn test_interpolate_style() {
        let lookup = |name: &str| match name {
            "style" => Some("bold red"),
            _ => None,
        };
        assert_eq!(interpolate_style("$style italic", lookup), "bold red italic");
        assert_eq!(interpolate_style("${style}", lookup), "bold red");
        assert_eq!(interpolate_style("$missing green", lookup), " green");
        assert_eq!(interpolate_style("plain", lookup), "plain");
    }
}
