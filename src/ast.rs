use std::fmt;

use crate::{
    tables::{Opcode, Syntax},
    token::{Token, TokenKind},
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Instr {
    pub operands: Vec<Node>,
    /// Operand syntax as written. Only set for WDC notation.
    pub syntax: Option<Syntax>,
    pub opcode: Option<&'static Opcode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Program(Vec<Node>),
    /// Statements of one physical line, followed by its comment and EOL if any.
    Line(Vec<Node>),
    /// Empty lines, comments and line ends.
    Format,
    Eof,
    /// A directive without parameters.
    Directive,
    /// A directive and its parameters.
    DirectiveArgs(Vec<Node>),
    /// Global, local or anonymous label definition.
    Label,
    Symbol,
    /// The `.here` value.
    Here,
    /// `+` or `-` reference to an anonymous label.
    AnonRef,
    Number(Option<i64>),
    Str(Option<Vec<u8>>),
    Unary(Box<Node>),
    Binary(Box<Node>, Box<Node>),
    /// `{ ... }` term in reverse Polish notation.
    Rpn(Vec<Node>),
    /// Operator inside an RPN term.
    Operator,
    Range(Box<Node>, Box<Node>),
    Instr(Instr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub token: Token,
    pub kind: NodeKind,
    pub done: bool,
}

impl Node {
    pub fn new(token: Token, kind: NodeKind) -> Self {
        Self {
            token,
            kind,
            done: false,
        }
    }

    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Program(nodes)
            | NodeKind::Line(nodes)
            | NodeKind::DirectiveArgs(nodes)
            | NodeKind::Rpn(nodes) => nodes.iter().collect(),
            NodeKind::Instr(instr) => instr.operands.iter().collect(),
            NodeKind::Unary(node) => vec![node.as_ref()],
            NodeKind::Binary(lhs, rhs) | NodeKind::Range(lhs, rhs) => {
                vec![lhs.as_ref(), rhs.as_ref()]
            }
            _ => Vec::new(),
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Node> {
        match &mut self.kind {
            NodeKind::Program(nodes)
            | NodeKind::Line(nodes)
            | NodeKind::DirectiveArgs(nodes)
            | NodeKind::Rpn(nodes) => nodes.iter_mut().collect(),
            NodeKind::Instr(instr) => instr.operands.iter_mut().collect(),
            NodeKind::Unary(node) => vec![node.as_mut()],
            NodeKind::Binary(lhs, rhs) | NodeKind::Range(lhs, rhs) => {
                vec![lhs.as_mut(), rhs.as_mut()]
            }
            _ => Vec::new(),
        }
    }

    /// The child list, for nodes whose children may be removed.
    pub fn list_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.kind {
            NodeKind::Program(nodes)
            | NodeKind::Line(nodes)
            | NodeKind::DirectiveArgs(nodes)
            | NodeKind::Rpn(nodes) => Some(nodes),
            NodeKind::Instr(instr) => Some(&mut instr.operands),
            _ => None,
        }
    }

    /// Nodes that only matter for formatting. Lines holding nothing else count too.
    pub fn is_formatting(&self) -> bool {
        match &self.kind {
            NodeKind::Format => true,
            NodeKind::Line(nodes) => nodes.iter().all(Node::is_formatting),
            _ => false,
        }
    }

    pub fn value(&self) -> Option<i64> {
        match self.kind {
            NodeKind::Number(value) => value,
            _ => None,
        }
    }

    /// Bytes the node resolved to: string contents or an instruction's opcode.
    pub fn code(&self) -> Option<Vec<u8>> {
        match &self.kind {
            NodeKind::Str(bytes) => bytes.clone(),
            NodeKind::Instr(Instr {
                opcode: Some(opcode),
                ..
            }) => Some(vec![opcode.code]),
            _ => None,
        }
    }

    pub fn count(&self) -> usize {
        1 + self.children().iter().map(|node| node.count()).sum::<usize>()
    }

    fn label(&self) -> &'static str {
        match &self.kind {
            NodeKind::Program(_) => "PROGRAM",
            NodeKind::Line(_) => "LINE",
            NodeKind::Unary(_) => "UNARY",
            NodeKind::Binary(..) => "BINARY",
            NodeKind::Rpn(_) => "RPN",
            NodeKind::Operator => "OPERATOR",
            NodeKind::Range(..) => "RANGE",
            NodeKind::Here => "HERE",
            NodeKind::AnonRef => "ANON_REF",
            _ => self.token.kind.name(),
        }
    }

    fn dump(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.label(), indent = depth * 4)?;
        match self.token.kind {
            TokenKind::Eol | TokenKind::Empty | TokenKind::Eof => {}
            _ if !matches!(self.kind, NodeKind::Line(_)) => write!(f, " {:?}", self.token.text)?,
            _ => {}
        }
        if let Some(value) = self.value() {
            write!(f, " = {value}")?;
        }
        if let Some(code) = self.code() {
            write!(f, " ->")?;
            for byte in code {
                write!(f, " {byte:02x}")?;
            }
        }
        if self.done {
            write!(f, " (done)")?;
        }
        writeln!(f)?;
        for child in self.children() {
            child.dump(f, depth + 1)?;
        }
        Ok(())
    }
}

/// Indented tree, one node per line.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f, 0)
    }
}
