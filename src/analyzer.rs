use std::str::FromStr;

use indexmap::IndexMap;

use crate::{
    ast::{Node, NodeKind},
    diag::{AsmError, Diagnostics, NumberError, SemanticError},
    tables::{InstructionSet, Opcode, Size, Syntax},
    token::{Token, TokenKind},
    Mpu, Notation, Pos,
};

/// Converts number text in the given base. `:` and `.` separators are ignored in binary and
/// hexadecimal.
pub fn convert(text: &str, radix: u32) -> Result<i64, NumberError> {
    let digits: String = if radix == 10 {
        text.trim().to_string()
    } else {
        text.chars()
            .filter(|c| !matches!(c, ':' | '.'))
            .collect::<String>()
            .trim()
            .to_string()
    };
    let err = || NumberError {
        text: text.to_string(),
        radix,
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(err());
    }
    i64::from_str_radix(&digits, radix).map_err(|_| err())
}

/// Parses `$` hexadecimal, `%` binary or plain decimal text, optionally negated.
pub fn parse_literal(text: &str) -> Result<i64, NumberError> {
    let text = text.trim();
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = if let Some(hex) = text.strip_prefix('$') {
        convert(hex, 16)?
    } else if let Some(bin) = text.strip_prefix('%') {
        convert(bin, 2)?
    } else {
        convert(text, 10)?
    };
    Ok(if negative { -value } else { value })
}

/// A number written with an optional base prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal(pub i64);

impl FromStr for Literal {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_literal(s).map(Literal)
    }
}

fn radix_of(tok: &Token) -> (u32, &str) {
    match tok.kind {
        TokenKind::BinNum => (2, &tok.text),
        TokenKind::HexNum => (16, &tok.text),
        TokenKind::DecNum => (10, &tok.text),
        // not narrowed by the tokenizer; go by the prefix
        _ => {
            if let Some(hex) = tok.text.strip_prefix('$') {
                (16, hex)
            } else if let Some(bin) = tok.text.strip_prefix('%') {
                (2, bin)
            } else {
                (10, &tok.text)
            }
        }
    }
}

/// Value of a number node, converted or not. Errors are left for the node's own visit.
fn literal(node: &Node) -> Option<i64> {
    match node.kind {
        NodeKind::Number(Some(value)) => Some(value),
        NodeKind::Number(None) => {
            let (radix, text) = radix_of(&node.token);
            convert(text, radix).ok()
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Label,
    Local,
    Equ,
    Define,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub pos: Pos,
    /// Known only for symbols bound to a literal.
    pub value: Option<i64>,
}

/// Every symbol defined by a program, in definition order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: IndexMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: String, symbol: Symbol) -> Result<(), SemanticError> {
        if let Some(first) = self.symbols.get(&name) {
            return Err(SemanticError::Redefined {
                name,
                first: first.pos.clone(),
            });
        }
        self.symbols.insert(name, symbol);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.symbols.iter().map(|(name, sym)| (name.as_str(), sym))
    }
}

pub struct Analyzer<'a> {
    mpu: Mpu,
    notation: Notation,
    set: &'static InstructionSet,
    diag: &'a mut Diagnostics,
    symbols: SymbolTable,
    /// Last global label, the scope of local labels.
    scope: Option<String>,
    errors: usize,
}

impl<'a> Analyzer<'a> {
    pub fn new(mpu: Mpu, notation: Notation, diag: &'a mut Diagnostics) -> Self {
        let errors = diag.count();
        Self {
            mpu,
            notation,
            set: InstructionSet::for_mpu(mpu),
            diag,
            symbols: SymbolTable::new(),
            scope: None,
            errors,
        }
    }

    /// Adds a symbol defined outside the source.
    pub fn define(&mut self, name: &str, value: i64) {
        let pos = Pos::new("__DEFINES__".into(), 1, 1);
        self.record(name.to_string(), SymbolKind::Define, &pos, Some(value));
    }

    /// Resolves the program in place, pruning formatting nodes on the way down.
    pub fn analyze(&mut self, program: &mut Node) -> Result<(), AsmError> {
        tracing::trace!("analyzing for the {}", self.mpu);
        self.walk(program);
        tracing::debug!("{} symbols", self.symbols.len());
        let errors = self.diag.count() - self.errors;
        if errors != 0 {
            return Err(AsmError::Semantic(errors));
        }
        Ok(())
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn into_symbols(self) -> SymbolTable {
        self.symbols
    }

    fn walk(&mut self, node: &mut Node) {
        if node.done {
            return;
        }
        self.resolve(node);
        let pruned = node.list_mut().map_or(0, |children| {
            let count = children.len();
            children.retain(|child| !child.is_formatting());
            count - children.len()
        });
        if pruned != 0 {
            tracing::trace!("{}: pruned {pruned} formatting node(s)", node.token.pos);
        }
        for child in node.children_mut() {
            self.walk(child);
        }
    }

    fn resolve(&mut self, node: &mut Node) {
        match node.kind {
            NodeKind::Number(_) => self.number(node),
            NodeKind::Str(_) => {
                node.kind = NodeKind::Str(Some(node.token.text.as_bytes().to_vec()));
                node.done = true;
            }
            NodeKind::Instr(_) => self.instruction(node),
            NodeKind::DirectiveArgs(_) => self.directive(node),
            NodeKind::Label => self.label(node),
            _ => {}
        }
    }

    fn number(&mut self, node: &mut Node) {
        let (radix, text) = radix_of(&node.token);
        match convert(text, radix) {
            Ok(value) => {
                node.kind = NodeKind::Number(Some(value));
                node.token.kind = TokenKind::DecNum;
                node.done = true;
            }
            Err(e) => self.diag.report(&node.token.pos, SemanticError::from(e)),
        }
    }

    fn instruction(&mut self, node: &mut Node) {
        let NodeKind::Instr(instr) = &mut node.kind else {
            return;
        };
        let tok = &node.token;
        let opcode = match instr.syntax {
            None => self.san(&tok.text, &tok.pos),
            Some(syntax) => self.wdc(&tok.text, &tok.pos, syntax, &instr.operands),
        };
        if let Some(opcode) = opcode {
            instr.opcode = Some(opcode);
            if instr.operands.is_empty() {
                node.done = true;
            }
        }
    }

    fn san(&mut self, mnemonic: &str, pos: &Pos) -> Option<&'static Opcode> {
        let opcode = self.set.san(mnemonic);
        if opcode.is_none() {
            self.unknown(mnemonic, pos);
        }
        opcode
    }

    fn wdc(
        &mut self,
        mnemonic: &str,
        pos: &Pos,
        syntax: Syntax,
        operands: &[Node],
    ) -> Option<&'static Opcode> {
        if self.set.wdc(mnemonic).is_empty() {
            self.unknown(mnemonic, pos);
            return None;
        }
        if syntax == Syntax::Implied && mnemonic.eq_ignore_ascii_case("brk") {
            self.diag.report(pos, SemanticError::BrkSignature);
            return None;
        }
        let size = operands.first().and_then(literal).map(Size::of);
        let opcode = self.set.wdc_select(mnemonic, syntax, size);
        match opcode {
            Some(op) => tracing::trace!("{pos}: {mnemonic} {syntax:?} is {}", op.san),
            None => self
                .diag
                .report(pos, SemanticError::NoAddressingMode(mnemonic.to_string())),
        }
        opcode
    }

    fn unknown(&mut self, mnemonic: &str, pos: &Pos) {
        self.diag.report(
            pos,
            SemanticError::UnknownMnemonic {
                mnemonic: mnemonic.to_string(),
                mpu: self.mpu,
            },
        );
    }

    fn directive(&mut self, node: &mut Node) {
        let NodeKind::DirectiveArgs(args) = &mut node.kind else {
            return;
        };
        match node.token.text.as_str() {
            ".mpu" | ".notation" => {
                if let Some(arg) = args.first() {
                    if node.token.text == ".mpu" {
                        self.check_mpu(&arg.token);
                    } else {
                        self.check_notation(&arg.token);
                    }
                }
                args.clear();
                node.done = true;
            }
            ".equ" => {
                if let Some(name) = args.first() {
                    let value = args.get(1).and_then(literal);
                    self.record(name.token.text.clone(), SymbolKind::Equ, &name.token.pos, value);
                }
            }
            _ => {}
        }
    }

    fn check_mpu(&mut self, tok: &Token) {
        match tok.text.parse::<Mpu>() {
            Err(e) => self.diag.report(&tok.pos, SemanticError::from(e)),
            Ok(found) if found != self.mpu => self.diag.report(
                &tok.pos,
                SemanticError::MpuMismatch {
                    found,
                    requested: self.mpu,
                },
            ),
            Ok(_) => {}
        }
    }

    fn check_notation(&mut self, tok: &Token) {
        match tok.text.parse::<Notation>() {
            Err(e) => self.diag.report(&tok.pos, SemanticError::from(e)),
            Ok(found) if found != self.notation => self.diag.report(
                &tok.pos,
                SemanticError::NotationMismatch {
                    found,
                    requested: self.notation,
                },
            ),
            Ok(_) => {}
        }
    }

    fn label(&mut self, node: &Node) {
        let tok = &node.token;
        let (name, kind) = match tok.kind {
            TokenKind::Label => {
                self.scope = Some(tok.text.clone());
                (tok.text.clone(), SymbolKind::Label)
            }
            TokenKind::LocalLabel => {
                let scope = self.scope.as_deref().unwrap_or_default();
                (format!("{scope}:{}", tok.text), SymbolKind::Local)
            }
            // anonymous labels are found by counting, not by name
            _ => return,
        };
        self.record(name, kind, &tok.pos, None);
    }

    fn record(&mut self, name: String, kind: SymbolKind, pos: &Pos, value: Option<i64>) {
        let symbol = Symbol {
            kind,
            pos: pos.clone(),
            value,
        };
        if let Err(e) = self.symbols.define(name, symbol) {
            self.diag.report(pos, e);
        }
    }
}
