use crate::{
    ast::{Instr, Node, NodeKind},
    diag::{ParseError, Want},
    tables::{self, Syntax},
    token::{Token, TokenKind},
    Pos,
};

/// Recursive descent over a token list with one token of lookahead.
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Result<Self, ParseError> {
        let last = tokens.last().ok_or(ParseError::Empty)?;
        if last.kind != TokenKind::Eof {
            let eof = Token::new(TokenKind::Eof, "EOF", last.pos.clone());
            tokens.push(eof);
        }
        Ok(Self { tokens, index: 0 })
    }

    /// Builds the program tree: one child per source line, then the EOF node.
    pub fn parse(mut self) -> Result<Node, ParseError> {
        let file = self.peek().pos.file.clone();
        let start = Token::new(TokenKind::Start, &*file, Pos::new(file.clone(), 1, 1));
        tracing::trace!("parsing {file}");
        let mut nodes = Vec::new();
        loop {
            let node = self.walk()?;
            let eof = matches!(node.kind, NodeKind::Eof);
            nodes.push(node);
            if eof {
                break;
            }
        }
        let program = Node::new(start, NodeKind::Program(nodes));
        tracing::debug!("{} nodes", program.count());
        Ok(program)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.index]
    }

    /// Takes the lookahead token. The lookahead never moves past EOF.
    fn eat(&mut self) -> Token {
        let tok = self.tokens[self.index].clone();
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.peek().kind == kind {
            Ok(self.eat())
        } else {
            Err(self.unexpected(Want::Token(kind)))
        }
    }

    fn unexpected(&self, want: Want) -> ParseError {
        let tok = self.peek();
        ParseError::Expected {
            pos: tok.pos.clone(),
            want,
            found: tok.kind,
            text: tok.text.clone(),
        }
    }

    fn at_operator(&self, class: fn(&str) -> bool) -> bool {
        let tok = self.peek();
        tok.kind.may_operate() && class(&tok.text)
    }

    fn walk(&mut self) -> Result<Node, ParseError> {
        match self.peek().kind {
            TokenKind::Eof => Ok(Node::new(self.eat(), NodeKind::Eof)),
            TokenKind::Empty | TokenKind::CommentLine | TokenKind::Start => {
                let node = Node::new(self.eat(), NodeKind::Format);
                if self.peek().kind == TokenKind::Eol {
                    self.eat();
                }
                Ok(node)
            }
            _ => self.line(),
        }
    }

    fn line(&mut self) -> Result<Node, ParseError> {
        let first = self.peek().clone();
        let mut nodes = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Eol => {
                    nodes.push(Node::new(self.eat(), NodeKind::Format));
                    break;
                }
                TokenKind::Comment => nodes.push(Node::new(self.eat(), NodeKind::Format)),
                _ => nodes.push(self.statement()?),
            }
        }
        Ok(Node::new(first, NodeKind::Line(nodes)))
    }

    fn statement(&mut self) -> Result<Node, ParseError> {
        let kind = match self.peek().kind {
            TokenKind::Directive => NodeKind::Directive,
            TokenKind::Str => NodeKind::Str(None),
            TokenKind::Symbol => NodeKind::Symbol,
            TokenKind::Label | TokenKind::LocalLabel | TokenKind::AnonLabel => NodeKind::Label,
            TokenKind::Opc0 => NodeKind::Instr(Instr::default()),
            TokenKind::Opc1 => return self.san(1),
            TokenKind::Opc2 => return self.san(2),
            TokenKind::WdcOp0 => NodeKind::Instr(Instr {
                syntax: Some(Syntax::Implied),
                ..Default::default()
            }),
            TokenKind::WdcOp => return self.wdc(),
            TokenKind::DirectivePara => return self.directive(),
            _ => return Err(self.unexpected(Want::Statement)),
        };
        Ok(Node::new(self.eat(), kind))
    }

    fn san(&mut self, count: usize) -> Result<Node, ParseError> {
        let tok = self.eat();
        let mut operands = Vec::with_capacity(count);
        if count == 1 {
            operands.push(self.operand()?);
        } else {
            operands.push(self.element()?);
            if self.peek().kind == TokenKind::Comma {
                self.eat();
            }
            operands.push(self.element()?);
        }
        Ok(Node::new(
            tok,
            NodeKind::Instr(Instr {
                operands,
                ..Default::default()
            }),
        ))
    }

    /// A single operand: an anonymous label reference or an element.
    fn operand(&mut self) -> Result<Node, ParseError> {
        match self.peek().kind {
            TokenKind::Minus | TokenKind::Plus => self.signed(),
            _ => self.element(),
        }
    }

    /// A `-` or `+` operand. Alone on the line it refers to an anonymous label,
    /// otherwise `-` negates the value after it.
    fn signed(&mut self) -> Result<Node, ParseError> {
        let sign = self.eat();
        if self.peek().kind.ends_line() || !tables::is_unary(&sign.text) {
            return Ok(Node::new(sign, NodeKind::AnonRef));
        }
        let value = self.value()?;
        Ok(Node::new(sign, NodeKind::Unary(Box::new(value))))
    }

    fn element(&mut self) -> Result<Node, ParseError> {
        if self.peek().kind == TokenKind::Str {
            return Ok(Node::new(self.eat(), NodeKind::Str(None)));
        }
        self.expr()
    }

    fn expr(&mut self) -> Result<Node, ParseError> {
        if self.at_operator(tables::is_unary) {
            let op = self.eat();
            let value = self.value()?;
            return Ok(Node::new(op, NodeKind::Unary(Box::new(value))));
        }
        let lhs = self.value()?;
        self.expr_from(lhs)
    }

    /// Finishes an expression whose first value was already parsed.
    fn expr_from(&mut self, lhs: Node) -> Result<Node, ParseError> {
        if !self.at_operator(tables::is_binary) {
            return Ok(lhs);
        }
        let op = self.eat();
        let rhs = self.value()?;
        Ok(Node::new(op, NodeKind::Binary(Box::new(lhs), Box::new(rhs))))
    }

    fn value(&mut self) -> Result<Node, ParseError> {
        let kind = self.peek().kind;
        let here = self.peek().text == ".here";
        let node = match kind {
            TokenKind::LeftCurly => return self.rpn(),
            TokenKind::Symbol => NodeKind::Symbol,
            kind if kind.is_number() => NodeKind::Number(None),
            TokenKind::Directive if here => NodeKind::Here,
            TokenKind::Directive => {
                let tok = self.peek();
                return Err(ParseError::NotAValue {
                    pos: tok.pos.clone(),
                    text: tok.text.clone(),
                });
            }
            _ => return Err(self.unexpected(Want::Value)),
        };
        Ok(Node::new(self.eat(), node))
    }

    fn rpn(&mut self) -> Result<Node, ParseError> {
        let open = self.eat();
        let mut nodes = vec![self.value()?];
        loop {
            let kind = self.peek().kind;
            match kind {
                TokenKind::RightCurly => {
                    self.eat();
                    break;
                }
                kind if kind.ends_line() => {
                    return Err(ParseError::UnterminatedRpn { pos: open.pos });
                }
                _ if self.at_operator(tables::is_rpn) => {
                    nodes.push(Node::new(self.eat(), NodeKind::Operator));
                }
                _ => nodes.push(self.value()?),
            }
        }
        Ok(Node::new(open, NodeKind::Rpn(nodes)))
    }

    fn directive(&mut self) -> Result<Node, ParseError> {
        let tok = self.eat();
        let args = match tok.text.as_str() {
            ".byte" | ".word" | ".long" => self.list(&tok, true)?,
            ".ram" | ".rom" => self.list(&tok, false)?,
            ".equ" => {
                let name = self.expect(TokenKind::Symbol)?;
                vec![Node::new(name, NodeKind::Symbol), self.expr()?]
            }
            ".mpu" | ".notation" | ".include" | ".assert" => {
                let text = self.expect(TokenKind::Str)?;
                vec![Node::new(text, NodeKind::Str(None))]
            }
            // .origin, .advance and .skip
            _ => vec![self.expr()?],
        };
        Ok(Node::new(tok, NodeKind::DirectiveArgs(args)))
    }

    /// Comma separated elements up to the end of the line. `a ... b` makes a range.
    fn list(&mut self, directive: &Token, strings: bool) -> Result<Vec<Node>, ParseError> {
        let mut items = Vec::new();
        loop {
            let kind = self.peek().kind;
            match kind {
                kind if kind.ends_line() => break,
                TokenKind::Comma => {
                    self.eat();
                }
                TokenKind::Str if strings => {
                    items.push(Node::new(self.eat(), NodeKind::Str(None)));
                }
                _ => {
                    let first = self.expr()?;
                    if self.peek().kind == TokenKind::Ellipsis {
                        let ellipsis = self.eat();
                        let last = self.expr()?;
                        items.push(Node::new(
                            ellipsis,
                            NodeKind::Range(Box::new(first), Box::new(last)),
                        ));
                    } else {
                        items.push(first);
                    }
                }
            }
        }
        if items.is_empty() {
            return Err(ParseError::MissingParameter {
                pos: directive.pos.clone(),
                text: directive.text.clone(),
            });
        }
        Ok(items)
    }

    fn wdc(&mut self) -> Result<Node, ParseError> {
        let tok = self.eat();
        let (syntax, operands) = self.wdc_operand()?;
        Ok(Node::new(
            tok,
            NodeKind::Instr(Instr {
                operands,
                syntax: Some(syntax),
                opcode: None,
            }),
        ))
    }

    fn wdc_operand(&mut self) -> Result<(Syntax, Vec<Node>), ParseError> {
        let kind = self.peek().kind;
        let operand = match kind {
            kind if kind.ends_line() => (Syntax::Implied, Vec::new()),
            TokenKind::Hash => {
                self.eat();
                (Syntax::Immediate, vec![self.expr()?])
            }
            TokenKind::LeftParen => {
                self.eat();
                let inner = self.expr()?;
                if self.peek().kind == TokenKind::Comma {
                    self.eat();
                    let reg = self.register(&['x', 's'])?;
                    self.expect(TokenKind::RightParen)?;
                    if reg == 'x' {
                        (Syntax::IndexedIndirect, vec![inner])
                    } else {
                        self.expect(TokenKind::Comma)?;
                        self.register(&['y'])?;
                        (Syntax::StackIndirectY, vec![inner])
                    }
                } else {
                    self.expect(TokenKind::RightParen)?;
                    if self.peek().kind == TokenKind::Comma {
                        self.eat();
                        self.register(&['y'])?;
                        (Syntax::IndirectY, vec![inner])
                    } else {
                        (Syntax::Indirect, vec![inner])
                    }
                }
            }
            TokenKind::LeftSquare => {
                self.eat();
                let inner = self.expr()?;
                self.expect(TokenKind::RightSquare)?;
                if self.peek().kind == TokenKind::Comma {
                    self.eat();
                    self.register(&['y'])?;
                    (Syntax::IndirectLongY, vec![inner])
                } else {
                    (Syntax::IndirectLong, vec![inner])
                }
            }
            _ => {
                let first = if kind == TokenKind::Symbol && self.peek().text.eq_ignore_ascii_case("a")
                {
                    let tok = self.eat();
                    if self.peek().kind.ends_line() {
                        return Ok((Syntax::Accumulator, Vec::new()));
                    }
                    self.expr_from(Node::new(tok, NodeKind::Symbol))?
                } else if matches!(kind, TokenKind::Minus | TokenKind::Plus) {
                    let node = self.signed()?;
                    if matches!(node.kind, NodeKind::AnonRef) {
                        return Ok((Syntax::Plain, vec![node]));
                    }
                    node
                } else {
                    self.expr()?
                };
                if self.peek().kind != TokenKind::Comma {
                    return Ok((Syntax::Plain, vec![first]));
                }
                self.eat();
                match self.peek_register() {
                    Some(reg) => {
                        self.eat();
                        let syntax = match reg {
                            'x' => Syntax::IndexX,
                            'y' => Syntax::IndexY,
                            _ => Syntax::Stack,
                        };
                        (syntax, vec![first])
                    }
                    None => (Syntax::BlockMove, vec![first, self.expr()?]),
                }
            }
        };
        Ok(operand)
    }

    fn peek_register(&self) -> Option<char> {
        let tok = self.peek();
        if tok.kind != TokenKind::Symbol {
            return None;
        }
        match tok.text.to_ascii_lowercase().as_str() {
            "x" => Some('x'),
            "y" => Some('y'),
            "s" => Some('s'),
            _ => None,
        }
    }

    fn register(&mut self, allowed: &[char]) -> Result<char, ParseError> {
        match self.peek_register() {
            Some(reg) if allowed.contains(&reg) => {
                self.eat();
                Ok(reg)
            }
            _ => Err(self.unexpected(Want::Register)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diag::{AsmError, Diagnostics},
        testing, Mpu, Notation,
    };

    fn parse(text: &str) -> Node {
        testing::parse(Mpu::M65816, Notation::San, text)
    }

    fn parse_wdc(text: &str) -> Node {
        testing::parse(Mpu::M65816, Notation::Wdc, text)
    }

    fn parse_err(text: &str) -> ParseError {
        let mut diag = Diagnostics::new();
        let tokens = testing::tokenize(Mpu::M65816, Notation::San, text, &mut diag).unwrap();
        Parser::new(tokens).unwrap().parse().unwrap_err()
    }

    /// First statement of the first line.
    fn first(program: &Node) -> &Node {
        program.children()[0].children()[0]
    }

    #[test]
    fn one_child_per_line() {
        let program = parse("nop\n\n; comment\n  lda.# 1 ; load\n.native");
        let lines = program.children();
        assert_eq!(lines.len(), 6);
        assert!(matches!(lines[0].kind, NodeKind::Line(_)));
        assert_eq!(lines[1].token.kind, TokenKind::Empty);
        assert_eq!(lines[2].token.kind, TokenKind::CommentLine);
        assert!(matches!(lines[3].kind, NodeKind::Line(_)));
        assert_eq!(lines[3].children().len(), 3);
        assert_eq!(lines[3].children()[1].token.kind, TokenKind::Comment);
        assert!(matches!(lines[5].kind, NodeKind::Eof));
        assert_eq!(program.token.kind, TokenKind::Start);
    }

    #[test]
    fn every_line_is_kept() {
        let text = "a: nop\n\n\n; x\n.byte 1, 2\nrts\n";
        let program = parse(text);
        assert_eq!(program.children().len(), text.lines().count() + 1);
    }

    #[test]
    fn range() {
        let program = parse(".ram 1 ... 4");
        let args = first(&program).children();
        assert_eq!(args.len(), 1);
        let NodeKind::Range(lo, hi) = &args[0].kind else {
            panic!("not a range: {:?}", args[0]);
        };
        assert_eq!(lo.token.text, "1");
        assert_eq!(hi.token.text, "4");
    }

    #[test]
    fn range_of_expressions() {
        let program = parse(".rom start ... start + 4, 9");
        let args = first(&program).children();
        assert_eq!(args.len(), 2);
        assert!(matches!(args[0].kind, NodeKind::Range(..)));
        assert!(matches!(args[0].children()[1].kind, NodeKind::Binary(..)));
    }

    #[test]
    fn rpn() {
        let program = parse(".byte { 1 2 + }");
        let rpn = first(&program).children()[0];
        assert!(matches!(rpn.kind, NodeKind::Rpn(_)));
        let terms = rpn.children();
        assert_eq!(terms.len(), 3);
        assert!(matches!(terms[0].kind, NodeKind::Number(None)));
        assert!(matches!(terms[2].kind, NodeKind::Operator));
        assert_eq!(terms[2].token.text, "+");
        assert!(!terms[2].done);
    }

    #[test]
    fn nested_rpn_with_stack_operators() {
        let program = parse(".word { { 1 .dup .xor } 3 .swap - }");
        let terms = first(&program).children()[0].children();
        assert_eq!(terms.len(), 4);
        assert!(matches!(terms[0].kind, NodeKind::Rpn(_)));
        assert_eq!(terms[0].children().len(), 3);
    }

    #[test]
    fn unary_and_binary() {
        let program = parse(".word <label, 2 + 3, .lsb $1234, 6 .lshift 2, .here");
        let args = first(&program).children();
        assert_eq!(args.len(), 5);
        assert!(matches!(args[0].kind, NodeKind::Unary(_)));
        assert!(matches!(args[1].kind, NodeKind::Binary(..)));
        assert!(matches!(args[2].kind, NodeKind::Unary(_)));
        assert!(matches!(args[3].kind, NodeKind::Binary(..)));
        assert!(matches!(args[4].kind, NodeKind::Here));
    }

    #[test]
    fn strings_in_data() {
        let program = parse(".byte \"hi\", 0");
        let args = first(&program).children();
        assert!(matches!(args[0].kind, NodeKind::Str(None)));
        assert_eq!(args[0].token.text, "hi");
        assert!(matches!(args[1].kind, NodeKind::Number(None)));
    }

    #[test]
    fn equ_and_string_directives() {
        let program = parse(".equ size $40\n.mpu \"65816\"\n.origin $8000");
        let lines = program.children();
        let equ = lines[0].children()[0].children();
        assert_eq!(equ[0].token.text, "size");
        assert_eq!(equ[1].token.kind, TokenKind::HexNum);
        let mpu = lines[1].children()[0].children();
        assert_eq!(mpu[0].token.text, "65816");
        assert_eq!(lines[2].children()[0].children().len(), 1);
    }

    #[test]
    fn instructions() {
        let program = parse("loop: dex\nbne -\nmvn 1, 2\nmvp 3 4\nlda.# $10");
        let lines = program.children();
        assert!(matches!(lines[0].children()[0].kind, NodeKind::Label));
        assert!(matches!(lines[0].children()[1].kind, NodeKind::Instr(_)));
        assert!(matches!(lines[1].children()[0].children()[0].kind, NodeKind::AnonRef));
        assert_eq!(lines[2].children()[0].children().len(), 2);
        assert_eq!(lines[3].children()[0].children().len(), 2);
        assert_eq!(lines[4].children()[0].children()[0].token.text, "10");
    }

    #[test]
    fn wdc_operands() {
        let syntax = |text: &str| {
            let program = parse_wdc(text);
            match &first(&program).kind {
                NodeKind::Instr(instr) => (instr.syntax, instr.operands.len()),
                kind => panic!("not an instruction: {kind:?}"),
            }
        };
        assert_eq!(syntax("lda #$10"), (Some(Syntax::Immediate), 1));
        assert_eq!(syntax("lda $10"), (Some(Syntax::Plain), 1));
        assert_eq!(syntax("lda $1234,x"), (Some(Syntax::IndexX), 1));
        assert_eq!(syntax("ldx $12,Y"), (Some(Syntax::IndexY), 1));
        assert_eq!(syntax("lda $03,s"), (Some(Syntax::Stack), 1));
        assert_eq!(syntax("lda ($10)"), (Some(Syntax::Indirect), 1));
        assert_eq!(syntax("lda ($10,x)"), (Some(Syntax::IndexedIndirect), 1));
        assert_eq!(syntax("lda ($10),y"), (Some(Syntax::IndirectY), 1));
        assert_eq!(syntax("lda ($03,s),y"), (Some(Syntax::StackIndirectY), 1));
        assert_eq!(syntax("lda [$10]"), (Some(Syntax::IndirectLong), 1));
        assert_eq!(syntax("lda [$10],y"), (Some(Syntax::IndirectLongY), 1));
        assert_eq!(syntax("asl a"), (Some(Syntax::Accumulator), 0));
        assert_eq!(syntax("asl"), (Some(Syntax::Implied), 0));
        assert_eq!(syntax("nop"), (Some(Syntax::Implied), 0));
        assert_eq!(syntax("lda a + 1"), (Some(Syntax::Plain), 1));
        assert_eq!(syntax("mvn $01,$02"), (Some(Syntax::BlockMove), 2));
        assert_eq!(syntax("bne -"), (Some(Syntax::Plain), 1));
    }

    #[test]
    fn negative_operands() {
        let program = parse("lda.# -1\nadc.# -4 ; four\nbne -\nbra + ; ahead");
        let lines = program.children();
        let operand = |line: usize| lines[line].children()[0].children()[0];
        let NodeKind::Unary(value) = &operand(0).kind else {
            panic!("expected a negation, got {:?}", operand(0).kind);
        };
        assert_eq!(operand(0).token.text, "-");
        assert_eq!(value.token.text, "1");
        assert!(matches!(operand(1).kind, NodeKind::Unary(_)));
        assert!(matches!(operand(2).kind, NodeKind::AnonRef));
        assert!(matches!(operand(3).kind, NodeKind::AnonRef));

        let program = parse_wdc("lda -1\nlda -2,x\nbne -");
        let lines = program.children();
        let instr = |line: usize| match &lines[line].children()[0].kind {
            NodeKind::Instr(instr) => instr.clone(),
            kind => panic!("not an instruction: {kind:?}"),
        };
        assert_eq!(instr(0).syntax, Some(Syntax::Plain));
        assert!(matches!(instr(0).operands[0].kind, NodeKind::Unary(_)));
        assert_eq!(instr(1).syntax, Some(Syntax::IndexX));
        assert!(matches!(instr(1).operands[0].kind, NodeKind::Unary(_)));
        assert!(matches!(instr(2).operands[0].kind, NodeKind::AnonRef));
    }

    #[test]
    fn wdc_bad_register() {
        let mut diag = Diagnostics::new();
        let tokens = testing::tokenize(Mpu::M65816, Notation::Wdc, "lda ($10),x", &mut diag).unwrap();
        let err = Parser::new(tokens).unwrap().parse().unwrap_err();
        assert!(matches!(err, ParseError::Expected { want: Want::Register, .. }));
    }

    #[test]
    fn grammar_errors() {
        assert!(matches!(
            parse_err(".equ 4 4"),
            ParseError::Expected {
                want: Want::Token(TokenKind::Symbol),
                found: TokenKind::DecNum,
                ..
            }
        ));
        let ParseError::UnterminatedRpn { pos } = parse_err("nop\n.byte { 1 2") else {
            panic!("expected an unterminated RPN term");
        };
        assert_eq!((pos.line, pos.column), (2, 7));
        assert!(matches!(
            parse_err("lda.# .native"),
            ParseError::NotAValue { .. }
        ));
        assert!(matches!(
            parse_err(".byte ; nothing"),
            ParseError::MissingParameter { .. }
        ));
        assert!(matches!(
            parse_err("12"),
            ParseError::Expected {
                want: Want::Statement,
                ..
            }
        ));
        assert!(matches!(
            parse_err(".ram \"text\""),
            ParseError::Expected {
                want: Want::Value,
                ..
            }
        ));
    }

    #[test]
    fn errors_convert_to_run_errors() {
        let err: AsmError = parse_err(".mpu 6502").into();
        assert!(err.to_string().contains("expected STRING"));
    }

    #[test]
    fn empty_input() {
        assert!(matches!(Parser::new(Vec::new()), Err(ParseError::Empty)));
    }
}
