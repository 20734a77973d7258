use std::{
    fs, io,
    path::PathBuf,
    sync::Arc,
};

use crate::{
    diag::{AsmError, Diagnostics, LexError},
    tables::{self, InstructionSet},
    token::{Token, TokenKind},
    Mpu, Notation, Pos,
};

/// A loaded source file.
#[derive(Debug, Clone)]
pub struct Source {
    /// Resolved name, used in positions and to detect recursive includes.
    pub name: String,
    pub lines: Vec<String>,
}

pub trait SourceLoader {
    /// Loads `name`, resolved relative to the file named `from` when it comes from an `.include`.
    fn load(&self, name: &str, from: Option<&str>) -> io::Result<Source>;
}

/// Loads files from disk.
#[derive(Debug, Default)]
pub struct FsLoader {
    include: Vec<PathBuf>,
}

impl FsLoader {
    pub fn new(include: Vec<PathBuf>) -> Self {
        Self { include }
    }

    fn resolve(&self, name: &str, from: Option<&str>) -> io::Result<PathBuf> {
        if let Ok(path) = fs::canonicalize(name) {
            return Ok(path);
        }
        if let Some(from) = from {
            // try the directory of the including file
            let mut base = PathBuf::from(from);
            base.pop();
            base.push(name);
            if let Ok(path) = fs::canonicalize(base) {
                return Ok(path);
            }
        }
        // try every include directory
        self.include
            .iter()
            .find_map(|dir| fs::canonicalize(dir.join(name)).ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file not found"))
    }
}

impl SourceLoader for FsLoader {
    fn load(&self, name: &str, from: Option<&str>) -> io::Result<Source> {
        let path = self.resolve(name, from)?;
        let text = fs::read_to_string(&path)?;
        Ok(Source {
            name: path.to_string_lossy().into_owned(),
            lines: text.lines().map(str::to_string).collect(),
        })
    }
}

pub struct Lexer<'a, L> {
    notation: Notation,
    set: &'static InstructionSet,
    loader: &'a L,
    diag: &'a mut Diagnostics,
    files: Vec<String>,
}

impl<'a, L: SourceLoader> Lexer<'a, L> {
    pub fn new(mpu: Mpu, notation: Notation, loader: &'a L, diag: &'a mut Diagnostics) -> Self {
        Self {
            notation,
            set: InstructionSet::for_mpu(mpu),
            loader,
            diag,
            files: Vec::new(),
        }
    }

    /// Tokenizes the file `name` and everything it includes, ending with a single EOF.
    pub fn run(mut self, name: &str) -> Result<Vec<Token>, AsmError> {
        let errors = self.diag.count();
        let source = self
            .loader
            .load(name, None)
            .map_err(|e| AsmError::Open(name.to_string(), e))?;
        let file: Arc<str> = source.name.as_str().into();
        tracing::trace!("tokenizing {file}");
        let mut tokens = self.tokenize_lines(&file, &source.lines);
        tokens.push(Token::new(
            TokenKind::Eof,
            "EOF",
            Pos::new(file, source.lines.len() + 1, 1),
        ));
        tracing::debug!("{} tokens", tokens.len());
        let errors = self.diag.count() - errors;
        if errors != 0 {
            return Err(AsmError::Lexical(errors));
        }
        Ok(tokens)
    }

    /// Tokenizes raw lines. Every line ends with exactly one EOL; no EOF is added.
    pub fn tokenize_lines<S: AsRef<str>>(&mut self, file: &Arc<str>, lines: &[S]) -> Vec<Token> {
        let mut tokens = Vec::new();
        self.scan(file, lines, &mut tokens);
        tokens
    }

    fn scan<S: AsRef<str>>(&mut self, file: &Arc<str>, lines: &[S], tokens: &mut Vec<Token>) {
        self.files.push(file.to_string());
        for (i, line) in lines.iter().enumerate() {
            self.line(file, i + 1, line.as_ref(), tokens);
        }
        self.files.pop();
    }

    fn line(&mut self, file: &Arc<str>, number: usize, text: &str, tokens: &mut Vec<Token>) {
        let pos = |column| Pos::new(file.clone(), number, column);
        let mut reader = LineReader::new(text);
        reader.skip(reader.count_while(char::is_whitespace));
        match reader.peek() {
            None => {
                tokens.push(Token::new(TokenKind::Empty, "", pos(1)));
                tokens.push(Token::new(TokenKind::Eol, "", pos(1)));
                return;
            }
            Some(';') => {
                let column = reader.column();
                tokens.push(Token::new(
                    TokenKind::CommentLine,
                    reader.rest().trim_end(),
                    pos(column),
                ));
                tokens.push(Token::new(TokenKind::Eol, "", pos(reader.column())));
                return;
            }
            _ => {}
        }

        while let Some(c) = reader.peek() {
            let column = reader.column();
            if c.is_whitespace() {
                reader.eat();
                continue;
            }
            if let Some(kind) = TokenKind::punctuation(c) {
                reader.eat();
                tokens.push(Token::new(kind, c, pos(column)));
                continue;
            }
            match c {
                ';' => {
                    let text = reader.rest();
                    tokens.push(Token::new(TokenKind::Comment, text.trim(), pos(column)));
                }
                '.' => self.directive(file, number, &mut reader, tokens),
                '%' => {
                    reader.eat();
                    let text = reader.take_while(is_bin_char);
                    tokens.push(Token::new(TokenKind::BinNum, text, pos(column)));
                }
                '$' => {
                    reader.eat();
                    let text = reader.take_while(is_hex_char);
                    tokens.push(Token::new(TokenKind::HexNum, text, pos(column)));
                }
                '"' => {
                    reader.eat();
                    let Some(text) = reader.until('"') else {
                        // abandon the rest of the line
                        self.diag.report(&pos(column), LexError::UnterminatedString);
                        break;
                    };
                    tokens.push(Token::new(TokenKind::Str, text, pos(column)));
                }
                '_' => {
                    if !reader.peek_at(1).is_some_and(char::is_alphabetic) {
                        let text = reader.take_while(is_symbol_char);
                        self.diag.report(&pos(column), LexError::LocalLabel(text));
                        continue;
                    }
                    let text = reader.take_while(is_symbol_char);
                    tokens.push(label_or_symbol(
                        &mut reader,
                        TokenKind::LocalLabel,
                        text,
                        pos(column),
                    ));
                }
                c if c.is_ascii_digit() => {
                    let text = reader.take_while(is_dec_char);
                    tokens.push(Token::new(TokenKind::DecNum, text, pos(column)));
                }
                c if c.is_alphabetic() => {
                    if let Some((kind, text)) = self.mnemonic(&mut reader) {
                        tokens.push(Token::new(kind, text, pos(column)));
                        continue;
                    }
                    let text = reader.take_while(is_symbol_char);
                    tokens.push(label_or_symbol(
                        &mut reader,
                        TokenKind::Label,
                        text,
                        pos(column),
                    ));
                }
                c => {
                    self.diag.report(&pos(column), LexError::IllegalChar(c));
                    reader.eat();
                }
            }
        }
        tokens.push(Token::new(TokenKind::Eol, "", pos(reader.column())));
    }

    fn directive(
        &mut self,
        file: &Arc<str>,
        number: usize,
        reader: &mut LineReader,
        tokens: &mut Vec<Token>,
    ) {
        let pos = Pos::new(file.clone(), number, reader.column());
        if reader.starts_with("...") {
            reader.skip(3);
            tokens.push(Token::new(TokenKind::Ellipsis, "...", pos));
            return;
        }
        let word = reader.take_while(is_directive_char);
        if word == ".include" {
            self.include(file, number, pos, reader, tokens);
            return;
        }
        let kind = if tables::takes_params(&word) {
            TokenKind::DirectivePara
        } else if tables::is_directive(&word) {
            TokenKind::Directive
        } else {
            self.diag.report(&pos, LexError::UnknownDirective(word));
            return;
        };
        tokens.push(Token::new(kind, word, pos));
    }

    /// Splices the tokens of the included file in before the `.include` statement itself.
    fn include(
        &mut self,
        file: &Arc<str>,
        number: usize,
        pos: Pos,
        reader: &mut LineReader,
        tokens: &mut Vec<Token>,
    ) {
        reader.skip(reader.count_while(char::is_whitespace));
        let name_pos = Pos::new(file.clone(), number, reader.column());
        let name = if reader.peek() == Some('"') {
            reader.eat();
            reader.until('"')
        } else {
            None
        };
        let Some(name) = name else {
            self.diag.report(&pos, LexError::IncludeName);
            reader.rest();
            return;
        };
        match self.loader.load(&name, Some(&**file)) {
            Err(e) => self.diag.report(&name_pos, LexError::IncludeOpen(name.clone(), e)),
            Ok(source) if self.files.contains(&source.name) => {
                self.diag
                    .report(&name_pos, LexError::RecursiveInclude(source.name))
            }
            Ok(source) => {
                tracing::trace!("including {}", source.name);
                let included: Arc<str> = source.name.as_str().into();
                self.scan(&included, &source.lines, tokens);
            }
        }
        tokens.push(Token::new(TokenKind::DirectivePara, ".include", pos));
        tokens.push(Token::new(TokenKind::Str, name, name_pos));
    }

    /// Recognizes a mnemonic at the reader. Mnemonics of other processors of the family are
    /// recognized too so that the analyzer can report them.
    fn mnemonic(&self, reader: &mut LineReader) -> Option<(TokenKind, String)> {
        match self.notation {
            Notation::San => {
                let len = reader.count_while(is_mnemonic_char);
                if !reader.boundary_at(len, |c| !is_symbol_char(c) && c != ':') {
                    return None;
                }
                let text = reader.peek_str(len);
                let op = self
                    .set
                    .san(&text)
                    .or_else(|| InstructionSet::family().san(&text))?;
                reader.skip(len);
                let kind = match op.operands {
                    0 => TokenKind::Opc0,
                    1 => TokenKind::Opc1,
                    _ => TokenKind::Opc2,
                };
                Some((kind, text))
            }
            Notation::Wdc => {
                let len = reader.count_while(char::is_alphabetic);
                if len != 3 || !reader.boundary_at(len, |c| c.is_whitespace() || c == ';') {
                    return None;
                }
                let text = reader.peek_str(len);
                let mut variants = self.set.wdc(&text);
                if variants.is_empty() {
                    variants = InstructionSet::family().wdc(&text);
                }
                if variants.is_empty() {
                    return None;
                }
                reader.skip(len);
                let kind = if variants.iter().all(|op| op.operands == 0) {
                    TokenKind::WdcOp0
                } else {
                    TokenKind::WdcOp
                };
                Some((kind, text))
            }
        }
    }
}

fn label_or_symbol(reader: &mut LineReader, label: TokenKind, text: String, pos: Pos) -> Token {
    if reader.peek() == Some(':') {
        reader.eat();
        Token::new(label, text, pos)
    } else {
        Token::new(TokenKind::Symbol, text, pos)
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || "?_!&'~#|.=^".contains(c)
}

fn is_mnemonic_char(c: char) -> bool {
    c.is_alphabetic() || c == '.' || c == '#'
}

fn is_directive_char(c: char) -> bool {
    c.is_alphanumeric() || c == '.' || c == '!'
}

fn is_bin_char(c: char) -> bool {
    matches!(c, '0' | '1' | ':' | '.')
}

fn is_hex_char(c: char) -> bool {
    c.is_ascii_hexdigit() || c == ':' || c == '.'
}

fn is_dec_char(c: char) -> bool {
    c.is_ascii_digit()
}

/// Cursor over the characters of one line.
struct LineReader {
    chars: Vec<char>,
    index: usize,
}

impl LineReader {
    fn new(line: &str) -> Self {
        Self {
            chars: line.chars().collect(),
            index: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.index + n).copied()
    }

    fn eat(&mut self) {
        self.skip(1);
    }

    fn skip(&mut self, n: usize) {
        self.index = (self.index + n).min(self.chars.len());
    }

    fn column(&self) -> usize {
        self.index + 1
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn count_while(&self, pred: impl Fn(char) -> bool) -> usize {
        word_end(&self.chars[self.index..], pred)
    }

    fn boundary_at(&self, n: usize, pred: impl Fn(char) -> bool) -> bool {
        n != 0 && self.peek_at(n).map_or(true, pred)
    }

    fn peek_str(&self, n: usize) -> String {
        self.chars[self.index..self.index + n].iter().collect()
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let n = self.count_while(pred);
        let text = self.peek_str(n);
        self.skip(n);
        text
    }

    /// Takes everything up to `end`, consuming `end`. Consumes nothing if `end` never comes.
    fn until(&mut self, end: char) -> Option<String> {
        let n = self.chars[self.index..].iter().position(|c| *c == end)?;
        let text = self.peek_str(n);
        self.skip(n + 1);
        Some(text)
    }

    fn rest(&mut self) -> String {
        self.take_while(|_| true)
    }
}

/// Length of the run of characters matching `pred`.
fn word_end(chars: &[char], pred: impl Fn(char) -> bool) -> usize {
    chars.iter().take_while(|c| pred(**c)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, MemLoader};
    use tempfile::TempDir;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|tok| tok.kind).collect()
    }

    fn lex(text: &str) -> Vec<Token> {
        lex_with(Mpu::M65816, Notation::San, text)
    }

    fn lex_with(mpu: Mpu, notation: Notation, text: &str) -> Vec<Token> {
        let mut diag = Diagnostics::new();
        testing::tokenize(mpu, notation, text, &mut diag).unwrap()
    }

    fn lex_err(text: &str) -> Diagnostics {
        let mut diag = Diagnostics::new();
        let loader = MemLoader::new(&[("test.s", text)]);
        let result = Lexer::new(Mpu::M65816, Notation::San, &loader, &mut diag).run("test.s");
        assert!(matches!(result, Err(AsmError::Lexical(n)) if n == diag.count()));
        diag
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn end_of_binary_word() {
        assert_eq!(word_end(&chars("0010:"), is_bin_char), 5);
        assert_eq!(word_end(&chars("0010}"), is_bin_char), 4);
        assert_eq!(word_end(&chars("2001"), is_bin_char), 0);
    }

    #[test]
    fn end_of_decimal_word() {
        assert_eq!(word_end(&chars("0:"), is_dec_char), 1);
        assert_eq!(word_end(&chars("2009}"), is_dec_char), 4);
        assert_eq!(word_end(&chars("+1"), is_dec_char), 0);
    }

    #[test]
    fn end_of_hex_word() {
        assert_eq!(word_end(&chars("a:a"), is_hex_char), 3);
        assert_eq!(word_end(&chars("aa:2009}"), is_hex_char), 7);
        assert_eq!(word_end(&chars("+1"), is_hex_char), 0);
    }

    #[test]
    fn numbers() {
        let tokens = lex(".byte %10:1100. $a:2009 {2009}");
        assert_eq!(
            kinds(&tokens),
            [
                TokenKind::DirectivePara,
                TokenKind::BinNum,
                TokenKind::HexNum,
                TokenKind::LeftCurly,
                TokenKind::DecNum,
                TokenKind::RightCurly,
                TokenKind::Eol,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[1].text, "10:1100.");
        assert_eq!(tokens[2].text, "a:2009");
        assert_eq!(tokens[4].text, "2009");
        assert_eq!(tokens[4].pos.column, 26);
    }

    #[test]
    fn one_eol_per_line() {
        let text = "\n; header\nloop: lda.# 1 ; load\n\n  .native\n   \nrts";
        let tokens = lex(text);
        let eols = tokens.iter().filter(|tok| tok.kind == TokenKind::Eol).count();
        assert_eq!(eols, 7);
        assert_eq!(tokens.last().map(|tok| tok.kind), Some(TokenKind::Eof));
        assert_eq!(tokens.last().map(|tok| tok.pos.line), Some(8));
        assert_eq!(tokens[0].kind, TokenKind::Empty);
        assert_eq!(tokens[2].kind, TokenKind::CommentLine);
        assert_eq!(tokens[2].text, "; header");
    }

    #[test]
    fn positions_are_one_based() {
        let tokens = lex("  lda.# $10");
        assert_eq!(tokens[0].kind, TokenKind::Opc1);
        assert_eq!((tokens[0].pos.line, tokens[0].pos.column), (1, 3));
        assert_eq!(tokens[1].pos.column, 9);
        assert_eq!(&*tokens[0].pos.file, "test.s");
    }

    #[test]
    fn lexemes_tokenize_to_the_same_kind() {
        let text = "loop: _local: @ lda.# nop mvn .native .byte ... sym + - * / & | ~ ^ < > # , ( ) [ ] { } = \"s\" %1 $f 9 ; note";
        for tok in lex(text) {
            if matches!(tok.kind, TokenKind::Eol | TokenKind::Eof) {
                continue;
            }
            let again = lex(&tok.lexeme());
            // a trailing comment on its own is a whole-line comment
            let kind = match tok.kind {
                TokenKind::Comment => TokenKind::CommentLine,
                kind => kind,
            };
            assert_eq!(again[0].kind, kind, "{tok}");
            assert_eq!(again[0].text, tok.text, "{tok}");
        }
    }

    #[test]
    fn include_lexeme_needs_its_file_name() {
        let loader = MemLoader::new(&[("test.s", ".include \"defs.s\""), ("defs.s", "rts")]);
        let mut diag = Diagnostics::new();
        let tokens = Lexer::new(Mpu::M65816, Notation::San, &loader, &mut diag)
            .run("test.s")
            .unwrap();
        let include = tokens
            .iter()
            .find(|tok| tok.kind == TokenKind::DirectivePara)
            .unwrap();
        assert_eq!(include.lexeme(), ".include");

        let diag = lex_err(&include.lexeme());
        assert_eq!(diag.count(), 1);
        assert!(diag.reports()[0].message.contains("quoted file name"));
    }

    #[test]
    fn labels_and_symbols() {
        let tokens = lex("start: _next: @ start _next");
        assert_eq!(
            kinds(&tokens[..5]),
            [
                TokenKind::Label,
                TokenKind::LocalLabel,
                TokenKind::AnonLabel,
                TokenKind::Symbol,
                TokenKind::Symbol,
            ]
        );
        assert_eq!(tokens[0].text, "start");
        assert_eq!(tokens[1].text, "_next");
    }

    #[test]
    fn mnemonics_need_a_word_boundary() {
        let tokens = lex("nop2 nop: nop");
        assert_eq!(tokens[0].kind, TokenKind::Symbol);
        assert_eq!(tokens[0].text, "nop2");
        assert_eq!(tokens[1].kind, TokenKind::Label);
        assert_eq!(tokens[2].kind, TokenKind::Opc0);
    }

    #[test]
    fn mnemonic_operand_counts() {
        let tokens = lex("LDA.# 1\nmvp 1 2\nrts");
        assert_eq!(tokens[0].kind, TokenKind::Opc1);
        assert_eq!(tokens[0].text, "LDA.#");
        assert_eq!(tokens[3].kind, TokenKind::Opc2);
        assert_eq!(tokens[7].kind, TokenKind::Opc0);
    }

    #[test]
    fn other_processor_mnemonics_are_still_mnemonics() {
        let tokens = lex_with(Mpu::M6502, Notation::San, "phe.# $1234");
        assert_eq!(tokens[0].kind, TokenKind::Opc1);
    }

    #[test]
    fn wdc_mnemonics() {
        let tokens = lex_with(Mpu::M65c02, Notation::Wdc, "lda #$10\nnop\nasl\nldx: lda.# 1");
        assert_eq!(
            kinds(&tokens[..4]),
            [
                TokenKind::WdcOp,
                TokenKind::Hash,
                TokenKind::HexNum,
                TokenKind::Eol
            ]
        );
        assert_eq!(tokens[4].kind, TokenKind::WdcOp0);
        assert_eq!(tokens[6].kind, TokenKind::WdcOp);
        assert_eq!(tokens[8].kind, TokenKind::Label);
        assert_eq!(tokens[9].kind, TokenKind::Symbol);
    }

    #[test]
    fn ellipsis_between_numbers() {
        let tokens = lex(".ram 1...4");
        assert_eq!(
            kinds(&tokens[..4]),
            [
                TokenKind::DirectivePara,
                TokenKind::DecNum,
                TokenKind::Ellipsis,
                TokenKind::DecNum
            ]
        );
    }

    #[test]
    fn trailing_comment() {
        let tokens = lex("rts ; done  ");
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(tokens[1].text, "; done");
        assert_eq!(tokens[2].kind, TokenKind::Eol);
    }

    #[test]
    fn unterminated_string() {
        let diag = lex_err(".byte 1\n.byte \"abc, 2\nrts");
        assert_eq!(diag.count(), 1);
        let report = &diag.reports()[0];
        assert_eq!((report.pos.line, report.pos.column), (2, 7));
        assert!(report.message.contains("quotation"));
    }

    #[test]
    fn scanning_continues_after_errors() {
        let diag = lex_err(".bogus 1\nlda.# `\n_1 rts");
        assert_eq!(diag.count(), 3);
        assert_eq!(diag.reports()[0].pos.line, 1);
        assert_eq!(diag.reports()[1].pos.column, 7);
        assert_eq!(diag.reports()[2].pos.line, 3);
    }

    #[test]
    fn include_splices_tokens() {
        let loader = MemLoader::new(&[
            ("main.s", "lda.# 1\n.include \"inc.s\"\nrts"),
            ("inc.s", "nop"),
        ]);
        let mut diag = Diagnostics::new();
        let tokens = Lexer::new(Mpu::M65c02, Notation::San, &loader, &mut diag)
            .run("main.s")
            .unwrap();
        assert_eq!(
            kinds(&tokens),
            [
                TokenKind::Opc1,
                TokenKind::DecNum,
                TokenKind::Eol,
                TokenKind::Opc0,
                TokenKind::Eol,
                TokenKind::DirectivePara,
                TokenKind::Str,
                TokenKind::Eol,
                TokenKind::Opc0,
                TokenKind::Eol,
                TokenKind::Eof,
            ]
        );
        assert_eq!(&*tokens[3].pos.file, "inc.s");
        assert_eq!(tokens[6].text, "inc.s");
        assert_eq!(&*tokens[8].pos.file, "main.s");
        assert_eq!(tokens[8].pos.line, 3);
    }

    #[test]
    fn recursive_include() {
        let loader = MemLoader::new(&[
            ("a.s", ".include \"b.s\""),
            ("b.s", "nop\n.include \"a.s\""),
        ]);
        let mut diag = Diagnostics::new();
        let result = Lexer::new(Mpu::M65c02, Notation::San, &loader, &mut diag).run("a.s");
        assert!(matches!(result, Err(AsmError::Lexical(1))));
        assert!(diag.reports()[0].message.contains("recursive"));
        assert_eq!(&*diag.reports()[0].pos.file, "b.s");
    }

    #[test]
    fn missing_include() {
        let diag = lex_err(".include \"nope.s\"");
        assert_eq!(diag.count(), 1);
        assert_eq!(diag.reports()[0].pos.column, 10);
    }

    #[test]
    fn filesystem_include_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let inc = root.join("inc");
        fs::create_dir_all(&inc).unwrap();
        fs::write(root.join("main.s"), ".include \"defs.s\"\n").unwrap();
        fs::write(inc.join("defs.s"), "rts\n").unwrap();

        let loader = FsLoader::new(vec![inc.clone()]);
        let main = root.join("main.s");
        let mut diag = Diagnostics::new();
        let tokens = Lexer::new(Mpu::M6502, Notation::San, &loader, &mut diag)
            .run(main.to_str().unwrap())
            .unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Opc0);
        assert!(tokens[0].pos.file.ends_with("defs.s"));

        let missing = FsLoader::default().load("defs.s", main.to_str());
        assert!(missing.is_err());
    }
}
