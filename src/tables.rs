use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::Mpu;

/// Addressing mode of an opcode, named after the operand layout in the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Addr {
    Imp, //
    Acc, // A
    Imm, // #$00
    Sr,  // $00,S
    Dp,  // $00
    Dpx, // $00,X
    Dpy, // $00,Y
    Idp, // ($00)
    Idx, // ($00,X)
    Idy, // ($00),Y
    Idl, // [$00]
    Ily, // [$00],Y
    Isy, // ($00,S),Y
    Abs, // $0000
    Abx, // $0000,X
    Aby, // $0000,Y
    Abl, // $000000
    Alx, // $000000,X
    Iab, // ($0000)
    Iax, // ($0000,X)
    Ial, // [$000000]
    Rel, // PC+$00
    Rll, // PC+$0000
    Bm,  // #$00,#$00
}

/// Operand syntax of a WDC-notation instruction as written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Implied,         //
    Accumulator,     // a
    Immediate,       // #e
    Plain,           // e
    IndexX,          // e,x
    IndexY,          // e,y
    Stack,           // e,s
    Indirect,        // (e)
    IndexedIndirect, // (e,x)
    IndirectY,       // (e),y
    StackIndirectY,  // (e,s),y
    IndirectLong,    // [e]
    IndirectLongY,   // [e],y
    BlockMove,       // e,e
}

/// Operand size class used to pick between direct page, absolute and long forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Byte,
    Word,
    Long,
}

impl Size {
    pub fn of(value: i64) -> Self {
        match value {
            v if (0..=0xFF).contains(&v) => Size::Byte,
            v if v > 0xFFFF => Size::Long,
            _ => Size::Word,
        }
    }
}

impl Syntax {
    /// Addressing modes this syntax may assemble to, most preferred first.
    /// An operand of unknown size prefers the absolute forms.
    pub fn candidates(self, size: Option<Size>) -> &'static [Addr] {
        use Addr::*;
        #[rustfmt::skip]
        let modes: &'static [Addr] = match (self, size) {
            (Syntax::Implied, _)                   => &[Imp, Acc],
            (Syntax::Accumulator, _)               => &[Acc],
            (Syntax::Immediate, _)                 => &[Imm],
            (Syntax::Plain, Some(Size::Byte))      => &[Rel, Rll, Dp, Abs, Abl, Imm],
            (Syntax::Plain, Some(Size::Long))      => &[Rel, Rll, Abl, Abs, Dp, Imm],
            (Syntax::Plain, _)                     => &[Rel, Rll, Abs, Abl, Dp, Imm],
            (Syntax::IndexX, Some(Size::Byte))     => &[Dpx, Abx, Alx],
            (Syntax::IndexX, Some(Size::Long))     => &[Alx, Abx, Dpx],
            (Syntax::IndexX, _)                    => &[Abx, Alx, Dpx],
            (Syntax::IndexY, Some(Size::Byte))     => &[Dpy, Aby],
            (Syntax::IndexY, _)                    => &[Aby, Dpy],
            (Syntax::Stack, _)                     => &[Sr],
            (Syntax::Indirect, Some(Size::Byte))   => &[Idp, Iab],
            (Syntax::Indirect, _)                  => &[Iab, Idp],
            (Syntax::IndexedIndirect, Some(Size::Byte)) => &[Idx, Iax],
            (Syntax::IndexedIndirect, _)           => &[Iax, Idx],
            (Syntax::IndirectY, _)                 => &[Idy],
            (Syntax::StackIndirectY, _)            => &[Isy],
            (Syntax::IndirectLong, Some(Size::Byte)) => &[Idl, Ial],
            (Syntax::IndirectLong, _)              => &[Ial, Idl],
            (Syntax::IndirectLongY, _)             => &[Ily],
            (Syntax::BlockMove, _)                 => &[Bm],
        };
        modes
    }
}

/// One opcode of the 65xx family.
#[derive(Debug, PartialEq, Eq)]
pub struct Opcode {
    /// Typist's Assembler Notation mnemonic, mode suffix included (`lda.dxi`).
    pub san: &'static str,
    /// Bare three-letter WDC mnemonic.
    pub wdc: &'static str,
    /// Instruction length in bytes in 8-bit register mode.
    pub len: u8,
    /// Operand count as written in source.
    pub operands: u8,
    pub code: u8,
    pub addr: Addr,
    /// Immediate operand grows by a byte when the 65816 register it targets is 16 bits wide.
    pub embiggens: bool,
    /// First processor that provides the opcode.
    pub since: Mpu,
}

impl Opcode {
    /// Whether the length of this opcode depends on the register width on `mpu`.
    pub fn varies(&self, mpu: Mpu) -> bool {
        self.embiggens && mpu == Mpu::M65816
    }
}

const M02: Mpu = Mpu::M6502;
const C02: Mpu = Mpu::M65c02;
const M16: Mpu = Mpu::M65816;
const BIG: bool = true;
const ___: bool = false;

#[allow(clippy::too_many_arguments)]
const fn op(
    since: Mpu,
    san: &'static str,
    wdc: &'static str,
    len: u8,
    operands: u8,
    code: u8,
    addr: Addr,
    embiggens: bool,
) -> Opcode {
    Opcode {
        san,
        wdc,
        len,
        operands,
        code,
        addr,
        embiggens,
        since,
    }
}

#[rustfmt::skip]
pub static OPCODES: [Opcode; 256] = [
    op(M02, "brk",      "brk", 2, 1, 0x00, Addr::Imm, ___),
    op(M02, "ora.dxi",  "ora", 2, 1, 0x01, Addr::Idx, ___),
    op(M16, "cop",      "cop", 2, 1, 0x02, Addr::Imm, ___),
    op(M16, "ora.s",    "ora", 2, 1, 0x03, Addr::Sr,  ___),
    op(C02, "tsb.d",    "tsb", 2, 1, 0x04, Addr::Dp,  ___),
    op(M02, "ora.d",    "ora", 2, 1, 0x05, Addr::Dp,  ___),
    op(M02, "asl.d",    "asl", 2, 1, 0x06, Addr::Dp,  ___),
    op(M16, "ora.dil",  "ora", 2, 1, 0x07, Addr::Idl, ___),
    op(M02, "php",      "php", 1, 0, 0x08, Addr::Imp, ___),
    op(M02, "ora.#",    "ora", 2, 1, 0x09, Addr::Imm, BIG),
    op(M02, "asl.a",    "asl", 1, 0, 0x0A, Addr::Acc, ___),
    op(M16, "phd",      "phd", 1, 0, 0x0B, Addr::Imp, ___),
    op(C02, "tsb",      "tsb", 3, 1, 0x0C, Addr::Abs, ___),
    op(M02, "ora",      "ora", 3, 1, 0x0D, Addr::Abs, ___),
    op(M02, "asl",      "asl", 3, 1, 0x0E, Addr::Abs, ___),
    op(M16, "ora.l",    "ora", 4, 1, 0x0F, Addr::Abl, ___),
    op(M02, "bpl",      "bpl", 2, 1, 0x10, Addr::Rel, ___),
    op(M02, "ora.diy",  "ora", 2, 1, 0x11, Addr::Idy, ___),
    op(C02, "ora.di",   "ora", 2, 1, 0x12, Addr::Idp, ___),
    op(M16, "ora.siy",  "ora", 2, 1, 0x13, Addr::Isy, ___),
    op(C02, "trb.d",    "trb", 2, 1, 0x14, Addr::Dp,  ___),
    op(M02, "ora.dx",   "ora", 2, 1, 0x15, Addr::Dpx, ___),
    op(M02, "asl.dx",   "asl", 2, 1, 0x16, Addr::Dpx, ___),
    op(M16, "ora.dily", "ora", 2, 1, 0x17, Addr::Ily, ___),
    op(M02, "clc",      "clc", 1, 0, 0x18, Addr::Imp, ___),
    op(M02, "ora.y",    "ora", 3, 1, 0x19, Addr::Aby, ___),
    op(C02, "inc.a",    "inc", 1, 0, 0x1A, Addr::Acc, ___),
    op(M16, "tcs",      "tcs", 1, 0, 0x1B, Addr::Imp, ___),
    op(C02, "trb",      "trb", 3, 1, 0x1C, Addr::Abs, ___),
    op(M02, "ora.x",    "ora", 3, 1, 0x1D, Addr::Abx, ___),
    op(M02, "asl.x",    "asl", 3, 1, 0x1E, Addr::Abx, ___),
    op(M16, "ora.lx",   "ora", 4, 1, 0x1F, Addr::Alx, ___),
    op(M02, "jsr",      "jsr", 3, 1, 0x20, Addr::Abs, ___),
    op(M02, "and.dxi",  "and", 2, 1, 0x21, Addr::Idx, ___),
    op(M16, "jsr.l",    "jsl", 4, 1, 0x22, Addr::Abl, ___),
    op(M16, "and.s",    "and", 2, 1, 0x23, Addr::Sr,  ___),
    op(M02, "bit.d",    "bit", 2, 1, 0x24, Addr::Dp,  ___),
    op(M02, "and.d",    "and", 2, 1, 0x25, Addr::Dp,  ___),
    op(M02, "rol.d",    "rol", 2, 1, 0x26, Addr::Dp,  ___),
    op(M16, "and.dil",  "and", 2, 1, 0x27, Addr::Idl, ___),
    op(M02, "plp",      "plp", 1, 0, 0x28, Addr::Imp, ___),
    op(M02, "and.#",    "and", 2, 1, 0x29, Addr::Imm, BIG),
    op(M02, "rol.a",    "rol", 1, 0, 0x2A, Addr::Acc, ___),
    op(M16, "pld",      "pld", 1, 0, 0x2B, Addr::Imp, ___),
    op(M02, "bit",      "bit", 3, 1, 0x2C, Addr::Abs, ___),
    op(M02, "and",      "and", 3, 1, 0x2D, Addr::Abs, ___),
    op(M02, "rol",      "rol", 3, 1, 0x2E, Addr::Abs, ___),
    op(M16, "and.l",    "and", 4, 1, 0x2F, Addr::Abl, ___),
    op(M02, "bmi",      "bmi", 2, 1, 0x30, Addr::Rel, ___),
    op(M02, "and.diy",  "and", 2, 1, 0x31, Addr::Idy, ___),
    op(C02, "and.di",   "and", 2, 1, 0x32, Addr::Idp, ___),
    op(M16, "and.siy",  "and", 2, 1, 0x33, Addr::Isy, ___),
    op(C02, "bit.dx",   "bit", 2, 1, 0x34, Addr::Dpx, ___),
    op(M02, "and.dx",   "and", 2, 1, 0x35, Addr::Dpx, ___),
    op(M02, "rol.dx",   "rol", 2, 1, 0x36, Addr::Dpx, ___),
    op(M16, "and.dily", "and", 2, 1, 0x37, Addr::Ily, ___),
    op(M02, "sec",      "sec", 1, 0, 0x38, Addr::Imp, ___),
    op(M02, "and.y",    "and", 3, 1, 0x39, Addr::Aby, ___),
    op(C02, "dec.a",    "dec", 1, 0, 0x3A, Addr::Acc, ___),
    op(M16, "tsc",      "tsc", 1, 0, 0x3B, Addr::Imp, ___),
    op(C02, "bit.x",    "bit", 3, 1, 0x3C, Addr::Abx, ___),
    op(M02, "and.x",    "and", 3, 1, 0x3D, Addr::Abx, ___),
    op(M02, "rol.x",    "rol", 3, 1, 0x3E, Addr::Abx, ___),
    op(M16, "and.lx",   "and", 4, 1, 0x3F, Addr::Alx, ___),
    op(M02, "rti",      "rti", 1, 0, 0x40, Addr::Imp, ___),
    op(M02, "eor.dxi",  "eor", 2, 1, 0x41, Addr::Idx, ___),
    op(M16, "wdm",      "wdm", 2, 1, 0x42, Addr::Imm, ___),
    op(M16, "eor.s",    "eor", 2, 1, 0x43, Addr::Sr,  ___),
    op(M16, "mvp",      "mvp", 3, 2, 0x44, Addr::Bm,  ___),
    op(M02, "eor.d",    "eor", 2, 1, 0x45, Addr::Dp,  ___),
    op(M02, "lsr.d",    "lsr", 2, 1, 0x46, Addr::Dp,  ___),
    op(M16, "eor.dil",  "eor", 2, 1, 0x47, Addr::Idl, ___),
    op(M02, "pha",      "pha", 1, 0, 0x48, Addr::Imp, ___),
    op(M02, "eor.#",    "eor", 2, 1, 0x49, Addr::Imm, BIG),
    op(M02, "lsr.a",    "lsr", 1, 0, 0x4A, Addr::Acc, ___),
    op(M16, "phk",      "phk", 1, 0, 0x4B, Addr::Imp, ___),
    op(M02, "jmp",      "jmp", 3, 1, 0x4C, Addr::Abs, ___),
    op(M02, "eor",      "eor", 3, 1, 0x4D, Addr::Abs, ___),
    op(M02, "lsr",      "lsr", 3, 1, 0x4E, Addr::Abs, ___),
    op(M16, "eor.l",    "eor", 4, 1, 0x4F, Addr::Abl, ___),
    op(M02, "bvc",      "bvc", 2, 1, 0x50, Addr::Rel, ___),
    op(M02, "eor.diy",  "eor", 2, 1, 0x51, Addr::Idy, ___),
    op(C02, "eor.di",   "eor", 2, 1, 0x52, Addr::Idp, ___),
    op(M16, "eor.siy",  "eor", 2, 1, 0x53, Addr::Isy, ___),
    op(M16, "mvn",      "mvn", 3, 2, 0x54, Addr::Bm,  ___),
    op(M02, "eor.dx",   "eor", 2, 1, 0x55, Addr::Dpx, ___),
    op(M02, "lsr.dx",   "lsr", 2, 1, 0x56, Addr::Dpx, ___),
    op(M16, "eor.dily", "eor", 2, 1, 0x57, Addr::Ily, ___),
    op(M02, "cli",      "cli", 1, 0, 0x58, Addr::Imp, ___),
    op(M02, "eor.y",    "eor", 3, 1, 0x59, Addr::Aby, ___),
    op(C02, "phy",      "phy", 1, 0, 0x5A, Addr::Imp, ___),
    op(M16, "tcd",      "tcd", 1, 0, 0x5B, Addr::Imp, ___),
    op(M16, "jmp.l",    "jml", 4, 1, 0x5C, Addr::Abl, ___),
    op(M02, "eor.x",    "eor", 3, 1, 0x5D, Addr::Abx, ___),
    op(M02, "lsr.x",    "lsr", 3, 1, 0x5E, Addr::Abx, ___),
    op(M16, "eor.lx",   "eor", 4, 1, 0x5F, Addr::Alx, ___),
    op(M02, "rts",      "rts", 1, 0, 0x60, Addr::Imp, ___),
    op(M02, "adc.dxi",  "adc", 2, 1, 0x61, Addr::Idx, ___),
    op(M16, "phe.r",    "per", 3, 1, 0x62, Addr::Rll, ___),
    op(M16, "adc.s",    "adc", 2, 1, 0x63, Addr::Sr,  ___),
    op(C02, "stz.d",    "stz", 2, 1, 0x64, Addr::Dp,  ___),
    op(M02, "adc.d",    "adc", 2, 1, 0x65, Addr::Dp,  ___),
    op(M02, "ror.d",    "ror", 2, 1, 0x66, Addr::Dp,  ___),
    op(M16, "adc.dil",  "adc", 2, 1, 0x67, Addr::Idl, ___),
    op(M02, "pla",      "pla", 1, 0, 0x68, Addr::Imp, ___),
    op(M02, "adc.#",    "adc", 2, 1, 0x69, Addr::Imm, BIG),
    op(M02, "ror.a",    "ror", 1, 0, 0x6A, Addr::Acc, ___),
    op(M16, "rts.l",    "rtl", 1, 0, 0x6B, Addr::Imp, ___),
    op(M02, "jmp.i",    "jmp", 3, 1, 0x6C, Addr::Iab, ___),
    op(M02, "adc",      "adc", 3, 1, 0x6D, Addr::Abs, ___),
    op(M02, "ror",      "ror", 3, 1, 0x6E, Addr::Abs, ___),
    op(M16, "adc.l",    "adc", 4, 1, 0x6F, Addr::Abl, ___),
    op(M02, "bvs",      "bvs", 2, 1, 0x70, Addr::Rel, ___),
    op(M02, "adc.diy",  "adc", 2, 1, 0x71, Addr::Idy, ___),
    op(C02, "adc.di",   "adc", 2, 1, 0x72, Addr::Idp, ___),
    op(M16, "adc.siy",  "adc", 2, 1, 0x73, Addr::Isy, ___),
    op(C02, "stz.dx",   "stz", 2, 1, 0x74, Addr::Dpx, ___),
    op(M02, "adc.dx",   "adc", 2, 1, 0x75, Addr::Dpx, ___),
    op(M02, "ror.dx",   "ror", 2, 1, 0x76, Addr::Dpx, ___),
    op(M16, "adc.dily", "adc", 2, 1, 0x77, Addr::Ily, ___),
    op(M02, "sei",      "sei", 1, 0, 0x78, Addr::Imp, ___),
    op(M02, "adc.y",    "adc", 3, 1, 0x79, Addr::Aby, ___),
    op(C02, "ply",      "ply", 1, 0, 0x7A, Addr::Imp, ___),
    op(M16, "tdc",      "tdc", 1, 0, 0x7B, Addr::Imp, ___),
    op(C02, "jmp.xi",   "jmp", 3, 1, 0x7C, Addr::Iax, ___),
    op(M02, "adc.x",    "adc", 3, 1, 0x7D, Addr::Abx, ___),
    op(M02, "ror.x",    "ror", 3, 1, 0x7E, Addr::Abx, ___),
    op(M16, "adc.lx",   "adc", 4, 1, 0x7F, Addr::Alx, ___),
    op(C02, "bra",      "bra", 2, 1, 0x80, Addr::Rel, ___),
    op(M02, "sta.dxi",  "sta", 2, 1, 0x81, Addr::Idx, ___),
    op(M16, "bra.l",    "brl", 3, 1, 0x82, Addr::Rll, ___),
    op(M16, "sta.s",    "sta", 2, 1, 0x83, Addr::Sr,  ___),
    op(M02, "sty.d",    "sty", 2, 1, 0x84, Addr::Dp,  ___),
    op(M02, "sta.d",    "sta", 2, 1, 0x85, Addr::Dp,  ___),
    op(M02, "stx.d",    "stx", 2, 1, 0x86, Addr::Dp,  ___),
    op(M16, "sta.dil",  "sta", 2, 1, 0x87, Addr::Idl, ___),
    op(M02, "dey",      "dey", 1, 0, 0x88, Addr::Imp, ___),
    op(C02, "bit.#",    "bit", 2, 1, 0x89, Addr::Imm, BIG),
    op(M02, "txa",      "txa", 1, 0, 0x8A, Addr::Imp, ___),
    op(M16, "phb",      "phb", 1, 0, 0x8B, Addr::Imp, ___),
    op(M02, "sty",      "sty", 3, 1, 0x8C, Addr::Abs, ___),
    op(M02, "sta",      "sta", 3, 1, 0x8D, Addr::Abs, ___),
    op(M02, "stx",      "stx", 3, 1, 0x8E, Addr::Abs, ___),
    op(M16, "sta.l",    "sta", 4, 1, 0x8F, Addr::Abl, ___),
    op(M02, "bcc",      "bcc", 2, 1, 0x90, Addr::Rel, ___),
    op(M02, "sta.diy",  "sta", 2, 1, 0x91, Addr::Idy, ___),
    op(C02, "sta.di",   "sta", 2, 1, 0x92, Addr::Idp, ___),
    op(M16, "sta.siy",  "sta", 2, 1, 0x93, Addr::Isy, ___),
    op(M02, "sty.dx",   "sty", 2, 1, 0x94, Addr::Dpx, ___),
    op(M02, "sta.dx",   "sta", 2, 1, 0x95, Addr::Dpx, ___),
    op(M02, "stx.dy",   "stx", 2, 1, 0x96, Addr::Dpy, ___),
    op(M16, "sta.dily", "sta", 2, 1, 0x97, Addr::Ily, ___),
    op(M02, "tya",      "tya", 1, 0, 0x98, Addr::Imp, ___),
    op(M02, "sta.y",    "sta", 3, 1, 0x99, Addr::Aby, ___),
    op(M02, "txs",      "txs", 1, 0, 0x9A, Addr::Imp, ___),
    op(M16, "txy",      "txy", 1, 0, 0x9B, Addr::Imp, ___),
    op(C02, "stz",      "stz", 3, 1, 0x9C, Addr::Abs, ___),
    op(M02, "sta.x",    "sta", 3, 1, 0x9D, Addr::Abx, ___),
    op(C02, "stz.x",    "stz", 3, 1, 0x9E, Addr::Abx, ___),
    op(M16, "sta.lx",   "sta", 4, 1, 0x9F, Addr::Alx, ___),
    op(M02, "ldy.#",    "ldy", 2, 1, 0xA0, Addr::Imm, BIG),
    op(M02, "lda.dxi",  "lda", 2, 1, 0xA1, Addr::Idx, ___),
    op(M02, "ldx.#",    "ldx", 2, 1, 0xA2, Addr::Imm, BIG),
    op(M16, "lda.s",    "lda", 2, 1, 0xA3, Addr::Sr,  ___),
    op(M02, "ldy.d",    "ldy", 2, 1, 0xA4, Addr::Dp,  ___),
    op(M02, "lda.d",    "lda", 2, 1, 0xA5, Addr::Dp,  ___),
    op(M02, "ldx.d",    "ldx", 2, 1, 0xA6, Addr::Dp,  ___),
    op(M16, "lda.dil",  "lda", 2, 1, 0xA7, Addr::Idl, ___),
    op(M02, "tay",      "tay", 1, 0, 0xA8, Addr::Imp, ___),
    op(M02, "lda.#",    "lda", 2, 1, 0xA9, Addr::Imm, BIG),
    op(M02, "tax",      "tax", 1, 0, 0xAA, Addr::Imp, ___),
    op(M16, "plb",      "plb", 1, 0, 0xAB, Addr::Imp, ___),
    op(M02, "ldy",      "ldy", 3, 1, 0xAC, Addr::Abs, ___),
    op(M02, "lda",      "lda", 3, 1, 0xAD, Addr::Abs, ___),
    op(M02, "ldx",      "ldx", 3, 1, 0xAE, Addr::Abs, ___),
    op(M16, "lda.l",    "lda", 4, 1, 0xAF, Addr::Abl, ___),
    op(M02, "bcs",      "bcs", 2, 1, 0xB0, Addr::Rel, ___),
    op(M02, "lda.diy",  "lda", 2, 1, 0xB1, Addr::Idy, ___),
    op(C02, "lda.di",   "lda", 2, 1, 0xB2, Addr::Idp, ___),
    op(M16, "lda.siy",  "lda", 2, 1, 0xB3, Addr::Isy, ___),
    op(M02, "ldy.dx",   "ldy", 2, 1, 0xB4, Addr::Dpx, ___),
    op(M02, "lda.dx",   "lda", 2, 1, 0xB5, Addr::Dpx, ___),
    op(M02, "ldx.dy",   "ldx", 2, 1, 0xB6, Addr::Dpy, ___),
    op(M16, "lda.dily", "lda", 2, 1, 0xB7, Addr::Ily, ___),
    op(M02, "clv",      "clv", 1, 0, 0xB8, Addr::Imp, ___),
    op(M02, "lda.y",    "lda", 3, 1, 0xB9, Addr::Aby, ___),
    op(M02, "tsx",      "tsx", 1, 0, 0xBA, Addr::Imp, ___),
    op(M16, "tyx",      "tyx", 1, 0, 0xBB, Addr::Imp, ___),
    op(M02, "ldy.x",    "ldy", 3, 1, 0xBC, Addr::Abx, ___),
    op(M02, "lda.x",    "lda", 3, 1, 0xBD, Addr::Abx, ___),
    op(M02, "ldx.y",    "ldx", 3, 1, 0xBE, Addr::Aby, ___),
    op(M16, "lda.lx",   "lda", 4, 1, 0xBF, Addr::Alx, ___),
    op(M02, "cpy.#",    "cpy", 2, 1, 0xC0, Addr::Imm, BIG),
    op(M02, "cmp.dxi",  "cmp", 2, 1, 0xC1, Addr::Idx, ___),
    op(M16, "rep",      "rep", 2, 1, 0xC2, Addr::Imm, ___),
    op(M16, "cmp.s",    "cmp", 2, 1, 0xC3, Addr::Sr,  ___),
    op(M02, "cpy.d",    "cpy", 2, 1, 0xC4, Addr::Dp,  ___),
    op(M02, "cmp.d",    "cmp", 2, 1, 0xC5, Addr::Dp,  ___),
    op(M02, "dec.d",    "dec", 2, 1, 0xC6, Addr::Dp,  ___),
    op(M16, "cmp.dil",  "cmp", 2, 1, 0xC7, Addr::Idl, ___),
    op(M02, "iny",      "iny", 1, 0, 0xC8, Addr::Imp, ___),
    op(M02, "cmp.#",    "cmp", 2, 1, 0xC9, Addr::Imm, BIG),
    op(M02, "dex",      "dex", 1, 0, 0xCA, Addr::Imp, ___),
    op(C02, "wai",      "wai", 1, 0, 0xCB, Addr::Imp, ___),
    op(M02, "cpy",      "cpy", 3, 1, 0xCC, Addr::Abs, ___),
    op(M02, "cmp",      "cmp", 3, 1, 0xCD, Addr::Abs, ___),
    op(M02, "dec",      "dec", 3, 1, 0xCE, Addr::Abs, ___),
    op(M16, "cmp.l",    "cmp", 4, 1, 0xCF, Addr::Abl, ___),
    op(M02, "bne",      "bne", 2, 1, 0xD0, Addr::Rel, ___),
    op(M02, "cmp.diy",  "cmp", 2, 1, 0xD1, Addr::Idy, ___),
    op(C02, "cmp.di",   "cmp", 2, 1, 0xD2, Addr::Idp, ___),
    op(M16, "cmp.siy",  "cmp", 2, 1, 0xD3, Addr::Isy, ___),
    op(M16, "phe.d",    "pei", 2, 1, 0xD4, Addr::Idp, ___),
    op(M02, "cmp.dx",   "cmp", 2, 1, 0xD5, Addr::Dpx, ___),
    op(M02, "dec.dx",   "dec", 2, 1, 0xD6, Addr::Dpx, ___),
    op(M16, "cmp.dily", "cmp", 2, 1, 0xD7, Addr::Ily, ___),
    op(M02, "cld",      "cld", 1, 0, 0xD8, Addr::Imp, ___),
    op(M02, "cmp.y",    "cmp", 3, 1, 0xD9, Addr::Aby, ___),
    op(C02, "phx",      "phx", 1, 0, 0xDA, Addr::Imp, ___),
    op(C02, "stp",      "stp", 1, 0, 0xDB, Addr::Imp, ___),
    op(M16, "jmp.il",   "jml", 3, 1, 0xDC, Addr::Ial, ___),
    op(M02, "cmp.x",    "cmp", 3, 1, 0xDD, Addr::Abx, ___),
    op(M02, "dec.x",    "dec", 3, 1, 0xDE, Addr::Abx, ___),
    op(M16, "cmp.lx",   "cmp", 4, 1, 0xDF, Addr::Alx, ___),
    op(M02, "cpx.#",    "cpx", 2, 1, 0xE0, Addr::Imm, BIG),
    op(M02, "sbc.dxi",  "sbc", 2, 1, 0xE1, Addr::Idx, ___),
    op(M16, "sep",      "sep", 2, 1, 0xE2, Addr::Imm, ___),
    op(M16, "sbc.s",    "sbc", 2, 1, 0xE3, Addr::Sr,  ___),
    op(M02, "cpx.d",    "cpx", 2, 1, 0xE4, Addr::Dp,  ___),
    op(M02, "sbc.d",    "sbc", 2, 1, 0xE5, Addr::Dp,  ___),
    op(M02, "inc.d",    "inc", 2, 1, 0xE6, Addr::Dp,  ___),
    op(M16, "sbc.dil",  "sbc", 2, 1, 0xE7, Addr::Idl, ___),
    op(M02, "inx",      "inx", 1, 0, 0xE8, Addr::Imp, ___),
    op(M02, "sbc.#",    "sbc", 2, 1, 0xE9, Addr::Imm, BIG),
    op(M02, "nop",      "nop", 1, 0, 0xEA, Addr::Imp, ___),
    op(M16, "xba",      "xba", 1, 0, 0xEB, Addr::Imp, ___),
    op(M02, "cpx",      "cpx", 3, 1, 0xEC, Addr::Abs, ___),
    op(M02, "sbc",      "sbc", 3, 1, 0xED, Addr::Abs, ___),
    op(M02, "inc",      "inc", 3, 1, 0xEE, Addr::Abs, ___),
    op(M16, "sbc.l",    "sbc", 4, 1, 0xEF, Addr::Abl, ___),
    op(M02, "beq",      "beq", 2, 1, 0xF0, Addr::Rel, ___),
    op(M02, "sbc.diy",  "sbc", 2, 1, 0xF1, Addr::Idy, ___),
    op(C02, "sbc.di",   "sbc", 2, 1, 0xF2, Addr::Idp, ___),
    op(M16, "sbc.siy",  "sbc", 2, 1, 0xF3, Addr::Isy, ___),
    op(M16, "phe.#",    "pea", 3, 1, 0xF4, Addr::Abs, ___),
    op(M02, "sbc.dx",   "sbc", 2, 1, 0xF5, Addr::Dpx, ___),
    op(M02, "inc.dx",   "inc", 2, 1, 0xF6, Addr::Dpx, ___),
    op(M16, "sbc.dily", "sbc", 2, 1, 0xF7, Addr::Ily, ___),
    op(M02, "sed",      "sed", 1, 0, 0xF8, Addr::Imp, ___),
    op(M02, "sbc.y",    "sbc", 3, 1, 0xF9, Addr::Aby, ___),
    op(C02, "plx",      "plx", 1, 0, 0xFA, Addr::Imp, ___),
    op(M16, "xce",      "xce", 1, 0, 0xFB, Addr::Imp, ___),
    op(M16, "jsr.xi",   "jsr", 3, 1, 0xFC, Addr::Iax, ___),
    op(M02, "sbc.x",    "sbc", 3, 1, 0xFD, Addr::Abx, ___),
    op(M02, "inc.x",    "inc", 3, 1, 0xFE, Addr::Abx, ___),
    op(M16, "sbc.lx",   "sbc", 4, 1, 0xFF, Addr::Alx, ___),
];

/// The opcodes available on one processor, indexed for both notations.
#[derive(Debug)]
pub struct InstructionSet {
    mpu: Mpu,
    san: IndexMap<&'static str, &'static Opcode>,
    wdc: IndexMap<&'static str, Vec<&'static Opcode>>,
}

impl InstructionSet {
    fn build(mpu: Mpu) -> Self {
        let mut san = IndexMap::new();
        let mut wdc: IndexMap<&'static str, Vec<&'static Opcode>> = IndexMap::new();
        for op in OPCODES.iter().filter(|op| op.since <= mpu) {
            san.insert(op.san, op);
            wdc.entry(op.wdc).or_default().push(op);
        }
        tracing::trace!("{mpu}: {} opcodes, {} wdc mnemonics", san.len(), wdc.len());
        Self { mpu, san, wdc }
    }

    pub fn for_mpu(mpu: Mpu) -> &'static Self {
        static SETS: OnceLock<[InstructionSet; 3]> = OnceLock::new();
        let sets = SETS.get_or_init(|| {
            [
                Self::build(Mpu::M6502),
                Self::build(Mpu::M65c02),
                Self::build(Mpu::M65816),
            ]
        });
        match mpu {
            Mpu::M6502 => &sets[0],
            Mpu::M65c02 => &sets[1],
            Mpu::M65816 => &sets[2],
        }
    }

    /// The whole family; every mnemonic of every processor.
    pub fn family() -> &'static Self {
        Self::for_mpu(Mpu::M65816)
    }

    pub fn mpu(&self) -> Mpu {
        self.mpu
    }

    pub fn len(&self) -> usize {
        self.san.len()
    }

    pub fn is_empty(&self) -> bool {
        self.san.is_empty()
    }

    /// Looks up a SAN mnemonic. Matching ignores case.
    pub fn san(&self, mnemonic: &str) -> Option<&'static Opcode> {
        self.san.get(mnemonic.to_ascii_lowercase().as_str()).copied()
    }

    /// All variants of a WDC mnemonic. Matching ignores case.
    pub fn wdc(&self, mnemonic: &str) -> &[&'static Opcode] {
        self.wdc
            .get(mnemonic.to_ascii_lowercase().as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Picks the variant of a WDC mnemonic matching the written syntax.
    pub fn wdc_select(
        &self,
        mnemonic: &str,
        syntax: Syntax,
        size: Option<Size>,
    ) -> Option<&'static Opcode> {
        let variants = self.wdc(mnemonic);
        syntax
            .candidates(size)
            .iter()
            .find_map(|addr| variants.iter().find(|op| op.addr == *addr).copied())
    }
}

/// Directives that take parameters.
pub const PARAM_DIRECTIVES: &[&str] = &[
    ".mpu", ".notation", ".include", ".assert", ".origin", ".equ", ".byte", ".word", ".long",
    ".advance", ".skip", ".ram", ".rom",
];

/// Directives that stand alone. `.here` may also appear as a value.
pub const SIMPLE_DIRECTIVES: &[&str] = &[
    ".native", ".emulated", ".end", ".a8", ".a16", ".xy8", ".xy16", ".axy8", ".axy16", ".scope",
    ".scend", ".here",
];

#[rustfmt::skip]
pub const UNARY_OPS: &[&str] = &[
    ".lsb", ".msb", ".bank", ".invert",
    "-", "~", "<", ">", "^",
];

#[rustfmt::skip]
pub const BINARY_OPS: &[&str] = &[
    ".and", ".or", ".xor", ".lshift", ".rshift",
    "+", "-", "*", "/", "&", "|", "^",
];

/// Stack operators only meaningful inside an RPN term.
pub const STACK_OPS: &[&str] = &[".dup", ".drop", ".swap", ".over"];

pub fn is_directive(word: &str) -> bool {
    PARAM_DIRECTIVES.contains(&word) || SIMPLE_DIRECTIVES.contains(&word) || is_operator(word)
}

pub fn takes_params(word: &str) -> bool {
    PARAM_DIRECTIVES.contains(&word)
}

pub fn is_operator(word: &str) -> bool {
    is_unary(word) || is_binary(word) || STACK_OPS.contains(&word)
}

pub fn is_unary(word: &str) -> bool {
    UNARY_OPS.contains(&word)
}

pub fn is_binary(word: &str) -> bool {
    BINARY_OPS.contains(&word)
}

pub fn is_rpn(word: &str) -> bool {
    is_operator(word)
}
