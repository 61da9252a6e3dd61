// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The LOWL opcode set.
//!
//! `Opcode` is a closed enumeration of the user-visible mnemonics plus the
//! handful of implementation-internal codes the assembler lowers to
//! (`Halt`, `Noop`, `Gotbl`, `Mderch`, `Mdquit`, `Mdlabel`). User source
//! never names the internal codes; the scanner only recognizes the user
//! set, while the listing emitter can print and re-read every code.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Aal,
    Aav,
    Abv,
    Align,
    Andl,
    Andv,
    Bmove,
    Bstk,
    Bump,
    Cai,
    Cal,
    Cav,
    Cci,
    Ccl,
    Ccn,
    Cfstk,
    Clear,
    Con,
    Css,
    Dcl,
    Equ,
    Exit,
    Fmove,
    Fstk,
    Go,
    Goadd,
    Goeq,
    Goge,
    Gogr,
    Gole,
    Golt,
    Gond,
    Gone,
    Gopc,
    Gosub,
    Ident,
    Laa,
    Lai,
    Lal,
    Lam,
    Lav,
    Lbv,
    Lci,
    Lcm,
    Lcn,
    Mess,
    Multl,
    Nb,
    Nch,
    Prgen,
    Prgst,
    Sal,
    Sav,
    Sbl,
    Sbv,
    Sti,
    Str,
    Stv,
    Subr,
    Unstk,
    // implementation-internal codes
    Halt,
    Noop,
    Gotbl,
    Mderch,
    Mdquit,
    Mdlabel,
    Unknown,
}

/// Every opcode, in mnemonic order. Used by the bijection tests and the
/// listing decoder.
pub const ALL_OPCODES: &[Opcode] = &[
    Opcode::Aal,
    Opcode::Aav,
    Opcode::Abv,
    Opcode::Align,
    Opcode::Andl,
    Opcode::Andv,
    Opcode::Bmove,
    Opcode::Bstk,
    Opcode::Bump,
    Opcode::Cai,
    Opcode::Cal,
    Opcode::Cav,
    Opcode::Cci,
    Opcode::Ccl,
    Opcode::Ccn,
    Opcode::Cfstk,
    Opcode::Clear,
    Opcode::Con,
    Opcode::Css,
    Opcode::Dcl,
    Opcode::Equ,
    Opcode::Exit,
    Opcode::Fmove,
    Opcode::Fstk,
    Opcode::Go,
    Opcode::Goadd,
    Opcode::Goeq,
    Opcode::Goge,
    Opcode::Gogr,
    Opcode::Gole,
    Opcode::Golt,
    Opcode::Gond,
    Opcode::Gone,
    Opcode::Gopc,
    Opcode::Gosub,
    Opcode::Ident,
    Opcode::Laa,
    Opcode::Lai,
    Opcode::Lal,
    Opcode::Lam,
    Opcode::Lav,
    Opcode::Lbv,
    Opcode::Lci,
    Opcode::Lcm,
    Opcode::Lcn,
    Opcode::Mess,
    Opcode::Multl,
    Opcode::Nb,
    Opcode::Nch,
    Opcode::Prgen,
    Opcode::Prgst,
    Opcode::Sal,
    Opcode::Sav,
    Opcode::Sbl,
    Opcode::Sbv,
    Opcode::Sti,
    Opcode::Str,
    Opcode::Stv,
    Opcode::Subr,
    Opcode::Unstk,
    Opcode::Halt,
    Opcode::Noop,
    Opcode::Gotbl,
    Opcode::Mderch,
    Opcode::Mdquit,
    Opcode::Mdlabel,
    Opcode::Unknown,
];

impl Opcode {
    /// The mnemonic as it appears in source and listings.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Aal => "AAL",
            Opcode::Aav => "AAV",
            Opcode::Abv => "ABV",
            Opcode::Align => "ALIGN",
            Opcode::Andl => "ANDL",
            Opcode::Andv => "ANDV",
            Opcode::Bmove => "BMOVE",
            Opcode::Bstk => "BSTK",
            Opcode::Bump => "BUMP",
            Opcode::Cai => "CAI",
            Opcode::Cal => "CAL",
            Opcode::Cav => "CAV",
            Opcode::Cci => "CCI",
            Opcode::Ccl => "CCL",
            Opcode::Ccn => "CCN",
            Opcode::Cfstk => "CFSTK",
            Opcode::Clear => "CLEAR",
            Opcode::Con => "CON",
            Opcode::Css => "CSS",
            Opcode::Dcl => "DCL",
            Opcode::Equ => "EQU",
            Opcode::Exit => "EXIT",
            Opcode::Fmove => "FMOVE",
            Opcode::Fstk => "FSTK",
            Opcode::Go => "GO",
            Opcode::Goadd => "GOADD",
            Opcode::Goeq => "GOEQ",
            Opcode::Goge => "GOGE",
            Opcode::Gogr => "GOGR",
            Opcode::Gole => "GOLE",
            Opcode::Golt => "GOLT",
            Opcode::Gond => "GOND",
            Opcode::Gone => "GONE",
            Opcode::Gopc => "GOPC",
            Opcode::Gosub => "GOSUB",
            Opcode::Ident => "IDENT",
            Opcode::Laa => "LAA",
            Opcode::Lai => "LAI",
            Opcode::Lal => "LAL",
            Opcode::Lam => "LAM",
            Opcode::Lav => "LAV",
            Opcode::Lbv => "LBV",
            Opcode::Lci => "LCI",
            Opcode::Lcm => "LCM",
            Opcode::Lcn => "LCN",
            Opcode::Mess => "MESS",
            Opcode::Multl => "MULTL",
            Opcode::Nb => "NB",
            Opcode::Nch => "NCH",
            Opcode::Prgen => "PRGEN",
            Opcode::Prgst => "PRGST",
            Opcode::Sal => "SAL",
            Opcode::Sav => "SAV",
            Opcode::Sbl => "SBL",
            Opcode::Sbv => "SBV",
            Opcode::Sti => "STI",
            Opcode::Str => "STR",
            Opcode::Stv => "STV",
            Opcode::Subr => "SUBR",
            Opcode::Unstk => "UNSTK",
            Opcode::Halt => "HALT",
            Opcode::Noop => "NOOP",
            Opcode::Gotbl => "GOTBL",
            Opcode::Mderch => "MDERCH",
            Opcode::Mdquit => "MDQUIT",
            Opcode::Mdlabel => "MDLABEL",
            Opcode::Unknown => "UNKNOWN",
        }
    }

    /// Look up a mnemonic the way the scanner does: only the user-visible
    /// set. Internal codes (`HALT`, `GOTBL`, ...) are not valid source.
    pub fn lookup(mnemonic: &str) -> Option<Opcode> {
        let code = Opcode::decode(mnemonic)?;
        if code.is_internal() {
            None
        } else {
            Some(code)
        }
    }

    /// Decode any mnemonic, internal codes included. Inverse of
    /// [`Opcode::mnemonic`]; used by the listing round-trip.
    pub fn decode(mnemonic: &str) -> Option<Opcode> {
        ALL_OPCODES
            .iter()
            .copied()
            .find(|code| code.mnemonic() == mnemonic)
    }

    pub fn is_internal(self) -> bool {
        matches!(
            self,
            Opcode::Halt
                | Opcode::Noop
                | Opcode::Gotbl
                | Opcode::Mderch
                | Opcode::Mdquit
                | Opcode::Mdlabel
                | Opcode::Unknown
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::{Opcode, ALL_OPCODES};

    #[test]
    fn mnemonic_decode_is_a_bijection() {
        for &code in ALL_OPCODES {
            assert_eq!(Opcode::decode(code.mnemonic()), Some(code));
        }
    }

    #[test]
    fn lookup_rejects_internal_codes() {
        for name in ["HALT", "NOOP", "GOTBL", "MDERCH", "MDQUIT", "MDLABEL"] {
            assert_eq!(Opcode::lookup(name), None, "{name} should not scan");
        }
    }

    #[test]
    fn lookup_accepts_user_mnemonics() {
        assert_eq!(Opcode::lookup("GO"), Some(Opcode::Go));
        assert_eq!(Opcode::lookup("UNSTK"), Some(Opcode::Unstk));
        assert_eq!(Opcode::lookup("PRGST"), Some(Opcode::Prgst));
        assert_eq!(Opcode::lookup("go"), None);
        assert_eq!(Opcode::lookup("XYZZY"), None);
    }

    #[test]
    fn all_opcodes_has_no_duplicates() {
        for (i, a) in ALL_OPCODES.iter().enumerate() {
            for b in &ALL_OPCODES[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
