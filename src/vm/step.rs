// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The instruction dispatcher.
//!
//! One step: fetch the word at `PC`, advance `PC`, switch on the opcode.
//! Branch targets and operand addresses wrap in the 16-bit core space.
//! Stack pushes test for pointer collision before touching anything, so a
//! failed push leaves the machine unchanged.

use std::io::Write;

use crate::core::error::Error;
use crate::core::op::Opcode;

use super::{is_digit, is_punctuation, Cmp, Machine, CORE_WORDS, LCH, LNM, STACK_WORDS};

impl Machine {
    /// Execute one instruction. `Halted`/`Quit` report the machine
    /// stopping; once halted every further step fails with `Halted`.
    pub fn step(&mut self, stdout: &mut dyn Write, _msg: &mut dyn Write) -> Result<(), Error> {
        if self.halted {
            return Err(Error::Halted);
        }

        let at = self.pc;
        let (op, value, value2) = {
            let w = &self.core[at];
            (w.op, w.value, w.value2)
        };
        self.pc = (at + 1) % CORE_WORDS;

        match op {
            Opcode::Aal => self.a = self.a.wrapping_add(value),
            Opcode::Aav => self.a = self.a.wrapping_add(self.direct_load(value)),
            Opcode::Abv => self.b = self.b.wrapping_add(self.direct_load(value)),
            Opcode::Andl => self.a &= value,
            Opcode::Andv => self.a &= self.direct_load(value),
            Opcode::Sal => self.a = self.a.wrapping_sub(value),
            Opcode::Sav => self.a = self.a.wrapping_sub(self.direct_load(value)),
            Opcode::Sbl => self.b = self.b.wrapping_sub(value),
            Opcode::Sbv => self.b = self.b.wrapping_sub(self.direct_load(value)),
            Opcode::Multl => self.a = self.a.wrapping_mul(value),

            Opcode::Lal => self.a = value,
            Opcode::Lav => self.a = self.direct_load(value),
            Opcode::Lai => self.a = self.indirect_load(value),
            Opcode::Lam => self.a = self.indexed_load(value),
            Opcode::Laa => self.a = value,
            Opcode::Lbv => self.b = self.direct_load(value),
            Opcode::Lcn => self.c = value,
            Opcode::Lci => self.c = self.indirect_load(value),
            Opcode::Lcm => self.c = self.indexed_load(value),

            Opcode::Stv => self.direct_store(value, self.a),
            Opcode::Sti => self.indirect_store(value, self.a),
            Opcode::Clear => self.direct_store(value, 0),
            Opcode::Bump => {
                self.direct_store(value, self.direct_load(value).wrapping_add(value2))
            }

            Opcode::Cal => self.compare(self.a, value),
            Opcode::Cav => self.compare(self.a, self.direct_load(value)),
            Opcode::Cai => self.compare(self.a, self.indirect_load(value)),
            Opcode::Ccl => self.compare(self.c, value),
            Opcode::Ccn => self.compare(self.c, value),
            Opcode::Cci => self.compare(self.c, self.indirect_load(value)),

            Opcode::Go => self.pc = Self::addr(value),
            Opcode::Goeq => {
                if self.cmp == Cmp::Eq {
                    self.pc = Self::addr(value);
                }
            }
            Opcode::Gone => {
                if self.cmp != Cmp::Eq {
                    self.pc = Self::addr(value);
                }
            }
            Opcode::Goge => {
                if self.cmp != Cmp::Lt {
                    self.pc = Self::addr(value);
                }
            }
            Opcode::Gogr => {
                if self.cmp == Cmp::Gr {
                    self.pc = Self::addr(value);
                }
            }
            Opcode::Gole => {
                if self.cmp != Cmp::Gr {
                    self.pc = Self::addr(value);
                }
            }
            Opcode::Golt => {
                if self.cmp == Cmp::Lt {
                    self.pc = Self::addr(value);
                }
            }
            Opcode::Gond => {
                if is_digit(self.c) {
                    self.a = self.c - i64::from(b'0');
                } else {
                    self.pc = Self::addr(value);
                }
            }
            Opcode::Gopc => {
                if is_punctuation(self.c) {
                    self.pc = Self::addr(value);
                }
            }

            Opcode::Gosub => {
                self.rs.push(self.pc);
                self.pc = Self::addr(value);
            }
            Opcode::Exit => {
                self.pc = self.rs.pop().ok_or(Error::StackUnderflow { pc: at })?;
                self.jump_value = value;
            }
            Opcode::Css => {
                self.rs.pop().ok_or(Error::StackUnderflow { pc: at })?;
            }
            Opcode::Goadd => self.jump_value = self.direct_load(value),
            Opcode::Gotbl => {
                if value2 == self.jump_value {
                    self.pc = Self::addr(value);
                }
            }

            Opcode::Fstk => self.push_forwards(at, self.a, LNM)?,
            Opcode::Cfstk => self.push_forwards(at, self.c, LCH)?,
            Opcode::Bstk => self.push_backwards(at, self.a)?,
            Opcode::Unstk => self.pop_forwards(at, value)?,
            Opcode::Fmove => self.block_move(false),
            Opcode::Bmove => self.block_move(true),

            Opcode::Mess => {
                if let Some(text) = &self.core[at].text {
                    let _ = stdout.write_all(text.replace('$', "\n").as_bytes());
                }
            }
            Opcode::Mderch => {
                let ch = (self.c & 0xff) as u8;
                let out = if ch == b'$' { b'\n' } else { ch };
                let _ = stdout.write_all(&[out]);
            }

            Opcode::Noop => {}
            Opcode::Halt => {
                self.pc = at;
                self.halted = true;
                return Err(Error::Halted);
            }
            Opcode::Mdquit => {
                self.pc = at;
                self.halted = true;
                return Err(Error::Quit);
            }

            _ => {
                return Err(Error::InvalidOpcode {
                    pc: at,
                    mnemonic: op.mnemonic(),
                })
            }
        }

        Ok(())
    }

    fn compare(&mut self, register: i64, value: i64) {
        self.cmp = match register.cmp(&value) {
            std::cmp::Ordering::Less => Cmp::Lt,
            std::cmp::Ordering::Equal => Cmp::Eq,
            std::cmp::Ordering::Greater => Cmp::Gr,
        };
    }

    fn push_forwards(&mut self, at: usize, value: i64, step: i64) -> Result<(), Error> {
        let ffpt_cell = self.reserved.ffpt as i64;
        let ffpt = self.direct_load(ffpt_cell);
        let lfpt = self.direct_load(self.reserved.lfpt as i64);
        let moved = ffpt + step;
        if moved >= lfpt || !(0..STACK_WORDS as i64).contains(&ffpt) {
            return Err(Error::StackOverflow { pc: at });
        }
        self.stack[ffpt as usize] = value;
        self.direct_store(ffpt_cell, moved);
        Ok(())
    }

    fn push_backwards(&mut self, at: usize, value: i64) -> Result<(), Error> {
        let lfpt_cell = self.reserved.lfpt as i64;
        let lfpt = self.direct_load(lfpt_cell);
        let ffpt = self.direct_load(self.reserved.ffpt as i64);
        let moved = lfpt - LNM;
        if moved <= ffpt || !(0..STACK_WORDS as i64).contains(&moved) {
            return Err(Error::StackOverflow { pc: at });
        }
        self.stack[moved as usize] = value;
        self.direct_store(lfpt_cell, moved);
        Ok(())
    }

    /// Pop the forwards stack into `A` and store `A` into the variable.
    fn pop_forwards(&mut self, at: usize, variable: i64) -> Result<(), Error> {
        let ffpt_cell = self.reserved.ffpt as i64;
        let ffpt = self.direct_load(ffpt_cell);
        let moved = ffpt - LNM;
        if !(0..STACK_WORDS as i64).contains(&moved) {
            return Err(Error::StackUnderflow { pc: at });
        }
        self.a = self.stack[moved as usize];
        self.direct_store(variable, self.a);
        self.direct_store(ffpt_cell, moved);
        Ok(())
    }

    /// `A` words from `*SRCPT` to `*DSTPT`. The backwards form copies from
    /// the high index down so overlapping upward moves keep their data.
    fn block_move(&mut self, backwards: bool) {
        let src = self.direct_load(self.reserved.srcpt as i64);
        let dst = self.direct_load(self.reserved.dstpt as i64);
        let length = self.a.max(0);
        let offsets: Box<dyn Iterator<Item = i64>> = if backwards {
            Box::new((0..length).rev())
        } else {
            Box::new(0..length)
        };
        for off in offsets {
            let word = self.core[Self::addr(src.wrapping_add(off))].clone();
            self.core[Self::addr(dst.wrapping_add(off))] = word;
        }
    }
}
