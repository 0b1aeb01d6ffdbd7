//! Subroutine call bookkeeping.
//!
//! Calls are inferred from the decoded instruction stream: `jal` pushes a
//! call record and names the frame it creates, `jr` pops it again. The
//! instruction is always observed before its memory effect, so the names
//! are parked in a [`PendingAttribution`] that the next stack write takes.

use std::collections::HashMap;

use crate::abi::{RETURN_ADDR_REG, register_name};
use crate::event::{Instruction, Mnemonic};
use crate::symbols::SymbolResolver;
use crate::{Error, Result};

/// One unreturned call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// Address of the calling instruction.
    pub call_site: u32,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnAddressStack {
    records: Vec<CallRecord>,
}

impl ReturnAddressStack {
    pub fn push(&mut self, record: CallRecord) {
        self.records.push(record);
    }

    pub fn pop(&mut self) -> Option<CallRecord> {
        self.records.pop()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Innermost call last.
    #[must_use]
    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Number of active invocations per subroutine. Entries stay at zero once
/// created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveCallStats {
    active: HashMap<String, u32>,
}

impl ActiveCallStats {
    /// Record a call and return the new active count.
    pub fn add_call(&mut self, label: &str) -> u32 {
        let count = self.active.entry(label.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn remove_call(&mut self, label: &str) {
        match self.active.get_mut(label) {
            Some(count) if *count > 0 => *count -= 1,
            Some(_) => tracing::warn!(label, "return from a subroutine with no active calls"),
            None => tracing::warn!(label, "return from a subroutine that was never called"),
        }
    }

    #[must_use]
    pub fn count(&self, label: &str) -> u32 {
        self.active.get(label).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.active.contains_key(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.active.iter().map(|(label, &count)| (label.as_str(), count))
    }

    pub fn reset(&mut self) {
        self.active.clear();
    }
}

/// Names waiting for the next memory write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingAttribution {
    pub register: Option<String>,
    pub frame_label: Option<String>,
}

impl PendingAttribution {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.register.is_none() && self.frame_label.is_none()
    }

    /// Hand out both slots and leave the buffer empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

/// What a decoded instruction did to the call bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEffect {
    None,
    StorePending { register: String },
    Call { label: Option<String>, depth: usize },
    Return { label: Option<String>, depth: usize },
}

#[derive(Debug, Clone, Default)]
pub struct CallFrameTracker {
    returns: ReturnAddressStack,
    active: ActiveCallStats,
    pending: PendingAttribution,
    ra_written: bool,
    detect_jal_equivalents: bool,
    ra_only_returns: bool,
    word_size: u32,
}

impl CallFrameTracker {
    #[must_use]
    pub fn new(word_size: u32, detect_jal_equivalents: bool, ra_only_returns: bool) -> Self {
        Self {
            detect_jal_equivalents,
            ra_only_returns,
            word_size,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn return_addresses(&self) -> &ReturnAddressStack {
        &self.returns
    }

    #[must_use]
    pub const fn active_calls(&self) -> &ActiveCallStats {
        &self.active
    }

    #[must_use]
    pub const fn pending(&self) -> &PendingAttribution {
        &self.pending
    }

    /// Hand the pending names to a stack write. Always leaves the slot empty.
    pub fn take_pending(&mut self) -> PendingAttribution {
        self.pending.take()
    }

    /// `$ra` was written by the instruction being executed.
    pub fn note_return_address_write(&mut self) {
        self.ra_written = true;
    }

    pub fn on_instruction(
        &mut self,
        instr: &Instruction,
        symbols: &dyn SymbolResolver,
    ) -> Result<FrameEffect> {
        let ra_written_before = std::mem::take(&mut self.ra_written);

        match &instr.mnemonic {
            m if m.is_store() => {
                let register = register_operand(instr, 0)?;
                self.pending.register = Some(register.to_string());
                Ok(FrameEffect::StorePending {
                    register: register.to_string(),
                })
            }
            Mnemonic::Jal => self.call(instr, symbols),
            Mnemonic::J if self.detect_jal_equivalents && ra_written_before => {
                tracing::debug!(
                    at = format_args!("0x{:08x}", instr.address),
                    "j after $ra write treated as call"
                );
                self.call(instr, symbols)
            }
            Mnemonic::J => {
                let target = self.jump_target(instr)?;
                match symbols.label_for(target) {
                    Some(label) => tracing::debug!(%label, "jumping"),
                    None => tracing::debug!("{}", Error::UnresolvedSymbol { target }),
                }
                Ok(FrameEffect::None)
            }
            Mnemonic::Jr => {
                let register = register_number_operand(instr, 0)?;
                if self.ra_only_returns && register != RETURN_ADDR_REG {
                    let register = register_operand(instr, 0)?;
                    tracing::trace!(register, "indirect jump through register");
                    Ok(FrameEffect::None)
                } else {
                    self.ret(instr)
                }
            }
            _ => Ok(FrameEffect::None),
        }
    }

    pub fn reset(&mut self) {
        self.returns.clear();
        self.active.reset();
        self.pending = PendingAttribution::default();
        self.ra_written = false;
    }

    fn call(&mut self, instr: &Instruction, symbols: &dyn SymbolResolver) -> Result<FrameEffect> {
        let target = self.jump_target(instr)?;
        let label = symbols.label_for(target);

        self.returns.push(CallRecord {
            call_site: instr.address,
            label: label.clone(),
        });
        let depth = self.returns.len();

        match &label {
            Some(label) => {
                let count = self.active.add_call(label);
                self.pending.frame_label = Some(format!("{label} ({count})"));
                tracing::debug!(%label, count, depth, "call");
            }
            None => {
                tracing::warn!("{}", Error::UnresolvedSymbol { target });
            }
        }

        Ok(FrameEffect::Call { label, depth })
    }

    fn ret(&mut self, instr: &Instruction) -> Result<FrameEffect> {
        let Some(record) = self.returns.pop() else {
            return Err(Error::UnmatchedReturn {
                address: instr.address,
            });
        };
        if let Some(label) = &record.label {
            self.active.remove_call(label);
            tracing::debug!(%label, remaining = self.active.count(label), "return");
        }
        Ok(FrameEffect::Return {
            label: record.label,
            depth: self.returns.len(),
        })
    }

    fn jump_target(&self, instr: &Instruction) -> Result<u32> {
        let index = instr
            .operand(0)
            .ok_or_else(|| malformed(instr, "missing jump target"))?;
        u32::try_from(index)
            .ok()
            .and_then(|index| index.checked_mul(self.word_size))
            .ok_or_else(|| malformed(instr, "jump target out of range"))
    }
}

fn register_number_operand(instr: &Instruction, index: usize) -> Result<u8> {
    instr
        .operand(index)
        .and_then(|number| u8::try_from(number).ok())
        .filter(|&number| register_name(number).is_some())
        .ok_or_else(|| malformed(instr, "missing or invalid register operand"))
}

fn register_operand(instr: &Instruction, index: usize) -> Result<&'static str> {
    let number = register_number_operand(instr, index)?;
    register_name(number).ok_or_else(|| malformed(instr, "missing or invalid register operand"))
}

fn malformed(instr: &Instruction, reason: &'static str) -> Error {
    Error::MalformedInstruction {
        mnemonic: instr.mnemonic.to_string(),
        address: instr.address,
        reason,
    }
}
