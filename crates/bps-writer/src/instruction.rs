//! Copy instructions for assembler-style front ends
//!
//! Two mnemonics let source text request copies directly:
//!
//! - `bps_sc copy_from, length` copies from the source buffer
//! - `bps_tc copy_from, length` copies from earlier target output
//!
//! Writing an instruction interrupts the current block with a copy hunk and
//! continues the block right after it.

use crate::error::{BpsError, BpsResult};
use crate::hunk::CopyKind;
use crate::writer::BpsWriter;

/// Mnemonic for a source copy
pub const SOURCE_COPY_MNEMONIC: &str = "bps_sc";
/// Mnemonic for a target copy
pub const TARGET_COPY_MNEMONIC: &str = "bps_tc";
/// Every mnemonic [`CopyInstruction::parse`] accepts
pub const SUPPORTED_MNEMONICS: [&str; 2] = [SOURCE_COPY_MNEMONIC, TARGET_COPY_MNEMONIC];

const UNNAMED_BLOCK: &str = "unnamed_block";

/// A parsed `bps_sc` or `bps_tc` instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyInstruction {
    /// Which buffer to copy from
    pub kind: CopyKind,
    /// First byte to copy
    pub copy_from: usize,
    /// Bytes to copy
    pub length: usize,
}

impl CopyInstruction {
    /// Parse `mnemonic` with its comma separated arguments
    pub fn parse(mnemonic: &str, args: &str) -> BpsResult<Self> {
        let kind = match mnemonic {
            SOURCE_COPY_MNEMONIC => CopyKind::Source,
            TARGET_COPY_MNEMONIC => CopyKind::Target,
            _ => {
                return Err(BpsError::invalid_instruction(
                    mnemonic,
                    format!("unrecognized, expected one of {SUPPORTED_MNEMONICS:?}"),
                ));
            }
        };

        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let [copy_from, length] = parts.as_slice() else {
            return Err(BpsError::invalid_instruction(
                mnemonic,
                format!("takes (copy_from, length), given \"{args}\""),
            ));
        };

        let number = |field: &str, text: &str| {
            text.parse::<usize>().map_err(|e| {
                BpsError::invalid_instruction(mnemonic, format!("bad {field} \"{text}\": {e}"))
            })
        };
        let copy_from = number("copy_from", *copy_from)?;
        let length = number("length", *length)?;
        if length == 0 {
            return Err(BpsError::invalid_instruction(
                mnemonic,
                "length must be at least 1",
            ));
        }

        Ok(Self {
            kind,
            copy_from,
            length,
        })
    }

    /// Bytes of target output the instruction occupies
    pub fn size(&self) -> usize {
        self.length
    }

    /// Queue the copy at `address` and continue the current block after it
    pub fn write(&self, writer: &mut BpsWriter<'_>, address: usize) -> BpsResult<()> {
        let block = writer
            .current_block_name()
            .unwrap_or(UNNAMED_BLOCK)
            .to_string();

        writer.new_copy_hunk(
            address,
            self.kind,
            self.length,
            self.copy_from,
            Some(&format!("{block}_copy")),
        )?;
        writer.start_block(
            address + self.length,
            Some(&format!("{block}_continued")),
            &[],
        )
    }
}
