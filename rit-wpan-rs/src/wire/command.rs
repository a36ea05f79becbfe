//! MAC command payload headers.
//!
//! Only the RIT command identifiers from the low-energy command range are
//! understood; any payload that follows the identifier is carried as the
//! frame payload.

use byte::{BytesExt, TryRead, TryWrite, LE};

const RIT_DATA_REQUEST: u8 = 0x20;
const RIT_DATA_RESPONSE: u8 = 0x21;

/// The command frame identifier at the start of a command payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Command {
    /// The RIT Data Request: a receiver advertising that it is listening.
    RitDataRequest,
    /// The RIT Data Response. Parsed but not acted upon.
    RitDataResponse,
    /// Any other command identifier. Passed through the filter and ignored.
    Other(u8),
}

impl From<u8> for Command {
    fn from(value: u8) -> Self {
        match value {
            RIT_DATA_REQUEST => Command::RitDataRequest,
            RIT_DATA_RESPONSE => Command::RitDataResponse,
            other => Command::Other(other),
        }
    }
}

impl From<Command> for u8 {
    fn from(value: Command) -> Self {
        match value {
            Command::RitDataRequest => RIT_DATA_REQUEST,
            Command::RitDataResponse => RIT_DATA_RESPONSE,
            Command::Other(other) => other,
        }
    }
}

impl TryRead<'_> for Command {
    fn try_read(bytes: &[u8], _ctx: ()) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        let id = bytes.read_with::<u8>(offset, LE)?;
        Ok((Command::from(id), *offset))
    }
}

impl TryWrite for Command {
    fn try_write(self, bytes: &mut [u8], _ctx: ()) -> byte::Result<usize> {
        let offset = &mut 0;
        bytes.write_with(offset, u8::from(self), LE)?;
        Ok(*offset)
    }
}
