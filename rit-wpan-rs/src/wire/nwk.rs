//! The compact network-layer headers used by the rank forwarding layer.

use byte::{check_len, BytesExt, TryRead, TryWrite, LE};

use super::ShortAddress;

/// The 6-octet header the rank forwarding layer prepends to every data frame:
/// rank, source short address, destination short address, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct RitNwkHeader {
    pub rank: u16,
    pub src: ShortAddress,
    pub dst: ShortAddress,
}

impl RitNwkHeader {
    pub const SERIALIZED_SIZE: usize = 6;
}

impl TryRead<'_> for RitNwkHeader {
    fn try_read(bytes: &[u8], _ctx: ()) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        check_len(bytes, Self::SERIALIZED_SIZE)?;

        let rank = bytes.read_with::<u16>(offset, LE)?;
        let src = bytes.read(offset)?;
        let dst = bytes.read(offset)?;

        Ok((Self { rank, src, dst }, *offset))
    }
}

impl TryWrite for RitNwkHeader {
    fn try_write(self, bytes: &mut [u8], _ctx: ()) -> byte::Result<usize> {
        let offset = &mut 0;
        bytes.write_with(offset, self.rank, LE)?;
        bytes.write(offset, self.src)?;
        bytes.write(offset, self.dst)?;
        Ok(*offset)
    }
}

const FLAG_CONTINUOUS: u8 = 0x01;

/// A one-octet flag field reserved for control hints between nodes.
///
/// Bit 0 signals continuous transmission; bits 1-7 are reserved. The live
/// transmit path does not insert this header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct RitSubHeader {
    flags: u8,
}

impl RitSubHeader {
    pub const SERIALIZED_SIZE: usize = 1;

    pub fn set_continuous(&mut self, enabled: bool) {
        if enabled {
            self.flags |= FLAG_CONTINUOUS;
        } else {
            self.flags &= !FLAG_CONTINUOUS;
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.flags & FLAG_CONTINUOUS != 0
    }
}

impl TryRead<'_> for RitSubHeader {
    fn try_read(bytes: &[u8], _ctx: ()) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        let flags = bytes.read_with::<u8>(offset, LE)?;
        Ok((Self { flags }, *offset))
    }
}

impl TryWrite for RitSubHeader {
    fn try_write(self, bytes: &mut [u8], _ctx: ()) -> byte::Result<usize> {
        let offset = &mut 0;
        bytes.write_with(offset, self.flags, LE)?;
        Ok(*offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nwk_header_roundtrip() {
        let header = RitNwkHeader {
            rank: 2,
            src: ShortAddress(0x0002),
            dst: ShortAddress(0x0000),
        };

        let mut buffer = [0u8; 8];
        let len = header.try_write(&mut buffer, ()).unwrap();
        assert_eq!(len, RitNwkHeader::SERIALIZED_SIZE);

        let (parsed, read) = RitNwkHeader::try_read(&buffer[..len], ()).unwrap();
        assert_eq!(read, len);
        assert_eq!(parsed, header);
    }

    #[test]
    fn nwk_header_too_short() {
        assert!(RitNwkHeader::try_read(&[0u8; 5], ()).is_err());
    }

    #[test]
    fn sub_header_flags() {
        let mut sub = RitSubHeader::default();
        assert!(!sub.is_continuous());
        sub.set_continuous(true);
        assert!(sub.is_continuous());

        let mut buffer = [0u8; 1];
        sub.try_write(&mut buffer, ()).unwrap();
        assert_eq!(buffer[0], 0x01);

        sub.set_continuous(false);
        assert!(!sub.is_continuous());
    }
}
