//! Serialization and deserialization of the MAC frames the RIT model
//! exchanges on the wire.
//!
//! All multi-octet integers are little-endian. Deserialization of malformed
//! input fails softly with a [`byte::Error`]; the caller drops the frame.

use byte::{check_len, BytesExt, TryRead, TryWrite, LE};

pub mod command;
pub mod nwk;

pub use command::Command;

/// A 16-bit short address. `0xFFFF` is the broadcast address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ShortAddress(pub u16);

impl ShortAddress {
    pub const BROADCAST: ShortAddress = ShortAddress(0xFFFF);

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Multicast range: the top three address bits are `100`.
    pub fn is_multicast(&self) -> bool {
        self.0 & 0xE000 == 0x8000
    }
}

impl core::fmt::Display for ShortAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02x}:{:02x}", self.0 >> 8, self.0 & 0xFF)
    }
}

impl TryRead<'_> for ShortAddress {
    fn try_read(bytes: &[u8], _ctx: ()) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        let value = bytes.read_with::<u16>(offset, LE)?;
        Ok((Self(value), *offset))
    }
}

impl TryWrite for ShortAddress {
    fn try_write(self, bytes: &mut [u8], _ctx: ()) -> byte::Result<usize> {
        let offset = &mut 0;
        bytes.write_with(offset, self.0, LE)?;
        Ok(*offset)
    }
}

/// A 64-bit extended (EUI-64) address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ExtendedAddress(pub u64);

impl ExtendedAddress {
    pub const BROADCAST: ExtendedAddress = ExtendedAddress(u64::MAX);
}

impl TryRead<'_> for ExtendedAddress {
    fn try_read(bytes: &[u8], _ctx: ()) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        let value = bytes.read_with::<u64>(offset, LE)?;
        Ok((Self(value), *offset))
    }
}

impl TryWrite for ExtendedAddress {
    fn try_write(self, bytes: &mut [u8], _ctx: ()) -> byte::Result<usize> {
        let offset = &mut 0;
        bytes.write_with(offset, self.0, LE)?;
        Ok(*offset)
    }
}

/// A PAN identifier. `0xFFFF` addresses all PANs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct PanId(pub u16);

impl PanId {
    pub const fn broadcast() -> Self {
        Self(0xFFFF)
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == 0xFFFF
    }
}

impl TryRead<'_> for PanId {
    fn try_read(bytes: &[u8], _ctx: ()) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        let value = bytes.read_with::<u16>(offset, LE)?;
        Ok((Self(value), *offset))
    }
}

impl TryWrite for PanId {
    fn try_write(self, bytes: &mut [u8], _ctx: ()) -> byte::Result<usize> {
        let offset = &mut 0;
        bytes.write_with(offset, self.0, LE)?;
        Ok(*offset)
    }
}

/// An address carried in a MAC header, together with its PAN id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Address {
    Short(PanId, ShortAddress),
    Extended(PanId, ExtendedAddress),
}

impl Address {
    pub fn pan_id(&self) -> PanId {
        match self {
            Address::Short(pan_id, _) => *pan_id,
            Address::Extended(pan_id, _) => *pan_id,
        }
    }

    pub fn short(&self) -> Option<ShortAddress> {
        match self {
            Address::Short(_, addr) => Some(*addr),
            Address::Extended(_, _) => None,
        }
    }

    pub fn extended(&self) -> Option<ExtendedAddress> {
        match self {
            Address::Short(_, _) => None,
            Address::Extended(_, addr) => Some(*addr),
        }
    }

    fn mode(addr: &Option<Self>) -> AddressingMode {
        match addr {
            None => AddressingMode::None,
            Some(Address::Short(_, _)) => AddressingMode::Short,
            Some(Address::Extended(_, _)) => AddressingMode::Extended,
        }
    }
}

/// The addressing mode bits of the frame control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum AddressingMode {
    None = 0b00,
    Reserved = 0b01,
    Short = 0b10,
    Extended = 0b11,
}

impl From<u8> for AddressingMode {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => AddressingMode::None,
            0b01 => AddressingMode::Reserved,
            0b10 => AddressingMode::Short,
            _ => AddressingMode::Extended,
        }
    }
}

/// The frame type bits of the frame control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum FrameType {
    Beacon,
    Data,
    Acknowledgement,
    MacCommand,
    Multipurpose,
    Reserved(u8),
}

impl From<u8> for FrameType {
    fn from(value: u8) -> Self {
        match value & 0b111 {
            0b000 => FrameType::Beacon,
            0b001 => FrameType::Data,
            0b010 => FrameType::Acknowledgement,
            0b011 => FrameType::MacCommand,
            0b101 => FrameType::Multipurpose,
            other => FrameType::Reserved(other),
        }
    }
}

impl From<FrameType> for u8 {
    fn from(value: FrameType) -> Self {
        match value {
            FrameType::Beacon => 0b000,
            FrameType::Data => 0b001,
            FrameType::Acknowledgement => 0b010,
            FrameType::MacCommand => 0b011,
            FrameType::Multipurpose => 0b101,
            FrameType::Reserved(other) => other & 0b111,
        }
    }
}

/// The frame version bits of the frame control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum FrameVersion {
    Ieee802154_2003,
    Ieee802154_2006,
    Reserved(u8),
}

impl FrameVersion {
    /// Frame versions above 1 are not understood by this MAC.
    pub fn is_supported(&self) -> bool {
        !matches!(self, FrameVersion::Reserved(_))
    }
}

impl From<u8> for FrameVersion {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => FrameVersion::Ieee802154_2003,
            0b01 => FrameVersion::Ieee802154_2006,
            other => FrameVersion::Reserved(other),
        }
    }
}

impl From<FrameVersion> for u8 {
    fn from(value: FrameVersion) -> Self {
        match value {
            FrameVersion::Ieee802154_2003 => 0b00,
            FrameVersion::Ieee802154_2006 => 0b01,
            FrameVersion::Reserved(other) => other & 0b11,
        }
    }
}

const FCF_SECURITY: u16 = 1 << 3;
const FCF_FRAME_PENDING: u16 = 1 << 4;
const FCF_ACK_REQUEST: u16 = 1 << 5;
const FCF_PAN_ID_COMPRESS: u16 = 1 << 6;

/// A MAC header: frame control, sequence number and the addressing fields.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Header {
    pub frame_type: FrameType,
    pub security_enabled: bool,
    pub frame_pending: bool,
    pub ack_request: bool,
    pub pan_id_compress: bool,
    pub version: FrameVersion,
    pub seq: u8,
    pub destination: Option<Address>,
    pub source: Option<Address>,
}

impl Header {
    /// The source PAN id, honoring PAN id compression.
    pub fn source_pan_id(&self) -> Option<PanId> {
        if self.pan_id_compress {
            self.destination.as_ref().map(|d| d.pan_id())
        } else {
            self.source.as_ref().map(|s| s.pan_id())
        }
    }

    /// The number of octets this header occupies on the wire.
    pub fn serialized_len(&self) -> usize {
        let mut len = 3;

        match &self.destination {
            None => {}
            Some(Address::Short(_, _)) => len += 4,
            Some(Address::Extended(_, _)) => len += 10,
        }

        let src_pan = if self.pan_id_compress { 0 } else { 2 };
        match &self.source {
            None => {}
            Some(Address::Short(_, _)) => len += src_pan + 2,
            Some(Address::Extended(_, _)) => len += src_pan + 8,
        }

        len
    }
}

impl TryRead<'_> for Header {
    fn try_read(bytes: &[u8], _ctx: ()) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        check_len(bytes, 3)?;

        let fcf = bytes.read_with::<u16>(offset, LE)?;
        let seq = bytes.read_with::<u8>(offset, LE)?;

        let frame_type = FrameType::from(fcf as u8);
        let security_enabled = fcf & FCF_SECURITY != 0;
        let frame_pending = fcf & FCF_FRAME_PENDING != 0;
        let ack_request = fcf & FCF_ACK_REQUEST != 0;
        let pan_id_compress = fcf & FCF_PAN_ID_COMPRESS != 0;
        let dst_mode = AddressingMode::from((fcf >> 10) as u8);
        let version = FrameVersion::from((fcf >> 12) as u8);
        let src_mode = AddressingMode::from((fcf >> 14) as u8);

        let destination = match dst_mode {
            AddressingMode::None => None,
            AddressingMode::Reserved => return Err(byte::Error::BadInput {
                err: "reserved destination addressing mode",
            }),
            AddressingMode::Short => {
                let pan_id = bytes.read(offset)?;
                Some(Address::Short(pan_id, bytes.read(offset)?))
            }
            AddressingMode::Extended => {
                let pan_id = bytes.read(offset)?;
                Some(Address::Extended(pan_id, bytes.read(offset)?))
            }
        };

        let src_pan_id = match (src_mode, pan_id_compress) {
            (AddressingMode::None, _) => PanId::broadcast(),
            (_, true) => destination
                .as_ref()
                .map(|d| d.pan_id())
                .unwrap_or(PanId::broadcast()),
            (_, false) => bytes.read(offset)?,
        };

        let source = match src_mode {
            AddressingMode::None => None,
            AddressingMode::Reserved => return Err(byte::Error::BadInput {
                err: "reserved source addressing mode",
            }),
            AddressingMode::Short => Some(Address::Short(src_pan_id, bytes.read(offset)?)),
            AddressingMode::Extended => Some(Address::Extended(src_pan_id, bytes.read(offset)?)),
        };

        Ok((
            Header {
                frame_type,
                security_enabled,
                frame_pending,
                ack_request,
                pan_id_compress,
                version,
                seq,
                destination,
                source,
            },
            *offset,
        ))
    }
}

impl TryWrite for Header {
    fn try_write(self, bytes: &mut [u8], _ctx: ()) -> byte::Result<usize> {
        let offset = &mut 0;

        let mut fcf = u8::from(self.frame_type) as u16;
        if self.security_enabled {
            fcf |= FCF_SECURITY;
        }
        if self.frame_pending {
            fcf |= FCF_FRAME_PENDING;
        }
        if self.ack_request {
            fcf |= FCF_ACK_REQUEST;
        }
        if self.pan_id_compress {
            fcf |= FCF_PAN_ID_COMPRESS;
        }
        fcf |= (Address::mode(&self.destination) as u16) << 10;
        fcf |= (u8::from(self.version) as u16) << 12;
        fcf |= (Address::mode(&self.source) as u16) << 14;

        bytes.write_with(offset, fcf, LE)?;
        bytes.write_with(offset, self.seq, LE)?;

        match self.destination {
            None => {}
            Some(Address::Short(pan_id, addr)) => {
                bytes.write(offset, pan_id)?;
                bytes.write(offset, addr)?;
            }
            Some(Address::Extended(pan_id, addr)) => {
                bytes.write(offset, pan_id)?;
                bytes.write(offset, addr)?;
            }
        }

        match self.source {
            None => {}
            Some(Address::Short(pan_id, addr)) => {
                if !self.pan_id_compress {
                    bytes.write(offset, pan_id)?;
                }
                bytes.write(offset, addr)?;
            }
            Some(Address::Extended(pan_id, addr)) => {
                if !self.pan_id_compress {
                    bytes.write(offset, pan_id)?;
                }
                bytes.write(offset, addr)?;
            }
        }

        Ok(*offset)
    }
}

/// What the MAC payload of a frame contains, derived from the frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum FrameContent {
    Beacon,
    Data,
    Acknowledgement,
    Command(Command),
    Multipurpose,
    Reserved,
}

/// Whether a frame carries an FCS trailer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum FooterMode {
    /// No trailer on the wire.
    None,
    /// A 2-octet ITU-T CRC-16 trailer, checked on read.
    #[default]
    Explicit,
}

/// The ITU-T CRC-16 used as the 802.15.4 FCS (LSB-first, initial value 0).
pub fn fcs(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= *byte as u16;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0x8408;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// A complete MAC frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'p> {
    pub header: Header,
    pub content: FrameContent,
    pub payload: &'p [u8],
}

impl<'p> TryRead<'p, FooterMode> for Frame<'p> {
    fn try_read(bytes: &'p [u8], mode: FooterMode) -> byte::Result<(Self, usize)> {
        let body = match mode {
            FooterMode::None => bytes,
            FooterMode::Explicit => {
                check_len(bytes, 2)?;
                let (body, trailer) = bytes.split_at(bytes.len() - 2);
                let received = u16::from_le_bytes([trailer[0], trailer[1]]);
                if received != fcs(body) {
                    return Err(byte::Error::BadInput {
                        err: "FCS mismatch",
                    });
                }
                body
            }
        };

        let offset = &mut 0;
        let header: Header = body.read(offset)?;

        let content = match header.frame_type {
            FrameType::Beacon => FrameContent::Beacon,
            FrameType::Data => FrameContent::Data,
            FrameType::Acknowledgement => FrameContent::Acknowledgement,
            FrameType::MacCommand => FrameContent::Command(body.read(offset)?),
            FrameType::Multipurpose => FrameContent::Multipurpose,
            FrameType::Reserved(_) => FrameContent::Reserved,
        };

        let payload = &body[*offset..];

        Ok((
            Frame {
                header,
                content,
                payload,
            },
            bytes.len(),
        ))
    }
}

impl TryWrite<FooterMode> for Frame<'_> {
    fn try_write(self, bytes: &mut [u8], mode: FooterMode) -> byte::Result<usize> {
        let offset = &mut 0;
        bytes.write(offset, self.header)?;
        if let FrameContent::Command(command) = self.content {
            bytes.write(offset, command)?;
        }
        bytes.write(offset, self.payload)?;

        if let FooterMode::Explicit = mode {
            let crc = fcs(&bytes[..*offset]);
            bytes.write_with(offset, crc, LE)?;
        }

        Ok(*offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(frame: Frame<'_>, mode: FooterMode) -> (heapless::Vec<u8, 127>, usize) {
        let mut buffer = heapless::Vec::<u8, 127>::new();
        buffer.resize_default(127).unwrap();
        let len = frame.try_write(&mut buffer, mode).unwrap();
        buffer.truncate(len);
        (buffer, len)
    }

    #[test]
    fn data_frame_roundtrip() {
        let frame = Frame {
            header: Header {
                frame_type: FrameType::Data,
                security_enabled: false,
                frame_pending: false,
                ack_request: true,
                pan_id_compress: true,
                version: FrameVersion::Ieee802154_2003,
                seq: 42,
                destination: Some(Address::Short(PanId(0x1234), ShortAddress(0x0001))),
                source: Some(Address::Short(PanId(0x1234), ShortAddress(0x0002))),
            },
            content: FrameContent::Data,
            payload: b"hello",
        };

        let (buffer, _) = roundtrip(frame.clone(), FooterMode::Explicit);
        let (parsed, _) = Frame::try_read(&buffer, FooterMode::Explicit).unwrap();
        assert_eq!(parsed, frame);
        assert_eq!(parsed.payload, b"hello");
    }

    #[test]
    fn compact_command_roundtrip() {
        // Source-only header with PAN id compression, as used by the compact
        // RIT Data Request
        let frame = Frame {
            header: Header {
                frame_type: FrameType::MacCommand,
                security_enabled: false,
                frame_pending: false,
                ack_request: false,
                pan_id_compress: true,
                version: FrameVersion::Ieee802154_2006,
                seq: 7,
                destination: None,
                source: Some(Address::Short(PanId(0xBEEF), ShortAddress(0x0005))),
            },
            content: FrameContent::Command(Command::RitDataRequest),
            payload: &[0xAA, 0xBB],
        };

        let (buffer, _) = roundtrip(frame.clone(), FooterMode::None);
        let (parsed, _) = Frame::try_read(&buffer, FooterMode::None).unwrap();
        assert_eq!(parsed.content, FrameContent::Command(Command::RitDataRequest));
        assert_eq!(parsed.payload, &[0xAA, 0xBB]);
        assert_eq!(parsed.header.source, frame.header.source);
        assert_eq!(parsed.header.destination, None);
    }

    #[test]
    fn fcs_mismatch_is_rejected() {
        let frame = Frame {
            header: Header {
                frame_type: FrameType::Data,
                security_enabled: false,
                frame_pending: false,
                ack_request: false,
                pan_id_compress: false,
                version: FrameVersion::Ieee802154_2003,
                seq: 0,
                destination: Some(Address::Short(PanId(1), ShortAddress(2))),
                source: Some(Address::Short(PanId(1), ShortAddress(3))),
            },
            content: FrameContent::Data,
            payload: &[1, 2, 3],
        };

        let (mut buffer, len) = roundtrip(frame, FooterMode::Explicit);
        buffer[len - 1] ^= 0xFF;
        assert!(Frame::try_read(&buffer, FooterMode::Explicit).is_err());
    }

    #[test]
    fn reserved_addressing_mode_is_rejected() {
        // FCF with destination mode = 0b01 (reserved)
        let bytes = [0b0000_0001u8, 0b0000_0100, 0, 0, 0];
        assert!(Header::try_read(&bytes, ()).is_err());
    }

    #[test]
    fn multicast_range() {
        assert!(ShortAddress(0x8000).is_multicast());
        assert!(ShortAddress(0x9FFF).is_multicast());
        assert!(!ShortAddress(0xA000).is_multicast());
        assert!(!ShortAddress(0x0001).is_multicast());
        assert!(ShortAddress(0xFFFF).is_broadcast());
    }
}
