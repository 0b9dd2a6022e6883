//! Offset-addressed per-frame metadata extraction
//!
//! Frame payloads embed a metadata buffer: a fixed capture header followed
//! by a mode-tagged sub-structure whose layout depends on the stream kind
//! (depth-normal vs. fisheye-normal). Each logical field is described by a
//! data-driven descriptor (mode, byte offset, width) instead of scattered
//! struct-offset arithmetic, so the "buffer too short / wrong mode"
//! fallback is uniform: extraction yields `None`, never garbage.

use serde::{Deserialize, Serialize};

/// Buffer layout constants. All multi-byte fields are little-endian.
pub mod layout {
    /// Size of the fixed capture header preceding the mode union.
    pub const HEADER_SIZE: usize = 12;
    /// Coarse hardware timestamp (u32) inside the capture header.
    pub const HEADER_TIMESTAMP_OFFSET: usize = 2;
    /// Mode discriminator (u32) directly after the capture header.
    pub const MODE_TAG_OFFSET: usize = HEADER_SIZE;
    /// Start of the mode-specific sub-structure.
    pub const MODE_PAYLOAD_OFFSET: usize = MODE_TAG_OFFSET + 4;

    /// Each block inside the mode payload starts with an 8-byte header.
    pub const BLOCK_HEADER_SIZE: usize = 8;

    // Block base offsets, relative to the mode payload. Depth-normal and
    // fisheye-normal overlay different control blocks at the same slot.
    pub const CAPTURE_TIMING_BASE: usize = 0;
    pub const CAPTURE_STATS_BASE: usize = 28;
    pub const CONTROL_BASE: usize = 52;
    pub const CONFIGURATION_BASE: usize = 76;

    // Field offsets, relative to the mode payload.
    pub const FRAME_COUNTER: usize = CAPTURE_TIMING_BASE + BLOCK_HEADER_SIZE + 8;
    pub const SENSOR_TIMESTAMP: usize = CAPTURE_TIMING_BASE + BLOCK_HEADER_SIZE + 16;
    pub const WHITE_BALANCE: usize = CAPTURE_STATS_BASE + BLOCK_HEADER_SIZE + 4;
    pub const MANUAL_GAIN: usize = CONTROL_BASE + BLOCK_HEADER_SIZE;
    pub const MANUAL_EXPOSURE: usize = CONTROL_BASE + BLOCK_HEADER_SIZE + 4;
    pub const AUTO_EXPOSURE_MODE: usize = CONTROL_BASE + BLOCK_HEADER_SIZE + 8;
    pub const HW_TYPE: usize = CONFIGURATION_BASE + BLOCK_HEADER_SIZE;
    pub const SKU_ID: usize = CONFIGURATION_BASE + BLOCK_HEADER_SIZE + 1;
    pub const FORMAT: usize = CONFIGURATION_BASE + BLOCK_HEADER_SIZE + 2;
    pub const WIDTH: usize = CONFIGURATION_BASE + BLOCK_HEADER_SIZE + 4;
    pub const HEIGHT: usize = CONFIGURATION_BASE + BLOCK_HEADER_SIZE + 6;
}

/// Mode discriminator values stored at `layout::MODE_TAG_OFFSET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum MetadataMode {
    DepthNormal = 0x01,
    FisheyeNormal = 0x03,
}

/// Logical metadata fields an endpoint can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    FrameTimestamp,
    FrameCounter,
    SensorTimestamp,
    WhiteBalance,
    GainLevel,
    ActualExposure,
    AutoExposure,
    HwType,
    SkuId,
    PixelFormat,
    Width,
    Height,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldWidth {
    U8,
    U16,
    U32,
}

impl FieldWidth {
    pub fn byte_len(&self) -> usize {
        match self {
            FieldWidth::U8 => 1,
            FieldWidth::U16 => 2,
            FieldWidth::U32 => 4,
        }
    }
}

/// One field inside a mode-specific sub-structure: where it lives and how
/// wide it is. `offset` is relative to the mode payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub mode: MetadataMode,
    pub offset: usize,
    pub width: FieldWidth,
}

impl AttributeDescriptor {
    pub const fn new(mode: MetadataMode, offset: usize, width: FieldWidth) -> Self {
        Self {
            mode,
            offset,
            width,
        }
    }

    /// Extract the field, checking the mode tag and the buffer bounds.
    fn extract(&self, buf: &[u8]) -> Option<u64> {
        if mode_tag(buf)? != self.mode as u32 {
            return None;
        }
        let start = layout::MODE_PAYLOAD_OFFSET + self.offset;
        let end = start + self.width.byte_len();
        if buf.len() < end {
            return None;
        }
        let field = &buf[start..end];
        Some(match self.width {
            FieldWidth::U8 => field[0] as u64,
            FieldWidth::U16 => u16::from_le_bytes([field[0], field[1]]) as u64,
            FieldWidth::U32 => {
                u32::from_le_bytes([field[0], field[1], field[2], field[3]]) as u64
            }
        })
    }
}

fn mode_tag(buf: &[u8]) -> Option<u32> {
    let start = layout::MODE_TAG_OFFSET;
    if buf.len() < start + 4 {
        return None;
    }
    Some(u32::from_le_bytes([
        buf[start],
        buf[start + 1],
        buf[start + 2],
        buf[start + 3],
    ]))
}

fn header_timestamp(buf: &[u8]) -> Option<u32> {
    let start = layout::HEADER_TIMESTAMP_OFFSET;
    if buf.len() < layout::HEADER_SIZE {
        return None;
    }
    Some(u32::from_le_bytes([
        buf[start],
        buf[start + 1],
        buf[start + 2],
        buf[start + 3],
    ]))
}

/// How to pull one logical field out of a raw metadata buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataParser {
    /// Coarse timestamp from the fixed, mode-independent capture header.
    HeaderTimestamp,
    /// Single field addressed through a mode-specific descriptor.
    Attribute(AttributeDescriptor),
    /// 64-bit sensor timestamp: coarse header timestamp in the high word,
    /// fine mode-specific correction in the low word.
    SensorTimestamp { fine: AttributeDescriptor },
}

impl MetadataParser {
    /// Extract the field value, or `None` when the buffer does not carry
    /// it (too short, or tagged with a different mode).
    pub fn extract(&self, buf: &[u8]) -> Option<u64> {
        match self {
            MetadataParser::HeaderTimestamp => header_timestamp(buf).map(u64::from),
            MetadataParser::Attribute(desc) => desc.extract(buf),
            MetadataParser::SensorTimestamp { fine } => {
                let coarse = header_timestamp(buf)?;
                let correction = fine.extract(buf)?;
                Some((coarse as u64) << 32 | correction)
            }
        }
    }
}

fn mode_attributes(mode: MetadataMode) -> Vec<(MetadataField, MetadataParser)> {
    use layout::*;
    use FieldWidth::*;
    use MetadataField::*;

    let attr = |offset, width| {
        MetadataParser::Attribute(AttributeDescriptor::new(mode, offset, width))
    };

    let mut fields = vec![
        (FrameTimestamp, MetadataParser::HeaderTimestamp),
        (FrameCounter, attr(FRAME_COUNTER, U32)),
        (
            SensorTimestamp,
            MetadataParser::SensorTimestamp {
                fine: AttributeDescriptor::new(mode, SENSOR_TIMESTAMP, U32),
            },
        ),
        (GainLevel, attr(MANUAL_GAIN, U32)),
        (ActualExposure, attr(MANUAL_EXPOSURE, U32)),
        (HwType, attr(HW_TYPE, U8)),
        (SkuId, attr(SKU_ID, U8)),
        (PixelFormat, attr(FORMAT, U16)),
        (Width, attr(WIDTH, U16)),
        (Height, attr(HEIGHT, U16)),
    ];

    // The depth control block also carries stats and the AE mode; the
    // fisheye control block does not.
    if mode == MetadataMode::DepthNormal {
        fields.push((WhiteBalance, attr(WHITE_BALANCE, U32)));
        fields.push((AutoExposure, attr(AUTO_EXPOSURE_MODE, U32)));
    }

    fields
}

/// Descriptor table for depth-normal-mode frames.
pub fn depth_attributes() -> Vec<(MetadataField, MetadataParser)> {
    mode_attributes(MetadataMode::DepthNormal)
}

/// Descriptor table for fisheye-normal-mode frames.
pub fn fisheye_attributes() -> Vec<(MetadataField, MetadataParser)> {
    mode_attributes(MetadataMode::FisheyeNormal)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a well-formed buffer for the given mode with recognizable
    /// field values.
    fn sample_buffer(mode: MetadataMode) -> Vec<u8> {
        let mut buf = vec![0u8; layout::MODE_PAYLOAD_OFFSET + 96];
        buf[layout::HEADER_TIMESTAMP_OFFSET..layout::HEADER_TIMESTAMP_OFFSET + 4]
            .copy_from_slice(&0x1111_2222u32.to_le_bytes());
        buf[layout::MODE_TAG_OFFSET..layout::MODE_TAG_OFFSET + 4]
            .copy_from_slice(&(mode as u32).to_le_bytes());

        let put_u32 = |buf: &mut Vec<u8>, rel: usize, value: u32| {
            let at = layout::MODE_PAYLOAD_OFFSET + rel;
            buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
        };
        let put_u16 = |buf: &mut Vec<u8>, rel: usize, value: u16| {
            let at = layout::MODE_PAYLOAD_OFFSET + rel;
            buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
        };

        put_u32(&mut buf, layout::FRAME_COUNTER, 42);
        put_u32(&mut buf, layout::SENSOR_TIMESTAMP, 0x3333_4444);
        put_u32(&mut buf, layout::WHITE_BALANCE, 4600);
        put_u32(&mut buf, layout::MANUAL_GAIN, 16);
        put_u32(&mut buf, layout::MANUAL_EXPOSURE, 8500);
        put_u16(&mut buf, layout::WIDTH, 1280);
        put_u16(&mut buf, layout::HEIGHT, 720);
        buf[layout::MODE_PAYLOAD_OFFSET + layout::SKU_ID] = 7;
        buf
    }

    fn parser_for(mode: MetadataMode, field: MetadataField) -> MetadataParser {
        mode_attributes(mode)
            .into_iter()
            .find(|(f, _)| *f == field)
            .map(|(_, p)| p)
            .unwrap()
    }

    #[test]
    fn test_extracts_typed_fields() {
        let buf = sample_buffer(MetadataMode::DepthNormal);
        let get = |field| {
            parser_for(MetadataMode::DepthNormal, field)
                .extract(&buf)
                .unwrap()
        };
        assert_eq!(get(MetadataField::FrameCounter), 42);
        assert_eq!(get(MetadataField::WhiteBalance), 4600);
        assert_eq!(get(MetadataField::GainLevel), 16);
        assert_eq!(get(MetadataField::Width), 1280);
        assert_eq!(get(MetadataField::Height), 720);
        assert_eq!(get(MetadataField::SkuId), 7);
        assert_eq!(get(MetadataField::FrameTimestamp), 0x1111_2222);
    }

    #[test]
    fn test_sensor_timestamp_combines_coarse_and_fine() {
        let buf = sample_buffer(MetadataMode::DepthNormal);
        let ts = parser_for(MetadataMode::DepthNormal, MetadataField::SensorTimestamp)
            .extract(&buf)
            .unwrap();
        assert_eq!(ts, 0x1111_2222_3333_4444);
    }

    #[test]
    fn test_wrong_mode_is_not_present() {
        let buf = sample_buffer(MetadataMode::FisheyeNormal);
        let depth_counter = parser_for(MetadataMode::DepthNormal, MetadataField::FrameCounter);
        assert_eq!(depth_counter.extract(&buf), None);

        // Same descriptor accepts a buffer tagged with its own mode.
        let fe_counter = parser_for(MetadataMode::FisheyeNormal, MetadataField::FrameCounter);
        assert_eq!(fe_counter.extract(&buf), Some(42));
    }

    #[test]
    fn test_short_buffer_is_not_present() {
        let buf = sample_buffer(MetadataMode::DepthNormal);
        let counter = parser_for(MetadataMode::DepthNormal, MetadataField::FrameCounter);

        // Cut mid-field: offset is in range, the field end is not.
        let cut = layout::MODE_PAYLOAD_OFFSET + layout::FRAME_COUNTER + 2;
        assert_eq!(counter.extract(&buf[..cut]), None);

        // Too short to even hold the mode tag.
        assert_eq!(counter.extract(&buf[..8]), None);
        assert_eq!(MetadataParser::HeaderTimestamp.extract(&buf[..8]), None);
        assert_eq!(counter.extract(&[]), None);
    }

    #[test]
    fn test_fisheye_table_has_no_depth_only_fields() {
        let fields: Vec<_> = fisheye_attributes().into_iter().map(|(f, _)| f).collect();
        assert!(!fields.contains(&MetadataField::AutoExposure));
        assert!(!fields.contains(&MetadataField::WhiteBalance));
        assert!(fields.contains(&MetadataField::ActualExposure));
    }
}
