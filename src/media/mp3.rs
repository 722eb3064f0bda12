//! MPEG audio frame header parsing
//!
//! Only the first frame header of a file is needed: it carries the bitrate the
//! stream has to be paced at.
//!
//! Frame header layout (32 bits):
//! ```text
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//!
//! A: sync word (all ones)     F: sample rate index
//! B: version                  G: padding bit
//! C: layer                    H: private bit
//! D: protection bit           I: channel mode
//! E: bitrate index            J..M: mode extension, copyright, original, emphasis
//! ```

use std::io::SeekFrom;
use std::path::Path;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::error::MediaError;

/// How many bytes after the ID3 tag are searched for the first frame
const PROBE_LEN: usize = 64 * 1024;

const ID3_HEADER_LEN: usize = 10;

/// MPEG audio version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

impl MpegVersion {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b00 => Some(MpegVersion::Mpeg25),
            0b10 => Some(MpegVersion::Mpeg2),
            0b11 => Some(MpegVersion::Mpeg1),
            _ => None,
        }
    }
}

/// MPEG audio layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Layer1,
    Layer2,
    Layer3,
}

impl Layer {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b01 => Some(Layer::Layer3),
            0b10 => Some(Layer::Layer2),
            0b11 => Some(Layer::Layer1),
            _ => None,
        }
    }
}

/// Channel mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

impl ChannelMode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        }
    }

    /// Number of audio channels
    pub fn channels(&self) -> u8 {
        match self {
            ChannelMode::Mono => 1,
            _ => 2,
        }
    }
}

/// Parsed MPEG audio frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    /// Bitrate in bits per second, over all channels
    pub bitrate: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    pub padding: bool,
    pub channel_mode: ChannelMode,
}

impl FrameHeader {
    /// Bitrates in kbps, indexed by the 4-bit bitrate index
    const BITRATES_V1_L1: [u32; 15] = [
        0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448,
    ];
    const BITRATES_V1_L2: [u32; 15] = [
        0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384,
    ];
    const BITRATES_V1_L3: [u32; 15] = [
        0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
    ];
    const BITRATES_V2_L1: [u32; 15] = [
        0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256,
    ];
    const BITRATES_V2_L23: [u32; 15] = [
        0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160,
    ];

    /// Parse a 4-byte frame header
    pub fn parse(header: [u8; 4]) -> Result<Self, MediaError> {
        let [b0, b1, b2, b3] = header;

        if b0 != 0xFF || (b1 & 0xE0) != 0xE0 {
            return Err(MediaError::InvalidFrameHeader("missing sync word"));
        }

        let version = MpegVersion::from_bits((b1 >> 3) & 0b11)
            .ok_or(MediaError::InvalidFrameHeader("reserved version"))?;
        let layer = Layer::from_bits((b1 >> 1) & 0b11)
            .ok_or(MediaError::InvalidFrameHeader("reserved layer"))?;

        let bitrate_index = (b2 >> 4) as usize;
        if bitrate_index == 0 {
            return Err(MediaError::FreeFormat);
        }
        if bitrate_index == 0x0F {
            return Err(MediaError::InvalidFrameHeader("bad bitrate index"));
        }

        let table = match (version, layer) {
            (MpegVersion::Mpeg1, Layer::Layer1) => &Self::BITRATES_V1_L1,
            (MpegVersion::Mpeg1, Layer::Layer2) => &Self::BITRATES_V1_L2,
            (MpegVersion::Mpeg1, Layer::Layer3) => &Self::BITRATES_V1_L3,
            (_, Layer::Layer1) => &Self::BITRATES_V2_L1,
            (_, _) => &Self::BITRATES_V2_L23,
        };
        let bitrate = table[bitrate_index] * 1000;

        let sample_rate_index = (b2 >> 2) & 0b11;
        let base_rate = match sample_rate_index {
            0 => 44_100,
            1 => 48_000,
            2 => 32_000,
            _ => return Err(MediaError::InvalidFrameHeader("reserved sample rate")),
        };
        let sample_rate = match version {
            MpegVersion::Mpeg1 => base_rate,
            MpegVersion::Mpeg2 => base_rate / 2,
            MpegVersion::Mpeg25 => base_rate / 4,
        };

        Ok(Self {
            version,
            layer,
            bitrate,
            sample_rate,
            padding: (b2 >> 1) & 0x01 == 1,
            channel_mode: ChannelMode::from_bits(b3 >> 6),
        })
    }

    /// Samples encoded in one frame
    pub fn samples_per_frame(&self) -> u32 {
        match (self.layer, self.version) {
            (Layer::Layer1, _) => 384,
            (Layer::Layer2, _) => 1152,
            (Layer::Layer3, MpegVersion::Mpeg1) => 1152,
            (Layer::Layer3, _) => 576,
        }
    }

    /// Frame length in bytes, header included
    pub fn frame_len(&self) -> usize {
        let padding = self.padding as u32;
        let len = match self.layer {
            Layer::Layer1 => (12 * self.bitrate / self.sample_rate + padding) * 4,
            _ => self.samples_per_frame() / 8 * self.bitrate / self.sample_rate + padding,
        };
        len as usize
    }

    /// Byte rate of the encoded stream
    pub fn byte_rate(&self) -> u32 {
        self.bitrate / 8
    }
}

/// Size of a leading ID3v2 tag, header and footer included, or 0
pub fn id3v2_len(data: &[u8]) -> usize {
    if data.len() < ID3_HEADER_LEN || &data[..3] != b"ID3" {
        return 0;
    }

    let flags = data[5];
    // Tag size is a 28-bit synchsafe integer
    let size = data[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | (*b & 0x7F) as usize);
    let footer = if flags & 0x10 != 0 { ID3_HEADER_LEN } else { 0 };

    ID3_HEADER_LEN + size + footer
}

/// Find the first frame header in `data`
///
/// A candidate is only accepted if the following frame, when it lies inside
/// `data`, also starts with a compatible header. This filters out stray sync
/// patterns inside tags and padding.
pub fn find_frame(data: &[u8]) -> Result<(usize, FrameHeader), MediaError> {
    for offset in 0..data.len().saturating_sub(3) {
        let Ok(header) = FrameHeader::parse(read_header(data, offset)) else {
            continue;
        };

        let next = offset + header.frame_len();
        let confirmed = next + 4 > data.len()
            || FrameHeader::parse(read_header(data, next))
                .map(|h| h.version == header.version && h.layer == header.layer)
                .unwrap_or(false);

        if confirmed && header.frame_len() > 4 {
            return Ok((offset, header));
        }
    }

    Err(MediaError::NoFrameFound)
}

/// Four header bytes at `offset`; the caller checks the bounds
fn read_header(data: &[u8], offset: usize) -> [u8; 4] {
    [data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]
}

/// Read the first frame header of an MP3 file
pub async fn probe_file(path: impl AsRef<Path>) -> Result<FrameHeader, MediaError> {
    let mut file = tokio::fs::File::open(path.as_ref()).await?;

    let mut head = [0u8; ID3_HEADER_LEN];
    let n = read_up_to(&mut file, &mut head).await?;
    let skip = id3v2_len(&head[..n]);
    file.seek(SeekFrom::Start(skip as u64)).await?;

    let mut buf = BytesMut::with_capacity(PROBE_LEN);
    while buf.len() < PROBE_LEN {
        if file.read_buf(&mut buf).await? == 0 {
            break;
        }
    }

    let (offset, header) = find_frame(&buf)?;
    tracing::trace!(
        offset = skip + offset,
        bitrate = header.bitrate,
        sample_rate = header.sample_rate,
        "Found first MPEG frame"
    );
    Ok(header)
}

async fn read_up_to(file: &mut tokio::fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// MPEG-1 Layer III, 128 kbps, 44.1 kHz, joint stereo
    pub(crate) const HEADER_128K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x44];

    /// Build `frames` back-to-back 128 kbps frames with zeroed payload
    pub(crate) fn mp3_frames(frames: usize) -> Vec<u8> {
        let header = FrameHeader::parse(HEADER_128K).unwrap();
        let mut data = Vec::new();
        for _ in 0..frames {
            let start = data.len();
            data.extend_from_slice(&HEADER_128K);
            data.resize(start + header.frame_len(), 0);
        }
        data
    }

    #[test]
    fn test_parse_mpeg1_layer3() {
        let header = FrameHeader::parse(HEADER_128K).unwrap();

        assert_eq!(header.version, MpegVersion::Mpeg1);
        assert_eq!(header.layer, Layer::Layer3);
        assert_eq!(header.bitrate, 128_000);
        assert_eq!(header.sample_rate, 44_100);
        assert!(!header.padding);
        assert_eq!(header.channel_mode, ChannelMode::JointStereo);
        assert_eq!(header.channel_mode.channels(), 2);
        assert_eq!(header.frame_len(), 417);
        assert_eq!(header.byte_rate(), 16_000);
    }

    #[test]
    fn test_parse_mpeg2_layer3_mono() {
        // MPEG-2 Layer III, 64 kbps, 22.05 kHz, padded, mono
        let header = FrameHeader::parse([0xFF, 0xF3, 0x82, 0xC4]).unwrap();

        assert_eq!(header.version, MpegVersion::Mpeg2);
        assert_eq!(header.bitrate, 64_000);
        assert_eq!(header.sample_rate, 22_050);
        assert!(header.padding);
        assert_eq!(header.channel_mode, ChannelMode::Mono);
        assert_eq!(header.samples_per_frame(), 576);
        assert_eq!(header.frame_len(), 209);
    }

    #[test]
    fn test_parse_rejects_invalid_headers() {
        assert!(matches!(
            FrameHeader::parse([0x00, 0xFB, 0x90, 0x44]),
            Err(MediaError::InvalidFrameHeader(_))
        ));
        // reserved version
        assert!(FrameHeader::parse([0xFF, 0xEB, 0x90, 0x44]).is_err());
        // reserved layer
        assert!(FrameHeader::parse([0xFF, 0xF9, 0x90, 0x44]).is_err());
        // bad bitrate index
        assert!(FrameHeader::parse([0xFF, 0xFB, 0xF0, 0x44]).is_err());
        // reserved sample rate
        assert!(FrameHeader::parse([0xFF, 0xFB, 0x9C, 0x44]).is_err());
        assert!(matches!(
            FrameHeader::parse([0xFF, 0xFB, 0x00, 0x44]),
            Err(MediaError::FreeFormat)
        ));
    }

    #[test]
    fn test_id3v2_len() {
        let mut tag = b"ID3\x04\x00\x00".to_vec();
        // synchsafe 257 = 0b10_0000001
        tag.extend_from_slice(&[0x00, 0x00, 0x02, 0x01]);
        assert_eq!(id3v2_len(&tag), 10 + 257);

        tag[5] = 0x10;
        assert_eq!(id3v2_len(&tag), 10 + 257 + 10);

        assert_eq!(id3v2_len(&HEADER_128K), 0);
        assert_eq!(id3v2_len(b"ID3"), 0);
    }

    #[test]
    fn test_find_frame_skips_garbage() {
        let mut data = vec![0x00, 0xFF, 0x12, 0xFF, 0xFB];
        data.extend(mp3_frames(3));

        let (offset, header) = find_frame(&data).unwrap();
        assert_eq!(offset, 5);
        assert_eq!(header.bitrate, 128_000);
    }

    #[test]
    fn test_find_frame_at_buffer_edges() {
        // A lone header is accepted when its successor lies past the buffer
        let (offset, _) = find_frame(&HEADER_128K).unwrap();
        assert_eq!(offset, 0);

        assert!(find_frame(&HEADER_128K[..3]).is_err());
    }

    #[test]
    fn test_find_frame_rejects_unconfirmed_sync() {
        // Header-like bytes followed by junk where the next frame should start
        let header = FrameHeader::parse(HEADER_128K).unwrap();
        let mut data = HEADER_128K.to_vec();
        data.resize(header.frame_len() + 8, 0);
        let good = data.len();
        data.extend(mp3_frames(2));

        let (offset, _) = find_frame(&data).unwrap();
        assert_eq!(offset, good);
    }

    #[test]
    fn test_find_frame_none() {
        assert!(matches!(
            find_frame(&[0u8; 1024]),
            Err(MediaError::NoFrameFound)
        ));
        assert!(matches!(find_frame(&[]), Err(MediaError::NoFrameFound)));
    }

    #[tokio::test]
    async fn test_probe_file_with_id3_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.mp3");

        let mut data = b"ID3\x03\x00\x00\x00\x00\x00\x20".to_vec();
        data.extend_from_slice(&[0xFFu8; 0x20]);
        data.extend(mp3_frames(4));
        tokio::fs::write(&path, &data).await.unwrap();

        let header = probe_file(&path).await.unwrap();
        assert_eq!(header.bitrate, 128_000);
        assert_eq!(header.sample_rate, 44_100);
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_file("/definitely/not/here.mp3").await.unwrap_err();
        assert!(matches!(err, MediaError::Io(_)));
    }
}
