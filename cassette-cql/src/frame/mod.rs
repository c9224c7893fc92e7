pub mod frame_errors;
pub mod request;
pub mod response;
pub mod types;

use crate::frame::frame_errors::FrameError;
use bytes::{Buf, BufMut, Bytes};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use std::fmt::Display;
use std::str::FromStr;

use request::SerializableRequest;

pub const HEADER_SIZE: usize = 8;

/// Largest body a response frame may declare.
pub const MAX_FRAME_BODY_SIZE: usize = 256 * 1024 * 1024;

// Direction / version byte
pub const DIRECTION_REQUEST: u8 = 0x01;
pub const DIRECTION_RESPONSE: u8 = 0x81;

// Frame flags
pub const FLAG_COMPRESSION: u8 = 0x01;

/// Opcode of a frame, used to identify the message type.
///
/// Protocol v1 uses a single numbering for requests and responses;
/// every value up to and including [Opcode::Execute] is a valid header opcode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Opcode {
    Error = 0x00,
    Startup = 0x01,
    Ready = 0x02,
    Authenticate = 0x03,
    Credentials = 0x04,
    Options = 0x05,
    Supported = 0x06,
    Query = 0x07,
    Result = 0x08,
    Prepare = 0x09,
    Execute = 0x0A,
}

impl TryFrom<u8> for Opcode {
    type Error = TryFromPrimitiveError<u8>;

    fn try_from(value: u8) -> Result<Self, TryFromPrimitiveError<u8>> {
        match value {
            0x00 => Ok(Self::Error),
            0x01 => Ok(Self::Startup),
            0x02 => Ok(Self::Ready),
            0x03 => Ok(Self::Authenticate),
            0x04 => Ok(Self::Credentials),
            0x05 => Ok(Self::Options),
            0x06 => Ok(Self::Supported),
            0x07 => Ok(Self::Query),
            0x08 => Ok(Self::Result),
            0x09 => Ok(Self::Prepare),
            0x0A => Ok(Self::Execute),
            _ => Err(TryFromPrimitiveError {
                enum_name: "Opcode",
                primitive: value,
            }),
        }
    }
}

impl Opcode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Opcode::Error => "ERROR",
            Opcode::Startup => "STARTUP",
            Opcode::Ready => "READY",
            Opcode::Authenticate => "AUTHENTICATE",
            Opcode::Credentials => "CREDENTIALS",
            Opcode::Options => "OPTIONS",
            Opcode::Supported => "SUPPORTED",
            Opcode::Query => "QUERY",
            Opcode::Result => "RESULT",
            Opcode::Prepare => "PREPARE",
            Opcode::Execute => "EXECUTE",
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The wire protocol compression algorithm.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Compression {
    /// Snappy compression algorithm.
    Snappy,
}

impl Compression {
    /// The name under which the algorithm is negotiated in STARTUP.
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::Snappy => "snappy",
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a compression name is not one we can negotiate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown compression algorithm {0:?}")]
pub struct UnknownCompression(pub String);

impl FromStr for Compression {
    type Err = UnknownCompression;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snappy" => Ok(Compression::Snappy),
            other => Err(UnknownCompression(other.to_owned())),
        }
    }
}

/// A complete request frame, header included, ready to be written to the wire.
///
/// Requests are always sent uncompressed, even if compression was negotiated
/// for responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedRequest {
    opcode: Opcode,
    data: Vec<u8>,
}

impl SerializedRequest {
    pub fn make<R: SerializableRequest>(
        req: &R,
    ) -> Result<SerializedRequest, frame_errors::CqlRequestSerializationError> {
        let mut data = vec![0; HEADER_SIZE];
        req.serialize(&mut data)?;
        Ok(Self::finish(R::OPCODE, data))
    }

    /// Wraps an already serialized body.
    pub fn from_body(opcode: Opcode, body: &[u8]) -> SerializedRequest {
        let mut data = Vec::with_capacity(HEADER_SIZE + body.len());
        data.resize(HEADER_SIZE, 0);
        data.extend_from_slice(body);
        Self::finish(opcode, data)
    }

    fn finish(opcode: Opcode, mut data: Vec<u8>) -> SerializedRequest {
        data[0] = DIRECTION_REQUEST;
        data[1] = 0;
        data[2] = 0;
        data[3] = opcode as u8;

        let req_size = (data.len() - HEADER_SIZE) as u32;
        data[4..8].copy_from_slice(&req_size.to_be_bytes());

        Self { opcode, data }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn body(&self) -> &[u8] {
        &self.data[HEADER_SIZE..]
    }

    pub fn get_data(&self) -> &[u8] {
        &self.data[..]
    }
}

// Parts of the frame header which are not determined by the opcode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameParams {
    pub direction: u8,
    pub flags: u8,
    pub stream: u8,
}

impl FrameParams {
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSION != 0
    }
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            direction: DIRECTION_RESPONSE,
            flags: 0x00,
            stream: 0,
        }
    }
}

/// Reads exactly one response frame.
///
/// The header is validated before the body is read: the direction byte,
/// the flags, the opcode and the declared length must all be acceptable.
/// The returned body is still compressed if the compression flag is set;
/// see [parse_response_body].
pub async fn read_response_frame(
    reader: &mut (impl AsyncRead + Unpin),
) -> Result<(FrameParams, Opcode, Bytes), FrameError> {
    let mut raw_header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut raw_header[..]).await?;

    let mut buf = &raw_header[..];

    let direction = buf.get_u8();
    if direction != DIRECTION_RESPONSE {
        return Err(FrameError::NotAResponse(direction));
    }

    let flags = buf.get_u8();
    if flags & !FLAG_COMPRESSION != 0 {
        return Err(FrameError::UnsupportedFlags(flags));
    }

    let stream = buf.get_u8();

    let opcode = Opcode::try_from(buf.get_u8())?;

    let length = buf.get_u32() as usize;
    if length > MAX_FRAME_BODY_SIZE {
        return Err(FrameError::FrameTooLarge(length));
    }

    let frame_params = FrameParams {
        direction,
        flags,
        stream,
    };

    let mut raw_body = Vec::with_capacity(length).limit(length);
    while raw_body.has_remaining_mut() {
        let n = reader.read_buf(&mut raw_body).await?;
        if n == 0 {
            // EOF, too early
            return Err(FrameError::StdIoError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "connection was closed before body was read: missing {} out of {}",
                    raw_body.remaining_mut(),
                    length
                ),
            )));
        }
    }

    Ok((frame_params, opcode, raw_body.into_inner().into()))
}

/// Removes the compression from a response body, if the frame is marked
/// as compressed and the connection negotiated an algorithm.
///
/// A compressed frame on a connection without negotiated compression is
/// passed through as is.
pub fn parse_response_body(
    params: FrameParams,
    compression: Option<Compression>,
    body: Bytes,
) -> Result<Bytes, FrameError> {
    match compression {
        Some(compression) if params.is_compressed() => Ok(decompress(&body, compression)?.into()),
        _ => Ok(body),
    }
}

/// Writes a response frame, compressing the body when asked to.
///
/// The driver never sends responses; this is used by stub servers in tests
/// and benchmarks.
pub async fn write_response_frame(
    writer: &mut (impl AsyncWrite + Unpin),
    opcode: Opcode,
    body: &[u8],
    compression: Option<Compression>,
) -> Result<(), FrameError> {
    let mut data = vec![0; HEADER_SIZE];
    let mut flags = 0;
    match compression {
        Some(compression) => {
            flags |= FLAG_COMPRESSION;
            compress_append(body, compression, &mut data)?;
        }
        None => data.extend_from_slice(body),
    }

    data[0] = DIRECTION_RESPONSE;
    data[1] = flags;
    data[3] = opcode as u8;
    let size = (data.len() - HEADER_SIZE) as u32;
    data[4..8].copy_from_slice(&size.to_be_bytes());

    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

pub fn compress_append(
    uncomp_body: &[u8],
    compression: Compression,
    out: &mut Vec<u8>,
) -> Result<(), FrameError> {
    match compression {
        Compression::Snappy => {
            let old_size = out.len();
            out.resize(old_size + snap::raw::max_compress_len(uncomp_body.len()), 0);
            let compressed_size = snap::raw::Encoder::new()
                .compress(uncomp_body, &mut out[old_size..])
                .map_err(|_| FrameError::FrameCompression)?;
            out.truncate(old_size + compressed_size);
            Ok(())
        }
    }
}

pub fn decompress(comp_body: &[u8], compression: Compression) -> Result<Vec<u8>, FrameError> {
    match compression {
        Compression::Snappy => snap::raw::Decoder::new()
            .decompress_vec(comp_body)
            .map_err(|_| FrameError::FrameDecompression),
    }
}

/// An error type for parsing an enum value from a primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No discrimant in enum `{enum_name}` matches the value `{primitive:?}`")]
pub struct TryFromPrimitiveError<T: Copy + std::fmt::Debug> {
    enum_name: &'static str,
    primitive: T,
}

impl<T: Copy + std::fmt::Debug> TryFromPrimitiveError<T> {
    pub fn primitive(&self) -> T {
        self.primitive
    }
}
