//! CQL responses sent by the server.

pub mod error;
pub mod result;

use bytes::Bytes;

use crate::frame::frame_errors::CqlResponseParseError;
use crate::frame::types;
use crate::frame::Opcode;

pub use error::Error;

/// Implements Authenticate message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticate {
    pub authenticator_name: String,
}

impl Authenticate {
    pub fn deserialize(buf: &mut &[u8]) -> Result<Self, CqlResponseParseError> {
        let authenticator_name = types::read_string(buf)
            .map_err(CqlResponseParseError::CqlAuthenticateParseError)?
            .to_string();

        Ok(Authenticate { authenticator_name })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Error(Error),
    Ready,
    Authenticate(Authenticate),
    Result(result::Result),
    /// A frame whose opcode is valid but never expected from a server.
    /// Its body is kept as received.
    Other(Opcode, Bytes),
}

impl Response {
    /// Deserializes an uncompressed response body.
    pub fn deserialize(opcode: Opcode, body: Bytes) -> Result<Response, CqlResponseParseError> {
        let response = match opcode {
            Opcode::Error => Response::Error(Error::deserialize(&mut &*body)?),
            Opcode::Ready => Response::Ready,
            Opcode::Authenticate => Response::Authenticate(Authenticate::deserialize(&mut &*body)?),
            Opcode::Result => Response::Result(result::deserialize(body)?),
            other => Response::Other(other, body),
        };

        Ok(response)
    }

    /// Name of the response, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Response::Error(_) => "ERROR",
            Response::Ready => "READY",
            Response::Authenticate(_) => "AUTHENTICATE",
            Response::Result(res) => res.kind_name(),
            Response::Other(opcode, _) => opcode.as_str(),
        }
    }
}
