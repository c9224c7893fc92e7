use crate::errors::DbError;
use crate::frame::frame_errors::CqlErrorParseError;
use crate::frame::types;

/// Body of an ERROR frame: the code sent by the server and its message, verbatim.
///
/// Protocol v1 appends extra fields to some errors (e.g. timeouts carry
/// the consistency and replica counts). They are not needed to classify
/// the error and are left unread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub error: DbError,
    pub reason: String,
}

impl Error {
    pub fn deserialize(buf: &mut &[u8]) -> Result<Self, CqlErrorParseError> {
        let code = types::read_int(buf)
            .map_err(|err| CqlErrorParseError::ErrorCodeParseError(err.into()))?;
        // A [string], with invalid UTF-8 replaced rather than rejected.
        let reason = types::read_short_bytes(buf).map_err(CqlErrorParseError::ReasonParseError)?;
        let reason = String::from_utf8_lossy(reason).into_owned();

        Ok(Error {
            error: DbError::from_code(code),
            reason,
        })
    }

    /// The raw numeric code, as received.
    pub fn code(&self) -> i32 {
        self.error.code()
    }
}
