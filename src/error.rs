pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed wire input; aborts the current decode.
    WireParse,
    /// A name would exceed 255 octets or a label 63 octets.
    NameTooLong,
    /// A type mnemonic or numeric code outside [0, 65535].
    InvalidType,
    /// A class mnemonic or numeric code outside [0, 65535].
    InvalidClass,
    /// Presentation-format error, with source location in the message.
    TextParse,
    /// TSIG verification failed or the signature is out of its time window.
    TsigVerify,
    /// Zone transfer protocol or synchronization failure.
    ZoneTransfer,
    /// An I/O deadline expired.
    Timeout,
    /// Zone contents violate a structural invariant (missing SOA, ...).
    ZoneData,
    /// A TSIG key file already exists at the target path.
    KeyFileExists,
    /// No TSIG key file at the given path, or no such key in the store.
    KeyFileNotFound,
    /// The named HMAC algorithm is not available.
    UnsupportedAlgorithm,
    Io,
    SerdeYaml,
    Base64,
}

/// Builds an [`Error`] from a kind and an optional formatted message.
macro_rules! error {
    ($kind:ident) => {
        $crate::error::Error {
            kind: $crate::error::ErrorKind::$kind,
            message: None,
        }
    };
    ($kind:ident => $($arg:tt)*) => {
        $crate::error::Error {
            kind: $crate::error::ErrorKind::$kind,
            message: Some(format!($($arg)*)),
        }
    };
}

pub(crate) use error;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.kind, message),
            None => self.kind.fmt(f),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorKind::*;

        match self {
            WireParse => write!(f, "wire parse error"),
            NameTooLong => write!(f, "name too long"),
            InvalidType => write!(f, "invalid record type"),
            InvalidClass => write!(f, "invalid class"),
            TextParse => write!(f, "text parse error"),
            TsigVerify => write!(f, "tsig verification failure"),
            ZoneTransfer => write!(f, "zone transfer error"),
            Timeout => write!(f, "operation timed out"),
            ZoneData => write!(f, "invalid zone data"),
            KeyFileExists => write!(f, "key file already exists"),
            KeyFileNotFound => write!(f, "key not found"),
            UnsupportedAlgorithm => write!(f, "unsupported algorithm"),
            Io => write!(f, "io error"),
            SerdeYaml => write!(f, "serde yaml error"),
            Base64 => write!(f, "base64 error"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        let kind = match value.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            _ => ErrorKind::Io,
        };
        Self {
            kind,
            message: Some(value.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(value: serde_yaml::Error) -> Self {
        Self {
            kind: ErrorKind::SerdeYaml,
            message: Some(value.to_string()),
        }
    }
}

impl From<base64::DecodeError> for Error {
    fn from(value: base64::DecodeError) -> Self {
        Self {
            kind: ErrorKind::Base64,
            message: Some(value.to_string()),
        }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(value: std::str::Utf8Error) -> Self {
        Self {
            kind: ErrorKind::TextParse,
            message: Some(value.to_string()),
        }
    }
}
