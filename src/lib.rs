pub mod base32;
pub mod hotp;
pub mod secret;
pub mod totp;
pub(crate) mod uri_helper;

use core::num;
use std::{fmt::Display, str::FromStr};

pub use secret::{Secret, SecretEncoding};
pub use uri_helper::{OtpAuthUrl, OtpType};

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Missing secret")]
    MissingSecret,
    #[error("Missing token")]
    MissingToken,
    #[error("Missing counter value for HOTP")]
    MissingCounter,
    #[error("Invalid character found: {0}")]
    InvalidCharacter(char),
    #[error("Wrong token length, expected {expected} digits but found {found}")]
    TokenLengthMismatch { expected: u32, found: usize },
    #[error("Cannot parse token to a number: {0}")]
    TokenNotNumeric(String),
    #[error("No matching code found")]
    NoMatch,
    #[error("Invalid OTP type, found {0}. Expected one of: totp or hotp")]
    InvalidType(String),
    #[error("Invalid number of digits: {0}")]
    InvalidDigits(u32),
    #[error("Invalid period: {0}")]
    InvalidPeriod(u64),
    #[error("The counter cannot be negative")]
    InvalidCounter,
    #[error("Unsupported hashing algorithm, found {0}. Expected one of: SHA1, SHA256 or SHA512")]
    UnsupportedAlgorithm(String),
    #[error("Unsupported secret encoding, found {0}. Expected one of: ascii, hex, base32 or base64")]
    UnsupportedEncoding(String),
    #[error("Secret decode error")]
    SecretDecode(#[source] data_encoding::DecodeError),
    #[error("Invalid HMAC key length")]
    InvalidKeyLength,
    #[error("Invalid digest")]
    InvalidDigest(Vec<u8>),
    #[error("The provided URI is not valid, found {0}. Expected: {1}")]
    InvalidUriType(String, String),
    #[error("Could not parse the URI")]
    UriParseError(#[source] url::ParseError),
    #[error("Could not parse an integer. Failed parsing: {1}")]
    IntegerParseError(#[source] num::ParseIntError, String),
    #[error("The system clock is set before the UNIX epoch")]
    SystemTime,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OtpHashAlgorithm {
    #[default]
    SHA1,
    SHA256,
    SHA512,
}

impl OtpHashAlgorithm {
    /// Size in bytes of the digest produced by the algorithm. HMAC keys are
    /// normalized to this length before signing.
    pub fn digest_len(&self) -> usize {
        match self {
            Self::SHA1 => 20,
            Self::SHA256 => 32,
            Self::SHA512 => 64,
        }
    }
}

impl Display for OtpHashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SHA1 => write!(f, "SHA1"),
            Self::SHA256 => write!(f, "SHA256"),
            Self::SHA512 => write!(f, "SHA512"),
        }
    }
}

impl FromStr for OtpHashAlgorithm {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_uppercase();

        match normalized.as_str() {
            "SHA1" => Ok(Self::SHA1),
            "SHA256" => Ok(Self::SHA256),
            "SHA512" => Ok(Self::SHA512),
            _ => Err(OtpError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// A generated one-time code. Displays as a zero-padded decimal string of
/// exactly `digits` characters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OtpCode {
    code: u32,
    digits: u32,
}

impl OtpCode {
    pub fn integer(&self) -> u32 {
        self.code
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }
}

impl Display for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:0padding$}",
            self.code,
            padding = (self.digits as usize)
        )
    }
}

pub trait Otp {
    /// Builds the `otpauth://` provisioning URL for this configuration
    fn to_uri(&self, label: &str, issuer: Option<&str>) -> Result<String, OtpError>;

    /// Reads a configuration back from an `otpauth://` provisioning URL
    fn from_uri(uri: &str) -> Result<Self, OtpError>
    where
        Self: std::marker::Sized;
}
