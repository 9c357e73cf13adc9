use std::{fmt::Display, str::FromStr};

use rand::{rngs::OsRng, Rng};

use crate::{
    base32,
    uri_helper::{OtpAuthUrl, OtpType},
    OtpError, OtpHashAlgorithm,
};

const ALPHANUMERIC_CHARSET: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const SYMBOLS_CHARSET: &str = "!@#$%^&*()<>?/[]{},.:;";

/// How a secret string is turned into key bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SecretEncoding {
    /// The bytes of the string itself
    #[default]
    Ascii,
    Hex,
    Base32,
    Base64,
}

impl Display for SecretEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ascii => write!(f, "ascii"),
            Self::Hex => write!(f, "hex"),
            Self::Base32 => write!(f, "base32"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

impl FromStr for SecretEncoding {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ascii" => Ok(Self::Ascii),
            "hex" => Ok(Self::Hex),
            "base32" => Ok(Self::Base32),
            "base64" => Ok(Self::Base64),
            _ => Err(OtpError::UnsupportedEncoding(s.to_string())),
        }
    }
}

/// A shared secret, either still in one of its textual encodings or as the
/// already decoded key bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Secret {
    Encoded {
        value: String,
        encoding: SecretEncoding,
    },
    Bytes(Vec<u8>),
}

impl Secret {
    pub fn ascii(value: impl Into<String>) -> Self {
        Self::from_encoded(value, SecretEncoding::Ascii)
    }

    pub fn hex(value: impl Into<String>) -> Self {
        Self::from_encoded(value, SecretEncoding::Hex)
    }

    pub fn base32(value: impl Into<String>) -> Self {
        Self::from_encoded(value, SecretEncoding::Base32)
    }

    pub fn base64(value: impl Into<String>) -> Self {
        Self::from_encoded(value, SecretEncoding::Base64)
    }

    pub fn from_encoded(value: impl Into<String>, encoding: SecretEncoding) -> Self {
        Self::Encoded {
            value: value.into(),
            encoding,
        }
    }

    /// True when no secret material was supplied at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Encoded { value, .. } => value.is_empty(),
            Self::Bytes(bytes) => bytes.is_empty(),
        }
    }

    /// Decodes the secret into its raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, OtpError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Encoded { value, encoding } => match encoding {
                SecretEncoding::Ascii => Ok(value.as_bytes().to_vec()),
                SecretEncoding::Hex => data_encoding::HEXLOWER_PERMISSIVE
                    .decode(value.as_bytes())
                    .map_err(OtpError::SecretDecode),
                SecretEncoding::Base32 => base32::decode(value),
                SecretEncoding::Base64 => decode_base64(value),
            },
        }
    }

    /// Returns the secret as padded base32, the form expected by the
    /// `secret` parameter of an otpauth URL. Base32 input is kept verbatim.
    pub fn to_base32(&self) -> Result<String, OtpError> {
        match self {
            Self::Encoded {
                value,
                encoding: SecretEncoding::Base32,
            } => Ok(value.clone()),
            _ => Ok(base32::encode(&self.decode()?, true)),
        }
    }

    /// Decodes the secret and normalizes it into an HMAC key for `algorithm`.
    pub fn key(&self, algorithm: OtpHashAlgorithm) -> Result<Vec<u8>, OtpError> {
        let decoded = self.decode()?;
        if decoded.is_empty() {
            return Err(OtpError::MissingSecret);
        }

        Ok(normalize_key(&decoded, algorithm))
    }
}

/// Stretches or truncates `secret` to the digest size of `algorithm`.
///
/// A key of any other length is repeated until it covers the digest size and
/// the excess is cut off, so the 20 byte RFC 4226 key becomes the 32 and 64
/// byte keys used by the RFC 6238 SHA256 and SHA512 test vectors.
// Padding is optional and the URL-safe alphabet is accepted too
fn decode_base64(value: &str) -> Result<Vec<u8>, OtpError> {
    let standard: Vec<u8> = value
        .trim_end_matches('=')
        .bytes()
        .map(|b| match b {
            b'-' => b'+',
            b'_' => b'/',
            b => b,
        })
        .collect();

    data_encoding::BASE64_NOPAD
        .decode(&standard)
        .map_err(OtpError::SecretDecode)
}

pub(crate) fn normalize_key(secret: &[u8], algorithm: OtpHashAlgorithm) -> Vec<u8> {
    let target = algorithm.digest_len();
    if secret.len() == target {
        return secret.to_vec();
    }

    secret.iter().copied().cycle().take(target).collect()
}

/// Generates a random secret of `length` characters from `A-Z`, `a-z`, `0-9`
/// and, when `symbols` is set, punctuation.
pub fn generate_secret_ascii(length: usize, symbols: bool) -> String {
    let mut charset = ALPHANUMERIC_CHARSET.to_string();
    if symbols {
        charset.push_str(SYMBOLS_CHARSET);
    }
    let charset = charset.as_bytes();

    let mut rng = OsRng;
    (0..length)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretOptions {
    pub length: usize,
    pub symbols: bool,
    pub label: String,
    pub issuer: String,
}

impl Default for SecretOptions {
    fn default() -> Self {
        Self {
            length: 32,
            symbols: false,
            label: "SecretKey".to_string(),
            issuer: String::new(),
        }
    }
}

/// Generates a new ASCII secret together with the label and issuer that
/// will be shown by the authenticator app.
pub fn generate_secret(options: &SecretOptions) -> SecretKey {
    let secret = generate_secret_ascii(options.length, options.symbols);
    tracing::debug!(length = options.length, "generated new secret");

    SecretKey::new(secret, options.label.clone(), options.issuer.clone())
}

/// Parameters of the provisioning URL built by [`SecretKey::otpauth_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOptions {
    pub otp_type: OtpType,
    pub counter: Option<u64>,
    pub algorithm: OtpHashAlgorithm,
    pub digits: u32,
    pub period: u64,
    /// How the secret string of the [`SecretKey`] is encoded
    pub encoding: SecretEncoding,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            otp_type: OtpType::Totp,
            counter: None,
            algorithm: OtpHashAlgorithm::SHA1,
            digits: 6,
            period: 30,
            encoding: SecretEncoding::Ascii,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretKey {
    secret: String,
    label: String,
    issuer: String,
}

impl SecretKey {
    pub fn new(secret: String, label: String, issuer: String) -> Self {
        Self {
            secret,
            label,
            issuer,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Builds the `otpauth://` URL an authenticator app scans to install
    /// this secret. Pass it to a QR code renderer to produce the image.
    pub fn otpauth_url(&self, options: &UrlOptions) -> Result<String, OtpError> {
        let issuer = (!self.issuer.is_empty()).then(|| self.issuer.clone());

        OtpAuthUrl {
            otp_type: options.otp_type,
            label: self.label.clone(),
            secret: Secret::from_encoded(self.secret.clone(), options.encoding),
            issuer,
            counter: options.counter,
            algorithm: options.algorithm,
            digits: options.digits,
            period: options.period,
        }
        .build()
    }
}
