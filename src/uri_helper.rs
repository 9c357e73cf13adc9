use std::{borrow::Cow, fmt::Display, str::FromStr};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{OtpError, OtpHashAlgorithm, Secret};

// Everything but the characters encodeURIComponent leaves alone
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const TOTP_TYPE: &str = "totp";
const HOTP_TYPE: &str = "hotp";

const URI_SECRET_QUERY: &str = "secret";
const URI_ISSUER_QUERY: &str = "issuer";
const URI_HASH_QUERY: &str = "algorithm";
const URI_PERIOD_QUERY: &str = "period";
const URI_COUNTER_QUERY: &str = "counter";
const URI_DIGITS_QUERY: &str = "digits";

const DEFAULT_PERIOD: u64 = 30;
const DEFAULT_DIGITS: u32 = 6;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OtpType {
    #[default]
    Totp,
    Hotp,
}

impl Display for OtpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Totp => write!(f, "{TOTP_TYPE}"),
            Self::Hotp => write!(f, "{HOTP_TYPE}"),
        }
    }
}

impl FromStr for OtpType {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            TOTP_TYPE => Ok(Self::Totp),
            HOTP_TYPE => Ok(Self::Hotp),
            _ => Err(OtpError::InvalidType(s.to_string())),
        }
    }
}

/// The contents of an `otpauth://` provisioning URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpAuthUrl {
    pub otp_type: OtpType,
    pub label: String,
    pub secret: Secret,
    pub issuer: Option<String>,
    /// Required for [`OtpType::Hotp`], ignored otherwise
    pub counter: Option<u64>,
    pub algorithm: OtpHashAlgorithm,
    pub digits: u32,
    pub period: u64,
}

impl OtpAuthUrl {
    pub fn new(otp_type: OtpType, label: impl Into<String>, secret: Secret) -> Self {
        Self {
            otp_type,
            label: label.into(),
            secret,
            issuer: None,
            counter: None,
            algorithm: OtpHashAlgorithm::default(),
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
        }
    }

    /// Serializes the URL. Query parameters are always emitted in the order
    /// secret, issuer, counter (HOTP only), algorithm, digits, period.
    pub fn build(&self) -> Result<String, OtpError> {
        let counter = match (self.otp_type, self.counter) {
            (OtpType::Hotp, None) => return Err(OtpError::MissingCounter),
            (OtpType::Hotp, Some(counter)) => Some(counter),
            (OtpType::Totp, _) => None,
        };

        validate_digits(self.digits)?;
        validate_period(self.period)?;

        let secret = self.secret.to_base32()?;

        let mut query_params = vec![(URI_SECRET_QUERY, secret)];

        if let Some(issuer) = self.issuer.as_deref().filter(|i| !i.is_empty()) {
            query_params.push((URI_ISSUER_QUERY, issuer.to_string()));
        }

        if let Some(counter) = counter {
            query_params.push((URI_COUNTER_QUERY, counter.to_string()));
        }

        query_params.push((URI_HASH_QUERY, self.algorithm.to_string()));
        query_params.push((URI_DIGITS_QUERY, self.digits.to_string()));
        query_params.push((URI_PERIOD_QUERY, self.period.to_string()));

        let query = query_params
            .iter()
            .map(|(key, value)| format!("{key}={}", encode_component(value)))
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!(
            "otpauth://{}/{}?{query}",
            self.otp_type,
            encode_component(&self.label)
        ))
    }

    /// Parses an `otpauth://` URL. The secret is kept in its base32 form.
    pub fn parse(uri: &str) -> Result<Self, OtpError> {
        let uri = url::Url::parse(uri).map_err(OtpError::UriParseError)?;

        if uri.scheme() != "otpauth" {
            return Err(OtpError::InvalidUriType(
                uri.scheme().into(),
                "otpauth".into(),
            ));
        }

        let otp_type = OtpType::from_str(uri.host_str().unwrap_or_default())?;

        let path = uri.path().trim_start_matches('/');
        let label = percent_decode_str(path).decode_utf8_lossy().into_owned();

        let mut secret = "".to_string();
        let mut issuer = None;
        let mut algorithm = OtpHashAlgorithm::default();
        let mut period = DEFAULT_PERIOD;
        let mut counter = None;
        let mut digits = DEFAULT_DIGITS;

        for params in uri.query_pairs() {
            match params.0 {
                Cow::Borrowed(URI_SECRET_QUERY) => secret = params.1.to_string(),
                Cow::Borrowed(URI_ISSUER_QUERY) => issuer = Some(params.1.to_string()),
                Cow::Borrowed(URI_HASH_QUERY) => {
                    algorithm = OtpHashAlgorithm::from_str(params.1.as_ref())?
                }
                Cow::Borrowed(URI_PERIOD_QUERY) => {
                    period = u64::from_str(params.1.as_ref())
                        .map_err(|e| OtpError::IntegerParseError(e, URI_PERIOD_QUERY.into()))?
                }
                Cow::Borrowed(URI_DIGITS_QUERY) => {
                    digits = u32::from_str(params.1.as_ref())
                        .map_err(|e| OtpError::IntegerParseError(e, URI_DIGITS_QUERY.into()))?
                }
                Cow::Borrowed(URI_COUNTER_QUERY) => {
                    counter = Some(
                        u64::from_str(params.1.as_ref()).map_err(|e| {
                            OtpError::IntegerParseError(e, URI_COUNTER_QUERY.into())
                        })?,
                    )
                }
                _ => (),
            }
        }

        if secret.is_empty() {
            return Err(OtpError::MissingSecret);
        }

        if otp_type == OtpType::Hotp && counter.is_none() {
            return Err(OtpError::MissingCounter);
        }

        validate_digits(digits)?;
        validate_period(period)?;

        Ok(Self {
            otp_type,
            label,
            secret: Secret::base32(secret),
            issuer,
            counter,
            algorithm,
            digits,
            period,
        })
    }
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT_ENCODE_SET).to_string()
}

// Authenticator apps only display 6 or 8 digit codes
fn validate_digits(digits: u32) -> Result<(), OtpError> {
    match digits {
        6 | 8 => Ok(()),
        _ => Err(OtpError::InvalidDigits(digits)),
    }
}

fn validate_period(period: u64) -> Result<(), OtpError> {
    match period {
        0 => Err(OtpError::InvalidPeriod(period)),
        _ => Ok(()),
    }
}
