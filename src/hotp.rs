use hmac::{digest::KeyInit, Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::{
    uri_helper::{OtpAuthUrl, OtpType},
    Otp, OtpCode, OtpError, OtpHashAlgorithm, Secret,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Hotp {
    pub(crate) secret: Secret,
    pub(crate) algorithm: OtpHashAlgorithm,
    // How many digits to generate
    pub(crate) digits: u32,
    // The moving counter, used by `generate_current` and to build the URI
    pub(crate) counter: Option<u64>,
}

impl Otp for Hotp {
    fn to_uri(&self, label: &str, issuer: Option<&str>) -> Result<String, OtpError> {
        let mut url = OtpAuthUrl::new(OtpType::Hotp, label, self.secret.clone());
        url.issuer = issuer.map(str::to_string);
        url.counter = self.counter;
        url.algorithm = self.algorithm;
        url.digits = self.digits;

        url.build()
    }

    fn from_uri(uri: &str) -> Result<Self, OtpError> {
        let url = OtpAuthUrl::parse(uri)?;
        if url.otp_type != OtpType::Hotp {
            return Err(OtpError::InvalidUriType(
                url.otp_type.to_string(),
                OtpType::Hotp.to_string(),
            ));
        }

        Ok(Self {
            secret: url.secret,
            algorithm: url.algorithm,
            digits: url.digits,
            counter: url.counter,
        })
    }
}

impl Hotp {
    /// Creates the config for the [HMAC-based One-time Password Algorithm](http://en.wikipedia.org/wiki/HMAC-based_One-time_Password_Algorithm)
    /// (HOTP) given a shared secret
    ///
    /// Obs.: This method defaults to the SHA1 hash and a 6-digit code.
    pub fn new(secret: Secret) -> Self {
        Self {
            secret,
            algorithm: OtpHashAlgorithm::SHA1,
            digits: 6,
            counter: None,
        }
    }

    ///  Sets hashing algorithm
    pub fn with_algorithm(&mut self, algorithm: OtpHashAlgorithm) -> &mut Self {
        self.algorithm = algorithm;

        self
    }

    ///  Sets the number of digits to generate
    pub fn with_digits(&mut self, digits: u32) -> &mut Self {
        self.digits = digits;

        self
    }

    ///  Sets the moving counter
    pub fn with_counter(&mut self, counter: u64) -> &mut Self {
        self.counter = Some(counter);

        self
    }

    /// Calculates the raw HMAC digest of the big-endian `counter`, keyed by
    /// the normalized secret.
    pub fn digest(&self, counter: u64) -> Result<Vec<u8>, OtpError> {
        let key = self.secret.key(self.algorithm)?;
        let data = counter.to_be_bytes();

        match self.algorithm {
            OtpHashAlgorithm::SHA1 => sign::<Hmac<Sha1>>(&key, &data),
            OtpHashAlgorithm::SHA256 => sign::<Hmac<Sha256>>(&key, &data),
            OtpHashAlgorithm::SHA512 => sign::<Hmac<Sha512>>(&key, &data),
        }
    }

    /// Generates a HOTP from the provided counter
    /// truncated to the specified number of digits
    pub fn generate(&self, counter: u64) -> Result<OtpCode, OtpError> {
        if self.digits == 0 {
            return Err(OtpError::InvalidDigits(self.digits));
        }

        let digest = self.digest(counter)?;
        let code = encode_digest_truncated(&digest, self.digits)?;

        Ok(OtpCode {
            code,
            digits: self.digits,
        })
    }

    /// Generates a HOTP at the configured moving counter
    pub fn generate_current(&self) -> Result<OtpCode, OtpError> {
        let counter = self.counter.ok_or(OtpError::MissingCounter)?;

        self.generate(counter)
    }

    /// Verifies `token` against the codes from `counter` up to
    /// `counter + window` inclusive, returning how many steps ahead of
    /// `counter` the match was found
    pub fn verify_delta(&self, token: &str, counter: u64, window: u32) -> Result<i64, OtpError> {
        self.scan_window(token, counter, 0, window)
    }

    /// Same as [`Hotp::verify_delta`], reporting any failure as `false`
    pub fn verify(&self, token: &str, counter: u64, window: u32) -> bool {
        self.verify_delta(token, counter, window).is_ok()
    }

    /// Searches `[reference - behind, reference + ahead]` in ascending order
    /// and returns the offset of the first match relative to `reference`.
    ///
    /// The lower bound stops at counter 0.
    pub(crate) fn scan_window(
        &self,
        token: &str,
        reference: u64,
        behind: u32,
        ahead: u32,
    ) -> Result<i64, OtpError> {
        let expected = self.parse_token(token)?;

        let start = reference.saturating_sub(u64::from(behind));
        let end = reference.saturating_add(u64::from(ahead));

        for counter in start..=end {
            if u64::from(self.generate(counter)?.integer()) == expected {
                // Both bounds are within u32::MAX of the reference
                let delta = (i128::from(counter) - i128::from(reference)) as i64;
                tracing::debug!(delta, "one-time code matched");

                return Ok(delta);
            }
        }

        tracing::debug!(start, end, "no matching one-time code in window");
        Err(OtpError::NoMatch)
    }

    fn parse_token(&self, token: &str) -> Result<u64, OtpError> {
        if self.secret.is_empty() {
            return Err(OtpError::MissingSecret);
        }

        if token.is_empty() {
            return Err(OtpError::MissingToken);
        }

        let found = token.chars().count();
        if found != self.digits as usize {
            return Err(OtpError::TokenLengthMismatch {
                expected: self.digits,
                found,
            });
        }

        if !token.chars().all(|c| c.is_ascii_digit()) {
            return Err(OtpError::TokenNotNumeric(token.to_string()));
        }

        token
            .parse::<u64>()
            .map_err(|_| OtpError::TokenNotNumeric(token.to_string()))
    }
}

fn sign<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, OtpError> {
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| OtpError::InvalidKeyLength)?;
    mac.update(data);

    Ok(mac.finalize().into_bytes().to_vec())
}

/// Encodes the HMAC digest into a truncated integer.
fn encode_digest_truncated(digest: &[u8], target_digits_count: u32) -> Result<u32, OtpError> {
    // While sometimes this is a hardcoded 19
    // the last byte tells us the offset for any algorithm
    let offset = match digest.last() {
        Some(x) => *x & 0xf,
        None => return Err(OtpError::InvalidDigest(Vec::from(digest))),
    } as usize;

    // Gets the 4 bytes that will compose the code
    let code_bytes: [u8; 4] = match digest.get(offset..offset + 4).map(<[u8; 4]>::try_from) {
        Some(Ok(x)) => x,
        _ => return Err(OtpError::InvalidDigest(Vec::from(digest))),
    };

    let code = u32::from_be_bytes(code_bytes) & 0x7fff_ffff;

    // Past 9 digits the 31-bit code never needs truncating
    match 10u32.checked_pow(target_digits_count) {
        Some(truncation_factor) => Ok(code % truncation_factor),
        None => Ok(code),
    }
}
