use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    hotp::Hotp,
    uri_helper::{OtpAuthUrl, OtpType},
    Otp, OtpCode, OtpError, OtpHashAlgorithm, Secret,
};

/// Point in time a TOTP is generated or verified for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum At {
    /// The current wall-clock time
    #[default]
    Now,
    /// Seconds since the UNIX epoch
    Time(u64),
    /// An already computed counter, bypassing time derivation
    Counter(u64),
}

/// Number of whole `step`s elapsed between `epoch` and `time`, all in
/// seconds.
pub fn time_counter(time: u64, step: u64, epoch: u64) -> Result<u64, OtpError> {
    if step == 0 {
        return Err(OtpError::InvalidPeriod(step));
    }

    let elapsed = time.checked_sub(epoch).ok_or(OtpError::InvalidCounter)?;

    Ok(elapsed / step)
}

/// Seconds since the UNIX epoch according to the system clock
pub fn now() -> Result<u64, OtpError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|_| OtpError::SystemTime)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Totp {
    pub(crate) hotp: Hotp,
    pub(crate) step: u64,
    pub(crate) epoch: u64,
}

impl Otp for Totp {
    fn to_uri(&self, label: &str, issuer: Option<&str>) -> Result<String, OtpError> {
        let mut url = OtpAuthUrl::new(OtpType::Totp, label, self.hotp.secret.clone());
        url.issuer = issuer.map(str::to_string);
        url.algorithm = self.hotp.algorithm;
        url.digits = self.hotp.digits;
        url.period = self.step;

        url.build()
    }

    fn from_uri(uri: &str) -> Result<Self, OtpError> {
        let url = OtpAuthUrl::parse(uri)?;
        if url.otp_type != OtpType::Totp {
            return Err(OtpError::InvalidUriType(
                url.otp_type.to_string(),
                OtpType::Totp.to_string(),
            ));
        }

        let mut totp = Totp::new(url.secret);
        totp.with_algorithm(url.algorithm)
            .with_digits(url.digits)
            .with_step(url.period);

        Ok(totp)
    }
}

impl Totp {
    /// Creates the config for the [Time-based One-time Password Algorithm](http://en.wikipedia.org/wiki/Time-based_One-time_Password_Algorithm)
    /// (TOTP) given a shared secret
    ///
    /// Obs.: This method defaults to the SHA1 hash, a 6-digit code, a step of
    /// 30 seconds and the UNIX epoch as the initial time
    pub fn new(secret: Secret) -> Self {
        Self {
            hotp: Hotp::new(secret),
            step: 30,
            epoch: 0,
        }
    }

    ///  Sets hashing algorithm
    pub fn with_algorithm(&mut self, algorithm: OtpHashAlgorithm) -> &mut Self {
        self.hotp.with_algorithm(algorithm);

        self
    }

    ///  Sets the number of digits to generate
    pub fn with_digits(&mut self, digits: u32) -> &mut Self {
        self.hotp.with_digits(digits);

        self
    }

    ///  Sets the time step in seconds
    pub fn with_step(&mut self, step: u64) -> &mut Self {
        self.step = step;

        self
    }

    ///  Sets the time in seconds since the UNIX epoch from which steps are counted
    pub fn with_epoch(&mut self, epoch: u64) -> &mut Self {
        self.epoch = epoch;

        self
    }

    /// Resolves `at` into the HOTP counter it corresponds to
    pub fn counter(&self, at: At) -> Result<u64, OtpError> {
        match at {
            At::Now => time_counter(now()?, self.step, self.epoch),
            At::Time(time) => time_counter(time, self.step, self.epoch),
            At::Counter(counter) => Ok(counter),
        }
    }

    /// Seconds left before the code generated at `time` expires
    pub fn remaining_seconds(&self, time: u64) -> Result<u64, OtpError> {
        if self.step == 0 {
            return Err(OtpError::InvalidPeriod(self.step));
        }

        let elapsed = time.checked_sub(self.epoch).ok_or(OtpError::InvalidCounter)?;

        Ok(self.step - elapsed % self.step)
    }

    /// Generates a TOTP for the given point in time
    /// truncated to the specified number of digits
    pub fn generate(&self, at: At) -> Result<OtpCode, OtpError> {
        let counter = self.counter(at)?;

        self.hotp.generate(counter)
    }

    /// Verifies `token` against the codes within `window` steps on either
    /// side of `at`.
    ///
    /// Returns the signed number of steps between `at` and the matching
    /// code: 0 for the current step, negative for past steps.
    ///
    /// Obs.: the RFC recommends a window of 1 step, but this function accepts
    /// any window you would like
    pub fn verify_delta(&self, token: &str, at: At, window: u32) -> Result<i64, OtpError> {
        if self.hotp.secret.is_empty() {
            return Err(OtpError::MissingSecret);
        }

        if token.is_empty() {
            return Err(OtpError::MissingToken);
        }

        let counter = self.counter(at)?;

        self.hotp.scan_window(token, counter, window, window)
    }

    /// Same as [`Totp::verify_delta`], reporting any failure as `false`
    pub fn verify(&self, token: &str, at: At, window: u32) -> bool {
        self.verify_delta(token, at, window).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use crate::{
        totp::{time_counter, At, Totp},
        Otp, OtpError, OtpHashAlgorithm, Secret,
    };

    #[fixture]
    #[once]
    pub fn rfc_secret() -> Secret {
        Secret::ascii("12345678901234567890")
    }

    #[fixture]
    #[once]
    pub fn window_secret() -> Secret {
        Secret::ascii("rNONHRni6BAk7y2TiKrv")
    }

    #[rstest]
    #[case(OtpHashAlgorithm::SHA1, 59, "94287082")]
    #[case(OtpHashAlgorithm::SHA256, 59, "46119246")]
    #[case(OtpHashAlgorithm::SHA512, 59, "90693936")]
    #[case(OtpHashAlgorithm::SHA1, 1111111109, "07081804")]
    #[case(OtpHashAlgorithm::SHA256, 1111111109, "68084774")]
    #[case(OtpHashAlgorithm::SHA512, 1111111109, "25091201")]
    #[case(OtpHashAlgorithm::SHA1, 1111111111, "14050471")]
    #[case(OtpHashAlgorithm::SHA256, 1111111111, "67062674")]
    #[case(OtpHashAlgorithm::SHA512, 1111111111, "99943326")]
    #[case(OtpHashAlgorithm::SHA1, 1234567890, "89005924")]
    #[case(OtpHashAlgorithm::SHA256, 1234567890, "91819424")]
    #[case(OtpHashAlgorithm::SHA512, 1234567890, "93441116")]
    #[case(OtpHashAlgorithm::SHA1, 2000000000, "69279037")]
    #[case(OtpHashAlgorithm::SHA256, 2000000000, "90698825")]
    #[case(OtpHashAlgorithm::SHA512, 2000000000, "38618901")]
    #[case(OtpHashAlgorithm::SHA1, 20000000000, "65353130")]
    #[case(OtpHashAlgorithm::SHA256, 20000000000, "77737706")]
    #[case(OtpHashAlgorithm::SHA512, 20000000000, "47863826")]
    #[case(OtpHashAlgorithm::SHA1, 20000000000, "353130")]
    #[case(OtpHashAlgorithm::SHA256, 20000000000, "737706")]
    #[case(OtpHashAlgorithm::SHA512, 20000000000, "863826")]
    fn totp_test(
        rfc_secret: &Secret,
        #[case] hash: OtpHashAlgorithm,
        #[case] timestamp: u64,
        #[case] expected: &str,
    ) {
        let mut totp_base = Totp::new(rfc_secret.clone());
        totp_base
            .with_algorithm(hash)
            .with_digits(expected.len() as u32);

        let generated_otp = totp_base.generate(At::Time(timestamp)).unwrap();
        assert_eq!(expected, generated_otp.to_string());
    }

    #[rstest]
    #[case(59, 0x01)]
    #[case(1111111109, 0x023523EC)]
    #[case(1111111111, 0x023523ED)]
    #[case(1234567890, 0x0273EF07)]
    #[case(2000000000, 0x03F940AA)]
    #[case(20000000000, 0x27BC86AA)]
    fn counter_test(#[case] time: u64, #[case] expected: u64) {
        assert_eq!(expected, time_counter(time, 30, 0).unwrap());
    }

    #[rstest]
    #[case(100, 30, 40, 2)]
    #[case(40, 30, 40, 0)]
    #[case(59, 60, 0, 0)]
    fn counter_with_epoch(
        #[case] time: u64,
        #[case] step: u64,
        #[case] epoch: u64,
        #[case] expected: u64,
    ) {
        assert_eq!(expected, time_counter(time, step, epoch).unwrap());
    }

    #[test]
    fn counter_before_epoch_is_rejected() {
        assert!(matches!(
            time_counter(10, 30, 20),
            Err(OtpError::InvalidCounter)
        ));
    }

    #[test]
    fn counter_with_zero_step_is_rejected() {
        assert!(matches!(
            time_counter(10, 0, 0),
            Err(OtpError::InvalidPeriod(0))
        ));
    }

    #[rstest]
    #[case(Secret::ascii("12345678901234567890"), OtpHashAlgorithm::SHA1, 8, "07081804")]
    #[case(Secret::ascii("12345678901234567890"), OtpHashAlgorithm::SHA1, 6, "081804")]
    #[case(Secret::hex("3132333435363738393031323334353637383930"), OtpHashAlgorithm::SHA1, 6, "081804")]
    #[case(Secret::base32("GEZDGNBVGY3TQOJQ"), OtpHashAlgorithm::SHA256, 8, "68084774")]
    #[case(Secret::base32("GEZDGNBVGY3TQOJQ"), OtpHashAlgorithm::SHA512, 8, "25091201")]
    fn totp_encodings(
        #[case] secret: Secret,
        #[case] hash: OtpHashAlgorithm,
        #[case] digits: u32,
        #[case] expected: &str,
    ) {
        let mut totp_base = Totp::new(secret);
        totp_base.with_algorithm(hash).with_digits(digits);

        let generated_otp = totp_base.generate(At::Time(1111111109)).unwrap();
        assert_eq!(expected, generated_otp.to_string());
    }

    #[rstest]
    fn counter_overrides_time(rfc_secret: &Secret) {
        let totp_base = Totp::new(rfc_secret.clone());

        assert_eq!("969429", totp_base.generate(At::Counter(3)).unwrap().to_string());
        assert_eq!("287082", totp_base.generate(At::Time(59)).unwrap().to_string());
    }

    #[rstest]
    fn generate_is_deterministic(rfc_secret: &Secret) {
        let totp_base = Totp::new(rfc_secret.clone());

        assert_eq!(
            totp_base.generate(At::Time(1453854005)).unwrap(),
            totp_base.generate(At::Time(1453854005)).unwrap()
        );
    }

    #[rstest]
    fn current_code_verifies(window_secret: &Secret) {
        let totp_base = Totp::new(window_secret.clone());

        // A step boundary may pass between both calls
        let code = totp_base.generate(At::Now).unwrap().to_string();
        assert!(totp_base.verify(&code, At::Now, 1));
    }

    #[rstest]
    #[case(0, "083893")]
    #[case(1, "314097")]
    #[case(3, "663640")]
    fn generate_at_counter(window_secret: &Secret, #[case] counter: u64, #[case] expected: &str) {
        let totp_base = Totp::new(window_secret.clone());

        assert_eq!(expected, totp_base.generate(At::Counter(counter)).unwrap().to_string());
    }

    #[rstest]
    #[case("314097", At::Counter(1), 0, 0)]
    #[case("314097", At::Counter(1), 2, 0)]
    #[case("314097", At::Counter(1), 3, 0)]
    #[case("663640", At::Counter(1), 2, 2)]
    #[case("314097", At::Counter(3), 2, -2)]
    #[case("083893", At::Counter(1), 3, -1)]
    #[case("625175", At::Time(1453854005), 2, -2)]
    fn verify_delta(
        window_secret: &Secret,
        #[case] token: &str,
        #[case] at: At,
        #[case] window: u32,
        #[case] expected: i64,
    ) {
        let totp_base = Totp::new(window_secret.clone());

        assert_eq!(expected, totp_base.verify_delta(token, at, window).unwrap());
        assert!(totp_base.verify(token, at, window));
    }

    #[rstest]
    fn verify_outside_window(window_secret: &Secret) {
        let totp_base = Totp::new(window_secret.clone());

        assert!(matches!(
            totp_base.verify_delta("663640", At::Counter(1), 1),
            Err(OtpError::NoMatch)
        ));
        assert!(!totp_base.verify("663640", At::Counter(1), 1));
    }

    #[test]
    fn verify_requires_secret_and_token() {
        assert!(matches!(
            Totp::new(Secret::ascii("")).verify_delta("314097", At::Counter(1), 0),
            Err(OtpError::MissingSecret)
        ));
        assert!(matches!(
            Totp::new(Secret::ascii("rNONHRni6BAk7y2TiKrv")).verify_delta("", At::Counter(1), 0),
            Err(OtpError::MissingToken)
        ));
    }

    #[rstest]
    #[case(0, 30)]
    #[case(59, 1)]
    #[case(61, 29)]
    fn remaining_seconds(rfc_secret: &Secret, #[case] time: u64, #[case] expected: u64) {
        let totp_base = Totp::new(rfc_secret.clone());

        assert_eq!(expected, totp_base.remaining_seconds(time).unwrap());
    }

    #[rstest]
    #[case(OtpHashAlgorithm::SHA1, 6, 30,
        "otpauth://totp/ACME%20Co%3Ajohn.doe%40email.com?secret=HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ&issuer=ACME%20Co&algorithm=SHA1&digits=6&period=30")]
    #[case(OtpHashAlgorithm::SHA256, 8, 30,
        "otpauth://totp/ACME%20Co%3Ajohn.doe%40email.com?secret=HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ&issuer=ACME%20Co&algorithm=SHA256&digits=8&period=30")]
    #[case(OtpHashAlgorithm::SHA512, 6, 10,
        "otpauth://totp/ACME%20Co%3Ajohn.doe%40email.com?secret=HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ&issuer=ACME%20Co&algorithm=SHA512&digits=6&period=10")]
    fn to_uri_test(
        #[case] hash: OtpHashAlgorithm,
        #[case] digits: u32,
        #[case] period: u64,
        #[case] expected: &str,
    ) {
        let mut totp_base = Totp::new(Secret::base32("HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ"));
        totp_base
            .with_algorithm(hash)
            .with_step(period)
            .with_digits(digits);

        let generated_uri = totp_base
            .to_uri("ACME Co:john.doe@email.com", Some("ACME Co"))
            .unwrap();

        assert_eq!(expected, generated_uri)
    }

    #[rstest]
    #[case(OtpHashAlgorithm::SHA1, 6, 30,
        "otpauth://totp/ACME%20Co:john.doe@email.com?secret=HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ&issuer=ACME%20Co&algorithm=SHA1&digits=6&period=30")]
    #[case(OtpHashAlgorithm::SHA256, 8, 30,
        "otpauth://totp/ACME%20Co:john.doe@email.com?secret=HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ&issuer=ACME%20Co&algorithm=SHA256&digits=8&period=30")]
    #[case(OtpHashAlgorithm::SHA512, 6, 10,
        "otpauth://totp/ACME%20Co:john.doe@email.com?secret=HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ&issuer=ACME%20Co&algorithm=SHA512&digits=6&period=10")]
    fn from_uri_test(
        #[case] hash: OtpHashAlgorithm,
        #[case] digits: u32,
        #[case] period: u64,
        #[case] input_uri: &str,
    ) {
        let mut expected_totp = Totp::new(Secret::base32("HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ"));
        expected_totp
            .with_algorithm(hash)
            .with_step(period)
            .with_digits(digits);

        let totp_base = Totp::from_uri(input_uri).unwrap();

        assert_eq!(expected_totp, totp_base);
        assert_eq!(
            expected_totp.generate(At::Time(0)).unwrap(),
            totp_base.generate(At::Time(0)).unwrap()
        );
    }
}
