use chrono::offset;
use twofa::{
    secret::{generate_secret, SecretOptions, UrlOptions},
    totp::{At, Totp},
    Secret,
};

pub fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Create a fresh secret to hand over to an authenticator app
    let secret = generate_secret(&SecretOptions {
        label: "Example:alice@example.com".into(),
        issuer: "Example".into(),
        ..SecretOptions::default()
    });

    // This URL is what gets rendered as a QR code
    println!("URL: {}", secret.otpauth_url(&UrlOptions::default())?);

    let totp = Totp::new(Secret::ascii(secret.secret()));

    // Get seconds since Unix Epoch
    let now = offset::Local::now().timestamp();
    let now = u64::try_from(now)?;

    println!(
        "Code: {}, Remaining time: {}",
        totp.generate(At::Time(now))?,
        totp.remaining_seconds(now)?
    );

    Ok(())
}
