use std::time::SystemTime;

use twofa::{
    totp::{At, Totp},
    Secret,
};

pub fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Initialize the TOTP with the defaults (SHA1 hash, 6-digits and 30 seconds step)
    let totp = Totp::new(Secret::base32("HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ"));

    // Calculate time since Unix Epoch
    let now = SystemTime::now();
    let time_since_epoch = now.duration_since(SystemTime::UNIX_EPOCH)?.as_secs();

    // Generate the code with the seconds
    let code = totp.generate(At::Time(time_since_epoch))?;

    // Check it back, tolerating one step of clock drift
    let delta = totp.verify_delta(&code.to_string(), At::Time(time_since_epoch), 1)?;

    println!(
        "Code: {}, Delta: {}, Remaining time: {}",
        code,
        delta,
        totp.remaining_seconds(time_since_epoch)?
    );

    Ok(())
}
