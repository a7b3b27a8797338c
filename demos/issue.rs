use std::path::PathBuf;

use anyhow::Context;
use chaosd_pki::issuer::{CertificateAuthority, Issuer};
use chaosd_pki::store::{CHAOSD_PKI_NAME, FileStore, PkiStore};
use tracing_subscriber::EnvFilter;

// Usage: cargo run --example issue -- <ca.crt> <ca.key> <out-dir>
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let (Some(ca_cert), Some(ca_key), Some(out_dir)) = (args.next(), args.next(), args.next())
    else {
        anyhow::bail!("usage: issue <ca.crt> <ca.key> <out-dir>");
    };

    let cert_data = std::fs::read(&ca_cert)
        .with_context(|| format!("reading {}", ca_cert.display()))?;
    let key_data =
        std::fs::read(&ca_key).with_context(|| format!("reading {}", ca_key.display()))?;

    let ca = CertificateAuthority::from_pem(&cert_data, &key_data)?;
    let (cert, key) = ca.new_cert_and_key()?;

    PkiStore::new(FileStore::new()).write(&out_dir, CHAOSD_PKI_NAME, Some(&cert), Some(&key))?;

    println!("serial:     {}", cert.serial_number_hex());
    println!("subject:    {}", cert.subject());
    println!("issuer:     {}", cert.issuer());
    println!("dns names:  {}", cert.dns_names()?.join(", "));
    println!("not after:  {}", cert.validity().not_after);
    println!("written to: {}", out_dir.display());
    Ok(())
}
