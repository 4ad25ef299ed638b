//! `did:mailto` account identifiers.
//!
//! `alice@example.com` is `did:mailto:example.com:alice`. The local part is
//! percent-encoded so that it never contains a `:`.

use url::form_urlencoded;
use warden_varsig::Did;

/// Not an email address, or not a `did:mailto` DID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid email address: {0}")]
pub struct EmailError(pub String);

/// The account DID for `email`.
pub fn from_email(email: &str) -> Result<Did, EmailError> {
    let (local, domain) = email
        .rsplit_once('@')
        .filter(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains(':'))
        .ok_or_else(|| EmailError(email.to_owned()))?;
    let local: String = form_urlencoded::byte_serialize(local.as_bytes()).collect();
    format!("did:mailto:{domain}:{local}")
        .parse()
        .map_err(|_| EmailError(email.to_owned()))
}

/// The email address behind an account DID.
pub fn to_email(did: &Did) -> Result<String, EmailError> {
    let invalid = || EmailError(did.to_string());
    if did.method() != "mailto" {
        return Err(invalid());
    }
    let (domain, local) = did.identifier().split_once(':').ok_or_else(invalid)?;
    let local: String = form_urlencoded::parse(format!("l={local}").as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .ok_or_else(invalid)?;
    Ok(format!("{local}@{domain}"))
}
