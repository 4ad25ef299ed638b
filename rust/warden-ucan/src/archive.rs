//! Transport format for a delegation together with its proofs.
//!
//! An archive is the DAG-CBOR map `{"root": <cid>, "blocks": [<bytes>...]}`
//! holding the root delegation and every attachment. It travels in
//! confirmation links (as unpadded base64url) and in claim responses.

use std::collections::HashMap;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use ipld_core::cid::Cid;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::{CodecError, Delegation};

#[derive(Serialize, Deserialize)]
struct Archive {
    root: Cid,
    blocks: Vec<ByteBuf>,
}

impl Delegation {
    /// Encodes this delegation and its attachments as an archive.
    ///
    /// # Errors
    ///
    /// Fails if the archive cannot be encoded.
    pub fn archive(&self) -> Result<Vec<u8>, CodecError> {
        let attachments = self.attachments();
        let blocks = std::iter::once(self.as_bytes())
            .chain(attachments.iter().map(|proof| proof.as_bytes()))
            .map(|bytes| ByteBuf::from(bytes.to_vec()))
            .collect();
        let archive = Archive {
            root: *self.cid(),
            blocks,
        };
        Ok(serde_ipld_dagcbor::to_vec(&archive)?)
    }

    /// Decodes an archive produced by [`Delegation::archive`], reattaching
    /// every proof found among its blocks.
    ///
    /// # Errors
    ///
    /// Fails on malformed input or when the root block is absent.
    pub fn extract(bytes: &[u8]) -> Result<Self, CodecError> {
        let archive: Archive = serde_ipld_dagcbor::from_slice(bytes)?;
        let mut blocks = HashMap::with_capacity(archive.blocks.len());
        for block in &archive.blocks {
            let delegation = Delegation::decode(block)?;
            blocks.insert(*delegation.cid(), delegation);
        }
        let mut decoded = HashMap::new();
        assemble(&archive.root, &blocks, &mut decoded)?
            .map(Arc::unwrap_or_clone)
            .ok_or(CodecError::MissingRoot(archive.root))
    }

    /// [`Delegation::archive`] as unpadded base64url.
    ///
    /// # Errors
    ///
    /// Fails if the archive cannot be encoded.
    pub fn to_base64(&self) -> Result<String, CodecError> {
        Ok(URL_SAFE_NO_PAD.encode(self.archive()?))
    }

    /// Reverses [`Delegation::to_base64`].
    ///
    /// # Errors
    ///
    /// Fails on invalid base64 or a malformed archive.
    pub fn from_base64(encoded: &str) -> Result<Self, CodecError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim_end_matches('='))
            .map_err(|error| CodecError::Decode(error.to_string()))?;
        Self::extract(&bytes)
    }
}

fn assemble(
    cid: &Cid,
    blocks: &HashMap<Cid, Delegation>,
    decoded: &mut HashMap<Cid, Arc<Delegation>>,
) -> Result<Option<Arc<Delegation>>, CodecError> {
    if let Some(known) = decoded.get(cid) {
        return Ok(Some(known.clone()));
    }
    let Some(delegation) = blocks.get(cid).cloned() else {
        return Ok(None);
    };
    let mut proofs = Vec::new();
    for proof in delegation.proofs() {
        if let Some(proof) = assemble(proof, blocks, decoded)? {
            proofs.push(proof);
        }
    }
    let delegation = Arc::new(delegation.attach(proofs));
    decoded.insert(*cid, delegation.clone());
    Ok(Some(delegation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;
    use warden_capability::Capability;
    use warden_credentials::Ed25519Signer;
    use warden_varsig::Principal;

    fn chain() -> Result<(Arc<Delegation>, Delegation), Box<dyn std::error::Error>> {
        let alice = Ed25519Signer::import(&[1; 32])?;
        let bob = Ed25519Signer::import(&[2; 32])?;
        let carol = Ed25519Signer::import(&[3; 32])?;
        let root = Arc::new(
            Delegation::builder()
                .audience(bob.did())
                .capability(Capability::parse("*", alice.did().as_str())?)
                .sign(&alice)?,
        );
        let leaf = Delegation::builder()
            .audience(carol.did())
            .capability(Capability::parse("store/*", alice.did().as_str())?)
            .proof(root.clone())
            .sign(&bob)?;
        Ok((root, leaf))
    }

    #[test]
    fn archives_carry_attached_proofs() -> TestResult {
        let (root, leaf) = chain()?;
        let restored = Delegation::extract(&leaf.archive()?)?;

        assert_eq!(restored.cid(), leaf.cid());
        assert_eq!(
            restored.attached().iter().map(|d| *d.cid()).collect::<Vec<_>>(),
            vec![*root.cid()]
        );
        Ok(())
    }

    #[test]
    fn base64_round_trip_is_url_safe() -> TestResult {
        let (_, leaf) = chain()?;
        let encoded = leaf.to_base64()?;
        assert!(!encoded.contains(['+', '/', '=']));
        assert_eq!(Delegation::from_base64(&encoded)?.cid(), leaf.cid());
        Ok(())
    }

    #[test]
    fn missing_roots_are_reported() -> TestResult {
        let (root, _) = chain()?;
        let archive = Archive {
            root: *root.cid(),
            blocks: vec![],
        };
        let bytes = serde_ipld_dagcbor::to_vec(&archive)?;
        assert_eq!(
            Delegation::extract(&bytes).unwrap_err(),
            CodecError::MissingRoot(*root.cid())
        );
        Ok(())
    }
}
