//! Content-address parsing
//!
//! Accepts the URI shapes found in minted records and reduces them to a CID
//! plus optional sub-path:
//!
//! - `ipfs://<cid>` and `ipfs://ipfs/<cid>`
//! - `https://<gateway>/ipfs/<cid>`
//! - `/ipfs/<cid>`
//! - bare `<cid>`
//!
//! Plausibility (length and alphabet) is checked before the strict CID
//! parse so that obviously broken input never reaches a gateway.

use cid::Cid;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// CIDv0: base58btc sha2-256 multihash, always 46 chars
const CID_V0_LEN: usize = 46;

/// Shortest base32 CIDv1 (sha2-256 digest)
const CID_V1_MIN_LEN: usize = 59;

/// A validated content address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentAddress {
    cid: Cid,
    /// CID text as written in the source URI
    hash: String,
    /// Sub-path after the CID, with leading slash
    path: Option<String>,
}

impl ContentAddress {
    /// Parse and validate a content-address URI.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidAddress("empty address".to_string()));
        }

        let rest = strip_prefixes(trimmed)
            .ok_or_else(|| CoreError::InvalidAddress(format!("no /ipfs/ segment in {}", trimmed)))?;

        let (hash, path) = match rest.split_once('/') {
            Some((hash, path)) if !path.is_empty() => (hash, Some(format!("/{}", path))),
            Some((hash, _)) => (hash, None),
            None => (rest, None),
        };

        check_plausible(hash)?;

        let cid = Cid::from_str(hash)
            .map_err(|e| CoreError::InvalidAddress(format!("invalid CID {}: {}", hash, e)))?;

        Ok(Self {
            cid,
            hash: hash.to_string(),
            path,
        })
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// `/ipfs/<cid>[/path]`
    pub fn gateway_path(&self) -> String {
        format!("/ipfs/{}{}", self.hash, self.path.as_deref().unwrap_or(""))
    }

    /// Full URL on a gateway base such as `https://ipfs.io`
    pub fn url_on(&self, base: &str) -> String {
        format!("{}{}", base.trim_end_matches('/'), self.gateway_path())
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ipfs://{}{}", self.hash, self.path.as_deref().unwrap_or(""))
    }
}

impl FromStr for ContentAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn strip_prefixes(input: &str) -> Option<&str> {
    if let Some(rest) = input.strip_prefix("ipfs://") {
        return Some(rest.strip_prefix("ipfs/").unwrap_or(rest));
    }

    if input.starts_with("http://") || input.starts_with("https://") {
        return input.find("/ipfs/").map(|idx| &input[idx + "/ipfs/".len()..]);
    }

    if let Some(rest) = input.strip_prefix("/ipfs/") {
        return Some(rest);
    }

    Some(input)
}

/// Length and character-set checks, no decoding.
fn check_plausible(hash: &str) -> Result<()> {
    if hash.starts_with("Qm") {
        if hash.len() != CID_V0_LEN {
            return Err(CoreError::InvalidAddress(format!(
                "CIDv0 must be {} chars, got {}",
                CID_V0_LEN,
                hash.len()
            )));
        }
        if !hash.chars().all(|c| BASE58_ALPHABET.contains(c)) {
            return Err(CoreError::InvalidAddress(format!(
                "CIDv0 contains non-base58 characters: {}",
                hash
            )));
        }
        return Ok(());
    }

    if hash.starts_with('b') {
        if hash.len() < CID_V1_MIN_LEN {
            return Err(CoreError::InvalidAddress(format!(
                "CIDv1 must be at least {} chars, got {}",
                CID_V1_MIN_LEN,
                hash.len()
            )));
        }
        if !hash
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c))
        {
            return Err(CoreError::InvalidAddress(format!(
                "CIDv1 contains non-base32 characters: {}",
                hash
            )));
        }
        return Ok(());
    }

    Err(CoreError::InvalidAddress(format!(
        "Unrecognized address format: {}",
        hash
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use multihash_codetable::{Code, MultihashDigest};

    const V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
    const V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn test_parse_ipfs_scheme() {
        let addr = ContentAddress::parse(&format!("ipfs://{}", V0)).unwrap();
        assert_eq!(addr.hash(), V0);
        assert_eq!(addr.path(), None);
        assert_eq!(addr.gateway_path(), format!("/ipfs/{}", V0));
    }

    #[test]
    fn test_parse_ipfs_scheme_with_ipfs_segment() {
        let addr = ContentAddress::parse(&format!("ipfs://ipfs/{}", V1)).unwrap();
        assert_eq!(addr.hash(), V1);
    }

    #[test]
    fn test_parse_gateway_url_with_path() {
        let addr =
            ContentAddress::parse(&format!("https://ipfs.io/ipfs/{}/metadata.json", V1)).unwrap();
        assert_eq!(addr.hash(), V1);
        assert_eq!(addr.path(), Some("/metadata.json"));
        assert_eq!(
            addr.url_on("https://dweb.link/"),
            format!("https://dweb.link/ipfs/{}/metadata.json", V1)
        );
        assert_eq!(addr.to_string(), format!("ipfs://{}/metadata.json", V1));
    }

    #[test]
    fn test_parse_bare_and_path_forms() {
        assert!(ContentAddress::parse(V0).is_ok());
        assert!(ContentAddress::parse(&format!("/ipfs/{}", V0)).is_ok());
        assert!(ContentAddress::parse(&format!("  ipfs://{}/  ", V0)).is_ok());
    }

    #[test]
    fn test_parse_generated_cid() {
        let hash = Code::Sha2_256.digest(b"Hello, Evermark!");
        let cid = Cid::new_v1(0x55, hash);
        let addr = ContentAddress::parse(&format!("ipfs://{}", cid)).unwrap();
        assert_eq!(addr.cid(), &cid);
    }

    #[test]
    fn test_short_hash_rejected() {
        let err = ContentAddress::parse("ipfs://Qmabc").unwrap_err();
        assert!(matches!(err, CoreError::InvalidAddress(_)));

        let err = ContentAddress::parse("ipfs://bafyb").unwrap_err();
        assert!(err.to_string().contains("at least"));
    }

    #[test]
    fn test_bad_charset_rejected() {
        // '0' and 'l' are not base58
        let bad_v0 = format!("{}0l", &V0[..44]);
        assert!(ContentAddress::parse(&bad_v0).is_err());

        let bad_v1 = V1.to_uppercase().replacen('B', "b", 1);
        assert!(ContentAddress::parse(&bad_v1).is_err());
    }

    #[test]
    fn test_unrecognized_rejected() {
        assert!(ContentAddress::parse("").is_err());
        assert!(ContentAddress::parse("https://example.com/metadata.json").is_err());
        assert!(ContentAddress::parse("ar://abcdef").is_err());
    }

    #[test]
    fn test_plausible_but_undecodable_rejected() {
        // Right length and alphabet, decodes to an explicit version 0
        let fake = format!("b{}", "a".repeat(58));
        assert!(ContentAddress::parse(&fake).is_err());
    }
}
