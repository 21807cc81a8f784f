//! Namespaced entity identifiers
//!
//! A `Namespace` partitions plain entity ids into units that usually stand for
//! a dataset or source. Signing appends an HMAC-SHA1 of the plain id, keyed by
//! the namespace name, so the same plain id from two sources yields two
//! distinct signed ids:
//!
//! ```text
//! plain id                                   signed id
//! 4f1c...e2  --sign("uk_companies")-->  4f1c...e2.9ab0...71
//! ```
//!
//! An empty namespace name means pass-through: signing returns the plain id
//! and nothing verifies.
//!
//! Plain ids must not contain `SEP`. Parsing splits on its last occurrence and
//! does not escape it.

use ftm_types::EntityProxy;
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use std::fmt;
use std::hash::{Hash, Hasher};
use subtle::ConstantTimeEq;

use crate::util::key_bytes;

/// Separator between a plain id and its signature
pub const SEP: char = '.';

type HmacSha1 = Hmac<Sha1>;

#[derive(Clone)]
pub struct Namespace {
    bname: Vec<u8>,
    /// Keyed template; every operation works on a clone
    hmac: HmacSha1,
}

impl Namespace {
    pub fn new(name: &str) -> Self {
        let bname = key_bytes(Some(name));
        // HMAC hashes keys longer than a block and pads shorter ones, so
        // `new_from_slice` has no failing input.
        let hmac = HmacSha1::new_from_slice(&bname).expect("HMAC accepts keys of any length");
        Self { bname, hmac }
    }

    /// Idempotent factory: namespaces pass through, names are wrapped
    pub fn make(name: impl Into<Namespace>) -> Self {
        name.into()
    }

    /// True when the namespace has no name and signing is a no-op
    pub fn is_pass_through(&self) -> bool {
        self.bname.is_empty()
    }

    /// Split an id into `(plain_id, signature)` on the last separator
    pub fn parse<'a>(
        &self,
        entity_id: impl Into<Option<&'a str>>,
    ) -> (Option<&'a str>, Option<&'a str>) {
        match entity_id.into() {
            None => (None, None),
            Some(id) => match id.rsplit_once(SEP) {
                Some((plain, checksum)) => (Some(plain), Some(checksum)),
                None => (Some(id), None),
            },
        }
    }

    /// Hex HMAC of a plain id, or `None` in pass-through mode
    pub fn signature<'a>(&self, entity_id: impl Into<Option<&'a str>>) -> Option<String> {
        if self.is_pass_through() {
            return None;
        }
        let entity_id = entity_id.into()?;
        let mut mac = self.hmac.clone();
        mac.update(&key_bytes(Some(entity_id)));
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    /// Sign an id, replacing any signature it already carries
    pub fn sign<'a>(&self, entity_id: impl Into<Option<&'a str>>) -> Option<String> {
        let (plain_id, _) = self.parse(entity_id);
        if self.is_pass_through() {
            return plain_id.map(str::to_string);
        }
        let plain_id = plain_id?;
        let digest = self.signature(plain_id)?;
        Some(format!("{plain_id}{SEP}{digest}"))
    }

    /// Check the signature suffix of an id in constant time.
    ///
    /// Ids without a suffix never verify. In pass-through mode nothing
    /// verifies, since there is no key to check against.
    pub fn verify<'a>(&self, entity_id: impl Into<Option<&'a str>>) -> bool {
        let (plain_id, digest) = self.parse(entity_id);
        let Some(digest) = digest else {
            return false;
        };
        let Some(expected) = self.signature(plain_id) else {
            return false;
        };
        expected.as_bytes().ct_eq(digest.as_bytes()).into()
    }

    /// Derive a signed id from the SHA-1 of the concatenated parts.
    ///
    /// Returns `None` when the parts carry no bytes at all.
    pub fn generate<I, S>(&self, parts: I) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let data: Vec<u8> = parts
            .into_iter()
            .flat_map(|part| key_bytes(Some(part.as_ref())))
            .collect();
        if data.is_empty() {
            return None;
        }
        let entity_id = hex::encode(Sha1::digest(&data));
        self.sign(entity_id.as_str())
    }

    /// Copy of an entity with its id and every entity reference signed
    pub fn apply(&self, proxy: &EntityProxy) -> EntityProxy {
        let mut signed = proxy.clone();
        signed.id = self.sign(proxy.id.as_deref());
        for value in signed.entity_values_mut() {
            if let Some(reference) = self.sign(value.as_str()) {
                *value = reference;
            }
        }
        signed
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<&str> for Namespace {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Namespace {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl From<Option<&str>> for Namespace {
    fn from(name: Option<&str>) -> Self {
        Self::new(name.unwrap_or_default())
    }
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        self.bname == other.bname
    }
}

impl Eq for Namespace {}

impl Hash for Namespace {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bname.hash(state);
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({:?})", String::from_utf8_lossy(&self.bname))
    }
}
