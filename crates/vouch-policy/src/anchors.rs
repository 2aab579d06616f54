//! Trust anchors
//!
//! Anchors are keys treated as axiomatically trusted. They come from inline
//! certificates, single files, or directories of certificates; file and
//! directory sources remember their refresh period and can be re-read on
//! demand. Nothing here polls the filesystem.
//!
//! The set also carries the scope list used by the scoped command policy:
//! pairs of (request-name regex, signer-key regex).

use crate::config::{parse_refresh_period, ConfigSection};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vouch_core::naming::key_name_from_locator;
use vouch_core::{Certificate, Name, NameRegex, PacketCodec, Result, TrustError};

/// One pinned key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    key_name: Name,
    public_key: Vec<u8>,
    certificate: Option<Certificate>,
}

impl TrustAnchor {
    /// Anchor from a certificate
    pub fn from_certificate(certificate: Certificate) -> Self {
        Self {
            key_name: certificate.key_name(),
            public_key: certificate.public_key().to_vec(),
            certificate: Some(certificate),
        }
    }

    /// Anchor from bare key material
    pub fn from_key(key_name: Name, public_key: impl Into<Vec<u8>>) -> Self {
        Self {
            key_name,
            public_key: public_key.into(),
            certificate: None,
        }
    }

    /// Name of the pinned key
    pub fn key_name(&self) -> &Name {
        &self.key_name
    }

    /// Public key bits
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Certificate the anchor was loaded from, if any
    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }
}

/// Where anchors come from, as declared in a `trust-anchor` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorSpec {
    /// A single base64 certificate file
    File {
        /// Certificate path
        path: PathBuf,
        /// Reload period; `None` means load once
        refresh: Option<Duration>,
    },
    /// An inline base64 certificate
    Base64(String),
    /// Every certificate file in a directory
    Dir {
        /// Directory path
        path: PathBuf,
        /// Reload period; `None` means load once
        refresh: Option<Duration>,
    },
    /// Trust everything; disables validation
    Any,
}

impl AnchorSpec {
    /// Build from a `trust-anchor` section; relative paths resolve against
    /// `base_dir`.
    ///
    /// ```text
    /// trust-anchor { type file; file-name anchor.cert; refresh 1h }
    /// trust-anchor { type base64; base64-string Bv0D... }
    /// trust-anchor { type dir; dir anchors; refresh 10m }
    /// trust-anchor { type any }
    /// ```
    pub fn from_config(section: &ConfigSection, base_dir: &Path) -> Result<Self> {
        let mut cursor = section.cursor("trust-anchor");
        let kind = cursor.leaf("type")?;

        let spec = match kind.to_ascii_lowercase().as_str() {
            "file" => {
                let path = base_dir.join(cursor.leaf("file-name")?);
                let refresh = cursor.optional_leaf("refresh").map(parse_refresh_period).transpose()?;
                Self::File { path, refresh }
            }
            "base64" => Self::Base64(cursor.leaf("base64-string")?.to_string()),
            "dir" => {
                let path = base_dir.join(cursor.leaf("dir")?);
                let refresh = cursor.optional_leaf("refresh").map(parse_refresh_period).transpose()?;
                Self::Dir { path, refresh }
            }
            "any" => Self::Any,
            _ => {
                return Err(TrustError::config(format!(
                    "Unsupported trust-anchor.type: {kind}"
                )))
            }
        };

        cursor.finish()?;
        Ok(spec)
    }
}

/// A reloadable anchor location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSource {
    path: PathBuf,
    is_dir: bool,
    refresh: Option<Duration>,
}

impl AnchorSource {
    /// File or directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the source is a directory
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Requested reload period
    pub fn refresh(&self) -> Option<Duration> {
        self.refresh
    }

    fn load(&self, codec: &dyn PacketCodec) -> Result<Vec<Certificate>> {
        if !self.is_dir {
            return Ok(vec![read_certificate(&self.path, codec)?]);
        }

        let mut paths = std::fs::read_dir(&self.path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect::<Vec<_>>();
        paths.sort();

        let mut certificates = Vec::with_capacity(paths.len());
        for path in paths {
            match read_certificate(&path, codec) {
                Ok(certificate) => certificates.push(certificate),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable anchor");
                }
            }
        }
        Ok(certificates)
    }
}

fn read_certificate(path: &Path, codec: &dyn PacketCodec) -> Result<Certificate> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| TrustError::not_found(format!("{}: {e}", path.display())))?;
    Certificate::from_base64(&text, codec)
}

/// Scope for the command policy: requests matching `interest` may be signed
/// by keys matching `signer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustScope {
    interest: NameRegex,
    signer: NameRegex,
}

impl TrustScope {
    /// Create a scope
    pub fn new(interest: NameRegex, signer: NameRegex) -> Self {
        Self { interest, signer }
    }

    /// Whether `request_name` signed by `key_name` falls in the scope
    pub fn covers(&self, request_name: &Name, key_name: &Name) -> bool {
        self.interest.is_match(request_name) && self.signer.is_match(key_name)
    }
}

/// Pinned keys, their sources and the command scopes
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorSet {
    pinned: BTreeMap<Name, TrustAnchor>,
    loaded: BTreeMap<Name, TrustAnchor>,
    sources: Vec<AnchorSource>,
    scopes: Vec<TrustScope>,
}

impl TrustAnchorSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin an anchor; replaces any anchor with the same key name
    pub fn insert(&mut self, anchor: TrustAnchor) {
        tracing::debug!(key = %anchor.key_name, "trust anchor pinned");
        self.pinned.insert(anchor.key_name.clone(), anchor);
    }

    /// Register a file or directory source and load it once.
    pub fn add_source(
        &mut self,
        path: impl Into<PathBuf>,
        is_dir: bool,
        refresh: Option<Duration>,
        codec: &dyn PacketCodec,
    ) -> Result<usize> {
        let source = AnchorSource {
            path: path.into(),
            is_dir,
            refresh,
        };
        let count = self.absorb(&source, codec)?;
        self.sources.push(source);
        Ok(count)
    }

    /// Re-read every file and directory source, replacing what they
    /// previously contributed. Returns the number of anchors loaded.
    pub fn reload(&mut self, codec: &dyn PacketCodec) -> Result<usize> {
        let mut fresh = BTreeMap::new();
        for source in &self.sources {
            for certificate in source.load(codec)? {
                let anchor = TrustAnchor::from_certificate(certificate);
                fresh.insert(anchor.key_name.clone(), anchor);
            }
        }
        let count = fresh.len();
        self.loaded = fresh;
        tracing::debug!(count, sources = self.sources.len(), "trust anchors reloaded");
        Ok(count)
    }

    /// Move every anchor, source and scope of `other` into this set
    pub fn merge(&mut self, other: TrustAnchorSet) {
        self.pinned.extend(other.pinned);
        self.loaded.extend(other.loaded);
        self.sources.extend(other.sources);
        self.scopes.extend(other.scopes);
    }

    fn absorb(&mut self, source: &AnchorSource, codec: &dyn PacketCodec) -> Result<usize> {
        let certificates = source.load(codec)?;
        let count = certificates.len();
        for certificate in certificates {
            let anchor = TrustAnchor::from_certificate(certificate);
            tracing::debug!(key = %anchor.key_name, path = %source.path.display(), "trust anchor loaded");
            self.loaded.insert(anchor.key_name.clone(), anchor);
        }
        Ok(count)
    }

    /// Anchor for a key or certificate name
    pub fn find(&self, locator: &Name) -> Option<&TrustAnchor> {
        let key_name = key_name_from_locator(locator).ok()?;
        self.pinned
            .get(&key_name)
            .or_else(|| self.loaded.get(&key_name))
    }

    /// Whether `locator` names a trust anchor
    pub fn contains(&self, locator: &Name) -> bool {
        self.find(locator).is_some()
    }

    /// Number of distinct anchors
    pub fn len(&self) -> usize {
        self.pinned.len()
            + self
                .loaded
                .keys()
                .filter(|k| !self.pinned.contains_key(*k))
                .count()
    }

    /// Whether no anchor is known
    pub fn is_empty(&self) -> bool {
        self.pinned.is_empty() && self.loaded.is_empty()
    }

    /// Registered file and directory sources
    pub fn sources(&self) -> &[AnchorSource] {
        &self.sources
    }

    /// Shortest refresh period across sources
    pub fn next_refresh(&self) -> Option<Duration> {
        self.sources.iter().filter_map(AnchorSource::refresh).min()
    }

    /// Add a command scope
    pub fn add_scope(&mut self, scope: TrustScope) {
        self.scopes.push(scope);
    }

    /// Command scopes in insertion order
    pub fn scopes(&self) -> &[TrustScope] {
        &self.scopes
    }

    /// Whether any scope covers `request_name` signed by `key_name`
    pub fn in_scope(&self, request_name: &Name, key_name: &Name) -> bool {
        self.scopes
            .iter()
            .any(|scope| scope.covers(request_name, key_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vouch_core::{Data, JsonCodec};

    fn name(uri: &str) -> Name {
        Name::parse(uri).unwrap()
    }

    fn certificate(uri: &str, key: u8) -> Certificate {
        Certificate::from_data(Data::new(name(uri), vec![key; 4])).unwrap()
    }

    #[test]
    fn test_find_by_key_or_certificate_name() {
        let mut set = TrustAnchorSet::new();
        set.insert(TrustAnchor::from_certificate(certificate("/root/KEY/1/self/v1", 7)));

        assert_eq!(set.find(&name("/root/KEY/1")).unwrap().public_key(), &[7; 4]);
        assert!(set.contains(&name("/root/KEY/1/self/v2")));
        assert!(!set.contains(&name("/root/KEY/2")));
        assert!(!set.contains(&name("/root")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_file_and_dir_sources() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("root.cert");
        std::fs::write(&file, certificate("/root/KEY/1/self/v1", 1).to_base64(&JsonCodec)).unwrap();

        let anchors_dir = dir.path().join("anchors");
        std::fs::create_dir(&anchors_dir).unwrap();
        std::fs::write(
            anchors_dir.join("a.cert"),
            certificate("/a/KEY/1/self/v1", 2).to_base64(&JsonCodec),
        )
        .unwrap();
        std::fs::write(anchors_dir.join("junk.txt"), "not a certificate").unwrap();

        let mut set = TrustAnchorSet::new();
        assert_eq!(set.add_source(&file, false, None, &JsonCodec).unwrap(), 1);
        assert_eq!(
            set.add_source(&anchors_dir, true, Some(Duration::from_secs(60)), &JsonCodec)
                .unwrap(),
            1
        );
        assert!(set.contains(&name("/root/KEY/1")));
        assert!(set.contains(&name("/a/KEY/1")));
        assert_eq!(set.next_refresh(), Some(Duration::from_secs(60)));

        std::fs::remove_file(anchors_dir.join("a.cert")).unwrap();
        std::fs::write(
            anchors_dir.join("b.cert"),
            certificate("/b/KEY/1/self/v1", 3).to_base64(&JsonCodec),
        )
        .unwrap();
        assert_eq!(set.reload(&JsonCodec).unwrap(), 2);
        assert!(!set.contains(&name("/a/KEY/1")));
        assert!(set.contains(&name("/b/KEY/1")));
    }

    #[test]
    fn test_missing_file_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = TrustAnchorSet::new();
        let err = set
            .add_source(dir.path().join("missing.cert"), false, None, &JsonCodec)
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
        assert!(set.sources().is_empty());
    }

    #[test]
    fn test_spec_from_config() {
        let base = Path::new("/etc/vouch");
        let file = ConfigSection::new()
            .leaf("type", "file")
            .leaf("file-name", "root.cert")
            .leaf("refresh", "0s");
        assert_eq!(
            AnchorSpec::from_config(&file, base).unwrap(),
            AnchorSpec::File {
                path: PathBuf::from("/etc/vouch/root.cert"),
                refresh: Some(Duration::from_secs(3600)),
            }
        );

        let dir = ConfigSection::new().leaf("type", "dir").leaf("dir", "/abs/anchors");
        assert_eq!(
            AnchorSpec::from_config(&dir, base).unwrap(),
            AnchorSpec::Dir {
                path: PathBuf::from("/abs/anchors"),
                refresh: None,
            }
        );

        let any = ConfigSection::new().leaf("type", "any");
        assert_eq!(AnchorSpec::from_config(&any, base).unwrap(), AnchorSpec::Any);

        let bad = ConfigSection::new().leaf("type", "file").leaf("path", "x");
        assert!(AnchorSpec::from_config(&bad, base).is_err());

        let bad_refresh = ConfigSection::new()
            .leaf("type", "dir")
            .leaf("dir", "x")
            .leaf("refresh", "5d");
        assert!(AnchorSpec::from_config(&bad_refresh, base).is_err());
    }

    #[test]
    fn test_scopes() {
        let mut set = TrustAnchorSet::new();
        set.add_scope(TrustScope::new(
            NameRegex::new("^<localhost><nfd><>*$").unwrap(),
            NameRegex::from_name(&name("/admin/KEY/1")).unwrap(),
        ));
        assert!(set.in_scope(&name("/localhost/nfd/rib/register"), &name("/admin/KEY/1")));
        assert!(!set.in_scope(&name("/localhost/nfd/rib/register"), &name("/guest/KEY/1")));
        assert!(!set.in_scope(&name("/remote/nfd"), &name("/admin/KEY/1")));
    }
}
