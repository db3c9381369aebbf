use crate::kind::ObjectKind;
use crate::oid::Oid;

/// Kind-tagged BLAKE3 content hasher.
///
/// Every hash covers a `"<kind> <len>\0"` header followed by the content, so
/// a blob and a tree with identical bytes never share an identifier.
pub struct ContentHasher {
    kind: ObjectKind,
}

impl ContentHasher {
    /// Hasher for blob objects.
    pub const BLOB: Self = Self::new(ObjectKind::Blob);
    /// Hasher for tree objects.
    pub const TREE: Self = Self::new(ObjectKind::Tree);
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self::new(ObjectKind::Commit);
    /// Hasher for tag objects.
    pub const TAG: Self = Self::new(ObjectKind::Tag);

    /// Create a hasher for the given object kind.
    pub const fn new(kind: ObjectKind) -> Self {
        Self { kind }
    }

    /// Hash raw content, producing a 64-hex [`Oid`].
    pub fn hash(&self, data: &[u8]) -> Oid {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update(b" ");
        hasher.update(data.len().to_string().as_bytes());
        hasher.update(b"\0");
        hasher.update(data);
        Oid::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected identifier.
    pub fn verify(&self, data: &[u8], expected: &Oid) -> bool {
        self.hash(data) == *expected
    }

    /// The object kind this hasher tags.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }
}
