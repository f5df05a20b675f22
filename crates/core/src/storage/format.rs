use super::encryption::KdfParams;
use crate::errors::CoreError;

/// Magic bytes identifying an encrypted preference store.
pub const MAGIC: &[u8; 4] = b"EXTK";

/// Current container version.
pub const CURRENT_VERSION: u16 = 1;

/// Header size in bytes:
/// magic(4) + version(2) + kdf_params(12) + salt(16) + nonce(12) + ciphertext_len(8) = 54
pub const HEADER_SIZE: usize = 54;

/// Header of an encrypted store file.
#[derive(Debug)]
pub struct StoreHeader {
    pub version: u16,
    pub kdf_params: KdfParams,
    pub salt: [u8; 16],
    pub nonce: [u8; 12],
}

/// Assemble the on-disk container.
///
/// ```text
/// [EXTK: 4B] [version: 2B LE] [memory_cost: 4B LE] [time_cost: 4B LE]
/// [parallelism: 4B LE] [salt: 16B] [nonce: 12B] [ciphertext_len: 8B LE]
/// [ciphertext: variable]
/// ```
pub fn write_container(header: &StoreHeader, ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&header.version.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.memory_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.time_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.parallelism.to_le_bytes());
    buf.extend_from_slice(&header.salt);
    buf.extend_from_slice(&header.nonce);
    buf.extend_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    buf.extend_from_slice(ciphertext);
    buf
}

/// Sequential little-endian reader over the header bytes.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take<const N: usize>(&mut self, what: &str) -> Result<[u8; N], CoreError> {
        let end = self.pos + N;
        let bytes: [u8; N] = self
            .data
            .get(self.pos..end)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| CoreError::InvalidFileFormat(format!("Failed to read {what}")))?;
        self.pos = end;
        Ok(bytes)
    }

    fn u16(&mut self, what: &str) -> Result<u16, CoreError> {
        self.take::<2>(what).map(u16::from_le_bytes)
    }

    fn u32(&mut self, what: &str) -> Result<u32, CoreError> {
        self.take::<4>(what).map(u32::from_le_bytes)
    }

    fn u64(&mut self, what: &str) -> Result<u64, CoreError> {
        self.take::<8>(what).map(u64::from_le_bytes)
    }
}

/// Parse a container, returning the header and the ciphertext slice.
pub fn read_container(data: &[u8]) -> Result<(StoreHeader, &[u8]), CoreError> {
    if data.len() < HEADER_SIZE {
        return Err(CoreError::InvalidFileFormat(
            "File too small to be an encrypted store".into(),
        ));
    }
    if &data[0..4] != MAGIC {
        return Err(CoreError::InvalidFileFormat(
            "Invalid magic bytes — not an encrypted store".into(),
        ));
    }

    let mut cur = Cursor { data, pos: 4 };
    let version = cur.u16("version")?;
    if version == 0 || version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let kdf_params = KdfParams {
        memory_cost: cur.u32("KDF memory_cost")?,
        time_cost: cur.u32("KDF time_cost")?,
        parallelism: cur.u32("KDF parallelism")?,
    };
    // Bounds stop a crafted header from requesting absurd Argon2 work.
    if !(8..=1_048_576).contains(&kdf_params.memory_cost)
        || !(1..=20).contains(&kdf_params.time_cost)
        || !(1..=16).contains(&kdf_params.parallelism)
    {
        return Err(CoreError::InvalidFileFormat(format!(
            "KDF params out of safe range: {kdf_params:?}"
        )));
    }

    let salt = cur.take::<16>("salt")?;
    let nonce = cur.take::<12>("nonce")?;
    let len = cur.u64("ciphertext length")? as usize;

    let body = &data[cur.pos..];
    if body.len() < len {
        return Err(CoreError::InvalidFileFormat(format!(
            "File truncated: expected {len} bytes of ciphertext, got {}",
            body.len()
        )));
    }

    Ok((
        StoreHeader {
            version,
            kdf_params,
            salt,
            nonce,
        },
        &body[..len],
    ))
}
