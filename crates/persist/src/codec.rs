use std::io::{Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::error::PersistError;

pub(crate) fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, PersistError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| PersistError::CborEncode(e.to_string()))?;
    Ok(buf)
}

pub(crate) fn cbor_deserialize<T: DeserializeOwned>(data: &[u8]) -> Result<T, PersistError> {
    ciborium::from_reader(data).map_err(|e| PersistError::CborDecode(e.to_string()))
}

pub(crate) fn zstd_compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    encoder.finish()
}

pub(crate) fn zstd_decompress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
