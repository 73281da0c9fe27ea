use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Where buffer and image URIs get their bytes from. Implementations are
/// dumb byte lookups; deduplication and error classification happen in the
/// loader session, which guarantees each URI is fetched at most once.
pub trait ByteSource: Send + Sync + 'static {
    fn load_uri(&self, uri: &str) -> Result<Vec<u8>, std::io::Error>;
}

/// Decodes an RFC 2397 `data:` URI, or returns `None` when `uri` is a regular
/// reference that a [`ByteSource`] should serve. Handled centrally so every
/// source supports embedded payloads.
pub fn decode_data_uri(uri: &str) -> Option<Result<Vec<u8>, std::io::Error>> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = match rest.split_once(',') {
        Some(parts) => parts,
        None => {
            return Some(Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "data URI without a comma separator",
            )));
        }
    };

    if header.ends_with(";base64") {
        Some(BASE64.decode(payload).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, format!("invalid base64 payload: {}", e))
        }))
    } else {
        // Percent-encoded plain text payloads are legal but glTF exporters do
        // not emit them for binary data; the unescaped bytes are good enough.
        Some(Ok(payload.as_bytes().to_vec()))
    }
}
