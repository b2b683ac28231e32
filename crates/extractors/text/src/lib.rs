use content_inspector::ContentType;

/// Decode downloaded or exported bytes into text.
///
/// Drive exports and `text/plain` uploads are normally UTF-8; files saved by
/// Windows editors are sometimes UTF-16 with a byte-order mark. Invalid
/// sequences are replaced with U+FFFD rather than rejected, and a leading BOM
/// is dropped.
pub fn decode(bytes: &[u8]) -> String {
    match content_inspector::inspect(bytes) {
        ContentType::UTF_16LE => decode_utf16(&bytes[2..], u16::from_le_bytes),
        ContentType::UTF_16BE => decode_utf16(&bytes[2..], u16::from_be_bytes),
        _ => {
            let text = String::from_utf8_lossy(bytes);
            text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
        }
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|c| to_unit([c[0], c[1]]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
