//! Turning the bytes of an export into text.

use log::{debug, info};
use snafu::ResultExt;

use crate::config::*;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decodes the raw content of a file with the requested encoding.
///
/// In `Auto` mode, UTF-8 is always attempted first: Latin-1 accepts any byte
/// sequence, so trying it first would never fail.
pub fn resolve(raw: &[u8], encoding: Encoding) -> Result<String, OutcomeMapError> {
    match encoding {
        Encoding::Utf8 => decode_utf8(raw),
        Encoding::Latin1 => Ok(decode_latin1(raw)),
        Encoding::Auto => match decode_utf8(raw) {
            Ok(s) => {
                debug!("resolve: {} bytes decoded as utf-8", raw.len());
                Ok(s)
            }
            Err(e) => {
                info!("resolve: input is not utf-8 ({}), falling back to iso-8859-1", e);
                Ok(decode_latin1(raw))
            }
        },
    }
}

fn decode_utf8(raw: &[u8]) -> Result<String, OutcomeMapError> {
    let content = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
    let s = std::str::from_utf8(content).context(EncodingSnafu { encoding: "utf-8" })?;
    Ok(s.to_string())
}

// Latin-1 code points are the byte values.
fn decode_latin1(raw: &[u8]) -> String {
    raw.iter().map(|b| *b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_strict() {
        let s = resolve("Satisfação".as_bytes(), Encoding::Utf8).unwrap();
        assert_eq!(s, "Satisfação");
    }

    #[test]
    fn utf8_strict_rejects_latin1() {
        // "Satisfação" in iso-8859-1
        let raw = b"Satisfa\xe7\xe3o";
        let res = resolve(raw, Encoding::Utf8);
        assert!(matches!(res, Err(OutcomeMapError::Encoding { .. })));
    }

    #[test]
    fn latin1_always_decodes() {
        let raw = b"Satisfa\xe7\xe3o";
        assert_eq!(resolve(raw, Encoding::Latin1).unwrap(), "Satisfação");
    }

    #[test]
    fn auto_prefers_utf8() {
        // Valid UTF-8 would turn into mojibake if read as Latin-1.
        let s = resolve("Importância".as_bytes(), Encoding::Auto).unwrap();
        assert_eq!(s, "Importância");
    }

    #[test]
    fn auto_falls_back_to_latin1() {
        let raw = b"Import\xe2ncia;Satisfa\xe7\xe3o";
        let auto = resolve(raw, Encoding::Auto).unwrap();
        let forced = resolve(raw, Encoding::Latin1).unwrap();
        assert_eq!(auto, forced);
        assert_eq!(auto, "Importância;Satisfação");
    }

    #[test]
    fn bom_is_stripped() {
        let mut raw = UTF8_BOM.to_vec();
        raw.extend_from_slice(b"Outcome;Importance");
        assert_eq!(
            resolve(&raw, Encoding::Auto).unwrap(),
            "Outcome;Importance"
        );
        assert_eq!(
            resolve(&raw, Encoding::Utf8).unwrap(),
            "Outcome;Importance"
        );
    }
}
