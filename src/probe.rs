//! AVIF signature sniffing
//!
//! Works on the first bytes of a file and never touches libavif.

const BRANDS: [&[u8; 4]; 2] = [b"avif", b"avis"];

/// Returns true if `header` starts with an ISOBMFF `ftyp` box naming an AVIF
/// brand, either as the major brand or as a compatible brand
///
/// The first 12 bytes settle the major brand; compatible brands are only
/// checked as far as `header` reaches.
pub fn probe(header: &[u8]) -> bool {
    if header.len() < 12 || &header[4..8] != b"ftyp" {
        return false;
    }
    let brand = &header[8..12];
    if BRANDS.iter().any(|b| brand == &b[..]) {
        return true;
    }

    // ftyp: size, "ftyp", major brand, minor version, compatible brands...
    let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    if size < 16 {
        return false;
    }
    let end = size.min(header.len());
    header
        .get(16..end)
        .is_some_and(|brands| {
            brands
                .chunks_exact(4)
                .any(|c| BRANDS.iter().any(|b| c == &b[..]))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_brand() {
        assert!(probe(b"\x00\x00\x00\x18ftypavif"));
        assert!(probe(b"\x00\x00\x00\x18ftypavis"));
    }

    #[test]
    fn compatible_brand() {
        let data = b"\x00\x00\x00\x1cftypmif1\x00\x00\x00\x00mif1miafavif";
        assert!(probe(data));
    }

    #[test]
    fn compatible_brand_outside_box_ignored() {
        // box declares 20 bytes, "avif" sits after it
        let data = b"\x00\x00\x00\x14ftypmif1\x00\x00\x00\x00mif1avif";
        assert!(!probe(data));
    }

    #[test]
    fn other_formats() {
        assert!(!probe(b"\x00\x00\x00\x18ftypheic"));
        assert!(!probe(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"));
        assert!(!probe(b"RIFF\0\0\0\0WEBPVP8 "));
    }

    #[test]
    fn too_short() {
        assert!(!probe(&[]));
        assert!(!probe(b"\x00\x00\x00\x18ftypavi"));
    }
}
