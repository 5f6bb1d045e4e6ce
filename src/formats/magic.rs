use crate::types::FormatTag;

/// Number of leading bytes needed to tell formats apart
pub const MAGIC_LEN: usize = 8;

const BIGWIG_MAGIC: u32 = 0x888F_FC26;
const BIGBED_MAGIC: u32 = 0x8789_F2EB;
const HIC_MAGIC: &[u8; 4] = b"HIC\0";
const BGZF_MAGIC: [u8; 4] = [0x1f, 0x8b, 0x08, 0x04];

/// Classify content from its leading bytes.
///
/// bbi files may be written in either byte order, so both are accepted.
pub fn sniff(head: &[u8]) -> Option<FormatTag> {
    let word: [u8; 4] = head.get(..4)?.try_into().ok()?;

    let le = u32::from_le_bytes(word);
    let be = u32::from_be_bytes(word);
    if le == BIGWIG_MAGIC || be == BIGWIG_MAGIC {
        return Some(FormatTag::BigWig);
    }
    if le == BIGBED_MAGIC || be == BIGBED_MAGIC {
        return Some(FormatTag::BigBed);
    }
    if &word == HIC_MAGIC {
        return Some(FormatTag::Hic);
    }
    if word == BGZF_MAGIC {
        return Some(FormatTag::Image);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbi_magic_both_orders() {
        assert_eq!(sniff(&BIGWIG_MAGIC.to_le_bytes()), Some(FormatTag::BigWig));
        assert_eq!(sniff(&BIGWIG_MAGIC.to_be_bytes()), Some(FormatTag::BigWig));
        assert_eq!(sniff(&BIGBED_MAGIC.to_le_bytes()), Some(FormatTag::BigBed));
        assert_eq!(sniff(&BIGBED_MAGIC.to_be_bytes()), Some(FormatTag::BigBed));
    }

    #[test]
    fn test_hic_and_bgzf() {
        assert_eq!(sniff(b"HIC\0\x09\0\0\0"), Some(FormatTag::Hic));
        assert_eq!(
            sniff(&[0x1f, 0x8b, 0x08, 0x04, 0, 0, 0, 0]),
            Some(FormatTag::Image)
        );
    }

    #[test]
    fn test_plain_gzip_is_not_bgzf() {
        assert_eq!(sniff(&[0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0]), None);
    }

    #[test]
    fn test_short_or_unknown_input() {
        assert_eq!(sniff(b""), None);
        assert_eq!(sniff(b"HIC"), None);
        assert_eq!(sniff(b"##fileformat"), None);
    }
}
