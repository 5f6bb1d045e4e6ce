use crate::types::FormatTag;

const HINT_PREFIX: &str = "_format_:";

/// Split a `_format_:<tag>:` hint off a location.
///
/// An unrecognized tag still counts as a hint and yields
/// [`FormatTag::Unsupported`].
pub fn split_hint(location: &str) -> (Option<FormatTag>, &str) {
    let Some(rest) = location.strip_prefix(HINT_PREFIX) else {
        return (None, location);
    };
    match rest.split_once(':') {
        Some((tag, bare)) => {
            let tag = tag.parse().unwrap_or(FormatTag::Unsupported);
            (Some(tag), bare)
        }
        None => (None, location),
    }
}

/// The location with any format hint removed.
pub fn strip_hint(location: &str) -> &str {
    split_hint(location).1
}

/// Format implied by the location's file extension.
pub fn from_extension(location: &str) -> Option<FormatTag> {
    let path = match url::Url::parse(location) {
        Ok(url) if url.scheme().len() > 1 => url.path().to_string(),
        _ => location.to_string(),
    };
    let name = path.rsplit('/').next().unwrap_or(&path).to_ascii_lowercase();

    if name.ends_with(".bigbedlarge") {
        Some(FormatTag::BigBedLarge)
    } else if name.ends_with(".bigwig") || name.ends_with(".bw") {
        Some(FormatTag::BigWig)
    } else if name.ends_with(".bigbed") || name.ends_with(".bb") {
        Some(FormatTag::BigBed)
    } else if name.ends_with(".hic") {
        Some(FormatTag::Hic)
    } else if name.ends_with(".image.gz") || name.ends_with(".image") {
        Some(FormatTag::Image)
    } else {
        None
    }
}
