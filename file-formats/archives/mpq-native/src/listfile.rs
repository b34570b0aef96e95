//! (listfile) parsing

/// Name of the internal file listing the archive's file names
pub const LISTFILE_NAME: &str = "(listfile)";

/// Split a (listfile) into file names
///
/// Names are separated by `;`, CR or LF; empty names are skipped.
pub fn parse(data: &[u8]) -> Vec<String> {
    let content = String::from_utf8_lossy(data);
    if matches!(content, std::borrow::Cow::Owned(_)) {
        log::warn!("(listfile) contains invalid UTF-8, using lossy conversion");
    }

    let names: Vec<String> = content
        .split([';', '\r', '\n'])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect();

    log::debug!("Parsed {} names from (listfile)", names.len());
    names
}
