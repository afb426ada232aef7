//! Document naming, title extraction and the sample document set.

const FILE_PREFIX: &str = "rfc";
const FILE_EXTENSION: &str = ".txt";

/// File name for document `number`, e.g. `rfc123.txt`.
pub fn file_name(number: u32) -> String {
    format!("{}{}{}", FILE_PREFIX, number, FILE_EXTENSION)
}

/// Inverse of [`file_name`]; `None` for anything else in the directory.
pub fn number_from_file_name(name: &str) -> Option<u32> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXTENSION)?
        .parse()
        .ok()
}

/// Title used when none can be read from the document.
pub fn default_title(number: u32) -> String {
    format!("RFC {}", number)
}

/// Title from a document's first line.
///
/// `RFC 123 - Some Title` gives the text after the first `-`;
/// `RFC 123 Some Title` gives the words after the number; any other
/// non-empty line is taken whole.
pub fn extract_title(first_line: &str) -> Option<String> {
    let line = first_line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some((_, rest)) = line.split_once('-') {
        let title = rest.trim();
        return (!title.is_empty()).then(|| title.to_string());
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() >= 3 && parts[0].eq_ignore_ascii_case("RFC") {
        return Some(parts[2..].join(" "));
    }
    Some(line.to_string())
}

/// Sample documents written by the fixture generator, one per peer directory.
pub const SAMPLES: [(u32, &str); 3] = [
    (123, "A Proferred Official ICP"),
    (2345, "Domain Names and Company Name Retrieval"),
    (3457, "Requirements for IPsec Remote Access Scenarios"),
];

/// Body of a sample document. Its first line round-trips through [`extract_title`].
pub fn sample_text(number: u32, title: &str) -> String {
    let lower = title.to_lowercase();
    format!(
        "RFC {number} - {title}\n\
         \n\
         This is a sample RFC document for testing the P2P-CI system.\n\
         \n\
         Abstract:\n\
         This document describes {lower}.\n\
         \n\
         1. Introduction\n\
         This RFC provides specifications for {lower}.\n\
         \n\
         2. Implementation\n\
         The implementation details are provided here.\n\
         \n\
         3. Conclusion\n\
         This concludes the RFC document.\n"
    )
}
