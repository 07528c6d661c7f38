use std::sync::OnceLock;

use regex::Regex;

/// NCBI nucleotide namespace, the default prefix for accession URIs.
pub const NCBI_PREFIX: &str = "https://www.ncbi.nlm.nih.gov/nuccore/";

/// Canonical namespace for iGEM registry parts.
pub const IGEM_SOURCE_PREFIX: &str = "http://parts.igem.org/";

/// The public iGEM mirror on synbiohub.org.
pub const IGEM_MIRROR_PREFIX: &str = "https://synbiohub.org/public/igem/";

/// Prefix that matches any SynBioHub host.
pub const SYNBIOHUB_HOST_PREFIX: &str = "https://synbiohub";

/// Structured-record URL for an iGEM part on the public mirror.
pub fn igem_mirror_url(accession: &str) -> String {
    format!("{IGEM_MIRROR_PREFIX}BBa_{accession}")
}

/// Raw-sequence URL for an iGEM part on the registry's legacy endpoint.
pub fn igem_sequence_url(accession: &str) -> String {
    format!("{IGEM_SOURCE_PREFIX}cgi/partsdb/composite_edit/putseq.cgi?part={accession}")
}

// non-alphanumeric characters become underscores; a leading digit gets an
// underscore prefix
pub fn string_to_display_id(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 1);
    if value.chars().next().is_some_and(|ch| ch.is_ascii_digit()) {
        out.push('_');
    }
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    out
}

/// Change an accession ID to its canonical URI under `prefix`.
pub fn accession_to_uri(accession: &str, prefix: &str) -> String {
    let sep = if prefix.ends_with('/') { "" } else { "/" };
    format!("{prefix}{sep}{}", string_to_display_id(accession))
}

/// Change a canonical URI back to an accession ID, inverse of
/// [`accession_to_uri`] for accessions whose only non-alphanumeric characters
/// are dots.
pub fn uri_to_accession(uri: &str, prefix: &str) -> String {
    uri.strip_prefix(prefix).unwrap_or(uri).replace('_', ".")
}

// legacy URI form -> canonical modern prefix
const PREFIX_REMAPPINGS: &[(&str, &str)] = &[("https://synbiohub.org/public/igem/BBa_", IGEM_SOURCE_PREFIX)];

/// Rewrite a URI matching a known legacy prefix to its canonical form;
/// non-matching URIs pass through unchanged.
pub fn remap_prefix(uri: &str) -> String {
    for (old, new) in PREFIX_REMAPPINGS {
        if let Some(rest) = uri.strip_prefix(old) {
            return format!("{new}{rest}");
        }
    }
    uri.to_string()
}

/// True if `text` is a non-empty sequence of unambiguous DNA bases.
pub fn unambiguous_dna_sequence(text: &str) -> bool {
    static DNA: OnceLock<Regex> = OnceLock::new();
    let dna = DNA.get_or_init(|| Regex::new("^[acgtACGT]+$").expect("valid regex"));
    dna.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accession_uri_roundtrip() {
        let accession = "AB000100.1";
        let uri = accession_to_uri(accession, NCBI_PREFIX);
        assert_eq!(uri, "https://www.ncbi.nlm.nih.gov/nuccore/AB000100_1");
        assert_eq!(uri_to_accession(&uri, NCBI_PREFIX), accession);
    }

    #[test]
    fn accession_uri_roundtrip_without_trailing_separator() {
        let uri = accession_to_uri("J23101", "https://example.org/parts");
        assert_eq!(uri, "https://example.org/parts/J23101");
        assert_eq!(uri_to_accession(&uri, "https://example.org/parts/"), "J23101");
    }

    #[test]
    fn display_id_sanitizes_leading_digit() {
        assert_eq!(string_to_display_id("5utr spacer"), "_5utr_spacer");
        assert_eq!(string_to_display_id("K808000"), "K808000");
    }

    #[test]
    fn remap_rewrites_mirror_uris() {
        let remapped = remap_prefix("https://synbiohub.org/public/igem/BBa_K808000");
        assert_eq!(remapped, "http://parts.igem.org/K808000");
    }

    #[test]
    fn remap_is_idempotent() {
        let once = remap_prefix("https://synbiohub.org/public/igem/BBa_K808000");
        assert_eq!(remap_prefix(&once), once);
    }

    #[test]
    fn remap_leaves_other_uris_alone() {
        let uri = "https://www.ncbi.nlm.nih.gov/nuccore/AB000100_1";
        assert_eq!(remap_prefix(uri), uri);
    }

    #[test]
    fn dna_check_accepts_bases_only() {
        assert!(unambiguous_dna_sequence("ATGC"));
        assert!(unambiguous_dna_sequence("atgcATGC"));
        assert!(!unambiguous_dna_sequence(""));
        assert!(!unambiguous_dna_sequence("ATGN"));
        assert!(!unambiguous_dna_sequence("<html><body>part not found</body></html>"));
    }
}
