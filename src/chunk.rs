//! Page-scoped overlapping-window chunker and deterministic chunk identity.
//!
//! Splits extracted page texts into [`Chunk`]s of at most `chunk_size`
//! characters, each subsequent window starting `chunk_size - chunk_overlap`
//! characters after the previous one so that consecutive chunks share a
//! `chunk_overlap`-character region. Page boundaries are hard cuts: a chunk
//! never spans two pages, which keeps page provenance unambiguous.
//!
//! Sizes are counted in Unicode scalar values, not bytes, so CJK corpora
//! chunk the same way as ASCII ones.
//!
//! Chunk identity is a pure composite key of document, page, and ordinal,
//! not a content hash: identical text appearing twice still yields distinct
//! addressable chunks, and re-ingesting byte-identical input reproduces
//! byte-identical ids.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::Chunk;

/// Split page texts into ordered chunks. Empty pages yield no chunks; a page
/// shorter than the window yields exactly one chunk equal to the whole page.
///
/// `chunk_size` must be positive and `chunk_overlap` strictly smaller than
/// it, otherwise the window cannot advance; violations are an
/// [`Error::InvalidArgument`]. Config loading checks the same bounds, but
/// library callers can construct a `ChunkingConfig` directly.
pub fn split_pages(
    pages: &[String],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(Error::InvalidArgument(
            "chunk_size must be > 0".to_string(),
        ));
    }
    if chunk_overlap >= chunk_size {
        return Err(Error::InvalidArgument(format!(
            "chunk_overlap ({chunk_overlap}) must be < chunk_size ({chunk_size})"
        )));
    }

    let mut chunks = Vec::new();
    for (page_index, page) in pages.iter().enumerate() {
        split_page(page, page_index, chunk_size, chunk_overlap, &mut chunks);
    }
    Ok(chunks)
}

fn split_page(
    page: &str,
    page_index: usize,
    chunk_size: usize,
    chunk_overlap: usize,
    out: &mut Vec<Chunk>,
) {
    // Byte offset of every char boundary, plus the terminal offset, so
    // windows counted in chars can be sliced without re-walking the string.
    let offsets: Vec<usize> = page
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(page.len()))
        .collect();
    let total_chars = offsets.len() - 1;
    if total_chars == 0 {
        return;
    }

    let step = chunk_size - chunk_overlap;
    let mut start = 0usize;
    let mut ordinal = 0usize;

    loop {
        let end = (start + chunk_size).min(total_chars);
        let text = page[offsets[start]..offsets[end]].to_string();

        // Trailing region shared with the next window. The last window of a
        // page has no successor and carries no overlap.
        let overlap_text = if end < total_chars {
            page[offsets[start + step]..offsets[end]].to_string()
        } else {
            String::new()
        };

        out.push(Chunk {
            source_page: page_index,
            ordinal,
            text,
            overlap_text,
        });

        if end == total_chars {
            break;
        }
        start += step;
        ordinal += 1;
    }
}

/// Derive the deterministic chunk identity from its composite key.
///
/// Pure function: no randomness, no clock. Two calls with identical inputs
/// always yield the identical id, which is what makes re-ingestion
/// idempotent. Collision-free across the index by construction.
pub fn chunk_id(document_id: &str, page_index: usize, ordinal: usize) -> String {
    format!("{document_id}:{page_index}:{ordinal}")
}

/// Derive the stable document identity from an uploaded file's path: its
/// final path component.
pub fn document_id_from_path(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// SHA-256 of the chunk text, stored alongside the record for staleness
/// inspection.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn page_of(len: usize) -> String {
        (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect()
    }

    #[test]
    fn page_of_2500_yields_three_windows() {
        let pages = vec![page_of(2500)];
        let chunks = split_pages(&pages, 1000, 200).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.chars().count(), 1000);
        assert_eq!(chunks[1].text.chars().count(), 1000);
        assert_eq!(chunks[2].text.chars().count(), 900);

        // Start offsets 0, 800, 1600.
        let page = &pages[0];
        assert_eq!(chunks[0].text, page[0..1000]);
        assert_eq!(chunks[1].text, page[800..1800]);
        assert_eq!(chunks[2].text, page[1600..2500]);
    }

    #[test]
    fn consecutive_windows_share_the_overlap_region() {
        let pages = vec![page_of(2500)];
        let chunks = split_pages(&pages, 1000, 200).unwrap();

        assert_eq!(chunks[0].overlap_text.chars().count(), 200);
        assert!(chunks[1].text.starts_with(&chunks[0].overlap_text));
        assert!(chunks[0].text.ends_with(&chunks[0].overlap_text));
        // Final window of the page has no successor.
        assert!(chunks[2].overlap_text.is_empty());
    }

    #[test]
    fn exact_window_length_yields_one_chunk() {
        let chunks = split_pages(&[page_of(1000)], 1000, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].overlap_text.is_empty());
    }

    #[test]
    fn page_shorter_than_overlap_yields_whole_page() {
        let chunks = split_pages(&[page_of(50)], 1000, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text.chars().count(), 50);
    }

    #[test]
    fn empty_pages_yield_zero_chunks() {
        let pages = vec![String::new(), page_of(100), String::new()];
        let chunks = split_pages(&pages, 1000, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source_page, 1);
    }

    #[test]
    fn chunks_never_span_pages() {
        let pages = vec![page_of(1500), page_of(1500)];
        let chunks = split_pages(&pages, 1000, 200).unwrap();

        for chunk in &chunks {
            let page = &pages[chunk.source_page];
            assert!(page.contains(&chunk.text));
        }
        // Ordinals restart on each page and are monotonic within it.
        let per_page: Vec<Vec<usize>> = (0..2)
            .map(|p| {
                chunks
                    .iter()
                    .filter(|c| c.source_page == p)
                    .map(|c| c.ordinal)
                    .collect()
            })
            .collect();
        assert_eq!(per_page[0], vec![0, 1]);
        assert_eq!(per_page[1], vec![0, 1]);
    }

    #[test]
    fn sizes_are_counted_in_chars_not_bytes() {
        // 1200 three-byte chars; byte-based windows would split mid-char.
        let pages = vec!["规".repeat(1200)];
        let chunks = split_pages(&pages, 1000, 200).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text.chars().count(), 1000);
        assert_eq!(chunks[1].text.chars().count(), 400);
    }

    #[test]
    fn degenerate_window_parameters_are_rejected() {
        let pages = vec!["abcdef".to_string()];

        // Overlap equal to (or exceeding) the window can never advance.
        for (size, overlap) in [(200, 200), (200, 300), (0, 200), (0, 0)] {
            let err = split_pages(&pages, size, overlap).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }

        assert!(split_pages(&pages, 200, 199).is_ok());
        assert!(split_pages(&pages, 1, 0).is_ok());
    }

    #[test]
    fn splitting_is_deterministic() {
        let pages = vec![page_of(2500), page_of(777)];
        let a = split_pages(&pages, 1000, 200).unwrap();
        let b = split_pages(&pages, 1000, 200).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_id_is_a_stable_composite_key() {
        assert_eq!(chunk_id("rules.pdf", 6, 2), "rules.pdf:6:2");
        assert_eq!(chunk_id("rules.pdf", 6, 2), chunk_id("rules.pdf", 6, 2));
        // Identical text at different positions stays distinct.
        assert_ne!(chunk_id("rules.pdf", 0, 0), chunk_id("rules.pdf", 0, 1));
    }

    #[test]
    fn document_id_is_the_file_name() {
        assert_eq!(
            document_id_from_path(&PathBuf::from("data/monopoly.pdf")),
            "monopoly.pdf"
        );
        assert_eq!(
            document_id_from_path(&PathBuf::from("monopoly.pdf")),
            "monopoly.pdf"
        );
    }
}
