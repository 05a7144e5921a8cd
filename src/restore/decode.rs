// dumprestore/src/restore/decode.rs
//! Pull-based decoding of back-to-back BSON documents in a dump buffer.

use bson::Document;

use crate::errors::{RestoreError, Result};

/// Smallest well-formed BSON document: a 4-byte length and the trailing NUL.
const MIN_DOCUMENT_LEN: usize = 5;
const LENGTH_PREFIX_LEN: usize = 4;

/// Decodes exactly one document starting at `offset`.
///
/// Returns the document and the offset of the byte right after it.
pub fn decode_one_document(buffer: &[u8], offset: usize) -> Result<(Document, usize)> {
    let remaining = buffer.len().saturating_sub(offset);
    if remaining < LENGTH_PREFIX_LEN {
        return Err(RestoreError::Decode {
            offset,
            reason: format!("truncated length prefix: only {remaining} bytes left"),
        });
    }

    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    prefix.copy_from_slice(&buffer[offset..offset + LENGTH_PREFIX_LEN]);
    let declared = i32::from_le_bytes(prefix);

    if declared < MIN_DOCUMENT_LEN as i32 {
        return Err(RestoreError::Decode {
            offset,
            reason: format!("invalid document length {declared}"),
        });
    }
    let declared = declared as usize;
    if declared > remaining {
        return Err(RestoreError::Decode {
            offset,
            reason: format!("document length {declared} exceeds the {remaining} remaining bytes"),
        });
    }

    let end = offset + declared;
    let mut reader = &buffer[offset..end];
    let document = Document::from_reader(&mut reader).map_err(|e| RestoreError::Decode {
        offset,
        reason: e.to_string(),
    })?;
    Ok((document, end))
}

/// Lazy, non-restartable iterator over the documents of a buffer.
///
/// Yields `Some(Err(..))` once on a malformed document and is exhausted afterwards,
/// so an error is never confused with the end of the buffer.
#[derive(Debug)]
pub struct DocumentCursor<'a> {
    buffer: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> DocumentCursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            offset: 0,
            failed: false,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for DocumentCursor<'_> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buffer.len() {
            return None;
        }
        match decode_one_document(self.buffer, self.offset) {
            Ok((document, next)) => {
                self.offset = next;
                Some(Ok(document))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for DocumentCursor<'_> {}

/// Limit, filter and transform applied while draining a buffer.
#[derive(Clone, Copy, Default)]
pub struct DecodeOptions<'f> {
    /// Maximum number of accepted documents; `Some(0)` accepts none.
    pub limit: Option<usize>,
    pub filter: Option<&'f (dyn Fn(&Document) -> bool + Send + Sync)>,
    pub transform: Option<&'f (dyn Fn(Document) -> Document + Send + Sync)>,
}

/// Decodes the whole buffer, or until `limit` documents have been accepted.
///
/// Rejected documents do not count towards the limit. Any malformed document
/// fails the whole call.
pub fn decode_all(buffer: &[u8], options: &DecodeOptions<'_>) -> Result<Vec<Document>> {
    decode_prefix(buffer, options).map(|(accepted, _)| accepted)
}

/// Same as [`decode_all`], also returning how many bytes were consumed.
pub(crate) fn decode_prefix(
    buffer: &[u8],
    options: &DecodeOptions<'_>,
) -> Result<(Vec<Document>, usize)> {
    let mut accepted = Vec::new();
    let mut cursor = DocumentCursor::new(buffer);

    while options.limit.is_none_or(|limit| accepted.len() < limit) {
        let Some(document) = cursor.next() else {
            break;
        };
        let document = document?;
        if let Some(filter) = options.filter {
            if !filter(&document) {
                continue;
            }
        }
        let document = match options.transform {
            Some(transform) => transform(document),
            None => document,
        };
        accepted.push(document);
    }

    tracing::debug!(
        accepted = accepted.len(),
        consumed = cursor.offset(),
        total = buffer.len(),
        "decoded dump buffer"
    );
    Ok((accepted, cursor.offset()))
}
