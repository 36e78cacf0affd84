use core::array;

use bytes::{Buf, Bytes};

/// The longest frame header is `REQ <id> <host> <object> <len>`
const MAX_CHUNKS: usize = 5;

/// Split a frame header into its space separated words
///
/// Runs of spaces count as a single separator. Anything past
/// [`MAX_CHUNKS`] words is returned as part of the last one, which
/// then fails to parse as a number.
pub(crate) fn split_spaces(mut bytes: Bytes) -> impl Iterator<Item = Bytes> {
    let mut chunks = array::from_fn::<_, MAX_CHUNKS, _>(|_| Bytes::new());
    let mut found = 0;

    for (i, chunk) in chunks.iter_mut().enumerate() {
        let separator = if i + 1 == MAX_CHUNKS {
            None
        } else {
            memchr::memchr(b' ', &bytes)
        };
        let Some(separator) = separator else {
            if !bytes.is_empty() {
                *chunk = bytes;
                found += 1;
            }
            break;
        };

        *chunk = bytes.split_to(separator);
        found += 1;

        let spaces = bytes.iter().take_while(|&&b| b == b' ').count();
        bytes.advance(spaces);
    }

    chunks.into_iter().take(found)
}
