use tracing::{debug, instrument};

// =============== Incremental change-array scanning ===============
//
// The backend streams one JSON document, `{"changes":[ {...}, {...} ]}`,
// with array elements arriving incrementally and chunk boundaries falling
// anywhere relative to JSON tokens. The functions here are pure over a text
// buffer so the driver can re-run them on `remainder + next_chunk` and get
// exactly the behavior of a single pass over the concatenation.

/// Result of one extraction pass over the buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Complete top-level `{...}` spans, in stream order.
    pub objects: Vec<String>,
    /// Trailing partial object kept verbatim for the next pass. Separator
    /// commas and whitespace between objects are dropped.
    pub remainder: String,
    /// An unmatched `]` at depth 0 was seen: the changes array is closed and
    /// anything after it is not part of the payload.
    pub array_closed: bool,
}

/// Scan state while walking the buffer. `depth == 0` with no `start` means
/// no object is currently open.
#[derive(Debug, Default)]
struct ScanState {
    depth: u32,
    in_string: bool,
    escaped: bool,
    start: Option<usize>,
}

/// Slice every complete top-level JSON object out of `buffer`.
///
/// Braces only count outside string literals; a backslash inside a string
/// neutralizes exactly the next character, so escaped quotes never terminate
/// the string. An unterminated string or unbalanced object at the end of the
/// buffer is not an error, it is an incomplete trailing object and comes back
/// in `remainder`.
#[instrument(target = "regdelta::scanner", skip(buffer), fields(buffer_len = buffer.len()))]
pub fn extract_objects(buffer: &str) -> Extraction {
    let bytes = buffer.as_bytes();
    let mut state = ScanState::default();
    let mut out = Extraction::default();
    // Earliest unconsumed non-separator byte; seeds the remainder.
    let mut tail: Option<usize> = None;

    for (i, &b) in bytes.iter().enumerate() {
        if state.in_string {
            if state.escaped {
                state.escaped = false;
                continue;
            }
            match b {
                b'\\' => state.escaped = true,
                b'"' => state.in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' => {
                state.in_string = true;
                if state.depth == 0 && tail.is_none() {
                    tail = Some(i);
                }
            }
            b'{' => {
                if state.depth == 0 {
                    state.start = Some(i);
                    tail = Some(i);
                }
                state.depth += 1;
            }
            b'}' => {
                if state.depth > 0 {
                    state.depth -= 1;
                    if state.depth == 0 {
                        if let Some(start) = state.start.take() {
                            out.objects.push(buffer[start..=i].to_string());
                        }
                        tail = None;
                    }
                }
            }
            b']' if state.depth == 0 => {
                // End of the changes array; trailing stream content is noise.
                out.array_closed = true;
                debug!(
                    target: "regdelta::scanner",
                    objects = out.objects.len(),
                    "array closed"
                );
                return out;
            }
            // Commas and whitespace between objects are inert separators.
            _ => {}
        }
    }

    if let Some(tail) = tail {
        out.remainder = buffer[tail..].to_string();
    }
    debug!(
        target: "regdelta::scanner",
        objects = out.objects.len(),
        remainder_len = out.remainder.len(),
        "extraction pass complete"
    );
    out
}

/// Locate the end of the stream wrapper: the literal `"changes"` key followed
/// by optional whitespace, `:`, optional whitespace and `[`. Returns the index
/// one past the `[`.
///
/// `None` means "not found yet", never "malformed": the caller must retry once
/// more data has arrived, and a stream that ends without the wrapper is simply
/// a zero-change stream.
pub fn find_wrapper_end(buffer: &str) -> Option<usize> {
    const KEY: &str = "\"changes\"";
    let mut from = 0;
    while let Some(pos) = buffer[from..].find(KEY) {
        let key_end = from + pos + KEY.len();
        let rest = buffer[key_end..].as_bytes();
        let mut i = 0;
        while i < rest.len() && rest[i].is_ascii_whitespace() {
            i += 1;
        }
        if i < rest.len() && rest[i] == b':' {
            i += 1;
            while i < rest.len() && rest[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < rest.len() && rest[i] == b'[' {
                return Some(key_end + i + 1);
            }
        }
        if i >= rest.len() {
            // The colon or bracket may still be in flight.
            return None;
        }
        // Mismatch after the key (e.g. `"changes"` inside some other string);
        // keep looking for a later occurrence.
        from = key_end;
    }
    None
}
