//! Printer-command parsing: label-dialect DM code extraction and the
//! fixed-reply control subprotocol.
//!
//! This mirrors the role `ipico_core::read::ChipRead::try_from` plays in
//! the original timing stack: a pure, allocation-light string parser with
//! no I/O, unit-tested against literal byte strings, called once per
//! received payload by the printer-role listener.

use rand::Rng;

const CHUNK_SIZE: usize = 4096;

/// Size of a single non-blocking read chunk (see printer-role listener).
pub const READ_CHUNK_SIZE: usize = CHUNK_SIZE;

// ---------------------------------------------------------------------------
// Control requests
// ---------------------------------------------------------------------------

/// The four fixed-reply control requests a printer-role client may send
/// instead of a print job. Matched against the *whole* trimmed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    /// `ESC` `!?` (0x1B 0x21 0x3F) — replies with a single NUL byte.
    EscQuery,
    /// `~S,CHECK` — replies with the two bytes `00`.
    Check,
    /// `OUT @LABEL` — replies with the global print counter as decimal.
    Counter,
    /// `~S,LABEL` — replies with the per-client print-buffer length as decimal.
    BufferLength,
}

impl ControlRequest {
    /// The reply for requests whose reply doesn't depend on caller state.
    /// `Counter` and `BufferLength` need the caller's counter/buffer length
    /// and have no fixed reply here.
    pub fn fixed_reply(self) -> Option<&'static [u8]> {
        match self {
            ControlRequest::EscQuery => Some(&[0x00]),
            ControlRequest::Check => Some(b"00"),
            ControlRequest::Counter | ControlRequest::BufferLength => None,
        }
    }
}

/// Match a trimmed payload against the four fixed control requests.
pub fn match_control_request(trimmed: &str) -> Option<ControlRequest> {
    match trimmed {
        "\u{1b}!?" => Some(ControlRequest::EscQuery),
        "~S,CHECK" => Some(ControlRequest::Check),
        "OUT @LABEL" => Some(ControlRequest::Counter),
        "~S,LABEL" => Some(ControlRequest::BufferLength),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// GTIN suffixes
// ---------------------------------------------------------------------------

const VOLUME_GTIN: &str = "05060367340398";
const WEIGHT_GTIN: &str = "07808631857726";
const GROUP_SEPARATOR: char = '\u{1d}';

/// Replace every `~d034` occurrence with a literal double quote, the
/// escape the label-printer dialects use for an embedded `"`.
fn unescape_quotes(s: &str) -> String {
    s.replace("~d034", "\"")
}

/// Remove one leading and one trailing character (quote delimiters around
/// a comma-split field). Fields shorter than two characters have nothing
/// meaningful left to strip and are cleared.
fn strip_delimiters(s: &str) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    if chars.len() >= 2 {
        chars.remove(0);
        chars.pop();
        chars.into_iter().collect()
    } else {
        String::new()
    }
}

// ---------------------------------------------------------------------------
// Row dialect extraction
// ---------------------------------------------------------------------------

/// Scan `trimmed` (already whitespace-stripped) row by row and return the
/// first dialect match. Returns `None` if no row in the payload matches a
/// pattern, or if the payload is empty.
fn extract_raw_code(trimmed: &str) -> Option<String> {
    let rows: Vec<&str> = trimmed.split('\n').collect();
    for (i, row) in rows.iter().enumerate() {
        if let Some(pos) = row.find("BARCODE=") {
            let field = &row[pos + "BARCODE=".len()..];
            return Some(unescape_quotes(field).trim().to_owned());
        }
        if row.contains("DMATRIX") || row.contains("BARCODE ") {
            if let Some(last) = row.split(',').last() {
                let unescaped = unescape_quotes(last);
                return Some(strip_delimiters(&unescaped).trim().to_owned());
            }
        }
        if row.contains("XRB0,0,") {
            // The code lives on the next row; if there isn't one, this row
            // doesn't yield a code and scanning continues.
            if let Some(next) = rows.get(i + 1) {
                return Some(next.trim().to_owned());
            }
            continue;
        }
        if let Some(pos) = row.find("BR,24,24,2,5,250,0,1,") {
            let field = &row[pos + "BR,24,24,2,5,250,0,1,".len()..];
            return Some(unescape_quotes(field).trim().to_owned());
        }
        if row.contains("BR,24,24") {
            // Detection condition matched but the longer extraction literal
            // isn't present in this row: this pattern wins the row scan and
            // yields no code, the same as any other matched-but-empty row.
            return None;
        }
        if row.contains("^FH^FD_7e") {
            let stripped = row.replace("^FH^FD_7e", "").replace("^FS", "");
            return Some(stripped.trim().to_owned());
        }
    }
    None
}

/// Strip a leading `~1` prefix and append GS1 weight/volume suffixes for
/// matching GTINs. Returns `None` if the resulting code is empty.
pub fn finalize_code<R: Rng + ?Sized>(raw: String, rng: &mut R) -> Option<String> {
    let mut code = raw.strip_prefix("~1").map(str::to_owned).unwrap_or(raw);
    if code.contains(VOLUME_GTIN) {
        append_gs1_suffix(&mut code, "3353", rng);
    }
    if code.contains(WEIGHT_GTIN) {
        append_gs1_suffix(&mut code, "3103", rng);
    }
    if code.is_empty() { None } else { Some(code) }
}

fn append_gs1_suffix<R: Rng + ?Sized>(code: &mut String, ai: &str, rng: &mut R) {
    code.push(GROUP_SEPARATOR);
    code.push_str(ai);
    code.push_str(&format!("{:06}", rng.gen_range(0..=999_999u32)));
}

/// Extract and finalize a DM code from a full trimmed printer payload.
/// `payload` should already have surrounding whitespace stripped by the
/// caller (the listener accumulates a chunked read, then trims once).
pub fn extract_code<R: Rng + ?Sized>(payload: &str, rng: &mut R) -> Option<String> {
    let raw = extract_raw_code(payload)?;
    finalize_code(raw, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn rng() -> StepRng {
        StepRng::new(123_456, 1)
    }

    #[test]
    fn control_requests_match_exact_payloads() {
        assert_eq!(
            match_control_request("\u{1b}!?"),
            Some(ControlRequest::EscQuery)
        );
        assert_eq!(
            match_control_request("~S,CHECK"),
            Some(ControlRequest::Check)
        );
        assert_eq!(
            match_control_request("OUT @LABEL"),
            Some(ControlRequest::Counter)
        );
        assert_eq!(
            match_control_request("~S,LABEL"),
            Some(ControlRequest::BufferLength)
        );
        assert_eq!(match_control_request("BARCODE=123"), None);
    }

    #[test]
    fn esc_query_fixed_reply_is_a_single_nul() {
        assert_eq!(ControlRequest::EscQuery.fixed_reply(), Some([0x00].as_slice()));
    }

    #[test]
    fn check_fixed_reply_is_two_zero_bytes() {
        assert_eq!(ControlRequest::Check.fixed_reply(), Some(b"00".as_slice()));
    }

    #[test]
    fn counter_and_buffer_length_have_no_fixed_reply() {
        assert_eq!(ControlRequest::Counter.fixed_reply(), None);
        assert_eq!(ControlRequest::BufferLength.fixed_reply(), None);
    }

    #[test]
    fn barcode_equals_dialect() {
        let mut r = rng();
        let code = extract_code("BARCODE=01034567890123452159ABCD", &mut r).unwrap();
        assert_eq!(code, "01034567890123452159ABCD");
    }

    #[test]
    fn barcode_equals_unescapes_quote_delimiter() {
        let mut r = rng();
        let code = extract_code("BARCODE=~d034hello~d034", &mut r).unwrap();
        assert_eq!(code, "\"hello\"");
    }

    #[test]
    fn dmatrix_dialect_comma_split_and_quote_stripped() {
        let mut r = rng();
        let code = extract_code(
            "DMATRIX 10,10,400,400,c126,\"0109876543210982215ZXY\"",
            &mut r,
        )
        .unwrap();
        assert_eq!(code, "0109876543210982215ZXY");
    }

    #[test]
    fn barcode_space_dialect_comma_split() {
        let mut r = rng();
        let code = extract_code("BARCODE 1,2,3,\"ABCDEF\"", &mut r).unwrap();
        assert_eq!(code, "ABCDEF");
    }

    #[test]
    fn xrb_dialect_takes_next_row() {
        let mut r = rng();
        let payload = "XRB0,0,6,0,ignored\n  010987XYZ  \nother";
        let code = extract_code(payload, &mut r).unwrap();
        assert_eq!(code, "010987XYZ");
    }

    #[test]
    fn xrb_dialect_without_next_row_yields_no_code() {
        let mut r = rng();
        let payload = "some text\nXRB0,0,6,0,ignored";
        assert_eq!(extract_code(payload, &mut r), None);
    }

    #[test]
    fn br_dialect_strips_long_prefix() {
        let mut r = rng();
        let code = extract_code("BR,24,24,2,5,250,0,1,ABCXYZ123", &mut r).unwrap();
        assert_eq!(code, "ABCXYZ123");
    }

    #[test]
    fn br_dialect_detection_without_extraction_prefix_yields_no_code() {
        let mut r = rng();
        assert_eq!(extract_code("BR,24,24 but no standard prefix here", &mut r), None);
    }

    #[test]
    fn br_dialect_detection_without_prefix_stops_the_scan_entirely() {
        let mut r = rng();
        let payload = "junk BR,24,24 nomatch\nBARCODE=REALCODE";
        assert_eq!(extract_code(payload, &mut r), None);
    }

    #[test]
    fn zpl_dialect_strips_markers() {
        let mut r = rng();
        let code = extract_code("^FH^FD_7eABC123^FS", &mut r).unwrap();
        assert_eq!(code, "ABC123");
    }

    #[test]
    fn first_matching_row_wins_and_later_rows_are_ignored() {
        let mut r = rng();
        let payload = "BARCODE=FIRST\nBARCODE=SECOND";
        let code = extract_code(payload, &mut r).unwrap();
        assert_eq!(code, "FIRST");
    }

    #[test]
    fn unrecognized_payload_yields_no_code() {
        let mut r = rng();
        assert_eq!(extract_code("just some garbage\ntext", &mut r), None);
    }

    #[test]
    fn tilde_one_prefix_is_stripped() {
        let mut r = rng();
        let code = extract_code("BARCODE=~1010987\u{1d}215XY", &mut r).unwrap();
        assert_eq!(code, "010987\u{1d}215XY");
    }

    #[test]
    fn volume_gtin_gets_3353_suffix() {
        let mut r = rng();
        let code =
            extract_code("BARCODE=01050603673403981234567890123456", &mut r).unwrap();
        assert!(code.starts_with("01050603673403981234567890123456\u{1d}3353"));
        let suffix = &code[code.len() - 6..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn weight_gtin_gets_3103_suffix() {
        let mut r = rng();
        let code = extract_code("BARCODE=0780863185772612345", &mut r).unwrap();
        assert!(code.starts_with("0780863185772612345\u{1d}3103"));
    }

    #[test]
    fn empty_code_after_extraction_yields_none() {
        let mut r = rng();
        assert_eq!(extract_code("BARCODE=   ", &mut r), None);
    }
}
