//! Black-box tests for the printer-command dialect parser, mirroring the
//! real printer-client traffic a DM printer listener sees on the wire.

use dm_core::{extract_code, match_control_request, ControlRequest};
use rand::rngs::mock::StepRng;

fn rng() -> StepRng {
    StepRng::new(42, 7)
}

#[test]
fn scenario_single_print_single_subscriber() {
    let mut r = rng();
    let code = extract_code("BARCODE=01034567890123452159ABCD\r", &mut r).unwrap();
    assert_eq!(code, "01034567890123452159ABCD");
}

#[test]
fn scenario_dmatrix_dialect() {
    let mut r = rng();
    let code = extract_code(
        "DMATRIX 10,10,400,400,c126,\"0109876543210982215ZXY\"",
        &mut r,
    )
    .unwrap();
    assert_eq!(code, "0109876543210982215ZXY");
}

#[test]
fn scenario_tilde_one_prefix_stripping() {
    let mut r = rng();
    let code = extract_code("BARCODE=~1010987\u{1d}215XY", &mut r).unwrap();
    assert_eq!(code, "010987\u{1d}215XY");
}

#[test]
fn scenario_gtin_volume_suffix_matches_shape() {
    let mut r = rng();
    let code = extract_code("BARCODE=01050603673403981234567890123456", &mut r).unwrap();
    let (prefix, suffix) = code.split_at(code.len() - 10);
    assert_eq!(prefix, "01050603673403981234567890123456\u{1d}3353");
    assert_eq!(suffix.len(), 6);
    assert!(suffix.chars().all(|c| c.is_ascii_digit()));
}

#[test]
fn scenario_control_op_replies_are_literal() {
    assert_eq!(
        match_control_request("OUT @LABEL"),
        Some(ControlRequest::Counter)
    );
    assert_eq!(
        match_control_request("~S,LABEL"),
        Some(ControlRequest::BufferLength)
    );
    assert_eq!(
        ControlRequest::EscQuery.fixed_reply().unwrap(),
        &[0x00]
    );
    assert_eq!(ControlRequest::Check.fixed_reply().unwrap(), b"00");
}

#[test]
fn extracted_field_is_trimmed_even_with_surrounding_row_whitespace() {
    let mut r = rng();
    let code = extract_code("  BARCODE=TRIMMED  ", &mut r).unwrap();
    assert_eq!(code, "TRIMMED");
}
