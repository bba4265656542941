//! Decoder fuzz target: feed arbitrary bytes to the decoder, strict and lenient.
//! The decoder must not panic; anything it accepts must re-encode and decode to
//! the same value.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use minipack::{decode_slice, encode_to_vec, DecodeOptions, EncodeOptions};

    let _ = decode_slice(data, &DecodeOptions::default());
    let lenient = DecodeOptions::lenient();
    if let Ok(v) = decode_slice(data, &lenient) {
        let bytes = encode_to_vec(&v, &EncodeOptions::default()).expect("re-encode");
        let again = decode_slice(&bytes, &lenient).expect("decode re-encoded");
        // NaN never compares equal; compare encodings instead.
        let bytes_again = encode_to_vec(&again, &EncodeOptions::default()).expect("re-encode");
        assert_eq!(bytes, bytes_again);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
