//! Decoder tests: every tag family, end-of-input classification, key policies,
//! extension resolution and the resource limits on hostile input.

use minipack::{
    decode, decode_slice, decode_slice_with_extent, CodecError, DecodeOptions, Decoder,
    DuplicateKeyPolicy, Extension, Map, Timestamp, UnknownExtensionPolicy, UnsupportedKeyPolicy,
    Value,
};
use minipack::reader::{SliceReader, StreamReader};
use std::io::{Seek, SeekFrom, Write};

fn strict() -> DecodeOptions {
    DecodeOptions::default()
}

fn dec(bytes: &[u8]) -> Result<Value, CodecError> {
    decode_slice(bytes, &strict())
}

#[test]
fn test_decode_scalars() {
    let cases: &[(&[u8], Value)] = &[
        (&[0xc0], Value::Nil),
        (&[0xc2], Value::Bool(false)),
        (&[0xc3], Value::Bool(true)),
        (&[0x00], Value::Int(0)),
        (&[0x7f], Value::Int(127)),
        (&[0xe0], Value::Int(-32)),
        (&[0xff], Value::Int(-1)),
        (&[0xcc, 0xff], Value::UInt(255)),
        (&[0xcd, 0x01, 0x00], Value::UInt(256)),
        (&[0xce, 0xde, 0xad, 0xbe, 0xef], Value::UInt(0xdead_beef)),
        (&[0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff], Value::UInt(u64::MAX)),
        (&[0xd0, 0x80], Value::Int(-128)),
        (&[0xd1, 0xff, 0x00], Value::Int(-256)),
        (&[0xd2, 0x80, 0x00, 0x00, 0x00], Value::Int(i32::MIN as i64)),
        (&[0xd3, 0x80, 0, 0, 0, 0, 0, 0, 0], Value::Int(i64::MIN)),
        (&[0xca, 0x3f, 0x80, 0x00, 0x00], Value::F32(1.0)),
        (&[0xcb, 0x40, 0x12, 0, 0, 0, 0, 0, 0], Value::F64(4.5)),
    ];
    for (bytes, want) in cases {
        assert_eq!(&dec(bytes).expect("decode"), want, "bytes {:02x?}", bytes);
    }
}

#[test]
fn test_decode_strings_and_binaries() {
    assert_eq!(dec(&[0xa3, b'f', b'o', b'o']).unwrap(), Value::from("foo"));
    assert_eq!(dec(&[0xa0]).unwrap(), Value::from(""));
    assert_eq!(dec(&[0xd9, 0x01, b'x']).unwrap(), Value::from("x"));
    assert_eq!(dec(&[0xda, 0x00, 0x02, b'h', b'i']).unwrap(), Value::from("hi"));
    assert_eq!(dec(&[0xdb, 0, 0, 0, 1, b'z']).unwrap(), Value::from("z"));
    assert_eq!(dec(&[0xc4, 0x02, 1, 2]).unwrap(), Value::Bin(vec![1, 2]));
    assert_eq!(dec(&[0xc5, 0x00, 0x01, 9]).unwrap(), Value::Bin(vec![9]));
    assert_eq!(dec(&[0xc6, 0, 0, 0, 0]).unwrap(), Value::Bin(vec![]));

    // Invalid UTF-8 is kept as-is.
    let v = dec(&[0xa2, 0xff, 0xfe]).unwrap();
    assert_eq!(v, Value::Str(vec![0xff, 0xfe]));
    assert_eq!(v.as_str(), None);
}

#[test]
fn test_decode_containers() {
    assert_eq!(dec(&[0x90]).unwrap(), Value::Array(vec![]));
    assert_eq!(
        dec(&[0x92, 0x01, 0xc0]).unwrap(),
        Value::Array(vec![Value::Int(1), Value::Nil])
    );
    assert_eq!(dec(&[0xdc, 0x00, 0x01, 0xc3]).unwrap(), Value::Array(vec![Value::Bool(true)]));
    assert_eq!(dec(&[0xdd, 0, 0, 0, 0]).unwrap(), Value::Array(vec![]));

    let v = dec(&[0x82, 0xa1, b'b', 0x02, 0xa1, b'a', 0x01]).unwrap();
    let m = v.as_map().expect("map");
    // Wire order is kept.
    let keys: Vec<&str> = m.keys().filter_map(Value::as_str).collect();
    assert_eq!(keys, ["b", "a"]);
    assert_eq!(m.get_str("a"), Some(&Value::Int(1)));
    assert_eq!(dec(&[0xde, 0x00, 0x00]).unwrap(), Value::Map(Map::new()));
    assert_eq!(dec(&[0xdf, 0, 0, 0, 0]).unwrap(), Value::Map(Map::new()));
}

#[test]
fn test_decode_eof_classification() {
    // Nothing at all for the field being read.
    let empty_field: [&[u8]; 7] = [&[], &[0xd0], &[0x91], &[0xcd], &[0xa1], &[0xd4], &[0x81, 0x01]];
    for bytes in empty_field {
        assert!(matches!(dec(bytes), Err(CodecError::Eof)), "bytes {:02x?}", bytes);
    }
    // Part of the field is there.
    let partial_field: [&[u8]; 5] = [
        &[0xd1, 0x00],
        &[0xcb, 0x40, 0x12],
        &[0xa3, b'f', b'o'],
        &[0xdc, 0x00],
        &[0xd6, 0x05, 0x00],
    ];
    for bytes in partial_field {
        assert!(matches!(dec(bytes), Err(CodecError::UnexpectedEof)), "bytes {:02x?}", bytes);
    }
    // ext 8, 255 bytes declared, 254 present.
    let mut ext = vec![0xc7, 0xff, 0x00];
    ext.extend(std::iter::repeat(0u8).take(254));
    assert!(matches!(dec(&ext), Err(CodecError::UnexpectedEof)));
}

#[test]
fn test_decode_reserved_tag_is_invalid() {
    assert!(matches!(dec(&[0xc1]), Err(CodecError::InvalidFormat)));
    assert!(matches!(dec(&[0x91, 0xc1]), Err(CodecError::InvalidFormat)));
}

#[test]
fn test_decode_huge_declared_lengths_fail_cheaply() {
    let hostile: [&[u8]; 4] = [
        &[0xdb, 0xff, 0xff, 0xff, 0xff, b'a'],
        &[0xc6, 0xff, 0xff, 0xff, 0xff, 1, 2, 3],
        &[0xdd, 0xff, 0xff, 0xff, 0xff, 0x01],
        &[0xdf, 0xff, 0xff, 0xff, 0xff, 0x01, 0x02],
    ];
    for bytes in hostile {
        let err = dec(bytes).unwrap_err();
        assert!(err.is_eof(), "bytes {:02x?}: {}", bytes, err);
        let err = decode(bytes, &strict()).unwrap_err();
        assert!(err.is_eof(), "stream bytes {:02x?}: {}", bytes, err);
    }
}

#[test]
fn test_decode_depth_limit() {
    let mut deep = vec![0x91u8; 100_000];
    deep.push(0xc0);
    assert!(matches!(dec(&deep), Err(CodecError::DepthLimitExceeded(512))));

    let opts = strict().with_max_depth(3);
    assert!(decode_slice(&[0x91, 0x91, 0xc0], &opts).is_ok());
    assert!(matches!(
        decode_slice(&[0x91, 0x91, 0x91, 0xc0], &opts),
        Err(CodecError::DepthLimitExceeded(3))
    ));
}

#[test]
fn test_decode_duplicate_keys() {
    // {"a": 1, "a": 2}
    let bytes = [0x82, 0xa1, b'a', 0x01, 0xa1, b'a', 0x02];
    assert!(matches!(dec(&bytes), Err(CodecError::DuplicateKey)));

    let opts = strict().with_duplicate_keys(DuplicateKeyPolicy::FirstWins);
    let v = decode_slice(&bytes, &opts).unwrap();
    let m = v.as_map().unwrap();
    assert_eq!(m.len(), 1);
    assert_eq!(m.get_str("a"), Some(&Value::Int(1)));
}

#[test]
fn test_decode_key_identity_respects_families() {
    // {1: "s", 1u: "u"} are different keys.
    let bytes = [0x82, 0x01, 0xa1, b's', 0xcc, 0x01, 0xa1, b'u'];
    let m = dec(&bytes).unwrap().as_map().unwrap().clone();
    assert_eq!(m.get(&Value::Int(1)), Some(&Value::from("s")));
    assert_eq!(m.get(&Value::UInt(1)), Some(&Value::from("u")));

    // 0.0 and -0.0 are the same key.
    let zeros = [0x82, 0xcb, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0xcb, 0x80, 0, 0, 0, 0, 0, 0, 0, 0x02];
    assert!(matches!(dec(&zeros), Err(CodecError::DuplicateKey)));

    // NaN is never equal to itself, so never a duplicate.
    let nans = [0x82, 0xca, 0x7f, 0xc0, 0, 0, 0x01, 0xca, 0x7f, 0xc0, 0, 0, 0x02];
    assert_eq!(dec(&nans).unwrap().as_map().unwrap().len(), 2);
}

#[test]
fn test_decode_unsupported_keys() {
    // {[1]: "x", "k": "v"}
    let bytes = [0x82, 0x91, 0x01, 0xa1, b'x', 0xa1, b'k', 0xa1, b'v'];
    assert!(matches!(dec(&bytes), Err(CodecError::UnsupportedKeyType)));

    let opts = strict().with_unsupported_keys(UnsupportedKeyPolicy::Drop);
    let v = decode_slice(&bytes, &opts).unwrap();
    let m = v.as_map().unwrap();
    // The dropped entry's value was still consumed.
    assert_eq!(m.len(), 1);
    assert_eq!(m.get_str("k"), Some(&Value::from("v")));

    // Binary, map and unresolved extension keys are ineligible too.
    let ineligible: [&[u8]; 3] = [&[0xc4, 0x00], &[0x80], &[0xd4, 0x05, 0x00]];
    for key in ineligible {
        let mut bytes = vec![0x81];
        bytes.extend_from_slice(key);
        bytes.push(0xc0);
        assert!(matches!(dec(&bytes), Err(CodecError::UnsupportedKeyType)), "key {:02x?}", key);
    }
}

#[test]
fn test_decode_lenient_options() {
    let bytes = [0x83, 0x90, 0x01, 0x01, 0x02, 0x01, 0x03];
    let v = decode_slice(&bytes, &DecodeOptions::lenient()).unwrap();
    assert_eq!(v.as_map().unwrap().get(&Value::Int(1)), Some(&Value::Int(2)));
}

#[test]
fn test_decode_unknown_extension() {
    let bytes = [0xd5, 0x07, 0xab, 0xcd];
    assert_eq!(dec(&bytes).unwrap(), Value::Ext(Extension::new(7, vec![0xab, 0xcd])));

    let opts = strict().with_unknown_extensions(UnknownExtensionPolicy::Error);
    assert!(matches!(
        decode_slice(&bytes, &opts),
        Err(CodecError::UnsupportedExtensionType(7))
    ));

    // Reserved types with no standard decoder pass through too.
    assert_eq!(
        dec(&[0xc7, 0x00, 0xfe]).unwrap(),
        Value::Ext(Extension::new(-2, vec![]))
    );
}

#[test]
fn test_decode_application_extension() {
    let opts = strict().with_extension(42, |data: &[u8]| {
        let n = u64::from_be_bytes(data.try_into().map_err(CodecError::custom)?);
        Ok((Value::host(std::time::Duration::from_nanos(n)), true))
    });
    let bytes = [0xd7, 0x2a, 0, 0, 0, 0, 0, 0, 0, 0x7b];
    let v = decode_slice(&bytes, &opts).unwrap();
    assert_eq!(v.as_host::<std::time::Duration>(), Some(&std::time::Duration::from_nanos(123)));

    // A resolved extension that reports itself eligible can be a key.
    let mut keyed = vec![0x81];
    keyed.extend_from_slice(&bytes);
    keyed.push(0xc0);
    assert!(decode_slice(&keyed, &opts).is_ok());

    // Payload errors from the resolver abort the decode.
    let short = [0xd6, 0x2a, 0, 0, 0, 0];
    assert!(matches!(decode_slice(&short, &opts), Err(CodecError::Custom(_))));
}

#[test]
fn test_decode_negative_application_extension_is_ignored() {
    let opts = strict().with_extension(-1, |_: &[u8]| Ok((Value::Nil, true)));
    let v = decode_slice(&[0xd6, 0xff, 0, 0, 0, 1], &opts).unwrap();
    assert_eq!(v.as_host::<Timestamp>(), Some(&Timestamp::new(1, 0).unwrap()));
}

#[test]
fn test_decode_timestamps() {
    let four = [0xd6, 0xff, 0x5f, 0x5e, 0x10, 0x00];
    assert_eq!(dec(&four).unwrap().as_host::<Timestamp>(), Some(&Timestamp::new(0x5f5e_1000, 0).unwrap()));

    // nanos = 1, seconds = 2 packed as (1 << 34) | 2
    let eight = [0xd7, 0xff, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x02];
    assert_eq!(dec(&eight).unwrap().as_host::<Timestamp>(), Some(&Timestamp::new(2, 1).unwrap()));

    let mut twelve = vec![0xc7, 0x0c, 0xff, 0x00, 0x00, 0x00, 0x05];
    twelve.extend_from_slice(&(-3i64).to_be_bytes());
    assert_eq!(dec(&twelve).unwrap().as_host::<Timestamp>(), Some(&Timestamp::new(-3, 5).unwrap()));

    // Timestamps are key-eligible.
    let mut keyed = vec![0x81];
    keyed.extend_from_slice(&four);
    keyed.push(0x01);
    assert!(dec(&keyed).is_ok());

    assert!(matches!(dec(&[0xd5, 0xff, 0, 0]), Err(CodecError::InvalidTimestamp)));
    let bad_nanos = [0xc7, 0x0c, 0xff, 0x3b, 0x9a, 0xca, 0x00, 0, 0, 0, 0, 0, 0, 0, 0];
    assert!(matches!(dec(&bad_nanos), Err(CodecError::InvalidTimestamp)));

    let raw = decode_slice(&four, &strict().without_standard_extensions()).unwrap();
    assert_eq!(raw, Value::Ext(Extension::new(-1, vec![0x5f, 0x5e, 0x10, 0x00])));
}

#[test]
fn test_decode_many_timestamp_keys() {
    fn timestamp_map(n: u32, dup: bool) -> Vec<u8> {
        let mut bytes = vec![0xdf];
        bytes.extend_from_slice(&n.to_be_bytes());
        for i in 0..n {
            let secs = if dup && i == n - 1 { 0 } else { i };
            bytes.extend_from_slice(&[0xd6, 0xff]);
            bytes.extend_from_slice(&secs.to_be_bytes());
            bytes.push(0xc0);
        }
        bytes
    }

    let start = std::time::Instant::now();
    let m = dec(&timestamp_map(50_000, false)).unwrap();
    assert_eq!(m.as_map().unwrap().len(), 50_000);
    assert!(start.elapsed() < std::time::Duration::from_secs(10), "took {:?}", start.elapsed());

    assert!(matches!(dec(&timestamp_map(1_000, true)), Err(CodecError::DuplicateKey)));
}

#[test]
fn test_decode_transformers_run_on_every_value() {
    let opts = strict().with_transformer(|v, eligible| match v {
        Value::Int(i) => Ok((Value::Int(i * 10), eligible)),
        other => Ok((other, eligible)),
    });
    let v = decode_slice(&[0x92, 0x01, 0x91, 0x02], &opts).unwrap();
    assert_eq!(
        v,
        Value::Array(vec![Value::Int(10), Value::Array(vec![Value::Int(20)])])
    );
}

#[test]
fn test_decode_slice_reports_extent() {
    let bytes = [0x92, 0x01, 0x02, 0xc0, 0xc0];
    let (n, result) = decode_slice_with_extent(&bytes, &strict());
    assert_eq!(n, 3);
    assert!(result.is_ok());

    let (n, result) = decode_slice_with_extent(&[0x92, 0x01, 0xc1], &strict());
    assert_eq!(n, 3);
    assert!(matches!(result, Err(CodecError::InvalidFormat)));
}

#[test]
fn test_decoder_reads_consecutive_values() {
    let bytes = [0x01, 0xa1, b'x', 0xc0];
    let mut reader = SliceReader::new(&bytes);
    let opts = strict();
    let mut d = Decoder::new(&mut reader, &opts);
    assert_eq!(d.decode().unwrap(), Value::Int(1));
    assert_eq!(d.decode_with_key_eligibility().unwrap(), (Value::from("x"), true));
    assert_eq!(d.decode().unwrap(), Value::Nil);
    assert!(matches!(d.decode(), Err(CodecError::Eof)));
    assert_eq!(reader.position(), 4);
}

#[test]
fn test_decode_from_file_stream() {
    let mut file = tempfile::tempfile().expect("tempfile");
    // {"n": [1, 2, 3]} followed by a second value.
    file.write_all(&[0x81, 0xa1, b'n', 0x93, 0x01, 0x02, 0x03, 0xc3]).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let opts = strict();
    let mut d = Decoder::new(StreamReader::new(file), &opts);
    let v = d.decode().expect("decode");
    assert_eq!(
        v.as_map().and_then(|m| m.get_str("n")),
        Some(&Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
    );
    assert_eq!(d.decode().unwrap(), Value::Bool(true));
    assert!(matches!(d.decode(), Err(CodecError::Eof)));

    // The file handed back can be rewound and read again.
    let mut file = d.into_inner().into_inner();
    file.seek(SeekFrom::Start(7)).unwrap();
    let mut d = Decoder::new(StreamReader::new(file), &opts);
    assert_eq!(d.decode().unwrap(), Value::Bool(true));
}
