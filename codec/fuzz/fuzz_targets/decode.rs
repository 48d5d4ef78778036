#![no_main]

use bytes::Bytes;
use compactbin_codec::{
    load, load_bytes, try_measure, validate, Encode, Field, Limits, Measure, ValidateMode, Value,
};
use libfuzzer_sys::fuzz_target;

fn visit(field: &Field) {
    let _ = field.name();
    let _ = field.value();
    let _ = field.as_i64();
    let _ = field.as_f32();
    let _ = field.as_date_time();
    let _ = field.to_json();
    for child in field.children() {
        visit(&child);
    }
}

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_size: 1 << 20,
        max_depth: 32,
    };

    // Measuring a prefix never requires fewer bytes than the prefix holds
    if let Ok(Measure::Incomplete { required }) = try_measure(data, None) {
        assert!(required > data.len());
    }

    let mut reader = data;
    let streamed = load(&mut reader, &limits);
    let mut buffer = Bytes::copy_from_slice(data);
    let buffered = load_bytes(&mut buffer, &limits);
    match (&streamed, &buffered) {
        (Ok(streamed), Ok(buffered)) => {
            assert_eq!(streamed, buffered);
            assert_eq!(reader.len(), buffer.len());
        }
        (Ok(_), Err(err)) => panic!("buffered load failed after streamed load succeeded: {err}"),
        _ => {}
    }

    let Ok(field) = streamed else {
        return;
    };
    validate(field.as_bytes(), None, ValidateMode::all(), &limits)
        .expect("loaded field must validate");
    visit(&field);

    // Re-encoding a valid field through the value tree yields a valid field
    let rewritten = Value::from(&field).to_field();
    validate(&rewritten.encode(), None, ValidateMode::all(), &Limits::default())
        .expect("rewritten field must validate");
});
