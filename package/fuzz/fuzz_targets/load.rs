#![no_main]

use bytes::Bytes;
use compactbin_codec::{Encode, Limits};
use compactbin_cryptography::Blake3;
use compactbin_package::{Config, Package};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let cfg = Config {
        limits: Limits {
            max_size: 1 << 20,
            max_depth: 32,
        },
        parallel_verify: data.first().is_some_and(|byte| byte & 1 == 1),
    };

    let mut reader = data;
    let streamed = Package::<Blake3>::load(&mut reader, &cfg);
    let Ok(package) = streamed else {
        return;
    };

    // A verified package re-encodes to a stream that loads back to the same package
    let encoded = package.encode().freeze();
    let reloaded = Package::<Blake3>::decode(encoded, &cfg).expect("re-encoded package must load");
    assert_eq!(reloaded, package);

    // The stream is consumed up to and including the terminator
    let consumed = data.len() - reader.len();
    let buffered = Package::<Blake3>::decode(Bytes::copy_from_slice(&data[..consumed]), &cfg)
        .expect("consumed prefix must decode");
    assert_eq!(buffered, package);
});
