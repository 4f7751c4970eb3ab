#![no_main]
use libfuzzer_sys::fuzz_target;

use exiflow::channel::{ChannelReader, Packing};

fuzz_target!(|data: &[u8]| {
    let mut reader = ChannelReader::new(data, Packing::BitPacked);
    let _ = exiflow::options_codec::read(&mut reader);
});
