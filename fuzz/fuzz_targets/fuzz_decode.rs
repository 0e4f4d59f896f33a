#![no_main]

use libfuzzer_sys::fuzz_target;
use saros::catalog::decode::{
    decode_lunar_info, decode_solar_info, encode_lunar_info, encode_solar_info,
};

fuzz_target!(|record: [u8; 10]| {
    // Every 10-byte record decodes, and packs back to the same bytes
    let solar = decode_solar_info(&record);
    assert_eq!(encode_solar_info(&solar), record);
    let _ = solar.eclipse_type();

    let lunar = decode_lunar_info(&record);
    assert_eq!(encode_lunar_info(&lunar), record);
    let _ = lunar.eclipse_type();
});
