#![no_main]
use libfuzzer_sys::fuzz_target;
use x86_codec::{copy_and_re_relativize, decode, encode_to_vec, fast, Context, Mode};

fuzz_target!(|data: &[u8]| {
    for mode in [Mode::X86, Mode::X64] {
        let ctx = Context::new(mode);

        // Decoders must never panic, only return Ok/Err.
        let full = decode(data, ctx, 0x40_0000);
        let _ = fast::decode_cti(data, ctx, 0x40_0000);

        let Ok((mut insn, len)) = full else { continue };
        assert_eq!(fast::length(data, ctx), Ok(len));

        // Cached bytes re-encode verbatim at the original address.
        let copied = encode_to_vec(&insn, ctx, 0x40_0000).expect("copy of decoded bytes");
        assert_eq!(&copied[..], &data[..len]);

        // Re-encoding from operands may fail or pick another form, but
        // must not panic.
        insn.clear_raw();
        let _ = encode_to_vec(&insn, ctx, 0x40_0000);

        let mut out = [0u8; 16];
        let _ = copy_and_re_relativize(data, ctx, 0x40_0000, 0x7fff_0000, &mut out);
    }
});
