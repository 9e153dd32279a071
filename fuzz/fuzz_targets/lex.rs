#![no_main]

use libfuzzer_sys::fuzz_target;

// The first byte picks the delivery size, the rest is the request
// stream. Errors are fine, stalls and out-of-buffer spans are not.
fuzz_target!(|data: &[u8]| {
    let Some((&first, stream)) = data.split_first() else {
        return;
    };
    let chunk = (first as usize).max(1);

    let mut lexer = hlex::Lexer::new();
    lexer.set_header_limit(64 * 1024);

    let mut consumed = 0;
    let mut fetched = chunk.min(stream.len());
    let mut steps = 0usize;

    loop {
        steps += 1;
        assert!(steps <= 8 * stream.len() + 64, "lexer stalled");

        let buf = &stream[consumed..fetched];
        let token = match lexer.step(buf) {
            Ok(t) => t,
            Err(_) => return,
        };

        assert!(token.input_used() <= buf.len());
        assert!(token.data().len() <= buf.len());

        consumed += token.input_used();

        match token.kind() {
            hlex::Kind::Again => {
                if fetched == stream.len() {
                    return;
                }
                fetched = fetched.saturating_add(chunk).min(stream.len());
            }
            hlex::Kind::Eof => return,
            _ => {}
        }
    }
});
