#![no_main]

use libfuzzer_sys::fuzz_target;
use rewire_syntax::Tokens;

mod utils;

fuzz_target!(|data: &[u8]| {
    let Some(text) = utils::truncate_utf8(data) else {
        return;
    };

    for input in [text.to_owned(), utils::as_php(text)] {
        let tokens = Tokens::from_code(&input);
        assert_eq!(tokens.generate_code(), input, "lexer must be lossless");
        assert!(tokens.iter().all(|token| !token.text.is_empty()));
    }
});
