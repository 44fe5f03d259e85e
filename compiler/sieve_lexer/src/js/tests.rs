use pretty_assertions::assert_eq;
use sieve_diagnostic::{MessageType, ParseError};
use sieve_lexer_core::{BufferedCharProducer, TokenStream};
use sieve_position::InputSource;

use super::{JsLexer, JsTokenType};

fn lexer(src: &str) -> JsLexer {
    lexer_with(src, false)
}

fn lexer_with(src: &str, quasiliteral: bool) -> JsLexer {
    let p = BufferedCharProducer::from_source(src, InputSource::new("file:///t.js"));
    JsLexer::with_options(Box::new(p), quasiliteral)
}

fn assert_next(lexer: &mut JsLexer, kind: JsTokenType, text: &str) {
    match lexer.next() {
        Ok(Some(t)) => {
            assert_eq!(t.kind, kind, "for token [{}]", t.text);
            assert_eq!(t.text, text);
        }
        Ok(None) => panic!("expected {kind:?} [{text}], got end of input"),
        Err(e) => panic!("expected {kind:?} [{text}], got error: {e}"),
    }
}

fn assert_empty(lexer: &mut JsLexer) {
    match lexer.next() {
        Ok(None) => {}
        Ok(Some(t)) => panic!("expected end of input, got [{}]", t.text),
        Err(e) => panic!("expected end of input, got error: {e}"),
    }
}

fn assert_error(lexer: &mut JsLexer, message_type: MessageType) {
    loop {
        match lexer.next() {
            Ok(Some(_)) => {}
            Ok(None) => panic!("expected {message_type:?}, stream ended cleanly"),
            Err(ParseError(m)) => {
                assert_eq!(m.message_type(), message_type);
                return;
            }
        }
    }
}

// === Basic splitting ===

#[test]
fn simple_expression() {
    let mut l = lexer("while (foo) { 1; }");
    assert_next(&mut l, JsTokenType::Keyword, "while");
    assert_next(&mut l, JsTokenType::Punctuation, "(");
    assert_next(&mut l, JsTokenType::Word, "foo");
    assert_next(&mut l, JsTokenType::Punctuation, ")");
    assert_next(&mut l, JsTokenType::Punctuation, "{");
    assert_next(&mut l, JsTokenType::Integer, "1");
    assert_next(&mut l, JsTokenType::Punctuation, ";");
    assert_next(&mut l, JsTokenType::Punctuation, "}");
    assert_empty(&mut l);
}

#[test]
fn strings_and_comments() {
    let mut l = lexer("'a b' /* c */ \"d\" // e");
    assert_next(&mut l, JsTokenType::String, "'a b'");
    assert_next(&mut l, JsTokenType::Comment, "/* c */");
    assert_next(&mut l, JsTokenType::String, "\"d\"");
    assert_next(&mut l, JsTokenType::Comment, "// e");
    assert_empty(&mut l);
}

#[test]
fn token_positions_cover_the_source() {
    let mut l = lexer("a  bb\nc");
    let a = match l.next() {
        Ok(Some(t)) => t,
        other => panic!("{other:?}"),
    };
    assert_eq!(a.pos.debug_string(), "t.js:1+1@1 - 2@2");
    let bb = match l.next() {
        Ok(Some(t)) => t,
        other => panic!("{other:?}"),
    };
    assert_eq!(bb.pos.debug_string(), "t.js:1+4@4 - 6@6");
    let c = match l.next() {
        Ok(Some(t)) => t,
        other => panic!("{other:?}"),
    };
    assert_eq!(c.pos.debug_string(), "t.js:2+1@7 - 2@8");
}

// === Regex vs division ===

#[test]
fn regex_literals() {
    let mut l = lexer("foo.replace(/[A-Z]/g, '#')");
    assert_next(&mut l, JsTokenType::Word, "foo");
    assert_next(&mut l, JsTokenType::Punctuation, ".");
    assert_next(&mut l, JsTokenType::Word, "replace");
    assert_next(&mut l, JsTokenType::Punctuation, "(");
    assert_next(&mut l, JsTokenType::Regexp, "/[A-Z]/g");
    assert_next(&mut l, JsTokenType::Punctuation, ",");
    assert_next(&mut l, JsTokenType::String, "'#'");
    assert_next(&mut l, JsTokenType::Punctuation, ")");
    assert_empty(&mut l);
}

#[test]
fn division_after_word_regex_after_keyword() {
    let mut l = lexer("min / max /*/**/");
    assert_next(&mut l, JsTokenType::Word, "min");
    assert_next(&mut l, JsTokenType::Punctuation, "/");
    assert_next(&mut l, JsTokenType::Word, "max");
    assert_next(&mut l, JsTokenType::Comment, "/*/**/");
    assert_empty(&mut l);

    let mut l = lexer("in / max /*/**/");
    assert_next(&mut l, JsTokenType::Keyword, "in");
    assert_next(&mut l, JsTokenType::Regexp, "/ max /");
    assert_next(&mut l, JsTokenType::Punctuation, "*");
    assert_next(&mut l, JsTokenType::Comment, "/**/");
    assert_empty(&mut l);
}

#[test]
fn regex_after_void() {
    let mut l = lexer("void /./");
    assert_next(&mut l, JsTokenType::Keyword, "void");
    assert_next(&mut l, JsTokenType::Regexp, "/./");
    assert_empty(&mut l);
}

#[test]
fn division_after_postincrement() {
    let mut l = lexer("x++/y/m");
    assert_next(&mut l, JsTokenType::Word, "x");
    assert_next(&mut l, JsTokenType::Punctuation, "++");
    assert_next(&mut l, JsTokenType::Punctuation, "/");
    assert_next(&mut l, JsTokenType::Word, "y");
    assert_next(&mut l, JsTokenType::Punctuation, "/");
    assert_next(&mut l, JsTokenType::Word, "m");
    assert_empty(&mut l);
}

#[test]
fn regex_at_start_of_input() {
    let mut l = lexer("/x/g.test(s)");
    assert_next(&mut l, JsTokenType::Regexp, "/x/g");
    assert_next(&mut l, JsTokenType::Punctuation, ".");
    assert_next(&mut l, JsTokenType::Word, "test");
    assert_next(&mut l, JsTokenType::Punctuation, "(");
    assert_next(&mut l, JsTokenType::Word, "s");
    assert_next(&mut l, JsTokenType::Punctuation, ")");
    assert_empty(&mut l);
}

#[test]
fn number_ending_in_dot_is_not_a_regex_preceder() {
    let mut l = lexer("0../x/");
    assert_next(&mut l, JsTokenType::Float, "0.");
    assert_next(&mut l, JsTokenType::Punctuation, ".");
    // After ".", a regex may follow.
    assert_next(&mut l, JsTokenType::Regexp, "/x/");
    assert_empty(&mut l);
}

// === Punctuation runs ===

#[test]
fn dots_split_greedily() {
    let mut l = lexer("a == = function () {..} ... .. . .... foo");
    assert_next(&mut l, JsTokenType::Word, "a");
    assert_next(&mut l, JsTokenType::Punctuation, "==");
    assert_next(&mut l, JsTokenType::Punctuation, "=");
    assert_next(&mut l, JsTokenType::Keyword, "function");
    assert_next(&mut l, JsTokenType::Punctuation, "(");
    assert_next(&mut l, JsTokenType::Punctuation, ")");
    assert_next(&mut l, JsTokenType::Punctuation, "{");
    assert_next(&mut l, JsTokenType::Punctuation, "..");
    assert_next(&mut l, JsTokenType::Punctuation, "}");
    assert_next(&mut l, JsTokenType::Punctuation, "...");
    assert_next(&mut l, JsTokenType::Punctuation, "..");
    assert_next(&mut l, JsTokenType::Punctuation, ".");
    assert_next(&mut l, JsTokenType::Punctuation, "...");
    assert_next(&mut l, JsTokenType::Punctuation, ".");
    assert_next(&mut l, JsTokenType::Word, "foo");
    assert_empty(&mut l);
}

#[test]
fn emphatic_decrement() {
    let mut l = lexer("i---j");
    assert_next(&mut l, JsTokenType::Word, "i");
    assert_next(&mut l, JsTokenType::Punctuation, "--");
    assert_next(&mut l, JsTokenType::Punctuation, "-");
    assert_next(&mut l, JsTokenType::Word, "j");
    assert_empty(&mut l);
}

#[test]
fn ellipsis_then_number() {
    let mut l = lexer("...0x01");
    assert_next(&mut l, JsTokenType::Punctuation, "...");
    assert_next(&mut l, JsTokenType::Integer, "0x01");
    assert_empty(&mut l);
}

// === Numbers ===

#[test]
fn number_dot_word() {
    // 0..toString() evaluates to "0".
    let mut l = lexer("0..toString()");
    assert_next(&mut l, JsTokenType::Float, "0.");
    assert_next(&mut l, JsTokenType::Punctuation, ".");
    assert_next(&mut l, JsTokenType::Word, "toString");
    assert_next(&mut l, JsTokenType::Punctuation, "(");
    assert_next(&mut l, JsTokenType::Punctuation, ")");
    assert_empty(&mut l);
}

#[test]
fn exponent_signs_rejoin() {
    let mut l = lexer("1e+5");
    assert_next(&mut l, JsTokenType::Float, "1e+5");
    assert_empty(&mut l);

    let mut l = lexer("x = 1.25E-7;");
    assert_next(&mut l, JsTokenType::Word, "x");
    assert_next(&mut l, JsTokenType::Punctuation, "=");
    assert_next(&mut l, JsTokenType::Float, "1.25E-7");
    assert_next(&mut l, JsTokenType::Punctuation, ";");
    assert_empty(&mut l);
}

#[test]
fn exponent_join_requires_adjacency() {
    // A gap between the sign and the digits leaves the exponent dangling.
    let mut l = lexer("1e+ 5");
    assert_error(&mut l, MessageType::MalformedNumber);
}

#[test]
fn dangling_exponent_at_eof_is_malformed() {
    let mut l = lexer("1e");
    assert_error(&mut l, MessageType::MalformedNumber);
}

#[test]
fn bom_is_whitespace() {
    let mut l = lexer("\u{feff}var foo");
    assert_next(&mut l, JsTokenType::Keyword, "var");
    assert_next(&mut l, JsTokenType::Word, "foo");
    assert_empty(&mut l);

    let mut l = lexer("1.\u{feff}3");
    assert_next(&mut l, JsTokenType::Float, "1.");
    assert_next(&mut l, JsTokenType::Integer, "3");
    assert_empty(&mut l);

    let mut l = lexer("'\u{feff}'");
    assert_next(&mut l, JsTokenType::String, "'\u{feff}'");
    assert_empty(&mut l);
}

// === Line continuations ===

#[test]
fn continuation_inside_string_disappears() {
    let mut l = lexer("'ab\\\ncd'");
    assert_next(&mut l, JsTokenType::String, "'abcd'");
    assert_empty(&mut l);
}

#[test]
fn string_position_still_spans_the_continuation() {
    let mut l = lexer("'ab\\\ncd' x");
    let s = match l.next() {
        Ok(Some(t)) => t,
        other => panic!("{other:?}"),
    };
    assert_eq!(s.text, "'abcd'");
    assert_eq!(s.pos.start_line(), 1);
    assert_eq!(s.pos.end_line(), 2);
    assert_next(&mut l, JsTokenType::Word, "x");
    assert_empty(&mut l);
}

// === Quasiliteral mode ===

#[test]
fn quasi_words() {
    let mut l = lexer_with("@foo * 1;", true);
    assert_next(&mut l, JsTokenType::Word, "@foo");
    assert_next(&mut l, JsTokenType::Punctuation, "*");
    assert_next(&mut l, JsTokenType::Integer, "1");
    assert_next(&mut l, JsTokenType::Punctuation, ";");
    assert_empty(&mut l);
}

#[test]
fn quasi_suffixes() {
    let mut l = lexer_with("@foo* * 1;", true);
    assert_next(&mut l, JsTokenType::Word, "@foo*");
    assert_next(&mut l, JsTokenType::Punctuation, "*");
    assert_next(&mut l, JsTokenType::Integer, "1");
    assert_next(&mut l, JsTokenType::Punctuation, ";");
    assert_empty(&mut l);

    let mut l = lexer_with("(@foo+)", true);
    assert_next(&mut l, JsTokenType::Punctuation, "(");
    assert_next(&mut l, JsTokenType::Word, "@foo+");
    assert_next(&mut l, JsTokenType::Punctuation, ")");
    assert_empty(&mut l);
}

#[test]
fn at_word_has_no_suffix_outside_quasi_mode() {
    // '@' is not punctuation, so the run lexes as one word, but the quasi
    // suffix is not split off.
    let mut l = lexer_with("@foo* 1", false);
    assert_next(&mut l, JsTokenType::Word, "@foo");
    assert_next(&mut l, JsTokenType::Punctuation, "*");
    assert_next(&mut l, JsTokenType::Integer, "1");
    assert_empty(&mut l);
}

// === Failure modes ===

#[test]
fn unterminated_string() {
    assert_error(&mut lexer("'abc"), MessageType::UnterminatedStringToken);
}

#[test]
fn unterminated_comment() {
    assert_error(&mut lexer("/* abc"), MessageType::UnterminatedCommentToken);
}

#[test]
fn unterminated_regex() {
    assert_error(&mut lexer("= /abc\n/"), MessageType::UnterminatedStringToken);
}
