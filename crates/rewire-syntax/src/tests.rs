use pretty_assertions::assert_eq;

use crate::{lex, Token, TokenKind, Tokens};

fn dump_tokens(input: &str) -> Vec<(TokenKind, String)> {
    lex(input).into_iter().map(|t| (t.kind, t.text)).collect()
}

fn dump_non_trivia(input: &str) -> Vec<(TokenKind, String)> {
    lex(input)
        .into_iter()
        .filter(|t| !t.is_trivia())
        .map(|t| (t.kind, t.text))
        .collect()
}

fn assert_lossless(input: &str) {
    assert_eq!(Tokens::from_code(input).generate_code(), input);
}

#[test]
fn lexer_is_lossless_on_representative_file() {
    let input = r#"<html>
<?php
namespace App;

use Google\Cloud\Dlp\V2\DlpServiceClient;
use function strlen;

/** Doc block */
#[Attr(1)]
final class Foo {
    public function run(?DlpServiceClient $dlp, array $opts = []): void {
        // line comment
        $a = "hello {$opts['x']} and $name";
        $b = 'it\'s';
        $c = <<<EOT
        body $x
        EOT;
        $d = <<<'RAW'
raw text
RAW;
        $e = 0x1F + 1_000 + 1.5e3 + .25;
        $f = $dlp?->call() ?? $a <=> $b;
        $g = `ls -la`;
    }
}
?>
<p>tail</p>
<?= $x ?>
"#;
    assert_lossless(input);
}

#[test]
fn lexer_is_lossless_on_malformed_input() {
    for input in [
        "<?php $a = 'unterminated",
        "<?php /* never closed",
        "<?php $s = \"{$a['b'\";",
        "<?php $h = <<<EOT\nno end",
        "<?php \\",
        "<?php $x = \"trailing backslash\\",
        "no php at all",
        "<?",
        "<?php",
        "<?php ?>",
    ] {
        assert_lossless(input);
    }
}

#[test]
fn open_tag_excludes_trailing_newline() {
    assert_eq!(
        dump_tokens("<?php\n$a;"),
        vec![
            (TokenKind::OpenTag, "<?php".to_string()),
            (TokenKind::Whitespace, "\n".to_string()),
            (TokenKind::Variable, "$a".to_string()),
            (TokenKind::Semicolon, ";".to_string()),
        ]
    );
}

#[test]
fn inline_html_and_echo_tags() {
    assert_eq!(
        dump_tokens("<b><?= $x ?></b>"),
        vec![
            (TokenKind::InlineHtml, "<b>".to_string()),
            (TokenKind::OpenTagWithEcho, "<?=".to_string()),
            (TokenKind::Whitespace, " ".to_string()),
            (TokenKind::Variable, "$x".to_string()),
            (TokenKind::Whitespace, " ".to_string()),
            (TokenKind::CloseTag, "?>".to_string()),
            (TokenKind::InlineHtml, "</b>".to_string()),
        ]
    );
}

#[test]
fn keywords_after_access_operators_are_identifiers() {
    assert_eq!(
        dump_non_trivia("<?php $c->list(); Foo::new(); $c?->class; new Foo;"),
        vec![
            (TokenKind::OpenTag, "<?php".to_string()),
            (TokenKind::Variable, "$c".to_string()),
            (TokenKind::ObjectOperator, "->".to_string()),
            (TokenKind::Ident, "list".to_string()),
            (TokenKind::OpenParen, "(".to_string()),
            (TokenKind::CloseParen, ")".to_string()),
            (TokenKind::Semicolon, ";".to_string()),
            (TokenKind::Ident, "Foo".to_string()),
            (TokenKind::DoubleColon, "::".to_string()),
            (TokenKind::Ident, "new".to_string()),
            (TokenKind::OpenParen, "(".to_string()),
            (TokenKind::CloseParen, ")".to_string()),
            (TokenKind::Semicolon, ";".to_string()),
            (TokenKind::Variable, "$c".to_string()),
            (TokenKind::NullsafeObjectOperator, "?->".to_string()),
            (TokenKind::Ident, "class".to_string()),
            (TokenKind::Semicolon, ";".to_string()),
            (TokenKind::Keyword, "new".to_string()),
            (TokenKind::Ident, "Foo".to_string()),
            (TokenKind::Semicolon, ";".to_string()),
        ]
    );
}

#[test]
fn qualified_names_are_single_tokens() {
    assert_eq!(
        dump_non_trivia("<?php use Google\\Ads\\FooClient; \\Bar\\Baz::x();"),
        vec![
            (TokenKind::OpenTag, "<?php".to_string()),
            (TokenKind::Keyword, "use".to_string()),
            (TokenKind::QualifiedName, "Google\\Ads\\FooClient".to_string()),
            (TokenKind::Semicolon, ";".to_string()),
            (TokenKind::QualifiedName, "\\Bar\\Baz".to_string()),
            (TokenKind::DoubleColon, "::".to_string()),
            (TokenKind::Ident, "x".to_string()),
            (TokenKind::OpenParen, "(".to_string()),
            (TokenKind::CloseParen, ")".to_string()),
            (TokenKind::Semicolon, ";".to_string()),
        ]
    );
}

#[test]
fn strings_classify_interpolation() {
    let kinds: Vec<TokenKind> = dump_non_trivia(
        r#"<?php 'a$b'; "plain"; "with $var"; "with {$a->b()}"; "esc \$x"; b'bin';"#,
    )
    .into_iter()
    .filter(|(kind, _)| kind.is_string_literal())
    .map(|(kind, _)| kind)
    .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::ConstantString,
            TokenKind::ConstantString,
            TokenKind::InterpolatedString,
            TokenKind::InterpolatedString,
            TokenKind::ConstantString,
            TokenKind::ConstantString,
        ]
    );
}

#[test]
fn interpolated_string_with_nested_braces_is_one_token() {
    let tokens = dump_non_trivia(r#"<?php f("a {$x['k,)']} b", 2);"#);
    assert_eq!(
        tokens[3],
        (
            TokenKind::InterpolatedString,
            r#""a {$x['k,)']} b""#.to_string()
        )
    );
    assert_eq!(tokens[4], (TokenKind::Comma, ",".to_string()));
}

#[test]
fn heredoc_is_one_token() {
    let tokens = dump_non_trivia("<?php f(<<<EOT\n  a, b)\n  EOT, 3);");
    assert_eq!(
        tokens[3],
        (TokenKind::Heredoc, "<<<EOT\n  a, b)\n  EOT".to_string())
    );
    assert_eq!(tokens[4], (TokenKind::Comma, ",".to_string()));
}

#[test]
fn comments_and_attributes() {
    assert_eq!(
        dump_tokens("<?php # hash\n#[A] /** doc */ /* c */"),
        vec![
            (TokenKind::OpenTag, "<?php".to_string()),
            (TokenKind::Whitespace, " ".to_string()),
            (TokenKind::Comment, "# hash".to_string()),
            (TokenKind::Whitespace, "\n".to_string()),
            (TokenKind::OpenAttribute, "#[".to_string()),
            (TokenKind::Ident, "A".to_string()),
            (TokenKind::CloseBracket, "]".to_string()),
            (TokenKind::Whitespace, " ".to_string()),
            (TokenKind::DocComment, "/** doc */".to_string()),
            (TokenKind::Whitespace, " ".to_string()),
            (TokenKind::Comment, "/* c */".to_string()),
        ]
    );
}

#[test]
fn line_comment_stops_at_close_tag() {
    let tokens = dump_tokens("<?php // note ?>html");
    assert_eq!(tokens[2], (TokenKind::Comment, "// note ".to_string()));
    assert_eq!(tokens[3], (TokenKind::CloseTag, "?>".to_string()));
    assert_eq!(tokens[4], (TokenKind::InlineHtml, "html".to_string()));
}

#[test]
fn meaningful_navigation_skips_trivia() {
    let tokens = Tokens::from_code("<?php $a /* c */ -> b ( ) ;");
    let var = tokens.find_kind(TokenKind::Variable, 0, tokens.len()).unwrap();
    let arrow = tokens.next_meaningful(var).unwrap();
    assert_eq!(tokens[arrow].kind, TokenKind::ObjectOperator);
    assert_eq!(tokens.prev_meaningful(arrow), Some(var));
    assert_eq!(tokens.prev_meaningful(0), None);
    let last = tokens.len() - 1;
    assert_eq!(tokens.next_meaningful(last), None);
}

#[test]
fn block_matching_across_bracket_kinds() {
    let tokens = Tokens::from_code("<?php f([1, (2)], {$x}, #[A]);");
    let open = tokens.find_kind(TokenKind::OpenParen, 0, tokens.len()).unwrap();
    let close = tokens.find_block_end(open).unwrap();
    assert_eq!(close, tokens.len() - 2);
    assert_eq!(tokens.find_block_start(close), Some(open));
    let bracket = tokens.find_kind(TokenKind::OpenBracket, 0, tokens.len()).unwrap();
    let bracket_end = tokens.find_block_end(bracket).unwrap();
    assert_eq!(tokens[bracket_end].kind, TokenKind::CloseBracket);
    assert_eq!(tokens.find_block_end(0), None);
}

#[test]
fn unterminated_block_has_no_end() {
    let tokens = Tokens::from_code("<?php f(1, [2");
    let open = tokens.find_kind(TokenKind::OpenParen, 0, tokens.len()).unwrap();
    assert_eq!(tokens.find_block_end(open), None);
}

#[test]
fn find_kind_is_bounded() {
    let tokens = Tokens::from_code("<?php $a; $b;");
    let first = tokens.find_kind(TokenKind::Semicolon, 0, tokens.len()).unwrap();
    assert_eq!(tokens.find_kind(TokenKind::Semicolon, 0, first), None);
    assert!(tokens.find_kind(TokenKind::Semicolon, first + 1, tokens.len()).is_some());
}

#[test]
fn insert_shifts_following_indices() {
    let mut tokens = Tokens::from_code("<?php $a;");
    let var = tokens.find_kind(TokenKind::Variable, 0, tokens.len()).unwrap();
    tokens.insert_at(
        var,
        [Token::variable("$b"), Token::new(TokenKind::Semicolon, ";"), Token::whitespace(" ")],
    );
    assert_eq!(tokens.generate_code(), "<?php $b; $a;");
    assert_eq!(tokens[var + 3].text, "$a");
}

#[test]
fn override_range_replaces_and_shifts() {
    let mut tokens = Tokens::from_code("<?php f($a, $b);");
    let open = tokens.find_kind(TokenKind::OpenParen, 0, tokens.len()).unwrap();
    let close = tokens.find_block_end(open).unwrap();
    tokens.override_range(open + 1..close, [Token::variable("$req")]);
    assert_eq!(tokens.generate_code(), "<?php f($req);");
    assert_eq!(tokens[open + 2].kind, TokenKind::CloseParen);

    let mut empty = Tokens::from_code("<?php f();");
    let open = empty.find_kind(TokenKind::OpenParen, 0, empty.len()).unwrap();
    empty.override_range(open + 1..open + 1, [Token::variable("$x")]);
    assert_eq!(empty.generate_code(), "<?php f($x);");
}

#[test]
fn array_literal_vs_index_access() {
    let tokens = Tokens::from_code("<?php $a[0]; f([1]); $x = array(2); foo()[1]; return [3];");
    let brackets: Vec<bool> = (0..tokens.len())
        .filter(|&i| {
            tokens[i].kind == TokenKind::OpenBracket
                || (tokens[i].kind == TokenKind::OpenParen
                    && tokens.prev_meaningful(i).is_some_and(|p| tokens[p].is_keyword("array")))
        })
        .map(|i| tokens.is_array_literal_open(i))
        .collect();
    assert_eq!(brackets, vec![false, true, true, false, true]);
}

#[test]
fn line_ending_detection() {
    assert_eq!(Tokens::from_code("<?php\r\n$a;\r\n").line_ending(), "\r\n");
    assert_eq!(Tokens::from_code("<?php\n$a;").line_ending(), "\n");
    assert_eq!(Tokens::from_code("<?php $a;").line_ending(), "\n");
}

#[test]
fn string_value_strips_quotes() {
    let tokens = lex("<?php 'key'; \"other\"; b'bin';");
    let values: Vec<&str> = tokens.iter().filter_map(Token::string_value).collect();
    assert_eq!(values, vec!["key", "other", "bin"]);
}

#[test]
fn fragments_lex_as_php() {
    assert_eq!(
        crate::lex_fragment("use Foo\\Bar;")
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect::<Vec<_>>(),
        vec![
            (TokenKind::Keyword, "use".to_string()),
            (TokenKind::Whitespace, " ".to_string()),
            (TokenKind::QualifiedName, "Foo\\Bar".to_string()),
            (TokenKind::Semicolon, ";".to_string()),
        ]
    );
}
