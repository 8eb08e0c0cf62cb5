#![forbid(unsafe_code)]

mod lexer;
mod token;

pub use lexer::{LexError, Lexer};
pub use token::{Token, TokenKind};

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .lex()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn keywords_ignore_case() {
        assert_eq!(
            kinds("BEGIN End begin"),
            vec![TokenKind::KwBegin, TokenKind::KwEnd, TokenKind::KwBegin, TokenKind::Eof]
        );
    }

    #[test]
    fn directives_are_identifiers() {
        let ks = kinds("property Name: string read FName write FName;");
        assert_eq!(ks[0], TokenKind::KwProperty);
        assert!(ks.contains(&TokenKind::Ident("read".to_string())));
        assert!(ks.contains(&TokenKind::Ident("write".to_string())));
    }

    #[test]
    fn comments_and_compiler_directives_are_skipped() {
        let src = "{$R *.dfm} x (* block\n comment *) := // trailing\n 1;";
        assert_eq!(
            kinds(src),
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::Assign,
                TokenKind::Number("1".to_string()),
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn doubled_quotes_unescape() {
        let ks = kinds("ShowMessage('It''s done');");
        assert!(ks.contains(&TokenKind::Str("It's done".to_string())));
    }

    #[test]
    fn ampersand_escapes_reserved_words() {
        assert_eq!(kinds("&type")[0], TokenKind::Ident("type".to_string()));
    }

    #[test]
    fn spans_are_byte_offsets() {
        let tokens = Lexer::new("a  := b").lex().unwrap();
        assert_eq!(tokens[1].start(), 3);
        assert_eq!(tokens[1].end(), 5);
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let err = Lexer::new("begin { never closed").lex().unwrap_err();
        assert!(err.message.contains("unterminated comment"), "{}", err.message);
    }

    #[test]
    fn block_comments_may_contain_stars_and_parens() {
        let src = "(* note: x * (y) **) a (**) := (* ) *)\n b;";
        assert_eq!(
            kinds(src),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Assign,
                TokenKind::Ident("b".to_string()),
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = Lexer::new("begin (* never closed *").lex().unwrap_err();
        assert!(err.message.contains("unterminated comment"), "{}", err.message);
        assert_eq!(err.span.offset(), 6);
    }

    #[test]
    fn stray_character_is_an_error() {
        let err = Lexer::new("x := 1 ? 2;").lex().unwrap_err();
        assert!(err.message.contains("unexpected character"));
    }
}
