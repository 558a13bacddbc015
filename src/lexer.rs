// パス: src/lexer.rs
// 役割: S 式ソースを 1 トークンずつ切り出す遅延字句解析器
// 意図: リーダが必要な分だけトークンを消費できるようにする
// 関連ファイル: src/parser.rs, src/errors.rs, tests/lexer_reader.rs
//! 字句解析モジュール
//!
//! - トークンは `(` `)`、引用記号 `'` `` ` `` `,` `,@`、文字列リテラル、
//!   それ以外の非空白文字の最長連続（アトム）のいずれか。
//! - `;` から行末まではコメントとして読み捨てる。
//! - `next_token` は呼ばれるたびに 1 トークンだけ消費し、入力が尽きたら
//!   `TokenKind::EOF` を返し続ける（エラーにはしない）。

use crate::errors::LexerError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// 生成されたトークンとその位置情報を保持するレコード。
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: usize,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// 字句解析で識別されるトークンの分類。
pub enum TokenKind {
    EOF,
    LPAREN,
    RPAREN,
    QUOTE,   // `'`
    QUASI,   // `` ` ``
    UNQUOTE, // `,`
    SPLICE,  // `,@`
    STRING,
    ATOM,
}

#[derive(Debug)]
/// 行頭オフセットを事前計算し、行・列情報を素早く算出するヘルパ。
struct LineMap {
    starts: Vec<usize>,
}

impl LineMap {
    fn new(src: &str) -> Self {
        let mut starts = vec![0];
        for (idx, ch) in src.char_indices() {
            if ch == '\n' {
                starts.push(idx + ch.len_utf8());
            }
        }
        Self { starts }
    }

    /// 指定バイト位置の行番号と桁位置を返す。
    fn locate(&self, src: &str, pos: usize) -> (usize, usize) {
        let idx = match self.starts.binary_search(&pos) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let start = self.starts[idx];
        let col = src[start..pos].chars().count() + 1;
        (idx + 1, col)
    }

    fn line_text<'a>(&self, src: &'a str, line: usize) -> &'a str {
        let Some(&start) = self.starts.get(line.saturating_sub(1)) else {
            return "";
        };
        let end = self.starts.get(line).copied().unwrap_or(src.len());
        let slice = &src[start..end];
        slice.strip_suffix('\n').unwrap_or(slice)
    }
}

/// アトムを打ち切る区切り文字かどうか。
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '\'' | '"' | '`' | ',' | ';')
}

/// 残りの入力を保持し、要求されるたびに 1 トークンずつ返す字句解析器。
pub struct Tokenizer<'a> {
    src: &'a str,
    cursor: usize,
    line_map: LineMap,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            cursor: 0,
            line_map: LineMap::new(src),
        }
    }

    /// まだ消費していない入力を返す。
    pub fn remainder(&self) -> &'a str {
        &self.src[self.cursor..]
    }

    /// 次のトークンを 1 つ消費して返す。入力が尽きていれば `EOF`。
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_trivia();
        let start = self.cursor;
        let Some(ch) = self.peek_char() else {
            return Ok(self.make(TokenKind::EOF, start, start));
        };
        match ch {
            '(' => Ok(self.single(TokenKind::LPAREN)),
            ')' => Ok(self.single(TokenKind::RPAREN)),
            '\'' => Ok(self.single(TokenKind::QUOTE)),
            '`' => Ok(self.single(TokenKind::QUASI)),
            ',' => {
                self.advance_char();
                if self.peek_char() == Some('@') {
                    self.advance_char();
                    Ok(self.make(TokenKind::SPLICE, start, self.cursor))
                } else {
                    Ok(self.make(TokenKind::UNQUOTE, start, self.cursor))
                }
            }
            '"' => self.lex_string_literal(),
            _ => {
                while let Some(c) = self.peek_char() {
                    if is_delimiter(c) {
                        break;
                    }
                    self.advance_char();
                }
                Ok(self.make(TokenKind::ATOM, start, self.cursor))
            }
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.advance_char();
            } else if ch == ';' {
                while let Some(c) = self.advance_char() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn lex_string_literal(&mut self) -> Result<Token, LexerError> {
        let start = self.cursor;
        self.advance_char(); // 開始ダブルクォート
        let mut escaped = false;
        let mut ok = false;
        while let Some(ch) = self.advance_char() {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                ok = true;
                break;
            }
        }
        if !ok {
            return Err(self.err("LEX001", "unterminated string literal", start));
        }
        Ok(self.make(TokenKind::STRING, start, self.cursor))
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.cursor;
        self.advance_char();
        self.make(kind, start, self.cursor)
    }

    fn make(&self, kind: TokenKind, start: usize, end: usize) -> Token {
        let (line, col) = self.line_map.locate(self.src, start);
        Token {
            kind,
            value: self.src[start..end].into(),
            pos: start,
            line,
            col,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.cursor..].chars().next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.cursor += ch.len_utf8();
        Some(ch)
    }

    fn err(&self, code: &'static str, message: impl Into<String>, pos: usize) -> LexerError {
        let (line, col) = self.line_map.locate(self.src, pos);
        LexerError::at_with_snippet(
            code,
            message,
            Some(pos),
            Some(line),
            Some(col),
            self.line_map.line_text(self.src, line).to_string(),
        )
    }
}

/// 入力全体をトークン列へ変換する（末尾に `EOF` を含む）。
pub fn lex(src: &str) -> Result<Vec<Token>, LexerError> {
    let mut tokenizer = Tokenizer::new(src);
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.next_token()?;
        let done = token.kind == TokenKind::EOF;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(src: &str) -> Vec<String> {
        lex(src)
            .unwrap()
            .into_iter()
            .filter(|t| t.kind != TokenKind::EOF)
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn splits_parens_quotes_and_atoms() {
        assert_eq!(
            values("(+ 1 '(a b) `(x ,y ,@z))"),
            vec![
                "(", "+", "1", "'", "(", "a", "b", ")", "`", "(", "x", ",", "y", ",@", "z", ")",
                ")"
            ]
        );
    }

    #[test]
    fn string_literal_keeps_escapes_and_spaces() {
        assert_eq!(values(r#"(str? "a \"b\" c")"#)[2], r#""a \"b\" c""#);
    }

    #[test]
    fn comments_are_discarded() {
        assert_eq!(values("; nothing\n(f ; trailing\n x)"), vec!["(", "f", "x", ")"]);
    }

    #[test]
    fn eof_is_sticky() {
        let mut t = Tokenizer::new("a");
        assert_eq!(t.next_token().unwrap().value, "a");
        assert_eq!(t.next_token().unwrap().kind, TokenKind::EOF);
        assert_eq!(t.next_token().unwrap().kind, TokenKind::EOF);
    }

    #[test]
    fn lazily_retains_remainder() {
        let mut t = Tokenizer::new("(a b)");
        t.next_token().unwrap();
        assert_eq!(t.remainder(), "a b)");
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = lex("(f \"abc").unwrap_err();
        assert_eq!(err.0.code, "LEX001");
        assert_eq!(err.0.pos, Some(3));
        assert_eq!(err.0.col, Some(4));
    }
}
