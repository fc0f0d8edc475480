//! Lexical analysis of a single pipeline stage into shell words.
//!
//! The lexer only knows about double quotes, backslash escapes and the two
//! redirection operators. Sequencing (`;`) and piping (`|`) never reach it
//! unquoted because the [`splitter`](crate::splitter) has already removed them.

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word with quotes and escapes already resolved.
    Word(String),
    /// Input redirection symbol, `<`.
    RedirectIn,
    /// Output redirection symbol, `>`.
    RedirectOut,
}

impl Token {
    /// Text form of the token, used when an operator ends up as a plain argument
    /// or a path.
    pub fn text(&self) -> &str {
        match self {
            Token::Word(s) => s,
            Token::RedirectIn => "<",
            Token::RedirectOut => ">",
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Token::Word(s) => s,
            other => other.text().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    // `""` must still produce a word even though the buffer stays empty.
    in_word: bool,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            in_word: false,
        }
    }

    /// Runs the machine over the whole input.
    ///
    /// An unterminated double quote simply runs to the end of the input; the
    /// lexer never fails.
    fn make_tokens(&mut self) -> Vec<Token> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start | LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch),
            }
        }

        self.finish_word(&mut out);
        out
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            ' ' | '\t' | '\n' | '\r' => {
                self.finish_word(out);
                self.state = LexingState::Start;
            }
            '<' | '>' => {
                self.finish_word(out);
                out.push(if ch == '<' {
                    Token::RedirectIn
                } else {
                    Token::RedirectOut
                });
                self.state = LexingState::Start;
            }
            '"' => {
                self.in_word = true;
                self.state = LexingState::ReadingDoubleQuote;
            }
            '\\' => {
                // A trailing backslash stands for itself.
                let escaped = self.read_char().unwrap_or('\\');
                self.push_char(escaped);
            }
            c => self.push_char(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => match self.peek_char() {
                Some(next @ ('"' | '\\')) => {
                    self.read_char();
                    self.buffer.push(next);
                }
                _ => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }

    fn push_char(&mut self, c: char) {
        self.buffer.push(c);
        self.in_word = true;
        self.state = LexingState::ReadingWord;
    }

    fn finish_word(&mut self, out: &mut Vec<Token>) {
        if self.in_word {
            out.push(Token::Word(std::mem::take(&mut self.buffer)));
            self.in_word = false;
        }
    }
}

/// Splits `line` into shell words, honoring double quotes and backslash escapes.
///
/// Unquoted `<` and `>` always come out as operator tokens, even when they are
/// glued to a word (`echo x>out`).
pub fn split_into_words(line: &str) -> Vec<Token> {
    LexingFSM::new(line).make_tokens()
}
