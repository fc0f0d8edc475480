use crate::lexer::{self, Token};

/// One pipeline stage after redirection parsing.
///
/// `args[0]` is the program name. `input` and `output` are the targets of the
/// last `<` and `>` seen in the stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    pub args: Vec<String>,
    pub input: Option<String>,
    pub output: Option<String>,
}

impl Stage {
    /// A stage without arguments runs nothing.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

struct StageBuilder {
    tokens: Vec<Token>,
    pos: usize,
}

impl StageBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        StageBuilder { tokens, pos: 0 }
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn has_next(&self) -> bool {
        self.pos < self.tokens.len()
    }

    fn build(mut self) -> Stage {
        let mut stage = Stage::default();

        while let Some(token) = self.consume() {
            match token {
                // An operator with nothing after it is kept as a plain argument.
                Token::RedirectIn if self.has_next() => {
                    stage.input = self.consume().map(Token::into_text);
                }
                Token::RedirectOut if self.has_next() => {
                    stage.output = self.consume().map(Token::into_text);
                }
                other => stage.args.push(other.into_text()),
            }
        }

        stage
    }
}

/// Parses one stage string into arguments and optional redirection targets.
///
/// Never fails: a dangling `<`/`>` becomes an argument and repeated
/// redirections keep the last target.
pub fn parse_stage(text: &str) -> Stage {
    StageBuilder::from(lexer::split_into_words(text)).build()
}
