use logos::Logos;

#[derive(PartialEq, Eq, Debug, Clone, Copy, Logos)]
pub enum TokenKind {
    #[token("\n")]
    Newline,

    // `#name` label definition. The name may be empty; the compiler rejects it.
    #[regex("#[^ \t\r\n\x0B\x0C']*")]
    Label,

    // Mnemonic, register, timer, number, label reference.
    #[regex("[^ \t\r\n\x0B\x0C'#][^ \t\r\n\x0B\x0C']*")]
    Word,

    #[error]
    #[regex(r"[ \t\r\x0B\x0C]+", logos::skip)]
    #[regex(r"'[^\n]*", logos::skip)]
    Error,
}

/// The tokens of one non-empty source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line<'src> {
    /// 1-based line number.
    pub number: usize,
    pub tokens: Vec<(TokenKind, &'src str)>,
}

/// Split `source` into lines of tokens, dropping blank and comment-only lines.
pub fn scan(source: &str) -> Vec<Line<'_>> {
    let mut lines = vec![];
    let mut current = Line {
        number: 1,
        tokens: vec![],
    };
    let mut lexer = TokenKind::lexer(source);
    while let Some(kind) = lexer.next() {
        if kind == TokenKind::Newline {
            let number = current.number + 1;
            let done = std::mem::replace(
                &mut current,
                Line {
                    number,
                    tokens: vec![],
                },
            );
            if !done.tokens.is_empty() {
                lines.push(done);
            }
        } else {
            current.tokens.push((kind, lexer.slice()));
        }
    }
    if !current.tokens.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    #[test]
    fn tokens() {
        let lexer = TokenKind::lexer("push 1.5 ' trailing\n#loop\n  jmpx a b");
        let tokens: Vec<_> = lexer.spanned().map(|(t, _)| t).collect();
        assert_eq!(tokens, vec![Word, Word, Newline, Label, Newline, Word, Word, Word]);
    }

    #[test]
    fn lines() {
        let source = "' header comment\n\npush x\r\n   \n#top\nadd ' sum it\n";
        let lines = scan(source);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].number, 3);
        assert_eq!(lines[0].tokens, vec![(Word, "push"), (Word, "x")]);
        assert_eq!(lines[1].tokens, vec![(Label, "#top")]);
        assert_eq!(lines[2].number, 6);
        assert_eq!(lines[2].tokens, vec![(Word, "add")]);
    }

    #[test]
    fn label_shapes() {
        let lines = scan("#\n# spaced\nout#x");
        assert_eq!(lines[0].tokens, vec![(Label, "#")]);
        assert_eq!(lines[1].tokens, vec![(Label, "#"), (Word, "spaced")]);
        assert_eq!(lines[2].tokens, vec![(Word, "out#x")]);
    }
}
