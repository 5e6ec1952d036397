// scanner to walk the characters of a source text
pub struct Scanner {
    chars: Vec<char>,

    current: usize, // current index into chars

    // for diagnostics, position of the next character to be consumed
    line: usize,   // 1-based line in source
    column: usize, // 1-based character position on current line
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            current: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn get_line_diagnostics(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    // consume current character, return it and advance
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;

        self.current += 1;
        self.column += 1;

        // a consumed newline moves to the start of the next line
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        }

        Some(c)
    }

    // peek current character (if there is any) without advancing
    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.current).copied()
    }

    // advance if and only if current character is equal to expected. return if advanced
    pub fn advance_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            return true;
        }

        false
    }

    // advance while the predicate holds, returning the consumed run
    pub fn advance_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut run = String::new();
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            run.push(c);
            self.advance();
        }
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_scanner() {
        let scanner = Scanner::new("test");

        assert_eq!(scanner.current, 0);
        assert_eq!(scanner.get_line_diagnostics(), (1, 1));
        assert_eq!(scanner.chars, vec!['t', 'e', 's', 't']);
    }

    #[test]
    fn test_empty_source() {
        let mut scanner = Scanner::new("");

        assert_eq!(scanner.peek(), None);
        assert_eq!(scanner.advance_while(|_| true), "");
    }

    #[test]
    fn test_advance() {
        let mut scanner = Scanner::new("ab");

        assert_eq!(scanner.advance(), Some('a'));
        assert_eq!(scanner.current, 1);
        assert_eq!(scanner.advance(), Some('b'));
        assert_eq!(scanner.current, 2);
        assert_eq!(scanner.advance(), None);
    }

    #[test]
    fn test_advance_if() {
        let mut scanner = Scanner::new("abc");

        assert!(scanner.advance_if('a'));
        assert!(!scanner.advance_if('a'));
        assert_eq!(scanner.current, 1);
        assert!(scanner.advance_if('b'));
        assert_eq!(scanner.current, 2);
    }

    #[test]
    fn test_advance_while() {
        let mut scanner = Scanner::new("123abc");

        assert_eq!(scanner.advance_while(|c| c.is_ascii_digit()), "123");
        assert_eq!(scanner.peek(), Some('a'));
        assert_eq!(scanner.advance_while(|c| c.is_ascii_digit()), "");
    }

    #[test]
    fn test_line_column_tracking() {
        let mut scanner = Scanner::new("abc\ndef");

        scanner.advance(); // 'a'
        assert_eq!(scanner.get_line_diagnostics(), (1, 2));

        scanner.advance(); // 'b'
        scanner.advance(); // 'c'
        scanner.advance(); // '\n'
        assert_eq!(scanner.get_line_diagnostics(), (2, 1));
    }

    #[test]
    fn test_unicode_columns_count_characters() {
        let mut scanner = Scanner::new("こんにちは世界");

        assert_eq!(scanner.advance(), Some('こ'));
        assert_eq!(scanner.advance_while(|c| c != '世'), "んにちは");
        assert_eq!(scanner.get_line_diagnostics(), (1, 6));
        assert_eq!(scanner.advance_while(|_| true), "世界");
    }
}
