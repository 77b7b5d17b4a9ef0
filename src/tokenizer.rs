//! Streaming markup tokenizer with byte-exact raw slices.
//!
//! Every token borrows the exact source range it was scanned from, so a
//! consumer that re-emits `raw()` for each token reproduces the input
//! byte-for-byte. Tag and attribute names are restricted to ASCII
//! `[A-Za-z0-9:_.@-]`; anything the scanner cannot classify inside a tag is
//! skipped without consuming it into an attribute, and markup that never
//! closes before end of input is handed back as plain text rather than an
//! error.

use log::trace;
use memchr::memchr;

const SCRIPT_CLOSE_TAG: &[u8] = b"</script";
const STYLE_CLOSE_TAG: &[u8] = b"</style";

/// Byte range in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-length span, used for end-of-input positions.
    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One attribute as written in a start tag.
///
/// `value` is the raw slice between the quotes (or the unquoted run); no
/// entity decoding happens here. A bare attribute with no `=` has no value.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr<'s> {
    pub name: &'s str,
    pub value: Option<&'s str>,
    pub span: Span,
}

impl<'s> Attr<'s> {
    /// Raw value, with boolean attributes reading as empty.
    pub fn value_or_empty(&self) -> &'s str {
        self.value.unwrap_or("")
    }
}

/// Tokens produced by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'s> {
    /// Character data between tags, including stray `<` runs and anything
    /// left unterminated at end of input.
    Text { raw: &'s str, span: Span },
    /// `<!-- ... -->`, bogus `</...>` close tags, and `<?...>` instructions.
    Comment { raw: &'s str, span: Span },
    /// `<!DOCTYPE ...>` and other `<!...>` markup declarations.
    Doctype { raw: &'s str, span: Span },
    /// `<name ...>` or `<name ... />`.
    StartTag {
        name: &'s str,
        attrs: Vec<Attr<'s>>,
        self_closing: bool,
        raw: &'s str,
        span: Span,
    },
    /// `</name ...>`.
    EndTag { name: &'s str, raw: &'s str, span: Span },
    /// End of input.
    Eof { span: Span },
}

impl<'s> Token<'s> {
    /// The exact source slice this token was scanned from.
    pub fn raw(&self) -> &'s str {
        match self {
            Token::Text { raw, .. }
            | Token::Comment { raw, .. }
            | Token::Doctype { raw, .. }
            | Token::StartTag { raw, .. }
            | Token::EndTag { raw, .. } => raw,
            Token::Eof { .. } => "",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Token::Text { span, .. }
            | Token::Comment { span, .. }
            | Token::Doctype { span, .. }
            | Token::StartTag { span, .. }
            | Token::EndTag { span, .. }
            | Token::Eof { span } => *span,
        }
    }
}

/// Single-pass scanner over one source string. Not restartable; create a
/// fresh instance to scan again.
pub struct Tokenizer<'s> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    /// Close tag to look for while inside a rawtext element (script/style).
    rawtext: Option<&'static [u8]>,
}

impl<'s> Tokenizer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            rawtext: None,
        }
    }

    /// Scan the next token. Returns `Token::Eof` at end of input, and keeps
    /// returning it if called again.
    pub fn next_token(&mut self) -> Token<'s> {
        let token = self.scan();
        trace!(target: "xtempl.tokenizer", "emit {:?}", token);
        token
    }

    fn scan(&mut self) -> Token<'s> {
        if let Some(close_tag) = self.rawtext {
            return self.scan_rawtext(close_tag);
        }
        if self.pos >= self.bytes.len() {
            return Token::Eof { span: Span::empty(self.pos) };
        }
        if self.bytes[self.pos] != b'<' {
            return self.scan_text();
        }
        match self.bytes.get(self.pos + 1) {
            Some(b'!') => self.scan_markup_declaration(),
            Some(b'?') => self.scan_instruction(),
            Some(b'/') => self.scan_end_tag(),
            Some(&c) if c.is_ascii_alphabetic() => self.scan_start_tag(),
            // A lone '<' (or '<' at end of input) is character data.
            _ => self.scan_text_from_angle(),
        }
    }

    /// Character data up to the next `<`.
    fn scan_text(&mut self) -> Token<'s> {
        let start = self.pos;
        let end = match memchr(b'<', &self.bytes[start..]) {
            Some(rel) => start + rel,
            None => self.bytes.len(),
        };
        debug_assert!(self.source.is_char_boundary(end));
        self.pos = end;
        Token::Text {
            raw: &self.source[start..end],
            span: Span::new(start, end),
        }
    }

    /// Character data that begins with a `<` the dispatcher could not use.
    fn scan_text_from_angle(&mut self) -> Token<'s> {
        let start = self.pos;
        let end = match memchr(b'<', &self.bytes[start + 1..]) {
            Some(rel) => start + 1 + rel,
            None => self.bytes.len(),
        };
        debug_assert!(self.source.is_char_boundary(end));
        self.pos = end;
        Token::Text {
            raw: &self.source[start..end],
            span: Span::new(start, end),
        }
    }

    /// `<!-- ... -->` comments and `<!...>` declarations (doctype and
    /// friends). Unterminated forms swallow the rest of the input; the raw
    /// slice still covers every byte.
    fn scan_markup_declaration(&mut self) -> Token<'s> {
        let start = self.pos;
        if self.source[start..].starts_with("<!--") {
            let body = start + 4;
            // Abruptly closed comments: `<!-->` and `<!--->` end at that
            // first `>`, which a search for `-->` past the opener misses.
            let end = if self.bytes.get(body) == Some(&b'>') {
                body + 1
            } else if self.source[body..].starts_with("->") {
                body + 2
            } else {
                match self.source[body..].find("-->") {
                    Some(rel) => body + rel + 3,
                    None => self.bytes.len(),
                }
            };
            self.pos = end;
            return Token::Comment {
                raw: &self.source[start..end],
                span: Span::new(start, end),
            };
        }
        let end = match memchr(b'>', &self.bytes[start + 2..]) {
            Some(rel) => start + 2 + rel + 1,
            None => self.bytes.len(),
        };
        self.pos = end;
        Token::Doctype {
            raw: &self.source[start..end],
            span: Span::new(start, end),
        }
    }

    /// `<?...>` processing instructions, classified as comments.
    fn scan_instruction(&mut self) -> Token<'s> {
        let start = self.pos;
        let end = match memchr(b'>', &self.bytes[start + 2..]) {
            Some(rel) => start + 2 + rel + 1,
            None => self.bytes.len(),
        };
        self.pos = end;
        Token::Comment {
            raw: &self.source[start..end],
            span: Span::new(start, end),
        }
    }

    fn scan_end_tag(&mut self) -> Token<'s> {
        let start = self.pos;
        let name_start = start + 2;
        let mut j = name_start;
        while j < self.bytes.len() && is_name_byte(self.bytes[j]) {
            j += 1;
        }
        if j == name_start {
            // `</>` and similar: bogus comment up to '>'.
            return match memchr(b'>', &self.bytes[name_start..]) {
                Some(rel) => {
                    let end = name_start + rel + 1;
                    self.pos = end;
                    Token::Comment {
                        raw: &self.source[start..end],
                        span: Span::new(start, end),
                    }
                }
                None => self.remainder_as_text(start),
            };
        }
        let name = &self.source[name_start..j];
        match memchr(b'>', &self.bytes[j..]) {
            Some(rel) => {
                let end = j + rel + 1;
                self.pos = end;
                Token::EndTag {
                    name,
                    raw: &self.source[start..end],
                    span: Span::new(start, end),
                }
            }
            None => self.remainder_as_text(start),
        }
    }

    fn scan_start_tag(&mut self) -> Token<'s> {
        let bytes = self.bytes;
        let len = bytes.len();
        let start = self.pos;
        let name_start = start + 1;
        let mut k = name_start;
        while k < len && is_name_byte(bytes[k]) {
            k += 1;
        }
        let name = &self.source[name_start..k];

        let mut attrs: Vec<Attr<'s>> = Vec::new();
        let mut self_closing = false;
        let mut closed = false;

        while k < len {
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k >= len {
                break;
            }
            if bytes[k] == b'>' {
                k += 1;
                closed = true;
                break;
            }
            if bytes[k] == b'/' {
                if k + 1 < len && bytes[k + 1] == b'>' {
                    self_closing = true;
                    closed = true;
                    k += 2;
                    break;
                }
                k += 1;
                continue;
            }
            let attr_start = k;
            while k < len && is_name_byte(bytes[k]) {
                k += 1;
            }
            if attr_start == k {
                // Not an attribute name; template actions and other junk
                // inside the tag are skipped a byte at a time. Quoting only
                // starts after '=', same as the reference lexer.
                k += 1;
                continue;
            }
            debug_assert!(self.source.is_char_boundary(attr_start));
            debug_assert!(self.source.is_char_boundary(k));
            let attr_name = &self.source[attr_start..k];

            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && bytes[k] == b'=' {
                k += 1;
                while k < len && bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                    let quote = bytes[k];
                    k += 1;
                    let vstart = k;
                    while k < len && bytes[k] != quote {
                        k += 1;
                    }
                    debug_assert!(self.source.is_char_boundary(vstart));
                    debug_assert!(self.source.is_char_boundary(k));
                    let value = &self.source[vstart..k];
                    if k < len {
                        k += 1;
                    }
                    attrs.push(Attr {
                        name: attr_name,
                        value: Some(value),
                        span: Span::new(attr_start, k),
                    });
                } else {
                    let vstart = k;
                    while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                        if bytes[k] == b'/' && k + 1 < len && bytes[k + 1] == b'>' {
                            break;
                        }
                        k += 1;
                    }
                    attrs.push(Attr {
                        name: attr_name,
                        value: Some(&self.source[vstart..k]),
                        span: Span::new(attr_start, k),
                    });
                }
            } else {
                attrs.push(Attr {
                    name: attr_name,
                    value: None,
                    span: Span::new(attr_start, k),
                });
            }
        }

        if !closed {
            return self.remainder_as_text(start);
        }

        self.pos = k;
        if !self_closing {
            if name.eq_ignore_ascii_case("script") {
                self.rawtext = Some(SCRIPT_CLOSE_TAG);
            } else if name.eq_ignore_ascii_case("style") {
                self.rawtext = Some(STYLE_CLOSE_TAG);
            }
        }
        Token::StartTag {
            name,
            attrs,
            self_closing,
            raw: &self.source[start..k],
            span: Span::new(start, k),
        }
    }

    /// Content of a rawtext element: everything up to the matching close tag
    /// is one text token, then the close tag is scanned as a normal end tag.
    fn scan_rawtext(&mut self, close_tag: &'static [u8]) -> Token<'s> {
        match find_rawtext_close(&self.bytes[self.pos..], close_tag) {
            Some(0) => {
                self.rawtext = None;
                self.scan_end_tag()
            }
            Some(rel) => {
                let start = self.pos;
                self.pos += rel;
                self.rawtext = None;
                debug_assert!(self.source.is_char_boundary(self.pos));
                Token::Text {
                    raw: &self.source[start..self.pos],
                    span: Span::new(start, self.pos),
                }
            }
            None => {
                self.rawtext = None;
                if self.pos >= self.bytes.len() {
                    Token::Eof { span: Span::empty(self.pos) }
                } else {
                    let start = self.pos;
                    self.pos = self.bytes.len();
                    Token::Text {
                        raw: &self.source[start..],
                        span: Span::new(start, self.bytes.len()),
                    }
                }
            }
        }
    }

    /// Fallback for markup left open at end of input: hand the rest back as
    /// text so the output still round-trips.
    fn remainder_as_text(&mut self, start: usize) -> Token<'s> {
        self.pos = self.bytes.len();
        Token::Text {
            raw: &self.source[start..],
            span: Span::new(start, self.bytes.len()),
        }
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.' | b'@')
}

/// Byte offset of the close tag for a rawtext element, relative to
/// `haystack`. Only ASCII whitespace may sit between the tag name and `>`,
/// so `</scripts>` stays content.
fn find_rawtext_close(haystack: &[u8], close_tag: &[u8]) -> Option<usize> {
    debug_assert!(close_tag[0] == b'<' && close_tag[1] == b'/');
    let n = close_tag.len();
    let mut i = 0;
    while i + n <= haystack.len() {
        let rel = memchr(b'<', &haystack[i..])?;
        i += rel;
        if i + n > haystack.len() {
            return None;
        }
        if haystack[i..i + n].eq_ignore_ascii_case(close_tag) {
            let mut k = i + n;
            while k < haystack.len() && haystack[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < haystack.len() && haystack[k] == b'>' {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &str) -> Vec<Token<'_>> {
        let mut tokenizer = Tokenizer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = tokenizer.next_token();
            let done = matches!(token, Token::Eof { .. });
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    /// Concatenating every raw slice must reproduce the input exactly.
    fn assert_roundtrip(source: &str) {
        let joined: String = collect(source).iter().map(|t| t.raw()).collect();
        assert_eq!(joined, source);
    }

    #[test]
    fn plain_text_is_one_token() {
        let tokens = collect("hello world");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].raw(), "hello world");
        assert!(matches!(tokens[1], Token::Eof { .. }));
    }

    #[test]
    fn start_tag_with_attributes() {
        let tokens = collect(r#"<a href="/x" class='y' checked>"#);
        match &tokens[0] {
            Token::StartTag { name, attrs, self_closing, raw, .. } => {
                assert_eq!(*name, "a");
                assert!(!self_closing);
                assert_eq!(*raw, r#"<a href="/x" class='y' checked>"#);
                assert_eq!(attrs.len(), 3);
                assert_eq!(attrs[0].name, "href");
                assert_eq!(attrs[0].value, Some("/x"));
                assert_eq!(attrs[1].value, Some("y"));
                assert_eq!(attrs[2].name, "checked");
                assert_eq!(attrs[2].value, None);
            }
            other => panic!("expected start tag, got {other:?}"),
        }
    }

    #[test]
    fn self_closing_tag() {
        let tokens = collect("<x-icon name=close/>");
        match &tokens[0] {
            Token::StartTag { name, attrs, self_closing, .. } => {
                assert_eq!(*name, "x-icon");
                assert!(self_closing);
                assert_eq!(attrs[0].value, Some("close"));
            }
            other => panic!("expected start tag, got {other:?}"),
        }
    }

    #[test]
    fn end_tag_raw_keeps_extra_bytes() {
        let tokens = collect("</div  >");
        match &tokens[0] {
            Token::EndTag { name, raw, .. } => {
                assert_eq!(*name, "div");
                assert_eq!(*raw, "</div  >");
            }
            other => panic!("expected end tag, got {other:?}"),
        }
    }

    #[test]
    fn quoted_value_may_contain_angle_bracket() {
        let tokens = collect(r#"<div title="a > b">x</div>"#);
        match &tokens[0] {
            Token::StartTag { attrs, .. } => {
                assert_eq!(attrs[0].value, Some("a > b"));
            }
            other => panic!("expected start tag, got {other:?}"),
        }
        assert_eq!(tokens[1].raw(), "x");
    }

    #[test]
    fn template_action_inside_tag_is_skipped_but_preserved() {
        let source = "<div\n    {{ if ne .ID \"\" -}}\n    id=\"{{ .ID }}\"\n    {{- end -}}\n    class=\"flex\"\n>";
        let tokens = collect(source);
        match &tokens[0] {
            Token::StartTag { name, raw, attrs, .. } => {
                assert_eq!(*name, "div");
                assert_eq!(*raw, source);
                // id and class still come through as attributes
                assert!(attrs.iter().any(|a| a.name == "id"));
                assert!(attrs.iter().any(|a| a.name == "class"));
            }
            other => panic!("expected start tag, got {other:?}"),
        }
    }

    #[test]
    fn comment_and_doctype() {
        let tokens = collect("<!DOCTYPE html>\n<!-- note -->");
        assert!(matches!(tokens[0], Token::Doctype { .. }));
        assert_eq!(tokens[0].raw(), "<!DOCTYPE html>");
        assert!(matches!(tokens[1], Token::Text { .. }));
        assert!(matches!(tokens[2], Token::Comment { .. }));
        assert_eq!(tokens[2].raw(), "<!-- note -->");
    }

    #[test]
    fn abruptly_closed_comments_end_at_the_angle() {
        let tokens = collect("<!--><b>x</b>");
        assert!(matches!(tokens[0], Token::Comment { .. }));
        assert_eq!(tokens[0].raw(), "<!-->");
        assert!(matches!(tokens[1], Token::StartTag { name: "b", .. }));

        let tokens = collect("<!--->rest");
        assert_eq!(tokens[0].raw(), "<!--->");
        assert_eq!(tokens[1].raw(), "rest");

        // The empty comment with a full closer is not abrupt.
        let tokens = collect("<!---->after");
        assert_eq!(tokens[0].raw(), "<!---->");
        assert_eq!(tokens[1].raw(), "after");
    }

    #[test]
    fn script_content_is_rawtext() {
        let tokens = collect("<script>if (a < b) { go(); }</script>");
        assert!(matches!(tokens[0], Token::StartTag { name: "script", .. }));
        assert_eq!(tokens[1].raw(), "if (a < b) { go(); }");
        assert!(matches!(tokens[2], Token::EndTag { name: "script", .. }));
    }

    #[test]
    fn script_close_tag_must_be_exact() {
        let tokens = collect("<script>a</scripts></script>");
        assert_eq!(tokens[1].raw(), "a</scripts>");
        assert!(matches!(tokens[2], Token::EndTag { name: "script", .. }));
    }

    #[test]
    fn stray_angle_is_text() {
        let tokens = collect("1 < 2 <b>x</b>");
        assert_eq!(tokens[0].raw(), "1 ");
        assert_eq!(tokens[1].raw(), "< 2 ");
        assert!(matches!(tokens[2], Token::StartTag { name: "b", .. }));
    }

    #[test]
    fn unterminated_tag_becomes_text() {
        let tokens = collect("before <div class=\"x");
        assert_eq!(tokens[0].raw(), "before ");
        assert!(matches!(tokens[1], Token::Text { .. }));
        assert_eq!(tokens[1].raw(), "<div class=\"x");
    }

    #[test]
    fn roundtrip_holds_for_hostile_inputs() {
        assert_roundtrip("");
        assert_roundtrip("<");
        assert_roundtrip("a < b && b > c");
        assert_roundtrip("<div>{{ range .Items }}<li>{{ . }}</li>{{ end }}</div>");
        assert_roundtrip("<!-- unterminated");
        assert_roundtrip("<!--> <p>still markup</p>");
        assert_roundtrip("<!---><!---->");
        assert_roundtrip("<!DOCTYPE html><html lang=\"en\"><body></body></html>");
        assert_roundtrip("<script>let s = \"</scrip\" + \"t>\";</script>");
        assert_roundtrip("<style>a { content: \"<\"; }</style>done");
        assert_roundtrip("<img src=/a.png><br/><input disabled>");
        assert_roundtrip("tail<div");
        assert_roundtrip("unicode ✨ text <p>émoji 🎉</p>");
        assert_roundtrip("<?xml version=\"1.0\"?><x/>");
        assert_roundtrip("</>");
    }

    #[test]
    fn spans_cover_the_source() {
        let source = "<p>a</p>";
        for token in collect(source) {
            let span = token.span();
            assert_eq!(token.raw(), &source[span.start..span.end]);
        }
    }
}
