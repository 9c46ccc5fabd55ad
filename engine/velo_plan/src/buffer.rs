//! Output buffer.
//!
//! Append-only text buffer with pooled growth: capacity is acquired in
//! multiples of the configured pool size instead of the allocator's
//! doubling, and `reset` rewinds the write cursor without releasing
//! capacity. Sub-template evaluation moves buffers between states, so the
//! growth quantum travels with the buffer itself.

use std::fmt;

/// Pooled output buffer.
pub(crate) struct Buffer {
    text: String,
    pool_size: usize,
}

impl Buffer {
    /// Create a buffer with `pool_size` bytes of initial capacity.
    /// `pool_size` is also the growth quantum; zero is clamped to one.
    pub fn new(pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        Buffer {
            text: String::with_capacity(pool_size),
            pool_size,
        }
    }

    /// Reserve enough capacity for `extra` more bytes, growing by whole
    /// pool-size steps.
    fn ensure(&mut self, extra: usize) {
        let need = self.text.len() + extra;
        if need <= self.text.capacity() {
            return;
        }
        let mut target = self.text.capacity().max(self.pool_size);
        while target < need {
            target += self.pool_size;
        }
        self.text.reserve_exact(target - self.text.len());
    }

    pub fn push_str(&mut self, s: &str) {
        self.ensure(s.len());
        self.text.push_str(s);
    }

    /// Append with the HTML escape set applied: `&` `<` `>` `"` `'`.
    pub fn push_escaped(&mut self, s: &str) {
        let mut start = 0;
        for (i, byte) in s.bytes().enumerate() {
            let entity = match byte {
                b'&' => "&amp;",
                b'<' => "&lt;",
                b'>' => "&gt;",
                b'"' => "&#34;",
                b'\'' => "&#39;",
                _ => continue,
            };
            self.push_str(&s[start..i]);
            self.push_str(entity);
            start = i + 1;
        }
        self.push_str(&s[start..]);
    }

    /// Format a value into the buffer.
    pub fn push_display(&mut self, value: impl fmt::Display) {
        use fmt::Write as _;
        // String-backed writer, cannot fail.
        let _ = write!(self, "{value}");
    }

    /// Rewind the write cursor. Capacity is retained.
    pub fn reset(&mut self) {
        self.text.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Move the contents out, leaving an empty buffer.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.text.capacity()
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn append_and_read_back() {
        let mut buf = Buffer::new(16);
        buf.push_str("hello ");
        buf.push_str("world");
        assert_eq!(buf.as_str(), "hello world");
        assert_eq!(buf.len(), 11);
    }

    #[test]
    fn reset_rewinds_cursor_and_keeps_capacity() {
        let mut buf = Buffer::new(8);
        buf.push_str("some longer text that forces growth");
        let cap = buf.capacity();

        buf.reset();
        assert_eq!(buf.as_str(), "");
        assert_eq!(buf.capacity(), cap);
    }

    #[test]
    fn grows_past_pool_size() {
        let mut buf = Buffer::new(4);
        buf.push_str("0123456789");
        assert_eq!(buf.as_str(), "0123456789");
        assert!(buf.capacity() >= 10);
    }

    #[test]
    fn escapes_html_specials() {
        let mut buf = Buffer::new(64);
        buf.push_escaped("<script>alert()</script>");
        assert_eq!(buf.as_str(), "&lt;script&gt;alert()&lt;/script&gt;");
    }

    #[test]
    fn escapes_quotes_and_ampersand() {
        let mut buf = Buffer::new(64);
        buf.push_escaped(r#"a & b "c" 'd'"#);
        assert_eq!(buf.as_str(), "a &amp; b &#34;c&#34; &#39;d&#39;");
    }

    #[test]
    fn push_display_formats_scalars() {
        let mut buf = Buffer::new(16);
        buf.push_display(42);
        buf.push_display(' ');
        buf.push_display(true);
        assert_eq!(buf.as_str(), "42 true");
    }

    #[test]
    fn take_leaves_empty_buffer() {
        let mut buf = Buffer::new(8);
        buf.push_str("out");
        assert_eq!(buf.take(), "out");
        assert_eq!(buf.as_str(), "");
    }

    /// Decode the escape set back; panics on a bare `&`, which doubles
    /// as the "no unescaped specials survive" check.
    fn unescape(s: &str) -> String {
        const ENTITIES: [(&str, &str); 5] = [
            ("&amp;", "&"),
            ("&lt;", "<"),
            ("&gt;", ">"),
            ("&#34;", "\""),
            ("&#39;", "'"),
        ];
        let mut out = String::new();
        let mut rest = s;
        while let Some(i) = rest.find('&') {
            out.push_str(&rest[..i]);
            rest = &rest[i..];
            let (entity, ch) = ENTITIES
                .iter()
                .find(|(entity, _)| rest.starts_with(entity))
                .unwrap();
            out.push_str(ch);
            rest = &rest[entity.len()..];
        }
        out.push_str(rest);
        out
    }

    proptest! {
        #[test]
        fn escaped_output_decodes_to_input(input in "[ -~]{0,64}") {
            let mut buf = Buffer::new(8);
            buf.push_escaped(&input);

            let escaped = buf.as_str();
            prop_assert!(!escaped.contains('<'));
            prop_assert!(!escaped.contains('>'));
            prop_assert_eq!(unescape(escaped), input);
        }

        #[test]
        fn chunked_appends_concatenate(
            pool in 1usize..32,
            chunks in proptest::collection::vec("[a-z<>&\"']{0,16}", 0..12),
        ) {
            let mut buf = Buffer::new(pool);
            for chunk in &chunks {
                buf.push_str(chunk);
            }

            let expected: String = chunks.concat();
            prop_assert_eq!(buf.as_str(), expected.as_str());

            let cap = buf.capacity();
            buf.reset();
            prop_assert_eq!(buf.len(), 0);
            prop_assert_eq!(buf.capacity(), cap);
        }
    }
}
