// ============================================================
// Layer 4: Review Text Preprocessor
// ============================================================
// Cleans raw review text before tokenisation.
//
// Scraped reviews often contain:
//   - Escaped line breaks ("\n" as two literal characters)
//   - Escaped quotes (\")
//   - Non-breaking / zero-width spaces and byte order marks
//   - Tabs, carriage returns and other control characters
//   - Runs of spaces left over from formatting
//
// A rating classifier only sees a flat token sequence, so every
// kind of line break becomes a single space.
//
// Cleaning steps (applied in order):
//   1. Unescape literal "\n" and "\"" sequences
//   2. Map unicode whitespace and control characters to spaces
//   3. Collapse runs of spaces and trim

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean one review. Returns an owned String.
    pub fn clean(&self, text: &str) -> String {
        // ── Step 1: Unescape ─────────────────────────────────────────────────
        let unescaped = text.replace("\\n", " ").replace("\\\"", "\"");

        // ── Step 2 + 3: Normalise characters and collapse spaces ─────────────
        let mut out        = String::with_capacity(unescaped.len());
        let mut last_space = true; // swallows leading whitespace

        for c in unescaped.chars() {
            let c = match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_whitespace() || c.is_control() => ' ',
                c => c,
            };

            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        out.trim_end().to_string()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescapes_line_breaks() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("Great food.\\nWill return!"), "Great food. Will return!");
    }

    #[test]
    fn test_unescapes_quotes() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("the \\\"special\\\" was cold"), "the \"special\" was cold");
    }

    #[test]
    fn test_collapses_whitespace_and_controls() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  slow\t\tservice\r\n\x01bad \u{00A0} food  "), "slow service bad food");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
        assert_eq!(p.clean(" \\n "), "");
    }
}
