use std::fmt;

use crate::error::ClassifyError;

/// One `<Tag>: <Text>` line of a transcript.
///
/// The indentation before the tag and the exact separator after it are kept
/// so that rendering reproduces the source line byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Zero-based index of the line in the transcript
    pub line_index: usize,
    /// Speaker tag or role label, trimmed
    pub tag: String,
    /// Everything after the first colon and one following space
    pub text: String,
    indent: String,
    separator: String,
}

impl Utterance {
    /// Split a line at its first colon. Returns `None` when there is no colon
    /// or nothing but whitespace before it.
    fn parse(line: &str, line_index: usize) -> Option<Self> {
        let colon = line.find(':')?;
        let head = &line[..colon];
        let tag = head.trim();
        if tag.is_empty() {
            return None;
        }

        let indent_len = head.len() - head.trim_start().len();
        let tag_end = indent_len + tag.len();
        let after_colon = colon + 1;
        let text_start = if line[after_colon..].starts_with(' ') {
            after_colon + 1
        } else {
            after_colon
        };

        Some(Self {
            line_index,
            tag: tag.to_string(),
            text: line[text_start..].to_string(),
            indent: line[..indent_len].to_string(),
            separator: line[tag_end..text_start].to_string(),
        })
    }

    /// Render the line exactly as it appears in the transcript
    pub fn render(&self) -> String {
        format!("{}{}{}{}", self.indent, self.tag, self.separator, self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptLine {
    /// Whitespace-only line, kept verbatim
    Blank(String),
    Utterance(Utterance),
}

impl TranscriptLine {
    fn render(&self) -> String {
        match self {
            TranscriptLine::Blank(raw) => raw.clone(),
            TranscriptLine::Utterance(utterance) => utterance.render(),
        }
    }
}

/// A newline-separated dialogue transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<TranscriptLine>,
}

impl Transcript {
    /// Parse transcript text. Every non-blank line needs a `<tag>:` prefix.
    pub fn parse(text: &str) -> Result<Self, ClassifyError> {
        let mut lines = Vec::new();

        for (index, raw) in text.split('\n').enumerate() {
            if raw.trim().is_empty() {
                lines.push(TranscriptLine::Blank(raw.to_string()));
                continue;
            }

            match Utterance::parse(raw, index) {
                Some(utterance) => lines.push(TranscriptLine::Utterance(utterance)),
                None => {
                    return Err(ClassifyError::MalformedLine {
                        line_number: index + 1,
                        line: raw.to_string(),
                    });
                }
            }
        }

        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    /// Number of lines, blank ones included
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn utterances(&self) -> impl Iterator<Item = &Utterance> {
        self.lines.iter().filter_map(|line| match line {
            TranscriptLine::Utterance(u) => Some(u),
            TranscriptLine::Blank(_) => None,
        })
    }

    pub fn utterance(&self, line_index: usize) -> Option<&Utterance> {
        match self.lines.get(line_index) {
            Some(TranscriptLine::Utterance(u)) => Some(u),
            _ => None,
        }
    }

    /// Distinct tags in order of first appearance
    pub fn speaker_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for utterance in self.utterances() {
            if !tags.iter().any(|t| t == &utterance.tag) {
                tags.push(utterance.tag.clone());
            }
        }
        tags
    }

    /// Replace the tag of a single line, returning the previous tag
    pub fn set_tag(&mut self, line_index: usize, tag: &str) -> Option<String> {
        match self.lines.get_mut(line_index) {
            Some(TranscriptLine::Utterance(u)) => Some(std::mem::replace(&mut u.tag, tag.to_string())),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(TranscriptLine::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_speakers() {
        let transcript = Transcript::parse("Speaker 0: Hello\nSpeaker 1: Hi").unwrap();

        let utterances: Vec<_> = transcript.utterances().collect();
        assert_eq!(utterances.len(), 2);
        assert_eq!(utterances[0].tag, "Speaker 0");
        assert_eq!(utterances[0].text, "Hello");
        assert_eq!(utterances[1].line_index, 1);
        assert_eq!(transcript.speaker_tags(), vec!["Speaker 0", "Speaker 1"]);
    }

    #[test]
    fn test_render_is_byte_exact() {
        let text = "  Speaker 0 :  spaced   text\n\nSpeaker 1:no space\r\n\tSpeaker 0: time 12:30\n";
        let transcript = Transcript::parse(text).unwrap();

        assert_eq!(transcript.render(), text);
        assert_eq!(transcript.line_count(), 5);

        let first = transcript.utterance(0).unwrap();
        assert_eq!(first.tag, "Speaker 0");
        assert_eq!(first.text, " spaced   text");

        let third = transcript.utterance(3).unwrap();
        assert_eq!(third.text, "time 12:30");
    }

    #[test]
    fn test_missing_separator_is_malformed() {
        let err = Transcript::parse("Speaker 0: Hello\nno separator here").unwrap_err();
        match err {
            ClassifyError::MalformedLine { line_number, line } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "no separator here");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_tag_is_malformed() {
        assert!(matches!(
            Transcript::parse("   : orphan text"),
            Err(ClassifyError::MalformedLine { line_number: 1, .. })
        ));
    }

    #[test]
    fn test_tags_keep_first_appearance_order() {
        let transcript =
            Transcript::parse("Speaker 1: a\nSpeaker 0: b\nSpeaker 1: c\nSpeaker 2: d").unwrap();
        assert_eq!(
            transcript.speaker_tags(),
            vec!["Speaker 1", "Speaker 0", "Speaker 2"]
        );
    }

    #[test]
    fn test_set_tag_only_touches_one_line() {
        let mut transcript = Transcript::parse("Agent: one\nAgent: two").unwrap();
        let old = transcript.set_tag(1, "Customer");

        assert_eq!(old.as_deref(), Some("Agent"));
        assert_eq!(transcript.render(), "Agent: one\nCustomer: two");
        assert_eq!(transcript.set_tag(7, "Customer"), None);
    }
}
