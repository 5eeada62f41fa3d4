//! Multi-record sequence parsing for the design stage output.
//!
//! The design service returns one record per line pair: a header, then the
//! sequence. The first record echoes the input template and carries a
//! different header, so marker scanning skips it without any positional logic.

use tracing::debug;

/// Header prefix of designed records.
pub const DEFAULT_HEADER_MARKER: &str = ">T=";

#[derive(Debug, Clone)]
pub struct SequenceParser {
    header_marker: String,
    discard_leading_template: bool,
}

impl Default for SequenceParser {
    fn default() -> Self {
        Self {
            header_marker: DEFAULT_HEADER_MARKER.to_string(),
            discard_leading_template: false,
        }
    }
}

impl SequenceParser {
    pub fn new(header_marker: impl Into<String>) -> Self {
        Self {
            header_marker: header_marker.into(),
            ..Default::default()
        }
    }

    /// Also drop the first marked record, for services whose template
    /// record carries the designed-record marker.
    pub fn discard_leading_template(mut self, discard: bool) -> Self {
        self.discard_leading_template = discard;
        self
    }

    /// Returns designed sequences in blob order.
    ///
    /// A header on the last line (or followed by a blank line or another
    /// header) has no sequence and is dropped.
    pub fn parse(&self, blob: &str) -> Vec<String> {
        let lines: Vec<&str> = blob.split('\n').collect();
        let mut sequences = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if !line.starts_with(&self.header_marker) {
                continue;
            }
            match lines.get(i + 1).map(|next| next.trim()) {
                Some(next) if !next.is_empty() && !next.starts_with('>') => {
                    sequences.push(next.to_string())
                }
                _ => debug!(header = %line.trim(), "Dropping header with no sequence line"),
            }
        }

        if self.discard_leading_template && !sequences.is_empty() {
            sequences.remove(0);
        }
        sequences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DESIGN_BLOB: &str = ">input, score=1.9124, global_score=1.9124, fixed_chains=[], designed_chains=['A'], model_name=v_48_020, seed=37\n\
GGGGGGGGGGGGGGGGGG\n\
>T=0.2, sample=1, score=0.8951, global_score=0.8951, seq_recovery=0.0000\n\
MSEELLKKAEELAKRLG\n\
>T=0.2, sample=2, score=0.9102, global_score=0.9102, seq_recovery=0.0000\n\
  MSPEEIAKRVLELLKKG  \n";

    #[test]
    fn test_parses_marked_records() {
        let parsed = SequenceParser::default().parse(">T=1\nAAAA\n>T=2\nCCCC\n");
        assert_eq!(parsed, vec!["AAAA".to_string(), "CCCC".to_string()]);
    }

    #[test]
    fn test_template_record_is_skipped() {
        let parsed = SequenceParser::default().parse(DESIGN_BLOB);
        assert_eq!(parsed, vec!["MSEELLKKAEELAKRLG".to_string(), "MSPEEIAKRVLELLKKG".to_string()]);
    }

    #[test]
    fn test_empty_blob_is_empty_list() {
        assert!(SequenceParser::default().parse("").is_empty());
    }

    #[test]
    fn test_trailing_header_is_dropped() {
        let parsed = SequenceParser::default().parse(">T=1\nAAAA\n>T=2");
        assert_eq!(parsed, vec!["AAAA".to_string()]);

        let parsed = SequenceParser::default().parse(">T=1\nAAAA\n>T=2\n");
        assert_eq!(parsed, vec!["AAAA".to_string()]);
    }

    #[test]
    fn test_header_followed_by_header_is_dropped() {
        let parsed = SequenceParser::default().parse(">T=1\n>T=2\nAAAA");
        assert_eq!(parsed, vec!["AAAA".to_string()]);

        let parsed = SequenceParser::default().parse(">T=1\n\n>T=2\nCCCC\n");
        assert_eq!(parsed, vec!["CCCC".to_string()]);
    }

    #[test]
    fn test_discard_leading_template_policy() {
        let parser = SequenceParser::new(">").discard_leading_template(true);
        let parsed = parser.parse(">template\nGGGG\n>design\nAAAA\n");
        assert_eq!(parsed, vec!["AAAA".to_string()]);
    }

    #[test]
    fn test_count_never_exceeds_records_minus_template() {
        let parsed = SequenceParser::default().parse(DESIGN_BLOB);
        let records = DESIGN_BLOB.lines().filter(|l| l.starts_with('>')).count();
        assert!(parsed.len() <= records - 1);
    }
}
