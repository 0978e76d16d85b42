#![allow(clippy::unwrap_used)]
//! Property tests for line tokenizing and reply post-processing.

use desk_agent_runtime::{tokenize, MarkerAction, ResponsePostProcessor};
use proptest::prelude::*;

proptest! {
    #[test]
    fn tokenize_never_panics(s in "\\PC*") {
        let _ = tokenize(&s);
    }

    #[test]
    fn plain_words_split_on_whitespace(words in prop::collection::vec("[a-zA-Z0-9_./-]{1,12}", 0..8)) {
        let line = words.join("  ");
        prop_assert_eq!(tokenize(&line).unwrap(), words);
    }

    #[test]
    fn reply_without_marker_is_untouched(s in "\\PC*") {
        prop_assume!(!s.contains("to="));
        let processor = ResponsePostProcessor::new().unwrap();
        prop_assert_eq!(processor.parse(&s), MarkerAction::None);
    }

    #[test]
    fn calculator_marker_round_trips(expr in "[0-9 +*/().-]{1,20}") {
        let processor = ResponsePostProcessor::new().unwrap();
        let reply = format!(
            "to=functions.calculator <|message|>{}",
            serde_json::json!({ "expression": expr })
        );
        match processor.parse(&reply) {
            MarkerAction::Execute { line } => {
                let words = tokenize(&line).unwrap();
                prop_assert_eq!(words, vec!["calculator".to_string(), expr]);
            }
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }
}
