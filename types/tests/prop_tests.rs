use proptest::prelude::*;

use idgate_types::{
    ArtifactId, DocumentMode, EncodedImage, MatchResult, VerificationSession, MATCH_THRESHOLD,
};

fn still(seed: u8) -> EncodedImage {
    EncodedImage::png(vec![0x89, b'P', b'N', b'G', seed])
}

proptest! {
    /// is_match is exactly the conjunction of verdict and threshold.
    #[test]
    fn is_match_is_conjunctive(similarity in -20.0f64..140.0, verdict in any::<bool>()) {
        let result = MatchResult::decide(ArtifactId::new(1), similarity, verdict, "m");
        prop_assert_eq!(result.is_match(), verdict && result.score() >= MATCH_THRESHOLD);
        prop_assert!(result.score() <= 100);
        if result.is_match() {
            prop_assert!(result.score() >= MATCH_THRESHOLD);
        }
    }

    /// Every retake yields a strictly newer artifact id and no match result.
    #[test]
    fn retakes_never_keep_a_match(retakes in 1usize..8, similarity in 0.0f64..100.0) {
        let mut session = VerificationSession::new(DocumentMode::Upload).with_live_still(still(0));
        let mut last = session.live_id().unwrap();
        for i in 0..retakes {
            let result = MatchResult::decide(last, similarity, true, "m");
            session = session.with_match_result(result).unwrap();
            session = session.with_live_still(still(i as u8));
            prop_assert!(session.match_result().is_none());
            let id = session.live_id().unwrap();
            prop_assert!(id > last);
            last = id;
        }
    }

    /// A result computed for any earlier capture is refused.
    #[test]
    fn earlier_results_are_refused(captures in 2u64..10) {
        let mut session = VerificationSession::new(DocumentMode::Capture);
        for i in 0..captures {
            session = session.with_live_still(still(i as u8));
        }
        let current = session.live_id().unwrap();
        for raw in 1..current.as_u64() {
            let stale = MatchResult::decide(ArtifactId::new(raw), 99.0, true, "m");
            prop_assert!(session.with_match_result(stale).is_err());
        }
    }
}
