use proptest::prelude::*;
use skinbridge::scan::OutputScanner;
use skinbridge::session::SessionId;

const STREAM: &str = "starting worker\n\
Generated image: /tmp/out/1_2_1.png\n\
plotting hole 2\n\
Generated image: /tmp/out/1_2_2.png\n\
[{\"success\":true,\"output_path\":\"/tmp/out/1_2_1.png\"}]\n";

/// Split `bytes` at the given (sorted, deduplicated) cut points.
fn chunks(bytes: &[u8], mut cuts: Vec<usize>) -> Vec<&[u8]> {
    cuts.retain(|&c| c > 0 && c < bytes.len());
    cuts.sort_unstable();
    cuts.dedup();

    let mut out = Vec::new();
    let mut start = 0;
    for cut in cuts {
        out.push(&bytes[start..cut]);
        start = cut;
    }
    out.push(&bytes[start..]);
    out
}

proptest! {
    #[test]
    fn any_chunking_yields_the_same_single_event(
        cuts in proptest::collection::vec(0..STREAM.len(), 0..12)
    ) {
        let mut scanner = OutputScanner::new(SessionId::from_raw(1));
        let mut events = Vec::new();

        for chunk in chunks(STREAM.as_bytes(), cuts) {
            events.extend(scanner.push(chunk));
        }
        events.extend(scanner.finish());

        prop_assert_eq!(events.len(), 1);
        prop_assert_eq!(events[0].path.as_str(), "/tmp/out/1_2_1.png");
        prop_assert_eq!(scanner.stdout(), STREAM.as_bytes());
    }
}
