use crate::render::{self, DisplayRow};
use jamroom_protocol as proto;

/// The search results region.
///
/// Every search gets a sequence number from [`Results::begin`]. A completed
/// search only replaces the rows if no newer search has been started since,
/// so the region always shows the answer to the most recently issued query no
/// matter what order the responses arrive in.
#[derive(Debug, Default)]
pub struct Results {
    latest: u64,
    rows: Vec<DisplayRow>,
}

impl Results {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> u64 {
        self.latest = self.latest.wrapping_add(1);
        self.latest
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest
    }

    /// Replace the rows with `response`, unless `seq` is stale.
    /// Returns whether anything changed.
    pub fn complete(&mut self, seq: u64, response: &proto::SearchResponse) -> bool {
        if !self.is_current(seq) {
            return false;
        }
        self.rows = render::rows(response);
        true
    }

    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::Results;
    use jamroom_protocol as proto;

    fn response(names: &[&str]) -> proto::SearchResponse {
        let items = names
            .iter()
            .map(|name| proto::Track {
                name: name.to_string(),
                album: proto::Album {
                    name: format!("{} album", name),
                    images: vec![proto::Image {
                        url: format!("https://img/{}", name),
                        width: Some(64),
                        height: Some(64),
                    }],
                },
                artists: vec![proto::Artist {
                    name: format!("{} artist", name),
                }],
            })
            .collect();
        proto::SearchResponse {
            tracks: proto::TrackPage { items },
        }
    }

    #[test]
    fn two_tracks_give_two_rows_in_order() {
        let mut results = Results::new();
        let seq = results.begin();
        assert!(results.complete(seq, &response(&["first", "second"])));

        let rows = results.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].song, "first");
        assert_eq!(rows[0].album, "first album");
        assert_eq!(rows[0].artists, "first artist");
        assert_eq!(rows[0].thumbnail.as_deref(), Some("https://img/first"));
        assert_eq!(rows[1].song, "second");
    }

    #[test]
    fn new_results_replace_old_rows() {
        let mut results = Results::new();
        let seq = results.begin();
        results.complete(seq, &response(&["a", "b", "c"]));
        let seq = results.begin();
        results.complete(seq, &response(&["d"]));
        assert_eq!(results.rows().len(), 1);
        assert_eq!(results.rows()[0].song, "d");
    }

    #[test]
    fn empty_response_clears_region() {
        let mut results = Results::new();
        let seq = results.begin();
        results.complete(seq, &response(&["a"]));
        let seq = results.begin();
        assert!(results.complete(seq, &proto::SearchResponse::empty()));
        assert!(results.rows().is_empty());
    }

    #[test]
    fn latest_issued_search_wins_when_responses_arrive_out_of_order() {
        let mut results = Results::new();
        let first = results.begin();
        let second = results.begin();

        // second response arrives first and is applied
        assert!(results.complete(second, &response(&["r2"])));
        // first response arrives late and is dropped
        assert!(!results.complete(first, &response(&["r1"])));

        assert_eq!(results.rows().len(), 1);
        assert_eq!(results.rows()[0].song, "r2");
    }

    #[test]
    fn stale_response_does_not_clear_previous_rows() {
        let mut results = Results::new();
        let first = results.begin();
        results.complete(first, &response(&["kept"]));
        let _pending = results.begin();
        assert!(!results.complete(first, &response(&[])));
        assert_eq!(results.rows()[0].song, "kept");
    }
}
