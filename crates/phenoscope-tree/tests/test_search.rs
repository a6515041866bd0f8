//! Search controller: supersession, debounce, view switching.

use std::sync::Arc;
use std::time::Duration;

use phenoscope_common::TermId;
use phenoscope_sources::SearchLimit;
use phenoscope_test_utils::{init_tracing, rec, ScriptedSource};
use phenoscope_tree::{SearchController, SearchOutcome, ViewMode};
use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};

fn setup(debounce: Duration) -> (Arc<ScriptedSource>, SearchController) {
    init_tracing();
    let source = Arc::new(ScriptedSource::hpo());
    let search = SearchController::new(source.clone(), debounce);
    (source, search)
}

fn result_ids(search: &SearchController) -> Vec<String> {
    search.results().iter().map(|h| h.id.to_string()).collect()
}

#[tokio::test]
async fn test_starts_browsing() {
    let (_source, search) = setup(Duration::ZERO);
    assert_eq!(search.mode(), ViewMode::Browsing);
    assert_eq!(search.query(), "");
    assert!(search.results().is_empty());
}

#[tokio::test]
async fn test_set_query_applies_results() {
    let (source, search) = setup(Duration::ZERO);
    source.with_search("abn", vec![rec("HP:0000002", "Abnormality of body height")]);

    let outcome = assert_ok!(search.set_query("abn").await);

    assert_eq!(outcome, SearchOutcome::Applied { generation: 1, hits: 1 });
    assert_eq!(search.mode(), ViewMode::Searching);
    assert_eq!(result_ids(&search), vec!["HP:0000002"]);
    assert_eq!(search.applied_generation(), Some(1));
}

#[tokio::test]
async fn test_stale_response_is_discarded() {
    let (source, search) = setup(Duration::ZERO);
    source.with_search("a", vec![rec("HP:A", "from a")]);
    source.with_search("ab", vec![rec("HP:AB", "from ab")]);
    source.hold_search("a");

    let (first, second) = tokio::join!(search.set_query("a"), async {
        source.wait_for_search_calls("a", 1).await;
        let second = search.set_query("ab").await;
        // "ab" is applied while "a" is still outstanding
        source.release_search("a");
        second
    });

    assert_eq!(assert_ok!(first), SearchOutcome::Superseded { generation: 1 });
    assert_eq!(assert_ok!(second), SearchOutcome::Applied { generation: 2, hits: 1 });
    assert_eq!(result_ids(&search), vec!["HP:AB"]);
    assert_eq!(search.query(), "ab");
}

#[tokio::test]
async fn test_clear_resets_to_browsing_and_drops_late_result() {
    let (source, search) = setup(Duration::ZERO);
    source.with_search("abn", vec![rec("HP:0000002", "Abnormality")]);
    source.hold_search("abn");

    let (late, cleared) = tokio::join!(search.set_query("abn"), async {
        source.wait_for_search_calls("abn", 1).await;
        let cleared = search.set_query("").await;
        source.release_search("abn");
        cleared
    });

    assert_eq!(assert_ok!(cleared), SearchOutcome::Cleared);
    assert!(matches!(assert_ok!(late), SearchOutcome::Superseded { .. }));
    assert_eq!(search.mode(), ViewMode::Browsing);
    assert!(search.results().is_empty());
}

#[tokio::test]
async fn test_failed_search_keeps_previous_results() {
    let (source, search) = setup(Duration::ZERO);
    source.with_search("seiz", vec![rec("HP:0001250", "Seizure")]);
    source.fail_search("seizu");

    assert_ok!(search.commit_query("seiz").await);
    assert_err!(search.commit_query("seizu").await);

    assert_eq!(search.mode(), ViewMode::Searching);
    assert_eq!(result_ids(&search), vec!["HP:0001250"]);
    assert_eq!(search.applied_generation(), Some(1));

    // Retry is user initiated and succeeds once the source recovers
    source.with_search("seizu", vec![rec("HP:0001250", "Seizure")]);
    assert_ok!(search.commit_query("seizu").await);
    assert_eq!(search.applied_generation(), Some(3));
}

#[tokio::test]
async fn test_stale_failure_is_not_reported() {
    let (source, search) = setup(Duration::ZERO);
    source.fail_search("x");
    source.hold_search("x");
    source.with_search("xy", vec![rec("HP:XY", "xy")]);

    let (stale, _) = tokio::join!(search.set_query("x"), async {
        source.wait_for_search_calls("x", 1).await;
        assert_ok!(search.set_query("xy").await);
        source.release_search("x");
    });

    assert_eq!(assert_ok!(stale), SearchOutcome::Superseded { generation: 1 });
    assert_eq!(result_ids(&search), vec!["HP:XY"]);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_skips_replaced_query() {
    let (source, search) = setup(Duration::from_millis(300));
    source.with_search("ab", vec![rec("HP:AB", "ab")]);

    let (first, second) = tokio::join!(search.set_query("a"), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.set_query("ab").await
    });

    assert_eq!(assert_ok!(first), SearchOutcome::Superseded { generation: 1 });
    assert_eq!(assert_ok!(second), SearchOutcome::Applied { generation: 2, hits: 1 });
    assert_eq!(source.search_calls("a"), 0, "debounced query must never reach the source");
    assert_eq!(source.search_calls("ab"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_commit_bypasses_debounce_and_uses_submit_limit() {
    let (source, search) = setup(Duration::from_secs(5));
    source.with_search("KRAS", vec![rec("NCBIGene:3845", "KRAS")]);

    let started = tokio::time::Instant::now();
    let (typed, (submitted, waited)) = tokio::join!(search.set_query("KRA"), async {
        tokio::task::yield_now().await;
        let submitted = search.commit_query("KRAS").await;
        (submitted, started.elapsed())
    });

    assert!(waited < Duration::from_secs(5), "submit must not wait for the debounce");
    assert_eq!(assert_ok!(typed), SearchOutcome::Superseded { generation: 1 });
    assert_eq!(assert_ok!(submitted), SearchOutcome::Applied { generation: 2, hits: 1 });
    assert_eq!(source.search_calls("KRA"), 0);
    assert_eq!(source.search_limits_seen(), vec![("KRAS".to_string(), SearchLimit::Unlimited)]);
}

#[tokio::test]
async fn test_typeahead_uses_typeahead_limit() {
    let (source, search) = setup(Duration::ZERO);
    assert_ok!(search.set_query("eye").await);
    assert_eq!(source.search_limits_seen(), vec![("eye".to_string(), SearchLimit::Limited(50))]);
}

#[tokio::test]
async fn test_empty_commit_clears() {
    let (source, search) = setup(Duration::ZERO);
    source.with_search("eye", vec![rec("HP:0000478", "Abnormality of the eye")]);
    assert_ok!(search.commit_query("eye").await);

    assert_eq!(assert_ok!(search.commit_query("").await), SearchOutcome::Cleared);
    assert_eq!(search.mode(), ViewMode::Browsing);
    assert!(search.results().is_empty());
    assert_eq!(search.applied_generation(), None);
}

#[tokio::test]
async fn test_hits_keep_extra_fields() {
    let (source, search) = setup(Duration::ZERO);
    let mut gene = rec("NCBIGene:7157", "TP53");
    gene.extra.insert("phenotypeCount".into(), serde_json::json!(120));
    source.with_search("tp53", vec![gene]);

    assert_ok!(search.set_query("tp53").await);
    let results = search.results();
    let hit = &results[0];
    assert_eq!(hit.id, TermId::from("NCBIGene:7157"));
    assert_eq!(hit.extra.get("phenotypeCount"), Some(&serde_json::json!(120)));
}

#[tokio::test]
async fn test_pending_until_current_search_resolves() {
    let (source, search) = setup(Duration::ZERO);
    source.with_search("abn", vec![rec("HP:0000002", "Abnormality")]);
    source.hold_search("abn");
    assert!(!search.is_pending());

    let (outcome, _) = tokio::join!(search.set_query("abn"), async {
        source.wait_for_search_calls("abn", 1).await;
        assert!(search.is_pending());
        source.release_search("abn");
    });

    assert_ok!(outcome);
    assert!(!search.is_pending());
}

#[tokio::test]
async fn test_failed_search_is_no_longer_pending() {
    let (source, search) = setup(Duration::ZERO);
    source.fail_search("abn");

    assert_err!(search.commit_query("abn").await);
    assert!(!search.is_pending());
    assert_eq!(search.mode(), ViewMode::Searching);
}

#[tokio::test]
async fn test_stale_result_keeps_newer_search_pending() {
    let (source, search) = setup(Duration::ZERO);
    source.hold_search("ab");

    let (first, second) = tokio::join!(search.set_query("ab"), async {
        source.wait_for_search_calls("ab", 1).await;
        // Clear while "ab" is outstanding, then type again and hold that too
        assert_ok!(search.set_query("").await);
        assert!(!search.is_pending());
        source.hold_search("abc");
        let next = search.set_query("abc");
        let (next, _) = tokio::join!(next, async {
            source.wait_for_search_calls("abc", 1).await;
            source.release_search("ab");
            tokio::task::yield_now().await;
            assert!(search.is_pending(), "stale response must not clear the newer search");
            source.release_search("abc");
        });
        next
    });

    assert!(matches!(assert_ok!(first), SearchOutcome::Superseded { .. }));
    assert_eq!(assert_ok!(second), SearchOutcome::Applied { generation: 3, hits: 0 });
    assert!(!search.is_pending());
}
