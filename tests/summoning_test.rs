mod helpers;

use dojo::extract::{rules, ExtractionSource};
use dojo::ledger::types::{LedgerKind, SummoningMetadata};
use dojo::query::FORMAT_HINT;

#[tokio::test]
async fn statement_creates_subject_and_fact_under_one_receipt() {
    let s = helpers::offline_summoner();

    let out = helpers::summon(&s, "Joe's coffee is Espresso").await;

    let registry = out.registry_entry.expect("registry entry");
    let vault = out.vault_entry.expect("vault entry");
    assert!(out.created_new_registry_entry);
    assert_eq!(registry.uri, "dojo.con.joe");
    assert_eq!(registry.display_name, "Joe");
    assert_eq!(vault.uri, "dojo.con.joe");
    assert_eq!(vault.key, "coffee");
    assert_eq!(vault.value.as_deref(), Some("Espresso"));
    assert_eq!(vault.audit_ledger_id, out.ledger_entry.id);
    assert_eq!(registry.last_ledger_id, out.ledger_entry.id);
    assert_eq!(out.ledger_entry.target_uri.as_deref(), Some("dojo.con.joe"));
}

#[tokio::test]
async fn follow_up_question_is_answered_from_the_vault() {
    let s = helpers::offline_summoner();
    helpers::summon(&s, "Joe's coffee is Espresso").await;

    let out = helpers::summon(&s, "What is Joe's coffee?").await;

    assert!(out.extraction.is_question);
    assert_eq!(out.ledger_entry.kind, LedgerKind::QuestionRequest);
    assert_eq!(out.ledger_entry.target_uri.as_deref(), Some("dojo.con.joe"));
    assert!(out.message.contains("Espresso"), "got {:?}", out.message);
    assert!(out.vault_entry.is_none());
}

#[tokio::test]
async fn missing_key_lists_known_facts() {
    let s = helpers::offline_summoner();
    helpers::summon(&s, "Joe's coffee is Espresso").await;

    let out = helpers::summon(&s, "What is Joe's birthday?").await;

    assert_eq!(
        out.message,
        "I do not have Birthday for Joe yet. Known facts: Coffee."
    );
}

#[tokio::test]
async fn delete_keeps_key_and_points_at_deletion() {
    let s = helpers::offline_summoner();
    helpers::summon(&s, "Joe's coffee is Espresso").await;
    let joe = helpers::uri("dojo.con.joe");

    let deleted = s.delete_attribute(&joe, "coffee").await.unwrap();

    let deletion = &s.get_recent_ledger_entries(1).await.unwrap()[0];
    assert_eq!(deletion.metadata.trigger.as_deref(), Some("delete"));
    assert_eq!(deleted.value, None);
    assert_eq!(deleted.audit_ledger_id, deletion.id);

    let row = helpers::fact(&s, &joe, "coffee").await.expect("row survives");
    assert_eq!(row.value, None);
    assert_eq!(row.audit_ledger_id, deletion.id);

    let live = s.get_attributes(&joe, false).await.unwrap();
    assert!(live.is_empty());
}

#[tokio::test]
async fn rule_match_is_unaffected_by_a_dead_endpoint() {
    let s = helpers::offline_summoner();

    let out = helpers::summon(&s, "Gate code for Railroad is 1234").await;

    assert_eq!(out.extraction, rules::extract("Gate code for Railroad is 1234"));
    assert_eq!(out.extraction.source, ExtractionSource::Rules);
    let vault = out.vault_entry.expect("stored");
    assert_eq!(vault.uri, "dojo.ent.railroad");
    assert_eq!(vault.key, "gate_code");
    assert_eq!(vault.value.as_deref(), Some("1234"));
    assert!(vault.sensitive);
}

#[tokio::test]
async fn questions_never_write_facts() {
    let s = helpers::offline_summoner();
    helpers::summon(&s, "Joe's coffee is Espresso").await;
    let joe = helpers::uri("dojo.con.joe");
    let before = s.get_attributes(&joe, true).await.unwrap();

    for q in ["Who is Joe?", "What is coffee?", "What is Joe's tea?", "What?"] {
        let out = helpers::summon(&s, q).await;
        assert_eq!(out.ledger_entry.kind, LedgerKind::QuestionRequest, "{q}");
    }

    assert_eq!(s.get_attributes(&joe, true).await.unwrap(), before);
}

#[tokio::test]
async fn unrecognized_question_gets_format_hint() {
    let s = helpers::offline_summoner();
    let out = helpers::summon(&s, "Why?").await;
    assert_eq!(out.message, FORMAT_HINT);
}

#[tokio::test]
async fn unparseable_statement_is_still_logged() {
    let s = helpers::offline_summoner();

    let out = helpers::summon(&s, "it is raining").await;

    assert_eq!(out.ledger_entry.kind, LedgerKind::StatementInput);
    assert!(out.extraction.triple.is_none());
    assert_eq!(out.extraction.confidence, 0.0);
    assert!(out.message.starts_with("Unable to extract a fact"));
    assert_eq!(out.ledger_entry.metadata.confidence, Some(0.0));
    assert!(s.get_ledger_entry(&out.ledger_entry.id).await.unwrap().is_some());
}

#[tokio::test]
async fn caller_metadata_is_kept_verbatim() {
    let s = helpers::offline_summoner();
    let metadata = SummoningMetadata {
        location: Some("47.6,-122.3".into()),
        trigger: Some("widget".into()),
        confidence: Some(0.4),
        ..Default::default()
    };

    let out = s
        .process_summoning("Joe's coffee is Espresso", metadata.clone())
        .await
        .unwrap();

    let stored = s.get_ledger_entry(&out.ledger_entry.id).await.unwrap().unwrap();
    assert_eq!(stored.metadata, metadata);
}

#[tokio::test]
async fn overwrite_keeps_history_in_order() {
    let s = helpers::offline_summoner();
    let first = helpers::summon(&s, "Joe's coffee is Espresso").await;
    let second = helpers::summon(&s, "Set Joe's coffee to Latte").await;
    assert!(!second.created_new_registry_entry);

    let joe = helpers::uri("dojo.con.joe");
    let history = s.get_attribute_history(&joe, "Coffee").await.unwrap();

    let values: Vec<_> = history.iter().map(|h| h.value.as_deref()).collect();
    assert_eq!(values, [Some("Espresso"), Some("Latte")]);
    assert_eq!(history[0].ledger_id, first.ledger_entry.id);
    assert_eq!(
        history[1].origin_text.as_deref(),
        Some("Set Joe's coffee to Latte")
    );
}

#[tokio::test]
async fn display_name_reaches_the_same_subject_across_keys() {
    let s = helpers::offline_summoner();
    helpers::summon(&s, "Gate code for Railroad is 1234").await;
    let out = helpers::summon(&s, "Railroad hours is 9 to 5").await;

    assert_eq!(out.vault_entry.unwrap().uri, "dojo.ent.railroad");
    assert!(!out.created_new_registry_entry);
}

#[tokio::test]
async fn blank_text_is_rejected() {
    let s = helpers::offline_summoner();
    assert!(s
        .process_summoning("   ", SummoningMetadata::default())
        .await
        .is_err());
    assert!(s.get_recent_ledger_entries(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn ghost_compacts_text_without_an_endpoint() {
    let s = helpers::offline_summoner();
    let out = helpers::summon(
        &s,
        "Joe's coffee is Espresso. He also mentioned he likes it with oat milk.",
    )
    .await;

    let ghosted = s.ghost(&out.ledger_entry.id, 80).await.unwrap();

    assert_eq!(ghosted.id, out.ledger_entry.id);
    assert_eq!(ghosted.raw_text, "Joe's coffee is Espresso.");
    assert!(ghosted.ghosted_at.is_some());
}

#[tokio::test]
async fn search_finds_text_names_and_values() {
    let s = helpers::offline_summoner();
    helpers::summon(&s, "Joe's coffee is Espresso").await;

    let hits = s.search("espresso", 10).await.unwrap();
    assert_eq!(hits.ledger.len(), 1);
    assert_eq!(hits.attributes.len(), 1);

    let hits = s.search("joe", 10).await.unwrap();
    assert_eq!(hits.records.len(), 1);

    assert!(s.search("zzz", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn ask_answers_without_logging() {
    let s = helpers::offline_summoner();
    helpers::summon(&s, "Joe's coffee is Espresso").await;
    helpers::summon(&s, "Ann's coffee is Latte").await;

    let answer = s.ask("What is coffee?").await.unwrap();

    assert!(answer.message.starts_with("Coffee:"), "got {:?}", answer.message);
    assert!(answer.message.contains("Espresso"));
    assert!(answer.message.contains("Latte"));
    assert_eq!(s.get_recent_ledger_entries(10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn exact_name_wins_over_many_similar_names() {
    let s = helpers::offline_summoner();
    let first = helpers::summon(&s, "Al's gate code is 4321").await;
    let al = first.vault_entry.expect("stored").uri;
    for name in [
        "Alex", "Alan", "Alice", "Albert", "Alfred", "Alma", "Sal", "Hal", "Val", "Walt", "Dale",
        "Calvin",
    ] {
        helpers::summon(&s, &format!("{name}'s coffee is Latte")).await;
    }

    let answer = helpers::summon(&s, "What is Al's gate code?").await;
    assert_eq!(answer.ledger_entry.target_uri.as_deref(), Some(al.as_str()));
    assert!(answer.message.contains("4321"), "got {:?}", answer.message);

    let more = helpers::summon(&s, "Al's tea is Green").await;
    assert_eq!(more.vault_entry.expect("stored").uri, al);
    assert!(!more.created_new_registry_entry);
}
