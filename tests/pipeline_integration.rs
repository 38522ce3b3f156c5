//! End-to-end pipelines built only from the public API.

use palaver::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn contents(chat: &Chat) -> Vec<String> {
    chat.history().iter().map(|m| m.content.clone()).collect()
}

fn reply(content: &'static str, delay_ms: u64) -> Actor {
    Actor::new(Role::Assistant, move |_history, _store| async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok::<_, ActorError>(content.to_string())
    })
}

#[tokio::test]
async fn test_history_never_exceeds_limit() {
    let max_seen = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&max_seen);
    let turns = Var::<u32>::fresh();
    let counter = Actor::new(Role::Assistant, move |history, store| {
        let observed = Arc::clone(&observed);
        async move {
            observed.fetch_max(history.len(), Ordering::SeqCst);
            let n = store.get(turns).unwrap_or(0) + 1;
            store.set(turns, n);
            Ok::<_, ActorError>(n.to_string())
        }
    });

    let mut chat = Chat::new().with_history_limit(10);
    While::new(
        move |store| store.get(turns).unwrap_or(0) < 25,
        counter.pipeline(),
    )
    .execute(&mut chat)
    .await
    .unwrap();

    assert!(max_seen.load(Ordering::SeqCst) < 10);
    // every fifth write fills the history and cuts it back to the newest five
    let expected: Vec<String> = (21..=25).map(|n| n.to_string()).collect();
    assert_eq!(contents(&chat), expected);
}

#[tokio::test]
async fn test_trim_empties_history() {
    let mut chat = Chat::new();
    Chain::new()
        .then(user_prompt("a", false))
        .then(user_prompt("b", false))
        .execute(&mut chat)
        .await
        .unwrap();
    assert_eq!(chat.history().len(), 2);

    let summarize = Actor::new_multi(Role::Assistant, |_history, _store| async move {
        Ok::<_, ActorError>(Vec::new())
    });
    summarize.pipeline().trim(true).execute(&mut chat).await.unwrap();
    assert!(chat.history().is_empty());
}

#[tokio::test]
async fn test_chain_concatenates_outputs() {
    let a = Actor::new_multi(Role::Assistant, |_history, _store| async move {
        Ok::<_, ActorError>(vec![Message::assistant("a1"), Message::assistant("a2")])
    });
    let b = reply("b1", 0);

    let mut chat = Chat::new();
    Chain::new()
        .then(a.pipeline())
        .then(b.pipeline())
        .execute(&mut chat)
        .await
        .unwrap();

    assert_eq!(contents(&chat), vec!["a1", "a2", "b1"]);
}

#[tokio::test]
async fn test_parallel_merge_order_is_stable_under_delays() {
    for (first_delay, second_delay) in [(0, 25), (25, 0), (10, 10)] {
        let parallel = Parallel::new()
            .branch(
                Chain::new()
                    .then(reply("a1", first_delay).pipeline())
                    .then(reply("a2", 0).pipeline()),
            )
            .branch(reply("b1", second_delay).pipeline());

        let mut chat = Chat::new();
        Chain::new()
            .then(user_prompt("root", false))
            .then(parallel)
            .execute(&mut chat)
            .await
            .unwrap();

        assert_eq!(contents(&chat), vec!["root", "a1", "a2", "b1"]);
    }
}

#[tokio::test]
async fn test_parallel_failure_leaves_parent_untouched() {
    let broken = Actor::new(Role::Assistant, |_history, _store| async move {
        Err::<String, ActorError>("no backend".into())
    });
    let mut chat = Chat::new();
    user_prompt("before", false).execute(&mut chat).await.unwrap();
    let before = chat.history();

    let err = Parallel::new()
        .branch(reply("ok", 5).pipeline())
        .branch(broken.pipeline().retry_limit(2).backoff(Duration::from_millis(1)))
        .branch(reply("also ok", 0).pipeline())
        .execute(&mut chat)
        .await
        .unwrap_err();

    assert_eq!(chat.history(), before);
    assert_eq!(err.actor_error().to_string(), "no backend");
    assert!(matches!(err, PipelineError::Actor { attempts: 2, .. }));
}

#[test]
fn test_store_round_trip_and_unused_handle() {
    let name = Var::<String>::fresh();
    let unused = Var::<String>::fresh();
    let store = Store::new();

    store.set(name, "ada".to_string());
    assert_eq!(store.get(name).as_deref(), Some("ada"));
    assert_eq!(store.get(unused), None);
    assert_eq!(store.get(unused).unwrap_or_default(), "");
}

#[tokio::test]
async fn test_retry_exhaustion_through_a_chain() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let flaky = Actor::new(Role::Assistant, move |_history, _store| {
        let counter = Arc::clone(&counter);
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Err::<String, ActorError>(format!("failure {n}").into())
        }
    });

    let mut chat = Chat::new();
    let err = Chain::new()
        .then(user_prompt("go", false))
        .then(flaky.pipeline().retry_limit(3).backoff(Duration::from_millis(1)))
        .execute(&mut chat)
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(err.actor_error().to_string(), "failure 3");
    assert_eq!(err.actor(), flaky.id());
    assert_eq!(contents(&chat), vec!["go"]);

    calls.store(0, Ordering::SeqCst);
    let _ = flaky.pipeline().retry_limit(0).execute(&mut chat).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_while_with_parallel_body() {
    let rounds = Var::<u32>::fresh();
    let tick = Actor::new(Role::Assistant, move |_history, store| async move {
        let n = store.get(rounds).unwrap_or(0) + 1;
        store.set(rounds, n);
        Ok::<_, ActorError>(format!("round {n}"))
    });

    let body = Parallel::new()
        .branch(tick.pipeline())
        .branch(reply("critic", 1).pipeline());

    let mut chat = Chat::new();
    While::new(move |store| store.get(rounds).unwrap_or(0) < 3, body)
        .execute(&mut chat)
        .await
        .unwrap();

    assert_eq!(chat.store().get(rounds), Some(3));
    assert_eq!(
        contents(&chat),
        vec!["round 1", "critic", "round 2", "critic", "round 3", "critic"]
    );
}

#[tokio::test]
async fn test_if_inside_chain_reads_earlier_writes() {
    let approved = Var::<bool>::fresh();
    let reviewer = Actor::new(Role::Assistant, move |history, store| async move {
        let ok = history.last().is_some_and(|m| m.content.contains("tests"));
        store.set(approved, ok);
        Ok::<_, ActorError>(if ok { "lgtm" } else { "needs tests" }.to_string())
    });

    let pipeline = Arc::new(
        Chain::new()
            .then(reviewer.pipeline())
            .then(If::new(
                move |store| store.get(approved).unwrap_or(false),
                user_prompt("merging", false),
                user_prompt("revising", false),
            )),
    );

    let mut accepted = Chat::new();
    user_prompt("adds tests", false).execute(&mut accepted).await.unwrap();
    pipeline.execute(&mut accepted).await.unwrap();
    assert_eq!(contents(&accepted), vec!["adds tests", "lgtm", "merging"]);

    let mut rejected = Chat::new();
    user_prompt("quick fix", false).execute(&mut rejected).await.unwrap();
    pipeline.execute(&mut rejected).await.unwrap();
    assert_eq!(contents(&rejected), vec!["quick fix", "needs tests", "revising"]);
}

#[tokio::test]
async fn test_echo_sees_messages_in_write_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let actor = reply("visible", 0);

    let mut chat = Chat::new();
    actor
        .pipeline()
        .echo(move |m| sink.lock().unwrap().push((m.role, m.content.clone())))
        .execute(&mut chat)
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(Role::Assistant, "visible".to_string())]
    );
    assert_eq!(chat.history()[0].actor(), actor.id());
}

#[tokio::test]
async fn test_parallel_trim_heuristic_end_to_end() {
    let mut chat = Chat::new();
    user_prompt("long context", false).execute(&mut chat).await.unwrap();

    let summary = Actor::new(Role::Assistant, |history, _store| async move {
        Ok::<_, ActorError>(format!("summary of {}", history.len()))
    });
    let parallel = Parallel::new()
        .branch(summary.pipeline().trim(true))
        .branch(user_prompt("fresh start", true));
    assert!(parallel.trims());

    parallel.execute(&mut chat).await.unwrap();
    assert_eq!(contents(&chat), vec!["summary of 1", "fresh start"]);
}

#[tokio::test(start_paused = true)]
async fn test_parallel_branches_run_concurrently() {
    let parallel = Parallel::new()
        .branch(reply("first", 200).pipeline())
        .branch(
            Chain::new()
                .then(reply("second", 100).pipeline())
                .then(reply("third", 100).pipeline()),
        );

    let mut chat = Chat::new();
    let started = tokio::time::Instant::now();
    parallel.execute(&mut chat).await.unwrap();
    let elapsed = started.elapsed();

    // sequential branches would need 400 ms
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(300), "took {elapsed:?}");
    assert_eq!(contents(&chat), vec!["first", "second", "third"]);
}
