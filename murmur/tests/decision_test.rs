mod common;

use pretty_assertions::assert_eq;

use common::{bots_config, lock, old_post, probabilities, recent_post, FakeSocial, Harness};
use murmur::error::MurmurError;
use murmur::models::{ActivityType, NewActivity};
use murmur::services::TickOutcome;

const AUTHOR_ID: i64 = 500;

async fn activities(h: &Harness, bot_id: i64, kind: ActivityType) -> usize {
    h.db.list_bot_activities(bot_id, Some(kind), 0, 100)
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn like_only_tick_likes_records_and_remembers() {
    let h = Harness::new(
        FakeSocial::with_posts(vec![recent_post(10, AUTHOR_ID, "someone")]),
        bots_config(),
    )
    .await;
    let mut bot = h.seed_bot("calm_heron_1", 77, probabilities(0.5, 0.5, 0.5, 0.0)).await;
    bot.probabilities = probabilities(1.0, 0.0, 0.0, 0.0);

    let report = h.services.decisions.tick_bot(&bot).await.unwrap();

    assert_eq!(report.outcome, TickOutcome::Success);
    assert_eq!(report.post_id, Some(10));
    assert_eq!(*lock(&h.social.likes), vec![(10, 77)]);
    assert_eq!(activities(&h, bot.id, ActivityType::Like).await, 1);
    assert_eq!(h.memory.texts(bot.id), vec!["Ada Lovelace".to_string()]);
    assert!(lock(&h.social.added_comments).is_empty());
}

#[tokio::test]
async fn already_liked_post_is_not_liked_again() {
    let h = Harness::new(
        FakeSocial::with_posts(vec![recent_post(10, AUTHOR_ID, "someone")]),
        bots_config(),
    )
    .await;
    let mut bot = h.seed_bot("calm_heron_2", 78, probabilities(0.5, 0.5, 0.5, 0.0)).await;
    bot.probabilities = probabilities(1.0, 0.0, 0.0, 0.0);

    let first = h.services.decisions.tick_bot(&bot).await.unwrap();
    let second = h.services.decisions.tick_bot(&bot).await.unwrap();

    assert_eq!(first.outcome, TickOutcome::Success);
    assert_eq!(second.outcome, TickOutcome::NoAction);
    assert_eq!(lock(&h.social.likes).len(), 1);
    assert_eq!(activities(&h, bot.id, ActivityType::Like).await, 1);
}

#[tokio::test]
async fn no_recent_posts_does_nothing() {
    let h = Harness::new(FakeSocial::with_posts(vec![old_post(1), old_post(2)]), bots_config()).await;
    let mut bot = h.seed_bot("calm_heron_3", 79, probabilities(0.5, 0.5, 0.5, 0.0)).await;
    bot.probabilities = probabilities(1.0, 1.0, 1.0, 0.0);

    let report = h.services.decisions.tick_bot(&bot).await.unwrap();

    assert_eq!(report.outcome, TickOutcome::NoRecentPosts);
    assert_eq!(report.post_id, None);
    assert!(lock(&h.social.likes).is_empty());
    assert_eq!(h.llm.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn follow_after_comment_short_circuits_the_tick() {
    let h = Harness::new(
        FakeSocial::with_posts(vec![recent_post(10, AUTHOR_ID, "someone")]),
        bots_config(),
    )
    .await;
    let mut bot = h.seed_bot("calm_heron_4", 80, probabilities(0.5, 0.5, 0.5, 0.0)).await;
    bot.probabilities = probabilities(0.0, 1.0, 1.0, 0.0);

    let report = h.services.decisions.tick_bot(&bot).await.unwrap();

    assert_eq!(report.outcome, TickOutcome::Followed);
    assert_eq!(report.followed_user_id, Some(AUTHOR_ID));
    assert_eq!(*lock(&h.social.follows), vec![(AUTHOR_ID, 80)]);
    assert_eq!(lock(&h.social.added_comments).len(), 1);
    assert_eq!(activities(&h, bot.id, ActivityType::Comment).await, 1);
    assert_eq!(activities(&h, bot.id, ActivityType::Follow).await, 1);
}

#[tokio::test]
async fn follow_needs_the_comment_gate() {
    let h = Harness::new(
        FakeSocial::with_posts(vec![recent_post(10, AUTHOR_ID, "someone")]),
        bots_config(),
    )
    .await;
    let mut bot = h.seed_bot("calm_heron_5", 81, probabilities(0.5, 0.5, 0.5, 0.0)).await;
    bot.probabilities = probabilities(1.0, 0.0, 1.0, 0.0);

    let report = h.services.decisions.tick_bot(&bot).await.unwrap();

    assert_eq!(report.outcome, TickOutcome::Success);
    assert!(lock(&h.social.follows).is_empty());
}

#[tokio::test]
async fn own_post_author_is_never_followed() {
    let h = Harness::new(
        FakeSocial::with_posts(vec![recent_post(10, 81, "calm_heron_6")]),
        bots_config(),
    )
    .await;
    let mut bot = h.seed_bot("calm_heron_6", 81, probabilities(0.5, 0.5, 0.5, 0.0)).await;
    bot.probabilities = probabilities(0.0, 1.0, 1.0, 0.0);

    let report = h.services.decisions.tick_bot(&bot).await.unwrap();

    assert_eq!(report.outcome, TickOutcome::Success);
    assert!(lock(&h.social.follows).is_empty());
}

#[tokio::test]
async fn own_post_without_username_is_never_followed() {
    let mut post = recent_post(10, 85, "someone");
    post.user.username = None;
    let h = Harness::new(FakeSocial::with_posts(vec![post]), bots_config()).await;
    let mut bot = h.seed_bot("calm_heron_10", 85, probabilities(0.5, 0.5, 0.5, 0.0)).await;
    bot.probabilities = probabilities(0.0, 1.0, 1.0, 0.0);

    let report = h.services.decisions.tick_bot(&bot).await.unwrap();

    assert_eq!(report.outcome, TickOutcome::Success);
    assert!(lock(&h.social.follows).is_empty());
    assert_eq!(activities(&h, bot.id, ActivityType::Follow).await, 0);
}

#[tokio::test]
async fn follow_still_runs_when_the_comment_fails() {
    let h = Harness::new(
        FakeSocial::with_posts(vec![recent_post(10, AUTHOR_ID, "someone")]),
        bots_config(),
    )
    .await;
    h.llm.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    let mut bot = h.seed_bot("calm_heron_11", 86, probabilities(0.5, 0.5, 0.5, 0.0)).await;
    bot.probabilities = probabilities(0.0, 1.0, 1.0, 0.0);

    let report = h.services.decisions.tick_bot(&bot).await.unwrap();

    assert_eq!(report.outcome, TickOutcome::Followed);
    assert_eq!(*lock(&h.social.follows), vec![(AUTHOR_ID, 86)]);
    assert!(lock(&h.social.added_comments).is_empty());
    assert_eq!(activities(&h, bot.id, ActivityType::Comment).await, 0);
    assert_eq!(activities(&h, bot.id, ActivityType::Follow).await, 1);
}

#[tokio::test]
async fn one_tick_can_like_and_comment() {
    let h = Harness::new(
        FakeSocial::with_posts(vec![recent_post(10, AUTHOR_ID, "someone")]),
        bots_config(),
    )
    .await;
    let mut bot = h.seed_bot("calm_heron_12", 87, probabilities(0.5, 0.5, 0.5, 0.0)).await;
    bot.probabilities = probabilities(1.0, 1.0, 0.0, 0.0);

    let report = h.services.decisions.tick_bot(&bot).await.unwrap();

    assert_eq!(report.outcome, TickOutcome::Success);
    assert_eq!(report.post_id, Some(10));
    assert_eq!(*lock(&h.social.likes), vec![(10, 87)]);
    let comments = lock(&h.social.added_comments);
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].1.user_id, 87);
    drop(comments);
    assert_eq!(activities(&h, bot.id, ActivityType::Like).await, 1);
    assert_eq!(activities(&h, bot.id, ActivityType::Comment).await, 1);
    assert!(lock(&h.social.follows).is_empty());
}

#[tokio::test]
async fn comment_ceiling_blocks_further_comments() {
    let h = Harness::new(
        FakeSocial::with_posts(vec![recent_post(10, AUTHOR_ID, "someone")]),
        bots_config(),
    )
    .await;
    let mut bot = h.seed_bot("calm_heron_7", 82, probabilities(0.5, 0.5, 0.5, 0.0)).await;
    for n in 0..3 {
        h.db.record_activity(
            &NewActivity::new(bot.id, ActivityType::Comment, "10").with_content(format!("c{n}")),
        )
        .await
        .unwrap();
    }
    bot.probabilities = probabilities(0.0, 1.0, 0.0, 0.0);

    let report = h.services.decisions.tick_bot(&bot).await.unwrap();

    assert_eq!(report.outcome, TickOutcome::NoAction);
    assert!(lock(&h.social.added_comments).is_empty());
    assert_eq!(activities(&h, bot.id, ActivityType::Comment).await, 3);
}

#[tokio::test]
async fn failed_like_only_disables_that_gate() {
    let social = FakeSocial::with_posts(vec![recent_post(10, AUTHOR_ID, "someone")]);
    social.fail_like.store(true, std::sync::atomic::Ordering::SeqCst);
    let h = Harness::new(social, bots_config()).await;
    let mut bot = h.seed_bot("calm_heron_8", 83, probabilities(0.5, 0.5, 0.5, 0.0)).await;
    bot.probabilities = probabilities(1.0, 1.0, 0.0, 0.0);

    let report = h.services.decisions.tick_bot(&bot).await.unwrap();

    assert_eq!(report.outcome, TickOutcome::Success);
    assert_eq!(activities(&h, bot.id, ActivityType::Like).await, 0);
    assert_eq!(activities(&h, bot.id, ActivityType::Comment).await, 1);
    let comments = lock(&h.social.added_comments);
    assert_eq!(comments[0].0, 10);
    assert_eq!(comments[0].1.user_id, 83);
}

#[tokio::test]
async fn post_fetch_failure_aborts_the_tick() {
    let social = FakeSocial::new();
    social.fail_get_posts.store(true, std::sync::atomic::Ordering::SeqCst);
    let h = Harness::new(social, bots_config()).await;
    let bot = h.seed_bot("calm_heron_9", 84, probabilities(0.5, 0.5, 0.5, 0.0)).await;

    let err = h.services.decisions.tick(bot.id).await.unwrap_err();
    assert!(matches!(err, MurmurError::Transport(_)));
}

#[tokio::test]
async fn unlinked_bot_cannot_tick() {
    let h = Harness::new(FakeSocial::new(), bots_config()).await;
    let bot = h
        .db
        .create_bot(
            &common::new_bot("loose_kite_1", None, probabilities(0.5, 0.5, 0.5, 0.0)),
            chrono::Utc::now(),
        )
        .await
        .unwrap();

    let err = h.services.decisions.tick(bot.id).await.unwrap_err();
    assert!(matches!(err, MurmurError::Validation(_)));
}

#[tokio::test]
async fn missing_bot_is_not_found() {
    let h = Harness::new(FakeSocial::new(), bots_config()).await;
    let err = h.services.decisions.tick(4242).await.unwrap_err();
    assert!(matches!(err, MurmurError::NotFound(_)));
}
