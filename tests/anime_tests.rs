//! Integration tests for anime refresh, merge and relation handling.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anidb_sync::SyncContext;
use anidb_sync::clients::{Command, Response, ResultCode};
use anidb_sync::config::SyncConfig;
use anidb_sync::domain::RelationType;
use anidb_sync::services::{AnimeEntity, AnimeSource, SyncError};
use common::{FakeLink, FakeProbe, FakeTitles, context, temp_store};

fn anime_response(related: &str, types: &str) -> Response {
    Response::new(ResultCode::Anime).with_record([
        ("aid", "1"),
        ("episodes", "12"),
        ("year", "2020"),
        ("type", "TV Series"),
        ("rating", "850"),
        ("related_aid_list", related),
        ("related_aid_type", types),
    ])
}

#[tokio::test]
async fn test_refresh_merges_record_and_relations() {
    let store = temp_store("anime-merge").await;
    let link = FakeLink::new(|_| anime_response("2'3", "1'2"));
    let titles = FakeTitles::with(&[(1, "Show"), (2, "Show 2"), (3, "Show 0")]);
    let ctx = context(store.clone(), link.clone(), titles, FakeProbe::new());

    let anime = AnimeEntity::new(ctx, AnimeSource::Id(1)).await.unwrap();
    assert_eq!(anime.title(), "Show");
    assert!(anime.record().await.is_none());

    anime.update(true).await.unwrap();

    let record = anime.record().await.unwrap();
    assert_eq!(record.episodes, Some(12));
    assert_eq!(record.year.as_deref(), Some("2020"));
    assert_eq!(record.anime_type.as_deref(), Some("TV Series"));
    assert_eq!(record.rating, Some(850));

    match &link.commands()[0] {
        Command::Anime { aid, fields } => {
            assert_eq!(*aid, 1);
            assert!(fields.iter().any(|f| f == "related_aid_list"));
            assert!(fields.iter().any(|f| f == "episodes"));
        }
        other => panic!("unexpected command {other:?}"),
    }

    let mut related: Vec<(i32, RelationType)> = anime
        .relations()
        .await
        .into_iter()
        .map(|(kind, entity)| (entity.aid(), kind))
        .collect();
    related.sort_by_key(|(aid, _)| *aid);
    assert_eq!(
        related,
        vec![(2, RelationType::Sequel), (3, RelationType::Prequel)]
    );
}

#[tokio::test]
async fn test_repeated_merge_is_idempotent() {
    let store = temp_store("anime-idempotent").await;
    let link = FakeLink::new(|_| anime_response("2'3", "1'2"));
    let titles = FakeTitles::with(&[(1, "Show")]);
    let ctx = context(store.clone(), link.clone(), titles, FakeProbe::new());

    let anime = AnimeEntity::new(ctx, AnimeSource::Id(1)).await.unwrap();
    anime.update(true).await.unwrap();
    let first = anime.record().await.unwrap();
    anime.update(true).await.unwrap();
    let second = anime.record().await.unwrap();

    assert_eq!(link.count(), 2);
    assert_eq!(first.episodes, second.episodes);
    assert!(second.updated >= first.updated);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.anime, 1);
    assert_eq!(stats.relations, 2);
}

#[tokio::test]
async fn test_relations_follow_latest_response() {
    let store = temp_store("anime-relations").await;
    let calls = Arc::new(AtomicUsize::new(0));
    let link = FakeLink::new({
        let calls = Arc::clone(&calls);
        move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                anime_response("2'3", "1'2")
            } else {
                anime_response("3'4", "51'1")
            }
        }
    });
    let titles = FakeTitles::with(&[(1, "Show"), (3, "Show 0")]);
    let ctx = context(store.clone(), link, titles, FakeProbe::new());

    let anime = AnimeEntity::new(ctx, AnimeSource::Id(1)).await.unwrap();
    anime.update(true).await.unwrap();
    anime.update(true).await.unwrap();

    let mut rows: Vec<(i32, i32)> = store
        .get_anime_relations(1)
        .await
        .unwrap()
        .into_iter()
        .map(|row| (row.related_aid, row.relation_type))
        .collect();
    rows.sort_unstable();
    assert_eq!(rows, vec![(3, 51), (4, 1)]);

    // aid 4 is unknown to the title index and gets skipped.
    let related = anime.relations().await;
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].0, RelationType::SideStory);
    assert_eq!(related[0].1.aid(), 3);
}

#[tokio::test]
async fn test_missing_relation_fields_keep_stored_relations() {
    let store = temp_store("anime-keep-relations").await;
    let calls = Arc::new(AtomicUsize::new(0));
    let link = FakeLink::new({
        let calls = Arc::clone(&calls);
        move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                anime_response("2", "1")
            } else {
                Response::new(ResultCode::Anime).with_record([("episodes", "13")])
            }
        }
    });
    let ctx = context(
        store.clone(),
        link,
        FakeTitles::with(&[(1, "Show")]),
        FakeProbe::new(),
    );

    let anime = AnimeEntity::new(ctx, AnimeSource::Id(1)).await.unwrap();
    anime.update(true).await.unwrap();
    anime.update(true).await.unwrap();

    assert_eq!(anime.record().await.unwrap().episodes, Some(13));
    assert_eq!(store.get_anime_relations(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_updates_share_one_request() {
    let store = temp_store("anime-coalesce").await;
    let (link, open) = FakeLink::gated(|_| anime_response("", ""));
    let ctx = context(
        store,
        link.clone(),
        FakeTitles::with(&[(1, "Show")]),
        FakeProbe::new(),
    );

    let anime = AnimeEntity::new(ctx, AnimeSource::Id(1)).await.unwrap();
    anime.update(false).await.unwrap();
    anime.update(false).await.unwrap();

    let waiter = {
        let anime = Arc::clone(&anime);
        tokio::spawn(async move { anime.update(true).await })
    };
    tokio::task::yield_now().await;
    assert!(anime.record().await.is_none());

    open.send(true).unwrap();
    waiter.await.unwrap().unwrap();

    assert_eq!(link.count(), 1);
    assert_eq!(anime.record().await.unwrap().episodes, Some(12));
}

#[tokio::test]
async fn test_update_if_old_skips_fresh_record() {
    let store = temp_store("anime-fresh").await;
    let link = FakeLink::new(|_| anime_response("", ""));
    let ctx = context(
        store,
        link.clone(),
        FakeTitles::with(&[(1, "Show")]),
        FakeProbe::new(),
    );

    let anime = AnimeEntity::new(ctx, AnimeSource::Id(1)).await.unwrap();

    // Nothing cached: always blocks, even when asked not to.
    anime.update_if_old(false).await.unwrap();
    assert_eq!(link.count(), 1);
    assert!(anime.record().await.is_some());

    anime.update_if_old(true).await.unwrap();
    assert_eq!(anime.episode_count().await, Some(12));
    assert_eq!(link.count(), 1);
}

#[tokio::test]
async fn test_update_if_old_refreshes_stale_record() {
    let store = temp_store("anime-stale").await;
    let link = FakeLink::new(|_| anime_response("", ""));
    let settings = SyncConfig {
        anime_max_age_days: 0,
        ..SyncConfig::default()
    };
    let ctx = Arc::new(SyncContext::new(
        store,
        link.clone(),
        FakeTitles::with(&[(1, "Show")]),
        FakeProbe::new(),
        settings,
    ));

    let anime = AnimeEntity::new(ctx, AnimeSource::Id(1)).await.unwrap();
    anime.update_if_old(true).await.unwrap();
    anime.update_if_old(true).await.unwrap();

    assert_eq!(link.count(), 2);
}

#[tokio::test]
async fn test_unknown_anime_is_rejected() {
    let store = temp_store("anime-unknown").await;
    let link = FakeLink::new(|_| Response::new(ResultCode::NoSuchAnime));
    let ctx = context(store, link.clone(), FakeTitles::with(&[]), FakeProbe::new());

    let result = AnimeEntity::new(Arc::clone(&ctx), AnimeSource::Name("Nothing")).await;
    assert!(matches!(result, Err(SyncError::UnknownAnime(_))));
    assert_eq!(link.count(), 0);
}

#[tokio::test]
async fn test_no_such_anime_leaves_cache_empty() {
    let store = temp_store("anime-330").await;
    let link = FakeLink::new(|_| Response::new(ResultCode::NoSuchAnime));
    let ctx = context(
        store.clone(),
        link,
        FakeTitles::with(&[(1, "Show")]),
        FakeProbe::new(),
    );

    let anime = AnimeEntity::new(ctx, AnimeSource::Name("Show")).await.unwrap();
    anime.update(true).await.unwrap();

    assert!(anime.record().await.is_none());
    assert_eq!(store.stats().await.unwrap().anime, 0);
}
