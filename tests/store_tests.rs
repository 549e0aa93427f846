//! Integration tests for the cache store.

mod common;

use anidb_sync::db::CacheStats;
use anidb_sync::entities::{anime, episode, file};
use common::temp_store;
use sea_orm::Value;

#[tokio::test]
async fn test_store_opens_empty() {
    let store = temp_store("store-empty").await;
    store.ping().await.unwrap();
    assert_eq!(store.stats().await.unwrap(), CacheStats::default());
}

#[tokio::test]
async fn test_anime_merge_updates_in_place() {
    let store = temp_store("store-anime").await;
    store
        .merge_anime(1, vec![(anime::Column::Episodes, Value::from(12))], None)
        .await
        .unwrap();
    let merged = store
        .merge_anime(1, vec![(anime::Column::Year, Value::from("2020"))], Some(vec![(2, 1)]))
        .await
        .unwrap();

    assert_eq!(merged.episodes, Some(12));
    assert_eq!(merged.year.as_deref(), Some("2020"));
    let stats = store.stats().await.unwrap();
    assert_eq!((stats.anime, stats.relations), (1, 1));
}

#[tokio::test]
async fn test_episode_number_moves_to_new_id() {
    let store = temp_store("store-episode").await;
    store
        .merge_episode(10, 1, "3".to_string(), vec![(episode::Column::Length, Value::from(24))])
        .await
        .unwrap();
    store
        .merge_episode(11, 1, "3".to_string(), Vec::new())
        .await
        .unwrap();

    assert!(store.get_episode(10).await.unwrap().is_none());
    let found = store.find_episode_by_number(1, "3").await.unwrap().unwrap();
    assert_eq!(found.eid, 11);
    assert_eq!(store.stats().await.unwrap().episodes, 1);
}

#[tokio::test]
async fn test_file_merge_keeps_copies_at_different_paths() {
    let store = temp_store("store-file-copies").await;
    let first = store
        .merge_file(
            None,
            None,
            vec![
                (file::Column::Path, Value::from("/a.mkv")),
                (file::Column::Fid, Value::from(Some(5))),
            ],
        )
        .await
        .unwrap();
    let second = store
        .merge_file(
            None,
            Some(5),
            vec![
                (file::Column::Path, Value::from("/b.mkv")),
                (file::Column::Fid, Value::from(Some(5))),
            ],
        )
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert!(store.get_file(first.id).await.unwrap().is_some());
    assert_eq!(store.find_file_by_path("/a.mkv").await.unwrap().unwrap().id, first.id);
    assert_eq!(store.find_file_by_path("/b.mkv").await.unwrap().unwrap().id, second.id);
    assert_eq!(store.stats().await.unwrap().files, 2);
}

#[tokio::test]
async fn test_file_merge_drops_duplicate_pathless_ids() {
    let store = temp_store("store-file-pathless").await;
    let stray = store
        .merge_file(None, None, vec![(file::Column::Fid, Value::from(Some(5)))])
        .await
        .unwrap();
    let other = store
        .merge_file(None, None, vec![(file::Column::Fid, Value::from(Some(5)))])
        .await
        .unwrap();
    let kept = store
        .merge_file(
            Some(other.id),
            Some(5),
            vec![(file::Column::Size, Value::from(300_i64))],
        )
        .await
        .unwrap();

    assert_eq!(kept.id, other.id);
    assert!(store.get_file(stray.id).await.unwrap().is_none());
    assert_eq!(store.find_file_by_fid(5).await.unwrap().unwrap().id, other.id);
    assert_eq!(store.stats().await.unwrap().files, 1);
}

#[tokio::test]
async fn test_generic_file_lookup() {
    let store = temp_store("store-generic").await;
    store
        .merge_file(
            None,
            None,
            vec![
                (file::Column::Aid, Value::from(1)),
                (file::Column::Eid, Value::from(101)),
                (file::Column::IsGeneric, Value::from(true)),
            ],
        )
        .await
        .unwrap();

    assert!(store.find_generic_file(1, 101).await.unwrap().is_some());
    assert!(store.find_generic_file(1, 102).await.unwrap().is_none());
}
