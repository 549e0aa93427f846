use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, Value,
};
use tracing::debug;

use crate::entities::{anime, anime_relation, prelude::*};

/// Incoming relation: related anime id and relation type code.
pub type RelationInput = (i32, i32);

/// Row-level changes that turn the cached relation set into the incoming one.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RelationPlan {
    /// Existing row id and its new relation type.
    pub update: Vec<(i32, i32)>,
    pub insert: Vec<RelationInput>,
    /// Existing row ids.
    pub delete: Vec<i32>,
}

/// Diffs cached relation rows against the incoming list, keyed by related
/// anime id. Duplicate rows for the same related id are deleted.
#[must_use]
pub fn plan_relations(existing: &[anime_relation::Model], incoming: &[RelationInput]) -> RelationPlan {
    let mut wanted: Vec<RelationInput> = Vec::with_capacity(incoming.len());
    for &(related, kind) in incoming {
        if !wanted.iter().any(|(r, _)| *r == related) {
            wanted.push((related, kind));
        }
    }

    let mut plan = RelationPlan::default();
    let mut claimed = HashSet::new();
    for row in existing {
        let target = wanted.iter().find(|(r, _)| *r == row.related_aid);
        match target {
            Some(&(related, kind)) if claimed.insert(related) => {
                if row.relation_type != kind {
                    plan.update.push((row.id, kind));
                }
            }
            _ => plan.delete.push(row.id),
        }
    }
    plan.insert = wanted
        .into_iter()
        .filter(|(related, _)| !claimed.contains(related))
        .collect();
    plan
}

pub struct AnimeRepository {
    conn: DatabaseConnection,
}

impl AnimeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, aid: i32) -> Result<Option<anime::Model>> {
        Ok(CachedAnime::find_by_id(aid).one(&self.conn).await?)
    }

    pub async fn relations(&self, aid: i32) -> Result<Vec<anime_relation::Model>> {
        Ok(AnimeRelation::find()
            .filter(anime_relation::Column::AnimeAid.eq(aid))
            .order_by_asc(anime_relation::Column::Id)
            .all(&self.conn)
            .await?)
    }

    /// Writes converted scalar fields and, when given, reconciles the
    /// relation set, all in one transaction. Bumps `updated`.
    pub async fn merge(
        &self,
        aid: i32,
        values: Vec<(anime::Column, Value)>,
        relations: Option<Vec<RelationInput>>,
    ) -> Result<anime::Model> {
        let txn = self.conn.begin().await?;

        let existing = CachedAnime::find_by_id(aid).one(&txn).await?;
        let is_new = existing.is_none();
        let mut active: anime::ActiveModel = match existing {
            Some(model) => model.into(),
            None => anime::ActiveModel {
                aid: Set(aid),
                ..Default::default()
            },
        };
        for (column, value) in values {
            active.set(column, value);
        }
        active.updated = Set(Utc::now());

        let model = if is_new {
            active.insert(&txn).await?
        } else {
            active.update(&txn).await?
        };

        if let Some(incoming) = relations {
            reconcile_relations(&txn, aid, &incoming).await?;
        }

        txn.commit().await?;
        Ok(model)
    }
}

async fn reconcile_relations<C: ConnectionTrait>(
    conn: &C,
    aid: i32,
    incoming: &[RelationInput],
) -> Result<()> {
    let existing = AnimeRelation::find()
        .filter(anime_relation::Column::AnimeAid.eq(aid))
        .order_by_asc(anime_relation::Column::Id)
        .all(conn)
        .await?;

    let plan = plan_relations(&existing, incoming);
    debug!(
        aid,
        update = plan.update.len(),
        insert = plan.insert.len(),
        delete = plan.delete.len(),
        "Reconciling anime relations"
    );

    if !plan.delete.is_empty() {
        AnimeRelation::delete_many()
            .filter(anime_relation::Column::Id.is_in(plan.delete))
            .exec(conn)
            .await?;
    }

    for (id, kind) in plan.update {
        anime_relation::ActiveModel {
            id: Set(id),
            relation_type: Set(kind),
            ..Default::default()
        }
        .update(conn)
        .await?;
    }

    for (related, kind) in plan.insert {
        anime_relation::ActiveModel {
            anime_aid: Set(aid),
            related_aid: Set(related),
            relation_type: Set(kind),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, related_aid: i32, relation_type: i32) -> anime_relation::Model {
        anime_relation::Model {
            id,
            anime_aid: 1,
            related_aid,
            relation_type,
        }
    }

    #[test]
    fn test_plan_replaces_relation_set() {
        let existing = [row(10, 1, 1), row(11, 2, 2)];
        let plan = plan_relations(&existing, &[(2, 51), (3, 62)]);

        assert_eq!(plan.delete, vec![10]);
        assert_eq!(plan.update, vec![(11, 51)]);
        assert_eq!(plan.insert, vec![(3, 62)]);
    }

    #[test]
    fn test_plan_unchanged_is_empty() {
        let existing = [row(10, 1, 1), row(11, 2, 2)];
        let plan = plan_relations(&existing, &[(1, 1), (2, 2)]);
        assert_eq!(plan, RelationPlan::default());
    }

    #[test]
    fn test_plan_drops_duplicates() {
        let existing = [row(10, 5, 1), row(11, 5, 1)];
        let plan = plan_relations(&existing, &[(5, 1), (6, 2), (6, 2)]);

        assert_eq!(plan.delete, vec![11]);
        assert!(plan.update.is_empty());
        assert_eq!(plan.insert, vec![(6, 2)]);
    }

    #[test]
    fn test_plan_empty_incoming_deletes_all() {
        let existing = [row(10, 5, 1)];
        let plan = plan_relations(&existing, &[]);
        assert_eq!(plan.delete, vec![10]);
        assert!(plan.insert.is_empty());
    }
}
