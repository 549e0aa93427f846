use crate::entities::prelude::*;
use crate::entities::{anime_relation, episode, file};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(CachedAnime)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(AnimeRelation)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(CachedEpisode)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(CachedFile)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_anime_relation_anime_aid")
                    .table(AnimeRelation)
                    .col(anime_relation::Column::AnimeAid)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_episode_aid_epno")
                    .table(CachedEpisode)
                    .col(episode::Column::Aid)
                    .col(episode::Column::Epno)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_file_fid")
                    .table(CachedFile)
                    .col(file::Column::Fid)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_file_path")
                    .table(CachedFile)
                    .col(file::Column::Path)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_file_aid_eid")
                    .table(CachedFile)
                    .col(file::Column::Aid)
                    .col(file::Column::Eid)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CachedFile).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CachedEpisode).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AnimeRelation).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CachedAnime).to_owned())
            .await
    }
}
