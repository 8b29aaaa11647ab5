use api_toolkit::localization::StaticTranslator;
use api_toolkit::transformer::SerdeTransformer;
use api_toolkit::{
    ApiError, ApiVersion, Bound, DbRepository, Localizer, Paginated, ResourceManager, ResourceRequest,
    RouteBinding, ToolkitConfig, Transformer, VersionBinder, VersionRegistry, VersionSource, bind_version,
    localize_errors,
};
use axum::{
    Extension, Json, Router,
    extract::{FromRef, State},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{TimeZone, Utc};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

pub mod comment_entity;
pub mod post_entity;
pub mod resources;
pub mod user_entity;

use resources::{PostOutput, Posts};

/// Route library logs to the test harness; `RUST_LOG=api_toolkit=debug` shows pipeline steps
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Migrated database holding three users, six posts and four comments
pub async fn setup_seeded_db() -> Result<DatabaseConnection, DbErr> {
    let db = setup_test_db().await?;
    seed(&db).await?;
    Ok(db)
}

pub fn post_uuid(id: i32) -> Uuid {
    Uuid::from_u128(u128::try_from(id).unwrap())
}

pub async fn seed(db: &DatabaseConnection) -> Result<(), DbErr> {
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
        user_entity::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            email: Set(format!("{name}@example.com")),
            settings: Set(json!({})),
        }
        .insert(db)
        .await?;
    }

    let posts = [
        (1, 1, "Alpha", "published", true, 10, 3),
        (2, 2, "Bravo", "published", true, 50, 1),
        (3, 1, "Charlie", "draft", false, 5, 5),
        (4, 3, "Delta", "published", true, 20, 2),
        (5, 2, "Echo", "draft", false, 0, 4),
        (6, 1, "Foxtrot", "archived", false, 99, 6),
    ];
    for (id, user_id, title, status, published, views, day) in posts {
        post_entity::ActiveModel {
            id: Set(id),
            uuid: Set(post_uuid(id)),
            user_id: Set(user_id),
            title: Set(title.to_string()),
            status: Set(status.to_string()),
            published: Set(published),
            views: Set(views),
            created_at: Set(Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()),
        }
        .insert(db)
        .await?;
    }

    let comments = [(1, 1, 2, "Nice"), (2, 1, 3, "Agreed"), (3, 2, 1, "Thanks"), (4, 4, 1, "Hmm")];
    for (id, post_id, user_id, body) in comments {
        comment_entity::ActiveModel {
            id: Set(id),
            post_id: Set(post_id),
            user_id: Set(user_id),
            body: Set(body.to_string()),
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<ResourceManager<Posts>>,
    pub repository: DbRepository<post_entity::Entity>,
    pub binding: Arc<RouteBinding<Posts>>,
}

impl FromRef<AppState> for Arc<RouteBinding<Posts>> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.binding)
    }
}

/// `v1` (default) renders posts as-is, `v2` renames `title` to `headline`
pub fn version_registry() -> VersionRegistry {
    let mut registry = VersionRegistry::new();
    registry
        .register("v1", true, |b| {
            b.bind::<dyn Transformer<PostOutput>>(Arc::new(SerdeTransformer));
        })
        .unwrap();
    registry
        .register("v2", false, |b| {
            b.bind::<dyn Transformer<PostOutput>>(Arc::new(|post: &PostOutput| {
                json!({ "uuid": post.uuid, "headline": post.title, "views": post.views })
            }));
        })
        .unwrap();
    registry
}

pub fn translator() -> StaticTranslator {
    StaticTranslator::new()
        .with("de", "resource.not_found", "Eintrag nicht gefunden")
        .with("de", "validation.failed", "Die Eingabe ist ungültig")
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    let posts = Arc::new(ResourceManager::new(Posts).unwrap());
    let repository = DbRepository::<post_entity::Entity>::new(db);
    let binding = Arc::new(RouteBinding::new("post", Arc::clone(&posts), Arc::new(repository.clone())));
    let state = AppState {
        posts,
        repository,
        binding,
    };

    let localizer = Localizer::new(Arc::new(translator()), ["en", "de"], "en");
    let binder = VersionBinder::new(Arc::new(version_registry()), VersionSource::default());

    let api = Router::new()
        .route("/posts", get(index_posts))
        .route("/posts/{post}", get(show_post))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(binder, bind_version))
        .layer(middleware::from_fn_with_state(localizer, localize_errors))
        .layer(Extension(Arc::new(ToolkitConfig::new().with_max_count(50))))
}

async fn index_posts(
    State(state): State<AppState>,
    version: ApiVersion,
    request: ResourceRequest,
) -> Result<Response, ApiError> {
    let page: Paginated<PostOutput> = state.posts.get_paginator(&request, &state.repository).await?;
    let transformer = version.resolve::<dyn Transformer<PostOutput>>()?;
    Ok(page.transform(transformer.as_ref()).into_response())
}

async fn show_post(Bound(post): Bound<Posts>) -> Json<PostOutput> {
    Json(post)
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateBlogTables)]
    }
}

pub struct CreateBlogTables;

#[async_trait::async_trait]
impl MigrationName for CreateBlogTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_blog_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateBlogTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(user_entity::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(user_entity::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(user_entity::Column::Name).string().not_null())
                    .col(ColumnDef::new(user_entity::Column::Email).string().not_null())
                    .col(ColumnDef::new(user_entity::Column::Settings).json().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(post_entity::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(post_entity::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(post_entity::Column::Uuid).uuid().not_null().unique_key())
                    .col(ColumnDef::new(post_entity::Column::UserId).integer().not_null())
                    .col(ColumnDef::new(post_entity::Column::Title).string().not_null())
                    .col(ColumnDef::new(post_entity::Column::Status).string().not_null())
                    .col(
                        ColumnDef::new(post_entity::Column::Published)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(post_entity::Column::Views).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(post_entity::Column::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(comment_entity::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(comment_entity::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(comment_entity::Column::PostId).integer().not_null())
                    .col(ColumnDef::new(comment_entity::Column::UserId).integer().not_null())
                    .col(ColumnDef::new(comment_entity::Column::Body).text().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(comment_entity::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(post_entity::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(user_entity::Entity).to_owned())
            .await?;
        Ok(())
    }
}
