use api_toolkit::filtering::coerce;
use api_toolkit::serde_with::skip_serializing_none;
use api_toolkit::{
    ApiError, BooleanFilter, ColumnSorter, ExactFilter, FilterValues, InFilter, Includes, LikeFilter, QueryBuilder,
    Resource, ResourceDescriptor, VirtualColumnSorter, async_trait,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, LoaderTrait, QueryFilter, Select};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::{comment_entity, post_entity, user_entity};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorOutput {
    pub id: i32,
    pub name: String,
}

impl From<user_entity::Model> for AuthorOutput {
    fn from(model: user_entity::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentOutput {
    pub id: i32,
    pub body: String,
    pub author: Option<AuthorOutput>,
}

impl From<comment_entity::Model> for CommentOutput {
    fn from(model: comment_entity::Model) -> Self {
        Self {
            id: model.id,
            body: model.body,
            author: None,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostOutput {
    pub id: i32,
    pub uuid: Uuid,
    pub title: String,
    pub status: String,
    pub published: bool,
    pub views: i32,
    pub created_at: DateTime<Utc>,
    pub author: Option<AuthorOutput>,
    pub comments: Option<Vec<CommentOutput>>,
}

impl From<post_entity::Model> for PostOutput {
    fn from(model: post_entity::Model) -> Self {
        Self {
            id: model.id,
            uuid: model.uuid,
            title: model.title,
            status: model.status,
            published: model.published,
            views: model.views,
            created_at: model.created_at,
            author: None,
            comments: None,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserOutput {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub posts: Option<Vec<PostOutput>>,
}

impl From<user_entity::Model> for UserOutput {
    fn from(model: user_entity::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            posts: None,
        }
    }
}

/// Posts: published by default, newest first, authors always loaded
pub struct Posts;

#[async_trait]
impl Resource for Posts {
    type Entity = post_entity::Entity;
    type Output = PostOutput;

    fn describe(&self) -> ResourceDescriptor<post_entity::Entity> {
        ResourceDescriptor::new("posts")
            .filter("status", ExactFilter::new(post_entity::Column::Status))
            .filter("published", BooleanFilter::new(post_entity::Column::Published))
            .filter("author", InFilter::new(post_entity::Column::UserId))
            .filter("search", LikeFilter::new(post_entity::Column::Title))
            .filter(
                "min_views",
                |query: &mut QueryBuilder<post_entity::Entity>, value: &Value, _: &FilterValues| -> Result<(), ApiError> {
                    let min = coerce(post_entity::Column::Views, value)?;
                    query.add_criteria(move |select: Select<post_entity::Entity>| {
                        select.filter(post_entity::Column::Views.gte(min.clone()))
                    });
                    Ok(())
                },
            )
            .sorter("title", ColumnSorter)
            .sorter("views", ColumnSorter)
            .sorter("registered_at", VirtualColumnSorter::new(post_entity::Column::CreatedAt))
            .include("author", ["author"])
            .include("comments", ["comments"])
            .include("thread", ["comments", "comments.author"])
            .default_filter("status", "published")
            .global_include("author")
            .default_include("comments")
            .default_sort("-registered_at")
            .lookup_by(post_entity::Column::Uuid)
    }

    async fn hydrate(
        &self,
        db: &DatabaseConnection,
        models: Vec<post_entity::Model>,
        includes: &Includes,
    ) -> Result<Vec<PostOutput>, ApiError> {
        let authors: Vec<Option<AuthorOutput>> = if includes.contains("author") {
            models
                .load_one(user_entity::Entity, db)
                .await?
                .into_iter()
                .map(|author| author.map(AuthorOutput::from))
                .collect()
        } else {
            vec![None; models.len()]
        };

        let comments: Vec<Option<Vec<CommentOutput>>> = match includes.get("comments") {
            Some(nested) => load_comments(db, &models, nested)
                .await?
                .into_iter()
                .map(Some)
                .collect(),
            None => vec![None; models.len()],
        };

        Ok(models
            .into_iter()
            .zip(authors)
            .zip(comments)
            .map(|((model, author), comments)| PostOutput {
                author,
                comments,
                ..PostOutput::from(model)
            })
            .collect())
    }
}

async fn load_comments(
    db: &DatabaseConnection,
    posts: &[post_entity::Model],
    nested: &Includes,
) -> Result<Vec<Vec<CommentOutput>>, ApiError> {
    let grouped = posts.load_many(comment_entity::Entity, db).await?;
    let flat: Vec<comment_entity::Model> = grouped.iter().flatten().cloned().collect();

    let authors: Vec<Option<AuthorOutput>> = if nested.contains("author") {
        flat.load_one(user_entity::Entity, db)
            .await?
            .into_iter()
            .map(|author| author.map(AuthorOutput::from))
            .collect()
    } else {
        vec![None; flat.len()]
    };

    let mut authors = authors.into_iter();
    Ok(grouped
        .into_iter()
        .map(|group| {
            group
                .into_iter()
                .map(|comment| CommentOutput {
                    author: authors.next().flatten(),
                    ..CommentOutput::from(comment)
                })
                .collect()
        })
        .collect())
}

/// Users with their posts; `posts.comments` loads both levels
pub struct Users;

#[async_trait]
impl Resource for Users {
    type Entity = user_entity::Entity;
    type Output = UserOutput;

    fn describe(&self) -> ResourceDescriptor<user_entity::Entity> {
        ResourceDescriptor::new("users")
            .filter("name", LikeFilter::new(user_entity::Column::Name))
            .sorter("name", ColumnSorter)
            .include("posts", ["posts"])
            .include("posts.comments", ["posts.comments"])
            .default_sort("name")
    }

    async fn hydrate(
        &self,
        db: &DatabaseConnection,
        models: Vec<user_entity::Model>,
        includes: &Includes,
    ) -> Result<Vec<UserOutput>, ApiError> {
        let posts: Vec<Option<Vec<PostOutput>>> = match includes.get("posts") {
            Some(nested) => {
                let grouped = models.load_many(post_entity::Entity, db).await?;
                let sizes: Vec<usize> = grouped.iter().map(Vec::len).collect();
                let flat: Vec<post_entity::Model> = grouped.into_iter().flatten().collect();
                let mut hydrated = Posts.hydrate(db, flat, nested).await?.into_iter();
                sizes
                    .into_iter()
                    .map(|size| Some(hydrated.by_ref().take(size).collect()))
                    .collect()
            }
            None => vec![None; models.len()],
        };

        Ok(models
            .into_iter()
            .zip(posts)
            .map(|(model, posts)| UserOutput {
                posts,
                ..UserOutput::from(model)
            })
            .collect())
    }
}
