use axum::Router;
use std::sync::Arc;

use crate::{
    config::Config,
    domains::{
        comment::{create_comment_router, CommentRepository, CommentService, SqlPostDirectory},
        user::{
            create_user_router, spawn_comment_counter_listener, LocalUserDirectory, UserRepository,
            UserService,
        },
    },
    error::AppResult,
    infrastructure::{EventBus, ForumDatabase},
};

#[derive(Clone)]
pub struct AppState {
    pub database: ForumDatabase,
    pub comment_service: CommentService,
    pub user_service: UserService,
    pub events: EventBus,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let database = ForumDatabase::connect(&config.database).await?;
        database.init().await?;
        Ok(Self::with_database(database, config))
    }

    /// Wires both services over an initialised database and starts the
    /// comment counter listener. Must run inside a tokio runtime.
    pub fn with_database(database: ForumDatabase, config: Config) -> Self {
        let events = EventBus::new(config.events.channel_capacity);

        let user_service = UserService::new(UserRepository::new(database.pool().clone()));
        spawn_comment_counter_listener(events.subscribe(), user_service.clone());

        let comment_service = CommentService::new(
            CommentRepository::new(database.pool().clone()),
            Arc::new(SqlPostDirectory::new(database.pool().clone())),
            Arc::new(LocalUserDirectory::new(
                user_service.clone(),
                config.cache.user_capacity,
            )),
            Arc::new(events.clone()),
        );

        Self {
            database,
            comment_service,
            user_service,
            events,
            config,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .nest("/api/v1/comment", create_comment_router(self.comment_service.clone()))
            .nest("/api/v1/user", create_user_router(self.user_service.clone()))
    }
}
