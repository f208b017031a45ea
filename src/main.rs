//! Eduva - A lightweight online course platform

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eduva::{
    api::{self, AppState},
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{
            SqlxContentRepository, SqlxCourseRepository, SqlxModuleRepository,
            SqlxSessionRepository, SqlxSubjectRepository, SqlxUserRepository,
        },
    },
    services::{
        catalog::CatalogService, content::ContentService, course::CourseService,
        enrollment::EnrollmentService, module::ModuleService, user::UserService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eduva=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Eduva course platform...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Initialize cache
    let cache = create_cache(&config.cache).await?;
    tracing::info!("Cache initialized");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let subject_repo = SqlxSubjectRepository::boxed(pool.clone());
    let course_repo = SqlxCourseRepository::boxed(pool.clone());
    let module_repo = SqlxModuleRepository::boxed(pool.clone());
    let content_repo = SqlxContentRepository::boxed(pool.clone());

    // Initialize services
    let user_service = Arc::new(UserService::new(user_repo, session_repo.clone()));
    let catalog_service = Arc::new(CatalogService::with_cache_ttl(
        subject_repo.clone(),
        course_repo.clone(),
        module_repo.clone(),
        cache.clone(),
        Duration::from_secs(config.cache.ttl_seconds),
    ));
    let course_service = Arc::new(CourseService::new(course_repo.clone(), subject_repo));
    let module_service = Arc::new(ModuleService::new(course_repo.clone(), module_repo.clone()));
    let content_service = Arc::new(ContentService::new(module_repo.clone(), content_repo.clone()));
    let enrollment_service = Arc::new(EnrollmentService::new(
        course_repo,
        module_repo,
        content_repo,
    ));

    // Build application state
    let state = AppState {
        user_service,
        catalog_service,
        course_service,
        module_service,
        content_service,
        enrollment_service,
        upload_config: Arc::new(config.upload.clone()),
    };

    // Expired sessions cleanup task (runs hourly)
    {
        let sessions = session_repo.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match sessions.delete_expired().await {
                    Ok(removed) if removed > 0 => {
                        tracing::debug!("Removed {} expired session(s)", removed)
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
