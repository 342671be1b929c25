use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::db::repositories::{GenreCollectionRepository, MovieRepository, UserRepository};
use crate::services::{
    AuthService, CatalogService, ContentService, LibraryService, RepoAuthService,
    RepoCatalogService, RepoContentService, RepoLibraryService,
};
use crate::storage::{AssetStore, LocalAssetStore};

/// Everything the HTTP layer and CLI share: the store, the asset root, and the
/// domain services wired against it.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub assets: Arc<dyn AssetStore>,

    pub auth_service: Arc<dyn AuthService>,

    pub catalog_service: Arc<dyn CatalogService>,

    pub library_service: Arc<dyn LibraryService>,

    pub content_service: Arc<dyn ContentService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let assets: Arc<dyn AssetStore> = Arc::new(LocalAssetStore::new(
            &config.storage.assets_path,
            Duration::from_secs(config.storage.download_url_ttl_seconds),
            config.max_upload_bytes(),
        ));

        let movies: Arc<dyn MovieRepository> = Arc::new(store.movies());
        let users: Arc<dyn UserRepository> = Arc::new(store.users());
        let collections: Arc<dyn GenreCollectionRepository> = Arc::new(store.genre_collections());

        let auth_service: Arc<dyn AuthService> = Arc::new(RepoAuthService::new(
            users.clone(),
            config.security.clone(),
        ));

        let catalog_service: Arc<dyn CatalogService> = Arc::new(RepoCatalogService::new(
            movies.clone(),
            collections.clone(),
            assets.clone(),
            config.catalog.clone(),
        ));

        let library_service: Arc<dyn LibraryService> =
            Arc::new(RepoLibraryService::new(users.clone(), movies.clone()));

        let content_service: Arc<dyn ContentService> = Arc::new(RepoContentService::new(
            movies,
            users,
            collections,
            assets.clone(),
        ));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            assets,
            auth_service,
            catalog_service,
            library_service,
            content_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
