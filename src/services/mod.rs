pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService};
pub use auth_service_impl::{RepoAuthService, hash_password};

pub mod catalog_service;
pub mod catalog_service_impl;
pub use catalog_service::{CatalogError, CatalogService, VideoSource};
pub use catalog_service_impl::RepoCatalogService;

pub mod library_service;
pub mod library_service_impl;
pub use library_service::{LibraryError, LibraryService};
pub use library_service_impl::RepoLibraryService;

pub mod content_service;
pub mod content_service_impl;
pub use content_service::{ContentError, ContentService, OverviewStats, Upload};
pub use content_service_impl::RepoContentService;

#[cfg(test)]
pub mod test_support;
