pub mod prelude;

pub mod genre_collections;
pub mod movies;
pub mod users;
