mod movies;
mod role;

pub use movies::cmd_list_movies;
pub use role::cmd_set_role;
