pub mod jwt;

pub use jwt::owner_from_token;
