pub mod db;
pub mod directory;
pub mod export;
