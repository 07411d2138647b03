pub mod hasher;
pub mod image;
pub mod jwt;
pub mod pagination;
