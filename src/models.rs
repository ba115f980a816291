pub mod auth;
pub mod carregamento;
