pub mod carregamentos;
pub mod usuarios;
