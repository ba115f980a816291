pub mod auth;
pub mod carregamento_service;
pub mod estatisticas;
pub mod etapas;
pub mod storage;
