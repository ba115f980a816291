pub mod actor_repo;
pub use actor_repo::{ActorDirectory, ActorRepository};
pub mod carregamento_repo;
pub use carregamento_repo::{CarregamentoRepository, CarregamentoStore};
