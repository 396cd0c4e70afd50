// Service exports
pub mod cache;
pub mod pet_store;
pub mod recommendations;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use pet_store::{PetStore, PetStoreError};
pub use recommendations::{refine, ClientError, RecommendationClient};
