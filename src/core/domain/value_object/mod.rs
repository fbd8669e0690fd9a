mod base_url;
pub mod serde_helpers;
mod weight_vector;

pub use base_url::{
    BaseUrl, DEFAULT_PROXY_ORIGIN, DEVELOPMENT_DEFAULT_URL, ENV_API_URL, ENV_PRODUCTION,
    ENV_PROXY_ORIGIN, EnvSettings, PRODUCTION_PROXY_PATH,
};
pub use weight_vector::{WeightKey, WeightVector};

