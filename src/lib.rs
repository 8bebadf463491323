pub mod fake_feed;
pub mod feed;
pub mod http_cache;
pub mod http_client;
pub mod league_params;
pub mod model_params;
pub mod odds_fetch;
pub mod odds_model;
pub mod score_model;
pub mod signal_policy;
pub mod standings_fetch;
pub mod state;
pub mod team_ratings;
pub mod upcoming_fetch;
pub mod value_scan;
