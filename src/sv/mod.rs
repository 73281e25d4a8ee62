pub mod etl;
pub mod heatmap;
pub mod leaderboard;
pub mod user;

pub use etl::Etl;
pub use heatmap::Heatmap;
pub use leaderboard::Leaderboard;
pub use user::User;
