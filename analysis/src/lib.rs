pub mod session;
pub mod streak;
pub mod trends;
pub mod weekly;

pub use session::{CompletedSession, ExercisePerformance};
pub use streak::{current_streak, longest_streak};
pub use trends::{strength_trends, StrengthTrend, PREVIOUS_WINDOW_END_DAYS, RECENT_WINDOW_DAYS};
pub use weekly::{weekly_completion, WeeklyCompletion};
