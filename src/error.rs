mod app;
mod stage;

pub use app::AppError;
pub use stage::StageError;
