/// Domain models
///
/// Each model has a stored record (field names as they appear in the
/// document store) and a typed view used by the flows and pages. The
/// conversion between the two goes through [`crate::store::FromDocument`].
///
/// # Models
///
/// - `task`: tasks, their creation input and the public page projection
/// - `comment`: comments on public tasks

pub mod comment;
pub mod task;

pub use comment::{Comment, CommentRecord, NewComment};
pub use task::{NewTask, PublicTaskView, Task, TaskRecord};
