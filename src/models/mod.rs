// Records, request payloads and views shared by both services

pub mod api;
pub mod comment;
pub mod events;
pub mod post;
pub mod user;

pub use api::ApiResponse;
pub use comment::{
    AnswerCommentView, Comment, CommentEdit, CommentType, NewComment, RootCommentView,
};
pub use events::{CommentCreated, CommentDeleted, CommentEvent, Envelope};
pub use post::Post;
pub use user::{NewUser, User, UserGeneral, UserSummary, UserView};
