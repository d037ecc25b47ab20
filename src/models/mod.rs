pub mod comment;
pub mod comment_reaction;
pub mod question;
pub mod question_tag;
pub mod reset_code;
pub mod tag;
pub mod user;

pub use comment::{Entity as Comment, Model as CommentModel};
pub use comment_reaction::Entity as CommentReaction;
pub use question::{Entity as Question, Model as QuestionModel};
pub use question_tag::Entity as QuestionTag;
pub use reset_code::Entity as ResetCode;
pub use tag::{Entity as Tag, Model as TagModel};
pub use user::{Entity as User, Model as UserModel};
