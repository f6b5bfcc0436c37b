pub mod post;
pub mod tag;
pub mod user;

pub use post::{NewPost, Post, PostChanges, PostTag, PostWithRelations, RelatedPost};
pub use tag::{slugify, NewTag, RelatedTag, Tag, TagChanges, TagWithPosts};
pub use user::{NewUser, User, UserChanges, UserWithPosts};
