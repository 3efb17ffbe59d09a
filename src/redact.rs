use crate::models::Post;

/// redact_anonymous
///
/// Drops the author of every anonymous post. Applied to each post independently,
/// on every listing, whatever the store returned.
pub fn redact_anonymous(posts: Vec<Post>) -> Vec<Post> {
    posts.into_iter().map(redact).collect()
}

fn redact(mut post: Post) -> Post {
    if post.anonymous {
        post.researcher = None;
    }
    post
}
