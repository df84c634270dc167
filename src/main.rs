//! Awesome Blog - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    awesome_blog::run().await;
}
